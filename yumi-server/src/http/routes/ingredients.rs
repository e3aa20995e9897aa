//! Recipe ingredient endpoints. Writes are reserved to the recipe author.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;
use serde_json::Value;

use super::common::{current_user, ensure_owner, message, Message};
use crate::db::repos::ingredients::{Ingredient, IngredientChanges, IngredientInput, IngredientRepo};
use crate::db::repos::recipes::RecipeRepo;
use crate::db::repos::users::User;
use crate::http::error::ApiError;
use crate::http::extractors::{AuthSubject, ValidJson, ValidPath};
use crate::http::server::AppState;
use crate::models::text::{optional, MAX_NAME_LEN};
use crate::models::ValidationError;

const EDIT_DENIED: &str = "No tienes permiso para modificar los ingredientes de esta receta";

#[derive(Debug, Default, Deserialize)]
pub struct IngredientRequest {
    pub nombre: Option<String>,
    pub cantidad: Option<f64>,
    pub unidad_id: Option<i32>,
    pub calorias_por_unidad: Option<i32>,
    pub es_opcional: Option<bool>,
}

impl IngredientRequest {
    fn checked_numbers(&self) -> Result<(), ValidationError> {
        if self.cantidad.is_some_and(|c| !c.is_finite() || c < 0.0) {
            return Err(ValidationError::InvalidFormat {
                field: "cantidad",
                reason: "no puede ser negativo",
            });
        }
        if self.calorias_por_unidad.is_some_and(|c| c < 0) {
            return Err(ValidationError::InvalidFormat {
                field: "calorias_por_unidad",
                reason: "no puede ser negativo",
            });
        }
        Ok(())
    }

    fn into_input(self) -> Result<IngredientInput, ApiError> {
        self.checked_numbers()?;
        let nombre = optional("nombre", self.nombre.as_deref(), MAX_NAME_LEN)?
            .ok_or_else(|| ApiError::bad_request("El nombre del ingrediente es obligatorio"))?;
        Ok(IngredientInput {
            nombre,
            cantidad: self.cantidad,
            unidad_id: self.unidad_id,
            calorias_por_unidad: self.calorias_por_unidad,
            es_opcional: self.es_opcional.unwrap_or(false),
        })
    }

    fn into_changes(self) -> Result<IngredientChanges, ApiError> {
        self.checked_numbers()?;
        Ok(IngredientChanges {
            nombre: optional("nombre", self.nombre.as_deref(), MAX_NAME_LEN)?,
            cantidad: self.cantidad,
            unidad_id: self.unidad_id,
            calorias_por_unidad: self.calorias_por_unidad,
            es_opcional: self.es_opcional,
        })
    }
}

/// Parse the body of a bulk replace. Every entry needs a name.
fn parse_bulk(body: Value) -> Result<Vec<IngredientInput>, ApiError> {
    if !body.is_array() {
        return Err(ApiError::bad_request("Se esperaba un array de ingredientes"));
    }
    let requests: Vec<IngredientRequest> = serde_json::from_value(body)
        .map_err(|e| ApiError::bad_request(format!("Ingrediente no válido: {e}")))?;
    requests
        .into_iter()
        .map(|req| {
            req.into_input().map_err(|err| match err {
                ApiError::BadRequest(_) => {
                    ApiError::bad_request("Todos los ingredientes deben tener un nombre")
                }
                other => other,
            })
        })
        .collect()
}

async fn ensure_recipe_author(state: &AppState, receta_id: i32, caller: &User) -> Result<(), ApiError> {
    let author = RecipeRepo::new(&state.pool).author(receta_id).await?;
    ensure_owner(author, caller, EDIT_DENIED)
}

/// GET /recipes/{id}/ingredients
async fn list_ingredients(
    State(state): State<Arc<AppState>>,
    ValidPath(receta_id): ValidPath<i32>,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    Ok(Json(IngredientRepo::new(&state.pool).list(receta_id).await?))
}

/// POST /recipes/{id}/ingredients
async fn add_ingredient(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(receta_id): ValidPath<i32>,
    ValidJson(req): ValidJson<IngredientRequest>,
) -> Result<(StatusCode, Json<Ingredient>), ApiError> {
    let input = req.into_input()?;
    let caller = current_user(&state, &subject).await?;
    ensure_recipe_author(&state, receta_id, &caller).await?;
    let ingredient = IngredientRepo::new(&state.pool).create(receta_id, input).await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

/// PUT /recipes/{id}/ingredients - replace the full list
async fn replace_ingredients(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(receta_id): ValidPath<i32>,
    ValidJson(body): ValidJson<Value>,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    let inputs = parse_bulk(body)?;
    let caller = current_user(&state, &subject).await?;
    ensure_recipe_author(&state, receta_id, &caller).await?;
    let ingredients = IngredientRepo::new(&state.pool)
        .replace_all(receta_id, inputs)
        .await?;
    Ok(Json(ingredients))
}

/// GET /recipes/{id}/ingredients/{ingredient_id}
async fn get_ingredient(
    State(state): State<Arc<AppState>>,
    ValidPath((receta_id, id)): ValidPath<(i32, i32)>,
) -> Result<Json<Ingredient>, ApiError> {
    Ok(Json(IngredientRepo::new(&state.pool).get(receta_id, id).await?))
}

/// PATCH /recipes/{id}/ingredients/{ingredient_id}
async fn update_ingredient(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath((receta_id, id)): ValidPath<(i32, i32)>,
    ValidJson(req): ValidJson<IngredientRequest>,
) -> Result<Json<Ingredient>, ApiError> {
    let changes = req.into_changes()?;
    let caller = current_user(&state, &subject).await?;
    ensure_recipe_author(&state, receta_id, &caller).await?;
    let ingredient = IngredientRepo::new(&state.pool)
        .update(receta_id, id, changes)
        .await?;
    Ok(Json(ingredient))
}

/// DELETE /recipes/{id}/ingredients/{ingredient_id}
async fn delete_ingredient(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath((receta_id, id)): ValidPath<(i32, i32)>,
) -> Result<Json<Message>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    ensure_recipe_author(&state, receta_id, &caller).await?;
    IngredientRepo::new(&state.pool).delete(receta_id, id).await?;
    Ok(message("Ingrediente eliminado correctamente"))
}

/// Ingredient routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/recipes/{id}/ingredients",
            get(list_ingredients)
                .post(add_ingredient)
                .put(replace_ingredients),
        )
        .route(
            "/recipes/{id}/ingredients/{ingredient_id}",
            get(get_ingredient)
                .patch(update_ingredient)
                .delete(delete_ingredient),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::common::test_support::{json, send};
    use serde_json::json;

    #[test]
    fn bulk_requires_array() {
        let err = parse_bulk(json!({"nombre": "harina"})).unwrap_err();
        match err {
            ApiError::BadRequest(msg) => assert_eq!(msg, "Se esperaba un array de ingredientes"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bulk_requires_every_name() {
        let err = parse_bulk(json!([
            {"nombre": "harina", "cantidad": 200.0},
            {"cantidad": 2.0}
        ]))
        .unwrap_err();
        match err {
            ApiError::BadRequest(msg) => {
                assert_eq!(msg, "Todos los ingredientes deben tener un nombre")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bulk_defaults_optional_flag() {
        let inputs = parse_bulk(json!([{"nombre": " huevo ", "cantidad": 2.0}])).unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].nombre, "huevo");
        assert!(!inputs[0].es_opcional);
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let req = IngredientRequest {
            nombre: Some("sal".into()),
            cantidad: Some(-1.0),
            ..Default::default()
        };
        assert!(matches!(req.into_input(), Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn add_requires_name() {
        let (status, body) = send(json(
            "POST",
            "/recipes/3/ingredients",
            json!({"cantidad": 1.0}),
            Some("user_1"),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "El nombre del ingrediente es obligatorio");
    }
}
