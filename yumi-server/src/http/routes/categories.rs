//! Recipe category endpoints

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use super::common::{message, Message};
use crate::db::repos::recipes::{RecipeFilter, RecipeOrder, RecipeRepo, RecipeSummary};
use crate::db::repos::taxonomy::{Category, TaxonInput, TaxonomyRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthSubject, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::text::{optional, MAX_NAME_LEN, MAX_TEXT_LEN};
use crate::models::{Paginated, Pagination, PaginationParams};

/// Name filter plus pagination, shared with diets
#[derive(Debug, Default, Deserialize)]
pub struct TaxonQuery {
    pub nombre: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl TaxonQuery {
    pub(super) fn nombre(&self) -> Option<&str> {
        self.nombre.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub(super) fn page(&self, default_limit: u32) -> Pagination {
        PaginationParams {
            page: self.page,
            limit: self.limit,
        }
        .or_default_limit(default_limit)
    }
}

/// Body for creating or renaming a category or diet
#[derive(Debug, Default, Deserialize)]
pub struct TaxonRequest {
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub restricciones: Option<String>,
}

impl TaxonRequest {
    pub(super) fn into_input(self, missing_name: &'static str) -> Result<TaxonInput, ApiError> {
        let nombre = optional("nombre", self.nombre.as_deref(), MAX_NAME_LEN)?
            .ok_or_else(|| ApiError::bad_request(missing_name))?;
        Ok(TaxonInput {
            nombre,
            descripcion: optional("descripcion", self.descripcion.as_deref(), MAX_TEXT_LEN)?,
            restricciones: optional("restricciones", self.restricciones.as_deref(), MAX_TEXT_LEN)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryRecipes {
    pub categoria: Category,
    #[serde(flatten)]
    pub recetas: Paginated<RecipeSummary>,
}

const MISSING_NAME: &str = "El nombre de la categoría es obligatorio";

/// GET /categories
async fn list_categories(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<TaxonQuery>,
) -> Result<Json<Paginated<Category>>, ApiError> {
    let categories = TaxonomyRepo::new(&state.pool)
        .list_categories(query.nombre(), query.page(20))
        .await?;
    Ok(Json(categories))
}

/// POST /categories
async fn create_category(
    State(state): State<Arc<AppState>>,
    AuthSubject(_): AuthSubject,
    ValidJson(req): ValidJson<TaxonRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let input = req.into_input(MISSING_NAME)?;
    let category = TaxonomyRepo::new(&state.pool).create_category(input).await?;
    tracing::info!(category_id = category.id, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /categories/{id}
async fn get_category(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(TaxonomyRepo::new(&state.pool).get_category(id).await?))
}

/// PUT /categories/{id}
async fn update_category(
    State(state): State<Arc<AppState>>,
    AuthSubject(_): AuthSubject,
    ValidPath(id): ValidPath<i32>,
    ValidJson(req): ValidJson<TaxonRequest>,
) -> Result<Json<Category>, ApiError> {
    let input = req.into_input(MISSING_NAME)?;
    Ok(Json(
        TaxonomyRepo::new(&state.pool).update_category(id, input).await?,
    ))
}

/// DELETE /categories/{id} - refused while recipes use it
async fn delete_category(
    State(state): State<Arc<AppState>>,
    AuthSubject(_): AuthSubject,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<Message>, ApiError> {
    let repo = TaxonomyRepo::new(&state.pool);
    let category = repo.get_category(id).await?;
    if category.recetas_count > 0 {
        return Err(ApiError::Conflict {
            message: "No se puede eliminar la categoría porque tiene recetas asociadas".into(),
            counts: vec![("recetas_count", category.recetas_count)],
        });
    }
    repo.delete_category(id).await?;
    Ok(message("Categoría eliminada correctamente"))
}

/// GET /categories/{id}/recipes
async fn category_recipes(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<i32>,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<CategoryRecipes>, ApiError> {
    let categoria = TaxonomyRepo::new(&state.pool).get_category(id).await?;
    let filter = RecipeFilter {
        categoria_id: Some(id),
        ..Default::default()
    };
    let recetas = RecipeRepo::new(&state.pool)
        .list(&filter, RecipeOrder::Newest, params.or_default_limit(10))
        .await?;
    Ok(Json(CategoryRecipes { categoria, recetas }))
}

/// Category routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route("/categories/{id}/recipes", get(category_recipes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::common::test_support::{json, send};
    use serde_json::json;

    #[test]
    fn blank_name_uses_given_message() {
        let req = TaxonRequest {
            nombre: Some("  ".into()),
            ..Default::default()
        };
        match req.into_input(MISSING_NAME) {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, MISSING_NAME),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn query_ignores_blank_name() {
        let query = TaxonQuery {
            nombre: Some(" ".into()),
            ..Default::default()
        };
        assert_eq!(query.nombre(), None);
        assert_eq!(query.page(20).limit(), 20);
    }

    #[tokio::test]
    async fn create_requires_auth() {
        let (status, _) = send(json("POST", "/categories", json!({"nombre": "Postres"}), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_requires_name() {
        let (status, body) = send(json("POST", "/categories", json!({}), Some("user_1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], MISSING_NAME);
    }
}
