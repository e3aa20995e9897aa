//! Diet endpoints

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use super::categories::{TaxonQuery, TaxonRequest};
use super::common::{message, Message};
use crate::db::repos::recipes::{RecipeFilter, RecipeOrder, RecipeRepo, RecipeSummary};
use crate::db::repos::taxonomy::{Diet, DietFollower, TaxonomyRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthSubject, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::{Paginated, PaginationParams};

const MISSING_NAME: &str = "El nombre de la dieta es obligatorio";

#[derive(Debug, Serialize)]
pub struct DietRecipes {
    pub dieta: Diet,
    #[serde(flatten)]
    pub recetas: Paginated<RecipeSummary>,
}

/// GET /diets
async fn list_diets(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<TaxonQuery>,
) -> Result<Json<Paginated<Diet>>, ApiError> {
    let diets = TaxonomyRepo::new(&state.pool)
        .list_diets(query.nombre(), query.page(20))
        .await?;
    Ok(Json(diets))
}

/// POST /diets
async fn create_diet(
    State(state): State<Arc<AppState>>,
    AuthSubject(_): AuthSubject,
    ValidJson(req): ValidJson<TaxonRequest>,
) -> Result<(StatusCode, Json<Diet>), ApiError> {
    let input = req.into_input(MISSING_NAME)?;
    let diet = TaxonomyRepo::new(&state.pool).create_diet(input).await?;
    tracing::info!(diet_id = diet.id, "Diet created");
    Ok((StatusCode::CREATED, Json(diet)))
}

/// GET /diets/{id}
async fn get_diet(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<Diet>, ApiError> {
    Ok(Json(TaxonomyRepo::new(&state.pool).get_diet(id).await?))
}

/// PUT /diets/{id}
async fn update_diet(
    State(state): State<Arc<AppState>>,
    AuthSubject(_): AuthSubject,
    ValidPath(id): ValidPath<i32>,
    ValidJson(req): ValidJson<TaxonRequest>,
) -> Result<Json<Diet>, ApiError> {
    let input = req.into_input(MISSING_NAME)?;
    Ok(Json(TaxonomyRepo::new(&state.pool).update_diet(id, input).await?))
}

/// DELETE /diets/{id} - refused while recipes or followers reference it
async fn delete_diet(
    State(state): State<Arc<AppState>>,
    AuthSubject(_): AuthSubject,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<Message>, ApiError> {
    let repo = TaxonomyRepo::new(&state.pool);
    let diet = repo.get_diet(id).await?;
    if diet.recetas_count > 0 || diet.usuarios_count > 0 {
        return Err(ApiError::Conflict {
            message: "No se puede eliminar la dieta porque tiene recetas o usuarios asociados"
                .into(),
            counts: vec![
                ("recetas_count", diet.recetas_count),
                ("usuarios_count", diet.usuarios_count),
            ],
        });
    }
    repo.delete_diet(id).await?;
    Ok(message("Dieta eliminada correctamente"))
}

/// GET /diets/{id}/recipes
async fn diet_recipes(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<i32>,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<DietRecipes>, ApiError> {
    let dieta = TaxonomyRepo::new(&state.pool).get_diet(id).await?;
    let filter = RecipeFilter {
        dieta_ids: vec![id],
        ..Default::default()
    };
    let recetas = RecipeRepo::new(&state.pool)
        .list(&filter, RecipeOrder::Newest, params.or_default_limit(10))
        .await?;
    Ok(Json(DietRecipes { dieta, recetas }))
}

/// GET /diets/{id}/users
async fn diet_users(
    State(state): State<Arc<AppState>>,
    AuthSubject(_): AuthSubject,
    ValidPath(id): ValidPath<i32>,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<DietFollower>>, ApiError> {
    let repo = TaxonomyRepo::new(&state.pool);
    repo.get_diet(id).await?;
    let followers = repo.diet_followers(id, params.or_default_limit(20)).await?;
    Ok(Json(followers))
}

/// Diet routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/diets", get(list_diets).post(create_diet))
        .route(
            "/diets/{id}",
            get(get_diet).put(update_diet).delete(delete_diet),
        )
        .route("/diets/{id}/recipes", get(diet_recipes))
        .route("/diets/{id}/users", get(diet_users))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::common::test_support::{get, json, send};
    use serde_json::json;

    #[tokio::test]
    async fn create_requires_name() {
        let (status, body) = send(json(
            "POST",
            "/diets",
            json!({"descripcion": "Sin carne"}),
            Some("user_1"),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], MISSING_NAME);
    }

    #[tokio::test]
    async fn followers_require_auth() {
        let (status, _) = send(get("/diets/1/users")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_id_is_400() {
        let (status, body) = send(get("/diets/vegana")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "ID no válido");
    }
}
