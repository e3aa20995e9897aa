//! Category preferences and followed diets under /users/{id}

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use super::common::{current_user, ensure_owner, message, require, Message};
use crate::db::repos::preferences::{PreferenceRepo, UserDiet, UserPreference};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthSubject, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;

const VIEW_DENIED: &str = "No tienes permiso para ver estas preferencias";
const EDIT_DENIED: &str = "No tienes permiso para modificar estas preferencias";

#[derive(Debug, Deserialize)]
pub struct AddPreferenceRequest {
    pub categoria_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ReplacePreferencesRequest {
    pub categorias: Option<Vec<i32>>,
}

#[derive(Debug, Deserialize)]
pub struct RemovePreferenceQuery {
    pub categoria_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceDietsRequest {
    pub dietas: Option<Vec<i32>>,
}

fn dedup(mut ids: Vec<i32>) -> Vec<i32> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// GET /users/{id}/preferences
async fn list_preferences(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<Vec<UserPreference>>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    ensure_owner(Some(id), &caller, VIEW_DENIED)?;
    Ok(Json(PreferenceRepo::new(&state.pool).list(id).await?))
}

/// POST /users/{id}/preferences
async fn add_preference(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<AddPreferenceRequest>,
) -> Result<(StatusCode, Json<UserPreference>), ApiError> {
    let categoria_id = require("categoria_id", req.categoria_id)?;
    let caller = current_user(&state, &subject).await?;
    ensure_owner(Some(id), &caller, EDIT_DENIED)?;
    let preference = PreferenceRepo::new(&state.pool).add(id, categoria_id).await?;
    Ok((StatusCode::CREATED, Json(preference)))
}

/// PUT /users/{id}/preferences - replace the whole set
async fn replace_preferences(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<ReplacePreferencesRequest>,
) -> Result<Json<Vec<UserPreference>>, ApiError> {
    let categorias = req
        .categorias
        .ok_or_else(|| ApiError::bad_request("Se esperaba un array de IDs de categorías"))?;
    let caller = current_user(&state, &subject).await?;
    ensure_owner(Some(id), &caller, EDIT_DENIED)?;
    let preferences = PreferenceRepo::new(&state.pool)
        .replace(id, &dedup(categorias))
        .await?;
    Ok(Json(preferences))
}

/// DELETE /users/{id}/preferences?categoria_id=
async fn remove_preference(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<Uuid>,
    ValidQuery(query): ValidQuery<RemovePreferenceQuery>,
) -> Result<Json<Message>, ApiError> {
    let categoria_id = require("categoria_id", query.categoria_id)?;
    let caller = current_user(&state, &subject).await?;
    ensure_owner(Some(id), &caller, EDIT_DENIED)?;
    PreferenceRepo::new(&state.pool).remove(id, categoria_id).await?;
    Ok(message("Preferencia eliminada correctamente"))
}

/// GET /users/{id}/diets
async fn list_diets(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<Vec<UserDiet>>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    ensure_owner(Some(id), &caller, VIEW_DENIED)?;
    Ok(Json(PreferenceRepo::new(&state.pool).list_diets(id).await?))
}

/// PUT /users/{id}/diets - replace followed diets
async fn replace_diets(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<ReplaceDietsRequest>,
) -> Result<Json<Vec<UserDiet>>, ApiError> {
    let dietas = req
        .dietas
        .ok_or_else(|| ApiError::bad_request("Se esperaba un array de IDs de dietas"))?;
    let caller = current_user(&state, &subject).await?;
    ensure_owner(Some(id), &caller, EDIT_DENIED)?;
    let diets = PreferenceRepo::new(&state.pool)
        .replace_diets(id, &dedup(dietas))
        .await?;
    Ok(Json(diets))
}

/// Preference routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/users/{id}/preferences",
            get(list_preferences)
                .post(add_preference)
                .put(replace_preferences)
                .delete(remove_preference),
        )
        .route("/users/{id}/diets", get(list_diets).put(replace_diets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::common::test_support::{json, send};
    use serde_json::json;

    #[test]
    fn dedup_sorts_and_removes_repeats() {
        assert_eq!(dedup(vec![3, 1, 3, 2, 1]), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn replace_requires_array() {
        let uri = format!("/users/{}/preferences", Uuid::new_v4());
        let (status, body) = send(json("PUT", &uri, json!({}), Some("user_1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Se esperaba un array de IDs de categorías");
    }

    #[tokio::test]
    async fn add_requires_category() {
        let uri = format!("/users/{}/preferences", Uuid::new_v4());
        let (status, _) = send(json("POST", &uri, json!({}), Some("user_1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn anonymous_is_401() {
        let uri = format!("/users/{}/diets", Uuid::new_v4());
        let (status, _) = send(json("PUT", &uri, json!({"dietas": [1]}), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
