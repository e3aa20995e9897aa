//! Recipe attempt endpoints - photos of users' own tries at a recipe

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;

use super::common::{current_user, ensure_any_owner, ensure_owner, message, Message};
use crate::db::repos::attempts::{Attempt, AttemptRepo};
use crate::db::repos::recipes::RecipeRepo;
use crate::http::error::ApiError;
use crate::http::extractors::{AuthSubject, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::text::{optional, MAX_TEXT_LEN, MAX_URL_LEN};
use crate::models::{Paginated, PaginationParams};

#[derive(Debug, Default, Deserialize)]
pub struct AttemptRequest {
    pub imagen_url: Option<String>,
    pub comentario: Option<String>,
}

/// GET /recipes/{id}/attempts
async fn list_attempts(
    State(state): State<Arc<AppState>>,
    ValidPath(receta_id): ValidPath<i32>,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<Attempt>>, ApiError> {
    let attempts = AttemptRepo::new(&state.pool)
        .list(receta_id, params.or_default_limit(10))
        .await?;
    Ok(Json(attempts))
}

/// POST /recipes/{id}/attempts
async fn create_attempt(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(receta_id): ValidPath<i32>,
    ValidJson(req): ValidJson<AttemptRequest>,
) -> Result<(StatusCode, Json<Attempt>), ApiError> {
    let imagen_url = optional("imagen_url", req.imagen_url.as_deref(), MAX_URL_LEN)?
        .ok_or_else(|| ApiError::bad_request("La imagen del intento es obligatoria"))?;
    let comentario = optional("comentario", req.comentario.as_deref(), MAX_TEXT_LEN)?;
    let caller = current_user(&state, &subject).await?;

    let attempt = AttemptRepo::new(&state.pool)
        .create(receta_id, caller.id, &imagen_url, comentario.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(attempt)))
}

/// GET /recipes/{id}/attempts/{attempt_id}
async fn get_attempt(
    State(state): State<Arc<AppState>>,
    ValidPath((receta_id, id)): ValidPath<(i32, i32)>,
) -> Result<Json<Attempt>, ApiError> {
    Ok(Json(AttemptRepo::new(&state.pool).get(receta_id, id).await?))
}

/// PATCH /recipes/{id}/attempts/{attempt_id} - owner only
async fn update_attempt(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath((receta_id, id)): ValidPath<(i32, i32)>,
    ValidJson(req): ValidJson<AttemptRequest>,
) -> Result<Json<Attempt>, ApiError> {
    let imagen_url = optional("imagen_url", req.imagen_url.as_deref(), MAX_URL_LEN)?;
    let comentario = optional("comentario", req.comentario.as_deref(), MAX_TEXT_LEN)?;
    let caller = current_user(&state, &subject).await?;

    let repo = AttemptRepo::new(&state.pool);
    let attempt = repo.get(receta_id, id).await?;
    ensure_owner(
        attempt.usuario_id,
        &caller,
        "No tienes permiso para modificar este intento",
    )?;
    let updated = repo
        .update(receta_id, id, imagen_url.as_deref(), comentario.as_deref())
        .await?;
    Ok(Json(updated))
}

/// DELETE /recipes/{id}/attempts/{attempt_id} - owner or recipe author
async fn delete_attempt(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath((receta_id, id)): ValidPath<(i32, i32)>,
) -> Result<Json<Message>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    let repo = AttemptRepo::new(&state.pool);
    let attempt = repo.get(receta_id, id).await?;
    let recipe_author = RecipeRepo::new(&state.pool).author(receta_id).await?;
    ensure_any_owner(
        &[attempt.usuario_id, recipe_author],
        &caller,
        "No tienes permiso para eliminar este intento",
    )?;
    repo.delete(receta_id, id).await?;
    Ok(message("Intento eliminado correctamente"))
}

/// Attempt routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/recipes/{id}/attempts",
            get(list_attempts).post(create_attempt),
        )
        .route(
            "/recipes/{id}/attempts/{attempt_id}",
            get(get_attempt).patch(update_attempt).delete(delete_attempt),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::common::test_support::{json, send};
    use serde_json::json;

    #[tokio::test]
    async fn image_is_required() {
        let (status, body) = send(json(
            "POST",
            "/recipes/1/attempts",
            json!({"comentario": "Me salió genial"}),
            Some("user_1"),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "La imagen del intento es obligatoria");
    }

    #[tokio::test]
    async fn anonymous_cannot_delete() {
        let (status, _) = send(json("DELETE", "/recipes/1/attempts/1", json!({}), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
