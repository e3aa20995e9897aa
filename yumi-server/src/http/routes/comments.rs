//! Recipe comment endpoints

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;

use super::common::{current_user, ensure_any_owner, ensure_owner, message, Message};
use crate::db::repos::comments::{Comment, CommentRepo};
use crate::db::repos::recipes::RecipeRepo;
use crate::http::error::ApiError;
use crate::http::extractors::{AuthSubject, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::text::{required, MAX_TEXT_LEN};
use crate::models::{Paginated, PaginationParams, ValidationError};

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub contenido: Option<String>,
}

impl CommentRequest {
    fn contenido(&self) -> Result<String, ApiError> {
        required("contenido", self.contenido.as_deref(), MAX_TEXT_LEN).map_err(|e| match e {
            ValidationError::Empty { .. } => {
                ApiError::bad_request("El contenido del comentario es obligatorio")
            }
            other => other.into(),
        })
    }
}

/// GET /recipes/{id}/comments - newest first
async fn list_comments(
    State(state): State<Arc<AppState>>,
    ValidPath(receta_id): ValidPath<i32>,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<Comment>>, ApiError> {
    let comments = CommentRepo::new(&state.pool)
        .list(receta_id, params.or_default_limit(10))
        .await?;
    Ok(Json(comments))
}

/// POST /recipes/{id}/comments
async fn create_comment(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(receta_id): ValidPath<i32>,
    ValidJson(req): ValidJson<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let contenido = req.contenido()?;
    let caller = current_user(&state, &subject).await?;
    let comment = CommentRepo::new(&state.pool)
        .create(receta_id, caller.id, &contenido)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /recipes/{id}/comments/{comment_id}
async fn get_comment(
    State(state): State<Arc<AppState>>,
    ValidPath((receta_id, id)): ValidPath<(i32, i32)>,
) -> Result<Json<Comment>, ApiError> {
    Ok(Json(CommentRepo::new(&state.pool).get(receta_id, id).await?))
}

/// PATCH /recipes/{id}/comments/{comment_id} - comment author only
async fn update_comment(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath((receta_id, id)): ValidPath<(i32, i32)>,
    ValidJson(req): ValidJson<CommentRequest>,
) -> Result<Json<Comment>, ApiError> {
    let contenido = req.contenido()?;
    let caller = current_user(&state, &subject).await?;
    let repo = CommentRepo::new(&state.pool);
    let comment = repo.get(receta_id, id).await?;
    ensure_owner(
        comment.usuario_id,
        &caller,
        "No tienes permiso para modificar este comentario",
    )?;
    Ok(Json(repo.update(receta_id, id, &contenido).await?))
}

/// DELETE /recipes/{id}/comments/{comment_id} - comment or recipe author
async fn delete_comment(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath((receta_id, id)): ValidPath<(i32, i32)>,
) -> Result<Json<Message>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    let repo = CommentRepo::new(&state.pool);
    let comment = repo.get(receta_id, id).await?;
    let recipe_author = RecipeRepo::new(&state.pool).author(receta_id).await?;
    ensure_any_owner(
        &[comment.usuario_id, recipe_author],
        &caller,
        "No tienes permiso para eliminar este comentario",
    )?;
    repo.delete(receta_id, id).await?;
    Ok(message("Comentario eliminado correctamente"))
}

/// Comment routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/recipes/{id}/comments",
            get(list_comments).post(create_comment),
        )
        .route(
            "/recipes/{id}/comments/{comment_id}",
            get(get_comment).patch(update_comment).delete(delete_comment),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::common::test_support::{json, send};
    use serde_json::json;

    #[test]
    fn blank_content_has_specific_message() {
        let req = CommentRequest {
            contenido: Some("   ".into()),
        };
        match req.contenido() {
            Err(ApiError::BadRequest(message)) => {
                assert_eq!(message, "El contenido del comentario es obligatorio")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn content_is_trimmed() {
        let req = CommentRequest {
            contenido: Some("  ¡Riquísima! ".into()),
        };
        assert_eq!(req.contenido().unwrap(), "¡Riquísima!");
    }

    #[tokio::test]
    async fn create_needs_content() {
        let (status, _) = send(json("POST", "/recipes/1/comments", json!({}), Some("user_1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_needs_auth() {
        let (status, _) = send(json(
            "PATCH",
            "/recipes/1/comments/2",
            json!({"contenido": "x"}),
            None,
        ))
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
