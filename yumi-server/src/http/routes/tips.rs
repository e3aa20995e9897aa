//! Recipe tips: advice, alternatives and warnings left by users

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;

use super::common::{current_user, ensure_any_owner, message, Message};
use crate::db::repos::recipes::RecipeRepo;
use crate::db::repos::tips::{Tip, TipRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthSubject, ValidJson, ValidPath};
use crate::http::server::AppState;
use crate::models::text::{optional, MAX_TEXT_LEN};
use crate::models::TipKind;

#[derive(Debug, Default, Deserialize)]
pub struct TipRequest {
    pub contenido: Option<String>,
    pub tipo: Option<String>,
}

impl TipRequest {
    fn validate(self) -> Result<(String, TipKind), ApiError> {
        let contenido = optional("contenido", self.contenido.as_deref(), MAX_TEXT_LEN)?
            .ok_or_else(|| ApiError::bad_request("El contenido del consejo es obligatorio"))?;
        let tipo = match self.tipo.as_deref() {
            Some(tipo) => TipKind::parse(tipo)?,
            None => TipKind::Advice,
        };
        Ok((contenido, tipo))
    }
}

/// GET /recipes/{id}/tips
async fn list_tips(
    State(state): State<Arc<AppState>>,
    ValidPath(receta_id): ValidPath<i32>,
) -> Result<Json<Vec<Tip>>, ApiError> {
    Ok(Json(TipRepo::new(&state.pool).list(receta_id).await?))
}

/// POST /recipes/{id}/tips
async fn create_tip(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(receta_id): ValidPath<i32>,
    ValidJson(req): ValidJson<TipRequest>,
) -> Result<(StatusCode, Json<Tip>), ApiError> {
    let (contenido, tipo) = req.validate()?;
    let caller = current_user(&state, &subject).await?;
    let tip = TipRepo::new(&state.pool)
        .create(receta_id, caller.id, &contenido, tipo)
        .await?;
    Ok((StatusCode::CREATED, Json(tip)))
}

/// DELETE /recipes/{id}/tips/{tip_id} - tip author or recipe author
async fn delete_tip(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath((receta_id, id)): ValidPath<(i32, i32)>,
) -> Result<Json<Message>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    let repo = TipRepo::new(&state.pool);
    let tip = repo.get(receta_id, id).await?;
    let recipe_author = RecipeRepo::new(&state.pool).author(receta_id).await?;
    ensure_any_owner(
        &[tip.usuario_id, recipe_author],
        &caller,
        "No tienes permiso para eliminar este consejo",
    )?;
    repo.delete(receta_id, id).await?;
    Ok(message("Consejo eliminado correctamente"))
}

/// Tip routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/recipes/{id}/tips", get(list_tips).post(create_tip))
        .route("/recipes/{id}/tips/{tip_id}", delete(delete_tip))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_defaults_to_advice() {
        let req = TipRequest {
            contenido: Some("Usa mantequilla fría".into()),
            tipo: None,
        };
        let (contenido, tipo) = req.validate().unwrap();
        assert_eq!(contenido, "Usa mantequilla fría");
        assert_eq!(tipo, TipKind::Advice);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let req = TipRequest {
            contenido: Some("x".into()),
            tipo: Some("receta".into()),
        };
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn blank_content_is_rejected() {
        let req = TipRequest {
            contenido: Some(" ".into()),
            tipo: Some("advertencia".into()),
        };
        assert!(matches!(req.validate(), Err(ApiError::BadRequest(_))));
    }
}
