//! API error type with IntoResponse
//!
//! Every failure becomes `{"error": "<mensaje>", "status": <code>}`.
//! Database and upstream details are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use yumi_core::CalcError;

use crate::auth::AuthError;
use crate::db::repos::DbError;
use crate::media::MediaError;
use crate::models::{Resource, ValidationError};

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Field validation failed (400)
    Validation(ValidationError),

    /// Request rejected for a domain reason (400)
    BadRequest(String),

    /// Missing or invalid session (401)
    Unauthorized,

    /// Caller doesn't own the resource (403)
    Forbidden(&'static str),

    /// Resource not found (404)
    NotFound(Resource),

    /// Uniqueness or reference conflict (409). `counts` are added to the
    /// body next to `error`, e.g. `recetas_count` for a category in use.
    Conflict {
        message: String,
        counts: Vec<(&'static str, i64)>,
    },

    /// Identity provider or image CDN failed (502, logged)
    Upstream(String),

    /// Database error (500, logged)
    Database(DbError),

    /// Internal error (500, logged)
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            counts: Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::BadRequest(message) => message.clone(),
            Self::Unauthorized => "No autorizado".into(),
            Self::Forbidden(message) => (*message).into(),
            Self::NotFound(resource) => resource.not_found_message().into(),
            Self::Conflict { message, .. } => message.clone(),
            Self::Upstream(_) => "Servicio externo no disponible".into(),
            Self::Database(_) | Self::Internal(_) => "Error interno del servidor".into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Database(e) => tracing::error!("Database error: {}", e),
            Self::Internal(message) => tracing::error!("Internal error: {}", message),
            Self::Upstream(message) => tracing::warn!("Upstream error: {}", message),
            _ => {}
        }

        let status = self.status();
        let mut body = json!({
            "error": self.message(),
            "status": status.as_u16(),
        });
        if let Self::Conflict { counts, .. } = self {
            for (key, count) in counts {
                body[key] = json!(count);
            }
        }

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, .. } => Self::NotFound(resource),
            DbError::Conflict { resource } => Self::conflict(resource.conflict_message()),
            _ => Self::Database(e),
        }
    }
}

impl From<CalcError> for ApiError {
    fn from(e: CalcError) -> Self {
        match e {
            CalcError::NoConversion { .. } => Self::NotFound(Resource::Conversion),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Missing | AuthError::Invalid => Self::Unauthorized,
            AuthError::Unavailable(message) => Self::Upstream(message),
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::InvalidType(_) => Self::bad_request(
                "Tipo de archivo no válido. Solo se permiten imágenes JPEG, PNG, WebP y GIF",
            ),
            MediaError::TooLarge { .. } => Self::bad_request(
                "El archivo es demasiado grande. El tamaño máximo permitido es 5MB",
            ),
            MediaError::NotConfigured => Self::Upstream("image storage is not configured".into()),
            MediaError::Upstream(message) => Self::Upstream(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_error_is_400() {
        let (status, body) = body_json(ApiError::Validation(ValidationError::Empty { field: "titulo" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "El campo titulo es obligatorio");
        assert_eq!(body["status"], 400);
    }

    #[tokio::test]
    async fn unauthorized_is_401() {
        let (status, body) = body_json(AuthError::Missing.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "No autorizado");
    }

    #[tokio::test]
    async fn db_not_found_is_404_with_resource_message() {
        let (status, body) = body_json(DbError::not_found(Resource::User, "x").into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Usuario no encontrado");
    }

    #[tokio::test]
    async fn db_conflict_is_409() {
        let err: ApiError = DbError::Conflict {
            resource: Resource::Category,
        }
        .into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Ya existe una categoría con ese nombre");
        assert_eq!(body.as_object().map(|o| o.len()), Some(2));
    }

    #[tokio::test]
    async fn conflict_counts_sit_beside_the_message() {
        let err = ApiError::Conflict {
            message: "En uso".into(),
            counts: vec![("recetas_count", 3), ("usuarios_count", 0)],
        };
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "En uso");
        assert_eq!(body["recetas_count"], 3);
        assert_eq!(body["usuarios_count"], 0);
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn database_errors_are_hidden() {
        let (status, body) = body_json(ApiError::Database(DbError::Sqlx(sqlx::Error::PoolTimedOut))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Error interno del servidor");
    }

    #[tokio::test]
    async fn upstream_is_502() {
        let (status, _) = body_json(AuthError::Unavailable("timeout".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn missing_conversion_is_404() {
        let err: ApiError = CalcError::NoConversion {
            from: "g".into(),
            to: "taza".into(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn media_errors_map_to_400() {
        let err: ApiError = MediaError::TooLarge { size: 1 }.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let err: ApiError = MediaError::InvalidType("text/plain".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
