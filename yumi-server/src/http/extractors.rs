//! Custom Axum extractors
//!
//! Authentication extractors resolve the bearer token through the
//! configured identity provider. The `Valid*` wrappers turn axum's
//! rejections into the API's JSON error shape.

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::server::AppState;
use crate::auth::{bearer_token, AuthError};

async fn resolve_subject(parts: &Parts, state: &AppState) -> Result<String, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let token = bearer_token(header)?;
    state.identity.subject(token).await
}

/// Authenticated caller's external subject id. Rejects with 401.
#[derive(Debug, Clone)]
pub struct AuthSubject(pub String);

impl FromRequestParts<Arc<AppState>> for AuthSubject {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let subject = resolve_subject(parts, state).await?;
        Ok(Self(subject))
    }
}

/// Caller's subject when a valid token is present.
///
/// Missing or rejected tokens read as anonymous.
#[derive(Debug, Clone)]
pub struct MaybeSubject(pub Option<String>);

impl FromRequestParts<Arc<AppState>> for MaybeSubject {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match resolve_subject(parts, state).await {
            Ok(subject) => Ok(Self(Some(subject))),
            Err(AuthError::Missing | AuthError::Invalid) => Ok(Self(None)),
            Err(AuthError::Unavailable(reason)) => {
                tracing::warn!(%reason, "identity provider unavailable, treating caller as anonymous");
                Ok(Self(None))
            }
        }
    }
}

/// JSON body with a Spanish 400 on malformed input
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!(error = %rejection.body_text(), "rejected JSON body");
            ApiError::bad_request(format!(
                "Cuerpo de la solicitud no válido: {}",
                rejection.body_text()
            ))
        })?;
        Ok(Self(value))
    }
}

/// Path parameters; a non-numeric id is a 400
pub struct ValidPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::bad_request("ID no válido"))?;
        Ok(Self(value))
    }
}

/// Query string parameters
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                ApiError::bad_request(format!(
                    "Parámetros de consulta no válidos: {}",
                    rejection.body_text()
                ))
            })?;
        Ok(Self(value))
    }
}
