//! Tags, units of measure and profile colors

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;

use super::common::{message, require, Message};
use crate::db::repos::taxonomy::{Color, Tag, TaxonomyRepo, Unit};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthSubject, ValidJson, ValidPath};
use crate::http::server::AppState;
use crate::models::text::{required, MAX_NAME_LEN};
use crate::models::UnitKind;

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub nombre: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UnitRequest {
    pub nombre: Option<String>,
    pub abreviatura: Option<String>,
    pub tipo: Option<String>,
}

impl UnitRequest {
    fn validate(self) -> Result<(String, String, UnitKind), ApiError> {
        let nombre = required("nombre", self.nombre.as_deref(), MAX_NAME_LEN)?;
        let abreviatura = required("abreviatura", self.abreviatura.as_deref(), 20)?;
        let tipo = UnitKind::parse(&require("tipo", self.tipo)?)?;
        Ok((nombre, abreviatura, tipo))
    }
}

async fn list_tags(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(TaxonomyRepo::new(&state.pool).list_tags().await?))
}

async fn create_tag(
    State(state): State<Arc<AppState>>,
    AuthSubject(_): AuthSubject,
    ValidJson(req): ValidJson<TagRequest>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let nombre = required("nombre", req.nombre.as_deref(), MAX_NAME_LEN)?;
    let tag = TaxonomyRepo::new(&state.pool).create_tag(&nombre).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn delete_tag(
    State(state): State<Arc<AppState>>,
    AuthSubject(_): AuthSubject,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<Message>, ApiError> {
    TaxonomyRepo::new(&state.pool).delete_tag(id).await?;
    Ok(message("Etiqueta eliminada correctamente"))
}

async fn list_units(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Unit>>, ApiError> {
    Ok(Json(TaxonomyRepo::new(&state.pool).list_units().await?))
}

async fn create_unit(
    State(state): State<Arc<AppState>>,
    AuthSubject(_): AuthSubject,
    ValidJson(req): ValidJson<UnitRequest>,
) -> Result<(StatusCode, Json<Unit>), ApiError> {
    let (nombre, abreviatura, tipo) = req.validate()?;
    let unit = TaxonomyRepo::new(&state.pool)
        .create_unit(&nombre, &abreviatura, tipo)
        .await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

async fn list_colors(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Color>>, ApiError> {
    Ok(Json(TaxonomyRepo::new(&state.pool).list_colors().await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/{id}", delete(delete_tag))
        .route("/units", get(list_units).post(create_unit))
        .route("/colors", get(list_colors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::common::test_support::{json, send};
    use crate::models::ValidationError;
    use serde_json::json;

    #[test]
    fn unit_kind_is_validated() {
        let req = UnitRequest {
            nombre: Some("Pizca".into()),
            abreviatura: Some("pz".into()),
            tipo: Some("pizca".into()),
        };
        match req.validate() {
            Err(ApiError::Validation(ValidationError::InvalidVariant { field, .. })) => {
                assert_eq!(field, "tipo")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unit_fields_are_trimmed() {
        let req = UnitRequest {
            nombre: Some(" Gramo ".into()),
            abreviatura: Some(" g".into()),
            tipo: Some("Peso".into()),
        };
        let (nombre, abreviatura, tipo) = req.validate().unwrap();
        assert_eq!(nombre, "Gramo");
        assert_eq!(abreviatura, "g");
        assert_eq!(tipo, UnitKind::Weight);
    }

    #[tokio::test]
    async fn tag_creation_needs_auth() {
        let (status, _) = send(json("POST", "/tags", json!({"nombre": "rápido"}), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
