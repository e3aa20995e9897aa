//! Weight history endpoints under /users/{id}/weights

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use yumi_core::{weight_stats, WeightSample, WeightStats};

use super::common::{current_user, ensure_owner, message, require, Message};
use crate::db::repos::weights::{WeightEntry, WeightRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthSubject, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::text::positive;
use crate::models::{parse_datetime, parse_optional};

const DEFAULT_HISTORY_LIMIT: i64 = 100;
const MAX_HISTORY_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RecordWeightRequest {
    pub peso: Option<f64>,
    pub fecha: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteWeightQuery {
    pub registro_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct WeightHistory {
    pub data: Vec<WeightEntry>,
    pub estadisticas: WeightStats,
}

/// GET /users/{id}/weights - newest first, with statistics
async fn list_weights(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<Uuid>,
    ValidQuery(query): ValidQuery<HistoryQuery>,
) -> Result<Json<WeightHistory>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    ensure_owner(Some(id), &caller, "No tienes permiso para ver este historial")?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let data = WeightRepo::new(&state.pool).list(id, limit).await?;
    let samples: Vec<WeightSample> = data.iter().map(WeightSample::from).collect();

    Ok(Json(WeightHistory {
        estadisticas: weight_stats(&samples),
        data,
    }))
}

/// POST /users/{id}/weights - record a weigh-in
async fn record_weight(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<RecordWeightRequest>,
) -> Result<(StatusCode, Json<WeightEntry>), ApiError> {
    let peso = positive("peso", require("peso", req.peso)?)?;
    let fecha = parse_optional("fecha", req.fecha.as_deref(), parse_datetime)?;
    let caller = current_user(&state, &subject).await?;
    ensure_owner(Some(id), &caller, "No tienes permiso para modificar este historial")?;

    let entry = WeightRepo::new(&state.pool).record(id, peso, fecha).await?;
    tracing::debug!(user_id = %id, peso, "Weight recorded");
    Ok((StatusCode::CREATED, Json(entry)))
}

/// DELETE /users/{id}/weights?registro_id=
async fn delete_weight(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<Uuid>,
    ValidQuery(query): ValidQuery<DeleteWeightQuery>,
) -> Result<Json<Message>, ApiError> {
    let registro_id = require("registro_id", query.registro_id)?;
    let caller = current_user(&state, &subject).await?;
    ensure_owner(Some(id), &caller, "No tienes permiso para modificar este historial")?;

    let repo = WeightRepo::new(&state.pool);
    let entry = repo.get(registro_id).await?;
    if entry.usuario_id != id {
        return Err(ApiError::Forbidden(
            "Este registro no pertenece al usuario especificado",
        ));
    }
    repo.delete(registro_id).await?;
    Ok(message("Registro eliminado correctamente"))
}

/// Weight history routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/users/{id}/weights",
        get(list_weights).post(record_weight).delete(delete_weight),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::common::test_support::{authed, json, send};
    use serde_json::json;

    #[tokio::test]
    async fn missing_weight_is_400() {
        let uri = format!("/users/{}/weights", Uuid::new_v4());
        let (status, body) = send(json("POST", &uri, json!({}), Some("user_1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "El campo peso es obligatorio");
    }

    #[tokio::test]
    async fn negative_weight_is_400() {
        let uri = format!("/users/{}/weights", Uuid::new_v4());
        let (status, _) = send(json("POST", &uri, json!({"peso": -1.5}), Some("user_1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bad_date_is_400() {
        let uri = format!("/users/{}/weights", Uuid::new_v4());
        let (status, _) = send(json("POST", &uri, json!({"peso": 70, "fecha": "ayer"}), Some("user_1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_requires_record_id() {
        let uri = format!("/users/{}/weights", Uuid::new_v4());
        let (status, body) = send(authed("DELETE", &uri, "user_1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "El campo registro_id es obligatorio");
    }

    #[test]
    fn history_serializes_empty_stats() {
        let history = WeightHistory {
            data: vec![],
            estadisticas: weight_stats(&[]),
        };
        let value = serde_json::to_value(history).unwrap();
        assert_eq!(value["estadisticas"]["total_registros"], 0);
        assert!(value["estadisticas"]["peso_actual"].is_null());
    }
}
