//! Recipe rating endpoints

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use super::common::{current_user, message, require, Message};
use crate::db::repos::ratings::{Rating, RatingRepo, RatingStats};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthSubject, ValidJson, ValidPath};
use crate::http::server::AppState;
use crate::models::Score;

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub puntuacion: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RatingList {
    pub data: Vec<Rating>,
    pub estadisticas: RatingStats,
}

#[derive(Debug, Serialize)]
pub struct ScoreSummary {
    pub promedio: f64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub puntuacion: i32,
    pub estadisticas: ScoreSummary,
}

/// GET /recipes/{id}/ratings
async fn list_ratings(
    State(state): State<Arc<AppState>>,
    ValidPath(receta_id): ValidPath<i32>,
) -> Result<Json<RatingList>, ApiError> {
    let repo = RatingRepo::new(&state.pool);
    let data = repo.list(receta_id).await?;
    let estadisticas = repo.stats(receta_id).await?;
    Ok(Json(RatingList { data, estadisticas }))
}

/// POST /recipes/{id}/ratings - 201 on first rating, 200 on change
async fn rate_recipe(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(receta_id): ValidPath<i32>,
    ValidJson(req): ValidJson<RateRequest>,
) -> Result<(StatusCode, Json<RateResponse>), ApiError> {
    let score = Score::new(require("puntuacion", req.puntuacion)?)
        .map_err(|_| ApiError::bad_request("La puntuación debe ser un número entre 1 y 5"))?;
    let caller = current_user(&state, &subject).await?;

    let repo = RatingRepo::new(&state.pool);
    let (puntuacion, created) = repo.upsert(receta_id, caller.id, score).await?;
    let stats = repo.stats(receta_id).await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(RateResponse {
            puntuacion,
            estadisticas: ScoreSummary {
                promedio: stats.promedio,
                total: stats.total,
            },
        }),
    ))
}

/// DELETE /recipes/{id}/ratings - remove the caller's rating
async fn delete_rating(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(receta_id): ValidPath<i32>,
) -> Result<Json<Message>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    RatingRepo::new(&state.pool)
        .delete(receta_id, caller.id)
        .await?;
    Ok(message("Puntuación eliminada correctamente"))
}

/// Rating routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/recipes/{id}/ratings",
        get(list_ratings).post(rate_recipe).delete(delete_rating),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::common::test_support::{json, send};
    use serde_json::json;

    #[tokio::test]
    async fn score_out_of_range_is_400() {
        for score in [0, 6, -1] {
            let (status, body) = send(json(
                "POST",
                "/recipes/1/ratings",
                json!({"puntuacion": score}),
                Some("user_1"),
            ))
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "La puntuación debe ser un número entre 1 y 5");
        }
    }

    #[tokio::test]
    async fn missing_score_is_400() {
        let (status, _) = send(json("POST", "/recipes/1/ratings", json!({}), Some("user_1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn fractional_score_is_rejected() {
        let (status, _) = send(json(
            "POST",
            "/recipes/1/ratings",
            json!({"puntuacion": 4.5}),
            Some("user_1"),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
