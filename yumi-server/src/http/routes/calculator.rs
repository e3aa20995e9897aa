//! Nutrition calculators. All but `calories` (by recipe) and `convert` are
//! pure and never touch the database.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use yumi_core::{
    convert, estimate, estimate_recipe, ideal_weight, summarize, CalorieLine, CalorieSummary,
    Converted, EnergyEstimate, EnergyInput, IdealWeight, IngredientLine, RecipeNutrition, Sex,
};

use super::common::require;
use crate::db::repos::ingredients::IngredientRepo;
use crate::db::repos::recipes::RecipeRepo;
use crate::db::repos::taxonomy::TaxonomyRepo;
use crate::http::error::ApiError;
use crate::http::extractors::ValidJson;
use crate::http::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CaloriesRequest {
    pub receta_id: Option<i32>,
    pub ingredientes: Option<Vec<CalorieLine>>,
    pub porciones: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipeEstimateRequest {
    pub ingredientes: Option<Vec<IngredientLine>>,
    pub porciones: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConvertRequest {
    pub cantidad: Option<f64>,
    pub desde: Option<String>,
    pub hacia: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IdealWeightRequest {
    pub altura: Option<f64>,
    pub sexo: Option<String>,
}

/// POST /calculator/calories - by stored recipe or by submitted lines
async fn calories(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<CaloriesRequest>,
) -> Result<Json<CalorieSummary>, ApiError> {
    if let Some(receta_id) = req.receta_id {
        let portions = RecipeRepo::new(&state.pool).portions(receta_id).await?;
        let ingredients = IngredientRepo::new(&state.pool).list(receta_id).await?;
        let lines: Vec<CalorieLine> = ingredients.iter().map(CalorieLine::from).collect();
        let portions = portions.and_then(|p| u32::try_from(p).ok());
        return Ok(Json(summarize(&lines, portions)));
    }

    match req.ingredientes {
        Some(lines) => Ok(Json(summarize(&lines, req.porciones))),
        None => Err(ApiError::bad_request(
            "Se requiere receta_id o lista de ingredientes",
        )),
    }
}

/// POST /calculator/recipe - nutrition estimate from ingredient names
async fn recipe_nutrition(
    ValidJson(req): ValidJson<RecipeEstimateRequest>,
) -> Result<Json<RecipeNutrition>, ApiError> {
    let lines = req
        .ingredientes
        .ok_or_else(|| ApiError::bad_request("Se requiere un array de ingredientes"))?;
    Ok(Json(estimate_recipe(&lines, req.porciones.unwrap_or(1))?))
}

/// POST /calculator/daily
async fn daily(ValidJson(input): ValidJson<EnergyInput>) -> Result<Json<EnergyEstimate>, ApiError> {
    Ok(Json(estimate(&input)?))
}

/// POST /calculator/convert
async fn convert_units(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<ConvertRequest>,
) -> Result<Json<Converted>, ApiError> {
    let cantidad = require("cantidad", req.cantidad)?;
    let desde = require("desde", req.desde)?;
    let hacia = require("hacia", req.hacia)?;
    let table = TaxonomyRepo::new(&state.pool).conversion_table().await?;
    Ok(Json(convert(&table, cantidad, &desde, &hacia)?))
}

/// POST /calculator/ideal-weight
async fn ideal(ValidJson(req): ValidJson<IdealWeightRequest>) -> Result<Json<IdealWeight>, ApiError> {
    let altura = require("altura", req.altura)?;
    let sexo: Sex = require("sexo", req.sexo)?.parse()?;
    Ok(Json(ideal_weight(altura, sexo)?))
}

/// Calculator routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/calculator/calories", post(calories))
        .route("/calculator/recipe", post(recipe_nutrition))
        .route("/calculator/daily", post(daily))
        .route("/calculator/convert", post(convert_units))
        .route("/calculator/ideal-weight", post(ideal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::common::test_support::{json, send};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn calories_from_submitted_lines() {
        let (status, body) = send(json(
            "POST",
            "/calculator/calories",
            json!({
                "ingredientes": [
                    {"cantidad": 2.0, "calorias_por_unidad": 100.0},
                    {"cantidad": 1.0, "calorias_por_unidad": 50.0}
                ],
                "porciones": 2
            }),
            None,
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_calorias"], 250.0);
        assert_eq!(body["calorias_por_porcion"], 125.0);
        assert_eq!(body["porciones"], 2);
    }

    #[tokio::test]
    async fn calories_needs_some_input() {
        let (status, body) = send(json("POST", "/calculator/calories", json!({}), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Se requiere receta_id o lista de ingredientes");
    }

    #[tokio::test]
    async fn recipe_estimate_matches_known_food() {
        let (status, body) = send(json(
            "POST",
            "/calculator/recipe",
            json!({
                "ingredientes": [{"nombre": "Arroz blanco", "cantidad": 200.0, "unidad": "g"}],
                "porciones": 2
            }),
            None,
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"]["calorias"], 260.0);
        assert_eq!(body["por_porcion"]["calorias"], 130.0);
    }

    #[tokio::test]
    async fn recipe_estimate_requires_array() {
        let (status, body) = send(json("POST", "/calculator/recipe", json!({}), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Se requiere un array de ingredientes");
    }

    #[tokio::test]
    async fn recipe_estimate_accepts_empty_list() {
        let (status, body) = send(json(
            "POST",
            "/calculator/recipe",
            json!({"ingredientes": []}),
            None,
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"]["calorias"], 0.0);
        assert_eq!(body["por_porcion"]["calorias"], 0.0);
        assert_eq!(body["ingredientes"], json!([]));
    }

    #[tokio::test]
    async fn daily_estimate() {
        let (status, body) = send(json(
            "POST",
            "/calculator/daily",
            json!({
                "peso": 70.0,
                "altura": 175.0,
                "edad": 30,
                "sexo": "masculino",
                "actividad": "moderado",
                "objetivo": "mantener"
            }),
            None,
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["tmb"].as_f64().unwrap() > 1600.0);
        assert!(body["mantenimiento"].as_f64().unwrap() > body["tmb"].as_f64().unwrap());
    }

    #[tokio::test]
    async fn daily_rejects_unknown_activity() {
        let (status, _) = send(json(
            "POST",
            "/calculator/daily",
            json!({
                "peso": 70.0,
                "altura": 175.0,
                "edad": 30,
                "sexo": "masculino",
                "actividad": "extremo",
                "objetivo": "mantener"
            }),
            None,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ideal_weight_for_female() {
        let (status, body) = send(json(
            "POST",
            "/calculator/ideal-weight",
            json!({"altura": 165.0, "sexo": "femenino"}),
            None,
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["peso_ideal"].as_f64().unwrap() > 55.0);
        assert!(body["rango_saludable"].is_array());
    }

    #[tokio::test]
    async fn ideal_weight_rejects_unknown_sex() {
        let (status, _) = send(json(
            "POST",
            "/calculator/ideal-weight",
            json!({"altura": 165.0, "sexo": "x"}),
            None,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
