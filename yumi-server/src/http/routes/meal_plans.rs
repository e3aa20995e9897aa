//! Meal plans: date-ranged plans owned by one user, with one recipe per
//! date and meal slot.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::common::{current_user, ensure_owner, message, require, Message};
use crate::db::repos::meal_plans::{
    default_plan_name, EntryRange, MealPlan, MealPlanEntry, MealPlanFilter, MealPlanRepo, NewEntry,
};
use crate::db::repos::shopping_lists::{ShoppingList, ShoppingListRepo};
use crate::db::repos::users::User;
use crate::http::error::ApiError;
use crate::http::extractors::{AuthSubject, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::text::{optional, MAX_NAME_LEN};
use crate::models::{parse_date, parse_optional, MealType};

const VIEW_DENIED: &str = "No tienes permiso para ver este plan";
const EDIT_DENIED: &str = "No tienes permiso para modificar este plan";
const DELETE_DENIED: &str = "No tienes permiso para eliminar este plan";
const END_BEFORE_START: &str = "La fecha de fin debe ser posterior a la fecha de inicio";

#[derive(Debug, Default, Deserialize)]
pub struct ListPlansQuery {
    pub desde: Option<String>,
    pub hasta: Option<String>,
    #[serde(default)]
    pub activos: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlanRequest {
    pub nombre: Option<String>,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
}

/// Parsed plan fields; every one optional until merged.
struct PlanFields {
    nombre: Option<String>,
    fecha_inicio: Option<NaiveDate>,
    fecha_fin: Option<NaiveDate>,
}

impl PlanRequest {
    fn parse(&self) -> Result<PlanFields, ApiError> {
        Ok(PlanFields {
            nombre: optional("nombre", self.nombre.as_deref(), MAX_NAME_LEN)?,
            fecha_inicio: parse_optional("fecha_inicio", self.fecha_inicio.as_deref(), parse_date)?,
            fecha_fin: parse_optional("fecha_fin", self.fecha_fin.as_deref(), parse_date)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EntriesQuery {
    pub desde: Option<String>,
    pub hasta: Option<String>,
    pub tipo_comida: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EntryRequest {
    pub fecha: Option<String>,
    pub receta_id: Option<i32>,
    pub tipo_comida: Option<String>,
    pub porciones: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveEntryQuery {
    pub detalle_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShoppingListRequest {
    pub nombre: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlanDetail {
    #[serde(flatten)]
    pub plan: MealPlan,
    pub detalles: Vec<MealPlanEntry>,
}

fn meal_type(value: &str) -> Result<MealType, ApiError> {
    MealType::parse(value).map_err(|_| ApiError::bad_request("Tipo de comida no válido"))
}

impl EntryRequest {
    /// Validate against the plan it is added to.
    fn into_entry(self, plan: &MealPlan) -> Result<NewEntry, ApiError> {
        let (Some(fecha), Some(receta_id), Some(tipo_comida)) =
            (self.fecha.as_deref(), self.receta_id, self.tipo_comida.as_deref())
        else {
            return Err(ApiError::bad_request(
                "Fecha, receta_id y tipo_comida son obligatorios",
            ));
        };
        let fecha = parse_date("fecha", fecha)?;
        if !plan.covers(fecha) {
            return Err(ApiError::bad_request(
                "La fecha debe estar dentro del rango del plan de comidas",
            ));
        }
        let porciones = self.porciones.unwrap_or(1);
        if porciones < 1 {
            return Err(ApiError::bad_request("Las porciones deben ser al menos 1"));
        }
        Ok(NewEntry {
            receta_id,
            fecha,
            tipo_comida: meal_type(tipo_comida)?,
            porciones,
        })
    }
}

/// Load a plan and check the caller owns it.
async fn owned_plan(
    state: &AppState,
    id: i32,
    caller: &User,
    denied: &'static str,
) -> Result<MealPlan, ApiError> {
    let plan = MealPlanRepo::new(&state.pool).get(id).await?;
    ensure_owner(Some(plan.usuario_id), caller, denied)?;
    Ok(plan)
}

/// GET /meal-plans
async fn list_plans(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidQuery(query): ValidQuery<ListPlansQuery>,
) -> Result<Json<Vec<MealPlan>>, ApiError> {
    let filter = MealPlanFilter {
        desde: parse_optional("desde", query.desde.as_deref(), parse_date)?,
        hasta: parse_optional("hasta", query.hasta.as_deref(), parse_date)?,
        activos: query.activos,
    };
    let caller = current_user(&state, &subject).await?;
    Ok(Json(MealPlanRepo::new(&state.pool).list(caller.id, &filter).await?))
}

/// POST /meal-plans
async fn create_plan(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidJson(req): ValidJson<PlanRequest>,
) -> Result<(StatusCode, Json<MealPlan>), ApiError> {
    let fields = req.parse()?;
    let (Some(inicio), Some(fin)) = (fields.fecha_inicio, fields.fecha_fin) else {
        return Err(ApiError::bad_request("Fecha de inicio y fin son obligatorias"));
    };
    if fin < inicio {
        return Err(ApiError::bad_request(END_BEFORE_START));
    }
    let nombre = fields
        .nombre
        .unwrap_or_else(|| default_plan_name(inicio, fin));

    let caller = current_user(&state, &subject).await?;
    let plan = MealPlanRepo::new(&state.pool)
        .create(caller.id, &nombre, inicio, fin)
        .await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// GET /meal-plans/{id} - plan with all its entries
async fn get_plan(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<PlanDetail>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    let plan = owned_plan(&state, id, &caller, VIEW_DENIED).await?;
    let detalles = MealPlanRepo::new(&state.pool)
        .entries(id, EntryRange::All, None)
        .await?;
    Ok(Json(PlanDetail { plan, detalles }))
}

/// PUT /meal-plans/{id} - partial; the merged range must stay ordered
async fn update_plan(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
    ValidJson(req): ValidJson<PlanRequest>,
) -> Result<Json<MealPlan>, ApiError> {
    let fields = req.parse()?;
    let caller = current_user(&state, &subject).await?;
    let plan = owned_plan(&state, id, &caller, EDIT_DENIED).await?;

    let inicio = fields.fecha_inicio.unwrap_or(plan.fecha_inicio);
    let fin = fields.fecha_fin.unwrap_or(plan.fecha_fin);
    if fin < inicio {
        return Err(ApiError::bad_request(END_BEFORE_START));
    }
    let nombre = fields.nombre.unwrap_or(plan.nombre);
    let updated = MealPlanRepo::new(&state.pool)
        .update(id, &nombre, inicio, fin)
        .await?;
    Ok(Json(updated))
}

/// DELETE /meal-plans/{id}
async fn delete_plan(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<Message>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    owned_plan(&state, id, &caller, DELETE_DENIED).await?;
    MealPlanRepo::new(&state.pool).delete(id).await?;
    Ok(message("Plan de comidas eliminado correctamente"))
}

/// GET /meal-plans/{id}/entries
async fn list_entries(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
    ValidQuery(query): ValidQuery<EntriesQuery>,
) -> Result<Json<Vec<MealPlanEntry>>, ApiError> {
    let range = EntryRange::from_params(
        parse_optional("desde", query.desde.as_deref(), parse_date)?,
        parse_optional("hasta", query.hasta.as_deref(), parse_date)?,
    );
    let tipo = match query.tipo_comida.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => Some(meal_type(t)?),
        None => None,
    };
    let caller = current_user(&state, &subject).await?;
    owned_plan(&state, id, &caller, VIEW_DENIED).await?;
    Ok(Json(MealPlanRepo::new(&state.pool).entries(id, range, tipo).await?))
}

/// POST /meal-plans/{id}/entries
async fn add_entry(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
    ValidJson(req): ValidJson<EntryRequest>,
) -> Result<(StatusCode, Json<MealPlanEntry>), ApiError> {
    let caller = current_user(&state, &subject).await?;
    let plan = owned_plan(&state, id, &caller, EDIT_DENIED).await?;
    let entry = req.into_entry(&plan)?;
    let created = MealPlanRepo::new(&state.pool).add_entry(id, entry).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// DELETE /meal-plans/{id}/entries?detalle_id=
async fn remove_entry(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
    ValidQuery(query): ValidQuery<RemoveEntryQuery>,
) -> Result<Json<Message>, ApiError> {
    let detalle_id = require("detalle_id", query.detalle_id)?;
    let caller = current_user(&state, &subject).await?;
    owned_plan(&state, id, &caller, EDIT_DENIED).await?;
    MealPlanRepo::new(&state.pool).remove_entry(id, detalle_id).await?;
    Ok(message("Detalle eliminado correctamente"))
}

/// POST /meal-plans/{id}/shopping-list
async fn generate_shopping_list(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
    ValidJson(req): ValidJson<ShoppingListRequest>,
) -> Result<(StatusCode, Json<ShoppingList>), ApiError> {
    let nombre = optional("nombre", req.nombre.as_deref(), MAX_NAME_LEN)?;
    let caller = current_user(&state, &subject).await?;
    let plan = owned_plan(&state, id, &caller, VIEW_DENIED).await?;
    let nombre = nombre.unwrap_or_else(|| format!("Lista de compras - {}", plan.nombre));

    let list = ShoppingListRepo::new(&state.pool)
        .generate_from_plan(caller.id, id, &nombre)
        .await?;
    Ok((StatusCode::CREATED, Json(list)))
}

/// Meal plan routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/meal-plans", get(list_plans).post(create_plan))
        .route(
            "/meal-plans/{id}",
            get(get_plan).put(update_plan).delete(delete_plan),
        )
        .route(
            "/meal-plans/{id}/entries",
            get(list_entries).post(add_entry).delete(remove_entry),
        )
        .route("/meal-plans/{id}/shopping-list", post(generate_shopping_list))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::common::test_support::{json, send};
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn plan() -> MealPlan {
        MealPlan {
            id: 1,
            usuario_id: Uuid::nil(),
            nombre: "Semana ligera".into(),
            fecha_inicio: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            fecha_fin: NaiveDate::from_ymd_opt(2024, 6, 9).unwrap(),
            fecha_creacion: Utc::now(),
        }
    }

    fn entry(fecha: &str, tipo: &str) -> EntryRequest {
        EntryRequest {
            fecha: Some(fecha.into()),
            receta_id: Some(7),
            tipo_comida: Some(tipo.into()),
            porciones: None,
        }
    }

    fn bad_request(result: Result<NewEntry, ApiError>) -> String {
        match result {
            Err(ApiError::BadRequest(msg)) => msg,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn entry_inside_plan() {
        let new = entry("2024-06-05", "Cena").into_entry(&plan()).unwrap();
        assert_eq!(new.tipo_comida, MealType::Dinner);
        assert_eq!(new.porciones, 1);
    }

    #[test]
    fn entry_outside_plan_is_rejected() {
        assert_eq!(
            bad_request(entry("2024-06-10", "cena").into_entry(&plan())),
            "La fecha debe estar dentro del rango del plan de comidas"
        );
    }

    #[test]
    fn entry_requires_all_fields() {
        let req = EntryRequest {
            fecha: Some("2024-06-05".into()),
            ..Default::default()
        };
        assert_eq!(
            bad_request(req.into_entry(&plan())),
            "Fecha, receta_id y tipo_comida son obligatorios"
        );
    }

    #[test]
    fn unknown_meal_type_is_rejected() {
        assert_eq!(
            bad_request(entry("2024-06-05", "brunch").into_entry(&plan())),
            "Tipo de comida no válido"
        );
    }

    #[tokio::test]
    async fn create_requires_both_dates() {
        let (status, body) = send(json(
            "POST",
            "/meal-plans",
            json!({"fecha_inicio": "2024-06-03"}),
            Some("user_1"),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Fecha de inicio y fin son obligatorias");
    }

    #[tokio::test]
    async fn create_rejects_reversed_range() {
        let (status, body) = send(json(
            "POST",
            "/meal-plans",
            json!({"fecha_inicio": "2024-06-09", "fecha_fin": "2024-06-03"}),
            Some("user_1"),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], END_BEFORE_START);
    }
}
