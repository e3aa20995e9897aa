//! Goal endpoints under /users/{id}/goals

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use super::common::{current_user, ensure_owner, message, Message};
use crate::db::repos::goals::{Goal, GoalChanges, GoalRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthSubject, ValidJson, ValidPath};
use crate::http::server::AppState;
use crate::models::text::positive;
use crate::models::{parse_activity, Purpose, ValidationError};

#[derive(Debug, Default, Deserialize)]
pub struct GoalRequest {
    pub altura: Option<f64>,
    pub peso: Option<f64>,
    pub actividad_diaria: Option<String>,
    pub limite_calorias: Option<i32>,
    pub proposito: Option<String>,
}

impl GoalRequest {
    fn into_changes(self) -> Result<GoalChanges, ValidationError> {
        let limite_calorias = match self.limite_calorias {
            Some(limit) if limit <= 0 => {
                return Err(ValidationError::InvalidFormat {
                    field: "limite_calorias",
                    reason: "debe ser un número positivo",
                })
            }
            other => other,
        };
        Ok(GoalChanges {
            altura: self.altura.map(|v| positive("altura", v)).transpose()?,
            peso: self.peso.map(|v| positive("peso", v)).transpose()?,
            actividad_diaria: self.actividad_diaria.as_deref().map(parse_activity).transpose()?,
            limite_calorias,
            proposito: self.proposito.as_deref().map(Purpose::parse).transpose()?,
        })
    }
}

/// GET /users/{id}/goals
async fn list_goals(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<Vec<Goal>>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    ensure_owner(Some(id), &caller, "No tienes permiso para ver estas metas")?;
    Ok(Json(GoalRepo::new(&state.pool).list(id).await?))
}

/// POST /users/{id}/goals - create or merge; 201 when created
async fn upsert_goal(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<GoalRequest>,
) -> Result<(StatusCode, Json<Goal>), ApiError> {
    let changes = req.into_changes()?;
    let caller = current_user(&state, &subject).await?;
    ensure_owner(Some(id), &caller, "No tienes permiso para modificar estas metas")?;

    let (goal, created) = GoalRepo::new(&state.pool).upsert(id, changes).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(goal)))
}

/// DELETE /users/{id}/goals
async fn delete_goal(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<Message>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    ensure_owner(Some(id), &caller, "No tienes permiso para eliminar estas metas")?;
    GoalRepo::new(&state.pool).delete(id).await?;
    Ok(message("Metas eliminadas correctamente"))
}

/// Goal routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/users/{id}/goals",
        get(list_goals).post(upsert_goal).delete(delete_goal),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::common::test_support::{json, send};
    use serde_json::json;

    #[test]
    fn enum_fields_are_validated() {
        let req = GoalRequest {
            proposito: Some("volar".into()),
            ..Default::default()
        };
        assert!(matches!(
            req.into_changes(),
            Err(ValidationError::InvalidVariant { field: "proposito", .. })
        ));

        let req = GoalRequest {
            actividad_diaria: Some("atleta".into()),
            ..Default::default()
        };
        assert!(req.into_changes().is_err());
    }

    #[test]
    fn valid_goal_converts() {
        let changes = GoalRequest {
            altura: Some(172.0),
            actividad_diaria: Some("moderado".into()),
            proposito: Some("perder_peso".into()),
            limite_calorias: Some(1800),
            ..Default::default()
        }
        .into_changes()
        .unwrap();
        assert_eq!(changes.proposito, Some(Purpose::LoseWeight));
        assert_eq!(changes.actividad_diaria.map(|a| a.as_str()), Some("moderado"));
        assert_eq!(changes.limite_calorias, Some(1800));
    }

    #[test]
    fn non_positive_numbers_are_rejected() {
        let req = GoalRequest {
            peso: Some(-3.0),
            ..Default::default()
        };
        assert!(req.into_changes().is_err());
        let req = GoalRequest {
            limite_calorias: Some(0),
            ..Default::default()
        };
        assert!(req.into_changes().is_err());
    }

    #[tokio::test]
    async fn invalid_goal_is_400_before_user_lookup() {
        let uri = format!("/users/{}/goals", Uuid::new_v4());
        let (status, _) = send(json("POST", &uri, json!({"proposito": "volar"}), Some("user_1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
