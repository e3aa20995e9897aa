//! Community events and registrations

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{current_user, ensure_owner, message, optional_user, Message};
use crate::db::repos::events::{Event, EventFilter, EventInput, EventRepo, Participant, Registration};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthSubject, MaybeSubject, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::text::{optional, MAX_TEXT_LEN, MAX_TITLE_LEN, MAX_URL_LEN};
use crate::models::{
    parse_datetime, parse_optional, Paginated, PaginationParams, ParticipationStatus,
    ValidationError,
};

#[derive(Debug, Default, Deserialize)]
pub struct ListEventsQuery {
    pub titulo: Option<String>,
    pub desde: Option<String>,
    pub hasta: Option<String>,
    pub es_virtual: Option<bool>,
    pub creador: Option<Uuid>,
    #[serde(default)]
    pub solo_futuros: bool,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListEventsQuery {
    fn filter(&self) -> Result<EventFilter, ValidationError> {
        Ok(EventFilter {
            titulo: optional("titulo", self.titulo.as_deref(), MAX_TITLE_LEN)?,
            desde: parse_optional("desde", self.desde.as_deref(), parse_datetime)?,
            hasta: parse_optional("hasta", self.hasta.as_deref(), parse_datetime)?,
            es_virtual: self.es_virtual,
            creador: self.creador,
            solo_futuros: self.solo_futuros,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EventRequest {
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
    pub ubicacion: Option<String>,
    pub es_virtual: Option<bool>,
    pub enlace_virtual: Option<String>,
    pub imagen_url: Option<String>,
    pub capacidad_maxima: Option<i32>,
}

/// Whether a start date in the past is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartRule {
    MustBeFuture,
    Any,
}

impl EventRequest {
    fn into_input(self, rule: StartRule, now: DateTime<Utc>) -> Result<EventInput, ApiError> {
        let titulo = optional("titulo", self.titulo.as_deref(), MAX_TITLE_LEN)?;
        let fecha_inicio = parse_optional("fecha_inicio", self.fecha_inicio.as_deref(), parse_datetime)?;
        let (Some(titulo), Some(fecha_inicio)) = (titulo, fecha_inicio) else {
            return Err(ApiError::bad_request(
                "Título y fecha de inicio son obligatorios",
            ));
        };
        if rule == StartRule::MustBeFuture && fecha_inicio <= now {
            return Err(ApiError::bad_request("La fecha de inicio debe ser futura"));
        }

        let fecha_fin = parse_optional("fecha_fin", self.fecha_fin.as_deref(), parse_datetime)?;
        if fecha_fin.is_some_and(|fin| fin < fecha_inicio) {
            return Err(ApiError::bad_request(
                "La fecha de fin debe ser posterior a la fecha de inicio",
            ));
        }
        if self.capacidad_maxima.is_some_and(|c| c < 1) {
            return Err(ValidationError::OutOfRange {
                field: "capacidad_maxima",
                min: 1,
                max: i64::from(i32::MAX),
            }
            .into());
        }

        Ok(EventInput {
            titulo,
            descripcion: optional("descripcion", self.descripcion.as_deref(), MAX_TEXT_LEN)?,
            fecha_inicio,
            fecha_fin,
            ubicacion: optional("ubicacion", self.ubicacion.as_deref(), MAX_TITLE_LEN)?,
            es_virtual: self.es_virtual.unwrap_or(false),
            enlace_virtual: optional("enlace_virtual", self.enlace_virtual.as_deref(), MAX_URL_LEN)?,
            imagen_url: optional("imagen_url", self.imagen_url.as_deref(), MAX_URL_LEN)?,
            capacidad_maxima: self.capacidad_maxima,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ParticipantsQuery {
    pub estado: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub estado: Option<String>,
}

/// Event plus the caller's participation when authenticated
#[derive(Debug, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub evento: Event,
    pub esta_participando: bool,
    pub estado_participacion: Option<String>,
}

fn parse_status(value: Option<&str>) -> Result<Option<ParticipationStatus>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => ParticipationStatus::parse(v)
            .map(Some)
            .map_err(|_| ApiError::bad_request("Estado inválido")),
        None => Ok(None),
    }
}

/// GET /events
async fn list_events(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<ListEventsQuery>,
) -> Result<Json<Paginated<Event>>, ApiError> {
    let filter = query.filter()?;
    let page = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .or_default_limit(10);
    Ok(Json(EventRepo::new(&state.pool).list(&filter, page).await?))
}

/// POST /events
async fn create_event(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidJson(req): ValidJson<EventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let input = req.into_input(StartRule::MustBeFuture, Utc::now())?;
    let caller = current_user(&state, &subject).await?;
    let event = EventRepo::new(&state.pool).create(caller.id, input).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /events/{id}
async fn get_event(
    State(state): State<Arc<AppState>>,
    MaybeSubject(subject): MaybeSubject,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<EventDetail>, ApiError> {
    let repo = EventRepo::new(&state.pool);
    let evento = repo.get(id).await?;

    let participation = match optional_user(&state, subject.as_deref()).await? {
        Some(caller) => repo.participation(id, caller.id).await?,
        None => None,
    };
    Ok(Json(EventDetail {
        evento,
        esta_participando: participation.is_some(),
        estado_participacion: participation.map(|p| p.estado),
    }))
}

/// PUT /events/{id} - creator only
async fn update_event(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
    ValidJson(req): ValidJson<EventRequest>,
) -> Result<Json<Event>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    let repo = EventRepo::new(&state.pool);
    let event = repo.get(id).await?;
    ensure_owner(
        event.creador_id,
        &caller,
        "No tienes permiso para modificar este evento",
    )?;
    let input = req.into_input(StartRule::Any, Utc::now())?;
    Ok(Json(repo.update(id, input).await?))
}

/// DELETE /events/{id} - creator only
async fn delete_event(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<Message>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    let repo = EventRepo::new(&state.pool);
    let event = repo.get(id).await?;
    ensure_owner(
        event.creador_id,
        &caller,
        "No tienes permiso para eliminar este evento",
    )?;
    repo.delete(id).await?;
    Ok(message("Evento eliminado correctamente"))
}

/// GET /events/{id}/participants
async fn list_participants(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<i32>,
    ValidQuery(query): ValidQuery<ParticipantsQuery>,
) -> Result<Json<Paginated<Participant>>, ApiError> {
    let estado = parse_status(query.estado.as_deref())?;
    let page = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .or_default_limit(20);

    let repo = EventRepo::new(&state.pool);
    repo.get(id).await?;
    Ok(Json(repo.participants(id, estado, page).await?))
}

/// POST /events/{id}/participants - register the caller
async fn register(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Participant>), ApiError> {
    let estado = parse_status(req.estado.as_deref())?.unwrap_or(ParticipationStatus::Confirmed);
    let caller = current_user(&state, &subject).await?;

    match EventRepo::new(&state.pool).register(id, caller.id, estado).await? {
        Registration::Registered(participant) => {
            tracing::info!(evento_id = id, usuario_id = %caller.id, "Registered for event");
            Ok((StatusCode::CREATED, Json(participant)))
        }
        Registration::Started => Err(ApiError::bad_request("El evento ya inició o finalizó")),
        Registration::Full => Err(ApiError::bad_request("Evento lleno")),
    }
}

/// DELETE /events/{id}/participants - cancel the caller's registration
async fn unregister(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<Message>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    EventRepo::new(&state.pool).unregister(id, caller.id).await?;
    Ok(message("Participación cancelada"))
}

/// Event routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route(
            "/events/{id}/participants",
            get(list_participants).post(register).delete(unregister),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::common::test_support::{get, json, send};
    use chrono::Duration;
    use serde_json::json;

    fn request(start: &str, end: Option<&str>) -> EventRequest {
        EventRequest {
            titulo: Some("Taller de pan".into()),
            fecha_inicio: Some(start.into()),
            fecha_fin: end.map(Into::into),
            ..Default::default()
        }
    }

    fn bad_request_message(result: Result<EventInput, ApiError>) -> String {
        match result {
            Err(ApiError::BadRequest(msg)) => msg,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn start_must_be_future_on_create() {
        let now = Utc::now();
        let past = (now - Duration::days(1)).to_rfc3339();
        assert_eq!(
            bad_request_message(request(&past, None).into_input(StartRule::MustBeFuture, now)),
            "La fecha de inicio debe ser futura"
        );
        assert!(request(&past, None).into_input(StartRule::Any, now).is_ok());
    }

    #[test]
    fn end_before_start_is_rejected() {
        let now = Utc::now();
        let start = (now + Duration::days(2)).to_rfc3339();
        let end = (now + Duration::days(1)).to_rfc3339();
        assert_eq!(
            bad_request_message(request(&start, Some(&end)).into_input(StartRule::MustBeFuture, now)),
            "La fecha de fin debe ser posterior a la fecha de inicio"
        );
    }

    #[test]
    fn title_and_start_are_required() {
        let req = EventRequest {
            titulo: Some("Cata".into()),
            ..Default::default()
        };
        assert_eq!(
            bad_request_message(req.into_input(StartRule::Any, Utc::now())),
            "Título y fecha de inicio son obligatorios"
        );
    }

    #[test]
    fn defaults_to_in_person() {
        let now = Utc::now();
        let start = (now + Duration::days(3)).to_rfc3339();
        let input = request(&start, None).into_input(StartRule::MustBeFuture, now).unwrap();
        assert!(!input.es_virtual);
        assert_eq!(input.titulo, "Taller de pan");
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let now = Utc::now();
        let start = (now + Duration::days(3)).to_rfc3339();
        let mut req = request(&start, None);
        req.capacidad_maxima = Some(0);
        assert!(matches!(
            req.into_input(StartRule::MustBeFuture, now),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn status_parsing() {
        assert_eq!(parse_status(None).unwrap(), None);
        assert_eq!(
            parse_status(Some("Pendiente")).unwrap(),
            Some(ParticipationStatus::Pending)
        );
        assert!(matches!(parse_status(Some("quizás")), Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn invalid_status_is_400() {
        let (status, body) = send(json(
            "POST",
            "/events/1/participants",
            json!({"estado": "tal vez"}),
            Some("user_1"),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Estado inválido");
    }

    #[tokio::test]
    async fn bad_date_filter_is_400() {
        let (status, _) = send(get("/events?desde=ayer")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
