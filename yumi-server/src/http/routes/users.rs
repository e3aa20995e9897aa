//! User endpoints: directory, profile, self-service updates and identity sync

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{current_user, ensure_owner, message, Message};
use crate::db::repos::goals::{Goal, GoalRepo};
use crate::db::repos::preferences::{PreferenceRepo, UserDiet, UserPreference};
use crate::db::repos::taxonomy::{Color, TaxonomyRepo};
use crate::db::repos::users::{NewUser, PublicUser, User, UserChanges, UserOrder, UserRepo};
use crate::db::repos::weights::{WeightEntry, WeightRepo};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthSubject, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::text::{optional, MAX_NAME_LEN, MAX_URL_LEN};
use crate::models::{Email, Paginated, PaginationParams, ValidationError};

/// Weight entries included in a profile
const PROFILE_WEIGHT_ENTRIES: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub nombre: Option<String>,
    pub email: Option<String>,
    pub ordenar: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub external_id: Option<String>,
    pub email: Option<String>,
    pub nombre: Option<String>,
    pub url_foto_perfil: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub nombre: Option<String>,
    pub color_id: Option<Uuid>,
    pub dark_mode: Option<bool>,
    pub url_foto_perfil: Option<String>,
}

impl UpdateUserRequest {
    fn into_changes(self) -> Result<UserChanges, ValidationError> {
        Ok(UserChanges {
            nombre: optional("nombre", self.nombre.as_deref(), MAX_NAME_LEN)?,
            color_id: self.color_id,
            dark_mode: self.dark_mode,
            url_foto_perfil: optional("url_foto_perfil", self.url_foto_perfil.as_deref(), MAX_URL_LEN)?,
            email: None,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SyncUserRequest {
    pub email: Option<String>,
    pub nombre: Option<String>,
    pub url_foto_perfil: Option<String>,
}

/// Full row for the caller, public fields for anyone else
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UserView {
    Full(User),
    Public(PublicUser),
}

/// A user with everything hanging off their account
#[derive(Debug, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub usuario: User,
    pub color: Option<Color>,
    pub metas: Vec<Goal>,
    pub preferencias: Vec<UserPreference>,
    pub dietas: Vec<UserDiet>,
    pub historial_peso: Vec<WeightEntry>,
}

async fn load_profile(state: &AppState, usuario: User) -> Result<Profile, ApiError> {
    let taxonomy = TaxonomyRepo::new(&state.pool);
    let color = match usuario.color_id {
        Some(id) => Some(taxonomy.get_color(id).await?),
        None => None,
    };

    let goals = GoalRepo::new(&state.pool);
    let preferences = PreferenceRepo::new(&state.pool);
    let weights = WeightRepo::new(&state.pool);
    let (metas, preferencias, dietas, historial_peso) = tokio::try_join!(
        goals.list(usuario.id),
        preferences.list(usuario.id),
        preferences.list_diets(usuario.id),
        weights.list(usuario.id, PROFILE_WEIGHT_ENTRIES),
    )?;

    Ok(Profile {
        usuario,
        color,
        metas,
        preferencias,
        dietas,
        historial_peso,
    })
}

fn parse_new_user(
    external_id: Option<&str>,
    email: Option<&str>,
    nombre: Option<&str>,
    url_foto_perfil: Option<&str>,
) -> Result<NewUser, ApiError> {
    let external_id = external_id.map(str::trim).filter(|s| !s.is_empty());
    let email = email.map(str::trim).filter(|s| !s.is_empty());
    let (Some(external_id), Some(email)) = (external_id, email) else {
        return Err(ApiError::bad_request("external_id y email son obligatorios"));
    };
    Ok(NewUser {
        external_id: external_id.to_owned(),
        email: Email::new(email)?,
        nombre: optional("nombre", nombre, MAX_NAME_LEN)?,
        url_foto_perfil: optional("url_foto_perfil", url_foto_perfil, MAX_URL_LEN)?,
    })
}

/// GET /users - list users with filters
async fn list_users(
    State(state): State<Arc<AppState>>,
    AuthSubject(_): AuthSubject,
    ValidQuery(query): ValidQuery<ListUsersQuery>,
) -> Result<Json<Paginated<User>>, ApiError> {
    let page = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .or_default_limit(20);
    let users = UserRepo::new(&state.pool)
        .list(
            query.nombre.as_deref().filter(|s| !s.trim().is_empty()),
            query.email.as_deref().filter(|s| !s.trim().is_empty()),
            UserOrder::from_param(query.ordenar.as_deref()),
            page,
        )
        .await?;
    Ok(Json(users))
}

/// POST /users - register a user
async fn create_user(
    State(state): State<Arc<AppState>>,
    AuthSubject(_): AuthSubject,
    ValidJson(req): ValidJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let new = parse_new_user(
        req.external_id.as_deref(),
        req.email.as_deref(),
        req.nombre.as_deref(),
        req.url_foto_perfil.as_deref(),
    )?;
    let user = UserRepo::new(&state.pool).create(new).await?;
    tracing::info!(user_id = %user.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /users/{id}
async fn get_user(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<UserView>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    let user = UserRepo::new(&state.pool).get(id).await?;
    if user.id == caller.id {
        Ok(Json(UserView::Full(user)))
    } else {
        Ok(Json(UserView::Public(user.into())))
    }
}

/// PUT /users/{id} - self only
async fn update_user(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let changes = req.into_changes()?;
    let caller = current_user(&state, &subject).await?;
    ensure_owner(Some(id), &caller, "No tienes permiso para modificar este usuario")?;
    let user = UserRepo::new(&state.pool).update(id, changes).await?;
    Ok(Json(user))
}

/// DELETE /users/{id} - self only
async fn delete_user(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<Message>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    ensure_owner(Some(id), &caller, "No tienes permiso para eliminar este usuario")?;
    UserRepo::new(&state.pool).delete(id).await?;
    tracing::info!(user_id = %id, "User deleted");
    Ok(message("Usuario eliminado correctamente"))
}

/// GET /users/me - the caller's profile
async fn get_me(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
) -> Result<Json<Profile>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    Ok(Json(load_profile(&state, caller).await?))
}

/// PATCH /users/me
async fn update_me(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let changes = req.into_changes()?;
    let caller = current_user(&state, &subject).await?;
    let user = UserRepo::new(&state.pool).update(caller.id, changes).await?;
    Ok(Json(user))
}

/// POST /users/sync - create or refresh the caller's row from identity data
async fn sync_me(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidJson(req): ValidJson<SyncUserRequest>,
) -> Result<Json<User>, ApiError> {
    let new = parse_new_user(
        Some(&subject),
        req.email.as_deref(),
        req.nombre.as_deref(),
        req.url_foto_perfil.as_deref(),
    )?;
    let user = UserRepo::new(&state.pool).upsert_by_external_id(new).await?;
    tracing::debug!(user_id = %user.id, "User synced from identity provider");
    Ok(Json(user))
}

fn ensure_same_subject(subject: &str, external_id: &str, message: &'static str) -> Result<(), ApiError> {
    if subject == external_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(message))
    }
}

/// GET /auth/{external_id} - profile by identity subject
async fn get_by_external_id(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(external_id): ValidPath<String>,
) -> Result<Json<Profile>, ApiError> {
    ensure_same_subject(&subject, &external_id, "No tienes permiso para acceder a estos datos")?;
    let user = current_user(&state, &external_id).await?;
    Ok(Json(load_profile(&state, user).await?))
}

/// PATCH /auth/{external_id}
async fn update_by_external_id(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(external_id): ValidPath<String>,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    ensure_same_subject(&subject, &external_id, "No tienes permiso para modificar estos datos")?;
    let changes = req.into_changes()?;
    let user = current_user(&state, &external_id).await?;
    let user = UserRepo::new(&state.pool).update(user.id, changes).await?;
    Ok(Json(user))
}

/// User routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/me", get(get_me).patch(update_me))
        .route("/users/sync", post(sync_me))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route(
            "/auth/{external_id}",
            get(get_by_external_id).patch(update_by_external_id),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::common::test_support::{authed, get as get_req, json, send};
    use serde_json::json;

    #[test]
    fn new_user_requires_external_id_and_email() {
        assert!(parse_new_user(None, Some("a@b.co"), None, None).is_err());
        assert!(parse_new_user(Some("user_1"), Some("  "), None, None).is_err());
        let user = parse_new_user(Some(" user_1 "), Some("A@B.co"), Some(" Ana "), None).unwrap();
        assert_eq!(user.external_id, "user_1");
        assert_eq!(user.email.as_str(), "a@b.co");
        assert_eq!(user.nombre.as_deref(), Some("Ana"));
    }

    #[test]
    fn new_user_rejects_bad_email() {
        let err = parse_new_user(Some("user_1"), Some("no-at-sign"), None, None).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn blank_update_fields_are_ignored() {
        let changes = UpdateUserRequest {
            nombre: Some("   ".into()),
            dark_mode: Some(true),
            ..Default::default()
        }
        .into_changes()
        .unwrap();
        assert!(changes.nombre.is_none());
        assert_eq!(changes.dark_mode, Some(true));
    }

    #[test]
    fn public_view_hides_email() {
        let view = UserView::Public(PublicUser {
            id: Uuid::nil(),
            nombre: Some("Ana".into()),
            url_foto_perfil: None,
        });
        let value = serde_json::to_value(view).unwrap();
        assert!(value.get("email").is_none());
        assert_eq!(value["nombre"], "Ana");
    }

    #[tokio::test]
    async fn listing_requires_auth() {
        let (status, body) = send(get_req("/users")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "No autorizado");
    }

    #[tokio::test]
    async fn create_validates_before_touching_database() {
        let (status, body) = send(json("POST", "/users", json!({"email": "a@b.co"}), Some("user_1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "external_id y email son obligatorios");
    }

    #[tokio::test]
    async fn other_subjects_profile_is_forbidden() {
        let (status, _) = send(authed("GET", "/auth/user_2", "user_1")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn malformed_user_id_is_400() {
        let (status, body) = send(authed("GET", "/users/not-a-uuid", "user_1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "ID no válido");
    }
}
