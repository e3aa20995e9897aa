//! Recipe collections. Private collections are only visible to their owner.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{current_user, ensure_owner, message, optional_user, require, Message};
use crate::db::repos::collections::{Collection, CollectionInput, CollectionRepo, CollectionScope};
use crate::db::repos::recipes::{RecipeFilter, RecipeOrder, RecipeRepo, RecipeSummary};
use crate::db::repos::users::User;
use crate::http::error::ApiError;
use crate::http::extractors::{AuthSubject, MaybeSubject, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::text::{optional, MAX_NAME_LEN, MAX_TEXT_LEN};
use crate::models::{Paginated, PaginationParams};

const VIEW_DENIED: &str = "No tienes permiso para ver esta colección";
const EDIT_DENIED: &str = "No tienes permiso para modificar esta colección";
const DELETE_DENIED: &str = "No tienes permiso para eliminar esta colección";

#[derive(Debug, Default, Deserialize)]
pub struct ListCollectionsQuery {
    pub usuario: Option<Uuid>,
    #[serde(default)]
    pub solo_publicas: bool,
    pub nombre: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CollectionRequest {
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub es_publica: Option<bool>,
}

impl CollectionRequest {
    fn into_input(self) -> Result<CollectionInput, ApiError> {
        let nombre = optional("nombre", self.nombre.as_deref(), MAX_NAME_LEN)?
            .ok_or_else(|| ApiError::bad_request("El nombre de la colección es obligatorio"))?;
        Ok(CollectionInput {
            nombre,
            descripcion: optional("descripcion", self.descripcion.as_deref(), MAX_TEXT_LEN)?,
            es_publica: self.es_publica,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AddRecipeRequest {
    pub receta_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveRecipeQuery {
    pub receta_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct CollectionEntry {
    pub coleccion_id: i32,
    pub receta_id: i32,
    pub fecha_agregado: DateTime<Utc>,
}

/// 401 for anonymous callers and 403 for other users when the collection
/// is private.
fn ensure_visible(collection: &Collection, caller: Option<&User>) -> Result<(), ApiError> {
    if collection.es_publica {
        return Ok(());
    }
    match caller {
        None => Err(ApiError::Unauthorized),
        Some(user) => ensure_owner(Some(collection.usuario_id), user, VIEW_DENIED),
    }
}

/// Load a collection the caller may see.
async fn visible_collection(
    state: &AppState,
    id: i32,
    subject: Option<&str>,
) -> Result<Collection, ApiError> {
    let collection = CollectionRepo::new(&state.pool).get(id).await?;
    if !collection.es_publica {
        let caller = optional_user(state, subject).await?;
        ensure_visible(&collection, caller.as_ref())?;
    }
    Ok(collection)
}

/// GET /collections
async fn list_collections(
    State(state): State<Arc<AppState>>,
    MaybeSubject(subject): MaybeSubject,
    ValidQuery(query): ValidQuery<ListCollectionsQuery>,
) -> Result<Json<Paginated<Collection>>, ApiError> {
    let caller = optional_user(&state, subject.as_deref()).await?;
    let scope = CollectionScope::resolve(query.usuario, query.solo_publicas, caller.map(|u| u.id));
    let nombre = query.nombre.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let page = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .or_default_limit(10);

    let collections = CollectionRepo::new(&state.pool)
        .list(scope, nombre, page)
        .await?;
    Ok(Json(collections))
}

/// POST /collections
async fn create_collection(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidJson(req): ValidJson<CollectionRequest>,
) -> Result<(StatusCode, Json<Collection>), ApiError> {
    let input = req.into_input()?;
    let caller = current_user(&state, &subject).await?;
    let collection = CollectionRepo::new(&state.pool).create(caller.id, input).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

/// GET /collections/{id}
async fn get_collection(
    State(state): State<Arc<AppState>>,
    MaybeSubject(subject): MaybeSubject,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<Collection>, ApiError> {
    Ok(Json(visible_collection(&state, id, subject.as_deref()).await?))
}

/// PUT /collections/{id} - owner only
async fn update_collection(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
    ValidJson(req): ValidJson<CollectionRequest>,
) -> Result<Json<Collection>, ApiError> {
    let input = req.into_input()?;
    let caller = current_user(&state, &subject).await?;
    let repo = CollectionRepo::new(&state.pool);
    let collection = repo.get(id).await?;
    ensure_owner(Some(collection.usuario_id), &caller, EDIT_DENIED)?;
    Ok(Json(repo.update(id, input).await?))
}

/// DELETE /collections/{id} - owner only
async fn delete_collection(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<Message>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    let repo = CollectionRepo::new(&state.pool);
    let collection = repo.get(id).await?;
    ensure_owner(Some(collection.usuario_id), &caller, DELETE_DENIED)?;
    repo.delete(id).await?;
    Ok(message("Colección eliminada correctamente"))
}

/// GET /collections/{id}/recipes
async fn collection_recipes(
    State(state): State<Arc<AppState>>,
    MaybeSubject(subject): MaybeSubject,
    ValidPath(id): ValidPath<i32>,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<RecipeSummary>>, ApiError> {
    visible_collection(&state, id, subject.as_deref()).await?;
    let filter = RecipeFilter {
        coleccion_id: Some(id),
        ..Default::default()
    };
    let recipes = RecipeRepo::new(&state.pool)
        .list(&filter, RecipeOrder::Newest, params.or_default_limit(10))
        .await?;
    Ok(Json(recipes))
}

/// POST /collections/{id}/recipes
async fn add_recipe(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
    ValidJson(req): ValidJson<AddRecipeRequest>,
) -> Result<(StatusCode, Json<CollectionEntry>), ApiError> {
    let receta_id = require("receta_id", req.receta_id)?;
    let caller = current_user(&state, &subject).await?;
    let repo = CollectionRepo::new(&state.pool);
    let collection = repo.get(id).await?;
    ensure_owner(Some(collection.usuario_id), &caller, EDIT_DENIED)?;

    let fecha_agregado = repo.add_recipe(id, receta_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(CollectionEntry {
            coleccion_id: id,
            receta_id,
            fecha_agregado,
        }),
    ))
}

/// DELETE /collections/{id}/recipes?receta_id=
async fn remove_recipe(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
    ValidQuery(query): ValidQuery<RemoveRecipeQuery>,
) -> Result<Json<Message>, ApiError> {
    let receta_id = require("receta_id", query.receta_id)?;
    let caller = current_user(&state, &subject).await?;
    let repo = CollectionRepo::new(&state.pool);
    let collection = repo.get(id).await?;
    ensure_owner(Some(collection.usuario_id), &caller, EDIT_DENIED)?;
    repo.remove_recipe(id, receta_id).await?;
    Ok(message("Receta eliminada de la colección correctamente"))
}

/// Collection routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/collections",
            get(list_collections).post(create_collection),
        )
        .route(
            "/collections/{id}",
            get(get_collection)
                .put(update_collection)
                .delete(delete_collection),
        )
        .route(
            "/collections/{id}/recipes",
            get(collection_recipes)
                .post(add_recipe)
                .delete(remove_recipe),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::common::test_support::{json, send, user};
    use serde_json::json;

    fn collection(owner: Uuid, es_publica: bool) -> Collection {
        Collection {
            id: 1,
            usuario_id: owner,
            nombre: "Cenas rápidas".into(),
            descripcion: None,
            es_publica,
            fecha_creacion: Utc::now(),
            usuario_nombre: None,
            usuario_foto: None,
            recetas_count: 0,
        }
    }

    #[test]
    fn public_collections_are_visible_to_anyone() {
        let c = collection(Uuid::new_v4(), true);
        assert!(ensure_visible(&c, None).is_ok());
    }

    #[test]
    fn private_collection_visibility() {
        let owner = Uuid::new_v4();
        let c = collection(owner, false);
        assert!(matches!(ensure_visible(&c, None), Err(ApiError::Unauthorized)));
        assert!(matches!(
            ensure_visible(&c, Some(&user(Uuid::new_v4()))),
            Err(ApiError::Forbidden(VIEW_DENIED))
        ));
        assert!(ensure_visible(&c, Some(&user(owner))).is_ok());
    }

    #[tokio::test]
    async fn create_requires_name() {
        let (status, body) = send(json("POST", "/collections", json!({"es_publica": true}), Some("user_1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "El nombre de la colección es obligatorio");
    }

    #[tokio::test]
    async fn add_recipe_requires_recipe_id() {
        let (status, _) = send(json("POST", "/collections/4/recipes", json!({}), Some("user_1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
