//! Shopping lists generated from meal plans. Owner only.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::common::{current_user, ensure_owner, message, require, Message};
use crate::db::repos::shopping_lists::{ShoppingList, ShoppingListItem, ShoppingListRepo};
use crate::db::repos::users::User;
use crate::http::error::ApiError;
use crate::http::extractors::{AuthSubject, ValidJson, ValidPath};
use crate::http::server::AppState;

const DENIED: &str = "No tienes permiso para acceder a esta lista";

#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub comprado: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ShoppingListDetail {
    #[serde(flatten)]
    pub lista: ShoppingList,
    pub items: Vec<ShoppingListItem>,
}

async fn owned_list(state: &AppState, id: i32, caller: &User) -> Result<ShoppingList, ApiError> {
    let list = ShoppingListRepo::new(&state.pool).get(id).await?;
    ensure_owner(Some(list.usuario_id), caller, DENIED)?;
    Ok(list)
}

/// GET /shopping-lists
async fn list_lists(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
) -> Result<Json<Vec<ShoppingList>>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    Ok(Json(ShoppingListRepo::new(&state.pool).list(caller.id).await?))
}

/// GET /shopping-lists/{id}
async fn get_list(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<ShoppingListDetail>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    let lista = owned_list(&state, id, &caller).await?;
    let items = ShoppingListRepo::new(&state.pool).items(id).await?;
    Ok(Json(ShoppingListDetail { lista, items }))
}

/// PATCH /shopping-lists/{id}/items/{item_id}
async fn update_item(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath((id, item_id)): ValidPath<(i32, i32)>,
    ValidJson(req): ValidJson<ItemRequest>,
) -> Result<Json<ShoppingListItem>, ApiError> {
    let comprado = require("comprado", req.comprado)?;
    let caller = current_user(&state, &subject).await?;
    owned_list(&state, id, &caller).await?;
    let item = ShoppingListRepo::new(&state.pool)
        .set_bought(id, item_id, comprado)
        .await?;
    Ok(Json(item))
}

/// DELETE /shopping-lists/{id}
async fn delete_list(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<Message>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    owned_list(&state, id, &caller).await?;
    ShoppingListRepo::new(&state.pool).delete(id).await?;
    Ok(message("Lista de compras eliminada correctamente"))
}

/// Shopping list routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/shopping-lists", get(list_lists))
        .route("/shopping-lists/{id}", get(get_list).delete(delete_list))
        .route("/shopping-lists/{id}/items/{item_id}", patch(update_item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::routes::common::test_support::{get, json, send};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn lists_require_auth() {
        let (status, _) = send(get("/shopping-lists")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn item_update_requires_flag() {
        let (status, _) = send(json(
            "PATCH",
            "/shopping-lists/1/items/2",
            json!({}),
            Some("user_1"),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
