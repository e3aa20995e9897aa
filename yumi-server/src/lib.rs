//! yumi-server: REST API for the yumi recipe community
//!
//! Users, recipes with their social layer (comments, ratings, attempts,
//! tips), collections, events, meal plans and shopping lists, backed by
//! PostgreSQL. Identity and image storage sit behind traits so the server
//! can run against the hosted providers or local stand-ins.

pub mod auth;
pub mod db;
pub mod http;
pub mod media;
pub mod models;

pub use http::{build_router, run_server, ApiError, AppState, ServerConfig, ServerError};
