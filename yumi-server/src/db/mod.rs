//! Database layer - connection pool, schema, seed data and repositories
//!
//! # Design Principles
//!
//! - Connection pool, never a shared connection behind a mutex
//! - List operations use JOINs and `COUNT(*) OVER()`, no N+1 queries
//! - Uniqueness is enforced by constraints; violations become 409s
//! - Transactions for multi-step writes

pub mod pool;
pub mod repos;
pub mod schema;
pub mod seed;

pub use pool::{create_pool, create_pool_with_options};
pub use repos::*;
