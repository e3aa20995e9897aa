//! Command implementations for the yumi binary

pub mod calc;
pub mod migrate;
pub mod seed;
pub mod serve;

pub use calc::run_calc;
pub use migrate::run_migrate;
pub use seed::run_seed;
pub use serve::run_serve;

use anyhow::{Context, Result};
use clap::Args;
use sqlx::PgPool;
use yumi_server::db::create_pool_with_options;

use crate::config::{self, FileConfig};

/// Database connection flags shared by `migrate` and `seed`
#[derive(Args, Debug)]
pub struct DatabaseArgs {
    /// Database URL (overrides config file)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

impl DatabaseArgs {
    pub async fn connect(self) -> Result<PgPool> {
        let file = FileConfig::load()?;
        let url = config::database_url(self.database_url, &file)?;
        let max_connections = config::max_connections(&file)?;
        create_pool_with_options(&url, max_connections)
            .await
            .context("Failed to create database pool")
    }
}
