//! HTTP server command
//!
//! Applies the schema, wires the identity provider and image store, then
//! serves the API until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use yumi_server::auth::{IdentityProvider, TrustedTokenProvider, UserInfoProvider};
use yumi_server::db::{create_pool_with_options, schema};
use yumi_server::media::{CloudinaryStore, DisabledImageStore, ImageStore};
use yumi_server::{run_server, AppState, ServerConfig};

use crate::config::{FileConfig, ServeSettings};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default: 127.0.0.1:3030)
    #[arg(long, short = 'b', env = "YUMI_BIND")]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL (overrides config file)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Skip schema migrations at startup
    #[arg(long)]
    pub skip_migrations: bool,
}

fn identity_provider(settings: &ServeSettings) -> Arc<dyn IdentityProvider> {
    match &settings.identity_url {
        Some(url) => {
            tracing::info!(url = %url, "Resolving bearer tokens through identity provider");
            Arc::new(UserInfoProvider::new(url.clone()))
        }
        None => {
            tracing::warn!("YUMI_IDENTITY_URL not set: bearer tokens are trusted as subjects (development only)");
            Arc::new(TrustedTokenProvider)
        }
    }
}

fn image_store(settings: &ServeSettings) -> Arc<dyn ImageStore> {
    match &settings.cloudinary {
        Some(config) => {
            tracing::info!(cloud = %config.cloud_name, "Image uploads enabled");
            Arc::new(CloudinaryStore::new(config.clone()))
        }
        None => {
            tracing::warn!("Cloudinary credentials not set: image uploads disabled");
            Arc::new(DisabledImageStore)
        }
    }
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let file = FileConfig::load()?;
    let settings = ServeSettings::resolve(args.database_url, args.bind, args.cors_permissive, &file)?;

    tracing::info!("Starting yumi server on {}", settings.bind);

    let pool = create_pool_with_options(&settings.database_url, settings.max_connections)
        .await
        .context("Failed to create database pool")?;

    if args.skip_migrations {
        tracing::info!("Skipping schema migrations");
    } else {
        schema::run(&pool).await.context("Schema migration failed")?;
    }

    let state = AppState::new(pool, identity_provider(&settings), image_store(&settings));
    let config = ServerConfig {
        bind_addr: settings.bind,
        cors_permissive: settings.cors_permissive,
    };

    // Blocks until shutdown
    run_server(state, config).await.context("Server error")?;

    Ok(())
}
