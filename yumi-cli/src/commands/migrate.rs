//! Apply the database schema

use anyhow::{Context, Result};
use clap::Parser;
use yumi_server::db::schema;

use super::DatabaseArgs;

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,
}

pub async fn run_migrate(args: MigrateArgs) -> Result<()> {
    let pool = args.db.connect().await?;
    schema::run(&pool).await.context("Schema migration failed")?;

    let tables: Vec<_> = schema::table_names().collect();
    println!("Schema up to date ({} tables)", tables.len());
    for table in tables {
        println!("  {table}");
    }
    Ok(())
}
