//! Insert reference data: categories, diets, units, conversions, colors

use anyhow::{Context, Result};
use clap::Parser;
use yumi_server::db::{schema, seed};

use super::DatabaseArgs;

#[derive(Parser, Debug)]
pub struct SeedArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run_seed(args: SeedArgs) -> Result<()> {
    let json = args.json;
    let pool = args.db.connect().await?;

    // Seeding needs the tables
    schema::run(&pool).await.context("Schema migration failed")?;
    let report = seed::run(&pool).await.context("Seeding failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.total() == 0 {
        println!("Reference data already present, nothing inserted");
    } else {
        println!("Inserted {} rows:", report.total());
        println!("  categorias:   {}", report.categorias);
        println!("  dietas:       {}", report.dietas);
        println!("  unidades:     {}", report.unidades);
        println!("  conversiones: {}", report.conversiones);
        println!("  colores:      {}", report.colores);
    }
    Ok(())
}
