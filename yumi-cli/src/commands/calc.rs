//! Offline nutrition calculators
//!
//! Same arithmetic as the `/calculator` endpoints, without a server or
//! database.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use yumi_core::{
    estimate, estimate_recipe, ideal_weight, ActivityLevel, EnergyInput, IngredientLine, Sex,
    WeightGoal,
};

#[derive(Parser, Debug)]
pub struct CalcArgs {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: CalcCommands,
}

#[derive(Subcommand, Debug)]
pub enum CalcCommands {
    /// Daily calorie target, macros, BMI and meal distribution
    Daily(DailyArgs),
    /// Nutrition estimate for a list of ingredients
    Recipe(RecipeArgs),
    /// Ideal weight and healthy range for a height
    IdealWeight(IdealWeightArgs),
}

#[derive(Args, Debug)]
pub struct DailyArgs {
    /// Weight in kg
    #[arg(long)]
    pub peso: f64,

    /// Height in cm
    #[arg(long)]
    pub altura: f64,

    /// Age in years
    #[arg(long)]
    pub edad: u32,

    /// masculino | femenino
    #[arg(long)]
    pub sexo: Sex,

    /// sedentario | ligero | moderado | activo | "muy activo"
    #[arg(long, default_value = "moderado")]
    pub actividad: ActivityLevel,

    /// mantener | perder | ganar
    #[arg(long, default_value = "mantener")]
    pub objetivo: WeightGoal,
}

#[derive(Args, Debug)]
pub struct RecipeArgs {
    /// Ingredient as nombre:cantidad:unidad (repeatable), e.g. "arroz:200:g"
    #[arg(long = "ingrediente", short = 'i', value_parser = parse_line, required = true)]
    pub ingredientes: Vec<IngredientLine>,

    /// Number of portions
    #[arg(long, default_value_t = 1)]
    pub porciones: u32,
}

#[derive(Args, Debug)]
pub struct IdealWeightArgs {
    /// Height in cm
    #[arg(long)]
    pub altura: f64,

    /// masculino | femenino
    #[arg(long)]
    pub sexo: Sex,
}

/// Parse `nombre:cantidad:unidad`. The name may itself contain colons.
fn parse_line(raw: &str) -> Result<IngredientLine> {
    let mut parts = raw.rsplitn(3, ':');
    let (Some(unidad), Some(cantidad), Some(nombre)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(anyhow!("expected nombre:cantidad:unidad, got '{raw}'"));
    };
    let cantidad = cantidad
        .trim()
        .replace(',', ".")
        .parse()
        .with_context(|| format!("invalid quantity in '{raw}'"))?;
    Ok(IngredientLine {
        nombre: nombre.trim().to_owned(),
        cantidad,
        unidad: unidad.trim().to_owned(),
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn run_calc(args: CalcArgs) -> Result<()> {
    match args.command {
        CalcCommands::Daily(daily) => run_daily(daily, args.json),
        CalcCommands::Recipe(recipe) => run_recipe(recipe, args.json),
        CalcCommands::IdealWeight(ideal) => run_ideal_weight(ideal, args.json),
    }
}

fn run_daily(args: DailyArgs, json: bool) -> Result<()> {
    let input = EnergyInput {
        peso: args.peso,
        altura: args.altura,
        edad: args.edad,
        sexo: args.sexo,
        actividad: args.actividad,
        objetivo: args.objetivo,
    };
    let result = estimate(&input)?;
    if json {
        return print_json(&result);
    }

    println!("TMB:           {} kcal", result.tmb);
    println!("Mantenimiento: {} kcal", result.mantenimiento);
    println!("Objetivo:      {} kcal", result.objetivo);
    println!(
        "Macros:        {} g proteínas, {} g carbohidratos, {} g grasas",
        result.macros.proteinas, result.macros.carbohidratos, result.macros.grasas
    );
    println!("IMC:           {} ({})", result.imc.valor, result.imc.categoria);
    for meal in &result.distribucion {
        println!("  {:<10} {:>3}%  {} kcal", meal.comida, meal.porcentaje, meal.calorias);
    }
    Ok(())
}

fn run_recipe(args: RecipeArgs, json: bool) -> Result<()> {
    let result = estimate_recipe(&args.ingredientes, args.porciones)?;
    if json {
        return print_json(&result);
    }

    for item in &result.ingredientes {
        let marker = if item.encontrado { "" } else { "  (sin datos)" };
        println!(
            "  {} {} {}: {} kcal{}",
            item.linea.cantidad,
            item.linea.unidad,
            item.linea.nombre,
            item.info_nutricional.calorias,
            marker
        );
    }
    println!("Total:       {} kcal", result.total.calorias);
    println!(
        "Por porción: {} kcal ({} porciones)",
        result.por_porcion.calorias, result.porciones
    );
    Ok(())
}

fn run_ideal_weight(args: IdealWeightArgs, json: bool) -> Result<()> {
    let result = ideal_weight(args.altura, args.sexo)?;
    if json {
        return print_json(&result);
    }

    let (min, max) = result.rango_saludable;
    println!("Peso ideal:      {} kg", result.peso_ideal);
    println!("Rango saludable: {min} - {max} kg");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ingredient_lines() {
        let line = parse_line("arroz:200:g").unwrap();
        assert_eq!(line.nombre, "arroz");
        assert_eq!(line.cantidad, 200.0);
        assert_eq!(line.unidad, "g");

        let line = parse_line("aceite de oliva:1,5:cda").unwrap();
        assert_eq!(line.nombre, "aceite de oliva");
        assert_eq!(line.cantidad, 1.5);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_line("arroz").is_err());
        assert!(parse_line("arroz:mucho:g").is_err());
    }
}
