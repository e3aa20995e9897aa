//! Recipe nutrition estimate from a reference table of common foods.
//!
//! Reference values are per 100 g (or 100 ml). Ingredient names are matched
//! case-insensitively when either string contains the other; the first table
//! entry that matches wins. Unknown foods fall back to a generic profile.

use serde::{Deserialize, Serialize};

use crate::energy::round1;
use crate::error::{CalcError, Result};

/// Nutrient amounts. Units are kcal for calories and grams for the rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    pub calorias: f64,
    pub proteinas: f64,
    pub carbohidratos: f64,
    pub grasas: f64,
    pub fibra: f64,
    pub azucares: f64,
}

impl Nutrients {
    const fn per_100g(
        calorias: f64,
        proteinas: f64,
        carbohidratos: f64,
        grasas: f64,
        fibra: f64,
        azucares: f64,
    ) -> Self {
        Self {
            calorias,
            proteinas,
            carbohidratos,
            grasas,
            fibra,
            azucares,
        }
    }

    fn scale(&self, factor: f64) -> Self {
        Self {
            calorias: self.calorias * factor,
            proteinas: self.proteinas * factor,
            carbohidratos: self.carbohidratos * factor,
            grasas: self.grasas * factor,
            fibra: self.fibra * factor,
            azucares: self.azucares * factor,
        }
    }

    fn add(&mut self, other: &Self) {
        self.calorias += other.calorias;
        self.proteinas += other.proteinas;
        self.carbohidratos += other.carbohidratos;
        self.grasas += other.grasas;
        self.fibra += other.fibra;
        self.azucares += other.azucares;
    }

    /// Calories to whole kcal, everything else to one decimal.
    pub fn rounded(&self) -> Self {
        Self {
            calorias: self.calorias.round(),
            proteinas: round1(self.proteinas),
            carbohidratos: round1(self.carbohidratos),
            grasas: round1(self.grasas),
            fibra: round1(self.fibra),
            azucares: round1(self.azucares),
        }
    }
}

const REFERENCE_FOODS: [(&str, Nutrients); 10] = [
    ("arroz", Nutrients::per_100g(130.0, 2.7, 28.0, 0.3, 0.4, 0.1)),
    ("pollo", Nutrients::per_100g(165.0, 31.0, 0.0, 3.6, 0.0, 0.0)),
    ("aceite de oliva", Nutrients::per_100g(884.0, 0.0, 0.0, 100.0, 0.0, 0.0)),
    ("zanahoria", Nutrients::per_100g(41.0, 0.9, 10.0, 0.2, 2.8, 4.7)),
    ("cebolla", Nutrients::per_100g(40.0, 1.1, 9.3, 0.1, 1.7, 4.2)),
    ("tomate", Nutrients::per_100g(18.0, 0.9, 3.9, 0.2, 1.2, 2.6)),
    ("lechuga", Nutrients::per_100g(15.0, 1.4, 2.9, 0.2, 1.3, 0.8)),
    ("huevo", Nutrients::per_100g(155.0, 12.6, 1.1, 10.6, 0.0, 1.1)),
    ("leche", Nutrients::per_100g(42.0, 3.4, 5.0, 1.0, 0.0, 5.0)),
    ("pan", Nutrients::per_100g(265.0, 9.4, 49.0, 3.2, 2.7, 5.0)),
];

const FALLBACK_FOOD: Nutrients = Nutrients::per_100g(100.0, 5.0, 10.0, 5.0, 2.0, 2.0);

/// Look up a food's per-100 g profile. Returns `None` for unknown foods.
pub fn lookup(name: &str) -> Option<Nutrients> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    REFERENCE_FOODS
        .iter()
        .find(|(key, _)| needle.contains(key) || key.contains(needle.as_str()))
        .map(|(_, nutrients)| *nutrients)
}

/// Multiplier from an ingredient quantity to "units of 100 g".
///
/// Unknown units count as a single reference portion.
pub fn unit_factor(unit: &str, quantity: f64) -> f64 {
    match unit.trim().to_lowercase().as_str() {
        "g" | "ml" => quantity / 100.0,
        "kg" | "l" => quantity * 1000.0 / 100.0,
        "cucharada" => quantity * 15.0 / 100.0,
        "cucharadita" => quantity * 5.0 / 100.0,
        "taza" => quantity * 240.0 / 100.0,
        "unidad" => quantity,
        _ => 1.0,
    }
}

/// One ingredient line submitted for estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientLine {
    pub nombre: String,
    pub cantidad: f64,
    pub unidad: String,
}

impl IngredientLine {
    fn validate(&self) -> Result<()> {
        if self.nombre.trim().is_empty() {
            return Err(CalcError::Missing { field: "nombre" });
        }
        if self.unidad.trim().is_empty() {
            return Err(CalcError::Missing { field: "unidad" });
        }
        if !self.cantidad.is_finite() || self.cantidad == 0.0 {
            return Err(CalcError::Missing { field: "cantidad" });
        }
        Ok(())
    }
}

/// Ingredient line annotated with its estimated contribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientEstimate {
    #[serde(flatten)]
    pub linea: IngredientLine,
    pub encontrado: bool,
    pub info_nutricional: Nutrients,
}

/// Whole-recipe estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeNutrition {
    pub total: Nutrients,
    pub por_porcion: Nutrients,
    pub porciones: u32,
    pub ingredientes: Vec<IngredientEstimate>,
}

/// Estimate nutrition for a list of ingredients split into `portions`.
///
/// `portions` of zero is treated as one. An empty list yields zeroed totals.
pub fn estimate_recipe(lines: &[IngredientLine], portions: u32) -> Result<RecipeNutrition> {
    let portions = portions.max(1);

    let mut total = Nutrients::default();
    let mut ingredientes = Vec::with_capacity(lines.len());

    for line in lines {
        line.validate()?;
        let reference = lookup(&line.nombre);
        let contribution = reference
            .unwrap_or(FALLBACK_FOOD)
            .scale(unit_factor(&line.unidad, line.cantidad));
        total.add(&contribution);
        ingredientes.push(IngredientEstimate {
            linea: line.clone(),
            encontrado: reference.is_some(),
            info_nutricional: contribution.rounded(),
        });
    }

    Ok(RecipeNutrition {
        total: total.rounded(),
        por_porcion: total.scale(1.0 / f64::from(portions)).rounded(),
        porciones: portions,
        ingredientes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(nombre: &str, cantidad: f64, unidad: &str) -> IngredientLine {
        IngredientLine {
            nombre: nombre.into(),
            cantidad,
            unidad: unidad.into(),
        }
    }

    #[test]
    fn lookup_matches_either_direction() {
        assert_eq!(lookup("Arroz integral").map(|n| n.calorias), Some(130.0));
        assert_eq!(lookup("aceite").map(|n| n.calorias), Some(884.0));
        assert!(lookup("quinoa").is_none());
        assert!(lookup("   ").is_none());
    }

    #[test]
    fn unit_factors() {
        assert_eq!(unit_factor("g", 200.0), 2.0);
        assert_eq!(unit_factor("kg", 1.5), 15.0);
        assert_eq!(unit_factor("cucharada", 2.0), 0.3);
        assert_eq!(unit_factor("cucharadita", 4.0), 0.2);
        assert_eq!(unit_factor("taza", 1.0), 2.4);
        assert_eq!(unit_factor("unidad", 3.0), 3.0);
        assert_eq!(unit_factor("pizca", 9.0), 1.0);
    }

    #[test]
    fn rice_and_chicken() {
        let result = estimate_recipe(
            &[line("arroz", 200.0, "g"), line("pollo", 150.0, "g")],
            2,
        )
        .unwrap();

        // 130*2 + 165*1.5 = 507.5
        assert_eq!(result.total.calorias, 508.0);
        // 2.7*2 + 31*1.5 = 51.9
        assert_eq!(result.total.proteinas, 51.9);
        assert_eq!(result.por_porcion.calorias, 254.0);
        assert_eq!(result.porciones, 2);
        assert!(result.ingredientes.iter().all(|i| i.encontrado));
    }

    #[test]
    fn unknown_food_uses_fallback() {
        let result = estimate_recipe(&[line("quinoa", 100.0, "g")], 0).unwrap();
        assert_eq!(result.porciones, 1);
        assert_eq!(result.total.calorias, 100.0);
        assert!(!result.ingredientes[0].encontrado);
    }

    #[test]
    fn rejects_incomplete_lines() {
        assert!(estimate_recipe(&[line("", 1.0, "g")], 1).is_err());
        assert!(estimate_recipe(&[line("pan", 0.0, "g")], 1).is_err());
        assert!(estimate_recipe(&[line("pan", 1.0, " ")], 1).is_err());
        assert!(estimate_recipe(&[line("pan", f64::NAN, "g")], 1).is_err());
    }

    #[test]
    fn empty_list_is_zeroed() {
        let result = estimate_recipe(&[], 4).unwrap();
        assert_eq!(result.total, Nutrients::default());
        assert_eq!(result.por_porcion, Nutrients::default());
        assert_eq!(result.porciones, 4);
        assert!(result.ingredientes.is_empty());
    }

    #[test]
    fn only_zero_quantity_is_missing() {
        assert!(matches!(
            estimate_recipe(&[line("pan", 0.0, "g")], 1),
            Err(CalcError::Missing { field: "cantidad" })
        ));
        assert!(estimate_recipe(&[line("pan", -50.0, "g")], 1).is_ok());
    }
}
