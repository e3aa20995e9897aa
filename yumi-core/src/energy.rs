//! Daily energy estimate: Mifflin-St Jeor BMR, activity scaling, goal
//! adjustment, macro split, BMI and meal distribution.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CalcError, Result};

const WEIGHT_RANGE: (f64, f64) = (1.0, 300.0);
const HEIGHT_RANGE: (f64, f64) = (1.0, 250.0);
const AGE_RANGE: (f64, f64) = (1.0, 120.0);

const KCAL_PER_G_PROTEIN: f64 = 4.0;
const KCAL_PER_G_CARBS: f64 = 4.0;
const KCAL_PER_G_FAT: f64 = 9.0;

/// Biological sex, which selects the BMR constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    #[serde(alias = "masculino", alias = "hombre", alias = "m")]
    Male,
    #[serde(alias = "femenino", alias = "mujer", alias = "f")]
    Female,
}

impl Sex {
    fn bmr_offset(self) -> f64 {
        match self {
            Self::Male => 5.0,
            Self::Female => -161.0,
        }
    }
}

impl FromStr for Sex {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "masculino" | "hombre" | "m" => Ok(Self::Male),
            "female" | "femenino" | "mujer" | "f" => Ok(Self::Female),
            other => Err(CalcError::unknown("sexo", other)),
        }
    }
}

/// Daily activity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityLevel {
    #[serde(rename = "sedentario")]
    Sedentary,
    #[serde(rename = "ligero")]
    Light,
    #[serde(rename = "moderado")]
    Moderate,
    #[serde(rename = "activo")]
    Active,
    #[serde(rename = "muy activo")]
    VeryActive,
}

impl ActivityLevel {
    pub const ALL: [Self; 5] = [
        Self::Sedentary,
        Self::Light,
        Self::Moderate,
        Self::Active,
        Self::VeryActive,
    ];

    /// Stored text value
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sedentary => "sedentario",
            Self::Light => "ligero",
            Self::Moderate => "moderado",
            Self::Active => "activo",
            Self::VeryActive => "muy activo",
        }
    }

    /// Multiplier applied to BMR
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::Light => 1.375,
            Self::Moderate => 1.55,
            Self::Active => 1.725,
            Self::VeryActive => 1.9,
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('_', " ");
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| CalcError::unknown("actividad", s))
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weight goal for the estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightGoal {
    #[serde(rename = "mantener", alias = "maintain")]
    Maintain,
    #[serde(rename = "perder", alias = "perder_peso", alias = "lose")]
    Lose,
    #[serde(rename = "ganar", alias = "ganar_masa", alias = "gain")]
    Gain,
}

impl WeightGoal {
    /// Fixed kcal offset added to maintenance calories
    pub fn offset(self) -> f64 {
        match self {
            Self::Maintain => 0.0,
            Self::Lose => -500.0,
            Self::Gain => 500.0,
        }
    }

    /// Percent of target kcal from protein, carbohydrate and fat
    pub fn macro_percentages(self) -> (f64, f64, f64) {
        match self {
            Self::Maintain => (0.25, 0.50, 0.25),
            Self::Lose => (0.35, 0.35, 0.30),
            Self::Gain => (0.30, 0.50, 0.20),
        }
    }
}

impl FromStr for WeightGoal {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mantener" | "maintain" => Ok(Self::Maintain),
            "perder" | "perder_peso" | "lose" => Ok(Self::Lose),
            "ganar" | "ganar_masa" | "gain" => Ok(Self::Gain),
            other => Err(CalcError::unknown("objetivo", other)),
        }
    }
}

/// Inputs to the daily estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyInput {
    pub peso: f64,
    pub altura: f64,
    pub edad: u32,
    pub sexo: Sex,
    pub actividad: ActivityLevel,
    pub objetivo: WeightGoal,
}

impl EnergyInput {
    /// Reject values outside the accepted ranges.
    pub fn validate(&self) -> Result<()> {
        CalcError::check_range("peso", self.peso, WEIGHT_RANGE.0, WEIGHT_RANGE.1)?;
        CalcError::check_range("altura", self.altura, HEIGHT_RANGE.0, HEIGHT_RANGE.1)?;
        CalcError::check_range("edad", f64::from(self.edad), AGE_RANGE.0, AGE_RANGE.1)?;
        Ok(())
    }
}

/// Daily macronutrient targets in grams
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacroSplit {
    pub proteinas: f64,
    pub carbohidratos: f64,
    pub grasas: f64,
}

/// Body mass index with its category label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bmi {
    pub valor: f64,
    pub categoria: &'static str,
}

/// Share of the daily target assigned to one meal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealShare {
    pub comida: &'static str,
    pub porcentaje: u32,
    pub calorias: f64,
}

/// Result of the daily estimate. Calorie and gram values are whole numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyEstimate {
    pub tmb: f64,
    pub mantenimiento: f64,
    pub objetivo: f64,
    pub macros: MacroSplit,
    pub imc: Bmi,
    pub distribucion: Vec<MealShare>,
}

const MEAL_DISTRIBUTION: [(&str, u32); 4] = [
    ("desayuno", 25),
    ("almuerzo", 35),
    ("merienda", 10),
    ("cena", 30),
];

/// Mifflin-St Jeor basal metabolic rate in kcal/day.
pub fn basal_metabolic_rate(weight_kg: f64, height_cm: f64, age: u32, sex: Sex) -> f64 {
    10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age) + sex.bmr_offset()
}

/// Body mass index, rounded to one decimal.
pub fn body_mass_index(weight_kg: f64, height_cm: f64) -> Bmi {
    let meters = height_cm / 100.0;
    let valor = round1(weight_kg / (meters * meters));
    let categoria = if valor < 18.5 {
        "bajo peso"
    } else if valor < 25.0 {
        "normal"
    } else if valor < 30.0 {
        "sobrepeso"
    } else {
        "obesidad"
    };
    Bmi { valor, categoria }
}

/// Compute the full daily estimate.
pub fn estimate(input: &EnergyInput) -> Result<EnergyEstimate> {
    input.validate()?;

    let bmr = basal_metabolic_rate(input.peso, input.altura, input.edad, input.sexo);
    let maintenance = bmr * input.actividad.multiplier();
    let target = (maintenance + input.objetivo.offset()).max(0.0).round();

    let (protein, carbs, fat) = input.objetivo.macro_percentages();
    let macros = MacroSplit {
        proteinas: (target * protein / KCAL_PER_G_PROTEIN).round(),
        carbohidratos: (target * carbs / KCAL_PER_G_CARBS).round(),
        grasas: (target * fat / KCAL_PER_G_FAT).round(),
    };

    let distribucion = MEAL_DISTRIBUTION
        .iter()
        .map(|&(comida, porcentaje)| MealShare {
            comida,
            porcentaje,
            calorias: (target * f64::from(porcentaje) / 100.0).round(),
        })
        .collect();

    Ok(EnergyEstimate {
        tmb: bmr.round(),
        mantenimiento: maintenance.round(),
        objetivo: target,
        macros,
        imc: body_mass_index(input.peso, input.altura),
        distribucion,
    })
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn male_input(goal: WeightGoal) -> EnergyInput {
        EnergyInput {
            peso: 70.0,
            altura: 175.0,
            edad: 30,
            sexo: Sex::Male,
            actividad: ActivityLevel::Moderate,
            objetivo: goal,
        }
    }

    #[test]
    fn bmr_uses_sex_constant() {
        assert_eq!(basal_metabolic_rate(70.0, 175.0, 30, Sex::Male), 1648.75);
        assert_eq!(basal_metabolic_rate(60.0, 165.0, 25, Sex::Female), 1345.25);
    }

    #[test]
    fn estimate_for_weight_loss() {
        let result = estimate(&male_input(WeightGoal::Lose)).unwrap();
        assert_eq!(result.tmb, 1649.0);
        assert_eq!(result.mantenimiento, 2556.0);
        assert_eq!(result.objetivo, 2056.0);
        assert_eq!(result.macros.proteinas, 180.0);
        assert_eq!(result.macros.carbohidratos, 180.0);
        assert_eq!(result.macros.grasas, 69.0);
    }

    #[test]
    fn gain_adds_offset() {
        let result = estimate(&male_input(WeightGoal::Gain)).unwrap();
        assert_eq!(result.objetivo, 3056.0);
    }

    #[test]
    fn meal_distribution_sums_to_hundred() {
        let result = estimate(&male_input(WeightGoal::Lose)).unwrap();
        let total: u32 = result.distribucion.iter().map(|m| m.porcentaje).sum();
        assert_eq!(total, 100);
        assert_eq!(result.distribucion[0].calorias, 514.0);
        assert_eq!(result.distribucion[1].calorias, 720.0);
    }

    #[test]
    fn bmi_categories() {
        let bmi = body_mass_index(70.0, 175.0);
        assert_eq!(bmi.valor, 22.9);
        assert_eq!(bmi.categoria, "normal");
        assert_eq!(body_mass_index(50.0, 180.0).categoria, "bajo peso");
        assert_eq!(body_mass_index(90.0, 175.0).categoria, "sobrepeso");
        assert_eq!(body_mass_index(120.0, 170.0).categoria, "obesidad");
    }

    #[test]
    fn rejects_out_of_range_inputs() {
        let mut input = male_input(WeightGoal::Maintain);
        input.peso = 301.0;
        assert!(matches!(
            estimate(&input),
            Err(CalcError::OutOfRange { field: "peso", .. })
        ));

        let mut input = male_input(WeightGoal::Maintain);
        input.edad = 0;
        assert!(estimate(&input).is_err());

        let mut input = male_input(WeightGoal::Maintain);
        input.altura = 251.0;
        assert!(estimate(&input).is_err());
    }

    #[test]
    fn parses_spanish_labels() {
        assert_eq!("muy activo".parse::<ActivityLevel>(), Ok(ActivityLevel::VeryActive));
        assert_eq!("muy_activo".parse::<ActivityLevel>(), Ok(ActivityLevel::VeryActive));
        assert_eq!("Mujer".parse::<Sex>(), Ok(Sex::Female));
        assert_eq!("perder_peso".parse::<WeightGoal>(), Ok(WeightGoal::Lose));
        assert!("flotando".parse::<ActivityLevel>().is_err());
    }

    #[test]
    fn deserializes_from_json() {
        let input: EnergyInput = serde_json::from_str(
            r#"{"peso":60,"altura":165,"edad":25,"sexo":"femenino","actividad":"ligero","objetivo":"mantener"}"#,
        )
        .unwrap();
        assert_eq!(input.sexo, Sex::Female);
        assert_eq!(input.actividad, ActivityLevel::Light);
    }
}
