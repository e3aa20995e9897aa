//! yumi-core: nutrition and calorie arithmetic
//!
//! Pure functions shared by the HTTP server and the CLI. Nothing here touches
//! the network or the database.

pub mod calories;
pub mod conversion;
pub mod energy;
pub mod error;
pub mod nutrition;
pub mod progress;

pub use calories::{summarize, CalorieLine, CalorieSummary};
pub use conversion::{convert, ConversionFactor, Converted};
pub use energy::{estimate, ActivityLevel, EnergyEstimate, EnergyInput, Sex, WeightGoal};
pub use error::{CalcError, Result};
pub use nutrition::{estimate_recipe, IngredientLine, Nutrients, RecipeNutrition};
pub use progress::{ideal_weight, weight_stats, IdealWeight, WeightSample, WeightStats};
