//! Route handlers, one module per resource:
//! - users, goals, weights, preferences: profiles and personal data
//! - recipes and their comments, ratings, attempts, ingredients and tips
//! - categories, diets, taxonomy: shared classification data
//! - collections, events, meal_plans, shopping_lists
//! - calculator: nutrition arithmetic
//! - upload: image storage
//! - health: liveness and database check

pub mod attempts;
pub mod calculator;
pub mod categories;
pub mod collections;
pub mod comments;
pub mod common;
pub mod diets;
pub mod events;
pub mod goals;
pub mod health;
pub mod ingredients;
pub mod meal_plans;
pub mod preferences;
pub mod ratings;
pub mod recipes;
pub mod shopping_lists;
pub mod taxonomy;
pub mod tips;
pub mod upload;
pub mod users;
pub mod weights;
