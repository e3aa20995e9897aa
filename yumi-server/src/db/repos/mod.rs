//! Repository implementations for database access
//!
//! Each repository borrows the pool and follows these patterns:
//! - JOINs for list operations (no N+1)
//! - Unique constraints decide conflicts (no check-then-insert)
//! - Transactions for multi-step operations

pub mod attempts;
pub mod collections;
pub mod comments;
pub mod events;
pub mod goals;
pub mod ingredients;
pub mod meal_plans;
pub mod preferences;
pub mod ratings;
pub mod recipes;
pub mod shopping_lists;
pub mod taxonomy;
pub mod tips;
pub mod users;
pub mod weights;

pub use attempts::{Attempt, AttemptRepo};
pub use collections::{Collection, CollectionRepo, CollectionScope};
pub use comments::{Comment, CommentRepo};
pub use events::{Event, EventFilter, EventRepo, Participant};
pub use goals::{Goal, GoalChanges, GoalRepo};
pub use ingredients::{Ingredient, IngredientInput, IngredientRepo};
pub use meal_plans::{MealPlan, MealPlanEntry, MealPlanRepo};
pub use preferences::{PreferenceRepo, UserDiet, UserPreference};
pub use ratings::{Rating, RatingRepo, RatingStats};
pub use recipes::{RecipeFilter, RecipeRepo, RecipeRow, RecipeSummary};
pub use shopping_lists::{ShoppingList, ShoppingListItem, ShoppingListRepo};
pub use taxonomy::{Category, Color, Diet, Tag, TaxonomyRepo, Unit};
pub use tips::{Tip, TipRepo};
pub use users::{User, UserRepo};
pub use weights::{WeightEntry, WeightRepo};

use std::future::Future;

use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};

use crate::models::{Paginated, Pagination, Resource};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource:?} '{id}'")]
    NotFound { resource: Resource, id: String },

    #[error("conflict: {resource:?} already exists")]
    Conflict { resource: Resource },
}

impl DbError {
    pub fn not_found(resource: Resource, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Map a unique-constraint violation to `Conflict`, anything else to `Sqlx`.
    ///
    /// ```ignore
    /// .execute(pool).await.map_err(DbError::unique(Resource::Category))?;
    /// ```
    pub fn unique(resource: Resource) -> impl FnOnce(sqlx::Error) -> Self {
        move |err| {
            let unique = matches!(&err, sqlx::Error::Database(db) if db.is_unique_violation());
            if unique {
                Self::Conflict { resource }
            } else {
                Self::Sqlx(err)
            }
        }
    }
}

/// Tables that can be checked for existence by integer id.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Table {
    Recipes,
    Categories,
    Diets,
    Units,
    Tags,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Self::Recipes => "recetas",
            Self::Categories => "categorias",
            Self::Diets => "dietas",
            Self::Units => "unidades_medida",
            Self::Tags => "etiquetas",
        }
    }

    fn resource(self) -> Resource {
        match self {
            Self::Recipes => Resource::Recipe,
            Self::Categories => Resource::Category,
            Self::Diets => Resource::Diet,
            Self::Units => Resource::Unit,
            Self::Tags => Resource::Tag,
        }
    }
}

/// Fail with `NotFound` unless a row with `id` exists in `table`.
pub(crate) async fn ensure_exists(pool: &PgPool, table: Table, id: i32) -> Result<(), DbError> {
    ensure_all_exist(pool, table, &[id]).await
}

/// Fail with `NotFound` naming the first id in `ids` missing from `table`.
pub(crate) async fn ensure_all_exist(pool: &PgPool, table: Table, ids: &[i32]) -> Result<(), DbError> {
    if ids.is_empty() {
        return Ok(());
    }
    let sql = format!(
        "SELECT wanted FROM UNNEST($1::int[]) AS wanted \
         WHERE NOT EXISTS (SELECT 1 FROM {} t WHERE t.id = wanted) LIMIT 1",
        table.name()
    );
    let missing: Option<(i32,)> = sqlx::query_as(&sql).bind(ids).fetch_optional(pool).await?;
    match missing {
        Some((id,)) => Err(DbError::not_found(table.resource(), id)),
        None => Ok(()),
    }
}

/// Run a paginated query whose rows carry a `COUNT(*) OVER() AS total`
/// column. `fetch` receives the LIMIT and OFFSET to bind.
///
/// A page past the end returns no rows, and with them no window count, so
/// the total is then read from the first row instead.
pub(crate) async fn fetch_page<T, F, Fut>(page: Pagination, fetch: F) -> Result<Paginated<T>, DbError>
where
    T: for<'r> FromRow<'r, PgRow>,
    F: Fn(i64, i64) -> Fut,
    Fut: Future<Output = Result<Vec<PgRow>, sqlx::Error>>,
{
    let rows = fetch(page.limit(), page.offset()).await?;
    if rows.is_empty() && page.offset() > 0 {
        let first = fetch(1, 0).await?;
        return Ok(Paginated::new(Vec::new(), window_total(&first)?, page));
    }

    let total = window_total(&rows)?;
    let data = rows
        .iter()
        .map(T::from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Paginated::new(data, total, page))
}

fn window_total(rows: &[PgRow]) -> Result<i64, DbError> {
    match rows.first() {
        Some(row) => Ok(row.try_get::<i64, _>("total")?),
        None => Ok(0),
    }
}

/// Escape `%`, `_` and `\` and wrap for a substring ILIKE match.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("pasta"), "%pasta%");
        assert_eq!(like_pattern(" 100%_real "), "%100\\%\\_real%");
    }

    #[test]
    fn not_found_carries_id() {
        match DbError::not_found(Resource::Recipe, 7) {
            DbError::NotFound { resource, id } => {
                assert_eq!(resource, Resource::Recipe);
                assert_eq!(id, "7");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_unique_errors_pass_through() {
        let mapped = DbError::unique(Resource::Tag)(sqlx::Error::RowNotFound);
        assert!(matches!(mapped, DbError::Sqlx(sqlx::Error::RowNotFound)));
    }
}
