//! Meal plan repository - date-ranged plans and their per-meal entries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{ensure_exists, DbError, Table};
use crate::models::{MealType, Resource};

const PLAN_COLUMNS: &str = "id, usuario_id, nombre, fecha_inicio, fecha_fin, fecha_creacion";

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MealPlan {
    pub id: i32,
    pub usuario_id: Uuid,
    pub nombre: String,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: NaiveDate,
    pub fecha_creacion: DateTime<Utc>,
}

impl MealPlan {
    /// Whether `date` falls inside the plan, both ends included.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.fecha_inicio <= date && date <= self.fecha_fin
    }
}

/// Plan entry joined with a summary of its recipe
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MealPlanEntry {
    pub id: i32,
    pub plan_id: i32,
    pub receta_id: Option<i32>,
    pub fecha: NaiveDate,
    pub tipo_comida: String,
    pub porciones: i32,
    pub receta_titulo: Option<String>,
    pub receta_imagen: Option<String>,
    pub calorias_por_porcion: Option<i32>,
}

/// Plan listing filter
#[derive(Debug, Clone, Default)]
pub struct MealPlanFilter {
    /// Plans starting on or after
    pub desde: Option<NaiveDate>,
    /// Plans ending on or before
    pub hasta: Option<NaiveDate>,
    /// Only plans covering today
    pub activos: bool,
}

/// Which entries of a plan to return
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EntryRange {
    #[default]
    All,
    On(NaiveDate),
    Between(NaiveDate, NaiveDate),
}

impl EntryRange {
    /// `desde` and `hasta` give a range; `desde` alone gives one day.
    pub fn from_params(desde: Option<NaiveDate>, hasta: Option<NaiveDate>) -> Self {
        match (desde, hasta) {
            (Some(from), Some(to)) => Self::Between(from, to),
            (Some(day), None) => Self::On(day),
            _ => Self::All,
        }
    }

    fn bounds(self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        match self {
            Self::All => (None, None),
            Self::On(day) => (Some(day), Some(day)),
            Self::Between(from, to) => (Some(from), Some(to)),
        }
    }
}

/// Validated entry fields
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub receta_id: i32,
    pub fecha: NaiveDate,
    pub tipo_comida: MealType,
    pub porciones: i32,
}

const ENTRY_SELECT: &str = r#"
    SELECT d.id, d.plan_id, d.receta_id, d.fecha, d.tipo_comida, d.porciones,
           r.titulo AS receta_titulo, r.imagen_url AS receta_imagen, r.calorias_por_porcion
    FROM plan_comidas_detalle d
    LEFT JOIN recetas r ON r.id = d.receta_id
"#;

/// Default plan name for a date range.
pub fn default_plan_name(inicio: NaiveDate, fin: NaiveDate) -> String {
    format!("Plan del {} al {}", inicio.format("%d/%m/%Y"), fin.format("%d/%m/%Y"))
}

/// Meal plan repository
pub struct MealPlanRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> MealPlanRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's plans, ordered by start date.
    pub async fn list(&self, usuario_id: Uuid, filter: &MealPlanFilter) -> Result<Vec<MealPlan>, DbError> {
        let sql = format!(
            r#"
            SELECT {PLAN_COLUMNS} FROM plan_comidas
            WHERE usuario_id = $1
              AND ($2::date IS NULL OR fecha_inicio >= $2)
              AND ($3::date IS NULL OR fecha_fin <= $3)
              AND ($4 = FALSE OR CURRENT_DATE BETWEEN fecha_inicio AND fecha_fin)
            ORDER BY fecha_inicio ASC, id ASC
            "#
        );
        let plans = sqlx::query_as::<_, MealPlan>(&sql)
            .bind(usuario_id)
            .bind(filter.desde)
            .bind(filter.hasta)
            .bind(filter.activos)
            .fetch_all(self.pool)
            .await?;
        Ok(plans)
    }

    pub async fn get(&self, id: i32) -> Result<MealPlan, DbError> {
        let sql = format!("SELECT {PLAN_COLUMNS} FROM plan_comidas WHERE id = $1");
        sqlx::query_as::<_, MealPlan>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(Resource::MealPlan, id))
    }

    pub async fn create(
        &self,
        usuario_id: Uuid,
        nombre: &str,
        fecha_inicio: NaiveDate,
        fecha_fin: NaiveDate,
    ) -> Result<MealPlan, DbError> {
        let sql = format!(
            "INSERT INTO plan_comidas (usuario_id, nombre, fecha_inicio, fecha_fin) \
             VALUES ($1, $2, $3, $4) RETURNING {PLAN_COLUMNS}"
        );
        let plan = sqlx::query_as::<_, MealPlan>(&sql)
            .bind(usuario_id)
            .bind(nombre)
            .bind(fecha_inicio)
            .bind(fecha_fin)
            .fetch_one(self.pool)
            .await?;
        Ok(plan)
    }

    /// Store already merged and validated fields.
    pub async fn update(
        &self,
        id: i32,
        nombre: &str,
        fecha_inicio: NaiveDate,
        fecha_fin: NaiveDate,
    ) -> Result<MealPlan, DbError> {
        let sql = format!(
            "UPDATE plan_comidas SET nombre = $2, fecha_inicio = $3, fecha_fin = $4 \
             WHERE id = $1 RETURNING {PLAN_COLUMNS}"
        );
        sqlx::query_as::<_, MealPlan>(&sql)
            .bind(id)
            .bind(nombre)
            .bind(fecha_inicio)
            .bind(fecha_fin)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(Resource::MealPlan, id))
    }

    pub async fn delete(&self, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM plan_comidas WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::MealPlan, id));
        }
        Ok(())
    }

    /// Entries ordered by date, then meal slot.
    pub async fn entries(
        &self,
        plan_id: i32,
        range: EntryRange,
        tipo_comida: Option<MealType>,
    ) -> Result<Vec<MealPlanEntry>, DbError> {
        let (desde, hasta) = range.bounds();
        let sql = format!(
            r#"
            {ENTRY_SELECT}
            WHERE d.plan_id = $1
              AND ($2::date IS NULL OR d.fecha >= $2)
              AND ($3::date IS NULL OR d.fecha <= $3)
              AND ($4::text IS NULL OR d.tipo_comida = $4)
            ORDER BY d.fecha ASC, d.tipo_comida ASC, d.id ASC
            "#
        );
        let entries = sqlx::query_as::<_, MealPlanEntry>(&sql)
            .bind(plan_id)
            .bind(desde)
            .bind(hasta)
            .bind(tipo_comida.map(|t| t.as_str()))
            .fetch_all(self.pool)
            .await?;
        Ok(entries)
    }

    /// Schedule a recipe. One entry per date and meal slot.
    pub async fn add_entry(&self, plan_id: i32, entry: NewEntry) -> Result<MealPlanEntry, DbError> {
        ensure_exists(self.pool, Table::Recipes, entry.receta_id).await?;

        let (id,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO plan_comidas_detalle (plan_id, receta_id, fecha, tipo_comida, porciones)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(plan_id)
        .bind(entry.receta_id)
        .bind(entry.fecha)
        .bind(entry.tipo_comida.as_str())
        .bind(entry.porciones)
        .fetch_one(self.pool)
        .await
        .map_err(DbError::unique(Resource::MealPlanEntry))?;

        let sql = format!("{ENTRY_SELECT} WHERE d.id = $1");
        let created = sqlx::query_as::<_, MealPlanEntry>(&sql)
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Ok(created)
    }

    pub async fn remove_entry(&self, plan_id: i32, detalle_id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM plan_comidas_detalle WHERE id = $1 AND plan_id = $2")
            .bind(detalle_id)
            .bind(plan_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::MealPlanEntry, detalle_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn entry_range_from_params() {
        assert_eq!(EntryRange::from_params(None, None), EntryRange::All);
        assert_eq!(EntryRange::from_params(Some(day(4)), None), EntryRange::On(day(4)));
        assert_eq!(
            EntryRange::from_params(Some(day(4)), Some(day(9))),
            EntryRange::Between(day(4), day(9))
        );
        // hasta alone is ignored
        assert_eq!(EntryRange::from_params(None, Some(day(9))), EntryRange::All);
    }

    #[test]
    fn single_day_range_has_equal_bounds() {
        assert_eq!(EntryRange::On(day(2)).bounds(), (Some(day(2)), Some(day(2))));
    }

    #[test]
    fn plan_covers_both_ends() {
        let plan = MealPlan {
            id: 1,
            usuario_id: Uuid::nil(),
            nombre: "Semana".into(),
            fecha_inicio: day(1),
            fecha_fin: day(7),
            fecha_creacion: Utc::now(),
        };
        assert!(plan.covers(day(1)));
        assert!(plan.covers(day(7)));
        assert!(!plan.covers(day(8)));
    }

    #[test]
    fn default_name_uses_day_first_dates() {
        assert_eq!(default_plan_name(day(1), day(7)), "Plan del 01/03/2024 al 07/03/2024");
    }
}
