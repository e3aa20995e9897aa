//! Ingredient repository

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use yumi_core::CalorieLine;

use super::{ensure_all_exist, ensure_exists, DbError, Table};
use crate::models::Resource;

/// Ingredient joined with its unit of measure
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Ingredient {
    pub id: i32,
    pub receta_id: i32,
    pub nombre: String,
    pub cantidad: Option<f64>,
    pub unidad_id: Option<i32>,
    pub calorias_por_unidad: Option<i32>,
    pub es_opcional: bool,
    pub unidad_nombre: Option<String>,
    pub unidad_abreviatura: Option<String>,
}

impl From<&Ingredient> for CalorieLine {
    fn from(i: &Ingredient) -> Self {
        CalorieLine {
            cantidad: i.cantidad,
            calorias_por_unidad: i.calorias_por_unidad.map(f64::from),
        }
    }
}

/// Validated ingredient fields
#[derive(Debug, Clone, Default)]
pub struct IngredientInput {
    pub nombre: String,
    pub cantidad: Option<f64>,
    pub unidad_id: Option<i32>,
    pub calorias_por_unidad: Option<i32>,
    pub es_opcional: bool,
}

/// Partial ingredient update
#[derive(Debug, Clone, Default)]
pub struct IngredientChanges {
    pub nombre: Option<String>,
    pub cantidad: Option<f64>,
    pub unidad_id: Option<i32>,
    pub calorias_por_unidad: Option<i32>,
    pub es_opcional: Option<bool>,
}

const INGREDIENT_SELECT: &str = r#"
    SELECT i.id, i.receta_id, i.nombre, i.cantidad, i.unidad_id, i.calorias_por_unidad,
           i.es_opcional, u.nombre AS unidad_nombre, u.abreviatura AS unidad_abreviatura
    FROM ingredientes i
    LEFT JOIN unidades_medida u ON u.id = i.unidad_id
"#;

/// Ingredient repository
pub struct IngredientRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> IngredientRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Ingredients of a recipe in insertion order.
    pub async fn list(&self, receta_id: i32) -> Result<Vec<Ingredient>, DbError> {
        let sql = format!("{INGREDIENT_SELECT} WHERE i.receta_id = $1 ORDER BY i.id");
        let ingredients = sqlx::query_as::<_, Ingredient>(&sql)
            .bind(receta_id)
            .fetch_all(self.pool)
            .await?;
        Ok(ingredients)
    }

    pub async fn get(&self, receta_id: i32, id: i32) -> Result<Ingredient, DbError> {
        let sql = format!("{INGREDIENT_SELECT} WHERE i.id = $1 AND i.receta_id = $2");
        sqlx::query_as::<_, Ingredient>(&sql)
            .bind(id)
            .bind(receta_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(Resource::Ingredient, id))
    }

    pub async fn create(&self, receta_id: i32, input: IngredientInput) -> Result<Ingredient, DbError> {
        ensure_exists(self.pool, Table::Recipes, receta_id).await?;
        if let Some(unidad_id) = input.unidad_id {
            ensure_exists(self.pool, Table::Units, unidad_id).await?;
        }

        let (id,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO ingredientes
                (receta_id, nombre, cantidad, unidad_id, calorias_por_unidad, es_opcional)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(receta_id)
        .bind(&input.nombre)
        .bind(input.cantidad)
        .bind(input.unidad_id)
        .bind(input.calorias_por_unidad)
        .bind(input.es_opcional)
        .fetch_one(self.pool)
        .await?;
        self.get(receta_id, id).await
    }

    /// Replace every ingredient of a recipe in one transaction.
    pub async fn replace_all(
        &self,
        receta_id: i32,
        inputs: Vec<IngredientInput>,
    ) -> Result<Vec<Ingredient>, DbError> {
        ensure_exists(self.pool, Table::Recipes, receta_id).await?;
        let unit_ids: Vec<i32> = inputs.iter().filter_map(|i| i.unidad_id).collect();
        ensure_all_exist(self.pool, Table::Units, &unit_ids).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM ingredientes WHERE receta_id = $1")
            .bind(receta_id)
            .execute(&mut *tx)
            .await?;

        for input in &inputs {
            sqlx::query(
                r#"
                INSERT INTO ingredientes
                    (receta_id, nombre, cantidad, unidad_id, calorias_por_unidad, es_opcional)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(receta_id)
            .bind(&input.nombre)
            .bind(input.cantidad)
            .bind(input.unidad_id)
            .bind(input.calorias_por_unidad)
            .bind(input.es_opcional)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::debug!(receta_id, count = inputs.len(), "replaced ingredients");
        self.list(receta_id).await
    }

    pub async fn update(
        &self,
        receta_id: i32,
        id: i32,
        changes: IngredientChanges,
    ) -> Result<Ingredient, DbError> {
        if let Some(unidad_id) = changes.unidad_id {
            ensure_exists(self.pool, Table::Units, unidad_id).await?;
        }

        let result = sqlx::query(
            r#"
            UPDATE ingredientes SET
                nombre = COALESCE($3, nombre),
                cantidad = COALESCE($4, cantidad),
                unidad_id = COALESCE($5, unidad_id),
                calorias_por_unidad = COALESCE($6, calorias_por_unidad),
                es_opcional = COALESCE($7, es_opcional)
            WHERE id = $1 AND receta_id = $2
            "#,
        )
        .bind(id)
        .bind(receta_id)
        .bind(changes.nombre.as_deref())
        .bind(changes.cantidad)
        .bind(changes.unidad_id)
        .bind(changes.calorias_por_unidad)
        .bind(changes.es_opcional)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Ingredient, id));
        }
        self.get(receta_id, id).await
    }

    pub async fn delete(&self, receta_id: i32, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM ingredientes WHERE id = $1 AND receta_id = $2")
            .bind(id)
            .bind(receta_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Ingredient, id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calorie_line_from_ingredient() {
        let ingredient = Ingredient {
            id: 1,
            receta_id: 1,
            nombre: "Arroz".into(),
            cantidad: Some(2.0),
            unidad_id: None,
            calorias_por_unidad: Some(130),
            es_opcional: false,
            unidad_nombre: None,
            unidad_abreviatura: None,
        };
        let line = CalorieLine::from(&ingredient);
        assert_eq!(line.cantidad, Some(2.0));
        assert_eq!(line.calorias_por_unidad, Some(130.0));
    }
}
