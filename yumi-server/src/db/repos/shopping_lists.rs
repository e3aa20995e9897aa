//! Shopping list repository
//!
//! Lists are generated from a meal plan: every scheduled recipe contributes
//! its ingredients scaled by the planned portions over the recipe's portions,
//! summed per ingredient name and unit.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::DbError;
use crate::models::Resource;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ShoppingList {
    pub id: i32,
    pub usuario_id: Uuid,
    pub plan_id: Option<i32>,
    pub nombre: String,
    pub completada: bool,
    pub fecha_creacion: DateTime<Utc>,
}

/// Item joined with its unit abbreviation
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ShoppingListItem {
    pub id: i32,
    pub lista_id: i32,
    pub ingrediente: String,
    pub cantidad: Option<f64>,
    pub unidad_id: Option<i32>,
    pub unidad_abreviatura: Option<String>,
    pub comprado: bool,
}

const LIST_COLUMNS: &str = "id, usuario_id, plan_id, nombre, completada, fecha_creacion";

const ITEM_SELECT: &str = r#"
    SELECT li.id, li.lista_id, li.ingrediente, li.cantidad, li.unidad_id,
           u.abreviatura AS unidad_abreviatura, li.comprado
    FROM lista_compras_items li
    LEFT JOIN unidades_medida u ON u.id = li.unidad_id
"#;

/// Shopping list repository
pub struct ShoppingListRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ShoppingListRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's lists, newest first.
    pub async fn list(&self, usuario_id: Uuid) -> Result<Vec<ShoppingList>, DbError> {
        let sql = format!(
            "SELECT {LIST_COLUMNS} FROM lista_compras WHERE usuario_id = $1 \
             ORDER BY fecha_creacion DESC, id DESC"
        );
        let lists = sqlx::query_as::<_, ShoppingList>(&sql)
            .bind(usuario_id)
            .fetch_all(self.pool)
            .await?;
        Ok(lists)
    }

    pub async fn get(&self, id: i32) -> Result<ShoppingList, DbError> {
        let sql = format!("SELECT {LIST_COLUMNS} FROM lista_compras WHERE id = $1");
        sqlx::query_as::<_, ShoppingList>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(Resource::ShoppingList, id))
    }

    /// Items ordered by name.
    pub async fn items(&self, lista_id: i32) -> Result<Vec<ShoppingListItem>, DbError> {
        let sql = format!("{ITEM_SELECT} WHERE li.lista_id = $1 ORDER BY li.ingrediente, li.id");
        let items = sqlx::query_as::<_, ShoppingListItem>(&sql)
            .bind(lista_id)
            .fetch_all(self.pool)
            .await?;
        Ok(items)
    }

    /// Build a new list from a meal plan's ingredients, atomically.
    pub async fn generate_from_plan(
        &self,
        usuario_id: Uuid,
        plan_id: i32,
        nombre: &str,
    ) -> Result<ShoppingList, DbError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO lista_compras (usuario_id, plan_id, nombre) VALUES ($1, $2, $3) \
             RETURNING {LIST_COLUMNS}"
        );
        let list = sqlx::query_as::<_, ShoppingList>(&sql)
            .bind(usuario_id)
            .bind(plan_id)
            .bind(nombre)
            .fetch_one(&mut *tx)
            .await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO lista_compras_items (lista_id, ingrediente, cantidad, unidad_id)
            SELECT $1,
                   MIN(i.nombre),
                   SUM(i.cantidad * d.porciones::float8 / COALESCE(NULLIF(r.porciones, 0), 1)),
                   i.unidad_id
            FROM plan_comidas_detalle d
            JOIN recetas r ON r.id = d.receta_id
            JOIN ingredientes i ON i.receta_id = r.id
            WHERE d.plan_id = $2
            GROUP BY LOWER(TRIM(i.nombre)), i.unidad_id
            "#,
        )
        .bind(list.id)
        .bind(plan_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(
            lista_id = list.id,
            plan_id,
            items = inserted.rows_affected(),
            "shopping list generated"
        );
        Ok(list)
    }

    /// Mark an item bought or not. The list is completed once every item
    /// is bought.
    pub async fn set_bought(&self, lista_id: i32, item_id: i32, comprado: bool) -> Result<ShoppingListItem, DbError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE lista_compras_items SET comprado = $3 WHERE id = $1 AND lista_id = $2")
            .bind(item_id)
            .bind(lista_id)
            .bind(comprado)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::ShoppingListItem, item_id));
        }

        sqlx::query(
            r#"
            UPDATE lista_compras SET completada = NOT EXISTS (
                SELECT 1 FROM lista_compras_items WHERE lista_id = $1 AND NOT comprado
            )
            WHERE id = $1
            "#,
        )
        .bind(lista_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        let sql = format!("{ITEM_SELECT} WHERE li.id = $1");
        let item = sqlx::query_as::<_, ShoppingListItem>(&sql)
            .bind(item_id)
            .fetch_one(self.pool)
            .await?;
        Ok(item)
    }

    pub async fn delete(&self, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM lista_compras WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::ShoppingList, id));
        }
        Ok(())
    }
}
