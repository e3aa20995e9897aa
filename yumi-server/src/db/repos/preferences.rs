//! Preference repository - a user's favourite categories and followed diets.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{ensure_all_exist, ensure_exists, DbError, Table};
use crate::models::Resource;

/// Preferred category, joined with its name
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserPreference {
    pub id: i32,
    pub categoria_id: i32,
    pub categoria_nombre: String,
    pub categoria_descripcion: Option<String>,
}

/// Followed diet, joined with its name
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserDiet {
    pub id: i32,
    pub dieta_id: i32,
    pub dieta_nombre: String,
    pub restricciones: Option<String>,
    pub fecha_inicio: DateTime<Utc>,
}

/// Preference repository
pub struct PreferenceRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> PreferenceRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, usuario_id: Uuid) -> Result<Vec<UserPreference>, DbError> {
        let prefs = sqlx::query_as::<_, UserPreference>(
            r#"
            SELECT p.id, p.categoria_id,
                   c.nombre AS categoria_nombre, c.descripcion AS categoria_descripcion
            FROM preferencias_usuario p
            JOIN categorias c ON c.id = p.categoria_id
            WHERE p.usuario_id = $1
            ORDER BY c.nombre
            "#,
        )
        .bind(usuario_id)
        .fetch_all(self.pool)
        .await?;
        Ok(prefs)
    }

    /// Add one category. Unknown category is `NotFound`, duplicate is `Conflict`.
    pub async fn add(&self, usuario_id: Uuid, categoria_id: i32) -> Result<UserPreference, DbError> {
        ensure_exists(self.pool, Table::Categories, categoria_id).await?;

        let sql = r#"
            WITH inserted AS (
                INSERT INTO preferencias_usuario (usuario_id, categoria_id)
                VALUES ($1, $2)
                RETURNING id, categoria_id
            )
            SELECT i.id, i.categoria_id,
                   c.nombre AS categoria_nombre, c.descripcion AS categoria_descripcion
            FROM inserted i
            JOIN categorias c ON c.id = i.categoria_id
        "#;
        sqlx::query_as::<_, UserPreference>(sql)
            .bind(usuario_id)
            .bind(categoria_id)
            .fetch_one(self.pool)
            .await
            .map_err(DbError::unique(Resource::Preference))
    }

    pub async fn remove(&self, usuario_id: Uuid, categoria_id: i32) -> Result<(), DbError> {
        let result = sqlx::query(
            "DELETE FROM preferencias_usuario WHERE usuario_id = $1 AND categoria_id = $2",
        )
        .bind(usuario_id)
        .bind(categoria_id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Preference, categoria_id));
        }
        Ok(())
    }

    /// Replace the whole preference set in one transaction.
    pub async fn replace(
        &self,
        usuario_id: Uuid,
        categorias: &[i32],
    ) -> Result<Vec<UserPreference>, DbError> {
        ensure_all_exist(self.pool, Table::Categories, categorias).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM preferencias_usuario WHERE usuario_id = $1")
            .bind(usuario_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO preferencias_usuario (usuario_id, categoria_id)
            SELECT $1, UNNEST($2::int[])
            ON CONFLICT (usuario_id, categoria_id) DO NOTHING
            "#,
        )
        .bind(usuario_id)
        .bind(categorias)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.list(usuario_id).await
    }

    // === Diets ===

    pub async fn list_diets(&self, usuario_id: Uuid) -> Result<Vec<UserDiet>, DbError> {
        let diets = sqlx::query_as::<_, UserDiet>(
            r#"
            SELECT du.id, du.dieta_id, d.nombre AS dieta_nombre, d.restricciones, du.fecha_inicio
            FROM dietas_usuario du
            JOIN dietas d ON d.id = du.dieta_id
            WHERE du.usuario_id = $1
            ORDER BY du.fecha_inicio DESC
            "#,
        )
        .bind(usuario_id)
        .fetch_all(self.pool)
        .await?;
        Ok(diets)
    }

    /// Ids of the diets a user follows.
    pub async fn diet_ids(&self, usuario_id: Uuid) -> Result<Vec<i32>, DbError> {
        let ids: Vec<(i32,)> = sqlx::query_as("SELECT dieta_id FROM dietas_usuario WHERE usuario_id = $1")
            .bind(usuario_id)
            .fetch_all(self.pool)
            .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    /// Replace followed diets, keeping the start date of diets already followed.
    pub async fn replace_diets(&self, usuario_id: Uuid, dietas: &[i32]) -> Result<Vec<UserDiet>, DbError> {
        ensure_all_exist(self.pool, Table::Diets, dietas).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM dietas_usuario WHERE usuario_id = $1 AND NOT (dieta_id = ANY($2))")
            .bind(usuario_id)
            .bind(dietas)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO dietas_usuario (usuario_id, dieta_id)
            SELECT $1, UNNEST($2::int[])
            ON CONFLICT (usuario_id, dieta_id) DO NOTHING
            "#,
        )
        .bind(usuario_id)
        .bind(dietas)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.list_diets(usuario_id).await
    }
}
