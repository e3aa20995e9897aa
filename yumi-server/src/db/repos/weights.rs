//! Weight history repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use yumi_core::WeightSample;

use super::DbError;
use crate::models::Resource;

/// Weight entry from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WeightEntry {
    pub id: i32,
    pub usuario_id: Uuid,
    pub peso: f64,
    pub fecha: DateTime<Utc>,
}

impl From<&WeightEntry> for WeightSample {
    fn from(e: &WeightEntry) -> Self {
        WeightSample {
            fecha: e.fecha,
            peso: e.peso,
        }
    }
}

/// Weight history repository
pub struct WeightRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> WeightRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Most recent entries first.
    pub async fn list(&self, usuario_id: Uuid, limit: i64) -> Result<Vec<WeightEntry>, DbError> {
        let entries = sqlx::query_as::<_, WeightEntry>(
            r#"
            SELECT id, usuario_id, peso, fecha
            FROM historial_peso
            WHERE usuario_id = $1
            ORDER BY fecha DESC
            LIMIT $2
            "#,
        )
        .bind(usuario_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(entries)
    }

    /// Record a weigh-in and copy it onto the user's goal, atomically.
    pub async fn record(
        &self,
        usuario_id: Uuid,
        peso: f64,
        fecha: Option<DateTime<Utc>>,
    ) -> Result<WeightEntry, DbError> {
        let mut tx = self.pool.begin().await?;

        let entry = sqlx::query_as::<_, WeightEntry>(
            r#"
            INSERT INTO historial_peso (usuario_id, peso, fecha)
            VALUES ($1, $2, COALESCE($3, NOW()))
            RETURNING id, usuario_id, peso, fecha
            "#,
        )
        .bind(usuario_id)
        .bind(peso)
        .bind(fecha)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE metas_usuario
            SET peso = $2, fecha_actualizacion = NOW()
            WHERE usuario_id = $1
            "#,
        )
        .bind(usuario_id)
        .bind(peso)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(entry)
    }

    /// Get one entry by id.
    pub async fn get(&self, id: i32) -> Result<WeightEntry, DbError> {
        sqlx::query_as::<_, WeightEntry>(
            "SELECT id, usuario_id, peso, fecha FROM historial_peso WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found(Resource::WeightEntry, id))
    }

    pub async fn delete(&self, id: i32) -> Result<(), DbError> {
        sqlx::query("DELETE FROM historial_peso WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
