//! Goal repository - one goal row per user, upserted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use super::DbError;
use crate::models::{ActivityLevel, Purpose, Resource};

const GOAL_COLUMNS: &str = "id, usuario_id, altura, peso, actividad_diaria, limite_calorias, \
     proposito, fecha_inicio, fecha_actualizacion";

/// Goal record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Goal {
    pub id: i32,
    pub usuario_id: Uuid,
    pub altura: Option<f64>,
    pub peso: Option<f64>,
    pub actividad_diaria: Option<String>,
    pub limite_calorias: Option<i32>,
    pub proposito: Option<String>,
    pub fecha_inicio: DateTime<Utc>,
    pub fecha_actualizacion: DateTime<Utc>,
}

/// Validated goal fields; `None` keeps the stored value on update
#[derive(Debug, Clone, Default)]
pub struct GoalChanges {
    pub altura: Option<f64>,
    pub peso: Option<f64>,
    pub actividad_diaria: Option<ActivityLevel>,
    pub limite_calorias: Option<i32>,
    pub proposito: Option<Purpose>,
}

/// Goal repository
pub struct GoalRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> GoalRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Goals for a user, most recently updated first.
    pub async fn list(&self, usuario_id: Uuid) -> Result<Vec<Goal>, DbError> {
        let sql = format!(
            "SELECT {GOAL_COLUMNS} FROM metas_usuario WHERE usuario_id = $1 \
             ORDER BY fecha_actualizacion DESC"
        );
        let goals = sqlx::query_as::<_, Goal>(&sql)
            .bind(usuario_id)
            .fetch_all(self.pool)
            .await?;
        Ok(goals)
    }

    /// The user's goal, if any.
    pub async fn current(&self, usuario_id: Uuid) -> Result<Option<Goal>, DbError> {
        Ok(self.list(usuario_id).await?.into_iter().next())
    }

    /// Insert or merge the user's goal. Returns the row and whether it was
    /// newly created.
    pub async fn upsert(&self, usuario_id: Uuid, changes: GoalChanges) -> Result<(Goal, bool), DbError> {
        let sql = format!(
            r#"
            INSERT INTO metas_usuario
                (usuario_id, altura, peso, actividad_diaria, limite_calorias, proposito)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (usuario_id) DO UPDATE SET
                altura = COALESCE(EXCLUDED.altura, metas_usuario.altura),
                peso = COALESCE(EXCLUDED.peso, metas_usuario.peso),
                actividad_diaria = COALESCE(EXCLUDED.actividad_diaria, metas_usuario.actividad_diaria),
                limite_calorias = COALESCE(EXCLUDED.limite_calorias, metas_usuario.limite_calorias),
                proposito = COALESCE(EXCLUDED.proposito, metas_usuario.proposito),
                fecha_actualizacion = NOW()
            RETURNING {GOAL_COLUMNS}, (xmax = 0) AS inserted
            "#
        );
        let row = sqlx::query(&sql)
            .bind(usuario_id)
            .bind(changes.altura)
            .bind(changes.peso)
            .bind(changes.actividad_diaria.map(ActivityLevel::as_str))
            .bind(changes.limite_calorias)
            .bind(changes.proposito.as_ref().map(Purpose::as_str))
            .fetch_one(self.pool)
            .await?;

        let inserted: bool = row.try_get("inserted")?;
        Ok((Goal::from_row(&row)?, inserted))
    }

    /// Delete the user's goal.
    pub async fn delete(&self, usuario_id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM metas_usuario WHERE usuario_id = $1")
            .bind(usuario_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Goal, usuario_id));
        }
        Ok(())
    }
}
