//! Recipe tip repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{ensure_exists, DbError, Table};
use crate::models::{Resource, TipKind};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Tip {
    pub id: i32,
    pub receta_id: i32,
    pub usuario_id: Option<Uuid>,
    pub contenido: String,
    pub tipo: String,
    pub fecha: DateTime<Utc>,
    pub usuario_nombre: Option<String>,
}

const TIP_SELECT: &str = r#"
    SELECT t.id, t.receta_id, t.usuario_id, t.contenido, t.tipo, t.fecha,
           u.nombre AS usuario_nombre
    FROM consejos_recetas t
    LEFT JOIN usuarios u ON u.id = t.usuario_id
"#;

/// Tip repository
pub struct TipRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> TipRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, receta_id: i32) -> Result<Vec<Tip>, DbError> {
        ensure_exists(self.pool, Table::Recipes, receta_id).await?;

        let sql = format!("{TIP_SELECT} WHERE t.receta_id = $1 ORDER BY t.fecha DESC");
        let tips = sqlx::query_as::<_, Tip>(&sql)
            .bind(receta_id)
            .fetch_all(self.pool)
            .await?;
        Ok(tips)
    }

    pub async fn get(&self, receta_id: i32, id: i32) -> Result<Tip, DbError> {
        let sql = format!("{TIP_SELECT} WHERE t.id = $1 AND t.receta_id = $2");
        sqlx::query_as::<_, Tip>(&sql)
            .bind(id)
            .bind(receta_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(Resource::Tip, id))
    }

    pub async fn create(
        &self,
        receta_id: i32,
        usuario_id: Uuid,
        contenido: &str,
        tipo: TipKind,
    ) -> Result<Tip, DbError> {
        ensure_exists(self.pool, Table::Recipes, receta_id).await?;

        let (id,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO consejos_recetas (receta_id, usuario_id, contenido, tipo)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(receta_id)
        .bind(usuario_id)
        .bind(contenido)
        .bind(tipo.as_str())
        .fetch_one(self.pool)
        .await?;
        self.get(receta_id, id).await
    }

    pub async fn delete(&self, receta_id: i32, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM consejos_recetas WHERE id = $1 AND receta_id = $2")
            .bind(id)
            .bind(receta_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Tip, id));
        }
        Ok(())
    }
}
