//! Recipe attempt repository - photos of users cooking a recipe.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{ensure_exists, fetch_page, DbError, Table};
use crate::models::{Paginated, Pagination, Resource};

/// Attempt joined with the user's public profile
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Attempt {
    pub id: i32,
    pub receta_id: i32,
    pub usuario_id: Option<Uuid>,
    pub imagen_url: String,
    pub comentario: Option<String>,
    pub fecha: DateTime<Utc>,
    pub usuario_nombre: Option<String>,
    pub usuario_foto: Option<String>,
}

const ATTEMPT_SELECT: &str = r#"
    SELECT i.id, i.receta_id, i.usuario_id, i.imagen_url, i.comentario, i.fecha,
           u.nombre AS usuario_nombre, u.url_foto_perfil AS usuario_foto
    FROM intentos_recetas i
    LEFT JOIN usuarios u ON u.id = i.usuario_id
"#;

/// Attempt repository
pub struct AttemptRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> AttemptRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, receta_id: i32, page: Pagination) -> Result<Paginated<Attempt>, DbError> {
        ensure_exists(self.pool, Table::Recipes, receta_id).await?;

        let sql = format!(
            "SELECT listed.*, COUNT(*) OVER() AS total FROM ({ATTEMPT_SELECT} WHERE i.receta_id = $1) AS listed \
             ORDER BY listed.fecha DESC, listed.id DESC LIMIT $2 OFFSET $3"
        );
        fetch_page(page, |limit, offset| {
            sqlx::query(&sql)
                .bind(receta_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool)
        })
        .await
    }

    pub async fn get(&self, receta_id: i32, id: i32) -> Result<Attempt, DbError> {
        let sql = format!("{ATTEMPT_SELECT} WHERE i.id = $1 AND i.receta_id = $2");
        sqlx::query_as::<_, Attempt>(&sql)
            .bind(id)
            .bind(receta_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(Resource::Attempt, id))
    }

    pub async fn create(
        &self,
        receta_id: i32,
        usuario_id: Uuid,
        imagen_url: &str,
        comentario: Option<&str>,
    ) -> Result<Attempt, DbError> {
        ensure_exists(self.pool, Table::Recipes, receta_id).await?;

        let (id,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO intentos_recetas (usuario_id, receta_id, imagen_url, comentario)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(usuario_id)
        .bind(receta_id)
        .bind(imagen_url)
        .bind(comentario)
        .fetch_one(self.pool)
        .await?;
        self.get(receta_id, id).await
    }

    /// Change the photo and/or the comment; absent fields are kept.
    pub async fn update(
        &self,
        receta_id: i32,
        id: i32,
        imagen_url: Option<&str>,
        comentario: Option<&str>,
    ) -> Result<Attempt, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE intentos_recetas SET
                imagen_url = COALESCE($3, imagen_url),
                comentario = COALESCE($4, comentario)
            WHERE id = $1 AND receta_id = $2
            "#,
        )
        .bind(id)
        .bind(receta_id)
        .bind(imagen_url)
        .bind(comentario)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Attempt, id));
        }
        self.get(receta_id, id).await
    }

    pub async fn delete(&self, receta_id: i32, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM intentos_recetas WHERE id = $1 AND receta_id = $2")
            .bind(id)
            .bind(receta_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Attempt, id));
        }
        Ok(())
    }
}
