//! Comment repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{ensure_exists, fetch_page, DbError, Table};
use crate::models::{Paginated, Pagination, Resource};

/// Comment joined with its author's public profile
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
    pub id: i32,
    pub receta_id: i32,
    pub usuario_id: Option<Uuid>,
    pub contenido: String,
    pub fecha: DateTime<Utc>,
    pub usuario_nombre: Option<String>,
    pub usuario_foto: Option<String>,
}

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.receta_id, c.usuario_id, c.contenido, c.fecha,
           u.nombre AS usuario_nombre, u.url_foto_perfil AS usuario_foto
    FROM comentarios c
    LEFT JOIN usuarios u ON u.id = c.usuario_id
"#;

/// Comment repository
pub struct CommentRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> CommentRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Comments on a recipe, newest first.
    pub async fn list(&self, receta_id: i32, page: Pagination) -> Result<Paginated<Comment>, DbError> {
        ensure_exists(self.pool, Table::Recipes, receta_id).await?;

        let sql = format!(
            "SELECT listed.*, COUNT(*) OVER() AS total FROM ({COMMENT_SELECT} WHERE c.receta_id = $1) AS listed \
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

    /// Every comment on a recipe, newest first.
    pub async fn all_for_recipe(&self, receta_id: i32) -> Result<Vec<Comment>, DbError> {
        let sql = format!("{COMMENT_SELECT} WHERE c.receta_id = $1 ORDER BY c.fecha DESC, c.id DESC");
        let comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(receta_id)
            .fetch_all(self.pool)
            .await?;
        Ok(comments)
    }

    /// A comment, only if it belongs to `receta_id`.
    pub async fn get(&self, receta_id: i32, id: i32) -> Result<Comment, DbError> {
        let sql = format!("{COMMENT_SELECT} WHERE c.id = $1 AND c.receta_id = $2");
        sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .bind(receta_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(Resource::Comment, id))
    }

    pub async fn create(&self, receta_id: i32, usuario_id: Uuid, contenido: &str) -> Result<Comment, DbError> {
        ensure_exists(self.pool, Table::Recipes, receta_id).await?;

        let (id,): (i32,) = sqlx::query_as(
            "INSERT INTO comentarios (usuario_id, receta_id, contenido) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(usuario_id)
        .bind(receta_id)
        .bind(contenido)
        .fetch_one(self.pool)
        .await?;
        self.get(receta_id, id).await
    }

    /// Replace the text and bump the date.
    pub async fn update(&self, receta_id: i32, id: i32, contenido: &str) -> Result<Comment, DbError> {
        let result = sqlx::query(
            "UPDATE comentarios SET contenido = $3, fecha = NOW() WHERE id = $1 AND receta_id = $2",
        )
        .bind(id)
        .bind(receta_id)
        .bind(contenido)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Comment, id));
        }
        self.get(receta_id, id).await
    }

    pub async fn delete(&self, receta_id: i32, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM comentarios WHERE id = $1 AND receta_id = $2")
            .bind(id)
            .bind(receta_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Comment, id));
        }
        Ok(())
    }
}
