//! Collection repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{ensure_exists, fetch_page, like_pattern, DbError, Table};
use crate::models::{Paginated, Pagination, Resource};

/// Collection joined with its owner and recipe count
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Collection {
    pub id: i32,
    pub usuario_id: Uuid,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub es_publica: bool,
    pub fecha_creacion: DateTime<Utc>,
    pub usuario_nombre: Option<String>,
    pub usuario_foto: Option<String>,
    pub recetas_count: i64,
}

/// Which collections a listing may show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionScope {
    /// Every collection of this user, private ones included
    OwnedBy(Uuid),
    /// Public collections of this user
    PublicOf(Uuid),
    /// Public collections of everyone
    Public,
}

impl CollectionScope {
    /// Resolve the listing scope from the `usuario` and `solo_publicas`
    /// parameters and the caller.
    pub fn resolve(usuario: Option<Uuid>, solo_publicas: bool, caller: Option<Uuid>) -> Self {
        match (usuario, caller) {
            (Some(owner), Some(me)) if owner == me && !solo_publicas => Self::OwnedBy(owner),
            (Some(owner), _) => Self::PublicOf(owner),
            (None, Some(me)) if !solo_publicas => Self::OwnedBy(me),
            (None, _) => Self::Public,
        }
    }

    fn owner(self) -> Option<Uuid> {
        match self {
            Self::OwnedBy(id) | Self::PublicOf(id) => Some(id),
            Self::Public => None,
        }
    }

    fn public_only(self) -> bool {
        !matches!(self, Self::OwnedBy(_))
    }
}

/// Validated collection fields
#[derive(Debug, Clone)]
pub struct CollectionInput {
    pub nombre: String,
    pub descripcion: Option<String>,
    pub es_publica: Option<bool>,
}

const COLLECTION_SELECT: &str = r#"
    SELECT c.id, c.usuario_id, c.nombre, c.descripcion, c.es_publica, c.fecha_creacion,
           u.nombre AS usuario_nombre, u.url_foto_perfil AS usuario_foto,
           (SELECT COUNT(*) FROM recetas_coleccion rc WHERE rc.coleccion_id = c.id) AS recetas_count
    FROM colecciones c
    JOIN usuarios u ON u.id = c.usuario_id
"#;

/// Collection repository
pub struct CollectionRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> CollectionRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Collections visible in `scope`, newest first.
    pub async fn list(
        &self,
        scope: CollectionScope,
        nombre: Option<&str>,
        page: Pagination,
    ) -> Result<Paginated<Collection>, DbError> {
        let sql = format!(
            r#"
            SELECT listed.*, COUNT(*) OVER() AS total
            FROM ({COLLECTION_SELECT}
                  WHERE ($1::uuid IS NULL OR c.usuario_id = $1)
                    AND ($2 = FALSE OR c.es_publica)
                    AND ($3::text IS NULL OR c.nombre ILIKE $3)) AS listed
            ORDER BY listed.fecha_creacion DESC, listed.id DESC
            LIMIT $4 OFFSET $5
            "#
        );
        fetch_page(page, |limit, offset| {
            sqlx::query(&sql)
                .bind(scope.owner())
                .bind(scope.public_only())
                .bind(nombre.map(like_pattern))
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool)
        })
        .await
    }

    pub async fn get(&self, id: i32) -> Result<Collection, DbError> {
        let sql = format!("{COLLECTION_SELECT} WHERE c.id = $1");
        sqlx::query_as::<_, Collection>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(Resource::Collection, id))
    }

    pub async fn create(&self, usuario_id: Uuid, input: CollectionInput) -> Result<Collection, DbError> {
        let (id,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO colecciones (usuario_id, nombre, descripcion, es_publica)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(usuario_id)
        .bind(&input.nombre)
        .bind(input.descripcion.as_deref())
        .bind(input.es_publica.unwrap_or(false))
        .fetch_one(self.pool)
        .await?;
        self.get(id).await
    }

    pub async fn update(&self, id: i32, input: CollectionInput) -> Result<Collection, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE colecciones SET
                nombre = $2,
                descripcion = COALESCE($3, descripcion),
                es_publica = COALESCE($4, es_publica)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&input.nombre)
        .bind(input.descripcion.as_deref())
        .bind(input.es_publica)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Collection, id));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM colecciones WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Collection, id));
        }
        Ok(())
    }

    /// Add a recipe. Unknown recipe is `NotFound`, already present is `Conflict`.
    pub async fn add_recipe(&self, coleccion_id: i32, receta_id: i32) -> Result<DateTime<Utc>, DbError> {
        ensure_exists(self.pool, Table::Recipes, receta_id).await?;

        let (fecha,): (DateTime<Utc>,) = sqlx::query_as(
            r#"
            INSERT INTO recetas_coleccion (coleccion_id, receta_id) VALUES ($1, $2)
            RETURNING fecha_agregado
            "#,
        )
        .bind(coleccion_id)
        .bind(receta_id)
        .fetch_one(self.pool)
        .await
        .map_err(DbError::unique(Resource::CollectionRecipe))?;
        Ok(fecha)
    }

    pub async fn remove_recipe(&self, coleccion_id: i32, receta_id: i32) -> Result<(), DbError> {
        let result =
            sqlx::query("DELETE FROM recetas_coleccion WHERE coleccion_id = $1 AND receta_id = $2")
                .bind(coleccion_id)
                .bind(receta_id)
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::CollectionRecipe, receta_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_resolution() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert_eq!(CollectionScope::resolve(Some(me), false, Some(me)), CollectionScope::OwnedBy(me));
        assert_eq!(CollectionScope::resolve(Some(me), true, Some(me)), CollectionScope::PublicOf(me));
        assert_eq!(
            CollectionScope::resolve(Some(other), false, Some(me)),
            CollectionScope::PublicOf(other)
        );
        assert_eq!(CollectionScope::resolve(Some(other), false, None), CollectionScope::PublicOf(other));
        assert_eq!(CollectionScope::resolve(None, false, Some(me)), CollectionScope::OwnedBy(me));
        assert_eq!(CollectionScope::resolve(None, true, Some(me)), CollectionScope::Public);
        assert_eq!(CollectionScope::resolve(None, false, None), CollectionScope::Public);
    }

    #[test]
    fn only_owned_scope_shows_private() {
        assert!(!CollectionScope::OwnedBy(Uuid::nil()).public_only());
        assert!(CollectionScope::PublicOf(Uuid::nil()).public_only());
        assert!(CollectionScope::Public.public_only());
        assert_eq!(CollectionScope::Public.owner(), None);
    }
}
