//! User repository
//!
//! Users are keyed internally by UUID and externally by the identity
//! provider's subject (`external_id`).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{fetch_page, like_pattern, DbError};
use crate::models::{Email, Paginated, Pagination, Resource};

const USER_COLUMNS: &str = "id, external_id, nombre, email, color_id, dark_mode, \
     url_foto_perfil, fecha_registro, ultima_actualizacion";

/// User record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub nombre: Option<String>,
    pub email: String,
    pub color_id: Option<Uuid>,
    pub dark_mode: bool,
    pub url_foto_perfil: Option<String>,
    pub fecha_registro: DateTime<Utc>,
    pub ultima_actualizacion: DateTime<Utc>,
}

/// What another user may see
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub nombre: Option<String>,
    pub url_foto_perfil: Option<String>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            nombre: u.nombre,
            url_foto_perfil: u.url_foto_perfil,
        }
    }
}

/// Sort order for user listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserOrder {
    #[default]
    NewestFirst,
    OldestFirst,
    NameAsc,
    NameDesc,
}

impl UserOrder {
    /// Parse the `ordenar` query value; unknown values keep the default.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("fecha_asc") => Self::OldestFirst,
            Some("nombre_asc") => Self::NameAsc,
            Some("nombre_desc") => Self::NameDesc,
            _ => Self::NewestFirst,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Self::NewestFirst => "fecha_registro DESC",
            Self::OldestFirst => "fecha_registro ASC",
            Self::NameAsc => "nombre ASC NULLS LAST",
            Self::NameDesc => "nombre DESC NULLS LAST",
        }
    }
}

/// New user fields
#[derive(Debug, Clone)]
pub struct NewUser {
    pub external_id: String,
    pub email: Email,
    pub nombre: Option<String>,
    pub url_foto_perfil: Option<String>,
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub nombre: Option<String>,
    pub color_id: Option<Uuid>,
    pub dark_mode: Option<bool>,
    pub url_foto_perfil: Option<String>,
    pub email: Option<Email>,
}

/// User repository
pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find the user for an identity-provider subject.
    pub async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, DbError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM usuarios WHERE external_id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(external_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Like `find_by_external_id`, but a missing row is `NotFound`.
    pub async fn require_by_external_id(&self, external_id: &str) -> Result<User, DbError> {
        self.find_by_external_id(external_id)
            .await?
            .ok_or_else(|| DbError::not_found(Resource::User, external_id))
    }

    /// Get a user by internal id.
    pub async fn get(&self, id: Uuid) -> Result<User, DbError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM usuarios WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(Resource::User, id))
    }

    /// List users filtered by name and email substrings.
    pub async fn list(
        &self,
        nombre: Option<&str>,
        email: Option<&str>,
        order: UserOrder,
        page: Pagination,
    ) -> Result<Paginated<User>, DbError> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}, COUNT(*) OVER() AS total
            FROM usuarios
            WHERE ($1::text IS NULL OR nombre ILIKE $1)
              AND ($2::text IS NULL OR email ILIKE $2)
            ORDER BY {}
            LIMIT $3 OFFSET $4
            "#,
            order.sql()
        );
        fetch_page(page, |limit, offset| {
            sqlx::query(&sql)
                .bind(nombre.map(like_pattern))
                .bind(email.map(like_pattern))
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool)
        })
        .await
    }

    /// Create a user. Duplicate external id or email is a conflict.
    pub async fn create(&self, new: NewUser) -> Result<User, DbError> {
        let sql = format!(
            r#"
            INSERT INTO usuarios (external_id, email, nombre, url_foto_perfil)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&new.external_id)
            .bind(new.email.as_str())
            .bind(new.nombre.as_deref())
            .bind(new.url_foto_perfil.as_deref())
            .fetch_one(self.pool)
            .await
            .map_err(DbError::unique(Resource::User))
    }

    /// Create or refresh the user for a subject.
    pub async fn upsert_by_external_id(&self, new: NewUser) -> Result<User, DbError> {
        let sql = format!(
            r#"
            INSERT INTO usuarios (external_id, email, nombre, url_foto_perfil)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (external_id) DO UPDATE SET
                email = EXCLUDED.email,
                nombre = COALESCE(EXCLUDED.nombre, usuarios.nombre),
                url_foto_perfil = COALESCE(EXCLUDED.url_foto_perfil, usuarios.url_foto_perfil),
                ultima_actualizacion = NOW()
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&new.external_id)
            .bind(new.email.as_str())
            .bind(new.nombre.as_deref())
            .bind(new.url_foto_perfil.as_deref())
            .fetch_one(self.pool)
            .await
            .map_err(DbError::unique(Resource::User))
    }

    /// Apply a partial update.
    pub async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, DbError> {
        if let Some(color_id) = changes.color_id {
            let (exists,): (bool,) =
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM colores WHERE id = $1)")
                    .bind(color_id)
                    .fetch_one(self.pool)
                    .await?;
            if !exists {
                return Err(DbError::not_found(Resource::Color, color_id));
            }
        }

        let sql = format!(
            r#"
            UPDATE usuarios SET
                nombre = COALESCE($2, nombre),
                color_id = COALESCE($3, color_id),
                dark_mode = COALESCE($4, dark_mode),
                url_foto_perfil = COALESCE($5, url_foto_perfil),
                email = COALESCE($6, email),
                ultima_actualizacion = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.nombre.as_deref())
            .bind(changes.color_id)
            .bind(changes.dark_mode)
            .bind(changes.url_foto_perfil.as_deref())
            .bind(changes.email.as_ref().map(Email::as_str))
            .fetch_optional(self.pool)
            .await
            .map_err(DbError::unique(Resource::User))?
            .ok_or_else(|| DbError::not_found(Resource::User, id))
    }

    /// Delete a user. Owned rows cascade or are detached per the schema.
    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM usuarios WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::User, id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_param_parsing() {
        assert_eq!(UserOrder::from_param(None), UserOrder::NewestFirst);
        assert_eq!(UserOrder::from_param(Some("nombre_desc")), UserOrder::NameDesc);
        assert_eq!(UserOrder::from_param(Some("bogus")), UserOrder::NewestFirst);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn duplicate_external_id_conflicts() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool");
        crate::db::schema::run(&pool).await.expect("schema");

        let subject = format!("test-{}", Uuid::new_v4());
        let repo = UserRepo::new(&pool);
        let new = NewUser {
            external_id: subject.clone(),
            email: Email::new(&format!("{subject}@example.com")).unwrap(),
            nombre: None,
            url_foto_perfil: None,
        };
        let user = repo.create(new.clone()).await.expect("first insert");
        let err = repo.create(new).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { resource: Resource::User }));

        repo.delete(user.id).await.expect("cleanup");
    }
}
