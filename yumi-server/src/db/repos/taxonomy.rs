//! Taxonomy repository - categories, diets, tags, units, conversions and
//! profile colors.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use yumi_core::ConversionFactor;

use super::{fetch_page, like_pattern, DbError};
use crate::models::{Paginated, Pagination, Resource, UnitKind};

/// Category with the number of recipes filed under it
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub id: i32,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub recetas_count: i64,
}

/// Diet with recipe and follower counts
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Diet {
    pub id: i32,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub restricciones: Option<String>,
    pub recetas_count: i64,
    pub usuarios_count: i64,
}

/// A user following a diet
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DietFollower {
    pub id: Uuid,
    pub nombre: Option<String>,
    pub url_foto_perfil: Option<String>,
    pub fecha_inicio: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Tag {
    pub id: i32,
    pub nombre: String,
}

/// Unit of measure
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Unit {
    pub id: i32,
    pub nombre: String,
    pub abreviatura: String,
    pub tipo: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Color {
    pub id: Uuid,
    pub nombre: String,
    pub codigo: String,
}

/// Name and description fields shared by categories and diets
#[derive(Debug, Clone)]
pub struct TaxonInput {
    pub nombre: String,
    pub descripcion: Option<String>,
    pub restricciones: Option<String>,
}

const CATEGORY_SELECT: &str = r#"
    SELECT c.id, c.nombre, c.descripcion,
           (SELECT COUNT(*) FROM recetas r WHERE r.categoria_id = c.id) AS recetas_count
    FROM categorias c
"#;

const DIET_SELECT: &str = r#"
    SELECT d.id, d.nombre, d.descripcion, d.restricciones,
           (SELECT COUNT(*) FROM recetas r WHERE r.dieta_id = d.id) AS recetas_count,
           (SELECT COUNT(*) FROM dietas_usuario du WHERE du.dieta_id = d.id) AS usuarios_count
    FROM dietas d
"#;

/// Taxonomy repository
pub struct TaxonomyRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> TaxonomyRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // === Categories ===

    pub async fn list_categories(
        &self,
        nombre: Option<&str>,
        page: Pagination,
    ) -> Result<Paginated<Category>, DbError> {
        fetch_page(page, |limit, offset| {
            sqlx::query(
                r#"
                SELECT c.id, c.nombre, c.descripcion,
                       COUNT(r.id) AS recetas_count,
                       COUNT(*) OVER() AS total
                FROM categorias c
                LEFT JOIN recetas r ON r.categoria_id = c.id
                WHERE ($1::text IS NULL OR c.nombre ILIKE $1)
                GROUP BY c.id
                ORDER BY c.nombre ASC
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(nombre.map(like_pattern))
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
        })
        .await
    }

    pub async fn get_category(&self, id: i32) -> Result<Category, DbError> {
        let sql = format!("{CATEGORY_SELECT} WHERE c.id = $1");
        sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(Resource::Category, id))
    }

    pub async fn create_category(&self, input: TaxonInput) -> Result<Category, DbError> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categorias (nombre, descripcion) VALUES ($1, $2)
            RETURNING id, nombre, descripcion, 0::bigint AS recetas_count
            "#,
        )
        .bind(&input.nombre)
        .bind(input.descripcion.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(DbError::unique(Resource::Category))
    }

    pub async fn update_category(&self, id: i32, input: TaxonInput) -> Result<Category, DbError> {
        let updated = sqlx::query("UPDATE categorias SET nombre = $2, descripcion = $3 WHERE id = $1")
            .bind(id)
            .bind(&input.nombre)
            .bind(input.descripcion.as_deref())
            .execute(self.pool)
            .await
            .map_err(DbError::unique(Resource::Category))?;
        if updated.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Category, id));
        }
        self.get_category(id).await
    }

    pub async fn delete_category(&self, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM categorias WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Category, id));
        }
        Ok(())
    }

    // === Diets ===

    pub async fn list_diets(
        &self,
        nombre: Option<&str>,
        page: Pagination,
    ) -> Result<Paginated<Diet>, DbError> {
        let sql = format!(
            r#"
            SELECT listed.*, COUNT(*) OVER() AS total
            FROM ({DIET_SELECT} WHERE ($1::text IS NULL OR d.nombre ILIKE $1)) AS listed
            ORDER BY listed.nombre ASC
            LIMIT $2 OFFSET $3
            "#
        );
        fetch_page(page, |limit, offset| {
            sqlx::query(&sql)
                .bind(nombre.map(like_pattern))
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool)
        })
        .await
    }

    pub async fn get_diet(&self, id: i32) -> Result<Diet, DbError> {
        let sql = format!("{DIET_SELECT} WHERE d.id = $1");
        sqlx::query_as::<_, Diet>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(Resource::Diet, id))
    }

    pub async fn create_diet(&self, input: TaxonInput) -> Result<Diet, DbError> {
        sqlx::query_as::<_, Diet>(
            r#"
            INSERT INTO dietas (nombre, descripcion, restricciones) VALUES ($1, $2, $3)
            RETURNING id, nombre, descripcion, restricciones,
                      0::bigint AS recetas_count, 0::bigint AS usuarios_count
            "#,
        )
        .bind(&input.nombre)
        .bind(input.descripcion.as_deref())
        .bind(input.restricciones.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(DbError::unique(Resource::Diet))
    }

    pub async fn update_diet(&self, id: i32, input: TaxonInput) -> Result<Diet, DbError> {
        let updated = sqlx::query(
            "UPDATE dietas SET nombre = $2, descripcion = $3, restricciones = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(&input.nombre)
        .bind(input.descripcion.as_deref())
        .bind(input.restricciones.as_deref())
        .execute(self.pool)
        .await
        .map_err(DbError::unique(Resource::Diet))?;
        if updated.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Diet, id));
        }
        self.get_diet(id).await
    }

    pub async fn delete_diet(&self, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM dietas WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Diet, id));
        }
        Ok(())
    }

    /// Users following a diet, most recent first.
    pub async fn diet_followers(
        &self,
        dieta_id: i32,
        page: Pagination,
    ) -> Result<Paginated<DietFollower>, DbError> {
        fetch_page(page, |limit, offset| {
            sqlx::query(
                r#"
                SELECT u.id, u.nombre, u.url_foto_perfil, du.fecha_inicio,
                       COUNT(*) OVER() AS total
                FROM dietas_usuario du
                JOIN usuarios u ON u.id = du.usuario_id
                WHERE du.dieta_id = $1
                ORDER BY du.fecha_inicio DESC
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(dieta_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
        })
        .await
    }

    // === Tags ===

    pub async fn list_tags(&self) -> Result<Vec<Tag>, DbError> {
        let tags = sqlx::query_as::<_, Tag>("SELECT id, nombre FROM etiquetas ORDER BY nombre")
            .fetch_all(self.pool)
            .await?;
        Ok(tags)
    }

    pub async fn create_tag(&self, nombre: &str) -> Result<Tag, DbError> {
        sqlx::query_as::<_, Tag>("INSERT INTO etiquetas (nombre) VALUES ($1) RETURNING id, nombre")
            .bind(nombre)
            .fetch_one(self.pool)
            .await
            .map_err(DbError::unique(Resource::Tag))
    }

    pub async fn delete_tag(&self, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM etiquetas WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Tag, id));
        }
        Ok(())
    }

    // === Units and conversions ===

    pub async fn list_units(&self) -> Result<Vec<Unit>, DbError> {
        let units = sqlx::query_as::<_, Unit>(
            "SELECT id, nombre, abreviatura, tipo FROM unidades_medida ORDER BY tipo, nombre",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(units)
    }

    pub async fn create_unit(
        &self,
        nombre: &str,
        abreviatura: &str,
        tipo: UnitKind,
    ) -> Result<Unit, DbError> {
        sqlx::query_as::<_, Unit>(
            r#"
            INSERT INTO unidades_medida (nombre, abreviatura, tipo) VALUES ($1, $2, $3)
            RETURNING id, nombre, abreviatura, tipo
            "#,
        )
        .bind(nombre)
        .bind(abreviatura)
        .bind(tipo.as_str())
        .fetch_one(self.pool)
        .await
        .map_err(DbError::unique(Resource::Unit))
    }

    /// All conversion factors, keyed by unit abbreviation.
    pub async fn conversion_table(&self) -> Result<Vec<ConversionFactor>, DbError> {
        let rows: Vec<(String, String, f64)> = sqlx::query_as(
            r#"
            SELECT desde.abreviatura, hacia.abreviatura, c.factor
            FROM conversiones c
            JOIN unidades_medida desde ON desde.id = c.desde_unidad_id
            JOIN unidades_medida hacia ON hacia.id = c.hacia_unidad_id
            "#,
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(desde, hacia, factor)| ConversionFactor::new(desde, hacia, factor))
            .collect())
    }

    // === Colors ===

    pub async fn list_colors(&self) -> Result<Vec<Color>, DbError> {
        let colors = sqlx::query_as::<_, Color>("SELECT id, nombre, codigo FROM colores ORDER BY nombre")
            .fetch_all(self.pool)
            .await?;
        Ok(colors)
    }

    pub async fn get_color(&self, id: Uuid) -> Result<Color, DbError> {
        sqlx::query_as::<_, Color>("SELECT id, nombre, codigo FROM colores WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(Resource::Color, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxon(nombre: String) -> TaxonInput {
        TaxonInput {
            nombre,
            descripcion: None,
            restricciones: None,
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn page_totals_hold_past_the_last_page() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool");
        crate::db::schema::run(&pool).await.expect("schema");

        let prefix = format!("pag-{}-", Uuid::new_v4().simple());
        let repo = TaxonomyRepo::new(&pool);
        let mut ids = Vec::new();
        for suffix in ["a", "b", "c"] {
            let category = repo
                .create_category(taxon(format!("{prefix}{suffix}")))
                .await
                .expect("insert");
            ids.push(category.id);
        }

        let first = repo.list_categories(Some(&prefix), Pagination::new(1, 2)).await.unwrap();
        let last = repo.list_categories(Some(&prefix), Pagination::new(2, 2)).await.unwrap();
        let past = repo.list_categories(Some(&prefix), Pagination::new(99, 2)).await.unwrap();

        assert_eq!(first.data.len(), 2);
        assert_eq!(first.meta.total, 3);
        assert_eq!(first.meta.total_pages, 2);
        assert_eq!(last.data.len(), 1);
        assert_eq!(last.meta.total, 3);
        assert!(past.data.is_empty());
        assert_eq!(past.meta.total, first.meta.total);
        assert_eq!(past.meta.total_pages, 2);
        assert_eq!(past.meta.page, 99);

        for id in ids {
            repo.delete_category(id).await.expect("cleanup");
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn empty_filter_past_the_end_is_zero() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool");
        crate::db::schema::run(&pool).await.expect("schema");

        let nombre = format!("nada-{}", Uuid::new_v4().simple());
        let past = TaxonomyRepo::new(&pool)
            .list_diets(Some(&nombre), Pagination::new(5, 10))
            .await
            .unwrap();
        assert!(past.data.is_empty());
        assert_eq!(past.meta.total, 0);
        assert_eq!(past.meta.total_pages, 0);
    }
}
