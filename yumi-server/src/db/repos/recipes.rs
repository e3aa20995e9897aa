//! Recipe repository
//!
//! Every listing (plain list, search, random picks, category and diet pages,
//! favorites, collection contents) goes through one filtered query so the
//! summaries always carry author, taxonomy names and rating aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;

use super::{ensure_all_exist, ensure_exists, fetch_page, like_pattern, DbError, Table};
use crate::models::{Difficulty, Paginated, Pagination, Resource};

const RECIPE_COLUMNS: &str = "r.id, r.autor_id, r.titulo, r.descripcion, r.instrucciones, \
     r.tiempo_preparacion, r.tiempo_coccion, r.porciones, r.dificultad, r.calorias_por_porcion, \
     r.imagen_url, r.categoria_id, r.dieta_id, r.fecha_creacion, r.fecha_actualizacion";

const SUMMARY_JOINS: &str = r#"
    u.nombre AS autor_nombre,
    u.url_foto_perfil AS autor_foto,
    c.nombre AS categoria_nombre,
    d.nombre AS dieta_nombre,
    COALESCE(p.promedio, 0)::float8 AS puntuacion_promedio,
    COALESCE(p.total, 0) AS total_puntuaciones
    FROM recetas r
    LEFT JOIN usuarios u ON u.id = r.autor_id
    LEFT JOIN categorias c ON c.id = r.categoria_id
    LEFT JOIN dietas d ON d.id = r.dieta_id
    LEFT JOIN LATERAL (
        SELECT AVG(puntuacion)::float8 AS promedio, COUNT(*) AS total
        FROM puntuaciones WHERE receta_id = r.id
    ) p ON TRUE
"#;

const FILTER_WHERE: &str = r#"
    WHERE ($1::text IS NULL OR r.titulo ILIKE $1)
      AND ($2::text IS NULL OR r.titulo ILIKE $2 OR r.descripcion ILIKE $2 OR r.instrucciones ILIKE $2)
      AND ($3::int IS NULL OR r.categoria_id = $3)
      AND (cardinality($4::int[]) = 0 OR r.dieta_id = ANY($4))
      AND ($5::uuid IS NULL OR r.autor_id = $5)
      AND (cardinality($6::int[]) = 0 OR EXISTS (
            SELECT 1 FROM recetas_etiquetas re
            WHERE re.receta_id = r.id AND re.etiqueta_id = ANY($6)))
      AND ($7::text IS NULL OR r.dificultad = $7)
      AND ($8::int IS NULL OR r.calorias_por_porcion >= $8)
      AND ($9::int IS NULL OR r.calorias_por_porcion <= $9)
      AND ($10::uuid IS NULL OR EXISTS (
            SELECT 1 FROM favoritos f WHERE f.receta_id = r.id AND f.usuario_id = $10))
      AND ($11::int IS NULL OR EXISTS (
            SELECT 1 FROM recetas_coleccion rc WHERE rc.receta_id = r.id AND rc.coleccion_id = $11))
"#;

/// Recipe record from database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RecipeRow {
    pub id: i32,
    pub autor_id: Option<Uuid>,
    pub titulo: String,
    pub descripcion: Option<String>,
    pub instrucciones: String,
    pub tiempo_preparacion: Option<i32>,
    pub tiempo_coccion: Option<i32>,
    pub porciones: Option<i32>,
    pub dificultad: Option<String>,
    pub calorias_por_porcion: Option<i32>,
    pub imagen_url: Option<String>,
    pub categoria_id: Option<i32>,
    pub dieta_id: Option<i32>,
    pub fecha_creacion: DateTime<Utc>,
    pub fecha_actualizacion: DateTime<Utc>,
}

/// Recipe joined with author, taxonomy names and rating aggregates
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RecipeSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub receta: RecipeRow,
    pub autor_nombre: Option<String>,
    pub autor_foto: Option<String>,
    pub categoria_nombre: Option<String>,
    pub dieta_nombre: Option<String>,
    pub puntuacion_promedio: f64,
    pub total_puntuaciones: i64,
}

/// Per-recipe nutrition facts (grams per portion)
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
pub struct NutritionInfo {
    pub proteinas: Option<f64>,
    pub carbohidratos: Option<f64>,
    pub grasas: Option<f64>,
    pub fibra: Option<f64>,
    pub azucares: Option<f64>,
}

/// Listing filter; empty vectors and `None` mean "no constraint"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    /// Title substring
    pub titulo: Option<String>,
    /// Substring of title, description or instructions
    pub texto: Option<String>,
    pub categoria_id: Option<i32>,
    /// Any of these diets
    pub dieta_ids: Vec<i32>,
    pub autor_id: Option<Uuid>,
    /// Any of these tags
    pub etiquetas: Vec<i32>,
    pub dificultad: Option<Difficulty>,
    pub min_calorias: Option<i32>,
    pub max_calorias: Option<i32>,
    /// Only recipes this user marked as favorite
    pub favorito_de: Option<Uuid>,
    /// Only recipes in this collection
    pub coleccion_id: Option<i32>,
}

/// Sort order for listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecipeOrder {
    #[default]
    Newest,
    CaloriesAsc,
    CaloriesDesc,
    QuickestFirst,
    /// Title matches before description matches before instruction matches
    Relevance,
    Random,
}

impl RecipeOrder {
    /// Parse the `ordenar` query value; unknown values keep the default.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("calorias") | Some("calorias_asc") => Self::CaloriesAsc,
            Some("calorias_desc") => Self::CaloriesDesc,
            Some("tiempo_asc") => Self::QuickestFirst,
            Some("relevancia") => Self::Relevance,
            _ => Self::Newest,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Self::Newest => "r.fecha_creacion DESC, r.id DESC",
            Self::CaloriesAsc => "r.calorias_por_porcion ASC NULLS LAST, r.id",
            Self::CaloriesDesc => "r.calorias_por_porcion DESC NULLS LAST, r.id",
            Self::QuickestFirst => {
                "COALESCE(r.tiempo_preparacion, 0) + COALESCE(r.tiempo_coccion, 0) ASC, r.id"
            }
            Self::Relevance => {
                "CASE WHEN r.titulo ILIKE $2 THEN 3 \
                      WHEN r.descripcion ILIKE $2 THEN 2 \
                      WHEN r.instrucciones ILIKE $2 THEN 1 \
                      ELSE 0 END DESC, r.fecha_creacion DESC"
            }
            Self::Random => "RANDOM()",
        }
    }
}

/// Fields for a new recipe
#[derive(Debug, Clone, Default)]
pub struct NewRecipe {
    pub titulo: String,
    pub descripcion: Option<String>,
    pub instrucciones: String,
    pub tiempo_preparacion: Option<i32>,
    pub tiempo_coccion: Option<i32>,
    pub porciones: Option<i32>,
    pub dificultad: Option<Difficulty>,
    pub calorias_por_porcion: Option<i32>,
    pub imagen_url: Option<String>,
    pub categoria_id: Option<i32>,
    pub dieta_id: Option<i32>,
    pub etiquetas: Vec<i32>,
    pub nutricion: Option<NutritionInfo>,
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    pub instrucciones: Option<String>,
    pub tiempo_preparacion: Option<i32>,
    pub tiempo_coccion: Option<i32>,
    pub porciones: Option<i32>,
    pub dificultad: Option<Difficulty>,
    pub calorias_por_porcion: Option<i32>,
    pub imagen_url: Option<String>,
    pub categoria_id: Option<i32>,
    pub dieta_id: Option<i32>,
    /// Replaces the tag set when present
    pub etiquetas: Option<Vec<i32>>,
    pub nutricion: Option<NutritionInfo>,
}

fn bind_filter<'q>(
    query: Query<'q, Postgres, PgArguments>,
    filter: &RecipeFilter,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(filter.titulo.as_deref().map(like_pattern))
        .bind(filter.texto.as_deref().map(like_pattern))
        .bind(filter.categoria_id)
        .bind(filter.dieta_ids.clone())
        .bind(filter.autor_id)
        .bind(filter.etiquetas.clone())
        .bind(filter.dificultad.as_ref().map(|d| d.as_str()))
        .bind(filter.min_calorias)
        .bind(filter.max_calorias)
        .bind(filter.favorito_de)
        .bind(filter.coleccion_id)
}

/// Recipe repository
pub struct RecipeRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> RecipeRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Filtered, ordered and paginated summaries.
    pub async fn list(
        &self,
        filter: &RecipeFilter,
        order: RecipeOrder,
        page: Pagination,
    ) -> Result<Paginated<RecipeSummary>, DbError> {
        let sql = format!(
            "SELECT {RECIPE_COLUMNS}, COUNT(*) OVER() AS total, {SUMMARY_JOINS} {FILTER_WHERE} \
             ORDER BY {} LIMIT $12 OFFSET $13",
            order.sql()
        );
        fetch_page(page, |limit, offset| {
            bind_filter(sqlx::query(&sql), filter)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool)
        })
        .await
    }

    /// Up to `count` random recipes matching the filter.
    pub async fn random(&self, filter: &RecipeFilter, count: u32) -> Result<Vec<RecipeSummary>, DbError> {
        let page = self
            .list(filter, RecipeOrder::Random, Pagination::new(1, count))
            .await?;
        Ok(page.data)
    }

    /// One recipe summary by id.
    pub async fn get(&self, id: i32) -> Result<RecipeSummary, DbError> {
        let sql = format!("SELECT {RECIPE_COLUMNS}, {SUMMARY_JOINS} WHERE r.id = $1");
        sqlx::query_as::<_, RecipeSummary>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(Resource::Recipe, id))
    }

    /// The author of a recipe; `NotFound` if the recipe doesn't exist.
    pub async fn author(&self, id: i32) -> Result<Option<Uuid>, DbError> {
        let row: Option<(Option<Uuid>,)> = sqlx::query_as("SELECT autor_id FROM recetas WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        row.map(|(autor,)| autor)
            .ok_or_else(|| DbError::not_found(Resource::Recipe, id))
    }

    /// Portions of a recipe (`None` when unset); `NotFound` if missing.
    pub async fn portions(&self, id: i32) -> Result<Option<i32>, DbError> {
        let row: Option<(Option<i32>,)> = sqlx::query_as("SELECT porciones FROM recetas WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        row.map(|(p,)| p)
            .ok_or_else(|| DbError::not_found(Resource::Recipe, id))
    }

    pub async fn exists(&self, id: i32) -> Result<(), DbError> {
        ensure_exists(self.pool, Table::Recipes, id).await
    }

    async fn check_references(
        &self,
        categoria_id: Option<i32>,
        dieta_id: Option<i32>,
        etiquetas: &[i32],
    ) -> Result<(), DbError> {
        if let Some(id) = categoria_id {
            ensure_exists(self.pool, Table::Categories, id).await?;
        }
        if let Some(id) = dieta_id {
            ensure_exists(self.pool, Table::Diets, id).await?;
        }
        ensure_all_exist(self.pool, Table::Tags, etiquetas).await
    }

    /// Create a recipe with its tags and nutrition facts.
    pub async fn create(&self, autor_id: Uuid, new: NewRecipe) -> Result<RecipeSummary, DbError> {
        self.check_references(new.categoria_id, new.dieta_id, &new.etiquetas)
            .await?;

        let mut tx = self.pool.begin().await?;
        let (id,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO recetas (
                autor_id, titulo, descripcion, instrucciones, tiempo_preparacion,
                tiempo_coccion, porciones, dificultad, calorias_por_porcion, imagen_url,
                categoria_id, dieta_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(autor_id)
        .bind(&new.titulo)
        .bind(new.descripcion.as_deref())
        .bind(&new.instrucciones)
        .bind(new.tiempo_preparacion)
        .bind(new.tiempo_coccion)
        .bind(new.porciones)
        .bind(new.dificultad.as_ref().map(|d| d.as_str()))
        .bind(new.calorias_por_porcion)
        .bind(new.imagen_url.as_deref())
        .bind(new.categoria_id)
        .bind(new.dieta_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO recetas_etiquetas (receta_id, etiqueta_id)
            SELECT $1, UNNEST($2::int[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(&new.etiquetas)
        .execute(&mut *tx)
        .await?;

        if let Some(info) = &new.nutricion {
            upsert_nutrition(&mut tx, id, info).await?;
        }

        tx.commit().await?;
        self.get(id).await
    }

    /// Apply a partial update.
    pub async fn update(&self, id: i32, changes: RecipeChanges) -> Result<RecipeSummary, DbError> {
        self.check_references(
            changes.categoria_id,
            changes.dieta_id,
            changes.etiquetas.as_deref().unwrap_or_default(),
        )
        .await?;

        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE recetas SET
                titulo = COALESCE($2, titulo),
                descripcion = COALESCE($3, descripcion),
                instrucciones = COALESCE($4, instrucciones),
                tiempo_preparacion = COALESCE($5, tiempo_preparacion),
                tiempo_coccion = COALESCE($6, tiempo_coccion),
                porciones = COALESCE($7, porciones),
                dificultad = COALESCE($8, dificultad),
                calorias_por_porcion = COALESCE($9, calorias_por_porcion),
                imagen_url = COALESCE($10, imagen_url),
                categoria_id = COALESCE($11, categoria_id),
                dieta_id = COALESCE($12, dieta_id),
                fecha_actualizacion = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.titulo.as_deref())
        .bind(changes.descripcion.as_deref())
        .bind(changes.instrucciones.as_deref())
        .bind(changes.tiempo_preparacion)
        .bind(changes.tiempo_coccion)
        .bind(changes.porciones)
        .bind(changes.dificultad.as_ref().map(|d| d.as_str()))
        .bind(changes.calorias_por_porcion)
        .bind(changes.imagen_url.as_deref())
        .bind(changes.categoria_id)
        .bind(changes.dieta_id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Recipe, id));
        }

        if let Some(etiquetas) = &changes.etiquetas {
            sqlx::query("DELETE FROM recetas_etiquetas WHERE receta_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                r#"
                INSERT INTO recetas_etiquetas (receta_id, etiqueta_id)
                SELECT $1, UNNEST($2::int[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(id)
            .bind(etiquetas)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(info) = &changes.nutricion {
            upsert_nutrition(&mut tx, id, info).await?;
        }

        tx.commit().await?;
        self.get(id).await
    }

    pub async fn delete(&self, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM recetas WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Recipe, id));
        }
        Ok(())
    }

    pub async fn nutrition(&self, id: i32) -> Result<Option<NutritionInfo>, DbError> {
        let info = sqlx::query_as::<_, NutritionInfo>(
            r#"
            SELECT proteinas, carbohidratos, grasas, fibra, azucares
            FROM info_nutricional WHERE receta_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(info)
    }

    pub async fn tags(&self, id: i32) -> Result<Vec<super::Tag>, DbError> {
        let tags = sqlx::query_as::<_, super::Tag>(
            r#"
            SELECT e.id, e.nombre
            FROM recetas_etiquetas re
            JOIN etiquetas e ON e.id = re.etiqueta_id
            WHERE re.receta_id = $1
            ORDER BY e.nombre
            "#,
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(tags)
    }

    /// Flip a favorite mark. Returns whether the recipe is now a favorite.
    pub async fn toggle_favorite(&self, usuario_id: Uuid, receta_id: i32) -> Result<bool, DbError> {
        self.exists(receta_id).await?;

        let removed = sqlx::query("DELETE FROM favoritos WHERE usuario_id = $1 AND receta_id = $2")
            .bind(usuario_id)
            .bind(receta_id)
            .execute(self.pool)
            .await?;
        if removed.rows_affected() > 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO favoritos (usuario_id, receta_id) VALUES ($1, $2)
            ON CONFLICT (usuario_id, receta_id) DO NOTHING
            "#,
        )
        .bind(usuario_id)
        .bind(receta_id)
        .execute(self.pool)
        .await?;
        Ok(true)
    }
}

async fn upsert_nutrition(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    receta_id: i32,
    info: &NutritionInfo,
) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO info_nutricional (receta_id, proteinas, carbohidratos, grasas, fibra, azucares)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (receta_id) DO UPDATE SET
            proteinas = COALESCE(EXCLUDED.proteinas, info_nutricional.proteinas),
            carbohidratos = COALESCE(EXCLUDED.carbohidratos, info_nutricional.carbohidratos),
            grasas = COALESCE(EXCLUDED.grasas, info_nutricional.grasas),
            fibra = COALESCE(EXCLUDED.fibra, info_nutricional.fibra),
            azucares = COALESCE(EXCLUDED.azucares, info_nutricional.azucares)
        "#,
    )
    .bind(receta_id)
    .bind(info.proteinas)
    .bind(info.carbohidratos)
    .bind(info.grasas)
    .bind(info.fibra)
    .bind(info.azucares)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_param_parsing() {
        assert_eq!(RecipeOrder::from_param(None), RecipeOrder::Newest);
        assert_eq!(RecipeOrder::from_param(Some("calorias")), RecipeOrder::CaloriesAsc);
        assert_eq!(RecipeOrder::from_param(Some("calorias_desc")), RecipeOrder::CaloriesDesc);
        assert_eq!(RecipeOrder::from_param(Some("tiempo_asc")), RecipeOrder::QuickestFirst);
        assert_eq!(RecipeOrder::from_param(Some("relevancia")), RecipeOrder::Relevance);
        assert_eq!(RecipeOrder::from_param(Some("???")), RecipeOrder::Newest);
    }

    #[test]
    fn relevance_ranks_title_highest() {
        let sql = RecipeOrder::Relevance.sql();
        let title = sql.find("r.titulo ILIKE $2 THEN 3").unwrap();
        let instructions = sql.find("r.instrucciones ILIKE $2 THEN 1").unwrap();
        assert!(title < instructions);
    }

    #[test]
    fn filter_uses_every_placeholder_once_declared() {
        for n in 1..=11 {
            assert!(FILTER_WHERE.contains(&format!("${n}")), "missing ${n}");
        }
        assert!(!FILTER_WHERE.contains("$12"));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn favorite_toggles() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool");
        crate::db::schema::run(&pool).await.expect("schema");

        let users = super::super::UserRepo::new(&pool);
        let subject = format!("fav-{}", Uuid::new_v4());
        let user = users
            .create(super::super::users::NewUser {
                external_id: subject.clone(),
                email: crate::models::Email::new(&format!("{subject}@example.com")).unwrap(),
                nombre: Some("Fav".into()),
                url_foto_perfil: None,
            })
            .await
            .unwrap();

        let repo = RecipeRepo::new(&pool);
        let recipe = repo
            .create(
                user.id,
                NewRecipe {
                    titulo: "Tortilla".into(),
                    instrucciones: "Batir y cuajar".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(repo.toggle_favorite(user.id, recipe.receta.id).await.unwrap());
        assert!(!repo.toggle_favorite(user.id, recipe.receta.id).await.unwrap());

        repo.delete(recipe.receta.id).await.unwrap();
        users.delete(user.id).await.unwrap();
    }
}
