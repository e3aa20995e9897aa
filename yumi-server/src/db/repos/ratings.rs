//! Rating repository - one 1..=5 score per user and recipe.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use super::{ensure_exists, DbError, Table};
use crate::models::{Resource, Score};

/// Rating joined with the rater's public profile
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Rating {
    pub id: i32,
    pub usuario_id: Uuid,
    pub receta_id: i32,
    pub puntuacion: i32,
    pub fecha: DateTime<Utc>,
    pub usuario_nombre: Option<String>,
    pub usuario_foto: Option<String>,
}

/// Aggregate scores for one recipe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingStats {
    pub promedio: f64,
    pub total: i64,
    pub maxima: Option<i32>,
    pub minima: Option<i32>,
    /// Count per score, keyed "1" through "5"
    pub distribucion: BTreeMap<String, i64>,
}

impl RatingStats {
    /// Stats for a recipe nobody has rated.
    pub fn empty() -> Self {
        Self {
            promedio: 0.0,
            total: 0,
            maxima: None,
            minima: None,
            distribucion: (1..=5).map(|score| (score.to_string(), 0)).collect(),
        }
    }
}

/// Rating repository
pub struct RatingRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> RatingRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All ratings on a recipe, newest first.
    pub async fn list(&self, receta_id: i32) -> Result<Vec<Rating>, DbError> {
        ensure_exists(self.pool, Table::Recipes, receta_id).await?;

        let ratings = sqlx::query_as::<_, Rating>(
            r#"
            SELECT p.id, p.usuario_id, p.receta_id, p.puntuacion, p.fecha,
                   u.nombre AS usuario_nombre, u.url_foto_perfil AS usuario_foto
            FROM puntuaciones p
            JOIN usuarios u ON u.id = p.usuario_id
            WHERE p.receta_id = $1
            ORDER BY p.fecha DESC
            "#,
        )
        .bind(receta_id)
        .fetch_all(self.pool)
        .await?;
        Ok(ratings)
    }

    pub async fn stats(&self, receta_id: i32) -> Result<RatingStats, DbError> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(AVG(puntuacion), 0)::float8 AS promedio,
                   COUNT(*) AS total,
                   MAX(puntuacion) AS maxima,
                   MIN(puntuacion) AS minima,
                   COUNT(*) FILTER (WHERE puntuacion = 1) AS d1,
                   COUNT(*) FILTER (WHERE puntuacion = 2) AS d2,
                   COUNT(*) FILTER (WHERE puntuacion = 3) AS d3,
                   COUNT(*) FILTER (WHERE puntuacion = 4) AS d4,
                   COUNT(*) FILTER (WHERE puntuacion = 5) AS d5
            FROM puntuaciones
            WHERE receta_id = $1
            "#,
        )
        .bind(receta_id)
        .fetch_one(self.pool)
        .await?;

        let mut stats = RatingStats::empty();
        stats.total = row.try_get("total")?;
        if stats.total == 0 {
            return Ok(stats);
        }

        for (score, count) in stats.distribucion.iter_mut() {
            *count = row.try_get(format!("d{score}").as_str())?;
        }
        stats.promedio = row.try_get("promedio")?;
        stats.maxima = row.try_get("maxima")?;
        stats.minima = row.try_get("minima")?;
        Ok(stats)
    }

    /// Insert or overwrite the caller's score. Returns the stored score and
    /// whether it was newly created.
    pub async fn upsert(&self, receta_id: i32, usuario_id: Uuid, score: Score) -> Result<(i32, bool), DbError> {
        ensure_exists(self.pool, Table::Recipes, receta_id).await?;

        let row = sqlx::query(
            r#"
            INSERT INTO puntuaciones (usuario_id, receta_id, puntuacion)
            VALUES ($1, $2, $3)
            ON CONFLICT (usuario_id, receta_id) DO UPDATE SET
                puntuacion = EXCLUDED.puntuacion,
                fecha = NOW()
            RETURNING puntuacion, (xmax = 0) AS inserted
            "#,
        )
        .bind(usuario_id)
        .bind(receta_id)
        .bind(score.get())
        .fetch_one(self.pool)
        .await?;

        Ok((row.try_get("puntuacion")?, row.try_get("inserted")?))
    }

    pub async fn delete(&self, receta_id: i32, usuario_id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM puntuaciones WHERE receta_id = $1 AND usuario_id = $2")
            .bind(receta_id)
            .bind(usuario_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Rating, receta_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_cover_every_score() {
        let stats = RatingStats::empty();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.distribucion.len(), 5);
        assert!(stats.distribucion.values().all(|count| *count == 0));
        assert_eq!(
            stats.distribucion.keys().cloned().collect::<Vec<_>>(),
            vec!["1", "2", "3", "4", "5"]
        );
    }

    #[test]
    fn stats_serialize_with_string_keys() {
        let json = serde_json::to_value(RatingStats::empty()).unwrap();
        assert_eq!(json["distribucion"]["3"], 0);
        assert!(json["maxima"].is_null());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn unrated_recipe_has_empty_stats() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool");
        crate::db::schema::run(&pool).await.expect("schema");

        let stats = RatingRepo::new(&pool).stats(i32::MAX).await.expect("stats");
        assert_eq!(stats, RatingStats::empty());
    }
}
