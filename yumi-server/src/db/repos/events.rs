//! Event repository - community events and their participants.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{fetch_page, like_pattern, DbError};
use crate::models::{Paginated, Pagination, ParticipationStatus, Resource};

/// Event joined with its creator and participant count
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: i32,
    pub creador_id: Option<Uuid>,
    pub titulo: String,
    pub descripcion: Option<String>,
    pub fecha_inicio: DateTime<Utc>,
    pub fecha_fin: Option<DateTime<Utc>>,
    pub ubicacion: Option<String>,
    pub es_virtual: bool,
    pub enlace_virtual: Option<String>,
    pub imagen_url: Option<String>,
    pub es_admin: bool,
    pub capacidad_maxima: Option<i32>,
    pub fecha_creacion: DateTime<Utc>,
    pub creador_nombre: Option<String>,
    pub creador_foto: Option<String>,
    /// Registrations that are not cancelled
    pub participantes_count: i64,
}

/// Registration joined with the user's public profile
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Participant {
    pub id: i32,
    pub evento_id: i32,
    pub usuario_id: Uuid,
    pub estado: String,
    pub fecha_registro: DateTime<Utc>,
    pub usuario_nombre: Option<String>,
    pub usuario_foto: Option<String>,
}

/// Listing filter
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub titulo: Option<String>,
    /// Starts at or after
    pub desde: Option<DateTime<Utc>>,
    /// Starts at or before
    pub hasta: Option<DateTime<Utc>>,
    pub es_virtual: Option<bool>,
    pub creador: Option<Uuid>,
    pub solo_futuros: bool,
}

/// Validated event fields
#[derive(Debug, Clone)]
pub struct EventInput {
    pub titulo: String,
    pub descripcion: Option<String>,
    pub fecha_inicio: DateTime<Utc>,
    pub fecha_fin: Option<DateTime<Utc>>,
    pub ubicacion: Option<String>,
    pub es_virtual: bool,
    pub enlace_virtual: Option<String>,
    pub imagen_url: Option<String>,
    pub capacidad_maxima: Option<i32>,
}

/// Result of a registration attempt
#[derive(Debug)]
pub enum Registration {
    Registered(Participant),
    /// The event already started
    Started,
    /// Confirmed participants reached the capacity
    Full,
}

const EVENT_SELECT: &str = r#"
    SELECT e.id, e.creador_id, e.titulo, e.descripcion, e.fecha_inicio, e.fecha_fin,
           e.ubicacion, e.es_virtual, e.enlace_virtual, e.imagen_url, e.es_admin,
           e.capacidad_maxima, e.fecha_creacion,
           u.nombre AS creador_nombre, u.url_foto_perfil AS creador_foto,
           (SELECT COUNT(*) FROM eventos_usuarios eu
             WHERE eu.evento_id = e.id AND eu.estado <> 'cancelado') AS participantes_count
    FROM eventos e
    LEFT JOIN usuarios u ON u.id = e.creador_id
"#;

const PARTICIPANT_SELECT: &str = r#"
    SELECT eu.id, eu.evento_id, eu.usuario_id, eu.estado, eu.fecha_registro,
           u.nombre AS usuario_nombre, u.url_foto_perfil AS usuario_foto
    FROM eventos_usuarios eu
    JOIN usuarios u ON u.id = eu.usuario_id
"#;

/// Event repository
pub struct EventRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> EventRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Events matching the filter, soonest first.
    pub async fn list(&self, filter: &EventFilter, page: Pagination) -> Result<Paginated<Event>, DbError> {
        let sql = format!(
            r#"
            SELECT listed.*, COUNT(*) OVER() AS total
            FROM ({EVENT_SELECT}
                  WHERE ($1::text IS NULL OR e.titulo ILIKE $1)
                    AND ($2::timestamptz IS NULL OR e.fecha_inicio >= $2)
                    AND ($3::timestamptz IS NULL OR e.fecha_inicio <= $3)
                    AND ($4::bool IS NULL OR e.es_virtual = $4)
                    AND ($5::uuid IS NULL OR e.creador_id = $5)
                    AND ($6 = FALSE OR e.fecha_inicio >= NOW())) AS listed
            ORDER BY listed.fecha_inicio ASC, listed.id ASC
            LIMIT $7 OFFSET $8
            "#
        );
        fetch_page(page, |limit, offset| {
            sqlx::query(&sql)
                .bind(filter.titulo.as_deref().map(like_pattern))
                .bind(filter.desde)
                .bind(filter.hasta)
                .bind(filter.es_virtual)
                .bind(filter.creador)
                .bind(filter.solo_futuros)
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool)
        })
        .await
    }

    pub async fn get(&self, id: i32) -> Result<Event, DbError> {
        let sql = format!("{EVENT_SELECT} WHERE e.id = $1");
        sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(Resource::Event, id))
    }

    pub async fn create(&self, creador_id: Uuid, input: EventInput) -> Result<Event, DbError> {
        let (id,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO eventos (
                creador_id, titulo, descripcion, fecha_inicio, fecha_fin, ubicacion,
                es_virtual, enlace_virtual, imagen_url, capacidad_maxima
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(creador_id)
        .bind(&input.titulo)
        .bind(input.descripcion.as_deref())
        .bind(input.fecha_inicio)
        .bind(input.fecha_fin)
        .bind(input.ubicacion.as_deref())
        .bind(input.es_virtual)
        .bind(input.enlace_virtual.as_deref())
        .bind(input.imagen_url.as_deref())
        .bind(input.capacidad_maxima)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(evento_id = id, "event created");
        self.get(id).await
    }

    /// Overwrite every editable field.
    pub async fn update(&self, id: i32, input: EventInput) -> Result<Event, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE eventos SET
                titulo = $2, descripcion = $3, fecha_inicio = $4, fecha_fin = $5,
                ubicacion = $6, es_virtual = $7, enlace_virtual = $8, imagen_url = $9,
                capacidad_maxima = $10
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&input.titulo)
        .bind(input.descripcion.as_deref())
        .bind(input.fecha_inicio)
        .bind(input.fecha_fin)
        .bind(input.ubicacion.as_deref())
        .bind(input.es_virtual)
        .bind(input.enlace_virtual.as_deref())
        .bind(input.imagen_url.as_deref())
        .bind(input.capacidad_maxima)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Event, id));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM eventos WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Event, id));
        }
        Ok(())
    }

    pub async fn participants(
        &self,
        evento_id: i32,
        estado: Option<ParticipationStatus>,
        page: Pagination,
    ) -> Result<Paginated<Participant>, DbError> {
        let sql = format!(
            r#"
            SELECT listed.*, COUNT(*) OVER() AS total
            FROM ({PARTICIPANT_SELECT}
                  WHERE eu.evento_id = $1 AND ($2::text IS NULL OR eu.estado = $2)) AS listed
            ORDER BY listed.fecha_registro ASC
            LIMIT $3 OFFSET $4
            "#
        );
        fetch_page(page, |limit, offset| {
            sqlx::query(&sql)
                .bind(evento_id)
                .bind(estado.map(|s| s.as_str()))
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool)
        })
        .await
    }

    /// The caller's registration on an event, if any.
    pub async fn participation(&self, evento_id: i32, usuario_id: Uuid) -> Result<Option<Participant>, DbError> {
        let sql = format!("{PARTICIPANT_SELECT} WHERE eu.evento_id = $1 AND eu.usuario_id = $2");
        let participant = sqlx::query_as::<_, Participant>(&sql)
            .bind(evento_id)
            .bind(usuario_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(participant)
    }

    /// Register a user. The event row is locked so concurrent registrations
    /// cannot overshoot the capacity.
    pub async fn register(
        &self,
        evento_id: i32,
        usuario_id: Uuid,
        estado: ParticipationStatus,
    ) -> Result<Registration, DbError> {
        let mut tx = self.pool.begin().await?;

        let event: Option<(DateTime<Utc>, Option<i32>)> = sqlx::query_as(
            "SELECT fecha_inicio, capacidad_maxima FROM eventos WHERE id = $1 FOR UPDATE",
        )
        .bind(evento_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (fecha_inicio, capacidad) =
            event.ok_or_else(|| DbError::not_found(Resource::Event, evento_id))?;

        if fecha_inicio < Utc::now() {
            return Ok(Registration::Started);
        }

        let (already,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM eventos_usuarios WHERE evento_id = $1 AND usuario_id = $2)",
        )
        .bind(evento_id)
        .bind(usuario_id)
        .fetch_one(&mut *tx)
        .await?;
        if already {
            return Err(DbError::Conflict {
                resource: Resource::Participation,
            });
        }

        if let Some(capacidad) = capacidad {
            let (confirmed,): (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM eventos_usuarios WHERE evento_id = $1 AND estado = 'confirmado'",
            )
            .bind(evento_id)
            .fetch_one(&mut *tx)
            .await?;
            if confirmed >= i64::from(capacidad) {
                return Ok(Registration::Full);
            }
        }

        sqlx::query(
            "INSERT INTO eventos_usuarios (evento_id, usuario_id, estado) VALUES ($1, $2, $3)",
        )
        .bind(evento_id)
        .bind(usuario_id)
        .bind(estado.as_str())
        .execute(&mut *tx)
        .await
        .map_err(DbError::unique(Resource::Participation))?;
        tx.commit().await?;

        let participant = self
            .participation(evento_id, usuario_id)
            .await?
            .ok_or_else(|| DbError::not_found(Resource::Participation, evento_id))?;
        Ok(Registration::Registered(participant))
    }

    pub async fn unregister(&self, evento_id: i32, usuario_id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM eventos_usuarios WHERE evento_id = $1 AND usuario_id = $2")
            .bind(evento_id)
            .bind(usuario_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(Resource::Participation, evento_id));
        }
        Ok(())
    }
}
