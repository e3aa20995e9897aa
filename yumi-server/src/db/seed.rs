//! Reference data: categories, diets, units, conversions and profile colors.
//!
//! Inserts skip rows that already exist, so seeding twice changes nothing.

use serde::Serialize;
use sqlx::PgPool;

use super::repos::DbError;

const CATEGORIES: &[(&str, &str)] = &[
    ("Desayuno", "Recetas para el desayuno"),
    ("Almuerzo", "Recetas para el almuerzo"),
    ("Cena", "Recetas para la cena"),
    ("Postres", "Recetas de postres"),
    ("Bebidas", "Recetas de bebidas"),
    ("Snacks", "Recetas de aperitivos y snacks"),
];

const DIETS: &[(&str, &str, &str)] = &[
    (
        "Vegetariana",
        "Sin carne pero con productos animales como huevos y lácteos",
        "Sin carne",
    ),
    ("Vegana", "Sin productos de origen animal", "Sin productos animales"),
    (
        "Sin gluten",
        "Sin ingredientes que contengan gluten",
        "Sin trigo, cebada, centeno",
    ),
    (
        "Keto",
        "Alta en grasas, moderada en proteínas y baja en carbohidratos",
        "Bajo en carbohidratos",
    ),
    (
        "Paleo",
        "Basada en alimentos presumiblemente consumidos por humanos del Paleolítico",
        "Sin procesados, lácteos, granos",
    ),
    ("Sin lácteos", "Sin productos lácteos", "Sin leche, queso, yogur"),
];

const UNITS: &[(&str, &str, &str)] = &[
    ("Gramo", "g", "peso"),
    ("Kilogramo", "kg", "peso"),
    ("Mililitro", "ml", "volumen"),
    ("Litro", "l", "volumen"),
    ("Cucharadita", "cdta", "volumen"),
    ("Cucharada", "cda", "volumen"),
    ("Taza", "taza", "volumen"),
    ("Unidad", "u", "unidad"),
    ("Pizca", "pizca", "otro"),
    ("Al gusto", "al gusto", "otro"),
];

/// (from abbreviation, to abbreviation, factor)
const CONVERSIONS: &[(&str, &str, f64)] = &[
    ("g", "kg", 0.001),
    ("kg", "g", 1000.0),
    ("ml", "l", 0.001),
    ("l", "ml", 1000.0),
    ("cdta", "cda", 0.333),
    ("cda", "cdta", 3.0),
    ("cda", "taza", 0.0625),
    ("taza", "cda", 16.0),
    ("ml", "cdta", 0.2),
    ("cdta", "ml", 5.0),
];

const COLORS: &[(&str, &str)] = &[
    ("Tomate", "#E4572E"),
    ("Mostaza", "#F3A712"),
    ("Albahaca", "#29BF12"),
    ("Arándano", "#4C5FD5"),
    ("Berenjena", "#6B2D5C"),
    ("Pimienta", "#2E2E2E"),
];

/// Rows inserted by a seed run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub categorias: u64,
    pub dietas: u64,
    pub unidades: u64,
    pub conversiones: u64,
    pub colores: u64,
}

impl SeedReport {
    pub fn total(&self) -> u64 {
        self.categorias + self.dietas + self.unidades + self.conversiones + self.colores
    }
}

/// Insert all reference data in one transaction.
pub async fn run(pool: &PgPool) -> Result<SeedReport, DbError> {
    let mut report = SeedReport::default();
    let mut tx = pool.begin().await?;

    for &(nombre, descripcion) in CATEGORIES {
        report.categorias += sqlx::query(
            "INSERT INTO categorias (nombre, descripcion) VALUES ($1, $2) ON CONFLICT (nombre) DO NOTHING",
        )
        .bind(nombre)
        .bind(descripcion)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    for &(nombre, descripcion, restricciones) in DIETS {
        report.dietas += sqlx::query(
            r#"
            INSERT INTO dietas (nombre, descripcion, restricciones) VALUES ($1, $2, $3)
            ON CONFLICT (nombre) DO NOTHING
            "#,
        )
        .bind(nombre)
        .bind(descripcion)
        .bind(restricciones)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    for &(nombre, abreviatura, tipo) in UNITS {
        report.unidades += sqlx::query(
            r#"
            INSERT INTO unidades_medida (nombre, abreviatura, tipo) VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(nombre)
        .bind(abreviatura)
        .bind(tipo)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    for &(desde, hacia, factor) in CONVERSIONS {
        report.conversiones += sqlx::query(
            r#"
            INSERT INTO conversiones (desde_unidad_id, hacia_unidad_id, factor)
            SELECT d.id, h.id, $3
            FROM unidades_medida d, unidades_medida h
            WHERE d.abreviatura = $1 AND h.abreviatura = $2
            ON CONFLICT (desde_unidad_id, hacia_unidad_id) DO NOTHING
            "#,
        )
        .bind(desde)
        .bind(hacia)
        .bind(factor)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    for &(nombre, codigo) in COLORS {
        report.colores += sqlx::query(
            "INSERT INTO colores (nombre, codigo) VALUES ($1, $2) ON CONFLICT (nombre) DO NOTHING",
        )
        .bind(nombre)
        .bind(codigo)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    tx.commit().await?;
    tracing::info!(inserted = report.total(), "Seed data applied");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn conversions_reference_seeded_units() {
        let abbreviations: HashSet<_> = UNITS.iter().map(|(_, abbr, _)| *abbr).collect();
        for (from, to, factor) in CONVERSIONS {
            assert!(abbreviations.contains(from), "unknown unit {from}");
            assert!(abbreviations.contains(to), "unknown unit {to}");
            assert!(*factor > 0.0);
        }
    }

    #[test]
    fn unit_kinds_are_valid() {
        for (_, _, tipo) in UNITS {
            assert!(crate::models::UnitKind::parse(tipo).is_ok(), "bad kind {tipo}");
        }
    }

    #[test]
    fn colors_are_hex() {
        for (_, code) in COLORS {
            assert_eq!(code.len(), 7);
            assert!(code.starts_with('#'));
            assert!(code[1..].chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn seeding_twice_inserts_nothing_new() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool");
        crate::db::schema::run(&pool).await.expect("schema");

        run(&pool).await.expect("first seed");
        let second = run(&pool).await.expect("second seed");
        assert_eq!(second.total(), 0);
    }
}
