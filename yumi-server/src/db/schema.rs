//! Schema migrations
//!
//! Every statement is idempotent, so `run` is safe at each startup.

use sqlx::PgPool;

use super::repos::DbError;

const TABLES: &[(&str, &str)] = &[
    (
        "colores",
        r#"
        CREATE TABLE IF NOT EXISTS colores (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            nombre TEXT NOT NULL UNIQUE,
            codigo TEXT NOT NULL
        )
        "#,
    ),
    (
        "usuarios",
        r#"
        CREATE TABLE IF NOT EXISTS usuarios (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            external_id TEXT NOT NULL UNIQUE,
            nombre TEXT,
            email TEXT NOT NULL UNIQUE,
            color_id UUID REFERENCES colores(id) ON DELETE SET NULL,
            dark_mode BOOLEAN NOT NULL DEFAULT FALSE,
            url_foto_perfil TEXT,
            fecha_registro TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            ultima_actualizacion TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "metas_usuario",
        r#"
        CREATE TABLE IF NOT EXISTS metas_usuario (
            id SERIAL PRIMARY KEY,
            usuario_id UUID NOT NULL UNIQUE REFERENCES usuarios(id) ON DELETE CASCADE,
            altura DOUBLE PRECISION,
            peso DOUBLE PRECISION,
            actividad_diaria TEXT,
            limite_calorias INTEGER,
            proposito TEXT,
            fecha_inicio TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            fecha_actualizacion TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "historial_peso",
        r#"
        CREATE TABLE IF NOT EXISTS historial_peso (
            id SERIAL PRIMARY KEY,
            usuario_id UUID NOT NULL REFERENCES usuarios(id) ON DELETE CASCADE,
            peso DOUBLE PRECISION NOT NULL CHECK (peso > 0),
            fecha TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "categorias",
        r#"
        CREATE TABLE IF NOT EXISTS categorias (
            id SERIAL PRIMARY KEY,
            nombre TEXT NOT NULL UNIQUE,
            descripcion TEXT
        )
        "#,
    ),
    (
        "preferencias_usuario",
        r#"
        CREATE TABLE IF NOT EXISTS preferencias_usuario (
            id SERIAL PRIMARY KEY,
            usuario_id UUID NOT NULL REFERENCES usuarios(id) ON DELETE CASCADE,
            categoria_id INTEGER NOT NULL REFERENCES categorias(id) ON DELETE CASCADE,
            UNIQUE (usuario_id, categoria_id)
        )
        "#,
    ),
    (
        "dietas",
        r#"
        CREATE TABLE IF NOT EXISTS dietas (
            id SERIAL PRIMARY KEY,
            nombre TEXT NOT NULL UNIQUE,
            descripcion TEXT,
            restricciones TEXT
        )
        "#,
    ),
    (
        "dietas_usuario",
        r#"
        CREATE TABLE IF NOT EXISTS dietas_usuario (
            id SERIAL PRIMARY KEY,
            usuario_id UUID NOT NULL REFERENCES usuarios(id) ON DELETE CASCADE,
            dieta_id INTEGER NOT NULL REFERENCES dietas(id) ON DELETE CASCADE,
            fecha_inicio TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (usuario_id, dieta_id)
        )
        "#,
    ),
    (
        "recetas",
        r#"
        CREATE TABLE IF NOT EXISTS recetas (
            id SERIAL PRIMARY KEY,
            autor_id UUID REFERENCES usuarios(id) ON DELETE SET NULL,
            titulo TEXT NOT NULL,
            descripcion TEXT,
            instrucciones TEXT NOT NULL,
            tiempo_preparacion INTEGER CHECK (tiempo_preparacion >= 0),
            tiempo_coccion INTEGER CHECK (tiempo_coccion >= 0),
            porciones INTEGER CHECK (porciones > 0),
            dificultad TEXT,
            calorias_por_porcion INTEGER CHECK (calorias_por_porcion >= 0),
            imagen_url TEXT,
            categoria_id INTEGER REFERENCES categorias(id) ON DELETE SET NULL,
            dieta_id INTEGER REFERENCES dietas(id) ON DELETE SET NULL,
            fecha_creacion TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            fecha_actualizacion TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "etiquetas",
        r#"
        CREATE TABLE IF NOT EXISTS etiquetas (
            id SERIAL PRIMARY KEY,
            nombre TEXT NOT NULL UNIQUE
        )
        "#,
    ),
    (
        "recetas_etiquetas",
        r#"
        CREATE TABLE IF NOT EXISTS recetas_etiquetas (
            receta_id INTEGER NOT NULL REFERENCES recetas(id) ON DELETE CASCADE,
            etiqueta_id INTEGER NOT NULL REFERENCES etiquetas(id) ON DELETE CASCADE,
            PRIMARY KEY (receta_id, etiqueta_id)
        )
        "#,
    ),
    (
        "unidades_medida",
        r#"
        CREATE TABLE IF NOT EXISTS unidades_medida (
            id SERIAL PRIMARY KEY,
            nombre TEXT NOT NULL UNIQUE,
            abreviatura TEXT NOT NULL UNIQUE,
            tipo TEXT NOT NULL DEFAULT 'otro'
        )
        "#,
    ),
    (
        "conversiones",
        r#"
        CREATE TABLE IF NOT EXISTS conversiones (
            id SERIAL PRIMARY KEY,
            desde_unidad_id INTEGER NOT NULL REFERENCES unidades_medida(id) ON DELETE CASCADE,
            hacia_unidad_id INTEGER NOT NULL REFERENCES unidades_medida(id) ON DELETE CASCADE,
            factor DOUBLE PRECISION NOT NULL,
            UNIQUE (desde_unidad_id, hacia_unidad_id)
        )
        "#,
    ),
    (
        "ingredientes",
        r#"
        CREATE TABLE IF NOT EXISTS ingredientes (
            id SERIAL PRIMARY KEY,
            receta_id INTEGER NOT NULL REFERENCES recetas(id) ON DELETE CASCADE,
            nombre TEXT NOT NULL,
            cantidad DOUBLE PRECISION CHECK (cantidad >= 0),
            unidad_id INTEGER REFERENCES unidades_medida(id) ON DELETE SET NULL,
            calorias_por_unidad INTEGER,
            es_opcional BOOLEAN NOT NULL DEFAULT FALSE
        )
        "#,
    ),
    (
        "info_nutricional",
        r#"
        CREATE TABLE IF NOT EXISTS info_nutricional (
            id SERIAL PRIMARY KEY,
            receta_id INTEGER NOT NULL UNIQUE REFERENCES recetas(id) ON DELETE CASCADE,
            proteinas DOUBLE PRECISION,
            carbohidratos DOUBLE PRECISION,
            grasas DOUBLE PRECISION,
            fibra DOUBLE PRECISION,
            azucares DOUBLE PRECISION
        )
        "#,
    ),
    (
        "comentarios",
        r#"
        CREATE TABLE IF NOT EXISTS comentarios (
            id SERIAL PRIMARY KEY,
            usuario_id UUID REFERENCES usuarios(id) ON DELETE SET NULL,
            receta_id INTEGER NOT NULL REFERENCES recetas(id) ON DELETE CASCADE,
            contenido TEXT NOT NULL,
            fecha TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "puntuaciones",
        r#"
        CREATE TABLE IF NOT EXISTS puntuaciones (
            id SERIAL PRIMARY KEY,
            usuario_id UUID NOT NULL REFERENCES usuarios(id) ON DELETE CASCADE,
            receta_id INTEGER NOT NULL REFERENCES recetas(id) ON DELETE CASCADE,
            puntuacion INTEGER NOT NULL CHECK (puntuacion BETWEEN 1 AND 5),
            fecha TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (usuario_id, receta_id)
        )
        "#,
    ),
    (
        "favoritos",
        r#"
        CREATE TABLE IF NOT EXISTS favoritos (
            id SERIAL PRIMARY KEY,
            usuario_id UUID NOT NULL REFERENCES usuarios(id) ON DELETE CASCADE,
            receta_id INTEGER NOT NULL REFERENCES recetas(id) ON DELETE CASCADE,
            fecha_agregado TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (usuario_id, receta_id)
        )
        "#,
    ),
    (
        "colecciones",
        r#"
        CREATE TABLE IF NOT EXISTS colecciones (
            id SERIAL PRIMARY KEY,
            usuario_id UUID NOT NULL REFERENCES usuarios(id) ON DELETE CASCADE,
            nombre TEXT NOT NULL,
            descripcion TEXT,
            es_publica BOOLEAN NOT NULL DEFAULT FALSE,
            fecha_creacion TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "recetas_coleccion",
        r#"
        CREATE TABLE IF NOT EXISTS recetas_coleccion (
            id SERIAL PRIMARY KEY,
            coleccion_id INTEGER NOT NULL REFERENCES colecciones(id) ON DELETE CASCADE,
            receta_id INTEGER NOT NULL REFERENCES recetas(id) ON DELETE CASCADE,
            fecha_agregado TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (coleccion_id, receta_id)
        )
        "#,
    ),
    (
        "eventos",
        r#"
        CREATE TABLE IF NOT EXISTS eventos (
            id SERIAL PRIMARY KEY,
            creador_id UUID REFERENCES usuarios(id) ON DELETE SET NULL,
            titulo TEXT NOT NULL,
            descripcion TEXT,
            fecha_inicio TIMESTAMPTZ NOT NULL,
            fecha_fin TIMESTAMPTZ,
            ubicacion TEXT,
            es_virtual BOOLEAN NOT NULL DEFAULT FALSE,
            enlace_virtual TEXT,
            imagen_url TEXT,
            es_admin BOOLEAN NOT NULL DEFAULT FALSE,
            capacidad_maxima INTEGER CHECK (capacidad_maxima > 0),
            fecha_creacion TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "eventos_usuarios",
        r#"
        CREATE TABLE IF NOT EXISTS eventos_usuarios (
            id SERIAL PRIMARY KEY,
            evento_id INTEGER NOT NULL REFERENCES eventos(id) ON DELETE CASCADE,
            usuario_id UUID NOT NULL REFERENCES usuarios(id) ON DELETE CASCADE,
            estado TEXT NOT NULL DEFAULT 'confirmado',
            fecha_registro TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (evento_id, usuario_id)
        )
        "#,
    ),
    (
        "intentos_recetas",
        r#"
        CREATE TABLE IF NOT EXISTS intentos_recetas (
            id SERIAL PRIMARY KEY,
            usuario_id UUID REFERENCES usuarios(id) ON DELETE SET NULL,
            receta_id INTEGER NOT NULL REFERENCES recetas(id) ON DELETE CASCADE,
            imagen_url TEXT NOT NULL,
            comentario TEXT,
            fecha TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "plan_comidas",
        r#"
        CREATE TABLE IF NOT EXISTS plan_comidas (
            id SERIAL PRIMARY KEY,
            usuario_id UUID NOT NULL REFERENCES usuarios(id) ON DELETE CASCADE,
            nombre TEXT NOT NULL,
            fecha_inicio DATE NOT NULL,
            fecha_fin DATE NOT NULL,
            fecha_creacion TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CHECK (fecha_fin >= fecha_inicio)
        )
        "#,
    ),
    (
        "plan_comidas_detalle",
        r#"
        CREATE TABLE IF NOT EXISTS plan_comidas_detalle (
            id SERIAL PRIMARY KEY,
            plan_id INTEGER NOT NULL REFERENCES plan_comidas(id) ON DELETE CASCADE,
            receta_id INTEGER REFERENCES recetas(id) ON DELETE SET NULL,
            fecha DATE NOT NULL,
            tipo_comida TEXT NOT NULL,
            porciones INTEGER NOT NULL DEFAULT 1 CHECK (porciones > 0),
            UNIQUE (plan_id, fecha, tipo_comida)
        )
        "#,
    ),
    (
        "lista_compras",
        r#"
        CREATE TABLE IF NOT EXISTS lista_compras (
            id SERIAL PRIMARY KEY,
            usuario_id UUID NOT NULL REFERENCES usuarios(id) ON DELETE CASCADE,
            plan_id INTEGER REFERENCES plan_comidas(id) ON DELETE SET NULL,
            nombre TEXT NOT NULL,
            completada BOOLEAN NOT NULL DEFAULT FALSE,
            fecha_creacion TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "lista_compras_items",
        r#"
        CREATE TABLE IF NOT EXISTS lista_compras_items (
            id SERIAL PRIMARY KEY,
            lista_id INTEGER NOT NULL REFERENCES lista_compras(id) ON DELETE CASCADE,
            ingrediente TEXT NOT NULL,
            cantidad DOUBLE PRECISION,
            unidad_id INTEGER REFERENCES unidades_medida(id) ON DELETE SET NULL,
            comprado BOOLEAN NOT NULL DEFAULT FALSE
        )
        "#,
    ),
    (
        "consejos_recetas",
        r#"
        CREATE TABLE IF NOT EXISTS consejos_recetas (
            id SERIAL PRIMARY KEY,
            receta_id INTEGER NOT NULL REFERENCES recetas(id) ON DELETE CASCADE,
            usuario_id UUID REFERENCES usuarios(id) ON DELETE SET NULL,
            contenido TEXT NOT NULL,
            tipo TEXT NOT NULL DEFAULT 'consejo',
            fecha TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_historial_peso_usuario ON historial_peso (usuario_id, fecha DESC)",
    "CREATE INDEX IF NOT EXISTS idx_recetas_autor ON recetas (autor_id)",
    "CREATE INDEX IF NOT EXISTS idx_recetas_categoria ON recetas (categoria_id)",
    "CREATE INDEX IF NOT EXISTS idx_recetas_dieta ON recetas (dieta_id)",
    "CREATE INDEX IF NOT EXISTS idx_recetas_fecha ON recetas (fecha_creacion DESC)",
    "CREATE INDEX IF NOT EXISTS idx_ingredientes_receta ON ingredientes (receta_id)",
    "CREATE INDEX IF NOT EXISTS idx_comentarios_receta ON comentarios (receta_id, fecha DESC)",
    "CREATE INDEX IF NOT EXISTS idx_puntuaciones_receta ON puntuaciones (receta_id)",
    "CREATE INDEX IF NOT EXISTS idx_intentos_receta ON intentos_recetas (receta_id, fecha DESC)",
    "CREATE INDEX IF NOT EXISTS idx_colecciones_usuario ON colecciones (usuario_id)",
    "CREATE INDEX IF NOT EXISTS idx_eventos_inicio ON eventos (fecha_inicio)",
    "CREATE INDEX IF NOT EXISTS idx_plan_comidas_usuario ON plan_comidas (usuario_id, fecha_inicio)",
    "CREATE INDEX IF NOT EXISTS idx_consejos_receta ON consejos_recetas (receta_id)",
];

/// Create all tables and indexes.
pub async fn run(pool: &PgPool) -> Result<(), DbError> {
    tracing::info!("Running schema migrations...");

    let mut tx = pool.begin().await?;
    for (table, ddl) in TABLES {
        tracing::debug!(table, "ensuring table");
        sqlx::query(ddl).execute(&mut *tx).await?;
    }
    for ddl in INDEXES {
        sqlx::query(ddl).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    tracing::info!(tables = TABLES.len(), "Schema migrations complete");
    Ok(())
}

/// Names of all managed tables, in creation order.
pub fn table_names() -> impl Iterator<Item = &'static str> {
    TABLES.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_created_before_their_references() {
        let names: Vec<_> = table_names().collect();
        let position = |name: &str| names.iter().position(|n| *n == name).unwrap();

        for (table, ddl) in TABLES {
            for referenced in ddl.split("REFERENCES ").skip(1) {
                let target = referenced.split('(').next().unwrap().trim();
                assert!(
                    position(target) < position(table),
                    "{table} references {target} before it exists"
                );
            }
        }
    }

    #[test]
    fn every_statement_is_idempotent() {
        for (_, ddl) in TABLES {
            assert!(ddl.contains("IF NOT EXISTS"));
        }
        for ddl in INDEXES {
            assert!(ddl.contains("IF NOT EXISTS"));
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn migrations_run_twice() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool");
        run(&pool).await.expect("first run");
        run(&pool).await.expect("second run");
    }
}
