//! Recipe endpoints: listing, search, random picks, detail, authoring and
//! favorites

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{current_user, ensure_owner, message, optional_user, Message};
use crate::db::repos::comments::{Comment, CommentRepo};
use crate::db::repos::goals::GoalRepo;
use crate::db::repos::ingredients::{Ingredient, IngredientRepo};
use crate::db::repos::preferences::PreferenceRepo;
use crate::db::repos::recipes::{
    NewRecipe, NutritionInfo, RecipeChanges, RecipeFilter, RecipeOrder, RecipeRepo, RecipeSummary,
};
use crate::db::repos::taxonomy::Tag;
use crate::http::error::ApiError;
use crate::http::extractors::{AuthSubject, MaybeSubject, ValidJson, ValidPath, ValidQuery};
use crate::http::server::AppState;
use crate::models::text::{optional, required, MAX_TEXT_LEN, MAX_TITLE_LEN, MAX_URL_LEN};
use crate::models::{Difficulty, Paginated, PaginationParams, ValidationError};

const DEFAULT_PAGE_SIZE: u32 = 10;
const DEFAULT_RANDOM_COUNT: u32 = 5;
const MAX_RANDOM_COUNT: u32 = 50;

// === Request types ===

#[derive(Debug, Deserialize)]
pub struct ListRecipesQuery {
    pub titulo: Option<String>,
    pub categoria: Option<i32>,
    pub dieta: Option<i32>,
    pub autor: Option<Uuid>,
    pub ordenar: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RandomQuery {
    pub cantidad: Option<u32>,
    pub categoria: Option<i32>,
    pub dieta: Option<i32>,
    pub dificultad: Option<String>,
    pub max_calorias: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipeRequest {
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    pub instrucciones: Option<String>,
    pub tiempo_preparacion: Option<i32>,
    pub tiempo_coccion: Option<i32>,
    pub porciones: Option<i32>,
    pub dificultad: Option<String>,
    pub calorias_por_porcion: Option<i32>,
    pub imagen_url: Option<String>,
    pub categoria_id: Option<i32>,
    pub dieta_id: Option<i32>,
    pub etiquetas: Option<Vec<i32>>,
    pub nutricion: Option<NutritionInfo>,
}

fn non_negative(field: &'static str, value: Option<i32>) -> Result<Option<i32>, ValidationError> {
    match value {
        Some(v) if v < 0 => Err(ValidationError::InvalidFormat {
            field,
            reason: "no puede ser negativo",
        }),
        other => Ok(other),
    }
}

fn at_least_one(field: &'static str, value: Option<i32>) -> Result<Option<i32>, ValidationError> {
    match value {
        Some(v) if v < 1 => Err(ValidationError::InvalidFormat {
            field,
            reason: "debe ser al menos 1",
        }),
        other => Ok(other),
    }
}

fn validate_nutrition(info: Option<NutritionInfo>) -> Result<Option<NutritionInfo>, ValidationError> {
    let Some(info) = info else {
        return Ok(None);
    };
    let fields = [
        ("proteinas", info.proteinas),
        ("carbohidratos", info.carbohidratos),
        ("grasas", info.grasas),
        ("fibra", info.fibra),
        ("azucares", info.azucares),
    ];
    for (field, value) in fields {
        if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
            return Err(ValidationError::InvalidFormat {
                field,
                reason: "no puede ser negativo",
            });
        }
    }
    Ok(Some(info))
}

fn dedup_tags(tags: Vec<i32>) -> Vec<i32> {
    let mut tags = tags;
    tags.sort_unstable();
    tags.dedup();
    tags
}

impl RecipeRequest {
    fn into_new(self) -> Result<NewRecipe, ValidationError> {
        Ok(NewRecipe {
            titulo: required("titulo", self.titulo.as_deref(), MAX_TITLE_LEN)?,
            instrucciones: required("instrucciones", self.instrucciones.as_deref(), MAX_TEXT_LEN)?,
            descripcion: optional("descripcion", self.descripcion.as_deref(), MAX_TEXT_LEN)?,
            tiempo_preparacion: non_negative("tiempo_preparacion", self.tiempo_preparacion)?,
            tiempo_coccion: non_negative("tiempo_coccion", self.tiempo_coccion)?,
            porciones: at_least_one("porciones", self.porciones)?,
            dificultad: self.dificultad.as_deref().map(Difficulty::parse).transpose()?,
            calorias_por_porcion: non_negative("calorias_por_porcion", self.calorias_por_porcion)?,
            imagen_url: optional("imagen_url", self.imagen_url.as_deref(), MAX_URL_LEN)?,
            categoria_id: self.categoria_id,
            dieta_id: self.dieta_id,
            etiquetas: dedup_tags(self.etiquetas.unwrap_or_default()),
            nutricion: validate_nutrition(self.nutricion)?,
        })
    }

    fn into_changes(self) -> Result<RecipeChanges, ValidationError> {
        let titulo = match self.titulo.as_deref() {
            Some(t) => Some(required("titulo", Some(t), MAX_TITLE_LEN)?),
            None => None,
        };
        let instrucciones = match self.instrucciones.as_deref() {
            Some(t) => Some(required("instrucciones", Some(t), MAX_TEXT_LEN)?),
            None => None,
        };
        Ok(RecipeChanges {
            titulo,
            instrucciones,
            descripcion: optional("descripcion", self.descripcion.as_deref(), MAX_TEXT_LEN)?,
            tiempo_preparacion: non_negative("tiempo_preparacion", self.tiempo_preparacion)?,
            tiempo_coccion: non_negative("tiempo_coccion", self.tiempo_coccion)?,
            porciones: at_least_one("porciones", self.porciones)?,
            dificultad: self.dificultad.as_deref().map(Difficulty::parse).transpose()?,
            calorias_por_porcion: non_negative("calorias_por_porcion", self.calorias_por_porcion)?,
            imagen_url: optional("imagen_url", self.imagen_url.as_deref(), MAX_URL_LEN)?,
            categoria_id: self.categoria_id,
            dieta_id: self.dieta_id,
            etiquetas: self.etiquetas.map(dedup_tags),
            nutricion: validate_nutrition(self.nutricion)?,
        })
    }
}

/// Search parameters. `etiqueta` may repeat, so the query string is read as
/// raw pairs.
#[derive(Debug, Default, PartialEq)]
struct SearchParams {
    filter: RecipeFilter,
    order: RecipeOrder,
    page: PaginationParams,
}

fn parse_number<T: FromStr>(name: &'static str, value: &str) -> Result<T, ApiError> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Parámetro {name} no válido: '{value}'")))
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

impl SearchParams {
    fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, ApiError> {
        let mut params = Self::default();
        for (key, value) in pairs {
            if value.trim().is_empty() {
                continue;
            }
            match key.as_str() {
                "q" => params.filter.texto = non_blank(&value),
                "categoria" => params.filter.categoria_id = Some(parse_number("categoria", &value)?),
                "dieta" => params.filter.dieta_ids = vec![parse_number("dieta", &value)?],
                "autor" => params.filter.autor_id = Some(parse_number("autor", &value)?),
                "etiqueta" => params.filter.etiquetas.push(parse_number("etiqueta", &value)?),
                "min_calorias" => params.filter.min_calorias = Some(parse_number("min_calorias", &value)?),
                "max_calorias" => params.filter.max_calorias = Some(parse_number("max_calorias", &value)?),
                "dificultad" => params.filter.dificultad = Some(Difficulty::parse(&value)?),
                "ordenar" => params.order = RecipeOrder::from_param(Some(value.trim())),
                "page" => params.page.page = Some(parse_number("page", &value)?),
                "limit" => params.page.limit = Some(parse_number("limit", &value)?),
                _ => {}
            }
        }
        // Relevance ranks against the text term; without one it is plain recency.
        if params.order == RecipeOrder::Relevance && params.filter.texto.is_none() {
            params.order = RecipeOrder::Newest;
        }
        Ok(params)
    }
}

// === Response types ===

#[derive(Debug, Serialize)]
pub struct RatingSummary {
    pub promedio: f64,
    pub total: i64,
}

/// A recipe with everything shown on its page
#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub receta: RecipeSummary,
    pub ingredientes: Vec<Ingredient>,
    pub comentarios: Vec<Comment>,
    pub info_nutricional: Option<NutritionInfo>,
    pub etiquetas: Vec<Tag>,
    pub puntuacion: RatingSummary,
}

#[derive(Debug, Serialize)]
pub struct RandomRecipes {
    pub data: Vec<RecipeSummary>,
    pub personalizado: bool,
}

#[derive(Debug, Serialize)]
pub struct FavoriteState {
    pub favorito: bool,
}

/// Calorie cap derived from a daily limit: a third of it, rounded up.
fn per_meal_cap(daily_limit: i32) -> i32 {
    (f64::from(daily_limit) / 3.0).ceil() as i32
}

// === Handlers ===

/// GET /recipes
async fn list_recipes(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<ListRecipesQuery>,
) -> Result<Json<Paginated<RecipeSummary>>, ApiError> {
    let filter = RecipeFilter {
        titulo: query.titulo.as_deref().and_then(non_blank),
        categoria_id: query.categoria,
        dieta_ids: query.dieta.into_iter().collect(),
        autor_id: query.autor,
        ..Default::default()
    };
    let page = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .or_default_limit(DEFAULT_PAGE_SIZE);

    let recipes = RecipeRepo::new(&state.pool)
        .list(&filter, RecipeOrder::from_param(query.ordenar.as_deref()), page)
        .await?;
    Ok(Json(recipes))
}

/// POST /recipes - the caller becomes the author
async fn create_recipe(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidJson(req): ValidJson<RecipeRequest>,
) -> Result<(StatusCode, Json<RecipeSummary>), ApiError> {
    let new = req.into_new()?;
    let caller = current_user(&state, &subject).await?;
    let recipe = RecipeRepo::new(&state.pool).create(caller.id, new).await?;
    tracing::info!(recipe_id = recipe.receta.id, author = %caller.id, "Recipe created");
    Ok((StatusCode::CREATED, Json(recipe)))
}

/// GET /recipes/{id}
async fn get_recipe(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let recipes = RecipeRepo::new(&state.pool);
    let receta = recipes.get(id).await?;

    let ingredients = IngredientRepo::new(&state.pool);
    let comments = CommentRepo::new(&state.pool);
    let (ingredientes, comentarios, info_nutricional, etiquetas) = tokio::try_join!(
        ingredients.list(id),
        comments.all_for_recipe(id),
        recipes.nutrition(id),
        recipes.tags(id),
    )?;

    let puntuacion = RatingSummary {
        promedio: receta.puntuacion_promedio,
        total: receta.total_puntuaciones,
    };
    Ok(Json(RecipeDetail {
        receta,
        ingredientes,
        comentarios,
        info_nutricional,
        etiquetas,
        puntuacion,
    }))
}

/// PUT /recipes/{id} - author only
async fn update_recipe(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
    ValidJson(req): ValidJson<RecipeRequest>,
) -> Result<Json<RecipeSummary>, ApiError> {
    let changes = req.into_changes()?;
    let caller = current_user(&state, &subject).await?;
    let recipes = RecipeRepo::new(&state.pool);
    ensure_owner(
        recipes.author(id).await?,
        &caller,
        "No tienes permiso para editar esta receta",
    )?;
    Ok(Json(recipes.update(id, changes).await?))
}

/// DELETE /recipes/{id} - author only
async fn delete_recipe(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<Message>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    let recipes = RecipeRepo::new(&state.pool);
    ensure_owner(
        recipes.author(id).await?,
        &caller,
        "No tienes permiso para eliminar esta receta",
    )?;
    recipes.delete(id).await?;
    tracing::info!(recipe_id = id, "Recipe deleted");
    Ok(message("Receta eliminada correctamente"))
}

/// GET /recipes/random - personalized with the caller's goal and diets
async fn random_recipes(
    State(state): State<Arc<AppState>>,
    MaybeSubject(subject): MaybeSubject,
    ValidQuery(query): ValidQuery<RandomQuery>,
) -> Result<Json<RandomRecipes>, ApiError> {
    let count = query
        .cantidad
        .unwrap_or(DEFAULT_RANDOM_COUNT)
        .clamp(1, MAX_RANDOM_COUNT);
    let mut filter = RecipeFilter {
        categoria_id: query.categoria,
        dieta_ids: query.dieta.into_iter().collect(),
        dificultad: query.dificultad.as_deref().map(Difficulty::parse).transpose()?,
        max_calorias: query.max_calorias,
        ..Default::default()
    };

    let mut personalizado = false;
    if let Some(caller) = optional_user(&state, subject.as_deref()).await? {
        if filter.max_calorias.is_none() {
            let goal = GoalRepo::new(&state.pool).current(caller.id).await?;
            if let Some(limit) = goal.and_then(|g| g.limite_calorias) {
                filter.max_calorias = Some(per_meal_cap(limit));
                personalizado = true;
            }
        }
        if filter.dieta_ids.is_empty() {
            let diets = PreferenceRepo::new(&state.pool).diet_ids(caller.id).await?;
            if !diets.is_empty() {
                filter.dieta_ids = diets;
                personalizado = true;
            }
        }
    }

    let data = RecipeRepo::new(&state.pool).random(&filter, count).await?;
    Ok(Json(RandomRecipes {
        data,
        personalizado,
    }))
}

/// GET /recipes/search
async fn search_recipes(
    State(state): State<Arc<AppState>>,
    ValidQuery(pairs): ValidQuery<Vec<(String, String)>>,
) -> Result<Json<Paginated<RecipeSummary>>, ApiError> {
    let params = SearchParams::from_pairs(pairs)?;
    let page = params.page.or_default_limit(DEFAULT_PAGE_SIZE);
    let recipes = RecipeRepo::new(&state.pool)
        .list(&params.filter, params.order, page)
        .await?;
    Ok(Json(recipes))
}

/// PUT /recipes/{id}/favorite - toggle
async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidPath(id): ValidPath<i32>,
) -> Result<Json<FavoriteState>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    let favorito = RecipeRepo::new(&state.pool)
        .toggle_favorite(caller.id, id)
        .await?;
    Ok(Json(FavoriteState { favorito }))
}

/// GET /users/me/favorites
async fn list_favorites(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    ValidQuery(params): ValidQuery<PaginationParams>,
) -> Result<Json<Paginated<RecipeSummary>>, ApiError> {
    let caller = current_user(&state, &subject).await?;
    let filter = RecipeFilter {
        favorito_de: Some(caller.id),
        ..Default::default()
    };
    let recipes = RecipeRepo::new(&state.pool)
        .list(&filter, RecipeOrder::Newest, params.or_default_limit(DEFAULT_PAGE_SIZE))
        .await?;
    Ok(Json(recipes))
}

/// Recipe routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route("/recipes/random", get(random_recipes))
        .route("/recipes/search", get(search_recipes))
        .route(
            "/recipes/{id}",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/recipes/{id}/favorite", put(toggle_favorite))
        .route("/users/me/favorites", get(list_favorites))
}
