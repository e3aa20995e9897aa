//! Resource kinds, used for not-found and conflict messages.

/// Something a request can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    Goal,
    WeightEntry,
    Preference,
    Recipe,
    Ingredient,
    Unit,
    Comment,
    Rating,
    Attempt,
    Tip,
    Category,
    Diet,
    Tag,
    Color,
    Collection,
    CollectionRecipe,
    Event,
    Participation,
    MealPlan,
    MealPlanEntry,
    ShoppingList,
    ShoppingListItem,
    Conversion,
}

impl Resource {
    /// Message returned with a 404
    pub fn not_found_message(&self) -> &'static str {
        match self {
            Self::User => "Usuario no encontrado",
            Self::Goal => "No se encontraron metas para este usuario",
            Self::WeightEntry => "Registro de peso no encontrado",
            Self::Preference => "Preferencia no encontrada",
            Self::Recipe => "Receta no encontrada",
            Self::Ingredient => "Ingrediente no encontrado",
            Self::Unit => "Unidad de medida no encontrada",
            Self::Comment => "Comentario no encontrado",
            Self::Rating => "No has puntuado esta receta",
            Self::Attempt => "Intento no encontrado",
            Self::Tip => "Consejo no encontrado",
            Self::Category => "Categoría no encontrada",
            Self::Diet => "Dieta no encontrada",
            Self::Tag => "Etiqueta no encontrada",
            Self::Color => "Color no encontrado",
            Self::Collection => "Colección no encontrada",
            Self::CollectionRecipe => "La receta no está en esta colección",
            Self::Event => "Evento no encontrado",
            Self::Participation => "No estás registrado en este evento",
            Self::MealPlan => "Plan de comidas no encontrado",
            Self::MealPlanEntry => "Detalle del plan no encontrado",
            Self::ShoppingList => "Lista de compras no encontrada",
            Self::ShoppingListItem => "Elemento de la lista no encontrado",
            Self::Conversion => "No hay conversión disponible entre esas unidades",
        }
    }

    /// Message returned with a 409 when a uniqueness constraint fails
    pub fn conflict_message(&self) -> &'static str {
        match self {
            Self::User => "Ya existe un usuario con ese identificador o email",
            Self::Preference => "Esta preferencia ya existe",
            Self::Category => "Ya existe una categoría con ese nombre",
            Self::Diet => "Ya existe una dieta con ese nombre",
            Self::Tag => "Ya existe una etiqueta con ese nombre",
            Self::Unit => "Ya existe una unidad con ese nombre",
            Self::CollectionRecipe => "La receta ya está en esta colección",
            Self::Participation => "Ya estás registrado en este evento",
            Self::MealPlanEntry => "Ya existe una comida programada para esa fecha y tipo",
            Self::Rating => "Ya has puntuado esta receta",
            _ => "El recurso ya existe",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(Resource::User.not_found_message(), "Usuario no encontrado");
        assert_eq!(
            Resource::Category.conflict_message(),
            "Ya existe una categoría con ese nombre"
        );
        assert_eq!(Resource::Goal.conflict_message(), "El recurso ya existe");
    }
}
