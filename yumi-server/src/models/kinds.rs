//! Closed sets of text values stored in the database.
//!
//! Request bodies carry these as plain strings; handlers parse them so an
//! unknown value becomes a 400 with the accepted field name.

use super::ValidationError;

pub use yumi_core::ActivityLevel;

macro_rules! text_kind {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Stored text value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            /// Parse a stored or submitted value (case-insensitive).
            pub fn parse(value: &str) -> Result<Self, ValidationError> {
                let normalized = value.trim().to_lowercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|kind| kind.as_str() == normalized)
                    .ok_or_else(|| ValidationError::InvalidVariant {
                        field: $field,
                        value: value.to_owned(),
                    })
            }
        }
    };
}

text_kind! {
    /// Recipe difficulty
    Difficulty, "dificultad" {
        Easy => "fácil",
        Medium => "media",
        Hard => "difícil",
    }
}

text_kind! {
    /// What a user's goal is aiming for
    Purpose, "proposito" {
        Maintain => "mantener",
        LoseWeight => "perder_peso",
        GainMass => "ganar_masa",
        Define => "definir",
        Other => "otro",
    }
}

text_kind! {
    /// Unit of measure family
    UnitKind, "tipo" {
        Weight => "peso",
        Volume => "volumen",
        Count => "unidad",
        Other => "otro",
    }
}

text_kind! {
    /// Event participation state
    ParticipationStatus, "estado" {
        Confirmed => "confirmado",
        Pending => "pendiente",
        Cancelled => "cancelado",
    }
}

text_kind! {
    /// Meal slot in a plan
    MealType, "tipo_comida" {
        Breakfast => "desayuno",
        Lunch => "almuerzo",
        Dinner => "cena",
        Snack => "merienda",
        Other => "otro",
    }
}

text_kind! {
    /// Kind of recipe tip
    TipKind, "tipo" {
        Advice => "consejo",
        Alternative => "alternativa",
        Warning => "advertencia",
        Other => "otro",
    }
}

/// Parse an activity level into a validation error on failure.
pub fn parse_activity(value: &str) -> Result<ActivityLevel, ValidationError> {
    value
        .parse::<ActivityLevel>()
        .map_err(|_| ValidationError::InvalidVariant {
            field: "actividad_diaria",
            value: value.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(Difficulty::parse("Fácil"), Ok(Difficulty::Easy));
        assert_eq!(MealType::parse(" cena "), Ok(MealType::Dinner));
        assert_eq!(Purpose::parse("perder_peso"), Ok(Purpose::LoseWeight));
    }

    #[test]
    fn rejects_unknown_values() {
        let err = ParticipationStatus::parse("quizás").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidVariant {
                field: "estado",
                value: "quizás".into()
            }
        );
        assert!(TipKind::parse("").is_err());
    }

    #[test]
    fn activity_levels() {
        assert_eq!(parse_activity("muy activo").unwrap().as_str(), "muy activo");
        assert!(parse_activity("atleta").is_err());
    }
}
