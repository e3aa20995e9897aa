//! Validation error types

use std::fmt;

/// Validation error for request input
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Field is missing or blank
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// Value doesn't match the required format
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Invalid enum variant
    InvalidVariant { field: &'static str, value: String },

    /// Number outside its accepted range
    OutOfRange { field: &'static str, min: i64, max: i64 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "El campo {} es obligatorio", field),
            Self::TooLong { field, max } => {
                write!(f, "El campo {} supera el máximo de {} caracteres", field, max)
            }
            Self::InvalidFormat { field, reason } => write!(f, "{}: {}", field, reason),
            Self::InvalidVariant { field, value } => {
                write!(f, "Valor no válido para {}: '{}'", field, value)
            }
            Self::OutOfRange { field, min, max } => {
                write!(f, "El campo {} debe estar entre {} y {}", field, min, max)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::TooLong {
            field: "titulo",
            max: 256,
        };
        assert_eq!(
            err.to_string(),
            "El campo titulo supera el máximo de 256 caracteres"
        );
        assert_eq!(
            ValidationError::OutOfRange {
                field: "puntuacion",
                min: 1,
                max: 5
            }
            .to_string(),
            "El campo puntuacion debe estar entre 1 y 5"
        );
    }
}
