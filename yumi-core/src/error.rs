/// Structured error types for yumi-core calculations.
///
/// Everything in this crate is pure arithmetic, so the only failures are
/// inputs outside their accepted range or values that cannot be interpreted.
use thiserror::Error;

/// Main error type for yumi-core operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    /// Numeric input outside its accepted range
    #[error("{field} debe estar entre {min} y {max} (recibido {value})")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    /// Text input that does not name a known variant
    #[error("valor no válido para {field}: '{value}'")]
    UnknownVariant { field: &'static str, value: String },

    /// Required input absent or empty
    #[error("falta el campo obligatorio {field}")]
    Missing { field: &'static str },

    /// No direct or single-hop conversion between two units
    #[error("no hay conversión de '{from}' a '{to}'")]
    NoConversion { from: String, to: String },
}

/// Result type alias for yumi-core operations
pub type Result<T> = std::result::Result<T, CalcError>;

impl CalcError {
    /// Create an unknown variant error
    pub fn unknown(field: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownVariant {
            field,
            value: value.into(),
        }
    }

    /// Check a value against an inclusive range
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<f64> {
        if !value.is_finite() || value < min || value > max {
            return Err(Self::OutOfRange {
                field,
                min,
                max,
                value,
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check_is_inclusive() {
        assert_eq!(CalcError::check_range("peso", 1.0, 1.0, 300.0), Ok(1.0));
        assert_eq!(CalcError::check_range("peso", 300.0, 1.0, 300.0), Ok(300.0));
        assert!(CalcError::check_range("peso", 300.5, 1.0, 300.0).is_err());
        assert!(CalcError::check_range("peso", f64::NAN, 1.0, 300.0).is_err());
    }

    #[test]
    fn display_is_readable() {
        let err = CalcError::unknown("sexo", "x");
        assert_eq!(err.to_string(), "valor no válido para sexo: 'x'");
    }
}
