//! Text field validation
//!
//! Required fields are trimmed and must be non-empty. Optional fields treat
//! blank input as absent.

use super::ValidationError;

/// Max length for short names (categories, diets, collections, plans)
pub const MAX_NAME_LEN: usize = 100;

/// Max length for titles
pub const MAX_TITLE_LEN: usize = 256;

/// Max length for long free text (instructions, comments, descriptions)
pub const MAX_TEXT_LEN: usize = 10_000;

/// Max length for URLs
pub const MAX_URL_LEN: usize = 2048;

/// Validate a required text field.
///
/// # Example
/// ```
/// use yumi_server::models::text::{required, MAX_NAME_LEN};
///
/// assert_eq!(required("nombre", Some("  Postres "), MAX_NAME_LEN).unwrap(), "Postres");
/// assert!(required("nombre", Some("   "), MAX_NAME_LEN).is_err());
/// assert!(required("nombre", None, MAX_NAME_LEN).is_err());
/// ```
pub fn required(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<String, ValidationError> {
    optional(field, value, max)?.ok_or(ValidationError::Empty { field })
}

/// Validate an optional text field. Blank becomes `None`.
pub fn optional(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    let Some(trimmed) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(Some(trimmed.to_owned()))
}

/// Validated email address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email(String);

impl Email {
    /// Create an email. Requires one `@` with text on both sides and a dot
    /// in the domain.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "email" });
        }
        if trimmed.len() > 320 {
            return Err(ValidationError::TooLong {
                field: "email",
                max: 320,
            });
        }
        let valid = match trimmed.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && domain.contains('.') && !domain.contains('@')
            }
            None => false,
        };
        if !valid {
            return Err(ValidationError::InvalidFormat {
                field: "email",
                reason: "formato de correo no válido",
            });
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Recipe rating, 1 to 5
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score(i32);

impl Score {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if !(1..=5).contains(&value) {
            return Err(ValidationError::OutOfRange {
                field: "puntuacion",
                min: 1,
                max: 5,
            });
        }
        Ok(Self(value as i32))
    }

    pub fn get(&self) -> i32 {
        self.0
    }
}

/// Require a strictly positive number.
pub fn positive(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::InvalidFormat {
            field,
            reason: "debe ser un número positivo",
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_blank_is_none() {
        assert_eq!(optional("descripcion", Some("  "), 10), Ok(None));
        assert_eq!(optional("descripcion", None, 10), Ok(None));
    }

    #[test]
    fn too_long() {
        let long = "a".repeat(11);
        assert_eq!(
            required("nombre", Some(&long), 10),
            Err(ValidationError::TooLong {
                field: "nombre",
                max: 10
            })
        );
    }

    #[test]
    fn email_rules() {
        assert_eq!(Email::new(" Ana@Example.com ").unwrap().as_str(), "ana@example.com");
        assert!(Email::new("ana").is_err());
        assert!(Email::new("@example.com").is_err());
        assert!(Email::new("ana@localhost").is_err());
        assert!(Email::new("").is_err());
    }

    #[test]
    fn score_bounds() {
        assert!(Score::new(0).is_err());
        assert_eq!(Score::new(5).unwrap().get(), 5);
        assert!(Score::new(6).is_err());
    }

    #[test]
    fn positive_numbers() {
        assert!(positive("peso", 0.0).is_err());
        assert!(positive("peso", -3.0).is_err());
        assert_eq!(positive("peso", 72.5), Ok(72.5));
    }
}
