//! Unit conversion over a table of directed factors.
//!
//! A conversion is found directly, or through exactly one intermediate unit.

use serde::{Deserialize, Serialize};

use crate::error::{CalcError, Result};

/// Directed conversion `desde -> hacia` with `hacia = desde * factor`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionFactor {
    pub desde: String,
    pub hacia: String,
    pub factor: f64,
}

impl ConversionFactor {
    pub fn new(desde: impl Into<String>, hacia: impl Into<String>, factor: f64) -> Self {
        Self {
            desde: desde.into(),
            hacia: hacia.into(),
            factor,
        }
    }
}

/// Conversion result with the path that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Converted {
    pub cantidad: f64,
    pub factor: f64,
    pub ruta: Vec<String>,
}

fn same_unit(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Convert `quantity` from one unit to another using `table`.
pub fn convert(table: &[ConversionFactor], quantity: f64, from: &str, to: &str) -> Result<Converted> {
    if from.trim().is_empty() {
        return Err(CalcError::Missing { field: "desde" });
    }
    if to.trim().is_empty() {
        return Err(CalcError::Missing { field: "hacia" });
    }

    if same_unit(from, to) {
        return Ok(Converted {
            cantidad: quantity,
            factor: 1.0,
            ruta: vec![from.trim().to_owned()],
        });
    }

    if let Some(direct) = table
        .iter()
        .find(|c| same_unit(&c.desde, from) && same_unit(&c.hacia, to))
    {
        return Ok(Converted {
            cantidad: quantity * direct.factor,
            factor: direct.factor,
            ruta: vec![direct.desde.clone(), direct.hacia.clone()],
        });
    }

    for first in table.iter().filter(|c| same_unit(&c.desde, from)) {
        if let Some(second) = table
            .iter()
            .find(|c| same_unit(&c.desde, &first.hacia) && same_unit(&c.hacia, to))
        {
            let factor = first.factor * second.factor;
            return Ok(Converted {
                cantidad: quantity * factor,
                factor,
                ruta: vec![first.desde.clone(), first.hacia.clone(), second.hacia.clone()],
            });
        }
    }

    Err(CalcError::NoConversion {
        from: from.trim().to_owned(),
        to: to.trim().to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<ConversionFactor> {
        vec![
            ConversionFactor::new("g", "kg", 0.001),
            ConversionFactor::new("kg", "g", 1000.0),
            ConversionFactor::new("cda", "cdta", 3.0),
            ConversionFactor::new("taza", "cda", 16.0),
            ConversionFactor::new("cdta", "ml", 5.0),
        ]
    }

    #[test]
    fn identity() {
        let result = convert(&table(), 3.0, "G", "g").unwrap();
        assert_eq!(result.cantidad, 3.0);
        assert_eq!(result.factor, 1.0);
    }

    #[test]
    fn direct() {
        let result = convert(&table(), 2.0, "kg", "g").unwrap();
        assert_eq!(result.cantidad, 2000.0);
        assert_eq!(result.ruta, vec!["kg", "g"]);
    }

    #[test]
    fn one_hop() {
        let result = convert(&table(), 1.0, "taza", "cdta").unwrap();
        assert_eq!(result.cantidad, 48.0);
        assert_eq!(result.ruta, vec!["taza", "cda", "cdta"]);
    }

    #[test]
    fn two_hops_is_not_found() {
        let err = convert(&table(), 1.0, "taza", "ml").unwrap_err();
        assert!(matches!(err, CalcError::NoConversion { .. }));
    }

    #[test]
    fn blank_units_rejected() {
        assert!(matches!(
            convert(&table(), 1.0, "", "g"),
            Err(CalcError::Missing { field: "desde" })
        ));
    }
}
