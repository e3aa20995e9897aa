//! Recipe calorie totals from per-unit calorie counts.

use serde::{Deserialize, Serialize};

/// Quantity and calories per unit for one ingredient. Missing values
/// contribute nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalorieLine {
    pub cantidad: Option<f64>,
    pub calorias_por_unidad: Option<f64>,
}

/// Total and per-portion calories
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalorieSummary {
    pub total_calorias: f64,
    pub calorias_por_porcion: f64,
    pub porciones: u32,
}

/// Sum `calorias_por_unidad * cantidad` and divide by portions.
///
/// Portions default to 1 when absent or zero.
pub fn summarize<'a, I>(lines: I, portions: Option<u32>) -> CalorieSummary
where
    I: IntoIterator<Item = &'a CalorieLine>,
{
    let total: f64 = lines
        .into_iter()
        .filter_map(|line| match (line.cantidad, line.calorias_por_unidad) {
            (Some(qty), Some(kcal)) if qty.is_finite() && kcal.is_finite() => Some(qty * kcal),
            _ => None,
        })
        .sum();

    let porciones = portions.filter(|p| *p > 0).unwrap_or(1);
    CalorieSummary {
        total_calorias: total,
        calorias_por_porcion: (total / f64::from(porciones)).round(),
        porciones,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: f64, kcal: f64) -> CalorieLine {
        CalorieLine {
            cantidad: Some(qty),
            calorias_por_unidad: Some(kcal),
        }
    }

    #[test]
    fn sums_and_divides() {
        let lines = [line(2.0, 100.0), line(0.5, 300.0)];
        let summary = summarize(&lines, Some(3));
        assert_eq!(summary.total_calorias, 350.0);
        assert_eq!(summary.calorias_por_porcion, 117.0);
        assert_eq!(summary.porciones, 3);
    }

    #[test]
    fn skips_incomplete_lines() {
        let lines = [
            line(1.0, 50.0),
            CalorieLine {
                cantidad: Some(4.0),
                calorias_por_unidad: None,
            },
        ];
        let summary = summarize(&lines, None);
        assert_eq!(summary.total_calorias, 50.0);
        assert_eq!(summary.porciones, 1);
    }

    #[test]
    fn zero_portions_means_one() {
        let summary = summarize(&[line(1.0, 80.0)], Some(0));
        assert_eq!(summary.porciones, 1);
        assert_eq!(summary.calorias_por_porcion, 80.0);
    }
}
