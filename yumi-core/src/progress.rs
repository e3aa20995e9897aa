//! Weight history statistics and ideal-weight reference values.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::energy::{round1, Sex};
use crate::error::{CalcError, Result};

const SECONDS_PER_DAY: f64 = 86_400.0;
const CM_PER_INCH: f64 = 2.54;
const FIVE_FEET_IN_INCHES: f64 = 60.0;
const HEALTHY_BMI: (f64, f64) = (18.5, 24.9);

/// A single weigh-in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightSample {
    pub fecha: DateTime<Utc>,
    pub peso: f64,
}

/// Summary over a weight history. Empty histories have no values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WeightStats {
    pub peso_inicial: Option<f64>,
    pub peso_actual: Option<f64>,
    pub cambio: Option<f64>,
    /// Average change in kg per day between the oldest and newest sample
    pub tendencia: Option<f64>,
    pub total_registros: usize,
}

/// Compute statistics over samples in any order.
pub fn weight_stats(samples: &[WeightSample]) -> WeightStats {
    let oldest = samples.iter().min_by_key(|s| s.fecha);
    let newest = samples.iter().max_by_key(|s| s.fecha);

    let (Some(oldest), Some(newest)) = (oldest, newest) else {
        return WeightStats::default();
    };

    let cambio = newest.peso - oldest.peso;
    let days = (newest.fecha - oldest.fecha).num_seconds() as f64 / SECONDS_PER_DAY;
    let tendencia = if samples.len() > 1 && days > 0.0 {
        cambio / days
    } else {
        0.0
    };

    WeightStats {
        peso_inicial: Some(oldest.peso),
        peso_actual: Some(newest.peso),
        cambio: Some(cambio),
        tendencia: Some(tendencia),
        total_registros: samples.len(),
    }
}

/// Reference weights for a height
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdealWeight {
    /// Devine formula, kg
    pub peso_ideal: f64,
    /// Weight range for a BMI between 18.5 and 24.9, kg
    pub rango_saludable: (f64, f64),
}

/// Devine ideal weight plus the healthy BMI range for `height_cm`.
pub fn ideal_weight(height_cm: f64, sex: Sex) -> Result<IdealWeight> {
    CalcError::check_range("altura", height_cm, 1.0, 250.0)?;

    let base = match sex {
        Sex::Male => 50.0,
        Sex::Female => 45.5,
    };
    let inches_over_five_feet = (height_cm / CM_PER_INCH - FIVE_FEET_IN_INCHES).max(0.0);
    let meters_sq = (height_cm / 100.0).powi(2);

    Ok(IdealWeight {
        peso_ideal: round1(base + 2.3 * inches_over_five_feet),
        rango_saludable: (
            round1(HEALTHY_BMI.0 * meters_sq),
            round1(HEALTHY_BMI.1 * meters_sq),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(day: u32, peso: f64) -> WeightSample {
        WeightSample {
            fecha: Utc.with_ymd_and_hms(2024, 3, day, 8, 0, 0).unwrap(),
            peso,
        }
    }

    #[test]
    fn empty_history() {
        let stats = weight_stats(&[]);
        assert_eq!(stats.total_registros, 0);
        assert!(stats.peso_actual.is_none());
        assert!(stats.tendencia.is_none());
    }

    #[test]
    fn single_sample_has_flat_trend() {
        let stats = weight_stats(&[sample(1, 80.0)]);
        assert_eq!(stats.cambio, Some(0.0));
        assert_eq!(stats.tendencia, Some(0.0));
    }

    #[test]
    fn trend_per_day_regardless_of_order() {
        let stats = weight_stats(&[sample(11, 78.0), sample(1, 80.0), sample(6, 79.0)]);
        assert_eq!(stats.peso_inicial, Some(80.0));
        assert_eq!(stats.peso_actual, Some(78.0));
        assert_eq!(stats.cambio, Some(-2.0));
        assert_eq!(stats.tendencia, Some(-0.2));
        assert_eq!(stats.total_registros, 3);
    }

    #[test]
    fn devine_formula() {
        // 177.8 cm is exactly 70 inches
        let ideal = ideal_weight(177.8, Sex::Male).unwrap();
        assert_eq!(ideal.peso_ideal, 73.0);

        let short = ideal_weight(150.0, Sex::Female).unwrap();
        assert_eq!(short.peso_ideal, 45.5);
    }

    #[test]
    fn healthy_range() {
        let ideal = ideal_weight(180.0, Sex::Female).unwrap();
        assert_eq!(ideal.rango_saludable, (59.9, 80.7));
    }

    #[test]
    fn rejects_bad_height() {
        assert!(ideal_weight(0.0, Sex::Male).is_err());
    }
}
