use super::{ThresholdResolver, ThresholdTableError};
use crate::clinical::patient::Measurement;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Last tabulated day of life; later days reuse it.
const LAST_TABULATED_DAY: u8 = 7;

/// Birth-weight bands, heaviest first. Declaration order is the ordering relation:
/// a band compares greater than every heavier band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WeightBand {
    #[serde(rename = "at_least_2500")]
    AtLeast2500,
    #[serde(rename = "from_2000_to_2499")]
    From2000To2499,
    #[serde(rename = "from_1500_to_1999")]
    From1500To1999,
    #[serde(rename = "from_1000_to_1499")]
    From1000To1499,
    #[serde(rename = "at_most_999")]
    AtMost999,
}

impl WeightBand {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::AtLeast2500,
            Self::From2000To2499,
            Self::From1500To1999,
            Self::From1000To1499,
            Self::AtMost999,
        ]
    }

    pub fn from_weight(grams: f64) -> Self {
        if grams >= 2500.0 {
            Self::AtLeast2500
        } else if grams >= 2000.0 {
            Self::From2000To2499
        } else if grams >= 1500.0 {
            Self::From1500To1999
        } else if grams >= 1000.0 {
            Self::From1000To1499
        } else {
            Self::AtMost999
        }
    }

    /// The next lighter band, or `None` for the lightest.
    pub const fn lighter(self) -> Option<Self> {
        match self {
            Self::AtLeast2500 => Some(Self::From2000To2499),
            Self::From2000To2499 => Some(Self::From1500To1999),
            Self::From1500To1999 => Some(Self::From1000To1499),
            Self::From1000To1499 => Some(Self::AtMost999),
            Self::AtMost999 => None,
        }
    }

    pub const fn lower_bound_g(self) -> Option<u32> {
        match self {
            Self::AtLeast2500 => Some(2500),
            Self::From2000To2499 => Some(2000),
            Self::From1500To1999 => Some(1500),
            Self::From1000To1499 => Some(1000),
            Self::AtMost999 => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::AtLeast2500 => "≥2,500g",
            Self::From2000To2499 => "2,000–2,499g",
            Self::From1500To1999 => "1,500–1,999g",
            Self::From1000To1499 => "1,000–1,499g",
            Self::AtMost999 => "≤999g",
        }
    }
}

/// Phototherapy threshold (mg/dL) for days of life 0 through 7 of one band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightBandCurve {
    pub band: WeightBand,
    pub by_day: [f64; 8],
}

impl WeightBandCurve {
    const fn new(band: WeightBand, by_day: [f64; 8]) -> Self {
        Self { band, by_day }
    }
}

/// Weight-category x day-of-life threshold table.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightCategoryThresholds {
    curves: Vec<WeightBandCurve>,
}

impl WeightCategoryThresholds {
    /// Build from externally supplied curves, checking that every band appears once,
    /// heaviest first, with usable values.
    pub fn new(curves: Vec<WeightBandCurve>) -> Result<Self, ThresholdTableError> {
        let expected = WeightBand::ordered();
        if curves.len() != expected.len() {
            return Err(ThresholdTableError::BandCount {
                expected: expected.len(),
                found: curves.len(),
            });
        }

        for (curve, band) in curves.iter().zip(expected) {
            if curve.band != band {
                return Err(ThresholdTableError::BandOutOfOrder {
                    expected: band.label(),
                    found: curve.band.label(),
                });
            }
            if curve
                .by_day
                .iter()
                .any(|value| !value.is_finite() || *value <= 0.0)
            {
                return Err(ThresholdTableError::InvalidValue { band: band.label() });
            }
        }

        Ok(Self { curves })
    }

    /// Published weight-band curves, validated like any supplied table.
    pub fn standard() -> Result<Self, ThresholdTableError> {
        Self::new(vec![
            WeightBandCurve::new(
                WeightBand::AtLeast2500,
                [11.0, 12.0, 15.0, 17.0, 18.0, 19.0, 19.5, 20.0],
            ),
            WeightBandCurve::new(
                WeightBand::From2000To2499,
                [9.5, 10.0, 12.0, 14.0, 16.0, 17.0, 18.0, 18.0],
            ),
            WeightBandCurve::new(
                WeightBand::From1500To1999,
                [7.5, 8.0, 10.0, 12.0, 14.0, 15.0, 16.0, 16.0],
            ),
            WeightBandCurve::new(
                WeightBand::From1000To1499,
                [6.5, 7.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0],
            ),
            WeightBandCurve::new(
                WeightBand::AtMost999,
                [4.5, 5.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
            ),
        ])
    }

    pub fn curves(&self) -> &[WeightBandCurve] {
        &self.curves
    }

    pub fn curve(&self, band: WeightBand) -> Option<&WeightBandCurve> {
        self.curves.iter().find(|curve| curve.band == band)
    }

    /// Threshold for a band on a day of life. Day 0 has no validated entry.
    pub fn threshold(&self, band: WeightBand, days_old: Option<i64>) -> DayThreshold {
        let Some(days_old) = days_old.filter(|days| *days >= 0) else {
            return DayThreshold::DayOfLifeUnknown;
        };
        if days_old == 0 {
            return DayThreshold::UndefinedDayZero;
        }

        let day = days_old.clamp(1, i64::from(LAST_TABULATED_DAY)) as u8;
        match self.curve(band) {
            Some(curve) => DayThreshold::Defined {
                day,
                mg_dl: curve.by_day[usize::from(day)],
            },
            None => DayThreshold::DayOfLifeUnknown,
        }
    }

    fn day_value(&self, band: WeightBand, day: usize) -> Option<f64> {
        self.curve(band).map(|curve| curve.by_day[day])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightDayQuery {
    pub birth_weight_g: Measurement,
    pub days_old: Option<i64>,
    pub kernicterus_risk: bool,
    pub measured_total_mg_dl: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DayThreshold {
    Defined { day: u8, mg_dl: f64 },
    UndefinedDayZero,
    DayOfLifeUnknown,
}

impl DayThreshold {
    pub const fn mg_dl(self) -> Option<f64> {
        match self {
            Self::Defined { mg_dl, .. } => Some(mg_dl),
            _ => None,
        }
    }

    pub const fn is_day_zero(self) -> bool {
        matches!(self, Self::UndefinedDayZero)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndeterminedReason {
    BirthWeightUnmeasured,
    InvalidBirthWeight,
}

impl UndeterminedReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::BirthWeightUnmeasured => "birth weight not measured",
            Self::InvalidBirthWeight => "birth weight is not a positive value",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BilirubinAlert {
    /// Day-0 measurement above the table's reference-only day-0 value.
    AboveDayZeroReference { reference_mg_dl: f64, measured_mg_dl: f64 },
    /// Day-0 measurement already above the band's day-1 threshold.
    AboveDayOneThreshold { threshold_mg_dl: f64, measured_mg_dl: f64 },
    /// Kernicterus risk is present but the lightest band is already in use.
    RiskAtLowestBand,
}

impl BilirubinAlert {
    pub fn summary(&self) -> String {
        match self {
            Self::AboveDayZeroReference {
                reference_mg_dl,
                measured_mg_dl,
            } => format!(
                "day-0 bilirubin {measured_mg_dl} mg/dL exceeds the reference-only day-0 value {reference_mg_dl} mg/dL; judge against the day-1 threshold with care"
            ),
            Self::AboveDayOneThreshold {
                threshold_mg_dl,
                measured_mg_dl,
            } => format!(
                "day-0 bilirubin {measured_mg_dl} mg/dL already exceeds the day-1 threshold {threshold_mg_dl} mg/dL; consider prompt treatment"
            ),
            Self::RiskAtLowestBand => {
                "kernicterus risk present; the lowest band is already applied".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightBandThreshold {
    pub band: WeightBand,
    pub band_label: &'static str,
    pub original_band: WeightBand,
    pub original_band_label: &'static str,
    pub adjusted: bool,
    pub kernicterus_risk: bool,
    pub threshold: DayThreshold,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_zero_reference_mg_dl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measured_total_mg_dl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exceeds_threshold: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<BilirubinAlert>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WeightBandOutcome {
    Undetermined { reason: UndeterminedReason },
    Resolved(WeightBandThreshold),
}

impl WeightBandOutcome {
    pub fn resolved(&self) -> Option<&WeightBandThreshold> {
        match self {
            Self::Resolved(threshold) => Some(threshold),
            Self::Undetermined { .. } => None,
        }
    }
}

impl ThresholdResolver for WeightCategoryThresholds {
    type Query = WeightDayQuery;
    type Resolution = WeightBandOutcome;

    fn resolve(&self, query: &WeightDayQuery) -> WeightBandOutcome {
        let grams = match query.birth_weight_g {
            Measurement::Unmeasured => {
                return WeightBandOutcome::Undetermined {
                    reason: UndeterminedReason::BirthWeightUnmeasured,
                }
            }
            Measurement::Measured(grams) if !(grams > 0.0) => {
                return WeightBandOutcome::Undetermined {
                    reason: UndeterminedReason::InvalidBirthWeight,
                }
            }
            Measurement::Measured(grams) => grams,
        };

        let original_band = WeightBand::from_weight(grams);
        let band = if query.kernicterus_risk {
            original_band.lighter().unwrap_or(original_band)
        } else {
            original_band
        };
        let adjusted = band != original_band;
        if adjusted {
            debug!(
                from = original_band.label(),
                to = band.label(),
                "kernicterus risk lowered the phototherapy band"
            );
        }

        let threshold = self.threshold(band, query.days_old);
        let day_zero_reference_mg_dl = if threshold.is_day_zero() {
            self.day_value(band, 0)
        } else {
            None
        };

        let mut alerts = Vec::new();
        if query.kernicterus_risk && !adjusted {
            alerts.push(BilirubinAlert::RiskAtLowestBand);
        }

        let measured = query.measured_total_mg_dl;
        let exceeds_threshold = match (threshold.mg_dl(), measured) {
            (Some(limit), Some(value)) => Some(value > limit),
            _ => None,
        };

        if let (true, Some(value)) = (threshold.is_day_zero(), measured) {
            if let Some(reference) =
                day_zero_reference_mg_dl.filter(|reference| value > *reference)
            {
                alerts.push(BilirubinAlert::AboveDayZeroReference {
                    reference_mg_dl: reference,
                    measured_mg_dl: value,
                });
            }
            if let Some(day_one) = self.day_value(band, 1).filter(|limit| value > *limit) {
                alerts.push(BilirubinAlert::AboveDayOneThreshold {
                    threshold_mg_dl: day_one,
                    measured_mg_dl: value,
                });
            }
        }

        WeightBandOutcome::Resolved(WeightBandThreshold {
            band,
            band_label: band.label(),
            original_band,
            original_band_label: original_band.label(),
            adjusted,
            kernicterus_risk: query.kernicterus_risk,
            threshold,
            day_zero_reference_mg_dl,
            measured_total_mg_dl: measured,
            exceeds_threshold,
            alerts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard_curves() -> WeightCategoryThresholds {
        WeightCategoryThresholds::standard().expect("standard curves validate")
    }

    fn query(grams: f64, days_old: i64, kernicterus_risk: bool) -> WeightDayQuery {
        WeightDayQuery {
            birth_weight_g: Measurement::Measured(grams),
            days_old: Some(days_old),
            kernicterus_risk,
            measured_total_mg_dl: None,
        }
    }

    fn resolve(query: &WeightDayQuery) -> WeightBandThreshold {
        match standard_curves().resolve(query) {
            WeightBandOutcome::Resolved(threshold) => threshold,
            other => panic!("expected resolved threshold, got {other:?}"),
        }
    }

    #[test]
    fn term_weight_day_one_threshold() {
        let resolved = resolve(&query(2600.0, 1, false));
        assert_eq!(resolved.band, WeightBand::AtLeast2500);
        assert_eq!(resolved.threshold.mg_dl(), Some(12.0));
        assert!(!resolved.adjusted);
    }

    #[test]
    fn day_zero_is_undefined_with_reference_value() {
        let resolved = resolve(&query(2600.0, 0, false));
        assert_eq!(resolved.threshold, DayThreshold::UndefinedDayZero);
        assert_eq!(resolved.threshold.mg_dl(), None);
        assert_eq!(resolved.day_zero_reference_mg_dl, Some(11.0));
    }

    #[test]
    fn days_beyond_table_use_day_seven() {
        let resolved = resolve(&query(2600.0, 23, false));
        assert_eq!(
            resolved.threshold,
            DayThreshold::Defined {
                day: 7,
                mg_dl: 20.0
            }
        );
    }

    #[test]
    fn very_low_birth_weight_day_two() {
        let resolved = resolve(&query(1200.0, 2, false));
        assert_eq!(resolved.band_label, "1,000–1,499g");
        assert_eq!(resolved.threshold.mg_dl(), Some(7.0));
        assert!(!resolved.adjusted);
    }

    #[test]
    fn kernicterus_risk_lowers_one_band() {
        let resolved = resolve(&query(1200.0, 2, true));
        assert_eq!(resolved.band_label, "≤999g");
        assert_eq!(resolved.original_band, WeightBand::From1000To1499);
        assert_eq!(resolved.threshold.mg_dl(), Some(5.0));
        assert!(resolved.adjusted);
        assert!(resolved.alerts.is_empty());
    }

    #[test]
    fn lightest_band_is_not_lowered_further() {
        let resolved = resolve(&query(850.0, 3, true));
        assert_eq!(resolved.band, WeightBand::AtMost999);
        assert!(!resolved.adjusted);
        assert_eq!(resolved.alerts, vec![BilirubinAlert::RiskAtLowestBand]);
    }

    #[test]
    fn downgrade_moves_exactly_one_band_for_every_band() {
        for band in WeightBand::ordered() {
            match band.lighter() {
                Some(lighter) => {
                    assert!(lighter > band);
                    let position = |b: WeightBand| {
                        WeightBand::ordered().iter().position(|x| *x == b).unwrap_or(99)
                    };
                    assert_eq!(position(lighter), position(band) + 1);
                }
                None => assert_eq!(band, WeightBand::AtMost999),
            }
        }
    }

    #[test]
    fn heavier_weight_never_yields_a_lighter_band() {
        let mut previous = WeightBand::from_weight(400.0);
        for grams in (400..=4500).step_by(10) {
            let band = WeightBand::from_weight(f64::from(grams));
            assert!(band <= previous, "{grams} g mapped to a lighter band");
            previous = band;
        }
        assert_eq!(WeightBand::from_weight(2500.0), WeightBand::AtLeast2500);
        assert_eq!(WeightBand::from_weight(2499.9), WeightBand::From2000To2499);
        assert_eq!(WeightBand::from_weight(999.0), WeightBand::AtMost999);
    }

    #[test]
    fn unmeasured_weight_is_undetermined() {
        let outcome = standard_curves().resolve(&WeightDayQuery {
            birth_weight_g: Measurement::Unmeasured,
            days_old: Some(2),
            kernicterus_risk: false,
            measured_total_mg_dl: Some(9.0),
        });
        assert_eq!(
            outcome,
            WeightBandOutcome::Undetermined {
                reason: UndeterminedReason::BirthWeightUnmeasured
            }
        );
    }

    #[test]
    fn unknown_day_of_life_keeps_the_band() {
        let mut q = query(3100.0, 0, false);
        q.days_old = None;
        let resolved = resolve(&q);
        assert_eq!(resolved.band, WeightBand::AtLeast2500);
        assert_eq!(resolved.threshold, DayThreshold::DayOfLifeUnknown);
    }

    #[test]
    fn measurement_is_compared_against_threshold() {
        let mut q = query(2600.0, 3, false);
        q.measured_total_mg_dl = Some(17.5);
        assert_eq!(resolve(&q).exceeds_threshold, Some(true));
        q.measured_total_mg_dl = Some(17.0);
        assert_eq!(resolve(&q).exceeds_threshold, Some(false));
    }

    #[test]
    fn day_zero_measurement_raises_alerts() {
        let mut q = query(2600.0, 0, false);
        q.measured_total_mg_dl = Some(11.5);
        let resolved = resolve(&q);
        assert_eq!(resolved.exceeds_threshold, None);
        assert_eq!(
            resolved.alerts,
            vec![BilirubinAlert::AboveDayZeroReference {
                reference_mg_dl: 11.0,
                measured_mg_dl: 11.5
            }]
        );

        q.measured_total_mg_dl = Some(12.5);
        let resolved = resolve(&q);
        assert_eq!(resolved.alerts.len(), 2);
        assert!(resolved.alerts[1].summary().contains("day-1 threshold 12"));
    }

    #[test]
    fn validated_construction_rejects_misordered_bands() {
        let mut curves = standard_curves().curves().to_vec();
        assert!(WeightCategoryThresholds::new(curves.clone()).is_ok());

        curves.swap(1, 2);
        assert_eq!(
            WeightCategoryThresholds::new(curves.clone()),
            Err(ThresholdTableError::BandOutOfOrder {
                expected: "2,000–2,499g",
                found: "1,500–1,999g"
            })
        );

        curves.truncate(4);
        assert!(matches!(
            WeightCategoryThresholds::new(curves),
            Err(ThresholdTableError::BandCount {
                expected: 5,
                found: 4
            })
        ));
    }

    #[test]
    fn bands_serialize_with_separated_gram_limits() {
        let tags: Vec<String> = WeightBand::ordered()
            .iter()
            .map(|band| serde_json::to_string(band).expect("serialize"))
            .collect();
        assert_eq!(
            tags,
            [
                "\"at_least_2500\"",
                "\"from_2000_to_2499\"",
                "\"from_1500_to_1999\"",
                "\"from_1000_to_1499\"",
                "\"at_most_999\"",
            ]
        );
        let parsed: WeightBand = serde_json::from_str("\"at_most_999\"").expect("parse");
        assert_eq!(parsed, WeightBand::AtMost999);
    }
}
