//! Percentile resolution against the LMS growth reference and size-for-dates classification.

use super::patient::{BirthOrder, Measurement, PatientRecord, Sex};
use super::reference::{GrowthAxis, LmsParameters, ReferenceKey, ReferenceRow, ReferenceTable};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// z-score of the 10th percentile.
pub const Z_P10: f64 = -1.281_551_565_544_600_4;
/// z-score of the 90th percentile.
pub const Z_P90: f64 = 1.281_551_565_544_600_4;
pub const Z_MINUS_TWO_SD: f64 = -2.0;

/// Widest week offset tried when a (week, day) cell is missing.
const FALLBACK_WEEK_SPAN: u16 = 7;

/// Standard deviation score of an observation. `None` for non-positive values or an
/// unusable curve (`M <= 0`, `S == 0`).
pub fn value_to_score(lms: &LmsParameters, value: f64) -> Option<f64> {
    if !(value > 0.0) || !(lms.m > 0.0) || lms.s == 0.0 {
        return None;
    }

    let z = if lms.l == 0.0 {
        (value / lms.m).ln() / lms.s
    } else {
        ((value / lms.m).powf(lms.l) - 1.0) / (lms.l * lms.s)
    };

    z.is_finite().then_some(z)
}

/// Percentile equivalent of a z-score, in [0, 100].
pub fn score_to_percentile(z: f64) -> f64 {
    (50.0 * (1.0 + erf(z / std::f64::consts::SQRT_2))).clamp(0.0, 100.0)
}

/// Measurement value that sits at the given z-score. `None` where the power transform
/// has no real solution for that z.
pub fn score_to_value(lms: &LmsParameters, z: f64) -> Option<f64> {
    if !(lms.m > 0.0) || lms.s == 0.0 {
        return None;
    }

    let value = if lms.l == 0.0 {
        lms.m * (lms.s * z).exp()
    } else {
        let base = 1.0 + lms.l * lms.s * z;
        if base <= 0.0 {
            return None;
        }
        lms.m * base.powf(1.0 / lms.l)
    };

    value.is_finite().then_some(value)
}

/// Error function approximation (Abramowitz and Stegun 7.1.26).
fn erf(x: f64) -> f64 {
    if x == 0.0 {
        return 0.0;
    }

    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

/// Size-for-gestational-age category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    SgaSevere,
    Sga,
    Lfd,
    Aga,
    HfdLga,
    Undetermined,
}

impl SizeClass {
    pub const fn label(self) -> &'static str {
        match self {
            Self::SgaSevere => "SGA (below -2 SD)",
            Self::Sga => "SGA",
            Self::Lfd => "LFD",
            Self::Aga => "AGA",
            Self::HfdLga => "HFD / LGA",
            Self::Undetermined => "Undetermined",
        }
    }
}

/// Classify from weight and length z-scores.
///
/// Weight at or above the 90th percentile is HFD/LGA, strictly between the 10th and 90th
/// is AGA. Below that, a length under the 10th percentile makes it SGA (severe when either
/// axis is under -2 SD), otherwise LFD. Without a length only the weight split applies.
pub fn classify_size(weight_z: Option<f64>, length_z: Option<f64>) -> SizeClass {
    let Some(weight_z) = weight_z else {
        return SizeClass::Undetermined;
    };

    if weight_z >= Z_P90 {
        return SizeClass::HfdLga;
    }
    if weight_z > Z_P10 {
        return SizeClass::Aga;
    }

    match length_z {
        Some(length_z) if length_z < Z_P10 => {
            if weight_z < Z_MINUS_TWO_SD || length_z < Z_MINUS_TWO_SD {
                SizeClass::SgaSevere
            } else {
                SizeClass::Sga
            }
        }
        _ => SizeClass::Lfd,
    }
}

/// The reference row used for an evaluation and whether it came from the fallback search.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedReference<'a> {
    pub requested: ReferenceKey,
    pub row: &'a ReferenceRow,
}

impl ResolvedReference<'_> {
    pub fn used(&self) -> ReferenceKey {
        self.row.key
    }

    pub fn is_fallback(&self) -> bool {
        self.row.key != self.requested
    }
}

/// Exact lookup, then day 0 of the same week, then day 0 of weeks scanned outward
/// (`week - k` before `week + k`) up to seven weeks away.
pub fn resolve_reference_row<'a>(
    table: &'a ReferenceTable,
    week: u16,
    day: u8,
) -> Option<ResolvedReference<'a>> {
    let requested = ReferenceKey::new(week, day);
    let found = |row: &'a ReferenceRow| ResolvedReference { requested, row };

    if let Some(row) = table.lookup(week, day) {
        return Some(found(row));
    }
    if let Some(row) = table.lookup(week, 0) {
        debug!(week, day, "reference day missing, using day 0");
        return Some(found(row));
    }

    for offset in 1..=FALLBACK_WEEK_SPAN {
        let candidates = [week.checked_sub(offset), week.checked_add(offset)];
        for candidate in candidates.into_iter().flatten() {
            if let Some(row) = table.lookup(candidate, 0) {
                debug!(
                    week,
                    day,
                    used_week = candidate,
                    "reference week missing, using nearest tabulated week"
                );
                return Some(found(row));
            }
        }
    }

    debug!(week, day, "no reference row within fallback span");
    None
}

/// Where the growth evaluation took its curves from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReferenceSource {
    Resolved {
        requested: ReferenceKey,
        used: ReferenceKey,
        fallback: bool,
    },
    NoReferenceAvailable,
}

/// Percentile standing of one measured axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisScore {
    pub value: f64,
    pub z_score: f64,
    pub percentile: f64,
    pub minus_two_sd_value: Option<f64>,
    pub p10_value: Option<f64>,
    pub p90_value: Option<f64>,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AxisAssessment {
    Unmeasured,
    NoReferenceAvailable,
    /// The transform had no answer for this value (e.g. a non-positive reading).
    Undefined,
    Scored(AxisScore),
}

impl AxisAssessment {
    pub fn z_score(&self) -> Option<f64> {
        match self {
            Self::Scored(score) => Some(score.z_score),
            _ => None,
        }
    }

    pub fn percentile(&self) -> Option<f64> {
        match self {
            Self::Scored(score) => Some(score.percentile),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Unmeasured => "not measured".to_string(),
            Self::NoReferenceAvailable => "no reference available".to_string(),
            Self::Undefined => "undetermined".to_string(),
            Self::Scored(score) => score.display.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthAssessment {
    pub reference: ReferenceSource,
    pub weight: AxisAssessment,
    pub length: AxisAssessment,
    pub head_circumference: AxisAssessment,
    pub size_class: SizeClass,
    pub size_label: &'static str,
}

/// Borrowed view over the reference table that scores a patient's birth measurements.
#[derive(Debug, Clone, Copy)]
pub struct GrowthResolver<'a> {
    table: Option<&'a ReferenceTable>,
}

impl<'a> GrowthResolver<'a> {
    pub fn new(table: Option<&'a ReferenceTable>) -> Self {
        Self { table }
    }

    pub fn assess(&self, record: &PatientRecord) -> GrowthAssessment {
        let gestation = record.gestational_age;
        let resolved = self
            .table
            .and_then(|table| resolve_reference_row(table, gestation.weeks, gestation.days));

        let axis = |axis: GrowthAxis, measurement: Measurement| {
            score_axis(resolved.as_ref(), axis, measurement, record.sex, record.birth_order)
        };
        let weight = axis(GrowthAxis::Weight, record.birth_weight_g);
        let length = axis(GrowthAxis::Length, record.birth_length_cm);
        let head_circumference = axis(GrowthAxis::HeadCircumference, record.head_circumference_cm);

        let size_class = classify_size(weight.z_score(), length.z_score());

        let reference = match resolved {
            Some(resolved) => ReferenceSource::Resolved {
                requested: resolved.requested,
                used: resolved.used(),
                fallback: resolved.is_fallback(),
            },
            None => ReferenceSource::NoReferenceAvailable,
        };

        GrowthAssessment {
            reference,
            weight,
            length,
            head_circumference,
            size_class,
            size_label: size_class.label(),
        }
    }
}

fn score_axis(
    resolved: Option<&ResolvedReference<'_>>,
    axis: GrowthAxis,
    measurement: Measurement,
    sex: Sex,
    order: BirthOrder,
) -> AxisAssessment {
    let Some(value) = measurement.value() else {
        return AxisAssessment::Unmeasured;
    };
    let Some(lms) = resolved.and_then(|resolved| resolved.row.parameters(axis, sex, order)) else {
        return AxisAssessment::NoReferenceAvailable;
    };
    let Some(z_score) = value_to_score(&lms, value) else {
        return AxisAssessment::Undefined;
    };

    let percentile = score_to_percentile(z_score);
    AxisAssessment::Scored(AxisScore {
        value,
        z_score,
        percentile,
        minus_two_sd_value: score_to_value(&lms, Z_MINUS_TWO_SD),
        p10_value: score_to_value(&lms, Z_P10),
        p90_value: score_to_value(&lms, Z_P90),
        display: format!("{percentile:.1} percentile ({z_score:+.2} SD)"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinical::patient::sample_record;
    use crate::clinical::reference::fixtures::{row, sparse_table};

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn score_round_trips_through_power_transform() {
        let curves = [
            LmsParameters::new(0.35, 3050.0, 0.13),
            LmsParameters::new(-1.4, 48.9, 0.045),
            LmsParameters::new(2.1, 33.4, 0.036),
        ];
        for lms in curves {
            for value in [0.6 * lms.m, 0.93 * lms.m, lms.m, 1.2 * lms.m] {
                let z = value_to_score(&lms, value).expect("score defined");
                let back = score_to_value(&lms, z).expect("value defined");
                assert!(close(back, value, 1e-9 * value), "{lms:?} {value} -> {back}");
            }
        }
    }

    #[test]
    fn score_round_trips_through_log_branch() {
        let lms = LmsParameters::new(0.0, 3000.0, 0.12);
        for value in [1800.0, 3000.0, 4100.0] {
            let z = value_to_score(&lms, value).expect("score defined");
            assert!(close(z, (value / 3000.0_f64).ln() / 0.12, 1e-12));
            let back = score_to_value(&lms, z).expect("value defined");
            assert!(close(back, value, 1e-9));
        }
    }

    #[test]
    fn invalid_inputs_yield_no_score() {
        let lms = LmsParameters::new(0.3, 3000.0, 0.12);
        assert!(value_to_score(&lms, 0.0).is_none());
        assert!(value_to_score(&lms, -5.0).is_none());
        assert!(value_to_score(&LmsParameters::new(0.3, 0.0, 0.12), 3000.0).is_none());
        assert!(value_to_score(&LmsParameters::new(0.3, 3000.0, 0.0), 3000.0).is_none());
    }

    #[test]
    fn percentile_of_known_scores() {
        assert_eq!(score_to_percentile(0.0), 50.0);
        assert!(close(score_to_percentile(Z_P90), 90.0, 1e-4));
        assert!(close(score_to_percentile(Z_P10), 10.0, 1e-4));
        assert!(close(score_to_percentile(-2.0), 2.275, 1e-3));
        assert!(score_to_percentile(-40.0) >= 0.0);
        assert!(score_to_percentile(40.0) <= 100.0);
    }

    #[test]
    fn classification_splits_on_weight_then_length() {
        assert_eq!(classify_size(None, Some(0.0)), SizeClass::Undetermined);
        assert_eq!(classify_size(Some(1.5), None), SizeClass::HfdLga);
        assert_eq!(classify_size(Some(0.2), Some(-3.0)), SizeClass::Aga);
        assert_eq!(classify_size(Some(-1.5), Some(0.0)), SizeClass::Lfd);
        assert_eq!(classify_size(Some(-1.5), None), SizeClass::Lfd);
        assert_eq!(classify_size(Some(-1.5), Some(-1.5)), SizeClass::Sga);
        assert_eq!(classify_size(Some(-2.1), Some(-1.5)), SizeClass::SgaSevere);
        assert_eq!(classify_size(Some(-1.5), Some(-2.4)), SizeClass::SgaSevere);
    }

    #[test]
    fn classification_boundaries_are_inclusive_at_the_90th_percentile() {
        assert_eq!(classify_size(Some(Z_P90), None), SizeClass::HfdLga);
        assert_eq!(classify_size(Some(Z_P90 - 1e-9), None), SizeClass::Aga);
        assert_eq!(classify_size(Some(Z_P10), None), SizeClass::Lfd);
        assert_eq!(classify_size(Some(Z_P10 + 1e-9), None), SizeClass::Aga);
        assert_eq!(classify_size(Some(-1.5), Some(Z_P10)), SizeClass::Lfd);
    }

    #[test]
    fn resolution_prefers_exact_then_day_zero_then_nearest_week() {
        let table = sparse_table();

        let exact = resolve_reference_row(&table, 39, 4).expect("exact row");
        assert_eq!(exact.used(), ReferenceKey::new(39, 4));
        assert!(!exact.is_fallback());

        let day_zero = resolve_reference_row(&table, 30, 5).expect("day zero row");
        assert_eq!(day_zero.used(), ReferenceKey::new(30, 0));
        assert!(day_zero.is_fallback());

        let earlier = resolve_reference_row(&table, 33, 2).expect("earlier week");
        assert_eq!(earlier.used(), ReferenceKey::new(30, 0));

        let later = resolve_reference_row(&table, 36, 1).expect("later week");
        assert_eq!(later.used(), ReferenceKey::new(38, 0));

        let beyond = resolve_reference_row(&table, 44, 3).expect("within span");
        assert_eq!(beyond.used(), ReferenceKey::new(41, 0));
    }

    #[test]
    fn resolution_gives_up_outside_fallback_span() {
        let table = sparse_table();
        assert!(resolve_reference_row(&table, 22, 0).is_none());
        assert!(resolve_reference_row(&table, 49, 0).is_none());
    }

    #[test]
    fn resolver_scores_measured_axes_only() {
        let table = ReferenceTable::from_rows(vec![row(39, 2, 3000.0)]).expect("table");
        let mut record = sample_record();
        record.head_circumference_cm = Measurement::Unmeasured;

        let growth = GrowthResolver::new(Some(&table)).assess(&record);

        match &growth.weight {
            AxisAssessment::Scored(score) => {
                assert!(close(score.z_score, 0.0, 1e-12));
                assert!(close(score.percentile, 50.0, 1e-9));
                let p10 = score.p10_value.expect("p10 boundary");
                let p90 = score.p90_value.expect("p90 boundary");
                let sd2 = score.minus_two_sd_value.expect("-2SD boundary");
                assert!(sd2 < p10 && p10 < 3000.0 && 3000.0 < p90);
                assert_eq!(score.display, "50.0 percentile (+0.00 SD)");
            }
            other => panic!("expected scored weight, got {other:?}"),
        }
        assert_eq!(growth.head_circumference, AxisAssessment::Unmeasured);
        assert_eq!(growth.size_class, SizeClass::Aga);
        assert_eq!(
            growth.reference,
            ReferenceSource::Resolved {
                requested: ReferenceKey::new(39, 2),
                used: ReferenceKey::new(39, 2),
                fallback: false,
            }
        );
    }

    #[test]
    fn resolver_without_table_reports_no_reference() {
        let growth = GrowthResolver::new(None).assess(&sample_record());
        assert_eq!(growth.reference, ReferenceSource::NoReferenceAvailable);
        assert_eq!(growth.weight, AxisAssessment::NoReferenceAvailable);
        assert_eq!(growth.size_class, SizeClass::Undetermined);
    }

    #[test]
    fn unspecified_sex_still_scores_length() {
        let table = ReferenceTable::from_rows(vec![row(39, 2, 3000.0)]).expect("table");
        let mut record = sample_record();
        record.sex = Sex::Unspecified;

        let growth = GrowthResolver::new(Some(&table)).assess(&record);
        assert_eq!(growth.weight, AxisAssessment::NoReferenceAvailable);
        assert!(matches!(growth.length, AxisAssessment::Scored(_)));
        assert_eq!(growth.size_class, SizeClass::Undetermined);
    }

    #[test]
    fn non_positive_reading_is_undefined() {
        let table = ReferenceTable::from_rows(vec![row(39, 2, 3000.0)]).expect("table");
        let mut record = sample_record();
        record.birth_weight_g = Measurement::Measured(0.0);

        let growth = GrowthResolver::new(Some(&table)).assess(&record);
        assert_eq!(growth.weight, AxisAssessment::Undefined);
        assert_eq!(growth.size_class, SizeClass::Undetermined);
    }
}
