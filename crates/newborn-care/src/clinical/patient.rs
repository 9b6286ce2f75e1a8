use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// A bedside measurement that may not have been taken.
///
/// Serialized as a plain number or `null` so intake forms stay simple, while every
/// consumer in the crate has to match on the unmeasured case.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Measurement {
    Measured(f64),
    #[default]
    Unmeasured,
}

impl Measurement {
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Measured(value) => Some(value),
            Self::Unmeasured => None,
        }
    }

    pub const fn is_measured(self) -> bool {
        matches!(self, Self::Measured(_))
    }
}

impl From<Option<f64>> for Measurement {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(value) => Self::Measured(value),
            None => Self::Unmeasured,
        }
    }
}

impl From<Measurement> for Option<f64> {
    fn from(value: Measurement) -> Self {
        value.value()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    Unspecified,
}

impl Sex {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Unspecified => "Unspecified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BirthOrder {
    First,
    Subsequent,
}

impl BirthOrder {
    pub const fn label(self) -> &'static str {
        match self {
            Self::First => "First-born",
            Self::Subsequent => "Subsequent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Vaginal,
    PlannedCesarean,
    EmergencyCesarean,
    Instrumental,
    Other,
}

impl DeliveryMethod {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Vaginal => "Vaginal delivery",
            Self::PlannedCesarean => "Planned caesarean section",
            Self::EmergencyCesarean => "Emergency caesarean section",
            Self::Instrumental => "Vacuum / forceps delivery",
            Self::Other => "Other",
        }
    }

    const fn is_stressful(self) -> bool {
        matches!(self, Self::EmergencyCesarean | Self::Instrumental)
    }
}

/// Gestational age as completed weeks plus days (0-6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GestationalAge {
    pub weeks: u16,
    pub days: u8,
}

impl GestationalAge {
    pub const fn new(weeks: u16, days: u8) -> Self {
        Self { weeks, days }
    }

    /// `None` when the week count does not fit the `weeks` field.
    pub fn from_total_days(total: u32) -> Option<Self> {
        let weeks = u16::try_from(total / 7).ok()?;
        let days = u8::try_from(total % 7).ok()?;
        Some(Self { weeks, days })
    }

    pub const fn total_days(self) -> u32 {
        self.weeks as u32 * 7 + self.days as u32
    }

    /// Fractional weeks, the form used for the `< N weeks` protocol criteria.
    pub fn as_weeks(self) -> f64 {
        f64::from(self.weeks) + f64::from(self.days) / 7.0
    }

    /// Gestational age at birth advanced by calendar days since birth.
    pub fn corrected(self, days_since_birth: u32) -> Option<Self> {
        self.total_days()
            .checked_add(days_since_birth)
            .and_then(Self::from_total_days)
    }

    pub fn label(self) -> String {
        format!("{}w{}d", self.weeks, self.days)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApgarScores {
    pub one_minute: u8,
    pub five_minute: u8,
}

/// Primitive clinical flags collected at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskFactorSet {
    pub respiratory_distress: bool,
    pub acidosis: bool,
    pub hypothermia: bool,
    pub hypoproteinemia: bool,
    pub hypoglycemia: bool,
    pub hemolysis: bool,
    /// Central nervous system abnormality, sepsis included.
    pub cns_abnormality: bool,
    pub maternal_diabetes: bool,
    pub maternal_thyroid_abnormality: bool,
    pub perinatal_stress: bool,
    pub exchange_transfusion: bool,
    pub intracranial_hemorrhage: bool,
    pub apnea_treatment: bool,
    pub aminoglycoside_exposure: bool,
    pub high_oxygen_exposure: bool,
}

/// Optional laboratory values compared against the bilirubin thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BilirubinMeasurements {
    /// Total serum bilirubin, mg/dL.
    pub total_mg_dl: Option<f64>,
    /// Unbound bilirubin, ug/dL.
    pub unbound_ug_dl: Option<f64>,
}

/// Everything the intake form hands over for one newborn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub birth_time: Option<NaiveTime>,
    #[serde(default)]
    pub birth_weight_g: Measurement,
    #[serde(default)]
    pub birth_length_cm: Measurement,
    #[serde(default)]
    pub head_circumference_cm: Measurement,
    pub sex: Sex,
    pub birth_order: BirthOrder,
    pub delivery_method: DeliveryMethod,
    pub gestational_age: GestationalAge,
    pub apgar: ApgarScores,
    #[serde(default)]
    pub risk_factors: RiskFactorSet,
    #[serde(default)]
    pub iv_line: bool,
    #[serde(default)]
    pub bilirubin: BilirubinMeasurements,
}

impl PatientRecord {
    pub fn birth_instant(&self) -> Option<NaiveDateTime> {
        match (self.birth_date, self.birth_time) {
            (Some(date), Some(time)) => Some(date.and_time(time)),
            _ => None,
        }
    }
}

/// Primitive flags plus the flags derived from them, computed once per evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub factors: RiskFactorSet,
    pub five_minute_apgar_at_most_3: bool,
    pub five_minute_apgar_below_7: bool,
    pub kernicterus_risk: bool,
    pub delivery_stress: bool,
}

impl RiskProfile {
    pub fn derive(record: &PatientRecord) -> Self {
        let factors = record.risk_factors;
        let five_minute = record.apgar.five_minute;
        let five_minute_apgar_at_most_3 = five_minute <= 3;

        let kernicterus_risk = five_minute_apgar_at_most_3
            || factors.respiratory_distress
            || factors.acidosis
            || factors.hypothermia
            || factors.hypoproteinemia
            || factors.hypoglycemia
            || factors.hemolysis
            || factors.cns_abnormality;

        let delivery_stress = factors.perinatal_stress || record.delivery_method.is_stressful();

        Self {
            factors,
            five_minute_apgar_at_most_3,
            five_minute_apgar_below_7: five_minute < 7,
            kernicterus_risk,
            delivery_stress,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_record() -> PatientRecord {
    PatientRecord {
        birth_date: NaiveDate::from_ymd_opt(2025, 3, 3),
        birth_time: NaiveTime::from_hms_opt(8, 30, 0),
        birth_weight_g: Measurement::Measured(3000.0),
        birth_length_cm: Measurement::Measured(49.0),
        head_circumference_cm: Measurement::Measured(33.5),
        sex: Sex::Female,
        birth_order: BirthOrder::First,
        delivery_method: DeliveryMethod::Vaginal,
        gestational_age: GestationalAge::new(39, 2),
        apgar: ApgarScores {
            one_minute: 8,
            five_minute: 9,
        },
        risk_factors: RiskFactorSet::default(),
        iv_line: false,
        bilirubin: BilirubinMeasurements::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measurement_serializes_as_nullable_number() {
        let json = serde_json::to_string(&Measurement::Measured(2480.0)).expect("serialize");
        assert_eq!(json, "2480.0");
        let json = serde_json::to_string(&Measurement::Unmeasured).expect("serialize");
        assert_eq!(json, "null");

        let parsed: Measurement = serde_json::from_str("null").expect("parse null");
        assert_eq!(parsed, Measurement::Unmeasured);
    }

    #[test]
    fn corrected_age_beyond_the_week_range_is_unknown() {
        let at_birth = GestationalAge::new(40, 0);
        assert_eq!(at_birth.corrected(500_000), None);
        assert_eq!(at_birth.corrected(u32::MAX), None);
        assert_eq!(
            GestationalAge::from_total_days(u32::from(u16::MAX) * 7 + 6),
            Some(GestationalAge::new(u16::MAX, 6))
        );
    }

    #[test]
    fn corrected_age_rolls_days_into_weeks() {
        let at_birth = GestationalAge::new(33, 5);
        let corrected = at_birth.corrected(10).expect("in range");
        assert_eq!(corrected, GestationalAge::new(35, 1));
        assert_eq!(corrected.label(), "35w1d");
        assert!((GestationalAge::new(36, 6).as_weeks() - (36.0 + 6.0 / 7.0)).abs() < 1e-12);
    }

    #[test]
    fn low_five_minute_apgar_implies_kernicterus_risk() {
        let mut record = sample_record();
        record.apgar.five_minute = 3;
        let profile = RiskProfile::derive(&record);
        assert!(profile.five_minute_apgar_at_most_3);
        assert!(profile.kernicterus_risk);

        record.apgar.five_minute = 4;
        let profile = RiskProfile::derive(&record);
        assert!(!profile.kernicterus_risk);
        assert!(profile.five_minute_apgar_below_7);
    }

    #[test]
    fn any_primitive_kernicterus_factor_sets_the_flag() {
        let mut record = sample_record();
        record.risk_factors.hemolysis = true;
        assert!(RiskProfile::derive(&record).kernicterus_risk);

        let mut record = sample_record();
        record.risk_factors.maternal_diabetes = true;
        assert!(!RiskProfile::derive(&record).kernicterus_risk);
    }

    #[test]
    fn delivery_stress_follows_delivery_method_or_flag() {
        let mut record = sample_record();
        assert!(!RiskProfile::derive(&record).delivery_stress);

        record.delivery_method = DeliveryMethod::EmergencyCesarean;
        assert!(RiskProfile::derive(&record).delivery_stress);

        record.delivery_method = DeliveryMethod::PlannedCesarean;
        record.risk_factors.perinatal_stress = true;
        assert!(RiskProfile::derive(&record).delivery_stress);
    }

    #[test]
    fn patient_record_accepts_sparse_json() {
        let json = r#"{
            "sex": "male",
            "birth_order": "subsequent",
            "delivery_method": "vaginal",
            "gestational_age": { "weeks": 38, "days": 0 },
            "apgar": { "one_minute": 9, "five_minute": 10 },
            "birth_weight_g": 3120
        }"#;
        let record: PatientRecord = serde_json::from_str(json).expect("record parses");
        assert_eq!(record.birth_weight_g, Measurement::Measured(3120.0));
        assert_eq!(record.birth_length_cm, Measurement::Unmeasured);
        assert!(record.birth_date.is_none());
        assert!(record.birth_instant().is_none());
        assert_eq!(record.risk_factors, RiskFactorSet::default());
    }
}
