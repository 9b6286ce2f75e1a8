//! One complete evaluation of a newborn at a given instant.

use super::bilirubin::{
    BilirubinTables, GestationalHourQuery, GestationalOutcome, ThresholdResolver,
    ThresholdTableError, WeightBandOutcome, WeightDayQuery,
};
use super::care::CarePlan;
use super::growth::{GrowthAssessment, GrowthResolver};
use super::guidance::{
    GuidanceCatalogue, GuidanceContext, GuidanceDecision, GuidanceDecisionView, GuidanceEngine,
};
use super::patient::{GestationalAge, Measurement, PatientRecord, RiskProfile};
use super::reference::ReferenceTable;
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

/// Input that cannot describe a real newborn. Missing data is never an error.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AssessmentError {
    #[error("evaluation instant {evaluated_at} precedes birth ({birth})")]
    EvaluatedBeforeBirth {
        birth: String,
        evaluated_at: NaiveDateTime,
    },
    #[error("gestational days must be 0-6, got {days}")]
    GestationalDaysOutOfRange { days: u8 },
    #[error("{minute}-minute Apgar score must be 0-10, got {score}")]
    ApgarOutOfRange { minute: u8, score: u8 },
    #[error("{field} must be a finite number")]
    NonFiniteMeasurement { field: &'static str },
}

/// Every immutable table an evaluation reads, built once at startup.
#[derive(Debug, Clone)]
pub struct ClinicalTables {
    pub reference: Option<ReferenceTable>,
    pub bilirubin: BilirubinTables,
    pub catalogue: GuidanceCatalogue,
}

impl ClinicalTables {
    pub fn standard(reference: Option<ReferenceTable>) -> Result<Self, ThresholdTableError> {
        Ok(Self {
            reference,
            bilirubin: BilirubinTables::standard()?,
            catalogue: GuidanceCatalogue::standard(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeSummary {
    pub days_old: Option<i64>,
    pub elapsed_hours: Option<i64>,
    pub corrected_age: Option<GestationalAge>,
    pub corrected_age_label: Option<String>,
}

impl AgeSummary {
    fn compute(
        record: &PatientRecord,
        evaluated_at: NaiveDateTime,
    ) -> Result<Self, AssessmentError> {
        let before_birth = |birth: String| AssessmentError::EvaluatedBeforeBirth {
            birth,
            evaluated_at,
        };

        let days_old = match record.birth_date {
            Some(date) => {
                let days = (evaluated_at.date() - date).num_days();
                if days < 0 {
                    return Err(before_birth(date.to_string()));
                }
                Some(days)
            }
            None => None,
        };

        let elapsed_hours = match record.birth_instant() {
            Some(birth) if birth > evaluated_at => return Err(before_birth(birth.to_string())),
            Some(birth) => Some((evaluated_at - birth).num_hours()),
            None => None,
        };

        let corrected_age = days_old
            .and_then(|days| u32::try_from(days).ok())
            .and_then(|days| record.gestational_age.corrected(days));

        Ok(Self {
            days_old,
            elapsed_hours,
            corrected_age,
            corrected_age_label: corrected_age.map(GestationalAge::label),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewbornAssessment {
    pub evaluated_at: NaiveDateTime,
    pub age: AgeSummary,
    pub risk: RiskProfile,
    pub growth: GrowthAssessment,
    pub phototherapy: WeightBandOutcome,
    pub gestational_thresholds: GestationalOutcome,
    pub guidance: Vec<GuidanceDecision>,
    pub care_plan: CarePlan,
}

impl NewbornAssessment {
    pub fn to_view(&self) -> AssessmentView<'_> {
        AssessmentView {
            evaluated_at: self.evaluated_at,
            age: &self.age,
            risk: &self.risk,
            growth: &self.growth,
            phototherapy: &self.phototherapy,
            gestational_thresholds: &self.gestational_thresholds,
            guidance: self.guidance.iter().map(GuidanceDecision::to_view).collect(),
            care_plan: &self.care_plan,
        }
    }
}

/// Response shape with guidance reasons rendered to text.
#[derive(Debug, Serialize)]
pub struct AssessmentView<'a> {
    pub evaluated_at: NaiveDateTime,
    pub age: &'a AgeSummary,
    pub risk: &'a RiskProfile,
    pub growth: &'a GrowthAssessment,
    pub phototherapy: &'a WeightBandOutcome,
    pub gestational_thresholds: &'a GestationalOutcome,
    pub guidance: Vec<GuidanceDecisionView>,
    pub care_plan: &'a CarePlan,
}

/// Stateless evaluator sharing read-only tables across calls.
#[derive(Debug, Clone)]
pub struct NewbornAssessor {
    tables: ClinicalTables,
    guidance: GuidanceEngine,
}

impl NewbornAssessor {
    pub fn new(tables: ClinicalTables) -> Self {
        let guidance = GuidanceEngine::new(tables.catalogue.clone());
        Self { tables, guidance }
    }

    pub fn tables(&self) -> &ClinicalTables {
        &self.tables
    }

    pub fn assess(
        &self,
        record: &PatientRecord,
        evaluated_at: NaiveDateTime,
    ) -> Result<NewbornAssessment, AssessmentError> {
        validate(record)?;
        let age = AgeSummary::compute(record, evaluated_at)?;
        let risk = RiskProfile::derive(record);

        let growth = GrowthResolver::new(self.tables.reference.as_ref()).assess(record);

        let bilirubin = &self.tables.bilirubin;
        let phototherapy = bilirubin.weight_bands.resolve(&WeightDayQuery {
            birth_weight_g: record.birth_weight_g,
            days_old: age.days_old,
            kernicterus_risk: risk.kernicterus_risk,
            measured_total_mg_dl: record.bilirubin.total_mg_dl,
        });

        let gestational_thresholds = bilirubin.gestational.resolve(&GestationalHourQuery {
            corrected_week: age.corrected_age.map(|age| age.weeks),
            elapsed_hours: age.elapsed_hours,
            measured_total_mg_dl: record.bilirubin.total_mg_dl,
            measured_unbound_ug_dl: record.bilirubin.unbound_ug_dl,
        });

        let context = GuidanceContext::from_record(record, risk, growth.weight.z_score());
        let guidance = self.guidance.evaluate(&context);

        let care_plan = CarePlan::build(
            record.birth_weight_g,
            record.birth_order,
            record.gestational_age,
        );

        debug!(
            days_old = age.days_old,
            elapsed_hours = age.elapsed_hours,
            size_class = growth.size_label,
            kernicterus_risk = risk.kernicterus_risk,
            applicable_protocols = guidance.iter().filter(|decision| decision.applicable).count(),
            "newborn assessment complete"
        );

        Ok(NewbornAssessment {
            evaluated_at,
            age,
            risk,
            growth,
            phototherapy,
            gestational_thresholds,
            guidance,
            care_plan,
        })
    }
}

fn validate(record: &PatientRecord) -> Result<(), AssessmentError> {
    if record.gestational_age.days > 6 {
        return Err(AssessmentError::GestationalDaysOutOfRange {
            days: record.gestational_age.days,
        });
    }

    for (minute, score) in [(1, record.apgar.one_minute), (5, record.apgar.five_minute)] {
        if score > 10 {
            return Err(AssessmentError::ApgarOutOfRange { minute, score });
        }
    }

    let measurements = [
        ("birth_weight_g", record.birth_weight_g),
        ("birth_length_cm", record.birth_length_cm),
        ("head_circumference_cm", record.head_circumference_cm),
        ("bilirubin.total_mg_dl", Measurement::from(record.bilirubin.total_mg_dl)),
        ("bilirubin.unbound_ug_dl", Measurement::from(record.bilirubin.unbound_ug_dl)),
    ];
    for (field, measurement) in measurements {
        if measurement.value().is_some_and(|value| !value.is_finite()) {
            return Err(AssessmentError::NonFiniteMeasurement { field });
        }
    }

    Ok(())
}
