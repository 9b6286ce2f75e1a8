//! Special-management protocol rules.
//!
//! Every protocol in the catalogue yields a decision on every evaluation, applicable or not,
//! so the checklist can be audited line by line. Reasons are typed; text comes from the
//! `describe` formatters.

mod reasons;
mod rules;
mod schedule;

#[cfg(test)]
mod tests;

pub use reasons::{Criterion, CriterionOutcome, GuidanceNote, GuidanceReason};
pub use rules::{GuidanceCatalogue, ProtocolRule};
pub use schedule::{vitamin_k_schedule, AdministrationRoute, EventKind, ScheduledEvent};

use super::patient::{GestationalAge, Measurement, PatientRecord, RiskProfile};
use chrono::{NaiveDate, NaiveDateTime};
use rules::evaluate_criterion;
use serde::{Deserialize, Serialize};

/// Most negative reasons listed for a protocol that does not apply.
const MAX_NEGATIVE_REASONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    VitaminK,
    MassScreening,
    HypoglycemiaMonitoring,
    ThyroidFunction,
    HeadMri,
    HearingScreen,
    EyeExam,
}

impl Protocol {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::VitaminK,
            Self::MassScreening,
            Self::HypoglycemiaMonitoring,
            Self::ThyroidFunction,
            Self::HeadMri,
            Self::HearingScreen,
            Self::EyeExam,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::VitaminK => "Vitamin K prophylaxis",
            Self::MassScreening => "Newborn mass screening",
            Self::HypoglycemiaMonitoring => "Hypoglycemia monitoring",
            Self::ThyroidFunction => "Thyroid function test",
            Self::HeadMri => "Head MRI",
            Self::HearingScreen => "Hearing screen (AABR)",
            Self::EyeExam => "Eye examination",
        }
    }
}

/// The slice of an evaluation the protocol rules read.
#[derive(Debug, Clone, PartialEq)]
pub struct GuidanceContext {
    pub birth_date: Option<NaiveDate>,
    pub birth_instant: Option<NaiveDateTime>,
    pub gestational_age: GestationalAge,
    pub birth_weight_g: Measurement,
    /// Birth-weight z-score, when the growth reference could score it.
    pub weight_z: Option<f64>,
    pub risk: RiskProfile,
    pub iv_line: bool,
}

impl GuidanceContext {
    pub fn from_record(record: &PatientRecord, risk: RiskProfile, weight_z: Option<f64>) -> Self {
        Self {
            birth_date: record.birth_date,
            birth_instant: record.birth_instant(),
            gestational_age: record.gestational_age,
            birth_weight_g: record.birth_weight_g,
            weight_z,
            risk,
            iv_line: record.iv_line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidanceDecision {
    pub protocol: Protocol,
    pub applicable: bool,
    /// Matched criteria when applicable, otherwise the first unmatched ones.
    pub reasons: Vec<GuidanceReason>,
    #[serde(default)]
    pub schedule: Vec<ScheduledEvent>,
    #[serde(default)]
    pub notes: Vec<GuidanceNote>,
}

impl GuidanceDecision {
    pub fn summary(&self) -> String {
        let verdict = if self.applicable { "required" } else { "not required" };
        let reasons: Vec<String> = self.reasons.iter().map(GuidanceReason::describe).collect();
        format!("{}: {verdict} ({})", self.protocol.label(), reasons.join("; "))
    }

    pub fn to_view(&self) -> GuidanceDecisionView {
        GuidanceDecisionView {
            protocol: self.protocol,
            label: self.protocol.label(),
            applicable: self.applicable,
            reasons: self.reasons.iter().map(GuidanceReason::describe).collect(),
            schedule: self.schedule.iter().map(ScheduledEvent::describe).collect(),
            notes: self.notes.iter().map(|note| note.describe()).collect(),
        }
    }
}

/// Presentation form of a decision with all reason codes rendered as text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuidanceDecisionView {
    pub protocol: Protocol,
    pub label: &'static str,
    pub applicable: bool,
    pub reasons: Vec<String>,
    pub schedule: Vec<String>,
    pub notes: Vec<&'static str>,
}

/// Stateless evaluator over an immutable catalogue.
#[derive(Debug, Clone)]
pub struct GuidanceEngine {
    catalogue: GuidanceCatalogue,
}

impl GuidanceEngine {
    pub fn new(catalogue: GuidanceCatalogue) -> Self {
        Self { catalogue }
    }

    pub fn catalogue(&self) -> &GuidanceCatalogue {
        &self.catalogue
    }

    pub fn evaluate(&self, context: &GuidanceContext) -> Vec<GuidanceDecision> {
        self.catalogue
            .rules
            .iter()
            .map(|rule| decide(rule, context))
            .collect()
    }
}

fn decide(rule: &ProtocolRule, context: &GuidanceContext) -> GuidanceDecision {
    let outcomes: Vec<GuidanceReason> = rule
        .criteria
        .iter()
        .map(|criterion| GuidanceReason::new(*criterion, evaluate_criterion(*criterion, context)))
        .collect();

    let applicable = outcomes
        .iter()
        .any(|reason| reason.outcome == CriterionOutcome::Met);

    let reasons = if applicable {
        outcomes
            .into_iter()
            .filter(|reason| reason.outcome == CriterionOutcome::Met)
            .collect()
    } else {
        outcomes.into_iter().take(MAX_NEGATIVE_REASONS).collect()
    };

    let (schedule, notes) = schedule::plan(rule.protocol, applicable, context);

    GuidanceDecision {
        protocol: rule.protocol,
        applicable,
        reasons,
        schedule,
        notes,
    }
}
