use chrono::{NaiveDate, NaiveTime};

use crate::clinical::guidance::{
    GuidanceCatalogue, GuidanceContext, GuidanceDecision, GuidanceEngine, Protocol,
};
use crate::clinical::patient::{sample_record, GestationalAge, Measurement, RiskProfile};

pub(super) fn engine() -> GuidanceEngine {
    GuidanceEngine::new(GuidanceCatalogue::standard())
}

/// Healthy term baby: born Monday 2025-03-03 08:30, 39w2d, 3000 g.
pub(super) fn term_context() -> GuidanceContext {
    let record = sample_record();
    let risk = RiskProfile::derive(&record);
    GuidanceContext::from_record(&record, risk, Some(0.1))
}

pub(super) fn preterm_context(weeks: u16, days: u8, grams: f64) -> GuidanceContext {
    let mut context = term_context();
    context.gestational_age = GestationalAge::new(weeks, days);
    context.birth_weight_g = Measurement::Measured(grams);
    context.weight_z = Some(-0.3);
    context
}

pub(super) fn born_on(date: NaiveDate) -> GuidanceContext {
    let mut context = term_context();
    context.birth_date = Some(date);
    context.birth_instant = NaiveTime::from_hms_opt(10, 0, 0).map(|time| date.and_time(time));
    context
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn decision(decisions: &[GuidanceDecision], protocol: Protocol) -> &GuidanceDecision {
    decisions
        .iter()
        .find(|decision| decision.protocol == protocol)
        .expect("every protocol is emitted")
}
