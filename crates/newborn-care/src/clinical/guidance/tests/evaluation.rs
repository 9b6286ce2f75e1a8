use super::common::*;
use crate::clinical::growth::Z_P90;
use crate::clinical::guidance::{
    Criterion, CriterionOutcome, GuidanceNote, GuidanceReason, Protocol,
};
use crate::clinical::patient::Measurement;

fn criteria(reasons: &[GuidanceReason]) -> Vec<Criterion> {
    reasons.iter().map(|reason| reason.criterion).collect()
}

#[test]
fn every_protocol_is_emitted_in_catalogue_order() {
    let engine = engine();
    let mut unmeasured = term_context();
    unmeasured.birth_weight_g = Measurement::Unmeasured;
    unmeasured.weight_z = None;

    for context in [term_context(), preterm_context(27, 3, 890.0), unmeasured] {
        let decisions = engine.evaluate(&context);
        let protocols: Vec<Protocol> = decisions.iter().map(|decision| decision.protocol).collect();
        assert_eq!(protocols, Protocol::ordered().to_vec());
        assert!(decisions.iter().all(|decision| !decision.reasons.is_empty()));
    }
}

#[test]
fn healthy_term_baby_needs_routine_protocols_only() {
    let decisions = engine().evaluate(&term_context());

    let applicable: Vec<Protocol> = decisions
        .iter()
        .filter(|decision| decision.applicable)
        .map(|decision| decision.protocol)
        .collect();
    assert_eq!(applicable, vec![Protocol::VitaminK, Protocol::MassScreening]);

    let glucose = decision(&decisions, Protocol::HypoglycemiaMonitoring);
    assert_eq!(
        criteria(&glucose.reasons),
        vec![
            Criterion::GestationBelow { weeks: 37 },
            Criterion::WeightBelow { grams: 2500 },
            Criterion::MaternalDiabetes,
        ]
    );
    assert!(glucose
        .reasons
        .iter()
        .all(|reason| reason.outcome == CriterionOutcome::NotMet));
    assert!(glucose.schedule.is_empty());

    let hearing = decision(&decisions, Protocol::HearingScreen);
    assert_eq!(hearing.notes, vec![GuidanceNote::SelfFundedHearingScreen]);
}

#[test]
fn preterm_low_weight_baby_lists_every_matched_reason() {
    let decisions = engine().evaluate(&preterm_context(33, 0, 1400.0));

    let glucose = decision(&decisions, Protocol::HypoglycemiaMonitoring);
    assert!(glucose.applicable);
    assert_eq!(
        criteria(&glucose.reasons),
        vec![
            Criterion::GestationBelow { weeks: 37 },
            Criterion::WeightBelow { grams: 2500 },
        ]
    );

    let mri = decision(&decisions, Protocol::HeadMri);
    assert!(mri.applicable);
    assert_eq!(
        criteria(&mri.reasons),
        vec![
            Criterion::GestationBelow { weeks: 34 },
            Criterion::WeightBelow { grams: 1500 },
        ]
    );

    let hearing = decision(&decisions, Protocol::HearingScreen);
    assert!(hearing.applicable);
    assert!(hearing.notes.is_empty());

    let eye = decision(&decisions, Protocol::EyeExam);
    assert!(eye.applicable);
    assert_eq!(
        criteria(&eye.reasons),
        vec![
            Criterion::GestationBelow { weeks: 34 },
            Criterion::WeightBelow { grams: 1800 },
        ]
    );
}

#[test]
fn hearing_and_eye_weight_limits_differ_at_1800_grams() {
    let decisions = engine().evaluate(&preterm_context(36, 0, 1800.0));

    assert!(decision(&decisions, Protocol::HearingScreen).applicable);
    assert!(!decision(&decisions, Protocol::EyeExam).applicable);
}

#[test]
fn large_for_dates_weight_triggers_glucose_monitoring() {
    let mut context = term_context();
    context.weight_z = Some(Z_P90);

    let decisions = engine().evaluate(&context);
    let glucose = decision(&decisions, Protocol::HypoglycemiaMonitoring);
    assert!(glucose.applicable);
    assert_eq!(
        criteria(&glucose.reasons),
        vec![Criterion::WeightAtOrAbove90thPercentile]
    );
}

#[test]
fn delivery_stress_and_low_apgar_trigger_glucose_monitoring() {
    let mut context = term_context();
    context.risk.delivery_stress = true;
    context.risk.five_minute_apgar_below_7 = true;

    let decisions = engine().evaluate(&context);
    let glucose = decision(&decisions, Protocol::HypoglycemiaMonitoring);
    assert_eq!(
        criteria(&glucose.reasons),
        vec![Criterion::DeliveryStress, Criterion::FiveMinuteApgarBelow7]
    );
}

#[test]
fn unmeasured_weight_is_reported_as_unknown() {
    let mut context = term_context();
    context.birth_weight_g = Measurement::Unmeasured;
    context.weight_z = None;

    let decisions = engine().evaluate(&context);
    let glucose = decision(&decisions, Protocol::HypoglycemiaMonitoring);
    assert!(!glucose.applicable);
    assert_eq!(
        glucose.reasons[1],
        GuidanceReason::new(Criterion::WeightBelow { grams: 2500 }, CriterionOutcome::Unknown)
    );
    assert!(glucose.summary().contains("birth weight not measured"));
}

#[test]
fn maternal_thyroid_abnormality_schedules_day_five_test() {
    let mut context = term_context();
    context.risk.factors.maternal_thyroid_abnormality = true;

    let decisions = engine().evaluate(&context);
    let thyroid = decision(&decisions, Protocol::ThyroidFunction);
    assert!(thyroid.applicable);
    assert_eq!(thyroid.schedule.len(), 1);
    assert_eq!(thyroid.schedule[0].day_of_life, Some(5));
    assert_eq!(thyroid.schedule[0].due_date, Some(date(2025, 3, 8)));
}

#[test]
fn view_renders_reason_text() {
    let decisions = engine().evaluate(&preterm_context(33, 0, 1400.0));
    let view = decision(&decisions, Protocol::HeadMri).to_view();

    assert_eq!(view.label, "Head MRI");
    assert_eq!(
        view.reasons,
        vec![
            "gestational age below 34 weeks".to_string(),
            "birth weight below 1500 g".to_string(),
        ]
    );
    assert_eq!(view.schedule.len(), 2);
}
