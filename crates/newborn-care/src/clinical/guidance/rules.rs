use super::reasons::{Criterion, CriterionOutcome};
use super::{GuidanceContext, Protocol};
use crate::clinical::growth::Z_P90;
use crate::clinical::patient::Measurement;
use serde::{Deserialize, Serialize};

/// A protocol and the criteria that make it applicable (logical OR).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolRule {
    pub protocol: Protocol,
    pub criteria: Vec<Criterion>,
}

impl ProtocolRule {
    fn new(protocol: Protocol, criteria: &[Criterion]) -> Self {
        Self {
            protocol,
            criteria: criteria.to_vec(),
        }
    }
}

/// Ordered protocol rules. Output order follows catalogue order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidanceCatalogue {
    pub rules: Vec<ProtocolRule>,
}

impl GuidanceCatalogue {
    pub fn standard() -> Self {
        use Criterion::*;

        Self {
            rules: vec![
                ProtocolRule::new(Protocol::VitaminK, &[RoutineForAll]),
                ProtocolRule::new(Protocol::MassScreening, &[RoutineForAll]),
                ProtocolRule::new(
                    Protocol::HypoglycemiaMonitoring,
                    &[
                        GestationBelow { weeks: 37 },
                        WeightBelow { grams: 2500 },
                        MaternalDiabetes,
                        WeightAtOrAbove90thPercentile,
                        DeliveryStress,
                        FiveMinuteApgarBelow7,
                    ],
                ),
                ProtocolRule::new(Protocol::ThyroidFunction, &[MaternalThyroidAbnormality]),
                ProtocolRule::new(
                    Protocol::HeadMri,
                    &[
                        GestationBelow { weeks: 34 },
                        WeightBelow { grams: 1500 },
                        ExchangeTransfusion,
                        IntracranialHemorrhage,
                    ],
                ),
                ProtocolRule::new(
                    Protocol::HearingScreen,
                    &[
                        GestationBelow { weeks: 35 },
                        WeightAtMost { grams: 1800 },
                        ExchangeTransfusion,
                        ApneaTreatment,
                        AminoglycosideExposure,
                        IntracranialHemorrhage,
                    ],
                ),
                ProtocolRule::new(
                    Protocol::EyeExam,
                    &[
                        GestationBelow { weeks: 34 },
                        WeightBelow { grams: 1800 },
                        HighOxygenExposure,
                    ],
                ),
            ],
        }
    }
}

impl Default for GuidanceCatalogue {
    fn default() -> Self {
        Self::standard()
    }
}

pub(crate) fn evaluate_criterion(
    criterion: Criterion,
    context: &GuidanceContext,
) -> CriterionOutcome {
    let flags = &context.risk.factors;

    match criterion {
        Criterion::RoutineForAll => CriterionOutcome::Met,
        Criterion::GestationBelow { weeks } => {
            outcome(context.gestational_age.as_weeks() < f64::from(weeks))
        }
        Criterion::WeightBelow { grams } => {
            compare_weight(context.birth_weight_g, |weight| weight < f64::from(grams))
        }
        Criterion::WeightAtMost { grams } => {
            compare_weight(context.birth_weight_g, |weight| weight <= f64::from(grams))
        }
        Criterion::WeightAtOrAbove90thPercentile => match context.weight_z {
            Some(z) => outcome(z >= Z_P90),
            None => CriterionOutcome::Unknown,
        },
        Criterion::MaternalDiabetes => outcome(flags.maternal_diabetes),
        Criterion::DeliveryStress => outcome(context.risk.delivery_stress),
        Criterion::FiveMinuteApgarBelow7 => outcome(context.risk.five_minute_apgar_below_7),
        Criterion::MaternalThyroidAbnormality => outcome(flags.maternal_thyroid_abnormality),
        Criterion::ExchangeTransfusion => outcome(flags.exchange_transfusion),
        Criterion::IntracranialHemorrhage => outcome(flags.intracranial_hemorrhage),
        Criterion::ApneaTreatment => outcome(flags.apnea_treatment),
        Criterion::AminoglycosideExposure => outcome(flags.aminoglycoside_exposure),
        Criterion::HighOxygenExposure => outcome(flags.high_oxygen_exposure),
    }
}

fn outcome(met: bool) -> CriterionOutcome {
    if met {
        CriterionOutcome::Met
    } else {
        CriterionOutcome::NotMet
    }
}

fn compare_weight(weight: Measurement, predicate: impl Fn(f64) -> bool) -> CriterionOutcome {
    match weight {
        Measurement::Measured(grams) if grams > 0.0 => outcome(predicate(grams)),
        _ => CriterionOutcome::Unknown,
    }
}
