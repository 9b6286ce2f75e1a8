use serde::{Deserialize, Serialize};

/// One condition a protocol rule tests. The rule applies when any of its criteria is met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "criterion", rename_all = "snake_case")]
pub enum Criterion {
    RoutineForAll,
    GestationBelow { weeks: u16 },
    WeightBelow { grams: u32 },
    WeightAtMost { grams: u32 },
    WeightAtOrAbove90thPercentile,
    MaternalDiabetes,
    DeliveryStress,
    FiveMinuteApgarBelow7,
    MaternalThyroidAbnormality,
    ExchangeTransfusion,
    IntracranialHemorrhage,
    ApneaTreatment,
    AminoglycosideExposure,
    HighOxygenExposure,
}

/// Result of testing one criterion. `Unknown` when the input it needs was not measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionOutcome {
    Met,
    NotMet,
    Unknown,
}

/// Typed reason attached to a decision; text is produced only by [`GuidanceReason::describe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuidanceReason {
    #[serde(flatten)]
    pub criterion: Criterion,
    pub outcome: CriterionOutcome,
}

impl GuidanceReason {
    pub const fn new(criterion: Criterion, outcome: CriterionOutcome) -> Self {
        Self { criterion, outcome }
    }

    pub fn describe(&self) -> String {
        use CriterionOutcome::{Met, NotMet, Unknown};

        match (self.criterion, self.outcome) {
            (Criterion::RoutineForAll, _) => "routine for every newborn".to_string(),
            (Criterion::GestationBelow { weeks }, Met) => {
                format!("gestational age below {weeks} weeks")
            }
            (Criterion::GestationBelow { weeks }, NotMet) => {
                format!("gestational age {weeks} weeks or more")
            }
            (Criterion::GestationBelow { .. }, Unknown) => "gestational age unknown".to_string(),
            (Criterion::WeightBelow { grams }, Met) => format!("birth weight below {grams} g"),
            (Criterion::WeightBelow { grams }, NotMet) => {
                format!("birth weight {grams} g or more")
            }
            (Criterion::WeightAtMost { grams }, Met) => format!("birth weight {grams} g or less"),
            (Criterion::WeightAtMost { grams }, NotMet) => {
                format!("birth weight above {grams} g")
            }
            (Criterion::WeightBelow { .. } | Criterion::WeightAtMost { .. }, Unknown) => {
                "birth weight not measured".to_string()
            }
            (Criterion::WeightAtOrAbove90thPercentile, Met) => {
                "birth weight at or above the 90th percentile".to_string()
            }
            (Criterion::WeightAtOrAbove90thPercentile, NotMet) => {
                "birth weight below the 90th percentile".to_string()
            }
            (Criterion::WeightAtOrAbove90thPercentile, Unknown) => {
                "birth weight percentile unavailable".to_string()
            }
            (flag, outcome) => {
                let label = flag_label(flag);
                match outcome {
                    Met => label.to_string(),
                    NotMet | Unknown => format!("no {label}"),
                }
            }
        }
    }
}

fn flag_label(criterion: Criterion) -> &'static str {
    match criterion {
        Criterion::MaternalDiabetes => "maternal diabetes",
        Criterion::DeliveryStress => "delivery stress",
        Criterion::FiveMinuteApgarBelow7 => "5-minute Apgar below 7",
        Criterion::MaternalThyroidAbnormality => "maternal thyroid abnormality",
        Criterion::ExchangeTransfusion => "exchange transfusion",
        Criterion::IntracranialHemorrhage => "intracranial hemorrhage",
        Criterion::ApneaTreatment => "apnea treatment",
        Criterion::AminoglycosideExposure => "aminoglycoside exposure",
        Criterion::HighOxygenExposure => "high-concentration oxygen exposure",
        _ => "clinical finding",
    }
}

/// Free-standing advice attached to a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidanceNote {
    PreDischargeRetest,
    MriAfterReaching1500g,
    SelfFundedHearingScreen,
    BirthDateUnknown,
}

impl GuidanceNote {
    pub const fn describe(self) -> &'static str {
        match self {
            Self::PreDischargeRetest => "repeat the screening sample before discharge (preterm)",
            Self::MriAfterReaching1500g => {
                "scan once weight reaches 1,500 g, at a corrected age of 37 to 44 weeks"
            }
            Self::SelfFundedHearingScreen => {
                "AABR hearing screen remains available as a self-funded option"
            }
            Self::BirthDateUnknown => "birth date unknown; calendar dates omitted",
        }
    }
}
