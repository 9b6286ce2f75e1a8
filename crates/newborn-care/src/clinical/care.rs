//! Nursing management plan keyed on birth-weight class, birth order and prematurity.

use super::patient::{BirthOrder, GestationalAge, Measurement};
use serde::{Deserialize, Serialize};

/// Routine observations recorded for every newborn, every day.
pub const DAILY_CHECKLIST: [&str; 9] = [
    "Temperature (2-4 times a day)",
    "Weight (daily)",
    "Feeding log (frequency and volume)",
    "Output log (frequency and appearance)",
    "Jaundice observation",
    "Umbilical cord check (signs of infection)",
    "Skin condition",
    "Breathing pattern",
    "Sucking strength",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BirthWeightClass {
    ExtremelyLow,
    VeryLow,
    Low,
    Normal,
}

impl BirthWeightClass {
    /// `None` for a missing or non-positive weight.
    pub fn from_measurement(weight: Measurement) -> Option<Self> {
        let grams = weight.value().filter(|grams| *grams > 0.0)?;
        Some(if grams < 1000.0 {
            Self::ExtremelyLow
        } else if grams < 1500.0 {
            Self::VeryLow
        } else if grams < 2500.0 {
            Self::Low
        } else {
            Self::Normal
        })
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ExtremelyLow => "Extremely low birth weight (ELBW)",
            Self::VeryLow => "Very low birth weight (VLBW)",
            Self::Low => "Low birth weight (LBW)",
            Self::Normal => "Normal birth weight",
        }
    }

    pub const fn care_points(self) -> [&'static str; 5] {
        match self {
            Self::ExtremelyLow => [
                "Thermoregulation: strict temperature control in an incubator",
                "Respiration: consider ventilator or CPAP support",
                "Nutrition: start parenteral nutrition early",
                "Infection control: strict aseptic technique",
                "Neurological monitoring: cranial ultrasound for IVH",
            ],
            Self::VeryLow => [
                "Thermoregulation: incubator or radiant warmer",
                "Respiration: close observation of breathing",
                "Nutrition: consider enteral feeding as early as possible",
                "Jaundice: consider early phototherapy",
                "Infection prevention: hand hygiene and a clean environment",
            ],
            Self::Low => [
                "Thermoregulation: keep warm with hat and socks",
                "Nutrition: feed every 3 hours, supplement when needed",
                "Weight gain: weigh daily",
                "Jaundice screening: measure at 24-48 hours",
                "Hypoglycemia screening: check blood glucose as needed",
            ],
            Self::Normal => [
                "Feeding: every 3-4 hours (8-12 times a day)",
                "Weight: physiological loss of 5-10% by day 3-4",
                "Output: first stool within 24 hours, first urine within 48 hours",
                "Jaundice: physiological peak on day 2-3",
                "Vitamin K: first oral dose within 24 hours",
            ],
        }
    }

    pub const fn warning(self) -> Option<&'static str> {
        match self {
            Self::ExtremelyLow => Some("Specialist NICU care required"),
            Self::VeryLow => Some("NICU care recommended"),
            Self::Low | Self::Normal => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarePlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_class: Option<BirthWeightClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_class_label: Option<&'static str>,
    pub recommendations: Vec<&'static str>,
    pub warnings: Vec<&'static str>,
    pub daily_checklist: [&'static str; 9],
}

impl CarePlan {
    pub fn build(weight: Measurement, order: BirthOrder, gestation: GestationalAge) -> Self {
        let weight_class = BirthWeightClass::from_measurement(weight);
        let mut recommendations = Vec::new();
        let mut warnings = Vec::new();

        if let Some(class) = weight_class {
            warnings.extend(class.warning());
            recommendations.extend(class.care_points());
        }

        recommendations.push(match order {
            BirthOrder::First => {
                "First child: coach the parents carefully on feeding position and nappy changes"
            }
            BirthOrder::Subsequent => {
                "Subsequent child: build on previous experience while watching this baby's own needs"
            }
        });

        if gestation.weeks < 37 {
            warnings.push(
                "Preterm: pay particular attention to breathing, temperature and nutrition",
            );
            recommendations.push(
                "Preterm screening: consider ROP (retinopathy of prematurity) screening",
            );
        }

        Self {
            weight_class,
            weight_class_label: weight_class.map(BirthWeightClass::label),
            recommendations,
            warnings,
            daily_checklist: DAILY_CHECKLIST,
        }
    }
}
