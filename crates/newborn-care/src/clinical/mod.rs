//! Newborn clinical decision support: growth percentiles, bilirubin thresholds and
//! special-management protocols, evaluated against immutable reference tables.

pub mod assessment;
pub mod bilirubin;
pub mod care;
pub mod growth;
pub mod guidance;
pub mod patient;
pub mod reference;

pub use assessment::{
    AgeSummary, AssessmentError, AssessmentView, ClinicalTables, NewbornAssessment,
    NewbornAssessor,
};
pub use patient::{
    ApgarScores, BilirubinMeasurements, BirthOrder, DeliveryMethod, GestationalAge, Measurement,
    PatientRecord, RiskFactorSet, RiskProfile, Sex,
};
pub use reference::{ReferenceTable, ReferenceTableError};
