//! Bilirubin treatment thresholds from two independently shaped reference standards.
//!
//! * [`WeightCategoryThresholds`]: birth-weight band by day of life, lowered one band for
//!   kernicterus risk.
//! * [`GestationalBucketThresholds`]: corrected gestational age band by postnatal hour
//!   bucket, with exchange-transfusion limits for total and unbound bilirubin.
//!
//! Both tables are immutable values built once and handed to whoever resolves against
//! them; neither model reads the other's output.

mod gestational;
mod weight_band;

pub use gestational::{
    BilirubinGrade, BilirubinTriple, GestationalBand, GestationalBandRow,
    GestationalBucketThresholds, GestationalHourQuery, GestationalOutcome,
    GestationalThreshold, HourBucket, NotApplicableReason,
};
pub use weight_band::{
    BilirubinAlert, DayThreshold, UndeterminedReason, WeightBand, WeightBandCurve,
    WeightBandOutcome, WeightBandThreshold, WeightCategoryThresholds, WeightDayQuery,
};

/// Shared shape of both threshold models: a pure lookup from a query to a resolution.
pub trait ThresholdResolver {
    type Query;
    type Resolution;

    fn resolve(&self, query: &Self::Query) -> Self::Resolution;
}

/// Raised once, when a threshold table is constructed from inconsistent data.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ThresholdTableError {
    #[error("expected {expected} bands, found {found}")]
    BandCount { expected: usize, found: usize },
    #[error("band {found} appears where {expected} belongs; bands must be contiguous and ordered")]
    BandOutOfOrder {
        expected: &'static str,
        found: &'static str,
    },
    #[error("band {band} has a non-positive or non-finite threshold")]
    InvalidValue { band: &'static str },
    #[error("band {band}: thresholds must satisfy low <= high <= exchange")]
    NonMonotonicTriple { band: &'static str },
}

/// Both threshold standards, constructed once at startup.
#[derive(Debug, Clone)]
pub struct BilirubinTables {
    pub weight_bands: WeightCategoryThresholds,
    pub gestational: GestationalBucketThresholds,
}

impl BilirubinTables {
    /// Validates both published tables; a bad edit to either fails here instead of per request.
    pub fn standard() -> Result<Self, ThresholdTableError> {
        Ok(Self {
            weight_bands: WeightCategoryThresholds::standard()?,
            gestational: GestationalBucketThresholds::standard()?,
        })
    }
}
