//! Growth reference store: LMS curve parameters keyed by gestational week and day.
//!
//! The store is built once from parsed rows and never mutated afterwards, so it can be
//! shared between concurrent evaluations without locking.

mod parser;

use super::patient::{BirthOrder, Sex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Fatal errors raised while building the reference table.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceTableError {
    #[error("failed to read growth reference sheet: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid growth reference CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: expected {expected} columns, found {found}")]
    ShortRow {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: first data row has no gestational week to inherit")]
    MissingWeek { line: u64 },
    #[error("line {line}, column {column}: cannot parse '{value}'")]
    InvalidCell {
        line: u64,
        column: usize,
        value: String,
    },
    #[error("line {line}: gestational day {day} outside 0-6")]
    DayOutOfRange { line: u64, day: u8 },
    #[error("duplicate reference row for {week}w{day}d")]
    DuplicateKey { week: u16, day: u8 },
    #[error("reference row {week}w{day}d has unusable {curve} parameters (M must be > 0, S non-zero)")]
    InvalidParameters {
        week: u16,
        day: u8,
        curve: &'static str,
    },
    #[error("growth reference sheet contains no rows")]
    Empty,
}

/// Lambda / Mu / Sigma coefficients of one reference cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LmsParameters {
    pub l: f64,
    pub m: f64,
    pub s: f64,
}

impl LmsParameters {
    pub const fn new(l: f64, m: f64, s: f64) -> Self {
        Self { l, m, s }
    }

    fn is_usable(&self) -> bool {
        self.l.is_finite()
            && self.m.is_finite()
            && self.s.is_finite()
            && self.m > 0.0
            && self.s != 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthAxis {
    Weight,
    Length,
    HeadCircumference,
}

impl GrowthAxis {
    pub const fn ordered() -> [Self; 3] {
        [Self::Weight, Self::Length, Self::HeadCircumference]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Weight => "Birth weight",
            Self::Length => "Birth length",
            Self::HeadCircumference => "Head circumference",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::Weight => "g",
            Self::Length | Self::HeadCircumference => "cm",
        }
    }
}

/// Sex and birth-order specific curves of one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CohortCurves {
    pub weight: LmsParameters,
    pub head_circumference: LmsParameters,
}

/// Cohort order used by the sheet's column layout.
const COHORTS: [(Sex, BirthOrder); 4] = [
    (Sex::Male, BirthOrder::First),
    (Sex::Male, BirthOrder::Subsequent),
    (Sex::Female, BirthOrder::First),
    (Sex::Female, BirthOrder::Subsequent),
];

fn cohort_index(sex: Sex, order: BirthOrder) -> Option<usize> {
    COHORTS
        .iter()
        .position(|(cohort_sex, cohort_order)| *cohort_sex == sex && *cohort_order == order)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReferenceKey {
    pub week: u16,
    pub day: u8,
}

impl ReferenceKey {
    pub const fn new(week: u16, day: u8) -> Self {
        Self { week, day }
    }

    pub fn label(self) -> String {
        format!("{}w{}d", self.week, self.day)
    }
}

/// One tabulated (week, day) cell of the growth reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRow {
    pub key: ReferenceKey,
    pub length: LmsParameters,
    pub cohorts: [CohortCurves; 4],
}

impl ReferenceRow {
    /// Curve for a measurement axis. Sex-specific axes have no curve for `Sex::Unspecified`.
    pub fn parameters(
        &self,
        axis: GrowthAxis,
        sex: Sex,
        order: BirthOrder,
    ) -> Option<LmsParameters> {
        match axis {
            GrowthAxis::Length => Some(self.length),
            GrowthAxis::Weight => cohort_index(sex, order).map(|index| self.cohorts[index].weight),
            GrowthAxis::HeadCircumference => {
                cohort_index(sex, order).map(|index| self.cohorts[index].head_circumference)
            }
        }
    }

    fn validate(&self) -> Result<(), ReferenceTableError> {
        let ReferenceKey { week, day } = self.key;
        let invalid = |curve| ReferenceTableError::InvalidParameters { week, day, curve };

        if !self.length.is_usable() {
            return Err(invalid("length"));
        }
        for cohort in &self.cohorts {
            if !cohort.weight.is_usable() {
                return Err(invalid("weight"));
            }
            if !cohort.head_circumference.is_usable() {
                return Err(invalid("head circumference"));
            }
        }
        Ok(())
    }
}

/// Immutable lookup of reference rows. No interpolation between cells.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    rows: BTreeMap<ReferenceKey, ReferenceRow>,
}

impl ReferenceTable {
    pub fn from_rows<I>(rows: I) -> Result<Self, ReferenceTableError>
    where
        I: IntoIterator<Item = ReferenceRow>,
    {
        let mut indexed = BTreeMap::new();
        for row in rows {
            if row.key.day > 6 {
                return Err(ReferenceTableError::DayOutOfRange {
                    line: 0,
                    day: row.key.day,
                });
            }
            row.validate()?;
            let key = row.key;
            if indexed.insert(key, row).is_some() {
                return Err(ReferenceTableError::DuplicateKey {
                    week: key.week,
                    day: key.day,
                });
            }
        }

        if indexed.is_empty() {
            return Err(ReferenceTableError::Empty);
        }

        Ok(Self { rows: indexed })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ReferenceTableError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReferenceTableError> {
        let rows = parser::parse_rows(reader)?;
        let table = Self::from_rows(rows)?;
        tracing::info!(rows = table.len(), "growth reference table loaded");
        Ok(table)
    }

    /// Exact-key lookup.
    pub fn lookup(&self, week: u16, day: u8) -> Option<&ReferenceRow> {
        self.rows.get(&ReferenceKey::new(week, day))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = ReferenceKey> + '_ {
        self.rows.keys().copied()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn cohort(weight_m: f64, head_m: f64) -> CohortCurves {
        CohortCurves {
            weight: LmsParameters::new(0.3, weight_m, 0.12),
            head_circumference: LmsParameters::new(1.0, head_m, 0.04),
        }
    }

    pub(crate) fn row(week: u16, day: u8, weight_m: f64) -> ReferenceRow {
        ReferenceRow {
            key: ReferenceKey::new(week, day),
            length: LmsParameters::new(1.2, 30.0 + f64::from(week) / 2.0, 0.05),
            cohorts: [
                cohort(weight_m + 60.0, 33.0),
                cohort(weight_m + 30.0, 32.8),
                cohort(weight_m, 32.6),
                cohort(weight_m - 20.0, 32.4),
            ],
        }
    }

    /// Sparse table: every day of weeks 38-40, day 0 only for 30 and 41, nothing else.
    pub(crate) fn sparse_table() -> ReferenceTable {
        let mut rows = Vec::new();
        for week in 38..=40 {
            for day in 0..=6 {
                let median = 2800.0 + f64::from(week - 38) * 250.0 + f64::from(day) * 30.0;
                rows.push(row(week, day, median));
            }
        }
        rows.push(row(30, 0, 1400.0));
        rows.push(row(41, 0, 3600.0));
        ReferenceTable::from_rows(rows).expect("fixture table is valid")
    }
}
