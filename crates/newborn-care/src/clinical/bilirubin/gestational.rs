use super::{ThresholdResolver, ThresholdTableError};
use serde::{Deserialize, Serialize};

/// Corrected gestational age bands of the hour-bucket standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GestationalBand {
    #[serde(rename = "weeks_22_to_25")]
    Weeks22To25,
    #[serde(rename = "weeks_26_to_27")]
    Weeks26To27,
    #[serde(rename = "weeks_28_to_29")]
    Weeks28To29,
    #[serde(rename = "weeks_30_to_31")]
    Weeks30To31,
    #[serde(rename = "weeks_32_to_34")]
    Weeks32To34,
    #[serde(rename = "weeks_35_and_over")]
    Weeks35AndOver,
}

impl GestationalBand {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Weeks22To25,
            Self::Weeks26To27,
            Self::Weeks28To29,
            Self::Weeks30To31,
            Self::Weeks32To34,
            Self::Weeks35AndOver,
        ]
    }

    /// `None` below 22 weeks, where the standard has no entry.
    pub const fn from_corrected_week(week: u16) -> Option<Self> {
        match week {
            0..=21 => None,
            22..=25 => Some(Self::Weeks22To25),
            26..=27 => Some(Self::Weeks26To27),
            28..=29 => Some(Self::Weeks28To29),
            30..=31 => Some(Self::Weeks30To31),
            32..=34 => Some(Self::Weeks32To34),
            _ => Some(Self::Weeks35AndOver),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Weeks22To25 => "22–25 weeks",
            Self::Weeks26To27 => "26–27 weeks",
            Self::Weeks28To29 => "28–29 weeks",
            Self::Weeks30To31 => "30–31 weeks",
            Self::Weeks32To34 => "32–34 weeks",
            Self::Weeks35AndOver => "≥35 weeks",
        }
    }
}

/// Postnatal hour buckets, each an upper-exclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HourBucket {
    #[serde(rename = "under_24")]
    Under24,
    #[serde(rename = "under_48")]
    Under48,
    #[serde(rename = "under_72")]
    Under72,
    #[serde(rename = "under_96")]
    Under96,
    #[serde(rename = "under_120")]
    Under120,
    #[serde(rename = "from_120")]
    From120,
}

impl HourBucket {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Under24,
            Self::Under48,
            Self::Under72,
            Self::Under96,
            Self::Under120,
            Self::From120,
        ]
    }

    pub const fn from_hours(hours: i64) -> Self {
        if hours < 24 {
            Self::Under24
        } else if hours < 48 {
            Self::Under48
        } else if hours < 72 {
            Self::Under72
        } else if hours < 96 {
            Self::Under96
        } else if hours < 120 {
            Self::Under120
        } else {
            Self::From120
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Under24 => 0,
            Self::Under48 => 1,
            Self::Under72 => 2,
            Self::Under96 => 3,
            Self::Under120 => 4,
            Self::From120 => 5,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Under24 => "<24 h",
            Self::Under48 => "<48 h",
            Self::Under72 => "<72 h",
            Self::Under96 => "<96 h",
            Self::Under120 => "<120 h",
            Self::From120 => "≥120 h",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BilirubinGrade {
    BelowLow,
    AtOrAboveLow,
    AtOrAboveHigh,
    AtOrAboveExchange,
}

impl BilirubinGrade {
    pub const fn label(self) -> &'static str {
        match self {
            Self::BelowLow => "below treatment thresholds",
            Self::AtOrAboveLow => "low-intensity phototherapy range",
            Self::AtOrAboveHigh => "high-intensity phototherapy range",
            Self::AtOrAboveExchange => "exchange transfusion range",
        }
    }
}

/// Low-intensity phototherapy, high-intensity phototherapy and exchange transfusion limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BilirubinTriple {
    pub low: f64,
    pub high: f64,
    pub exchange: f64,
}

impl BilirubinTriple {
    pub const fn new(low: f64, high: f64, exchange: f64) -> Self {
        Self {
            low,
            high,
            exchange,
        }
    }

    pub fn grade(&self, value: f64) -> BilirubinGrade {
        if value >= self.exchange {
            BilirubinGrade::AtOrAboveExchange
        } else if value >= self.high {
            BilirubinGrade::AtOrAboveHigh
        } else if value >= self.low {
            BilirubinGrade::AtOrAboveLow
        } else {
            BilirubinGrade::BelowLow
        }
    }

    fn is_usable(&self) -> bool {
        [self.low, self.high, self.exchange]
            .iter()
            .all(|value| value.is_finite() && *value > 0.0)
    }

    fn is_monotonic(&self) -> bool {
        self.low <= self.high && self.high <= self.exchange
    }
}

/// Total bilirubin (mg/dL) per hour bucket plus the unbound bilirubin (µg/dL) triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestationalBandRow {
    pub band: GestationalBand,
    pub by_bucket: [BilirubinTriple; 6],
    pub unbound: BilirubinTriple,
}

const fn t(low: f64, high: f64, exchange: f64) -> BilirubinTriple {
    BilirubinTriple::new(low, high, exchange)
}

const STANDARD_ROWS: [GestationalBandRow; 6] = [
    GestationalBandRow {
        band: GestationalBand::Weeks22To25,
        by_bucket: [
            t(5.0, 6.0, 8.0),
            t(5.0, 8.0, 10.0),
            t(5.0, 8.0, 12.0),
            t(6.0, 9.0, 13.0),
            t(7.0, 10.0, 13.0),
            t(8.0, 10.0, 13.0),
        ],
        unbound: t(0.4, 0.6, 0.8),
    },
    GestationalBandRow {
        band: GestationalBand::Weeks26To27,
        by_bucket: [
            t(5.0, 6.0, 8.0),
            t(5.0, 9.0, 10.0),
            t(6.0, 10.0, 12.0),
            t(8.0, 11.0, 14.0),
            t(9.0, 12.0, 15.0),
            t(10.0, 12.0, 15.0),
        ],
        unbound: t(0.4, 0.6, 0.8),
    },
    GestationalBandRow {
        band: GestationalBand::Weeks28To29,
        by_bucket: [
            t(6.0, 7.0, 9.0),
            t(7.0, 10.0, 12.0),
            t(8.0, 12.0, 14.0),
            t(10.0, 13.0, 16.0),
            t(11.0, 14.0, 18.0),
            t(12.0, 14.0, 18.0),
        ],
        unbound: t(0.5, 0.7, 0.9),
    },
    GestationalBandRow {
        band: GestationalBand::Weeks30To31,
        by_bucket: [
            t(7.0, 8.0, 10.0),
            t(8.0, 12.0, 14.0),
            t(10.0, 14.0, 16.0),
            t(12.0, 15.0, 18.0),
            t(13.0, 16.0, 20.0),
            t(14.0, 16.0, 20.0),
        ],
        unbound: t(0.6, 0.8, 1.0),
    },
    GestationalBandRow {
        band: GestationalBand::Weeks32To34,
        by_bucket: [
            t(8.0, 9.0, 10.0),
            t(10.0, 14.0, 16.0),
            t(12.0, 16.0, 18.0),
            t(14.0, 18.0, 20.0),
            t(15.0, 19.0, 22.0),
            t(16.0, 19.0, 22.0),
        ],
        unbound: t(0.7, 0.9, 1.2),
    },
    GestationalBandRow {
        band: GestationalBand::Weeks35AndOver,
        by_bucket: [
            t(10.0, 12.0, 16.0),
            t(12.0, 16.0, 18.0),
            t(14.0, 18.0, 20.0),
            t(16.0, 20.0, 22.0),
            t(17.0, 22.0, 25.0),
            t(18.0, 22.0, 25.0),
        ],
        unbound: t(0.8, 1.0, 1.5),
    },
];

/// Corrected-age band x postnatal-hour bucket threshold table.
#[derive(Debug, Clone, PartialEq)]
pub struct GestationalBucketThresholds {
    rows: Vec<GestationalBandRow>,
}

impl GestationalBucketThresholds {
    pub fn new(rows: Vec<GestationalBandRow>) -> Result<Self, ThresholdTableError> {
        let expected = GestationalBand::ordered();
        if rows.len() != expected.len() {
            return Err(ThresholdTableError::BandCount {
                expected: expected.len(),
                found: rows.len(),
            });
        }

        for (row, band) in rows.iter().zip(expected) {
            if row.band != band {
                return Err(ThresholdTableError::BandOutOfOrder {
                    expected: band.label(),
                    found: row.band.label(),
                });
            }
            let triples = row.by_bucket.iter().chain(std::iter::once(&row.unbound));
            for triple in triples {
                if !triple.is_usable() {
                    return Err(ThresholdTableError::InvalidValue { band: band.label() });
                }
                if !triple.is_monotonic() {
                    return Err(ThresholdTableError::NonMonotonicTriple { band: band.label() });
                }
            }
        }

        Ok(Self { rows })
    }

    pub fn standard() -> Result<Self, ThresholdTableError> {
        Self::new(STANDARD_ROWS.to_vec())
    }

    pub fn rows(&self) -> &[GestationalBandRow] {
        &self.rows
    }

    pub fn row(&self, band: GestationalBand) -> Option<&GestationalBandRow> {
        self.rows.iter().find(|row| row.band == band)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GestationalHourQuery {
    pub corrected_week: Option<u16>,
    pub elapsed_hours: Option<i64>,
    pub measured_total_mg_dl: Option<f64>,
    pub measured_unbound_ug_dl: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotApplicableReason {
    CorrectedAgeUnknown,
    ElapsedHoursUnknown,
    BelowTabulatedRange,
}

impl NotApplicableReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::CorrectedAgeUnknown => "corrected gestational age unknown",
            Self::ElapsedHoursUnknown => "hours since birth unknown",
            Self::BelowTabulatedRange => "corrected age below 22 weeks is not tabulated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GestationalThreshold {
    pub band: GestationalBand,
    pub band_label: &'static str,
    pub bucket: HourBucket,
    pub bucket_label: &'static str,
    pub total_mg_dl: BilirubinTriple,
    pub unbound_ug_dl: BilirubinTriple,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_grade: Option<BilirubinGrade>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unbound_grade: Option<BilirubinGrade>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GestationalOutcome {
    NotApplicable { reason: NotApplicableReason },
    Resolved(GestationalThreshold),
}

impl GestationalOutcome {
    pub fn resolved(&self) -> Option<&GestationalThreshold> {
        match self {
            Self::Resolved(threshold) => Some(threshold),
            Self::NotApplicable { .. } => None,
        }
    }
}

impl ThresholdResolver for GestationalBucketThresholds {
    type Query = GestationalHourQuery;
    type Resolution = GestationalOutcome;

    fn resolve(&self, query: &GestationalHourQuery) -> GestationalOutcome {
        let not_applicable = |reason| GestationalOutcome::NotApplicable { reason };

        let Some(week) = query.corrected_week else {
            return not_applicable(NotApplicableReason::CorrectedAgeUnknown);
        };
        let Some(hours) = query.elapsed_hours.filter(|hours| *hours >= 0) else {
            return not_applicable(NotApplicableReason::ElapsedHoursUnknown);
        };
        let Some(row) = GestationalBand::from_corrected_week(week).and_then(|band| self.row(band))
        else {
            return not_applicable(NotApplicableReason::BelowTabulatedRange);
        };

        let bucket = HourBucket::from_hours(hours);
        let total = row.by_bucket[bucket.index()];

        GestationalOutcome::Resolved(GestationalThreshold {
            band: row.band,
            band_label: row.band.label(),
            bucket,
            bucket_label: bucket.label(),
            total_mg_dl: total,
            unbound_ug_dl: row.unbound,
            total_grade: query.measured_total_mg_dl.map(|value| total.grade(value)),
            unbound_grade: query.measured_unbound_ug_dl.map(|value| row.unbound.grade(value)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard_rows() -> GestationalBucketThresholds {
        GestationalBucketThresholds::standard().expect("standard rows validate")
    }

    fn query(week: u16, hours: i64) -> GestationalHourQuery {
        GestationalHourQuery {
            corrected_week: Some(week),
            elapsed_hours: Some(hours),
            measured_total_mg_dl: None,
            measured_unbound_ug_dl: None,
        }
    }

    fn resolve(query: &GestationalHourQuery) -> GestationalThreshold {
        match standard_rows().resolve(query) {
            GestationalOutcome::Resolved(threshold) => threshold,
            other => panic!("expected resolved threshold, got {other:?}"),
        }
    }

    #[test]
    fn term_infant_at_thirty_hours() {
        let resolved = resolve(&query(39, 30));
        assert_eq!(resolved.band_label, "≥35 weeks");
        assert_eq!(resolved.bucket, HourBucket::Under48);
        assert_eq!(resolved.total_mg_dl, BilirubinTriple::new(12.0, 16.0, 18.0));
        assert_eq!(resolved.unbound_ug_dl, BilirubinTriple::new(0.8, 1.0, 1.5));
    }

    #[test]
    fn bucket_boundaries_are_upper_exclusive() {
        assert_eq!(HourBucket::from_hours(0), HourBucket::Under24);
        assert_eq!(HourBucket::from_hours(23), HourBucket::Under24);
        assert_eq!(HourBucket::from_hours(24), HourBucket::Under48);
        assert_eq!(HourBucket::from_hours(119), HourBucket::Under120);
        assert_eq!(HourBucket::from_hours(120), HourBucket::From120);
        assert_eq!(HourBucket::from_hours(900), HourBucket::From120);
    }

    #[test]
    fn band_boundaries_follow_corrected_week() {
        assert_eq!(GestationalBand::from_corrected_week(21), None);
        assert_eq!(
            GestationalBand::from_corrected_week(22),
            Some(GestationalBand::Weeks22To25)
        );
        assert_eq!(
            GestationalBand::from_corrected_week(27),
            Some(GestationalBand::Weeks26To27)
        );
        assert_eq!(
            GestationalBand::from_corrected_week(34),
            Some(GestationalBand::Weeks32To34)
        );
        assert_eq!(
            GestationalBand::from_corrected_week(35),
            Some(GestationalBand::Weeks35AndOver)
        );
    }

    #[test]
    fn extremely_preterm_row_and_unbound_limits() {
        let resolved = resolve(&query(28, 100));
        assert_eq!(resolved.band, GestationalBand::Weeks28To29);
        assert_eq!(resolved.total_mg_dl, BilirubinTriple::new(11.0, 14.0, 18.0));
        assert_eq!(resolved.unbound_ug_dl, BilirubinTriple::new(0.5, 0.7, 0.9));
    }

    #[test]
    fn below_twenty_two_weeks_is_not_applicable() {
        let outcome = standard_rows().resolve(&query(21, 10));
        assert_eq!(
            outcome,
            GestationalOutcome::NotApplicable {
                reason: NotApplicableReason::BelowTabulatedRange
            }
        );
    }

    #[test]
    fn missing_inputs_are_reported() {
        let table = standard_rows();
        let mut q = query(36, 10);
        q.elapsed_hours = None;
        assert_eq!(
            table.resolve(&q),
            GestationalOutcome::NotApplicable {
                reason: NotApplicableReason::ElapsedHoursUnknown
            }
        );
        q.corrected_week = None;
        assert_eq!(
            table.resolve(&q),
            GestationalOutcome::NotApplicable {
                reason: NotApplicableReason::CorrectedAgeUnknown
            }
        );
    }

    #[test]
    fn measurements_are_graded() {
        let mut q = query(39, 30);
        q.measured_total_mg_dl = Some(16.0);
        q.measured_unbound_ug_dl = Some(0.5);
        let resolved = resolve(&q);
        assert_eq!(resolved.total_grade, Some(BilirubinGrade::AtOrAboveHigh));
        assert_eq!(resolved.unbound_grade, Some(BilirubinGrade::BelowLow));

        let triple = BilirubinTriple::new(12.0, 16.0, 18.0);
        assert_eq!(triple.grade(11.9), BilirubinGrade::BelowLow);
        assert_eq!(triple.grade(12.0), BilirubinGrade::AtOrAboveLow);
        assert_eq!(triple.grade(18.0), BilirubinGrade::AtOrAboveExchange);
    }

    #[test]
    fn standard_rows_pass_validation() {
        let rows = standard_rows().rows().to_vec();
        assert!(GestationalBucketThresholds::new(rows).is_ok());
    }

    #[test]
    fn validation_rejects_inverted_triples() {
        let mut rows = standard_rows().rows().to_vec();
        rows[3].by_bucket[2] = BilirubinTriple::new(14.0, 10.0, 16.0);
        assert_eq!(
            GestationalBucketThresholds::new(rows),
            Err(ThresholdTableError::NonMonotonicTriple {
                band: "30–31 weeks"
            })
        );
    }

    #[test]
    fn bands_and_buckets_serialize_with_separated_numbers() {
        let band = serde_json::to_string(&GestationalBand::Weeks30To31).expect("serialize");
        assert_eq!(band, "\"weeks_30_to_31\"");
        let band = serde_json::to_string(&GestationalBand::Weeks35AndOver).expect("serialize");
        assert_eq!(band, "\"weeks_35_and_over\"");

        let buckets: Vec<String> = HourBucket::ordered()
            .iter()
            .map(|bucket| serde_json::to_string(bucket).expect("serialize"))
            .collect();
        assert_eq!(
            buckets,
            [
                "\"under_24\"",
                "\"under_48\"",
                "\"under_72\"",
                "\"under_96\"",
                "\"under_120\"",
                "\"from_120\"",
            ]
        );
    }
}
