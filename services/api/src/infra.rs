use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::ValueEnum;
use metrics_exporter_prometheus::PrometheusHandle;
use newborn_care::clinical::{
    BirthOrder, ClinicalTables, DeliveryMethod, NewbornAssessor, ReferenceTable, RiskFactorSet,
    Sex,
};
use newborn_care::error::AppError;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) assessor: Arc<NewbornAssessor>,
}

/// Build the assessor once; a malformed reference sheet aborts startup.
pub(crate) fn load_assessor(reference_csv: Option<&Path>) -> Result<NewbornAssessor, AppError> {
    let reference = match reference_csv {
        Some(path) => {
            let table = ReferenceTable::from_path(path)?;
            info!(path = %path.display(), rows = table.len(), "growth reference ready");
            Some(table)
        }
        None => {
            warn!("no growth reference configured; percentiles will be unavailable");
            None
        }
    };

    Ok(NewbornAssessor::new(ClinicalTables::standard(reference)?))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|err| format!("failed to parse '{raw}' as HH:MM[:SS] ({err})"))
}

pub(crate) fn parse_instant(raw: &str) -> Result<NaiveDateTime, String> {
    let trimmed = raw.trim();
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| format!("failed to parse '{raw}' as YYYY-MM-DDTHH:MM[:SS]"))
}

pub(crate) fn deserialize_optional_instant<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_instant(&value).map_err(serde::de::Error::custom))
        .transpose()
}

pub(crate) fn parse_sex(raw: &str) -> Result<Sex, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "male" | "m" => Ok(Sex::Male),
        "female" | "f" => Ok(Sex::Female),
        "unspecified" | "other" => Ok(Sex::Unspecified),
        other => Err(format!("unknown sex '{other}' (male, female, unspecified)")),
    }
}

pub(crate) fn parse_birth_order(raw: &str) -> Result<BirthOrder, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "first" => Ok(BirthOrder::First),
        "subsequent" => Ok(BirthOrder::Subsequent),
        other => Err(format!("unknown birth order '{other}' (first, subsequent)")),
    }
}

pub(crate) fn parse_delivery(raw: &str) -> Result<DeliveryMethod, String> {
    match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
        "vaginal" => Ok(DeliveryMethod::Vaginal),
        "planned-cesarean" => Ok(DeliveryMethod::PlannedCesarean),
        "emergency-cesarean" => Ok(DeliveryMethod::EmergencyCesarean),
        "instrumental" => Ok(DeliveryMethod::Instrumental),
        "other" => Ok(DeliveryMethod::Other),
        other => Err(format!(
            "unknown delivery method '{other}' (vaginal, planned-cesarean, emergency-cesarean, instrumental, other)"
        )),
    }
}

/// Intake risk factors as command-line values, e.g. `--risk maternal-diabetes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum RiskFlag {
    RespiratoryDistress,
    Acidosis,
    Hypothermia,
    Hypoproteinemia,
    Hypoglycemia,
    Hemolysis,
    CnsAbnormality,
    MaternalDiabetes,
    MaternalThyroidAbnormality,
    PerinatalStress,
    ExchangeTransfusion,
    IntracranialHemorrhage,
    ApneaTreatment,
    AminoglycosideExposure,
    HighOxygenExposure,
}

impl RiskFlag {
    fn field(self, set: &mut RiskFactorSet) -> &mut bool {
        match self {
            Self::RespiratoryDistress => &mut set.respiratory_distress,
            Self::Acidosis => &mut set.acidosis,
            Self::Hypothermia => &mut set.hypothermia,
            Self::Hypoproteinemia => &mut set.hypoproteinemia,
            Self::Hypoglycemia => &mut set.hypoglycemia,
            Self::Hemolysis => &mut set.hemolysis,
            Self::CnsAbnormality => &mut set.cns_abnormality,
            Self::MaternalDiabetes => &mut set.maternal_diabetes,
            Self::MaternalThyroidAbnormality => &mut set.maternal_thyroid_abnormality,
            Self::PerinatalStress => &mut set.perinatal_stress,
            Self::ExchangeTransfusion => &mut set.exchange_transfusion,
            Self::IntracranialHemorrhage => &mut set.intracranial_hemorrhage,
            Self::ApneaTreatment => &mut set.apnea_treatment,
            Self::AminoglycosideExposure => &mut set.aminoglycoside_exposure,
            Self::HighOxygenExposure => &mut set.high_oxygen_exposure,
        }
    }
}

pub(crate) fn risk_factors(flags: &[RiskFlag]) -> RiskFactorSet {
    let mut set = RiskFactorSet::default();
    for flag in flags {
        *flag.field(&mut set) = true;
    }
    set
}
