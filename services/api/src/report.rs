use crate::infra::{
    load_assessor, parse_birth_order, parse_date, parse_delivery, parse_instant, parse_sex,
    parse_time, risk_factors, RiskFlag,
};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::Args;
use newborn_care::clinical::bilirubin::{
    BilirubinTables, BilirubinTriple, DayThreshold, GestationalOutcome, HourBucket,
    WeightBandOutcome,
};
use newborn_care::clinical::growth::{AxisAssessment, ReferenceSource};
use newborn_care::clinical::reference::GrowthAxis;
use newborn_care::clinical::{
    ApgarScores, BilirubinMeasurements, BirthOrder, DeliveryMethod, GestationalAge, Measurement,
    NewbornAssessment, PatientRecord, Sex,
};
use newborn_care::config::AppConfig;
use newborn_care::error::AppError;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// Birth date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) birth_date: Option<NaiveDate>,
    /// Birth time (HH:MM or HH:MM:SS)
    #[arg(long, value_parser = parse_time)]
    pub(crate) birth_time: Option<NaiveTime>,
    /// Birth weight in grams; omit when not measured
    #[arg(long)]
    pub(crate) weight: Option<f64>,
    /// Birth length in cm
    #[arg(long)]
    pub(crate) length: Option<f64>,
    /// Head circumference in cm
    #[arg(long)]
    pub(crate) head: Option<f64>,
    /// male, female or unspecified
    #[arg(long, value_parser = parse_sex, default_value = "unspecified")]
    pub(crate) sex: Sex,
    /// first or subsequent
    #[arg(long, value_parser = parse_birth_order, default_value = "first")]
    pub(crate) birth_order: BirthOrder,
    /// vaginal, planned-cesarean, emergency-cesarean, instrumental or other
    #[arg(long, value_parser = parse_delivery, default_value = "vaginal")]
    pub(crate) delivery: DeliveryMethod,
    /// Completed gestational weeks at birth
    #[arg(long)]
    pub(crate) ga_weeks: u16,
    /// Additional gestational days (0-6)
    #[arg(long, default_value_t = 0)]
    pub(crate) ga_days: u8,
    #[arg(long = "apgar-1", default_value_t = 9)]
    pub(crate) apgar_one: u8,
    #[arg(long = "apgar-5", default_value_t = 9)]
    pub(crate) apgar_five: u8,
    /// Risk factor flag, repeatable (e.g. --risk hemolysis --risk maternal-diabetes)
    #[arg(long = "risk", value_enum)]
    pub(crate) risks: Vec<RiskFlag>,
    /// Infant has intravenous access
    #[arg(long)]
    pub(crate) iv_line: bool,
    /// Measured total serum bilirubin (mg/dL)
    #[arg(long)]
    pub(crate) bilirubin_total: Option<f64>,
    /// Measured unbound bilirubin (ug/dL)
    #[arg(long)]
    pub(crate) bilirubin_unbound: Option<f64>,
    /// Evaluation instant (YYYY-MM-DDTHH:MM[:SS]); defaults to now
    #[arg(long, value_parser = parse_instant)]
    pub(crate) evaluated_at: Option<NaiveDateTime>,
    /// Growth reference CSV (overrides NEWBORN_REFERENCE_TABLE)
    #[arg(long)]
    pub(crate) reference_csv: Option<PathBuf>,
    /// Print the assessment as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

impl AssessArgs {
    fn record(&self) -> PatientRecord {
        PatientRecord {
            birth_date: self.birth_date,
            birth_time: self.birth_time,
            birth_weight_g: Measurement::from(self.weight),
            birth_length_cm: Measurement::from(self.length),
            head_circumference_cm: Measurement::from(self.head),
            sex: self.sex,
            birth_order: self.birth_order,
            delivery_method: self.delivery,
            gestational_age: GestationalAge::new(self.ga_weeks, self.ga_days),
            apgar: ApgarScores {
                one_minute: self.apgar_one,
                five_minute: self.apgar_five,
            },
            risk_factors: risk_factors(&self.risks),
            iv_line: self.iv_line,
            bilirubin: BilirubinMeasurements {
                total_mg_dl: self.bilirubin_total,
                unbound_ug_dl: self.bilirubin_unbound,
            },
        }
    }
}

pub(crate) fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let reference_csv = match args.reference_csv.clone() {
        Some(path) => Some(path),
        None => AppConfig::load()?.reference.table_path,
    };
    let assessor = load_assessor(reference_csv.as_deref())?;

    let evaluated_at = args
        .evaluated_at
        .unwrap_or_else(|| Local::now().naive_local());
    let assessment = assessor.assess(&args.record(), evaluated_at)?;

    if args.json {
        match serde_json::to_string_pretty(&assessment.to_view()) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Assessment payload unavailable: {err}"),
        }
    } else {
        println!("{}", render_assessment(&assessment));
    }

    Ok(())
}

pub(crate) fn run_tables() -> Result<(), AppError> {
    println!("{}", render_tables(&BilirubinTables::standard()?));
    Ok(())
}

pub(crate) fn render_assessment(assessment: &NewbornAssessment) -> String {
    let mut lines = vec![format!(
        "Newborn assessment ({})",
        assessment.evaluated_at.format("%Y-%m-%d %H:%M")
    )];

    let age = &assessment.age;
    lines.push(format!(
        "Age: day {} | {} | corrected {}",
        age.days_old
            .map(|days| days.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        age.elapsed_hours
            .map(|hours| format!("{hours} h"))
            .unwrap_or_else(|| "hours unknown".to_string()),
        age.corrected_age_label.as_deref().unwrap_or("unknown"),
    ));

    lines.push(String::new());
    let growth = &assessment.growth;
    lines.push(match &growth.reference {
        ReferenceSource::Resolved {
            requested,
            used,
            fallback: true,
        } => format!(
            "Growth (reference {} used for {})",
            used.label(),
            requested.label()
        ),
        ReferenceSource::Resolved { used, .. } => format!("Growth (reference {})", used.label()),
        ReferenceSource::NoReferenceAvailable => "Growth (no reference available)".to_string(),
    });
    for (axis, result) in [
        (GrowthAxis::Weight, &growth.weight),
        (GrowthAxis::Length, &growth.length),
        (GrowthAxis::HeadCircumference, &growth.head_circumference),
    ] {
        lines.push(render_axis(axis, result));
    }
    lines.push(format!("  Size for dates: {}", growth.size_label));

    lines.push(String::new());
    lines.push("Phototherapy threshold by birth weight".to_string());
    lines.extend(render_weight_band(&assessment.phototherapy));

    lines.push("Thresholds by corrected age and hours".to_string());
    lines.extend(render_gestational(&assessment.gestational_thresholds));

    lines.push(String::new());
    lines.push("Special management".to_string());
    for decision in &assessment.guidance {
        let view = decision.to_view();
        let mark = if view.applicable { "x" } else { " " };
        lines.push(format!("  [{mark}] {}: {}", view.label, view.reasons.join("; ")));
        lines.extend(view.schedule.iter().map(|event| format!("        - {event}")));
        lines.extend(view.notes.iter().map(|note| format!("        * {note}")));
    }

    lines.push(String::new());
    let plan = &assessment.care_plan;
    lines.push(format!(
        "Care plan: {}",
        plan.weight_class_label.unwrap_or("birth weight not measured")
    ));
    lines.extend(plan.warnings.iter().map(|warning| format!("  ! {warning}")));
    lines.extend(plan.recommendations.iter().map(|point| format!("  - {point}")));
    lines.push("Daily checklist:".to_string());
    lines.extend(plan.daily_checklist.iter().map(|item| format!("  [ ] {item}")));

    lines.join("\n")
}

fn render_axis(axis: GrowthAxis, result: &AxisAssessment) -> String {
    match result {
        AxisAssessment::Scored(score) => {
            let boundary = |value: Option<f64>| {
                value
                    .map(|value| format!("{value:.1}"))
                    .unwrap_or_else(|| "n/a".to_string())
            };
            format!(
                "  - {}: {} {} -> {} [-2SD {} | p10 {} | p90 {}]",
                axis.label(),
                score.value,
                axis.unit(),
                score.display,
                boundary(score.minus_two_sd_value),
                boundary(score.p10_value),
                boundary(score.p90_value),
            )
        }
        other => format!("  - {}: {}", axis.label(), other.display()),
    }
}

fn render_weight_band(outcome: &WeightBandOutcome) -> Vec<String> {
    let threshold = match outcome {
        WeightBandOutcome::Undetermined { reason } => {
            return vec![format!("  undetermined: {}", reason.label())];
        }
        WeightBandOutcome::Resolved(threshold) => threshold,
    };

    let mut lines = Vec::new();
    if threshold.adjusted {
        lines.push(format!(
            "  band {} (lowered from {} for kernicterus risk)",
            threshold.band_label, threshold.original_band_label
        ));
    } else {
        lines.push(format!("  band {}", threshold.band_label));
    }

    lines.push(match threshold.threshold {
        DayThreshold::Defined { day, mg_dl } => format!("  day {day}: {mg_dl} mg/dL"),
        DayThreshold::UndefinedDayZero => format!(
            "  day 0: no validated threshold (reference only {} mg/dL)",
            threshold
                .day_zero_reference_mg_dl
                .map(|value| value.to_string())
                .unwrap_or_else(|| "n/a".to_string())
        ),
        DayThreshold::DayOfLifeUnknown => "  day of life unknown".to_string(),
    });

    if let (Some(measured), Some(exceeds)) =
        (threshold.measured_total_mg_dl, threshold.exceeds_threshold)
    {
        let verdict = if exceeds { "above" } else { "within" };
        lines.push(format!("  measured {measured} mg/dL: {verdict} threshold"));
    }
    lines.extend(
        threshold
            .alerts
            .iter()
            .map(|alert| format!("  ! {}", alert.summary())),
    );
    lines
}

fn render_gestational(outcome: &GestationalOutcome) -> Vec<String> {
    let threshold = match outcome {
        GestationalOutcome::NotApplicable { reason } => {
            return vec![format!("  not applicable: {}", reason.label())];
        }
        GestationalOutcome::Resolved(threshold) => threshold,
    };

    let mut lines = vec![
        format!("  {}, {}", threshold.band_label, threshold.bucket_label),
        format!("  total   {} mg/dL", triple(&threshold.total_mg_dl)),
        format!("  unbound {} ug/dL", triple(&threshold.unbound_ug_dl)),
    ];
    if let Some(grade) = threshold.total_grade {
        lines.push(format!("  measured total: {}", grade.label()));
    }
    if let Some(grade) = threshold.unbound_grade {
        lines.push(format!("  measured unbound: {}", grade.label()));
    }
    lines
}

fn triple(values: &BilirubinTriple) -> String {
    format!(
        "low {} / high {} / exchange {}",
        values.low, values.high, values.exchange
    )
}

pub(crate) fn render_tables(tables: &BilirubinTables) -> String {
    let mut lines = vec!["Phototherapy thresholds by birth weight (mg/dL)".to_string()];
    let days: Vec<String> = (0..8).map(|day| format!("d{day:<5}")).collect();
    lines.push(format!("  {:<14}{}", "band", days.join("")));
    for curve in tables.weight_bands.curves() {
        let values: Vec<String> = curve
            .by_day
            .iter()
            .map(|value| format!("{value:<6}"))
            .collect();
        lines.push(format!("  {:<14}{}", curve.band.label(), values.join("")));
    }

    lines.push(String::new());
    lines.push("Thresholds by corrected age and postnatal hours (low/high/exchange)".to_string());
    for row in tables.gestational.rows() {
        lines.push(format!("  {}", row.band.label()));
        for (bucket, values) in HourBucket::ordered().iter().zip(&row.by_bucket) {
            lines.push(format!("    {:<8}{} mg/dL", bucket.label(), triple(values)));
        }
        lines.push(format!("    unbound {} ug/dL", triple(&row.unbound)));
    }

    lines.join("\n")
}
