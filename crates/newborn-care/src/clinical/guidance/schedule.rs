use super::reasons::GuidanceNote;
use super::{GuidanceContext, Protocol};
use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

/// Days scanned for the first weekly vitamin K dose.
const WEEKLY_SERIES_SEARCH: std::ops::RangeInclusive<u32> = 11..=17;
const WEEKLY_SERIES_DOSES: u8 = 10;
const SCREENING_DAY: u32 = 4;
const THYROID_TEST_DAY: u32 = 5;
const GLUCOSE_CHECK_HOURS: [u32; 3] = [3, 6, 12];
/// Corrected age window for head MRI, in gestational days (37w0d to 44w6d).
const MRI_WINDOW_DAYS: (u32, u32) = (37 * 7, 44 * 7 + 6);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdministrationRoute {
    Oral,
    Intravenous,
}

impl AdministrationRoute {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Oral => "oral",
            Self::Intravenous => "intravenous",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    VitaminKDose { dose: u8, route: AdministrationRoute },
    ScreeningSample,
    GlucoseCheck,
    ThyroidFunctionTest,
    MriWindowOpens,
    MriWindowCloses,
    EyeExamSeries {
        min_interval_weeks: u8,
        max_interval_weeks: u8,
    },
}

/// A dated (or relative) task derived from an applicable protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    #[serde(flatten)]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_life: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_after_birth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<NaiveDateTime>,
}

impl ScheduledEvent {
    fn on_day(kind: EventKind, day: u32, birth_date: Option<NaiveDate>) -> Self {
        Self {
            kind,
            day_of_life: Some(day),
            hours_after_birth: None,
            due_date: birth_date
                .and_then(|date| date.checked_add_days(Days::new(u64::from(day)))),
            due_at: None,
        }
    }

    fn after_hours(kind: EventKind, hours: u32, birth: Option<NaiveDateTime>) -> Self {
        Self {
            kind,
            day_of_life: None,
            hours_after_birth: Some(hours),
            due_date: None,
            due_at: birth
                .and_then(|instant| instant.checked_add_signed(Duration::hours(i64::from(hours)))),
        }
    }

    fn undated(kind: EventKind) -> Self {
        Self {
            kind,
            day_of_life: None,
            hours_after_birth: None,
            due_date: None,
            due_at: None,
        }
    }

    pub fn describe(&self) -> String {
        let what = match self.kind {
            EventKind::VitaminKDose { dose, route } => {
                format!("vitamin K dose {dose} ({})", route.label())
            }
            EventKind::ScreeningSample => "metabolic screening sample".to_string(),
            EventKind::GlucoseCheck => "blood glucose check".to_string(),
            EventKind::ThyroidFunctionTest => "thyroid function test".to_string(),
            EventKind::MriWindowOpens => "head MRI window opens".to_string(),
            EventKind::MriWindowCloses => "head MRI window closes".to_string(),
            EventKind::EyeExamSeries {
                min_interval_weeks,
                max_interval_weeks,
            } => format!(
                "fundus examination every {min_interval_weeks}-{max_interval_weeks} weeks"
            ),
        };

        let when = match (self.day_of_life, self.hours_after_birth) {
            (Some(day), _) => format!(" on day {day}"),
            (None, Some(hours)) => format!(" at {hours} h"),
            (None, None) => String::new(),
        };
        let date = match (self.due_date, self.due_at) {
            (Some(date), _) => format!(" ({date})"),
            (None, Some(at)) => format!(" ({})", at.format("%Y-%m-%d %H:%M")),
            (None, None) => String::new(),
        };

        format!("{what}{when}{date}")
    }
}

/// Schedule and notes for one protocol given its applicability.
pub(crate) fn plan(
    protocol: Protocol,
    applicable: bool,
    context: &GuidanceContext,
) -> (Vec<ScheduledEvent>, Vec<GuidanceNote>) {
    let mut events = Vec::new();
    let mut notes = Vec::new();

    if !applicable {
        if protocol == Protocol::HearingScreen {
            notes.push(GuidanceNote::SelfFundedHearingScreen);
        }
        return (events, notes);
    }

    let birth_date = context.birth_date;
    match protocol {
        Protocol::VitaminK => {
            events = vitamin_k_schedule(birth_date, context.iv_line);
            if birth_date.is_none() {
                notes.push(GuidanceNote::BirthDateUnknown);
            }
        }
        Protocol::MassScreening => {
            events.push(ScheduledEvent::on_day(
                EventKind::ScreeningSample,
                SCREENING_DAY,
                birth_date,
            ));
            if context.gestational_age.weeks < 37 {
                notes.push(GuidanceNote::PreDischargeRetest);
            }
        }
        Protocol::HypoglycemiaMonitoring => {
            events.extend(GLUCOSE_CHECK_HOURS.iter().map(|hours| {
                ScheduledEvent::after_hours(EventKind::GlucoseCheck, *hours, context.birth_instant)
            }));
        }
        Protocol::ThyroidFunction => {
            events.push(ScheduledEvent::on_day(
                EventKind::ThyroidFunctionTest,
                THYROID_TEST_DAY,
                birth_date,
            ));
        }
        Protocol::HeadMri => {
            let at_birth = context.gestational_age.total_days();
            let (opens, closes) = MRI_WINDOW_DAYS;
            events.push(ScheduledEvent::on_day(
                EventKind::MriWindowOpens,
                opens.saturating_sub(at_birth),
                birth_date,
            ));
            events.push(ScheduledEvent::on_day(
                EventKind::MriWindowCloses,
                closes.saturating_sub(at_birth),
                birth_date,
            ));
            if context
                .birth_weight_g
                .value()
                .is_some_and(|grams| grams < 1000.0)
            {
                notes.push(GuidanceNote::MriAfterReaching1500g);
            }
        }
        Protocol::HearingScreen => {}
        Protocol::EyeExam => {
            events.push(ScheduledEvent::undated(EventKind::EyeExamSeries {
                min_interval_weeks: 2,
                max_interval_weeks: 3,
            }));
        }
    }

    (events, notes)
}

/// Twelve doses: day 0 intravenous or day 1 oral, day 4, then ten weekly Wednesday doses
/// starting with the first Wednesday on days 11-17.
pub fn vitamin_k_schedule(birth_date: Option<NaiveDate>, iv_line: bool) -> Vec<ScheduledEvent> {
    let (route, first_day) = if iv_line {
        (AdministrationRoute::Intravenous, 0)
    } else {
        (AdministrationRoute::Oral, 1)
    };

    let mut events = vec![
        ScheduledEvent::on_day(
            EventKind::VitaminKDose { dose: 1, route },
            first_day,
            birth_date,
        ),
        ScheduledEvent::on_day(
            EventKind::VitaminKDose {
                dose: 2,
                route: AdministrationRoute::Oral,
            },
            4,
            birth_date,
        ),
    ];

    let weekly_dose = |index: u8| EventKind::VitaminKDose {
        dose: 3 + index,
        route: AdministrationRoute::Oral,
    };

    match birth_date.and_then(first_wednesday_day) {
        Some(start) => events.extend((0..WEEKLY_SERIES_DOSES).map(|index| {
            ScheduledEvent::on_day(weekly_dose(index), start + 7 * u32::from(index), birth_date)
        })),
        None => events.extend(
            (0..WEEKLY_SERIES_DOSES).map(|index| ScheduledEvent::undated(weekly_dose(index))),
        ),
    }

    events
}

/// `None` when the search days fall past the last representable date.
fn first_wednesday_day(birth_date: NaiveDate) -> Option<u32> {
    WEEKLY_SERIES_SEARCH.into_iter().find(|day| {
        birth_date
            .checked_add_days(Days::new(u64::from(*day)))
            .is_some_and(|date| date.weekday() == Weekday::Wed)
    })
}
