use super::{CohortCurves, LmsParameters, ReferenceKey, ReferenceRow, ReferenceTableError};
use csv::StringRecord;
use std::io::Read;

const WEEK_COLUMN: usize = 0;
const DAY_COLUMN: usize = 1;
const LENGTH_COLUMN: usize = 2;
const FIRST_COHORT_COLUMN: usize = 5;
/// Weight L,M,S followed by head circumference L,M,S.
const COHORT_WIDTH: usize = 6;
pub(crate) const EXPECTED_COLUMNS: usize = FIRST_COHORT_COLUMN + 4 * COHORT_WIDTH;

/// Parse the fixed-offset reference sheet. Header text is ignored; a blank week cell
/// continues the most recently seen week.
pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<ReferenceRow>, ReferenceTableError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut current_week: Option<u16> = None;

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();

        if record.iter().all(str::is_empty) {
            continue;
        }

        if record.len() < EXPECTED_COLUMNS {
            return Err(ReferenceTableError::ShortRow {
                line,
                expected: EXPECTED_COLUMNS,
                found: record.len(),
            });
        }

        let week = match cell(&record, WEEK_COLUMN) {
            "" => current_week.ok_or(ReferenceTableError::MissingWeek { line })?,
            raw => parse_integer(raw, line, WEEK_COLUMN)?,
        };
        current_week = Some(week);

        let day: u8 = parse_integer(cell(&record, DAY_COLUMN), line, DAY_COLUMN)?;
        if day > 6 {
            return Err(ReferenceTableError::DayOutOfRange { line, day });
        }

        let length = parse_lms(&record, LENGTH_COLUMN, line)?;
        let mut cohorts = [CohortCurves {
            weight: length,
            head_circumference: length,
        }; 4];
        for (index, cohort) in cohorts.iter_mut().enumerate() {
            let offset = FIRST_COHORT_COLUMN + index * COHORT_WIDTH;
            *cohort = CohortCurves {
                weight: parse_lms(&record, offset, line)?,
                head_circumference: parse_lms(&record, offset + 3, line)?,
            };
        }

        rows.push(ReferenceRow {
            key: ReferenceKey::new(week, day),
            length,
            cohorts,
        });
    }

    Ok(rows)
}

fn cell(record: &StringRecord, column: usize) -> &str {
    record.get(column).unwrap_or_default()
}

fn parse_integer<T: std::str::FromStr>(
    raw: &str,
    line: u64,
    column: usize,
) -> Result<T, ReferenceTableError> {
    // Spreadsheet exports often write whole numbers as "38.0".
    let trimmed = raw.strip_suffix(".0").unwrap_or(raw);
    trimmed
        .parse::<T>()
        .map_err(|_| ReferenceTableError::InvalidCell {
            line,
            column,
            value: raw.to_string(),
        })
}

fn parse_lms(
    record: &StringRecord,
    offset: usize,
    line: u64,
) -> Result<LmsParameters, ReferenceTableError> {
    let value = |column: usize| -> Result<f64, ReferenceTableError> {
        let raw = cell(record, column);
        raw.parse::<f64>()
            .map_err(|_| ReferenceTableError::InvalidCell {
                line,
                column,
                value: raw.to_string(),
            })
    };

    Ok(LmsParameters::new(
        value(offset)?,
        value(offset + 1)?,
        value(offset + 2)?,
    ))
}

#[cfg(test)]
pub(crate) fn sheet_line(week: &str, day: u8, weight_m: f64) -> String {
    let mut cells = vec![
        week.to_string(),
        day.to_string(),
        "1.0".into(),
        "49.0".into(),
        "0.04".into(),
    ];
    for offset in [40.0, 20.0, 0.0, -20.0] {
        cells.extend([
            "0.3".to_string(),
            format!("{:.1}", weight_m + offset),
            "0.12".to_string(),
            "1.0".to_string(),
            "33.2".to_string(),
            "0.035".to_string(),
        ]);
    }
    cells.join(",")
}
