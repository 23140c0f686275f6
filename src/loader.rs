use crate::datagen::Observation;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Parse uploaded CSV content into an observation series
///
/// The file must contain a `date` column and a numeric `consumption_kwh`
/// column. An optional `time` column (`HH:MM:SS`) is concatenated with the
/// date before parsing. Rows are sorted chronologically after parse, so the
/// returned series is safe to feed to the model regardless of input order.
///
/// # Arguments
/// * `content` - Raw CSV text as uploaded
///
/// # Returns
/// * `Result<Vec<Observation>, String>` - Sorted observations or a
///   human-readable error
///
/// # Errors
/// * Returns an error for an empty file, missing required columns, or any
///   unparseable date/time/value
pub fn parse_csv(content: &str) -> Result<Vec<Observation>, String> {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());

    let header = match lines.next() {
        Some(line) => parse_csv_row(line),
        None => return Err("CSV file is empty".to_string()),
    };

    let columns: Vec<String> = header.iter().map(|c| c.trim().to_lowercase()).collect();

    let date_col = columns
        .iter()
        .position(|c| c == "date")
        .ok_or_else(|| "CSV must contain 'date' and 'consumption_kwh' columns".to_string())?;
    let value_col = columns
        .iter()
        .position(|c| c == "consumption_kwh")
        .ok_or_else(|| "CSV must contain 'date' and 'consumption_kwh' columns".to_string())?;
    let time_col = columns.iter().position(|c| c == "time");

    let mut observations = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let fields = parse_csv_row(line);

        let date_str = fields
            .get(date_col)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("Row {}: missing date value", line_no + 2))?;

        let time_str = time_col
            .and_then(|idx| fields.get(idx))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty());

        let date = parse_timestamp(date_str, time_str)
            .ok_or_else(|| format!("Row {}: could not parse date '{}'", line_no + 2, date_str))?;

        let value_str = fields
            .get(value_col)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("Row {}: missing consumption value", line_no + 2))?;

        let consumption_kwh: f64 = value_str.parse().map_err(|_| {
            format!(
                "Row {}: could not parse consumption '{}'",
                line_no + 2,
                value_str
            )
        })?;

        observations.push(Observation {
            date,
            consumption_kwh,
        });
    }

    if observations.is_empty() {
        return Err("CSV file contains no data rows".to_string());
    }

    observations.sort_by_key(|o| o.date);

    Ok(observations)
}

/// Parse a date string, optionally combined with a separate time column
///
/// Accepts `YYYY-MM-DD HH:MM:SS` and bare `YYYY-MM-DD` (midnight).
fn parse_timestamp(date_str: &str, time_str: Option<&str>) -> Option<NaiveDateTime> {
    if let Some(time) = time_str {
        let combined = format!("{} {}", date_str, time);
        return NaiveDateTime::parse_from_str(&combined, "%Y-%m-%d %H:%M:%S").ok();
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }

    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .ok()
        .map(|d| NaiveDateTime::new(d, NaiveTime::MIN))
}

// Parse a CSV row into a vector of strings, honoring quoted fields
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if let Some(&next) = chars.peek() {
                    if next == '"' && in_quotes {
                        // Double quote inside quoted field - add a single quote
                        current_field.push('"');
                        chars.next();
                    } else {
                        in_quotes = !in_quotes;
                    }
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(current_field);
                current_field = String::new();
            }
            _ => {
                current_field.push(c);
            }
        }
    }

    result.push(current_field);
    result
}
