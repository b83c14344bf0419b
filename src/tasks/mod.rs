//! Task normalization.
//!
//! Turns uploaded `title;description;date` rows and manually entered form rows into
//! [`Task`] values. Uploaded rows come first, manual rows after, order preserved.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::models::{ManualTask, Task};

const FIELD_DELIMITER: char = ';';

/// Parse delimited task rows. Blank lines and rows without a title are dropped.
pub fn parse_task_rows(text: &str) -> Vec<Task> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let mut fields = line.split(FIELD_DELIMITER).map(str::trim);
            let title = fields.next().unwrap_or_default();
            if title.is_empty() {
                return None;
            }
            let description = fields.next().unwrap_or_default();
            let due_date = fields.next().and_then(parse_due_date);

            Some(Task {
                title: title.to_string(),
                description: description.to_string(),
                due_date,
            })
        })
        .collect()
}

/// Normalize manual rows, dropping rows without a title.
pub fn normalize_manual(rows: Vec<ManualTask>) -> Vec<Task> {
    rows.into_iter()
        .filter_map(|row| {
            let title = row.title.trim();
            if title.is_empty() {
                return None;
            }
            Some(Task {
                title: title.to_string(),
                description: row.description.unwrap_or_default().trim().to_string(),
                due_date: row.due_date.as_deref().and_then(parse_due_date),
            })
        })
        .collect()
}

/// Merge uploaded rows and manual rows into one ordered task list.
pub fn aggregate(uploaded: Option<&str>, manual: Vec<ManualTask>) -> Vec<Task> {
    let mut tasks = uploaded.map(parse_task_rows).unwrap_or_default();
    tasks.extend(normalize_manual(manual));
    tasks
}

/// Accepts RFC 3339 timestamps, `datetime-local` form values and plain dates (UTC midnight).
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
