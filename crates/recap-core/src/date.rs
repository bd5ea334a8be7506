use crate::error::SummaryError;
use chrono::{NaiveDate, Utc};

/// Validate an optional user-supplied date, defaulting to today (UTC).
///
/// Only exact `YYYY-MM-DD` calendar dates pass; anything else fails with
/// `InvalidDateFormat` before any store query runs.
pub fn resolve(date: Option<&str>) -> Result<String, SummaryError> {
    match date {
        None => Ok(today()),
        Some(raw) => {
            let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| SummaryError::InvalidDateFormat(raw.to_string()))?;
            // chrono tolerates unpadded fields; require the canonical form.
            if parsed.format("%Y-%m-%d").to_string() != raw {
                return Err(SummaryError::InvalidDateFormat(raw.to_string()));
            }
            Ok(raw.to_string())
        }
    }
}

/// The current date bucket, in the same UTC convention ingestion uses.
pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}
