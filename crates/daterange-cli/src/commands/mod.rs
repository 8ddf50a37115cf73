pub mod config;
pub mod marks;
pub mod query;
pub mod simulate;

use daterange_core::{DateInput, DatePick, Result, ValidationError};

/// Parse a date argument: epoch milliseconds, `yyyy-MM-dd`, or RFC 3339.
pub(crate) fn parse_pick(raw: &str) -> Result<DatePick> {
    let input = match raw.trim().parse::<i64>() {
        Ok(ms) => DateInput::Millis(ms),
        Err(_) => DateInput::Text(raw.to_string()),
    };
    input
        .to_pick()
        .ok_or_else(|| ValidationError::InvalidDate(raw.to_string()).into())
}
