// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for snapshot date formatting.

use chrono::{NaiveDate, ParseError};

/// Calendar date format used for snapshot rows and URLs (`2024-11-29`).
pub const SNAPSHOT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Format a snapshot date for storage.
pub fn format_snapshot_date(date: NaiveDate) -> String {
    date.format(SNAPSHOT_DATE_FORMAT).to_string()
}

/// Parse a snapshot date from storage or a request path.
pub fn parse_snapshot_date(raw: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(raw, SNAPSHOT_DATE_FORMAT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_date_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        assert_eq!(format_snapshot_date(date), "2024-03-08");
        assert_eq!(parse_snapshot_date("2024-03-08").unwrap(), date);
        assert!(parse_snapshot_date("08/03/2024").is_err());
    }
}
