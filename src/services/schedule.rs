// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weekly timer for the batch job. All times are UTC.

use crate::config::ConfigError;
use crate::services::BatchRefresher;
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use std::sync::Arc;

/// A fixed weekday and hour, repeating every week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    weekday: Weekday,
    at: NaiveTime,
}

impl WeeklySchedule {
    pub fn new(weekday: Weekday, hour: u32) -> Result<Self, ConfigError> {
        let at = NaiveTime::from_hms_opt(hour, 0, 0).ok_or_else(|| ConfigError::Invalid {
            name: "BATCH_HOUR",
            reason: format!("hour must be 0-23, got {}", hour),
        })?;
        Ok(Self { weekday, at })
    }

    /// First occurrence strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let days_ahead = (7 + self.weekday.num_days_from_monday() as i64
            - today.weekday().num_days_from_monday() as i64)
            % 7;

        let candidate = (today + Duration::days(days_ahead))
            .and_time(self.at)
            .and_utc();

        if candidate > now {
            candidate
        } else {
            candidate + Duration::days(7)
        }
    }
}

/// Run `batch` at every occurrence of `schedule`, forever.
///
/// A failed or panicked run is logged and the loop waits for the next occurrence.
pub async fn run_weekly(batch: Arc<BatchRefresher>, schedule: WeeklySchedule) {
    tracing::info!(weekday = %schedule.weekday, at = %schedule.at, "Starting weekly scheduler");

    loop {
        let now = Utc::now();
        let next = schedule.next_after(now);
        let wait = (next - now).to_std().unwrap_or_default();

        tracing::info!(next_run = %next, "Next weekly batch scheduled");
        tokio::time::sleep(wait).await;

        // Each run gets its own task so a panic cannot end the loop.
        let run = tokio::spawn({
            let batch = batch.clone();
            async move { batch.run().await }
        });

        match run.await {
            Ok(Ok(report)) => tracing::info!(
                succeeded = report.succeeded,
                failed = report.failed,
                unlinked = report.unlinked,
                "Weekly batch completed"
            ),
            Ok(Err(e)) => tracing::error!(error = %e, "Weekly batch aborted"),
            Err(e) => tracing::error!(error = %e, "Weekly batch task panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn friday_17() -> WeeklySchedule {
        WeeklySchedule::new(Weekday::Fri, 17).unwrap()
    }

    #[test]
    fn test_invalid_hour_rejected() {
        assert!(WeeklySchedule::new(Weekday::Fri, 24).is_err());
        assert!(WeeklySchedule::new(Weekday::Fri, 23).is_ok());
    }

    #[test]
    fn test_next_after_midweek() {
        // Wednesday
        let now = Utc.with_ymd_and_hms(2024, 11, 27, 9, 30, 0).unwrap();
        assert_eq!(
            friday_17().next_after(now),
            Utc.with_ymd_and_hms(2024, 11, 29, 17, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_after_same_day_before_and_after() {
        let before = Utc.with_ymd_and_hms(2024, 11, 29, 16, 59, 59).unwrap();
        assert_eq!(
            friday_17().next_after(before),
            Utc.with_ymd_and_hms(2024, 11, 29, 17, 0, 0).unwrap()
        );

        let exactly = Utc.with_ymd_and_hms(2024, 11, 29, 17, 0, 0).unwrap();
        assert_eq!(
            friday_17().next_after(exactly),
            Utc.with_ymd_and_hms(2024, 12, 6, 17, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_after_weekend_wraps() {
        // Saturday
        let now = Utc.with_ymd_and_hms(2024, 11, 30, 8, 0, 0).unwrap();
        assert_eq!(
            friday_17().next_after(now),
            Utc.with_ymd_and_hms(2024, 12, 6, 17, 0, 0).unwrap()
        );
    }
}
