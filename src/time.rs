//! Wall-clock source and hour-based arithmetic.
//!
//! Scheduling quantities (max run time, alt period, elapsed time) are kept in
//! fractional hours; they are converted to `chrono::Duration` only at the
//! point where they touch a timestamp.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Timelike, Utc};

const SECONDS_PER_HOUR: f64 = 3600.0;

pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn advance_hours(&self, by: f64) {
        if let Some(by) = hours(by) {
            self.advance(by);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Fractional hours as a duration, at millisecond resolution. `None` when the
/// value is not finite or does not fit in an `i64` count of milliseconds.
pub fn hours(value: f64) -> Option<Duration> {
    let millis = (value * SECONDS_PER_HOUR * 1000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(Duration::milliseconds(millis as i64))
}

/// `at` shifted by fractional hours, or `None` past the representable range.
pub fn add_hours(at: DateTime<Utc>, value: f64) -> Option<DateTime<Utc>> {
    at.checked_add_signed(hours(value)?)
}

pub fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / (SECONDS_PER_HOUR * 1000.0)
}

/// `YYYYMMDD_sssss`: calendar date and zero-padded seconds of day.
pub fn file_stamp(at: DateTime<Utc>) -> String {
    format!(
        "{}_{:05}",
        at.format("%Y%m%d"),
        at.num_seconds_from_midnight()
    )
}

pub fn header_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
