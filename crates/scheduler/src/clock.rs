//! Run Clock

use chrono::Utc;

/// Source of epoch time for rule start times and elapsed durations
pub trait Clock: Send + Sync {
    /// Seconds since the epoch, millisecond precision
    fn now(&self) -> f64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        Utc::now().timestamp_millis() as f64 / 1000.0
    }
}

/// Round to milliseconds, the precision used in reports
pub(crate) fn round_ms(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}
