//! Draw-window math
//!
//! The Pin Wheel rolls over at 20:00 UTC. Every place that needs "the
//! current window" (entry, status, the auto-entry batch, the scheduler)
//! computes it through [`for_timestamp`] so the boundary lives in exactly
//! one function. Time itself comes in through the [`Clock`] trait so tests
//! can pin it.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};

/// Hour (UTC) at which the draw window rolls over to the next date
pub const ROLLOVER_HOUR_UTC: u32 = 20;

/// Source of the current time. Production uses [`SystemClock`]; tests use
/// a fixed clock to exercise both sides of the rollover boundary.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The draw window a timestamp falls into.
///
/// At or after 20:00 UTC the window is tomorrow's UTC calendar date;
/// before that, today's.
pub fn for_timestamp(ts: DateTime<Utc>) -> NaiveDate {
    let date = ts.date_naive();
    if ts.hour() >= ROLLOVER_HOUR_UTC {
        date + Duration::days(1)
    } else {
        date
    }
}

/// The next rollover instant strictly after `ts`
pub fn next_boundary(ts: DateTime<Utc>) -> DateTime<Utc> {
    let today_boundary = Utc
        .with_ymd_and_hms(
            ts.year(),
            ts.month(),
            ts.day(),
            ROLLOVER_HOUR_UTC,
            0,
            0,
        )
        .single()
        .unwrap_or(ts);
    if ts < today_boundary {
        today_boundary
    } else {
        today_boundary + Duration::days(1)
    }
}

/// Milliseconds from `ts` until the next rollover
pub fn ms_until_next_boundary(ts: DateTime<Utc>) -> i64 {
    (next_boundary(ts) - ts).num_milliseconds()
}
