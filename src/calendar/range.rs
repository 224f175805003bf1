//! Day ranges for calendar queries, aligned to midnight in the display zone.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// A span of whole local days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub first_day: NaiveDate,
    pub days: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn today(now: DateTime<Utc>, tz: Tz) -> Self {
        Self::starting(local_date(now, tz), 1, tz)
    }

    pub fn tomorrow(now: DateTime<Utc>, tz: Tz) -> Self {
        let today = local_date(now, tz);
        Self::starting(today + Days::new(1), 1, tz)
    }

    /// `days` days starting today.
    pub fn upcoming(now: DateTime<Utc>, tz: Tz, days: u32) -> Self {
        Self::starting(local_date(now, tz), days, tz)
    }

    fn starting(first_day: NaiveDate, days: u32, tz: Tz) -> Self {
        let last = first_day + Days::new(u64::from(days));
        Self {
            first_day,
            days,
            start: local_midnight(first_day, tz),
            end: local_midnight(last, tz),
        }
    }
}

fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Start of `date` in `tz`, as UTC.
///
/// Zones that skip midnight on a DST change start the day at the first
/// valid instant after it.
fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=2)
        .find_map(|hour| {
            tz.from_local_datetime(&(midnight + chrono::Duration::hours(hour)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}
