use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};

/// Abstraction over "current time" so the sync window and progress are
/// deterministic in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Fixed clock at midnight UTC on the given date.
    pub fn at_date(year: i32, month: u32, day: u32) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
            .single()
            .map(Self::new)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// First instant of the month `months` calendar months before `now`.
///
/// Month arithmetic clamps the day (31 March minus one month is 28/29
/// February), which never matters here because the result is truncated to
/// the first of the month anyway.
pub fn start_of_month_months_ago(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    let shifted = now
        .date_naive()
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN);
    let first = NaiveDate::from_ymd_opt(shifted.year(), shifted.month(), 1).unwrap_or(shifted);
    first.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Fractional number of days between two instants (negative if `to` is
/// before `from`).
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 86_400_000.0
}
