use chrono::{DateTime, Utc};

use crate::clock::{start_of_month_months_ago, Clock};
use crate::models::PageTransaction;

/// Lower bound for the next page request.
///
/// `since` is fixed when the session starts and bounds the whole window.
/// `last_seen` follows the `created` value of the last transaction of each
/// fetched page.
#[derive(Debug, Clone)]
pub struct DateCursor {
    window_start: DateTime<Utc>,
    since: String,
    last_seen: Option<String>,
}

impl DateCursor {
    pub fn new(window_start: DateTime<Utc>) -> Self {
        Self {
            window_start,
            since: window_start.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            last_seen: None,
        }
    }

    /// Window starting `lookback_months` before now, on the first of that
    /// month at midnight UTC.
    pub fn from_clock(clock: &dyn Clock, lookback_months: u32) -> Self {
        Self::new(start_of_month_months_ago(clock.now(), lookback_months))
    }

    pub fn window_start(&self) -> DateTime<Utc> {
        self.window_start
    }

    pub fn since_date(&self) -> &str {
        &self.since
    }

    pub fn last_seen(&self) -> Option<&str> {
        self.last_seen.as_deref()
    }

    /// Value to send as the next page's lower bound.
    pub fn next_lower_bound(&self) -> &str {
        self.last_seen.as_deref().unwrap_or(&self.since)
    }

    /// Move past `page`. An empty page leaves the cursor where it was.
    pub fn advance(&mut self, page: &[PageTransaction]) {
        if let Some(last) = page.last() {
            self.last_seen = Some(last.created.clone());
        }
    }

    /// Continue from a position remembered by an earlier session.
    pub fn resume_from(&mut self, last_seen: impl Into<String>) {
        self.last_seen = Some(last_seen.into());
    }
}
