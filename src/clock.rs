//! Injected date provider.
//!
//! "Today" is never read from an ambient global: the selector and handlers
//! take a `Clock` so tests pin the date and production applies the fixed
//! day-boundary offset the original deployment used (America/New_York).

use chrono::{Duration, NaiveDate, Utc};

pub trait Clock: Send + Sync {
  fn today(&self) -> NaiveDate;
}

/// Production clock: the calendar day rolls over at a fixed offset from UTC.
pub struct ResetClock {
  pub utc_offset_hours: i32,
}

impl Clock for ResetClock {
  fn today(&self) -> NaiveDate {
    (Utc::now() + Duration::hours(i64::from(self.utc_offset_hours))).date_naive()
  }
}

/// A clock pinned to one date. Used by tests and replay tooling.
#[allow(dead_code)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
  fn today(&self) -> NaiveDate {
    self.0
  }
}
