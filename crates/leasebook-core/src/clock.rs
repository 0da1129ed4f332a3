//! Date sources. Everything that needs "today" takes a [`Clock`] so tests
//! can move time by hand.

use std::sync::RwLock;

use chrono::{Days, NaiveDate, Utc};

pub trait Clock: Send + Sync {
  /// The current calendar date.
  fn today(&self) -> NaiveDate;
}

/// The real UTC calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn today(&self) -> NaiveDate { Utc::now().date_naive() }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
  today: RwLock<NaiveDate>,
}

impl ManualClock {
  pub fn new(today: NaiveDate) -> Self { Self { today: RwLock::new(today) } }

  pub fn set(&self, today: NaiveDate) {
    *self.today.write().unwrap_or_else(|e| e.into_inner()) = today;
  }

  /// Move the clock forward by `days`.
  pub fn advance(&self, days: u64) {
    let mut today = self.today.write().unwrap_or_else(|e| e.into_inner());
    *today = today.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);
  }
}

impl Clock for ManualClock {
  fn today(&self) -> NaiveDate { *self.today.read().unwrap_or_else(|e| e.into_inner()) }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
  fn today(&self) -> NaiveDate { (**self).today() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn manual_clock_moves_only_when_told() {
    let clock = ManualClock::new(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
    assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
    clock.advance(1);
    assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
    clock.set(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
    assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
  }
}
