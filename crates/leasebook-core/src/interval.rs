//! Status intervals: the time-bounded records that make up a contract's
//! status history.
//!
//! Intervals are half-open: `[valid_from, valid_to)`. An interval with no
//! `valid_to` is *open* and is the one currently in effect. A closed interval
//! is never written again.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::ContractStatus;

// ─── Interval ────────────────────────────────────────────────────────────────

/// One status holding for a contract over a range of calendar dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusInterval {
  pub contract_id: Uuid,
  pub status:      ContractStatus,
  /// First date the status is in effect (inclusive).
  pub valid_from:  NaiveDate,
  /// First date the status is no longer in effect (exclusive); `None` while open.
  pub valid_to:    Option<NaiveDate>,
}

impl StatusInterval {
  /// A fresh open interval.
  pub fn open(contract_id: Uuid, status: ContractStatus, valid_from: NaiveDate) -> Self {
    Self { contract_id, status, valid_from, valid_to: None }
  }

  pub fn is_open(&self) -> bool { self.valid_to.is_none() }

  /// Whether `date` falls inside `[valid_from, valid_to)`.
  pub fn covers(&self, date: NaiveDate) -> bool {
    self.valid_from <= date && self.valid_to.is_none_or(|to| date < to)
  }

  /// Whether the two half-open ranges share at least one date. Zero-length
  /// intervals cover no dates and so overlap nothing.
  pub fn overlaps(&self, other: &Self) -> bool {
    let starts_before_other_ends = other.valid_to.is_none_or(|to| self.valid_from < to);
    let other_starts_before_end = self.valid_to.is_none_or(|to| other.valid_from < to);
    let self_empty = self.valid_to == Some(self.valid_from);
    let other_empty = other.valid_to == Some(other.valid_from);
    !self_empty && !other_empty && starts_before_other_ends && other_starts_before_end
  }
}

// ─── History ─────────────────────────────────────────────────────────────────

/// A contract's intervals in append order (oldest first).
///
/// Iterating borrows the history, so it can be walked any number of times.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusHistory {
  intervals: Vec<StatusInterval>,
}

impl StatusHistory {
  pub fn new(intervals: Vec<StatusInterval>) -> Self { Self { intervals } }

  pub fn iter(&self) -> std::slice::Iter<'_, StatusInterval> { self.intervals.iter() }

  pub fn len(&self) -> usize { self.intervals.len() }

  pub fn is_empty(&self) -> bool { self.intervals.is_empty() }

  pub fn first(&self) -> Option<&StatusInterval> { self.intervals.first() }

  /// The interval currently in effect, if any.
  pub fn open(&self) -> Option<&StatusInterval> {
    self.intervals.iter().rev().find(|i| i.is_open())
  }

  /// The interval covering `date`. When same-day transitions leave
  /// zero-length intervals behind, the later (non-empty) one wins.
  pub fn covering(&self, date: NaiveDate) -> Option<&StatusInterval> {
    self.intervals.iter().rev().find(|i| i.covers(date))
  }

  /// Check the structural invariants of a history: at most one open
  /// interval, which must be the last; every closed interval has
  /// `valid_to >= valid_from`; consecutive intervals do not overlap.
  pub fn validate(&self) -> Result<(), HistoryViolation> {
    let last = self.intervals.len().saturating_sub(1);
    for (idx, interval) in self.intervals.iter().enumerate() {
      match interval.valid_to {
        None if idx != last => return Err(HistoryViolation::OpenBeforeEnd { index: idx }),
        Some(to) if to < interval.valid_from => {
          return Err(HistoryViolation::NegativeLength { index: idx });
        }
        _ => {}
      }
    }
    for (idx, pair) in self.intervals.windows(2).enumerate() {
      match pair[0].valid_to {
        Some(to) if to <= pair[1].valid_from => {}
        _ => return Err(HistoryViolation::Overlap { index: idx }),
      }
    }
    Ok(())
  }

  pub fn into_inner(self) -> Vec<StatusInterval> { self.intervals }
}

impl IntoIterator for StatusHistory {
  type Item = StatusInterval;
  type IntoIter = std::vec::IntoIter<StatusInterval>;

  fn into_iter(self) -> Self::IntoIter { self.intervals.into_iter() }
}

impl<'a> IntoIterator for &'a StatusHistory {
  type Item = &'a StatusInterval;
  type IntoIter = std::slice::Iter<'a, StatusInterval>;

  fn into_iter(self) -> Self::IntoIter { self.intervals.iter() }
}

/// A broken history invariant, located by interval index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HistoryViolation {
  #[error("interval {index} is open but is not the last interval")]
  OpenBeforeEnd { index: usize },
  #[error("interval {index} closes before it opens")]
  NegativeLength { index: usize },
  #[error("interval {index} overlaps its successor")]
  Overlap { index: usize },
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

  fn closed(status: ContractStatus, from: NaiveDate, to: NaiveDate) -> StatusInterval {
    StatusInterval { valid_to: Some(to), ..StatusInterval::open(Uuid::nil(), status, from) }
  }

  #[test]
  fn covers_is_half_open() {
    let i = closed(ContractStatus::Active, d(2024, 1, 1), d(2024, 6, 30));
    assert!(i.covers(d(2024, 1, 1)));
    assert!(i.covers(d(2024, 6, 29)));
    assert!(!i.covers(d(2024, 6, 30)));
    assert!(!i.covers(d(2023, 12, 31)));

    let open = StatusInterval::open(Uuid::nil(), ContractStatus::Expired, d(2024, 6, 30));
    assert!(open.covers(d(2099, 1, 1)));
  }

  #[test]
  fn zero_length_interval_covers_nothing() {
    let i = closed(ContractStatus::Active, d(2024, 3, 1), d(2024, 3, 1));
    assert!(!i.covers(d(2024, 3, 1)));
    let next = StatusInterval::open(Uuid::nil(), ContractStatus::Terminated, d(2024, 3, 1));
    assert!(!i.overlaps(&next));
  }

  #[test]
  fn adjacent_intervals_do_not_overlap() {
    let a = closed(ContractStatus::Active, d(2024, 1, 1), d(2024, 3, 15));
    let b = StatusInterval::open(Uuid::nil(), ContractStatus::Terminated, d(2024, 3, 15));
    assert!(!a.overlaps(&b));
    let c = StatusInterval::open(Uuid::nil(), ContractStatus::Terminated, d(2024, 3, 14));
    assert!(a.overlaps(&c));
  }

  #[test]
  fn validate_catches_each_violation() {
    let ok = StatusHistory::new(vec![
      closed(ContractStatus::Active, d(2024, 1, 1), d(2024, 6, 30)),
      StatusInterval::open(Uuid::nil(), ContractStatus::Expired, d(2024, 6, 30)),
    ]);
    assert_eq!(ok.validate(), Ok(()));

    let two_open = StatusHistory::new(vec![
      StatusInterval::open(Uuid::nil(), ContractStatus::Active, d(2024, 1, 1)),
      StatusInterval::open(Uuid::nil(), ContractStatus::Expired, d(2024, 6, 30)),
    ]);
    assert_eq!(two_open.validate(), Err(HistoryViolation::OpenBeforeEnd { index: 0 }));

    let negative = StatusHistory::new(vec![closed(
      ContractStatus::Active,
      d(2024, 2, 1),
      d(2024, 1, 1),
    )]);
    assert_eq!(negative.validate(), Err(HistoryViolation::NegativeLength { index: 0 }));

    let overlap = StatusHistory::new(vec![
      closed(ContractStatus::Active, d(2024, 1, 1), d(2024, 6, 30)),
      StatusInterval::open(Uuid::nil(), ContractStatus::Expired, d(2024, 6, 1)),
    ]);
    assert_eq!(overlap.validate(), Err(HistoryViolation::Overlap { index: 0 }));
  }

  #[test]
  fn covering_prefers_non_empty_interval() {
    let h = StatusHistory::new(vec![
      closed(ContractStatus::Active, d(2024, 1, 1), d(2024, 1, 1)),
      StatusInterval::open(Uuid::nil(), ContractStatus::Terminated, d(2024, 1, 1)),
    ]);
    assert_eq!(h.covering(d(2024, 1, 1)).unwrap().status, ContractStatus::Terminated);
    assert!(h.covering(d(2023, 12, 31)).is_none());
  }
}
