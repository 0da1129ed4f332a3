//! The transition engine's decision step.
//!
//! [`plan`] looks at a contract's open interval and a requested status change
//! and decides what, if anything, must be written. It performs no I/O. Store
//! backends call it between reading the open interval and writing the result,
//! all inside their own atomic unit, so every backend applies the same rules.

use chrono::NaiveDate;
use serde::Serialize;

use crate::{Error, Result, interval::StatusInterval, status::ContractStatus};

/// The outcome of a status change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transition {
  /// The contract already holds the requested status; nothing is written.
  Unchanged { current: StatusInterval },
  /// `closed` is the previously open interval with its `valid_to` set;
  /// `opened` is the new open interval.
  Advanced {
    closed: StatusInterval,
    opened: StatusInterval,
  },
}

impl Transition {
  pub fn is_change(&self) -> bool { matches!(self, Self::Advanced { .. }) }

  /// The interval that is open after the transition.
  pub fn current(&self) -> &StatusInterval {
    match self {
      Self::Unchanged { current } => current,
      Self::Advanced { opened, .. } => opened,
    }
  }
}

/// Decide how `open` changes when the contract is asked to hold `next` from
/// `effective` onward.
///
/// Rules, in order:
/// 1. A terminated contract accepts no further requests.
/// 2. `effective` may not precede `open.valid_from`.
/// 3. Requesting the current status is a no-op.
/// 4. Any other edge must be allowed by [`ContractStatus::can_transition_to`].
pub fn plan(open: &StatusInterval, next: ContractStatus, effective: NaiveDate) -> Result<Transition> {
  debug_assert!(open.is_open(), "plan called with a closed interval");

  if open.status == ContractStatus::Terminated {
    return Err(Error::TerminalState {
      contract_id: open.contract_id,
      from:        open.status,
      to:          next,
    });
  }

  if effective < open.valid_from {
    return Err(Error::Backdated { effective, valid_from: open.valid_from });
  }

  if next == open.status {
    return Ok(Transition::Unchanged { current: open.clone() });
  }

  if !open.status.can_transition_to(next) {
    return Err(Error::TerminalState {
      contract_id: open.contract_id,
      from:        open.status,
      to:          next,
    });
  }

  Ok(Transition::Advanced {
    closed: StatusInterval { valid_to: Some(effective), ..open.clone() },
    opened: StatusInterval::open(open.contract_id, next, effective),
  })
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;
  use crate::ErrorKind;
  use crate::error::Classify as _;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

  fn active_since(from: NaiveDate) -> StatusInterval {
    StatusInterval::open(Uuid::new_v4(), ContractStatus::Active, from)
  }

  #[test]
  fn active_to_terminated_closes_and_opens() {
    let open = active_since(d(2024, 1, 1));
    let t = plan(&open, ContractStatus::Terminated, d(2024, 3, 15)).unwrap();

    let Transition::Advanced { closed, opened } = t else {
      panic!("expected an advance");
    };
    assert_eq!(closed.status, ContractStatus::Active);
    assert_eq!(closed.valid_from, d(2024, 1, 1));
    assert_eq!(closed.valid_to, Some(d(2024, 3, 15)));
    assert_eq!(opened.status, ContractStatus::Terminated);
    assert_eq!(opened.valid_from, d(2024, 3, 15));
    assert!(opened.is_open());
    assert_eq!(opened.contract_id, open.contract_id);
  }

  #[test]
  fn same_status_is_noop() {
    let open = active_since(d(2024, 1, 1));
    let t = plan(&open, ContractStatus::Active, d(2024, 2, 1)).unwrap();
    assert_eq!(t, Transition::Unchanged { current: open });
    assert!(!t.is_change());
  }

  #[test]
  fn backdating_is_rejected_before_noop() {
    let open = active_since(d(2024, 1, 1));
    let err = plan(&open, ContractStatus::Active, d(2023, 12, 1)).unwrap_err();
    assert!(matches!(err, Error::Backdated { .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidRange);
  }

  #[test]
  fn same_day_transition_yields_zero_length_interval() {
    let open = active_since(d(2024, 1, 1));
    let t = plan(&open, ContractStatus::Terminated, d(2024, 1, 1)).unwrap();
    let Transition::Advanced { closed, .. } = t else { panic!("expected an advance") };
    assert_eq!(closed.valid_to, Some(closed.valid_from));
  }

  #[test]
  fn terminated_rejects_everything() {
    let open = StatusInterval::open(Uuid::new_v4(), ContractStatus::Terminated, d(2024, 3, 15));
    for next in [ContractStatus::Active, ContractStatus::Expired, ContractStatus::Terminated] {
      // Even a backdated request reports the terminal lock.
      for date in [d(2024, 1, 1), d(2024, 4, 1)] {
        let err = plan(&open, next, date).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TerminalState);
      }
    }
  }

  #[test]
  fn expired_is_terminal_but_idempotent() {
    let open = StatusInterval::open(Uuid::new_v4(), ContractStatus::Expired, d(2024, 6, 30));
    assert!(!plan(&open, ContractStatus::Expired, d(2024, 7, 1)).unwrap().is_change());
    let err = plan(&open, ContractStatus::Terminated, d(2024, 7, 1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TerminalState);
    let err = plan(&open, ContractStatus::Active, d(2024, 7, 1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TerminalState);
  }
}
