//! Error types for `leasebook-core`.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::status::ContractStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("contract not found: {0}")]
  ContractNotFound(Uuid),

  #[error("contract {0} has no open status interval")]
  NoOpenInterval(Uuid),

  #[error("contract {contract_id} has no status interval covering {as_of}")]
  Uncovered { contract_id: Uuid, as_of: NaiveDate },

  #[error("effective date {effective} precedes the open interval start {valid_from}")]
  Backdated {
    effective:  NaiveDate,
    valid_from: NaiveDate,
  },

  #[error("new interval from {valid_from} overlaps the previous one ending {previous_end}")]
  OverlapsPrevious {
    valid_from:   NaiveDate,
    previous_end: NaiveDate,
  },

  #[error("contract end date {end_date} precedes its start date {start_date}")]
  EndBeforeStart {
    start_date: NaiveDate,
    end_date:   NaiveDate,
  },

  #[error("contract {0} already has an open status interval")]
  AlreadyOpen(Uuid),

  #[error("contract {0} already exists")]
  ContractExists(Uuid),

  #[error("concurrent write on contract {0} lost the race")]
  Conflict(Uuid),

  #[error("contract {contract_id} is {from}; cannot move to {to}")]
  TerminalState {
    contract_id: Uuid,
    from:        ContractStatus,
    to:          ContractStatus,
  },

  #[error("{as_of} is before contract {contract_id} started on {start_date}")]
  OutOfRange {
    contract_id: Uuid,
    as_of:       NaiveDate,
    start_date:  NaiveDate,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Kinds ───────────────────────────────────────────────────────────────────

/// The coarse category of a failure, independent of the backend that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  /// The contract, or its open interval, does not exist.
  NotFound,
  /// A date ordering rule was violated.
  InvalidRange,
  /// A concurrent writer won; the caller may retry.
  Conflict,
  /// The contract is in a status with no outgoing transitions.
  TerminalState,
  /// A status was requested for a date before the contract existed.
  OutOfRange,
  /// The storage backend failed for reasons outside the domain taxonomy.
  Storage,
}

/// Implemented by every error type that can come out of a store, so callers
/// can branch on the failure category without knowing the backend.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::ContractNotFound(_) | Self::NoOpenInterval(_) | Self::Uncovered { .. } => {
        ErrorKind::NotFound
      }
      Self::Backdated { .. } | Self::OverlapsPrevious { .. } | Self::EndBeforeStart { .. } => {
        ErrorKind::InvalidRange
      }
      Self::AlreadyOpen(_) | Self::ContractExists(_) | Self::Conflict(_) => {
        ErrorKind::Conflict
      }
      Self::TerminalState { .. } => ErrorKind::TerminalState,
      Self::OutOfRange { .. } => ErrorKind::OutOfRange,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kinds_follow_taxonomy() {
    let id = Uuid::new_v4();
    let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    assert_eq!(Error::NoOpenInterval(id).kind(), ErrorKind::NotFound);
    assert_eq!(
      Error::Backdated { effective: d, valid_from: d }.kind(),
      ErrorKind::InvalidRange
    );
    assert_eq!(
      Error::OverlapsPrevious { valid_from: d, previous_end: d }.kind(),
      ErrorKind::InvalidRange
    );
    assert_eq!(Error::AlreadyOpen(id).kind(), ErrorKind::Conflict);
    assert_eq!(
      Error::OutOfRange { contract_id: id, as_of: d, start_date: d }.kind(),
      ErrorKind::OutOfRange
    );
  }
}
