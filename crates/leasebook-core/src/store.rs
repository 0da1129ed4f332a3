//! The storage traits.
//!
//! [`StatusHistoryStore`] owns status intervals; [`ContractDirectory`] is the
//! read side of the contract records plus the creation hook that seeds every
//! new contract's history. Both are implemented by storage backends (e.g.
//! `leasebook-store-sqlite`, or [`crate::memory::MemoryStore`] in tests).
//! Higher layers depend on these traits, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  contract::{Contract, NewContract},
  error::Classify,
  interval::{StatusHistory, StatusInterval},
  status::ContractStatus,
  transition::Transition,
};

// ─── Status history ──────────────────────────────────────────────────────────

/// Append-mostly storage of status intervals.
///
/// At most one interval per contract is open at any time, and a contract's
/// intervals never overlap. Closed intervals are never rewritten.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait StatusHistoryStore: Send + Sync {
  type Error: std::error::Error + Classify + From<crate::Error> + Send + Sync + 'static;

  /// Open a new interval for `contract_id`.
  ///
  /// Fails with a conflict if an interval is already open. Only the creation
  /// hook and [`Self::set_status`] should need this.
  fn append_open_interval(
    &self,
    contract_id: Uuid,
    status: ContractStatus,
    valid_from: NaiveDate,
  ) -> impl Future<Output = Result<StatusInterval, Self::Error>> + Send + '_;

  /// Close the open interval at `valid_to` and return it.
  ///
  /// Fails with not-found if nothing is open, or with an invalid range if
  /// `valid_to` precedes the interval's `valid_from`.
  fn close_open_interval(
    &self,
    contract_id: Uuid,
    valid_to: NaiveDate,
  ) -> impl Future<Output = Result<StatusInterval, Self::Error>> + Send + '_;

  /// The currently open interval, if any.
  fn open_interval(
    &self,
    contract_id: Uuid,
  ) -> impl Future<Output = Result<Option<StatusInterval>, Self::Error>> + Send + '_;

  /// Every interval for `contract_id`, oldest first. Empty for unknown
  /// contracts.
  fn list_history(
    &self,
    contract_id: Uuid,
  ) -> impl Future<Output = Result<StatusHistory, Self::Error>> + Send + '_;

  /// Move `contract_id` to `status` from `effective` onward.
  ///
  /// Reads the open interval, decides with [`crate::transition::plan`], and
  /// writes the close and the append, all as one atomic unit isolated from
  /// concurrent calls on the same contract. Either both writes happen or
  /// neither does.
  fn set_status(
    &self,
    contract_id: Uuid,
    status: ContractStatus,
    effective: NaiveDate,
  ) -> impl Future<Output = Result<Transition, Self::Error>> + Send + '_;
}

// ─── Contract directory ──────────────────────────────────────────────────────

/// The contract records the status machinery reads from.
///
/// A supertrait of [`StatusHistoryStore`] because creation must insert the
/// contract and its first interval in the same atomic unit.
pub trait ContractDirectory: StatusHistoryStore {
  /// Insert a contract and open its first interval (`Active` from the start
  /// date). Both succeed or neither does.
  fn create_contract(
    &self,
    input: NewContract,
  ) -> impl Future<Output = Result<Contract, Self::Error>> + Send + '_;

  /// Retrieve a contract by UUID. Returns `None` if not found.
  fn get_contract(
    &self,
    contract_id: Uuid,
  ) -> impl Future<Output = Result<Option<Contract>, Self::Error>> + Send + '_;

  /// All contracts, ordered by start date.
  fn list_contracts(&self) -> impl Future<Output = Result<Vec<Contract>, Self::Error>> + Send + '_;

  /// Contracts whose end date is strictly before `as_of` and whose open
  /// interval is still `Active`.
  fn expiry_candidates(
    &self,
    as_of: NaiveDate,
  ) -> impl Future<Output = Result<Vec<Contract>, Self::Error>> + Send + '_;
}
