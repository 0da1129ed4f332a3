//! The current-status view: which status a contract held on a given date.
//!
//! Pure functions over a [`StatusHistory`]; nothing here touches a store.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{Error, Result, interval::StatusHistory, status::ContractStatus};

/// The status in effect for `contract_id` on `as_of`.
///
/// Dates before the first interval are a caller error (`OutOfRange`). A gap
/// after the first interval would mean a corrupted history and is reported
/// as not found.
pub fn status_at(contract_id: Uuid, history: &StatusHistory, as_of: NaiveDate) -> Result<ContractStatus> {
  let first = history.first().ok_or(Error::NoOpenInterval(contract_id))?;

  if as_of < first.valid_from {
    return Err(Error::OutOfRange {
      contract_id,
      as_of,
      start_date: first.valid_from,
    });
  }

  history
    .covering(as_of)
    .map(|interval| interval.status)
    .ok_or(Error::Uncovered { contract_id, as_of })
}
