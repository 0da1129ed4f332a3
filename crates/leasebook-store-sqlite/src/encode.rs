//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Calendar dates are stored as `YYYY-MM-DD`, which sorts the same as the
//! dates themselves. Timestamps are RFC 3339 strings. UUIDs are hyphenated
//! lowercase strings. Statuses are their lowercase names.

use std::str::FromStr as _;

use chrono::{DateTime, NaiveDate, Utc};
use leasebook_core::{contract::Contract, interval::StatusInterval, status::ContractStatus};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── NaiveDate ────────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── ContractStatus ───────────────────────────────────────────────────────────

pub fn encode_status(s: ContractStatus) -> &'static str {
  match s {
    ContractStatus::Active => "active",
    ContractStatus::Expired => "expired",
    ContractStatus::Terminated => "terminated",
  }
}

pub fn decode_status(s: &str) -> Result<ContractStatus> {
  ContractStatus::from_str(s).map_err(|_| Error::UnknownStatus(s.to_owned()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `status_intervals` row.
pub struct RawInterval {
  pub contract_id: String,
  pub seq:         i64,
  pub status:      String,
  pub valid_from:  String,
  pub valid_to:    Option<String>,
}

impl RawInterval {
  /// Column order expected by [`Self::from_row`].
  pub const COLUMNS: &'static str = "contract_id, seq, status, valid_from, valid_to";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      contract_id: row.get(0)?,
      seq:         row.get(1)?,
      status:      row.get(2)?,
      valid_from:  row.get(3)?,
      valid_to:    row.get(4)?,
    })
  }

  pub fn into_interval(self) -> Result<StatusInterval> {
    Ok(StatusInterval {
      contract_id: decode_uuid(&self.contract_id)?,
      status:      decode_status(&self.status)?,
      valid_from:  decode_date(&self.valid_from)?,
      valid_to:    self.valid_to.as_deref().map(decode_date).transpose()?,
    })
  }
}

/// Raw strings read directly from a `contracts` row.
pub struct RawContract {
  pub contract_id:  String,
  pub start_date:   String,
  pub end_date:     String,
  pub created_at:   String,
  pub property_ref: Option<String>,
  pub tenant_ref:   Option<String>,
  pub monthly_rent: Option<String>,
  pub deposit:      Option<String>,
  pub note:         Option<String>,
}

impl RawContract {
  /// Column order expected by [`Self::from_row`], qualified with `c.`.
  pub const COLUMNS: &'static str = "c.contract_id, c.start_date, c.end_date, c.created_at,
     c.property_ref, c.tenant_ref, c.monthly_rent, c.deposit, c.note";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      contract_id:  row.get(0)?,
      start_date:   row.get(1)?,
      end_date:     row.get(2)?,
      created_at:   row.get(3)?,
      property_ref: row.get(4)?,
      tenant_ref:   row.get(5)?,
      monthly_rent: row.get(6)?,
      deposit:      row.get(7)?,
      note:         row.get(8)?,
    })
  }

  pub fn into_contract(self) -> Result<Contract> {
    Ok(Contract {
      contract_id:  decode_uuid(&self.contract_id)?,
      start_date:   decode_date(&self.start_date)?,
      end_date:     decode_date(&self.end_date)?,
      created_at:   decode_dt(&self.created_at)?,
      property_ref: self.property_ref,
      tenant_ref:   self.tenant_ref,
      monthly_rent: self.monthly_rent,
      deposit:      self.deposit,
      note:         self.note,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dates_sort_as_text() {
    let a = encode_date(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
    let b = encode_date(NaiveDate::from_ymd_opt(2024, 10, 1).unwrap());
    assert_eq!(a, "2024-06-30");
    assert!(a < b);
  }

  #[test]
  fn unknown_status_is_rejected() {
    assert!(matches!(decode_status("aktivan"), Err(Error::UnknownStatus(_))));
    assert_eq!(decode_status(encode_status(ContractStatus::Expired)).unwrap(), ContractStatus::Expired);
  }
}
