//! Contract: the directory record whose status history the core tracks.
//!
//! Only `start_date` and `end_date` matter to the status machinery. The rest
//! is descriptive and passes through untouched.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, status::ContractStatus};

/// A rental agreement between a property owner and a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
  pub contract_id:  Uuid,
  pub start_date:   NaiveDate,
  pub end_date:     NaiveDate,
  /// Server-assigned timestamp; never changes after creation.
  pub created_at:   DateTime<Utc>,
  /// Opaque reference to the rented property in the property directory.
  pub property_ref: Option<String>,
  /// Opaque reference to the tenant in the user directory.
  pub tenant_ref:   Option<String>,
  /// Decimal amount kept verbatim; the core does no arithmetic on it.
  pub monthly_rent: Option<String>,
  pub deposit:      Option<String>,
  pub note:         Option<String>,
}

/// Input to [`crate::store::ContractDirectory::create_contract`].
/// `contract_id` and `created_at` are assigned by the directory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewContract {
  pub start_date:   NaiveDate,
  pub end_date:     NaiveDate,
  #[serde(default)]
  pub property_ref: Option<String>,
  #[serde(default)]
  pub tenant_ref:   Option<String>,
  #[serde(default)]
  pub monthly_rent: Option<String>,
  #[serde(default)]
  pub deposit:      Option<String>,
  #[serde(default)]
  pub note:         Option<String>,
}

impl NewContract {
  /// Convenience constructor with all descriptive fields empty.
  pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
    Self { start_date, end_date, ..Default::default() }
  }

  /// Reject date ranges that end before they start.
  pub fn validate(&self) -> Result<()> {
    if self.end_date < self.start_date {
      return Err(Error::EndBeforeStart {
        start_date: self.start_date,
        end_date:   self.end_date,
      });
    }
    Ok(())
  }

  /// Build the persisted record.
  pub fn into_contract(self, contract_id: Uuid, created_at: DateTime<Utc>) -> Contract {
    Contract {
      contract_id,
      start_date: self.start_date,
      end_date: self.end_date,
      created_at,
      property_ref: self.property_ref,
      tenant_ref: self.tenant_ref,
      monthly_rent: self.monthly_rent,
      deposit: self.deposit,
      note: self.note,
    }
  }
}

/// A contract bundled with its status as of some date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractOverview {
  pub contract: Contract,
  pub as_of:    NaiveDate,
  pub status:   ContractStatus,
}
