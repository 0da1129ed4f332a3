//! Contract status values and the edges allowed between them.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// The status a contract holds over one interval of its history.
///
/// `Active` is the only initial status. `Expired` and `Terminated` are both
/// terminal: once reached, nothing moves a contract out of them.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContractStatus {
  Active,
  Expired,
  Terminated,
}

impl ContractStatus {
  /// The status every new contract starts in.
  pub const INITIAL: Self = Self::Active;

  pub fn is_terminal(self) -> bool {
    match self {
      Self::Active => false,
      Self::Expired | Self::Terminated => true,
    }
  }

  /// Whether `self → next` is an edge of the status machine. Staying in the
  /// same status is not an edge; the transition engine treats it as a no-op.
  pub fn can_transition_to(self, next: Self) -> bool {
    match (self, next) {
      (Self::Active, Self::Expired | Self::Terminated) => true,
      (Self::Active, Self::Active)
      | (Self::Expired, _)
      | (Self::Terminated, _) => false,
    }
  }
}
