//! [`StatusService`]: the operations the surrounding application calls.
//!
//! Ties a store, which provides the atomic units, to a clock, which decides
//! what "today" means. The service itself keeps no state.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  Error,
  clock::{Clock, SystemClock},
  contract::ContractOverview,
  error::{Classify, ErrorKind},
  interval::StatusHistory,
  status::ContractStatus,
  store::ContractDirectory,
  transition::Transition,
  view,
};

pub struct StatusService<S, C = SystemClock> {
  store: Arc<S>,
  clock: C,
}

impl<S, C: Clone> Clone for StatusService<S, C> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), clock: self.clock.clone() }
  }
}

impl<S: ContractDirectory, C: Clock> StatusService<S, C> {
  pub fn with_clock(store: Arc<S>, clock: C) -> Self { Self { store, clock } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn today(&self) -> NaiveDate { self.clock.today() }

  // ── Transitions ───────────────────────────────────────────────────────────

  /// Move a contract to `status` from `effective` onward. Re-requesting the
  /// current status succeeds without writing anything.
  pub async fn set_status(
    &self,
    contract_id: Uuid,
    status: ContractStatus,
    effective: NaiveDate,
  ) -> Result<Transition, S::Error> {
    let transition = self.store.set_status(contract_id, status, effective).await?;
    match &transition {
      Transition::Advanced { closed, opened } => tracing::info!(
        %contract_id,
        from = %closed.status,
        to = %opened.status,
        %effective,
        "contract status changed"
      ),
      Transition::Unchanged { current } => tracing::debug!(
        %contract_id,
        status = %current.status,
        "contract already holds requested status"
      ),
    }
    Ok(transition)
  }

  /// Terminate a contract as of `date`. No further status change is accepted
  /// afterwards.
  pub async fn terminate(&self, contract_id: Uuid, date: NaiveDate) -> Result<Transition, S::Error> {
    self.set_status(contract_id, ContractStatus::Terminated, date).await
  }

  // ── Sweeps ────────────────────────────────────────────────────────────────

  /// Expire every still-active contract whose end date is before `as_of`.
  ///
  /// The expiry takes effect on the contract's own end date, however late
  /// the sweep runs. Returns the number of contracts transitioned. Each
  /// contract is its own atomic unit: if one fails, the ones before it stay
  /// expired and the error is returned.
  pub async fn sweep_expired(&self, as_of: NaiveDate) -> Result<usize, S::Error> {
    let candidates = self.store.expiry_candidates(as_of).await?;
    let mut transitioned = 0;

    for contract in candidates {
      let id = contract.contract_id;
      match self.store.set_status(id, ContractStatus::Expired, contract.end_date).await {
        Ok(t) if t.is_change() => {
          tracing::info!(contract_id = %id, end_date = %contract.end_date, "contract expired");
          transitioned += 1;
        }
        Ok(_) => {}
        // Terminated by someone else after it was selected.
        Err(e) if e.kind() == ErrorKind::TerminalState => {
          tracing::debug!(contract_id = %id, "sweep candidate left active before expiry; skipped");
        }
        Err(e) => return Err(e),
      }
    }

    if transitioned > 0 {
      tracing::info!(%as_of, transitioned, "expiry sweep finished");
    }
    Ok(transitioned)
  }

  /// Sweep as of today.
  pub async fn refresh(&self) -> Result<usize, S::Error> { self.sweep_expired(self.today()).await }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// The status a contract holds on `as_of` (today if `None`). Never writes;
  /// run a sweep first if expiries must be reflected.
  pub async fn current_status(
    &self,
    contract_id: Uuid,
    as_of: Option<NaiveDate>,
  ) -> Result<ContractStatus, S::Error> {
    let history = self.history_of_existing(contract_id).await?;
    let as_of = as_of.unwrap_or_else(|| self.today());
    Ok(view::status_at(contract_id, &history, as_of)?)
  }

  /// Every interval for a contract, oldest first.
  pub async fn list_history(&self, contract_id: Uuid) -> Result<StatusHistory, S::Error> {
    self.history_of_existing(contract_id).await
  }

  /// Contracts with their status on `as_of` (today if `None`), optionally
  /// restricted to one status. Contracts that had not started by `as_of` are
  /// left out.
  pub async fn contract_overview(
    &self,
    status: Option<ContractStatus>,
    as_of: Option<NaiveDate>,
  ) -> Result<Vec<ContractOverview>, S::Error> {
    let as_of = as_of.unwrap_or_else(|| self.today());
    let mut rows = Vec::new();

    for contract in self.store.list_contracts().await? {
      let history = self.store.list_history(contract.contract_id).await?;
      let current = match view::status_at(contract.contract_id, &history, as_of) {
        Ok(s) => s,
        Err(Error::OutOfRange { .. }) => continue,
        Err(e) => return Err(e.into()),
      };
      if status.is_none_or(|wanted| wanted == current) {
        rows.push(ContractOverview { contract, as_of, status: current });
      }
    }
    Ok(rows)
  }

  async fn history_of_existing(&self, contract_id: Uuid) -> Result<StatusHistory, S::Error> {
    if self.store.get_contract(contract_id).await?.is_none() {
      return Err(Error::ContractNotFound(contract_id).into());
    }
    self.store.list_history(contract_id).await
  }
}
