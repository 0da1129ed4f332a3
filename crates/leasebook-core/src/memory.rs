//! [`MemoryStore`]: an in-process store for tests and embedding.
//!
//! Each contract's history sits behind its own mutex, so transitions on one
//! contract never wait on another.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
};

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  contract::{Contract, NewContract},
  interval::{StatusHistory, StatusInterval},
  status::ContractStatus,
  store::{ContractDirectory, StatusHistoryStore},
  transition::{self, Transition},
};

type History = Arc<Mutex<Vec<StatusInterval>>>;

#[derive(Debug, Default)]
pub struct MemoryStore {
  contracts: RwLock<HashMap<Uuid, Contract>>,
  histories: RwLock<HashMap<Uuid, History>>,
}

fn lock(history: &History) -> MutexGuard<'_, Vec<StatusInterval>> {
  history.lock().unwrap_or_else(PoisonError::into_inner)
}

fn open_of(contract_id: Uuid, intervals: &[StatusInterval]) -> Result<StatusInterval> {
  intervals
    .last()
    .filter(|i| i.is_open())
    .cloned()
    .ok_or(Error::NoOpenInterval(contract_id))
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn history(&self, contract_id: Uuid) -> Option<History> {
    self
      .histories
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&contract_id)
      .cloned()
  }
}

// ─── StatusHistoryStore impl ─────────────────────────────────────────────────

impl StatusHistoryStore for MemoryStore {
  type Error = Error;

  async fn append_open_interval(
    &self,
    contract_id: Uuid,
    status:      ContractStatus,
    valid_from:  NaiveDate,
  ) -> Result<StatusInterval> {
    let history = self.history(contract_id).ok_or(Error::ContractNotFound(contract_id))?;
    let mut intervals = lock(&history);

    if intervals.last().is_some_and(StatusInterval::is_open) {
      return Err(Error::AlreadyOpen(contract_id));
    }
    if let Some(previous_end) = intervals.last().and_then(|i| i.valid_to)
      && valid_from < previous_end
    {
      return Err(Error::OverlapsPrevious { valid_from, previous_end });
    }
    let interval = StatusInterval::open(contract_id, status, valid_from);
    intervals.push(interval.clone());
    Ok(interval)
  }

  async fn close_open_interval(&self, contract_id: Uuid, valid_to: NaiveDate) -> Result<StatusInterval> {
    let history = self.history(contract_id).ok_or(Error::NoOpenInterval(contract_id))?;
    let mut intervals = lock(&history);

    let last = intervals
      .last_mut()
      .filter(|i| i.is_open())
      .ok_or(Error::NoOpenInterval(contract_id))?;
    if valid_to < last.valid_from {
      return Err(Error::Backdated { effective: valid_to, valid_from: last.valid_from });
    }
    last.valid_to = Some(valid_to);
    Ok(last.clone())
  }

  async fn open_interval(&self, contract_id: Uuid) -> Result<Option<StatusInterval>> {
    Ok(
      self
        .history(contract_id)
        .and_then(|h| lock(&h).last().filter(|i| i.is_open()).cloned()),
    )
  }

  async fn list_history(&self, contract_id: Uuid) -> Result<StatusHistory> {
    let intervals = self
      .history(contract_id)
      .map(|h| lock(&h).clone())
      .unwrap_or_default();
    Ok(StatusHistory::new(intervals))
  }

  async fn set_status(
    &self,
    contract_id: Uuid,
    status:      ContractStatus,
    effective:   NaiveDate,
  ) -> Result<Transition> {
    let history = self.history(contract_id).ok_or(Error::ContractNotFound(contract_id))?;
    let mut intervals = lock(&history);

    let open = open_of(contract_id, &intervals)?;
    let transition = transition::plan(&open, status, effective)?;

    if let Transition::Advanced { closed, opened } = &transition {
      if let Some(last) = intervals.last_mut() {
        *last = closed.clone();
      }
      intervals.push(opened.clone());
    }
    Ok(transition)
  }
}

// ─── ContractDirectory impl ──────────────────────────────────────────────────

impl ContractDirectory for MemoryStore {
  async fn create_contract(&self, input: NewContract) -> Result<Contract> {
    input.validate()?;
    let contract = input.into_contract(Uuid::new_v4(), Utc::now());
    let first = StatusInterval::open(contract.contract_id, ContractStatus::INITIAL, contract.start_date);

    // Both maps are held so the contract and its first interval appear together.
    let mut contracts = self.contracts.write().unwrap_or_else(PoisonError::into_inner);
    let mut histories = self.histories.write().unwrap_or_else(PoisonError::into_inner);
    if contracts.contains_key(&contract.contract_id) {
      return Err(Error::ContractExists(contract.contract_id));
    }
    histories.insert(contract.contract_id, Arc::new(Mutex::new(vec![first])));
    contracts.insert(contract.contract_id, contract.clone());
    Ok(contract)
  }

  async fn get_contract(&self, contract_id: Uuid) -> Result<Option<Contract>> {
    Ok(
      self
        .contracts
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&contract_id)
        .cloned(),
    )
  }

  async fn list_contracts(&self) -> Result<Vec<Contract>> {
    let mut all: Vec<Contract> = self
      .contracts
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .values()
      .cloned()
      .collect();
    all.sort_by_key(|c| (c.start_date, c.created_at));
    Ok(all)
  }

  async fn expiry_candidates(&self, as_of: NaiveDate) -> Result<Vec<Contract>> {
    let overdue: Vec<Contract> = self
      .list_contracts()
      .await?
      .into_iter()
      .filter(|c| c.end_date < as_of)
      .collect();

    let mut candidates = Vec::with_capacity(overdue.len());
    for contract in overdue {
      let open = self.open_interval(contract.contract_id).await?;
      if open.is_some_and(|i| i.status == ContractStatus::Active) {
        candidates.push(contract);
      }
    }
    Ok(candidates)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ErrorKind, error::Classify as _};

  fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

  #[tokio::test]
  async fn create_seeds_open_active_interval() {
    let s = MemoryStore::new();
    let c = s.create_contract(NewContract::new(d(2024, 1, 1), d(2024, 6, 30))).await.unwrap();

    let history = s.list_history(c.contract_id).await.unwrap();
    assert_eq!(history.len(), 1);
    let first = history.first().unwrap();
    assert_eq!(first.status, ContractStatus::Active);
    assert_eq!(first.valid_from, d(2024, 1, 1));
    assert!(first.is_open());
  }

  #[tokio::test]
  async fn create_rejects_inverted_dates_and_writes_nothing() {
    let s = MemoryStore::new();
    let err = s
      .create_contract(NewContract::new(d(2024, 6, 30), d(2024, 1, 1)))
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRange);
    assert!(s.list_contracts().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn append_while_open_conflicts() {
    let s = MemoryStore::new();
    let c = s.create_contract(NewContract::new(d(2024, 1, 1), d(2024, 6, 30))).await.unwrap();
    let err = s
      .append_open_interval(c.contract_id, ContractStatus::Expired, d(2024, 2, 1))
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
  }

  #[tokio::test]
  async fn close_then_append() {
    let s = MemoryStore::new();
    let c = s.create_contract(NewContract::new(d(2024, 1, 1), d(2024, 6, 30))).await.unwrap();

    let err = s.close_open_interval(c.contract_id, d(2023, 1, 1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRange);

    let closed = s.close_open_interval(c.contract_id, d(2024, 2, 1)).await.unwrap();
    assert_eq!(closed.valid_to, Some(d(2024, 2, 1)));
    assert!(s.open_interval(c.contract_id).await.unwrap().is_none());

    let err = s.close_open_interval(c.contract_id, d(2024, 3, 1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    s.append_open_interval(c.contract_id, ContractStatus::Terminated, d(2024, 2, 1))
      .await
      .unwrap();
    let history = s.list_history(c.contract_id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.validate(), Ok(()));
  }

  #[tokio::test]
  async fn append_before_previous_end_is_rejected() {
    let s = MemoryStore::new();
    let c = s.create_contract(NewContract::new(d(2024, 1, 1), d(2024, 6, 30))).await.unwrap();
    s.close_open_interval(c.contract_id, d(2024, 3, 1)).await.unwrap();

    let err = s
      .append_open_interval(c.contract_id, ContractStatus::Terminated, d(2023, 6, 1))
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRange);

    let history = s.list_history(c.contract_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history.validate(), Ok(()));

    // Starting exactly where the previous interval ended is fine.
    s.append_open_interval(c.contract_id, ContractStatus::Terminated, d(2024, 3, 1))
      .await
      .unwrap();
    assert_eq!(s.list_history(c.contract_id).await.unwrap().validate(), Ok(()));
  }

  #[tokio::test]
  async fn set_status_on_unknown_contract_is_not_found() {
    let s = MemoryStore::new();
    let err = s
      .set_status(Uuid::new_v4(), ContractStatus::Terminated, d(2024, 1, 1))
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  #[tokio::test]
  async fn failed_set_status_leaves_history_untouched() {
    let s = MemoryStore::new();
    let c = s.create_contract(NewContract::new(d(2024, 1, 1), d(2024, 6, 30))).await.unwrap();
    let before = s.list_history(c.contract_id).await.unwrap();

    s.set_status(c.contract_id, ContractStatus::Expired, d(2023, 1, 1))
      .await
      .unwrap_err();
    assert_eq!(s.list_history(c.contract_id).await.unwrap(), before);
  }

  #[tokio::test]
  async fn expiry_candidates_skip_non_active_and_current() {
    let s = MemoryStore::new();
    let overdue = s.create_contract(NewContract::new(d(2024, 1, 1), d(2024, 6, 30))).await.unwrap();
    let current = s.create_contract(NewContract::new(d(2024, 1, 1), d(2024, 12, 31))).await.unwrap();
    let ended_today = s.create_contract(NewContract::new(d(2024, 1, 1), d(2024, 7, 1))).await.unwrap();
    let terminated = s.create_contract(NewContract::new(d(2024, 1, 1), d(2024, 5, 31))).await.unwrap();
    s.set_status(terminated.contract_id, ContractStatus::Terminated, d(2024, 3, 1))
      .await
      .unwrap();

    let ids: Vec<_> = s
      .expiry_candidates(d(2024, 7, 1))
      .await
      .unwrap()
      .into_iter()
      .map(|c| c.contract_id)
      .collect();
    assert_eq!(ids, [overdue.contract_id]);
    assert!(!ids.contains(&current.contract_id));
    assert!(!ids.contains(&ended_today.contract_id));
  }
}
