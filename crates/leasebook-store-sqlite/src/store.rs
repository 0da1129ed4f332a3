//! [`SqliteStore`]: the SQLite implementation of [`StatusHistoryStore`] and
//! [`ContractDirectory`].

use std::path::Path;

use chrono::{NaiveDate, Utc};
use leasebook_core::{
  contract::{Contract, NewContract},
  interval::{StatusHistory, StatusInterval},
  status::ContractStatus,
  store::{ContractDirectory, StatusHistoryStore},
  transition::{self, Transition},
};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    RawContract, RawInterval, decode_date, encode_date, encode_dt, encode_status, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Leasebook store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store: useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` inside one `BEGIN IMMEDIATE` transaction on the connection
  /// thread. The transaction commits only if `f` returns `Ok`.
  async fn write_tx<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(in_immediate_tx(conn, f))).await?
  }

  /// Run a read-only closure on the connection thread.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(&*conn))).await?
  }
}

fn in_immediate_tx<T>(
  conn: &mut Connection,
  f:    impl FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
) -> Result<T> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let out = f(&tx)?;
  tx.commit()?;
  Ok(out)
}

// ─── Row helpers (run on the connection thread) ──────────────────────────────

fn contract_exists(conn: &Connection, id: &str) -> Result<bool> {
  Ok(
    conn
      .query_row("SELECT 1 FROM contracts WHERE contract_id = ?1", [id], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

/// The open interval and its `seq`, if any.
fn open_row(conn: &Connection, id: &str) -> Result<Option<(i64, StatusInterval)>> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {} FROM status_intervals WHERE contract_id = ?1 AND valid_to IS NULL",
        RawInterval::COLUMNS
      ),
      [id],
      RawInterval::from_row,
    )
    .optional()?;

  raw
    .map(|r| {
      let seq = r.seq;
      r.into_interval().map(|i| (seq, i))
    })
    .transpose()
}

/// `valid_to` of the most recent interval, if it is closed.
fn last_valid_to(conn: &Connection, id: &str) -> Result<Option<NaiveDate>> {
  let raw: Option<Option<String>> = conn
    .query_row(
      "SELECT valid_to FROM status_intervals WHERE contract_id = ?1 ORDER BY seq DESC LIMIT 1",
      [id],
      |r| r.get(0),
    )
    .optional()?;
  raw.flatten().as_deref().map(decode_date).transpose()
}

fn next_seq(conn: &Connection, id: &str) -> Result<i64> {
  Ok(conn.query_row(
    "SELECT COALESCE(MAX(seq), 0) + 1 FROM status_intervals WHERE contract_id = ?1",
    [id],
    |r| r.get(0),
  )?)
}

fn insert_interval(conn: &Connection, seq: i64, interval: &StatusInterval) -> Result<()> {
  conn.execute(
    "INSERT INTO status_intervals (contract_id, seq, status, valid_from, valid_to)
     VALUES (?1, ?2, ?3, ?4, NULL)",
    rusqlite::params![
      encode_uuid(interval.contract_id),
      seq,
      encode_status(interval.status),
      encode_date(interval.valid_from),
    ],
  )?;
  Ok(())
}

fn close_interval(conn: &Connection, id: &str, seq: i64, valid_to: NaiveDate) -> Result<()> {
  conn.execute(
    "UPDATE status_intervals SET valid_to = ?3
     WHERE contract_id = ?1 AND seq = ?2 AND valid_to IS NULL",
    rusqlite::params![id, seq, encode_date(valid_to)],
  )?;
  Ok(())
}

// ─── StatusHistoryStore impl ─────────────────────────────────────────────────

impl StatusHistoryStore for SqliteStore {
  type Error = crate::Error;

  async fn append_open_interval(
    &self,
    contract_id: Uuid,
    status:      ContractStatus,
    valid_from:  NaiveDate,
  ) -> Result<StatusInterval> {
    let interval = StatusInterval::open(contract_id, status, valid_from);
    let row = interval.clone();

    self
      .write_tx(move |tx| {
        let id = encode_uuid(contract_id);
        if !contract_exists(tx, &id)? {
          return Err(leasebook_core::Error::ContractNotFound(contract_id).into());
        }
        if open_row(tx, &id)?.is_some() {
          return Err(leasebook_core::Error::AlreadyOpen(contract_id).into());
        }
        if let Some(previous_end) = last_valid_to(tx, &id)?
          && valid_from < previous_end
        {
          return Err(leasebook_core::Error::OverlapsPrevious { valid_from, previous_end }.into());
        }
        insert_interval(tx, next_seq(tx, &id)?, &row)
      })
      .await?;

    Ok(interval)
  }

  async fn close_open_interval(&self, contract_id: Uuid, valid_to: NaiveDate) -> Result<StatusInterval> {
    self
      .write_tx(move |tx| {
        let id = encode_uuid(contract_id);
        let (seq, open) =
          open_row(tx, &id)?.ok_or(leasebook_core::Error::NoOpenInterval(contract_id))?;
        if valid_to < open.valid_from {
          return Err(
            leasebook_core::Error::Backdated { effective: valid_to, valid_from: open.valid_from }
              .into(),
          );
        }
        close_interval(tx, &id, seq, valid_to)?;
        Ok(StatusInterval { valid_to: Some(valid_to), ..open })
      })
      .await
  }

  async fn open_interval(&self, contract_id: Uuid) -> Result<Option<StatusInterval>> {
    let id = encode_uuid(contract_id);
    let open = self.read(move |conn| open_row(conn, &id)).await?;
    Ok(open.map(|(_, interval)| interval))
  }

  async fn list_history(&self, contract_id: Uuid) -> Result<StatusHistory> {
    let id = encode_uuid(contract_id);

    let raws: Vec<RawInterval> = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM status_intervals WHERE contract_id = ?1 ORDER BY seq",
          RawInterval::COLUMNS
        ))?;
        let rows = stmt
          .query_map([id], RawInterval::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let intervals = raws
      .into_iter()
      .map(RawInterval::into_interval)
      .collect::<Result<Vec<_>>>()?;
    Ok(StatusHistory::new(intervals))
  }

  async fn set_status(
    &self,
    contract_id: Uuid,
    status:      ContractStatus,
    effective:   NaiveDate,
  ) -> Result<Transition> {
    self
      .write_tx(move |tx| {
        let id = encode_uuid(contract_id);
        if !contract_exists(tx, &id)? {
          return Err(leasebook_core::Error::ContractNotFound(contract_id).into());
        }
        let (seq, open) =
          open_row(tx, &id)?.ok_or(leasebook_core::Error::NoOpenInterval(contract_id))?;

        let transition = transition::plan(&open, status, effective)?;
        if let Transition::Advanced { opened, .. } = &transition {
          close_interval(tx, &id, seq, effective)?;
          insert_interval(tx, next_seq(tx, &id)?, opened)?;
        }
        Ok(transition)
      })
      .await
  }
}

// ─── ContractDirectory impl ──────────────────────────────────────────────────

impl ContractDirectory for SqliteStore {
  async fn create_contract(&self, input: NewContract) -> Result<Contract> {
    input.validate()?;
    let contract = input.into_contract(Uuid::new_v4(), Utc::now());
    let row = contract.clone();

    self
      .write_tx(move |tx| {
        tx.execute(
          "INSERT INTO contracts (
             contract_id, start_date, end_date, created_at,
             property_ref, tenant_ref, monthly_rent, deposit, note
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            encode_uuid(row.contract_id),
            encode_date(row.start_date),
            encode_date(row.end_date),
            encode_dt(row.created_at),
            row.property_ref,
            row.tenant_ref,
            row.monthly_rent,
            row.deposit,
            row.note,
          ],
        )?;
        let first = StatusInterval::open(row.contract_id, ContractStatus::INITIAL, row.start_date);
        insert_interval(tx, 1, &first)
      })
      .await?;

    tracing::debug!(contract_id = %contract.contract_id, "contract created");
    Ok(contract)
  }

  async fn get_contract(&self, contract_id: Uuid) -> Result<Option<Contract>> {
    let id = encode_uuid(contract_id);

    let raw: Option<RawContract> = self
      .read(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM contracts c WHERE c.contract_id = ?1", RawContract::COLUMNS),
              [id],
              RawContract::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContract::into_contract).transpose()
  }

  async fn list_contracts(&self) -> Result<Vec<Contract>> {
    let raws: Vec<RawContract> = self
      .read(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM contracts c ORDER BY c.start_date, c.created_at",
          RawContract::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawContract::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContract::into_contract).collect()
  }

  async fn expiry_candidates(&self, as_of: NaiveDate) -> Result<Vec<Contract>> {
    let as_of_str = encode_date(as_of);

    let raws: Vec<RawContract> = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {}
           FROM contracts c
           JOIN status_intervals s
             ON s.contract_id = c.contract_id AND s.valid_to IS NULL
           WHERE c.end_date < ?1
             AND s.status = 'active'
           ORDER BY c.end_date, c.contract_id",
          RawContract::COLUMNS
        ))?;
        let rows = stmt
          .query_map([as_of_str], RawContract::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContract::into_contract).collect()
  }
}
