//! Error type for `leasebook-store-sqlite`.

use leasebook_core::{Classify, ErrorKind};
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] leasebook_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown status in store: {0:?}")]
  UnknownStatus(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Whether SQLite reported a lost race: another connection holds the write
/// lock, or the one-open-interval index rejected an insert.
fn is_conflict(e: &rusqlite::Error) -> bool {
  match e {
    rusqlite::Error::SqliteFailure(f, _) => {
      matches!(f.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        || f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    }
    _ => false,
  }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::Core(e) => e.kind(),
      Error::Sqlite(e) | Error::Database(tokio_rusqlite::Error::Rusqlite(e)) if is_conflict(e) => {
        ErrorKind::Conflict
      }
      _ => ErrorKind::Storage,
    }
  }
}
