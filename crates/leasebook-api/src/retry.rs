//! Bounded retries for writes that lost a race.
//!
//! The core never retries on its own. Handlers wrap their writes in
//! [`on_conflict`] so a request that collides with another writer gets a few
//! more attempts before the conflict is reported.

use std::{future::Future, time::Duration};

use leasebook_core::{Classify, ErrorKind};

/// Total attempts, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubles on each further retry.
pub const BASE_BACKOFF: Duration = Duration::from_millis(10);

/// Run `op` until it succeeds, fails with something other than a conflict,
/// or has been attempted [`MAX_ATTEMPTS`] times.
pub async fn on_conflict<T, E, F, Fut>(mut op: F) -> Result<T, E>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
  E: Classify + std::fmt::Display,
{
  let mut attempt = 1;
  loop {
    match op().await {
      Err(e) if e.kind() == ErrorKind::Conflict && attempt < MAX_ATTEMPTS => {
        let delay = BASE_BACKOFF * 2u32.pow(attempt - 1);
        tracing::warn!(attempt, ?delay, error = %e, "write conflict; retrying");
        tokio::time::sleep(delay).await;
        attempt += 1;
      }
      other => return other,
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};

  use leasebook_core::Error;
  use uuid::Uuid;

  use super::*;

  #[tokio::test]
  async fn gives_up_after_max_attempts() {
    let calls = AtomicU32::new(0);
    let result: Result<(), Error> = on_conflict(|| async {
      calls.fetch_add(1, Ordering::SeqCst);
      Err(Error::Conflict(Uuid::nil()))
    })
    .await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::Conflict);
    assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
  }

  #[tokio::test]
  async fn recovers_after_one_conflict() {
    let calls = AtomicU32::new(0);
    let result = on_conflict(|| async {
      if calls.fetch_add(1, Ordering::SeqCst) == 0 {
        Err(Error::Conflict(Uuid::nil()))
      } else {
        Ok(7)
      }
    })
    .await;

    assert_eq!(result.unwrap(), 7);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn other_errors_are_not_retried() {
    let calls = AtomicU32::new(0);
    let result: Result<(), Error> = on_conflict(|| async {
      calls.fetch_add(1, Ordering::SeqCst);
      Err(Error::NoOpenInterval(Uuid::nil()))
    })
    .await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}
