//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use leasebook_core::{Classify, ErrorKind};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("store error: {source}")]
  Store {
    kind:   ErrorKind,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl ApiError {
  /// Wrap a store error, keeping its kind for the status code.
  pub fn store<E>(e: E) -> Self
  where
    E: Classify + std::error::Error + Send + Sync + 'static,
  {
    ApiError::Store { kind: e.kind(), source: Box::new(e) }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      ApiError::NotFound(_) => ErrorKind::NotFound,
      ApiError::Store { kind, .. } => *kind,
    }
  }
}

fn status_for(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::NotFound => StatusCode::NOT_FOUND,
    ErrorKind::InvalidRange | ErrorKind::OutOfRange => StatusCode::UNPROCESSABLE_ENTITY,
    ErrorKind::Conflict | ErrorKind::TerminalState => StatusCode::CONFLICT,
    ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let kind = self.kind();
    let message = match &self {
      ApiError::NotFound(m) => m.clone(),
      ApiError::Store { source, .. } => source.to_string(),
    };
    (status_for(kind), Json(json!({ "error": message, "kind": kind }))).into_response()
  }
}
