//! Expiry sweep, on demand and ahead of requests.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Request, State},
  middleware::Next,
  response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use leasebook_core::store::ContractDirectory;
use serde::{Deserialize, Serialize};

use crate::{ApiState, error::ApiError, retry};

#[derive(Debug, Default, Deserialize)]
pub struct SweepBody {
  #[serde(default)]
  pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct SweepReport {
  pub as_of:        NaiveDate,
  pub transitioned: usize,
}

/// `POST /sweep` with no body, `{}`, or `{"as_of":"2024-07-01"}`.
pub async fn run<S>(
  State(state): State<Arc<ApiState<S>>>,
  body: Option<Json<SweepBody>>,
) -> Result<Json<SweepReport>, ApiError>
where
  S: ContractDirectory + 'static,
{
  let service = &state.service;
  let as_of = body
    .and_then(|Json(b)| b.as_of)
    .unwrap_or_else(|| service.today());
  let transitioned = retry::on_conflict(move || service.sweep_expired(as_of))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(SweepReport { as_of, transitioned }))
}

/// Middleware that expires overdue contracts before the wrapped handler runs,
/// so reads never report `active` past a contract's end date.
pub async fn refresh_before<S>(
  State(state): State<Arc<ApiState<S>>>,
  req: Request,
  next: Next,
) -> Response
where
  S: ContractDirectory + 'static,
{
  let service = &state.service;
  if let Err(e) = retry::on_conflict(move || service.refresh()).await {
    tracing::error!(error = %e, "expiry sweep before request failed");
    return ApiError::store(e).into_response();
  }
  next.run(req).await
}
