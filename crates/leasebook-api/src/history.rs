//! Handlers for a contract's status and status history.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/contracts/:id/status` | Optional `?as_of=YYYY-MM-DD`; defaults to today |
//! | `POST` | `/contracts/:id/status` | Body: [`SetStatusBody`]; returns the [`Transition`] |
//! | `POST` | `/contracts/:id/terminate` | Optional body `{"date":"..."}`; `date` defaults to today |
//! | `GET`  | `/contracts/:id/history` | Every interval, oldest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::NaiveDate;
use leasebook_core::{
  interval::StatusHistory, status::ContractStatus, store::ContractDirectory,
  transition::Transition,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, error::ApiError, retry};

// ─── Current status ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusParams {
  pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct StatusBody {
  pub contract_id: Uuid,
  pub as_of:       NaiveDate,
  pub status:      ContractStatus,
}

/// `GET /contracts/:id/status[?as_of=YYYY-MM-DD]`
pub async fn current<S>(
  State(state): State<Arc<ApiState<S>>>,
  Path(id): Path<Uuid>,
  Query(params): Query<StatusParams>,
) -> Result<Json<StatusBody>, ApiError>
where
  S: ContractDirectory + 'static,
{
  let as_of = params.as_of.unwrap_or_else(|| state.service.today());
  let status = state
    .service
    .current_status(id, Some(as_of))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(StatusBody { contract_id: id, as_of, status }))
}

// ─── Set status ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SetStatusBody {
  pub status:         ContractStatus,
  pub effective_date: NaiveDate,
}

/// `POST /contracts/:id/status` with body `{"status":"expired","effective_date":"2024-06-30"}`
pub async fn set<S>(
  State(state): State<Arc<ApiState<S>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<SetStatusBody>,
) -> Result<Json<Transition>, ApiError>
where
  S: ContractDirectory + 'static,
{
  let service = &state.service;
  let transition = retry::on_conflict(move || service.set_status(id, body.status, body.effective_date))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(transition))
}

// ─── Terminate ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct TerminateBody {
  #[serde(default)]
  pub date: Option<NaiveDate>,
}

/// `POST /contracts/:id/terminate` with no body, `{}`, or `{"date":"2024-03-15"}`.
pub async fn terminate<S>(
  State(state): State<Arc<ApiState<S>>>,
  Path(id): Path<Uuid>,
  body: Option<Json<TerminateBody>>,
) -> Result<Json<Transition>, ApiError>
where
  S: ContractDirectory + 'static,
{
  let service = &state.service;
  let date = body
    .and_then(|Json(b)| b.date)
    .unwrap_or_else(|| service.today());
  let transition = retry::on_conflict(move || service.terminate(id, date))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(transition))
}

// ─── History ─────────────────────────────────────────────────────────────────

/// `GET /contracts/:id/history`
pub async fn list<S>(
  State(state): State<Arc<ApiState<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<StatusHistory>, ApiError>
where
  S: ContractDirectory + 'static,
{
  let history = state.service.list_history(id).await.map_err(ApiError::store)?;
  Ok(Json(history))
}
