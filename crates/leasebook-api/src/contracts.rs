//! Handlers for `/contracts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/contracts` | Optional `?status=active\|expired\|terminated` and `as_of` |
//! | `POST` | `/contracts` | Body: [`NewContract`]; returns 201 + stored contract |
//! | `GET`  | `/contracts/:id` | Contract plus its status today; 404 if not found |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use leasebook_core::{
  Classify as _, ErrorKind,
  contract::{Contract, ContractOverview, NewContract},
  status::ContractStatus,
  store::ContractDirectory,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, error::ApiError, retry};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<ContractStatus>,
  /// Defaults to today.
  pub as_of:  Option<NaiveDate>,
}

/// `GET /contracts[?status=<status>][&as_of=YYYY-MM-DD]`
pub async fn list<S>(
  State(state): State<Arc<ApiState<S>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ContractOverview>>, ApiError>
where
  S: ContractDirectory + 'static,
{
  let rows = state
    .service
    .contract_overview(params.status, params.as_of)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /contracts` with body `{"start_date":"2024-01-01","end_date":"2024-06-30", ...}`
///
/// The contract's first status interval is opened in the same unit of work.
pub async fn create<S>(
  State(state): State<Arc<ApiState<S>>>,
  Json(body): Json<NewContract>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ContractDirectory + 'static,
{
  let store = state.service.store().as_ref();
  let contract = retry::on_conflict(move || store.create_contract(body.clone()))
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(contract)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ContractDetail {
  pub contract: Contract,
  pub as_of:    NaiveDate,
  /// `None` if the contract has not started yet.
  pub status:   Option<ContractStatus>,
}

/// `GET /contracts/:id`
pub async fn get_one<S>(
  State(state): State<Arc<ApiState<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ContractDetail>, ApiError>
where
  S: ContractDirectory + 'static,
{
  let contract = state
    .service
    .store()
    .get_contract(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("contract {id} not found")))?;

  let as_of = state.service.today();
  let status = match state.service.current_status(id, Some(as_of)).await {
    Ok(s) => Some(s),
    Err(e) if e.kind() == ErrorKind::OutOfRange => None,
    Err(e) => return Err(ApiError::store(e)),
  };

  Ok(Json(ContractDetail { contract, as_of, status }))
}
