// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Approval queue endpoints (banker/administrator only).

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::operations::LogEntryResponse;
use crate::{
    auth::{require, Auth, Operation, Resource},
    error::ApiError,
    ledger::{Account, LogId, Resolution},
    state::AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PendingActionsResponse {
    /// Oldest first.
    pub actions: Vec<LogEntryResponse>,
    pub total: usize,
}

/// Outcome of validating or declining an action.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResolutionResponse {
    pub entry: LogEntryResponse,
    /// The receiving leg, for transfers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paired: Option<LogEntryResponse>,
    /// Accounts whose balance changed.
    pub accounts: Vec<Account>,
}

impl From<Resolution> for ResolutionResponse {
    fn from(resolution: Resolution) -> Self {
        Self {
            entry: resolution.entry.into(),
            paired: resolution.paired.map(LogEntryResponse::from),
            accounts: resolution.accounts,
        }
    }
}

/// Pending actions awaiting a banker, oldest first.
#[utoipa::path(
    get,
    path = "/pending-actions",
    tag = "Approvals",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Approval queue", body = PendingActionsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn pending_actions(
    Auth(caller): Auth,
    State(state): State<AppState>,
) -> Result<Json<PendingActionsResponse>, ApiError> {
    require(&caller, Resource::Ledger, Operation::ListPending)?;
    let actions: Vec<LogEntryResponse> = state
        .ledger
        .pending_actions()?
        .into_iter()
        .map(LogEntryResponse::from)
        .collect();
    Ok(Json(PendingActionsResponse {
        total: actions.len(),
        actions,
    }))
}

/// Settle a pending action and apply its balance change.
#[utoipa::path(
    post,
    path = "/actions/{log_id}/validate",
    tag = "Approvals",
    security(("bearer_auth" = [])),
    params(("log_id" = u64, Path, description = "Log entry id")),
    responses(
        (status = 200, description = "Action settled", body = ResolutionResponse),
        (status = 400, description = "Insufficient funds or receiving leg"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No pending action with this id")
    )
)]
pub async fn validate_action(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(log_id): Path<LogId>,
) -> Result<Json<ResolutionResponse>, ApiError> {
    require(&caller, Resource::Ledger, Operation::ValidateAction)?;
    let resolution = state.ledger.validate_action(log_id)?;
    Ok(Json(resolution.into()))
}

/// Refuse a pending action. Balances are not touched.
#[utoipa::path(
    post,
    path = "/actions/{log_id}/decline",
    tag = "Approvals",
    security(("bearer_auth" = [])),
    params(("log_id" = u64, Path, description = "Log entry id")),
    responses(
        (status = 200, description = "Action declined", body = ResolutionResponse),
        (status = 400, description = "Receiving leg"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No pending action with this id")
    )
)]
pub async fn decline_action(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(log_id): Path<LogId>,
) -> Result<Json<ResolutionResponse>, ApiError> {
    require(&caller, Resource::Ledger, Operation::DeclineAction)?;
    let resolution = state.ledger.decline_action(log_id)?;
    Ok(Json(resolution.into()))
}
