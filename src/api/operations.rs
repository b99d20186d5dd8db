// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balance-affecting endpoints and account history.
//!
//! Only the account owner may initiate deposits, withdrawals, and transfers.
//! Whether the action settles now or waits for a banker depends on the
//! ledger's settlement mode.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::{require, Auth, Operation, Resource},
    error::ApiError,
    ledger::{Account, AccountId, EntryStatus, LedgerError, LogEntry},
    state::AppState,
};

/// A log entry with its derived settlement status.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogEntryResponse {
    #[serde(flatten)]
    pub entry: LogEntry,
    pub status: EntryStatus,
}

impl From<LogEntry> for LogEntryResponse {
    fn from(entry: LogEntry) -> Self {
        Self {
            status: entry.status(),
            entry,
        }
    }
}

/// Request to change a balance.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceUpdateRequest {
    /// `deposit` or `withdraw`.
    pub action: String,
    /// Strictly positive, at most two decimals.
    #[schema(value_type = String, example = "40.00")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceUpdateResponse {
    /// Account as committed (unchanged while the action is pending).
    pub account: Account,
    pub entry: LogEntryResponse,
}

/// Request to move money to another account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferRequest {
    pub target_account_id: AccountId,
    #[schema(value_type = String, example = "40.00")]
    pub amount: Decimal,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferResponse {
    pub source: Account,
    pub target: Account,
    /// Leg recorded on the source account.
    pub sent: LogEntryResponse,
    /// Leg recorded on the target account.
    pub received: LogEntryResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogListResponse {
    /// Newest first.
    pub logs: Vec<LogEntryResponse>,
    pub total: usize,
}

enum BalanceAction {
    Deposit,
    Withdraw,
}

fn parse_action(raw: &str) -> Result<BalanceAction, LedgerError> {
    match raw.trim().to_lowercase().as_str() {
        "deposit" => Ok(BalanceAction::Deposit),
        "withdraw" | "withdrawal" => Ok(BalanceAction::Withdraw),
        other => Err(LedgerError::InvalidOperation(format!(
            "unknown balance action: {other}"
        ))),
    }
}

/// Deposit into or withdraw from an account.
#[utoipa::path(
    post,
    path = "/accounts/{account_id}/balance",
    tag = "Operations",
    security(("bearer_auth" = [])),
    params(("account_id" = u64, Path, description = "Account id")),
    request_body = BalanceUpdateRequest,
    responses(
        (status = 201, description = "Action recorded", body = BalanceUpdateResponse),
        (status = 400, description = "Invalid amount, unknown action, or insufficient funds"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner, or no such account")
    )
)]
pub async fn update_balance(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
    Json(request): Json<BalanceUpdateRequest>,
) -> Result<(StatusCode, Json<BalanceUpdateResponse>), ApiError> {
    let action = parse_action(&request.action)?;
    let account = state.ledger.find_account(account_id)?;
    let operation = match action {
        BalanceAction::Deposit => Operation::Deposit,
        BalanceAction::Withdraw => Operation::Withdraw,
    };
    require(&caller, Resource::Account(account.as_ref()), operation)?;

    let receipt = match action {
        BalanceAction::Deposit => state.ledger.deposit(account_id, request.amount)?,
        BalanceAction::Withdraw => state.ledger.withdraw(account_id, request.amount)?,
    };

    Ok((
        StatusCode::CREATED,
        Json(BalanceUpdateResponse {
            account: receipt.account,
            entry: receipt.entry.into(),
        }),
    ))
}

/// Transfer money from an owned account to another account.
#[utoipa::path(
    post,
    path = "/accounts/{account_id}/transfer",
    tag = "Operations",
    security(("bearer_auth" = [])),
    params(("account_id" = u64, Path, description = "Source account id")),
    request_body = TransferRequest,
    responses(
        (status = 201, description = "Transfer recorded", body = TransferResponse),
        (status = 400, description = "Invalid amount, same account, or insufficient funds"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner of the source account"),
        (status = 404, description = "Target account not found")
    )
)]
pub async fn transfer(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<TransferResponse>), ApiError> {
    let source = state.ledger.find_account(account_id)?;
    require(&caller, Resource::Account(source.as_ref()), Operation::Transfer)?;

    let memo = request
        .memo
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());
    let receipt = state
        .ledger
        .transfer(account_id, request.target_account_id, request.amount, memo)?;

    Ok((
        StatusCode::CREATED,
        Json(TransferResponse {
            source: receipt.source,
            target: receipt.target,
            sent: receipt.entries.sent.into(),
            received: receipt.entries.received.into(),
        }),
    ))
}

fn account_logs(
    caller: &crate::auth::Identity,
    state: &AppState,
    account_id: AccountId,
    limit: Option<usize>,
) -> Result<Json<LogListResponse>, ApiError> {
    let account = state.ledger.find_account(account_id)?;
    require(caller, Resource::Account(account.as_ref()), Operation::ReadLogs)?;

    let logs: Vec<LogEntryResponse> = state
        .ledger
        .account_logs(account_id, limit)?
        .into_iter()
        .map(LogEntryResponse::from)
        .collect();
    Ok(Json(LogListResponse {
        total: logs.len(),
        logs,
    }))
}

/// Full history of an account, newest first.
#[utoipa::path(
    get,
    path = "/accounts/{account_id}/logs",
    tag = "Operations",
    security(("bearer_auth" = [])),
    params(("account_id" = u64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Log entries", body = LogListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner or staff, or no such account")
    )
)]
pub async fn list_logs(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<LogListResponse>, ApiError> {
    account_logs(&caller, &state, account_id, None)
}

/// Most recent `limit` log entries of an account (0 means all).
#[utoipa::path(
    get,
    path = "/accounts/{account_id}/logs/{limit}",
    tag = "Operations",
    security(("bearer_auth" = [])),
    params(
        ("account_id" = u64, Path, description = "Account id"),
        ("limit" = usize, Path, description = "Maximum number of entries")
    ),
    responses(
        (status = 200, description = "Log entries", body = LogListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner or staff, or no such account")
    )
)]
pub async fn list_logs_limited(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path((account_id, limit)): Path<(AccountId, usize)>,
) -> Result<Json<LogListResponse>, ApiError> {
    account_logs(&caller, &state, account_id, Some(limit))
}
