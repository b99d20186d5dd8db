// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account API endpoints.
//!
//! Listing and creation of empty accounts are open; everything else requires
//! an authenticated caller and passes through the authorization policy.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::{require, Auth, AuthError, OptionalAuth, Operation, Resource},
    error::ApiError,
    ledger::{Account, AccountId, AccountStatus, AccountType, NewAccount},
    state::AppState,
};

/// Request to open an account directly.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    /// User id at the identity authority.
    pub owner_user_id: String,
    /// Defaults to `checking`.
    #[serde(default)]
    pub account_type: Option<AccountType>,
    /// `active` (default) or `pending-creation`.
    #[serde(default)]
    pub status: Option<AccountStatus>,
    /// Non-negative starting balance, defaults to 0. Non-zero needs staff.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "100.00")]
    pub opening_balance: Option<Decimal>,
}

/// Self-service account request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AccountRequest {
    #[serde(default)]
    pub account_type: Option<AccountType>,
}

/// Target state for an account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangeStateRequest {
    /// `active` or `closed`.
    pub state: String,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListAccountsQuery {
    /// Filter by status (`pending-creation` requires banker or administrator).
    pub status: Option<String>,
}

/// Response containing a list of accounts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountListResponse {
    pub accounts: Vec<Account>,
    /// Total count of accounts.
    pub total: usize,
}

impl From<Vec<Account>> for AccountListResponse {
    fn from(accounts: Vec<Account>) -> Self {
        Self {
            total: accounts.len(),
            accounts,
        }
    }
}

fn parse_status(raw: &str) -> Result<AccountStatus, ApiError> {
    AccountStatus::parse(raw.trim())
        .ok_or_else(|| ApiError::bad_request(format!("unknown account status: {raw}")))
}

/// List accounts, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/accounts",
    tag = "Accounts",
    params(ListAccountsQuery),
    responses(
        (status = 200, description = "Accounts", body = AccountListResponse),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Pending-creation filter without credentials"),
        (status = 403, description = "Pending-creation filter for non-staff")
    )
)]
pub async fn list_accounts(
    OptionalAuth(caller): OptionalAuth,
    State(state): State<AppState>,
    Query(query): Query<ListAccountsQuery>,
) -> Result<Json<AccountListResponse>, ApiError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;

    if status == Some(AccountStatus::PendingCreation) {
        let caller = caller.ok_or(AuthError::MissingAuthHeader)?;
        require(&caller, Resource::Ledger, Operation::ListPendingCreation)?;
    }

    let accounts = state.ledger.list_accounts(status)?;
    Ok(Json(accounts.into()))
}

/// Open an account.
///
/// Open to anyone for an empty account. A non-zero opening balance requires a
/// banker or administrator and is logged as a settled deposit.
#[utoipa::path(
    post,
    path = "/accounts",
    tag = "Accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = Account),
        (status = 400, description = "Invalid opening balance or status"),
        (status = 401, description = "Opening balance without credentials"),
        (status = 403, description = "Opening balance requested by non-staff")
    )
)]
pub async fn create_account(
    OptionalAuth(caller): OptionalAuth,
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let owner_user_id = request.owner_user_id.trim();
    if owner_user_id.is_empty() {
        return Err(ApiError::bad_request("owner_user_id is required"));
    }

    let funded = request.opening_balance.is_some_and(|b| !b.is_zero());
    if funded {
        let caller = caller.ok_or(AuthError::MissingAuthHeader)?;
        require(&caller, Resource::Ledger, Operation::OpenFunded)?;
    }

    let account = state.ledger.create_account(NewAccount {
        owner_user_id: owner_user_id.to_string(),
        account_type: request.account_type.unwrap_or_default(),
        status: request.status.unwrap_or_default(),
        opening_balance: request.opening_balance.unwrap_or(Decimal::ZERO),
    })?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// Request a new account for the authenticated caller.
///
/// The account starts in `pending-creation` until a banker activates it.
#[utoipa::path(
    post,
    path = "/accounts/request",
    tag = "Accounts",
    security(("bearer_auth" = [])),
    request_body = AccountRequest,
    responses(
        (status = 201, description = "Account requested", body = Account),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn request_account(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Json(request): Json<AccountRequest>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = state
        .ledger
        .request_account(&caller.user_id, request.account_type.unwrap_or_default())?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// Get one account.
#[utoipa::path(
    get,
    path = "/accounts/{account_id}",
    tag = "Accounts",
    security(("bearer_auth" = [])),
    params(("account_id" = u64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account", body = Account),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner, or no such account")
    )
)]
pub async fn get_account(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Account>, ApiError> {
    let account = state.ledger.find_account(account_id)?;
    require(&caller, Resource::Account(account.as_ref()), Operation::ReadAccount)?;
    let account = account.ok_or_else(|| ApiError::not_found("account not found"))?;
    Ok(Json(account))
}

/// List the authenticated caller's own accounts.
#[utoipa::path(
    get,
    path = "/me/accounts",
    tag = "Accounts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's accounts", body = AccountListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn my_accounts(
    Auth(caller): Auth,
    State(state): State<AppState>,
) -> Result<Json<AccountListResponse>, ApiError> {
    let accounts = state.ledger.accounts_for_owner(&caller.user_id)?;
    Ok(Json(accounts.into()))
}

/// List the accounts of one user (banker/administrator only).
#[utoipa::path(
    get,
    path = "/users/{user_id}/accounts",
    tag = "Accounts",
    security(("bearer_auth" = [])),
    params(("user_id" = String, Path, description = "User id at the identity authority")),
    responses(
        (status = 200, description = "User's accounts", body = AccountListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn user_accounts(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<AccountListResponse>, ApiError> {
    require(&caller, Resource::Ledger, Operation::ListByUser)?;
    let accounts = state.ledger.accounts_for_owner(&user_id)?;
    Ok(Json(accounts.into()))
}

/// Activate or close an account (banker/administrator only).
#[utoipa::path(
    post,
    path = "/accounts/{account_id}/state",
    tag = "Accounts",
    security(("bearer_auth" = [])),
    params(("account_id" = u64, Path, description = "Account id")),
    request_body = ChangeStateRequest,
    responses(
        (status = 200, description = "Account after the change", body = Account),
        (status = 400, description = "Invalid target state"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn change_state(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
    Json(request): Json<ChangeStateRequest>,
) -> Result<Json<Account>, ApiError> {
    require(&caller, Resource::Ledger, Operation::ChangeState)?;
    let target = AccountStatus::parse(request.state.trim()).ok_or_else(|| {
        ApiError::from(crate::ledger::LedgerError::InvalidState(format!(
            "unknown account state: {}",
            request.state
        )))
    })?;
    let account = state.ledger.change_account_state(account_id, target)?;
    Ok(Json(account))
}
