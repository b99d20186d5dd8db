// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{CacheStats, Identity, Role},
    ledger::{Account, AccountStatus, AccountType, EntryStatus, LogAction, LogEntry, SettlementMode},
    state::AppState,
};

pub mod accounts;
pub mod actions;
pub mod health;
pub mod operations;

use accounts::{
    AccountListResponse, AccountRequest, ChangeStateRequest, CreateAccountRequest,
};
use actions::{PendingActionsResponse, ResolutionResponse};
use health::{HealthChecks, HealthResponse, ReadyResponse};
use operations::{
    BalanceUpdateRequest, BalanceUpdateResponse, LogEntryResponse, LogListResponse,
    TransferRequest, TransferResponse,
};

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(
            "/accounts",
            get(accounts::list_accounts).post(accounts::create_account),
        )
        .route("/accounts/request", post(accounts::request_account))
        .route("/accounts/{account_id}", get(accounts::get_account))
        .route("/accounts/{account_id}/state", post(accounts::change_state))
        .route("/accounts/{account_id}/balance", post(operations::update_balance))
        .route("/accounts/{account_id}/transfer", post(operations::transfer))
        .route("/accounts/{account_id}/logs", get(operations::list_logs))
        .route(
            "/accounts/{account_id}/logs/{limit}",
            get(operations::list_logs_limited),
        )
        .route("/users/{user_id}/accounts", get(accounts::user_accounts))
        .route("/me/accounts", get(accounts::my_accounts))
        .route("/pending-actions", get(actions::pending_actions))
        .route("/actions/{log_id}/validate", post(actions::validate_action))
        .route("/actions/{log_id}/decline", post(actions::decline_action))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        accounts::list_accounts,
        accounts::create_account,
        accounts::request_account,
        accounts::get_account,
        accounts::my_accounts,
        accounts::user_accounts,
        accounts::change_state,
        operations::update_balance,
        operations::transfer,
        operations::list_logs,
        operations::list_logs_limited,
        actions::pending_actions,
        actions::validate_action,
        actions::decline_action,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            Account,
            AccountType,
            AccountStatus,
            LogEntry,
            LogAction,
            EntryStatus,
            SettlementMode,
            Identity,
            Role,
            CacheStats,
            CreateAccountRequest,
            AccountRequest,
            ChangeStateRequest,
            AccountListResponse,
            BalanceUpdateRequest,
            BalanceUpdateResponse,
            TransferRequest,
            TransferResponse,
            LogEntryResponse,
            LogListResponse,
            PendingActionsResponse,
            ResolutionResponse,
            ReadyResponse,
            HealthChecks,
            HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Accounts", description = "Account lifecycle and lookup"),
        (name = "Operations", description = "Deposits, withdrawals, transfers, history"),
        (name = "Approvals", description = "Banker approval queue"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
