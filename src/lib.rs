// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Argent Ledger - Account Ledger Service
//!
//! Keeps per-user monetary accounts, records every balance-affecting action
//! in an append-only log, and routes actions through a banker approval queue
//! before they settle.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token resolution against the identity authority and access policy
//! - `ledger` - Accounts, log entries and the transaction engine
//! - `storage` - Ledger persistence (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod state;
pub mod storage;
