// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger error taxonomy.

use rust_decimal::Decimal;
use thiserror::Error;

use super::model::AccountId;

/// Errors returned by ledger operations.
///
/// Validation variants are produced before anything is written, so a caller
/// seeing one of them knows the ledger is unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Account or log entry is absent (or, for log entries, already settled)
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("insufficient funds in account {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: Decimal,
        requested: Decimal,
    },

    /// Non-positive or malformed amount
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Unknown action kind, same-account transfer, inactive account
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Bad state-change target
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The store failed; the operation was rolled back
    #[error("storage failure: {0}")]
    Storage(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    pub fn account_not_found(id: AccountId) -> Self {
        LedgerError::NotFound {
            entity: "account",
            id,
        }
    }

    pub fn entry_not_found(id: u64) -> Self {
        LedgerError::NotFound {
            entity: "log entry",
            id,
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            LedgerError::NotFound { .. } => "not_found",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::InvalidOperation(_) => "invalid_operation",
            LedgerError::InvalidState(_) => "invalid_state",
            LedgerError::Storage(_) => "storage_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn display_includes_context() {
        let err = LedgerError::InsufficientFunds {
            account_id: 4,
            balance: dec!(100.00),
            requested: dec!(150.00),
        };
        assert_eq!(
            err.to_string(),
            "insufficient funds in account 4: balance 100.00, requested 150.00"
        );
        assert_eq!(
            LedgerError::account_not_found(9).to_string(),
            "account 9 not found"
        );
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(LedgerError::entry_not_found(1).error_code(), "not_found");
        assert_eq!(
            LedgerError::InvalidState("x".into()).error_code(),
            "invalid_state"
        );
    }
}
