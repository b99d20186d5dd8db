// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger domain types: accounts, log entries, and money rules.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::{LedgerError, LedgerResult};

/// Store-assigned account identifier.
pub type AccountId = u64;

/// Store-assigned log entry identifier.
pub type LogId = u64;

/// Fractional digits carried by every monetary value.
pub const MONEY_SCALE: u32 = 2;

/// Largest balance an account may hold (10 digits, 2 of them fractional).
pub const MAX_BALANCE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Kind of account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AccountType {
    Savings,
    #[default]
    Checking,
}

/// Lifecycle status of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AccountStatus {
    /// Account is open for deposits, withdrawals, and transfers
    #[default]
    Active,
    /// Account is terminally closed
    Closed,
    /// Account was requested by its owner and awaits banker activation
    PendingCreation,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Closed => "closed",
            AccountStatus::PendingCreation => "pending-creation",
        }
    }

    /// Parse a status from its wire name.
    pub fn parse(s: &str) -> Option<AccountStatus> {
        match s {
            "active" => Some(AccountStatus::Active),
            "closed" => Some(AccountStatus::Closed),
            "pending-creation" => Some(AccountStatus::PendingCreation),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A monetary account owned by an externally-identified user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Account {
    /// Unique account identifier
    pub id: AccountId,
    /// User id from the identity authority (not validated locally)
    pub owner_user_id: String,
    /// Current balance, never negative after a committed operation
    #[schema(value_type = String, example = "100.00")]
    pub balance: Decimal,
    pub account_type: AccountType,
    pub status: AccountStatus,
    /// Set once by the store at insertion
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Fail unless the account may take part in balance-affecting actions.
    pub fn ensure_active(&self) -> LedgerResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(LedgerError::InvalidOperation(format!(
                "account {} is {}",
                self.id, self.status
            )))
        }
    }

    /// Check that `amount` can be debited right now.
    pub fn ensure_funds(&self, amount: Decimal) -> LedgerResult<()> {
        if self.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account_id: self.id,
                balance: self.balance,
                requested: amount,
            });
        }
        Ok(())
    }

    pub(crate) fn credit(&mut self, amount: Decimal) -> LedgerResult<()> {
        let balance = self
            .balance
            .checked_add(amount)
            .filter(|b| *b <= MAX_BALANCE)
            .ok_or_else(|| {
                LedgerError::InvalidAmount(format!(
                    "crediting {amount} would exceed the maximum balance of account {}",
                    self.id
                ))
            })?;
        self.balance = balance;
        Ok(())
    }

    pub(crate) fn debit(&mut self, amount: Decimal) -> LedgerResult<()> {
        self.ensure_funds(amount)?;
        self.balance -= amount;
        Ok(())
    }
}

/// Fields supplied when opening an account. Ids and timestamps come from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub owner_user_id: String,
    pub account_type: AccountType,
    pub status: AccountStatus,
    pub opening_balance: Decimal,
}

/// What a log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum LogAction {
    Deposit,
    Withdrawal,
    TransferSent,
    TransferReceived,
}

impl LogAction {
    pub fn is_transfer(&self) -> bool {
        matches!(self, LogAction::TransferSent | LogAction::TransferReceived)
    }
}

impl std::fmt::Display for LogAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogAction::Deposit => "deposit",
            LogAction::Withdrawal => "withdrawal",
            LogAction::TransferSent => "transfer-sent",
            LogAction::TransferReceived => "transfer-received",
        };
        f.write_str(name)
    }
}

/// Settlement state of a log entry, derived from its stored fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Settled,
    Declined,
}

/// One immutable record of a balance-affecting event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LogEntry {
    pub id: LogId,
    /// Owning account
    pub account_id: AccountId,
    pub action: LogAction,
    /// Strictly positive amount
    #[schema(value_type = String, example = "40.00")]
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    /// `None` while pending; set exactly once at validation or decline
    pub value_date: Option<DateTime<Utc>>,
    /// Other account of a transfer leg, `None` for deposits and withdrawals
    pub counterparty_account_id: Option<AccountId>,
    pub memo: Option<String>,
    /// The other leg of a transfer
    pub pair_id: Option<LogId>,
    /// True when a banker refused the action
    #[serde(default)]
    pub declined: bool,
    /// Wall-clock time of validation or decline
    pub resolved_at: Option<DateTime<Utc>>,
}

impl LogEntry {
    pub fn is_pending(&self) -> bool {
        self.value_date.is_none()
    }

    pub fn status(&self) -> EntryStatus {
        match (self.value_date, self.declined) {
            (None, _) => EntryStatus::Pending,
            (Some(_), true) => EntryStatus::Declined,
            (Some(_), false) => EntryStatus::Settled,
        }
    }

    /// Close a pending entry. `value_date` takes the creation time.
    pub(crate) fn resolve(&mut self, declined: bool, at: DateTime<Utc>) {
        self.value_date = Some(self.created_at);
        self.declined = declined;
        self.resolved_at = Some(at.max(self.created_at));
    }
}

/// A log entry about to be inserted. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub account_id: AccountId,
    pub action: LogAction,
    pub amount: Decimal,
    pub counterparty_account_id: Option<AccountId>,
    pub memo: Option<String>,
    pub pair_id: Option<LogId>,
    /// Settle at insertion (`value_date = created_at`)
    pub settled: bool,
}

impl NewLogEntry {
    /// Materialize the row once the store has picked its id and timestamp.
    pub fn into_entry(self, id: LogId, created_at: DateTime<Utc>) -> LogEntry {
        let settled_at = self.settled.then_some(created_at);
        LogEntry {
            id,
            account_id: self.account_id,
            action: self.action,
            amount: self.amount,
            created_at,
            value_date: settled_at,
            counterparty_account_id: self.counterparty_account_id,
            memo: self.memo,
            pair_id: self.pair_id,
            declined: false,
            resolved_at: settled_at,
        }
    }
}

/// Validate a client-supplied amount: strictly positive, at most two decimals.
pub fn validate_amount(amount: Decimal) -> LedgerResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )));
    }
    let normalized = amount.normalize();
    if normalized.scale() > MONEY_SCALE {
        return Err(LedgerError::InvalidAmount(format!(
            "amount {amount} has more than {MONEY_SCALE} decimal places"
        )));
    }
    if normalized > MAX_BALANCE {
        return Err(LedgerError::InvalidAmount(format!(
            "amount {amount} exceeds {MAX_BALANCE}"
        )));
    }
    Ok(to_money(normalized))
}

/// Rescale to the fixed money scale.
pub fn to_money(amount: Decimal) -> Decimal {
    let mut value = amount;
    value.rescale(MONEY_SCALE);
    value
}
