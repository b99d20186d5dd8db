// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transaction Engine
//!
//! All balance changes go through [`Ledger`]. Each public operation runs as a
//! single [`LedgerStore::write`] unit: the balance check, the balance update,
//! and the log entries either commit together or not at all.
//!
//! ## Settlement Modes
//!
//! | Mode | deposit / withdraw / transfer | validate / decline |
//! |------|-------------------------------|--------------------|
//! | `Deferred` (default) | pending entries, balances untouched | applies or refuses the change |
//! | `Immediate` | balances change, entries settled at once | nothing left to settle |
//!
//! The mode is fixed when the ledger is built, so a process never mixes the two.

pub mod error;
pub mod model;
pub mod recorder;

use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

pub use error::{LedgerError, LedgerResult};
pub use model::{
    to_money, validate_amount, Account, AccountId, AccountStatus, AccountType, EntryStatus,
    LogAction, LogEntry, LogId, NewAccount, NewLogEntry, MAX_BALANCE, MONEY_SCALE,
};
pub use recorder::TransferPair;

use crate::storage::{LedgerStore, LedgerView};

/// When balance changes take effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SettlementMode {
    /// Actions wait in the approval queue; balances move at validation
    #[default]
    Deferred,
    /// Actions settle as soon as they are recorded
    Immediate,
}

impl SettlementMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementMode::Deferred => "deferred",
            SettlementMode::Immediate => "immediate",
        }
    }
}

impl FromStr for SettlementMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deferred" => Ok(SettlementMode::Deferred),
            "immediate" => Ok(SettlementMode::Immediate),
            other => Err(format!("unknown settlement mode: {other}")),
        }
    }
}

impl std::fmt::Display for SettlementMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a deposit or withdrawal.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceReceipt {
    /// Account as of commit (unchanged balance while pending)
    pub account: Account,
    pub entry: LogEntry,
}

/// Result of a transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    pub source: Account,
    pub target: Account,
    pub entries: TransferPair,
}

/// Result of validating or declining a pending action.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The entry that was acted on, now closed
    pub entry: LogEntry,
    /// The other transfer leg, closed in the same commit
    pub paired: Option<LogEntry>,
    /// Accounts whose balance changed (empty on decline)
    pub accounts: Vec<Account>,
}

fn load_account(view: &(impl LedgerView + ?Sized), id: AccountId) -> LedgerResult<Account> {
    view.account(id)?
        .ok_or_else(|| LedgerError::account_not_found(id))
}

fn load_pending(view: &(impl LedgerView + ?Sized), id: LogId) -> LedgerResult<LogEntry> {
    view.entry(id)?
        .filter(LogEntry::is_pending)
        .ok_or_else(|| LedgerError::entry_not_found(id))
}

/// The ledger's transaction engine.
pub struct Ledger<S> {
    store: S,
    mode: SettlementMode,
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S, mode: SettlementMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> SettlementMode {
        self.mode
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn settles_immediately(&self) -> bool {
        self.mode == SettlementMode::Immediate
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Open an account. A non-zero opening balance is logged as a settled
    /// deposit in the same commit.
    pub fn create_account(&self, new: NewAccount) -> LedgerResult<Account> {
        if new.status == AccountStatus::Closed {
            return Err(LedgerError::InvalidState(
                "accounts cannot be created closed".to_string(),
            ));
        }
        let opening_balance = if new.opening_balance.is_zero() {
            to_money(Decimal::ZERO)
        } else {
            validate_amount(new.opening_balance)?
        };

        let account = self.store.write(|txn| {
            let account = txn.insert_account(NewAccount {
                opening_balance,
                ..new
            })?;
            if !opening_balance.is_zero() {
                recorder::record_single(txn, account.id, LogAction::Deposit, opening_balance, true)?;
            }
            Ok(account)
        })?;

        info!(
            account_id = account.id,
            owner = %account.owner_user_id,
            status = %account.status,
            opening_balance = %account.balance,
            "Account created"
        );
        Ok(account)
    }

    /// Self-service request: the account starts in `pending-creation`.
    pub fn request_account(&self, owner_user_id: &str, account_type: AccountType) -> LedgerResult<Account> {
        self.create_account(NewAccount {
            owner_user_id: owner_user_id.to_string(),
            account_type,
            status: AccountStatus::PendingCreation,
            opening_balance: Decimal::ZERO,
        })
    }

    pub fn get_account(&self, id: AccountId) -> LedgerResult<Account> {
        self.store.read(|view| load_account(view, id))
    }

    /// Like [`Ledger::get_account`] but absence is not an error.
    pub fn find_account(&self, id: AccountId) -> LedgerResult<Option<Account>> {
        self.store.read(|view| Ok(view.account(id)?))
    }

    /// All accounts in id order, optionally restricted to one status.
    pub fn list_accounts(&self, status: Option<AccountStatus>) -> LedgerResult<Vec<Account>> {
        let accounts = self.store.read(|view| Ok(view.accounts()?))?;
        Ok(match status {
            Some(status) => accounts.into_iter().filter(|a| a.status == status).collect(),
            None => accounts,
        })
    }

    pub fn accounts_for_owner(&self, owner_user_id: &str) -> LedgerResult<Vec<Account>> {
        let accounts = self.store.read(|view| Ok(view.accounts()?))?;
        Ok(accounts
            .into_iter()
            .filter(|a| a.owner_user_id == owner_user_id)
            .collect())
    }

    /// History of one account, newest first. A `limit` of 0 means no cap.
    pub fn account_logs(&self, account_id: AccountId, limit: Option<usize>) -> LedgerResult<Vec<LogEntry>> {
        let limit = limit.filter(|n| *n > 0);
        self.store.read(|view| {
            load_account(view, account_id)?;
            Ok(view.entries_for_account(account_id, limit)?)
        })
    }

    pub fn get_entry(&self, id: LogId) -> LedgerResult<LogEntry> {
        self.store.read(|view| {
            view.entry(id)?
                .ok_or_else(|| LedgerError::entry_not_found(id))
        })
    }

    /// Move an account to `active` or `closed`.
    pub fn change_account_state(&self, account_id: AccountId, new_state: AccountStatus) -> LedgerResult<Account> {
        if !matches!(new_state, AccountStatus::Active | AccountStatus::Closed) {
            return Err(LedgerError::InvalidState(format!(
                "cannot move an account to {new_state}"
            )));
        }

        let (account, previous) = self.store.write(|txn| {
            let mut account = load_account(&*txn, account_id)?;
            let previous = account.status;
            if previous == new_state {
                return Ok((account, previous));
            }
            if previous == AccountStatus::Closed {
                return Err(LedgerError::InvalidState(format!(
                    "account {account_id} is closed and cannot be reopened"
                )));
            }
            account.status = new_state;
            txn.put_account(&account)?;
            Ok((account, previous))
        })?;

        if previous != new_state {
            info!(
                account_id,
                from = %previous,
                to = %new_state,
                "Account state changed"
            );
        }
        Ok(account)
    }

    // =========================================================================
    // Balance-affecting actions
    // =========================================================================

    pub fn deposit(&self, account_id: AccountId, amount: Decimal) -> LedgerResult<BalanceReceipt> {
        let amount = validate_amount(amount)?;
        let settled = self.settles_immediately();

        let receipt = self.store.write(|txn| {
            let mut account = load_account(&*txn, account_id)?;
            account.ensure_active()?;
            if settled {
                account.credit(amount)?;
                txn.put_account(&account)?;
            }
            let entry = recorder::record_single(txn, account_id, LogAction::Deposit, amount, settled)?;
            Ok(BalanceReceipt { account, entry })
        })?;

        info!(
            account_id,
            log_id = receipt.entry.id,
            amount = %amount,
            settled,
            "Deposit recorded"
        );
        Ok(receipt)
    }

    pub fn withdraw(&self, account_id: AccountId, amount: Decimal) -> LedgerResult<BalanceReceipt> {
        let amount = validate_amount(amount)?;
        let settled = self.settles_immediately();

        let receipt = self.store.write(|txn| {
            let mut account = load_account(&*txn, account_id)?;
            account.ensure_active()?;
            ensure_available(&*txn, &account, amount)?;
            if settled {
                account.debit(amount)?;
                txn.put_account(&account)?;
            }
            let entry = recorder::record_single(txn, account_id, LogAction::Withdrawal, amount, settled)?;
            Ok(BalanceReceipt { account, entry })
        })?;

        info!(
            account_id,
            log_id = receipt.entry.id,
            amount = %amount,
            settled,
            "Withdrawal recorded"
        );
        Ok(receipt)
    }

    /// Move money between two distinct accounts, producing a linked pair of entries.
    pub fn transfer(
        &self,
        source_id: AccountId,
        target_id: AccountId,
        amount: Decimal,
        memo: Option<String>,
    ) -> LedgerResult<TransferReceipt> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "transfer amount must be positive, got {amount}"
            )));
        }
        let amount = validate_amount(amount.abs())?;
        if source_id == target_id {
            return Err(LedgerError::InvalidOperation(format!(
                "cannot transfer from account {source_id} to itself"
            )));
        }
        let settled = self.settles_immediately();

        let receipt = self.store.write(|txn| {
            let mut source = load_account(&*txn, source_id)?;
            let mut target = load_account(&*txn, target_id)?;
            source.ensure_active()?;
            target.ensure_active()?;
            ensure_available(&*txn, &source, amount)?;
            if settled {
                source.debit(amount)?;
                target.credit(amount)?;
                txn.put_account(&source)?;
                txn.put_account(&target)?;
            }
            let entries = recorder::record_transfer(txn, source_id, target_id, amount, memo, settled)?;
            Ok(TransferReceipt {
                source,
                target,
                entries,
            })
        })?;

        info!(
            source_id,
            target_id,
            sent_log_id = receipt.entries.sent.id,
            received_log_id = receipt.entries.received.id,
            amount = %amount,
            settled,
            "Transfer recorded"
        );
        Ok(receipt)
    }

    // =========================================================================
    // Approval queue
    // =========================================================================

    /// Actionable pending entries, oldest first. Receiving legs are left out.
    pub fn pending_actions(&self) -> LedgerResult<Vec<LogEntry>> {
        let mut pending = self.store.read(|view| Ok(view.pending_entries()?))?;
        pending.retain(|e| e.action != LogAction::TransferReceived);
        pending.sort_by_key(|e| (e.created_at, e.id));
        Ok(pending)
    }

    /// Settle a pending action and apply its balance change.
    pub fn validate_action(&self, log_id: LogId) -> LedgerResult<Resolution> {
        let now = Utc::now();

        let resolution = self.store.write(|txn| {
            let mut entry = load_pending(&*txn, log_id)?;
            let mut paired = None;
            let mut accounts = Vec::new();

            match entry.action {
                LogAction::Deposit => {
                    let mut account = load_account(&*txn, entry.account_id)?;
                    account.ensure_active()?;
                    account.credit(entry.amount)?;
                    txn.put_account(&account)?;
                    accounts.push(account);
                }
                LogAction::Withdrawal => {
                    let mut account = load_account(&*txn, entry.account_id)?;
                    account.ensure_active()?;
                    account.debit(entry.amount)?;
                    txn.put_account(&account)?;
                    accounts.push(account);
                }
                LogAction::TransferSent => {
                    let mut other = open_pair_leg(&*txn, &entry)?;
                    let mut source = load_account(&*txn, entry.account_id)?;
                    let mut target = load_account(&*txn, other.account_id)?;
                    source.ensure_active()?;
                    target.ensure_active()?;
                    source.debit(entry.amount)?;
                    target.credit(entry.amount)?;
                    txn.put_account(&source)?;
                    txn.put_account(&target)?;
                    accounts.push(source);
                    accounts.push(target);

                    other.resolve(false, now);
                    txn.put_entry(&other)?;
                    paired = Some(other);
                }
                LogAction::TransferReceived => return Err(receiving_leg_error(log_id)),
            }

            entry.resolve(false, now);
            txn.put_entry(&entry)?;
            Ok(Resolution {
                entry,
                paired,
                accounts,
            })
        })?;

        info!(
            log_id,
            action = %resolution.entry.action,
            account_id = resolution.entry.account_id,
            amount = %resolution.entry.amount,
            "Pending action validated"
        );
        Ok(resolution)
    }

    /// Refuse a pending action. No balance changes.
    pub fn decline_action(&self, log_id: LogId) -> LedgerResult<Resolution> {
        let now = Utc::now();

        let resolution = self.store.write(|txn| {
            let mut entry = load_pending(&*txn, log_id)?;
            let paired = match entry.action {
                LogAction::TransferReceived => return Err(receiving_leg_error(log_id)),
                LogAction::TransferSent => {
                    let mut other = open_pair_leg(&*txn, &entry)?;
                    other.resolve(true, now);
                    txn.put_entry(&other)?;
                    Some(other)
                }
                LogAction::Deposit | LogAction::Withdrawal => None,
            };

            entry.resolve(true, now);
            txn.put_entry(&entry)?;
            Ok(Resolution {
                entry,
                paired,
                accounts: Vec::new(),
            })
        })?;

        info!(
            log_id,
            action = %resolution.entry.action,
            account_id = resolution.entry.account_id,
            "Pending action declined"
        );
        Ok(resolution)
    }
}

/// Sum of pending debits that will leave `account_id` once validated.
fn reserved_funds(view: &(impl LedgerView + ?Sized), account_id: AccountId) -> LedgerResult<Decimal> {
    Ok(view
        .pending_entries()?
        .iter()
        .filter(|e| e.account_id == account_id)
        .filter(|e| matches!(e.action, LogAction::Withdrawal | LogAction::TransferSent))
        .map(|e| e.amount)
        .sum())
}

/// Funds check against the balance net of pending debits.
fn ensure_available(
    view: &(impl LedgerView + ?Sized),
    account: &Account,
    amount: Decimal,
) -> LedgerResult<()> {
    let available = account.balance - reserved_funds(view, account.id)?;
    if available < amount {
        return Err(LedgerError::InsufficientFunds {
            account_id: account.id,
            balance: available,
            requested: amount,
        });
    }
    Ok(())
}

fn open_pair_leg(view: &(impl LedgerView + ?Sized), entry: &LogEntry) -> LedgerResult<LogEntry> {
    let other = recorder::paired_leg(view, entry)?;
    if !other.is_pending() {
        return Err(LedgerError::Storage(format!(
            "transfer entry {} is pending but its counter-entry {} is not",
            entry.id, other.id
        )));
    }
    Ok(other)
}

fn receiving_leg_error(log_id: LogId) -> LedgerError {
    LedgerError::InvalidOperation(format!(
        "log entry {log_id} is a receiving leg; act on its transfer-sent entry"
    ))
}
