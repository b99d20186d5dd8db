// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Log Recorder: builds log entries with the right fields for each action.
//!
//! All functions run inside the caller's transaction. Ids and `created_at`
//! come from the store, never from the request.

use rust_decimal::Decimal;

use super::error::{LedgerError, LedgerResult};
use super::model::{AccountId, LogAction, LogEntry, NewLogEntry};
use crate::storage::{LedgerTxn, LedgerView};

/// Both legs of a transfer, as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferPair {
    pub sent: LogEntry,
    pub received: LogEntry,
}

/// Record a deposit or withdrawal on a single account.
pub fn record_single(
    txn: &mut dyn LedgerTxn,
    account_id: AccountId,
    action: LogAction,
    amount: Decimal,
    settled: bool,
) -> LedgerResult<LogEntry> {
    if action.is_transfer() {
        return Err(LedgerError::InvalidOperation(format!(
            "{action} must be recorded as a transfer pair"
        )));
    }
    let entry = txn.insert_entry(NewLogEntry {
        account_id,
        action,
        amount,
        counterparty_account_id: None,
        memo: None,
        pair_id: None,
        settled,
    })?;
    Ok(entry)
}

/// Record both legs of a transfer, cross-linked through `pair_id`.
pub fn record_transfer(
    txn: &mut dyn LedgerTxn,
    source: AccountId,
    target: AccountId,
    amount: Decimal,
    memo: Option<String>,
    settled: bool,
) -> LedgerResult<TransferPair> {
    let mut sent = txn.insert_entry(NewLogEntry {
        account_id: source,
        action: LogAction::TransferSent,
        amount,
        counterparty_account_id: Some(target),
        memo: memo.clone(),
        pair_id: None,
        settled,
    })?;
    let received = txn.insert_entry(NewLogEntry {
        account_id: target,
        action: LogAction::TransferReceived,
        amount,
        counterparty_account_id: Some(source),
        memo,
        pair_id: Some(sent.id),
        settled,
    })?;

    sent.pair_id = Some(received.id);
    txn.put_entry(&sent)?;

    Ok(TransferPair { sent, received })
}

/// Load the other leg of a transfer entry and check that it links back.
pub fn paired_leg(
    view: &(impl LedgerView + ?Sized),
    entry: &LogEntry,
) -> LedgerResult<LogEntry> {
    let broken = || {
        LedgerError::Storage(format!(
            "transfer entry {} has no matching counter-entry",
            entry.id
        ))
    };
    let pair_id = entry.pair_id.ok_or_else(broken)?;
    let other = view.entry(pair_id)?.ok_or_else(broken)?;
    if other.pair_id != Some(entry.id) || Some(other.account_id) != entry.counterparty_account_id {
        return Err(broken());
    }
    Ok(other)
}
