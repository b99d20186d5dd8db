// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded ledger database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `accounts`: account_id → serialized Account
//! - `log_entries`: log_id → serialized LogEntry
//! - `account_log_index`: (account_id, log_id) → () for per-account history
//! - `pending_index`: log_id → () for entries whose value_date is unset
//!
//! redb admits one write transaction at a time, which is what serializes
//! concurrent balance read-modify-write cycles.

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::{de::DeserializeOwned, Serialize};

use super::{LedgerStore, LedgerTxn, LedgerView, StoreError, StoreResult};
use crate::ledger::{
    Account, AccountId, LedgerResult, LogEntry, LogId, NewAccount, NewLogEntry,
};

// =============================================================================
// Table Definitions
// =============================================================================

const ACCOUNTS: TableDefinition<u64, &[u8]> = TableDefinition::new("accounts");

const LOG_ENTRIES: TableDefinition<u64, &[u8]> = TableDefinition::new("log_entries");

/// Composite key sorts by account, then by log id (creation order).
const ACCOUNT_LOG_INDEX: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("account_log_index");

const PENDING_INDEX: TableDefinition<u64, ()> = TableDefinition::new("pending_index");

// =============================================================================
// Row Helpers
// =============================================================================

fn get_row<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
    id: u64,
) -> StoreResult<Option<T>> {
    match table.get(id)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn all_rows<T: DeserializeOwned>(table: &impl ReadableTable<u64, &'static [u8]>) -> StoreResult<Vec<T>> {
    let mut rows = Vec::new();
    for item in table.iter()? {
        let (_, value) = item?;
        rows.push(serde_json::from_slice(value.value())?);
    }
    Ok(rows)
}

fn encode<T: Serialize>(row: &T) -> StoreResult<Vec<u8>> {
    Ok(serde_json::to_vec(row)?)
}

fn entries_by_ids(
    entries: &impl ReadableTable<u64, &'static [u8]>,
    ids: impl Iterator<Item = StoreResult<LogId>>,
) -> StoreResult<Vec<LogEntry>> {
    let mut out = Vec::new();
    for id in ids {
        let id = id?;
        let entry = get_row(entries, id)?
            .ok_or_else(|| StoreError::Inconsistent(format!("index points at missing log entry {id}")))?;
        out.push(entry);
    }
    Ok(out)
}

fn account_history(
    index: &impl ReadableTable<(u64, u64), ()>,
    entries: &impl ReadableTable<u64, &'static [u8]>,
    account_id: AccountId,
    limit: Option<usize>,
) -> StoreResult<Vec<LogEntry>> {
    let range = index.range((account_id, 0)..=(account_id, u64::MAX))?;
    let ids = range.rev().map(|item| {
        let (key, _) = item?;
        Ok(key.value().1)
    });
    match limit {
        Some(n) => entries_by_ids(entries, ids.take(n)),
        None => entries_by_ids(entries, ids),
    }
}

fn pending(
    index: &impl ReadableTable<u64, ()>,
    entries: &impl ReadableTable<u64, &'static [u8]>,
) -> StoreResult<Vec<LogEntry>> {
    let ids = index.iter()?.map(|item| {
        let (key, _) = item?;
        Ok(key.value())
    });
    entries_by_ids(entries, ids)
}

/// Implements [`LedgerView`] for a type whose `txn` field can open tables.
macro_rules! impl_ledger_view {
    ($ty:ty) => {
        impl LedgerView for $ty {
            fn account(&self, id: AccountId) -> StoreResult<Option<Account>> {
                let table = self.txn.open_table(ACCOUNTS)?;
                get_row(&table, id)
            }

            fn accounts(&self) -> StoreResult<Vec<Account>> {
                let table = self.txn.open_table(ACCOUNTS)?;
                all_rows(&table)
            }

            fn entry(&self, id: LogId) -> StoreResult<Option<LogEntry>> {
                let table = self.txn.open_table(LOG_ENTRIES)?;
                get_row(&table, id)
            }

            fn entries_for_account(
                &self,
                account_id: AccountId,
                limit: Option<usize>,
            ) -> StoreResult<Vec<LogEntry>> {
                let index = self.txn.open_table(ACCOUNT_LOG_INDEX)?;
                let entries = self.txn.open_table(LOG_ENTRIES)?;
                account_history(&index, &entries, account_id, limit)
            }

            fn pending_entries(&self) -> StoreResult<Vec<LogEntry>> {
                let index = self.txn.open_table(PENDING_INDEX)?;
                let entries = self.txn.open_table(LOG_ENTRIES)?;
                pending(&index, &entries)
            }
        }
    };
}

struct RedbReadView {
    txn: ReadTransaction,
}

struct RedbWriteTxn<'a> {
    txn: &'a WriteTransaction,
}

impl_ledger_view!(RedbReadView);
impl_ledger_view!(RedbWriteTxn<'_>);

impl LedgerTxn for RedbWriteTxn<'_> {
    fn insert_account(&mut self, new: NewAccount) -> StoreResult<Account> {
        let mut table = self.txn.open_table(ACCOUNTS)?;
        let id = match table.last()? {
            Some((key, _)) => key.value() + 1,
            None => 1,
        };
        let account = Account {
            id,
            owner_user_id: new.owner_user_id,
            balance: new.opening_balance,
            account_type: new.account_type,
            status: new.status,
            created_at: Utc::now(),
        };
        table.insert(id, encode(&account)?.as_slice())?;
        Ok(account)
    }

    fn put_account(&mut self, account: &Account) -> StoreResult<()> {
        let mut table = self.txn.open_table(ACCOUNTS)?;
        if table.get(account.id)?.is_none() {
            return Err(StoreError::Inconsistent(format!(
                "account {} does not exist",
                account.id
            )));
        }
        table.insert(account.id, encode(account)?.as_slice())?;
        Ok(())
    }

    fn insert_entry(&mut self, new: NewLogEntry) -> StoreResult<LogEntry> {
        let mut entries = self.txn.open_table(LOG_ENTRIES)?;
        let last: Option<LogEntry> = match entries.last()? {
            Some((_, value)) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        let (id, created_at) = match last {
            Some(prev) => (prev.id + 1, Utc::now().max(prev.created_at)),
            None => (1, Utc::now()),
        };

        let entry = new.into_entry(id, created_at);
        entries.insert(id, encode(&entry)?.as_slice())?;

        let mut index = self.txn.open_table(ACCOUNT_LOG_INDEX)?;
        index.insert((entry.account_id, id), ())?;

        if entry.is_pending() {
            let mut pending = self.txn.open_table(PENDING_INDEX)?;
            pending.insert(id, ())?;
        }
        Ok(entry)
    }

    fn put_entry(&mut self, entry: &LogEntry) -> StoreResult<()> {
        let mut entries = self.txn.open_table(LOG_ENTRIES)?;
        if entries.get(entry.id)?.is_none() {
            return Err(StoreError::Inconsistent(format!(
                "log entry {} does not exist",
                entry.id
            )));
        }
        entries.insert(entry.id, encode(entry)?.as_slice())?;

        let mut pending = self.txn.open_table(PENDING_INDEX)?;
        if entry.is_pending() {
            pending.insert(entry.id, ())?;
        } else {
            pending.remove(entry.id)?;
        }
        Ok(())
    }
}

// =============================================================================
// RedbLedgerStore
// =============================================================================

/// Durable ledger store.
pub struct RedbLedgerStore {
    db: Database,
}

impl RedbLedgerStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(LOG_ENTRIES)?;
            let _ = write_txn.open_table(ACCOUNT_LOG_INDEX)?;
            let _ = write_txn.open_table(PENDING_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Cheap liveness probe used by the health endpoint.
    pub fn check(&self) -> StoreResult<()> {
        let txn = self.db.begin_read()?;
        let _ = txn.open_table(ACCOUNTS)?;
        Ok(())
    }
}

impl LedgerStore for RedbLedgerStore {
    fn read<T>(&self, op: impl FnOnce(&dyn LedgerView) -> LedgerResult<T>) -> LedgerResult<T> {
        let txn = self.db.begin_read().map_err(StoreError::from)?;
        let view = RedbReadView { txn };
        op(&view)
    }

    fn write<T>(
        &self,
        op: impl FnOnce(&mut dyn LedgerTxn) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let txn = self.db.begin_write().map_err(StoreError::from)?;
        let result = {
            let mut handle = RedbWriteTxn { txn: &txn };
            op(&mut handle)
        };
        match result {
            Ok(value) => {
                txn.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = txn.abort() {
                    tracing::warn!(error = %abort_err, "Failed to abort ledger transaction");
                }
                Err(e)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AccountStatus, AccountType, LedgerError, LogAction};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn temp_store() -> (RedbLedgerStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbLedgerStore::open(&dir.path().join("ledger.redb")).unwrap();
        (store, dir)
    }

    fn new_account(owner: &str) -> NewAccount {
        NewAccount {
            owner_user_id: owner.to_string(),
            account_type: AccountType::Savings,
            status: AccountStatus::Active,
            opening_balance: Decimal::ZERO,
        }
    }

    fn pending_deposit(account_id: AccountId) -> NewLogEntry {
        NewLogEntry {
            account_id,
            action: LogAction::Deposit,
            amount: dec!(12.50),
            counterparty_account_id: None,
            memo: Some("salary".to_string()),
            pair_id: None,
            settled: false,
        }
    }

    #[test]
    fn insert_and_get_account() {
        let (store, _dir) = temp_store();
        let created = store.write(|txn| Ok(txn.insert_account(new_account("u1"))?)).unwrap();
        assert_eq!(created.id, 1);

        let loaded = store.read(|view| Ok(view.account(1)?)).unwrap().unwrap();
        assert_eq!(loaded, created);
        assert!(store.read(|view| Ok(view.account(99)?)).unwrap().is_none());
    }

    #[test]
    fn pending_index_follows_settlement() {
        let (store, _dir) = temp_store();
        let entry = store
            .write(|txn| {
                let acc = txn.insert_account(new_account("u1"))?;
                Ok(txn.insert_entry(pending_deposit(acc.id))?)
            })
            .unwrap();

        let pending = store.read(|v| Ok(v.pending_entries()?)).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].memo.as_deref(), Some("salary"));

        store
            .write(|txn| {
                let mut settled = entry.clone();
                settled.resolve(false, Utc::now());
                txn.put_entry(&settled)?;
                Ok(())
            })
            .unwrap();

        assert!(store.read(|v| Ok(v.pending_entries()?)).unwrap().is_empty());
        let reloaded = store.read(|v| Ok(v.entry(entry.id)?)).unwrap().unwrap();
        assert_eq!(reloaded.value_date, Some(reloaded.created_at));
    }

    #[test]
    fn settled_insert_skips_pending_index() {
        let (store, _dir) = temp_store();
        store
            .write(|txn| {
                let acc = txn.insert_account(new_account("u1"))?;
                let mut new = pending_deposit(acc.id);
                new.settled = true;
                txn.insert_entry(new)?;
                Ok(())
            })
            .unwrap();
        assert!(store.read(|v| Ok(v.pending_entries()?)).unwrap().is_empty());
    }

    #[test]
    fn history_is_newest_first_and_scoped() {
        let (store, _dir) = temp_store();
        store
            .write(|txn| {
                let a = txn.insert_account(new_account("u1"))?;
                let b = txn.insert_account(new_account("u2"))?;
                for _ in 0..3 {
                    txn.insert_entry(pending_deposit(a.id))?;
                    txn.insert_entry(pending_deposit(b.id))?;
                }
                Ok(())
            })
            .unwrap();

        let history = store.read(|v| Ok(v.entries_for_account(1, None)?)).unwrap();
        assert_eq!(history.iter().map(|e| e.id).collect::<Vec<_>>(), vec![5, 3, 1]);
        assert!(history.windows(2).all(|w| w[0].created_at >= w[1].created_at));

        let capped = store.read(|v| Ok(v.entries_for_account(2, Some(2))?)).unwrap();
        assert_eq!(capped.iter().map(|e| e.id).collect::<Vec<_>>(), vec![6, 4]);
    }

    #[test]
    fn aborted_write_leaves_no_rows() {
        let (store, _dir) = temp_store();
        let result: LedgerResult<()> = store.write(|txn| {
            let acc = txn.insert_account(new_account("u1"))?;
            txn.insert_entry(pending_deposit(acc.id))?;
            Err(LedgerError::InvalidOperation("abort".to_string()))
        });
        assert!(result.is_err());

        let (accounts, pending) = store
            .read(|v| Ok((v.accounts()?, v.pending_entries()?)))
            .unwrap();
        assert!(accounts.is_empty());
        assert!(pending.is_empty());
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.redb");
        {
            let store = RedbLedgerStore::open(&path).unwrap();
            store.write(|txn| Ok(txn.insert_account(new_account("u1"))?)).unwrap();
        }
        let store = RedbLedgerStore::open(&path).unwrap();
        assert_eq!(store.read(|v| Ok(v.accounts()?)).unwrap().len(), 1);
        assert!(store.check().is_ok());
    }
}
