// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Store
//!
//! Durable persistence of accounts and log entries.
//!
//! ## Atomicity Model
//!
//! Every mutation runs inside [`LedgerStore::write`]. The closure receives a
//! transaction handle; if it returns `Ok` all of its writes commit together,
//! if it returns `Err` (or the store fails mid-way) none of them do. Writers
//! are serialized, so a read-check-write sequence inside one closure can never
//! observe a stale balance.
//!
//! ## Backends
//!
//! - [`RedbLedgerStore`] - embedded ACID database (production)
//! - [`MemoryLedgerStore`] - copy-on-write in-process state (tests, tooling)

pub mod memory;
pub mod redb_store;

pub use memory::MemoryLedgerStore;
pub use redb_store::RedbLedgerStore;

use crate::ledger::{
    Account, AccountId, LedgerError, LedgerResult, LogEntry, LogId, NewAccount, NewLogEntry,
};

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store state violates an invariant (dangling index, lock poisoned)
    #[error("store inconsistency: {0}")]
    Inconsistent(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        LedgerError::Storage(e.to_string())
    }
}

/// Read access to ledger state.
pub trait LedgerView {
    fn account(&self, id: AccountId) -> StoreResult<Option<Account>>;

    /// All accounts in id order.
    fn accounts(&self) -> StoreResult<Vec<Account>>;

    fn entry(&self, id: LogId) -> StoreResult<Option<LogEntry>>;

    /// Entries owned by `account_id`, newest first, capped at `limit` if given.
    fn entries_for_account(
        &self,
        account_id: AccountId,
        limit: Option<usize>,
    ) -> StoreResult<Vec<LogEntry>>;

    /// Every entry whose `value_date` is still unset, oldest first.
    fn pending_entries(&self) -> StoreResult<Vec<LogEntry>>;
}

/// Write access inside one atomic unit.
pub trait LedgerTxn: LedgerView {
    /// Insert an account, assigning its id and `created_at`.
    fn insert_account(&mut self, new: NewAccount) -> StoreResult<Account>;

    /// Overwrite an existing account row.
    fn put_account(&mut self, account: &Account) -> StoreResult<()>;

    /// Append a log entry, assigning its id and a `created_at` that is never
    /// earlier than any previously stored entry.
    fn insert_entry(&mut self, new: NewLogEntry) -> StoreResult<LogEntry>;

    /// Overwrite an existing entry row (settlement fields only change here).
    fn put_entry(&mut self, entry: &LogEntry) -> StoreResult<()>;
}

/// A ledger persistence backend.
pub trait LedgerStore: Send + Sync {
    /// Run `op` against a consistent snapshot.
    fn read<T>(&self, op: impl FnOnce(&dyn LedgerView) -> LedgerResult<T>) -> LedgerResult<T>;

    /// Run `op` as a single atomic, serialized unit of work.
    fn write<T>(&self, op: impl FnOnce(&mut dyn LedgerTxn) -> LedgerResult<T>)
        -> LedgerResult<T>;
}
