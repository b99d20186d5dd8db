// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process ledger store.
//!
//! Writers take the lock, work on a private copy of the state, and swap it in
//! only when the closure succeeds. A failed closure leaves nothing behind.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::{LedgerStore, LedgerTxn, LedgerView, StoreError, StoreResult};
use crate::ledger::{
    Account, AccountId, LedgerResult, LogEntry, LogId, NewAccount, NewLogEntry,
};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    accounts: BTreeMap<AccountId, Account>,
    entries: BTreeMap<LogId, LogEntry>,
}

#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    state: Mutex<LedgerState>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Inconsistent("ledger state lock poisoned".to_string()))
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn read<T>(&self, op: impl FnOnce(&dyn LedgerView) -> LedgerResult<T>) -> LedgerResult<T> {
        let guard = self.lock()?;
        op(&*guard)
    }

    fn write<T>(
        &self,
        op: impl FnOnce(&mut dyn LedgerTxn) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let mut guard = self.lock()?;
        let mut draft = guard.clone();
        let out = op(&mut draft)?;
        *guard = draft;
        Ok(out)
    }
}

impl LedgerView for LedgerState {
    fn account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        Ok(self.accounts.get(&id).cloned())
    }

    fn accounts(&self) -> StoreResult<Vec<Account>> {
        Ok(self.accounts.values().cloned().collect())
    }

    fn entry(&self, id: LogId) -> StoreResult<Option<LogEntry>> {
        Ok(self.entries.get(&id).cloned())
    }

    fn entries_for_account(
        &self,
        account_id: AccountId,
        limit: Option<usize>,
    ) -> StoreResult<Vec<LogEntry>> {
        let owned = self
            .entries
            .values()
            .rev()
            .filter(|e| e.account_id == account_id)
            .cloned();
        Ok(match limit {
            Some(n) => owned.take(n).collect(),
            None => owned.collect(),
        })
    }

    fn pending_entries(&self) -> StoreResult<Vec<LogEntry>> {
        Ok(self
            .entries
            .values()
            .filter(|e| e.is_pending())
            .cloned()
            .collect())
    }
}

impl LedgerTxn for LedgerState {
    fn insert_account(&mut self, new: NewAccount) -> StoreResult<Account> {
        let id = self.accounts.keys().next_back().map_or(1, |last| last + 1);
        let account = Account {
            id,
            owner_user_id: new.owner_user_id,
            balance: new.opening_balance,
            account_type: new.account_type,
            status: new.status,
            created_at: Utc::now(),
        };
        self.accounts.insert(id, account.clone());
        Ok(account)
    }

    fn put_account(&mut self, account: &Account) -> StoreResult<()> {
        match self.accounts.get_mut(&account.id) {
            Some(slot) => {
                *slot = account.clone();
                Ok(())
            }
            None => Err(StoreError::Inconsistent(format!(
                "account {} does not exist",
                account.id
            ))),
        }
    }

    fn insert_entry(&mut self, new: NewLogEntry) -> StoreResult<LogEntry> {
        let last = self.entries.values().next_back();
        let id = last.map_or(1, |e| e.id + 1);
        let created_at = last.map_or_else(Utc::now, |e| Utc::now().max(e.created_at));
        let entry = new.into_entry(id, created_at);
        self.entries.insert(id, entry.clone());
        Ok(entry)
    }

    fn put_entry(&mut self, entry: &LogEntry) -> StoreResult<()> {
        match self.entries.get_mut(&entry.id) {
            Some(slot) => {
                *slot = entry.clone();
                Ok(())
            }
            None => Err(StoreError::Inconsistent(format!(
                "log entry {} does not exist",
                entry.id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AccountStatus, AccountType, LedgerError, LogAction};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn new_account() -> NewAccount {
        NewAccount {
            owner_user_id: "1".to_string(),
            account_type: AccountType::Checking,
            status: AccountStatus::Active,
            opening_balance: Decimal::ZERO,
        }
    }

    fn deposit(account_id: AccountId) -> NewLogEntry {
        NewLogEntry {
            account_id,
            action: LogAction::Deposit,
            amount: dec!(5.00),
            counterparty_account_id: None,
            memo: None,
            pair_id: None,
            settled: false,
        }
    }

    #[test]
    fn ids_are_sequential() {
        let store = MemoryLedgerStore::new();
        let (a, b) = store
            .write(|txn| Ok((txn.insert_account(new_account())?, txn.insert_account(new_account())?)))
            .unwrap();
        assert_eq!((a.id, b.id), (1, 2));
    }

    #[test]
    fn failed_write_is_rolled_back() {
        let store = MemoryLedgerStore::new();
        let result: LedgerResult<()> = store.write(|txn| {
            let acc = txn.insert_account(new_account())?;
            txn.insert_entry(deposit(acc.id))?;
            Err(LedgerError::InvalidOperation("abort".to_string()))
        });
        assert!(result.is_err());

        let (accounts, pending) = store
            .read(|view| Ok((view.accounts()?, view.pending_entries()?)))
            .unwrap();
        assert!(accounts.is_empty());
        assert!(pending.is_empty());
    }

    #[test]
    fn entries_for_account_newest_first() {
        let store = MemoryLedgerStore::new();
        store
            .write(|txn| {
                let a = txn.insert_account(new_account())?;
                let b = txn.insert_account(new_account())?;
                txn.insert_entry(deposit(a.id))?;
                txn.insert_entry(deposit(b.id))?;
                txn.insert_entry(deposit(a.id))?;
                Ok(())
            })
            .unwrap();

        let entries = store.read(|v| Ok(v.entries_for_account(1, None)?)).unwrap();
        assert_eq!(entries.iter().map(|e| e.id).collect::<Vec<_>>(), vec![3, 1]);

        let capped = store.read(|v| Ok(v.entries_for_account(1, Some(1))?)).unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].id, 3);
    }

    #[test]
    fn put_account_requires_existing_row() {
        let store = MemoryLedgerStore::new();
        let result = store.write(|txn| {
            let mut acc = txn.insert_account(new_account())?;
            acc.id = 42;
            txn.put_account(&acc)?;
            Ok(())
        });
        assert!(matches!(result, Err(LedgerError::Storage(_))));
    }
}
