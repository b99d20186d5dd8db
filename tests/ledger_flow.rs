// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end flows through the public library API.

use argent_ledger::{
    auth::{authorize, Decision, Identity, Operation, Resource, Role},
    ledger::{
        AccountId, AccountStatus, AccountType, EntryStatus, Ledger, LedgerError, LogAction,
        NewAccount, SettlementMode,
    },
    storage::{LedgerStore, MemoryLedgerStore, RedbLedgerStore},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;

fn open<S: LedgerStore>(ledger: &Ledger<S>, owner: &str, balance: Decimal) -> AccountId {
    ledger
        .create_account(NewAccount {
            owner_user_id: owner.to_string(),
            account_type: AccountType::Checking,
            status: AccountStatus::Active,
            opening_balance: balance,
        })
        .unwrap()
        .id
}

#[test]
fn deferred_history_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ledger.redb");

    let (a, b, sent_id) = {
        let ledger = Ledger::new(RedbLedgerStore::open(&path).unwrap(), SettlementMode::Deferred);
        let a = open(&ledger, "alice", dec!(100));
        let b = open(&ledger, "bob", dec!(0));
        let receipt = ledger.transfer(a, b, dec!(40), Some("rent".into())).unwrap();
        ledger.deposit(b, dec!(5)).unwrap();
        (a, b, receipt.entries.sent.id)
    };

    // Pending work is still queued after reopening the file
    let ledger = Ledger::new(RedbLedgerStore::open(&path).unwrap(), SettlementMode::Deferred);
    let queue = ledger.pending_actions().unwrap();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].id, sent_id);
    assert_eq!(queue[1].action, LogAction::Deposit);

    ledger.validate_action(sent_id).unwrap();
    ledger.decline_action(queue[1].id).unwrap();

    assert_eq!(ledger.get_account(a).unwrap().balance, dec!(60.00));
    assert_eq!(ledger.get_account(b).unwrap().balance, dec!(40.00));
    assert!(ledger.pending_actions().unwrap().is_empty());

    let statuses: Vec<EntryStatus> = ledger
        .account_logs(b, None)
        .unwrap()
        .iter()
        .map(|e| e.status())
        .collect();
    assert_eq!(statuses, vec![EntryStatus::Declined, EntryStatus::Settled]);
}

#[test]
fn backends_agree_on_immediate_flow() {
    fn run<S: LedgerStore>(ledger: Ledger<S>) -> (Decimal, Decimal, usize) {
        let a = open(&ledger, "alice", dec!(100));
        let b = open(&ledger, "bob", dec!(0));
        ledger.transfer(a, b, dec!(25.50), None).unwrap();
        ledger.withdraw(b, dec!(0.50)).unwrap();
        let err = ledger.withdraw(a, dec!(1000)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        (
            ledger.get_account(a).unwrap().balance,
            ledger.get_account(b).unwrap().balance,
            ledger.account_logs(b, None).unwrap().len(),
        )
    }

    let temp_dir = TempDir::new().unwrap();
    let redb = run(Ledger::new(
        RedbLedgerStore::open(&temp_dir.path().join("ledger.redb")).unwrap(),
        SettlementMode::Immediate,
    ));
    let memory = run(Ledger::new(MemoryLedgerStore::new(), SettlementMode::Immediate));

    assert_eq!(redb, (dec!(74.50), dec!(25.00), 2));
    assert_eq!(redb, memory);
}

#[test]
fn policy_gates_ledger_operations() {
    let ledger = Ledger::new(MemoryLedgerStore::new(), SettlementMode::Deferred);
    let a = open(&ledger, "alice", dec!(10));
    let account = ledger.find_account(a).unwrap();

    let alice = Identity::new("alice", Role::Customer);
    let mallory = Identity::new("mallory", Role::Customer);
    let teller = Identity::new("teller-1", Role::Banker);

    let on_account = |who: &Identity, op| authorize(who, Resource::Account(account.as_ref()), op);
    assert_eq!(on_account(&alice, Operation::Transfer), Decision::Allow);
    assert_eq!(on_account(&mallory, Operation::Transfer), Decision::Deny);
    assert_eq!(on_account(&teller, Operation::Transfer), Decision::Deny);
    assert_eq!(on_account(&teller, Operation::ReadLogs), Decision::Allow);

    let missing = ledger.find_account(a + 100).unwrap();
    assert_eq!(
        authorize(&alice, Resource::Account(missing.as_ref()), Operation::ReadAccount),
        Decision::Deny
    );
    assert_eq!(
        authorize(&alice, Resource::Ledger, Operation::ValidateAction),
        Decision::Deny
    );
    assert_eq!(
        authorize(&teller, Resource::Ledger, Operation::ValidateAction),
        Decision::Allow
    );
}
