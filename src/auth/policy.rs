// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization policy.
//!
//! [`authorize`] is a pure function of the caller, the resource, and the
//! operation. Handlers resolve the account first (by account id, never by the
//! raw path id as a user id) and pass `None` when it does not exist; an
//! unresolved account is always denied so unauthorized callers cannot probe
//! which ids exist.
//!
//! | Operation class | Allowed for |
//! |-----------------|-------------|
//! | read account / logs | owner, banker, administrator |
//! | deposit / withdraw / transfer | owner only |
//! | approval queue, state change, listing by user, funded opening | banker, administrator |

use tracing::warn;

use super::error::AuthError;
use super::identity::Identity;
use crate::ledger::Account;

/// Trait for resources that have an owner.
pub trait OwnedResource {
    fn owner_user_id(&self) -> &str;
}

impl OwnedResource for Account {
    fn owner_user_id(&self) -> &str {
        &self.owner_user_id
    }
}

/// What an operation is performed on.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// A specific account, `None` when lookup found nothing
    Account(Option<&'a Account>),
    /// The ledger as a whole (approval queue, cross-user listings)
    Ledger,
}

/// Operations subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ReadAccount,
    ReadLogs,
    Deposit,
    Withdraw,
    Transfer,
    ListPending,
    ListPendingCreation,
    /// Open an account with a non-zero balance
    OpenFunded,
    ListByUser,
    ValidateAction,
    DeclineAction,
    ChangeState,
}

impl Operation {
    fn is_read(&self) -> bool {
        matches!(self, Operation::ReadAccount | Operation::ReadLogs)
    }

    fn is_mutation(&self) -> bool {
        matches!(
            self,
            Operation::Deposit | Operation::Withdraw | Operation::Transfer
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

fn owns(caller: &Identity, resource: &impl OwnedResource) -> bool {
    resource.owner_user_id() == caller.user_id
}

/// Decide whether `caller` may perform `operation` on `resource`.
pub fn authorize(caller: &Identity, resource: Resource<'_>, operation: Operation) -> Decision {
    let allowed = if operation.is_read() {
        match resource {
            Resource::Account(Some(account)) => owns(caller, account) || caller.is_staff(),
            _ => false,
        }
    } else if operation.is_mutation() {
        match resource {
            Resource::Account(Some(account)) => owns(caller, account),
            _ => false,
        }
    } else {
        caller.is_staff()
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// [`authorize`], mapped to `AuthError::Forbidden` on deny.
pub fn require(caller: &Identity, resource: Resource<'_>, operation: Operation) -> Result<(), AuthError> {
    match authorize(caller, resource, operation) {
        Decision::Allow => Ok(()),
        Decision::Deny => {
            let account_id = match resource {
                Resource::Account(Some(account)) => Some(account.id),
                _ => None,
            };
            warn!(
                user_id = %caller.user_id,
                role = %caller.role,
                ?operation,
                ?account_id,
                "Authorization denied"
            );
            Err(AuthError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::ledger::{AccountStatus, AccountType};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn account(owner: &str) -> Account {
        Account {
            id: 5,
            owner_user_id: owner.to_string(),
            balance: Decimal::ZERO,
            account_type: AccountType::Checking,
            status: AccountStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn owner_reads_and_mutates() {
        let acc = account("u1");
        let owner = Identity::new("u1", Role::Customer);
        for op in [
            Operation::ReadAccount,
            Operation::ReadLogs,
            Operation::Deposit,
            Operation::Withdraw,
            Operation::Transfer,
        ] {
            assert_eq!(authorize(&owner, Resource::Account(Some(&acc)), op), Decision::Allow);
        }
    }

    #[test]
    fn staff_reads_but_cannot_move_foreign_money() {
        let acc = account("u1");
        let banker = Identity::new("b1", Role::Banker);
        assert_eq!(
            authorize(&banker, Resource::Account(Some(&acc)), Operation::ReadLogs),
            Decision::Allow
        );
        assert_eq!(
            authorize(&banker, Resource::Account(Some(&acc)), Operation::Transfer),
            Decision::Deny
        );
    }

    #[test]
    fn stranger_is_denied() {
        let acc = account("u1");
        let stranger = Identity::new("u2", Role::Customer);
        assert_eq!(
            authorize(&stranger, Resource::Account(Some(&acc)), Operation::Transfer),
            Decision::Deny
        );
        assert_eq!(
            authorize(&stranger, Resource::Account(Some(&acc)), Operation::ReadAccount),
            Decision::Deny
        );
        assert!(matches!(
            require(&stranger, Resource::Account(Some(&acc)), Operation::Deposit),
            Err(AuthError::Forbidden)
        ));
    }

    #[test]
    fn missing_account_fails_closed() {
        let admin = Identity::new("a1", Role::Administrator);
        assert_eq!(
            authorize(&admin, Resource::Account(None), Operation::ReadAccount),
            Decision::Deny
        );
        assert_eq!(
            authorize(&admin, Resource::Account(None), Operation::Deposit),
            Decision::Deny
        );
    }

    #[test]
    fn approval_operations_need_staff() {
        let customer = Identity::new("u1", Role::Customer);
        let banker = Identity::new("b1", Role::Banker);
        let admin = Identity::new("a1", Role::Administrator);
        for op in [
            Operation::ListPending,
            Operation::ListPendingCreation,
            Operation::OpenFunded,
            Operation::ListByUser,
            Operation::ValidateAction,
            Operation::DeclineAction,
            Operation::ChangeState,
        ] {
            assert_eq!(authorize(&customer, Resource::Ledger, op), Decision::Deny);
            assert_eq!(authorize(&banker, Resource::Ledger, op), Decision::Allow);
            assert_eq!(authorize(&admin, Resource::Ledger, op), Decision::Allow);
        }
    }

    #[test]
    fn owning_customer_still_cannot_change_state() {
        let acc = account("u1");
        let owner = Identity::new("u1", Role::Customer);
        assert_eq!(
            authorize(&owner, Resource::Account(Some(&acc)), Operation::ChangeState),
            Decision::Deny
        );
    }
}
