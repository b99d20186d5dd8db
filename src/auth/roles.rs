// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Caller roles as reported by the identity authority.
///
/// ## Role Hierarchy
///
/// - `Administrator` - Everything a banker can do
/// - `Banker` - Reads every account, works the approval queue
/// - `Customer` - Acts on accounts they own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Account holder (least privilege)
    #[default]
    Customer,
    /// Bank staff approving pending actions
    Banker,
    /// Full administrative access
    Administrator,
}

impl Role {
    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        match (self, required) {
            (Role::Administrator, _) => true,
            (Role::Banker, Role::Banker | Role::Customer) => true,
            (Role::Customer, Role::Customer) => true,
            _ => false,
        }
    }

    /// Banker or administrator.
    pub fn is_staff(&self) -> bool {
        self.has_privilege(Role::Banker)
    }

    /// Parse role from string (case-insensitive).
    /// Accepts the identity authority's legacy French role names.
    pub fn from_str(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "customer" | "client" => Some(Role::Customer),
            "banker" | "banquier" => Some(Role::Banker),
            "administrator" | "admin" | "administrateur" => Some(Role::Administrator),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Banker => write!(f, "banker"),
            Role::Administrator => write!(f, "administrator"),
        }
    }
}
