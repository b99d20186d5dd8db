// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resolved caller identity.

use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::error::AuthError;
use super::roles::Role;

/// A caller as vouched for by the identity authority.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Identity {
    /// User id from the authority (compared against `Account::owner_user_id`)
    pub user_id: String,
    pub role: Role,
    /// Everything the authority returned, untouched
    #[schema(value_type = Object)]
    pub claims: Map<String, Value>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            claims: Map::new(),
        }
    }

    /// Build an identity from the authority's validation response.
    ///
    /// The user id is `id` (or `user_id`), as a number or a string. A
    /// missing or unknown `role` means customer.
    pub fn from_claims(claims: Map<String, Value>) -> Result<Self, AuthError> {
        let user_id = ["id", "user_id"]
            .iter()
            .find_map(|key| match claims.get(*key) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .ok_or_else(|| {
                AuthError::AuthenticationFailed("identity response carries no user id".to_string())
            })?;

        let role = claims
            .get("role")
            .and_then(Value::as_str)
            .and_then(Role::from_str)
            .unwrap_or_default();

        Ok(Self {
            user_id,
            role,
            claims,
        })
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn numeric_id_and_legacy_role() {
        let identity =
            Identity::from_claims(claims(json!({"id": 42, "role": "banquier", "email": "b@x"})))
                .unwrap();
        assert_eq!(identity.user_id, "42");
        assert_eq!(identity.role, Role::Banker);
        assert_eq!(identity.claims["email"], "b@x");
    }

    #[test]
    fn user_id_fallback_and_default_role() {
        let identity = Identity::from_claims(claims(json!({"user_id": "u-7"}))).unwrap();
        assert_eq!(identity.user_id, "u-7");
        assert_eq!(identity.role, Role::Customer);

        let unknown = Identity::from_claims(claims(json!({"id": 1, "role": "teller"}))).unwrap();
        assert_eq!(unknown.role, Role::Customer);
    }

    #[test]
    fn missing_id_is_rejected() {
        let err = Identity::from_claims(claims(json!({"role": "banker"}))).unwrap_err();
        assert!(matches!(err, AuthError::AuthenticationFailed(_)));
    }
}
