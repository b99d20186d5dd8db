// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated callers.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(caller): Auth) -> impl IntoResponse {
//!     // caller is Identity
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

use super::{AuthError, Identity, IdentityResolver};
use crate::state::AppState;

/// Pull the credential out of an `Authorization` header value.
///
/// The value must be exactly two whitespace-separated parts with a `Token`
/// or `Bearer` scheme (case-insensitive).
pub fn parse_credential(header: &str) -> Result<&str, AuthError> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") =>
        {
            Ok(token)
        }
        _ => Err(AuthError::InvalidAuthHeader),
    }
}

/// Extractor for authenticated callers.
///
/// Resolves the credential through the state's identity resolver (cached).
///
/// # Example
///
/// ```rust,ignore
/// async fn my_accounts(
///     Auth(caller): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<Vec<Account>>, ApiError> {
///     // caller.user_id is the identity authority's user id
/// }
/// ```
pub struct Auth(pub Identity);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Already resolved earlier in this request
        if let Some(identity) = parts.extensions.get::<Identity>().cloned() {
            return Ok(Auth(identity));
        }

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;
        let token = parse_credential(header)?;

        let identity = state.identity.resolve(token).await?;
        debug!(user_id = %identity.user_id, role = %identity.role, "Caller authenticated");

        parts.extensions.insert(identity.clone());
        Ok(Auth(identity))
    }
}

/// Optional authentication extractor.
///
/// `None` when no `Authorization` header is sent. A header that is present
/// but bad still rejects, so a failing identity authority is not mistaken
/// for an anonymous caller.
pub struct OptionalAuth(pub Option<Identity>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) && parts.extensions.get::<Identity>().is_none() {
            return Ok(OptionalAuth(None));
        }
        let Auth(identity) = Auth::from_request_parts(parts, state).await?;
        Ok(OptionalAuth(Some(identity)))
    }
}
