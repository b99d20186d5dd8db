// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// `Unavailable` is kept apart from `AuthenticationFailed` so clients can
/// tell "retry later" from "your credential is bad".
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Header is not `Token <value>` or `Bearer <value>`
    InvalidAuthHeader,
    /// The identity authority rejected the credential
    AuthenticationFailed(String),
    /// The identity authority could not be reached in time
    Unavailable(String),
    /// Caller is not allowed to perform the operation
    Forbidden,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::AuthenticationFailed(_) => "authentication_failed",
            AuthError::Unavailable(_) => "identity_unavailable",
            AuthError::Forbidden => "forbidden",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            AuthError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => write!(
                f,
                "Invalid authorization header format (expected 'Token <value>' or 'Bearer <value>')"
            ),
            AuthError::AuthenticationFailed(msg) => write!(f, "Authentication failed: {msg}"),
            AuthError::Unavailable(msg) => write!(f, "Identity service unavailable: {msg}"),
            AuthError::Forbidden => write!(f, "Insufficient permissions for this operation"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
