// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity resolution against the external identity authority.
//!
//! The authority exposes a validation endpoint: `POST <url>` with
//! `Authorization: Token <value>` answers 200 with the user's record, or 401
//! when the credential is expired or unknown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::error::AuthError;
use super::identity::Identity;

/// Default timeout for a validation round-trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Shorten a credential for logs (never log it whole).
pub fn token_hint(token: &str) -> String {
    let prefix: String = token.chars().take(5).collect();
    format!("{prefix}...")
}

/// Turns a bearer credential into a caller identity.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError>;
}

#[async_trait]
impl<R: IdentityResolver + ?Sized> IdentityResolver for Box<R> {
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        (**self).resolve(token).await
    }
}

/// Resolver that calls the identity authority over HTTP.
#[derive(Clone)]
pub struct RemoteIdentityResolver {
    validate_url: url::Url,
    client: reqwest::Client,
}

impl RemoteIdentityResolver {
    pub fn new(validate_url: url::Url, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            validate_url,
            client,
        })
    }
}

#[async_trait]
impl IdentityResolver for RemoteIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        let response = self
            .client
            .post(self.validate_url.clone())
            .header(AUTHORIZATION, format!("Token {token}"))
            .send()
            .await
            .map_err(|e| {
                let class = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connect"
                } else {
                    "request"
                };
                warn!(
                    error = %e,
                    failure = class,
                    url = %self.validate_url,
                    "Identity authority unreachable"
                );
                AuthError::Unavailable(format!("identity authority {class} failure"))
            })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED => {
                debug!(token = %token_hint(token), "Identity authority rejected credential");
                return Err(AuthError::AuthenticationFailed(
                    "token expired or invalid".to_string(),
                ));
            }
            status => {
                warn!(%status, failure = "status", "Identity authority returned an error");
                return Err(AuthError::AuthenticationFailed(format!(
                    "identity authority returned {status}"
                )));
            }
        }

        let claims: Map<String, Value> = response.json().await.map_err(|e| {
            if e.is_decode() {
                warn!(error = %e, failure = "body", "Malformed identity authority response");
                return AuthError::AuthenticationFailed("malformed identity response".to_string());
            }
            let class = if e.is_timeout() { "timeout" } else { "body" };
            warn!(
                error = %e,
                failure = class,
                url = %self.validate_url,
                "Identity authority response interrupted"
            );
            AuthError::Unavailable(format!("identity authority {class} failure"))
        })?;

        Identity::from_claims(claims)
    }
}

/// Fixed token table, for tests and local development.
#[derive(Default)]
pub struct StaticIdentityResolver {
    identities: HashMap<String, Identity>,
    calls: AtomicUsize,
}

impl StaticIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.identities.insert(token.into(), identity);
        self
    }

    /// Number of `resolve` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.identities
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::AuthenticationFailed("token expired or invalid".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CachedIdentityResolver, IdentityCache, Role};
    use axum::{
        extract::State,
        http::HeaderMap,
        response::{IntoResponse, Response},
        routing::post,
        Json, Router,
    };
    use serde_json::json;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const VALIDATE_PATH: &str = "/api/validate-token/";

    async fn validate(State(hits): State<Arc<AtomicUsize>>, headers: HeaderMap) -> Response {
        hits.fetch_add(1, Ordering::Relaxed);
        let auth = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        match auth {
            "Token good" => {
                Json(json!({"id": 42, "role": "banquier", "email": "b@example.com"})).into_response()
            }
            "Token anonymous" => Json(json!({"role": "customer"})).into_response(),
            "Token garbled" => (StatusCode::OK, "<html>not json</html>").into_response(),
            "Token boom" => StatusCode::BAD_GATEWAY.into_response(),
            _ => StatusCode::UNAUTHORIZED.into_response(),
        }
    }

    /// Local identity authority; returns its validation url and a hit counter.
    async fn spawn_authority() -> (url::Url, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(VALIDATE_PATH, post(validate))
            .with_state(Arc::clone(&hits));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let url = url::Url::parse(&format!("http://{addr}{VALIDATE_PATH}")).unwrap();
        (url, hits)
    }

    /// Authority that sends a 200 header and part of the body, then either
    /// hangs or hangs up.
    async fn spawn_truncating_authority(hang: bool) -> url::Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let head = "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 64\r\n\r\n{\"id\":";
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            if hang {
                std::future::pending::<()>().await;
            }
        });
        url::Url::parse(&format!("http://{addr}{VALIDATE_PATH}")).unwrap()
    }

    fn remote(url: url::Url) -> RemoteIdentityResolver {
        RemoteIdentityResolver::new(url, Duration::from_millis(500)).unwrap()
    }

    #[test]
    fn token_hint_truncates() {
        assert_eq!(token_hint("abcdefghij"), "abcde...");
        assert_eq!(token_hint("ab"), "ab...");
    }

    #[tokio::test]
    async fn static_resolver_known_and_unknown() {
        let resolver =
            StaticIdentityResolver::new().with("t-1", Identity::new("1", Role::Banker));
        let identity = resolver.resolve("t-1").await.unwrap();
        assert_eq!(identity.role, Role::Banker);
        assert!(matches!(
            resolver.resolve("nope").await,
            Err(AuthError::AuthenticationFailed(_))
        ));
        assert_eq!(resolver.calls(), 2);
    }

    #[tokio::test]
    async fn remote_resolver_maps_user_record() {
        let (url, _) = spawn_authority().await;
        let identity = remote(url).resolve("good").await.unwrap();
        assert_eq!(identity.user_id, "42");
        assert_eq!(identity.role, Role::Banker);
        assert_eq!(identity.claims["email"], "b@example.com");
    }

    #[tokio::test]
    async fn remote_resolver_maps_rejections() {
        let (url, _) = spawn_authority().await;
        let resolver = remote(url);

        assert_eq!(
            resolver.resolve("expired").await.unwrap_err(),
            AuthError::AuthenticationFailed("token expired or invalid".to_string())
        );
        assert_eq!(
            resolver.resolve("boom").await.unwrap_err(),
            AuthError::AuthenticationFailed("identity authority returned 502 Bad Gateway".to_string())
        );
        assert_eq!(
            resolver.resolve("garbled").await.unwrap_err(),
            AuthError::AuthenticationFailed("malformed identity response".to_string())
        );
        assert!(matches!(
            resolver.resolve("anonymous").await,
            Err(AuthError::AuthenticationFailed(_))
        ));
    }

    #[tokio::test]
    async fn interrupted_body_is_unavailable() {
        for hang in [true, false] {
            let url = spawn_truncating_authority(hang).await;
            let err = remote(url).resolve("good").await.unwrap_err();
            assert!(matches!(err, AuthError::Unavailable(_)), "hang={hang}: {err:?}");
        }
    }

    #[tokio::test]
    async fn cached_remote_resolver_only_keeps_successes() {
        let (url, hits) = spawn_authority().await;
        let resolver = CachedIdentityResolver::new(remote(url), IdentityCache::new(10, Duration::from_secs(60)));

        for _ in 0..2 {
            assert_eq!(resolver.resolve("good").await.unwrap().user_id, "42");
        }
        assert_eq!(hits.load(Ordering::Relaxed), 1);

        for _ in 0..2 {
            assert!(resolver.resolve("expired").await.is_err());
        }
        assert_eq!(hits.load(Ordering::Relaxed), 3);
        assert_eq!(resolver.cache().stats().entries, 1);
    }

    #[tokio::test]
    async fn unreachable_authority_is_unavailable() {
        // Port 9 on loopback: nothing listens there in test environments
        let url = url::Url::parse("http://127.0.0.1:9/api/validate-token/").unwrap();
        let resolver = RemoteIdentityResolver::new(url, Duration::from_millis(500)).unwrap();
        let err = resolver.resolve("whatever").await.unwrap_err();
        assert!(matches!(err, AuthError::Unavailable(_)));
    }
}
