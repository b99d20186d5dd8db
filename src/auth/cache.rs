// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU + TTL cache for resolved identities.
//!
//! Keys are SHA-256 digests of the credential, so raw tokens never sit in
//! memory longer than one request. Entries may be stale for up to one TTL.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;
use utoipa::ToSchema;

use super::error::AuthError;
use super::identity::Identity;
use super::resolver::IdentityResolver;

/// Default identity cache TTL (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

type TokenDigest = [u8; 32];

struct CacheEntry {
    identity: Identity,
    inserted_at: Instant,
}

/// Snapshot of cache counters for the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// In-process identity cache.
pub struct IdentityCache {
    cache: Mutex<LruCache<TokenDigest, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

fn digest(token: &str) -> TokenDigest {
    Sha256::digest(token.as_bytes()).into()
}

impl IdentityCache {
    /// - `capacity`: Max number of credentials to remember.
    /// - `ttl`: Time-to-live for each entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Entries are written whole, so a poisoned lock is recovered.
    fn lock(&self) -> MutexGuard<'_, LruCache<TokenDigest, CacheEntry>> {
        self.cache.lock().unwrap_or_else(|poisoned| {
            warn!("Identity cache mutex poisoned; recovering");
            self.cache.clear_poison();
            poisoned.into_inner()
        })
    }

    /// Returns `None` if not cached or expired.
    pub fn get(&self, token: &str) -> Option<Identity> {
        let key = digest(token);
        let mut cache = self.lock();
        let fresh = match cache.get(&key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.identity.clone()),
            Some(_) => {
                // Expired
                cache.pop(&key);
                None
            }
            None => None,
        };
        let counter = if fresh.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        fresh
    }

    pub fn put(&self, token: &str, identity: Identity) {
        self.lock().put(
            digest(token),
            CacheEntry {
                identity,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.lock().len();
        CacheStats {
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Wraps a resolver with an [`IdentityCache`]. Failures are never cached.
pub struct CachedIdentityResolver<R> {
    inner: R,
    cache: IdentityCache,
}

impl<R: IdentityResolver> CachedIdentityResolver<R> {
    pub fn new(inner: R, cache: IdentityCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: IdentityResolver> IdentityResolver for CachedIdentityResolver<R> {
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        if let Some(identity) = self.cache.get(token) {
            return Ok(identity);
        }
        let identity = self.inner.resolve(token).await?;
        self.cache.put(token, identity.clone());
        Ok(identity)
    }
}
