// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{CachedIdentityResolver, IdentityCache, IdentityResolver};
use crate::ledger::Ledger;
use crate::storage::RedbLedgerStore;

/// The production transaction engine.
pub type LedgerService = Ledger<RedbLedgerStore>;

/// Identity resolution with the shared credential cache in front.
pub type IdentityService = CachedIdentityResolver<Box<dyn IdentityResolver>>;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerService>,
    pub identity: Arc<IdentityService>,
}

impl AppState {
    pub fn new(
        ledger: LedgerService,
        resolver: impl IdentityResolver + 'static,
        cache: IdentityCache,
    ) -> Self {
        let resolver: Box<dyn IdentityResolver> = Box::new(resolver);
        Self {
            ledger: Arc::new(ledger),
            identity: Arc::new(CachedIdentityResolver::new(resolver, cache)),
        }
    }
}

#[cfg(test)]
impl AppState {
    /// State backed by a fresh redb file; keep the `TempDir` alive for the test.
    pub fn for_tests(
        resolver: crate::auth::StaticIdentityResolver,
        mode: crate::ledger::SettlementMode,
    ) -> (Self, tempfile::TempDir) {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let store = RedbLedgerStore::open(&temp_dir.path().join("ledger.redb"))
            .expect("Failed to open ledger database");
        let state = Self::new(
            Ledger::new(store, mode),
            resolver,
            IdentityCache::new(100, crate::auth::cache::DEFAULT_TTL),
        );
        (state, temp_dir)
    }
}
