// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Callers authenticate with a credential issued by an external identity
//! authority; this service never issues or stores credentials itself.
//!
//! ## Auth Flow
//!
//! 1. Client sends `Authorization: Token <value>` (or `Bearer <value>`)
//! 2. The `Auth` extractor parses the header
//! 3. The identity resolver:
//!    - Answers from the TTL cache when it can
//!    - Otherwise POSTs the credential to the authority's validation endpoint
//!    - Builds a typed [`Identity`] (`user_id`, `role`, raw claims)
//! 4. Handlers call [`policy::require`] before touching the ledger
//!
//! ## Security
//!
//! - Only successful resolutions are cached (keyed by SHA-256 of the token)
//! - Authority timeouts surface as 503, rejected credentials as 401
//! - Unknown accounts are denied (403) rather than reported missing

pub mod cache;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod policy;
pub mod resolver;
pub mod roles;

pub use cache::{CacheStats, CachedIdentityResolver, IdentityCache};
pub use error::AuthError;
pub use extractor::{Auth, OptionalAuth};
pub use identity::Identity;
pub use policy::{authorize, require, Decision, Operation, Resource};
pub use resolver::{IdentityResolver, RemoteIdentityResolver, StaticIdentityResolver};
pub use roles::Role;
