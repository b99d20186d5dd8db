// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup. Invalid values
//! abort startup rather than falling back silently.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LEDGER_DB_PATH` | redb ledger file | `/data/ledger.redb` |
//! | `IDENTITY_VALIDATE_URL` | Identity authority validation endpoint | `http://127.0.0.1:8000/api/validate-token/` |
//! | `IDENTITY_TIMEOUT_SECS` | Timeout for identity calls | `5` |
//! | `IDENTITY_CACHE_TTL_SECS` | Identity cache TTL | `300` |
//! | `IDENTITY_CACHE_CAPACITY` | Identity cache size | `10000` |
//! | `SETTLEMENT_MODE` | `deferred` or `immediate` | `deferred` |
//! | `TLS_CERT_PATH` | PEM certificate chain (HTTPS when set with key) | unset |
//! | `TLS_KEY_PATH` | PEM private key | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::ledger::SettlementMode;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LEDGER_DB_PATH_ENV: &str = "LEDGER_DB_PATH";
pub const IDENTITY_VALIDATE_URL_ENV: &str = "IDENTITY_VALIDATE_URL";
pub const IDENTITY_TIMEOUT_SECS_ENV: &str = "IDENTITY_TIMEOUT_SECS";
pub const IDENTITY_CACHE_TTL_SECS_ENV: &str = "IDENTITY_CACHE_TTL_SECS";
pub const IDENTITY_CACHE_CAPACITY_ENV: &str = "IDENTITY_CACHE_CAPACITY";
pub const SETTLEMENT_MODE_ENV: &str = "SETTLEMENT_MODE";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LEDGER_DB_PATH: &str = "/data/ledger.redb";
pub const DEFAULT_IDENTITY_VALIDATE_URL: &str = "http://127.0.0.1:8000/api/validate-token/";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} has an invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} and {1} must be set together")]
    Incomplete(&'static str, &'static str),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// PEM files for HTTPS.
#[derive(Debug, Clone, PartialEq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub ledger_db_path: PathBuf,
    pub identity_validate_url: Url,
    pub identity_timeout: Duration,
    pub identity_cache_ttl: Duration,
    pub identity_cache_capacity: usize,
    pub settlement_mode: SettlementMode,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_secs(var: &'static str, raw: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| invalid(var, &value, e)),
        None => Ok(Duration::from_secs(default)),
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get(PORT_ENV) {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|e| invalid(PORT_ENV, &value, e))?,
            None => DEFAULT_PORT,
        };
        let bind_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| invalid(HOST_ENV, &host, e))?;

        let url_raw =
            get(IDENTITY_VALIDATE_URL_ENV).unwrap_or_else(|| DEFAULT_IDENTITY_VALIDATE_URL.to_string());
        let identity_validate_url =
            Url::parse(&url_raw).map_err(|e| invalid(IDENTITY_VALIDATE_URL_ENV, &url_raw, e))?;

        let identity_cache_capacity = match get(IDENTITY_CACHE_CAPACITY_ENV) {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .map_err(|e| invalid(IDENTITY_CACHE_CAPACITY_ENV, &value, e))?,
            None => 10_000,
        };

        let settlement_mode = match get(SETTLEMENT_MODE_ENV) {
            Some(value) => value
                .parse::<SettlementMode>()
                .map_err(|e| invalid(SETTLEMENT_MODE_ENV, &value, e))?,
            None => SettlementMode::default(),
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::Incomplete(TLS_CERT_PATH_ENV, TLS_KEY_PATH_ENV)),
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            bind_addr,
            ledger_db_path: get(LEDGER_DB_PATH_ENV)
                .unwrap_or_else(|| DEFAULT_LEDGER_DB_PATH.to_string())
                .into(),
            identity_validate_url,
            identity_timeout: parse_secs(
                IDENTITY_TIMEOUT_SECS_ENV,
                get(IDENTITY_TIMEOUT_SECS_ENV),
                5,
            )?,
            identity_cache_ttl: parse_secs(
                IDENTITY_CACHE_TTL_SECS_ENV,
                get(IDENTITY_CACHE_TTL_SECS_ENV),
                300,
            )?,
            identity_cache_capacity,
            settlement_mode,
            tls,
            log_format,
        })
    }
}
