//! Configuration loading and representation.
//!
//! Everything comes from environment variables:
//!
//! | variable | default |
//! |---|---|
//! | `BIND_ADDR` | `0.0.0.0:8080` |
//! | `USE_PERSISTENT_STORES` | `false` |
//! | `DATABASE_URL` | required when persistent |
//! | `DATABASE_MAX_CONNECTIONS` | `10` |
//! | `STOCK_MAX_QUANTITY` | `999999` |
//! | `STOCK_LOCK_TIMEOUT_MS` | `5000` |

use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::mutator::MutationPolicy;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

// Keeps credentials in the URL out of logs.
impl core::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    InMemory,
    Postgres(DatabaseConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub storage: StorageConfig,
    pub policy: MutationPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let lookup = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let bind_addr = parse_or("BIND_ADDR", lookup("BIND_ADDR"), || {
            DEFAULT_BIND_ADDR.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                reason: e.to_string(),
            })
        })?;

        let persistent = match lookup("USE_PERSISTENT_STORES") {
            None => false,
            Some(raw) => parse_flag("USE_PERSISTENT_STORES", raw)?,
        };

        let storage = if persistent {
            let url = lookup("DATABASE_URL")
                .ok_or(ConfigError::Missing("DATABASE_URL"))?
                .to_string();
            let max_connections = parse_or(
                "DATABASE_MAX_CONNECTIONS",
                lookup("DATABASE_MAX_CONNECTIONS"),
                || Ok(DEFAULT_MAX_CONNECTIONS),
            )?;
            if max_connections == 0 {
                return Err(ConfigError::Invalid {
                    key: "DATABASE_MAX_CONNECTIONS",
                    reason: "must be at least 1".to_string(),
                });
            }
            StorageConfig::Postgres(DatabaseConfig {
                url,
                max_connections,
            })
        } else {
            StorageConfig::InMemory
        };

        let defaults = MutationPolicy::default();
        let max_quantity = parse_or("STOCK_MAX_QUANTITY", lookup("STOCK_MAX_QUANTITY"), || {
            Ok(defaults.max_quantity)
        })?;
        if max_quantity == 0 || i64::try_from(max_quantity).is_err() {
            return Err(ConfigError::Invalid {
                key: "STOCK_MAX_QUANTITY",
                reason: format!("must be between 1 and {}", i64::MAX),
            });
        }
        let lock_timeout = match lookup("STOCK_LOCK_TIMEOUT_MS") {
            None => defaults.lock_timeout,
            Some(raw) => Duration::from_millis(parse("STOCK_LOCK_TIMEOUT_MS", raw)?),
        };
        // Postgres reads a zero lock_timeout as "wait forever".
        if lock_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "STOCK_LOCK_TIMEOUT_MS",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            bind_addr,
            storage,
            policy: MutationPolicy {
                max_quantity,
                lock_timeout,
            },
        })
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        reason: format!("'{raw}': {e}"),
    })
}

fn parse_or<T>(
    key: &'static str,
    raw: Option<&str>,
    default: impl FnOnce() -> Result<T, ConfigError>,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    match raw {
        Some(raw) => parse(key, raw),
        None => default(),
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            reason: format!("'{raw}' is not a boolean"),
        }),
    }
}
