//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::error::{CacheError, Result};

/// Which eviction policy a configured cache gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionKind {
    Lru,
    Lfuda,
    /// Unbounded cache
    None,
}

impl FromStr for EvictionKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionKind::Lru),
            "lfuda" => Ok(EvictionKind::Lfuda),
            "none" => Ok(EvictionKind::None),
            other => Err(CacheError::InvalidConfig(format!(
                "unknown eviction policy '{}' (expected lru, lfuda or none)",
                other
            ))),
        }
    }
}

impl fmt::Display for EvictionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvictionKind::Lru => "lru",
            EvictionKind::Lfuda => "lfuda",
            EvictionKind::None => "none",
        };
        f.write_str(name)
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Capacity handed to the eviction policy
    pub max_entries: usize,
    /// Default TTL in seconds for entries without explicit TTL (0 = never expires)
    pub default_ttl: u64,
    /// Eviction policy to attach
    pub eviction: EvictionKind,
    /// Whether to attach the expiration policy
    pub gc_enabled: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults, except
    /// `EVICTION_POLICY`, where an unknown name is an error.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Eviction capacity (default: 1000)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 0)
    /// - `EVICTION_POLICY` - `lru`, `lfuda` or `none` (default: lru)
    /// - `GC_ENABLED` - Attach the expiration policy (default: true)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let eviction = match env::var("EVICTION_POLICY") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.eviction,
        };

        Ok(Self {
            max_entries: env::var("MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_entries),
            default_ttl: env::var("DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl),
            eviction,
            gc_enabled: env::var("GC_ENABLED")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.gc_enabled),
        })
    }

    /// Rejects settings no cache can be built from.
    pub fn validate(&self) -> Result<()> {
        if self.eviction != EvictionKind::None && self.max_entries == 0 {
            return Err(CacheError::InvalidConfig(format!(
                "MAX_ENTRIES must be at least 1 with the {} eviction policy",
                self.eviction
            )));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: 0,
            eviction: EvictionKind::Lru,
            gc_enabled: true,
        }
    }
}
