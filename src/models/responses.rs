//! Response DTOs for the command shell
//!
//! Every command answers with exactly one JSON object on its own line.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::CacheStats;

/// Any shell response. Serializes as the wrapped body.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Get(GetResponse),
    Set(SetResponse),
    Delete(DeleteResponse),
    Has(HasResponse),
    Ttl(TtlResponse),
    Expire(ExpireResponse),
    Keys(KeysResponse),
    Stats(StatsResponse),
    Message(MessageResponse),
    Error(ErrorResponse),
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }
}

/// Response for `GET`
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    /// `null` on a miss
    pub value: Option<String>,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Option<String>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response for `SET`
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response for `DEL`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub key: String,
    /// False if the key was not present
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HasResponse {
    pub key: String,
    pub exists: bool,
}

/// Response for `TTL`
#[derive(Debug, Clone, Serialize)]
pub struct TtlResponse {
    pub key: String,
    /// Seconds left, `null` if the key is missing or persistent
    pub ttl: Option<u64>,
    /// Deadline in RFC 3339
    pub expires_at: Option<String>,
}

impl TtlResponse {
    /// # Arguments
    /// * `expires_at` - deadline as a unix timestamp in seconds
    pub fn new(key: impl Into<String>, ttl: Option<u64>, expires_at: Option<u64>) -> Self {
        Self {
            key: key.into(),
            ttl,
            expires_at: expires_at.and_then(to_rfc3339),
        }
    }
}

fn to_rfc3339(unix_secs: u64) -> Option<String> {
    let secs = i64::try_from(unix_secs).ok()?;
    DateTime::<Utc>::from_timestamp(secs, 0).map(|deadline| deadline.to_rfc3339())
}

/// Response for `EXPIRE` and `PERSIST`
#[derive(Debug, Clone, Serialize)]
pub struct ExpireResponse {
    pub key: String,
    /// False if the key was not present
    pub updated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub count: usize,
    pub keys: Vec<String>,
}

impl KeysResponse {
    pub fn new(mut keys: Vec<String>) -> Self {
        keys.sort();
        Self {
            count: keys.len(),
            keys,
        }
    }
}

/// Response for `STATS`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Acknowledgement for `CLEAR` and `QUIT`
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
