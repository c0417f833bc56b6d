//! Shell command parsing
//!
//! One command per line, whitespace separated, case-insensitive verb.

use std::str::FromStr;

use crate::error::CacheError;

/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `SET key value [ttl]`
    Set {
        key: String,
        value: String,
        ttl: Option<u64>,
    },
    Get { key: String },
    Del { key: String },
    Has { key: String },
    Ttl { key: String },
    /// `EXPIRE key ttl`
    Expire { key: String, ttl: u64 },
    Persist { key: String },
    Keys,
    Stats,
    Clear,
    Quit,
}

impl Command {
    /// Verb as typed by the user, upper-cased.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::Del { .. } => "DEL",
            Command::Has { .. } => "HAS",
            Command::Ttl { .. } => "TTL",
            Command::Expire { .. } => "EXPIRE",
            Command::Persist { .. } => "PERSIST",
            Command::Keys => "KEYS",
            Command::Stats => "STATS",
            Command::Clear => "CLEAR",
            Command::Quit => "QUIT",
        }
    }
}

impl FromStr for Command {
    type Err = CacheError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let verb = parts
            .next()
            .ok_or_else(|| invalid("empty command"))?
            .to_ascii_uppercase();
        let args: Vec<&str> = parts.collect();

        let command = match (verb.as_str(), args.as_slice()) {
            ("SET", [key, value]) => Command::Set {
                key: parse_key(key)?,
                value: value.to_string(),
                ttl: None,
            },
            ("SET", [key, value, ttl]) => Command::Set {
                key: parse_key(key)?,
                value: value.to_string(),
                ttl: Some(parse_ttl(ttl)?),
            },
            ("GET", [key]) => Command::Get {
                key: parse_key(key)?,
            },
            ("DEL", [key]) => Command::Del {
                key: parse_key(key)?,
            },
            ("HAS", [key]) => Command::Has {
                key: parse_key(key)?,
            },
            ("TTL", [key]) => Command::Ttl {
                key: parse_key(key)?,
            },
            ("EXPIRE", [key, ttl]) => Command::Expire {
                key: parse_key(key)?,
                ttl: parse_ttl(ttl)?,
            },
            ("PERSIST", [key]) => Command::Persist {
                key: parse_key(key)?,
            },
            ("KEYS", []) => Command::Keys,
            ("STATS", []) => Command::Stats,
            ("CLEAR", []) => Command::Clear,
            ("QUIT" | "EXIT", []) => Command::Quit,
            (
                "SET" | "GET" | "DEL" | "HAS" | "TTL" | "EXPIRE" | "PERSIST" | "KEYS" | "STATS"
                | "CLEAR" | "QUIT" | "EXIT",
                _,
            ) => return Err(invalid(format!("wrong number of arguments for {}", verb))),
            _ => return Err(invalid(format!("unknown command '{}'", verb))),
        };
        Ok(command)
    }
}

fn invalid(message: impl Into<String>) -> CacheError {
    CacheError::InvalidRequest(message.into())
}

fn parse_key(key: &str) -> Result<String, CacheError> {
    if key.len() > MAX_KEY_LENGTH {
        return Err(invalid(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        )));
    }
    Ok(key.to_string())
}

fn parse_ttl(ttl: &str) -> Result<u64, CacheError> {
    ttl.parse()
        .map_err(|_| invalid(format!("ttl must be a whole number of seconds, got '{}'", ttl)))
}
