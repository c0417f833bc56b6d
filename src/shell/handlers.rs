//! Shell Handlers
//!
//! Runs one parsed command against the cache and builds its response.

use crate::cache::Cache;
use crate::error::Result;
use crate::models::{
    Command, DeleteResponse, ErrorResponse, ExpireResponse, GetResponse, HasResponse,
    KeysResponse, MessageResponse, Response, SetResponse, StatsResponse, TtlResponse,
};

/// Cache type served by the shell.
pub type ShellCache = Cache<String, String>;

/// Executes `command`, turning engine errors into an error response.
pub async fn execute(cache: &ShellCache, command: Command) -> Response {
    match dispatch(cache, command).await {
        Ok(response) => response,
        Err(err) => Response::Error(ErrorResponse::new(err.to_string())),
    }
}

async fn dispatch(cache: &ShellCache, command: Command) -> Result<Response> {
    let response = match command {
        Command::Set { key, value, ttl } => {
            cache.set(key.clone(), value, ttl).await?;
            Response::Set(SetResponse::new(key))
        }
        Command::Get { key } => {
            let value = cache.get(&key).await;
            Response::Get(GetResponse::new(key, value))
        }
        Command::Del { key } => {
            let deleted = cache.del(&key).await?;
            Response::Delete(DeleteResponse { key, deleted })
        }
        Command::Has { key } => {
            let exists = cache.has(&key).await;
            Response::Has(HasResponse { key, exists })
        }
        Command::Ttl { key } => {
            let ttl = cache.ttl(&key).await;
            let expires_at = cache.expires_at(&key).await;
            Response::Ttl(TtlResponse::new(key, ttl, expires_at))
        }
        Command::Expire { key, ttl } => {
            let updated = cache.expire(&key, ttl).await?;
            Response::Expire(ExpireResponse { key, updated })
        }
        Command::Persist { key } => {
            let updated = cache.persist(&key).await?;
            Response::Expire(ExpireResponse { key, updated })
        }
        Command::Keys => Response::Keys(KeysResponse::new(cache.keys().await)),
        Command::Stats => Response::Stats(StatsResponse::from(cache.stats().await)),
        Command::Clear => {
            cache.clear().await;
            Response::Message(MessageResponse::new("Cache cleared"))
        }
        Command::Quit => Response::Message(MessageResponse::new("Bye")),
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::eviction::LruPolicy;

    fn cache() -> ShellCache {
        Cache::builder()
            .with_expiration()
            .with_eviction(LruPolicy::new(2))
            .build()
            .unwrap()
    }

    async fn run(cache: &ShellCache, line: &str) -> serde_json::Value {
        let command: Command = line.parse().unwrap();
        serde_json::to_value(execute(cache, command).await).unwrap()
    }

    #[tokio::test]
    async fn test_set_get_del() {
        let cache = cache();

        let json = run(&cache, "SET greeting hello").await;
        assert_eq!(json["key"], "greeting");

        let json = run(&cache, "GET greeting").await;
        assert_eq!(json["value"], "hello");

        let json = run(&cache, "DEL greeting").await;
        assert_eq!(json["deleted"], true);

        let json = run(&cache, "GET greeting").await;
        assert!(json["value"].is_null());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_and_expire() {
        let cache = cache();
        run(&cache, "SET k v 30").await;

        let json = run(&cache, "TTL k").await;
        assert_eq!(json["ttl"], 30);
        assert!(json["expires_at"].is_string());

        let json = run(&cache, "EXPIRE k 0").await;
        assert!(json["error"].is_string());

        let json = run(&cache, "PERSIST k").await;
        assert_eq!(json["updated"], true);
        let json = run(&cache, "TTL k").await;
        assert!(json["ttl"].is_null());
    }

    #[tokio::test]
    async fn test_keys_stats_clear() {
        let cache = cache();
        run(&cache, "SET a 1").await;
        run(&cache, "SET b 2").await;
        run(&cache, "SET c 3").await;

        let json = run(&cache, "KEYS").await;
        assert_eq!(json["keys"], serde_json::json!(["b", "c"]));

        let json = run(&cache, "STATS").await;
        assert_eq!(json["evictions"], 1);
        assert_eq!(json["total_entries"], 2);

        run(&cache, "CLEAR").await;
        let json = run(&cache, "HAS b").await;
        assert_eq!(json["exists"], false);
    }
}
