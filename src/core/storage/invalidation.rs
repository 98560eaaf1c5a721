// Payloads published on the `cache_invalidate` channel by the database trigger.

use super::document_store::DocumentKey;
use serde::Deserialize;
use thiserror::Error;

/// Name of the LISTEN/NOTIFY channel.
pub const INVALIDATION_CHANNEL: &str = "cache_invalidate";

#[derive(Debug, Error)]
#[error("Malformed invalidation payload `{payload}`: {source}")]
pub struct InvalidationError {
    payload: String,
    #[source]
    source: serde_json::Error,
}

/// A row that changed outside the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "table", rename_all = "lowercase")]
pub enum CacheInvalidation {
    Guilds { id: u64 },
    Members { guild_id: u64, member_id: u64 },
    Users { id: u64 },
    /// The trigger sends `"id": true` here; there is only one row.
    Configuration,
}

impl CacheInvalidation {
    pub fn parse(payload: &str) -> Result<Self, InvalidationError> {
        serde_json::from_str(payload).map_err(|source| InvalidationError {
            payload: payload.to_string(),
            source,
        })
    }

    pub fn key(&self) -> DocumentKey {
        match *self {
            CacheInvalidation::Guilds { id } => DocumentKey::Guild(id),
            CacheInvalidation::Members {
                guild_id,
                member_id,
            } => DocumentKey::Member {
                guild_id,
                member_id,
            },
            CacheInvalidation::Users { id } => DocumentKey::User(id),
            CacheInvalidation::Configuration => DocumentKey::Configuration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_trigger_payload() {
        assert_eq!(
            CacheInvalidation::parse(r#"{"table" : "guilds", "id" : 1444846443104964660}"#)
                .unwrap()
                .key(),
            DocumentKey::Guild(1444846443104964660)
        );
        assert_eq!(
            CacheInvalidation::parse(r#"{"table":"members","guild_id":1,"member_id":2}"#)
                .unwrap()
                .key(),
            DocumentKey::Member {
                guild_id: 1,
                member_id: 2
            }
        );
        assert_eq!(
            CacheInvalidation::parse(r#"{"table":"users","id":9}"#)
                .unwrap()
                .key(),
            DocumentKey::User(9)
        );
        assert_eq!(
            CacheInvalidation::parse(r#"{"table":"configuration","id":true}"#).unwrap(),
            CacheInvalidation::Configuration
        );
    }

    #[test]
    fn rejects_unknown_tables_and_garbage() {
        assert!(CacheInvalidation::parse(r#"{"table":"reminders","id":1}"#).is_err());
        assert!(CacheInvalidation::parse(r#"{"table":"guilds"}"#).is_err());

        let err = CacheInvalidation::parse("not json").unwrap_err();
        assert!(err.to_string().contains("not json"));
    }
}
