// Persistence port for per-entity JSON documents.
//
// The store only moves raw JSON in and out of rows. Typing and caching live
// in `DocumentService`.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt document for {key}: {message}")]
    Corrupt { key: DocumentKey, message: String },
}

// ============================================================================
// KEYS
// ============================================================================

/// Addresses exactly one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKey {
    Guild(u64),
    Member { guild_id: u64, member_id: u64 },
    User(u64),
    /// The single global configuration row.
    Configuration,
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKey::Guild(id) => write!(f, "guild {id}"),
            DocumentKey::Member {
                guild_id,
                member_id,
            } => write!(f, "member {guild_id}:{member_id}"),
            DocumentKey::User(id) => write!(f, "user {id}"),
            DocumentKey::Configuration => write!(f, "configuration"),
        }
    }
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Row-level access to the document tables.
///
/// Every write made through this trait counts as a bot write: backends that
/// publish change notifications must stay quiet for them, since the caller
/// updates its own cache directly.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document. `Ok(None)` means the row doesn't exist.
    async fn fetch(&self, key: DocumentKey) -> Result<Option<Value>, StoreError>;

    /// Create the row with `data` unless it already exists.
    async fn insert_if_absent(&self, key: DocumentKey, data: &Value) -> Result<(), StoreError>;

    /// Create or overwrite the row.
    async fn upsert(&self, key: DocumentKey, data: &Value) -> Result<(), StoreError>;

    /// Delete the row. Returns whether a row was removed.
    async fn delete(&self, key: DocumentKey) -> Result<bool, StoreError>;

    /// Delete a member's rows in every guild. Returns how many were removed.
    async fn delete_member_everywhere(&self, member_id: u64) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_describe_themselves() {
        assert_eq!(DocumentKey::Guild(1).to_string(), "guild 1");
        assert_eq!(
            DocumentKey::Member {
                guild_id: 1,
                member_id: 2
            }
            .to_string(),
            "member 1:2"
        );
        assert_eq!(DocumentKey::Configuration.to_string(), "configuration");
    }
}
