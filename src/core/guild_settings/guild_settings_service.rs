// Per-guild prefixes and command aliases.
//
// NO Discord dependencies here. The Discord layer supplies the fallback prefix
// and a way to check whether a command name exists.

use crate::core::storage::{DocumentService, GuildDocument, StoreError};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

pub const MAX_PREFIX_LEN: usize = 6;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum PrefixError {
    #[error("The server prefix is already `{0}`.")]
    Unchanged(String),

    #[error("The server prefix can only be 1-{MAX_PREFIX_LEN} characters long.")]
    InvalidLength,

    #[error("The server prefix is already the default one.")]
    AlreadyDefault,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum AliasError {
    #[error("The command `{0}` doesn't exist.")]
    UnknownCommand(String),

    #[error("The alias `{alias}` already exists for `{command}`.")]
    AlreadyExists { alias: String, command: String },

    #[error("`{0}` is already the name of a command.")]
    ShadowsCommand(String),

    #[error("The alias `{0}` doesn't exist.")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

// ============================================================================
// PURE HELPERS
// ============================================================================

/// The prefix commands in a guild must start with.
pub fn effective_prefix(doc: &GuildDocument, fallback: &str) -> String {
    doc.prefix().unwrap_or(fallback).to_string()
}

/// Rewrite `<prefix><alias> rest` into `<prefix><command> rest`.
///
/// Only the first word after the prefix is considered, matched
/// case-insensitively. Returns `None` when the message doesn't start with
/// the prefix or the word isn't an alias.
pub fn rewrite_alias(
    content: &str,
    prefix: &str,
    aliases: &BTreeMap<String, String>,
) -> Option<String> {
    let after_prefix = content.strip_prefix(prefix)?;
    let word_len = after_prefix.find(' ').unwrap_or(after_prefix.len());
    let (word, rest) = after_prefix.split_at(word_len);

    let target = aliases.get(&word.to_lowercase())?;
    Some(format!("{prefix}{target}{rest}"))
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct GuildSettingsService {
    documents: Arc<DocumentService>,
    fallback_prefix: String,
}

impl GuildSettingsService {
    pub fn new(documents: Arc<DocumentService>, fallback_prefix: impl Into<String>) -> Self {
        Self {
            documents,
            fallback_prefix: fallback_prefix.into(),
        }
    }

    pub fn fallback_prefix(&self) -> &str {
        &self.fallback_prefix
    }

    /// Prefix for a message. DMs and unreadable guild documents use the fallback.
    pub async fn resolve_prefix(&self, guild_id: Option<u64>) -> String {
        let Some(guild_id) = guild_id else {
            return self.fallback_prefix.clone();
        };

        match self.documents.get_guild_data(guild_id).await {
            Ok(doc) => effective_prefix(&doc, &self.fallback_prefix),
            Err(e) => {
                tracing::warn!("Falling back to default prefix for guild {}: {}", guild_id, e);
                self.fallback_prefix.clone()
            }
        }
    }

    pub async fn current_prefix(&self, guild_id: u64) -> Result<String, StoreError> {
        let doc = self.documents.get_guild_data(guild_id).await?;
        Ok(effective_prefix(&doc, &self.fallback_prefix))
    }

    pub async fn set_prefix(&self, guild_id: u64, prefix: &str) -> Result<(), PrefixError> {
        let fallback = self.fallback_prefix.as_str();
        self.documents
            .update_guild(guild_id, |doc| {
                if effective_prefix(doc, fallback) == prefix {
                    return Err(PrefixError::Unchanged(prefix.to_string()));
                }
                let len = prefix.chars().count();
                if len == 0 || len > MAX_PREFIX_LEN || prefix.trim().is_empty() {
                    return Err(PrefixError::InvalidLength);
                }

                doc.configuration.prefix = Some(prefix.to_string());
                Ok(())
            })
            .await
    }

    /// Go back to the fallback prefix. Returns the prefix now in effect.
    pub async fn reset_prefix(&self, guild_id: u64) -> Result<String, PrefixError> {
        let fallback = self.fallback_prefix.as_str();
        self.documents
            .update_guild(guild_id, |doc| {
                if effective_prefix(doc, fallback) == fallback {
                    return Err(PrefixError::AlreadyDefault);
                }
                doc.configuration.prefix = None;
                Ok(fallback.to_string())
            })
            .await
    }

    pub async fn aliases(&self, guild_id: u64) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(self
            .documents
            .get_guild_data(guild_id)
            .await?
            .configuration
            .command_aliases)
    }

    /// Register `alias` for `command`. Both are stored lower-case.
    pub async fn add_alias(
        &self,
        guild_id: u64,
        command: &str,
        alias: &str,
        command_exists: impl Fn(&str) -> bool,
    ) -> Result<(String, String), AliasError> {
        let command = command.to_lowercase();
        let alias = alias.to_lowercase();

        if !command_exists(&command) {
            return Err(AliasError::UnknownCommand(command));
        }
        if command_exists(&alias) {
            return Err(AliasError::ShadowsCommand(alias));
        }

        self.documents
            .update_guild(guild_id, |doc| {
                let aliases = &mut doc.configuration.command_aliases;
                if let Some(existing) = aliases.get(&alias) {
                    return Err(AliasError::AlreadyExists {
                        alias: alias.clone(),
                        command: existing.clone(),
                    });
                }
                aliases.insert(alias.clone(), command.clone());
                Ok((alias, command))
            })
            .await
    }

    /// Remove an alias. Returns the command it pointed to.
    pub async fn remove_alias(&self, guild_id: u64, alias: &str) -> Result<String, AliasError> {
        let alias = alias.to_lowercase();
        self.documents
            .update_guild(guild_id, |doc| {
                doc.configuration
                    .command_aliases
                    .remove(&alias)
                    .ok_or_else(|| AliasError::NotFound(alias.clone()))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::storage::InMemoryDocumentStore;

    fn service() -> GuildSettingsService {
        let documents = Arc::new(DocumentService::new(Arc::new(InMemoryDocumentStore::new())));
        GuildSettingsService::new(documents, ",")
    }

    fn known(name: &str) -> bool {
        matches!(name, "ban" | "kick" | "prefix")
    }

    #[test]
    fn rewrite_alias_keeps_arguments() {
        let aliases = BTreeMap::from([("deport".to_string(), "ban".to_string())]);

        assert_eq!(
            rewrite_alias(",deport @someone 1d spam", ",", &aliases).as_deref(),
            Some(",ban @someone 1d spam")
        );
        assert_eq!(
            rewrite_alias(",DePort", ",", &aliases).as_deref(),
            Some(",ban")
        );
        assert_eq!(rewrite_alias(",kick @someone", ",", &aliases), None);
        assert_eq!(rewrite_alias("deport", ",", &aliases), None);
        assert_eq!(rewrite_alias("!!deport x", "!!", &aliases).as_deref(), Some("!!ban x"));
    }

    #[tokio::test]
    async fn prefix_defaults_to_fallback() {
        let service = service();
        assert_eq!(service.resolve_prefix(None).await, ",");
        assert_eq!(service.resolve_prefix(Some(1)).await, ",");
    }

    #[tokio::test]
    async fn set_prefix_validates_length_and_change() {
        let service = service();

        assert!(matches!(
            service.set_prefix(1, ",").await,
            Err(PrefixError::Unchanged(_))
        ));
        assert!(matches!(
            service.set_prefix(1, "toolong").await,
            Err(PrefixError::InvalidLength)
        ));
        assert!(matches!(
            service.set_prefix(1, "  ").await,
            Err(PrefixError::InvalidLength)
        ));

        service.set_prefix(1, "w?").await.unwrap();
        assert_eq!(service.resolve_prefix(Some(1)).await, "w?");
        assert_eq!(service.current_prefix(2).await.unwrap(), ",");
    }

    #[tokio::test]
    async fn reset_prefix_requires_a_custom_prefix() {
        let service = service();

        assert!(matches!(
            service.reset_prefix(1).await,
            Err(PrefixError::AlreadyDefault)
        ));

        service.set_prefix(1, "!").await.unwrap();
        assert_eq!(service.reset_prefix(1).await.unwrap(), ",");
        assert_eq!(service.resolve_prefix(Some(1)).await, ",");
    }

    #[tokio::test]
    async fn aliases_are_lower_case_and_unique() {
        let service = service();

        let (alias, command) = service.add_alias(1, "BAN", "Deport", known).await.unwrap();
        assert_eq!((alias.as_str(), command.as_str()), ("deport", "ban"));

        assert!(matches!(
            service.add_alias(1, "kick", "deport", known).await,
            Err(AliasError::AlreadyExists { command, .. }) if command == "ban"
        ));
        assert!(matches!(
            service.add_alias(1, "nope", "x", known).await,
            Err(AliasError::UnknownCommand(_))
        ));
        assert!(matches!(
            service.add_alias(1, "ban", "kick", known).await,
            Err(AliasError::ShadowsCommand(_))
        ));

        assert_eq!(service.aliases(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_alias_reports_missing_ones() {
        let service = service();
        service.add_alias(1, "kick", "boot", known).await.unwrap();

        assert_eq!(service.remove_alias(1, "BOOT").await.unwrap(), "kick");
        assert!(matches!(
            service.remove_alias(1, "boot").await,
            Err(AliasError::NotFound(_))
        ));
    }
}
