// Auto-responders, reaction roles and keyword filters.
//
// All three are stored under `Automation` in the guild document.

use crate::core::storage::{AutomationData, DocumentService, StoreError};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("An auto-responder for `{0}` **already exists**.")]
    ResponderExists(String),

    #[error("There's no auto-responder for `{0}`.")]
    ResponderNotFound(String),

    #[error("That message **already** has a reaction role for {0}.")]
    ReactionRoleExists(String),

    #[error("There's no reaction role for {0} on that message.")]
    ReactionRoleNotFound(String),

    #[error("`{0}` is **already** filtered.")]
    WordFiltered(String),

    #[error("`{0}` isn't filtered.")]
    WordNotFiltered(String),

    #[error("Triggers and keywords can't be empty.")]
    Empty,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

// ============================================================================
// MATCHING
// ============================================================================

/// Whether `needle` occurs in `haystack` bounded by non-word characters.
/// Both are expected lower-case.
fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }

    // Explicit bounds instead of `\b` so triggers may start or end with punctuation.
    let pattern = format!(r"(?:^|\W){}(?:$|\W)", regex::escape(needle));
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(haystack),
        Err(e) => {
            tracing::warn!("Skipping unmatchable trigger {:?}: {}", needle, e);
            false
        }
    }
}

/// The response for a message, if any trigger occurs in it as a whole word.
/// The longest trigger wins.
pub fn match_responder<'a>(responders: &'a BTreeMap<String, String>, content: &str) -> Option<&'a str> {
    let content = content.to_lowercase();
    responders
        .iter()
        .filter(|(trigger, _)| contains_word(&content, trigger))
        .max_by_key(|(trigger, _)| trigger.chars().count())
        .map(|(_, response)| response.as_str())
}

/// The first filtered keyword found in a message.
pub fn match_filter<'a>(words: &'a [String], content: &str) -> Option<&'a str> {
    let content = content.to_lowercase();
    words
        .iter()
        .find(|word| contains_word(&content, word))
        .map(String::as_str)
}

/// Role bound to an emoji on a message.
pub fn reaction_role(data: &AutomationData, message_id: u64, emoji: &str) -> Option<u64> {
    data.reaction_roles.get(&message_id)?.get(emoji).copied()
}

fn normalize(value: &str) -> Result<String, AutomationError> {
    let value = value.trim().to_lowercase();
    if value.is_empty() {
        return Err(AutomationError::Empty);
    }
    Ok(value)
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct AutomationService {
    documents: Arc<DocumentService>,
}

impl AutomationService {
    pub fn new(documents: Arc<DocumentService>) -> Self {
        Self { documents }
    }

    pub async fn data(&self, guild_id: u64) -> Result<AutomationData, StoreError> {
        Ok(self.documents.get_guild_data(guild_id).await?.automation)
    }

    // ------------------------------------------------------------------------
    // Auto-responders
    // ------------------------------------------------------------------------

    pub async fn add_responder(&self, guild_id: u64, trigger: &str, response: &str) -> Result<String, AutomationError> {
        let trigger = normalize(trigger)?;
        let response = response.trim();
        if response.is_empty() {
            return Err(AutomationError::Empty);
        }

        self.documents
            .update_guild(guild_id, |doc| {
                let responders = &mut doc.automation.auto_responders;
                if responders.contains_key(&trigger) {
                    return Err(AutomationError::ResponderExists(trigger));
                }
                responders.insert(trigger.clone(), response.to_string());
                Ok(trigger)
            })
            .await
    }

    pub async fn remove_responder(&self, guild_id: u64, trigger: &str) -> Result<String, AutomationError> {
        let trigger = normalize(trigger)?;
        self.documents
            .update_guild(guild_id, |doc| {
                doc.automation
                    .auto_responders
                    .remove(&trigger)
                    .map(|_| trigger.clone())
                    .ok_or(AutomationError::ResponderNotFound(trigger))
            })
            .await
    }

    pub async fn response_for(&self, guild_id: u64, content: &str) -> Result<Option<String>, StoreError> {
        let data = self.data(guild_id).await?;
        Ok(match_responder(&data.auto_responders, content).map(str::to_string))
    }

    // ------------------------------------------------------------------------
    // Reaction roles
    // ------------------------------------------------------------------------

    pub async fn add_reaction_role(
        &self,
        guild_id: u64,
        message_id: u64,
        emoji: &str,
        role_id: u64,
    ) -> Result<(), AutomationError> {
        self.documents
            .update_guild(guild_id, |doc| {
                let bindings = doc.automation.reaction_roles.entry(message_id).or_default();
                if bindings.contains_key(emoji) {
                    return Err(AutomationError::ReactionRoleExists(emoji.to_string()));
                }
                bindings.insert(emoji.to_string(), role_id);
                Ok(())
            })
            .await
    }

    /// Unbind an emoji. Messages left with no bindings are dropped.
    pub async fn remove_reaction_role(
        &self,
        guild_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> Result<u64, AutomationError> {
        self.documents
            .update_guild(guild_id, |doc| {
                let roles = &mut doc.automation.reaction_roles;
                let removed = roles
                    .get_mut(&message_id)
                    .and_then(|bindings| bindings.remove(emoji))
                    .ok_or_else(|| AutomationError::ReactionRoleNotFound(emoji.to_string()))?;
                if roles.get(&message_id).is_some_and(|bindings| bindings.is_empty()) {
                    roles.remove(&message_id);
                }
                Ok(removed)
            })
            .await
    }

    pub async fn role_for_reaction(&self, guild_id: u64, message_id: u64, emoji: &str) -> Result<Option<u64>, StoreError> {
        let data = self.data(guild_id).await?;
        Ok(reaction_role(&data, message_id, emoji))
    }

    // ------------------------------------------------------------------------
    // Filters
    // ------------------------------------------------------------------------

    pub async fn add_filter(&self, guild_id: u64, word: &str) -> Result<String, AutomationError> {
        let word = normalize(word)?;
        self.documents
            .update_guild(guild_id, |doc| {
                let words = &mut doc.automation.filtered_words;
                if words.contains(&word) {
                    return Err(AutomationError::WordFiltered(word));
                }
                words.push(word.clone());
                Ok(word)
            })
            .await
    }

    pub async fn remove_filter(&self, guild_id: u64, word: &str) -> Result<String, AutomationError> {
        let word = normalize(word)?;
        self.documents
            .update_guild(guild_id, |doc| {
                let words = &mut doc.automation.filtered_words;
                let before = words.len();
                words.retain(|w| *w != word);
                if words.len() == before {
                    return Err(AutomationError::WordNotFiltered(word));
                }
                Ok(word)
            })
            .await
    }

    pub async fn filtered_word(&self, guild_id: u64, content: &str) -> Result<Option<String>, StoreError> {
        let data = self.data(guild_id).await?;
        Ok(match_filter(&data.filtered_words, content).map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::storage::InMemoryDocumentStore;

    fn service() -> AutomationService {
        AutomationService::new(Arc::new(DocumentService::new(Arc::new(
            InMemoryDocumentStore::new(),
        ))))
    }

    #[test]
    fn whole_words_only() {
        assert!(contains_word("hello there", "hello"));
        assert!(contains_word("well, hello!", "hello"));
        assert!(!contains_word("othello", "hello"));
        assert!(!contains_word("hellos", "hello"));
        assert!(contains_word("say good night", "good night"));
        assert!(!contains_word("anything", ""));
    }

    #[test]
    fn word_match_survives_an_overlapping_partial() {
        assert!(contains_word("ba a a", "a a"));
        assert!(contains_word("hi !ping", "!ping"));
    }

    #[test]
    fn longest_trigger_wins() {
        let responders = BTreeMap::from([
            ("hi".to_string(), "short".to_string()),
            ("hi there".to_string(), "long".to_string()),
        ]);

        assert_eq!(match_responder(&responders, "Hi there friend"), Some("long"));
        assert_eq!(match_responder(&responders, "HI"), Some("short"));
        assert_eq!(match_responder(&responders, "high"), None);
    }

    #[test]
    fn filters_are_case_insensitive() {
        let words = vec!["darn".to_string()];
        assert_eq!(match_filter(&words, "well DARN it"), Some("darn"));
        assert_eq!(match_filter(&words, "darned"), None);
    }

    #[tokio::test]
    async fn responders_round_trip() {
        let service = service();

        assert_eq!(service.add_responder(1, " Hello ", "hey!").await.unwrap(), "hello");
        assert!(matches!(
            service.add_responder(1, "HELLO", "again").await,
            Err(AutomationError::ResponderExists(_))
        ));
        assert_eq!(
            service.response_for(1, "oh hello").await.unwrap().as_deref(),
            Some("hey!")
        );

        service.remove_responder(1, "hello").await.unwrap();
        assert!(matches!(
            service.remove_responder(1, "hello").await,
            Err(AutomationError::ResponderNotFound(_))
        ));
        assert!(matches!(
            service.add_responder(1, "  ", "x").await,
            Err(AutomationError::Empty)
        ));
    }

    #[tokio::test]
    async fn reaction_roles_round_trip() {
        let service = service();

        service.add_reaction_role(1, 100, "🍎", 7).await.unwrap();
        service.add_reaction_role(1, 100, "party:55", 8).await.unwrap();
        assert!(matches!(
            service.add_reaction_role(1, 100, "🍎", 9).await,
            Err(AutomationError::ReactionRoleExists(_))
        ));

        assert_eq!(service.role_for_reaction(1, 100, "🍎").await.unwrap(), Some(7));
        assert_eq!(service.role_for_reaction(1, 101, "🍎").await.unwrap(), None);

        assert_eq!(service.remove_reaction_role(1, 100, "🍎").await.unwrap(), 7);
        assert_eq!(service.remove_reaction_role(1, 100, "party:55").await.unwrap(), 8);
        assert!(service.data(1).await.unwrap().reaction_roles.is_empty());
        assert!(matches!(
            service.remove_reaction_role(1, 100, "🍎").await,
            Err(AutomationError::ReactionRoleNotFound(_))
        ));
    }

    #[tokio::test]
    async fn filters_round_trip() {
        let service = service();

        service.add_filter(1, "Darn").await.unwrap();
        assert!(matches!(
            service.add_filter(1, "darn").await,
            Err(AutomationError::WordFiltered(_))
        ));
        assert_eq!(
            service.filtered_word(1, "DARN").await.unwrap().as_deref(),
            Some("darn")
        );

        service.remove_filter(1, "darn").await.unwrap();
        assert_eq!(service.filtered_word(1, "darn").await.unwrap(), None);
    }
}
