// Profile badges granted by the bot owners from a fixed catalog.

use crate::core::storage::{Badge, DocumentService, StoreError};
use std::sync::Arc;
use thiserror::Error;

/// (name, emoji)
pub const BADGE_CATALOG: &[(&str, &str)] = &[
    ("Owner", "<a:snorlax:1448192709507420201>"),
    ("Coco's Parent", "<:coco:1448186422879326391>"),
    ("Angel", "<:wing:1444852907974594671>"),
    ("Music Enjoyer", "<:true_music_enjoyer:1448193961998024745>"),
    ("Cute", "<:cute:1448409695235870871>"),
];

#[derive(Debug, Error)]
pub enum BadgeError {
    #[error("I couldn't find the badge `{0}`.")]
    UnknownBadge(String),

    #[error("They already have that badge.")]
    AlreadyOwned,

    #[error("They don't have any badges.")]
    NoBadges,

    #[error("They don't have that badge.")]
    NotOwned,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Case-insensitive exact match first, then the shortest name starting with
/// the query.
pub fn find_badge<'a>(names: impl IntoIterator<Item = &'a str>, query: &str) -> Option<&'a str> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }

    let names: Vec<&str> = names.into_iter().collect();
    names
        .iter()
        .find(|name| name.to_lowercase() == query)
        .or_else(|| {
            names
                .iter()
                .filter(|name| name.to_lowercase().starts_with(&query))
                .min_by_key(|name| name.len())
        })
        .copied()
}

pub fn catalog_badge(query: &str) -> Option<Badge> {
    let name = find_badge(BADGE_CATALOG.iter().map(|(name, _)| *name), query)?;
    BADGE_CATALOG
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(name, emoji)| Badge {
            name: name.to_string(),
            emoji: emoji.to_string(),
        })
}

/// The badge line shown on profiles.
pub fn badge_line(badges: &[Badge]) -> Option<String> {
    if badges.is_empty() {
        return None;
    }
    Some(
        badges
            .iter()
            .map(|badge| badge.emoji.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    )
}

pub struct BadgeService {
    documents: Arc<DocumentService>,
}

impl BadgeService {
    pub fn new(documents: Arc<DocumentService>) -> Self {
        Self { documents }
    }

    pub async fn badges(&self, user_id: u64) -> Result<Vec<Badge>, StoreError> {
        Ok(self.documents.get_user_data(user_id).await?.badges)
    }

    pub async fn grant(&self, user_id: u64, query: &str) -> Result<Badge, BadgeError> {
        let badge = catalog_badge(query).ok_or_else(|| BadgeError::UnknownBadge(query.to_string()))?;

        self.documents
            .update_user(user_id, |doc| {
                if doc.badges.iter().any(|owned| owned.name == badge.name) {
                    return Err(BadgeError::AlreadyOwned);
                }
                doc.badges.push(badge.clone());
                Ok(badge)
            })
            .await
    }

    /// Match against the badges the user owns, not the catalog, so retired
    /// badges can still be removed.
    pub async fn revoke(&self, user_id: u64, query: &str) -> Result<Badge, BadgeError> {
        self.documents
            .update_user(user_id, |doc| {
                if doc.badges.is_empty() {
                    return Err(BadgeError::NoBadges);
                }
                let name = find_badge(doc.badges.iter().map(|b| b.name.as_str()), query)
                    .ok_or(BadgeError::NotOwned)?
                    .to_string();
                let index = doc
                    .badges
                    .iter()
                    .position(|b| b.name == name)
                    .ok_or(BadgeError::NotOwned)?;
                Ok(doc.badges.remove(index))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::storage::InMemoryDocumentStore;

    #[test]
    fn matches_exact_then_prefix() {
        assert_eq!(catalog_badge("owner").unwrap().name, "Owner");
        assert_eq!(catalog_badge("music").unwrap().name, "Music Enjoyer");
        assert_eq!(catalog_badge("coco").unwrap().name, "Coco's Parent");
        assert!(catalog_badge("wizard").is_none());
        assert!(catalog_badge(" ").is_none());
    }

    #[test]
    fn badge_line_joins_emojis() {
        assert_eq!(badge_line(&[]), None);
        let badges = vec![catalog_badge("cute").unwrap(), catalog_badge("angel").unwrap()];
        assert_eq!(
            badge_line(&badges).unwrap(),
            "<:cute:1448409695235870871> <:wing:1444852907974594671>"
        );
    }

    #[tokio::test]
    async fn grant_and_revoke() {
        let documents = Arc::new(DocumentService::new(Arc::new(InMemoryDocumentStore::new())));
        let service = BadgeService::new(documents);

        assert!(matches!(service.revoke(1, "cute").await, Err(BadgeError::NoBadges)));

        service.grant(1, "Cute").await.unwrap();
        assert!(matches!(service.grant(1, "cute").await, Err(BadgeError::AlreadyOwned)));
        assert!(matches!(service.grant(1, "nope").await, Err(BadgeError::UnknownBadge(_))));
        assert!(matches!(service.revoke(1, "owner").await, Err(BadgeError::NotOwned)));

        assert_eq!(service.revoke(1, "cu").await.unwrap().name, "Cute");
        assert!(service.badges(1).await.unwrap().is_empty());
    }
}
