// Roleplay actions: bite, hug, kiss.
//
// Each action keeps a per-target counter on the author's user document.

use crate::core::storage::{DocumentService, RolePlayCounters, StoreError};
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::sync::Arc;

const BITE_GIFS: &[&str] = &[
    "https://c.tenor.com/5mVQ3ffWUTgAAAAd/tenor.gif",
    "https://c.tenor.com/ECCpi63jZlUAAAAd/tenor.gif",
    "https://c.tenor.com/n__KGrZPlQEAAAAd/tenor.gif",
    "https://c.tenor.com/0neaBmDilHsAAAAd/tenor.gif",
    "https://c.tenor.com/L8GrZ1X6ThsAAAAd/tenor.gif",
    "https://c.tenor.com/2Q5mG_lvFI0AAAAd/tenor.gif",
];

const HUG_GIFS: &[&str] = &[
    "https://c.tenor.com/kCZjTqCKiggAAAAd/tenor.gif",
    "https://c.tenor.com/V8f3qPS23LgAAAAd/tenor.gif",
    "https://c.tenor.com/6vsKGktTOj0AAAAd/tenor.gif",
    "https://c.tenor.com/nwxXREHNog0AAAAd/tenor.gif",
    "https://c.tenor.com/WCzysUenO_UAAAAd/tenor.gif",
    "https://c.tenor.com/iyztKN68avcAAAAd/tenor.gif",
];

const KISS_GIFS: &[&str] = &[
    "https://c.tenor.com/kmxEaVuW8AoAAAAd/tenor.gif",
    "https://c.tenor.com/OByUsNZJyWcAAAAd/tenor.gif",
    "https://c.tenor.com/b7DWF8ecBkIAAAAd/tenor.gif",
    "https://c.tenor.com/LrKmxrDxJN0AAAAd/tenor.gif",
    "https://c.tenor.com/cQzRWAWrN6kAAAAd/tenor.gif",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolePlayAction {
    Bite,
    Hug,
    Kiss,
}

impl RolePlayAction {
    /// Present tense for the embed title: "a bites b".
    pub fn verb(self) -> &'static str {
        match self {
            RolePlayAction::Bite => "bites",
            RolePlayAction::Hug => "hugs",
            RolePlayAction::Kiss => "kisses",
        }
    }

    /// Past participle for the footer: "a has bit b".
    pub fn past(self) -> &'static str {
        match self {
            RolePlayAction::Bite => "bit",
            RolePlayAction::Hug => "hugged",
            RolePlayAction::Kiss => "kissed",
        }
    }

    pub fn gifs(self) -> &'static [&'static str] {
        match self {
            RolePlayAction::Bite => BITE_GIFS,
            RolePlayAction::Hug => HUG_GIFS,
            RolePlayAction::Kiss => KISS_GIFS,
        }
    }

    pub fn random_gif(self) -> &'static str {
        self.gifs()
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or_default()
    }

    fn counters(self, roleplay: &mut RolePlayCounters) -> &mut BTreeMap<u64, u64> {
        match self {
            RolePlayAction::Bite => &mut roleplay.bite,
            RolePlayAction::Hug => &mut roleplay.hug,
            RolePlayAction::Kiss => &mut roleplay.kiss,
        }
    }
}

pub fn title(action: RolePlayAction, author: &str, target_display: &str) -> String {
    format!("{author} {} {target_display}", action.verb())
}

pub fn footer(action: RolePlayAction, author: &str, target: &str, count: u64) -> String {
    let unit = if count == 1 { "time" } else { "times" };
    format!("{author} has {} {target} {count} {unit}", action.past())
}

pub struct RolePlayService {
    documents: Arc<DocumentService>,
}

impl RolePlayService {
    pub fn new(documents: Arc<DocumentService>) -> Self {
        Self { documents }
    }

    /// Count one more `action` from `author_id` to `target_id`. Returns the new total.
    pub async fn record(&self, action: RolePlayAction, author_id: u64, target_id: u64) -> Result<u64, StoreError> {
        self.documents
            .update_user(author_id, |doc| {
                let count = action.counters(&mut doc.roleplay).entry(target_id).or_insert(0);
                *count += 1;
                Ok(*count)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::storage::InMemoryDocumentStore;

    #[test]
    fn text_matches_the_action() {
        assert_eq!(title(RolePlayAction::Hug, "ana", "Bo"), "ana hugs Bo");
        assert_eq!(footer(RolePlayAction::Bite, "ana", "bo", 1), "ana has bit bo 1 time");
        assert_eq!(footer(RolePlayAction::Kiss, "ana", "bo", 3), "ana has kissed bo 3 times");
    }

    #[test]
    fn every_action_has_gifs() {
        for action in [RolePlayAction::Bite, RolePlayAction::Hug, RolePlayAction::Kiss] {
            assert!(action.gifs().contains(&action.random_gif()));
        }
    }

    #[tokio::test]
    async fn counters_are_per_action_and_target() {
        let documents = Arc::new(DocumentService::new(Arc::new(InMemoryDocumentStore::new())));
        let service = RolePlayService::new(documents.clone());

        assert_eq!(service.record(RolePlayAction::Hug, 1, 2).await.unwrap(), 1);
        assert_eq!(service.record(RolePlayAction::Hug, 1, 2).await.unwrap(), 2);
        assert_eq!(service.record(RolePlayAction::Hug, 1, 3).await.unwrap(), 1);
        assert_eq!(service.record(RolePlayAction::Bite, 1, 2).await.unwrap(), 1);

        let doc = documents.get_user_data(1).await.unwrap();
        assert_eq!(doc.roleplay.hug[&2], 2);
        assert!(doc.roleplay.kiss.is_empty());
    }
}
