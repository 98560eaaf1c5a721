// One cache namespace per document kind, plus member role snapshots.

use super::document_store::DocumentKey;
use super::documents::{BotConfiguration, GuildDocument, MemberDocument, UserDocument};
use super::ttl_cache::{TtlCache, DEFAULT_MAX_SIZE};
use std::time::Duration;

const DOCUMENT_TTL: Duration = Duration::from_secs(300);
const CONFIG_TTL: Duration = Duration::from_secs(60);

pub struct BotCache {
    pub guilds: TtlCache<u64, GuildDocument>,
    /// Keyed by `(guild_id, member_id)`.
    pub members: TtlCache<(u64, u64), MemberDocument>,
    pub users: TtlCache<u64, UserDocument>,
    pub config: TtlCache<(), BotConfiguration>,
    /// Last seen role ids per `(guild_id, member_id)`, `@everyone` excluded.
    pub roles: TtlCache<(u64, u64), Vec<u64>>,
}

impl Default for BotCache {
    fn default() -> Self {
        Self::new()
    }
}

impl BotCache {
    pub fn new() -> Self {
        Self {
            guilds: TtlCache::new("guilds", DOCUMENT_TTL, DEFAULT_MAX_SIZE),
            members: TtlCache::new("members", DOCUMENT_TTL, DEFAULT_MAX_SIZE),
            users: TtlCache::new("users", DOCUMENT_TTL, DEFAULT_MAX_SIZE),
            config: TtlCache::new("config", CONFIG_TTL, DEFAULT_MAX_SIZE),
            roles: TtlCache::new("roles", DOCUMENT_TTL, DEFAULT_MAX_SIZE),
        }
    }

    /// Drop the cached copy of one document.
    pub fn evict(&self, key: DocumentKey) -> bool {
        match key {
            DocumentKey::Guild(id) => self.guilds.delete(&id),
            DocumentKey::Member {
                guild_id,
                member_id,
            } => self.members.delete(&(guild_id, member_id)),
            DocumentKey::User(id) => self.users.delete(&id),
            DocumentKey::Configuration => self.config.delete(&()),
        }
    }

    /// Drop every cached entry belonging to `member_id`, in any guild.
    pub fn evict_member_everywhere(&self, member_id: u64) -> usize {
        self.members.remove_where(|(_, member)| *member == member_id)
            + self.roles.remove_where(|(_, member)| *member == member_id)
    }

    /// Remove a deleted role from every cached snapshot in its guild.
    /// Snapshots left empty are dropped. Returns how many snapshots changed.
    pub fn strip_role(&self, guild_id: u64, role_id: u64) -> usize {
        self.roles.update_where(
            |(guild, _), roles| *guild == guild_id && roles.contains(&role_id),
            |roles| {
                let kept: Vec<u64> = roles.iter().copied().filter(|id| *id != role_id).collect();
                (!kept.is_empty()).then_some(kept)
            },
        )
    }

    pub fn clear_all(&self) {
        self.guilds.clear();
        self.members.clear();
        self.users.clear();
        self.config.clear();
        self.roles.clear();
    }

    /// Sweep expired entries from every namespace.
    pub fn cleanup_expired(&self) -> usize {
        self.guilds.cleanup_expired()
            + self.members.cleanup_expired()
            + self.users.cleanup_expired()
            + self.config.cleanup_expired()
            + self.roles.cleanup_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn config_expires_before_documents() {
        let cache = BotCache::new();
        cache.config.set((), BotConfiguration::default());
        cache.guilds.set(1, GuildDocument::default());

        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(!cache.config.exists(&()));
        assert!(cache.guilds.exists(&1));
        assert_eq!(cache.cleanup_expired(), 0, "config entry was already dropped");

        tokio::time::advance(Duration::from_secs(240)).await;
        assert_eq!(cache.cleanup_expired(), 1);
    }

    #[tokio::test]
    async fn evict_targets_a_single_namespace() {
        let cache = BotCache::new();
        cache.guilds.set(1, GuildDocument::default());
        cache.users.set(1, UserDocument::default());
        cache.members.set((1, 2), MemberDocument::default());

        assert!(cache.evict(DocumentKey::Guild(1)));
        assert!(!cache.evict(DocumentKey::Guild(1)));
        assert!(cache.users.exists(&1));

        assert!(cache.evict(DocumentKey::Member {
            guild_id: 1,
            member_id: 2
        }));
        assert!(!cache.evict(DocumentKey::Configuration));
    }

    #[tokio::test]
    async fn strip_role_only_touches_the_guild() {
        let cache = BotCache::new();
        cache.roles.set((1, 10), vec![100, 101]);
        cache.roles.set((1, 11), vec![100]);
        cache.roles.set((2, 10), vec![100]);

        assert_eq!(cache.strip_role(1, 100), 2);

        assert_eq!(cache.roles.get(&(1, 10)), Some(vec![101]));
        assert_eq!(cache.roles.get(&(1, 11)), None);
        assert_eq!(cache.roles.get(&(2, 10)), Some(vec![100]));
    }

    #[tokio::test]
    async fn member_eviction_spans_guilds() {
        let cache = BotCache::new();
        cache.members.set((1, 5), MemberDocument::default());
        cache.members.set((2, 5), MemberDocument::default());
        cache.members.set((2, 6), MemberDocument::default());
        cache.roles.set((1, 5), vec![1]);

        assert_eq!(cache.evict_member_everywhere(5), 3);
        assert!(cache.members.exists(&(2, 6)));

        cache.clear_all();
        assert!(cache.members.is_empty());
    }
}
