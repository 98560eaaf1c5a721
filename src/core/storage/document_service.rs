// Cache-aside access to guild, member, user and global documents.
//
// Reads go to the cache first and fall back to the store. A missing row is
// created empty so later writes are plain updates. Writes go to the store and
// then replace the cached copy. Rows changed by anything other than the bot
// are evicted through `handle_invalidation`.

use super::bot_cache::BotCache;
use super::document_store::{DocumentKey, DocumentStore, StoreError};
use super::documents::{BotConfiguration, GuildDocument, MemberDocument, UserDocument};
use super::invalidation::{CacheInvalidation, InvalidationError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

pub struct DocumentService {
    store: Arc<dyn DocumentStore>,
    cache: BotCache,
}

impl DocumentService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            cache: BotCache::new(),
        }
    }

    pub fn cache(&self) -> &BotCache {
        &self.cache
    }

    fn decode<T: DeserializeOwned + Default>(key: DocumentKey, value: Value) -> Result<T, StoreError> {
        if value.is_null() {
            return Ok(T::default());
        }
        serde_json::from_value(value).map_err(|e| StoreError::Corrupt {
            key,
            message: e.to_string(),
        })
    }

    fn encode<T: Serialize>(key: DocumentKey, doc: &T) -> Result<Value, StoreError> {
        serde_json::to_value(doc).map_err(|e| StoreError::Corrupt {
            key,
            message: e.to_string(),
        })
    }

    /// Read a row, creating it empty when it doesn't exist yet.
    async fn load<T: DeserializeOwned + Default>(&self, key: DocumentKey) -> Result<T, StoreError> {
        match self.store.fetch(key).await? {
            Some(value) => Self::decode(key, value),
            None => {
                self.store
                    .insert_if_absent(key, &Value::Object(Map::new()))
                    .await?;
                Ok(T::default())
            }
        }
    }

    async fn save<T: Serialize>(&self, key: DocumentKey, doc: &T) -> Result<(), StoreError> {
        let value = Self::encode(key, doc)?;
        self.store.upsert(key, &value).await
    }

    // ------------------------------------------------------------------------
    // Guild
    // ------------------------------------------------------------------------

    pub async fn get_guild_data(&self, guild_id: u64) -> Result<GuildDocument, StoreError> {
        if let Some(doc) = self.cache.guilds.get(&guild_id) {
            return Ok(doc);
        }

        let doc: GuildDocument = self.load(DocumentKey::Guild(guild_id)).await?;
        self.cache.guilds.set(guild_id, doc.clone());
        Ok(doc)
    }

    pub async fn set_guild_data(&self, guild_id: u64, doc: GuildDocument) -> Result<(), StoreError> {
        self.save(DocumentKey::Guild(guild_id), &doc).await?;
        self.cache.guilds.set(guild_id, doc);
        Ok(())
    }

    /// Read-modify-write. Nothing is written when `f` returns an error.
    pub async fn update_guild<T, E>(
        &self,
        guild_id: u64,
        f: impl FnOnce(&mut GuildDocument) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut doc = self.get_guild_data(guild_id).await?;
        let out = f(&mut doc)?;
        self.set_guild_data(guild_id, doc).await?;
        Ok(out)
    }

    pub async fn delete_guild_data(&self, guild_id: u64) -> Result<(), StoreError> {
        self.store.delete(DocumentKey::Guild(guild_id)).await?;
        self.cache.guilds.delete(&guild_id);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Member
    // ------------------------------------------------------------------------

    pub async fn get_member_data(
        &self,
        guild_id: u64,
        member_id: u64,
    ) -> Result<MemberDocument, StoreError> {
        let cache_key = (guild_id, member_id);
        if let Some(doc) = self.cache.members.get(&cache_key) {
            return Ok(doc);
        }

        let doc: MemberDocument = self
            .load(DocumentKey::Member {
                guild_id,
                member_id,
            })
            .await?;
        self.cache.members.set(cache_key, doc.clone());
        Ok(doc)
    }

    pub async fn set_member_data(
        &self,
        guild_id: u64,
        member_id: u64,
        doc: MemberDocument,
    ) -> Result<(), StoreError> {
        self.save(
            DocumentKey::Member {
                guild_id,
                member_id,
            },
            &doc,
        )
        .await?;
        self.cache.members.set((guild_id, member_id), doc);
        Ok(())
    }

    pub async fn update_member<T, E>(
        &self,
        guild_id: u64,
        member_id: u64,
        f: impl FnOnce(&mut MemberDocument) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut doc = self.get_member_data(guild_id, member_id).await?;
        let out = f(&mut doc)?;
        self.set_member_data(guild_id, member_id, doc).await?;
        Ok(out)
    }

    pub async fn delete_member_data(&self, guild_id: u64, member_id: u64) -> Result<(), StoreError> {
        self.store
            .delete(DocumentKey::Member {
                guild_id,
                member_id,
            })
            .await?;
        self.cache.members.delete(&(guild_id, member_id));
        Ok(())
    }

    /// Remove a member's documents from every guild.
    pub async fn deep_delete_member_data(&self, member_id: u64) -> Result<u64, StoreError> {
        let removed = self.store.delete_member_everywhere(member_id).await?;
        self.cache.evict_member_everywhere(member_id);
        Ok(removed)
    }

    // ------------------------------------------------------------------------
    // User
    // ------------------------------------------------------------------------

    pub async fn get_user_data(&self, user_id: u64) -> Result<UserDocument, StoreError> {
        if let Some(doc) = self.cache.users.get(&user_id) {
            return Ok(doc);
        }

        let doc: UserDocument = self.load(DocumentKey::User(user_id)).await?;
        self.cache.users.set(user_id, doc.clone());
        Ok(doc)
    }

    pub async fn set_user_data(&self, user_id: u64, doc: UserDocument) -> Result<(), StoreError> {
        self.save(DocumentKey::User(user_id), &doc).await?;
        self.cache.users.set(user_id, doc);
        Ok(())
    }

    pub async fn update_user<T, E>(
        &self,
        user_id: u64,
        f: impl FnOnce(&mut UserDocument) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut doc = self.get_user_data(user_id).await?;
        let out = f(&mut doc)?;
        self.set_user_data(user_id, doc).await?;
        Ok(out)
    }

    pub async fn delete_user_data(&self, user_id: u64) -> Result<(), StoreError> {
        self.store.delete(DocumentKey::User(user_id)).await?;
        self.cache.users.delete(&user_id);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Global configuration
    // ------------------------------------------------------------------------

    pub async fn get_configuration(&self) -> Result<BotConfiguration, StoreError> {
        if let Some(config) = self.cache.config.get(&()) {
            return Ok(config);
        }

        let config: BotConfiguration = self.load(DocumentKey::Configuration).await?;
        self.cache.config.set((), config.clone());
        Ok(config)
    }

    pub async fn set_configuration(&self, config: BotConfiguration) -> Result<(), StoreError> {
        self.save(DocumentKey::Configuration, &config).await?;
        self.cache.config.set((), config);
        Ok(())
    }

    pub async fn update_configuration<T, E>(
        &self,
        f: impl FnOnce(&mut BotConfiguration) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut config = self.get_configuration().await?;
        let out = f(&mut config)?;
        self.set_configuration(config).await?;
        Ok(out)
    }

    // ------------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------------

    /// Evict the entry named by a `cache_invalidate` payload.
    pub fn handle_invalidation(&self, payload: &str) -> Result<CacheInvalidation, InvalidationError> {
        let invalidation = CacheInvalidation::parse(payload)?;
        let evicted = self.cache.evict(invalidation.key());
        tracing::debug!(key = %invalidation.key(), evicted, "Cache invalidated");
        Ok(invalidation)
    }

    pub fn clear_cache(&self) {
        self.cache.clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dashmap::DashMap;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts round-trips so tests can tell cache hits from store reads.
    #[derive(Default)]
    struct MockStore {
        rows: DashMap<DocumentKey, Value>,
        fetches: AtomicUsize,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for MockStore {
        async fn fetch(&self, key: DocumentKey) -> Result<Option<Value>, StoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.get(&key).map(|row| row.clone()))
        }

        async fn insert_if_absent(&self, key: DocumentKey, data: &Value) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.rows.entry(key).or_insert_with(|| data.clone());
            Ok(())
        }

        async fn upsert(&self, key: DocumentKey, data: &Value) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.rows.insert(key, data.clone());
            Ok(())
        }

        async fn delete(&self, key: DocumentKey) -> Result<bool, StoreError> {
            Ok(self.rows.remove(&key).is_some())
        }

        async fn delete_member_everywhere(&self, member_id: u64) -> Result<u64, StoreError> {
            let before = self.rows.len();
            self.rows.retain(|key, _| {
                !matches!(key, DocumentKey::Member { member_id: m, .. } if *m == member_id)
            });
            Ok((before - self.rows.len()) as u64)
        }
    }

    fn service() -> (Arc<MockStore>, DocumentService) {
        let store = Arc::new(MockStore::default());
        let service = DocumentService::new(store.clone());
        (store, service)
    }

    #[derive(Debug, PartialEq)]
    enum TestError {
        Rejected,
        Store,
    }

    impl From<StoreError> for TestError {
        fn from(_: StoreError) -> Self {
            TestError::Store
        }
    }

    #[tokio::test]
    async fn missing_rows_are_created_empty() {
        let (store, service) = service();

        let doc = service.get_guild_data(1).await.unwrap();

        assert_eq!(doc, GuildDocument::default());
        assert_eq!(*store.rows.get(&DocumentKey::Guild(1)).unwrap(), json!({}));
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let (store, service) = service();

        service.get_user_data(7).await.unwrap();
        service.get_user_data(7).await.unwrap();

        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn set_writes_through_and_refreshes_cache() {
        let (store, service) = service();
        let mut doc = service.get_member_data(1, 2).await.unwrap();
        doc.configuration.forced_nickname = Some("wardic".to_string());

        service.set_member_data(1, 2, doc).await.unwrap();

        let key = DocumentKey::Member {
            guild_id: 1,
            member_id: 2,
        };
        assert_eq!(
            store.rows.get(&key).unwrap()["Configuration"]["Forced_Nickname"],
            json!("wardic")
        );
        let cached = service.get_member_data(1, 2).await.unwrap();
        assert_eq!(cached.forced_nickname(), Some("wardic"));
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_update_writes_nothing() {
        let (store, service) = service();
        service.get_configuration().await.unwrap();
        let writes_before = store.writes.load(Ordering::SeqCst);

        let result: Result<(), TestError> = service
            .update_configuration(|config| {
                config.whitelisted_guilds.push(5);
                Err(TestError::Rejected)
            })
            .await;

        assert_eq!(result, Err(TestError::Rejected));
        assert_eq!(store.writes.load(Ordering::SeqCst), writes_before);
        assert!(!service.get_configuration().await.unwrap().is_whitelisted(5));
    }

    #[tokio::test]
    async fn update_returns_closure_output() {
        let (_, service) = service();

        let count: Result<u64, TestError> = service
            .update_user(3, |user| {
                let count = user.roleplay.hug.entry(4).or_insert(0);
                *count += 1;
                Ok(*count)
            })
            .await;

        assert_eq!(count, Ok(1));
        assert_eq!(service.get_user_data(3).await.unwrap().roleplay.hug[&4], 1);
    }

    #[tokio::test]
    async fn invalidation_forces_a_reread() {
        let (store, service) = service();
        service.get_guild_data(1).await.unwrap();

        // Someone edits the row behind the bot's back.
        store.rows.insert(
            DocumentKey::Guild(1),
            json!({ "Configuration": { "Prefix": "!" } }),
        );
        assert_eq!(service.get_guild_data(1).await.unwrap().prefix(), None);

        service
            .handle_invalidation(r#"{"table":"guilds","id":1}"#)
            .unwrap();

        assert_eq!(service.get_guild_data(1).await.unwrap().prefix(), Some("!"));
    }

    #[tokio::test]
    async fn configuration_invalidation_and_bad_payloads() {
        let (store, service) = service();
        service.get_configuration().await.unwrap();

        assert!(service.handle_invalidation("{}").is_err());
        service
            .handle_invalidation(r#"{"table":"configuration","id":true}"#)
            .unwrap();
        service.get_configuration().await.unwrap();

        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn deep_delete_clears_rows_and_cache() {
        let (store, service) = service();
        service.get_member_data(1, 9).await.unwrap();
        service.get_member_data(2, 9).await.unwrap();
        service.get_member_data(2, 8).await.unwrap();

        assert_eq!(service.deep_delete_member_data(9).await.unwrap(), 2);

        assert!(!service.cache().members.exists(&(1, 9)));
        assert!(service.cache().members.exists(&(2, 8)));
        assert_eq!(store.rows.len(), 1);
    }

    #[tokio::test]
    async fn delete_helpers_remove_row_and_entry() {
        let (store, service) = service();
        service.get_guild_data(1).await.unwrap();
        service.get_user_data(1).await.unwrap();
        service.get_member_data(1, 1).await.unwrap();

        service.delete_guild_data(1).await.unwrap();
        service.delete_user_data(1).await.unwrap();
        service.delete_member_data(1, 1).await.unwrap();

        assert!(store.rows.is_empty());
        assert!(service.cache().guilds.is_empty());
        assert!(service.cache().users.is_empty());
        assert!(service.cache().members.is_empty());
    }

    #[tokio::test]
    async fn corrupt_rows_surface_as_errors() {
        let (store, service) = service();
        store
            .rows
            .insert(DocumentKey::User(1), json!({ "Badges": "not a list" }));

        let err = service.get_user_data(1).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { key: DocumentKey::User(1), .. }));

        service.clear_cache();
    }
}
