// In-process implementation of DocumentStore.
//
// Used when no DATABASE_URL is configured: documents live as long as the
// process and nothing is shared with other instances.

use crate::core::storage::{DocumentKey, DocumentStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

#[derive(Default)]
pub struct InMemoryDocumentStore {
    rows: DashMap<DocumentKey, Value>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn fetch(&self, key: DocumentKey) -> Result<Option<Value>, StoreError> {
        Ok(self.rows.get(&key).map(|row| row.value().clone()))
    }

    async fn insert_if_absent(&self, key: DocumentKey, data: &Value) -> Result<(), StoreError> {
        self.rows.entry(key).or_insert_with(|| data.clone());
        Ok(())
    }

    async fn upsert(&self, key: DocumentKey, data: &Value) -> Result<(), StoreError> {
        self.rows.insert(key, data.clone());
        Ok(())
    }

    async fn delete(&self, key: DocumentKey) -> Result<bool, StoreError> {
        Ok(self.rows.remove(&key).is_some())
    }

    async fn delete_member_everywhere(&self, member_id: u64) -> Result<u64, StoreError> {
        let mut removed = 0;
        self.rows.retain(|key, _| match key {
            DocumentKey::Member { member_id: m, .. } if *m == member_id => {
                removed += 1;
                false
            }
            _ => true,
        });
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_if_absent_keeps_existing_rows() {
        let store = InMemoryDocumentStore::new();
        let key = DocumentKey::Guild(1);

        store.upsert(key, &json!({ "a": 1 })).await.unwrap();
        store.insert_if_absent(key, &json!({})).await.unwrap();

        assert_eq!(store.fetch(key).await.unwrap(), Some(json!({ "a": 1 })));
    }

    #[tokio::test]
    async fn delete_member_everywhere_spares_other_rows() {
        let store = InMemoryDocumentStore::new();
        for guild_id in [1, 2] {
            store
                .upsert(DocumentKey::Member { guild_id, member_id: 5 }, &json!({}))
                .await
                .unwrap();
        }
        store
            .upsert(DocumentKey::Member { guild_id: 1, member_id: 6 }, &json!({}))
            .await
            .unwrap();
        store.upsert(DocumentKey::User(5), &json!({})).await.unwrap();

        assert_eq!(store.delete_member_everywhere(5).await.unwrap(), 2);
        assert!(store.fetch(DocumentKey::User(5)).await.unwrap().is_some());
        assert!(store
            .fetch(DocumentKey::Member { guild_id: 1, member_id: 6 })
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_existed() {
        let store = InMemoryDocumentStore::new();
        store.upsert(DocumentKey::Configuration, &json!({})).await.unwrap();

        assert!(store.delete(DocumentKey::Configuration).await.unwrap());
        assert!(!store.delete(DocumentKey::Configuration).await.unwrap());
    }
}
