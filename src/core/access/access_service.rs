// Guild whitelist and bot owners.
//
// Commands only run in whitelisted guilds. Owners are exempt everywhere.

use crate::core::storage::{DocumentService, StoreError};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WhitelistError {
    #[error("`{0}` is **already whitelisted**.")]
    AlreadyWhitelisted(u64),

    #[error("`{0}` **isn't whitelisted**.")]
    NotWhitelisted(u64),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitelistMode {
    Add,
    Remove,
}

impl WhitelistMode {
    /// `add`, `new`, `plus` and `1` add. Anything else removes.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "add" | "new" | "plus" | "1" => WhitelistMode::Add,
            _ => WhitelistMode::Remove,
        }
    }
}

pub struct AccessService {
    documents: Arc<DocumentService>,
    owners: HashSet<u64>,
}

impl AccessService {
    pub fn new(documents: Arc<DocumentService>, owners: impl IntoIterator<Item = u64>) -> Self {
        Self {
            documents,
            owners: owners.into_iter().collect(),
        }
    }

    pub fn is_owner(&self, user_id: u64) -> bool {
        self.owners.contains(&user_id)
    }

    pub fn owners(&self) -> &HashSet<u64> {
        &self.owners
    }

    pub async fn is_whitelisted(&self, guild_id: u64) -> Result<bool, StoreError> {
        Ok(self
            .documents
            .get_configuration()
            .await?
            .is_whitelisted(guild_id))
    }

    /// Whether a command from `user_id` may run in `guild_id`.
    /// Outside guilds only owners may run commands.
    pub async fn may_run_commands(&self, guild_id: Option<u64>, user_id: u64) -> Result<bool, StoreError> {
        if self.is_owner(user_id) {
            return Ok(true);
        }
        match guild_id {
            Some(guild_id) => self.is_whitelisted(guild_id).await,
            None => Ok(false),
        }
    }

    pub async fn whitelist(&self, mode: WhitelistMode, guild_id: u64) -> Result<(), WhitelistError> {
        self.documents
            .update_configuration(|config| {
                let guilds = &mut config.whitelisted_guilds;
                match mode {
                    WhitelistMode::Add => {
                        if guilds.contains(&guild_id) {
                            return Err(WhitelistError::AlreadyWhitelisted(guild_id));
                        }
                        guilds.push(guild_id);
                    }
                    WhitelistMode::Remove => {
                        let before = guilds.len();
                        guilds.retain(|id| *id != guild_id);
                        if guilds.len() == before {
                            return Err(WhitelistError::NotWhitelisted(guild_id));
                        }
                    }
                }
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::storage::InMemoryDocumentStore;

    fn service() -> AccessService {
        let documents = Arc::new(DocumentService::new(Arc::new(InMemoryDocumentStore::new())));
        AccessService::new(documents, [1])
    }

    #[test]
    fn parses_modes() {
        assert_eq!(WhitelistMode::parse("ADD"), WhitelistMode::Add);
        assert_eq!(WhitelistMode::parse("1"), WhitelistMode::Add);
        assert_eq!(WhitelistMode::parse("remove"), WhitelistMode::Remove);
        assert_eq!(WhitelistMode::parse("whatever"), WhitelistMode::Remove);
    }

    #[tokio::test]
    async fn owners_bypass_the_whitelist() {
        let service = service();

        assert!(service.may_run_commands(Some(50), 1).await.unwrap());
        assert!(!service.may_run_commands(Some(50), 2).await.unwrap());
        assert!(!service.may_run_commands(None, 2).await.unwrap());
        assert!(service.may_run_commands(None, 1).await.unwrap());

        service.whitelist(WhitelistMode::Add, 50).await.unwrap();
        assert!(service.may_run_commands(Some(50), 2).await.unwrap());
    }

    #[tokio::test]
    async fn whitelist_rejects_no_op_changes() {
        let service = service();

        service.whitelist(WhitelistMode::Add, 50).await.unwrap();
        assert!(matches!(
            service.whitelist(WhitelistMode::Add, 50).await,
            Err(WhitelistError::AlreadyWhitelisted(50))
        ));

        service.whitelist(WhitelistMode::Remove, 50).await.unwrap();
        assert!(matches!(
            service.whitelist(WhitelistMode::Remove, 50).await,
            Err(WhitelistError::NotWhitelisted(50))
        ));
    }
}
