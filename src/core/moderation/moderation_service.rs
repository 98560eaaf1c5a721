// Persisted moderation state.
//
// This service handles:
// - Hard bans (re-applied whenever the user rejoins)
// - Anti-nuke administrators
// - Forced nicknames
// - Sticky roles and the role snapshots used to notice removals
//
// NO Discord dependencies here - just pure domain logic on the documents.

use crate::core::storage::{DocumentService, StoreError};
use std::sync::Arc;
use thiserror::Error;

/// Discord's nickname limit.
pub const MAX_NICKNAME_LEN: usize = 32;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("That user is **already** hard-banned.")]
    AlreadyHardBanned,

    #[error("That user isn't hard-banned.")]
    NotHardBanned,

    #[error("That member is **already** an anti-nuke administrator.")]
    AlreadyAdministrator,

    #[error("That member isn't an anti-nuke administrator.")]
    NotAdministrator,

    #[error("That role is **already** sticky for this member.")]
    AlreadySticky,

    #[error("That role isn't sticky for this member.")]
    NotSticky,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

// ============================================================================
// PURE HELPERS
// ============================================================================

/// Cut a nickname down to what Discord accepts.
pub fn truncate_nickname(nickname: &str) -> String {
    nickname.chars().take(MAX_NICKNAME_LEN).collect()
}

/// The nickname to apply when a member's current one drifts from the forced one.
pub fn nickname_to_enforce<'a>(forced: Option<&'a str>, current: Option<&str>) -> Option<&'a str> {
    match forced {
        Some(forced) if current != Some(forced) => Some(forced),
        _ => None,
    }
}

/// Sticky roles that were present in `before` but are gone from `after`.
pub fn removed_sticky_roles(before: &[u64], after: &[u64], sticky: &[u64]) -> Vec<u64> {
    before
        .iter()
        .copied()
        .filter(|id| !after.contains(id) && sticky.contains(id))
        .collect()
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct ModerationService {
    documents: Arc<DocumentService>,
}

impl ModerationService {
    pub fn new(documents: Arc<DocumentService>) -> Self {
        Self { documents }
    }

    // ------------------------------------------------------------------------
    // Hard bans
    // ------------------------------------------------------------------------

    pub async fn is_hard_banned(&self, guild_id: u64, user_id: u64) -> Result<bool, StoreError> {
        Ok(self
            .documents
            .get_guild_data(guild_id)
            .await?
            .is_hard_banned(user_id))
    }

    pub async fn hardban(&self, guild_id: u64, user_id: u64) -> Result<(), ModerationError> {
        self.documents
            .update_guild(guild_id, |doc| {
                if doc.is_hard_banned(user_id) {
                    return Err(ModerationError::AlreadyHardBanned);
                }
                doc.moderation.hard_banned_users.push(user_id);
                Ok(())
            })
            .await
    }

    /// Take a user off the hard-ban list.
    pub async fn lift_hardban(&self, guild_id: u64, user_id: u64) -> Result<(), ModerationError> {
        self.documents
            .update_guild(guild_id, |doc| {
                let before = doc.moderation.hard_banned_users.len();
                doc.moderation.hard_banned_users.retain(|id| *id != user_id);
                if doc.moderation.hard_banned_users.len() == before {
                    return Err(ModerationError::NotHardBanned);
                }
                Ok(())
            })
            .await
    }

    // ------------------------------------------------------------------------
    // Anti-nuke administrators
    // ------------------------------------------------------------------------

    pub async fn is_antinuke_admin(
        &self,
        guild_id: u64,
        user_id: u64,
        owner_id: u64,
    ) -> Result<bool, StoreError> {
        Ok(self
            .documents
            .get_guild_data(guild_id)
            .await?
            .is_antinuke_admin(user_id, owner_id))
    }

    pub async fn antinuke_admins(&self, guild_id: u64) -> Result<Vec<u64>, StoreError> {
        Ok(self
            .documents
            .get_guild_data(guild_id)
            .await?
            .antinuke
            .administrators)
    }

    pub async fn add_antinuke_admin(&self, guild_id: u64, user_id: u64) -> Result<(), ModerationError> {
        self.documents
            .update_guild(guild_id, |doc| {
                if doc.antinuke.administrators.contains(&user_id) {
                    return Err(ModerationError::AlreadyAdministrator);
                }
                doc.antinuke.administrators.push(user_id);
                Ok(())
            })
            .await
    }

    pub async fn remove_antinuke_admin(&self, guild_id: u64, user_id: u64) -> Result<(), ModerationError> {
        self.documents
            .update_guild(guild_id, |doc| {
                let admins = &mut doc.antinuke.administrators;
                let before = admins.len();
                admins.retain(|id| *id != user_id);
                if admins.len() == before {
                    return Err(ModerationError::NotAdministrator);
                }
                Ok(())
            })
            .await
    }

    // ------------------------------------------------------------------------
    // Forced nicknames
    // ------------------------------------------------------------------------

    pub async fn forced_nickname(&self, guild_id: u64, member_id: u64) -> Result<Option<String>, StoreError> {
        Ok(self
            .documents
            .get_member_data(guild_id, member_id)
            .await?
            .forced_nickname()
            .map(str::to_string))
    }

    /// Store (or clear, with `None`) a forced nickname. Returns what was stored.
    pub async fn set_forced_nickname(
        &self,
        guild_id: u64,
        member_id: u64,
        nickname: Option<&str>,
    ) -> Result<Option<String>, StoreError> {
        let nickname = nickname
            .map(str::trim)
            .filter(|nick| !nick.is_empty())
            .map(truncate_nickname);

        self.documents
            .update_member(guild_id, member_id, |doc| {
                doc.configuration.forced_nickname = nickname.clone();
                Ok::<_, StoreError>(nickname)
            })
            .await
    }

    // ------------------------------------------------------------------------
    // Sticky roles
    // ------------------------------------------------------------------------

    pub async fn sticky_roles(&self, guild_id: u64, member_id: u64) -> Result<Vec<u64>, StoreError> {
        Ok(self
            .documents
            .get_member_data(guild_id, member_id)
            .await?
            .sticky_roles)
    }

    pub async fn add_sticky_role(
        &self,
        guild_id: u64,
        member_id: u64,
        role_id: u64,
    ) -> Result<(), ModerationError> {
        self.documents
            .update_member(guild_id, member_id, |doc| {
                if doc.sticky_roles.contains(&role_id) {
                    return Err(ModerationError::AlreadySticky);
                }
                doc.sticky_roles.push(role_id);
                Ok(())
            })
            .await
    }

    pub async fn remove_sticky_role(
        &self,
        guild_id: u64,
        member_id: u64,
        role_id: u64,
    ) -> Result<(), ModerationError> {
        self.documents
            .update_member(guild_id, member_id, |doc| {
                let before = doc.sticky_roles.len();
                doc.sticky_roles.retain(|id| *id != role_id);
                if doc.sticky_roles.len() == before {
                    return Err(ModerationError::NotSticky);
                }
                Ok(())
            })
            .await
    }

    // ------------------------------------------------------------------------
    // Role snapshots
    // ------------------------------------------------------------------------

    /// Replace the cached role snapshot for a member and return the previous one.
    pub fn swap_role_snapshot(&self, guild_id: u64, member_id: u64, roles: Vec<u64>) -> Option<Vec<u64>> {
        let cache = &self.documents.cache().roles;
        let previous = cache.get(&(guild_id, member_id));
        cache.set((guild_id, member_id), roles);
        previous
    }

    /// Roles a member had before an update. The gateway's copy of the old
    /// member wins; the cached snapshot only fills in when it is missing.
    pub fn roles_before_update(
        &self,
        guild_id: u64,
        member_id: u64,
        old_roles: Option<Vec<u64>>,
        new_roles: Vec<u64>,
    ) -> Option<Vec<u64>> {
        let snapshot = self.swap_role_snapshot(guild_id, member_id, new_roles);
        old_roles.or(snapshot)
    }

    /// Forget a deleted role in every cached snapshot for the guild.
    pub fn forget_role(&self, guild_id: u64, role_id: u64) -> usize {
        self.documents.cache().strip_role(guild_id, role_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::storage::InMemoryDocumentStore;

    fn service() -> ModerationService {
        ModerationService::new(Arc::new(DocumentService::new(Arc::new(
            InMemoryDocumentStore::new(),
        ))))
    }

    #[test]
    fn nickname_helpers() {
        assert_eq!(truncate_nickname(&"a".repeat(40)).len(), MAX_NICKNAME_LEN);
        assert_eq!(nickname_to_enforce(Some("cat"), Some("dog")), Some("cat"));
        assert_eq!(nickname_to_enforce(Some("cat"), None), Some("cat"));
        assert_eq!(nickname_to_enforce(Some("cat"), Some("cat")), None);
        assert_eq!(nickname_to_enforce(None, Some("dog")), None);
    }

    #[test]
    fn finds_removed_sticky_roles() {
        assert_eq!(removed_sticky_roles(&[1, 2, 3], &[1], &[2, 9]), vec![2]);
        assert!(removed_sticky_roles(&[1], &[1, 2], &[2]).is_empty());
    }

    #[tokio::test]
    async fn hardban_list_round_trip() {
        let service = service();

        service.hardban(1, 42).await.unwrap();
        assert!(service.is_hard_banned(1, 42).await.unwrap());
        assert!(!service.is_hard_banned(2, 42).await.unwrap());
        assert!(matches!(
            service.hardban(1, 42).await,
            Err(ModerationError::AlreadyHardBanned)
        ));

        service.lift_hardban(1, 42).await.unwrap();
        assert!(!service.is_hard_banned(1, 42).await.unwrap());
        assert!(matches!(
            service.lift_hardban(1, 42).await,
            Err(ModerationError::NotHardBanned)
        ));
    }

    #[tokio::test]
    async fn owner_is_always_an_antinuke_admin() {
        let service = service();

        assert!(service.is_antinuke_admin(1, 7, 7).await.unwrap());
        assert!(!service.is_antinuke_admin(1, 8, 7).await.unwrap());

        service.add_antinuke_admin(1, 8).await.unwrap();
        assert!(service.is_antinuke_admin(1, 8, 7).await.unwrap());
        assert!(matches!(
            service.add_antinuke_admin(1, 8).await,
            Err(ModerationError::AlreadyAdministrator)
        ));

        service.remove_antinuke_admin(1, 8).await.unwrap();
        assert!(service.antinuke_admins(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn forced_nickname_is_trimmed_and_clearable() {
        let service = service();

        let stored = service
            .set_forced_nickname(1, 2, Some(&"x".repeat(50)))
            .await
            .unwrap();
        assert_eq!(stored.as_deref().map(str::len), Some(MAX_NICKNAME_LEN));
        assert!(service.forced_nickname(1, 2).await.unwrap().is_some());

        assert_eq!(service.set_forced_nickname(1, 2, Some("  ")).await.unwrap(), None);
        assert_eq!(service.forced_nickname(1, 2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn sticky_roles_are_per_member() {
        let service = service();

        service.add_sticky_role(1, 2, 10).await.unwrap();
        assert!(matches!(
            service.add_sticky_role(1, 2, 10).await,
            Err(ModerationError::AlreadySticky)
        ));
        assert_eq!(service.sticky_roles(1, 2).await.unwrap(), vec![10]);
        assert!(service.sticky_roles(1, 3).await.unwrap().is_empty());

        service.remove_sticky_role(1, 2, 10).await.unwrap();
        assert!(matches!(
            service.remove_sticky_role(1, 2, 10).await,
            Err(ModerationError::NotSticky)
        ));
    }

    #[tokio::test]
    async fn role_snapshots_swap_and_forget() {
        let service = service();

        assert_eq!(service.swap_role_snapshot(1, 2, vec![5, 6]), None);
        assert_eq!(service.swap_role_snapshot(1, 2, vec![5]), Some(vec![5, 6]));

        assert_eq!(service.forget_role(1, 5), 1);
        assert_eq!(service.swap_role_snapshot(1, 2, vec![]), None);
    }

    #[tokio::test(start_paused = true)]
    async fn old_member_roles_cover_an_expired_snapshot() {
        let service = service();
        service.add_sticky_role(1, 2, 10).await.unwrap();

        service.swap_role_snapshot(1, 2, vec![10, 11]);
        tokio::time::advance(std::time::Duration::from_secs(301)).await;

        let before = service
            .roles_before_update(1, 2, Some(vec![10, 11]), vec![11])
            .unwrap();
        let sticky = service.sticky_roles(1, 2).await.unwrap();
        assert_eq!(removed_sticky_roles(&before, &[11], &sticky), vec![10]);
    }

    #[tokio::test]
    async fn snapshot_fills_in_without_an_old_member() {
        let service = service();

        assert_eq!(service.roles_before_update(1, 2, None, vec![5, 6]), None);
        assert_eq!(
            service.roles_before_update(1, 2, None, vec![5]),
            Some(vec![5, 6])
        );
        assert_eq!(
            service.roles_before_update(1, 2, Some(vec![7]), vec![]),
            Some(vec![7])
        );
    }
}
