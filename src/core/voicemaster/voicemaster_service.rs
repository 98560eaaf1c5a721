// VoiceMaster: temporary voice channels owned by the member who created them.
//
// The Discord layer creates, edits and deletes channels. This service decides
// what should happen and keeps the tracked channels in the guild document.

use crate::core::storage::{DocumentService, GuildDocument, StoreError, VoiceMasterChannel, VoiceMasterSettings};
use std::sync::Arc;
use thiserror::Error;

pub const MAX_CHANNEL_NAME_LEN: usize = 100;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClaimError {
    #[error("This **isn't a VoiceMaster channel**.")]
    NotVoiceMaster,

    #[error("You **already own** this voice-channel.")]
    AlreadyOwner,

    /// The current owner is still connected.
    #[error("You **can't claim** this channel. The owner is still in the voice-channel.")]
    OwnerPresent(u64),
}

#[derive(Debug, Error)]
pub enum VoiceMasterError {
    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error("Voice channel names can be at most {MAX_CHANNEL_NAME_LEN} characters.")]
    NameTooLong,

    #[error("Voice channel names can't be empty.")]
    EmptyName,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

// ============================================================================
// MODELS
// ============================================================================

/// Where a member stands relative to VoiceMaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    NotInVoice,
    NotOwner,
    Owner { channel_id: u64 },
}

/// What the guild cache knows about a tracked channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPresence {
    Missing,
    Empty,
    Occupied,
}

// ============================================================================
// PURE HELPERS
// ============================================================================

/// Name for a freshly created channel.
pub fn channel_name(member_name: &str) -> String {
    format!("{member_name}'s Channel")
        .chars()
        .take(MAX_CHANNEL_NAME_LEN)
        .collect()
}

pub fn validate_channel_name(name: &str) -> Result<&str, VoiceMasterError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(VoiceMasterError::EmptyName);
    }
    if name.chars().count() > MAX_CHANNEL_NAME_LEN {
        return Err(VoiceMasterError::NameTooLong);
    }
    Ok(name)
}

pub fn ownership(doc: &GuildDocument, member_id: u64, voice_channel: Option<u64>) -> Ownership {
    let Some(channel_id) = voice_channel else {
        return Ownership::NotInVoice;
    };

    match doc.voicemaster.channels.get(&channel_id) {
        Some(channel) if channel.owner == Some(member_id) => Ownership::Owner { channel_id },
        _ => Ownership::NotOwner,
    }
}

/// Check whether `claimer` may take over `channel_id`, given who is
/// currently connected to it.
pub fn check_claim(
    doc: &GuildDocument,
    channel_id: u64,
    claimer: u64,
    connected: &[u64],
) -> Result<(), ClaimError> {
    let channel = doc
        .voicemaster
        .channels
        .get(&channel_id)
        .ok_or(ClaimError::NotVoiceMaster)?;

    match channel.owner {
        Some(owner) if owner == claimer => Err(ClaimError::AlreadyOwner),
        Some(owner) if connected.contains(&owner) => Err(ClaimError::OwnerPresent(owner)),
        _ => Ok(()),
    }
}

/// Tracked channels that should be forgotten. Empty ones also need deleting.
pub fn stale_channels(
    doc: &GuildDocument,
    presence: impl Fn(u64) -> ChannelPresence,
) -> Vec<(u64, ChannelPresence)> {
    doc.voicemaster
        .channels
        .keys()
        .map(|id| (*id, presence(*id)))
        .filter(|(_, state)| *state != ChannelPresence::Occupied)
        .collect()
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct VoiceMasterService {
    documents: Arc<DocumentService>,
}

impl VoiceMasterService {
    pub fn new(documents: Arc<DocumentService>) -> Self {
        Self { documents }
    }

    pub async fn settings(&self, guild_id: u64) -> Result<VoiceMasterSettings, StoreError> {
        Ok(self.documents.get_guild_data(guild_id).await?.voicemaster.settings)
    }

    pub async fn save_settings(&self, guild_id: u64, settings: VoiceMasterSettings) -> Result<(), StoreError> {
        self.documents
            .update_guild(guild_id, |doc| {
                doc.voicemaster.settings = settings;
                Ok(())
            })
            .await
    }

    pub async fn ownership(
        &self,
        guild_id: u64,
        member_id: u64,
        voice_channel: Option<u64>,
    ) -> Result<Ownership, StoreError> {
        if voice_channel.is_none() {
            return Ok(Ownership::NotInVoice);
        }
        let doc = self.documents.get_guild_data(guild_id).await?;
        Ok(ownership(&doc, member_id, voice_channel))
    }

    pub async fn tracked_channels(&self, guild_id: u64) -> Result<Vec<u64>, StoreError> {
        Ok(self
            .documents
            .get_guild_data(guild_id)
            .await?
            .voicemaster
            .channels
            .into_keys()
            .collect())
    }

    /// Apply one voice update in a single write: track a newly created
    /// channel and forget the stale ones.
    pub async fn reconcile(
        &self,
        guild_id: u64,
        created: Option<(u64, u64)>,
        forget: &[u64],
    ) -> Result<(), StoreError> {
        if created.is_none() && forget.is_empty() {
            return Ok(());
        }

        self.documents
            .update_guild(guild_id, |doc| {
                let channels = &mut doc.voicemaster.channels;
                if let Some((channel_id, owner_id)) = created {
                    channels.insert(
                        channel_id,
                        VoiceMasterChannel {
                            owner: Some(owner_id),
                        },
                    );
                }
                for channel_id in forget {
                    channels.remove(channel_id);
                }
                Ok(())
            })
            .await
    }

    /// Transfer ownership when the previous owner has left.
    pub async fn claim(
        &self,
        guild_id: u64,
        channel_id: u64,
        claimer: u64,
        connected: &[u64],
    ) -> Result<(), VoiceMasterError> {
        self.documents
            .update_guild(guild_id, |doc| {
                check_claim(doc, channel_id, claimer, connected)?;
                doc.voicemaster
                    .channels
                    .entry(channel_id)
                    .or_default()
                    .owner = Some(claimer);
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::storage::InMemoryDocumentStore;

    fn doc_with_channel(channel_id: u64, owner: u64) -> GuildDocument {
        let mut doc = GuildDocument::default();
        doc.voicemaster.channels.insert(
            channel_id,
            VoiceMasterChannel { owner: Some(owner) },
        );
        doc
    }

    #[test]
    fn names_new_channels_after_the_member() {
        assert_eq!(channel_name("kiwi"), "kiwi's Channel");
        assert_eq!(channel_name(&"a".repeat(120)).chars().count(), MAX_CHANNEL_NAME_LEN);
    }

    #[test]
    fn validates_renames() {
        assert_eq!(validate_channel_name("  Movie night ").unwrap(), "Movie night");
        assert!(matches!(validate_channel_name(" "), Err(VoiceMasterError::EmptyName)));
        assert!(matches!(
            validate_channel_name(&"x".repeat(101)),
            Err(VoiceMasterError::NameTooLong)
        ));
    }

    #[test]
    fn ownership_distinguishes_absent_and_foreign() {
        let doc = doc_with_channel(10, 1);

        assert_eq!(ownership(&doc, 1, None), Ownership::NotInVoice);
        assert_eq!(ownership(&doc, 1, Some(10)), Ownership::Owner { channel_id: 10 });
        assert_eq!(ownership(&doc, 2, Some(10)), Ownership::NotOwner);
        assert_eq!(ownership(&doc, 1, Some(11)), Ownership::NotOwner);
    }

    #[test]
    fn claim_rules() {
        let doc = doc_with_channel(10, 1);

        assert_eq!(check_claim(&doc, 11, 2, &[]), Err(ClaimError::NotVoiceMaster));
        assert_eq!(check_claim(&doc, 10, 1, &[1]), Err(ClaimError::AlreadyOwner));
        assert_eq!(check_claim(&doc, 10, 2, &[1, 2]), Err(ClaimError::OwnerPresent(1)));
        assert_eq!(check_claim(&doc, 10, 2, &[2]), Ok(()));
    }

    #[test]
    fn stale_channels_skip_occupied_ones() {
        let mut doc = doc_with_channel(10, 1);
        doc.voicemaster.channels.insert(11, VoiceMasterChannel::default());
        doc.voicemaster.channels.insert(12, VoiceMasterChannel::default());

        let stale = stale_channels(&doc, |id| match id {
            10 => ChannelPresence::Occupied,
            11 => ChannelPresence::Empty,
            _ => ChannelPresence::Missing,
        });

        assert_eq!(
            stale,
            vec![(11, ChannelPresence::Empty), (12, ChannelPresence::Missing)]
        );
    }

    #[tokio::test]
    async fn reconcile_tracks_and_forgets_in_one_write() {
        let documents = Arc::new(DocumentService::new(Arc::new(InMemoryDocumentStore::new())));
        let service = VoiceMasterService::new(documents);

        service.reconcile(1, Some((10, 5)), &[]).await.unwrap();
        service.reconcile(1, Some((11, 6)), &[10]).await.unwrap();

        assert_eq!(service.tracked_channels(1).await.unwrap(), vec![11]);
        assert_eq!(
            service.ownership(1, 6, Some(11)).await.unwrap(),
            Ownership::Owner { channel_id: 11 }
        );
    }

    #[tokio::test]
    async fn claim_moves_ownership() {
        let documents = Arc::new(DocumentService::new(Arc::new(InMemoryDocumentStore::new())));
        let service = VoiceMasterService::new(documents);
        service.reconcile(1, Some((10, 5)), &[]).await.unwrap();

        assert!(matches!(
            service.claim(1, 10, 6, &[5, 6]).await,
            Err(VoiceMasterError::Claim(ClaimError::OwnerPresent(5)))
        ));
        service.claim(1, 10, 6, &[6]).await.unwrap();
        assert_eq!(
            service.ownership(1, 6, Some(10)).await.unwrap(),
            Ownership::Owner { channel_id: 10 }
        );
    }

    #[tokio::test]
    async fn settings_round_trip() {
        let documents = Arc::new(DocumentService::new(Arc::new(InMemoryDocumentStore::new())));
        let service = VoiceMasterService::new(documents);

        let settings = VoiceMasterSettings {
            category: Some(1),
            creation_channel: Some(2),
            interface_channel: Some(3),
        };
        service.save_settings(9, settings.clone()).await.unwrap();
        assert_eq!(service.settings(9).await.unwrap(), settings);
    }
}
