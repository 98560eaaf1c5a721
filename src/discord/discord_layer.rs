// Discord layer - commands, event handlers and the framework hooks that glue
// them to the core services.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "events/event_catalog.rs"]
pub mod events;

pub mod embeds;
pub mod framework;
pub mod lookup;
pub mod notice;
pub mod views;
pub mod voice_controls;

use crate::core::access::AccessService;
use crate::core::automation::AutomationService;
use crate::core::badges::BadgeService;
use crate::core::guild_settings::GuildSettingsService;
use crate::core::moderation::ModerationService;
use crate::core::presence::PresenceService;
use crate::core::roleplay::RolePlayService;
use crate::core::storage::DocumentService;
use crate::core::voicemaster::VoiceMasterService;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared state handed to every command and event.
pub struct Data {
    pub documents: Arc<DocumentService>,
    pub settings: Arc<GuildSettingsService>,
    pub access: Arc<AccessService>,
    pub moderation: Arc<ModerationService>,
    pub voicemaster: Arc<VoiceMasterService>,
    pub presence: Arc<PresenceService>,
    pub automation: Arc<AutomationService>,
    pub roleplay: Arc<RolePlayService>,
    pub badges: Arc<BadgeService>,
}

impl Data {
    /// Build every service on top of one document service.
    pub fn new(documents: Arc<DocumentService>, fallback_prefix: &str, owners: impl IntoIterator<Item = u64>) -> Self {
        Self {
            settings: Arc::new(GuildSettingsService::new(Arc::clone(&documents), fallback_prefix)),
            access: Arc::new(AccessService::new(Arc::clone(&documents), owners)),
            moderation: Arc::new(ModerationService::new(Arc::clone(&documents))),
            voicemaster: Arc::new(VoiceMasterService::new(Arc::clone(&documents))),
            presence: Arc::new(PresenceService::new(Arc::clone(&documents))),
            automation: Arc::new(AutomationService::new(Arc::clone(&documents))),
            roleplay: Arc::new(RolePlayService::new(Arc::clone(&documents))),
            badges: Arc::new(BadgeService::new(Arc::clone(&documents))),
            documents,
        }
    }
}
