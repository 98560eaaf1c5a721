// The core module contains all business logic.
// Each feature gets its own submodule. Nothing in here knows about Discord.

#[path = "storage/mod.rs"]
pub mod storage;

#[path = "guild_settings/guild_settings_service.rs"]
pub mod guild_settings;

#[path = "access/access_service.rs"]
pub mod access;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "voicemaster/voicemaster_service.rs"]
pub mod voicemaster;

#[path = "presence/presence_service.rs"]
pub mod presence;

#[path = "automation/automation_service.rs"]
pub mod automation;

#[path = "roleplay/roleplay_service.rs"]
pub mod roleplay;

#[path = "badges/badge_service.rs"]
pub mod badges;
