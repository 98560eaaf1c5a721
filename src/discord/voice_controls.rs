// Discord side of VoiceMaster: channel ownership lookups and the permission
// edits shared by the commands and the interface buttons.

use crate::core::voicemaster::Ownership;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;
use std::collections::HashMap;

pub const LOCK_BUTTON: &str = "persistent_lock_button";
pub const UNLOCK_BUTTON: &str = "persistent_unlock_button";

pub const NOT_OWNER: &str = "You **don't own** a voice-channel.";
pub const NOT_IN_VOICE: &str = "You **aren't in** a voice-channel.";

/// What the owner can change about `@everyone` in their channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAccess {
    Lock,
    Unlock,
    Hide,
    Reveal,
}

impl ChannelAccess {
    fn permission(self) -> serenity::Permissions {
        match self {
            ChannelAccess::Lock | ChannelAccess::Unlock => serenity::Permissions::CONNECT,
            ChannelAccess::Hide | ChannelAccess::Reveal => serenity::Permissions::VIEW_CHANNEL,
        }
    }

    /// `Some(false)` denies the permission, `None` goes back to inheriting it.
    fn state(self) -> Option<bool> {
        match self {
            ChannelAccess::Lock | ChannelAccess::Hide => Some(false),
            ChannelAccess::Unlock | ChannelAccess::Reveal => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChannelAccess::Lock => "Lock",
            ChannelAccess::Unlock => "Unlock",
            ChannelAccess::Hide => "Hide",
            ChannelAccess::Reveal => "Reveal",
        }
    }

    /// Reply shown after the change, with its emoji.
    pub fn done(self) -> (&'static str, &'static str) {
        match self {
            ChannelAccess::Lock => ("🔒", "Locked your **voice-channel**."),
            ChannelAccess::Unlock => ("🔓", "Unlocked your **voice-channel**."),
            ChannelAccess::Hide => ("👻", "Hid your **voice-channel**."),
            ChannelAccess::Reveal => ("👀", "Revealed your **voice-channel**."),
        }
    }
}

/// Merge one permission into an existing allow/deny pair, leaving the
/// other bits alone.
pub fn merge_overwrite(
    allow: serenity::Permissions,
    deny: serenity::Permissions,
    permission: serenity::Permissions,
    state: Option<bool>,
) -> (serenity::Permissions, serenity::Permissions) {
    let (mut allow, mut deny) = (allow.difference(permission), deny.difference(permission));
    match state {
        Some(true) => allow |= permission,
        Some(false) => deny |= permission,
        None => {}
    }
    (allow, deny)
}

/// The voice channel a member is connected to, from the cache.
pub fn voice_channel_of(
    cache: &serenity::Cache,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
) -> Option<serenity::ChannelId> {
    cache
        .guild(guild_id)?
        .voice_states
        .get(&user_id)
        .and_then(|state| state.channel_id)
}

/// Who is connected to which voice channel in a guild.
pub fn connected_members(
    cache: &serenity::Cache,
    guild_id: serenity::GuildId,
) -> HashMap<u64, Vec<u64>> {
    let mut connected: HashMap<u64, Vec<u64>> = HashMap::new();
    if let Some(guild) = cache.guild(guild_id) {
        for (user_id, state) in &guild.voice_states {
            if let Some(channel_id) = state.channel_id {
                connected.entry(channel_id.get()).or_default().push(user_id.get());
            }
        }
    }
    connected
}

pub async fn ownership(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
) -> Result<Ownership, Error> {
    let channel = voice_channel_of(&ctx.cache, guild_id, user_id).map(|id| id.get());
    Ok(data
        .voicemaster
        .ownership(guild_id.get(), user_id.get(), channel)
        .await?)
}

/// Apply a lock/hide change to the `@everyone` overwrite of a channel.
pub async fn apply_access(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    channel_id: serenity::ChannelId,
    access: ChannelAccess,
) -> Result<(), Error> {
    let everyone = serenity::RoleId::new(guild_id.get());
    let (allow, deny) = ctx
        .cache
        .guild(guild_id)
        .and_then(|guild| {
            guild.channels.get(&channel_id).and_then(|channel| {
                channel
                    .permission_overwrites
                    .iter()
                    .find(|o| o.kind == serenity::PermissionOverwriteType::Role(everyone))
                    .map(|o| (o.allow, o.deny))
            })
        })
        .unwrap_or((serenity::Permissions::empty(), serenity::Permissions::empty()));

    let (allow, deny) = merge_overwrite(allow, deny, access.permission(), access.state());
    channel_id
        .create_permission(
            &ctx.http,
            serenity::PermissionOverwrite {
                allow,
                deny,
                kind: serenity::PermissionOverwriteType::Role(everyone),
            },
        )
        .await?;
    Ok(())
}

/// The Lock/Unlock row posted in the interface channel.
pub fn interface_buttons() -> Vec<serenity::CreateActionRow> {
    vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(LOCK_BUTTON)
            .label(ChannelAccess::Lock.label())
            .style(serenity::ButtonStyle::Secondary),
        serenity::CreateButton::new(UNLOCK_BUTTON)
            .label(ChannelAccess::Unlock.label())
            .style(serenity::ButtonStyle::Secondary),
    ])]
}

#[cfg(test)]
mod tests {
    use super::*;
    use self::serenity::Permissions;

    #[test]
    fn merging_only_touches_one_permission() {
        let allow = Permissions::SPEAK | Permissions::CONNECT;
        let deny = Permissions::STREAM;

        let (allow, deny) = merge_overwrite(allow, deny, Permissions::CONNECT, Some(false));
        assert_eq!(allow, Permissions::SPEAK);
        assert_eq!(deny, Permissions::STREAM | Permissions::CONNECT);

        let (allow, deny) = merge_overwrite(allow, deny, Permissions::CONNECT, None);
        assert_eq!(allow, Permissions::SPEAK);
        assert_eq!(deny, Permissions::STREAM);
    }

    #[test]
    fn lock_and_hide_deny_their_permission() {
        assert_eq!(ChannelAccess::Lock.state(), Some(false));
        assert_eq!(ChannelAccess::Reveal.state(), None);
        assert_eq!(ChannelAccess::Hide.permission(), Permissions::VIEW_CHANNEL);
    }
}
