// VoiceMaster commands: setup and owner controls for temporary channels.

use crate::core::storage::VoiceMasterSettings;
use crate::core::voicemaster::{validate_channel_name, ClaimError, Ownership, VoiceMasterError};
use crate::discord::commands::guards::is_forbidden;
use crate::discord::embeds::{self, reply_checkmark, reply_issue, reply_usage, reply_warning};
use crate::discord::notice::settle;
use crate::discord::voice_controls::{
    apply_access, connected_members, interface_buttons, ownership, voice_channel_of, ChannelAccess,
    NOT_IN_VOICE, NOT_OWNER,
};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Manage the VoiceMaster module
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    aliases("vc", "vm", "voice"),
    subcommands(
        "voicemaster_setup",
        "voicemaster_rename",
        "voicemaster_lock",
        "voicemaster_unlock",
        "voicemaster_hide",
        "voicemaster_reveal",
        "voicemaster_claim"
    )
)]
pub async fn voicemaster(ctx: Context<'_>) -> Result<(), Error> {
    reply_usage(ctx).await
}

// ============================================================================
// SETUP
// ============================================================================

/// Which of the configured channels still exist with the right type.
struct Existing {
    category: Option<u64>,
    creation_channel: Option<u64>,
    interface_channel: Option<u64>,
}

fn existing_channels(ctx: Context<'_>, guild_id: serenity::GuildId, settings: &VoiceMasterSettings) -> Existing {
    let Some(guild) = ctx.cache().guild(guild_id) else {
        return Existing {
            category: None,
            creation_channel: None,
            interface_channel: None,
        };
    };
    let keep = |id: Option<u64>, kind: serenity::ChannelType| {
        id.filter(|id| {
            guild
                .channels
                .get(&serenity::ChannelId::new(*id))
                .is_some_and(|channel| channel.kind == kind)
        })
    };

    Existing {
        category: keep(settings.category, serenity::ChannelType::Category),
        creation_channel: keep(settings.creation_channel, serenity::ChannelType::Voice),
        interface_channel: keep(settings.interface_channel, serenity::ChannelType::Text),
    }
}

fn text_lockdown(guild_id: serenity::GuildId) -> Vec<serenity::PermissionOverwrite> {
    vec![serenity::PermissionOverwrite {
        allow: serenity::Permissions::empty(),
        deny: serenity::Permissions::SEND_MESSAGES
            | serenity::Permissions::SEND_MESSAGES_IN_THREADS
            | serenity::Permissions::CREATE_PUBLIC_THREADS
            | serenity::Permissions::CREATE_PRIVATE_THREADS
            | serenity::Permissions::ADD_REACTIONS,
        kind: serenity::PermissionOverwriteType::Role(serenity::RoleId::new(guild_id.get())),
    }]
}

/// Create whatever is missing. Returns the new settings and how many
/// channels and categories were created.
async fn provision(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
    existing: Existing,
) -> Result<(VoiceMasterSettings, usize, usize), serenity::Error> {
    let reason = format!("Issued by {} (VoiceMaster Setup)", ctx.author().name);
    let (mut channels, mut categories) = (0, 0);

    let category = match existing.category {
        Some(id) => serenity::ChannelId::new(id),
        None => {
            let builder = serenity::CreateChannel::new("VoiceMaster")
                .kind(serenity::ChannelType::Category)
                .audit_log_reason(&reason);
            categories += 1;
            guild_id.create_channel(ctx, builder).await?.id
        }
    };

    let creation_channel = match existing.creation_channel {
        Some(id) => serenity::ChannelId::new(id),
        None => {
            let builder = serenity::CreateChannel::new("Join to Create")
                .kind(serenity::ChannelType::Voice)
                .position(1)
                .category(category)
                .permissions(text_lockdown(guild_id))
                .audit_log_reason(&reason);
            channels += 1;
            guild_id.create_channel(ctx, builder).await?.id
        }
    };

    let interface_channel = match existing.interface_channel {
        Some(id) => serenity::ChannelId::new(id),
        None => {
            let builder = serenity::CreateChannel::new("interface")
                .kind(serenity::ChannelType::Text)
                .position(2)
                .category(category)
                .permissions(text_lockdown(guild_id))
                .audit_log_reason(&reason);
            channels += 1;
            let channel = guild_id.create_channel(ctx, builder).await?;

            let bot = ctx.cache().current_user().clone();
            let embed = serenity::CreateEmbed::new()
                .title("VoiceMaster Controls")
                .color(embeds::MAIN)
                .author(serenity::CreateEmbedAuthor::new(&bot.name).icon_url(bot.face()));
            channel
                .send_message(
                    ctx,
                    serenity::CreateMessage::new()
                        .embed(embed)
                        .components(interface_buttons()),
                )
                .await?;
            channel.id
        }
    };

    let settings = VoiceMasterSettings {
        category: Some(category.get()),
        creation_channel: Some(creation_channel.get()),
        interface_channel: Some(interface_channel.get()),
    };
    Ok((settings, channels, categories))
}

fn setup_summary(channels: usize, categories: usize) -> String {
    let noun = if channels == 1 { "channel" } else { "channels" };
    let categories = if categories >= 1 {
        format!(" and {categories} category")
    } else {
        String::new()
    };
    format!(
        "Successfully set up VoiceMaster. I created {channels} {noun}{categories}. \
         You can manage them however you want."
    )
}

/// Set up the VoiceMaster module
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    rename = "setup",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn voicemaster_setup(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let current = ctx.data().voicemaster.settings(guild_id.get()).await?;
    let existing = existing_channels(ctx, guild_id, &current);

    let (settings, channels, categories) = match provision(ctx, guild_id, existing).await {
        Ok(created) => created,
        Err(e) if is_forbidden(&e) => {
            return reply_warning(ctx, "I'm **missing permissions** to create channels or categories.").await;
        }
        Err(e) => {
            tracing::warn!(guild_id = guild_id.get(), "VoiceMaster setup failed: {}", e);
            return reply_issue(ctx, "I **couldn't create channels or categories**. Try again later.").await;
        }
    };

    ctx.data()
        .voicemaster
        .save_settings(guild_id.get(), settings)
        .await?;

    if channels == 0 && categories == 0 {
        return reply_warning(ctx, "The **VoiceMaster** module is **already setup**.").await;
    }
    reply_checkmark(ctx, setup_summary(channels, categories)).await
}

// ============================================================================
// OWNER CONTROLS
// ============================================================================

/// The caller's VoiceMaster channel, or a warning reply when they don't own one.
async fn owned_channel(ctx: Context<'_>) -> Result<Option<serenity::ChannelId>, Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    match ownership(ctx.serenity_context(), ctx.data(), guild_id, ctx.author().id).await? {
        Ownership::Owner { channel_id } => Ok(Some(serenity::ChannelId::new(channel_id))),
        Ownership::NotOwner => {
            reply_warning(ctx, NOT_OWNER).await?;
            Ok(None)
        }
        Ownership::NotInVoice => {
            reply_warning(ctx, NOT_IN_VOICE).await?;
            Ok(None)
        }
    }
}

async fn change_access(ctx: Context<'_>, access: ChannelAccess) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let Some(channel_id) = owned_channel(ctx).await? else {
        return Ok(());
    };

    if let Err(e) = apply_access(ctx.serenity_context(), guild_id, channel_id, access).await {
        tracing::warn!("Failed to {} voice channel {}: {}", access.label(), channel_id, e);
        return reply_issue(ctx, "I **couldn't edit** your voice-channel. Try again later.").await;
    }

    let (emoji, message) = access.done();
    let embed = embeds::plain(Some(ctx.author()), emoji, message, embeds::MAIN);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Rename your voice channel
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    rename = "rename",
    aliases("name"),
    member_cooldown = 300
)]
pub async fn voicemaster_rename(
    ctx: Context<'_>,
    #[description = "New channel name"]
    #[rest]
    name: String,
) -> Result<(), Error> {
    let Some(channel_id) = owned_channel(ctx).await? else {
        return Ok(());
    };
    let Some(name) = settle(ctx, validate_channel_name(&name)).await? else {
        return Ok(());
    };

    let reason = format!("Issued by {} (VoiceMaster Rename)", ctx.author().name);
    channel_id
        .edit(ctx, serenity::EditChannel::new().name(name).audit_log_reason(&reason))
        .await?;
    reply_checkmark(ctx, format!("Renamed your **voice-channel** to `{name}`.")).await
}

/// Lock your voice channel
#[poise::command(prefix_command, slash_command, guild_only, rename = "lock", aliases("l"), member_cooldown = 5)]
pub async fn voicemaster_lock(ctx: Context<'_>) -> Result<(), Error> {
    change_access(ctx, ChannelAccess::Lock).await
}

/// Unlock your voice channel
#[poise::command(prefix_command, slash_command, guild_only, rename = "unlock", aliases("ul"), member_cooldown = 5)]
pub async fn voicemaster_unlock(ctx: Context<'_>) -> Result<(), Error> {
    change_access(ctx, ChannelAccess::Unlock).await
}

/// Hide your voice channel
#[poise::command(prefix_command, slash_command, guild_only, rename = "hide", aliases("h"), member_cooldown = 5)]
pub async fn voicemaster_hide(ctx: Context<'_>) -> Result<(), Error> {
    change_access(ctx, ChannelAccess::Hide).await
}

/// Reveal your voice channel
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    rename = "reveal",
    aliases("show", "unhide"),
    member_cooldown = 5
)]
pub async fn voicemaster_reveal(ctx: Context<'_>) -> Result<(), Error> {
    change_access(ctx, ChannelAccess::Reveal).await
}

/// Claim a voice channel whose owner has left
#[poise::command(prefix_command, slash_command, guild_only, rename = "claim", aliases("c"), member_cooldown = 5)]
pub async fn voicemaster_claim(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let Some(channel_id) = voice_channel_of(ctx.cache(), guild_id, ctx.author().id) else {
        return reply_warning(ctx, NOT_IN_VOICE).await;
    };
    let connected = connected_members(ctx.cache(), guild_id)
        .remove(&channel_id.get())
        .unwrap_or_default();

    let result = ctx
        .data()
        .voicemaster
        .claim(guild_id.get(), channel_id.get(), ctx.author().id.get(), &connected)
        .await;
    if let Err(VoiceMasterError::Claim(ClaimError::OwnerPresent(owner))) = &result {
        let owner_name = ctx
            .cache()
            .guild(guild_id)
            .and_then(|guild| guild.members.get(&serenity::UserId::new(*owner)).map(|m| m.user.name.clone()))
            .unwrap_or_else(|| "the current owner".to_string());
        return reply_warning(
            ctx,
            format!("You **can't claim** this channel. **{owner_name}** is still in the voice-channel."),
        )
        .await;
    }
    if settle(ctx, result).await?.is_none() {
        return Ok(());
    }

    let overwrite = serenity::PermissionOverwrite {
        allow: serenity::Permissions::CONNECT | serenity::Permissions::MANAGE_CHANNELS,
        deny: serenity::Permissions::empty(),
        kind: serenity::PermissionOverwriteType::Member(ctx.author().id),
    };
    if let Err(e) = channel_id.create_permission(ctx, overwrite).await {
        if !is_forbidden(&e) {
            tracing::warn!("Failed to grant claimed channel {}: {}", channel_id, e);
        }
    }

    reply_checkmark(ctx, "You've **claimed** this voice-channel.").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarises_what_setup_created() {
        assert_eq!(
            setup_summary(2, 1),
            "Successfully set up VoiceMaster. I created 2 channels and 1 category. \
             You can manage them however you want."
        );
        assert!(setup_summary(1, 0).contains("I created 1 channel."));
    }

    #[test]
    fn lockdown_denies_text_for_everyone() {
        let overwrites = text_lockdown(serenity::GuildId::new(9));
        assert_eq!(overwrites.len(), 1);
        assert!(overwrites[0].deny.contains(serenity::Permissions::SEND_MESSAGES));
        assert_eq!(
            overwrites[0].kind,
            serenity::PermissionOverwriteType::Role(serenity::RoleId::new(9))
        );
    }
}
