// VoiceMaster events: temporary channel creation and cleanup, and the
// persistent interface buttons.

use crate::core::voicemaster::{channel_name, stale_channels, ChannelPresence, Ownership};
use crate::discord::embeds;
use crate::discord::voice_controls::{
    apply_access, ownership, ChannelAccess, LOCK_BUTTON, NOT_IN_VOICE, NOT_OWNER, UNLOCK_BUTTON,
};
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;
use std::collections::{HashMap, HashSet};

/// Create a channel for `member` next to the creation channel and move them in.
async fn create_owned_channel(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    creation_channel: serenity::ChannelId,
    member: &serenity::Member,
) -> Result<serenity::ChannelId, Error> {
    let category = ctx
        .cache
        .guild(guild_id)
        .and_then(|guild| guild.channels.get(&creation_channel).and_then(|c| c.parent_id));

    let owner_overwrite = serenity::PermissionOverwrite {
        allow: serenity::Permissions::CONNECT | serenity::Permissions::MANAGE_CHANNELS,
        deny: serenity::Permissions::empty(),
        kind: serenity::PermissionOverwriteType::Member(member.user.id),
    };

    let mut builder = serenity::CreateChannel::new(channel_name(&member.user.name))
        .kind(serenity::ChannelType::Voice)
        .permissions(vec![owner_overwrite])
        .audit_log_reason("VoiceMaster: Created channel");
    if let Some(category) = category {
        builder = builder.category(category);
    }

    let channel = guild_id.create_channel(&ctx.http, builder).await?;
    guild_id.move_member(&ctx.http, member.user.id, channel.id).await?;
    Ok(channel.id)
}

pub async fn handle_voice_state_update(
    ctx: &serenity::Context,
    data: &Data,
    old: Option<&serenity::VoiceState>,
    new: &serenity::VoiceState,
) -> Result<(), Error> {
    let Some(guild_id) = new.guild_id else {
        return Ok(());
    };
    if old.and_then(|state| state.channel_id) == new.channel_id {
        return Ok(());
    }

    let doc = data.documents.get_guild_data(guild_id.get()).await?;
    let creation_channel = doc.voicemaster.settings.creation_channel;
    if creation_channel.is_none() && doc.voicemaster.channels.is_empty() {
        return Ok(());
    }

    let mut created = None;
    if let (Some(joined), Some(creation), Some(member)) =
        (new.channel_id, creation_channel, new.member.as_ref())
    {
        if joined.get() == creation {
            match create_owned_channel(ctx, guild_id, joined, member).await {
                Ok(channel_id) => {
                    tracing::info!(guild_id = guild_id.get(), "Created VoiceMaster channel {}", channel_id);
                    created = Some((channel_id.get(), member.user.id.get()));
                }
                Err(e) => tracing::warn!("Failed to create VoiceMaster channel: {}", e),
            }
        }
    }

    let (existing, occupancy): (HashSet<u64>, HashMap<u64, usize>) = match ctx.cache.guild(guild_id) {
        Some(guild) => {
            let existing = guild.channels.keys().map(|id| id.get()).collect();
            let mut occupancy = HashMap::new();
            for state in guild.voice_states.values() {
                if let Some(channel_id) = state.channel_id {
                    *occupancy.entry(channel_id.get()).or_insert(0) += 1;
                }
            }
            (existing, occupancy)
        }
        None => return Ok(()),
    };

    let stale = stale_channels(&doc, |channel_id| {
        if !existing.contains(&channel_id) {
            ChannelPresence::Missing
        } else if occupancy.get(&channel_id).copied().unwrap_or(0) == 0 {
            ChannelPresence::Empty
        } else {
            ChannelPresence::Occupied
        }
    });

    let mut forget = Vec::with_capacity(stale.len());
    for (channel_id, presence) in stale {
        if presence == ChannelPresence::Empty {
            let channel = serenity::ChannelId::new(channel_id);
            if let Err(e) = channel.delete(&ctx.http).await {
                tracing::warn!("Failed to delete empty VoiceMaster channel {}: {}", channel_id, e);
                continue;
            }
        }
        forget.push(channel_id);
    }

    data.voicemaster
        .reconcile(guild_id.get(), created, &forget)
        .await?;
    Ok(())
}

pub async fn handle_interface_button(
    ctx: &serenity::Context,
    data: &Data,
    component: &serenity::ComponentInteraction,
) -> Result<(), Error> {
    let access = match component.data.custom_id.as_str() {
        LOCK_BUTTON => ChannelAccess::Lock,
        UNLOCK_BUTTON => ChannelAccess::Unlock,
        _ => return Ok(()),
    };
    let Some(guild_id) = component.guild_id else {
        return Ok(());
    };
    let user = &component.user;

    let embed = match ownership(ctx, data, guild_id, user.id).await? {
        Ownership::NotInVoice => embeds::warning(Some(user), NOT_IN_VOICE),
        Ownership::NotOwner => embeds::warning(Some(user), NOT_OWNER),
        Ownership::Owner { channel_id } => {
            apply_access(ctx, guild_id, serenity::ChannelId::new(channel_id), access).await?;
            let (emoji, message) = access.done();
            embeds::plain(Some(user), emoji, message, embeds::MAIN)
        }
    };

    component
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .embed(embed)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}
