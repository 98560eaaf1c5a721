// Guild lifecycle: the whitelist gate on join and role cleanup.

use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

const NOT_WHITELISTED: &str = "This server isn't whitelisted, you can \
get a whitelist by asking <@988623277326991440> (@wardrealm)";

/// First channel the bot may talk in: the system channel, else the highest
/// text channel it can send to.
fn announcement_channel(guild: &serenity::Guild, bot_id: serenity::UserId) -> Option<serenity::ChannelId> {
    let me = guild.members.get(&bot_id)?;
    let can_send = |channel: &serenity::GuildChannel| {
        guild.user_permissions_in(channel, me).send_messages()
    };

    if let Some(system) = guild.system_channel_id.and_then(|id| guild.channels.get(&id)) {
        if can_send(system) {
            return Some(system.id);
        }
    }

    let mut text: Vec<&serenity::GuildChannel> = guild
        .channels
        .values()
        .filter(|channel| channel.kind == serenity::ChannelType::Text)
        .collect();
    text.sort_by_key(|channel| channel.position);
    text.into_iter().find(|channel| can_send(channel)).map(|channel| channel.id)
}

pub async fn handle_guild_create(
    ctx: &serenity::Context,
    data: &Data,
    guild: &serenity::Guild,
    is_new: bool,
) -> Result<(), Error> {
    if !is_new {
        return Ok(());
    }

    let bot = ctx.cache.current_user().clone();
    let channel = announcement_channel(guild, bot.id);
    let whitelisted = data.access.is_whitelisted(guild.id.get()).await?;

    if !whitelisted {
        tracing::info!(guild_id = guild.id.get(), "Leaving non-whitelisted guild {}", guild.name);
        if let Some(channel) = channel {
            let embed = serenity::CreateEmbed::new()
                .author(serenity::CreateEmbedAuthor::new("Wardic is... not here.").icon_url(bot.face()))
                .description(NOT_WHITELISTED);
            if let Err(e) = channel
                .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
                .await
            {
                tracing::warn!("Failed to post whitelist notice: {}", e);
            }
        }
        if let Err(e) = guild.id.leave(&ctx.http).await {
            tracing::warn!("Failed to leave guild {}: {}", guild.id, e);
        }
        return Ok(());
    }

    tracing::info!(guild_id = guild.id.get(), "Joined guild {}", guild.name);
    let Some(channel) = channel else {
        return Ok(());
    };

    let prefix = data.settings.fallback_prefix();
    let embed = serenity::CreateEmbed::new()
        .author(serenity::CreateEmbedAuthor::new("Wardic is here!").icon_url(bot.face()))
        .description(format!(
            "**Wardic's default prefix is `{prefix}`**\n\
             To change the prefix, use `{prefix}prefix set (prefix)`.\n\
             Double check that the bot's role is within the guild's top 5 roles \
             for it to function correctly."
        ))
        .footer(serenity::CreateEmbedFooter::new("Thank you for choosing Wardic"));
    channel
        .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

/// Drop a deleted role from every cached role snapshot in the guild.
pub fn handle_role_delete(data: &Data, guild_id: serenity::GuildId, role_id: serenity::RoleId) {
    let cleaned = data.moderation.forget_role(guild_id.get(), role_id.get());
    if cleaned > 0 {
        tracing::debug!(
            guild_id = guild_id.get(),
            role_id = role_id.get(),
            "Removed deleted role from {} cached snapshots",
            cleaned
        );
    }
}
