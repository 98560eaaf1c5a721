// Message automation: keyword filters first, then auto-responders.

use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

/// Whether the author may post filtered words, from the cache.
fn bypasses_filter(ctx: &serenity::Context, message: &serenity::Message, guild_id: serenity::GuildId) -> bool {
    let Some(guild) = ctx.cache.guild(guild_id) else {
        return false;
    };
    let (Some(member), Some(channel)) = (
        guild.members.get(&message.author.id),
        guild.channels.get(&message.channel_id),
    ) else {
        return false;
    };
    guild.user_permissions_in(channel, member).manage_messages()
}

pub async fn handle_message(ctx: &serenity::Context, data: &Data, message: &serenity::Message) -> Result<(), Error> {
    if message.author.bot || message.content.is_empty() {
        return Ok(());
    }
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };

    if let Some(word) = data
        .automation
        .filtered_word(guild_id.get(), &message.content)
        .await?
    {
        if !bypasses_filter(ctx, message, guild_id) {
            tracing::info!(
                guild_id = guild_id.get(),
                "Deleting message from {} for filtered word `{}`",
                message.author.id,
                word
            );
            message.delete(&ctx.http).await?;
            return Ok(());
        }
    }

    if let Some(response) = data
        .automation
        .response_for(guild_id.get(), &message.content)
        .await?
    {
        message.channel_id.say(&ctx.http, response).await?;
    }
    Ok(())
}
