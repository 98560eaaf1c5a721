// Auto-responders, reaction roles and keyword filters.

use crate::discord::commands::guards::{is_forbidden, manageable_role};
use crate::discord::embeds::{reply_checkmark, reply_not_found, reply_usage, reply_warning};
use crate::discord::lookup::{emoji_key, parse_message_ref};
use crate::discord::notice::settle;
use crate::discord::views::{numbered, paginate};
use crate::discord::{Context, Error};
use poise::serenity_prelude::{self as serenity, Mentionable};

// ============================================================================
// AUTO-RESPONDERS
// ============================================================================

/// Reply automatically when a trigger word is said
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    aliases("ar"),
    subcommands("autoresponder_add", "autoresponder_remove", "autoresponder_list")
)]
pub async fn autoresponder(ctx: Context<'_>) -> Result<(), Error> {
    reply_usage(ctx).await
}

/// Add an auto-responder
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    rename = "add",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn autoresponder_add(
    ctx: Context<'_>,
    #[description = "Word or phrase to respond to"] trigger: String,
    #[description = "What to reply with"]
    #[rest]
    response: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let result = ctx
        .data()
        .automation
        .add_responder(guild_id.get(), &trigger, &response)
        .await;
    if let Some(trigger) = settle(ctx, result).await? {
        reply_checkmark(ctx, format!("Added an **auto-responder** for `{trigger}`.")).await?;
    }
    Ok(())
}

/// Remove an auto-responder
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    rename = "remove",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn autoresponder_remove(
    ctx: Context<'_>,
    #[description = "Trigger to remove"]
    #[rest]
    trigger: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let result = ctx.data().automation.remove_responder(guild_id.get(), &trigger).await;
    if let Some(trigger) = settle(ctx, result).await? {
        reply_checkmark(ctx, format!("Removed the **auto-responder** for `{trigger}`.")).await?;
    }
    Ok(())
}

/// List the auto-responders of this server
#[poise::command(prefix_command, slash_command, guild_only, rename = "list")]
pub async fn autoresponder_list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let data = ctx.data().automation.data(guild_id.get()).await?;
    if data.auto_responders.is_empty() {
        return reply_warning(ctx, "This server has **no** auto-responders.").await;
    }

    let lines = numbered(
        data.auto_responders
            .iter()
            .map(|(trigger, response)| format!("`{trigger}` → {response}")),
    );
    paginate(ctx, "Auto-responders", &lines).await
}

// ============================================================================
// REACTION ROLES
// ============================================================================

/// Give out roles when members react to a message
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    aliases("rr"),
    subcommands("reactionrole_add", "reactionrole_remove", "reactionrole_list")
)]
pub async fn reactionrole(ctx: Context<'_>) -> Result<(), Error> {
    reply_usage(ctx).await
}

/// The message a reaction role is bound to, fetched to make sure it exists.
async fn target_message(ctx: Context<'_>, reference: &str) -> Result<Option<serenity::Message>, Error> {
    let Some((channel, message_id)) = parse_message_ref(reference) else {
        reply_not_found(ctx, format!("I couldn't find the message: `{reference}`.")).await?;
        return Ok(None);
    };
    let channel = channel.map(serenity::ChannelId::new).unwrap_or(ctx.channel_id());

    match channel.message(ctx, serenity::MessageId::new(message_id)).await {
        Ok(message) => Ok(Some(message)),
        Err(e) => {
            tracing::debug!("Reaction role target {} not fetched: {}", message_id, e);
            reply_not_found(ctx, format!("I couldn't find the message: `{reference}`.")).await?;
            Ok(None)
        }
    }
}

/// Bind an emoji on a message to a role
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    rename = "add",
    required_permissions = "MANAGE_ROLES",
    required_bot_permissions = "MANAGE_ROLES | ADD_REACTIONS"
)]
pub async fn reactionrole_add(
    ctx: Context<'_>,
    #[description = "Message ID or link"] message: String,
    #[description = "Emoji to react with"] emoji: String,
    #[description = "Role to give"]
    #[rest]
    role: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let Ok(reaction) = serenity::ReactionType::try_from(emoji.trim()) else {
        return reply_not_found(ctx, format!("I couldn't find the emoji: {emoji}")).await;
    };
    let Some(role) = manageable_role(ctx, &role, "give out").await? else {
        return Ok(());
    };
    let Some(target) = target_message(ctx, &message).await? else {
        return Ok(());
    };

    if let Err(e) = target.react(ctx, reaction).await {
        if is_forbidden(&e) {
            return reply_warning(ctx, "I'm **missing** permissions to react to that message.").await;
        }
        return reply_warning(ctx, format!("I **couldn't react** with {emoji}.")).await;
    }

    let result = ctx
        .data()
        .automation
        .add_reaction_role(guild_id.get(), target.id.get(), &emoji_key(&emoji), role.id)
        .await;
    if settle(ctx, result).await?.is_some() {
        reply_checkmark(
            ctx,
            format!(
                "Reacting with {} now gives {}.",
                emoji.trim(),
                serenity::RoleId::new(role.id).mention()
            ),
        )
        .await?;
    }
    Ok(())
}

/// Unbind an emoji from a message
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    rename = "remove",
    required_permissions = "MANAGE_ROLES"
)]
pub async fn reactionrole_remove(
    ctx: Context<'_>,
    #[description = "Message ID or link"] message: String,
    #[description = "Emoji to unbind"] emoji: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let Some((_, message_id)) = parse_message_ref(&message) else {
        return reply_not_found(ctx, format!("I couldn't find the message: `{message}`.")).await;
    };

    let result = ctx
        .data()
        .automation
        .remove_reaction_role(guild_id.get(), message_id, &emoji_key(&emoji))
        .await;
    if let Some(role_id) = settle(ctx, result).await? {
        reply_checkmark(
            ctx,
            format!(
                "Removed the {} reaction role for {}.",
                emoji.trim(),
                serenity::RoleId::new(role_id).mention()
            ),
        )
        .await?;
    }
    Ok(())
}

/// Display name of a stored emoji key: custom emoji keys are `name:id`.
fn render_emoji(key: &str) -> String {
    match key.rsplit_once(':') {
        Some((name, id)) if id.parse::<u64>().is_ok() => format!("<:{name}:{id}>"),
        _ => key.to_string(),
    }
}

/// List the reaction roles of this server
#[poise::command(prefix_command, slash_command, guild_only, rename = "list")]
pub async fn reactionrole_list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let data = ctx.data().automation.data(guild_id.get()).await?;

    let lines = numbered(data.reaction_roles.iter().flat_map(|(message_id, bindings)| {
        bindings.iter().map(move |(emoji, role_id)| {
            format!(
                "`{message_id}` {} → {}",
                render_emoji(emoji),
                serenity::RoleId::new(*role_id).mention()
            )
        })
    }));
    if lines.is_empty() {
        return reply_warning(ctx, "This server has **no** reaction roles.").await;
    }
    paginate(ctx, "Reaction roles", &lines).await
}

// ============================================================================
// FILTERS
// ============================================================================

/// Delete messages containing filtered keywords
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    subcommands("filter_add", "filter_remove", "filter_list")
)]
pub async fn filter(ctx: Context<'_>) -> Result<(), Error> {
    reply_usage(ctx).await
}

/// Filter a keyword
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    rename = "add",
    required_permissions = "MANAGE_MESSAGES"
)]
pub async fn filter_add(
    ctx: Context<'_>,
    #[description = "Keyword to filter"]
    #[rest]
    keyword: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let result = ctx.data().automation.add_filter(guild_id.get(), &keyword).await;
    if let Some(word) = settle(ctx, result).await? {
        reply_checkmark(ctx, format!("Now filtering `{word}`.")).await?;
    }
    Ok(())
}

/// Stop filtering a keyword
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    rename = "remove",
    required_permissions = "MANAGE_MESSAGES"
)]
pub async fn filter_remove(
    ctx: Context<'_>,
    #[description = "Keyword to stop filtering"]
    #[rest]
    keyword: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let result = ctx.data().automation.remove_filter(guild_id.get(), &keyword).await;
    if let Some(word) = settle(ctx, result).await? {
        reply_checkmark(ctx, format!("No longer filtering `{word}`.")).await?;
    }
    Ok(())
}

/// List the filtered keywords
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    rename = "list",
    required_permissions = "MANAGE_MESSAGES"
)]
pub async fn filter_list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let data = ctx.data().automation.data(guild_id.get()).await?;
    if data.filtered_words.is_empty() {
        return reply_warning(ctx, "This server has **no** filtered keywords.").await;
    }
    let lines = numbered(data.filtered_words.iter().map(|word| format!("`{word}`")));
    paginate(ctx, "Filtered keywords", &lines).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_emoji_keys_render_back() {
        assert_eq!(render_emoji("wave:7"), "<:wave:7>");
        assert_eq!(render_emoji("🍎"), "🍎");
        assert_eq!(render_emoji("a:b"), "a:b");
    }
}
