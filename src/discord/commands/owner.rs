// Bot owner commands: rotating statuses, the guild whitelist and badges.

use crate::core::access::WhitelistMode;
use crate::core::presence::parse_toggle;
use crate::discord::embeds::{reply_checkmark, reply_usage, reply_warning};
use crate::discord::notice::settle;
use crate::discord::views::{numbered, paginate};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

async fn is_bot_owner(ctx: Context<'_>) -> Result<bool, Error> {
    Ok(ctx.data().access.is_owner(ctx.author().id.get()))
}

fn toggled(enabled: bool) -> &'static str {
    if enabled {
        "Enabled"
    } else {
        "Disabled"
    }
}

/// A group of owner related commands
#[poise::command(
    prefix_command,
    aliases("ownc", "own"),
    check = "is_bot_owner",
    hide_in_help,
    subcommands("status", "whitelist", "badge")
)]
pub async fn ownercmds(ctx: Context<'_>) -> Result<(), Error> {
    reply_usage(ctx).await
}

// ============================================================================
// STATUSES
// ============================================================================

/// List the rotating statuses
#[poise::command(
    prefix_command,
    check = "is_bot_owner",
    subcommands("status_add", "status_remove", "status_set", "status_randomize", "status_loop")
)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let statuses = ctx.data().presence.statuses().await?;
    if statuses.is_empty() {
        return reply_warning(ctx, "There are **no** rotating statuses.").await;
    }
    let bot_name = ctx.cache().current_user().name.clone();
    paginate(ctx, &format!("Auto-rotating statuses for {bot_name}"), &numbered(statuses)).await
}

/// Add a status to the rotation
#[poise::command(prefix_command, rename = "add", check = "is_bot_owner")]
pub async fn status_add(ctx: Context<'_>, #[rest] status: String) -> Result<(), Error> {
    let result = ctx.data().presence.add_status(&status).await;
    if settle(ctx, result).await?.is_some() {
        reply_checkmark(ctx, format!("Added `{}` to the rotating statuses.", status.trim())).await?;
    }
    Ok(())
}

/// Remove a status from the rotation
#[poise::command(prefix_command, rename = "remove", check = "is_bot_owner")]
pub async fn status_remove(ctx: Context<'_>, #[rest] status: String) -> Result<(), Error> {
    let result = ctx.data().presence.remove_status(&status).await;
    if settle(ctx, result).await?.is_some() {
        reply_checkmark(ctx, format!("Removed `{}` from the rotating statuses.", status.trim())).await?;
    }
    Ok(())
}

/// Set the bot's status right away
#[poise::command(prefix_command, rename = "set", check = "is_bot_owner")]
pub async fn status_set(ctx: Context<'_>, #[rest] status: String) -> Result<(), Error> {
    let result = ctx.data().presence.pin_status(&status).await;
    if settle(ctx, result).await?.is_none() {
        return Ok(());
    }

    let status = status.trim();
    ctx.serenity_context()
        .set_activity(Some(serenity::ActivityData::custom(status)));
    reply_checkmark(ctx, format!("Set the bot's status to `{status}`.")).await
}

/// Pick rotating statuses at random
#[poise::command(
    prefix_command,
    rename = "randomize",
    aliases("random", "randomise"),
    check = "is_bot_owner"
)]
pub async fn status_randomize(ctx: Context<'_>, toggle: String) -> Result<(), Error> {
    let enabled = parse_toggle(&toggle);
    ctx.data().presence.set_randomized(enabled).await?;
    reply_checkmark(ctx, format!("**{}** randomized status looping.", toggled(enabled))).await
}

/// Turn status rotation on or off
#[poise::command(prefix_command, rename = "loop", check = "is_bot_owner")]
pub async fn status_loop(ctx: Context<'_>, toggle: String) -> Result<(), Error> {
    let enabled = parse_toggle(&toggle);
    ctx.data().presence.set_looping(enabled).await?;
    reply_checkmark(ctx, format!("**{}** status looping.", toggled(enabled))).await
}

// ============================================================================
// WHITELIST
// ============================================================================

/// Add or remove a guild from the whitelist
#[poise::command(prefix_command, check = "is_bot_owner")]
pub async fn whitelist(ctx: Context<'_>, mode: String, guild: u64) -> Result<(), Error> {
    let mode = WhitelistMode::parse(&mode);
    let result = ctx.data().access.whitelist(mode, guild).await;
    if settle(ctx, result).await?.is_some() {
        let verb = match mode {
            WhitelistMode::Add => "added to",
            WhitelistMode::Remove => "removed from",
        };
        tracing::info!(guild_id = guild, "Whitelist updated: {}", verb);
        reply_checkmark(ctx, format!("`{guild}` has been **{verb}** the whitelist.")).await?;
    }
    Ok(())
}

// ============================================================================
// BADGES
// ============================================================================

/// A group of badge related commands
#[poise::command(prefix_command, check = "is_bot_owner", subcommands("badge_add", "badge_remove"))]
pub async fn badge(ctx: Context<'_>) -> Result<(), Error> {
    reply_usage(ctx).await
}

/// Give a user a badge
#[poise::command(prefix_command, rename = "add", check = "is_bot_owner")]
pub async fn badge_add(ctx: Context<'_>, user: serenity::User, #[rest] badge_name: String) -> Result<(), Error> {
    let result = ctx.data().badges.grant(user.id.get(), &badge_name).await;
    if let Some(badge) = settle(ctx, result).await? {
        reply_checkmark(
            ctx,
            format!("Added {} `{}` badge to **{}**.", badge.emoji, badge.name, user.name),
        )
        .await?;
    }
    Ok(())
}

/// Take a badge away from a user
#[poise::command(prefix_command, rename = "remove", aliases("delete", "rm"), check = "is_bot_owner")]
pub async fn badge_remove(ctx: Context<'_>, user: serenity::User, #[rest] badge_name: String) -> Result<(), Error> {
    let result = ctx.data().badges.revoke(user.id.get(), &badge_name).await;
    if let Some(badge) = settle(ctx, result).await? {
        reply_checkmark(
            ctx,
            format!("Removed {} `{}` badge from **{}**.", badge.emoji, badge.name, user.name),
        )
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_words() {
        assert_eq!(toggled(parse_toggle("on")), "Enabled");
        assert_eq!(toggled(parse_toggle("nope")), "Disabled");
    }
}
