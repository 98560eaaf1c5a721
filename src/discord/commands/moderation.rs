// Moderation commands: bans, kicks, timeouts, purges, nicknames, roles,
// sticky roles and anti-nuke administrators.

use crate::core::moderation::{
    format_duration, parse_duration, DurationError, MemberCheckOptions, DAY,
};
use crate::discord::commands::guards::{
    check_member, http_status, is_forbidden, manageable_role, require_antinuke_admin, snapshot,
};
use crate::discord::embeds::{reply_checkmark, reply_issue, reply_not_found, reply_usage, reply_warning};
use crate::discord::events::members::remember_roles;
use crate::discord::lookup::GuildSnapshot;
use crate::discord::notice::settle;
use crate::discord::views::{confirm, numbered, paginate};
use crate::discord::{Context, Error};
use poise::serenity_prelude::{self as serenity, Mentionable};

const NO_REASON: &str = "No reason provided.";
const MAX_BAN_HISTORY: u64 = 7 * DAY;
const MAX_TIMEOUT: u64 = 28 * DAY;
const MIN_PURGE: usize = 5;
const MAX_PURGE: usize = 500;
const BULK_DELETE_WINDOW: i64 = 14 * 86_400;

// ============================================================================
// HELPERS
// ============================================================================

/// Split `[history] [reason]` into the message history to delete (seconds)
/// and the reason. Histories longer than 7 days are clamped.
pub fn split_history(rest: Option<&str>) -> (u64, String) {
    let rest = rest.unwrap_or_default().trim();
    let (first, tail) = rest.split_once(' ').unwrap_or((rest, ""));

    let history = match parse_duration(first, "s", Some(MAX_BAN_HISTORY)) {
        Ok(seconds) => Some(seconds),
        Err(DurationError::ExceedsMax { .. }) => Some(MAX_BAN_HISTORY),
        Err(_) => None,
    };

    match history {
        Some(seconds) => (seconds, reason_or_default(Some(tail))),
        None => (DAY, reason_or_default(Some(rest))),
    }
}

/// Discord takes ban history in whole days.
pub fn history_days(seconds: u64) -> u8 {
    seconds.div_ceil(DAY).min(7) as u8
}

pub fn reason_or_default(reason: Option<&str>) -> String {
    reason
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .unwrap_or(NO_REASON)
        .to_string()
}

fn audit_reason(ctx: Context<'_>, reason: &str) -> String {
    format!("Issued by {} / {}", ctx.author().name, reason)
}

/// Reply for a failed Discord request: missing permissions get a warning,
/// anything else an issue.
async fn report_failure(ctx: Context<'_>, error: serenity::Error, verb: &str, target: &str) -> Result<(), Error> {
    if is_forbidden(&error) {
        reply_warning(ctx, format!("I'm **missing** permissions to {verb} **{target}**.")).await
    } else {
        tracing::warn!("Failed to {} {}: {}", verb, target, error);
        reply_issue(ctx, format!("I **couldn't {verb} {target}**. Try again later.")).await
    }
}

/// The target as a guild member, when they are in the server.
async fn member_of(ctx: Context<'_>, user: &serenity::User) -> Option<serenity::Member> {
    let guild_id = ctx.guild_id()?;
    guild_id.member(ctx, user.id).await.ok()
}

/// Ask before acting against someone boosting the server.
async fn confirm_booster(ctx: Context<'_>, member: &serenity::Member, action: &str) -> Result<bool, Error> {
    if member.premium_since.is_none() {
        return Ok(true);
    }
    confirm(
        ctx,
        format!(
            "Are you sure you want to **{action} {}**? They are **boosting the server**.",
            member.user.name
        ),
    )
    .await
}

/// Hierarchy and booster checks for the ban family. Users outside the
/// server skip both.
async fn may_ban(ctx: Context<'_>, user: &serenity::User, action: &str) -> Result<bool, Error> {
    let Some(member) = member_of(ctx, user).await else {
        return Ok(true);
    };
    if !check_member(ctx, &member, "ban", MemberCheckOptions::default()).await? {
        return Ok(false);
    }
    confirm_booster(ctx, &member, action).await
}

// ============================================================================
// BANS
// ============================================================================

/// Ban someone from the server
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "BAN_MEMBERS",
    required_bot_permissions = "BAN_MEMBERS",
    member_cooldown = 2
)]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "User to ban"] user: serenity::User,
    #[description = "Message history to delete, then the reason"]
    #[rest]
    arguments: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    if !may_ban(ctx, &user, "ban").await? {
        return Ok(());
    }

    let (history, reason) = split_history(arguments.as_deref());
    if let Err(e) = guild_id
        .ban_with_reason(ctx, user.id, history_days(history), audit_reason(ctx, &reason))
        .await
    {
        return report_failure(ctx, e, "ban", &user.name).await;
    }

    ctx.say("👍").await?;
    Ok(())
}

/// Ban someone and ban them again whenever they rejoin
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "BAN_MEMBERS",
    required_bot_permissions = "BAN_MEMBERS",
    member_cooldown = 2
)]
pub async fn hardban(
    ctx: Context<'_>,
    #[description = "User to hard-ban"] user: serenity::User,
    #[description = "Message history to delete, then the reason"]
    #[rest]
    arguments: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    if !require_antinuke_admin(ctx).await? || !may_ban(ctx, &user, "hard-ban").await? {
        return Ok(());
    }

    let Some(()) = settle(ctx, ctx.data().moderation.hardban(guild_id.get(), user.id.get()).await).await? else {
        return Ok(());
    };

    let (history, reason) = split_history(arguments.as_deref());
    if let Err(e) = guild_id
        .ban_with_reason(ctx, user.id, history_days(history), audit_reason(ctx, &reason))
        .await
    {
        return report_failure(ctx, e, "ban", &user.name).await;
    }

    ctx.say("👍").await?;
    Ok(())
}

/// Ban and immediately unban someone to clear their messages
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "BAN_MEMBERS",
    required_bot_permissions = "BAN_MEMBERS",
    member_cooldown = 2
)]
pub async fn softban(
    ctx: Context<'_>,
    #[description = "Member to soft-ban"] member: serenity::Member,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    if !check_member(ctx, &member, "ban", MemberCheckOptions::default()).await?
        || !confirm_booster(ctx, &member, "softban").await?
    {
        return Ok(());
    }

    let reason = audit_reason(ctx, &reason_or_default(reason.as_deref()));
    let result = async {
        guild_id.ban_with_reason(ctx, member.user.id, 7, &reason).await?;
        guild_id.unban(ctx, member.user.id).await
    }
    .await;
    if let Err(e) = result {
        return report_failure(ctx, e, "soft-ban", &member.user.name).await;
    }

    ctx.say("👍").await?;
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
pub enum UnbanOutcome {
    Unbanned,
    /// Discord had no ban on record but the hard-ban list did.
    HardbanOnly,
    NoBan,
}

pub fn unban_outcome(had_discord_ban: bool, hard_banned: bool) -> UnbanOutcome {
    match (had_discord_ban, hard_banned) {
        (true, _) => UnbanOutcome::Unbanned,
        (false, true) => UnbanOutcome::HardbanOnly,
        (false, false) => UnbanOutcome::NoBan,
    }
}

/// Unban someone from the server
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "BAN_MEMBERS",
    required_bot_permissions = "BAN_MEMBERS",
    member_cooldown = 2
)]
pub async fn unban(
    ctx: Context<'_>,
    #[description = "User to unban"] user: serenity::User,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let moderation = &ctx.data().moderation;

    let hard_banned = moderation.is_hard_banned(guild_id.get(), user.id.get()).await?;
    if hard_banned {
        if !require_antinuke_admin(ctx).await? {
            return Ok(());
        }
        let prompt = format!(
            "Are you sure you want to **unban {}**? They are **hard-banned**.",
            user.name
        );
        if !confirm(ctx, prompt).await? {
            return Ok(());
        }
    }

    let reason = audit_reason(ctx, &reason_or_default(reason.as_deref()));
    tracing::debug!("Unbanning {} ({})", user.id, reason);
    let had_discord_ban = match guild_id.unban(ctx, user.id).await {
        Ok(()) => true,
        Err(e) if http_status(&e) == Some(404) => false,
        Err(e) => return report_failure(ctx, e, "unban", &user.name).await,
    };

    if hard_banned
        && settle(ctx, moderation.lift_hardban(guild_id.get(), user.id.get()).await)
            .await?
            .is_none()
    {
        return Ok(());
    }

    match unban_outcome(had_discord_ban, hard_banned) {
        UnbanOutcome::Unbanned => {
            ctx.say("👍").await?;
        }
        UnbanOutcome::HardbanOnly => {
            reply_checkmark(
                ctx,
                format!("**{}** had no Discord ban, their **hardban** was lifted.", user.name),
            )
            .await?;
        }
        UnbanOutcome::NoBan => {
            reply_not_found(ctx, format!("I couldn't find a ban for **{}**.", user.name)).await?;
        }
    }
    Ok(())
}

/// Kick someone from the server
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "KICK_MEMBERS",
    required_bot_permissions = "KICK_MEMBERS",
    member_cooldown = 2
)]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "Member to kick"] member: serenity::Member,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    if !check_member(ctx, &member, "kick", MemberCheckOptions::default()).await? {
        return Ok(());
    }

    let reason = audit_reason(ctx, &reason_or_default(reason.as_deref()));
    if let Err(e) = member.kick_with_reason(ctx, &reason).await {
        return report_failure(ctx, e, "kick", &member.user.name).await;
    }

    ctx.say("👍").await?;
    Ok(())
}

// ============================================================================
// TIMEOUTS
// ============================================================================

/// Stop someone from talking for a while
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MODERATE_MEMBERS",
    required_bot_permissions = "MODERATE_MEMBERS",
    member_cooldown = 2
)]
pub async fn timeout(
    ctx: Context<'_>,
    #[description = "Member to time out"] mut member: serenity::Member,
    #[description = "How long, e.g. 10m or 1h30m (max 28d)"] duration: String,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    if !check_member(ctx, &member, "timeout", MemberCheckOptions::default()).await? {
        return Ok(());
    }
    let Some(seconds) = settle(ctx, parse_duration(&duration, "m", Some(MAX_TIMEOUT))).await? else {
        return Ok(());
    };

    let until = chrono::Utc::now().timestamp() + seconds as i64;
    let until = serenity::Timestamp::from_unix_timestamp(until).map_err(|e| e.to_string())?;
    tracing::debug!(
        "Timing out {} for {}s: {}",
        member.user.id,
        seconds,
        reason_or_default(reason.as_deref())
    );
    if let Err(e) = member.disable_communication_until_datetime(ctx, until).await {
        return report_failure(ctx, e, "timeout", &member.user.name).await;
    }

    reply_checkmark(
        ctx,
        format!("Timed out **{}** for **{}**.", member.user.name, format_duration(seconds)),
    )
    .await
}

/// Lift someone's timeout
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MODERATE_MEMBERS",
    required_bot_permissions = "MODERATE_MEMBERS",
    member_cooldown = 2
)]
pub async fn untimeout(
    ctx: Context<'_>,
    #[description = "Member to release"] mut member: serenity::Member,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    if member.communication_disabled_until.is_none() {
        return reply_warning(ctx, format!("**{}** isn't timed out.", member.user.name)).await;
    }
    tracing::debug!("Lifting timeout of {}: {}", member.user.id, reason_or_default(reason.as_deref()));
    if let Err(e) = member.enable_communication(ctx).await {
        return report_failure(ctx, e, "untimeout", &member.user.name).await;
    }

    reply_checkmark(ctx, format!("Removed the timeout from **{}**.", member.user.name)).await
}

// ============================================================================
// PURGE
// ============================================================================

pub fn clamp_purge(amount: usize) -> usize {
    amount.clamp(MIN_PURGE, MAX_PURGE)
}

/// Delete a large amount of messages
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    aliases("clear", "c"),
    required_permissions = "MANAGE_MESSAGES",
    required_bot_permissions = "MANAGE_MESSAGES"
)]
pub async fn purge(
    ctx: Context<'_>,
    #[description = "How many messages to search (5-500)"] amount: Option<u32>,
    #[description = "Only delete this member's messages"] member: Option<serenity::Member>,
) -> Result<(), Error> {
    let amount = match (amount, &member) {
        (Some(amount), _) => clamp_purge(amount as usize),
        (None, Some(_)) => 50,
        (None, None) => return reply_usage(ctx).await,
    };

    let channel_id = ctx.channel_id();
    let author_filter = member.as_ref().map(|m| m.user.id);
    let cutoff = chrono::Utc::now().timestamp() - BULK_DELETE_WINDOW;

    if let poise::Context::Prefix(prefix) = ctx {
        if let Err(e) = prefix.msg.delete(ctx).await {
            tracing::warn!("Failed to delete the purge invocation: {}", e);
        }
    } else {
        ctx.defer_ephemeral().await?;
    }

    let mut targets = Vec::new();
    let mut scanned = 0;
    let mut before: Option<serenity::MessageId> = None;
    while scanned < amount {
        let mut request = serenity::GetMessages::new().limit((amount - scanned).min(100) as u8);
        if let Some(before) = before {
            request = request.before(before);
        }
        let batch = match channel_id.messages(ctx, request).await {
            Ok(batch) => batch,
            Err(e) => return report_failure(ctx, e, "purge messages in", &channel_id.mention().to_string()).await,
        };
        if batch.is_empty() {
            break;
        }
        scanned += batch.len();
        before = batch.last().map(|m| m.id);

        targets.extend(
            batch
                .iter()
                .filter(|m| !m.pinned && m.timestamp.unix_timestamp() > cutoff)
                .filter(|m| author_filter.map_or(true, |id| m.author.id == id))
                .map(|m| m.id),
        );
    }

    if targets.is_empty() {
        return reply_not_found(ctx, "I couldn't find any messages (try a bigger search).").await;
    }

    for chunk in targets.chunks(100) {
        let result = match chunk {
            [single] => channel_id.delete_message(ctx, *single).await,
            many => channel_id.delete_messages(ctx, many).await,
        };
        if let Err(e) = result {
            return report_failure(ctx, e, "purge messages in", &channel_id.mention().to_string()).await;
        }
    }
    tracing::info!(channel_id = channel_id.get(), "Purged {} messages", targets.len());

    if let poise::Context::Application(_) = ctx {
        reply_checkmark(ctx, format!("Deleted **{}** messages.", targets.len())).await?;
    }
    Ok(())
}

fn nuke_reason(author: &str, reason: &str) -> String {
    format!("Issued by {author} (Nuke) / {reason}")
}

/// A fresh channel with the same settings, placed where the old one was.
fn clone_channel<'a>(channel: &serenity::GuildChannel, reason: &'a str) -> serenity::CreateChannel<'a> {
    let mut builder = serenity::CreateChannel::new(channel.name.clone())
        .kind(channel.kind)
        .nsfw(channel.nsfw)
        .position(channel.position)
        .permissions(channel.permission_overwrites.clone())
        .audit_log_reason(reason);
    if let Some(topic) = &channel.topic {
        builder = builder.topic(topic.clone());
    }
    if let Some(parent) = channel.parent_id {
        builder = builder.category(parent);
    }
    if let Some(slowmode) = channel.rate_limit_per_user {
        builder = builder.rate_limit_per_user(slowmode);
    }
    builder
}

/// Delete a channel and replace it with a clean copy
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    aliases("boom"),
    required_permissions = "ADMINISTRATOR",
    required_bot_permissions = "ADMINISTRATOR"
)]
pub async fn nuke(
    ctx: Context<'_>,
    #[description = "Channel to nuke, defaults to this one"]
    #[channel_types("Text")]
    channel: Option<serenity::GuildChannel>,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let channel = match channel {
        Some(channel) => channel,
        None => match ctx.channel_id().to_channel(ctx).await?.guild() {
            Some(channel) => channel,
            None => return reply_usage(ctx).await,
        },
    };

    let prompt = format!(
        "Are you sure you want to **nuke {}**? This will **delete the channel**.",
        channel.mention()
    );
    if !confirm(ctx, prompt).await? {
        return Ok(());
    }

    let reason = nuke_reason(&ctx.author().name, &reason_or_default(reason.as_deref()));
    let result = async {
        let mut cloned = guild_id.create_channel(ctx, clone_channel(&channel, &reason)).await?;
        channel.delete(ctx).await?;
        cloned
            .edit(ctx, serenity::EditChannel::new().position(channel.position))
            .await?;
        Ok::<_, serenity::Error>(cloned)
    }
    .await;

    let cloned = match result {
        Ok(cloned) => cloned,
        Err(e) => return report_failure(ctx, e, "nuke", &channel.mention().to_string()).await,
    };
    tracing::info!(guild_id = guild_id.get(), "Nuked channel {} into {}", channel.id, cloned.id);

    cloned.say(ctx, "first").await?;
    Ok(())
}

// ============================================================================
// NICKNAMES
// ============================================================================

/// Change or remove someone's nickname
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    aliases("nick"),
    required_permissions = "MANAGE_NICKNAMES",
    required_bot_permissions = "MANAGE_NICKNAMES"
)]
pub async fn nickname(
    ctx: Context<'_>,
    #[description = "Member to rename"] mut member: serenity::Member,
    #[description = "New nickname, leave empty to remove it"]
    #[rest]
    nickname: Option<String>,
) -> Result<(), Error> {
    let options = MemberCheckOptions {
        can_inflict_self: true,
        ..Default::default()
    };
    if !check_member(ctx, &member, "nickname", options).await? {
        return Ok(());
    }

    let nickname = nickname
        .as_deref()
        .map(crate::core::moderation::truncate_nickname)
        .filter(|nick| !nick.trim().is_empty());
    let reason = audit_reason(ctx, "Nickname");
    let builder = serenity::EditMember::new()
        .nickname(nickname.clone().unwrap_or_default())
        .audit_log_reason(&reason);
    if let Err(e) = member.edit(ctx, builder).await {
        return report_failure(ctx, e, "nickname", &member.user.name).await;
    }

    match nickname {
        Some(nickname) => {
            reply_checkmark(
                ctx,
                format!("Updated **{}**'s nickname to `{nickname}`.", member.user.name),
            )
            .await
        }
        None => reply_checkmark(ctx, format!("Removed nickname from **{}**.", member.user.name)).await,
    }
}

/// Lock someone's nickname. It is put back whenever it changes
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    aliases("fn", "forcenick"),
    required_permissions = "MANAGE_NICKNAMES",
    required_bot_permissions = "MANAGE_NICKNAMES"
)]
pub async fn forcenickname(
    ctx: Context<'_>,
    #[description = "Member to lock"] mut member: serenity::Member,
    #[description = "Nickname to force, leave empty to stop forcing"]
    #[rest]
    nickname: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    if !check_member(ctx, &member, "nickname", MemberCheckOptions::default()).await? {
        return Ok(());
    }

    let stored = ctx
        .data()
        .moderation
        .set_forced_nickname(guild_id.get(), member.user.id.get(), nickname.as_deref())
        .await?;

    let reason = audit_reason(ctx, "Forced nickname");
    let builder = serenity::EditMember::new()
        .nickname(stored.clone().unwrap_or_default())
        .audit_log_reason(&reason);
    if let Err(e) = member.edit(ctx, builder).await {
        if is_forbidden(&e) {
            return reply_warning(
                ctx,
                format!(
                    "I'm **missing permissions** to force the nickname of **{}**.",
                    member.user.name
                ),
            )
            .await;
        }
        tracing::warn!("Failed to force nickname of {}: {}", member.user.id, e);
        return reply_issue(
            ctx,
            format!("I **couldn't force nickname {}**. Try again later.", member.mention()),
        )
        .await;
    }

    match stored {
        Some(nickname) => {
            reply_checkmark(
                ctx,
                format!(
                    "Now **forcing nickname** for **{}** to `{nickname}`.",
                    member.user.name
                ),
            )
            .await
        }
        None => {
            reply_checkmark(
                ctx,
                format!("Removed **forced nickname** from **{}**.", member.user.name),
            )
            .await
        }
    }
}

// ============================================================================
// ROLES
// ============================================================================

/// Give or take roles
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    subcommands("role_add", "role_remove"),
    required_permissions = "MANAGE_ROLES",
    required_bot_permissions = "MANAGE_ROLES"
)]
pub async fn role(ctx: Context<'_>) -> Result<(), Error> {
    reply_usage(ctx).await
}

/// Give a member a role
#[poise::command(prefix_command, slash_command, guild_only, rename = "add")]
pub async fn role_add(
    ctx: Context<'_>,
    #[description = "Member to give the role to"] member: serenity::Member,
    #[description = "Role name, mention or ID"]
    #[rest]
    role: String,
) -> Result<(), Error> {
    let Some(role) = manageable_role(ctx, &role, "give").await? else {
        return Ok(());
    };
    if member.roles.iter().any(|id| id.get() == role.id) {
        return reply_warning(ctx, format!("**{}** already has **{}**.", member.user.name, role.name)).await;
    }

    let role_id = serenity::RoleId::new(role.id);
    if let Err(e) = member.add_role(ctx, role_id).await {
        return report_failure(ctx, e, "give roles to", &member.user.name).await;
    }
    reply_checkmark(ctx, format!("Added {} to **{}**.", role_id.mention(), member.user.name)).await
}

/// Take a role from a member
#[poise::command(prefix_command, slash_command, guild_only, rename = "remove")]
pub async fn role_remove(
    ctx: Context<'_>,
    #[description = "Member to take the role from"] member: serenity::Member,
    #[description = "Role name, mention or ID"]
    #[rest]
    role: String,
) -> Result<(), Error> {
    let Some(role) = manageable_role(ctx, &role, "remove").await? else {
        return Ok(());
    };
    if !member.roles.iter().any(|id| id.get() == role.id) {
        return reply_warning(ctx, format!("**{}** doesn't have **{}**.", member.user.name, role.name)).await;
    }

    let role_id = serenity::RoleId::new(role.id);
    if let Err(e) = member.remove_role(ctx, role_id).await {
        return report_failure(ctx, e, "remove roles from", &member.user.name).await;
    }
    reply_checkmark(ctx, format!("Removed {} from **{}**.", role_id.mention(), member.user.name)).await
}

// ============================================================================
// STICKY ROLES
// ============================================================================

/// Roles that are given back when a member rejoins or loses them
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    subcommands("stickyrole_add", "stickyrole_remove", "stickyrole_list"),
    required_permissions = "MANAGE_ROLES",
    required_bot_permissions = "MANAGE_ROLES"
)]
pub async fn stickyrole(ctx: Context<'_>) -> Result<(), Error> {
    reply_usage(ctx).await
}

/// Make a role sticky for a member
#[poise::command(prefix_command, slash_command, guild_only, rename = "add")]
pub async fn stickyrole_add(
    ctx: Context<'_>,
    #[description = "Member"] member: serenity::Member,
    #[description = "Role name, mention or ID"]
    #[rest]
    role: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let Some(role) = manageable_role(ctx, &role, "sticky").await? else {
        return Ok(());
    };

    let result = ctx
        .data()
        .moderation
        .add_sticky_role(guild_id.get(), member.user.id.get(), role.id)
        .await;
    if settle(ctx, result).await?.is_none() {
        return Ok(());
    }
    remember_roles(ctx.data(), &member);

    let role_id = serenity::RoleId::new(role.id);
    if !member.roles.contains(&role_id) {
        if let Err(e) = member.add_role(ctx, role_id).await {
            tracing::warn!("Failed to give sticky role {} to {}: {}", role.id, member.user.id, e);
        }
    }
    reply_checkmark(
        ctx,
        format!("{} is now **sticky** for **{}**.", role_id.mention(), member.user.name),
    )
    .await
}

/// Stop a role from being sticky for a member
#[poise::command(prefix_command, slash_command, guild_only, rename = "remove")]
pub async fn stickyrole_remove(
    ctx: Context<'_>,
    #[description = "Member"] member: serenity::Member,
    #[description = "Role name, mention or ID"]
    #[rest]
    role: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let snapshot = snapshot(ctx)?;
    let Some(role) = crate::core::moderation::resolve_role(&snapshot.roles, &role).cloned() else {
        return reply_not_found(ctx, format!("I couldn't find the role: `{role}`.")).await;
    };

    let result = ctx
        .data()
        .moderation
        .remove_sticky_role(guild_id.get(), member.user.id.get(), role.id)
        .await;
    if settle(ctx, result).await?.is_none() {
        return Ok(());
    }
    reply_checkmark(
        ctx,
        format!("**{}** is no longer sticky for **{}**.", role.name, member.user.name),
    )
    .await
}

/// List a member's sticky roles
#[poise::command(prefix_command, slash_command, guild_only, rename = "list")]
pub async fn stickyrole_list(
    ctx: Context<'_>,
    #[description = "Member"] member: serenity::Member,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let sticky = ctx
        .data()
        .moderation
        .sticky_roles(guild_id.get(), member.user.id.get())
        .await?;
    if sticky.is_empty() {
        return reply_warning(ctx, format!("**{}** has no sticky roles.", member.user.name)).await;
    }

    let lines = numbered(sticky.iter().map(|id| serenity::RoleId::new(*id).mention()));
    paginate(ctx, &format!("Sticky roles of {}", member.user.name), &lines).await
}

// ============================================================================
// ANTI-NUKE
// ============================================================================

async fn require_owner(ctx: Context<'_>, snapshot: &GuildSnapshot) -> Result<bool, Error> {
    if ctx.author().id.get() == snapshot.owner_id {
        return Ok(true);
    }
    reply_warning(ctx, "Only the **server owner** can manage anti-nuke administrators.").await?;
    Ok(false)
}

/// Anti-nuke settings
#[poise::command(prefix_command, slash_command, guild_only, subcommands("antinuke_admin"))]
pub async fn antinuke(ctx: Context<'_>) -> Result<(), Error> {
    reply_usage(ctx).await
}

/// Manage anti-nuke administrators
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    rename = "admin",
    subcommands("antinuke_admin_add", "antinuke_admin_remove", "antinuke_admin_list")
)]
pub async fn antinuke_admin(ctx: Context<'_>) -> Result<(), Error> {
    reply_usage(ctx).await
}

/// Make someone an anti-nuke administrator
#[poise::command(prefix_command, slash_command, guild_only, rename = "add")]
pub async fn antinuke_admin_add(
    ctx: Context<'_>,
    #[description = "Member"] member: serenity::Member,
) -> Result<(), Error> {
    let snapshot = snapshot(ctx)?;
    if !require_owner(ctx, &snapshot).await? {
        return Ok(());
    }
    if member.user.bot {
        return reply_warning(ctx, "Bots **can't be** anti-nuke administrators.").await;
    }

    let result = ctx
        .data()
        .moderation
        .add_antinuke_admin(snapshot.guild_id, member.user.id.get())
        .await;
    if settle(ctx, result).await?.is_some() {
        reply_checkmark(
            ctx,
            format!("**{}** is now an **anti-nuke administrator**.", member.user.name),
        )
        .await?;
    }
    Ok(())
}

/// Revoke someone's anti-nuke administrator status
#[poise::command(prefix_command, slash_command, guild_only, rename = "remove")]
pub async fn antinuke_admin_remove(
    ctx: Context<'_>,
    #[description = "User"] user: serenity::User,
) -> Result<(), Error> {
    let snapshot = snapshot(ctx)?;
    if !require_owner(ctx, &snapshot).await? {
        return Ok(());
    }

    let result = ctx
        .data()
        .moderation
        .remove_antinuke_admin(snapshot.guild_id, user.id.get())
        .await;
    if settle(ctx, result).await?.is_some() {
        reply_checkmark(
            ctx,
            format!("**{}** is no longer an **anti-nuke administrator**.", user.name),
        )
        .await?;
    }
    Ok(())
}

/// List anti-nuke administrators
#[poise::command(prefix_command, slash_command, guild_only, rename = "list")]
pub async fn antinuke_admin_list(ctx: Context<'_>) -> Result<(), Error> {
    let snapshot = snapshot(ctx)?;
    let admins = ctx.data().moderation.antinuke_admins(snapshot.guild_id).await?;
    if admins.is_empty() {
        return reply_warning(ctx, "There are **no** anti-nuke administrators.").await;
    }

    let lines = numbered(admins.iter().map(|id| format!("<@{id}> (`{id}`)")));
    paginate(ctx, "Anti-nuke administrators", &lines).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_history_reads_a_leading_duration() {
        assert_eq!(split_history(Some("1d spamming links")), (DAY, "spamming links".to_string()));
        assert_eq!(split_history(Some("30")), (30, NO_REASON.to_string()));
        assert_eq!(split_history(Some("being rude")), (DAY, "being rude".to_string()));
        assert_eq!(split_history(None), (DAY, NO_REASON.to_string()));
    }

    #[test]
    fn split_history_clamps_long_histories() {
        assert_eq!(split_history(Some("2w raid")).0, MAX_BAN_HISTORY);
    }

    #[test]
    fn history_is_rounded_up_to_days() {
        assert_eq!(history_days(0), 0);
        assert_eq!(history_days(60), 1);
        assert_eq!(history_days(DAY + 1), 2);
        assert_eq!(history_days(MAX_BAN_HISTORY * 2), 7);
    }

    #[test]
    fn unban_lifts_a_hardban_without_a_discord_ban() {
        assert_eq!(unban_outcome(false, true), UnbanOutcome::HardbanOnly);
        assert_eq!(unban_outcome(true, true), UnbanOutcome::Unbanned);
        assert_eq!(unban_outcome(true, false), UnbanOutcome::Unbanned);
        assert_eq!(unban_outcome(false, false), UnbanOutcome::NoBan);
    }

    #[test]
    fn nuke_reason_names_the_author() {
        assert_eq!(nuke_reason("ward", NO_REASON), "Issued by ward (Nuke) / No reason provided.");
    }

    #[test]
    fn purge_amount_is_clamped() {
        assert_eq!(clamp_purge(1), MIN_PURGE);
        assert_eq!(clamp_purge(30), 30);
        assert_eq!(clamp_purge(10_000), MAX_PURGE);
    }
}
