// Checks shared by the moderation-style commands: hierarchy, role lookup
// and anti-nuke administrators.

use crate::core::moderation::{
    check_member_hierarchy, check_role_hierarchy, resolve_role, MemberCheckOptions, MemberRank,
    RoleCheckOptions, RoleInfo,
};
use crate::discord::embeds::{reply_not_found, reply_warning};
use crate::discord::lookup::GuildSnapshot;
use crate::discord::notice::settle;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

pub const NOT_ANTINUKE_ADMIN: &str =
    "You need to be an **anti-nuke administrator** to use this command.";

pub fn snapshot(ctx: Context<'_>) -> Result<GuildSnapshot, Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    Ok(GuildSnapshot::capture(ctx.cache(), guild_id).ok_or("Server isn't cached yet")?)
}

pub async fn author_rank(ctx: Context<'_>, snapshot: &GuildSnapshot) -> Result<MemberRank, Error> {
    let member = ctx.author_member().await.ok_or("Couldn't load the invoking member")?;
    Ok(snapshot.member_rank(&member))
}

/// Run the member hierarchy check, replying with the reason when it fails.
pub async fn check_member(
    ctx: Context<'_>,
    target: &serenity::Member,
    action: &str,
    options: MemberCheckOptions,
) -> Result<bool, Error> {
    let snapshot = snapshot(ctx)?;
    let actor = author_rank(ctx, &snapshot).await?;
    let result = check_member_hierarchy(
        snapshot.ranks(),
        actor,
        snapshot.member_rank(target),
        action,
        options,
    );
    Ok(settle(ctx, result).await?.is_some())
}

/// Resolve a role argument and make sure both the invoker and the bot can
/// manage it. Replies and returns `None` otherwise.
pub async fn manageable_role(
    ctx: Context<'_>,
    argument: &str,
    action: &str,
) -> Result<Option<RoleInfo>, Error> {
    let snapshot = snapshot(ctx)?;
    let Some(role) = resolve_role(&snapshot.roles, argument).cloned() else {
        reply_not_found(ctx, format!("I couldn't find the role: `{argument}`.")).await?;
        return Ok(None);
    };
    if role.managed {
        reply_warning(ctx, format!("**{}** is managed by an integration.", role.name)).await?;
        return Ok(None);
    }

    let actor = author_rank(ctx, &snapshot).await?;
    let actor = if actor.id == snapshot.owner_id {
        MemberRank::new(actor.id, u16::MAX)
    } else {
        actor
    };
    let result = check_role_hierarchy(actor, snapshot.bot, &role, action, RoleCheckOptions::default());
    Ok(settle(ctx, result).await?.map(|()| role))
}

/// Gate for hard-ban management. Replies when the invoker isn't allowed.
pub async fn require_antinuke_admin(ctx: Context<'_>) -> Result<bool, Error> {
    let snapshot = snapshot(ctx)?;
    let allowed = ctx
        .data()
        .moderation
        .is_antinuke_admin(snapshot.guild_id, ctx.author().id.get(), snapshot.owner_id)
        .await?;
    if !allowed {
        reply_warning(ctx, NOT_ANTINUKE_ADMIN).await?;
    }
    Ok(allowed)
}

/// HTTP status of a failed Discord request, if it got that far.
pub fn http_status(error: &serenity::Error) -> Option<u16> {
    match error {
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response)) => {
            Some(response.status_code.as_u16())
        }
        _ => None,
    }
}

pub fn is_forbidden(error: &serenity::Error) -> bool {
    http_status(error) == Some(403)
}
