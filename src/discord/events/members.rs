// Member join and update handlers: hard bans, forced nicknames and sticky roles.

use crate::core::moderation::{nickname_to_enforce, removed_sticky_roles, restorable_roles};
use crate::discord::lookup::{member_role_ids, GuildSnapshot};
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

/// Give roles back one at a time so one failure doesn't block the rest.
async fn add_roles(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    role_ids: &[u64],
    reason: &str,
) -> usize {
    let mut added = 0;
    for role_id in role_ids {
        match http
            .add_member_role(guild_id, user_id, serenity::RoleId::new(*role_id), Some(reason))
            .await
        {
            Ok(()) => added += 1,
            Err(e) => tracing::warn!("Failed to add role {} to {}: {}", role_id, user_id, e),
        }
    }
    added
}

async fn apply_nickname(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    nickname: &str,
) {
    let builder = serenity::EditMember::new()
        .nickname(nickname)
        .audit_log_reason("Re-applying forced nickname");
    match guild_id.edit_member(&ctx.http, user_id, builder).await {
        Ok(_) => tracing::info!(guild_id = guild_id.get(), "Applied forced nickname to {}", user_id),
        Err(e) => tracing::warn!("Failed to apply forced nickname to {}: {}", user_id, e),
    }
}

pub async fn handle_member_join(
    ctx: &serenity::Context,
    data: &Data,
    member: &serenity::Member,
) -> Result<(), Error> {
    let guild_id = member.guild_id;
    let user_id = member.user.id;

    if data.moderation.is_hard_banned(guild_id.get(), user_id.get()).await? {
        match guild_id
            .ban_with_reason(&ctx.http, user_id, 1, "Re-applying hardban")
            .await
        {
            Ok(()) => tracing::info!(guild_id = guild_id.get(), "Re-banned hard-banned user {}", user_id),
            Err(e) => tracing::warn!("Failed to re-ban hard-banned user {}: {}", user_id, e),
        }
        return Ok(());
    }
    remember_roles(data, member);

    let doc = data
        .documents
        .get_member_data(guild_id.get(), user_id.get())
        .await?;

    if let Some(forced) = doc.forced_nickname() {
        apply_nickname(ctx, guild_id, user_id, forced).await;
    }

    if doc.sticky_roles.is_empty() {
        return Ok(());
    }
    let Some(snapshot) = GuildSnapshot::capture(&ctx.cache, guild_id) else {
        return Ok(());
    };

    let restore = restorable_roles(&doc.sticky_roles, &snapshot.roles, snapshot.bot);
    let restored = add_roles(&ctx.http, guild_id, user_id, &restore, "Re-applying sticky roles").await;
    if restored > 0 {
        tracing::info!(guild_id = guild_id.get(), "Restored {} sticky role(s) to {}", restored, user_id);
    }
    Ok(())
}

pub async fn handle_member_update(
    ctx: &serenity::Context,
    data: &Data,
    old: Option<&serenity::Member>,
    event: &serenity::GuildMemberUpdateEvent,
) -> Result<(), Error> {
    let guild_id = event.guild_id;
    let user_id = event.user.id;

    let forced = data
        .moderation
        .forced_nickname(guild_id.get(), user_id.get())
        .await?;
    if let Some(nickname) = nickname_to_enforce(forced.as_deref(), event.nick.as_deref()) {
        apply_nickname(ctx, guild_id, user_id, nickname).await;
    }

    let after: Vec<u64> = event
        .roles
        .iter()
        .map(|id| id.get())
        .filter(|id| *id != guild_id.get())
        .collect();
    let Some(before) = data.moderation.roles_before_update(
        guild_id.get(),
        user_id.get(),
        old.map(member_role_ids),
        after.clone(),
    ) else {
        return Ok(());
    };

    let sticky = data.moderation.sticky_roles(guild_id.get(), user_id.get()).await?;
    let removed = removed_sticky_roles(&before, &after, &sticky);
    if removed.is_empty() {
        return Ok(());
    }
    let Some(snapshot) = GuildSnapshot::capture(&ctx.cache, guild_id) else {
        return Ok(());
    };

    let readd = restorable_roles(&removed, &snapshot.roles, snapshot.bot);
    let added = add_roles(
        &ctx.http,
        guild_id,
        user_id,
        &readd,
        "Sticky role - automatically re-added",
    )
    .await;
    if added > 0 {
        tracing::info!(guild_id = guild_id.get(), "Re-added {} sticky role(s) to {}", added, user_id);
    }
    Ok(())
}

/// Seed the role snapshot for a member the first time a command touches them.
pub fn remember_roles(data: &Data, member: &serenity::Member) {
    let cache = &data.documents.cache().roles;
    let key = (member.guild_id.get(), member.user.id.get());
    if !cache.exists(&key) {
        cache.set(key, member_role_ids(member));
    }
}
