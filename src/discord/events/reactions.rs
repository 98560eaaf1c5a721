// Reaction roles: adding a configured reaction grants the role, removing it
// takes the role away again.

use crate::discord::lookup::reaction_key;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

pub async fn handle_reaction(
    ctx: &serenity::Context,
    data: &Data,
    reaction: &serenity::Reaction,
    added: bool,
) -> Result<(), Error> {
    let (Some(guild_id), Some(user_id)) = (reaction.guild_id, reaction.user_id) else {
        return Ok(());
    };
    if user_id == ctx.cache.current_user().id {
        return Ok(());
    }
    let Some(emoji) = reaction_key(&reaction.emoji) else {
        return Ok(());
    };

    let Some(role_id) = data
        .automation
        .role_for_reaction(guild_id.get(), reaction.message_id.get(), &emoji)
        .await?
    else {
        return Ok(());
    };
    let role_id = serenity::RoleId::new(role_id);

    if added {
        ctx.http
            .add_member_role(guild_id, user_id, role_id, Some("Reaction role"))
            .await?;
    } else {
        ctx.http
            .remove_member_role(guild_id, user_id, role_id, Some("Reaction role"))
            .await?;
    }
    tracing::debug!(
        guild_id = guild_id.get(),
        added,
        "Reaction role {} for {}",
        role_id,
        user_id
    );
    Ok(())
}
