// Gateway event handlers, one file per concern.
//
// Handlers log their own failures. An error here must never stop the other
// handlers from seeing the event.

pub mod guilds;
pub mod members;
pub mod messages;
pub mod reactions;
pub mod voice;

use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!("Logged in as {}", data_about_bot.user.name);
        }
        serenity::FullEvent::GuildCreate { guild, is_new } => {
            if let Err(e) = guilds::handle_guild_create(ctx, data, guild, is_new.unwrap_or(false)).await {
                tracing::error!("Error handling guild create: {}", e);
            }
        }
        serenity::FullEvent::GuildRoleDelete {
            guild_id,
            removed_role_id,
            ..
        } => {
            guilds::handle_role_delete(data, *guild_id, *removed_role_id);
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if let Err(e) = members::handle_member_join(ctx, data, new_member).await {
                tracing::error!("Error handling member join: {}", e);
            }
        }
        serenity::FullEvent::GuildMemberUpdate {
            old_if_available,
            event,
            ..
        } => {
            if let Err(e) =
                members::handle_member_update(ctx, data, old_if_available.as_ref(), event).await
            {
                tracing::error!("Error handling member update: {}", e);
            }
        }
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = messages::handle_message(ctx, data, new_message).await {
                tracing::error!("Error handling message automation: {}", e);
            }
        }
        serenity::FullEvent::ReactionAdd { add_reaction } => {
            if let Err(e) = reactions::handle_reaction(ctx, data, add_reaction, true).await {
                tracing::error!("Error handling reaction add: {}", e);
            }
        }
        serenity::FullEvent::ReactionRemove { removed_reaction } => {
            if let Err(e) = reactions::handle_reaction(ctx, data, removed_reaction, false).await {
                tracing::error!("Error handling reaction remove: {}", e);
            }
        }
        serenity::FullEvent::VoiceStateUpdate { old, new } => {
            if let Err(e) = voice::handle_voice_state_update(ctx, data, old.as_ref(), new).await {
                tracing::error!("Error handling voice state update: {}", e);
            }
        }
        serenity::FullEvent::InteractionCreate { interaction } => {
            if let Some(component) = interaction.as_message_component() {
                if let Err(e) = voice::handle_interface_button(ctx, data, component).await {
                    tracing::error!("Error handling interface button: {}", e);
                }
            }
        }
        _ => {}
    }

    Ok(())
}
