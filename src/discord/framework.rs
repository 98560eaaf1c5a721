// Framework hooks: prefix resolution, the whitelist gate, invocation logging
// and the error handler that turns framework errors into replies.

use crate::core::guild_settings::rewrite_alias;
use crate::discord::embeds::{self, BLUE, SEARCH};
use crate::discord::{Context, Data, Error};
use poise::serenity_prelude as serenity;

pub fn options(commands: Vec<poise::Command<Data, Error>>) -> poise::FrameworkOptions<Data, Error> {
    poise::FrameworkOptions {
        commands,
        prefix_options: poise::PrefixFrameworkOptions {
            dynamic_prefix: Some(|ctx| Box::pin(dynamic_prefix(ctx))),
            mention_as_prefix: true,
            case_insensitive_commands: true,
            ..Default::default()
        },
        command_check: Some(|ctx| Box::pin(command_check(ctx))),
        pre_command: |ctx| Box::pin(pre_command(ctx)),
        on_error: |error| Box::pin(on_error(error)),
        event_handler: |ctx, event, framework, data| {
            Box::pin(crate::discord::events::event_handler(ctx, event, framework, data))
        },
        ..Default::default()
    }
}

async fn dynamic_prefix(ctx: poise::PartialContext<'_, Data, Error>) -> Result<Option<String>, Error> {
    let guild_id = ctx.guild_id.map(|id| id.get());
    Ok(Some(ctx.data.settings.resolve_prefix(guild_id).await))
}

/// Commands only run in whitelisted guilds. Owners bypass the gate.
async fn command_check(ctx: Context<'_>) -> Result<bool, Error> {
    let guild_id = ctx.guild_id().map(|id| id.get());
    Ok(ctx
        .data()
        .access
        .may_run_commands(guild_id, ctx.author().id.get())
        .await?)
}

async fn pre_command(ctx: Context<'_>) {
    tracing::info!(
        command = %ctx.command().qualified_name,
        user_id = ctx.author().id.get(),
        guild_id = ctx.guild_id().map(|id| id.get()),
        "Running command"
    );
}

fn has_command(commands: &[poise::Command<Data, Error>], name: &str) -> bool {
    commands
        .iter()
        .any(|command| command.name == name || command.aliases.iter().any(|alias| alias == name))
}

/// Re-dispatch a message whose first word is a guild alias.
async fn dispatch_alias(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    prefix: &str,
    framework: poise::FrameworkContext<'_, Data, Error>,
    invocation_data: &tokio::sync::Mutex<Box<dyn std::any::Any + Send + Sync>>,
    trigger: poise::MessageDispatchTrigger,
) -> Result<(), Error> {
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };

    let aliases = framework.user_data.settings.aliases(guild_id.get()).await?;
    let Some(content) = rewrite_alias(&msg.content, prefix, &aliases) else {
        return Ok(());
    };

    let target = content[prefix.len()..]
        .split_whitespace()
        .next()
        .unwrap_or_default();
    if !has_command(&framework.options.commands, target) {
        return Ok(());
    }

    tracing::debug!(guild_id = guild_id.get(), "Dispatching alias as `{}`", content);
    let mut rewritten = msg.clone();
    rewritten.content = content;

    let mut parent_commands = Vec::new();
    if let Err(error) = poise::dispatch_message(
        framework,
        ctx,
        &rewritten,
        trigger,
        invocation_data,
        &mut parent_commands,
    )
    .await
    {
        (framework.options.on_error)(error).await;
    }
    Ok(())
}

async fn send_embed(ctx: Context<'_>, embed: serenity::CreateEmbed) {
    if let Err(e) = ctx.send(poise::CreateReply::default().embed(embed)).await {
        tracing::warn!("Failed to send error reply: {}", e);
    }
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            tracing::error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(
                command = %ctx.command().qualified_name,
                "Command failed: {}",
                error
            );
            let embed = embeds::issue(
                Some(ctx.author()),
                format!(
                    "I **couldn't** run `{}`. Try again later.",
                    ctx.command().qualified_name
                ),
            );
            send_embed(ctx, embed).await;
        }
        poise::FrameworkError::ArgumentParse { error, input, ctx, .. } => {
            let missing_user = error.downcast_ref::<serenity::MemberParseError>().is_some()
                || error.downcast_ref::<serenity::UserParseError>().is_some();

            let embed = match input {
                Some(input) if missing_user => embeds::plain(
                    Some(ctx.author()),
                    SEARCH,
                    format!("I couldn't find the user: `{input}`. Use their **ID instead**."),
                    embeds::MAIN,
                ),
                _ => embeds::command_usage(ctx.command(), ctx.author(), ctx.prefix()),
            };
            send_embed(ctx, embed).await;
        }
        poise::FrameworkError::CooldownHit {
            remaining_cooldown,
            ctx,
            ..
        } => {
            let embed = embeds::plain(
                Some(ctx.author()),
                ":hourglass:",
                format!(
                    "**{}** is on cooldown. Try again in **{:.1}s**.",
                    ctx.command().qualified_name,
                    remaining_cooldown.as_secs_f32()
                ),
                BLUE,
            );
            send_embed(ctx, embed).await;
        }
        poise::FrameworkError::MissingUserPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            let permissions = missing_permissions
                .map(|p| p.get_permission_names().join(", "))
                .unwrap_or_else(|| "the required permissions".to_string());
            let embed = embeds::warning(
                Some(ctx.author()),
                format!("You're **missing** permission(s): `{permissions}`"),
            );
            send_embed(ctx, embed).await;
        }
        poise::FrameworkError::MissingBotPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            let embed = embeds::warning(
                Some(ctx.author()),
                format!(
                    "I'm **missing** permission(s): `{}`",
                    missing_permissions.get_permission_names().join(", ")
                ),
            );
            send_embed(ctx, embed).await;
        }
        poise::FrameworkError::GuildOnly { ctx, .. } => {
            send_embed(
                ctx,
                embeds::warning(Some(ctx.author()), "This command can only be used **in a server**."),
            )
            .await;
        }
        poise::FrameworkError::CommandCheckFailed { error, ctx, .. } => {
            if let Some(error) = error {
                tracing::error!(
                    command = %ctx.command().qualified_name,
                    "Command check failed: {}",
                    error
                );
            }
        }
        poise::FrameworkError::NotAnOwner { .. } => {}
        poise::FrameworkError::UnknownCommand {
            ctx,
            msg,
            prefix,
            framework,
            invocation_data,
            trigger,
            ..
        } => {
            if let Err(e) = dispatch_alias(ctx, msg, prefix, framework, invocation_data, trigger).await {
                tracing::warn!("Alias dispatch failed: {}", e);
            }
        }
        poise::FrameworkError::EventHandler { error, event, .. } => {
            tracing::error!("Event handler failed on {}: {}", event.snake_case_name(), error);
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[poise::command(prefix_command, aliases("b"))]
    async fn ban(_ctx: Context<'_>) -> Result<(), Error> {
        Ok(())
    }

    #[test]
    fn has_command_checks_names_and_aliases() {
        let commands = vec![ban()];
        assert!(has_command(&commands, "ban"));
        assert!(has_command(&commands, "b"));
        assert!(!has_command(&commands, "kick"));
    }
}
