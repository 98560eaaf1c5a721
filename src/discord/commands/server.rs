// Server configuration commands: prefix, aliases and role listings.

use crate::core::moderation::resolve_role;
use crate::discord::commands::guards::snapshot;
use crate::discord::embeds::{self, reply_checkmark, reply_not_found, reply_usage, reply_warning};
use crate::discord::notice::settle;
use crate::discord::views::{numbered, paginate};
use crate::discord::{Context, Error};
use poise::serenity_prelude::{self as serenity, Mentionable};

// ============================================================================
// PREFIX
// ============================================================================

/// View or change the server prefix
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    subcommands("prefix_set", "prefix_reset")
)]
pub async fn prefix(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let prefix = ctx.data().settings.current_prefix(guild_id.get()).await?;

    let embed = embeds::plain(
        Some(ctx.author()),
        ":information_source:",
        format!("The current server prefix is: `{prefix}`."),
        embeds::MAIN,
    );
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Set the server prefix
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    rename = "set",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn prefix_set(
    ctx: Context<'_>,
    #[description = "New prefix (1-6 characters)"] prefix: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let result = ctx.data().settings.set_prefix(guild_id.get(), &prefix).await;
    if settle(ctx, result).await?.is_some() {
        reply_checkmark(ctx, format!("Set the **server prefix** to `{prefix}`.")).await?;
    }
    Ok(())
}

/// Reset the server prefix to the default one
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    rename = "reset",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn prefix_reset(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let result = ctx.data().settings.reset_prefix(guild_id.get()).await;
    if let Some(prefix) = settle(ctx, result).await? {
        reply_checkmark(ctx, format!("Reset the **server prefix** to `{prefix}`.")).await?;
    }
    Ok(())
}

// ============================================================================
// ALIASES
// ============================================================================

/// Custom names for commands in this server
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    subcommands("alias_add", "alias_remove", "alias_list")
)]
pub async fn alias(ctx: Context<'_>) -> Result<(), Error> {
    reply_usage(ctx).await
}

/// Add an alias for a command
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    rename = "add",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn alias_add(
    ctx: Context<'_>,
    #[description = "Command to alias"] command: String,
    #[description = "New name for it"] alias: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let commands = &ctx.framework().options().commands;
    let exists = |name: &str| {
        commands
            .iter()
            .any(|c| c.name == name || c.aliases.iter().any(|a| a == name))
    };

    let result = ctx
        .data()
        .settings
        .add_alias(guild_id.get(), &command, &alias, exists)
        .await;
    if let Some((alias, command)) = settle(ctx, result).await? {
        reply_checkmark(ctx, format!("Added alias `{alias}` to `{command}`.")).await?;
    }
    Ok(())
}

/// Remove an alias
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    rename = "remove",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn alias_remove(
    ctx: Context<'_>,
    #[description = "Alias to remove"] alias: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let result = ctx.data().settings.remove_alias(guild_id.get(), &alias).await;
    if settle(ctx, result).await?.is_some() {
        reply_checkmark(ctx, format!("Removed the alias `{}`.", alias.to_lowercase())).await?;
    }
    Ok(())
}

/// List the aliases of this server
#[poise::command(prefix_command, slash_command, guild_only, rename = "list")]
pub async fn alias_list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let aliases = ctx.data().settings.aliases(guild_id.get()).await?;
    if aliases.is_empty() {
        return reply_warning(ctx, "This server has **no** aliases.").await;
    }

    let lines = numbered(
        aliases
            .iter()
            .map(|(alias, command)| format!("`{alias}` → `{command}`")),
    );
    paginate(ctx, "Command aliases", &lines).await
}

// ============================================================================
// ROLES
// ============================================================================

/// View all of the server roles
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn roles(ctx: Context<'_>) -> Result<(), Error> {
    let snapshot = snapshot(ctx)?;
    let guild_name = ctx.guild().map(|g| g.name.clone()).unwrap_or_default();

    let lines = numbered(
        snapshot
            .roles_by_position()
            .into_iter()
            .map(|role| serenity::RoleId::new(role.id).mention()),
    );
    if lines.is_empty() {
        return reply_warning(ctx, "This server has **no** roles.").await;
    }
    paginate(ctx, &format!("Roles in {guild_name}"), &lines).await
}

fn short_name(name: &str) -> String {
    if name.chars().count() > 12 {
        format!("{}...", name.chars().take(12).collect::<String>())
    } else {
        name.to_string()
    }
}

/// View what members are in a role
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn inrole(
    ctx: Context<'_>,
    #[description = "Role name, mention or ID"]
    #[rest]
    role: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let snapshot = snapshot(ctx)?;

    let role = match role.as_deref() {
        Some(argument) => match resolve_role(&snapshot.roles, argument) {
            Some(role) => role.clone(),
            None => return reply_not_found(ctx, format!("I couldn't find the role: `{argument}`.")).await,
        },
        None => {
            let member = ctx.author_member().await.ok_or("Couldn't load the invoking member")?;
            let top = snapshot.member_rank(&member).top_role_position;
            match snapshot
                .roles_by_position()
                .into_iter()
                .find(|r| member.roles.iter().any(|id| id.get() == r.id) && r.position == top)
                .or_else(|| snapshot.roles_by_position().into_iter().next())
            {
                Some(role) => role.clone(),
                None => return reply_warning(ctx, "This server has **no** roles.").await,
            }
        }
    };

    let role_id = serenity::RoleId::new(role.id);
    let members: Vec<String> = ctx
        .cache()
        .guild(guild_id)
        .map(|guild| {
            guild
                .members
                .values()
                .filter(|m| m.roles.contains(&role_id))
                .map(|m| format!("**{}**", m.user.name))
                .collect()
        })
        .unwrap_or_default();
    if members.is_empty() {
        return reply_warning(ctx, format!("**{}** has no members.", role.name)).await;
    }

    paginate(
        ctx,
        &format!("Members in {}", short_name(&role.name)),
        &numbered(members),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_role_names_are_shortened() {
        assert_eq!(short_name("Mods"), "Mods");
        assert_eq!(short_name("Very Long Role Name"), "Very Long Ro...");
    }
}
