// Reply embeds shared by every command.
//
// Replies read "<emoji> <@author>: <message>" and are colour-coded by outcome.

use crate::discord::{Context, Error};
use poise::serenity_prelude::{self as serenity, Mentionable};

pub const MAIN: u32 = 0x544B61;
pub const GREEN: u32 = 0x9AD170;
pub const ORANGE: u32 = 0xFDA926;
pub const RED: u32 = 0xFF6464;
pub const BLUE: u32 = 0x53C6EF;

pub const CHECKMARK: &str = "<:checkmark:1446339877280026736>";
pub const WARNING: &str = "<:warning:1444853246442078353>";
pub const ISSUE: &str = "<:issue:1444853237512405174>";
pub const SEARCH: &str = ":mag:";

/// "syntax | example" for every command that takes arguments.
const USAGES: &[(&str, &str)] = &[
    ("prefix", "(subcommand) (arguments) | set !"),
    ("prefix set", "(prefix) | !"),
    ("alias", "(subcommand) (arguments) | add ban deport"),
    ("alias add", "(command) (alias) | ban deport"),
    ("alias remove", "(alias) | deport"),
    ("ban", "(user) (history) (reason) | @ward 1d spamming"),
    ("hardban", "(user) (reason) | @ward raiding"),
    ("softban", "(member) (reason) | @ward spamming"),
    ("unban", "(user) (reason) | 1444846443104964660 appealed"),
    ("kick", "(member) (reason) | @ward being rude"),
    ("timeout", "(member) (duration) (reason) | @ward 10m calm down"),
    ("untimeout", "(member) (reason) | @ward"),
    ("purge", "(amount) (member) | 50 @ward"),
    ("nuke", "[channel] [reason] | #general raid cleanup"),
    ("nickname", "(member) (nickname) | @ward ward"),
    ("forcenickname", "(member) (nickname) | @ward ward"),
    ("role add", "(member) (role) | @ward Moderator"),
    ("role remove", "(member) (role) | @ward Moderator"),
    ("stickyrole", "(subcommand) (arguments) | add @ward Muted"),
    ("stickyrole add", "(member) (role) | @ward Muted"),
    ("stickyrole remove", "(member) (role) | @ward Muted"),
    ("stickyrole list", "(member) | @ward"),
    ("antinuke", "(subcommand) (arguments) | admin add @ward"),
    ("antinuke admin add", "(member) | @ward"),
    ("antinuke admin remove", "(member) | @ward"),
    ("voicemaster", "(subcommand) (arguments) | lock"),
    ("voicemaster rename", "(name) | Watching a Movie"),
    ("autoresponder", "(subcommand) (arguments) | add hello hey there!"),
    ("autoresponder add", "(trigger) (response) | hello hey there!"),
    ("autoresponder remove", "(trigger) | hello"),
    ("reactionrole", "(subcommand) (arguments) | add (message link) 🍎 Apples"),
    ("reactionrole add", "(message) (emoji) (role) | 1444846443104964660 🍎 Apples"),
    ("reactionrole remove", "(message) (emoji) | 1444846443104964660 🍎"),
    ("filter", "(subcommand) (arguments) | add darn"),
    ("filter add", "(keyword) | darn"),
    ("filter remove", "(keyword) | darn"),
    ("bite", "(member) | wardic"),
    ("hug", "(member) | wardic"),
    ("kiss", "(member) | wardic"),
    ("inrole", "(role) | Moderator"),
    ("steal", "(emoji or sticker) | :wave:"),
    ("ownercmds", "(subcommand) (arguments) | status add If I were a bird"),
    ("ownercmds status add", "(status) | If I were a bird"),
    ("ownercmds status remove", "(status) | If I were a bird"),
    ("ownercmds status set", "(status) | If I were a bird"),
    ("ownercmds status randomize", "(toggle) | true"),
    ("ownercmds status loop", "(toggle) | true"),
    ("ownercmds whitelist", "(mode) (guild) | add 1444846443104964660"),
    ("ownercmds badge add", "(user) (badge name) | @ward Owner"),
    ("ownercmds badge remove", "(user) (badge name) | @ward Owner"),
];

fn tagged(emoji: &str, author: Option<&serenity::User>, description: &str) -> String {
    match author {
        Some(author) => format!("{emoji} {}: {description}", author.mention()),
        None => format!("{emoji} {description}"),
    }
}

pub fn checkmark(author: Option<&serenity::User>, description: impl AsRef<str>) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .description(tagged(CHECKMARK, author, description.as_ref()))
        .color(GREEN)
}

pub fn warning(author: Option<&serenity::User>, description: impl AsRef<str>) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .description(tagged(WARNING, author, description.as_ref()))
        .color(ORANGE)
}

pub fn issue(author: Option<&serenity::User>, description: impl AsRef<str>) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .description(tagged(ISSUE, author, description.as_ref()))
        .color(RED)
}

pub fn plain(
    author: Option<&serenity::User>,
    emoji: &str,
    description: impl AsRef<str>,
    color: u32,
) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .description(tagged(emoji, author, description.as_ref()))
        .color(color)
}

/// Syntax and example for a command, split out of the usage table.
pub fn usage(qualified_name: &str) -> (&'static str, &'static str) {
    USAGES
        .iter()
        .find(|(name, _)| *name == qualified_name)
        .map(|(_, usage)| usage.split_once(" | ").unwrap_or((usage, "")))
        .unwrap_or(("(none)", ""))
}

/// The help card shown when a command is invoked without (valid) arguments.
pub fn command_usage<U, E>(
    command: &poise::Command<U, E>,
    author: &serenity::User,
    prefix: &str,
) -> serenity::CreateEmbed {
    let name = &command.qualified_name;
    let (syntax, example) = usage(name);
    let help = command.description.as_deref().unwrap_or("No description.");

    serenity::CreateEmbed::new()
        .title(format!("Command: {name}"))
        .color(MAIN)
        .author(serenity::CreateEmbedAuthor::new(&author.name).icon_url(author.face()))
        .description(format!(
            "{help}\n```Syntax: {prefix}{name} {syntax}\nExample: {prefix}{name} {example}```"
        ))
}

// ============================================================================
// REPLY SHORTCUTS
// ============================================================================

pub async fn reply_checkmark(ctx: Context<'_>, description: impl AsRef<str>) -> Result<(), Error> {
    let embed = checkmark(Some(ctx.author()), description);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

pub async fn reply_warning(ctx: Context<'_>, description: impl AsRef<str>) -> Result<(), Error> {
    let embed = warning(Some(ctx.author()), description);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

pub async fn reply_issue(ctx: Context<'_>, description: impl AsRef<str>) -> Result<(), Error> {
    let embed = issue(Some(ctx.author()), description);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

pub async fn reply_not_found(ctx: Context<'_>, description: impl AsRef<str>) -> Result<(), Error> {
    let embed = plain(Some(ctx.author()), SEARCH, description, MAIN);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show the usage card for the invoked command.
pub async fn reply_usage(ctx: Context<'_>) -> Result<(), Error> {
    let embed = command_usage(ctx.command(), ctx.author(), ctx.prefix());
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_splits_syntax_and_example() {
        assert_eq!(usage("alias add"), ("(command) (alias)", "ban deport"));
        assert_eq!(usage("roles"), ("(none)", ""));
    }

    #[test]
    fn descriptions_without_author_skip_the_mention() {
        assert_eq!(tagged(WARNING, None, "hi"), format!("{WARNING} hi"));
    }

    #[test]
    fn usage_table_has_no_duplicates() {
        let mut names: Vec<&str> = USAGES.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), USAGES.len());
    }
}
