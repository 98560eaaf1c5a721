// Profile lookups: avatars, banners, whois and emoji/sticker stealing.

use crate::core::badges::badge_line;
use crate::discord::embeds::{self, reply_not_found, reply_usage};
use crate::discord::lookup::parse_custom_emoji;
use crate::discord::{Context, Error};
use poise::serenity_prelude::{self as serenity, Mentionable};
use serde::Deserialize;

const MAX_LISTED_ROLES: usize = 13;

/// An image card with the author line and a link button to the image.
async fn send_image(ctx: Context<'_>, title: String, url: String, label: &str) -> Result<(), Error> {
    let author = ctx.author();
    let embed = serenity::CreateEmbed::new()
        .title(title)
        .image(&url)
        .color(embeds::MAIN)
        .author(serenity::CreateEmbedAuthor::new(&author.name).icon_url(author.face()));
    let buttons = serenity::CreateActionRow::Buttons(vec![serenity::CreateButton::new_link(url).label(label)]);

    ctx.send(
        poise::CreateReply::default()
            .embed(embed)
            .components(vec![buttons]),
    )
    .await?;
    Ok(())
}

fn date_line(label: &str, timestamp: serenity::Timestamp) -> String {
    let unix = timestamp.unix_timestamp();
    format!("**{label}**: <t:{unix}:f> (<t:{unix}:R>)")
}

/// "@a, @b, ..." capped at `MAX_LISTED_ROLES` mentions.
fn role_field(mentions: &[String], total: usize) -> String {
    let listed = mentions
        .iter()
        .take(MAX_LISTED_ROLES)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if total > MAX_LISTED_ROLES {
        format!("{listed}...")
    } else {
        listed
    }
}

/// Strip the colons from `:name:` and turn spaces into underscores.
fn normalize_query(query: &str) -> String {
    query.trim().trim_matches(':').replace(' ', "_").to_lowercase()
}

#[derive(Debug, Deserialize)]
struct MemberProfile {
    #[serde(default)]
    banner: Option<String>,
}

/// Guild banners aren't part of serenity's member model, so read the raw
/// member payload.
async fn guild_banner_url(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
) -> Result<Option<String>, Error> {
    use ::serenity::http::{LightMethod, Request, Route};

    let request = Request::new(Route::GuildMember { guild_id, user_id }, LightMethod::Get);
    let profile: MemberProfile = ctx.http().fire(request).await?;
    Ok(profile.banner.map(|hash| {
        let extension = if hash.starts_with("a_") { "gif" } else { "png" };
        format!(
            "https://cdn.discordapp.com/guilds/{}/users/{}/banners/{hash}.{extension}?size=1024",
            guild_id.get(),
            user_id.get()
        )
    }))
}

// ============================================================================
// AVATARS & BANNERS
// ============================================================================

/// View a users avatar
#[poise::command(prefix_command, slash_command, aliases("av", "pfp"))]
pub async fn avatar(ctx: Context<'_>, #[description = "User to look at"] user: Option<serenity::User>) -> Result<(), Error> {
    let user = user.as_ref().unwrap_or_else(|| ctx.author());
    send_image(ctx, format!("{}'s Avatar", user.name), user.face(), "Avatar").await
}

/// View a members server avatar
#[poise::command(prefix_command, slash_command, guild_only, aliases("sav", "spfp"))]
pub async fn serveravatar(
    ctx: Context<'_>,
    #[description = "Member to look at"] member: Option<serenity::Member>,
) -> Result<(), Error> {
    let member = match member {
        Some(member) => member,
        None => ctx
            .author_member()
            .await
            .ok_or("Couldn't load the invoking member")?
            .into_owned(),
    };

    match member.avatar_url() {
        Some(url) => send_image(ctx, format!("{}'s Server Avatar", member.user.name), url, "Server Avatar").await,
        None => reply_not_found(ctx, format!("**{}** doesn't have a server avatar.", member.user.name)).await,
    }
}

/// View a users banner
#[poise::command(prefix_command, slash_command, aliases("bnr"))]
pub async fn banner(ctx: Context<'_>, #[description = "User to look at"] user: Option<serenity::User>) -> Result<(), Error> {
    let user_id = user.map(|u| u.id).unwrap_or(ctx.author().id);
    // Banners are only sent on a direct user fetch.
    let user = ctx.http().get_user(user_id).await?;

    match user.banner_url() {
        Some(url) => send_image(ctx, format!("{}'s Banner", user.name), url, "Banner").await,
        None => reply_not_found(ctx, format!("**{}** doesn't have a banner.", user.name)).await,
    }
}

/// View a members server banner
#[poise::command(prefix_command, slash_command, guild_only, aliases("sbnr"))]
pub async fn serverbanner(
    ctx: Context<'_>,
    #[description = "Member to look at"] member: Option<serenity::Member>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let user = member.map(|m| m.user).unwrap_or_else(|| ctx.author().clone());

    match guild_banner_url(ctx, guild_id, user.id).await? {
        Some(url) => send_image(ctx, format!("{}'s Server Banner", user.name), url, "Server Banner").await,
        None => reply_not_found(ctx, format!("**{}** doesn't have a server banner.", user.name)).await,
    }
}

// ============================================================================
// WHOIS
// ============================================================================

/// View a users profile
#[poise::command(prefix_command, slash_command, aliases("userid", "uid", "wi", "ui"))]
pub async fn whois(ctx: Context<'_>, #[description = "User to look at"] user: Option<serenity::User>) -> Result<(), Error> {
    let user_id = user.map(|u| u.id).unwrap_or(ctx.author().id);
    let user = ctx.http().get_user(user_id).await?;

    let mut dates = vec![date_line("Created", user.created_at())];
    let member = match ctx.guild_id() {
        Some(guild_id) => guild_id.member(ctx, user.id).await.ok(),
        None => None,
    };

    let mut roles = None;
    if let Some(member) = &member {
        if let Some(joined) = member.joined_at {
            dates.push(date_line("Joined", joined));
        }
        if let Some(boosted) = member.premium_since {
            dates.push(date_line("Boosted", boosted));
        }

        let mut ranked: Vec<(u16, serenity::RoleId)> = ctx
            .guild()
            .map(|guild| {
                member
                    .roles
                    .iter()
                    .filter_map(|id| guild.roles.get(id).map(|role| (role.position, *id)))
                    .collect()
            })
            .unwrap_or_default();
        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        let mentions: Vec<String> = ranked.iter().map(|(_, id)| id.mention().to_string()).collect();
        roles = Some((member.roles.len(), role_field(&mentions, member.roles.len())));
    }

    let author = ctx.author();
    let mut embed = serenity::CreateEmbed::new()
        .title(format!("@{} ({})", user.name, user.id))
        .color(embeds::MAIN)
        .thumbnail(user.face())
        .author(serenity::CreateEmbedAuthor::new(&author.name).icon_url(author.face()))
        .field("Dates", dates.join("\n"), false);

    let badges = ctx.data().badges.badges(user.id.get()).await?;
    if let Some(line) = badge_line(&badges) {
        embed = embed.description(line);
    }
    if let Some((count, value)) = roles {
        let value = if value.is_empty() { "None".to_string() } else { value };
        embed = embed.field(format!("Roles ({count})"), value, false);
    }

    let mut buttons = vec![serenity::CreateButton::new_link(user.face()).label("Avatar")];
    if let Some(banner) = user.banner_url() {
        buttons.push(serenity::CreateButton::new_link(banner).label("Banner"));
    }
    buttons.push(
        serenity::CreateButton::new_link(format!("https://discord.com/users/{}", user.id)).label("Profile"),
    );

    ctx.send(
        poise::CreateReply::default()
            .embed(embed)
            .components(vec![serenity::CreateActionRow::Buttons(buttons)]),
    )
    .await?;
    Ok(())
}

// ============================================================================
// STEAL
// ============================================================================

/// Get the full-size version of an emoji or sticker
#[poise::command(prefix_command, slash_command)]
pub async fn steal(
    ctx: Context<'_>,
    #[description = "Emoji, or the name of one in this server"]
    #[rest]
    query: Option<String>,
) -> Result<(), Error> {
    if let poise::Context::Prefix(prefix) = ctx {
        if let Some(sticker) = prefix.msg.sticker_items.first() {
            if let Some(url) = sticker.image_url() {
                return send_image(ctx, sticker.name.clone(), url, "Sticker").await;
            }
        }
    }

    let Some(query) = query else {
        return reply_usage(ctx).await;
    };
    if let Some(emoji) = parse_custom_emoji(&query) {
        return send_image(ctx, emoji.name.clone(), emoji.cdn_url(), "Emoji").await;
    }

    let wanted = normalize_query(&query);
    let found = ctx.guild().and_then(|guild| {
        let emoji = guild
            .emojis
            .values()
            .find(|emoji| emoji.name.to_lowercase() == wanted)
            .map(|emoji| (emoji.name.clone(), emoji.url(), "Emoji"));
        emoji.or_else(|| {
            guild
                .stickers
                .values()
                .find(|sticker| sticker.name.to_lowercase() == wanted)
                .and_then(|sticker| sticker.image_url().map(|url| (sticker.name.clone(), url, "Sticker")))
        })
    });

    match found {
        Some((name, url, label)) => send_image(ctx, name, url, label).await,
        None => reply_not_found(ctx, "I couldn't find that emoji or sticker.").await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_list_is_capped() {
        let mentions: Vec<String> = (0..20).map(|i| format!("<@&{i}>")).collect();
        let field = role_field(&mentions, 20);
        assert!(field.ends_with("<@&12>..."));
        assert_eq!(role_field(&mentions[..2], 2), "<@&0>, <@&1>");
    }

    #[test]
    fn dates_use_discord_timestamps() {
        let ts = serenity::Timestamp::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(
            date_line("Created", ts),
            "**Created**: <t:1700000000:f> (<t:1700000000:R>)"
        );
    }

    #[test]
    fn emoji_names_are_normalized() {
        assert_eq!(normalize_query(":Big Smile:"), "big_smile");
    }
}
