// Read-only views of the serenity cache, shaped for the core rules.
//
// Cache guards are never held past these functions, so callers can await
// freely afterwards.

use crate::core::moderation::{GuildRanks, MemberRank, RoleInfo};
use poise::serenity_prelude as serenity;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct GuildSnapshot {
    pub guild_id: u64,
    pub owner_id: u64,
    pub bot: MemberRank,
    pub roles: Vec<RoleInfo>,
}

impl GuildSnapshot {
    pub fn capture(cache: &serenity::Cache, guild_id: serenity::GuildId) -> Option<Self> {
        let bot_id = cache.current_user().id;
        let guild = cache.guild(guild_id)?;

        let roles: Vec<RoleInfo> = guild
            .roles
            .values()
            .map(|role| RoleInfo {
                id: role.id.get(),
                name: role.name.clone(),
                position: role.position,
                managed: role.managed,
                is_everyone: role.id.get() == guild_id.get(),
            })
            .collect();

        let bot_roles: Vec<serenity::RoleId> = guild
            .members
            .get(&bot_id)
            .map(|member| member.roles.clone())
            .unwrap_or_default();

        let mut snapshot = Self {
            guild_id: guild_id.get(),
            owner_id: guild.owner_id.get(),
            bot: MemberRank::new(bot_id.get(), 0),
            roles,
        };
        snapshot.bot = snapshot.rank_of(bot_id.get(), &bot_roles);
        Some(snapshot)
    }

    pub fn ranks(&self) -> GuildRanks {
        GuildRanks {
            owner_id: self.owner_id,
            bot: self.bot,
        }
    }

    /// Rank from a member's role list. Unknown roles are ignored.
    pub fn rank_of(&self, user_id: u64, role_ids: &[serenity::RoleId]) -> MemberRank {
        let top = role_ids
            .iter()
            .filter_map(|id| self.role(id.get()))
            .map(|role| role.position)
            .max()
            .unwrap_or(0);
        MemberRank::new(user_id, top)
    }

    pub fn member_rank(&self, member: &serenity::Member) -> MemberRank {
        self.rank_of(member.user.id.get(), &member.roles)
    }

    pub fn role(&self, role_id: u64) -> Option<&RoleInfo> {
        self.roles.iter().find(|role| role.id == role_id)
    }

    /// Roles sorted from the top of the hierarchy down, `@everyone` excluded.
    pub fn roles_by_position(&self) -> Vec<&RoleInfo> {
        let mut roles: Vec<&RoleInfo> = self.roles.iter().filter(|role| !role.is_everyone).collect();
        roles.sort_by(|a, b| b.position.cmp(&a.position));
        roles
    }
}

/// A member's role ids without `@everyone`.
pub fn member_role_ids(member: &serenity::Member) -> Vec<u64> {
    member
        .roles
        .iter()
        .map(|id| id.get())
        .filter(|id| *id != member.guild_id.get())
        .collect()
}

// ============================================================================
// MESSAGES
// ============================================================================

/// Accept a message id or a `https://discord.com/channels/<g>/<c>/<m>` link.
/// Returns the channel id when a link was given.
pub fn parse_message_ref(value: &str) -> Option<(Option<u64>, u64)> {
    let value = value.trim().trim_start_matches('<').trim_end_matches('>');
    if let Ok(id) = value.parse::<u64>() {
        return Some((None, id));
    }

    let path = value.split("/channels/").nth(1)?;
    let mut parts = path.split('/');
    let _guild = parts.next()?;
    let channel = parts.next()?.parse().ok()?;
    let message = parts.next()?.parse().ok()?;
    Some((Some(channel), message))
}

// ============================================================================
// EMOJI
// ============================================================================

fn custom_emoji_re() -> &'static Regex {
    static CUSTOM_EMOJI_RE: OnceLock<Regex> = OnceLock::new();
    CUSTOM_EMOJI_RE.get_or_init(|| Regex::new(r"<(a?):(\w+):(\d+)>").expect("valid emoji pattern"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomEmoji {
    pub animated: bool,
    pub name: String,
    pub id: u64,
}

impl CustomEmoji {
    pub fn cdn_url(&self) -> String {
        let extension = if self.animated { "gif" } else { "png" };
        format!(
            "https://cdn.discordapp.com/emojis/{}.{}?quality=lossless",
            self.id, extension
        )
    }
}

/// The first `<:name:id>` / `<a:name:id>` in a string.
pub fn parse_custom_emoji(value: &str) -> Option<CustomEmoji> {
    let caps = custom_emoji_re().captures(value)?;
    Some(CustomEmoji {
        animated: !caps[1].is_empty(),
        name: caps[2].to_string(),
        id: caps[3].parse().ok()?,
    })
}

/// Storage key for an emoji typed by a user: `name:id` for custom emoji,
/// the text itself otherwise.
pub fn emoji_key(value: &str) -> String {
    match parse_custom_emoji(value) {
        Some(emoji) => format!("{}:{}", emoji.name, emoji.id),
        None => value.trim().to_string(),
    }
}

/// Storage key for a reaction, matching `emoji_key`.
pub fn reaction_key(reaction: &serenity::ReactionType) -> Option<String> {
    match reaction {
        serenity::ReactionType::Custom { id, name, .. } => {
            Some(format!("{}:{}", name.as_deref().unwrap_or_default(), id.get()))
        }
        serenity::ReactionType::Unicode(text) => Some(text.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_message_ids_and_links() {
        assert_eq!(parse_message_ref("123"), Some((None, 123)));
        assert_eq!(
            parse_message_ref("https://discord.com/channels/1/2/3"),
            Some((Some(2), 3))
        );
        assert_eq!(
            parse_message_ref("<https://ptb.discord.com/channels/1/2/3>"),
            Some((Some(2), 3))
        );
        assert_eq!(parse_message_ref("hello"), None);
    }

    #[test]
    fn parses_custom_emoji() {
        let emoji = parse_custom_emoji("look <a:party:55> here").unwrap();
        assert!(emoji.animated);
        assert_eq!(emoji.name, "party");
        assert_eq!(emoji.cdn_url(), "https://cdn.discordapp.com/emojis/55.gif?quality=lossless");

        let still = parse_custom_emoji("<:wave:7>").unwrap();
        assert!(!still.animated);
        assert!(still.cdn_url().ends_with("7.png?quality=lossless"));

        assert!(parse_custom_emoji("wave").is_none());
    }

    #[test]
    fn emoji_keys_match_reaction_keys() {
        assert_eq!(emoji_key("<:party:55>"), "party:55");
        assert_eq!(emoji_key(" 🍎 "), "🍎");

        let reaction = serenity::ReactionType::Custom {
            animated: false,
            id: serenity::EmojiId::new(55),
            name: Some("party".into()),
        };
        assert_eq!(reaction_key(&reaction).as_deref(), Some("party:55"));
        assert_eq!(
            reaction_key(&serenity::ReactionType::Unicode("🍎".into())).as_deref(),
            Some("🍎")
        );
    }
}
