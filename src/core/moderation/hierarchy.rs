// Who may act on whom.
//
// Checks run in a fixed order and stop at the first failure, so the message a
// moderator sees is always the most specific one.

use super::moderation_models::{
    GuildRanks, MemberCheckOptions, MemberRank, RoleCheckOptions, RoleInfo,
};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("You **can't {0}** me. Try doing it without my own commands.")]
    TargetIsBot(String),

    #[error("You **can't {0}** yourself.")]
    TargetIsSelf(String),

    #[error("You **can't {0}** the server owner.")]
    TargetIsOwner(String),

    #[error("You **can't {0}** someone who is **higher than you**.")]
    HigherThanActor(String),

    #[error("You **can't {0}** someone who is **equal to you**.")]
    EqualToActor(String),

    #[error("I **can't {0}** someone who is **higher than me**.")]
    HigherThanBot(String),

    #[error("I **can't {0}** someone who is **equal to me**.")]
    EqualToBot(String),

    #[error("You **can't {0}** the `@everyone` role.")]
    EveryoneRole(String),

    #[error("I **can't {0}** a role that is **higher than me**.")]
    RoleHigherThanBot(String),

    #[error("I **can't {0}** a role that is **equal to my highest role**.")]
    RoleEqualToBot(String),

    #[error("You **can't {0}** a role that is **higher than you**.")]
    RoleHigherThanActor(String),

    #[error("You **can't {0}** a role that is **equal to your highest role**.")]
    RoleEqualToActor(String),
}

/// Check that `actor` may perform `action` on `target`.
///
/// The guild owner may do anything except target the bot.
pub fn check_member_hierarchy(
    guild: GuildRanks,
    actor: MemberRank,
    target: MemberRank,
    action: &str,
    options: MemberCheckOptions,
) -> Result<(), HierarchyError> {
    let action = action.to_string();

    if actor.id == guild.owner_id {
        if target.id == guild.bot.id && !options.can_inflict_bot {
            return Err(HierarchyError::TargetIsBot(action));
        }
        return Ok(());
    }

    if target.id == actor.id && !options.can_inflict_self {
        return Err(HierarchyError::TargetIsSelf(action));
    }
    if target.id == guild.bot.id && !options.can_inflict_bot {
        return Err(HierarchyError::TargetIsBot(action));
    }
    if target.id == guild.owner_id && !options.can_inflict_owner && target.id != actor.id {
        return Err(HierarchyError::TargetIsOwner(action));
    }

    match actor.top_role_position.cmp(&target.top_role_position) {
        Ordering::Less => return Err(HierarchyError::HigherThanActor(action)),
        Ordering::Equal => return Err(HierarchyError::EqualToActor(action)),
        Ordering::Greater => {}
    }

    match guild.bot.top_role_position.cmp(&target.top_role_position) {
        Ordering::Less => Err(HierarchyError::HigherThanBot(action)),
        Ordering::Equal => Err(HierarchyError::EqualToBot(action)),
        Ordering::Greater => Ok(()),
    }
}

/// Check that `actor` (and the bot) may perform `action` on `role`.
pub fn check_role_hierarchy(
    actor: MemberRank,
    bot: MemberRank,
    role: &RoleInfo,
    action: &str,
    options: RoleCheckOptions,
) -> Result<(), HierarchyError> {
    let action = action.to_string();

    if role.is_everyone && !options.can_affect_everyone_role {
        return Err(HierarchyError::EveryoneRole(action));
    }

    if !options.can_affect_bot_role {
        match bot.top_role_position.cmp(&role.position) {
            Ordering::Less => return Err(HierarchyError::RoleHigherThanBot(action)),
            Ordering::Equal => return Err(HierarchyError::RoleEqualToBot(action)),
            Ordering::Greater => {}
        }
    }

    match actor.top_role_position.cmp(&role.position) {
        Ordering::Less => Err(HierarchyError::RoleHigherThanActor(action)),
        Ordering::Equal => Err(HierarchyError::RoleEqualToActor(action)),
        Ordering::Greater => Ok(()),
    }
}

/// Find a role from user input.
///
/// Tries, in order: a role mention, a raw id, a case-insensitive exact name,
/// then the shortest name containing the input. `@everyone` only matches by
/// mention or id.
pub fn resolve_role<'a>(roles: &'a [RoleInfo], argument: &str) -> Option<&'a RoleInfo> {
    let argument = argument.trim();
    if argument.is_empty() {
        return None;
    }

    if let Some(id) = argument
        .strip_prefix("<@&")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        let id: u64 = id.parse().ok()?;
        return roles.iter().find(|role| role.id == id);
    }

    if (17..=20).contains(&argument.len()) && argument.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(id) = argument.parse::<u64>() {
            if let Some(role) = roles.iter().find(|role| role.id == id) {
                return Some(role);
            }
        }
    }

    let needle = argument.to_lowercase();
    let named = || roles.iter().filter(|role| !role.is_everyone);

    if let Some(role) = named().find(|role| role.name.to_lowercase() == needle) {
        return Some(role);
    }

    named()
        .filter(|role| role.name.to_lowercase().contains(&needle))
        .min_by_key(|role| role.name.chars().count())
}

/// Saved roles that can actually be given back: they still exist, sit below
/// the bot's highest role and aren't managed.
pub fn restorable_roles(saved: &[u64], roles: &[RoleInfo], bot: MemberRank) -> Vec<u64> {
    saved
        .iter()
        .filter_map(|id| roles.iter().find(|role| role.id == *id))
        .filter(|role| !role.is_everyone && !role.managed && role.position < bot.top_role_position)
        .map(|role| role.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: u64 = 1;
    const BOT: u64 = 2;

    fn guild() -> GuildRanks {
        GuildRanks {
            owner_id: OWNER,
            bot: MemberRank::new(BOT, 10),
        }
    }

    fn check(actor: MemberRank, target: MemberRank) -> Result<(), HierarchyError> {
        check_member_hierarchy(guild(), actor, target, "ban", MemberCheckOptions::default())
    }

    fn role(id: u64, name: &str, position: u16) -> RoleInfo {
        RoleInfo {
            id,
            name: name.to_string(),
            position,
            managed: false,
            is_everyone: false,
        }
    }

    #[test]
    fn owner_can_target_anyone_but_the_bot() {
        let owner = MemberRank::new(OWNER, 0);
        assert_eq!(check(owner, MemberRank::new(50, 20)), Ok(()));
        assert_eq!(check(owner, owner), Ok(()));
        assert_eq!(
            check(owner, MemberRank::new(BOT, 10)),
            Err(HierarchyError::TargetIsBot("ban".into()))
        );
    }

    #[test]
    fn member_checks_run_in_order() {
        let moderator = MemberRank::new(3, 5);

        assert_eq!(
            check(moderator, moderator),
            Err(HierarchyError::TargetIsSelf("ban".into()))
        );
        assert_eq!(
            check(moderator, MemberRank::new(BOT, 10)),
            Err(HierarchyError::TargetIsBot("ban".into()))
        );
        assert_eq!(
            check(moderator, MemberRank::new(OWNER, 0)),
            Err(HierarchyError::TargetIsOwner("ban".into()))
        );
        assert_eq!(
            check(moderator, MemberRank::new(4, 6)),
            Err(HierarchyError::HigherThanActor("ban".into()))
        );
        assert_eq!(
            check(moderator, MemberRank::new(4, 5)),
            Err(HierarchyError::EqualToActor("ban".into()))
        );
        assert_eq!(check(moderator, MemberRank::new(4, 1)), Ok(()));
    }

    #[test]
    fn bot_must_outrank_the_target() {
        let admin = MemberRank::new(3, 15);
        assert_eq!(
            check(admin, MemberRank::new(4, 12)),
            Err(HierarchyError::HigherThanBot("ban".into()))
        );
        assert_eq!(
            check(admin, MemberRank::new(4, 10)),
            Err(HierarchyError::EqualToBot("ban".into()))
        );
    }

    #[test]
    fn options_relax_identity_checks() {
        let moderator = MemberRank::new(3, 5);
        let options = MemberCheckOptions {
            can_inflict_self: true,
            ..Default::default()
        };
        // Self passes the identity check but still hits the equal rank rule.
        assert_eq!(
            check_member_hierarchy(guild(), moderator, moderator, "nick", options),
            Err(HierarchyError::EqualToActor("nick".into()))
        );
    }

    #[test]
    fn hierarchy_messages_render_the_action() {
        assert_eq!(
            HierarchyError::TargetIsSelf("kick".into()).to_string(),
            "You **can't kick** yourself."
        );
    }

    #[test]
    fn role_checks() {
        let bot = MemberRank::new(BOT, 10);
        let actor = MemberRank::new(3, 8);
        let options = RoleCheckOptions::default();

        let everyone = RoleInfo {
            is_everyone: true,
            ..role(99, "@everyone", 0)
        };
        assert_eq!(
            check_role_hierarchy(actor, bot, &everyone, "give", options),
            Err(HierarchyError::EveryoneRole("give".into()))
        );
        assert_eq!(
            check_role_hierarchy(actor, bot, &role(5, "a", 11), "give", options),
            Err(HierarchyError::RoleHigherThanBot("give".into()))
        );
        assert_eq!(
            check_role_hierarchy(actor, bot, &role(5, "a", 10), "give", options),
            Err(HierarchyError::RoleEqualToBot("give".into()))
        );
        assert_eq!(
            check_role_hierarchy(actor, bot, &role(5, "a", 9), "give", options),
            Err(HierarchyError::RoleHigherThanActor("give".into()))
        );
        assert_eq!(
            check_role_hierarchy(actor, bot, &role(5, "a", 8), "give", options),
            Err(HierarchyError::RoleEqualToActor("give".into()))
        );
        assert_eq!(
            check_role_hierarchy(actor, bot, &role(5, "a", 7), "give", options),
            Ok(())
        );
    }

    #[test]
    fn resolves_roles_by_mention_id_name_and_substring() {
        let roles = vec![
            RoleInfo {
                is_everyone: true,
                ..role(100000000000000000, "@everyone", 0)
            },
            role(111111111111111111, "Moderator", 5),
            role(222222222222222222, "Mod", 4),
            role(333333333333333333, "Members", 1),
        ];

        assert_eq!(resolve_role(&roles, "<@&333333333333333333>").unwrap().name, "Members");
        assert_eq!(resolve_role(&roles, "111111111111111111").unwrap().name, "Moderator");
        assert_eq!(resolve_role(&roles, "moderator").unwrap().name, "Moderator");
        assert_eq!(resolve_role(&roles, "mo").unwrap().name, "Mod");
        assert_eq!(resolve_role(&roles, "ember").unwrap().name, "Members");
        assert!(resolve_role(&roles, "everyone").is_none());
        assert!(resolve_role(&roles, "<@&1>").is_none());
        assert!(resolve_role(&roles, "admin").is_none());
    }

    #[test]
    fn restorable_roles_skip_managed_missing_and_high_roles() {
        let bot = MemberRank::new(BOT, 10);
        let roles = vec![
            role(1, "low", 2),
            RoleInfo {
                managed: true,
                ..role(2, "booster", 3)
            },
            role(3, "high", 12),
        ];

        assert_eq!(restorable_roles(&[1, 2, 3, 4], &roles, bot), vec![1]);
    }
}
