// Discord commands module.
// Each feature gets its own command file.

pub mod automation;
pub mod guards;
pub mod information;
pub mod moderation;
pub mod owner;
pub mod roleplay;
pub mod server;
pub mod voicemaster;

use crate::discord::{Data, Error};

/// Every command the bot registers, top-level only. Subcommands hang off
/// their groups.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        // Moderation
        moderation::ban(),
        moderation::hardban(),
        moderation::softban(),
        moderation::unban(),
        moderation::kick(),
        moderation::timeout(),
        moderation::untimeout(),
        moderation::purge(),
        moderation::nuke(),
        moderation::nickname(),
        moderation::forcenickname(),
        moderation::role(),
        moderation::stickyrole(),
        moderation::antinuke(),
        // Server configuration
        server::prefix(),
        server::alias(),
        server::roles(),
        server::inrole(),
        // VoiceMaster
        voicemaster::voicemaster(),
        // Automation
        automation::autoresponder(),
        automation::reactionrole(),
        automation::filter(),
        // Information
        information::avatar(),
        information::serveravatar(),
        information::banner(),
        information::serverbanner(),
        information::whois(),
        information::steal(),
        // Roleplay
        roleplay::bite(),
        roleplay::hug(),
        roleplay::kiss(),
        // Owners
        owner::ownercmds(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn command_names_and_aliases_are_unique() {
        let mut seen = HashSet::new();
        for command in all() {
            assert!(seen.insert(command.name.clone()), "duplicate name {}", command.name);
            for alias in &command.aliases {
                assert!(seen.insert(alias.clone()), "duplicate alias {alias}");
            }
        }
    }

    #[test]
    fn groups_carry_their_subcommands() {
        let commands = all();
        let voicemaster = commands.iter().find(|c| c.name == "voicemaster").unwrap();
        let names: Vec<&str> = voicemaster.subcommands.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"claim"));
        assert!(names.contains(&"setup"));
    }
}
