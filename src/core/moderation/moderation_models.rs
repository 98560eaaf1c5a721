// Plain data the moderation rules operate on.
//
// The Discord layer builds these from the guild cache so the rules can be
// checked and tested without a gateway connection.

/// A guild member reduced to what hierarchy checks need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRank {
    pub id: u64,
    /// Position of the member's highest role. `@everyone` is 0.
    pub top_role_position: u16,
}

impl MemberRank {
    pub fn new(id: u64, top_role_position: u16) -> Self {
        Self {
            id,
            top_role_position,
        }
    }
}

/// The guild-wide facts every member check needs.
#[derive(Debug, Clone, Copy)]
pub struct GuildRanks {
    pub owner_id: u64,
    pub bot: MemberRank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInfo {
    pub id: u64,
    pub name: String,
    pub position: u16,
    /// Roles owned by an integration or a boost can't be assigned by hand.
    pub managed: bool,
    pub is_everyone: bool,
}

/// Exceptions to the member hierarchy rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemberCheckOptions {
    pub can_inflict_self: bool,
    pub can_inflict_bot: bool,
    pub can_inflict_owner: bool,
}

/// Exceptions to the role hierarchy rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleCheckOptions {
    pub can_affect_bot_role: bool,
    pub can_affect_everyone_role: bool,
}
