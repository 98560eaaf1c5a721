// Typed per-entity documents.
//
// Each row in the database holds one JSON document. These structs give the
// documents a shape while keeping the key layout that existing rows already
// use, so old data keeps loading. Keys we don't model are carried in `extra`
// and written back untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ============================================================================
// SNOWFLAKE ENCODING
// ============================================================================

/// Discord ids have been stored both as JSON numbers and as strings over time.
/// These helpers accept either and pick one encoding on the way out.
pub(crate) mod snowflake {
    use serde::de::{self, Deserializer};
    use serde::{Deserialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSnowflake {
        Number(u64),
        Text(String),
    }

    impl RawSnowflake {
        fn into_id<E: de::Error>(self) -> Result<u64, E> {
            match self {
                RawSnowflake::Number(id) => Ok(id),
                RawSnowflake::Text(text) => text
                    .trim()
                    .parse()
                    .map_err(|_| E::custom(format!("invalid snowflake `{text}`"))),
            }
        }

        fn is_blank(&self) -> bool {
            matches!(self, RawSnowflake::Text(text) if text.trim().is_empty())
        }
    }

    /// `[123, "456"]` in, `[123, 456]` out.
    pub mod list {
        use super::*;

        pub fn serialize<S: Serializer>(ids: &[u64], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(ids)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u64>, D::Error> {
            Vec::<RawSnowflake>::deserialize(deserializer)?
                .into_iter()
                .map(RawSnowflake::into_id)
                .collect()
        }
    }

    /// Maps keyed by id. JSON object keys are always strings, and parsing them
    /// here keeps it working underneath `#[serde(flatten)]`.
    pub mod keys {
        use super::*;
        use serde::Serialize;
        use std::collections::BTreeMap;

        pub fn serialize<S, V>(map: &BTreeMap<u64, V>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
            V: Serialize,
        {
            serializer.collect_map(map.iter().map(|(id, value)| (id.to_string(), value)))
        }

        pub fn deserialize<'de, D, V>(deserializer: D) -> Result<BTreeMap<u64, V>, D::Error>
        where
            D: Deserializer<'de>,
            V: Deserialize<'de>,
        {
            BTreeMap::<String, V>::deserialize(deserializer)?
                .into_iter()
                .map(|(key, value)| {
                    key.trim()
                        .parse()
                        .map(|id| (id, value))
                        .map_err(|_| de::Error::custom(format!("invalid snowflake key `{key}`")))
                })
                .collect()
        }
    }

    /// Optional id written as a string. Blank strings read as `None`.
    pub mod optional_string {
        use super::*;

        pub fn serialize<S: Serializer>(id: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
            match id {
                Some(id) => serializer.serialize_str(&id.to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u64>, D::Error> {
            match Option::<RawSnowflake>::deserialize(deserializer)? {
                Some(raw) if raw.is_blank() => Ok(None),
                Some(raw) => raw.into_id().map(Some),
                None => Ok(None),
            }
        }
    }
}

// ============================================================================
// GUILD
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildDocument {
    #[serde(rename = "Configuration")]
    pub configuration: GuildConfiguration,
    #[serde(rename = "Moderation")]
    pub moderation: GuildModeration,
    #[serde(rename = "VoiceMaster")]
    pub voicemaster: VoiceMasterData,
    #[serde(rename = "AntiNuke")]
    pub antinuke: AntiNukeData,
    #[serde(rename = "Automation")]
    pub automation: AutomationData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildConfiguration {
    #[serde(rename = "Prefix", skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// alias -> command name, both lower-case.
    #[serde(rename = "Command_Aliases")]
    pub command_aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildModeration {
    #[serde(rename = "HardBanned_Users", with = "snowflake::list")]
    pub hard_banned_users: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceMasterData {
    #[serde(rename = "Settings")]
    pub settings: VoiceMasterSettings,
    /// channel id -> tracked channel.
    #[serde(rename = "Channels", with = "snowflake::keys")]
    pub channels: BTreeMap<u64, VoiceMasterChannel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceMasterSettings {
    #[serde(
        rename = "Category",
        with = "snowflake::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<u64>,
    #[serde(
        rename = "Creation_Channel",
        with = "snowflake::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub creation_channel: Option<u64>,
    #[serde(
        rename = "Interface_Channel",
        with = "snowflake::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub interface_channel: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceMasterChannel {
    #[serde(
        rename = "Owner",
        with = "snowflake::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub owner: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AntiNukeData {
    #[serde(rename = "Administrators", with = "snowflake::list")]
    pub administrators: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationData {
    /// trigger (lower-case) -> response.
    #[serde(rename = "Auto_Responders")]
    pub auto_responders: BTreeMap<String, String>,
    /// message id -> emoji key -> role id.
    #[serde(rename = "Reaction_Roles", with = "snowflake::keys")]
    pub reaction_roles: BTreeMap<u64, BTreeMap<String, u64>>,
    #[serde(rename = "Filtered_Words")]
    pub filtered_words: Vec<String>,
}

impl GuildDocument {
    /// The stored prefix, ignoring blank values.
    pub fn prefix(&self) -> Option<&str> {
        self.configuration
            .prefix
            .as_deref()
            .filter(|prefix| !prefix.trim().is_empty())
    }

    pub fn is_hard_banned(&self, user_id: u64) -> bool {
        self.moderation.hard_banned_users.contains(&user_id)
    }

    /// Guild owners are always anti-nuke administrators.
    pub fn is_antinuke_admin(&self, user_id: u64, owner_id: u64) -> bool {
        user_id == owner_id || self.antinuke.administrators.contains(&user_id)
    }
}

// ============================================================================
// MEMBER
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberDocument {
    #[serde(rename = "Configuration")]
    pub configuration: MemberConfiguration,
    #[serde(rename = "Sticky_Roles", with = "snowflake::list")]
    pub sticky_roles: Vec<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberConfiguration {
    #[serde(rename = "Forced_Nickname", skip_serializing_if = "Option::is_none")]
    pub forced_nickname: Option<String>,
}

impl MemberDocument {
    pub fn forced_nickname(&self) -> Option<&str> {
        self.configuration
            .forced_nickname
            .as_deref()
            .filter(|nick| !nick.is_empty())
    }
}

// ============================================================================
// USER
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDocument {
    #[serde(rename = "RolePlay")]
    pub roleplay: RolePlayCounters,
    #[serde(rename = "Badges")]
    pub badges: Vec<Badge>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// target user id -> how many times the action was done to them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolePlayCounters {
    #[serde(rename = "Bite", with = "snowflake::keys")]
    pub bite: BTreeMap<u64, u64>,
    #[serde(rename = "Hug", with = "snowflake::keys")]
    pub hug: BTreeMap<u64, u64>,
    #[serde(rename = "Kiss", with = "snowflake::keys")]
    pub kiss: BTreeMap<u64, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Badge {
    pub name: String,
    pub emoji: String,
}

// ============================================================================
// GLOBAL CONFIGURATION
// ============================================================================

pub const DEFAULT_STATUS: &str = "i listen to esdeekid and fakemink";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfiguration {
    #[serde(rename = "Whitelisted_Guilds", with = "snowflake::list")]
    pub whitelisted_guilds: Vec<u64>,
    #[serde(rename = "Statuses")]
    pub statuses: StatusData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusData {
    #[serde(rename = "List")]
    pub list: Vec<String>,
    /// Pinned status shown while looping is disabled.
    #[serde(rename = "Status", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "Configuration", alias = "Settings")]
    pub configuration: StatusSettings,
}

impl Default for StatusData {
    fn default() -> Self {
        Self {
            list: vec![DEFAULT_STATUS.to_string()],
            status: None,
            configuration: StatusSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusSettings {
    #[serde(rename = "Randomized")]
    pub randomized: bool,
    #[serde(rename = "LoopingEnabled")]
    pub looping_enabled: bool,
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self {
            randomized: false,
            looping_enabled: true,
        }
    }
}

impl BotConfiguration {
    pub fn is_whitelisted(&self, guild_id: u64) -> bool {
        self.whitelisted_guilds.contains(&guild_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn guild_document_reads_string_and_number_ids() {
        let doc: GuildDocument = serde_json::from_value(json!({
            "Configuration": { "Prefix": "!", "Command_Aliases": { "deport": "ban" } },
            "Moderation": { "HardBanned_Users": [123, "456"] },
            "VoiceMaster": {
                "Settings": { "Category": "10", "Creation_Channel": "11", "Interface_Channel": "" },
                "Channels": { "99": { "Owner": "7" } }
            },
            "AntiNuke": { "Administrators": ["5"] }
        }))
        .unwrap();

        assert_eq!(doc.prefix(), Some("!"));
        assert_eq!(doc.configuration.command_aliases["deport"], "ban");
        assert!(doc.is_hard_banned(123));
        assert!(doc.is_hard_banned(456));
        assert_eq!(doc.voicemaster.settings.category, Some(10));
        assert_eq!(doc.voicemaster.settings.interface_channel, None);
        assert_eq!(doc.voicemaster.channels[&99].owner, Some(7));
        assert!(doc.is_antinuke_admin(5, 1));
        assert!(doc.is_antinuke_admin(1, 1));
        assert!(!doc.is_antinuke_admin(2, 1));
    }

    #[test]
    fn unknown_keys_survive_a_round_trip() {
        let raw = json!({
            "Configuration": { "Prefix": "?" },
            "AntiRaid": { "Administrators": [1] }
        });

        let doc: GuildDocument = serde_json::from_value(raw).unwrap();
        let written = serde_json::to_value(&doc).unwrap();

        assert_eq!(written["AntiRaid"], json!({ "Administrators": [1] }));
        assert_eq!(written["Configuration"]["Prefix"], json!("?"));
    }

    #[test]
    fn voicemaster_ids_are_written_as_strings() {
        let mut doc = GuildDocument::default();
        doc.voicemaster.settings.creation_channel = Some(42);
        doc.voicemaster.channels.insert(
            7,
            VoiceMasterChannel { owner: Some(8) },
        );

        let written = serde_json::to_value(&doc).unwrap();
        assert_eq!(written["VoiceMaster"]["Settings"]["Creation_Channel"], json!("42"));
        assert_eq!(written["VoiceMaster"]["Channels"]["7"]["Owner"], json!("8"));
    }

    #[test]
    fn blank_prefix_is_ignored() {
        let doc: GuildDocument =
            serde_json::from_value(json!({ "Configuration": { "Prefix": "  " } })).unwrap();
        assert_eq!(doc.prefix(), None);
    }

    #[test]
    fn empty_documents_parse_with_defaults() {
        let config: BotConfiguration = serde_json::from_value(json!({})).unwrap();
        assert!(config.statuses.configuration.looping_enabled);
        assert!(!config.statuses.configuration.randomized);
        assert_eq!(config.statuses.list, vec![DEFAULT_STATUS.to_string()]);

        let member: MemberDocument = serde_json::from_value(json!({})).unwrap();
        assert_eq!(member.forced_nickname(), None);
        assert!(member.sticky_roles.is_empty());
    }

    #[test]
    fn status_toggles_accept_the_older_settings_key() {
        let config: BotConfiguration = serde_json::from_value(json!({
            "Whitelisted_Guilds": ["1444846443104964660", 1],
            "Statuses": { "List": [], "Settings": { "Randomized": true, "LoopingEnabled": false } }
        }))
        .unwrap();

        assert!(config.is_whitelisted(1444846443104964660));
        assert!(config.is_whitelisted(1));
        assert!(config.statuses.list.is_empty());
        assert!(config.statuses.configuration.randomized);
        assert!(!config.statuses.configuration.looping_enabled);
    }

    #[test]
    fn roleplay_counters_use_string_keys() {
        let mut user = UserDocument::default();
        user.roleplay.hug.insert(12, 3);

        let written = serde_json::to_value(&user).unwrap();
        assert_eq!(written["RolePlay"]["Hug"]["12"], json!(3));

        let read: UserDocument = serde_json::from_value(written).unwrap();
        assert_eq!(read.roleplay.hug.get(&12), Some(&3));
    }

    #[test]
    fn malformed_ids_are_rejected() {
        let result: Result<MemberDocument, _> =
            serde_json::from_value(json!({ "Sticky_Roles": ["abc"] }));
        assert!(result.is_err());
    }
}
