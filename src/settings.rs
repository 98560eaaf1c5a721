// Process configuration, read from the environment (and `.env`).

use thiserror::Error;

pub const DEFAULT_PREFIX: &str = ",";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Missing {0} environment variable! Create a .env file with your bot token.")]
    Missing(&'static str),

    #[error("Invalid {name}: `{value}` isn't a user ID")]
    InvalidOwner { name: &'static str, value: String },

    #[error("FALLBACK_PREFIX must be 1-6 characters")]
    InvalidPrefix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub token: String,
    /// Without it the bot runs on the in-memory store.
    pub database_url: Option<String>,
    pub fallback_prefix: String,
    pub owner_ids: Vec<u64>,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let token = get("DISCORD_TOKEN").ok_or(SettingsError::Missing("DISCORD_TOKEN"))?;

        let fallback_prefix = get("FALLBACK_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        if fallback_prefix.chars().count() > 6 {
            return Err(SettingsError::InvalidPrefix);
        }

        let owner_ids = match get("OWNER_IDS") {
            Some(raw) => parse_owner_ids(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            token,
            database_url: get("DATABASE_URL"),
            fallback_prefix,
            owner_ids,
        })
    }
}

fn parse_owner_ids(raw: &str) -> Result<Vec<u64>, SettingsError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse().map_err(|_| SettingsError::InvalidOwner {
                name: "OWNER_IDS",
                value: part.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn token_is_required() {
        assert_eq!(
            Settings::from_lookup(lookup(&[("DISCORD_TOKEN", "  ")])),
            Err(SettingsError::Missing("DISCORD_TOKEN"))
        );
    }

    #[test]
    fn defaults_apply() {
        let settings = Settings::from_lookup(lookup(&[("DISCORD_TOKEN", "abc")])).unwrap();
        assert_eq!(settings.fallback_prefix, ",");
        assert_eq!(settings.database_url, None);
        assert!(settings.owner_ids.is_empty());
    }

    #[test]
    fn reads_owners_and_database() {
        let settings = Settings::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "abc"),
            ("DATABASE_URL", "postgres://localhost/wardic"),
            ("OWNER_IDS", "1, 2,,3"),
            ("FALLBACK_PREFIX", "w?"),
        ]))
        .unwrap();
        assert_eq!(settings.owner_ids, vec![1, 2, 3]);
        assert_eq!(settings.database_url.as_deref(), Some("postgres://localhost/wardic"));
        assert_eq!(settings.fallback_prefix, "w?");
    }

    #[test]
    fn rejects_bad_owner_ids() {
        let result = Settings::from_lookup(lookup(&[("DISCORD_TOKEN", "abc"), ("OWNER_IDS", "1,bob")]));
        assert_eq!(
            result,
            Err(SettingsError::InvalidOwner {
                name: "OWNER_IDS",
                value: "bob".to_string()
            })
        );
    }

    #[test]
    fn rejects_long_prefixes() {
        let result = Settings::from_lookup(lookup(&[("DISCORD_TOKEN", "abc"), ("FALLBACK_PREFIX", "toolong!")]));
        assert_eq!(result, Err(SettingsError::InvalidPrefix));
    }
}
