// Core moderation module: hierarchy rules, duration parsing and the
// persisted moderation state (hard bans, forced nicknames, sticky roles).

pub mod duration;
pub mod hierarchy;
pub mod moderation_models;
pub mod moderation_service;

pub use duration::*;
pub use hierarchy::*;
pub use moderation_models::*;
pub use moderation_service::*;
