// Domain errors that are answered with a warning instead of failing the
// command. Storage failures are split off and propagated as real errors.

use crate::core::access::WhitelistError;
use crate::core::automation::AutomationError;
use crate::core::badges::BadgeError;
use crate::core::guild_settings::{AliasError, PrefixError};
use crate::core::moderation::{DurationError, HierarchyError, ModerationError};
use crate::core::presence::StatusError;
use crate::core::storage::StoreError;
use crate::core::voicemaster::{ClaimError, VoiceMasterError};
use crate::discord::embeds::reply_warning;
use crate::discord::{Context, Error};

pub trait Notice: std::fmt::Display {
    /// The storage failure behind this error, if that is what it is.
    fn storage_failure(self) -> Option<StoreError>;
}

macro_rules! notice {
    (stored: $($ty:ty),* $(,)?) => {
        $(impl Notice for $ty {
            fn storage_failure(self) -> Option<StoreError> {
                match self {
                    Self::Storage(e) => Some(e),
                    _ => None,
                }
            }
        })*
    };
    (pure: $($ty:ty),* $(,)?) => {
        $(impl Notice for $ty {
            fn storage_failure(self) -> Option<StoreError> {
                None
            }
        })*
    };
}

notice!(stored: PrefixError, AliasError, WhitelistError, ModerationError, VoiceMasterError, StatusError, AutomationError, BadgeError);
notice!(pure: HierarchyError, DurationError, ClaimError);

/// Unwrap a service result. Domain errors are shown to the invoker and
/// yield `None`; storage errors bubble up to `on_error`.
pub async fn settle<T, E: Notice>(ctx: Context<'_>, result: Result<T, E>) -> Result<Option<T>, Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            let message = e.to_string();
            match e.storage_failure() {
                Some(storage) => Err(storage.into()),
                None => {
                    reply_warning(ctx, message).await?;
                    Ok(None)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_storage_variants_are_failures() {
        assert!(PrefixError::AlreadyDefault.storage_failure().is_none());
        assert!(PrefixError::Storage(StoreError::Storage("down".into()))
            .storage_failure()
            .is_some());
        assert!(ClaimError::AlreadyOwner.storage_failure().is_none());
    }
}
