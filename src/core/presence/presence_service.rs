// Rotating custom status.
//
// The status list and its settings live in the global configuration
// document. The rotator only remembers what it showed last and where it is in
// the cycle, so edits to the list take effect on the next tick.

use crate::core::storage::{DocumentService, StatusData, StoreError};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

pub const ROTATION_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("That status **already exists**.")]
    AlreadyExists,

    #[error("That status **doesn't exist**.")]
    NotFound,

    #[error("Statuses can't be empty.")]
    Empty,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Owner toggles accept the usual truthy words. Everything else is off.
pub fn parse_toggle(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "on" | "yes" | "y" | "t"
    )
}

// ============================================================================
// ROTATOR
// ============================================================================

#[derive(Debug, Default)]
pub struct StatusRotator {
    current: Option<String>,
    cycle: Vec<String>,
    position: usize,
}

impl StatusRotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Pick the status to show next, or `None` to leave the presence alone.
    pub fn next_status<R: Rng + ?Sized>(&mut self, data: &StatusData, rng: &mut R) -> Option<String> {
        if !data.configuration.looping_enabled {
            return data.status.clone().filter(|status| !status.is_empty());
        }
        if data.list.is_empty() {
            return None;
        }

        let next = if data.configuration.randomized {
            let fresh: Vec<&String> = data
                .list
                .iter()
                .filter(|status| Some(status.as_str()) != self.current.as_deref())
                .collect();
            let pool: Vec<&String> = if fresh.is_empty() {
                data.list.iter().collect()
            } else {
                fresh
            };
            pool.choose(rng).map(|status| (*status).clone())?
        } else {
            if self.cycle != data.list {
                self.cycle = data.list.clone();
                self.position = 0;
            }
            let status = self.cycle[self.position % self.cycle.len()].clone();
            self.position = (self.position + 1) % self.cycle.len();
            status
        };

        self.current = Some(next.clone());
        Some(next)
    }
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct PresenceService {
    documents: Arc<DocumentService>,
    rotator: Mutex<StatusRotator>,
}

impl PresenceService {
    pub fn new(documents: Arc<DocumentService>) -> Self {
        Self {
            documents,
            rotator: Mutex::new(StatusRotator::new()),
        }
    }

    /// One tick of the rotation loop.
    pub async fn next_status(&self) -> Result<Option<String>, StoreError> {
        let data = self.documents.get_configuration().await?.statuses;
        let mut rotator = self.rotator.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rotator.next_status(&data, &mut rand::thread_rng()))
    }

    pub async fn statuses(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.documents.get_configuration().await?.statuses.list)
    }

    pub async fn add_status(&self, status: &str) -> Result<(), StatusError> {
        let status = status.trim();
        if status.is_empty() {
            return Err(StatusError::Empty);
        }
        self.documents
            .update_configuration(|config| {
                let list = &mut config.statuses.list;
                if list.iter().any(|s| s == status) {
                    return Err(StatusError::AlreadyExists);
                }
                list.push(status.to_string());
                Ok(())
            })
            .await
    }

    pub async fn remove_status(&self, status: &str) -> Result<(), StatusError> {
        let status = status.trim();
        self.documents
            .update_configuration(|config| {
                let list = &mut config.statuses.list;
                let before = list.len();
                list.retain(|s| s != status);
                if list.len() == before {
                    return Err(StatusError::NotFound);
                }
                Ok(())
            })
            .await
    }

    /// Pin a status. It's shown immediately and whenever looping is off.
    pub async fn pin_status(&self, status: &str) -> Result<(), StatusError> {
        let status = status.trim();
        if status.is_empty() {
            return Err(StatusError::Empty);
        }
        self.documents
            .update_configuration(|config| {
                config.statuses.status = Some(status.to_string());
                Ok::<_, StatusError>(())
            })
            .await?;

        let mut rotator = self.rotator.lock().unwrap_or_else(|e| e.into_inner());
        rotator.current = Some(status.to_string());
        Ok(())
    }

    pub async fn set_randomized(&self, enabled: bool) -> Result<(), StoreError> {
        self.documents
            .update_configuration(|config| {
                config.statuses.configuration.randomized = enabled;
                Ok(())
            })
            .await
    }

    pub async fn set_looping(&self, enabled: bool) -> Result<(), StoreError> {
        self.documents
            .update_configuration(|config| {
                config.statuses.configuration.looping_enabled = enabled;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::StatusSettings;
    use crate::infra::storage::InMemoryDocumentStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn data(list: &[&str], randomized: bool, looping_enabled: bool) -> StatusData {
        StatusData {
            list: list.iter().map(|s| s.to_string()).collect(),
            status: Some("pinned".into()),
            configuration: StatusSettings {
                randomized,
                looping_enabled,
            },
        }
    }

    #[test]
    fn toggles() {
        for yes in ["true", "ON", "Yes", "y", "t"] {
            assert!(parse_toggle(yes));
        }
        for no in ["false", "off", "nope", ""] {
            assert!(!parse_toggle(no));
        }
    }

    #[test]
    fn cycles_in_order_and_restarts_on_change() {
        let mut rotator = StatusRotator::new();
        let mut rng = StdRng::seed_from_u64(1);

        let first = data(&["a", "b"], false, true);
        let picks: Vec<_> = (0..3)
            .filter_map(|_| rotator.next_status(&first, &mut rng))
            .collect();
        assert_eq!(picks, ["a", "b", "a"]);

        let changed = data(&["x", "y"], false, true);
        assert_eq!(rotator.next_status(&changed, &mut rng).as_deref(), Some("x"));
    }

    #[test]
    fn random_mode_never_repeats_immediately() {
        let mut rotator = StatusRotator::new();
        let mut rng = StdRng::seed_from_u64(7);
        let statuses = data(&["a", "b", "c"], true, true);

        let mut last = rotator.next_status(&statuses, &mut rng);
        for _ in 0..50 {
            let next = rotator.next_status(&statuses, &mut rng);
            assert_ne!(next, last);
            last = next;
        }
    }

    #[test]
    fn random_mode_with_one_status_repeats_it() {
        let mut rotator = StatusRotator::new();
        let mut rng = StdRng::seed_from_u64(3);
        let single = data(&["only"], true, true);

        assert_eq!(rotator.next_status(&single, &mut rng).as_deref(), Some("only"));
        assert_eq!(rotator.next_status(&single, &mut rng).as_deref(), Some("only"));
    }

    #[test]
    fn looping_disabled_shows_the_pinned_status() {
        let mut rotator = StatusRotator::new();
        let mut rng = StdRng::seed_from_u64(0);

        let pinned = data(&["a"], false, false);
        assert_eq!(rotator.next_status(&pinned, &mut rng).as_deref(), Some("pinned"));

        let mut unpinned = pinned.clone();
        unpinned.status = None;
        assert_eq!(rotator.next_status(&unpinned, &mut rng), None);

        assert_eq!(rotator.next_status(&data(&[], false, true), &mut rng), None);
    }

    #[tokio::test]
    async fn status_list_management() {
        let documents = Arc::new(DocumentService::new(Arc::new(InMemoryDocumentStore::new())));
        let service = PresenceService::new(documents);

        service.add_status("new one").await.unwrap();
        assert!(matches!(
            service.add_status("new one").await,
            Err(StatusError::AlreadyExists)
        ));
        assert_eq!(service.statuses().await.unwrap().len(), 2);

        service.remove_status("new one").await.unwrap();
        assert!(matches!(
            service.remove_status("new one").await,
            Err(StatusError::NotFound)
        ));

        service.set_looping(false).await.unwrap();
        service.pin_status("pinned").await.unwrap();
        assert_eq!(service.next_status().await.unwrap().as_deref(), Some("pinned"));
    }
}
