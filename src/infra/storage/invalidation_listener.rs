// Background task that applies cross-process cache invalidations.
//
// The database trigger publishes a payload for every row changed outside the
// bot. Each one evicts the matching cache entry. While the connection is down
// notifications are lost, so the whole cache is cleared whenever it drops.

use crate::core::storage::{DocumentService, StoreError, INVALIDATION_CHANNEL};
use sqlx::postgres::{PgListener, PgPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct InvalidationListener {
    listener: PgListener,
    documents: Arc<DocumentService>,
}

impl InvalidationListener {
    /// Open a dedicated connection and subscribe to the invalidation channel.
    pub async fn connect(pool: &PgPool, documents: Arc<DocumentService>) -> Result<Self, StoreError> {
        let mut listener = PgListener::connect_with(pool)
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        listener
            .listen(INVALIDATION_CHANNEL)
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        tracing::info!("Started listening for cache invalidation events");
        Ok(Self {
            listener,
            documents,
        })
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        loop {
            match self.listener.try_recv().await {
                Ok(Some(notification)) => {
                    if let Err(e) = self.documents.handle_invalidation(notification.payload()) {
                        tracing::error!("Error handling cache invalidation: {}", e);
                    }
                }
                Ok(None) => {
                    // PgListener reconnects and re-subscribes on the next call.
                    tracing::warn!("Invalidation listener lost its connection, clearing cache");
                    self.documents.clear_cache();
                }
                Err(e) => {
                    tracing::error!("Invalidation listener failed: {}", e);
                    self.documents.clear_cache();
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }
}
