// Document storage - typed documents, the persistence port and the cache in front of it.

pub mod bot_cache;
pub mod document_service;
pub mod document_store;
pub mod documents;
pub mod invalidation;
pub mod ttl_cache;

pub use bot_cache::BotCache;
pub use document_service::DocumentService;
pub use document_store::{DocumentKey, DocumentStore, StoreError};
pub use documents::*;
pub use invalidation::{CacheInvalidation, InvalidationError, INVALIDATION_CHANNEL};
