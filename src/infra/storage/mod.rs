// Document store backends and the invalidation listener.

pub mod in_memory_store;
pub mod invalidation_listener;
pub mod postgres_store;

pub use in_memory_store::InMemoryDocumentStore;
pub use invalidation_listener::InvalidationListener;
pub use postgres_store::PgDocumentStore;
