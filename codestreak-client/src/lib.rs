//! Client-side relationship and streak engine.
//!
//! Screens read immutable snapshots from a [`Store`]. The [`SyncOrchestrator`]
//! fills the friends store with a fail-soft fan-out, [`FriendsController`]
//! runs every action as an optimistic mutation with rollback, and
//! [`SearchDebouncer`] rate-limits user search.

pub mod cache;
pub mod config;
pub mod error;
pub mod friends;
pub mod gateway;
pub mod mutation;
pub mod profile;
pub mod search;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod fake;

pub use cache::{CacheKey, MemoryCache, ResponseCache, ResponseCacheExt, SledCache};
pub use config::ClientConfig;
pub use error::GatewayError;
pub use friends::FriendsController;
pub use gateway::http::HttpGateway;
pub use gateway::RemoteGateway;
pub use mutation::{Mutation, MutationEngine, MutationOutcome, PendingMutation};
pub use profile::ProfileLoader;
pub use search::SearchDebouncer;
pub use store::{Store, Subscription};
pub use sync::SyncOrchestrator;
