//! Process-local state for the status service: the status cache, rate
//! limiters and request deduplicator, all built on the [`Store`] abstraction.

mod cache;
mod dedup;
mod models;
mod rate_limit;
mod store;

pub use cache::{CacheConfig, StatusCache};
pub use dedup::{PendingRequest, REQUEST_TIMEOUT, RequestDeduplicator};
pub use models::{
  CacheEntry, Diagnostics, Edition, MotdLines, PlayerEntry, Players, Protocol, RateLimitEntry,
  ServerAddress, ServerStatus,
};
pub use rate_limit::{
  ClientCooldown, HOSTNAME_IDLE_MS, LimitReason, RateLimitConfig, RateLimited, RateLimiter,
  WINDOW_MS,
};
pub use store::{MemoryStore, Mutation, Store};
