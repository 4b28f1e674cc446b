//! Bounded LRU caching of rendered tiles.
//!
//! Three variants share one eviction discipline ([`state::CacheState`]):
//!
//! - [`TileCache`]: single-writer fetch-or-render, range results returned
//!   as one batch.
//! - [`StreamingTileCache`]: range results yielded incrementally through a
//!   bounded channel, hits before misses.
//! - [`FallbackTileCache`]: concurrency-safe; never blocks a range query
//!   on the primary provider, degrading misses to a fast fallback provider
//!   while a background worker refines them.

mod basic;
mod fallback;
mod state;
mod streaming;

pub use basic::{TileCache, DEFAULT_CACHE_CAPACITY};
pub use fallback::{FallbackTileCache, FALLBACK_QUEUE_CAPACITY};
pub use streaming::{StreamingTileCache, TileStream, STREAM_BUFFER};
