//! Memoized produce on top of [`chisel_state`].
//!
//! Running the same recipe over the same state always yields the same
//! snapshot, so the result can be cached. [`MemoCache`] derives a
//! deterministic composite key from the state content, the recipe's name
//! and identity, and an optional caller-supplied fragment, then serves
//! repeats from a bounded LRU store with optional TTL expiry.
//!
//! Caching is transparent: a hit and a miss return equal snapshots, and a
//! cache problem can never fail a produce call that would otherwise have
//! succeeded.
//!
//! ```
//! use chisel_memo::{MemoCache, MemoConfig, MemoOptions, MemoRecipe};
//! use chisel_state::Snapshot;
//! use serde_json::json;
//!
//! let cache = MemoCache::new(MemoConfig::default());
//! let bump = MemoRecipe::new("bump", |d| d.increment("count", 1));
//! let state = Snapshot::from_value(&json!({"count": 41}));
//!
//! let first = cache.produce_memoized(&state, &bump, &MemoOptions::default()).unwrap();
//! // Served from the cache without re-running the recipe.
//! let second = cache.produce_memoized(&state, &bump, &MemoOptions::default()).unwrap();
//!
//! assert!(first == json!({"count": 42}));
//! assert_eq!(first, second);
//! assert_eq!(cache.stats().size, 1);
//! ```

use chisel_state::{Draft, Snapshot, StateResult};
use std::sync::OnceLock;

mod cache;
mod identity;
mod key;
mod lru;

pub use cache::{CacheStats, MemoCache, MemoConfig, MemoOptions, MemoRecipe};

/// Boxed recipe signature used by [`MemoRecipe`].
pub type MemoRecipeFn = dyn Fn(&Draft) -> StateResult<()> + Send + Sync;

static DEFAULT_CACHE: OnceLock<MemoCache> = OnceLock::new();

/// The process-wide default cache (default configuration, created on first
/// use).
pub fn default_cache() -> &'static MemoCache {
    DEFAULT_CACHE.get_or_init(MemoCache::default)
}

/// Run `recipe` against `state` through the process-wide default cache.
pub fn produce_memoized(
    state: &Snapshot,
    recipe: &MemoRecipe,
    options: &MemoOptions,
) -> StateResult<Snapshot> {
    default_cache().produce_memoized(state, recipe, options)
}

/// Drop all entries from the process-wide default cache.
pub fn clear_cache() {
    default_cache().clear();
}

/// Stats of the process-wide default cache.
pub fn cache_stats() -> CacheStats {
    default_cache().stats()
}
