//! The memoized-produce cache.
//!
//! [`MemoCache`] short-circuits [`produce`] for repeated (state, recipe)
//! pairs. Instances are explicitly constructed and passed around; a
//! process-wide default exists for drop-in use (see
//! [`default_cache`](crate::default_cache)). All internals sit behind one
//! `Mutex`, because the recency list and hash index must move together.

use crate::identity::IdentityRegistry;
use crate::key;
use crate::lru::LruList;
use crate::MemoRecipeFn;
use chisel_state::{produce, Draft, Snapshot, StateResult};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, trace};

/// Configuration for a [`MemoCache`].
#[derive(Clone, Copy, Debug)]
pub struct MemoConfig {
    /// Maximum number of cached snapshots. Values below one are clamped.
    pub capacity: usize,
    /// Entries older than this are treated as absent on lookup (lazily
    /// evicted on access). `None` disables expiry.
    pub ttl: Option<Duration>,
}

impl MemoConfig {
    /// Default capacity of a cache created with `MemoConfig::default()`.
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Config with the given capacity and no TTL.
    pub fn with_capacity(capacity: usize) -> Self {
        MemoConfig {
            capacity,
            ttl: None,
        }
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

impl Default for MemoConfig {
    fn default() -> Self {
        MemoConfig {
            capacity: Self::DEFAULT_CAPACITY,
            ttl: None,
        }
    }
}

/// Per-call options for [`MemoCache::produce_memoized`].
#[derive(Clone, Debug, Default)]
pub struct MemoOptions {
    /// Extra caller-supplied key fragment, e.g. to separate tenants.
    pub cache_key: Option<String>,
    /// Bypass the cache entirely for this call (no lookup, no store, no
    /// stats).
    pub skip_cache: bool,
}

impl MemoOptions {
    /// Options with an explicit cache key fragment.
    pub fn with_cache_key(key: impl Into<String>) -> Self {
        MemoOptions {
            cache_key: Some(key.into()),
            skip_cache: false,
        }
    }

    /// Options that bypass the cache.
    pub fn skip() -> Self {
        MemoOptions {
            cache_key: None,
            skip_cache: true,
        }
    }
}

/// A named recipe usable with the memoized pipeline.
///
/// The name is part of the derived key; the closure's `Arc` allocation is
/// its identity, so clones of one `MemoRecipe` share a cache identity
/// while two separately built recipes do not, even under the same name.
#[derive(Clone)]
pub struct MemoRecipe {
    name: String,
    run: Arc<MemoRecipeFn>,
}

impl MemoRecipe {
    /// Create a named recipe.
    pub fn new(
        name: impl Into<String>,
        recipe: impl Fn(&Draft) -> StateResult<()> + Send + Sync + 'static,
    ) -> Self {
        MemoRecipe {
            name: name.into(),
            run: Arc::new(recipe),
        }
    }

    /// The recipe's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the recipe against a draft.
    pub fn run(&self, draft: &Draft) -> StateResult<()> {
        (self.run)(draft)
    }

    pub(crate) fn func(&self) -> &Arc<MemoRecipeFn> {
        &self.run
    }
}

impl std::fmt::Debug for MemoRecipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoRecipe").field("name", &self.name).finish()
    }
}

/// Observability snapshot of a cache.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CacheStats {
    /// Current number of entries.
    pub size: usize,
    /// Configured maximum number of entries.
    pub capacity: usize,
    /// Hits divided by lookups since creation (or last clear); zero when
    /// nothing was looked up yet.
    pub hit_rate: f64,
}

struct CacheState {
    lru: LruList,
    identities: IdentityRegistry,
    hits: u64,
    lookups: u64,
}

/// LRU cache of produced snapshots, keyed by a deterministic composite key.
///
/// # Examples
///
/// ```
/// use chisel_memo::{MemoCache, MemoConfig, MemoOptions, MemoRecipe};
/// use chisel_state::Snapshot;
/// use serde_json::json;
///
/// let cache = MemoCache::new(MemoConfig::default());
/// let bump = MemoRecipe::new("bump", |d| d.increment("count", 1));
/// let state = Snapshot::from_value(&json!({"count": 0}));
///
/// let first = cache.produce_memoized(&state, &bump, &MemoOptions::default()).unwrap();
/// let second = cache.produce_memoized(&state, &bump, &MemoOptions::default()).unwrap();
///
/// assert_eq!(first, second);
/// assert_eq!(cache.stats().size, 1);
/// assert_eq!(cache.stats().hit_rate, 0.5);
/// ```
pub struct MemoCache {
    state: Mutex<CacheState>,
    ttl: Option<Duration>,
}

impl MemoCache {
    /// Create a cache with the given configuration.
    pub fn new(config: MemoConfig) -> Self {
        MemoCache {
            state: Mutex::new(CacheState {
                lru: LruList::new(config.capacity),
                identities: IdentityRegistry::new(),
                hits: 0,
                lookups: 0,
            }),
            ttl: config.ttl,
        }
    }

    /// Run `recipe` against `state` through the cache.
    ///
    /// On a hit the cached snapshot is returned without re-running the
    /// pipeline; on a miss `produce` runs, its result is stored under the
    /// derived key and returned. A produce failure propagates and nothing
    /// is cached. Lookups and stores themselves never fail.
    pub fn produce_memoized(
        &self,
        state: &Snapshot,
        recipe: &MemoRecipe,
        options: &MemoOptions,
    ) -> StateResult<Snapshot> {
        if options.skip_cache {
            trace!(recipe = recipe.name(), "cache bypassed");
            return produce(state, |d| recipe.run(d));
        }

        let key = self.derive_key(state, recipe, options.cache_key.as_deref());
        if let Some(hit) = self.lookup(&key) {
            debug!(recipe = recipe.name(), "cache hit");
            return Ok(hit);
        }

        debug!(recipe = recipe.name(), "cache miss");
        let produced = produce(state, |d| recipe.run(d))?;
        self.store(key, produced.clone());
        Ok(produced)
    }

    /// Derive the composite key for a (state, recipe, explicit key) tuple.
    ///
    /// Total and deterministic: the same state content, recipe identity and
    /// explicit key always derive the same string.
    pub fn derive_key(
        &self,
        state: &Snapshot,
        recipe: &MemoRecipe,
        explicit: Option<&str>,
    ) -> String {
        let token = self.lock().identities.token_for(recipe.func());
        key::compose(&key::state_key(state), recipe.name(), token, explicit)
    }

    /// Look up a derived key, bumping recency on a hit.
    pub fn lookup(&self, key: &str) -> Option<Snapshot> {
        let ttl = self.ttl;
        let mut state = self.lock();
        state.lookups += 1;
        let hit = state.lru.get(key, ttl);
        if hit.is_some() {
            state.hits += 1;
        }
        hit
    }

    /// Store a snapshot under a derived key, evicting the LRU entry when at
    /// capacity.
    pub fn store(&self, key: String, value: Snapshot) {
        self.lock().lru.insert(key, value);
    }

    /// Drop all cache entries immediately. Hit/lookup counters reset too.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.lru.clear();
        state.hits = 0;
        state.lookups = 0;
    }

    /// Current size, capacity and hit rate.
    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            size: state.lru.len(),
            capacity: state.lru.capacity(),
            hit_rate: if state.lookups == 0 {
                0.0
            } else {
                state.hits as f64 / state.lookups as f64
            },
        }
    }

    // Cache operations must never raise; a poisoned lock is recovered
    // rather than propagated.
    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoCache {
    fn default() -> Self {
        MemoCache::new(MemoConfig::default())
    }
}
