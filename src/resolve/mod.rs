//! The resolution engine and its cache.
//!
//! `resolve` computes the single effective value of a setting at a block
//! position: global host, world host, and every region containing the
//! point compete, and exactly one assignment wins. It is a total function —
//! when nothing matches, the key's default is the answer.

use crate::host::Host;
use crate::registry::HostRegistry;
use crate::setting::{SettingData, SettingKey};
use crate::spatial::{BlockPos, CacheCoord};
use crate::target::Actor;
use std::collections::HashMap;
use std::sync::Mutex;

/// Outcome of a resolution, with enough context for administrative "where
/// did this value come from" queries.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub data: SettingData,
    /// Name of the winning host; `None` when the default applied.
    pub source: Option<String>,
    /// True when some candidate assignment carried a target restriction,
    /// making the outcome depend on which actor asked.
    pub actor_sensitive: bool,
}

/// Resolve with full context: collect candidates, filter to hosts assigning
/// the key, target-filter when an actor is given, then pick the single
/// winner by (scope tier + priority, nesting depth, recency).
pub fn resolve_detailed(
    registry: &HostRegistry,
    key: &SettingKey,
    world: &str,
    pos: BlockPos,
    actor: Option<&Actor<'_>>,
) -> Resolution {
    let mut candidates: Vec<&Host> = Vec::new();
    candidates.push(registry.global());
    if let Some(world_host) = registry.world(world) {
        candidates.push(world_host);
    }
    candidates.extend(registry.regions_at(world, pos));

    let mut actor_sensitive = false;
    let mut winner: Option<(&Host, u32)> = None;
    for host in candidates {
        let Some(value) = host.get(key) else {
            continue;
        };
        if !value.target.is_unrestricted() {
            actor_sensitive = true;
        }
        if let Some(actor) = actor {
            if !value.target.test(actor) {
                continue;
            }
        }
        let depth = registry.depth(host);
        let better = match winner {
            None => true,
            Some((current, current_depth)) => {
                let lhs = (host.effective_priority(), depth, host.stamp());
                let rhs = (
                    current.effective_priority(),
                    current_depth,
                    current.stamp(),
                );
                lhs > rhs
            }
        };
        if better {
            winner = Some((host, depth));
        }
    }

    match winner {
        Some((host, _)) => Resolution {
            data: host
                .get(key)
                .map(|value| value.data.clone())
                .unwrap_or_else(|| key.default.clone()),
            source: Some(host.name().to_string()),
            actor_sensitive,
        },
        None => Resolution {
            data: key.default.clone(),
            source: None,
            actor_sensitive,
        },
    }
}

/// Resolve to the bare effective value. Never fails.
pub fn resolve(
    registry: &HostRegistry,
    key: &SettingKey,
    world: &str,
    pos: BlockPos,
    actor: Option<&Actor<'_>>,
) -> SettingData {
    resolve_detailed(registry, key, world, pos, actor).data
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    world: String,
    coord: CacheCoord,
    setting: &'static str,
}

#[derive(Clone, Debug)]
struct CacheSlot {
    data: SettingData,
    last_used: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    capacity: usize,
    tick: u64,
    entries: HashMap<CacheKey, CacheSlot>,
}

/// Bounded memo of resolved values keyed by (world, quantized position,
/// setting id).
///
/// Entries are only ever written for outcomes with no target-restricted
/// candidate in play, so a hit is valid for any actor and for actor-less
/// queries alike. Eviction is least-recently-used in batches; the cache is
/// a pure throughput optimization over a deterministic function, so the
/// policy only affects hit rate, never answers.
#[derive(Debug)]
pub struct ResolutionCache {
    inner: Mutex<CacheInner>,
}

impl ResolutionCache {
    /// `capacity` 0 disables caching entirely.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                capacity,
                tick: 0,
                entries: HashMap::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").capacity
    }

    /// Resize the cache; shrinking drops everything rather than picking
    /// survivors.
    pub fn set_capacity(&self, capacity: usize) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        if capacity < inner.entries.len() {
            inner.entries.clear();
        }
        inner.capacity = capacity;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lookup(&self, world: &str, pos: BlockPos, key: &SettingKey) -> Option<SettingData> {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        if inner.capacity == 0 {
            return None;
        }
        inner.tick += 1;
        let tick = inner.tick;
        let cache_key = CacheKey {
            world: world.to_string(),
            coord: CacheCoord::from_pos(pos),
            setting: key.id,
        };
        let slot = inner.entries.get_mut(&cache_key)?;
        slot.last_used = tick;
        Some(slot.data.clone())
    }

    pub fn store(&self, world: &str, pos: BlockPos, key: &SettingKey, data: SettingData) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        if inner.capacity == 0 {
            return;
        }
        inner.tick += 1;
        let tick = inner.tick;
        if inner.entries.len() >= inner.capacity {
            evict_stalest(&mut inner);
        }
        inner.entries.insert(
            CacheKey {
                world: world.to_string(),
                coord: CacheCoord::from_pos(pos),
                setting: key.id,
            },
            CacheSlot {
                data,
                last_used: tick,
            },
        );
    }

    /// Conservative whole-world invalidation on any zone mutation in that
    /// world.
    pub fn invalidate_world(&self, world: &str) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.entries.retain(|key, _| key.world != world);
    }

    /// Invalidate everything; used for global-host, parent, and priority
    /// mutations whose reach is not world-local.
    pub fn invalidate_all(&self) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.entries.clear();
    }
}

/// Drop the least-recently-used eighth (at least one entry) so inserts do
/// not pay a full scan every time once the cache is warm.
fn evict_stalest(inner: &mut CacheInner) {
    let mut stamps: Vec<u64> = inner.entries.values().map(|slot| slot.last_used).collect();
    stamps.sort_unstable();
    let drop_count = (inner.entries.len() / 8).max(1);
    let threshold = stamps[drop_count - 1];
    inner.entries.retain(|_, slot| slot.last_used > threshold);
}
