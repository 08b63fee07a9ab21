//! `ZoneService`: the single-writer/concurrent-reader shell around the
//! registry.
//!
//! Resolutions take the read lock and run fully in parallel; every
//! mutation takes the write lock, applies, and invalidates the affected
//! cache slice before the lock drops, so no reader can observe a stale
//! value after a mutation completes. Snapshot reads hold the read lock for
//! the whole walk and are therefore atomic with respect to mutation.

use crate::catalog::{self, CACHE_SIZE};
use crate::persist::{self, LoadReport, ZoneDescriptor};
use crate::registry::{HostRegistry, ZoneError, GLOBAL_HOST};
use crate::resolve::{self, Resolution, ResolutionCache};
use crate::setting::{SettingData, SettingKey, SettingValue};
use crate::spatial::BlockPos;
use crate::target::Actor;
use std::sync::RwLock;

pub struct ZoneService {
    registry: RwLock<HostRegistry>,
    cache: ResolutionCache,
}

impl Default for ZoneService {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneService {
    pub fn new() -> Self {
        Self::with_registry(HostRegistry::new())
    }

    pub fn with_registry(registry: HostRegistry) -> Self {
        let capacity = cache_capacity_of(&registry);
        Self {
            registry: RwLock::new(registry),
            cache: ResolutionCache::new(capacity),
        }
    }

    /// The effective value of `key` at a point, for an optional actor.
    /// Total; the hot path for every event callback.
    pub fn resolve(
        &self,
        key: &SettingKey,
        world: &str,
        pos: BlockPos,
        actor: Option<&Actor<'_>>,
    ) -> SettingData {
        if let Some(hit) = self.cache.lookup(world, pos, key) {
            return hit;
        }
        let registry = self.registry.read().expect("registry lock poisoned");
        let resolution = resolve::resolve_detailed(&registry, key, world, pos, actor);
        // Target-restricted outcomes depend on the asking actor and stay
        // uncached.
        if !resolution.actor_sensitive {
            self.cache.store(world, pos, key, resolution.data.clone());
        }
        resolution.data
    }

    /// Resolve with source-host context; bypasses the cache.
    pub fn resolve_detailed(
        &self,
        key: &SettingKey,
        world: &str,
        pos: BlockPos,
        actor: Option<&Actor<'_>>,
    ) -> Resolution {
        let registry = self.registry.read().expect("registry lock poisoned");
        resolve::resolve_detailed(&registry, key, world, pos, actor)
    }

    /// The raw assignment of `key` on one named host, no spatial walk.
    pub fn assignment(
        &self,
        host: &str,
        key: &SettingKey,
    ) -> Result<Option<SettingValue>, ZoneError> {
        let registry = self.registry.read().expect("registry lock poisoned");
        Ok(registry.host(host)?.get(key).cloned())
    }

    pub fn create_region(
        &self,
        name: &str,
        world: &str,
        corner_a: BlockPos,
        corner_b: BlockPos,
        priority: u32,
    ) -> Result<(), ZoneError> {
        let mut registry = self.registry.write().expect("registry lock poisoned");
        registry.create_region_spanning(name, world, corner_a, corner_b, priority)?;
        self.cache.invalidate_world(world);
        Ok(())
    }

    pub fn remove_region(&self, name: &str) -> Result<(), ZoneError> {
        let mut registry = self.registry.write().expect("registry lock poisoned");
        let removed = registry.remove_region(name)?;
        match removed.world() {
            Some(world) => self.cache.invalidate_world(world),
            None => self.cache.invalidate_all(),
        }
        Ok(())
    }

    pub fn rename(&self, name: &str, new_name: &str) -> Result<(), ZoneError> {
        let mut registry = self.registry.write().expect("registry lock poisoned");
        registry.rename(name, new_name)
        // Resolved values do not depend on names; the cache stays warm.
    }

    /// Priority reaches across worlds through parents, so invalidate
    /// everything.
    pub fn set_priority(&self, name: &str, priority: u32) -> Result<(), ZoneError> {
        let mut registry = self.registry.write().expect("registry lock poisoned");
        registry.set_priority(name, priority)?;
        self.cache.invalidate_all();
        Ok(())
    }

    pub fn reparent(&self, name: &str, parent: Option<&str>) -> Result<(), ZoneError> {
        let mut registry = self.registry.write().expect("registry lock poisoned");
        registry.reparent(name, parent)?;
        self.cache.invalidate_all();
        Ok(())
    }

    pub fn set_setting(
        &self,
        host: &str,
        key: &SettingKey,
        value: SettingValue,
    ) -> Result<Option<SettingValue>, ZoneError> {
        let mut registry = self.registry.write().expect("registry lock poisoned");
        let previous = registry.set_setting(host, key, value)?;
        self.after_setting_write(&registry, host, key);
        Ok(previous)
    }

    pub fn unset_setting(
        &self,
        host: &str,
        key: &SettingKey,
    ) -> Result<Option<SettingValue>, ZoneError> {
        let mut registry = self.registry.write().expect("registry lock poisoned");
        let previous = registry.unset_setting(host, key)?;
        self.after_setting_write(&registry, host, key);
        Ok(previous)
    }

    /// Drop every assignment on a host (corner keys survive on regions).
    pub fn clear_settings(&self, host: &str) -> Result<(), ZoneError> {
        let mut registry = self.registry.write().expect("registry lock poisoned");
        registry.clear_settings(host)?;
        match registry.host(host).ok().and_then(|h| h.world()) {
            Some(world) => self.cache.invalidate_world(world),
            None => self.cache.invalidate_all(),
        }
        Ok(())
    }

    fn after_setting_write(&self, registry: &HostRegistry, host: &str, key: &SettingKey) {
        match registry.host(host).ok().and_then(|h| h.world()) {
            Some(world) => self.cache.invalidate_world(world),
            None => self.cache.invalidate_all(),
        }
        if key.id == CACHE_SIZE {
            self.cache.set_capacity(cache_capacity_of(registry));
        }
    }

    /// Atomic serializable view of every host.
    pub fn snapshot(&self) -> Vec<ZoneDescriptor> {
        let registry = self.registry.read().expect("registry lock poisoned");
        persist::snapshot(&registry)
    }

    /// Replace the whole registry with a restored snapshot.
    pub fn restore(&self, descriptors: &[ZoneDescriptor]) -> LoadReport {
        let (restored, report) = persist::restore(descriptors);
        let capacity = cache_capacity_of(&restored);
        let mut registry = self.registry.write().expect("registry lock poisoned");
        *registry = restored;
        self.cache.invalidate_all();
        self.cache.set_capacity(capacity);
        report
    }

    /// Run a closure against a consistent read snapshot of the registry,
    /// for inspection surfaces that need more than one query.
    pub fn inspect<R>(&self, f: impl FnOnce(&HostRegistry) -> R) -> R {
        let registry = self.registry.read().expect("registry lock poisoned");
        f(&registry)
    }
}

/// The operational cache capacity: the global host's `cache-size`
/// assignment, falling back to the catalog default.
fn cache_capacity_of(registry: &HostRegistry) -> usize {
    let key = catalog::lookup(CACHE_SIZE).expect("cache-size is a built-in key");
    let configured = registry
        .host(GLOBAL_HOST)
        .ok()
        .map(|global| global.data_for(key, None))
        .and_then(|data| data.as_int())
        .unwrap_or(0);
    usize::try_from(configured).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::Aabb;

    // The service is shared across event threads behind an Arc; resolution
    // only needs &self.
    #[test]
    fn service_is_shareable_across_threads() {
        fn assert_sync<T: Sync + Send>() {}
        assert_sync::<ZoneService>();
    }

    #[test]
    fn cache_size_setting_drives_capacity() {
        let service = ZoneService::new();
        let key = catalog::lookup(CACHE_SIZE).unwrap();
        // Catalog default applies before any assignment.
        let default = key.default.as_int().unwrap() as usize;
        service
            .create_region("spawn", "overworld", [0, 0, 0], [10, 10, 10], 1)
            .unwrap();
        let block_break = catalog::lookup("block-break").unwrap();
        service.resolve(block_break, "overworld", [5, 5, 5], None);
        service.inspect(|registry| assert_eq!(registry.region_count(), 1));
        assert_eq!(default, 75000);

        service
            .set_setting(
                crate::registry::GLOBAL_HOST,
                key,
                SettingValue::unrestricted(SettingData::Int(0)),
            )
            .unwrap();
        // Capacity 0 disables caching entirely.
        service.resolve(block_break, "overworld", [5, 5, 5], None);
        service.resolve(block_break, "overworld", [5, 5, 5], None);
    }

    #[test]
    fn region_corners_may_arrive_in_any_order() {
        let service = ZoneService::new();
        service
            .create_region("spawn", "overworld", [10, 64, 10], [-10, 0, -10], 1)
            .unwrap();
        let bounds = service.inspect(|registry| *registry.host("spawn").unwrap().bounds().unwrap());
        assert_eq!(bounds, Aabb::new([-10, 0, -10], [10, 64, 10]).unwrap());
    }
}
