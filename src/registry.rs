//! The zone registry: single owner of every host.
//!
//! The registry holds the global host, one host per configured world, and
//! every region host, keeps the volume index coherent with region bounds,
//! and enforces the naming/priority invariants at mutation time. All
//! setting writes flow through it so the recency stamp and cached bounds
//! stay correct.

use crate::catalog::{ZONE_MAX, ZONE_MIN};
use crate::host::{Host, WorldId};
use crate::index::VolumeIndex;
use crate::setting::{SettingKey, SettingValue};
use crate::spatial::{Aabb, BlockPos};
use std::collections::HashMap;
use std::fmt;

/// Name of the always-present global host.
pub const GLOBAL_HOST: &str = "_global";

/// Upper bound on region count; priorities share the same finite space.
pub const MAX_ZONE_COUNT: u32 = 10_000;

/// Name a world host is registered under.
pub fn world_host_name(world: &str) -> String {
    format!("_world-{}", world.to_ascii_lowercase())
}

/// A zone mutation or lookup was rejected. State is unchanged on error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ZoneError {
    UnknownZone { name: String },
    DuplicateName { name: String },
    ReservedName { name: String },
    NotARegion { name: String },
    TooManyZones { max: u32 },
    PriorityTooLarge { name: String, priority: u32, max: u32 },
    ParentCycle { name: String, parent: String },
    InvalidCorners { min: BlockPos, max: BlockPos },
    ProtectedSetting { key: String, host: String },
    GlobalOnlySetting { key: String, host: String },
    RegionOnlySetting { key: String, host: String },
    TypeMismatch { key: String, expected: &'static str, found: &'static str },
}

impl fmt::Display for ZoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownZone { name } => write!(f, "there is no zone named '{name}'"),
            Self::DuplicateName { name } => {
                write!(f, "a zone named '{name}' already exists")
            }
            Self::ReservedName { name } => write!(
                f,
                "'{name}' is not a valid zone name: names must be non-empty and may not start with '_'"
            ),
            Self::NotARegion { name } => {
                write!(f, "zone '{name}' is not a region and cannot be altered this way")
            }
            Self::TooManyZones { max } => {
                write!(f, "cannot create another zone: the limit is {max}")
            }
            Self::PriorityTooLarge { name, priority, max } => write!(
                f,
                "priority {priority} for zone '{name}' is too large: the maximum is {max}"
            ),
            Self::ParentCycle { name, parent } => write!(
                f,
                "cannot make '{parent}' the parent of '{name}': that would create a cycle"
            ),
            Self::InvalidCorners { min, max } => write!(
                f,
                "invalid zone corners: minimum {min:?} exceeds maximum {max:?} on some axis"
            ),
            Self::ProtectedSetting { key, host } => {
                write!(f, "setting '{key}' cannot be removed from region '{host}'")
            }
            Self::GlobalOnlySetting { key, host } => {
                write!(f, "setting '{key}' may only be assigned on the global host, not '{host}'")
            }
            Self::RegionOnlySetting { key, host } => {
                write!(f, "setting '{key}' may only be assigned on a region, not '{host}'")
            }
            Self::TypeMismatch { key, expected, found } => {
                write!(f, "setting '{key}' expects a {expected} value, got {found}")
            }
        }
    }
}

impl std::error::Error for ZoneError {}

/// Owns the full host collection. See the module docs; the concurrency
/// façade around this lives in [`crate::service`].
pub struct HostRegistry {
    global: Host,
    worlds: HashMap<WorldId, Host>,
    regions: HashMap<String, Host>,
    index: VolumeIndex,
    stamp: u64,
}

impl Default for HostRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRegistry {
    pub fn new() -> Self {
        Self {
            global: Host::new_global(GLOBAL_HOST),
            worlds: HashMap::new(),
            regions: HashMap::new(),
            index: VolumeIndex::new(),
            stamp: 0,
        }
    }

    pub fn global(&self) -> &Host {
        &self.global
    }

    /// The world host for `world`, if it has ever been configured.
    pub fn world(&self, world: &str) -> Option<&Host> {
        self.worlds.get(world)
    }

    /// Materialize the host for a world, creating it on first use.
    /// Returns its registered name.
    pub fn ensure_world(&mut self, world: &str) -> String {
        let name = world_host_name(world);
        self.worlds
            .entry(world.to_string())
            .or_insert_with(|| Host::new_world(&name, world.to_string()));
        name
    }

    /// Case-insensitive lookup across all three host kinds.
    pub fn host(&self, name: &str) -> Result<&Host, ZoneError> {
        let name = name.to_ascii_lowercase();
        if name == GLOBAL_HOST {
            return Ok(&self.global);
        }
        if let Some(host) = self.worlds.values().find(|host| host.name() == name) {
            return Ok(host);
        }
        self.regions
            .get(&name)
            .ok_or(ZoneError::UnknownZone { name })
    }

    fn host_mut(&mut self, name: &str) -> Result<&mut Host, ZoneError> {
        let name = name.to_ascii_lowercase();
        if name == GLOBAL_HOST {
            return Ok(&mut self.global);
        }
        if let Some(world_id) = self
            .worlds
            .iter()
            .find(|(_, host)| host.name() == name)
            .map(|(id, _)| id.clone())
        {
            return Ok(self
                .worlds
                .get_mut(&world_id)
                .expect("world id located above"));
        }
        self.regions
            .get_mut(&name)
            .ok_or(ZoneError::UnknownZone { name })
    }

    fn name_taken(&self, name: &str) -> bool {
        name == GLOBAL_HOST
            || self.worlds.values().any(|host| host.name() == name)
            || self.regions.contains_key(name)
    }

    fn check_region_name(&self, name: &str) -> Result<String, ZoneError> {
        let lowered = name.to_ascii_lowercase();
        if lowered.is_empty() || lowered.starts_with('_') {
            return Err(ZoneError::ReservedName { name: name.to_string() });
        }
        if self.name_taken(&lowered) {
            return Err(ZoneError::DuplicateName { name: lowered });
        }
        Ok(lowered)
    }

    /// Create a region host with the given bounds.
    pub fn create_region(
        &mut self,
        name: &str,
        world: &str,
        bounds: Aabb,
        priority: u32,
    ) -> Result<&Host, ZoneError> {
        let lowered = self.check_region_name(name)?;
        if self.regions.len() as u32 >= MAX_ZONE_COUNT {
            return Err(ZoneError::TooManyZones { max: MAX_ZONE_COUNT });
        }
        if priority > MAX_ZONE_COUNT {
            return Err(ZoneError::PriorityTooLarge {
                name: lowered,
                priority,
                max: MAX_ZONE_COUNT,
            });
        }
        self.ensure_world(world);
        let mut host = Host::new_region(&lowered, world.to_string(), bounds, priority);
        self.stamp += 1;
        host.touch(self.stamp);
        self.index.insert(world, &lowered, bounds);
        log::debug!("created region '{lowered}' in {world} at {bounds:?}");
        Ok(self
            .regions
            .entry(lowered)
            .or_insert(host))
    }

    /// Create a region from two corners in any order (the wand flow).
    pub fn create_region_spanning(
        &mut self,
        name: &str,
        world: &str,
        corner_a: BlockPos,
        corner_b: BlockPos,
        priority: u32,
    ) -> Result<&Host, ZoneError> {
        self.create_region(name, world, Aabb::spanning(corner_a, corner_b), priority)
    }

    /// Remove a region, returning the removed host. Global and world hosts
    /// cannot be removed.
    pub fn remove_region(&mut self, name: &str) -> Result<Host, ZoneError> {
        let lowered = name.to_ascii_lowercase();
        let Some(host) = self.regions.remove(&lowered) else {
            if self.name_taken(&lowered) {
                return Err(ZoneError::NotARegion { name: lowered });
            }
            return Err(ZoneError::UnknownZone { name: lowered });
        };
        if let Some(world) = host.world() {
            self.index.remove(world, &lowered);
        }
        // Children of the removed region fall back to having no parent.
        for other in self.regions.values_mut() {
            if other.parent() == Some(lowered.as_str()) {
                other.set_parent(None);
            }
        }
        self.stamp += 1;
        log::debug!("removed region '{lowered}'");
        Ok(host)
    }

    /// Rename a region. The new name must be free.
    pub fn rename(&mut self, name: &str, new_name: &str) -> Result<(), ZoneError> {
        let lowered = name.to_ascii_lowercase();
        if !self.regions.contains_key(&lowered) {
            if self.name_taken(&lowered) {
                return Err(ZoneError::NotARegion { name: lowered });
            }
            return Err(ZoneError::UnknownZone { name: lowered });
        }
        let new_lowered = self.check_region_name(new_name)?;
        let mut host = self
            .regions
            .remove(&lowered)
            .expect("presence checked above");
        if let Some(world) = host.world() {
            self.index.rename(world, &lowered, &new_lowered);
        }
        host.set_name(&new_lowered);
        self.regions.insert(new_lowered.clone(), host);
        for other in self.regions.values_mut() {
            if other.parent() == Some(lowered.as_str()) {
                other.set_parent(Some(new_lowered.clone()));
            }
        }
        self.stamp += 1;
        Ok(())
    }

    /// Change a region's priority, within the shared priority space.
    pub fn set_priority(&mut self, name: &str, priority: u32) -> Result<(), ZoneError> {
        let lowered = name.to_ascii_lowercase();
        if priority > MAX_ZONE_COUNT {
            return Err(ZoneError::PriorityTooLarge {
                name: lowered,
                priority,
                max: MAX_ZONE_COUNT,
            });
        }
        let Some(host) = self.regions.get_mut(&lowered) else {
            if self.name_taken(&lowered) {
                return Err(ZoneError::NotARegion { name: lowered });
            }
            return Err(ZoneError::UnknownZone { name: lowered });
        };
        host.set_priority(priority);
        self.stamp += 1;
        host.touch(self.stamp);
        Ok(())
    }

    /// Nest a region under another host, or un-nest it with `None`.
    /// Rejects unknown hosts and parent cycles.
    pub fn reparent(&mut self, name: &str, parent: Option<&str>) -> Result<(), ZoneError> {
        let lowered = name.to_ascii_lowercase();
        if !self.regions.contains_key(&lowered) {
            if self.name_taken(&lowered) {
                return Err(ZoneError::NotARegion { name: lowered });
            }
            return Err(ZoneError::UnknownZone { name: lowered });
        }
        let parent = match parent {
            None => None,
            Some(parent_name) => {
                let parent_lowered = parent_name.to_ascii_lowercase();
                self.host(&parent_lowered)?;
                // Walk up from the proposed parent; reaching the child
                // again means a cycle.
                let mut cursor = Some(parent_lowered.clone());
                while let Some(current) = cursor {
                    if current == lowered {
                        return Err(ZoneError::ParentCycle {
                            name: lowered,
                            parent: parent_lowered,
                        });
                    }
                    cursor = self
                        .host(&current)
                        .ok()
                        .and_then(|host| host.parent().map(str::to_string));
                }
                Some(parent_lowered)
            }
        };
        let host = self
            .regions
            .get_mut(&lowered)
            .expect("presence checked above");
        host.set_parent(parent);
        self.stamp += 1;
        host.touch(self.stamp);
        Ok(())
    }

    /// Length of a host's parent chain. Deeper nesting wins priority ties.
    pub fn depth(&self, host: &Host) -> u32 {
        let mut depth = 0;
        let mut cursor = host.parent().map(str::to_string);
        // Cycles are rejected at reparent time; the bound is belt only.
        while let Some(current) = cursor {
            if depth > MAX_ZONE_COUNT {
                break;
            }
            depth += 1;
            cursor = self
                .host(&current)
                .ok()
                .and_then(|parent| parent.parent().map(str::to_string));
        }
        depth
    }

    /// Assign a setting on a host by name. Corner writes keep the volume
    /// index in step with the recomputed bounds.
    pub fn set_setting(
        &mut self,
        host_name: &str,
        key: &SettingKey,
        value: SettingValue,
    ) -> Result<Option<SettingValue>, ZoneError> {
        let next_stamp = self.stamp + 1;
        let host = self.host_mut(host_name)?;
        let previous = host.set(key, value)?;
        host.touch(next_stamp);
        self.stamp = next_stamp;
        if key.id == ZONE_MIN || key.id == ZONE_MAX {
            let host = self.host(host_name).expect("host just mutated");
            if let (Some(world), Some(bounds)) = (host.world(), host.bounds()) {
                let (world, name, bounds) = (world.to_string(), host.name().to_string(), *bounds);
                self.index.update_bounds(&world, &name, bounds);
            }
        }
        Ok(previous)
    }

    /// Drop every assignment on a host. Region corner keys survive.
    pub fn clear_settings(&mut self, host_name: &str) -> Result<(), ZoneError> {
        let next_stamp = self.stamp + 1;
        let host = self.host_mut(host_name)?;
        host.clear();
        host.touch(next_stamp);
        self.stamp = next_stamp;
        Ok(())
    }

    /// Remove a setting assignment from a host by name.
    pub fn unset_setting(
        &mut self,
        host_name: &str,
        key: &SettingKey,
    ) -> Result<Option<SettingValue>, ZoneError> {
        let next_stamp = self.stamp + 1;
        let host = self.host_mut(host_name)?;
        let previous = host.unset(key)?;
        host.touch(next_stamp);
        self.stamp = next_stamp;
        Ok(previous)
    }

    /// Every region whose box contains the point, in no particular order.
    pub fn regions_at(&self, world: &str, pos: BlockPos) -> Vec<&Host> {
        self.index
            .zones_at(world, pos)
            .into_iter()
            .filter_map(|name| self.regions.get(name))
            .collect()
    }

    /// All hosts in deterministic order: global, then worlds, then regions,
    /// each alphabetical. Snapshot/iteration order for persistence.
    pub fn hosts(&self) -> Vec<&Host> {
        let mut out = Vec::with_capacity(1 + self.worlds.len() + self.regions.len());
        out.push(&self.global);
        let mut worlds: Vec<&Host> = self.worlds.values().collect();
        worlds.sort_by(|a, b| a.name().cmp(b.name()));
        out.extend(worlds);
        let mut regions: Vec<&Host> = self.regions.values().collect();
        regions.sort_by(|a, b| a.name().cmp(b.name()));
        out.extend(regions);
        out
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Monotonic mutation counter; bumps on every successful mutation.
    pub fn stamp(&self) -> u64 {
        self.stamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::setting::SettingData;

    fn aabb(min: BlockPos, max: BlockPos) -> Aabb {
        Aabb::new(min, max).unwrap()
    }

    fn registry_with(names: &[&str]) -> HostRegistry {
        let mut registry = HostRegistry::new();
        for (i, name) in names.iter().enumerate() {
            registry
                .create_region(name, "overworld", aabb([0, 0, 0], [10, 10, 10]), i as u32)
                .unwrap();
        }
        registry
    }

    #[test]
    fn names_are_unique_across_host_kinds() {
        let mut registry = registry_with(&["spawn"]);
        let err = registry
            .create_region("SPAWN", "overworld", aabb([0, 0, 0], [1, 1, 1]), 0)
            .unwrap_err();
        assert_eq!(err, ZoneError::DuplicateName { name: "spawn".to_string() });
        assert!(matches!(
            registry.create_region("_global", "overworld", aabb([0, 0, 0], [1, 1, 1]), 0),
            Err(ZoneError::ReservedName { .. })
        ));
        assert!(matches!(
            registry.create_region("_world-overworld", "overworld", aabb([0, 0, 0], [1, 1, 1]), 0),
            Err(ZoneError::ReservedName { .. })
        ));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = registry_with(&["Spawn"]);
        assert_eq!(registry.host("sPaWn").unwrap().name(), "spawn");
        assert!(registry.host("elsewhere").is_err());
    }

    #[test]
    fn priority_bound_is_enforced() {
        let mut registry = registry_with(&["spawn"]);
        assert!(matches!(
            registry.set_priority("spawn", MAX_ZONE_COUNT + 1),
            Err(ZoneError::PriorityTooLarge { .. })
        ));
        registry.set_priority("spawn", MAX_ZONE_COUNT).unwrap();
        assert_eq!(registry.host("spawn").unwrap().priority(), MAX_ZONE_COUNT);
    }

    #[test]
    fn rename_updates_index_and_children() {
        let mut registry = registry_with(&["outer", "inner"]);
        registry.reparent("inner", Some("outer")).unwrap();
        assert!(matches!(
            registry.rename("outer", "inner"),
            Err(ZoneError::DuplicateName { .. })
        ));
        registry.rename("outer", "ring").unwrap();
        assert_eq!(registry.host("ring").unwrap().name(), "ring");
        assert!(registry.host("outer").is_err());
        assert_eq!(registry.host("inner").unwrap().parent(), Some("ring"));
        let found = registry.regions_at("overworld", [5, 5, 5]);
        assert!(found.iter().any(|host| host.name() == "ring"));
    }

    #[test]
    fn reparent_rejects_cycles() {
        let mut registry = registry_with(&["a", "b", "c"]);
        registry.reparent("b", Some("a")).unwrap();
        registry.reparent("c", Some("b")).unwrap();
        assert!(matches!(
            registry.reparent("a", Some("c")),
            Err(ZoneError::ParentCycle { .. })
        ));
        assert!(matches!(
            registry.reparent("a", Some("a")),
            Err(ZoneError::ParentCycle { .. })
        ));
        // Failed reparent leaves state unchanged.
        assert_eq!(registry.host("a").unwrap().parent(), None);
        assert_eq!(registry.depth(registry.host("c").unwrap()), 2);
    }

    #[test]
    fn removing_a_region_unindexes_it_and_orphans_children() {
        let mut registry = registry_with(&["outer", "inner"]);
        registry.reparent("inner", Some("outer")).unwrap();
        registry.remove_region("outer").unwrap();
        assert!(registry.host("outer").is_err());
        assert_eq!(registry.host("inner").unwrap().parent(), None);
        let found = registry.regions_at("overworld", [5, 5, 5]);
        assert_eq!(found.len(), 1);
        assert!(matches!(
            registry.remove_region("_global"),
            Err(ZoneError::NotARegion { .. })
        ));
    }

    #[test]
    fn corner_write_moves_the_region_in_the_index() {
        let mut registry = registry_with(&["spawn"]);
        let key = catalog::lookup(catalog::ZONE_MAX).unwrap();
        registry
            .set_setting(
                "spawn",
                key,
                SettingValue::unrestricted(SettingData::Vec3([100, 10, 100])),
            )
            .unwrap();
        assert!(registry.regions_at("overworld", [50, 5, 50]).len() == 1);
        assert_eq!(
            registry.host("spawn").unwrap().bounds(),
            Some(&aabb([0, 0, 0], [100, 10, 100]))
        );
    }

    #[test]
    fn setting_writes_bump_the_recency_stamp() {
        let mut registry = registry_with(&["a", "b"]);
        let key = catalog::lookup("block-break").unwrap();
        registry
            .set_setting("a", key, SettingValue::unrestricted(SettingData::State(false)))
            .unwrap();
        registry
            .set_setting("b", key, SettingValue::unrestricted(SettingData::State(true)))
            .unwrap();
        let a = registry.host("a").unwrap().stamp();
        let b = registry.host("b").unwrap().stamp();
        assert!(b > a);
    }

    #[test]
    fn clear_drops_assignments_but_keeps_region_corners() {
        let mut registry = registry_with(&["spawn"]);
        let key = catalog::lookup("block-break").unwrap();
        registry
            .set_setting("spawn", key, SettingValue::unrestricted(SettingData::State(false)))
            .unwrap();
        registry.clear_settings("spawn").unwrap();
        let spawn = registry.host("spawn").unwrap();
        assert!(!spawn.has(key));
        assert!(spawn.has(catalog::lookup(catalog::ZONE_MIN).unwrap()));
        assert_eq!(spawn.bounds(), Some(&aabb([0, 0, 0], [10, 10, 10])));
    }

    #[test]
    fn failed_mutation_leaves_state_unchanged() {
        let mut registry = registry_with(&["spawn"]);
        let stamp = registry.stamp();
        let key = catalog::lookup("block-break").unwrap();
        assert!(registry
            .set_setting("spawn", key, SettingValue::unrestricted(SettingData::Int(3)))
            .is_err());
        assert_eq!(registry.stamp(), stamp);
        assert!(!registry.host("spawn").unwrap().has(key));
    }
}
