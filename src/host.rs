use crate::catalog::{ZONE_MAX, ZONE_MIN};
use crate::registry::ZoneError;
use crate::setting::{SettingData, SettingKey, SettingValue};
use crate::spatial::Aabb;
use crate::target::Actor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a game world. Worlds themselves are owned by the engine;
/// the core only tags hosts and queries with their id.
pub type WorldId = String;

/// Where a host applies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostScope {
    /// Every point in every world. Singleton, always present.
    Global,
    /// Every point in one world.
    World { world: WorldId },
    /// A bounded box in one world. The bounds are derived from the
    /// `zone-min`/`zone-max` assignments and cached here.
    Region { world: WorldId, bounds: Aabb },
}

/// Priority tier ordering across scope kinds: any world host outranks the
/// global host, and any region outranks both. Within regions the
/// operator-assigned priority decides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct EffectivePriority {
    tier: u8,
    priority: u32,
}

/// A named, prioritized container of setting assignments.
#[derive(Clone, Debug)]
pub struct Host {
    name: String,
    priority: u32,
    parent: Option<String>,
    settings: BTreeMap<String, SettingValue>,
    scope: HostScope,
    /// Registry mutation counter at the last settings write; the final
    /// resolution tie-break.
    stamp: u64,
}

impl Host {
    pub(crate) fn new_global(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            priority: 0,
            parent: None,
            settings: BTreeMap::new(),
            scope: HostScope::Global,
            stamp: 0,
        }
    }

    pub(crate) fn new_world(name: &str, world: WorldId) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            priority: 0,
            parent: None,
            settings: BTreeMap::new(),
            scope: HostScope::World { world },
            stamp: 0,
        }
    }

    /// Region constructor: seeds the corner assignments the bounds are
    /// derived from, exactly as an operator-created zone would carry them.
    pub(crate) fn new_region(name: &str, world: WorldId, bounds: Aabb, priority: u32) -> Self {
        let mut settings = BTreeMap::new();
        settings.insert(
            ZONE_MIN.to_string(),
            SettingValue::unrestricted(SettingData::Vec3(bounds.min)),
        );
        settings.insert(
            ZONE_MAX.to_string(),
            SettingValue::unrestricted(SettingData::Vec3(bounds.max)),
        );
        Self {
            name: name.to_ascii_lowercase(),
            priority,
            parent: None,
            settings,
            scope: HostScope::Region { world, bounds },
            stamp: 0,
        }
    }

    /// Host names are case-insensitive and stored lowercase.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_ascii_lowercase();
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub(crate) fn set_priority(&mut self, priority: u32) {
        self.priority = priority;
    }

    pub fn effective_priority(&self) -> EffectivePriority {
        let tier = match self.scope {
            HostScope::Global => 0,
            HostScope::World { .. } => 1,
            HostScope::Region { .. } => 2,
        };
        EffectivePriority {
            tier,
            priority: self.priority,
        }
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub(crate) fn set_parent(&mut self, parent: Option<String>) {
        self.parent = parent.map(|p| p.to_ascii_lowercase());
    }

    pub fn scope(&self) -> &HostScope {
        &self.scope
    }

    pub fn is_region(&self) -> bool {
        matches!(self.scope, HostScope::Region { .. })
    }

    /// The world this host is bound to, if any.
    pub fn world(&self) -> Option<&str> {
        match &self.scope {
            HostScope::Global => None,
            HostScope::World { world } | HostScope::Region { world, .. } => Some(world),
        }
    }

    /// Cached bounds; present only on region hosts.
    pub fn bounds(&self) -> Option<&Aabb> {
        match &self.scope {
            HostScope::Region { bounds, .. } => Some(bounds),
            _ => None,
        }
    }

    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    pub(crate) fn touch(&mut self, stamp: u64) {
        self.stamp = stamp;
    }

    /// Does this host contain the point? Global contains everything; a world
    /// host contains every point of its world; a region checks its box.
    pub fn encompasses(&self, world: &str, pos: crate::spatial::BlockPos) -> bool {
        match &self.scope {
            HostScope::Global => true,
            HostScope::World { world: w } => w == world,
            HostScope::Region { world: w, bounds } => w == world && bounds.contains(pos),
        }
    }

    /// Assign a value for a key, returning the previous assignment.
    ///
    /// Corner keys are only assignable on regions and recompute the cached
    /// bounds; global-only keys are only assignable on the global host.
    pub(crate) fn set(
        &mut self,
        key: &SettingKey,
        value: SettingValue,
    ) -> Result<Option<SettingValue>, ZoneError> {
        if !key.accepts(&value.data) {
            return Err(ZoneError::TypeMismatch {
                key: key.id.to_string(),
                expected: key.ty.name(),
                found: value.data.shape_name(),
            });
        }
        if key.global && !matches!(self.scope, HostScope::Global) {
            return Err(ZoneError::GlobalOnlySetting {
                key: key.id.to_string(),
                host: self.name.clone(),
            });
        }
        if key.id == ZONE_MIN || key.id == ZONE_MAX {
            if !self.is_region() {
                return Err(ZoneError::RegionOnlySetting {
                    key: key.id.to_string(),
                    host: self.name.clone(),
                });
            }
            let previous = self.settings.insert(key.id.to_string(), value);
            self.recompute_bounds();
            return Ok(previous);
        }
        Ok(self.settings.insert(key.id.to_string(), value))
    }

    /// Remove an assignment, returning it. Corner keys on a region are
    /// protected and cannot be unset.
    pub(crate) fn unset(&mut self, key: &SettingKey) -> Result<Option<SettingValue>, ZoneError> {
        if self.is_region() && (key.id == ZONE_MIN || key.id == ZONE_MAX) {
            return Err(ZoneError::ProtectedSetting {
                key: key.id.to_string(),
                host: self.name.clone(),
            });
        }
        Ok(self.settings.remove(key.id))
    }

    /// Drop every assignment except protected corner keys.
    pub(crate) fn clear(&mut self) {
        if self.is_region() {
            self.settings
                .retain(|id, _| id == ZONE_MIN || id == ZONE_MAX);
        } else {
            self.settings.clear();
        }
    }

    /// The raw assignment for a key on this host, regardless of target.
    /// Administrative inspection; no spatial walk.
    pub fn get(&self, key: &SettingKey) -> Option<&SettingValue> {
        self.settings.get(key.id)
    }

    pub fn has(&self, key: &SettingKey) -> bool {
        self.settings.contains_key(key.id)
    }

    /// The effective data of a key considering only this host: the
    /// assignment if present (and matching the actor, when one is given),
    /// else the key's default.
    pub fn data_for(&self, key: &SettingKey, actor: Option<&Actor<'_>>) -> SettingData {
        self.settings
            .get(key.id)
            .filter(|value| actor.map_or(true, |actor| value.target.test(actor)))
            .map(|value| value.data.clone())
            .unwrap_or_else(|| key.default.clone())
    }

    /// All assignments on this host, in id order.
    pub fn settings(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.settings.iter().map(|(id, value)| (id.as_str(), value))
    }

    pub fn setting_count(&self) -> usize {
        self.settings.len()
    }

    /// Recompute the cached bounds from the corner assignments. Never done
    /// lazily per query; callers invoke this on corner writes.
    fn recompute_bounds(&mut self) {
        let min = self
            .settings
            .get(ZONE_MIN)
            .and_then(|value| value.data.as_vec3());
        let max = self
            .settings
            .get(ZONE_MAX)
            .and_then(|value| value.data.as_vec3());
        if let (Some(min), Some(max), HostScope::Region { bounds, .. }) =
            (min, max, &mut self.scope)
        {
            *bounds = Aabb::spanning(min, max);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    fn region() -> Host {
        let bounds = Aabb::new([0, 0, 0], [10, 10, 10]).unwrap();
        Host::new_region("Spawn", "overworld".to_string(), bounds, 5)
    }

    #[test]
    fn names_are_stored_lowercase() {
        assert_eq!(region().name(), "spawn");
    }

    #[test]
    fn region_seeds_corner_assignments() {
        let host = region();
        let min = host.get(catalog::lookup(catalog::ZONE_MIN).unwrap()).unwrap();
        assert_eq!(min.data, SettingData::Vec3([0, 0, 0]));
        let max = host.get(catalog::lookup(catalog::ZONE_MAX).unwrap()).unwrap();
        assert_eq!(max.data, SettingData::Vec3([10, 10, 10]));
    }

    #[test]
    fn corner_write_recomputes_cached_bounds() {
        let mut host = region();
        let key = catalog::lookup(catalog::ZONE_MAX).unwrap();
        host.set(key, SettingValue::unrestricted(SettingData::Vec3([20, 30, 40])))
            .unwrap();
        assert_eq!(host.bounds(), Some(&Aabb::new([0, 0, 0], [20, 30, 40]).unwrap()));
        // Corners in either order still produce an ordered box.
        let key = catalog::lookup(catalog::ZONE_MIN).unwrap();
        host.set(key, SettingValue::unrestricted(SettingData::Vec3([25, 0, 0])))
            .unwrap();
        let bounds = *host.bounds().unwrap();
        assert!(bounds.is_valid());
        assert_eq!(bounds.min, [20, 0, 0]);
        assert_eq!(bounds.max, [25, 30, 40]);
    }

    #[test]
    fn corner_keys_cannot_be_unset_on_a_region() {
        let mut host = region();
        let key = catalog::lookup(catalog::ZONE_MIN).unwrap();
        assert!(matches!(
            host.unset(key),
            Err(ZoneError::ProtectedSetting { .. })
        ));
        // And clear() keeps them too.
        let block_break = catalog::lookup("block-break").unwrap();
        host.set(block_break, SettingValue::unrestricted(SettingData::State(false)))
            .unwrap();
        host.clear();
        assert!(host.has(key));
        assert!(!host.has(block_break));
    }

    #[test]
    fn global_only_keys_are_rejected_off_the_global_host() {
        let mut host = region();
        let key = catalog::lookup(catalog::CACHE_SIZE).unwrap();
        assert!(matches!(
            host.set(key, SettingValue::unrestricted(SettingData::Int(100))),
            Err(ZoneError::GlobalOnlySetting { .. })
        ));
        let mut global = Host::new_global("_global");
        assert!(global
            .set(key, SettingValue::unrestricted(SettingData::Int(100)))
            .is_ok());
    }

    #[test]
    fn corner_keys_are_rejected_off_regions() {
        let mut world = Host::new_world("_world-overworld", "overworld".to_string());
        let key = catalog::lookup(catalog::ZONE_MIN).unwrap();
        assert!(matches!(
            world.set(key, SettingValue::unrestricted(SettingData::Vec3([0, 0, 0]))),
            Err(ZoneError::RegionOnlySetting { .. })
        ));
    }

    #[test]
    fn mismatched_payload_shape_is_rejected() {
        let mut host = region();
        let key = catalog::lookup("block-break").unwrap();
        assert!(matches!(
            host.set(key, SettingValue::unrestricted(SettingData::Int(1))),
            Err(ZoneError::TypeMismatch { .. })
        ));
        assert!(!host.has(key));
    }

    #[test]
    fn scope_tiers_order_global_below_world_below_region() {
        let global = Host::new_global("_global");
        let world = Host::new_world("_world-overworld", "overworld".to_string());
        let region = region();
        assert!(global.effective_priority() < world.effective_priority());
        assert!(world.effective_priority() < region.effective_priority());
    }
}
