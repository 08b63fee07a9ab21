//! The fixed catalog of setting keys.
//!
//! Keys are registered once, by hand, into an immutable id-keyed table. The
//! catalog is process-global: every registry and resolver shares the same
//! `&'static SettingKey` entries, so assignments can be keyed by id string
//! while queries hand around static references.

use crate::setting::{Category, SettingKey};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Corner keys a region host's bounds are derived from. Protected: a region
/// cannot unset them.
pub const ZONE_MIN: &str = "zone-min";
pub const ZONE_MAX: &str = "zone-max";

/// Global knob for the resolution cache capacity; 0 disables caching.
pub const CACHE_SIZE: &str = "cache-size";

/// Lookup failed because no key with that id exists in the catalog. This is
/// distinct from a valid key simply being unset on a particular host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownSettingError {
    pub id: String,
}

impl fmt::Display for UnknownSettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "there is no setting with id '{}'", self.id)
    }
}

impl std::error::Error for UnknownSettingError {}

pub struct SettingCatalog {
    keys: Vec<SettingKey>,
    by_id: HashMap<&'static str, usize>,
}

impl SettingCatalog {
    fn register(keys: Vec<SettingKey>) -> Self {
        let mut by_id = HashMap::with_capacity(keys.len());
        for (index, key) in keys.iter().enumerate() {
            if by_id.insert(key.id, index).is_some() {
                panic!("setting keys may not share an id: {}", key.id);
            }
        }
        Self { keys, by_id }
    }

    pub fn lookup(&self, id: &str) -> Result<&SettingKey, UnknownSettingError> {
        self.by_id
            .get(id)
            .map(|index| &self.keys[*index])
            .ok_or_else(|| UnknownSettingError { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn all(&self) -> impl Iterator<Item = &SettingKey> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn built_in() -> Self {
        use Category::{Blocks, Entities, Movement};
        Self::register(vec![
            SettingKey::vec3(ZONE_MIN, [0, 0, 0], "Minimum corner of a zone")
                .describe("The lower corner of a zone's bounding box. Set on region zones only."),
            SettingKey::vec3(ZONE_MAX, [0, 0, 0], "Maximum corner of a zone")
                .describe("The upper corner of a zone's bounding box. Set on region zones only."),
            SettingKey::integer(CACHE_SIZE, 75000, "Size of the resolution cache")
                .describe(
                    "The quantity of resolved block locations to cache per world. \
                     Set 0 to disable caching.",
                )
                .global(),
            SettingKey::state("block-break", true, "Block break restriction")
                .describe("When denied, blocks may not be broken by players.")
                .category(Blocks)
                .restrictive(),
            SettingKey::state("block-place", true, "Block place restriction")
                .describe("When denied, blocks may not be placed by players.")
                .category(Blocks)
                .restrictive(),
            SettingKey::state("block-trample", true, "Trample restriction")
                .describe("When denied, blocks like farmland may not be trampled.")
                .category(Blocks)
                .restrictive(),
            SettingKey::boolean("block-propagate-within", true, "Inside to inside block updates")
                .describe("When disabled, block updates will not affect others within the zone.")
                .category(Blocks),
            SettingKey::state("chest-access", true, "Chest access restriction")
                .describe("When denied, players may not open chests.")
                .category(Blocks)
                .restrictive(),
            SettingKey::boolean("crop-growth", true, "Crop growth")
                .describe("When disabled, crops do not grow.")
                .category(Blocks),
            SettingKey::boolean("water-flow", true, "Water flow")
                .describe("When disabled, water cannot flow.")
                .category(Blocks),
            SettingKey::state("tnt-ignition", true, "TNT ignition restriction")
                .describe("When denied, tnt may not be activated.")
                .category(Blocks)
                .restrictive(),
            SettingKey::state("tnt-placement", true, "TNT placement restriction")
                .describe("When denied, tnt may not be placed.")
                .category(Blocks)
                .restrictive(),
            SettingKey::boolean("creeper-grief", true, "Grief caused by creepers")
                .describe("When disabled, creeper explosions do not break blocks.")
                .category(Entities),
            SettingKey::boolean("zombie-grief", true, "Grief caused by zombies")
                .describe("When disabled, zombies cannot break blocks.")
                .category(Entities),
            SettingKey::state("armor-stand-destroy", true, "Armor stand destruction restriction")
                .describe("When denied, armor stands may not be broken by players.")
                .category(Entities)
                .restrictive(),
            SettingKey::state("vehicle-place", true, "Vehicle placement restriction")
                .describe("When denied, players may not place vehicles.")
                .category(Entities)
                .restrictive(),
            SettingKey::string_set("unspawnable-mobs", "Mobs which are unspawnable")
                .describe("These entity types will not be allowed to spawn.")
                .category(Entities)
                .restrictive(),
            SettingKey::string_set("movement-commands", "Commands which directly cause movement")
                .describe("These commands are considered unnatural methods of teleportation.")
                .restrictive()
                .global(),
            SettingKey::state("enderpearl-teleport", true, "Enderpearl teleport restriction")
                .describe("When denied, enderpearls may not be used for teleportation.")
                .category(Movement)
                .restrictive(),
            SettingKey::state("chorus-fruit-teleport", true, "Chorus fruit teleport restriction")
                .describe("When denied, players may not teleport by eating a chorus fruit.")
                .category(Movement)
                .restrictive(),
            SettingKey::choice(
                "player-movement",
                &["all", "natural", "unnatural", "none"],
                "all",
                "Kinds of movement allowed",
            )
            .describe("Which categories of movement are permitted within the zone.")
            .category(Movement)
            .restrictive(),
            SettingKey::vec3("teleport-location", [0, 0, 0], "Location at which to teleport")
                .describe("The designated point of access to the zone via teleport."),
            SettingKey::text("greeting", "", "Message when entering the zone")
                .describe("Formatted text shown to a player walking into the zone."),
            SettingKey::text("farewell", "", "Message when leaving the zone")
                .describe("Formatted text shown to a player walking out of the zone."),
            SettingKey::string("wand-item", "stick", "Item used as the zone wand")
                .describe("The item id used to select zone corners.")
                .global(),
        ])
    }
}

/// The process-wide catalog, built on first use.
pub fn catalog() -> &'static SettingCatalog {
    static CATALOG: OnceLock<SettingCatalog> = OnceLock::new();
    CATALOG.get_or_init(SettingCatalog::built_in)
}

/// Convenience lookup against the process-wide catalog.
pub fn lookup(id: &str) -> Result<&'static SettingKey, UnknownSettingError> {
    catalog().lookup(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setting::{SettingData, SettingType};

    #[test]
    fn lookup_by_id_finds_registered_keys() {
        let key = lookup("block-break").unwrap();
        assert_eq!(key.id, "block-break");
        assert_eq!(key.ty, SettingType::State);
        assert_eq!(key.default, SettingData::State(true));
        assert!(key.restrictive);
    }

    #[test]
    fn unknown_id_is_a_distinct_error() {
        let err = lookup("no-such-setting").unwrap_err();
        assert_eq!(err.id, "no-such-setting");
        assert!(err.to_string().contains("no-such-setting"));
    }

    #[test]
    fn engine_keys_are_present_with_expected_shapes() {
        assert_eq!(lookup(ZONE_MIN).unwrap().ty, SettingType::Vec3);
        assert_eq!(lookup(ZONE_MAX).unwrap().ty, SettingType::Vec3);
        let cache = lookup(CACHE_SIZE).unwrap();
        assert_eq!(cache.ty, SettingType::Int);
        assert!(cache.global);
    }

    #[test]
    fn ids_are_unique_and_defaults_match_declared_types() {
        let catalog = catalog();
        assert!(catalog.len() >= 20);
        for key in catalog.all() {
            assert!(key.accepts(&key.default), "default mismatch on {}", key.id);
        }
    }
}
