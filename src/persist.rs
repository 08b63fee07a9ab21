//! Snapshot/restore surface for the persistence collaborator.
//!
//! A [`ZoneDescriptor`] is the exhaustive serializable form of one host.
//! The storage format itself (files, SQL, wire framing) belongs to the
//! collaborator; this module only guarantees that a snapshot is atomic and
//! deterministic, and that restoring tolerates partial corruption — one
//! unknown key or undecodable value loses that assignment, never the zone.

use crate::catalog::{self, UnknownSettingError};
use crate::host::WorldId;
use crate::registry::{HostRegistry, ZoneError, GLOBAL_HOST};
use crate::setting::{SettingParseError, SettingValue};
use crate::spatial::{Aabb, BlockPos};
use crate::target::TargetSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One serialized setting assignment on a host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SettingEntry {
    pub id: String,
    pub value: Value,
    pub target: TargetSet,
}

/// Exhaustive serializable form of a host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneDescriptor {
    pub name: String,
    pub priority: u32,
    pub parent: Option<String>,
    pub world: Option<WorldId>,
    /// Present on regions only: inclusive min/max corners.
    pub bounds: Option<(BlockPos, BlockPos)>,
    pub settings: Vec<SettingEntry>,
}

/// Why a single piece of a snapshot did not make it into the registry.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadIssue {
    /// The whole zone was unloadable (bad corners, duplicate name, …).
    ZoneDropped { zone: String, error: ZoneError },
    /// One assignment was skipped; the rest of the zone loaded.
    SettingDropped {
        zone: String,
        id: String,
        error: SettingDropError,
    },
    /// The zone loaded but its parent link could not be applied.
    ParentDropped {
        zone: String,
        parent: String,
        error: ZoneError,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum SettingDropError {
    UnknownId(UnknownSettingError),
    Parse(SettingParseError),
    Rejected(ZoneError),
}

impl fmt::Display for SettingDropError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownId(err) => write!(f, "{err}"),
            Self::Parse(err) => write!(f, "{err}"),
            Self::Rejected(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SettingDropError {}

/// Result of a restore: how much loaded, and everything that was dropped.
#[derive(Clone, Debug, Default)]
pub struct LoadReport {
    pub zones_loaded: usize,
    pub issues: Vec<LoadIssue>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Serialize every host in deterministic order (global, worlds, regions,
/// each alphabetical; assignments in id order).
pub fn snapshot(registry: &HostRegistry) -> Vec<ZoneDescriptor> {
    registry
        .hosts()
        .iter()
        .map(|host| {
            let settings = host
                .settings()
                .filter_map(|(id, value)| {
                    // Every stored assignment came through the catalog.
                    let key = catalog::lookup(id).ok()?;
                    Some(SettingEntry {
                        id: id.to_string(),
                        value: key.data_to_json(&value.data),
                        target: value.target.clone(),
                    })
                })
                .collect();
            ZoneDescriptor {
                name: host.name().to_string(),
                priority: host.priority(),
                parent: host.parent().map(str::to_string),
                world: host.world().map(str::to_string),
                bounds: host.bounds().map(|aabb| (aabb.min, aabb.max)),
                settings,
            }
        })
        .collect()
}

/// Rebuild a registry from descriptors.
///
/// Zones are created first, parents second (a parent may be declared after
/// its child), assignments last. Every dropped piece is logged and recorded
/// in the report; nothing aborts the rest of the load.
pub fn restore(descriptors: &[ZoneDescriptor]) -> (HostRegistry, LoadReport) {
    let mut registry = HostRegistry::new();
    let mut report = LoadReport::default();

    for descriptor in descriptors {
        match create_host(&mut registry, descriptor) {
            Ok(()) => report.zones_loaded += 1,
            Err(error) => {
                log::error!("dropping zone '{}': {error}", descriptor.name);
                report.issues.push(LoadIssue::ZoneDropped {
                    zone: descriptor.name.clone(),
                    error,
                });
            }
        }
    }

    for descriptor in descriptors {
        let Some(parent) = descriptor.parent.as_deref() else {
            continue;
        };
        if registry.host(&descriptor.name).is_err() {
            continue;
        }
        if let Err(error) = registry.reparent(&descriptor.name, Some(parent)) {
            log::warn!(
                "zone '{}': cannot restore parent '{parent}': {error}",
                descriptor.name
            );
            report.issues.push(LoadIssue::ParentDropped {
                zone: descriptor.name.clone(),
                parent: parent.to_string(),
                error,
            });
        }
    }

    for descriptor in descriptors {
        if registry.host(&descriptor.name).is_err() {
            continue;
        }
        for entry in &descriptor.settings {
            if let Err(error) = apply_entry(&mut registry, &descriptor.name, entry) {
                match &error {
                    SettingDropError::UnknownId(err) => log::warn!(
                        "zone '{}': {err}; is this setting old? Skipping",
                        descriptor.name
                    ),
                    SettingDropError::Parse(err) => log::error!(
                        "zone '{}': invalid value for '{}': {err}; skipping",
                        descriptor.name,
                        entry.id
                    ),
                    SettingDropError::Rejected(err) => log::warn!(
                        "zone '{}': assignment '{}' rejected: {err}; skipping",
                        descriptor.name,
                        entry.id
                    ),
                }
                report.issues.push(LoadIssue::SettingDropped {
                    zone: descriptor.name.clone(),
                    id: entry.id.clone(),
                    error,
                });
            }
        }
    }

    (registry, report)
}

fn create_host(registry: &mut HostRegistry, descriptor: &ZoneDescriptor) -> Result<(), ZoneError> {
    if descriptor.name == GLOBAL_HOST {
        // Always present; nothing to create.
        return Ok(());
    }
    match (&descriptor.world, &descriptor.bounds) {
        (Some(world), Some((min, max))) => {
            let bounds = Aabb::new(*min, *max).ok_or(ZoneError::InvalidCorners {
                min: *min,
                max: *max,
            })?;
            registry.create_region(&descriptor.name, world, bounds, descriptor.priority)?;
            Ok(())
        }
        (Some(world), None) => {
            let expected = crate::registry::world_host_name(world);
            if descriptor.name != expected {
                return Err(ZoneError::ReservedName {
                    name: descriptor.name.clone(),
                });
            }
            registry.ensure_world(world);
            Ok(())
        }
        (None, _) => Err(ZoneError::UnknownZone {
            name: descriptor.name.clone(),
        }),
    }
}

fn apply_entry(
    registry: &mut HostRegistry,
    zone: &str,
    entry: &SettingEntry,
) -> Result<(), SettingDropError> {
    let key = catalog::lookup(&entry.id).map_err(SettingDropError::UnknownId)?;
    let data = key
        .data_from_json(&entry.value)
        .map_err(SettingDropError::Parse)?;
    registry
        .set_setting(zone, key, SettingValue::targeted(data, entry.target.clone()))
        .map_err(SettingDropError::Rejected)?;
    Ok(())
}

/// Scope kind of a descriptor, for collaborators that care.
pub fn descriptor_scope(descriptor: &ZoneDescriptor) -> &'static str {
    match (&descriptor.world, &descriptor.bounds) {
        (None, _) => "global",
        (Some(_), None) => "world",
        (Some(_), Some(_)) => "region",
    }
}
