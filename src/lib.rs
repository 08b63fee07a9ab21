//! zonefield — spatial zone hierarchy and setting resolution for voxel
//! game servers.
//!
//! Server operators carve a world into nested, prioritized zones ("hosts")
//! and attach per-zone overrides to catalog-defined settings, optionally
//! restricted to specific players or groups. The crate answers one
//! question fast enough to sit on every block interaction: *what is the
//! effective value of this setting, at this point, for this actor?*
//!
//! The pieces, leaves first:
//! - [`target`]: who an override applies to (whitelist/blacklist of
//!   players and groups, permission lookup at the seam).
//! - [`setting`] / [`catalog`]: the closed, typed catalog of setting keys
//!   and their values.
//! - [`host`]: the zone entity — global, per-world, or a bounded region.
//! - [`index`]: per-world interval tree answering "which regions contain
//!   this point".
//! - [`registry`]: single owner of every host, invariant enforcement.
//! - [`resolve`]: the priority/nesting/recency resolution walk, plus the
//!   bounded cache in front of it.
//! - [`persist`]: serializable zone descriptors with partial-failure
//!   restore.
//! - [`service`]: the `RwLock` façade event threads actually call.

pub mod catalog;
pub mod host;
pub mod index;
pub mod persist;
pub mod registry;
pub mod resolve;
pub mod service;
pub mod setting;
pub mod spatial;
pub mod target;

pub use catalog::{catalog as setting_catalog, lookup as lookup_setting, UnknownSettingError};
pub use host::{Host, HostScope, WorldId};
pub use persist::{LoadIssue, LoadReport, ZoneDescriptor};
pub use registry::{HostRegistry, ZoneError, GLOBAL_HOST, MAX_ZONE_COUNT};
pub use resolve::{resolve, resolve_detailed, Resolution, ResolutionCache};
pub use service::ZoneService;
pub use setting::{SettingData, SettingKey, SettingType, SettingValue};
pub use spatial::{Aabb, BlockPos};
pub use target::{Actor, GroupLookup, PlayerId, Target, TargetSet};
