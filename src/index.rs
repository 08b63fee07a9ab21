//! Per-world spatial index over region bounds.
//!
//! Each world keeps a centered interval tree over the x-extents of its
//! regions; a point query descends by x and filters the surviving
//! candidates by full containment. The tree holds zone names and bounds
//! only — hosts themselves live in the registry.
//!
//! Mutations rebuild the affected world's tree. Zone edits are rare
//! relative to queries, and a rebuilt tree is a consistent snapshot: a
//! reader never observes a half-updated box.

use crate::host::WorldId;
use crate::spatial::{Aabb, BlockPos};
use std::collections::HashMap;

#[derive(Clone, Debug)]
struct Entry {
    name: String,
    bounds: Aabb,
}

#[derive(Clone, Debug)]
struct IntervalNode {
    center: i64,
    left: Option<Box<IntervalNode>>,
    right: Option<Box<IntervalNode>>,
    /// Entries whose x-interval crosses `center`, ascending by x-min.
    by_min: Vec<usize>,
    /// The same entries, descending by x-max.
    by_max: Vec<usize>,
}

#[derive(Clone, Debug, Default)]
struct WorldIndex {
    entries: Vec<Entry>,
    root: Option<Box<IntervalNode>>,
}

impl WorldIndex {
    fn rebuild(&mut self) {
        let indices: Vec<usize> = (0..self.entries.len()).collect();
        self.root = build_node(&self.entries, indices);
    }

    fn query(&self, pos: BlockPos, out: &mut Vec<usize>) {
        let mut node = self.root.as_deref();
        let px = i64::from(pos[0]);
        while let Some(current) = node {
            if px < current.center {
                for &index in &current.by_min {
                    if i64::from(self.entries[index].bounds.min[0]) > px {
                        break;
                    }
                    out.push(index);
                }
                node = current.left.as_deref();
            } else if px > current.center {
                for &index in &current.by_max {
                    if i64::from(self.entries[index].bounds.max[0]) < px {
                        break;
                    }
                    out.push(index);
                }
                node = current.right.as_deref();
            } else {
                // Every interval stored at this node crosses the center.
                out.extend_from_slice(&current.by_min);
                break;
            }
        }
    }
}

fn build_node(entries: &[Entry], mut indices: Vec<usize>) -> Option<Box<IntervalNode>> {
    if indices.is_empty() {
        return None;
    }
    let mut endpoints: Vec<i64> = indices
        .iter()
        .flat_map(|&i| {
            [
                i64::from(entries[i].bounds.min[0]),
                i64::from(entries[i].bounds.max[0]),
            ]
        })
        .collect();
    endpoints.sort_unstable();
    let center = endpoints[endpoints.len() / 2];

    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut crossing = Vec::new();
    for index in indices.drain(..) {
        let bounds = &entries[index].bounds;
        if i64::from(bounds.max[0]) < center {
            left.push(index);
        } else if i64::from(bounds.min[0]) > center {
            right.push(index);
        } else {
            crossing.push(index);
        }
    }

    let mut by_min = crossing.clone();
    by_min.sort_unstable_by_key(|&i| entries[i].bounds.min[0]);
    let mut by_max = crossing;
    by_max.sort_unstable_by_key(|&i| std::cmp::Reverse(entries[i].bounds.max[0]));

    Some(Box::new(IntervalNode {
        center,
        left: build_node(entries, left),
        right: build_node(entries, right),
        by_min,
        by_max,
    }))
}

/// Point-containment index over every bounded zone, partitioned by world.
#[derive(Clone, Debug, Default)]
pub struct VolumeIndex {
    worlds: HashMap<WorldId, WorldIndex>,
}

impl VolumeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zone's bounds. The zone name must be unique within the
    /// index; the registry enforces that before calling.
    pub fn insert(&mut self, world: &str, name: &str, bounds: Aabb) {
        let index = self.worlds.entry(world.to_string()).or_default();
        debug_assert!(
            index.entries.iter().all(|entry| entry.name != name),
            "volume index already holds {name}"
        );
        index.entries.push(Entry {
            name: name.to_string(),
            bounds,
        });
        index.rebuild();
    }

    /// Drop a zone from the index. Returns whether it was present.
    pub fn remove(&mut self, world: &str, name: &str) -> bool {
        let Some(index) = self.worlds.get_mut(world) else {
            return false;
        };
        let before = index.entries.len();
        index.entries.retain(|entry| entry.name != name);
        let removed = index.entries.len() != before;
        if removed {
            if index.entries.is_empty() {
                self.worlds.remove(world);
            } else {
                index.rebuild();
            }
        }
        removed
    }

    /// Replace a zone's bounds in place. Returns whether it was present.
    pub fn update_bounds(&mut self, world: &str, name: &str, bounds: Aabb) -> bool {
        let Some(index) = self.worlds.get_mut(world) else {
            return false;
        };
        let Some(entry) = index.entries.iter_mut().find(|entry| entry.name == name) else {
            return false;
        };
        entry.bounds = bounds;
        index.rebuild();
        true
    }

    /// Rename a zone without touching its bounds.
    pub fn rename(&mut self, world: &str, old: &str, new: &str) -> bool {
        let Some(index) = self.worlds.get_mut(world) else {
            return false;
        };
        let Some(entry) = index.entries.iter_mut().find(|entry| entry.name == old) else {
            return false;
        };
        entry.name = new.to_string();
        true
    }

    /// Names of every zone whose box contains `pos`, unordered.
    pub fn zones_at(&self, world: &str, pos: BlockPos) -> Vec<&str> {
        let Some(index) = self.worlds.get(world) else {
            return Vec::new();
        };
        let mut candidates = Vec::new();
        index.query(pos, &mut candidates);
        candidates
            .into_iter()
            .filter(|&i| index.entries[i].bounds.contains(pos))
            .map(|i| index.entries[i].name.as_str())
            .collect()
    }

    /// Total zones indexed across all worlds.
    pub fn len(&self) -> usize {
        self.worlds.values().map(|index| index.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aabb(min: BlockPos, max: BlockPos) -> Aabb {
        Aabb::new(min, max).unwrap()
    }

    fn sorted(mut names: Vec<&str>) -> Vec<&str> {
        names.sort_unstable();
        names
    }

    #[test]
    fn finds_all_zones_containing_a_point() {
        let mut index = VolumeIndex::new();
        index.insert("overworld", "outer", aabb([-100, 0, -100], [100, 64, 100]));
        index.insert("overworld", "inner", aabb([-10, 0, -10], [10, 64, 10]));
        index.insert("overworld", "far", aabb([500, 0, 500], [600, 64, 600]));
        index.insert("nether", "other-world", aabb([-10, 0, -10], [10, 64, 10]));

        assert_eq!(
            sorted(index.zones_at("overworld", [0, 32, 0])),
            vec!["inner", "outer"]
        );
        assert_eq!(index.zones_at("overworld", [550, 1, 550]), vec!["far"]);
        assert_eq!(index.zones_at("overworld", [0, 65, 0]), Vec::<&str>::new());
        assert_eq!(index.zones_at("nether", [0, 32, 0]), vec!["other-world"]);
        assert_eq!(index.zones_at("the_end", [0, 32, 0]), Vec::<&str>::new());
    }

    #[test]
    fn boundary_points_are_inclusive() {
        let mut index = VolumeIndex::new();
        index.insert("overworld", "box", aabb([0, 0, 0], [10, 10, 10]));
        assert_eq!(index.zones_at("overworld", [0, 0, 0]), vec!["box"]);
        assert_eq!(index.zones_at("overworld", [10, 10, 10]), vec!["box"]);
        assert!(index.zones_at("overworld", [11, 0, 0]).is_empty());
    }

    #[test]
    fn degenerate_boxes_match_their_single_block() {
        let mut index = VolumeIndex::new();
        index.insert("overworld", "pillar", aabb([5, 0, 5], [5, 255, 5]));
        index.insert("overworld", "block", aabb([7, 7, 7], [7, 7, 7]));
        assert_eq!(index.zones_at("overworld", [5, 128, 5]), vec!["pillar"]);
        assert_eq!(index.zones_at("overworld", [7, 7, 7]), vec!["block"]);
        assert!(index.zones_at("overworld", [7, 7, 8]).is_empty());
    }

    #[test]
    fn remove_and_update_keep_queries_coherent() {
        let mut index = VolumeIndex::new();
        index.insert("overworld", "a", aabb([0, 0, 0], [10, 10, 10]));
        index.insert("overworld", "b", aabb([5, 5, 5], [15, 15, 15]));
        assert_eq!(sorted(index.zones_at("overworld", [7, 7, 7])), vec!["a", "b"]);

        assert!(index.remove("overworld", "a"));
        assert!(!index.remove("overworld", "a"));
        assert_eq!(index.zones_at("overworld", [7, 7, 7]), vec!["b"]);

        assert!(index.update_bounds("overworld", "b", aabb([100, 0, 100], [110, 10, 110])));
        assert!(index.zones_at("overworld", [7, 7, 7]).is_empty());
        assert_eq!(index.zones_at("overworld", [105, 5, 105]), vec!["b"]);
    }

    // Deterministic LCG, same pattern the other randomized suites use.
    struct TestRng {
        state: u64,
    }

    impl TestRng {
        fn new(seed: u64) -> Self {
            Self { state: seed }
        }

        fn next_u32(&mut self) -> u32 {
            self.state = self
                .state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.state >> 32) as u32
        }

        fn next_inclusive_i32(&mut self, lo: i32, hi: i32) -> i32 {
            debug_assert!(lo <= hi);
            let span = (hi - lo + 1) as u32;
            lo + (self.next_u32() % span) as i32
        }
    }

    #[test]
    fn random_queries_agree_with_brute_force() {
        let mut rng = TestRng::new(0x5eed);
        let mut index = VolumeIndex::new();
        let mut boxes: Vec<(String, Aabb)> = Vec::new();
        for i in 0..120 {
            let min = [
                rng.next_inclusive_i32(-200, 200),
                rng.next_inclusive_i32(0, 128),
                rng.next_inclusive_i32(-200, 200),
            ];
            let size = [
                rng.next_inclusive_i32(0, 80),
                rng.next_inclusive_i32(0, 40),
                rng.next_inclusive_i32(0, 80),
            ];
            let bounds = aabb(min, [min[0] + size[0], min[1] + size[1], min[2] + size[2]]);
            let name = format!("zone-{i}");
            index.insert("overworld", &name, bounds);
            boxes.push((name, bounds));
        }
        for _ in 0..500 {
            let pos = [
                rng.next_inclusive_i32(-250, 300),
                rng.next_inclusive_i32(-10, 180),
                rng.next_inclusive_i32(-250, 300),
            ];
            let mut expected: Vec<&str> = boxes
                .iter()
                .filter(|(_, bounds)| bounds.contains(pos))
                .map(|(name, _)| name.as_str())
                .collect();
            expected.sort_unstable();
            assert_eq!(sorted(index.zones_at("overworld", pos)), expected, "at {pos:?}");
        }
    }
}
