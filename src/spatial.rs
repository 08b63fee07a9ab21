use serde::{Deserialize, Serialize};

/// Integer block position in a world.
pub type BlockPos = [i32; 3];

/// Inclusive 3D axis-aligned bounding box over block positions.
///
/// Represents the region `[min, max]` — both corners are inclusive on every
/// axis, so a box with `min == max` is a single block and still contains
/// that block. This matches block-selection semantics: the two corners an
/// operator picks are both part of the zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Aabb {
    pub min: BlockPos,
    pub max: BlockPos,
}

impl Aabb {
    /// Build a box from two already-ordered corners.
    ///
    /// Returns `None` if any axis has `min > max`; use [`Aabb::spanning`]
    /// when the corners come straight from operator input.
    pub fn new(min: BlockPos, max: BlockPos) -> Option<Self> {
        let aabb = Self { min, max };
        aabb.is_valid().then_some(aabb)
    }

    /// Build the smallest box containing both corners, in any order.
    pub fn spanning(a: BlockPos, b: BlockPos) -> Self {
        let mut min = [0i32; 3];
        let mut max = [0i32; 3];
        for axis in 0..3 {
            min[axis] = a[axis].min(b[axis]);
            max[axis] = a[axis].max(b[axis]);
        }
        Self { min, max }
    }

    /// Inclusive validity: each axis must have `min <= max`.
    pub fn is_valid(&self) -> bool {
        self.min[0] <= self.max[0] && self.min[1] <= self.max[1] && self.min[2] <= self.max[2]
    }

    /// Inclusive point containment: is `pos` in `[min, max]`?
    pub fn contains(&self, pos: BlockPos) -> bool {
        pos[0] >= self.min[0]
            && pos[0] <= self.max[0]
            && pos[1] >= self.min[1]
            && pos[1] <= self.max[1]
            && pos[2] >= self.min[2]
            && pos[2] <= self.max[2]
    }

    /// Inclusive overlap test against another box.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min[0] <= other.max[0]
            && self.max[0] >= other.min[0]
            && self.min[1] <= other.max[1]
            && self.max[1] >= other.min[1]
            && self.min[2] <= other.max[2]
            && self.max[2] >= other.min[2]
    }

    /// Number of blocks covered, saturating on overflow.
    pub fn volume(&self) -> u64 {
        let span = |lo: i32, hi: i32| (i64::from(hi) - i64::from(lo) + 1) as u64;
        span(self.min[0], self.max[0])
            .saturating_mul(span(self.min[1], self.max[1]))
            .saturating_mul(span(self.min[2], self.max[2]))
    }
}

/// Quantized position used as a resolution-cache key.
///
/// Currently one bucket per block, matching the per-block-location cache of
/// the resolution hot path; widen the shift to trade accuracy for hit rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheCoord(pub [i32; 3]);

impl CacheCoord {
    const SHIFT: u32 = 0;

    pub fn from_pos(pos: BlockPos) -> Self {
        Self(pos.map(|v| v >> Self::SHIFT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_is_inclusive_at_both_corners() {
        let aabb = Aabb::new([0, 0, 0], [10, 10, 10]).unwrap();
        assert!(aabb.contains([0, 0, 0]));
        assert!(aabb.contains([10, 10, 10]));
        assert!(aabb.contains([5, 0, 10]));
        assert!(!aabb.contains([11, 0, 0]));
        assert!(!aabb.contains([0, -1, 0]));
    }

    #[test]
    fn degenerate_box_contains_its_single_block() {
        let aabb = Aabb::new([3, 4, 5], [3, 4, 5]).unwrap();
        assert!(aabb.contains([3, 4, 5]));
        assert!(!aabb.contains([3, 4, 6]));
        assert_eq!(aabb.volume(), 1);
    }

    #[test]
    fn inverted_corners_are_rejected() {
        assert!(Aabb::new([0, 0, 0], [-1, 5, 5]).is_none());
        assert!(Aabb::new([0, 9, 0], [5, 5, 5]).is_none());
    }

    #[test]
    fn spanning_orders_corners_per_axis() {
        let aabb = Aabb::spanning([10, -2, 0], [0, 5, -7]);
        assert_eq!(aabb.min, [0, -2, -7]);
        assert_eq!(aabb.max, [10, 5, 0]);
    }

    #[test]
    fn intersection_is_inclusive_at_shared_faces() {
        let a = Aabb::new([0, 0, 0], [10, 10, 10]).unwrap();
        let b = Aabb::new([10, 10, 10], [20, 20, 20]).unwrap();
        let c = Aabb::new([11, 0, 0], [20, 10, 10]).unwrap();
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
