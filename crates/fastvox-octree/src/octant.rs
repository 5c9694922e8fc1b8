//! Child slot ordering.
//!
//! Child slots do not follow Morton order. Each slot is tied to a fixed sign
//! pattern relative to the parent's split plane, and the compiler positions
//! children with the same table, so both sides must agree on it.

use glam::{UVec3, Vec3};

/// Which side of a split plane a coordinate lies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// Strictly less than the split plane
    Below,
    /// Strictly greater than the split plane
    Above,
}

impl Side {
    /// Classify a coordinate against a split plane.
    ///
    /// Returns `None` for a coordinate lying exactly on the plane.
    #[inline]
    pub fn of(coord: u32, boundary: u32) -> Option<Self> {
        match coord.cmp(&boundary) {
            std::cmp::Ordering::Less => Some(Self::Below),
            std::cmp::Ordering::Greater => Some(Self::Above),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Unit offset along the axis.
    #[inline]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Below => -1.0,
            Self::Above => 1.0,
        }
    }
}

use Side::{Above as P, Below as N};

/// Sign pattern (x, y, z) of each child slot.
pub const OCTANTS: [[Side; 3]; 8] = [
    [P, P, P],
    [N, N, N],
    [P, N, N],
    [P, P, N],
    [N, P, N],
    [P, N, P],
    [N, N, P],
    [N, P, P],
];

/// Child slot a point descends into for a node split at `boundary`.
///
/// Returns `None` if any coordinate equals `boundary`.
pub fn octant_of(point: UVec3, boundary: u32) -> Option<usize> {
    let sides = [
        Side::of(point.x, boundary)?,
        Side::of(point.y, boundary)?,
        Side::of(point.z, boundary)?,
    ];
    OCTANTS.iter().position(|pattern| *pattern == sides)
}

/// Offset from a parent's center to the center of child slot `octant`.
pub fn child_offset(octant: usize, child_size: u32) -> Vec3 {
    let [x, y, z] = OCTANTS[octant];
    Vec3::new(x.sign(), y.sign(), z.sign()) * child_size as f32
}
