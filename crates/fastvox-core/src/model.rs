//! Decoded voxel input.

use glam::UVec3;

/// Occupied voxel coordinates of a single model, as delivered by the file decoder.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoxelModel {
    /// Extent of the model along each axis
    pub size: UVec3,
    /// Occupied coordinates, in file order
    pub points: Vec<UVec3>,
}

impl VoxelModel {
    /// Create a new model.
    pub const fn new(size: UVec3, points: Vec<UVec3>) -> Self {
        Self { size, points }
    }

    /// Root size for the octree built from this model.
    ///
    /// The largest extent across axes, rounded up to a power of two so that
    /// halving ends at exactly 1.
    pub fn root_size(&self) -> u32 {
        self.size.max_element().max(1).next_power_of_two()
    }

    /// Number of voxels in the model.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the model has no voxels.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
