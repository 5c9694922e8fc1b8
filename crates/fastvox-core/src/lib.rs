//! Core types for the fastvox octree compiler.
//!
//! This crate provides the types shared by the builder, the compiler and the
//! scene I/O layer:
//! - Flattened node records and their GPU layout
//! - Renderer materials
//! - The decoded voxel model handed to the builder
//! - Common error types

pub mod error;
pub mod model;
pub mod types;

pub use error::{DroppedPointWarning, Error, InsertError, Result};
pub use model::VoxelModel;
pub use types::{CompiledRecord, GpuMaterial, GpuNode, Material, IDENTITY_ROTATION, NULL_CHILD};

/// Crate-wide constants
pub mod constants {
    /// Number of children of an internal octree node
    pub const CHILD_COUNT: usize = 8;
    /// Deepest octree accepted by default (root size 2^16)
    pub const DEFAULT_MAX_DEPTH: u32 = 16;
}
