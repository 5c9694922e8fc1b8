//! Error types for the compiler pipeline.

use glam::UVec3;
use thiserror::Error;

/// Pipeline-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// The voxel input could not be read or decoded
    #[error("Failed to decode voxel input: {0}")]
    InputDecode(String),

    /// The compiled output could not be written
    #[error("Failed to write output to {path}: {source}")]
    OutputWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Root size that cannot be halved down to 1
    #[error("Invalid root size {0}: must be a non-zero power of two")]
    InvalidRootSize(u32),

    /// Root size deeper than the configured limit
    #[error("Root size {root_size} needs depth {depth}, limit is {max_depth}")]
    DepthLimitExceeded {
        root_size: u32,
        depth: u32,
        max_depth: u32,
    },

    /// The octree arena cannot hold another subdivision
    #[error("Octree arena is full: {nodes} nodes, limit is {limit}")]
    ArenaFull { nodes: usize, limit: usize },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// A point that matched none of the eight octants and was not inserted.
///
/// Happens when a coordinate equals the split plane (`node_size / 2`) of a
/// node on the insertion path.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("point {point} lies on split plane {boundary} of a size {node_size} node and was dropped")]
pub struct DroppedPointWarning {
    /// The rejected point
    pub point: UVec3,
    /// Size of the node whose split plane the point lies on
    pub node_size: u32,
    /// The split plane coordinate
    pub boundary: u32,
}

/// Why a single point was not added to the octree.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertError {
    /// The point lies on a split plane; the batch can go on
    #[error(transparent)]
    Dropped(#[from] DroppedPointWarning),

    /// No room for the 8 children of a node on the insertion path
    #[error("Octree arena is full: {nodes} nodes, limit is {limit}")]
    ArenaFull { nodes: usize, limit: usize },
}
