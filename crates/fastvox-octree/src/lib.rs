//! Sparse voxel octree construction and flattening.
//!
//! Points are inserted into an [`Octree`], which subdivides lazily down to
//! unit-sized leaves. A [`Compiler`] then walks the finished tree once and
//! emits a post-order [`CompiledTree`]: every subtree precedes its parent and
//! the root is the last record.

pub mod compile;
pub mod material;
pub mod octant;
pub mod svo;

pub use compile::{CompileStats, CompiledTree, Compiler};
pub use material::{
    MaterialResolver, RandomMaterials, SeededMaterials, TerminalNode, UniformMaterials,
};
pub use octant::{child_offset, octant_of, Side, OCTANTS};
pub use svo::{InsertReport, NodeId, NodeKind, Octree, OctreeNode, MAX_NODES};
