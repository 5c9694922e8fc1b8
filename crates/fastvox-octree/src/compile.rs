//! Flattening of a built octree into an index-linked record array.
//!
//! Records are emitted in post-order: the eight children of an internal node
//! are compiled in octant order before the node itself is appended, so every
//! child index is smaller than its parent's and the root is the last record.

use fastvox_core::constants::CHILD_COUNT;
use fastvox_core::{CompiledRecord, GpuNode, NULL_CHILD};
use glam::Vec3;
use rayon::prelude::*;
use tracing::debug;

use crate::material::{MaterialResolver, TerminalNode};
use crate::octant::child_offset;
use crate::svo::{NodeId, NodeKind, Octree};

/// Record counts by node kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub internal: usize,
    pub leaf: usize,
    pub empty: usize,
}

impl CompileStats {
    /// Total number of records.
    pub const fn total(&self) -> usize {
        self.internal + self.leaf + self.empty
    }
}

/// Flattened octree, root last.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledTree {
    records: Vec<CompiledRecord>,
}

impl CompiledTree {
    /// All records in emission order.
    pub fn records(&self) -> &[CompiledRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CompiledRecord> {
        self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false: a compiled tree holds at least the root.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of the root record.
    pub fn root_index(&self) -> u32 {
        self.records.len().saturating_sub(1) as u32
    }

    /// The root record.
    pub fn root(&self) -> &CompiledRecord {
        &self.records[self.root_index() as usize]
    }

    /// Count records by kind.
    pub fn stats(&self) -> CompileStats {
        self.records
            .iter()
            .fold(CompileStats::default(), |mut stats, record| {
                if record.is_leaf {
                    stats.leaf += 1;
                } else if record.is_empty {
                    stats.empty += 1;
                } else {
                    stats.internal += 1;
                }
                stats
            })
    }

    /// Convert to GPU buffer format.
    pub fn to_gpu_buffer(&self) -> Vec<GpuNode> {
        self.records.iter().map(CompiledRecord::to_gpu).collect()
    }
}

/// Walks an [`Octree`] and produces its [`CompiledTree`].
///
/// The octree is only read, so the same tree can be compiled any number of
/// times.
pub struct Compiler<'a, R: ?Sized> {
    octree: &'a Octree,
    resolver: &'a R,
    anchor: Vec3,
}

impl<'a, R: MaterialResolver + ?Sized> Compiler<'a, R> {
    /// Create a compiler with the root centered at the origin.
    pub const fn new(octree: &'a Octree, resolver: &'a R) -> Self {
        Self {
            octree,
            resolver,
            anchor: Vec3::ZERO,
        }
    }

    /// Set the world-space center of the root.
    pub const fn with_anchor(mut self, anchor: Vec3) -> Self {
        self.anchor = anchor;
        self
    }

    /// Compile the whole tree on the current thread.
    pub fn compile(&self) -> CompiledTree {
        let mut records = Vec::with_capacity(self.octree.node_count());
        let root = compile_subtree(
            self.octree,
            self.resolver,
            NodeId::ROOT,
            self.anchor,
            &mut records,
        );
        debug_assert_eq!(root as usize, records.len() - 1);

        let tree = CompiledTree { records };
        debug!("Compiled {} records: {:?}", tree.len(), tree.stats());
        tree
    }

    /// Compile each top-level octant on the rayon pool.
    ///
    /// Branches are compiled into private buffers and concatenated in octant
    /// order, so the layout matches [`Self::compile`].
    pub fn compile_parallel(&self) -> CompiledTree
    where
        R: Sync,
    {
        let root = self.octree.root();
        let Some(children) = root.children() else {
            return self.compile();
        };
        let child_size = root.size() / 2;

        let branches: Vec<(Vec<CompiledRecord>, u32)> = children
            .par_iter()
            .enumerate()
            .map(|(octant, &child)| {
                let mut buffer = Vec::new();
                let root = compile_subtree(
                    self.octree,
                    self.resolver,
                    child,
                    self.anchor + child_offset(octant, child_size),
                    &mut buffer,
                );
                (buffer, root)
            })
            .collect();

        let total = branches.iter().map(|(buffer, _)| buffer.len()).sum::<usize>() + 1;
        let mut records = Vec::with_capacity(total);
        let mut child_indices = [NULL_CHILD; CHILD_COUNT];
        for (slot, (branch, root)) in child_indices.iter_mut().zip(branches) {
            let offset = records.len() as u32;
            records.extend(branch.into_iter().map(|mut record| {
                record.rebase(offset);
                record
            }));
            *slot = root + offset;
        }
        records.push(CompiledRecord::internal(
            self.anchor,
            root.size(),
            child_indices,
        ));

        let tree = CompiledTree { records };
        debug!(
            "Compiled {} records in parallel: {:?}",
            tree.len(),
            tree.stats()
        );
        tree
    }
}

enum Task {
    /// Emit a terminal, or schedule the children of an internal node.
    Visit(NodeId, Vec3),
    /// Emit an internal node whose children were all emitted.
    Finish(NodeId, Vec3),
}

/// Append the post-order records of the subtree at `start` to `records`.
///
/// Returns the index of the subtree root, which is the last record appended.
fn compile_subtree<R: MaterialResolver + ?Sized>(
    octree: &Octree,
    resolver: &R,
    start: NodeId,
    anchor: Vec3,
    records: &mut Vec<CompiledRecord>,
) -> u32 {
    let mut tasks = vec![Task::Visit(start, anchor)];
    // Indices of finished subtrees not yet claimed by their parent.
    let mut finished: Vec<u32> = Vec::new();

    while let Some(task) = tasks.pop() {
        match task {
            Task::Visit(id, position) => {
                let node = &octree[id];
                match node.kind() {
                    NodeKind::Internal(children) => {
                        tasks.push(Task::Finish(id, position));
                        let child_size = node.size() / 2;
                        // reversed so that octant 0 is popped first
                        for (octant, &child) in children.iter().enumerate().rev() {
                            tasks.push(Task::Visit(
                                child,
                                position + child_offset(octant, child_size),
                            ));
                        }
                    }
                    NodeKind::Leaf | NodeKind::Empty => {
                        let terminal = TerminalNode {
                            position,
                            size: node.size(),
                            is_leaf: node.is_leaf(),
                        };
                        let material = resolver.resolve(&terminal);
                        finished.push(push_record(
                            records,
                            CompiledRecord::terminal(
                                position,
                                terminal.size,
                                material,
                                terminal.is_leaf,
                            ),
                        ));
                    }
                }
            }
            Task::Finish(id, position) => {
                let first = finished.len() - CHILD_COUNT;
                let mut child_indices = [NULL_CHILD; CHILD_COUNT];
                child_indices.copy_from_slice(&finished[first..]);
                finished.truncate(first);

                let record = CompiledRecord::internal(position, octree[id].size(), child_indices);
                finished.push(push_record(records, record));
            }
        }
    }

    debug_assert_eq!(finished.len(), 1);
    finished[0]
}

fn push_record(records: &mut Vec<CompiledRecord>, record: CompiledRecord) -> u32 {
    let index = records.len() as u32;
    records.push(record);
    index
}
