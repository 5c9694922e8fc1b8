//! Sparse Voxel Octree builder.
//!
//! Nodes live in a single arena and refer to their children by [`NodeId`].
//! Insertion walks down from the root with a loop, so stack usage does not
//! grow with tree depth.

use std::ops::Index;

use fastvox_core::constants::{CHILD_COUNT, DEFAULT_MAX_DEPTH};
use fastvox_core::{DroppedPointWarning, Error, InsertError, Result};
use glam::UVec3;
use tracing::{debug, warn};

use crate::octant::octant_of;

/// Most nodes a single arena can address with a [`NodeId`].
pub const MAX_NODES: usize = u32::MAX as usize;

/// Handle of a node in the octree arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The root node.
    pub const ROOT: Self = Self(0);

    /// Position of the node in the arena.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// State of an octree node.
///
/// A node starts out `Empty` and moves at most once, to `Leaf` or `Internal`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeKind {
    /// No point has reached this node.
    #[default]
    Empty,
    /// A point reached this unit-sized node.
    Leaf,
    /// Node subdivided into 8 children, in octant order.
    Internal([NodeId; CHILD_COUNT]),
}

/// A node in the sparse voxel octree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OctreeNode {
    size: u32,
    kind: NodeKind,
}

impl OctreeNode {
    const fn new(size: u32) -> Self {
        Self {
            size,
            kind: NodeKind::Empty,
        }
    }

    /// Half-extent of the node.
    #[inline]
    pub const fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Check if the node is empty.
    pub const fn is_empty(&self) -> bool {
        matches!(self.kind, NodeKind::Empty)
    }

    /// Check if the node is a leaf.
    pub const fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf)
    }

    /// Check if the node is subdivided.
    pub const fn is_internal(&self) -> bool {
        matches!(self.kind, NodeKind::Internal(_))
    }

    /// Get children if this is an internal node.
    pub const fn children(&self) -> Option<&[NodeId; CHILD_COUNT]> {
        match &self.kind {
            NodeKind::Internal(children) => Some(children),
            _ => None,
        }
    }
}

/// Outcome of inserting a batch of points.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InsertReport {
    /// Points that reached a leaf.
    pub inserted: usize,
    /// Points that matched no octant on their way down.
    pub dropped: Vec<DroppedPointWarning>,
}

impl InsertReport {
    /// Total number of points seen.
    pub fn total(&self) -> usize {
        self.inserted + self.dropped.len()
    }
}

/// Sparse voxel octree grown by point insertion.
#[derive(Clone, Debug)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    root_size: u32,
    depth: u32,
    node_limit: usize,
}

impl Octree {
    /// Create an empty octree with the default depth limit.
    pub fn new(root_size: u32) -> Result<Self> {
        Self::with_max_depth(root_size, DEFAULT_MAX_DEPTH)
    }

    /// Create an empty octree, rejecting roots deeper than `max_depth` levels.
    ///
    /// `root_size` must be a power of two so that halving ends at 1.
    pub fn with_max_depth(root_size: u32, max_depth: u32) -> Result<Self> {
        if !root_size.is_power_of_two() {
            return Err(Error::InvalidRootSize(root_size));
        }

        let depth = root_size.trailing_zeros();
        if depth > max_depth {
            return Err(Error::DepthLimitExceeded {
                root_size,
                depth,
                max_depth,
            });
        }

        Ok(Self {
            nodes: vec![OctreeNode::new(root_size)],
            root_size,
            depth,
            node_limit: MAX_NODES,
        })
    }

    /// Cap the arena at `limit` nodes, clamped to [`MAX_NODES`].
    ///
    /// Once a subdivision would exceed the cap, inserting fails with
    /// [`InsertError::ArenaFull`].
    #[must_use]
    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = limit.min(MAX_NODES);
        self
    }

    /// Most nodes this arena may grow to.
    pub const fn node_limit(&self) -> usize {
        self.node_limit
    }

    /// Size of the root node.
    pub const fn root_size(&self) -> u32 {
        self.root_size
    }

    /// Number of subdivision levels below the root.
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Get the root node.
    pub fn root(&self) -> &OctreeNode {
        &self.nodes[NodeId::ROOT.index()]
    }

    /// Get a node by handle.
    pub fn node(&self, id: NodeId) -> Option<&OctreeNode> {
        self.nodes.get(id.index())
    }

    /// Total nodes in the arena, including empty children.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaf nodes.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// Returns true if no point has been inserted.
    pub fn is_empty(&self) -> bool {
        self.root().is_empty()
    }

    /// Get memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>() + self.nodes.capacity() * std::mem::size_of::<OctreeNode>()
    }

    /// Insert a single point.
    ///
    /// The point descends until it reaches a node of size 1, which becomes a
    /// leaf. Points landing in an existing leaf collapse into it. A point with
    /// a coordinate equal to a node's split plane matches no child and is
    /// rejected with [`InsertError::Dropped`]; the node where that happens is
    /// left untouched. A node that cannot be subdivided within the node limit
    /// is left untouched as well.
    pub fn insert(&mut self, point: UVec3) -> std::result::Result<(), InsertError> {
        let mut current = NodeId::ROOT;
        loop {
            let node = self.nodes[current.index()];
            if node.size == 1 {
                self.nodes[current.index()].kind = NodeKind::Leaf;
                return Ok(());
            }

            let boundary = node.size / 2;
            let octant = octant_of(point, boundary).ok_or(DroppedPointWarning {
                point,
                node_size: node.size,
                boundary,
            })?;

            let children = match node.kind {
                NodeKind::Internal(children) => children,
                NodeKind::Empty | NodeKind::Leaf => self.subdivide(current)?,
            };
            current = children[octant];
        }
    }

    /// Insert every point of a batch, collecting the dropped ones.
    ///
    /// Stops at the first point that would overflow the node limit.
    pub fn insert_all<I>(&mut self, points: I) -> Result<InsertReport>
    where
        I: IntoIterator<Item = UVec3>,
    {
        let mut report = InsertReport::default();
        for point in points {
            match self.insert(point) {
                Ok(()) => report.inserted += 1,
                Err(InsertError::Dropped(warning)) => {
                    debug!("{warning}");
                    report.dropped.push(warning);
                }
                Err(InsertError::ArenaFull { nodes, limit }) => {
                    return Err(Error::ArenaFull { nodes, limit });
                }
            }
        }

        if !report.dropped.is_empty() {
            warn!(
                "{} of {} points lie on a split plane and were dropped",
                report.dropped.len(),
                report.total()
            );
        }
        debug!(
            "Octree holds {} nodes ({} leaves) after {} insertions",
            self.node_count(),
            self.leaf_count(),
            report.inserted
        );

        Ok(report)
    }

    /// Allocate 8 empty children for a node.
    fn subdivide(
        &mut self,
        id: NodeId,
    ) -> std::result::Result<[NodeId; CHILD_COUNT], InsertError> {
        let len = self.nodes.len();
        if len + CHILD_COUNT > self.node_limit {
            return Err(InsertError::ArenaFull {
                nodes: len,
                limit: self.node_limit,
            });
        }

        // node_limit <= MAX_NODES, so every new id fits in a u32
        let first = len as u32;
        let children = std::array::from_fn(|i| NodeId(first + i as u32));
        let child_size = self.nodes[id.index()].size / 2;

        self.nodes
            .resize(len + CHILD_COUNT, OctreeNode::new(child_size));
        self.nodes[id.index()].kind = NodeKind::Internal(children);
        Ok(children)
    }
}

impl Index<NodeId> for Octree {
    type Output = OctreeNode;

    fn index(&self, id: NodeId) -> &OctreeNode {
        &self.nodes[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dropped(result: std::result::Result<(), InsertError>) -> DroppedPointWarning {
        match result {
            Err(InsertError::Dropped(warning)) => warning,
            other => panic!("expected a dropped point, got {other:?}"),
        }
    }

    /// Follow the octant predicates from the root as far as the tree goes.
    fn descend(octree: &Octree, point: UVec3) -> Option<&OctreeNode> {
        let mut node = octree.root();
        while let Some(children) = node.children() {
            let octant = octant_of(point, node.size() / 2)?;
            node = &octree[children[octant]];
        }
        Some(node)
    }

    #[test]
    fn empty_octree() {
        let octree = Octree::new(32).unwrap();
        assert!(octree.is_empty());
        assert_eq!(octree.depth(), 5);
        assert_eq!(octree.node_count(), 1);
        assert_eq!(octree.leaf_count(), 0);
    }

    #[test]
    fn rejects_non_power_of_two() {
        assert!(matches!(Octree::new(0), Err(Error::InvalidRootSize(0))));
        assert!(matches!(Octree::new(12), Err(Error::InvalidRootSize(12))));
    }

    #[test]
    fn rejects_excessive_depth() {
        let err = Octree::with_max_depth(1 << 10, 8).unwrap_err();
        assert!(matches!(
            err,
            Error::DepthLimitExceeded {
                root_size: 1024,
                depth: 10,
                max_depth: 8,
            }
        ));
        assert!(Octree::with_max_depth(256, 8).is_ok());
    }

    #[test]
    fn unit_root_becomes_leaf() {
        let mut octree = Octree::new(1).unwrap();
        octree.insert(UVec3::ZERO).unwrap();
        assert!(octree.root().is_leaf());
        assert_eq!(octree.node_count(), 1);
    }

    #[test]
    fn single_point_subdivides_every_level() {
        let mut octree = Octree::new(4).unwrap();
        octree.insert(UVec3::new(3, 3, 3)).unwrap();

        assert!(octree.root().is_internal());
        // root + 8 children + 8 grandchildren
        assert_eq!(octree.node_count(), 17);
        assert_eq!(octree.leaf_count(), 1);

        let leaf = descend(&octree, UVec3::new(3, 3, 3)).unwrap();
        assert!(leaf.is_leaf());
        assert_eq!(leaf.size(), 1);
    }

    #[test]
    fn children_start_empty_at_half_size() {
        let mut octree = Octree::new(8).unwrap();
        octree.insert(UVec3::new(7, 7, 7)).unwrap();

        let children = octree.root().children().unwrap();
        assert!(octree[children[0]].is_internal());
        for &child in &children[1..] {
            assert!(octree[child].is_empty());
            assert_eq!(octree[child].size(), 4);
        }
    }

    #[test]
    fn duplicates_collapse() {
        let mut octree = Octree::new(4).unwrap();
        let report = octree
            .insert_all([UVec3::ZERO, UVec3::ZERO, UVec3::ZERO])
            .unwrap();
        assert_eq!(report.inserted, 3);
        assert_eq!(octree.leaf_count(), 1);
        assert_eq!(octree.node_count(), 17);
    }

    #[test]
    fn point_on_root_boundary_is_dropped() {
        let mut octree = Octree::new(2).unwrap();
        let warning = dropped(octree.insert(UVec3::new(1, 1, 1)));

        assert_eq!(warning.boundary, 1);
        assert_eq!(warning.node_size, 2);
        assert_eq!(warning.point, UVec3::new(1, 1, 1));
        assert!(octree.is_empty());
        assert_eq!(octree.node_count(), 1);
    }

    #[test]
    fn drop_below_root_keeps_parent_structure() {
        let mut octree = Octree::new(4).unwrap();
        // 3 > 2 at the root, then 1 == 1 one level down
        let warning = dropped(octree.insert(UVec3::new(3, 1, 3)));

        assert_eq!(warning.node_size, 2);
        assert!(octree.root().is_internal());
        let children = octree.root().children().unwrap();
        assert!(octree[children[5]].is_empty());
        assert_eq!(octree.leaf_count(), 0);
    }

    #[test]
    fn insert_all_reports_drops() {
        let mut octree = Octree::new(8).unwrap();
        let report = octree.insert_all([
            UVec3::new(0, 0, 0),
            UVec3::new(4, 0, 0),
            UVec3::new(7, 7, 7),
            UVec3::new(5, 6, 7),
        ])
        .unwrap();

        assert_eq!(report.total(), 4);
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].point, UVec3::new(4, 0, 0));
        assert_eq!(report.inserted, 3);
    }

    #[test]
    fn every_kept_point_reaches_a_unit_leaf() {
        let mut octree = Octree::new(16).unwrap();
        let points: Vec<UVec3> = (0..16)
            .flat_map(|x| (0..16).map(move |y| UVec3::new(x, y, (x * 7 + y * 3) % 16)))
            .collect();
        let report = octree.insert_all(points.iter().copied()).unwrap();

        let dropped: Vec<UVec3> = report.dropped.iter().map(|w| w.point).collect();
        for point in points.iter().filter(|p| !dropped.contains(p)) {
            let node = descend(&octree, *point).unwrap();
            assert!(node.is_leaf(), "{point} did not end at a leaf");
            assert_eq!(node.size(), 1);
        }
        assert!(report.inserted > 0);
    }

    #[test]
    fn node_limit_is_clamped_to_addressable_ids() {
        let octree = Octree::new(4).unwrap();
        assert_eq!(octree.node_limit(), MAX_NODES);
        assert_eq!(octree.with_node_limit(usize::MAX).node_limit(), MAX_NODES);
    }

    #[test]
    fn full_arena_rejects_subdivision() {
        // room for the root split only
        let mut octree = Octree::new(4).unwrap().with_node_limit(16);
        let err = octree.insert(UVec3::new(3, 3, 3)).unwrap_err();

        assert_eq!(err, InsertError::ArenaFull { nodes: 9, limit: 16 });
        assert!(octree.root().is_internal());
        let children = octree.root().children().unwrap();
        assert!(octree[children[0]].is_empty());
        assert_eq!(octree.node_count(), 9);
        assert_eq!(octree.leaf_count(), 0);
    }

    #[test]
    fn full_arena_stops_the_batch() {
        let mut octree = Octree::new(4).unwrap().with_node_limit(17);
        let err = octree
            .insert_all([UVec3::ZERO, UVec3::new(3, 3, 3)])
            .unwrap_err();

        assert!(matches!(err, Error::ArenaFull { nodes: 17, limit: 17 }));
        assert_eq!(octree.leaf_count(), 1);
    }
}
