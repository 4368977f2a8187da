//! Canvas Spatial Index
//!
//! Nodes are indexed by their canvas-space bounding boxes so box selection
//! and click hit-testing use an R*-tree range query instead of a full O(n)
//! node scan.
//!
//! The index is always built in one pass with [`SpatialIndex::build`]
//! (bulk-load). Callers rebuild it whenever the node collection changes
//! rather than inserting incrementally; a many-nodes-changed event (drag
//! release, view switch, project load) costs one bulk-load either way, and a
//! rebuilt index cannot drift from the node set it was built from.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

use canvas_model::{Node, NodeId, Point, Rect, Size};
use rstar::{RTree, RTreeObject, AABB};
use std::collections::HashSet;

/// Bounding box of one node, derived from its position and size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialItem {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub node_id: NodeId,
}

impl SpatialItem {
    /// Project a node using its explicit size or `default_size`
    #[must_use]
    pub fn from_node(node: &Node, default_size: Size) -> Self {
        let bounds = node.bounds(default_size);
        Self {
            min_x: bounds.min.x,
            min_y: bounds.min.y,
            max_x: bounds.max.x,
            max_y: bounds.max.y,
            node_id: node.id(),
        }
    }

    #[inline]
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::from_corners(
            Point::new(self.min_x, self.min_y),
            Point::new(self.max_x, self.max_y),
        )
    }
}

impl RTreeObject for SpatialItem {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }
}

/// Read-only spatial projection of a node collection
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    tree: RTree<SpatialItem>,
}

impl SpatialIndex {
    /// Bulk-load the index from a node collection
    pub fn build<'a>(
        nodes: impl IntoIterator<Item = &'a Node>,
        default_width: f64,
        default_height: f64,
    ) -> Self {
        let default_size = Size::new(default_width, default_height);
        let items: Vec<_> = nodes
            .into_iter()
            .map(|node| SpatialItem::from_node(node, default_size))
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    /// All items whose bounding box intersects `rect` (touching counts)
    #[must_use]
    pub fn query(&self, rect: Rect) -> Vec<SpatialItem> {
        let aabb = AABB::from_corners([rect.min.x, rect.min.y], [rect.max.x, rect.max.y]);
        self.tree
            .locate_in_envelope_intersecting(&aabb)
            .copied()
            .collect()
    }

    /// [`query`](Self::query) projected to a node-id set
    #[must_use]
    pub fn query_ids(&self, rect: Rect) -> HashSet<NodeId> {
        self.query(rect).into_iter().map(|item| item.node_id).collect()
    }

    /// Nodes whose bounding box contains `point`
    #[must_use]
    pub fn hit_test(&self, point: Point) -> Vec<NodeId> {
        let target = AABB::from_point([point.x, point.y]);
        self.tree
            .locate_in_envelope_intersecting(&target)
            .map(|item| item.node_id)
            .collect()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self { tree: RTree::new() }
    }
}
