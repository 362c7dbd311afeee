//! R-tree over the screen boxes of emitted labels, used for picking.

use std::fmt;

use glam::Vec2;
use rstar::{RTree, RTreeObject, AABB};

use super::obb::Aabb;
use super::types::FeatureId;

/// Screen box of one emitted label.
#[derive(Debug, Clone, Copy)]
pub struct LabelBounds {
    pub feature_id: FeatureId,
    pub bounds: Aabb,
}

impl RTreeObject for LabelBounds {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bounds.min.to_array(), self.bounds.max.to_array())
    }
}

/// Pick index rebuilt once per frame from the emitted labels.
pub struct LabelRTree {
    tree: RTree<LabelBounds>,
    pending: Vec<LabelBounds>,
}

impl Default for LabelRTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LabelRTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelRTree")
            .field("len", &self.tree.size())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl LabelRTree {
    pub fn new() -> Self {
        Self {
            tree: RTree::new(),
            pending: Vec::new(),
        }
    }

    /// Drop all boxes.
    pub fn clear(&mut self) {
        self.tree = RTree::new();
        self.pending.clear();
    }

    /// Queue a box for the next [`LabelRTree::build`].
    pub fn push(&mut self, feature_id: FeatureId, bounds: Aabb) {
        if bounds.is_empty() {
            return;
        }
        self.pending.push(LabelBounds { feature_id, bounds });
    }

    /// Bulk load the queued boxes.
    pub fn build(&mut self) {
        self.tree = RTree::bulk_load(std::mem::take(&mut self.pending));
    }

    /// Features whose box contains `point`, nearest box center first.
    pub fn features_at_point(&self, point: Vec2) -> Vec<FeatureId> {
        let envelope = AABB::from_point(point.to_array());
        let mut hits: Vec<(f32, FeatureId)> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|b| b.bounds.contains(point))
            .map(|b| (b.bounds.center().distance_squared(point), b.feature_id))
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        hits.dedup_by_key(|hit| hit.1);
        hits.into_iter().map(|(_, id)| id).collect()
    }

    /// All boxes overlapping `area`.
    pub fn query(&self, area: &Aabb) -> Vec<LabelBounds> {
        let envelope = AABB::from_corners(area.min.to_array(), area.max.to_array());
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(x0: f32, y0: f32, x1: f32, y1: f32) -> Aabb {
        Aabb::new(Vec2::new(x0, y0), Vec2::new(x1, y1))
    }

    #[test]
    fn test_nearest_first() {
        let mut tree = LabelRTree::new();
        tree.push(1, boxed(0.0, 0.0, 40.0, 40.0));
        tree.push(2, boxed(10.0, 10.0, 20.0, 20.0));
        tree.push(3, boxed(50.0, 50.0, 60.0, 60.0));
        tree.build();

        assert_eq!(tree.len(), 3);
        assert_eq!(tree.features_at_point(Vec2::new(15.0, 15.0)), vec![2, 1]);
        assert!(tree.features_at_point(Vec2::new(45.0, 45.0)).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut tree = LabelRTree::new();
        tree.push(1, boxed(0.0, 0.0, 10.0, 10.0));
        tree.build();
        tree.clear();
        assert!(tree.is_empty());
        assert!(tree.features_at_point(Vec2::new(5.0, 5.0)).is_empty());
    }

    #[test]
    fn test_query() {
        let mut tree = LabelRTree::new();
        tree.push(1, boxed(0.0, 0.0, 20.0, 20.0));
        tree.push(2, boxed(50.0, 50.0, 70.0, 70.0));
        tree.build();
        assert_eq!(tree.query(&boxed(10.0, 10.0, 60.0, 60.0)).len(), 2);
    }
}
