//! Label sets: the labels of one tile (or marker) for one style.
//!
//! A [`LabelSetBuilder`] runs on a worker thread while the tile is being
//! built. When it finishes it runs the tile-local collider, and the finished
//! [`LabelSet`] is moved to the main thread.

use glam::{Vec2, Vec3};

use super::collider::LabelCollider;
use super::label::Label;
use super::obb::Range;
use super::types::{Anchors, GlyphQuad};
use crate::config::PlacementConfig;
use crate::error::{LabelError, LabelResult};
use crate::mesh::StyleMeshes;

/// Labels in stable insertion order plus the quads they draw.
#[derive(Debug, Clone, Default)]
pub struct LabelSet {
    labels: Vec<Label>,
    quads: Vec<GlyphQuad>,
}

impl LabelSet {
    /// Wrap already prepared labels without running the collider.
    pub fn new(labels: Vec<Label>, quads: Vec<GlyphQuad>) -> Self {
        Self { labels, quads }
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn labels_mut(&mut self) -> &mut [Label] {
        &mut self.labels
    }

    pub fn label(&self, index: usize) -> Option<&Label> {
        self.labels.get(index)
    }

    pub fn label_mut(&mut self, index: usize) -> Option<&mut Label> {
        self.labels.get_mut(index)
    }

    pub fn quads(&self) -> &[GlyphQuad] {
        &self.quads
    }

    /// Labels for mutation alongside the quads they draw.
    pub(crate) fn parts_mut(&mut self) -> (&mut [Label], &[GlyphQuad]) {
        (&mut self.labels, &self.quads)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Emit label `index` into `meshes`.
    pub fn add_vertices_to_mesh(
        &self,
        index: usize,
        transform: &[Vec3],
        screen_size: Vec2,
        meshes: &mut StyleMeshes,
    ) {
        if let Some(label) = self.labels.get(index) {
            label.add_vertices_to_mesh(transform, screen_size, &self.quads, meshes);
        }
    }
}

/// Collects labels for one tile and style.
#[derive(Debug)]
pub struct LabelSetBuilder {
    labels: Vec<Label>,
    quads: Vec<GlyphQuad>,
    tile_size: f32,
}

impl Default for LabelSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelSetBuilder {
    pub fn new() -> Self {
        Self {
            labels: Vec::new(),
            quads: Vec::new(),
            tile_size: 256.0,
        }
    }

    /// Tile size in pixels the collider evaluates the set at.
    pub fn with_tile_size(mut self, tile_size: f32) -> Self {
        self.tile_size = tile_size.max(1.0);
        self
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Add a label without quads.
    pub fn push(&mut self, label: Label) -> usize {
        self.push_with_quads(label, std::iter::empty())
    }

    /// Add a label and the quads it draws, returning its index.
    ///
    /// Fills in defaults the core relies on: a label without anchors gets a
    /// single center anchor, and a zero parameter hash is computed from the
    /// options.
    pub fn push_with_quads(&mut self, mut label: Label, quads: impl IntoIterator<Item = GlyphQuad>) -> usize {
        let start = self.quads.len();
        self.quads.extend(quads);
        label.set_quads(Range::new(start, self.quads.len() - start));

        let options = label.options_mut();
        if options.anchors.is_empty() {
            options.anchors = Anchors::center();
        }
        if !options.repeat_distance.is_finite() || options.repeat_distance < 0.0 {
            options.repeat_distance = 0.0;
        }
        options.buffer = options.buffer.max(0.0);
        if options.param_hash == 0 {
            options.param_hash = options.compute_hash();
        }
        label.set_anchor_index(0);

        self.labels.push(label);
        self.labels.len() - 1
    }

    /// Link `child` to `parent`, e.g. text to its icon.
    pub fn link(&mut self, parent: usize, child: usize) -> LabelResult<()> {
        let len = self.labels.len();
        if parent >= len || child >= len || parent == child {
            log::warn!("Rejecting label link {parent} -> {child} in a set of {len}");
            return Err(LabelError::InvalidRelative { parent, child, len });
        }

        let parent_dim = self.labels[parent].dimension();
        self.labels[parent].set_relative(child, false, Vec2::ZERO);
        self.labels[child].set_relative(parent, true, parent_dim);
        Ok(())
    }

    /// Run the tile collider and hand out the finished set.
    pub fn finish(mut self, config: &PlacementConfig) -> LabelSet {
        LabelCollider::new().process(&mut self.labels, self.tile_size, config);
        LabelSet::new(self.labels, self.quads)
    }
}
