//! Client-placed markers that carry labels outside the tile pyramid.

use glam::Mat4;

use crate::arena::{Arena, Handle};
use crate::error::LabelResult;
use crate::labels::label_set::LabelSet;
use crate::labels::types::StyleId;

/// A marker with at most one label set.
#[derive(Debug, Clone)]
pub struct Marker {
    id: u32,
    draw_order: i32,
    style: StyleId,
    visible: bool,
    mvp: Mat4,
    labels: Option<LabelSet>,
}

impl Marker {
    pub fn new(id: u32, style: StyleId) -> Self {
        Self {
            id,
            draw_order: 0,
            style,
            visible: true,
            mvp: Mat4::IDENTITY,
            labels: None,
        }
    }

    pub fn with_draw_order(mut self, draw_order: i32) -> Self {
        self.draw_order = draw_order;
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn draw_order(&self) -> i32 {
        self.draw_order
    }

    pub fn style(&self) -> StyleId {
        self.style
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn mvp(&self) -> &Mat4 {
        &self.mvp
    }

    pub fn set_mvp(&mut self, mvp: Mat4) {
        self.mvp = mvp;
    }

    pub fn labels(&self) -> Option<&LabelSet> {
        self.labels.as_ref()
    }

    pub fn labels_mut(&mut self) -> Option<&mut LabelSet> {
        self.labels.as_mut()
    }

    pub fn set_labels(&mut self, labels: LabelSet) {
        self.labels = Some(labels);
    }
}

/// The markers of a map.
#[derive(Debug, Default)]
pub struct MarkerSet {
    markers: Arena<Marker>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, marker: Marker) -> Handle {
        self.markers.insert(marker)
    }

    pub fn remove(&mut self, handle: Handle) -> Option<Marker> {
        self.markers.remove(handle)
    }

    pub fn get(&self, handle: Handle) -> Option<&Marker> {
        self.markers.get(handle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Marker> {
        self.markers.get_mut(handle)
    }

    pub fn resolve(&self, handle: Handle) -> LabelResult<&Marker> {
        self.markers.resolve(handle)
    }

    pub fn resolve_mut(&mut self, handle: Handle) -> LabelResult<&mut Marker> {
        self.markers.resolve_mut(handle)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Marker)> {
        self.markers.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut Marker)> {
        self.markers.iter_mut()
    }
}
