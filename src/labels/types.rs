//! Label types and data structures.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::fade::Interpolation;
use super::obb::Aabb;

/// Identifier of the style that owns a label set.
pub type StyleId = u32;

/// Identifier of the source feature a label was built from.
pub type FeatureId = u64;

/// Placement of a label relative to its anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    #[default]
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Maximum number of anchor candidates per label.
pub const MAX_ANCHORS: usize = 9;

impl Anchor {
    /// Unit direction (screen space, y down) the label is pushed towards.
    pub fn direction(self) -> Vec2 {
        match self {
            Anchor::Center => Vec2::ZERO,
            Anchor::Top => Vec2::new(0.0, -1.0),
            Anchor::Bottom => Vec2::new(0.0, 1.0),
            Anchor::Left => Vec2::new(-1.0, 0.0),
            Anchor::Right => Vec2::new(1.0, 0.0),
            Anchor::TopLeft => Vec2::new(-1.0, -1.0),
            Anchor::TopRight => Vec2::new(1.0, -1.0),
            Anchor::BottomLeft => Vec2::new(-1.0, 1.0),
            Anchor::BottomRight => Vec2::new(1.0, 1.0),
        }
    }
}

/// Ordered anchor fallback list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Anchors(Vec<Anchor>);

impl Anchors {
    pub fn new(anchors: impl IntoIterator<Item = Anchor>) -> Self {
        let mut list: Vec<Anchor> = anchors.into_iter().collect();
        list.truncate(MAX_ANCHORS);
        Self(list)
    }

    pub fn center() -> Self {
        Self(vec![Anchor::Center])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Anchor {
        self.0.get(index).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = Anchor> + '_ {
        self.0.iter().copied()
    }

    /// Box covering the label at every anchor, relative to the anchor point.
    pub fn extents(&self, size: Vec2) -> Aabb {
        let mut aabb = Aabb::empty();
        for anchor in self.iter() {
            let c = anchor.direction() * 0.5;
            aabb.include((c - Vec2::splat(0.5)) * size);
            aabb.include((c + Vec2::splat(0.5)) * size);
        }
        if aabb.is_empty() {
            Aabb::from_center(Vec2::ZERO, size)
        } else {
            aabb
        }
    }
}

/// Fade parameters for one kind of state change.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Transition {
    pub ease: Interpolation,
    /// Duration in seconds; 0 switches immediately.
    pub time: f32,
}

impl Transition {
    pub fn new(ease: Interpolation, time: f32) -> Self {
        Self { ease, time }
    }
}

/// Immutable per-label options, fixed when the label set is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelOptions {
    /// Screen-space offset from the anchor point, in pixels.
    pub offset: Vec2,
    /// Lower value wins.
    pub priority: f32,
    pub collide: bool,
    pub interactive: bool,
    /// An optional label may stay visible when its relative is occluded.
    pub optional: bool,
    /// Rotation in radians for point labels.
    pub angle: f32,
    /// 0 means no group.
    pub repeat_group: u64,
    /// Minimum screen distance between labels of the same group; 0 disables.
    pub repeat_distance: f32,
    /// Extra padding around the collision box, in pixels.
    pub buffer: f32,
    pub show_transition: Transition,
    pub hide_transition: Transition,
    pub select_transition: Transition,
    pub anchors: Anchors,
    /// Hash of the styling parameters; filled by the builder.
    pub param_hash: u64,
    pub feature_id: FeatureId,
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            priority: f32::MAX,
            collide: true,
            interactive: false,
            optional: false,
            angle: 0.0,
            repeat_group: 0,
            repeat_distance: 0.0,
            buffer: 0.0,
            show_transition: Transition::default(),
            hide_transition: Transition::default(),
            select_transition: Transition::default(),
            anchors: Anchors::center(),
            param_hash: 0,
            feature_id: 0,
        }
    }
}

impl LabelOptions {
    /// Stable hash over the styling parameters, used as a sort tie-breaker.
    pub fn compute_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.offset.x.to_bits().hash(&mut hasher);
        self.offset.y.to_bits().hash(&mut hasher);
        self.priority.to_bits().hash(&mut hasher);
        self.interactive.hash(&mut hasher);
        self.collide.hash(&mut hasher);
        self.optional.hash(&mut hasher);
        self.angle.to_bits().hash(&mut hasher);
        self.repeat_distance.to_bits().hash(&mut hasher);
        self.repeat_group.hash(&mut hasher);
        self.buffer.to_bits().hash(&mut hasher);
        for t in [&self.select_transition, &self.hide_transition, &self.show_transition] {
            t.ease.hash(&mut hasher);
            t.time.to_bits().hash(&mut hasher);
        }
        self.anchors.hash(&mut hasher);
        hasher.finish()
    }

    pub fn with_priority(mut self, priority: f32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_repeat(mut self, group: u64, distance: f32) -> Self {
        self.repeat_group = group;
        self.repeat_distance = distance;
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_anchors(mut self, anchors: Anchors) -> Self {
        self.anchors = anchors;
        self
    }

    pub fn with_show_transition(mut self, transition: Transition) -> Self {
        self.show_transition = transition;
        self
    }

    pub fn with_hide_transition(mut self, transition: Transition) -> Self {
        self.hide_transition = transition;
        self
    }
}

/// Label lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LabelState {
    #[default]
    None,
    FadingIn,
    FadingOut,
    Visible,
    Sleep,
    OutOfScreen,
    SkipTransition,
    /// Terminal.
    Dead,
}

impl LabelState {
    /// RGB color used by the debug overlay.
    pub fn debug_color(self) -> u32 {
        match self {
            LabelState::Sleep | LabelState::None => 0x0000ff,
            LabelState::Visible => 0x000000,
            LabelState::Dead => 0xff00ff,
            LabelState::FadingIn => 0xffff00,
            LabelState::FadingOut => 0xff0000,
            _ => 0x999999,
        }
    }
}

/// Per-label text/icon attributes written into every vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VertexAttributes {
    /// Packed ABGR fill color.
    pub fill: u32,
    /// Packed ABGR stroke color.
    pub stroke: u32,
    /// Nonzero colors make the label pickable.
    pub selection_color: u32,
    pub font_scale: u16,
}

/// Corner of a glyph or sprite quad, relative to the label origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadCorner {
    /// Pixel offset from the label origin.
    pub pos: Vec2,
    /// Texture coordinates.
    pub uv: [u16; 2],
}

/// One glyph (or sprite) quad with the atlas it samples from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphQuad {
    pub atlas: usize,
    pub quad: [QuadCorner; 4],
}

impl GlyphQuad {
    /// Axis-aligned quad covering `min..max` with the full texture.
    pub fn rect(atlas: usize, min: Vec2, max: Vec2) -> Self {
        let corner = |x: f32, y: f32, u: u16, v: u16| QuadCorner {
            pos: Vec2::new(x, y),
            uv: [u, v],
        };
        Self {
            atlas,
            quad: [
                corner(min.x, min.y, 0, 0),
                corner(max.x, min.y, u16::MAX, 0),
                corner(max.x, max.y, u16::MAX, u16::MAX),
                corner(min.x, max.y, 0, u16::MAX),
            ],
        }
    }

    /// Horizontal extent of the quad.
    pub fn x_range(&self) -> (f32, f32) {
        self.quad.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c.pos.x), hi.max(c.pos.x))
        })
    }
}
