//! Label placement and collision.
//!
//! Provides:
//! - `Label` with its per-frame state machine and anchor fallback
//! - `LabelSetBuilder` and the tile-local `LabelCollider` pre-filter
//! - `LabelManager` for frame-global placement, fades and mesh emission
//! - Grid broad phase and OBB narrow phase collision
//! - Repeat-group suppression
//! - Curved text sampled along screen paths
//! - R-tree picking of emitted labels

pub mod collider;
pub mod collision;
pub mod fade;
pub mod label;
pub mod label_set;
pub mod manager;
pub mod obb;
pub mod projection;
pub mod repeat;
pub mod rtree;
pub mod screen_transform;
pub mod types;

pub use collider::LabelCollider;
pub use collision::{CollisionGrid, TaggedAabb};
pub use fade::{FadeEffect, Interpolation};
pub use label::{Label, LabelKind};
pub use label_set::{LabelSet, LabelSetBuilder};
pub use manager::{FrameStats, LabelManager, LabelOwner, LabelRef};
pub use obb::{Aabb, Obb, ObbBuffer, Range};
pub use projection::{pixel_ortho, LabelProjector};
pub use repeat::{filter_repeat_groups, RepeatGroups};
pub use rtree::{LabelBounds, LabelRTree};
pub use screen_transform::{PathSample, ScreenTransform, TransformBuffer};
pub use types::{
    Anchor, Anchors, FeatureId, GlyphQuad, LabelOptions, LabelState, QuadCorner, StyleId,
    Transition, VertexAttributes, MAX_ANCHORS,
};
