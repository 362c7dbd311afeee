//! A single label instance and its state machine.
//!
//! Every geometry variant shares the same lifecycle: a label is projected with
//! [`Label::update`], its collision boxes are produced with [`Label::obbs`],
//! the placement passes set its occlusion flag, and [`Label::eval_state`]
//! turns that flag into a state transition and an alpha value.

use glam::{Mat4, Vec2, Vec3};

use super::fade::FadeEffect;
use super::obb::{Aabb, Obb, ObbBuffer, Range};
use super::projection::LabelProjector;
use super::screen_transform::{path_length, push_sampled_path, sample_path, ScreenTransform};
use super::types::{Anchor, FeatureId, GlyphQuad, LabelOptions, LabelState, VertexAttributes};
use crate::config::PlacementConfig;
use crate::mesh::{LabelVertex, StyleMeshes};
use crate::view::ViewState;

/// Geometry of a label in tile-local world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelKind {
    /// Text or sprite anchored at a point.
    Point { position: Vec2 },
    /// Straight text along a segment.
    Line { start: Vec2, end: Vec2 },
    /// Text following a polyline; `anchor_point` indexes the vertex the text
    /// is centered on.
    Curved { path: Vec<Vec2>, anchor_point: usize },
    /// Overlay label that never takes part in collision.
    Debug { position: Vec2 },
}

impl LabelKind {
    fn same_variant(&self, other: &LabelKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// One label: immutable geometry and options plus per-frame placement state.
#[derive(Debug, Clone)]
pub struct Label {
    kind: LabelKind,
    dim: Vec2,
    options: LabelOptions,
    attributes: VertexAttributes,
    /// Glyph quads of this label inside its label set.
    quads: Range,

    relative: Option<usize>,
    is_child: bool,
    relative_dim: Vec2,

    state: LabelState,
    alpha: f32,
    fade: FadeEffect,
    occluded: bool,
    occluded_last_frame: bool,
    anchor_index: usize,
    anchor_start: usize,
    anchor_offset: Vec2,
    screen_center: Vec2,
}

impl Label {
    pub fn new(kind: LabelKind, dim: Vec2, options: LabelOptions) -> Self {
        let debug = matches!(kind, LabelKind::Debug { .. });
        let mut label = Self {
            kind,
            dim,
            options,
            attributes: VertexAttributes::default(),
            quads: Range::default(),
            relative: None,
            is_child: false,
            relative_dim: Vec2::ZERO,
            state: if debug { LabelState::Visible } else { LabelState::None },
            alpha: if debug { 1.0 } else { 0.0 },
            fade: FadeEffect::default(),
            occluded: false,
            occluded_last_frame: false,
            anchor_index: 0,
            anchor_start: 0,
            anchor_offset: Vec2::ZERO,
            screen_center: Vec2::ZERO,
        };
        label.apply_anchor();
        label
    }

    pub fn point(position: Vec2, dim: Vec2, options: LabelOptions) -> Self {
        Self::new(LabelKind::Point { position }, dim, options)
    }

    pub fn line(start: Vec2, end: Vec2, dim: Vec2, options: LabelOptions) -> Self {
        Self::new(LabelKind::Line { start, end }, dim, options)
    }

    pub fn curved(path: Vec<Vec2>, anchor_point: usize, dim: Vec2, options: LabelOptions) -> Self {
        let anchor_point = anchor_point.min(path.len().saturating_sub(1));
        Self::new(LabelKind::Curved { path, anchor_point }, dim, options)
    }

    /// Debug labels ignore their options' collision settings.
    pub fn debug(position: Vec2, dim: Vec2) -> Self {
        let options = LabelOptions {
            collide: false,
            ..LabelOptions::default()
        };
        Self::new(LabelKind::Debug { position }, dim, options)
    }

    pub fn with_attributes(mut self, attributes: VertexAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub(crate) fn set_quads(&mut self, quads: Range) {
        self.quads = quads;
    }

    pub(crate) fn options_mut(&mut self) -> &mut LabelOptions {
        &mut self.options
    }

    pub(crate) fn set_relative(&mut self, relative: usize, is_child: bool, relative_dim: Vec2) {
        self.relative = Some(relative);
        self.is_child = is_child;
        self.relative_dim = if is_child { relative_dim } else { Vec2::ZERO };
        self.apply_anchor();
    }

    pub fn kind(&self) -> &LabelKind {
        &self.kind
    }

    pub fn is_debug(&self) -> bool {
        matches!(self.kind, LabelKind::Debug { .. })
    }

    pub fn same_kind(&self, other: &Label) -> bool {
        self.kind.same_variant(&other.kind)
    }

    pub fn dimension(&self) -> Vec2 {
        self.dim
    }

    pub fn options(&self) -> &LabelOptions {
        &self.options
    }

    pub fn attributes(&self) -> &VertexAttributes {
        &self.attributes
    }

    pub fn hash(&self) -> u64 {
        self.options.param_hash
    }

    pub fn feature_id(&self) -> FeatureId {
        self.options.feature_id
    }

    pub fn selection_color(&self) -> u32 {
        self.attributes.selection_color
    }

    pub fn quads(&self) -> Range {
        self.quads
    }

    /// Atlas of the first quad, used to batch draws.
    pub fn texture(&self, quads: &[GlyphQuad]) -> Option<usize> {
        quads.get(self.quads.start).filter(|_| !self.quads.is_empty()).map(|q| q.atlas)
    }

    /// Index of the linked label in the same set.
    pub fn relative(&self) -> Option<usize> {
        self.relative
    }

    pub fn is_child(&self) -> bool {
        self.is_child
    }

    pub fn state(&self) -> LabelState {
        self.state
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_occluded(&self) -> bool {
        self.occluded
    }

    pub fn occluded_last_frame(&self) -> bool {
        self.occluded_last_frame
    }

    pub fn occlude(&mut self, occluded: bool) {
        self.occluded = occluded;
    }

    pub fn screen_center(&self) -> Vec2 {
        self.screen_center
    }

    pub fn anchor_index(&self) -> usize {
        self.anchor_index
    }

    pub fn anchor(&self) -> Anchor {
        self.options.anchors.get(self.anchor_index)
    }

    /// Screen offset of the active anchor from the projected position.
    pub fn anchor_offset(&self) -> Vec2 {
        self.anchor_offset
    }

    pub fn visible_state(&self) -> bool {
        matches!(
            self.state,
            LabelState::Visible
                | LabelState::FadingIn
                | LabelState::FadingOut
                | LabelState::SkipTransition
        )
    }

    pub fn can_occlude(&self) -> bool {
        self.options.collide && !self.is_debug() && self.state != LabelState::Dead
    }

    /// Tie-breaker among labels of the same variant; lower is preferred.
    pub fn candidate_priority(&self) -> f32 {
        let length2 = match &self.kind {
            LabelKind::Line { start, end } => start.distance_squared(*end),
            LabelKind::Curved { path, .. } => {
                let length: f32 = path.windows(2).map(|w| w[0].distance(w[1])).sum();
                length * length
            }
            _ => return 0.0,
        };
        if length2 > 0.0 {
            1.0 / length2
        } else {
            f32::MAX
        }
    }

    /// Switch state; a no-op once the label is dead.
    pub fn enter_state(&mut self, state: LabelState, alpha: f32) {
        if self.state == LabelState::Dead {
            return;
        }
        log::trace!("label {:?} -> {:?}", self.state, state);
        self.state = state;
        self.alpha = alpha.clamp(0.0, 1.0);

        if state == LabelState::Sleep {
            self.set_anchor_index(0);
        }
    }

    /// Show or hide without fading on the next evaluation.
    pub fn skip_transitions(&mut self) {
        self.enter_state(LabelState::SkipTransition, 0.0);
    }

    /// Advance the state machine by `dt` seconds.
    ///
    /// Returns true while an animation is running and another frame is needed.
    pub fn eval_state(&mut self, dt: f32) -> bool {
        if self.is_debug() {
            return false;
        }

        match self.state {
            LabelState::None | LabelState::Sleep | LabelState::OutOfScreen => {
                if self.occluded {
                    self.enter_state(LabelState::Sleep, 0.0);
                    return false;
                }
                let show = self.options.show_transition;
                if show.time <= 0.0 {
                    self.enter_state(LabelState::Visible, 1.0);
                    false
                } else {
                    self.fade.reset(true, show.ease, show.time);
                    self.enter_state(LabelState::FadingIn, 0.0);
                    true
                }
            }
            LabelState::Visible => {
                if !self.occluded {
                    return false;
                }
                let hide = self.options.hide_transition;
                if hide.time <= 0.0 {
                    self.enter_state(LabelState::Sleep, 0.0);
                    false
                } else {
                    self.fade.reset(false, hide.ease, hide.time);
                    self.enter_state(LabelState::FadingOut, 1.0);
                    true
                }
            }
            LabelState::FadingIn => {
                if self.occluded {
                    self.enter_state(LabelState::Sleep, 0.0);
                    return false;
                }
                self.alpha = self.fade.update(dt);
                if self.fade.is_finished() {
                    self.enter_state(LabelState::Visible, 1.0);
                    false
                } else {
                    true
                }
            }
            LabelState::FadingOut => {
                // Keeps fading even if the label is free again
                self.alpha = self.fade.update(dt);
                if self.fade.is_finished() {
                    self.enter_state(LabelState::Sleep, 0.0);
                    false
                } else {
                    true
                }
            }
            LabelState::SkipTransition => {
                if self.occluded {
                    self.enter_state(LabelState::Sleep, 0.0);
                } else {
                    self.enter_state(LabelState::Visible, 1.0);
                }
                true
            }
            LabelState::Dead => false,
        }
    }

    fn apply_anchor(&mut self) {
        let anchor = self.options.anchors.get(self.anchor_index);
        self.anchor_offset = anchor.direction() * (self.dim + self.relative_dim) * 0.5;
    }

    pub fn set_anchor_index(&mut self, index: usize) {
        let count = self.options.anchors.len().max(1);
        self.anchor_index = index % count;
        self.apply_anchor();
    }

    /// Move to the next anchor candidate.
    ///
    /// Returns false once the cycle is back at the anchor the label started
    /// the frame with.
    pub fn next_anchor(&mut self) -> bool {
        let count = self.options.anchors.len().max(1);
        self.set_anchor_index((self.anchor_index + 1) % count);
        self.anchor_index != self.anchor_start
    }

    /// Project the label for this frame into `transform`.
    ///
    /// `bounds` limits where the label may land; a label outside them, behind
    /// the camera, or whose geometry is too short for its text goes to sleep
    /// and returns false. A label inside `bounds` but off the viewport enters
    /// `out_of_screen`.
    pub fn update(
        &mut self,
        mvp: &Mat4,
        view: &ViewState,
        bounds: Option<&Aabb>,
        config: &PlacementConfig,
        transform: &mut ScreenTransform<'_>,
    ) -> bool {
        self.occluded_last_frame = self.occluded;
        self.occluded = false;

        if self.state == LabelState::Dead && !config.draw_all_labels {
            return false;
        }

        self.anchor_start = self.anchor_index;

        let projector = LabelProjector::new(*mvp, view.viewport_size);
        let extent = match self.update_screen_transform(&projector, bounds, config, transform) {
            Some(extent) => extent,
            None => {
                transform.discard();
                if !self.is_debug() {
                    self.enter_state(LabelState::Sleep, 0.0);
                }
                return false;
            }
        };

        if !self.is_debug() {
            let viewport = Aabb::new(Vec2::ZERO, view.viewport_size);
            if !extent.intersects(&viewport) {
                self.enter_state(LabelState::OutOfScreen, 0.0);
            }
        }

        true
    }

    /// Writes the transform and returns the screen extent of the label.
    fn update_screen_transform(
        &mut self,
        projector: &LabelProjector,
        bounds: Option<&Aabb>,
        config: &PlacementConfig,
        transform: &mut ScreenTransform<'_>,
    ) -> Option<Aabb> {
        match &self.kind {
            LabelKind::Point { position } | LabelKind::Debug { position } => {
                let sp = projector.project(*position)?;

                let mut extent = self.options.anchors.extents(self.dim);
                extent.min += sp + self.options.offset;
                extent.max += sp + self.options.offset;
                if let Some(bounds) = bounds {
                    if !extent.intersects(bounds) {
                        return None;
                    }
                }

                self.screen_center = sp;
                let rotation = Vec2::from_angle(self.options.angle);
                transform.push_point(sp + self.options.offset, 0.0);
                transform.push_point(rotation, 0.0);
                Some(extent)
            }
            LabelKind::Line { start, end } => {
                let ap0 = projector.project(*start)?;
                let ap2 = projector.project(*end)?;

                let mut segment = Aabb::empty();
                segment.include(ap0);
                segment.include(ap2);
                if let Some(bounds) = bounds {
                    if !segment.intersects(bounds) {
                        return None;
                    }
                }

                let length = ap0.distance(ap2);
                let min_length = self.dim.x * (1.0 - config.line_exceed_ratio);
                if length <= 0.0 || length < min_length {
                    return None;
                }

                let center = projector.project((*start + *end) * 0.5)?;

                // Keep the text reading left to right
                let rotation = if ap0.x <= ap2.x { ap2 - ap0 } else { ap0 - ap2 } / length;

                self.screen_center = center;
                transform.push_point(center + rotation.rotate(self.options.offset), 0.0);
                transform.push_point(rotation, 0.0);
                Some(Aabb::from_center(center, Vec2::splat(self.dim.x.max(self.dim.y))))
            }
            LabelKind::Curved { path, anchor_point } => {
                let pad = Vec2::splat(self.dim.y);
                let padded = Aabb::new(-pad, projector.screen_size() + pad);

                let mut points = Vec::with_capacity(path.len());
                let mut extent = Aabb::empty();
                let mut inside = false;
                for p in path {
                    let sp = projector.project(*p)?;
                    inside |= padded.contains(sp) && bounds.map_or(true, |b| b.contains(sp));
                    extent.include(sp);
                    points.push(sp);
                }

                push_sampled_path(&points, transform);
                let length = path_length(transform.points());
                if !inside || length < self.dim.x {
                    return None;
                }

                self.screen_center = points.get(*anchor_point).copied().unwrap_or(extent.center());
                Some(extent)
            }
        }
    }

    /// Box size used for collision, including the buffer and the hysteresis
    /// applied to labels occluded on the previous frame.
    fn collision_dim(&self, config: &PlacementConfig) -> Vec2 {
        let mut dim = self.dim + Vec2::splat(self.options.buffer * 2.0);
        if self.occluded_last_frame {
            dim += Vec2::splat(config.activation_distance_threshold);
        }
        dim
    }

    /// Append this label's collision boxes for the current anchor.
    pub fn obbs(&self, transform: &[Vec3], obbs: &mut ObbBuffer, config: &PlacementConfig) -> Range {
        let start = obbs.len();
        let dim = self.collision_dim(config);

        match &self.kind {
            LabelKind::Point { .. } | LabelKind::Debug { .. } | LabelKind::Line { .. } => {
                if let [position, rotation, ..] = transform {
                    let rotation = rotation.truncate();
                    let center = position.truncate() + rotation.rotate(self.anchor_offset);
                    obbs.append(Obb::new(center, rotation, dim.x, dim.y));
                }
            }
            LabelKind::Curved { anchor_point, .. } => {
                let center = transform.get(*anchor_point).map_or(0.0, |p| p.z);
                let total = path_length(transform);
                let from = (center - dim.x * 0.5).clamp(0.0, (total - dim.x).max(0.0));
                let to = (from + dim.x).min(total);

                for pair in transform.windows(2) {
                    let (z0, z1) = (pair[0].z, pair[1].z);
                    let seg_from = from.max(z0);
                    let seg_to = to.min(z1);
                    if seg_to <= seg_from {
                        continue;
                    }
                    let (Some(a), Some(b)) = (sample_path(transform, seg_from), sample_path(transform, seg_to))
                    else {
                        continue;
                    };
                    let dir = (pair[1].truncate() - pair[0].truncate()).normalize_or_zero();
                    let rotation = if dir == Vec2::ZERO { Vec2::X } else { dir };
                    obbs.append(Obb::new(
                        (a.position + b.position) * 0.5,
                        rotation,
                        seg_to - seg_from,
                        dim.y,
                    ));
                }
            }
        }

        Range::new(start, obbs.len() - start)
    }

    /// Write this label's quads into the style meshes.
    ///
    /// Quads entirely outside the screen (padded by the label height) are
    /// skipped, as are quads whose atlas has no mesh.
    pub fn add_vertices_to_mesh(
        &self,
        transform: &[Vec3],
        screen_size: Vec2,
        quads: &[GlyphQuad],
        meshes: &mut StyleMeshes,
    ) {
        if !self.visible_state() || self.quads.is_empty() {
            return;
        }
        let Some(quads) = quads.get(self.quads.indices()) else {
            log::warn!("Label quad range {:?} outside its set", self.quads);
            return;
        };

        let template = LabelVertex::from_attributes(&self.attributes, self.alpha);
        let visible_area = Aabb::new(Vec2::splat(-self.dim.y), screen_size + self.dim.y);

        match &self.kind {
            LabelKind::Curved { anchor_point, .. } => {
                self.add_curved_quads(transform, *anchor_point, quads, &visible_area, template, meshes);
            }
            _ => {
                let [position, rotation, ..] = transform else {
                    return;
                };
                let rotation = rotation.truncate();
                let origin = position.truncate() + rotation.rotate(self.anchor_offset);
                let rotate = rotation != Vec2::X;

                for quad in quads {
                    let corners = quad.quad.map(|c| {
                        if rotate {
                            origin + rotation.rotate(c.pos)
                        } else {
                            origin + c.pos
                        }
                    });
                    push_quad(quad, corners, &visible_area, template, meshes);
                }
            }
        }
    }

    fn add_curved_quads(
        &self,
        transform: &[Vec3],
        anchor_point: usize,
        quads: &[GlyphQuad],
        visible_area: &Aabb,
        template: LabelVertex,
        meshes: &mut StyleMeshes,
    ) {
        let total = path_length(transform);
        if total < self.dim.x {
            return;
        }
        let (Some(first), Some(last)) = (quads.first(), quads.last()) else {
            return;
        };

        let center = transform.get(anchor_point).map_or(total * 0.5, |p| p.z);

        // Reverse the path when the text would run right to left
        let start_x = first.x_range().0;
        let end_x = last.x_range().1;
        let flipped = match (sample_path(transform, center + start_x), sample_path(transform, center + end_x)) {
            (Some(a), Some(b)) => a.position.x > b.position.x,
            _ => false,
        };

        for quad in quads {
            let (x0, x1) = quad.x_range();
            let origin_x = (x0 + x1) * 0.5;
            let distance = if flipped { center - origin_x } else { center + origin_x };

            let Some(sample) = sample_path(transform, distance) else {
                continue;
            };
            let rotation = if flipped { -sample.tangent } else { sample.tangent };
            let origin = Vec2::new(origin_x, 0.0);

            let corners = quad
                .quad
                .map(|c| sample.position + rotation.rotate(c.pos - origin));
            push_quad(quad, corners, visible_area, template, meshes);
        }
    }
}

fn push_quad(
    quad: &GlyphQuad,
    corners: [Vec2; 4],
    visible_area: &Aabb,
    template: LabelVertex,
    meshes: &mut StyleMeshes,
) {
    if !corners.iter().any(|p| visible_area.contains(*p)) {
        return;
    }

    match meshes.push_quad(quad.atlas) {
        Ok(vertices) => {
            for ((vertex, corner), pos) in vertices.iter_mut().zip(&quad.quad).zip(corners) {
                *vertex = LabelVertex {
                    position: pos.to_array(),
                    uv: corner.uv,
                    ..template
                };
            }
        }
        Err(err) => log::error!("{}: {}", err.category(), err),
    }
}
