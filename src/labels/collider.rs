//! Tile-local collision pre-filter.
//!
//! Runs once when a tile's labels are built, independent of the camera. The
//! tile is projected full-screen at a fixed overzoom so that labels which would
//! collide at every zoom the tile is displayed at are killed up front. Every
//! colliding label leaves the pass as `none` or `dead`.

use std::cmp::Ordering;

use glam::Vec2;

use super::collision::CollisionGrid;
use super::label::Label;
use super::obb::{Aabb, ObbBuffer, Range};
use super::projection::LabelProjector;
use super::repeat::filter_repeat_groups;
use super::screen_transform::TransformBuffer;
use super::types::LabelState;
use crate::config::PlacementConfig;
use crate::view::ViewState;

/// Sort order of the collider: priority, repeat group, candidate priority,
/// hash, then insertion order.
fn collider_order(labels: &[Label], a: usize, b: usize) -> Ordering {
    let (l1, l2) = (&labels[a], &labels[b]);
    let (o1, o2) = (l1.options(), l2.options());

    o1.priority
        .total_cmp(&o2.priority)
        .then(o1.repeat_group.cmp(&o2.repeat_group))
        .then_with(|| {
            if l1.same_kind(l2) {
                l1.candidate_priority().total_cmp(&l2.candidate_priority())
            } else {
                Ordering::Equal
            }
        })
        .then(l1.hash().cmp(&l2.hash()))
        .then(a.cmp(&b))
}

/// Reusable scratch state for the tile pass.
#[derive(Debug, Default)]
pub struct LabelCollider {
    grid: CollisionGrid,
    transforms: TransformBuffer,
    obbs: ObbBuffer,
}

impl LabelCollider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve intra-tile collisions for `labels`, which must be in tile units.
    pub fn process(&mut self, labels: &mut [Label], tile_size: f32, config: &PlacementConfig) {
        self.transforms.reset();
        self.obbs.reset();

        let mut order: Vec<usize> = (0..labels.len()).filter(|&i| labels[i].can_occlude()).collect();
        if order.is_empty() {
            return;
        }
        order.sort_by(|&a, &b| collider_order(labels, a, b));

        let screen = tile_size * config.overzoom_scale();
        let projector = LabelProjector::tile_centered(screen);
        let view = ViewState::new(screen, screen, 0.0).with_tile_size(tile_size);
        let mvp = projector.mvp();

        // Labels that project, in sort order, with their boxes
        let mut placed: Vec<usize> = Vec::with_capacity(order.len());
        let mut obb_ranges: Vec<Range> = Vec::with_capacity(order.len());
        let mut aabbs: Vec<Aabb> = Vec::with_capacity(order.len());

        for &index in &order {
            let label = &mut labels[index];
            let mut transform = self.transforms.begin();
            if !label.update(&mvp, &view, None, config, &mut transform) {
                continue;
            }
            let range = transform.finish();
            let obbs = label.obbs(self.transforms.get(range), &mut self.obbs, config);

            let aabb = self
                .obbs
                .get(obbs)
                .iter()
                .fold(Aabb::empty(), |acc, obb| acc.union(&obb.extent()));

            placed.push(index);
            obb_ranges.push(obbs);
            aabbs.push(aabb);
        }

        let cells = (Vec2::splat(screen) / config.collider_grid_divisor).ceil().as_uvec2();
        self.grid.resize(cells, Vec2::splat(screen));
        let pairs = self.grid.intersect_all(&aabbs);
        let pair_count = pairs.len();

        // Repeated labels must not occlude other candidates
        filter_repeat_groups(labels, &placed);

        for (a, b) in pairs {
            let (ia, ib) = (placed[a], placed[b]);
            if labels[ia].is_occluded() || labels[ib].is_occluded() {
                continue;
            }
            // Linked labels are placed against each other
            if labels[ia].relative() == Some(ib) {
                continue;
            }

            let boxes_a = self.obbs.get(obb_ranges[a]);
            let boxes_b = self.obbs.get(obb_ranges[b]);
            let hit = boxes_a
                .iter()
                .any(|oa| boxes_b.iter().any(|ob| oa.intersects(ob)));
            if !hit {
                continue;
            }

            // Equal priorities drop the lower hash, so two builds of one tile agree
            let (l1, l2) = (&labels[ia], &labels[ib]);
            let loser = match l1.options().priority.total_cmp(&l2.options().priority) {
                Ordering::Greater => ia,
                Ordering::Less => ib,
                Ordering::Equal if l1.hash() < l2.hash() => ia,
                Ordering::Equal => ib,
            };
            labels[loser].occlude(true);
            labels[loser].enter_state(LabelState::Sleep, 0.0);
        }

        resolve_relatives(labels, &order);

        let mut dead = 0;
        for &index in &order {
            let label = &mut labels[index];
            if label.is_occluded() {
                label.enter_state(LabelState::Dead, 0.0);
                dead += 1;
            } else {
                label.enter_state(LabelState::None, 0.0);
                label.occlude(false);
            }
        }

        log::debug!(
            "collider: {} candidates, {} projected, {} pairs, {} dead",
            order.len(),
            placed.len(),
            pair_count,
            dead
        );
    }
}

/// Cascade occlusion between linked labels.
///
/// A child inherits its parent's occlusion; an occluded non-optional child
/// takes its parent down with it.
pub(crate) fn resolve_relatives(labels: &mut [Label], order: &[usize]) {
    let inherit = |labels: &mut [Label]| {
        for &index in order {
            let Some(parent) = labels[index].relative().filter(|_| labels[index].is_child()) else {
                continue;
            };
            if labels.get(parent).map_or(false, Label::is_occluded) {
                labels[index].occlude(true);
            }
        }
    };

    inherit(labels);

    for &index in order {
        let label = &labels[index];
        if !label.is_child() || !label.is_occluded() || label.options().optional {
            continue;
        }
        if let Some(parent) = label.relative() {
            if let Some(parent) = labels.get_mut(parent) {
                parent.occlude(true);
            }
        }
    }

    // Siblings of a parent that was just taken down
    inherit(labels);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::types::{Anchor, Anchors, LabelOptions};

    fn tile_label(x: f32, y: f32, priority: f32) -> Label {
        // 20x10 px at the collider scale of 1024 px per tile
        Label::point(Vec2::new(x, y), Vec2::new(20.0, 10.0), LabelOptions::default().with_priority(priority))
    }

    #[test]
    fn test_priority_wins() {
        let mut labels = vec![tile_label(0.5, 0.5, 2.0), tile_label(0.505, 0.5, 1.0)];
        LabelCollider::new().process(&mut labels, 256.0, &PlacementConfig::default());
        assert_eq!(labels[0].state(), LabelState::Dead);
        assert_eq!(labels[1].state(), LabelState::None);
        assert!(!labels[1].is_occluded());
    }

    #[test]
    fn test_separated_labels_survive() {
        let mut labels = vec![tile_label(0.25, 0.5, 1.0), tile_label(0.75, 0.5, 1.0)];
        LabelCollider::new().process(&mut labels, 256.0, &PlacementConfig::default());
        assert!(labels.iter().all(|l| l.state() == LabelState::None));
    }

    #[test]
    fn test_equal_priority_higher_hash_wins() {
        let mut a = tile_label(0.5, 0.5, 1.0);
        let mut b = tile_label(0.5, 0.5, 1.0);
        a.options_mut().param_hash = 9;
        b.options_mut().param_hash = 4;
        let mut labels = vec![a, b];
        LabelCollider::new().process(&mut labels, 256.0, &PlacementConfig::default());
        assert_eq!(labels[0].state(), LabelState::None);
        assert_eq!(labels[1].state(), LabelState::Dead);

        // Same outcome whichever label comes first
        let mut a = tile_label(0.5, 0.5, 1.0);
        let mut b = tile_label(0.5, 0.5, 1.0);
        a.options_mut().param_hash = 4;
        b.options_mut().param_hash = 9;
        let mut labels = vec![a, b];
        LabelCollider::new().process(&mut labels, 256.0, &PlacementConfig::default());
        assert_eq!(labels[0].state(), LabelState::Dead);
        assert_eq!(labels[1].state(), LabelState::None);
    }

    #[test]
    fn test_repeat_group_killed() {
        let options = LabelOptions::default().with_priority(1.0).with_repeat(5, 100.0);
        let mut labels = vec![
            Label::point(Vec2::new(0.4, 0.5), Vec2::splat(10.0), options.clone()),
            Label::point(Vec2::new(0.45, 0.5), Vec2::splat(10.0), options),
        ];
        LabelCollider::new().process(&mut labels, 256.0, &PlacementConfig::default());
        let dead = labels.iter().filter(|l| l.state() == LabelState::Dead).count();
        assert_eq!(dead, 1);
    }

    #[test]
    fn test_non_colliding_untouched() {
        let mut labels = vec![tile_label(0.5, 0.5, 1.0), Label::debug(Vec2::splat(0.5), Vec2::splat(40.0))];
        LabelCollider::new().process(&mut labels, 256.0, &PlacementConfig::default());
        assert_eq!(labels[0].state(), LabelState::None);
        assert_eq!(labels[1].state(), LabelState::Visible);
    }

    /// Icon at the tile center with a text child anchored below it.
    fn icon_with_text(optional: bool) -> Vec<Label> {
        let mut icon = tile_label(0.5, 0.5, 1.0);
        let mut text = Label::point(
            Vec2::new(0.5, 0.5),
            Vec2::new(40.0, 10.0),
            LabelOptions::default()
                .with_priority(1.0)
                .with_optional(optional)
                .with_anchors(Anchors::new([Anchor::Bottom])),
        );
        icon.set_relative(1, false, Vec2::ZERO);
        text.set_relative(0, true, icon.dimension());
        vec![icon, text]
    }

    #[test]
    fn test_optional_child_keeps_parent() {
        let mut labels = icon_with_text(true);
        // Over the text only
        labels.push(tile_label(0.5, 0.5 + 18.0 / 1024.0, 0.0));
        LabelCollider::new().process(&mut labels, 256.0, &PlacementConfig::default());

        assert_eq!(labels[1].state(), LabelState::Dead);
        assert_eq!(labels[0].state(), LabelState::None);
        assert_eq!(labels[2].state(), LabelState::None);
    }

    #[test]
    fn test_child_inherits_parent_occlusion() {
        for optional in [false, true] {
            let mut labels = icon_with_text(optional);
            // Over the icon only
            labels.push(tile_label(0.5, 0.5 - 8.0 / 1024.0, 0.0));
            LabelCollider::new().process(&mut labels, 256.0, &PlacementConfig::default());

            assert_eq!(labels[0].state(), LabelState::Dead);
            assert_eq!(labels[1].state(), LabelState::Dead, "optional: {optional}");
            assert_eq!(labels[2].state(), LabelState::None);
        }
    }
}
