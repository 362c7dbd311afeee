//! Repeat-group suppression.
//!
//! Labels sharing a repeat group (for example every "Main St" label of a
//! street) must keep a minimum screen distance from each other. Group 0 and a
//! distance of 0 disable the check.

use std::collections::HashMap;

use glam::Vec2;

use super::label::Label;

fn participates(label: &Label) -> bool {
    label.options().repeat_group != 0 && label.options().repeat_distance > 0.0
}

/// Occlude repeated labels inside each contiguous run of one repeat group.
///
/// `order` lists label indices in placement order; within a run the later
/// label of a pair closer than the earlier label's repeat distance is
/// occluded. Already occluded labels neither occlude nor get re-checked, so
/// running the filter twice changes nothing.
pub fn filter_repeat_groups(labels: &mut [Label], order: &[usize]) {
    let mut run_start = 0;
    while run_start < order.len() {
        let group = labels[order[run_start]].options().repeat_group;
        let mut run_end = run_start + 1;
        while run_end < order.len() && labels[order[run_end]].options().repeat_group == group {
            run_end += 1;
        }

        if group != 0 {
            filter_run(labels, &order[run_start..run_end]);
        }
        run_start = run_end;
    }
}

fn filter_run(labels: &mut [Label], run: &[usize]) {
    for (n, &i) in run.iter().enumerate() {
        if labels[i].is_occluded() || !participates(&labels[i]) {
            continue;
        }
        let center = labels[i].screen_center();
        let threshold2 = labels[i].options().repeat_distance.powi(2);

        for &j in &run[n + 1..] {
            let other = &mut labels[j];
            if other.is_occluded() {
                continue;
            }
            if center.distance_squared(other.screen_center()) < threshold2 {
                other.occlude(true);
            }
        }
    }
}

/// Screen positions of the labels placed so far in a frame, per repeat group.
#[derive(Debug, Default)]
pub struct RepeatGroups {
    placed: HashMap<u64, Vec<Vec2>>,
}

impl RepeatGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.placed.clear();
    }

    /// Whether a placed label of `group` lies closer than `distance` to `center`.
    pub fn within(&self, group: u64, center: Vec2, distance: f32) -> bool {
        let threshold2 = distance * distance;
        self.placed
            .get(&group)
            .map_or(false, |centers| centers.iter().any(|c| c.distance_squared(center) < threshold2))
    }

    pub fn insert(&mut self, group: u64, center: Vec2) {
        self.placed.entry(group).or_default().push(center);
    }

    pub fn group_count(&self) -> usize {
        self.placed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::types::LabelOptions;
    use crate::labels::obb::Aabb;
    use crate::labels::projection::pixel_ortho;
    use crate::labels::screen_transform::TransformBuffer;
    use crate::config::PlacementConfig;
    use crate::view::ViewState;

    fn placed(x: f32, group: u64, distance: f32) -> Label {
        let mut label = Label::point(
            Vec2::new(x, 100.0),
            Vec2::new(10.0, 10.0),
            LabelOptions::default().with_repeat(group, distance),
        );
        let mut buffer = TransformBuffer::new();
        let mut t = buffer.begin();
        let view = ViewState::new(512.0, 512.0, 0.0);
        let bounds = Aabb::new(Vec2::ZERO, view.viewport_size);
        assert!(label.update(&pixel_ortho(512.0, 512.0), &view, Some(&bounds), &PlacementConfig::default(), &mut t));
        label
    }

    #[test]
    fn test_filter_same_group() {
        let mut labels = vec![placed(100.0, 7, 50.0), placed(125.0, 7, 50.0), placed(200.0, 7, 50.0)];
        filter_repeat_groups(&mut labels, &[0, 1, 2]);
        assert!(!labels[0].is_occluded());
        assert!(labels[1].is_occluded());
        assert!(!labels[2].is_occluded());
    }

    #[test]
    fn test_other_groups_ignored() {
        let mut labels = vec![placed(100.0, 7, 50.0), placed(110.0, 8, 50.0), placed(120.0, 0, 50.0)];
        filter_repeat_groups(&mut labels, &[0, 1, 2]);
        assert!(labels.iter().all(|l| !l.is_occluded()));
    }

    #[test]
    fn test_zero_distance_disables() {
        let mut labels = vec![placed(100.0, 7, 0.0), placed(100.0, 7, 0.0)];
        filter_repeat_groups(&mut labels, &[0, 1]);
        assert!(labels.iter().all(|l| !l.is_occluded()));
    }

    #[test]
    fn test_idempotent() {
        let mut labels: Vec<Label> = (0..8).map(|i| placed(100.0 + i as f32 * 20.0, 3, 45.0)).collect();
        let order: Vec<usize> = (0..labels.len()).collect();
        filter_repeat_groups(&mut labels, &order);
        let first: Vec<bool> = labels.iter().map(Label::is_occluded).collect();
        filter_repeat_groups(&mut labels, &order);
        let second: Vec<bool> = labels.iter().map(Label::is_occluded).collect();
        assert_eq!(first, second);
        // 0, 3 and 6 survive at 60 px spacing
        assert_eq!(first, vec![false, true, true, false, true, true, false, true]);
    }

    #[test]
    fn test_repeat_groups_lookup() {
        let mut groups = RepeatGroups::new();
        groups.insert(1, Vec2::new(10.0, 10.0));
        assert!(groups.within(1, Vec2::new(15.0, 10.0), 10.0));
        assert!(!groups.within(1, Vec2::new(25.0, 10.0), 10.0));
        assert!(!groups.within(2, Vec2::new(10.0, 10.0), 10.0));
        groups.clear();
        assert_eq!(groups.group_count(), 0);
    }
}
