// tests/test_label_placement.rs
// End-to-end placement scenarios and state machine properties.
// Labels are built the way a tile worker builds them and placed by the frame manager.
// RELEVANT FILES:src/labels/manager.rs,src/labels/label.rs,src/labels/collider.rs,src/labels/fade.rs

use glam::{Mat4, Vec2, Vec3};
use maplabel::labels::{
    filter_repeat_groups, pixel_ortho, Aabb, Anchor, Anchors, CollisionGrid, FadeEffect, GlyphQuad,
    Interpolation, Label, LabelState, Transition, TransformBuffer, MAX_ANCHORS,
};
use maplabel::{
    LabelManager, LabelOptions, LabelSet, LabelSetBuilder, MarkerSet, PlacementConfig, Tile, TileCache,
    TileId, TileSet, ViewState,
};

const STYLE: u32 = 3;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Tile units (0..1) to pixels of a 256x256 viewport.
fn tile_mvp() -> Mat4 {
    pixel_ortho(256.0, 256.0) * Mat4::from_scale(Vec3::new(256.0, 256.0, 1.0))
}

fn view() -> ViewState {
    ViewState::new(256.0, 256.0, 0.0)
}

fn tile_with(labels: LabelSet) -> Tile {
    let mut tile = Tile::new(0, TileId::new(0, 0, 0));
    tile.set_mvp(tile_mvp());
    tile.set_labels(STYLE, labels);
    tile
}

fn run_frame(tiles: &mut TileSet, dt: f32) -> LabelManager {
    let mut manager = LabelManager::default();
    manager.register_style(STYLE, 1);
    manager.update_label_set(&view(), dt, tiles, &mut MarkerSet::new(), &TileCache::new(4));
    manager
}

fn update(label: &mut Label, mvp: &Mat4, view: &ViewState) -> bool {
    let mut buffer = TransformBuffer::new();
    let mut transform = buffer.begin();
    let bounds = Aabb::new(Vec2::ZERO, view.viewport_size);
    label.update(mvp, view, Some(&bounds), &PlacementConfig::default(), &mut transform)
}

#[test]
fn higher_priority_label_wins() {
    init_logging();
    let labels = vec![
        Label::point(Vec2::splat(0.5), Vec2::new(30.0, 12.0), LabelOptions::default().with_priority(1.0)),
        Label::point(Vec2::splat(0.5), Vec2::new(30.0, 12.0), LabelOptions::default().with_priority(2.0)),
    ];
    let mut tiles = TileSet::new();
    let handle = tiles.insert(tile_with(LabelSet::new(labels, Vec::new())));
    run_frame(&mut tiles, 0.0);

    let placed = tiles.get(handle).unwrap().labels(STYLE).unwrap().labels();
    assert!(
        matches!(placed[0].state(), LabelState::Visible | LabelState::FadingIn),
        "priority 1 should show, got {:?}",
        placed[0].state()
    );
    assert!(placed[1].is_occluded(), "priority 2 should be occluded");
    assert!(!placed[1].visible_state());
}

#[test]
fn collider_kills_overlapping_label_at_build_time() {
    let mut builder = LabelSetBuilder::new();
    builder.push(Label::point(Vec2::splat(0.5), Vec2::new(30.0, 12.0), LabelOptions::default().with_priority(1.0)));
    builder.push(Label::point(Vec2::splat(0.5), Vec2::new(30.0, 12.0), LabelOptions::default().with_priority(2.0)));
    let set = builder.finish(&PlacementConfig::default());

    assert_eq!(set.labels()[0].state(), LabelState::None);
    assert_eq!(set.labels()[1].state(), LabelState::Dead);

    // Dead labels never come back in the frame pass
    let mut tiles = TileSet::new();
    let handle = tiles.insert(tile_with(set));
    let manager = run_frame(&mut tiles, 0.0);
    let placed = tiles.get(handle).unwrap().labels(STYLE).unwrap().labels();
    assert_eq!(placed[1].state(), LabelState::Dead);
    assert_eq!(manager.stats().collected, 1);
}

#[test]
fn default_label_becomes_visible() {
    let mut label = Label::point(Vec2::splat(0.5), Vec2::new(30.0, 12.0), LabelOptions::default());
    assert!(update(&mut label, &tile_mvp(), &view()));
    assert_eq!(label.state(), LabelState::None);
    label.eval_state(0.0);
    assert_eq!(label.state(), LabelState::Visible);
}

#[test]
fn offscreen_label_fades_in_once_on_screen() {
    let options = LabelOptions::default().with_show_transition(Transition::new(Interpolation::Linear, 0.5));
    let mut label = Label::point(Vec2::new(1.5, 0.5), Vec2::new(30.0, 12.0), options);

    assert!(!update(&mut label, &tile_mvp(), &view()));
    assert_eq!(label.state(), LabelState::Sleep);

    let wide = ViewState::new(512.0, 256.0, 0.0);
    let mvp = pixel_ortho(512.0, 256.0) * Mat4::from_scale(Vec3::new(256.0, 256.0, 1.0));
    assert!(update(&mut label, &mvp, &wide));
    assert!(label.eval_state(0.0));
    assert_eq!(label.state(), LabelState::FadingIn);
}

#[test]
fn repeat_group_suppresses_without_overlap() {
    let d = 64.0;
    let options = LabelOptions::default().with_repeat(11, d);
    let half = d * 0.5 / 256.0;
    let labels = vec![
        Label::point(Vec2::new(0.4, 0.5), Vec2::splat(8.0), options.clone()),
        Label::point(Vec2::new(0.4 + half, 0.5), Vec2::splat(8.0), options),
    ];
    let mut tiles = TileSet::new();
    let handle = tiles.insert(tile_with(LabelSet::new(labels, Vec::new())));
    run_frame(&mut tiles, 0.0);

    let placed = tiles.get(handle).unwrap().labels(STYLE).unwrap().labels();
    assert!(!placed[0].is_occluded());
    assert!(placed[1].is_occluded(), "second label is within the repeat distance");
}

#[test]
fn debug_label_never_occludes() {
    let labels = vec![
        Label::debug(Vec2::splat(0.5), Vec2::splat(40.0)),
        Label::point(Vec2::splat(0.5), Vec2::new(30.0, 12.0), LabelOptions::default()),
    ];
    let mut tiles = TileSet::new();
    let handle = tiles.insert(tile_with(LabelSet::new(labels, Vec::new())));
    for _ in 0..3 {
        run_frame(&mut tiles, 0.1);
    }

    let placed = tiles.get(handle).unwrap().labels(STYLE).unwrap().labels();
    assert_eq!(placed[0].state(), LabelState::Visible);
    assert!(!placed[0].can_occlude());
    assert_eq!(placed[1].state(), LabelState::Visible);
}

#[test]
fn linear_fade_out() {
    let mut fade = FadeEffect::new(false, Interpolation::Linear, 1.0);
    assert!((fade.update(0.0) - 1.0).abs() < 1e-6);
    assert!((fade.update(0.5) - 0.5).abs() < 1e-6);
    assert!(fade.update(0.5).abs() < 1e-6);
    assert!(!fade.is_finished(), "exactly at the duration is not finished yet");
    fade.update(0.01);
    assert!(fade.is_finished());
}

#[test]
fn state_machine_is_total() {
    let states = [
        LabelState::None,
        LabelState::FadingIn,
        LabelState::FadingOut,
        LabelState::Visible,
        LabelState::Sleep,
        LabelState::OutOfScreen,
        LabelState::SkipTransition,
        LabelState::Dead,
    ];
    let fade = Transition::new(Interpolation::Pow, 0.2);
    for state in states {
        for occluded in [false, true] {
            let options = LabelOptions::default()
                .with_show_transition(fade)
                .with_hide_transition(fade);
            let mut label = Label::point(Vec2::ZERO, Vec2::splat(10.0), options);
            label.enter_state(state, 0.5);
            label.occlude(occluded);

            // Every state settles within a bounded number of steps
            let mut steps = 0;
            while label.eval_state(0.1) {
                steps += 1;
                assert!(steps < 10, "{state:?} occluded={occluded} did not settle");
            }
            assert!((0.0..=1.0).contains(&label.alpha()));
            if state == LabelState::Dead {
                assert_eq!(label.state(), LabelState::Dead);
            } else if occluded || state == LabelState::FadingOut {
                // A running fade-out always ends asleep
                assert_eq!(label.state(), LabelState::Sleep);
            } else {
                assert_eq!(label.state(), LabelState::Visible, "from {state:?}");
            }
        }
    }
}

#[test]
fn anchor_cycle_terminates_for_every_count() {
    let all = [
        Anchor::Center,
        Anchor::Top,
        Anchor::Bottom,
        Anchor::Left,
        Anchor::Right,
        Anchor::TopLeft,
        Anchor::TopRight,
        Anchor::BottomLeft,
        Anchor::BottomRight,
    ];
    for count in 1..=MAX_ANCHORS {
        let options = LabelOptions::default().with_anchors(Anchors::new(all[..count].iter().copied()));
        let mut label = Label::point(Vec2::splat(0.5), Vec2::splat(10.0), options);
        assert!(update(&mut label, &tile_mvp(), &view()));

        let mut tried = 1;
        while label.next_anchor() {
            tried += 1;
        }
        assert_eq!(tried, count);
        assert_eq!(label.anchor_index(), 0);
    }
}

#[test]
fn repeat_filter_is_idempotent() {
    let options = LabelOptions::default().with_repeat(2, 40.0);
    let mut labels: Vec<Label> = (0..10)
        .map(|i| Label::point(Vec2::new(0.1 + i as f32 * 0.06, 0.5), Vec2::splat(6.0), options.clone()))
        .collect();
    for label in &mut labels {
        assert!(update(label, &tile_mvp(), &view()));
    }
    let order: Vec<usize> = (0..labels.len()).collect();

    filter_repeat_groups(&mut labels, &order);
    let once: Vec<bool> = labels.iter().map(Label::is_occluded).collect();
    filter_repeat_groups(&mut labels, &order);
    let twice: Vec<bool> = labels.iter().map(Label::is_occluded).collect();
    assert_eq!(once, twice);
    assert!(once.iter().any(|o| *o));
}

#[test]
fn broad_phase_is_symmetric() {
    // Deterministic boxes from a small LCG
    let mut seed = 0x2545_f491u32;
    let mut next = || {
        seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (seed >> 8) as f32 / (1u32 << 24) as f32
    };
    let boxes: Vec<Aabb> = (0..60)
        .map(|_| {
            let min = Vec2::new(next() * 480.0, next() * 480.0);
            Aabb::new(min, min + Vec2::new(4.0 + next() * 40.0, 4.0 + next() * 40.0))
        })
        .collect();

    let mut grid = CollisionGrid::new(glam::UVec2::new(4, 4), Vec2::splat(512.0));
    let pairs = grid.intersect_all(&boxes);

    for i in 0..boxes.len() {
        for j in (i + 1)..boxes.len() {
            let expected = boxes[i].intersects(&boxes[j]);
            assert_eq!(expected, boxes[j].intersects(&boxes[i]));
            assert_eq!(pairs.contains(&(i, j)), expected, "pair ({i}, {j})");
        }
    }
}

#[test]
fn label_sets_built_on_workers() {
    init_logging();
    let workers: Vec<_> = (0..4u32)
        .map(|n| {
            std::thread::spawn(move || {
                let mut builder = LabelSetBuilder::new();
                for i in 0..3 {
                    let position = Vec2::new(0.2 + 0.3 * i as f32, 0.2 + 0.2 * n as f32);
                    builder.push_with_quads(
                        Label::point(position, Vec2::new(20.0, 8.0), LabelOptions::default()),
                        [GlyphQuad::rect(0, Vec2::new(-10.0, -4.0), Vec2::new(10.0, 4.0))],
                    );
                }
                (n, builder.finish(&PlacementConfig::default()))
            })
        })
        .collect();

    let mut tiles = TileSet::new();
    for worker in workers {
        let (n, set) = worker.join().expect("worker panicked");
        let mut tile = Tile::new(0, TileId::new(n, 0, 2));
        tile.set_mvp(tile_mvp());
        tile.set_labels(STYLE, set);
        tiles.insert(tile);
    }

    let manager = run_frame(&mut tiles, 0.0);
    let stats = manager.stats();
    assert_eq!(stats.collected, 12);
    assert_eq!(stats.emitted, 12 - stats.occluded);
    assert_eq!(manager.meshes(STYLE).unwrap().quad_count(), stats.emitted);
}

#[test]
fn config_from_json() {
    let config = PlacementConfig::from_json_str(r#"{ "collision_border": 64.0, "debug_labels": true }"#).unwrap();
    assert!((config.collision_border - 64.0).abs() < 1e-6);
    assert!(config.debug_labels);
    assert_eq!(config.max_quad_vertices, PlacementConfig::default().max_quad_vertices);

    assert!(PlacementConfig::from_json_str("{ not json").is_err());
}
