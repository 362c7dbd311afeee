//! Frame-global label placement.
//!
//! Every frame the manager collects the labels of all visible tiles and
//! markers, orders them by precedence, places them greedily against a grid of
//! already placed boxes, advances their state machines and writes the visible
//! ones into per-style meshes.
//!
//! Labels stay owned by their tile or marker. Entries refer to them through
//! [`LabelRef`], a generation-checked handle plus style and index, and the
//! manager only keeps per-frame scratch data of its own.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::mem::Discriminant;

use glam::{Mat4, Vec2};

use super::collision::CollisionGrid;
use super::label::{Label, LabelKind};
use super::label_set::LabelSet;
use super::obb::{Aabb, Obb, ObbBuffer, Range};
use super::repeat::RepeatGroups;
use super::rtree::LabelRTree;
use super::screen_transform::TransformBuffer;
use super::types::{FeatureId, GlyphQuad, LabelState, StyleId};
use crate::arena::Handle;
use crate::config::PlacementConfig;
use crate::debug::DebugPrimitives;
use crate::marker::MarkerSet;
use crate::mesh::StyleMeshes;
use crate::tile::{find_proxy, Tile, TileSet};
use crate::view::ViewState;

const RELATIVE_LINK_COLOR: u32 = 0xff0000;
const PATH_COLORS: [u32; 2] = [0xff0000, 0x0000ff];
const ANCHOR_COLOR: u32 = 0x0000ff;
const GRID_COLOR: u32 = 0x7ef586;

/// Owner of a label set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LabelOwner {
    Tile(Handle),
    Marker(Handle),
}

/// Address of one label: owner, style and index in the owner's label set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelRef {
    pub owner: LabelOwner,
    pub style: StyleId,
    pub index: usize,
}

impl LabelRef {
    /// Another label of the same set.
    fn sibling(self, index: usize) -> Self {
        Self { index, ..self }
    }
}

fn label_set<'a>(tiles: &'a TileSet, markers: &'a MarkerSet, label: &LabelRef) -> Option<&'a LabelSet> {
    let resolved = match label.owner {
        LabelOwner::Tile(handle) => tiles.resolve(handle).map(|tile| tile.labels(label.style)),
        LabelOwner::Marker(handle) => markers.resolve(handle).map(|marker| marker.labels()),
    };
    resolved
        .map_err(|err| log::warn!("{}: {}", err.category(), err))
        .ok()
        .flatten()
}

fn label_set_mut<'a>(
    tiles: &'a mut TileSet,
    markers: &'a mut MarkerSet,
    label: &LabelRef,
) -> Option<&'a mut LabelSet> {
    let resolved = match label.owner {
        LabelOwner::Tile(handle) => tiles.resolve_mut(handle).map(|tile| tile.labels_mut(label.style)),
        LabelOwner::Marker(handle) => markers.resolve_mut(handle).map(|marker| marker.labels_mut()),
    };
    resolved
        .map_err(|err| log::warn!("{}: {}", err.category(), err))
        .ok()
        .flatten()
}

/// Label values cached for sorting at collect time.
#[derive(Debug, Clone, Copy)]
struct SortKey {
    priority: f32,
    occluded_last_frame: bool,
    visible_state: bool,
    repeat_group: u64,
    kind: Discriminant<LabelKind>,
    candidate_priority: f32,
    hash: u64,
}

/// One label taking part in the current frame.
#[derive(Debug, Clone, Copy)]
struct LabelEntry {
    label: LabelRef,
    proxy: bool,
    tile_zoom: Option<u8>,
    /// Draw order and id of the owning marker.
    marker: Option<(i32, u32)>,
    texture: Option<usize>,
    key: SortKey,
    transform: Range,
    obbs: Range,
}

/// What a label set contributes to every entry built from it.
#[derive(Debug, Clone, Copy)]
struct SetContext {
    owner: LabelOwner,
    style: StyleId,
    mvp: Mat4,
    proxy: bool,
    tile_zoom: Option<u8>,
    marker: Option<(i32, u32)>,
}

impl LabelEntry {
    fn new(label: &Label, ctx: &SetContext, index: usize, quads: &[GlyphQuad], transform: Range) -> Self {
        Self {
            label: LabelRef {
                owner: ctx.owner,
                style: ctx.style,
                index,
            },
            proxy: ctx.proxy,
            tile_zoom: ctx.tile_zoom,
            marker: ctx.marker,
            texture: label.texture(quads),
            key: SortKey {
                priority: label.options().priority,
                occluded_last_frame: label.occluded_last_frame(),
                visible_state: label.visible_state(),
                repeat_group: label.options().repeat_group,
                kind: std::mem::discriminant(label.kind()),
                candidate_priority: label.candidate_priority(),
                hash: label.hash(),
            },
            transform,
            obbs: Range::default(),
        }
    }
}

/// Labels that could not be placed last frame sort after those that could.
///
/// This keeps placement stable while the camera moves, at the cost of making
/// the result depend on the previous frames.
fn prefer_placed_last_frame(a: &LabelEntry, b: &LabelEntry) -> Ordering {
    a.key.occluded_last_frame.cmp(&b.key.occluded_last_frame)
}

/// Placement precedence; earlier entries are placed first.
fn priority_order(a: &LabelEntry, b: &LabelEntry) -> Ordering {
    a.proxy
        .cmp(&b.proxy)
        .then(a.key.priority.total_cmp(&b.key.priority))
        .then(match (a.tile_zoom, b.tile_zoom) {
            (Some(za), Some(zb)) => zb.cmp(&za),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| prefer_placed_last_frame(a, b))
        // Prefers labels on screen over out_of_screen ones in repeat groups
        .then(b.key.visible_state.cmp(&a.key.visible_state))
        .then(a.key.repeat_group.cmp(&b.key.repeat_group))
        .then_with(|| {
            if a.key.kind == b.key.kind {
                a.key.candidate_priority.total_cmp(&b.key.candidate_priority)
            } else {
                Ordering::Equal
            }
        })
        .then(a.key.hash.cmp(&b.key.hash))
        .then(a.label.cmp(&b.label))
}

/// Draw order of the emitted labels.
fn z_order(a: &LabelEntry, b: &LabelEntry) -> Ordering {
    a.label
        .style
        .cmp(&b.label.style)
        .then(match (a.marker, b.marker) {
            (Some((oa, _)), Some((ob, _))) => oa.cmp(&ob),
            _ => Ordering::Equal,
        })
        // Batch by atlas
        .then(a.texture.cmp(&b.texture))
        .then(match (a.marker, b.marker) {
            (Some((_, ia)), Some((_, ib))) => ia.cmp(&ib),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then(a.label.cmp(&b.label))
}

fn style_meshes<'a>(
    meshes: &'a mut BTreeMap<StyleId, StyleMeshes>,
    style: StyleId,
    max_vertices: usize,
) -> &'a mut StyleMeshes {
    meshes
        .entry(style)
        .or_insert_with(|| StyleMeshes::new(0, max_vertices))
}

fn bounds_of(obbs: &[Obb]) -> Aabb {
    obbs.iter().fold(Aabb::empty(), |acc, obb| acc.union(&obb.extent()))
}

/// Counters of the last frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Colliding labels that entered placement.
    pub collected: usize,
    pub occluded: usize,
    /// Labels that faded without transition because a proxy showed them.
    pub skipped: usize,
    pub emitted: usize,
}

/// Per-frame label placement state.
#[derive(Debug)]
pub struct LabelManager {
    config: PlacementConfig,
    transforms: TransformBuffer,
    obbs: ObbBuffer,
    grid: CollisionGrid,
    repeat_groups: RepeatGroups,
    entries: Vec<LabelEntry>,
    selection: Vec<LabelEntry>,
    /// Dead labels projected for the overlay when drawing all labels.
    dead: Vec<LabelEntry>,
    meshes: BTreeMap<StyleId, StyleMeshes>,
    rtree: LabelRTree,
    need_update: bool,
    last_zoom: f32,
    stats: FrameStats,
}

impl Default for LabelManager {
    fn default() -> Self {
        Self::new(PlacementConfig::default())
    }
}

impl LabelManager {
    pub fn new(config: PlacementConfig) -> Self {
        Self {
            config: config.sanitized(),
            transforms: TransformBuffer::new(),
            obbs: ObbBuffer::new(),
            grid: CollisionGrid::default(),
            repeat_groups: RepeatGroups::new(),
            entries: Vec::new(),
            selection: Vec::new(),
            dead: Vec::new(),
            meshes: BTreeMap::new(),
            rtree: LabelRTree::new(),
            need_update: false,
            last_zoom: 0.0,
            stats: FrameStats::default(),
        }
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PlacementConfig) {
        self.config = config.sanitized();
    }

    /// Allocate the meshes of a style, one per atlas.
    pub fn register_style(&mut self, style: StyleId, atlas_count: usize) {
        style_meshes(&mut self.meshes, style, self.config.max_quad_vertices).ensure_atlas_count(atlas_count);
    }

    /// The meshes written for `style` in the last frame.
    pub fn meshes(&self, style: StyleId) -> Option<&StyleMeshes> {
        self.meshes.get(&style)
    }

    pub fn all_meshes(&self) -> impl Iterator<Item = (StyleId, &StyleMeshes)> {
        self.meshes.iter().map(|(style, meshes)| (*style, meshes))
    }

    /// Whether a transition is still running and another frame is needed.
    pub fn need_update(&self) -> bool {
        self.need_update
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    fn begin_frame(&mut self) {
        self.transforms.reset();
        self.obbs.reset();
        self.entries.clear();
        self.selection.clear();
        self.dead.clear();
        self.rtree.clear();
        for meshes in self.meshes.values_mut() {
            meshes.clear();
        }
        self.need_update = false;
        self.stats = FrameStats::default();
    }

    /// Run full placement for one frame and rebuild the label meshes.
    pub fn update_label_set(
        &mut self,
        view: &ViewState,
        dt: f32,
        tiles: &mut TileSet,
        markers: &mut MarkerSet,
        cache: &crate::tile::TileCache,
    ) {
        self.begin_frame();

        self.collect(view, dt, tiles, markers, false);
        self.entries.sort_by(priority_order);
        self.stats.collected = self.entries.len();

        if self.last_zoom.floor() as i32 != view.integer_zoom() {
            self.skip_transitions(view, tiles, cache);
            self.last_zoom = view.zoom;
        }

        let split = (view.viewport_size / self.config.grid_divisor).floor().as_uvec2();
        self.grid.resize(split, view.viewport_size);
        self.handle_occlusions(tiles, markers);

        for entry in &self.entries {
            if let Some(label) = label_set_mut(tiles, markers, &entry.label).and_then(|s| s.label_mut(entry.label.index)) {
                self.need_update |= label.eval_state(dt);
            }
        }

        self.entries.sort_by(z_order);

        let screen = Aabb::new(Vec2::ZERO, view.viewport_size);
        for entry in &self.entries {
            let Some(set) = label_set(tiles, markers, &entry.label) else {
                continue;
            };
            let Some(label) = set.label(entry.label.index) else {
                continue;
            };
            if !label.visible_state() {
                continue;
            }
            let obbs = self.obbs.get(entry.obbs);
            if !obbs.iter().any(|obb| obb.extent().intersects(&screen)) {
                continue;
            }

            let meshes = style_meshes(&mut self.meshes, entry.label.style, self.config.max_quad_vertices);
            set.add_vertices_to_mesh(entry.label.index, self.transforms.get(entry.transform), view.viewport_size, meshes);
            if label.feature_id() != 0 {
                self.rtree.push(label.feature_id(), bounds_of(obbs));
            }
            self.stats.emitted += 1;
        }
        self.rtree.build();

        log::debug!(
            "labels: {} collected, {} occluded, {} skipped, {} emitted",
            self.stats.collected,
            self.stats.occluded,
            self.stats.skipped,
            self.stats.emitted
        );
    }

    /// Re-project and re-emit labels without running placement.
    ///
    /// Uses the occlusion results of the last full update, for frames where
    /// the camera and the tiles have not changed.
    pub fn render_labels(&mut self, view: &ViewState, dt: f32, tiles: &mut TileSet, markers: &mut MarkerSet) {
        self.begin_frame();
        self.collect(view, dt, tiles, markers, true);
        self.rtree.build();
        log::debug!("labels: {} emitted without placement", self.stats.emitted);
    }

    fn collect(&mut self, view: &ViewState, dt: f32, tiles: &mut TileSet, markers: &mut MarkerSet, only_render: bool) {
        for (handle, tile) in tiles.iter_mut() {
            let ctx = SetContext {
                owner: LabelOwner::Tile(handle),
                style: 0,
                mvp: *tile.mvp(),
                proxy: tile.is_proxy(),
                tile_zoom: Some(tile.id().z),
                marker: None,
            };
            for (style, set) in tile.label_sets_mut() {
                self.collect_set(view, dt, set, &SetContext { style, ..ctx }, only_render);
            }
        }

        for (handle, marker) in markers.iter_mut() {
            if !marker.is_visible() {
                continue;
            }
            let ctx = SetContext {
                owner: LabelOwner::Marker(handle),
                style: marker.style(),
                mvp: *marker.mvp(),
                proxy: false,
                tile_zoom: None,
                marker: Some((marker.draw_order(), marker.id())),
            };
            if let Some(set) = marker.labels_mut() {
                self.collect_set(view, dt, set, &ctx, only_render);
            }
        }
    }

    fn collect_set(&mut self, view: &ViewState, dt: f32, set: &mut LabelSet, ctx: &SetContext, only_render: bool) {
        let screen = Aabb::new(Vec2::ZERO, view.viewport_size);
        let extended = screen.expanded(self.config.collision_border);
        let (labels, quads) = set.parts_mut();

        for (index, label) in labels.iter_mut().enumerate() {
            if label.state() == LabelState::Dead && !self.config.draw_all_labels {
                continue;
            }

            // Colliding labels are placed within a border so they do not pop
            // in at the screen edge
            let bounds = if only_render || !label.can_occlude() {
                &screen
            } else {
                &extended
            };

            let mut transform = self.transforms.begin();
            if !label.update(&ctx.mvp, view, Some(bounds), &self.config, &mut transform) {
                continue;
            }
            let range = transform.finish();
            let mut entry = LabelEntry::new(label, ctx, index, quads, range);

            if label.state() == LabelState::Dead {
                entry.obbs = label.obbs(self.transforms.get(range), &mut self.obbs, &self.config);
                self.dead.push(entry);
                continue;
            }

            let emit = if only_render {
                if label.occluded_last_frame() {
                    label.occlude(true);
                }
                label.visible_state() || !label.can_occlude()
            } else if label.can_occlude() {
                self.entries.push(entry);
                false
            } else {
                true
            };

            if emit {
                self.need_update |= label.eval_state(dt);
                let transform = self.transforms.get(range);
                let meshes = style_meshes(&mut self.meshes, ctx.style, self.config.max_quad_vertices);
                label.add_vertices_to_mesh(transform, view.viewport_size, quads, meshes);

                entry.obbs = label.obbs(transform, &mut self.obbs, &self.config);
                if label.visible_state() && label.feature_id() != 0 {
                    self.rtree.push(label.feature_id(), bounds_of(self.obbs.get(entry.obbs)));
                }
                if only_render {
                    self.entries.push(entry);
                }
                self.stats.emitted += 1;
            }

            if label.selection_color() != 0 {
                self.selection.push(entry);
            }
        }
    }

    /// Let new labels appear without fading when a proxy tile already shows
    /// them.
    fn skip_transitions(&mut self, view: &ViewState, tiles: &mut TileSet, cache: &crate::tile::TileCache) {
        let zooming_in = self.last_zoom < view.zoom;

        // Visible proxy labels as (tile, style, [(repeat group, center)])
        let mut shown: Vec<(Handle, StyleId, Vec<(u64, Vec2)>)> = Vec::new();
        for (handle, tile) in tiles.iter() {
            let proxies: Vec<_> = if zooming_in {
                tile.id().parent().into_iter().collect()
            } else {
                tile.id().children().to_vec()
            };

            for proxy_id in proxies {
                let Some(proxy) = find_proxy(tile.source(), proxy_id, tiles, cache) else {
                    continue;
                };
                for (style, set) in proxy.label_sets() {
                    if tile.labels(style).is_none() {
                        continue;
                    }
                    let placed: Vec<(u64, Vec2)> = set
                        .labels()
                        .iter()
                        .filter(|l| l.visible_state() && l.can_occlude())
                        .map(|l| (l.options().repeat_group, l.screen_center()))
                        .collect();
                    if !placed.is_empty() {
                        shown.push((handle, style, placed));
                    }
                }
            }
        }

        for (handle, style, placed) in shown {
            let Some(set) = tiles.get_mut(handle).and_then(|tile: &mut Tile| tile.labels_mut(style)) else {
                continue;
            };
            for label in set.labels_mut() {
                if !label.can_occlude() || label.state() != LabelState::None {
                    continue;
                }
                let radius = label.dimension().max_element() * 0.5;
                let group = label.options().repeat_group;
                let center = label.screen_center();
                if placed
                    .iter()
                    .any(|(g, c)| *g == group && c.distance(center) < radius)
                {
                    label.skip_transitions();
                    self.stats.skipped += 1;
                }
            }
        }
    }

    /// Greedy placement in entry order.
    ///
    /// A child is placed right after its parent and neither reaches the grid
    /// until both are resolved, so a label hidden by its relative never blocks
    /// the labels placed after it.
    fn handle_occlusions(&mut self, tiles: &mut TileSet, markers: &mut MarkerSet) {
        self.repeat_groups.clear();

        let positions: HashMap<LabelRef, usize> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.label, i))
            .collect();
        let mut done = vec![false; self.entries.len()];

        for i in 0..self.entries.len() {
            if done[i] {
                continue;
            }
            let entry_ref = self.entries[i].label;
            let Some(set) = label_set_mut(tiles, markers, &entry_ref) else {
                done[i] = true;
                continue;
            };
            let labels = set.labels_mut();
            let Some(label) = labels.get(entry_ref.index) else {
                done[i] = true;
                continue;
            };

            let relative = label
                .relative()
                .and_then(|r| positions.get(&entry_ref.sibling(r)).copied());
            // Children wait for their parent
            if label.is_child() && relative.map_or(false, |p| !done[p]) {
                continue;
            }
            done[i] = true;

            let mut members = vec![i];
            if let Some(child) = relative.filter(|&c| !label.is_child() && !done[c]) {
                done[child] = true;
                members.push(child);
            }

            for &m in &members {
                self.place(m, labels);
            }

            // Required links fall together
            if let Some(rel) = required_relative(labels, entry_ref.index) {
                if labels[entry_ref.index].is_occluded() || labels[rel].is_occluded() {
                    labels[entry_ref.index].occlude(true);
                    labels[rel].occlude(true);
                }
            }

            for &m in &members {
                let index = self.entries[m].label.index;
                let label = &labels[index];
                if label.is_occluded() {
                    self.stats.occluded += 1;
                    continue;
                }
                let range = self.entries[m].obbs;
                for (k, obb) in self.obbs.get(range).iter().enumerate() {
                    self.grid.insert(obb.extent(), range.start + k);
                }
                if label.options().repeat_distance > 0.0 {
                    self.repeat_groups
                        .insert(label.options().repeat_group, label.screen_center());
                }
            }
        }

        self.cascade_relatives(tiles, markers);
    }

    /// Try to place entry `i` against the grid, cycling through its anchors.
    ///
    /// Only sets the label's occlusion flag; the caller commits the boxes.
    fn place(&mut self, i: usize, labels: &mut [Label]) {
        let index = self.entries[i].label.index;
        let transform = self.transforms.get(self.entries[i].transform);
        let mut range = labels[index].obbs(transform, &mut self.obbs, &self.config);
        self.entries[i].obbs = range;

        if labels[index].is_child() && !labels[index].options().optional {
            let parent = labels[index].relative().and_then(|p| labels.get(p));
            if parent.map_or(false, Label::is_occluded) {
                labels[index].occlude(true);
                return;
            }
        }

        let options = labels[index].options();
        let (group, distance) = (options.repeat_group, options.repeat_distance);
        if distance > 0.0 && self.repeat_groups.within(group, labels[index].screen_center(), distance) {
            labels[index].occlude(true);
            return;
        }

        loop {
            let obbs = &self.obbs;
            let grid = &self.grid;
            let hit = obbs.get(range).iter().any(|obb| {
                let mut hit = false;
                grid.intersect(
                    &obb.extent(),
                    |other| {
                        hit = obb.intersects(obbs.obb(other.tag));
                        !hit
                    },
                    false,
                );
                hit
            });

            labels[index].occlude(hit);
            if !hit {
                break;
            }
            let more = labels[index].next_anchor();
            self.obbs.truncate_to(range.start);
            range = labels[index].obbs(transform, &mut self.obbs, &self.config);
            self.entries[i].obbs = range;
            if !more {
                break;
            }
        }
    }

    /// Occlusion between required relatives, in both directions.
    ///
    /// Pairs placed together are already consistent; this covers relatives
    /// that did not take part in placement.
    fn cascade_relatives(&self, tiles: &mut TileSet, markers: &mut MarkerSet) {
        for entry in &self.entries {
            let Some(set) = label_set_mut(tiles, markers, &entry.label) else {
                continue;
            };
            let labels = set.labels_mut();
            let index = entry.label.index;
            let Some(relative) = required_relative(labels, index) else {
                continue;
            };
            if labels[index].is_occluded() {
                labels[relative].occlude(true);
            } else if labels[relative].is_occluded() {
                labels[index].occlude(true);
            }
        }
    }

    /// A visible label with the given selection color, with its tile.
    pub fn get_label<'a>(
        &self,
        selection_color: u32,
        tiles: &'a TileSet,
        markers: &'a MarkerSet,
    ) -> Option<(&'a Label, Option<&'a Tile>)> {
        if selection_color == 0 {
            return None;
        }
        self.selection.iter().find_map(|entry| {
            let label = label_set(tiles, markers, &entry.label)?.label(entry.label.index)?;
            if !label.visible_state() || label.selection_color() != selection_color {
                return None;
            }
            let tile = match entry.label.owner {
                LabelOwner::Tile(handle) => tiles.get(handle),
                LabelOwner::Marker(_) => None,
            };
            Some((label, tile))
        })
    }

    /// Feature ids of the labels drawn at `point`, nearest first.
    pub fn features_at_point(&self, point: Vec2) -> Vec<FeatureId> {
        self.rtree.features_at_point(point)
    }

    /// Draw boxes, anchors, links and the grid of the last frame.
    pub fn draw_debug(&self, tiles: &TileSet, markers: &MarkerSet, primitives: &mut impl DebugPrimitives) {
        if !self.config.debug_labels {
            return;
        }

        for entry in self.entries.iter().chain(&self.dead) {
            let Some(set) = label_set(tiles, markers, &entry.label) else {
                continue;
            };
            let Some(label) = set.label(entry.label.index) else {
                continue;
            };
            if label.is_debug() {
                continue;
            }

            let obbs = self.obbs.get(entry.obbs);
            primitives.set_color(label.state().debug_color());
            for obb in obbs {
                primitives.draw_poly(&obb.quad());
            }

            let relative = label.relative().and_then(|r| set.label(r));
            if let (Some(relative), Some(first)) = (relative, obbs.first()) {
                if relative.visible_state() && !relative.is_occluded() {
                    primitives.set_color(RELATIVE_LINK_COLOR);
                    primitives.draw_line(first.centroid(), relative.screen_center());
                }
            }

            if matches!(label.kind(), LabelKind::Curved { .. }) {
                let path = self.transforms.get(entry.transform);
                for (k, pair) in path.windows(2).enumerate() {
                    primitives.set_color(PATH_COLORS[k % 2]);
                    primitives.draw_line(pair[0].truncate(), pair[1].truncate());
                }
            }

            let sp = label.screen_center();
            primitives.set_color(ANCHOR_COLOR);
            primitives.draw_rect(sp - Vec2::ONE, sp + Vec2::ONE);
        }

        let split = self.grid.split();
        let cell = (self.grid.extent() / split.as_vec2()).ceil();
        primitives.set_color(GRID_COLOR);
        for y in 0..split.y {
            for x in 0..split.x {
                let min = Vec2::new(x as f32, y as f32) * cell;
                primitives.draw_rect(min, min + cell);
            }
        }
    }
}

/// The relative whose occlusion is tied to label `index`.
///
/// A link is required unless its child is optional; the flag of the child
/// decides for both directions.
fn required_relative(labels: &[Label], index: usize) -> Option<usize> {
    let label = labels.get(index)?;
    let relative = label.relative().filter(|&r| r < labels.len())?;
    let child = if label.is_child() { label } else { &labels[relative] };
    (!child.options().optional).then_some(relative)
}
