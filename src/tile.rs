//! Tiles as seen by the label passes.
//!
//! The host owns tile loading; this module only keeps what placement needs:
//! the tile id, its MVP, whether it stands in as a proxy, and one label set
//! per style. Live tiles sit in a [`TileSet`] arena, recently dropped tiles in
//! an LRU [`TileCache`] where they can still serve as proxies.

use std::collections::{BTreeMap, HashMap, VecDeque};

use glam::Mat4;

use crate::arena::{Arena, Handle};
use crate::error::LabelResult;
use crate::labels::label_set::LabelSet;
use crate::labels::types::StyleId;

/// Data source a tile was loaded from.
pub type SourceId = u32;

/// Position of a tile in the quadtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileId {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Tile one zoom level up, if any.
    pub fn parent(&self) -> Option<Self> {
        if self.z == 0 {
            return None;
        }
        Some(Self {
            x: self.x / 2,
            y: self.y / 2,
            z: self.z - 1,
        })
    }

    /// The four tiles one zoom level down.
    pub fn children(&self) -> [Self; 4] {
        let (x, y, z) = (self.x * 2, self.y * 2, self.z + 1);
        [
            Self { x, y, z },
            Self { x: x + 1, y, z },
            Self { x, y: y + 1, z },
            Self { x: x + 1, y: y + 1, z },
        ]
    }
}

/// A tile with its labels, one set per style.
#[derive(Debug, Clone)]
pub struct Tile {
    source: SourceId,
    id: TileId,
    proxy: bool,
    mvp: Mat4,
    label_sets: BTreeMap<StyleId, LabelSet>,
}

impl Tile {
    pub fn new(source: SourceId, id: TileId) -> Self {
        Self {
            source,
            id,
            proxy: false,
            mvp: Mat4::IDENTITY,
            label_sets: BTreeMap::new(),
        }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    /// Whether the tile is only drawn while a better tile loads.
    pub fn is_proxy(&self) -> bool {
        self.proxy
    }

    pub fn set_proxy(&mut self, proxy: bool) {
        self.proxy = proxy;
    }

    /// Tile-local to clip space for the current frame.
    pub fn mvp(&self) -> &Mat4 {
        &self.mvp
    }

    pub fn set_mvp(&mut self, mvp: Mat4) {
        self.mvp = mvp;
    }

    /// Hand over the finished labels of one style, replacing earlier ones.
    pub fn set_labels(&mut self, style: StyleId, labels: LabelSet) {
        self.label_sets.insert(style, labels);
    }

    pub fn labels(&self, style: StyleId) -> Option<&LabelSet> {
        self.label_sets.get(&style)
    }

    pub fn labels_mut(&mut self, style: StyleId) -> Option<&mut LabelSet> {
        self.label_sets.get_mut(&style)
    }

    /// Label sets in style order.
    pub fn label_sets(&self) -> impl Iterator<Item = (StyleId, &LabelSet)> {
        self.label_sets.iter().map(|(style, set)| (*style, set))
    }

    pub(crate) fn label_sets_mut(&mut self) -> impl Iterator<Item = (StyleId, &mut LabelSet)> {
        self.label_sets.iter_mut().map(|(style, set)| (*style, set))
    }
}

/// The tiles currently displayed.
#[derive(Debug, Default)]
pub struct TileSet {
    tiles: Arena<Tile>,
}

impl TileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tile: Tile) -> Handle {
        self.tiles.insert(tile)
    }

    pub fn remove(&mut self, handle: Handle) -> Option<Tile> {
        self.tiles.remove(handle)
    }

    pub fn get(&self, handle: Handle) -> Option<&Tile> {
        self.tiles.get(handle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Tile> {
        self.tiles.get_mut(handle)
    }

    pub fn resolve(&self, handle: Handle) -> LabelResult<&Tile> {
        self.tiles.resolve(handle)
    }

    pub fn resolve_mut(&mut self, handle: Handle) -> LabelResult<&mut Tile> {
        self.tiles.resolve_mut(handle)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Tile)> {
        self.tiles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut Tile)> {
        self.tiles.iter_mut()
    }

    /// Live tile with the given source and id.
    pub fn find(&self, source: SourceId, id: TileId) -> Option<(Handle, &Tile)> {
        self.tiles
            .iter()
            .find(|(_, tile)| tile.source == source && tile.id == id)
    }
}

/// Tile cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub capacity: usize,
    pub resident_count: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

type CacheKey = (SourceId, TileId);

/// LRU cache of tiles that left the live set.
#[derive(Debug)]
pub struct TileCache {
    capacity: usize,
    tiles: HashMap<CacheKey, Tile>,
    /// Most recent first
    lru_queue: VecDeque<CacheKey>,
    stats: CacheStats,
}

impl TileCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tiles: HashMap::new(),
            lru_queue: VecDeque::new(),
            stats: CacheStats {
                capacity,
                ..Default::default()
            },
        }
    }

    /// Store a tile, evicting the least recently used ones over capacity.
    pub fn put(&mut self, tile: Tile) {
        if self.capacity == 0 {
            return;
        }
        let key = (tile.source, tile.id);
        if self.tiles.insert(key, tile).is_some() {
            self.touch(key);
        } else {
            self.lru_queue.push_front(key);
        }

        while self.tiles.len() > self.capacity {
            let Some(lru) = self.lru_queue.pop_back() else {
                break;
            };
            if self.tiles.remove(&lru).is_some() {
                self.stats.evictions += 1;
            }
        }
        self.stats.resident_count = self.tiles.len();
    }

    fn touch(&mut self, key: CacheKey) {
        if let Some(pos) = self.lru_queue.iter().position(|k| *k == key) {
            self.lru_queue.remove(pos);
        }
        self.lru_queue.push_front(key);
    }

    /// Access a tile, updating LRU order.
    pub fn get(&mut self, source: SourceId, id: TileId) -> Option<&Tile> {
        let key = (source, id);
        if self.tiles.contains_key(&key) {
            self.stats.hits += 1;
            self.touch(key);
            self.tiles.get(&key)
        } else {
            self.stats.misses += 1;
            None
        }
    }

    /// Look a tile up without touching LRU order or stats.
    pub fn contains(&self, source: SourceId, id: TileId) -> Option<&Tile> {
        self.tiles.get(&(source, id))
    }

    /// Remove a tile, e.g. to make it live again.
    pub fn take(&mut self, source: SourceId, id: TileId) -> Option<Tile> {
        let key = (source, id);
        let tile = self.tiles.remove(&key)?;
        if let Some(pos) = self.lru_queue.iter().position(|k| *k == key) {
            self.lru_queue.remove(pos);
        }
        self.stats.resident_count = self.tiles.len();
        Some(tile)
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
        self.lru_queue.clear();
        self.stats.resident_count = 0;
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

/// Find a tile that can stand in for `id`: cached tiles first, then live ones.
pub fn find_proxy<'a>(
    source: SourceId,
    id: TileId,
    tiles: &'a TileSet,
    cache: &'a TileCache,
) -> Option<&'a Tile> {
    cache
        .contains(source, id)
        .or_else(|| tiles.find(source, id).map(|(_, tile)| tile))
}
