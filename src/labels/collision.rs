//! Grid-based broad phase for label collision.

use glam::{UVec2, Vec2};

use super::obb::Aabb;

/// An AABB stored in the grid with a caller-defined tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaggedAabb {
    pub aabb: Aabb,
    pub tag: usize,
}

/// Uniform grid where each cell lists the boxes overlapping it.
///
/// Coarse only: hits are AABB overlaps and callers confirm them with the exact
/// OBB test.
#[derive(Debug)]
pub struct CollisionGrid {
    split: UVec2,
    extent: Vec2,
    cell_size: Vec2,
    cells: Vec<Vec<usize>>,
    boxes: Vec<TaggedAabb>,
}

impl Default for CollisionGrid {
    fn default() -> Self {
        Self::new(UVec2::ONE, Vec2::splat(256.0))
    }
}

impl CollisionGrid {
    /// Create a grid of `split` cells covering `0..extent`.
    pub fn new(split: UVec2, extent: Vec2) -> Self {
        let mut grid = Self {
            split: UVec2::ONE,
            extent: Vec2::ONE,
            cell_size: Vec2::ONE,
            cells: Vec::new(),
            boxes: Vec::new(),
        };
        grid.resize(split, extent);
        grid
    }

    /// Change the cell layout; this clears the grid.
    pub fn resize(&mut self, split: UVec2, extent: Vec2) {
        self.split = split.max(UVec2::ONE);
        self.extent = extent.max(Vec2::ONE);
        self.cell_size = self.extent / self.split.as_vec2();
        self.cells = vec![Vec::new(); (self.split.x * self.split.y) as usize];
        self.boxes.clear();
    }

    /// Remove all boxes, keeping the layout.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.boxes.clear();
    }

    pub fn split(&self) -> UVec2 {
        self.split
    }

    pub fn extent(&self) -> Vec2 {
        self.extent
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Inclusive cell range covered by `aabb`, clamped to the grid edges.
    fn cell_range(&self, aabb: &Aabb) -> (UVec2, UVec2) {
        let max_cell = (self.split - UVec2::ONE).as_vec2();
        let lo = (aabb.min / self.cell_size).floor().clamp(Vec2::ZERO, max_cell);
        let hi = (aabb.max / self.cell_size).floor().clamp(Vec2::ZERO, max_cell);
        (lo.as_uvec2(), hi.as_uvec2())
    }

    fn cells_of(&self, aabb: &Aabb) -> impl Iterator<Item = usize> {
        let (lo, hi) = self.cell_range(aabb);
        let cols = self.split.x;
        (lo.y..=hi.y).flat_map(move |row| (lo.x..=hi.x).map(move |col| (row * cols + col) as usize))
    }

    /// Store a tagged box in every cell it overlaps.
    pub fn insert(&mut self, aabb: Aabb, tag: usize) {
        let index = self.boxes.len();
        self.boxes.push(TaggedAabb { aabb, tag });
        let cells: Vec<usize> = self.cells_of(&aabb).collect();
        for cell in cells {
            self.cells[cell].push(index);
        }
    }

    /// Call `callback` once for every distinct stored box overlapping `aabb`.
    ///
    /// Stops when the callback returns false, or after the first hit when
    /// `stop_on_first` is set.
    pub fn intersect<F>(&self, aabb: &Aabb, mut callback: F, stop_on_first: bool)
    where
        F: FnMut(&TaggedAabb) -> bool,
    {
        let mut candidates: Vec<usize> = self
            .cells_of(aabb)
            .flat_map(|cell| self.cells[cell].iter().copied())
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        for index in candidates {
            let other = &self.boxes[index];
            if !aabb.intersects(&other.aabb) {
                continue;
            }
            if !callback(other) || stop_on_first {
                return;
            }
        }
    }

    /// Batch broad phase: every overlapping pair `(i, j)` with `i < j`, sorted.
    ///
    /// Clears the grid and leaves it holding `boxes` tagged by index.
    pub fn intersect_all(&mut self, boxes: &[Aabb]) -> Vec<(usize, usize)> {
        self.clear();
        for (i, aabb) in boxes.iter().enumerate() {
            self.insert(*aabb, i);
        }

        let mut pairs = Vec::new();
        for cell in &self.cells {
            for (n, &a) in cell.iter().enumerate() {
                for &b in &cell[n + 1..] {
                    let (ta, tb) = (&self.boxes[a], &self.boxes[b]);
                    if ta.aabb.intersects(&tb.aabb) {
                        pairs.push((ta.tag.min(tb.tag), ta.tag.max(tb.tag)));
                    }
                }
            }
        }
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aabb(x0: f32, y0: f32, x1: f32, y1: f32) -> Aabb {
        Aabb::new(Vec2::new(x0, y0), Vec2::new(x1, y1))
    }

    #[test]
    fn test_intersect_dedup() {
        let mut grid = CollisionGrid::new(UVec2::new(4, 4), Vec2::new(100.0, 100.0));
        // Spans every cell
        grid.insert(aabb(0.0, 0.0, 100.0, 100.0), 7);

        let mut hits = Vec::new();
        grid.intersect(&aabb(10.0, 10.0, 90.0, 90.0), |b| {
            hits.push(b.tag);
            true
        }, false);
        assert_eq!(hits, vec![7]);
    }

    #[test]
    fn test_intersect_stops() {
        let mut grid = CollisionGrid::new(UVec2::new(2, 2), Vec2::new(100.0, 100.0));
        grid.insert(aabb(0.0, 0.0, 20.0, 20.0), 0);
        grid.insert(aabb(10.0, 10.0, 30.0, 30.0), 1);

        let mut count = 0;
        grid.intersect(&aabb(5.0, 5.0, 25.0, 25.0), |_| {
            count += 1;
            false
        }, false);
        assert_eq!(count, 1);

        count = 0;
        grid.intersect(&aabb(5.0, 5.0, 25.0, 25.0), |_| {
            count += 1;
            true
        }, true);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_out_of_range_clamped() {
        let mut grid = CollisionGrid::new(UVec2::new(2, 2), Vec2::new(100.0, 100.0));
        grid.insert(aabb(-50.0, -50.0, -40.0, -40.0), 3);

        let mut hit = None;
        grid.intersect(&aabb(-45.0, -45.0, -30.0, -30.0), |b| {
            hit = Some(b.tag);
            true
        }, false);
        assert_eq!(hit, Some(3));
    }

    #[test]
    fn test_intersect_all_symmetric() {
        let boxes = [
            aabb(0.0, 0.0, 10.0, 10.0),
            aabb(5.0, 5.0, 15.0, 15.0),
            aabb(50.0, 50.0, 60.0, 60.0),
            aabb(8.0, 0.0, 60.0, 9.0),
        ];
        let mut grid = CollisionGrid::new(UVec2::new(3, 3), Vec2::new(64.0, 64.0));
        let pairs = grid.intersect_all(&boxes);
        assert_eq!(pairs, vec![(0, 1), (0, 3), (1, 3)]);

        // Reversed input gives the mirrored pair set
        let reversed: Vec<Aabb> = boxes.iter().rev().copied().collect();
        let mirrored: Vec<(usize, usize)> = grid
            .intersect_all(&reversed)
            .into_iter()
            .map(|(a, b)| {
                let (a, b) = (3 - a, 3 - b);
                (a.min(b), a.max(b))
            })
            .collect();
        let mut mirrored = mirrored;
        mirrored.sort_unstable();
        assert_eq!(mirrored, pairs);
    }

    #[test]
    fn test_resize_clears() {
        let mut grid = CollisionGrid::default();
        grid.insert(aabb(0.0, 0.0, 1.0, 1.0), 0);
        grid.resize(UVec2::new(3, 2), Vec2::new(300.0, 200.0));
        assert!(grid.is_empty());
        assert_eq!(grid.split(), UVec2::new(3, 2));
    }
}
