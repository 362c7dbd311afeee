//! Oriented and axis-aligned screen boxes, plus the per-frame OBB arena.

use glam::Vec2;

/// Axis-aligned box in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Box of `size` centered on `center`.
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self::new(center - half, center + half)
    }

    /// Empty box that any union grows from.
    pub fn empty() -> Self {
        Self::new(Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY))
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn include(&mut self, p: Vec2) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Overlap test; touching edges do not count.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Grow by `margin` on every side.
    pub fn expanded(&self, margin: f32) -> Aabb {
        Aabb::new(self.min - Vec2::splat(margin), self.max + Vec2::splat(margin))
    }
}

/// Oriented box: centroid, rotation as `(cos, sin)` and full width/height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obb {
    centroid: Vec2,
    rotation: Vec2,
    size: Vec2,
}

impl Obb {
    pub fn new(centroid: Vec2, rotation: Vec2, width: f32, height: f32) -> Self {
        Self {
            centroid,
            rotation,
            size: Vec2::new(width, height),
        }
    }

    /// Unrotated box.
    pub fn axis_aligned(centroid: Vec2, width: f32, height: f32) -> Self {
        Self::new(centroid, Vec2::X, width, height)
    }

    pub fn centroid(&self) -> Vec2 {
        self.centroid
    }

    pub fn rotation(&self) -> Vec2 {
        self.rotation
    }

    pub fn width(&self) -> f32 {
        self.size.x
    }

    pub fn height(&self) -> f32 {
        self.size.y
    }

    /// Local x and y axes in screen space.
    fn axes(&self) -> [Vec2; 2] {
        let ax = self.rotation;
        [ax, ax.perp()]
    }

    /// Corners in winding order.
    pub fn quad(&self) -> [Vec2; 4] {
        let [ax, ay] = self.axes();
        let hx = ax * self.size.x * 0.5;
        let hy = ay * self.size.y * 0.5;
        let c = self.centroid;
        [c - hx - hy, c + hx - hy, c + hx + hy, c - hx + hy]
    }

    /// Screen-aligned bounding box of the corners.
    pub fn extent(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        for p in self.quad() {
            aabb.include(p);
        }
        aabb
    }

    /// Separating-axis test against another box.
    pub fn intersects(&self, other: &Obb) -> bool {
        let a = self.quad();
        let b = other.quad();

        self.axes()
            .into_iter()
            .chain(other.axes())
            .all(|axis| {
                let (a_min, a_max) = project_onto(&a, axis);
                let (b_min, b_max) = project_onto(&b, axis);
                a_min < b_max && b_min < a_max
            })
    }

    /// Whether `p` lies inside the box.
    pub fn contains(&self, p: Vec2) -> bool {
        let d = p - self.centroid;
        let [ax, ay] = self.axes();
        d.dot(ax).abs() <= self.size.x * 0.5 && d.dot(ay).abs() <= self.size.y * 0.5
    }
}

fn project_onto(quad: &[Vec2; 4], axis: Vec2) -> (f32, f32) {
    quad.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
        let d = p.dot(axis);
        (lo.min(d), hi.max(d))
    })
}

/// Contiguous slice of an arena, valid until the arena is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Range {
    pub start: usize,
    pub length: usize,
}

impl Range {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.end()
    }
}

/// Append-only OBB arena shared by all labels in one pass.
#[derive(Debug, Default)]
pub struct ObbBuffer {
    obbs: Vec<Obb>,
}

impl ObbBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Truncate the arena; all previously handed out ranges become invalid.
    pub fn reset(&mut self) {
        self.obbs.clear();
    }

    /// Append one box.
    pub fn append(&mut self, obb: Obb) {
        self.obbs.push(obb);
    }

    /// Drop every box from `start` on, so the most recent label can recompute
    /// its boxes for another anchor.
    pub fn truncate_to(&mut self, start: usize) {
        self.obbs.truncate(start);
    }

    pub fn len(&self) -> usize {
        self.obbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obbs.is_empty()
    }

    pub fn get(&self, range: Range) -> &[Obb] {
        &self.obbs[range.indices()]
    }

    pub fn get_mut(&mut self, range: Range) -> &mut [Obb] {
        &mut self.obbs[range.indices()]
    }

    pub fn obb(&self, index: usize) -> &Obb {
        &self.obbs[index]
    }
}
