//! Per-frame screen transforms.
//!
//! A label's projected geometry is written into a shared arena of `Vec3`
//! values. Point labels store their screen position and rotation, line labels
//! their projected segment, curved labels a sampled path whose `z` component is
//! the accumulated arc length.

use glam::{Vec2, Vec3};

use super::obb::Range;

/// Arena of projected label geometry, reset once per pass.
#[derive(Debug, Default)]
pub struct TransformBuffer {
    points: Vec<Vec3>,
}

impl TransformBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, range: Range) -> &[Vec3] {
        &self.points[range.indices()]
    }

    /// Start a new transform at the end of the arena.
    pub fn begin(&mut self) -> ScreenTransform<'_> {
        let start = self.points.len();
        ScreenTransform {
            buffer: self,
            start,
        }
    }
}

/// Writer for one label's transform.
///
/// Dropping the writer without calling [`ScreenTransform::finish`] keeps what
/// was written; call [`ScreenTransform::discard`] to roll it back.
#[derive(Debug)]
pub struct ScreenTransform<'a> {
    buffer: &'a mut TransformBuffer,
    start: usize,
}

impl ScreenTransform<'_> {
    pub fn push(&mut self, p: Vec3) {
        self.buffer.points.push(p);
    }

    pub fn push_point(&mut self, p: Vec2, w: f32) {
        self.push(p.extend(w));
    }

    pub fn len(&self) -> usize {
        self.buffer.points.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values written so far.
    pub fn points(&self) -> &[Vec3] {
        &self.buffer.points[self.start..]
    }

    /// Roll back everything written through this writer.
    pub fn discard(&mut self) {
        self.buffer.points.truncate(self.start);
    }

    /// Range of the written values inside the arena.
    pub fn finish(self) -> Range {
        Range::new(self.start, self.buffer.points.len() - self.start)
    }
}

/// Point on a sampled screen path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSample {
    pub position: Vec2,
    /// Normalized direction of the segment holding the sample.
    pub tangent: Vec2,
    /// Index of that segment's first vertex.
    pub segment: usize,
}

/// Total arc length of a sampled path (`z` of the last point).
pub fn path_length(path: &[Vec3]) -> f32 {
    path.last().map(|p| p.z).unwrap_or(0.0)
}

/// Sample a path at arc length `distance`.
///
/// Returns `None` for paths with fewer than two points or distances outside
/// `[0, length]`.
pub fn sample_path(path: &[Vec3], distance: f32) -> Option<PathSample> {
    if path.len() < 2 || distance < 0.0 || distance > path_length(path) {
        return None;
    }

    for (i, pair) in path.windows(2).enumerate() {
        let (p0, p1) = (pair[0], pair[1]);
        if distance <= p1.z {
            let segment_len = p1.z - p0.z;
            let dir = (p1.truncate() - p0.truncate()).normalize_or_zero();
            if segment_len < 1e-4 {
                return Some(PathSample {
                    position: p0.truncate(),
                    tangent: dir,
                    segment: i,
                });
            }
            let t = (distance - p0.z) / segment_len;
            return Some(PathSample {
                position: p0.truncate().lerp(p1.truncate(), t),
                tangent: dir,
                segment: i,
            });
        }
    }

    None
}

/// Append `points` to `out` as `(x, y, accumulated length)`.
pub fn push_sampled_path(points: &[Vec2], out: &mut ScreenTransform<'_>) {
    let mut length = 0.0;
    let mut prev: Option<Vec2> = None;
    for &p in points {
        if let Some(q) = prev {
            length += q.distance(p);
        }
        out.push_point(p, length);
        prev = Some(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_ranges() {
        let mut buffer = TransformBuffer::new();
        let mut first = buffer.begin();
        first.push(Vec3::ONE);
        let r0 = first.finish();

        let mut second = buffer.begin();
        second.push(Vec3::ZERO);
        second.push(Vec3::X);
        let r1 = second.finish();

        assert_eq!(r0, Range::new(0, 1));
        assert_eq!(r1, Range::new(1, 2));
        assert_eq!(buffer.get(r1)[1], Vec3::X);
    }

    #[test]
    fn test_discard() {
        let mut buffer = TransformBuffer::new();
        let mut t = buffer.begin();
        t.push(Vec3::ONE);
        t.discard();
        assert!(t.is_empty());
        let r = t.finish();
        assert!(r.is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_sample_path() {
        let mut buffer = TransformBuffer::new();
        let mut t = buffer.begin();
        push_sampled_path(
            &[Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0)],
            &mut t,
        );
        let range = t.finish();
        let path = buffer.get(range);

        assert!((path_length(path) - 20.0).abs() < 1e-5);

        let s = sample_path(path, 5.0).unwrap();
        assert!((s.position - Vec2::new(5.0, 0.0)).length() < 1e-5);
        assert_eq!(s.segment, 0);

        let s = sample_path(path, 15.0).unwrap();
        assert!((s.position - Vec2::new(10.0, 5.0)).length() < 1e-5);
        assert!((s.tangent - Vec2::Y).length() < 1e-5);
        assert_eq!(s.segment, 1);

        assert!(sample_path(path, 25.0).is_none());
    }
}
