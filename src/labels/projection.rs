//! World-to-screen projection utilities for labels.

use glam::{Mat4, Vec2, Vec4};

/// Projects tile-local world coordinates (z = 0 plane) to screen pixels.
#[derive(Debug, Clone, Copy)]
pub struct LabelProjector {
    mvp: Mat4,
    screen_size: Vec2,
}

impl LabelProjector {
    /// Create a projector for one tile or marker matrix.
    pub fn new(mvp: Mat4, screen_size: Vec2) -> Self {
        Self { mvp, screen_size }
    }

    /// Synthetic projector used by the tile collider: maps the unit tile
    /// (y down) onto a square screen of `size` pixels.
    pub fn tile_centered(size: f32) -> Self {
        // x: [0,1] -> [-1,1], y: [0,1] -> [1,-1]
        let mvp = Mat4::from_cols(
            Vec4::new(2.0, 0.0, 0.0, 0.0),
            Vec4::new(0.0, -2.0, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 1.0, 0.0),
            Vec4::new(-1.0, 1.0, 0.0, 1.0),
        );
        Self::new(mvp, Vec2::splat(size))
    }

    /// Project a world position to screen coordinates.
    ///
    /// Returns `None` when the point is behind the camera (clip `w <= 0`).
    /// Points outside the frustum laterally are still returned; bounds are
    /// checked by the caller against the label's extent.
    pub fn project(&self, world_pos: Vec2) -> Option<Vec2> {
        let clip = self.mvp * Vec4::new(world_pos.x, world_pos.y, 0.0, 1.0);

        if clip.w <= 0.0 {
            return None;
        }

        // NDC y is up, screen y is down
        let ndc = Vec2::new(clip.x / clip.w, clip.y / clip.w);
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.screen_size.x,
            (1.0 - ndc.y) * 0.5 * self.screen_size.y,
        ))
    }

    pub fn mvp(&self) -> Mat4 {
        self.mvp
    }

    /// Get screen dimensions.
    pub fn screen_size(&self) -> Vec2 {
        self.screen_size
    }
}

/// Orthographic matrix mapping world units 1:1 onto a `width` x `height`
/// pixel viewport with y down. Handy for markers and tests.
pub fn pixel_ortho(width: f32, height: f32) -> Mat4 {
    Mat4::orthographic_rh_gl(0.0, width, height, 0.0, -1.0, 1.0)
}
