//! View state handed to the label passes by the map view layer.

use glam::Vec2;

/// Snapshot of the camera for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// Viewport size in pixels.
    pub viewport_size: Vec2,
    /// Current (fractional) zoom level.
    pub zoom: f32,
    /// Fractional part of the zoom.
    pub fract_zoom: f32,
    /// `2^zoom`, used to convert tile units into pixels.
    pub zoom_scale: f32,
    /// Size of one tile on screen at integer zoom, in pixels.
    pub tile_size: f32,
}

impl ViewState {
    /// Create a view state for a viewport at the given zoom.
    pub fn new(width: f32, height: f32, zoom: f32) -> Self {
        Self {
            viewport_size: Vec2::new(width, height),
            zoom,
            fract_zoom: zoom - zoom.floor(),
            zoom_scale: zoom.exp2(),
            tile_size: 256.0,
        }
    }

    /// Set the on-screen tile size.
    pub fn with_tile_size(mut self, tile_size: f32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Integer zoom level, used to detect zoom-level changes.
    pub fn integer_zoom(&self) -> i32 {
        self.zoom.floor() as i32
    }

    /// Resize the viewport.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport_size = Vec2::new(width, height);
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(256.0, 256.0, 0.0)
    }
}
