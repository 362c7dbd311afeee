//! Placement configuration.
//!
//! Every field has a default so partial JSON documents are accepted.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LabelResult;

/// Tunables shared by the tile collider and the frame label manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Viewport pixels per grid cell for the frame pass.
    pub grid_divisor: f32,
    /// Viewport pixels per grid cell for the tile collider.
    pub collider_grid_divisor: f32,
    /// Extra screen margin (pixels) within which colliding labels are still collected.
    pub collision_border: f32,
    /// Zoom levels above the tile's own zoom at which the collider evaluates it.
    pub overzoom_levels: u32,
    /// Box growth applied to labels that were occluded on the previous frame.
    pub activation_distance_threshold: f32,
    /// How much wider than its screen segment a line label may be (0.3 = 30%).
    pub line_exceed_ratio: f32,
    /// Maximum vertices in one GPU draw chunk.
    pub max_quad_vertices: usize,
    /// Skip the dead-label filter during collection.
    pub draw_all_labels: bool,
    /// Enable the debug overlay.
    pub debug_labels: bool,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            grid_divisor: 256.0,
            collider_grid_divisor: 128.0,
            collision_border: 256.0,
            overzoom_levels: 2,
            activation_distance_threshold: 2.0,
            line_exceed_ratio: 0.3,
            max_quad_vertices: 16384,
            draw_all_labels: false,
            debug_labels: false,
        }
    }
}

impl PlacementConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> LabelResult<Self> {
        let config: PlacementConfig = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    /// Load a configuration from a JSON file.
    pub fn from_file(path: &Path) -> LabelResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Scale factor applied by the tile collider (`2^overzoom_levels`).
    pub fn overzoom_scale(&self) -> f32 {
        (1u32 << self.overzoom_levels.min(8)) as f32
    }

    pub(crate) fn sanitized(mut self) -> Self {
        self.grid_divisor = self.grid_divisor.max(1.0);
        self.collider_grid_divisor = self.collider_grid_divisor.max(1.0);
        self.collision_border = self.collision_border.max(0.0);
        self.line_exceed_ratio = self.line_exceed_ratio.clamp(0.0, 1.0);
        // Quads are pushed whole.
        self.max_quad_vertices = (self.max_quad_vertices / 4).max(1) * 4;
        self
    }
}
