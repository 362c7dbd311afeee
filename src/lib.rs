//! Label placement and collision for tiled vector maps.
//!
//! Tiles and markers carry label sets built on worker threads. Each frame the
//! [`LabelManager`] projects them, resolves collisions against everything
//! placed before them, drives their fade transitions and writes the visible
//! ones into per-style quad meshes for the renderer to upload.

pub mod arena;
pub mod config;
pub mod debug;
pub mod error;
pub mod labels;
pub mod marker;
pub mod mesh;
pub mod tile;
pub mod view;

pub use arena::{Arena, Handle};
pub use config::PlacementConfig;
pub use debug::{DebugCommand, DebugPrimitives, DebugRecorder};
pub use error::{LabelError, LabelResult};
pub use labels::{Label, LabelManager, LabelOptions, LabelSet, LabelSetBuilder, LabelState};
pub use marker::{Marker, MarkerSet};
pub use mesh::{DynamicQuadMesh, LabelVertex, StyleMeshes};
pub use tile::{find_proxy, CacheStats, SourceId, Tile, TileCache, TileId, TileSet};
pub use view::ViewState;
