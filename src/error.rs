//! Central error handling for the label engine
//!
//! Frame passes never fail; these errors surface from configuration loading,
//! label set construction and mesh emission, where callers log and skip.

/// Result alias used across the crate.
pub type LabelResult<T> = Result<T, LabelError>;

/// Errors produced outside the per-frame placement passes.
#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Quad references atlas {atlas} but only {available} meshes are allocated")]
    MeshIndex { atlas: usize, available: usize },

    #[error("Cannot link label {child} to {parent}: set holds {len} labels")]
    InvalidRelative {
        parent: usize,
        child: usize,
        len: usize,
    },

    #[error("Stale handle: slot {index} generation {generation}")]
    StaleHandle { index: u32, generation: u32 },
}

impl LabelError {
    /// Short category tag used in log lines.
    pub fn category(&self) -> &'static str {
        match self {
            LabelError::Io(_) => "IO",
            LabelError::Config(_) => "Config",
            LabelError::MeshIndex { .. } => "Mesh",
            LabelError::InvalidRelative { .. } => "Builder",
            LabelError::StaleHandle { .. } => "Handle",
        }
    }
}
