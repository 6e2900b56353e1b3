//! Root filesystem materialization.

mod materializer;
mod target;

pub use materializer::{ImageMaterializer, MaterializeOptions};
pub use target::{TargetState, inspect as inspect_target, marker_path};

use std::path::PathBuf;

/// A root filesystem extracted from an image.
///
/// `ready` is the only readiness signal downstream code may trust; a value
/// returned by `ImageMaterializer::materialize` is always ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedImage {
    pub source_path: PathBuf,
    pub ready: bool,
    /// Fully qualified image reference the filesystem came from.
    pub image: String,
    /// Set when the export container could not be removed.
    pub cleanup_warning: Option<String>,
}

impl MaterializedImage {
    /// An image that must not be launched.
    pub fn not_ready(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            ready: false,
            image: String::new(),
            cleanup_warning: None,
        }
    }
}
