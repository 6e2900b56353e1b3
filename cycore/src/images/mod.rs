//! Container image access.
//!
//! - `ContainerEngine` - pull / create / export / remove seam
//! - `CliEngine` - drives the docker or podman CLI
//! - `ImageRef` - parsed, normalized image reference

mod cli;
mod reference;

pub use cli::CliEngine;
pub use reference::ImageRef;

use async_trait::async_trait;
use cycore_shared::errors::CycoreResult;
use tokio::io::AsyncWrite;

/// Write end handed to an export. Dropping it closes the stream.
pub type ExportSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Operations the materializer needs from a container engine.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Pull `image`. Pulling an image that is already present succeeds.
    async fn pull(&self, image: &ImageRef) -> CycoreResult<()>;

    /// Create (but don't start) a container named `name` from `image`.
    ///
    /// Returns the engine's container id.
    async fn create(&self, name: &str, image: &ImageRef, entrypoint: &str) -> CycoreResult<String>;

    /// Stream the container filesystem as a tar archive into `sink`.
    ///
    /// Must not buffer the whole archive; `sink` is dropped on return.
    async fn export(&self, id: &str, sink: ExportSink) -> CycoreResult<()>;

    async fn remove(&self, id: &str, force: bool) -> CycoreResult<()>;
}
