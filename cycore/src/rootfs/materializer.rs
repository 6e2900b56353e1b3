//! Pull an image and extract its filesystem into a target directory.
//!
//! ```text
//! pull ──→ create (noop entrypoint) ──→ export ══pipe══→ tar -x -C <target>
//!                                        (spawned task)   (awaited)
//!                        └──────────── rm -f (always) ────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use cycore_shared::errors::{CycoreError, CycoreResult, MaterializeError};
use tokio::process::Command;
use tokio::task::{JoinError, JoinHandle};

use super::MaterializedImage;
use super::target::TargetGuard;
use crate::images::{ContainerEngine, ImageRef};
use crate::runtime::CycoreOptions;
use crate::runtime::constants::{self, export, timeouts};

/// Extraction settings.
#[derive(Debug, Clone)]
pub struct MaterializeOptions {
    pub tar_binary: String,
    pub pull_timeout: Duration,
    pub extract_timeout: Duration,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            tar_binary: constants::DEFAULT_TAR_BINARY.to_string(),
            pull_timeout: Duration::from_secs(timeouts::PULL_SECS),
            extract_timeout: Duration::from_secs(timeouts::EXTRACT_SECS),
        }
    }
}

impl From<&CycoreOptions> for MaterializeOptions {
    fn from(opts: &CycoreOptions) -> Self {
        Self {
            tar_binary: opts.tar_binary.clone(),
            pull_timeout: opts.pull_timeout(),
            extract_timeout: opts.extract_timeout(),
        }
    }
}

/// Export container owned by one materialization.
///
/// `release` removes it in line. If the owning future is dropped first, the
/// forced removal is spawned onto the runtime instead.
struct ContainerLease {
    engine: Arc<dyn ContainerEngine>,
    id: String,
    armed: bool,
}

impl ContainerLease {
    fn new(engine: Arc<dyn ContainerEngine>, id: String) -> Self {
        Self {
            engine,
            id,
            armed: true,
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    async fn release(mut self) -> CycoreResult<()> {
        self.armed = false;
        self.engine.remove(&self.id, true).await
    }
}

impl Drop for ContainerLease {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(container = %self.id, "No runtime left to remove export container");
            return;
        };

        tracing::warn!(container = %self.id, "Materialization cancelled, removing export container");
        let engine = Arc::clone(&self.engine);
        let id = std::mem::take(&mut self.id);
        handle.spawn(async move {
            if let Err(e) = engine.remove(&id, true).await {
                tracing::warn!(container = %id, error = %e, "Failed to remove export container");
            }
        });
    }
}

/// Export task that is aborted when its handle goes away.
struct ExportTask(JoinHandle<CycoreResult<()>>);

impl ExportTask {
    async fn join(&mut self) -> Result<CycoreResult<()>, JoinError> {
        (&mut self.0).await
    }
}

impl Drop for ExportTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Turns a registry image into a ready root filesystem.
pub struct ImageMaterializer {
    engine: Arc<dyn ContainerEngine>,
    options: MaterializeOptions,
}

impl ImageMaterializer {
    pub fn new(engine: Arc<dyn ContainerEngine>, options: MaterializeOptions) -> Self {
        Self { engine, options }
    }

    /// Materialize `image` into `target`.
    ///
    /// `target` must be absent or empty. A directory left by an interrupted
    /// run is recognized by its partial marker and wiped first; any other
    /// non-empty directory is refused with `TargetNotClean`.
    ///
    /// On error the target is removed, so calling again starts from scratch.
    /// The export container is always force-removed, also when this future
    /// is dropped mid-way; if removal fails the result still succeeds and
    /// carries a `cleanup_warning`.
    pub async fn materialize(&self, image: &str, target: &Path) -> CycoreResult<MaterializedImage> {
        // Refuse an occupied target before touching the registry.
        super::target::inspect(target)?;

        let image = ImageRef::parse(image)?;

        tracing::info!(image = %image, target = %target.display(), "Pulling image");
        self.pull(&image).await?;

        let name = format!("{}-{}", export::CONTAINER_PREFIX, uuid::Uuid::new_v4());
        let container_id = self
            .engine
            .create(&name, &image, export::NOOP_ENTRYPOINT)
            .await
            .map_err(|e| MaterializeError::CreateFailed {
                image: image.whole(),
                reason: e.to_string(),
            })?;
        tracing::debug!(container = %container_id, name = %name, "Created export container");
        let lease = ContainerLease::new(Arc::clone(&self.engine), container_id);

        let extracted = self.extract(lease.id(), target).await;

        let container_id = lease.id().to_string();
        let cleanup_warning = match lease.release().await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(
                    container = %container_id,
                    error = %e,
                    "Failed to remove export container"
                );
                Some(format!("failed to remove container {}: {}", container_id, e))
            }
        };

        let source_path = extracted?;

        tracing::info!(image = %image, target = %source_path.display(), "Image materialized");

        Ok(MaterializedImage {
            source_path,
            ready: true,
            image: image.whole(),
            cleanup_warning,
        })
    }

    async fn pull(&self, image: &ImageRef) -> CycoreResult<()> {
        let pull_failed = |reason: String| MaterializeError::PullFailed {
            image: image.whole(),
            reason,
        };

        match tokio::time::timeout(self.options.pull_timeout, self.engine.pull(image)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(pull_failed(e.to_string()).into()),
            Err(_) => Err(pull_failed(format!(
                "timed out after {}s",
                self.options.pull_timeout.as_secs()
            ))
            .into()),
        }
    }

    /// Pipe `export <container>` into `tar -x` rooted at `target`.
    ///
    /// The export runs as its own task writing into tar's stdin; the pipe
    /// applies backpressure in both directions. Returns the target path once
    /// both ends finished cleanly.
    async fn extract(&self, container_id: &str, target: &Path) -> CycoreResult<PathBuf> {
        let extraction_failed = |reason: String| -> CycoreError {
            MaterializeError::ExtractionFailed {
                target: target.to_path_buf(),
                reason,
            }
            .into()
        };

        let guard = TargetGuard::claim(target)?;

        let mut tar = Command::new(&self.options.tar_binary)
            .arg("-x")
            .arg("-f")
            .arg("-")
            .arg("-C")
            .arg(guard.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                extraction_failed(format!("failed to start {}: {}", self.options.tar_binary, e))
            })?;

        let stdin = tar
            .stdin
            .take()
            .ok_or_else(|| CycoreError::Internal("tar stdin not piped".into()))?;

        let engine = Arc::clone(&self.engine);
        let id = container_id.to_string();
        let mut export =
            ExportTask(tokio::spawn(async move { engine.export(&id, Box::new(stdin)).await }));

        // Both ends share one deadline. On expiry the tar child is dropped
        // (kill_on_drop) and the export task is aborted with its handle.
        let finished = async {
            let output = match tar.wait_with_output().await {
                Ok(output) => output,
                Err(e) => return Err(format!("failed to wait for tar: {}", e)),
            };

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(format!("tar exited with {}: {}", output.status, stderr.trim()));
            }

            // tar is done; an export error now means the archive was cut short.
            match export.join().await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(format!("export failed: {}", e)),
                Err(e) => Err(format!("export task failed: {}", e)),
            }
        };

        match tokio::time::timeout(self.options.extract_timeout, finished).await {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => return Err(extraction_failed(reason)),
            Err(_) => {
                return Err(extraction_failed(format!(
                    "extraction timed out after {}s",
                    self.options.extract_timeout.as_secs_f64()
                )));
            }
        }

        guard.commit()
    }
}
