//! Container engine driven through its command-line client.

use std::process::Stdio;

use async_trait::async_trait;
use cycore_shared::errors::{CycoreError, CycoreResult};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use super::{ContainerEngine, ExportSink, ImageRef};

/// `ContainerEngine` backed by `docker` (or any CLI-compatible engine such as `podman`).
#[derive(Debug, Clone)]
pub struct CliEngine {
    binary: String,
}

impl CliEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run `<binary> <args>` to completion and return trimmed stdout.
    async fn run(&self, args: &[&str]) -> CycoreResult<String> {
        tracing::debug!(binary = %self.binary, ?args, "Running engine command");

        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                CycoreError::Engine(format!("failed to run {} {}: {}", self.binary, args[0], e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CycoreError::Engine(format!(
                "{} {} exited with {}: {}",
                self.binary,
                args[0],
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl ContainerEngine for CliEngine {
    async fn pull(&self, image: &ImageRef) -> CycoreResult<()> {
        let whole = image.whole();
        self.run(&["pull", &whole]).await?;
        Ok(())
    }

    async fn create(&self, name: &str, image: &ImageRef, entrypoint: &str) -> CycoreResult<String> {
        let whole = image.whole();
        let id = self
            .run(&["create", "--name", name, "--entrypoint", entrypoint, &whole])
            .await?;

        // Some engines print pull progress before the id.
        id.lines()
            .last()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .ok_or_else(|| CycoreError::Engine(format!("{} create printed no id", self.binary)))
    }

    async fn export(&self, id: &str, mut sink: ExportSink) -> CycoreResult<()> {
        let mut child = Command::new(&self.binary)
            .args(["export", id])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CycoreError::Engine(format!("failed to run {} export: {}", self.binary, e)))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| CycoreError::Internal("export stdout not piped".into()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| CycoreError::Internal("export stderr not piped".into()))?;

        let copy = async {
            let copied = tokio::io::copy(&mut stdout, &mut sink).await?;
            sink.shutdown().await?;
            Ok::<u64, std::io::Error>(copied)
        };
        let drain = async {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        };
        let (copied, stderr_buf) = tokio::join!(copy, drain);
        drop(sink);

        let copied = match copied {
            Ok(n) => n,
            Err(e) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(CycoreError::Engine(format!(
                    "export of {} interrupted: {}",
                    id, e
                )));
            }
        };

        let status = child
            .wait()
            .await
            .map_err(|e| CycoreError::Engine(format!("failed to wait for export: {}", e)))?;
        if !status.success() {
            return Err(CycoreError::Engine(format!(
                "{} export exited with {}: {}",
                self.binary,
                status,
                String::from_utf8_lossy(&stderr_buf).trim()
            )));
        }

        tracing::debug!(container = %id, bytes = copied, "Export stream finished");
        Ok(())
    }

    async fn remove(&self, id: &str, force: bool) -> CycoreResult<()> {
        if force {
            self.run(&["rm", "-f", id]).await?;
        } else {
            self.run(&["rm", id]).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Write a shell script standing in for the engine CLI.
    fn fake_engine(dir: &TempDir, body: &str) -> String {
        let path = dir.path().join("engine");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_create_returns_last_line() {
        let dir = TempDir::new().unwrap();
        let engine = CliEngine::new(fake_engine(&dir, "echo 'pulling...'; echo abc123"));
        let image = ImageRef::parse("ulexus/qemu").unwrap();

        let id = engine.create("x", &image, "/bin/true").await.unwrap();
        assert_eq!(id, "abc123");
    }

    #[tokio::test]
    async fn test_failure_includes_stderr() {
        let dir = TempDir::new().unwrap();
        let engine = CliEngine::new(fake_engine(&dir, "echo 'manifest unknown' >&2; exit 1"));
        let image = ImageRef::parse("ulexus/qemu").unwrap();

        let err = engine.pull(&image).await.unwrap_err();
        assert!(err.to_string().contains("manifest unknown"));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let engine = CliEngine::new("/nonexistent/docker");
        assert!(matches!(
            engine.remove("abc", true).await,
            Err(CycoreError::Engine(_))
        ));
    }

    #[tokio::test]
    async fn test_export_streams_stdout() {
        let dir = TempDir::new().unwrap();
        let engine = CliEngine::new(fake_engine(&dir, "printf 'archive-bytes'"));

        let (writer, mut reader) = tokio::io::duplex(4);
        let read = tokio::spawn(async move {
            let mut out = Vec::new();
            reader.read_to_end(&mut out).await.unwrap();
            out
        });

        engine.export("abc", Box::new(writer)).await.unwrap();
        assert_eq!(read.await.unwrap(), b"archive-bytes");
    }

    #[tokio::test]
    async fn test_export_failure_status() {
        let dir = TempDir::new().unwrap();
        let engine = CliEngine::new(fake_engine(&dir, "echo 'no such container' >&2; exit 1"));

        let err = engine
            .export("abc", Box::new(tokio::io::sink()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no such container"));
    }
}
