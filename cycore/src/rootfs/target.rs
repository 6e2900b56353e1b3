//! Extraction target ownership.
//!
//! A target directory is "in progress" while a sibling marker file
//! `.<name>.partial` exists. The marker lets a later run tell a leftover of a
//! failed or crashed extraction apart from a directory the operator populated.

use std::path::{Path, PathBuf};

use cycore_shared::errors::{CycoreResult, MaterializeError};

/// What is currently at the target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Absent,
    Empty,
    /// Non-empty, with the partial marker present.
    Leftover,
    /// Non-empty, no marker. Never merged into.
    Occupied,
}

fn not_clean(target: &Path, reason: impl Into<String>) -> MaterializeError {
    MaterializeError::TargetNotClean {
        target: target.to_path_buf(),
        reason: reason.into(),
    }
}

/// Path of the in-progress marker for `target`.
pub fn marker_path(target: &Path) -> CycoreResult<PathBuf> {
    let name = target
        .file_name()
        .ok_or_else(|| not_clean(target, "target has no final path component"))?;
    let parent = target
        .parent()
        .ok_or_else(|| not_clean(target, "target has no parent directory"))?;
    Ok(parent.join(format!(".{}.partial", name.to_string_lossy())))
}

pub fn inspect(target: &Path) -> CycoreResult<TargetState> {
    let marker = marker_path(target)?;

    let meta = match std::fs::symlink_metadata(target) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(if marker.exists() {
                TargetState::Leftover
            } else {
                TargetState::Absent
            });
        }
        Err(e) => return Err(not_clean(target, format!("cannot stat target: {}", e)).into()),
    };

    if !meta.is_dir() {
        return Err(not_clean(target, "target exists and is not a directory").into());
    }

    let mut entries = std::fs::read_dir(target)
        .map_err(|e| not_clean(target, format!("cannot read target: {}", e)))?;
    if entries.next().is_none() {
        return Ok(TargetState::Empty);
    }

    if marker.exists() {
        Ok(TargetState::Leftover)
    } else {
        Ok(TargetState::Occupied)
    }
}

/// RAII claim on an extraction target.
///
/// Removes the target and its marker when dropped without `commit()`, so a
/// failed extraction never leaves a ready-looking directory behind.
pub struct TargetGuard {
    target: PathBuf,
    marker: PathBuf,
    armed: bool,
}

impl TargetGuard {
    /// Claim `target`: wipe leftovers, create the directory, write the marker.
    ///
    /// Fails with `TargetNotClean` if the target holds data we didn't put there.
    pub fn claim(target: &Path) -> CycoreResult<Self> {
        let marker = marker_path(target)?;

        match inspect(target)? {
            TargetState::Occupied => {
                return Err(not_clean(
                    target,
                    "directory is not empty; remove it or pick another target",
                )
                .into());
            }
            TargetState::Leftover => {
                tracing::warn!(
                    target = %target.display(),
                    "Removing leftover of an interrupted extraction"
                );
                remove_if_exists(target)?;
            }
            TargetState::Absent | TargetState::Empty => {}
        }

        // Marker first: a crash after this point is recognizable as a leftover.
        if let Some(parent) = marker.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&marker, b"")?;
        std::fs::create_dir_all(target)?;

        Ok(Self {
            target: target.to_path_buf(),
            marker,
            armed: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.target
    }

    /// Mark the extraction complete.
    pub fn commit(mut self) -> CycoreResult<PathBuf> {
        std::fs::remove_file(&self.marker)?;
        self.armed = false;
        Ok(self.target.clone())
    }
}

impl Drop for TargetGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        tracing::warn!(target = %self.target.display(), "Extraction failed, removing target");

        if let Err(e) = remove_if_exists(&self.target) {
            tracing::warn!(target = %self.target.display(), "Failed to remove target: {}", e);
            // Keep the marker so the next run wipes what is left.
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.marker)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(marker = %self.marker.display(), "Failed to remove marker: {}", e);
        }
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cycore_shared::errors::CycoreError;
    use tempfile::TempDir;

    #[test]
    fn test_marker_path() {
        assert_eq!(
            marker_path(Path::new("/var/lib/cycore/qemu")).unwrap(),
            PathBuf::from("/var/lib/cycore/.qemu.partial")
        );
    }

    #[test]
    fn test_inspect_states() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("qemu");

        assert_eq!(inspect(&target).unwrap(), TargetState::Absent);

        std::fs::create_dir(&target).unwrap();
        assert_eq!(inspect(&target).unwrap(), TargetState::Empty);

        std::fs::write(target.join("file"), b"x").unwrap();
        assert_eq!(inspect(&target).unwrap(), TargetState::Occupied);

        std::fs::write(marker_path(&target).unwrap(), b"").unwrap();
        assert_eq!(inspect(&target).unwrap(), TargetState::Leftover);
    }

    #[test]
    fn test_inspect_rejects_file() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("qemu");
        std::fs::write(&target, b"x").unwrap();

        assert!(matches!(
            inspect(&target),
            Err(CycoreError::Materialize(MaterializeError::TargetNotClean { .. }))
        ));
    }

    #[test]
    fn test_guard_drop_removes_target() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("qemu");

        {
            let guard = TargetGuard::claim(&target).unwrap();
            std::fs::write(guard.path().join("half-written"), b"x").unwrap();
            assert!(marker_path(&target).unwrap().exists());
        }

        assert!(!target.exists());
        assert!(!marker_path(&target).unwrap().exists());
    }

    #[test]
    fn test_guard_commit_keeps_target() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("qemu");

        let guard = TargetGuard::claim(&target).unwrap();
        std::fs::write(guard.path().join("bin"), b"x").unwrap();
        let path = guard.commit().unwrap();

        assert_eq!(path, target);
        assert!(target.join("bin").exists());
        assert!(!marker_path(&target).unwrap().exists());
    }

    #[test]
    fn test_claim_wipes_leftover() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("qemu");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("stale"), b"x").unwrap();
        std::fs::write(marker_path(&target).unwrap(), b"").unwrap();

        let guard = TargetGuard::claim(&target).unwrap();
        assert!(!guard.path().join("stale").exists());
        guard.commit().unwrap();
    }

    #[test]
    fn test_claim_refuses_occupied() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("qemu");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("operator-data"), b"x").unwrap();

        assert!(TargetGuard::claim(&target).is_err());
        assert!(target.join("operator-data").exists());
    }
}
