//! Static sandbox policy.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::runtime::constants::{qemu, sandbox};

/// Host directory bound into the sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindMount {
    pub source: PathBuf,
    pub target: PathBuf,
    #[serde(default)]
    pub read_only: bool,
}

impl BindMount {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }

    /// Same path on both sides.
    pub fn same_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::new(path.clone(), path)
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// `--bind=<src>:<dst>` or `--bind-ro=<src>:<dst>`.
    pub fn to_arg(&self) -> String {
        let flag = if self.read_only { "--bind-ro" } else { "--bind" };
        format!("{}={}:{}", flag, self.source.display(), self.target.display())
    }
}

/// How the sandbox and the nested QEMU are started.
///
/// Only instance-specific values (ram, mac, disk, spice port, bridge) come
/// from the coordination service; everything here is fixed per host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxPolicy {
    /// Sandbox launcher, systemd-nspawn.
    pub program: String,
    /// Share the host IPC/PID namespaces (needed for bridge helpers).
    pub share_system: bool,
    pub capabilities: Vec<String>,
    pub bind_mounts: Vec<BindMount>,
    /// Command run inside the sandbox; QEMU arguments are appended.
    pub entrypoint: Vec<String>,
    pub display: String,
    pub spice_addr: String,
    pub spice_ticketing: bool,
    pub keymap: String,
    pub cpu_model: String,
    pub nic_model: String,
    pub drive_cache: String,
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self {
            program: sandbox::PROGRAM.to_string(),
            share_system: true,
            capabilities: sandbox::CAPABILITIES.iter().map(|s| s.to_string()).collect(),
            // Ceph keyring and monitor config for the RBD block backend
            bind_mounts: vec![BindMount::same_path(sandbox::CEPH_CONFIG_DIR)],
            entrypoint: sandbox::ENTRYPOINT.iter().map(|s| s.to_string()).collect(),
            display: qemu::DISPLAY.to_string(),
            spice_addr: qemu::SPICE_ADDR.to_string(),
            spice_ticketing: false,
            keymap: qemu::KEYMAP.to_string(),
            cpu_model: qemu::CPU_MODEL.to_string(),
            nic_model: qemu::NIC_MODEL.to_string(),
            drive_cache: qemu::DRIVE_CACHE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_mount_args() {
        assert_eq!(
            BindMount::same_path("/etc/ceph").to_arg(),
            "--bind=/etc/ceph:/etc/ceph"
        );
        assert_eq!(
            BindMount::new("/srv/iso", "/iso").read_only().to_arg(),
            "--bind-ro=/srv/iso:/iso"
        );
    }

    #[test]
    fn test_partial_policy_json_keeps_defaults() {
        let policy: SandboxPolicy = serde_json::from_str(r#"{"cpu_model":"host"}"#).unwrap();
        assert_eq!(policy.cpu_model, "host");
        assert_eq!(policy.program, "/usr/bin/systemd-nspawn");
        assert_eq!(policy.bind_mounts.len(), 1);
    }
}
