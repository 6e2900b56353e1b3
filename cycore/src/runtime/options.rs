//! Launcher options.
//!
//! Everything the binary derives from flags lands here and is threaded
//! through the pipeline explicitly.

use std::path::PathBuf;
use std::time::Duration;

use cycore_shared::errors::{CycoreError, CycoreResult};
use serde::{Deserialize, Serialize};

use crate::launch::{SandboxPolicy, StdioMode, validate_bridge};
use crate::runtime::constants::{self, timeouts};
use crate::runtime::types::{InstanceId, key_segment_problem};

/// Options for a single materialize-and-launch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CycoreOptions {
    /// Instance whose configuration is read from the coordination service.
    pub instance: InstanceId,
    /// Root filesystem target. Must be absent or empty (see `rootfs`).
    pub target_path: PathBuf,
    /// etcd endpoints, tried in order.
    pub etcd_endpoints: Vec<String>,
    /// First segment of instance keys (`/<domain>/<instance>/<field>`).
    pub key_domain: String,
    pub bridge_interface: String,
    pub image: String,
    /// Container engine CLI (docker or podman).
    pub engine_binary: String,
    pub tar_binary: String,
    pub pull_timeout_secs: u64,
    pub extract_timeout_secs: u64,
    pub stdio: StdioMode,
    /// Build the plan but don't start the sandbox.
    pub dry_run: bool,
    pub policy: SandboxPolicy,
}

impl Default for CycoreOptions {
    fn default() -> Self {
        Self {
            instance: InstanceId::default(),
            target_path: PathBuf::from(constants::DEFAULT_TARGET_PATH),
            etcd_endpoints: vec![constants::DEFAULT_ETCD_ENDPOINT.to_string()],
            key_domain: constants::DEFAULT_KEY_DOMAIN.to_string(),
            bridge_interface: constants::DEFAULT_BRIDGE_INTERFACE.to_string(),
            image: constants::DEFAULT_IMAGE.to_string(),
            engine_binary: constants::DEFAULT_ENGINE_BINARY.to_string(),
            tar_binary: constants::DEFAULT_TAR_BINARY.to_string(),
            pull_timeout_secs: timeouts::PULL_SECS,
            extract_timeout_secs: timeouts::EXTRACT_SECS,
            stdio: StdioMode::default(),
            dry_run: false,
            policy: SandboxPolicy::default(),
        }
    }
}

impl CycoreOptions {
    pub fn new(instance: impl Into<InstanceId>) -> Self {
        Self {
            instance: instance.into(),
            ..Self::default()
        }
    }

    /// Split a comma-separated endpoint list, dropping blanks.
    pub fn parse_endpoints(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('/').to_string())
            .collect()
    }

    pub fn pull_timeout(&self) -> Duration {
        Duration::from_secs(self.pull_timeout_secs)
    }

    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs)
    }

    /// Reject options that can't produce a launch before any work starts.
    pub fn sanitize(&self) -> CycoreResult<()> {
        self.instance.validate()?;

        if !self.target_path.is_absolute() {
            return Err(CycoreError::Options(format!(
                "target path must be absolute, got: {}",
                self.target_path.display()
            )));
        }
        if self.target_path.parent().is_none() {
            return Err(CycoreError::Options(
                "target path must not be the filesystem root".into(),
            ));
        }

        if self.etcd_endpoints.is_empty() {
            return Err(CycoreError::Options(
                "at least one etcd endpoint is required".into(),
            ));
        }
        for endpoint in &self.etcd_endpoints {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(CycoreError::Options(format!(
                    "etcd endpoint must be an http(s) URL: {}",
                    endpoint
                )));
            }
        }

        if let Some(reason) = key_segment_problem(&self.key_domain) {
            return Err(CycoreError::Options(format!(
                "key domain {:?} {}",
                self.key_domain, reason
            )));
        }

        validate_bridge(&self.bridge_interface)?;

        if self.pull_timeout_secs == 0 || self.extract_timeout_secs == 0 {
            return Err(CycoreError::Options("timeouts must be non-zero".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_launcher() {
        let opts = CycoreOptions::default();
        assert_eq!(opts.target_path, PathBuf::from("/var/lib/cycore/qemu"));
        assert_eq!(opts.etcd_endpoints, vec!["http://127.0.0.1:4001"]);
        assert_eq!(opts.bridge_interface, "public");
        assert_eq!(opts.key_domain, "kvm");
    }

    #[test]
    fn test_parse_endpoints() {
        let eps = CycoreOptions::parse_endpoints("http://a:4001/, ,http://b:4001");
        assert_eq!(eps, vec!["http://a:4001", "http://b:4001"]);
    }

    #[test]
    fn test_sanitize_accepts_defaults_with_instance() {
        CycoreOptions::new("vm42").sanitize().unwrap();
    }

    #[test]
    fn test_sanitize_rejects_missing_instance() {
        assert!(CycoreOptions::default().sanitize().is_err());
    }

    #[test]
    fn test_sanitize_rejects_relative_target() {
        let mut opts = CycoreOptions::new("vm42");
        opts.target_path = PathBuf::from("qemu");
        assert!(matches!(opts.sanitize(), Err(CycoreError::Options(_))));
    }

    #[test]
    fn test_sanitize_rejects_non_http_endpoint() {
        let mut opts = CycoreOptions::new("vm42");
        opts.etcd_endpoints = vec!["127.0.0.1:4001".into()];
        assert!(opts.sanitize().is_err());
    }

    #[test]
    fn test_sanitize_rejects_dot_key_domain() {
        let mut opts = CycoreOptions::new("vm42");
        opts.key_domain = "..".into();
        assert!(matches!(opts.sanitize(), Err(CycoreError::Options(_))));
    }

    #[test]
    fn test_sanitize_rejects_bad_bridge() {
        let mut opts = CycoreOptions::new("vm42");
        opts.bridge_interface = "br0,id=evil".into();
        assert!(opts.sanitize().is_err());
    }

    #[test]
    fn test_options_from_partial_json() {
        let opts: CycoreOptions =
            serde_json::from_str(r#"{"instance":"vm7","bridge_interface":"br0"}"#).unwrap();
        assert_eq!(opts.instance.as_str(), "vm7");
        assert_eq!(opts.bridge_interface, "br0");
        assert_eq!(opts.image, "ulexus/qemu:latest");
    }
}
