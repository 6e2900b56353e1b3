//! Default values for launcher configuration.
//!
//! Centralized location for every default the launcher falls back to.

/// Where the QEMU root filesystem is extracted.
pub const DEFAULT_TARGET_PATH: &str = "/var/lib/cycore/qemu";

/// etcd v2 client endpoint.
pub const DEFAULT_ETCD_ENDPOINT: &str = "http://127.0.0.1:4001";

/// Host bridge the VM NIC is attached to.
pub const DEFAULT_BRIDGE_INTERFACE: &str = "public";

/// Image carrying QEMU and its entrypoint script.
pub const DEFAULT_IMAGE: &str = "ulexus/qemu:latest";

/// CLI used to talk to the container engine.
pub const DEFAULT_ENGINE_BINARY: &str = "docker";

/// Archive extractor fed by the export stream.
pub const DEFAULT_TAR_BINARY: &str = "tar";

/// First path segment of every instance key.
pub const DEFAULT_KEY_DOMAIN: &str = "kvm";

/// Timeouts (seconds)
pub mod timeouts {
    pub const PULL_SECS: u64 = 600;
    pub const EXTRACT_SECS: u64 = 1800;
    pub const ETCD_REQUEST_SECS: u64 = 10;
}

/// Coordination-service field names under `/<domain>/<instance>/`.
pub mod keys {
    pub const RAM: &str = "ram";
    pub const MAC: &str = "mac";
    pub const BLOCK_DEVICE: &str = "rbd";
    pub const SPICE_PORT: &str = "spice_port";
}

/// Export container settings
pub mod export {
    /// Prefix of the ephemeral container name; a v4 UUID is appended.
    pub const CONTAINER_PREFIX: &str = "cycore-export";

    /// Entrypoint of the export container; it is never started.
    pub const NOOP_ENTRYPOINT: &str = "/bin/true";
}

/// Sandbox launch defaults
pub mod sandbox {
    pub const PROGRAM: &str = "/usr/bin/systemd-nspawn";
    pub const CAPABILITIES: &[&str] = &["all"];
    pub const CEPH_CONFIG_DIR: &str = "/etc/ceph";
    pub const ENTRYPOINT: &[&str] = &["/bin/bash", "/usr/local/bin/entrypoint.sh"];
    pub const BRIDGE_ENV: &str = "BRIDGE_IF";
}

/// Nested QEMU defaults
pub mod qemu {
    pub const DISPLAY: &str = "qxl";
    pub const SPICE_ADDR: &str = "127.0.0.1";
    pub const KEYMAP: &str = "en-us";
    pub const CPU_MODEL: &str = "qemu64";
    pub const NIC_MODEL: &str = "virtio-net";
    pub const NETDEV_ID: &str = "net0";
    pub const DRIVE_CACHE: &str = "writeback";
}
