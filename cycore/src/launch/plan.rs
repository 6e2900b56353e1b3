//! Launch plan assembly.

use std::fmt;

use cycore_shared::errors::{CycoreResult, PlanError};

use super::policy::SandboxPolicy;
use super::validate;
use crate::config::LaunchConfig;
use crate::rootfs::MaterializedImage;
use crate::runtime::constants::{qemu, sandbox};

/// Fully validated sandbox invocation. Pure data; see `LaunchExecutor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    program: String,
    args: Vec<String>,
}

impl LaunchPlan {
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn into_parts(self) -> (String, Vec<String>) {
        (self.program, self.args)
    }

    /// Value following the first occurrence of `flag`.
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for LaunchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg.replace('\'', r"'\''"))?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Combines a ready root filesystem, instance config and host policy.
#[derive(Debug, Clone)]
pub struct LaunchPlanner {
    policy: SandboxPolicy,
    bridge: String,
}

impl LaunchPlanner {
    pub fn new(policy: SandboxPolicy, bridge: impl Into<String>) -> Self {
        Self {
            policy,
            bridge: bridge.into(),
        }
    }

    /// Build the nspawn command line.
    ///
    /// Fails with `NotReady` unless `image.ready`, and with `InvalidConfig`
    /// when any instance value, the bridge, or the policy is malformed.
    /// Argument order is fixed: sandbox options, entrypoint, then QEMU options.
    pub fn plan(&self, image: &MaterializedImage, config: &LaunchConfig) -> CycoreResult<LaunchPlan> {
        if !image.ready {
            return Err(PlanError::NotReady {
                path: image.source_path.clone(),
            }
            .into());
        }

        let spice_port = validate::spice_port(&config.spice_port)?;
        validate::mac_address(&config.mac)?;
        validate::ram_size(&config.ram)?;
        validate::block_device(&config.block_device)?;
        validate::bridge_name(&self.bridge)?;
        validate::policy(&self.policy)?;

        let policy = &self.policy;
        let mut args: Vec<String> = Vec::new();

        // Sandbox
        args.push("-D".into());
        args.push(image.source_path.display().to_string());
        if policy.share_system {
            args.push("--share-system".into());
        }
        if !policy.capabilities.is_empty() {
            args.push(format!("--capability={}", policy.capabilities.join(",")));
        }
        args.extend(policy.bind_mounts.iter().map(|m| m.to_arg()));
        args.push(format!("--setenv={}={}", sandbox::BRIDGE_ENV, self.bridge));
        args.extend(policy.entrypoint.iter().cloned());

        // QEMU
        let mut spice = format!("port={},addr={}", spice_port, policy.spice_addr);
        if !policy.spice_ticketing {
            spice.push_str(",disable-ticketing");
        }
        args.extend([
            "-vga".into(),
            policy.display.clone(),
            "-spice".into(),
            spice,
            "-k".into(),
            policy.keymap.clone(),
            "-m".into(),
            config.ram.clone(),
            "-cpu".into(),
            policy.cpu_model.clone(),
            "-netdev".into(),
            format!("bridge,br={},id={}", self.bridge, qemu::NETDEV_ID),
            "-device".into(),
            format!(
                "{},netdev={},mac={}",
                policy.nic_model,
                qemu::NETDEV_ID,
                config.mac
            ),
            "-drive".into(),
            format!(
                "format=rbd,file=rbd:{},cache={},if=virtio",
                config.block_device, policy.drive_cache
            ),
        ]);

        Ok(LaunchPlan {
            program: policy.program.clone(),
            args,
        })
    }
}
