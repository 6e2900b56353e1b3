//! cycore-qemu - materialize the QEMU image and launch one VM instance.
//!
//! The process exits with the VM's own exit code, `128 + signal` when the VM
//! was killed, and 1 when anything before or during launch failed.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use cycore::launch::exit_code;
use cycore::runtime::constants;
use cycore::{CycoreOptions, InstanceLauncher, StdioMode, init_logging};

/// Run a QEMU VM inside a systemd-nspawn sandbox.
///
/// Per-instance settings (ram, mac, rbd, spice_port) are read from etcd under
/// `/<key-domain>/<instance>/`. The root filesystem is exported from the
/// container image into the target directory, which must be absent or empty.
#[derive(Parser, Debug)]
#[command(name = "cycore-qemu")]
#[command(version)]
struct Cli {
    /// Instance ID whose configuration is looked up in etcd
    #[arg(short = 'i', long)]
    instance: String,

    /// Directory the image root filesystem is extracted into
    #[arg(short = 't', long, default_value = constants::DEFAULT_TARGET_PATH)]
    target: PathBuf,

    /// Comma-separated list of etcd endpoints
    #[arg(long = "etcd-server", default_value = constants::DEFAULT_ETCD_ENDPOINT)]
    etcd_server: String,

    /// Host bridge the VM NIC is attached to
    #[arg(long, default_value = constants::DEFAULT_BRIDGE_INTERFACE)]
    bridge_interface: String,

    /// Container image providing the sandbox root filesystem
    #[arg(long, default_value = constants::DEFAULT_IMAGE)]
    image: String,

    /// Container engine CLI (docker or podman)
    #[arg(long, default_value = constants::DEFAULT_ENGINE_BINARY)]
    engine: String,

    /// First path segment of the instance keys
    #[arg(long, default_value = constants::DEFAULT_KEY_DOMAIN)]
    key_domain: String,

    /// Forward sandbox stdout/stderr to the log instead of the terminal
    #[arg(long)]
    capture_output: bool,

    /// Materialize and print the launch command without running it
    #[arg(long)]
    dry_run: bool,

    /// Also write logs to a daily-rolling file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Cli {
    fn into_options(self) -> CycoreOptions {
        let mut options = CycoreOptions::new(self.instance);
        options.target_path = self.target;
        options.etcd_endpoints = CycoreOptions::parse_endpoints(&self.etcd_server);
        options.bridge_interface = self.bridge_interface;
        options.image = self.image;
        options.engine_binary = self.engine;
        options.key_domain = self.key_domain;
        options.dry_run = self.dry_run;
        if self.capture_output {
            options.stdio = StdioMode::Log;
        }
        options
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_guard = match init_logging("info", cli.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("cycore-qemu: {}", e);
            std::process::exit(1);
        }
    };

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("cycore-qemu: {:#}", e);
            1
        }
    };

    // Flush the file appender before exiting.
    drop(log_guard);
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let options = cli.into_options();
    let instance = options.instance.clone();

    let outcome = InstanceLauncher::from_options(options)
        .context("invalid launcher options")?
        .launch()
        .await
        .with_context(|| format!("failed to launch instance {}", instance))?;

    if let Some(warning) = &outcome.rootfs.cleanup_warning {
        tracing::warn!(instance = %instance, "{}", warning);
    }

    match outcome.exit_status {
        Some(status) => Ok(exit_code(status)),
        None => {
            println!("{}", outcome.plan);
            Ok(0)
        }
    }
}
