//! Sandbox process execution.

use std::process::{ExitStatus, Stdio};

use cycore_shared::errors::{CycoreResult, LaunchError};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;

use super::plan::LaunchPlan;

/// What the sandbox process does with its standard streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdioMode {
    /// Share the launcher's stdin/stdout/stderr.
    #[default]
    Inherit,
    /// stdin from /dev/null, stdout/stderr forwarded line by line to tracing.
    Log,
}

/// Runs a `LaunchPlan` once and reports how the process ended.
#[derive(Debug, Clone, Default)]
pub struct LaunchExecutor {
    stdio: StdioMode,
}

impl LaunchExecutor {
    pub fn new(stdio: StdioMode) -> Self {
        Self { stdio }
    }

    /// Start the sandbox and wait for it to exit.
    ///
    /// A failed launch is returned, never retried.
    pub async fn execute(&self, plan: LaunchPlan) -> CycoreResult<ExitStatus> {
        let (program, args) = plan.into_parts();

        let mut cmd = Command::new(&program);
        cmd.args(&args);

        match self.stdio {
            StdioMode::Inherit => {
                cmd.stdin(Stdio::inherit());
                cmd.stdout(Stdio::inherit());
                cmd.stderr(Stdio::inherit());
            }
            StdioMode::Log => {
                cmd.stdin(Stdio::null());
                cmd.stdout(Stdio::piped());
                cmd.stderr(Stdio::piped());
            }
        }

        let mut child = cmd.spawn().map_err(|e| {
            tracing::error!(program = %program, "Failed to spawn sandbox: {}", e);
            LaunchError::SpawnFailed {
                program: program.clone(),
                reason: e.to_string(),
            }
        })?;

        tracing::info!(program = %program, pid = ?child.id(), "Sandbox started");

        let forwarders: Vec<JoinHandle<()>> = [
            child.stdout.take().map(|out| forward_lines(out, Stream::Stdout)),
            child.stderr.take().map(|err| forward_lines(err, Stream::Stderr)),
        ]
        .into_iter()
        .flatten()
        .collect();

        let status = child.wait().await.map_err(|e| LaunchError::WaitFailed {
            program: program.clone(),
            reason: e.to_string(),
        })?;

        for handle in forwarders {
            let _ = handle.await;
        }

        if status.success() {
            tracing::info!(program = %program, %status, "Sandbox exited");
        } else {
            tracing::warn!(program = %program, %status, "Sandbox exited with failure");
        }

        Ok(status)
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn forward_lines<R>(reader: R, stream: Stream) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match stream {
                Stream::Stdout => tracing::info!(target: "cycore::vm", "{}", line),
                Stream::Stderr => tracing::warn!(target: "cycore::vm", "{}", line),
            }
        }
    })
}

/// Exit code the launcher should report for `status`.
///
/// Signals map to `128 + signo`, as shells do.
pub fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LaunchConfig;
    use crate::launch::{LaunchPlanner, SandboxPolicy};
    use crate::rootfs::MaterializedImage;
    use cycore_shared::errors::CycoreError;

    fn plan_for(program: &str, entrypoint: &[&str]) -> LaunchPlan {
        let policy = SandboxPolicy {
            program: program.into(),
            entrypoint: entrypoint.iter().map(|s| s.to_string()).collect(),
            ..SandboxPolicy::default()
        };
        let image = MaterializedImage {
            source_path: "/var/lib/cycore/qemu".into(),
            ready: true,
            image: "docker.io/ulexus/qemu:latest".into(),
            cleanup_warning: None,
        };
        let config = LaunchConfig {
            ram: "4096".into(),
            mac: "52:54:00:12:34:56".into(),
            block_device: "pool/vm42".into(),
            spice_port: "5901".into(),
        };
        LaunchPlanner::new(policy, "public")
            .plan(&image, &config)
            .unwrap()
    }

    #[tokio::test]
    async fn test_execute_success() {
        let status = LaunchExecutor::new(StdioMode::Log)
            .execute(plan_for("true", &[]))
            .await
            .unwrap();
        assert!(status.success());
        assert_eq!(exit_code(status), 0);
    }

    #[tokio::test]
    async fn test_execute_reports_failure_status() {
        let status = LaunchExecutor::new(StdioMode::Log)
            .execute(plan_for("false", &[]))
            .await
            .unwrap();
        assert!(!status.success());
        assert_eq!(exit_code(status), 1);
    }

    #[tokio::test]
    async fn test_execute_forwards_output() {
        // `echo` prints the whole argument vector and exits 0.
        let status = LaunchExecutor::new(StdioMode::Log)
            .execute(plan_for("echo", &[]))
            .await
            .unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let err = LaunchExecutor::default()
            .execute(plan_for("/nonexistent/systemd-nspawn", &[]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CycoreError::Launch(LaunchError::SpawnFailed { ref program, .. }) if program == "/nonexistent/systemd-nspawn"
        ));
    }

    #[tokio::test]
    async fn test_signal_exit_code() {
        let status = tokio::process::Command::new("sh")
            .args(["-c", "kill -9 $$"])
            .status()
            .await
            .unwrap();
        assert_eq!(exit_code(status), 137);
    }
}
