//! Error taxonomy for cycore.
//!
//! Each component owns a narrow error enum; [`CycoreError`] wraps them so the
//! launch pipeline and the binary deal with a single type.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across cycore crates.
pub type CycoreResult<T> = Result<T, CycoreError>;

/// Failure to resolve an instance's launch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid instance id {instance:?}: {reason}")]
    InvalidInstance { instance: String, reason: String },

    #[error("key {key} is not set in the coordination service")]
    MissingKey { key: String },

    #[error("key {key} is set but empty")]
    EmptyValue { key: String },

    #[error("failed to look up key {key}: {message}")]
    Lookup { key: String, message: String },

    #[error("{} configuration errors: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<ConfigError>),
}

impl ConfigError {
    /// Flatten into the individual key-level failures.
    pub fn failures(&self) -> Vec<&ConfigError> {
        match self {
            ConfigError::Multiple(errors) => errors.iter().flat_map(|e| e.failures()).collect(),
            other => vec![other],
        }
    }
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure to turn a registry artifact into a ready root filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaterializeError {
    #[error("failed to pull image {image}: {reason}")]
    PullFailed { image: String, reason: String },

    #[error("failed to create export container from {image}: {reason}")]
    CreateFailed { image: String, reason: String },

    #[error("target {} is not clean: {reason}", .target.display())]
    TargetNotClean { target: PathBuf, reason: String },

    #[error("failed to extract image into {}: {reason}", .target.display())]
    ExtractionFailed { target: PathBuf, reason: String },
}

/// Failure to assemble a launch plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("root filesystem at {} is not ready", .path.display())]
    NotReady { path: PathBuf },

    #[error("invalid {field} value {value:?}: {reason}")]
    InvalidConfig {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Failure to run the sandbox process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    #[error("failed to spawn {program}: {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("failed to wait for {program}: {reason}")]
    WaitFailed { program: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CycoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// Coordination-service transport or protocol failure.
    #[error("coordination service error: {0}")]
    Store(String),

    /// Container engine command failure.
    #[error("container engine error: {0}")]
    Engine(String),

    #[error("invalid options: {0}")]
    Options(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_flattens_nested() {
        let err = ConfigError::Multiple(vec![
            ConfigError::MissingKey {
                key: "/kvm/a/ram".into(),
            },
            ConfigError::Multiple(vec![ConfigError::EmptyValue {
                key: "/kvm/a/mac".into(),
            }]),
        ]);

        let failures = err.failures();
        assert_eq!(failures.len(), 2);
        assert!(matches!(failures[1], ConfigError::EmptyValue { .. }));
    }

    #[test]
    fn test_multiple_display_lists_every_key() {
        let err = ConfigError::Multiple(vec![
            ConfigError::MissingKey {
                key: "/kvm/a/ram".into(),
            },
            ConfigError::MissingKey {
                key: "/kvm/a/rbd".into(),
            },
        ]);

        let msg = err.to_string();
        assert!(msg.starts_with("2 configuration errors"));
        assert!(msg.contains("/kvm/a/ram"));
        assert!(msg.contains("/kvm/a/rbd"));
    }

    #[test]
    fn test_component_errors_convert() {
        let err: CycoreError = PlanError::NotReady {
            path: PathBuf::from("/tmp/x"),
        }
        .into();
        assert!(matches!(err, CycoreError::Plan(PlanError::NotReady { .. })));
        assert_eq!(err.to_string(), "root filesystem at /tmp/x is not ready");
    }
}
