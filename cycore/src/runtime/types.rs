use std::fmt;

use cycore_shared::errors::{ConfigError, CycoreResult};
use serde::{Deserialize, Serialize};

/// Name of a VM instance, used as a coordination-service key segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id must be a single non-empty key path segment.
    pub fn validate(&self) -> CycoreResult<()> {
        match key_segment_problem(&self.0) {
            None => Ok(()),
            Some(reason) => Err(ConfigError::InvalidInstance {
                instance: self.0.clone(),
                reason: format!("instance id {}", reason),
            }
            .into()),
        }
    }
}

/// Why `segment` can't be used verbatim as one etcd key path segment.
///
/// Only `[A-Za-z0-9._-]` is accepted, and `.` / `..` are refused, so the
/// segment never needs escaping and can't be normalized away in a URL.
pub(crate) fn key_segment_problem(segment: &str) -> Option<&'static str> {
    if segment.is_empty() {
        Some("is required")
    } else if segment == "." || segment == ".." {
        Some("must not be a dot segment")
    } else if !segment
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        Some("may only contain ASCII letters, digits, '.', '_' and '-'")
    } else {
        None
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for InstanceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cycore_shared::errors::CycoreError;

    #[test]
    fn test_validate() {
        assert!(InstanceId::from("vm42").validate().is_ok());

        assert!(InstanceId::from("vm-42.prod_a").validate().is_ok());

        for bad in ["", "a/b", "vm 42", ".", "..", "vm?x", "vm#1", "vm%2F", "vm\n"] {
            let err = InstanceId::from(bad).validate().unwrap_err();
            assert!(matches!(
                err,
                CycoreError::Config(ConfigError::InvalidInstance { .. })
            ));
        }
    }
}
