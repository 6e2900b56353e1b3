use std::fmt;
use std::str::FromStr;

use cycore_shared::errors::{CycoreResult, MaterializeError};
use oci_client::Reference;

/// Image reference normalized through `oci_client::Reference`.
///
/// `ulexus/qemu` becomes `docker.io/ulexus/qemu:latest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    original: String,
    reference: Reference,
}

impl ImageRef {
    pub fn parse(image: &str) -> CycoreResult<Self> {
        let reference = Reference::from_str(image).map_err(|e| MaterializeError::PullFailed {
            image: image.to_string(),
            reason: format!("invalid image reference: {}", e),
        })?;

        Ok(Self {
            original: image.to_string(),
            reference,
        })
    }

    /// Reference as the user wrote it.
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn repository(&self) -> &str {
        self.reference.repository()
    }

    pub fn tag(&self) -> &str {
        self.reference.tag().unwrap_or("latest")
    }

    /// Fully qualified reference (registry, repository, tag or digest).
    pub fn whole(&self) -> String {
        self.reference.whole()
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.whole())
    }
}
