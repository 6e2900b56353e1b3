//! Resolve an instance's launch configuration from the coordination service.

use std::sync::Arc;

use cycore_shared::errors::{ConfigError, CycoreError, CycoreResult};
use futures::future::join_all;

use super::LaunchConfig;
use crate::coordination::KeyValueStore;
use crate::runtime::constants::keys;
use crate::runtime::types::InstanceId;

const REQUIRED_FIELDS: [&str; 4] = [keys::RAM, keys::MAC, keys::BLOCK_DEVICE, keys::SPICE_PORT];

/// Build `/<domain>/<instance>/<field>`.
pub fn instance_key(domain: &str, instance: &InstanceId, field: &str) -> String {
    format!("/{}/{}/{}", domain, instance, field)
}

/// Reads the four required launch keys for an instance.
pub struct ConfigResolver {
    store: Arc<dyn KeyValueStore>,
    domain: String,
}

impl ConfigResolver {
    pub fn new(store: Arc<dyn KeyValueStore>, domain: impl Into<String>) -> Self {
        Self {
            store,
            domain: domain.into(),
        }
    }

    /// Look up every required key and build a `LaunchConfig`.
    ///
    /// All lookups run concurrently and every failure is collected, so an
    /// operator sees all unset keys at once. A single failure is returned
    /// as-is; several come back as `ConfigError::Multiple` in field order.
    /// Nothing is retried.
    pub async fn resolve(&self, instance: &InstanceId) -> CycoreResult<LaunchConfig> {
        instance.validate()?;

        let lookups = REQUIRED_FIELDS.iter().map(|field| {
            let key = instance_key(&self.domain, instance, field);
            async move {
                let result = self.lookup(&key).await;
                (key, result)
            }
        });
        let results = join_all(lookups).await;

        let mut values = Vec::with_capacity(REQUIRED_FIELDS.len());
        let mut errors = Vec::new();
        for (key, result) in results {
            match result {
                Ok(value) => values.push(value),
                Err(e) => {
                    tracing::error!(instance = %instance, key = %key, error = %e, "Config lookup failed");
                    errors.push(e);
                }
            }
        }

        if !errors.is_empty() {
            let err = if errors.len() == 1 {
                errors.remove(0)
            } else {
                ConfigError::Multiple(errors)
            };
            return Err(err.into());
        }

        let [ram, mac, block_device, spice_port]: [String; 4] = values
            .try_into()
            .map_err(|_| CycoreError::Internal("config lookup count mismatch".into()))?;

        tracing::info!(
            instance = %instance,
            ram = %ram,
            mac = %mac,
            block_device = %block_device,
            spice_port = %spice_port,
            "Resolved launch config"
        );

        Ok(LaunchConfig {
            ram,
            mac,
            block_device,
            spice_port,
        })
    }

    async fn lookup(&self, key: &str) -> Result<String, ConfigError> {
        match self.store.get(key).await {
            Ok(Some(value)) if value.is_empty() => Err(ConfigError::EmptyValue {
                key: key.to_string(),
            }),
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(ConfigError::MissingKey {
                key: key.to_string(),
            }),
            Err(e) => Err(ConfigError::Lookup {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }
}
