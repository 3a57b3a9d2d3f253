use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error as ThisError;

///
/// RegistryConfig
///
/// Tuning knobs of a [`CodecRegistry`](crate::registry::CodecRegistry).
/// Every field has a default, so an empty document is a valid config.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Upper bound on waits for schema metadata. `None` blocks for as long
    /// as a generation is in progress.
    pub schema_wait_timeout_ms: Option<u64>,

    /// Activate case codecs as soon as their choice is materialized.
    pub eager_case_activation: bool,

    /// Walk declared augmentations when an augmentable codec is created.
    pub preload_augmentations: bool,

    /// Cache insertions between automatic reclaim sweeps; 0 disables.
    pub reclaim_interval: u32,
}

impl RegistryConfig {
    pub const DEFAULT_RECLAIM_INTERVAL: u32 = 256;

    /// Parse a TOML document. Settings may sit at the top level or inside
    /// a `[registry]` table.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Wrapped {
            registry: RegistryConfig,
        }

        let value: toml::Table = toml::from_str(input)?;
        if value.contains_key("registry") {
            let wrapped: Wrapped = toml::from_str(input)?;
            return Ok(wrapped.registry);
        }

        Ok(toml::from_str(input)?)
    }

    #[must_use]
    pub fn schema_wait_timeout(&self) -> Option<Duration> {
        self.schema_wait_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            schema_wait_timeout_ms: None,
            eager_case_activation: false,
            preload_augmentations: true,
            reclaim_interval: Self::DEFAULT_RECLAIM_INTERVAL,
        }
    }
}

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid registry config: {0}")]
    Parse(#[from] toml::de::Error),
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = RegistryConfig::from_toml_str("").expect("empty config should parse");

        assert_eq!(config, RegistryConfig::default());
        assert!(config.preload_augmentations);
        assert_eq!(config.schema_wait_timeout(), None);
    }

    #[test]
    fn top_level_and_table_forms_agree() {
        let flat =
            RegistryConfig::from_toml_str("eager_case_activation = true\nreclaim_interval = 8\n")
                .expect("flat config should parse");
        let table = RegistryConfig::from_toml_str(
            "[registry]\neager_case_activation = true\nreclaim_interval = 8\n",
        )
        .expect("table config should parse");

        assert_eq!(flat, table);
        assert!(flat.eager_case_activation);
        assert_eq!(flat.reclaim_interval, 8);
    }

    #[test]
    fn timeout_converts_to_duration() {
        let config = RegistryConfig::from_toml_str("schema_wait_timeout_ms = 250")
            .expect("config should parse");

        assert_eq!(config.schema_wait_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = RegistryConfig::from_toml_str("reclaim_every = 3").expect_err("key is unknown");

        assert!(err.to_string().starts_with("invalid registry config"));
    }
}
