//! TOML configuration: where the schema comes from, how submission behaves
//! and the engine policies.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::form::{FormOptions, SimulatedSubmission};

pub const DEFAULT_SCHEMA_URL: &str = "https://sharejson.com/api/v1/uzjxOUc_5VccqT-1XiEYf";
pub const DEFAULT_SCHEMA_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_SUBMIT_DELAY_MS: u64 = 1_500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("schema url must not be empty")]
    EmptySchemaUrl,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalmFormConfig {
    pub schema: SchemaSourceConfig,
    pub submit: SubmitConfig,
    pub form: FormOptions,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSourceConfig {
    pub url: String,
    pub timeout_ms: u64,
}

impl Default for SchemaSourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SCHEMA_URL.to_string(),
            timeout_ms: DEFAULT_SCHEMA_TIMEOUT_MS,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitConfig {
    pub delay_ms: u64,
    /// When set, values are POSTed here instead of the simulated round trip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_SUBMIT_DELAY_MS,
            url: None,
        }
    }
}

impl CalmFormConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: CalmFormConfig = toml::from_str(content)?;
        if config.schema.url.trim().is_empty() {
            return Err(ConfigError::EmptySchemaUrl);
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn schema_timeout(&self) -> Duration {
        Duration::from_millis(self.schema.timeout_ms)
    }

    pub fn submit_delay(&self) -> Duration {
        Duration::from_millis(self.submit.delay_ms)
    }

    pub fn simulated_submission(&self) -> SimulatedSubmission {
        SimulatedSubmission::new(self.submit_delay())
    }

    #[cfg(feature = "http")]
    pub fn schema_loader(&self) -> crate::loader::HttpSchemaLoader {
        crate::loader::HttpSchemaLoader::new(self.schema.url.clone(), self.schema_timeout())
    }

    #[cfg(feature = "http")]
    pub fn http_submission(&self) -> Option<crate::form::HttpSubmission> {
        self.submit
            .url
            .as_ref()
            .map(|url| crate::form::HttpSubmission::new(url.clone()))
    }
}
