// src/config.rs

use crate::error::ConfigError;
use crate::fetch::RetryPolicy;
use crate::table::ColumnSpec;
use serde::Deserialize;
use std::{fs, path::Path};
use url::Url;

/// UCI "default of credit card clients" dataset.
pub const DEFAULT_DATASET_URL: &str = "https://archive.ics.uci.edu/ml/machine-learning-databases/00350/default%20of%20credit%20card%20clients.xls";
pub const DEFAULT_FILE_NAME: &str = "taiwan.csv";

/// S3 rejects multipart parts smaller than this (except the last).
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    pub dataset_url: String,
    pub file_name: String,
    pub retry: RetryPolicy,
    pub storage: StorageConfig,
    /// Post-parse rename/remap step; skipped when absent.
    pub schema: Option<Vec<ColumnSpec>>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            dataset_url: DEFAULT_DATASET_URL.to_string(),
            file_name: DEFAULT_FILE_NAME.to_string(),
            retry: RetryPolicy::default(),
            storage: StorageConfig::default(),
            schema: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Region for the primary client; the default chain decides when unset.
    pub region: Option<String>,
    /// Custom endpoint for the primary client (e.g. MinIO).
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    /// Multipart chunk size of the fallback upload.
    pub part_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            region: None,
            endpoint_url: None,
            force_path_style: false,
            part_size: 8 * 1024 * 1024,
        }
    }
}

impl LoaderConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn dataset_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.dataset_url).map_err(|source| ConfigError::Url {
            url: self.dataset_url.clone(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dataset_url()?;
        if self.file_name.is_empty() {
            return Err(ConfigError::Invalid("file_name must not be empty".into()));
        }
        if self.retry.total == 0 {
            return Err(ConfigError::Invalid("retry.total must be at least 1".into()));
        }
        if !self.retry.backoff_factor.is_finite() || self.retry.backoff_factor < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "retry.backoff_factor must be a non-negative number, got {}",
                self.retry.backoff_factor
            )));
        }
        if self.storage.part_size < MIN_PART_SIZE {
            return Err(ConfigError::Invalid(format!(
                "storage.part_size must be at least {} bytes, got {}",
                MIN_PART_SIZE, self.storage.part_size
            )));
        }
        if let Some(schema) = &self.schema {
            if schema.is_empty() {
                return Err(ConfigError::Invalid(
                    "schema must list at least one column".into(),
                ));
            }
        }
        Ok(())
    }
}
