// SPDX-License-Identifier: Apache-2.0

//! YAML configuration with strict validation.
//!
//! The raw file is parsed leniently with serde defaults, then validated
//! into strong types before a run can start. Any invalid field is a
//! [`ConfigValidationError`] that prevents startup.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{BenchError, BenchResult, ConfigValidationError};
use crate::types::RunId;

/// Raw configuration as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
struct RawConfig {
    files: Vec<String>,
    #[serde(default)]
    extensions: Vec<String>,
    #[serde(default = "default_compressions")]
    compressions: Vec<String>,
    #[serde(default = "default_result_path")]
    result_path: String,
    #[serde(default = "default_tmp_file_path")]
    tmp_file_path: String,
    #[serde(default)]
    run_id: Option<String>,
}

fn default_compressions() -> Vec<String> {
    vec![
        "lzw".to_string(),
        "deflate".to_string(),
        "zstd".to_string(),
        "jxl".to_string(),
    ]
}

fn default_result_path() -> String {
    "results".to_string()
}

fn default_tmp_file_path() -> String {
    "tmp".to_string()
}

/// Validated benchmark configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root paths scanned recursively for input rasters.
    pub files: Vec<PathBuf>,
    /// Extension allow-list, lowercased. Empty means no filter.
    pub extensions: Vec<String>,
    /// Compression variant specs in benchmark order, uppercased.
    pub compressions: Vec<String>,
    /// Root directory for the durable CSV logs.
    pub result_path: PathBuf,
    /// Root directory for scratch files.
    pub tmp_file_path: PathBuf,
    /// Resume key. `None` starts a fresh run with a generated id.
    pub run_id: Option<RunId>,
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> BenchResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BenchError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let text = std::fs::read_to_string(path).map_err(|source| BenchError::Io {
            context: "reading configuration file",
            source,
        })?;
        Self::load_str(&text)
    }

    /// Load and validate configuration from YAML text.
    pub fn load_str(text: &str) -> BenchResult<Config> {
        let raw: RawConfig =
            serde_yaml::from_str(text).map_err(|e| BenchError::ConfigParse {
                message: e.to_string(),
            })?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> BenchResult<Config> {
        if raw.files.is_empty() {
            return Err(ConfigValidationError::MissingRequiredField { field: "files" }.into());
        }

        if raw.compressions.is_empty() {
            return Err(
                ConfigValidationError::MissingRequiredField { field: "compressions" }.into(),
            );
        }
        for spec in &raw.compressions {
            if spec.trim().is_empty() {
                return Err(ConfigValidationError::InvalidFieldValue {
                    field: "compressions",
                    value: spec.clone(),
                    reason: "compression variant spec cannot be empty".to_string(),
                }
                .into());
            }
        }

        let run_id = raw.run_id.map(RunId::new).transpose()?;

        Ok(Config {
            files: raw.files.into_iter().map(PathBuf::from).collect(),
            extensions: raw
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            compressions: raw
                .compressions
                .iter()
                .map(|spec| spec.to_ascii_uppercase())
                .collect(),
            result_path: PathBuf::from(raw.result_path),
            tmp_file_path: PathBuf::from(raw.tmp_file_path),
            run_id,
        })
    }
}

impl Config {
    /// Extension filter check, case-insensitive. An empty allow-list
    /// accepts everything.
    pub fn extension_allowed(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
            .unwrap_or(false)
    }
}
