// SPDX-License-Identifier: Apache-2.0

//! Newtype wrappers for validated inputs.
//!
//! The run identifier doubles as a directory name under both the result and
//! scratch roots, so it is validated to be path-safe at construction time.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigValidationError;

/// Validated run identifier.
/// Must be non-empty, alphanumeric with hyphens/underscores, max 64 chars.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunId(String);

impl RunId {
    /// Create a new RunId with validation.
    pub fn new(id: impl Into<String>) -> Result<Self, ConfigValidationError> {
        let id = id.into();

        if id.is_empty() {
            return Err(ConfigValidationError::InvalidFieldValue {
                field: "run_id",
                value: id,
                reason: "Run ID cannot be empty".to_string(),
            });
        }

        if id.len() > 64 {
            return Err(ConfigValidationError::InvalidFieldValue {
                field: "run_id",
                value: id.clone(),
                reason: format!("Run ID too long: {} chars (max 64)", id.len()),
            });
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigValidationError::InvalidFieldValue {
                field: "run_id",
                value: id,
                reason: "Run ID must contain only alphanumeric characters, hyphens, and underscores"
                    .to_string(),
            });
        }

        Ok(Self(id))
    }

    /// Generate a fresh random run identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RunId {
    type Error = ConfigValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RunId> for String {
    fn from(id: RunId) -> Self {
        id.0
    }
}
