//! Custom error types for cogbench.
//!
//! All errors are explicit enum variants - no `Box<dyn Error>`, no
//! `anyhow::Result`. Failures local to one file or one compression variant
//! never surface here; they are converted to skip decisions or failed
//! `Record` rows by the orchestrator. This module covers the failures that
//! do propagate: configuration problems and filesystem-level faults on the
//! result and scratch directories.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type BenchResult<T> = Result<T, BenchError>;

/// Top-level error type for the benchmark driver.
#[derive(Debug, Error)]
pub enum BenchError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ConfigValidationError),

    // =========================================================================
    // Result Log Errors
    // =========================================================================
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Validation errors cause immediate process termination.
/// Used when the configuration is invalid and the run cannot safely start.
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("Missing required field: {field}")]
    MissingRequiredField { field: &'static str },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Failures reported by the raster engine for a single call.
///
/// Carried inside a failed `Record` rather than propagated: the engine's
/// error text is part of the failure payload, there is no separate
/// last-error side channel.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("engine could not open {path}")]
    OpenFailed { path: PathBuf },

    #[error("translate failed: {message}")]
    TranslateFailed { message: String },

    #[error("translate produced no output at {path}")]
    MissingOutput { path: PathBuf },

    #[error("failed to spawn engine process {program}: {message}")]
    Spawn { program: String, message: String },
}
