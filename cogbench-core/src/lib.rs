// SPDX-License-Identifier: Apache-2.0

//! cogbench core library.
//!
//! Resumable benchmark driver for raster compression methods: discovers
//! input rasters, canonicalizes each one through an external raster engine,
//! times compress/decompress translate calls per compression variant while
//! sampling CPU load, and appends results to crash-resilient CSV logs that
//! double as resume checkpoints.
//!
//! # Components
//!
//! - [`compression`] - compact variant-spec parsing (`ZSTD-P2-L19`)
//! - [`sampler`] - background CPU load sampling around a measured call
//! - [`scene`] - canonical uncompressed form of each input raster
//! - [`store`] - append-only, header-validated CSV persistence
//! - [`orchestrator`] - discovery, resume, and the per-variant loop
//! - [`engine`] - the external raster engine boundary (GDAL CLI in
//!   production)

pub mod compression;
pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod records;
pub mod sampler;
pub mod scene;
pub mod store;
pub mod system;
pub mod types;

pub use config::{Config, ConfigLoader};
pub use engine::{GdalCliEngine, RasterEngine};
pub use error::{BenchError, BenchResult};
pub use orchestrator::BenchmarkOrchestrator;
pub use types::RunId;
