// SPDX-License-Identifier: Apache-2.0

//! Value records persisted to the result logs.
//!
//! The serde rename attributes fix the CSV header labels; downstream
//! analysis tooling keys on these exact strings, so they must not change
//! even where they disagree with the field names.

use serde::{Deserialize, Serialize};

use crate::sampler::CpuSummary;
use crate::types::RunId;

/// One physical input raster in canonical uncompressed form.
///
/// At most one row per name per result directory; a scene row is only
/// appended after every compression variant for it has been recorded, which
/// makes `scenes.csv` the resume checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "width (pixels)")]
    pub width_pixels: u32,
    #[serde(rename = "height (pixels)")]
    pub height_pixels: u32,
    #[serde(rename = "GTIFF file size (bytes)")]
    pub file_size: u64,
    #[serde(rename = "dataType")]
    pub data_type: String,
    #[serde(rename = "bandCount")]
    pub band_count: u32,
}

/// One (scene, compression variant) measurement.
///
/// Exactly one of the success field group (size and timings) or
/// `fail_message` is populated; the constructors are the only way the
/// orchestrator builds these. CPU fields are present only when the sampler
/// collected at least one sample during the respective phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(rename = "Compression Method")]
    pub compression_method: String,
    #[serde(rename = "Scene Name")]
    pub scene_name: String,
    pub failed: bool,
    #[serde(rename = "RunId")]
    pub run_id: String,
    #[serde(rename = "Compressed File Size (bytes)")]
    pub compressed_file_size: Option<u64>,
    #[serde(rename = "Decoding Time (ms)")]
    pub decoding_time_ms: Option<u64>,
    #[serde(rename = "Encoding Time (ms)")]
    pub encoding_time_ms: Option<u64>,
    #[serde(rename = "failMessage")]
    pub fail_message: Option<String>,
    #[serde(rename = "encodeCpuUsage")]
    pub encode_cpu_usage: Option<f64>,
    #[serde(rename = "decodeCpuUsage")]
    pub decode_cpu_usage: Option<f64>,
    #[serde(rename = "encodeCpuFullLoad")]
    pub encode_cpu_full_load: Option<f64>,
    #[serde(rename = "decodeCpuFullLoad")]
    pub decode_cpu_full_load: Option<f64>,
}

impl Record {
    fn id_for(scene_name: &str, compression: &str, run_id: &RunId) -> String {
        format!("{scene_name}-{compression}-{run_id}")
    }

    /// Record for a completed benchmark.
    #[allow(clippy::too_many_arguments)]
    pub fn success(
        scene_name: &str,
        compression: &str,
        run_id: &RunId,
        compressed_file_size: u64,
        encoding_time_ms: u64,
        decoding_time_ms: u64,
        encode_cpu: Option<CpuSummary>,
        decode_cpu: Option<CpuSummary>,
    ) -> Self {
        Self {
            id: Self::id_for(scene_name, compression, run_id),
            compression_method: compression.to_string(),
            scene_name: scene_name.to_string(),
            failed: false,
            run_id: run_id.to_string(),
            compressed_file_size: Some(compressed_file_size),
            decoding_time_ms: Some(decoding_time_ms),
            encoding_time_ms: Some(encoding_time_ms),
            fail_message: None,
            encode_cpu_usage: encode_cpu.map(|cpu| cpu.average_load),
            decode_cpu_usage: decode_cpu.map(|cpu| cpu.average_load),
            encode_cpu_full_load: encode_cpu.map(|cpu| cpu.full_load_fraction),
            decode_cpu_full_load: decode_cpu.map(|cpu| cpu.full_load_fraction),
        }
    }

    /// Record for a benchmark the engine failed, carrying the engine's
    /// error text. No size, timing, or CPU fields.
    pub fn failure(
        scene_name: &str,
        compression: &str,
        run_id: &RunId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Self::id_for(scene_name, compression, run_id),
            compression_method: compression.to_string(),
            scene_name: scene_name.to_string(),
            failed: true,
            run_id: run_id.to_string(),
            fail_message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Host description, one row per result directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    #[serde(rename = "runId")]
    pub run_id: String,
    pub platform: String,
    pub arch: String,
    #[serde(rename = "maxMemory")]
    pub max_memory: u64,
    #[serde(rename = "processorName")]
    pub processor_name: String,
    pub core: u32,
    #[serde(rename = "efficiencyCore")]
    pub efficiency_core: u32,
    #[serde(rename = "diskModel")]
    pub disk_model: String,
    /// Engine release version. The header label predates the engine
    /// abstraction and is kept for downstream compatibility.
    #[serde(rename = "gdalVersion")]
    pub engine_version: String,
}

impl SystemSnapshot {
    /// Same hardware facts stamped with a different run id.
    pub fn with_run_id(&self, run_id: &RunId) -> Self {
        Self {
            run_id: run_id.to_string(),
            ..self.clone()
        }
    }
}
