// SPDX-License-Identifier: Apache-2.0

//! Raster engine boundary.
//!
//! The benchmark driver never touches pixel data itself; everything goes
//! through the [`RasterEngine`] trait. The production implementation shells
//! out to the GDAL command-line tools (`gdalinfo -json` for metadata,
//! `gdal_translate` for conversions). Every call is explicit about failure:
//! `open` returns `Option`, `translate` returns a `Result` whose error
//! carries the engine's own message - there is no last-error side channel.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use crate::error::EngineError;

/// Pixel data types reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterDataType {
    Byte,
    Int8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
    Unknown,
}

impl RasterDataType {
    /// Map a GDAL band type name to the enum. Unrecognized names collapse
    /// to `Unknown`.
    pub fn from_gdal_name(name: &str) -> Self {
        match name {
            "Byte" => Self::Byte,
            "Int8" => Self::Int8,
            "Int16" => Self::Int16,
            "UInt16" => Self::UInt16,
            "Int32" => Self::Int32,
            "UInt32" => Self::UInt32,
            "Float32" => Self::Float32,
            "Float64" => Self::Float64,
            _ => Self::Unknown,
        }
    }
}

/// Metadata for one opened raster.
///
/// This is a plain value - the subprocess engine holds no live handle, so
/// there is nothing to close.
#[derive(Debug, Clone)]
pub struct RasterInfo {
    pub width: u32,
    pub height: u32,
    pub band_count: u32,
    pub data_type: RasterDataType,
    /// NBITS image-structure tag of the first band, when present.
    pub bits_per_sample: Option<u32>,
    /// Driver short name, e.g. `GTiff`.
    pub driver: String,
    /// COMPRESSION image-structure metadata, when present.
    pub compression: Option<String>,
}

impl RasterInfo {
    /// Human-readable data type label for the scene log.
    ///
    /// Integer types are refined by the bits-per-sample tag when the engine
    /// reports one, so 12-bit data stored in 16-bit samples is labelled
    /// `Int12` rather than the generic `Int16`.
    pub fn data_type_label(&self) -> String {
        let refined = |prefix: &str, width: u32| match self.bits_per_sample {
            Some(bits) => format!("{prefix}{bits}"),
            None => format!("{prefix}{width}"),
        };
        match self.data_type {
            RasterDataType::Byte => "Byte".to_string(),
            RasterDataType::Int8 => "Int8".to_string(),
            RasterDataType::Int16 => refined("Int", 16),
            RasterDataType::UInt16 => refined("UInt", 16),
            RasterDataType::Int32 => refined("Int", 32),
            RasterDataType::UInt32 => refined("UInt", 32),
            RasterDataType::Float32 => "Float32".to_string(),
            RasterDataType::Float64 => "Float64".to_string(),
            RasterDataType::Unknown => "Unknown".to_string(),
        }
    }
}

/// One option passed to a translate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslateOption {
    /// Target driver (`-of <format>`).
    OutputFormat(String),
    /// Driver creation option (`-co KEY=VALUE`).
    CreationOption(String, String),
    /// Suppress progress output (`-q`).
    Quiet,
}

impl TranslateOption {
    /// Named creation option.
    pub fn creation(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::CreationOption(key.into(), value.into())
    }

    /// Render into command-line arguments.
    pub fn push_args(&self, args: &mut Vec<String>) {
        match self {
            Self::OutputFormat(format) => {
                args.push("-of".to_string());
                args.push(format.clone());
            }
            Self::CreationOption(key, value) => {
                args.push("-co".to_string());
                args.push(format!("{key}={value}"));
            }
            Self::Quiet => args.push("-q".to_string()),
        }
    }
}

/// External raster-processing engine.
pub trait RasterEngine: Send + Sync {
    /// Open a raster and read its metadata. `None` means the engine does
    /// not recognize the file; that is an exclusion, not an error.
    fn open(&self, path: &Path) -> Option<RasterInfo>;

    /// Convert `src` into `dest` under the given options. A translate that
    /// reports success but leaves no output file is also a failure.
    fn translate(
        &self,
        src: &Path,
        dest: &Path,
        options: &[TranslateOption],
    ) -> Result<(), EngineError>;

    /// Engine release version, e.g. `3.10.1`.
    fn version(&self) -> String;
}

// --- gdalinfo -json payload ------------------------------------------------

#[derive(Debug, Deserialize)]
struct GdalInfoJson {
    #[serde(rename = "driverShortName")]
    driver_short_name: String,
    size: [u32; 2],
    #[serde(default)]
    bands: Vec<GdalBandJson>,
    #[serde(default)]
    metadata: GdalMetadataJson,
}

#[derive(Debug, Deserialize)]
struct GdalBandJson {
    #[serde(rename = "type")]
    data_type: String,
    #[serde(default)]
    metadata: GdalMetadataJson,
}

#[derive(Debug, Default, Deserialize)]
struct GdalMetadataJson {
    #[serde(rename = "IMAGE_STRUCTURE", default)]
    image_structure: std::collections::HashMap<String, String>,
}

fn parse_gdalinfo(json: &str) -> Option<RasterInfo> {
    let info: GdalInfoJson = serde_json::from_str(json).ok()?;
    let first_band = info.bands.first()?;
    let bits_per_sample = first_band
        .metadata
        .image_structure
        .get("NBITS")
        .and_then(|raw| raw.trim().parse::<u32>().ok());
    Some(RasterInfo {
        width: info.size[0],
        height: info.size[1],
        band_count: info.bands.len() as u32,
        data_type: RasterDataType::from_gdal_name(&first_band.data_type),
        bits_per_sample,
        driver: info.driver_short_name,
        compression: info.metadata.image_structure.get("COMPRESSION").cloned(),
    })
}

/// Engine implementation backed by the GDAL command-line tools.
pub struct GdalCliEngine {
    info_program: String,
    translate_program: String,
}

impl GdalCliEngine {
    pub fn new() -> Self {
        Self {
            info_program: "gdalinfo".to_string(),
            translate_program: "gdal_translate".to_string(),
        }
    }

    /// Override the tool names, e.g. for binaries outside `PATH`.
    pub fn with_programs(info: impl Into<String>, translate: impl Into<String>) -> Self {
        Self {
            info_program: info.into(),
            translate_program: translate.into(),
        }
    }
}

impl Default for GdalCliEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterEngine for GdalCliEngine {
    fn open(&self, path: &Path) -> Option<RasterInfo> {
        let output = Command::new(&self.info_program)
            .arg("-json")
            .arg(path)
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        parse_gdalinfo(&String::from_utf8_lossy(&output.stdout))
    }

    fn translate(
        &self,
        src: &Path,
        dest: &Path,
        options: &[TranslateOption],
    ) -> Result<(), EngineError> {
        let mut args = Vec::new();
        for option in options {
            option.push_args(&mut args);
        }

        let output = Command::new(&self.translate_program)
            .args(&args)
            .arg(src)
            .arg(dest)
            .output()
            .map_err(|e| EngineError::Spawn {
                program: self.translate_program.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(EngineError::TranslateFailed {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !dest.exists() {
            return Err(EngineError::MissingOutput {
                path: dest.to_path_buf(),
            });
        }
        Ok(())
    }

    fn version(&self) -> String {
        let raw = Command::new(&self.info_program)
            .arg("--version")
            .output()
            .ok()
            .filter(|output| output.status.success())
            .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        // "GDAL 3.10.1, released 2024/12/11" -> "3.10.1"
        raw.strip_prefix("GDAL ")
            .and_then(|rest| rest.split(',').next())
            .map(|release| release.trim().to_string())
            .unwrap_or(raw)
    }
}
