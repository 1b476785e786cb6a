// SPDX-License-Identifier: Apache-2.0

//! Scene normalization.
//!
//! Every input raster is benchmarked from a canonical uncompressed GTiff.
//! A raster already in that form is used in place; anything else is
//! translated once into a scratch file under the run's tmp directory. The
//! scratch file lives inside a [`CanonicalScene`] guard and is removed when
//! the guard is dropped at the end of the scene's processing scope.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::engine::{RasterEngine, RasterInfo, TranslateOption};
use crate::records::Scene;

/// Canonical uncompressed form of one scene.
///
/// Dropping the guard deletes the backing file when it is a scratch
/// translation; a reused source file is left untouched.
pub struct CanonicalScene {
    path: PathBuf,
    scratch: bool,
}

impl CanonicalScene {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CanonicalScene {
    fn drop(&mut self) {
        if !self.scratch {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %e, "scratch cleanup failed");
        }
    }
}

/// True when the raster can be benchmarked as-is: a GTiff whose
/// compression metadata is explicitly `none`. Absent compression metadata
/// counts as compressed and forces a translation.
fn is_canonical(info: &RasterInfo) -> bool {
    info.driver == "GTiff"
        && info
            .compression
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case("none"))
}

pub struct SceneNormalizer<'a> {
    engine: &'a dyn RasterEngine,
    tmp_dir: PathBuf,
}

impl<'a> SceneNormalizer<'a> {
    pub fn new(engine: &'a dyn RasterEngine, tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            tmp_dir: tmp_dir.into(),
        }
    }

    /// Canonicalize one raster and read its metadata.
    ///
    /// `None` means the scene is skipped: the engine could not open the
    /// file, or the canonicalizing translate failed. Neither is fatal to
    /// the run.
    pub fn normalize(&self, name: &str, path: &Path) -> Option<(Scene, CanonicalScene)> {
        let info = self.engine.open(path)?;

        let canonical = if is_canonical(&info) {
            CanonicalScene {
                path: path.to_path_buf(),
                scratch: false,
            }
        } else {
            let scratch_path = self.tmp_dir.join(format!("{name}_none.tiff"));
            let options = [
                TranslateOption::creation("COMPRESS", "NONE"),
                TranslateOption::OutputFormat("GTiff".to_string()),
                TranslateOption::creation("BIGTIFF", "YES"),
            ];
            if let Err(e) = self.engine.translate(path, &scratch_path, &options) {
                warn!(scene = name, error = %e, "failed to create canonical GTiff");
                return None;
            }
            CanonicalScene {
                path: scratch_path,
                scratch: true,
            }
        };

        let file_size = match fs::metadata(canonical.path()) {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!(scene = name, error = %e, "cannot stat canonical file");
                return None;
            }
        };

        let scene = Scene {
            name: name.to_string(),
            width_pixels: info.width,
            height_pixels: info.height,
            file_size,
            data_type: info.data_type_label(),
            band_count: info.band_count,
        };
        Some((scene, canonical))
    }
}
