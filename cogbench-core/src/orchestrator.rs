// SPDX-License-Identifier: Apache-2.0

//! Top-level benchmark driver.
//!
//! One synchronous orchestration thread walks the configured roots, skips
//! scenes already present in `scenes.csv`, normalizes the rest, and runs
//! every configured compression variant against each scene. Records stream
//! into `records.csv` as they are produced; the scene row is appended only
//! after all of its variants, so an interrupted run can never leave a scene
//! marked done with records missing. The next invocation with the same run
//! id resumes from the logs.
//!
//! The only concurrency is the CPU sampler's background thread, scoped to
//! exactly one measured engine call at a time - parallel benchmarks would
//! corrupt the load attribution.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::compression::parse_spec;
use crate::config::Config;
use crate::engine::{RasterEngine, TranslateOption};
use crate::error::{BenchError, BenchResult, EngineError};
use crate::records::{Record, Scene, SystemSnapshot};
use crate::sampler::{CpuSampler, CpuSummary, ProcStatTicks};
use crate::scene::SceneNormalizer;
use crate::store::ResultStore;
use crate::types::RunId;

/// Deletes the wrapped scratch file when the benchmark step completes,
/// successfully or not.
struct Scratch(PathBuf);

impl Drop for Scratch {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!(path = %self.0.display(), error = %e, "scratch cleanup failed");
            }
        }
    }
}

pub struct BenchmarkOrchestrator<'a> {
    config: Config,
    engine: &'a dyn RasterEngine,
    run_id: RunId,
    /// Scratch directory for this run: `{tmp_file_path}/{run_id}`.
    test_dir: PathBuf,
    /// Durable log directory for this run: `{result_path}/{run_id}`.
    result_dir: PathBuf,
    scene_store: ResultStore<Scene>,
    record_store: ResultStore<Record>,
    system_store: ResultStore<SystemSnapshot>,
    snapshot: SystemSnapshot,
    sampler: CpuSampler,
}

impl<'a> BenchmarkOrchestrator<'a> {
    /// Create the run directories and collect the host snapshot.
    ///
    /// Failure to create the scratch or result directory is the only fatal
    /// startup error; everything later degrades to skips or failed records.
    pub fn new(config: Config, engine: &'a dyn RasterEngine) -> BenchResult<Self> {
        let run_id = config.run_id.clone().unwrap_or_else(RunId::generate);
        let test_dir = config.tmp_file_path.join(run_id.as_str());
        let result_dir = config.result_path.join(run_id.as_str());

        fs::create_dir_all(&test_dir).map_err(|source| BenchError::Io {
            context: "creating scratch directory",
            source,
        })?;
        fs::create_dir_all(&result_dir).map_err(|source| BenchError::Io {
            context: "creating result directory",
            source,
        })?;

        let snapshot = SystemSnapshot::collect(engine.version(), &test_dir);

        Ok(Self {
            engine,
            test_dir,
            scene_store: ResultStore::new(result_dir.join("scenes.csv"), "scenes"),
            record_store: ResultStore::new(result_dir.join("records.csv"), "records"),
            system_store: ResultStore::new(result_dir.join("system.csv"), "system"),
            result_dir,
            snapshot,
            sampler: CpuSampler::new(),
            run_id,
            config,
        })
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn result_dir(&self) -> &Path {
        &self.result_dir
    }

    /// Execute one full benchmark pass, resuming from the result logs.
    pub fn run(&self) -> BenchResult<()> {
        self.write_system_snapshot()?;
        info!("Starting processing (runId: {})", self.run_id);

        let already_saved: HashSet<String> = self
            .scene_store
            .initialize()?
            .into_iter()
            .map(|scene| scene.name)
            .collect();
        info!("Found {} already processed files", already_saved.len());
        self.record_store.initialize()?;
        info!("Initialized record results");

        let files = self.discover()?;
        info!("Found {} files", files.len());

        let pending: Vec<PathBuf> = files
            .into_iter()
            .filter(|path| {
                file_stem(path).is_some_and(|name| !already_saved.contains(&name))
            })
            .collect();

        let normalizer = SceneNormalizer::new(self.engine, &self.test_dir);
        let total = pending.len();
        for (idx, path) in pending.iter().enumerate() {
            let Some(name) = file_stem(path) else {
                continue;
            };
            let Some((scene, canonical)) = normalizer.normalize(&name, path) else {
                info!("Processed {}/{} files (skip)", idx + 1, total);
                continue;
            };

            for (variant_idx, spec) in self.config.compressions.iter().enumerate() {
                let record = self.benchmark(&scene, canonical.path(), spec);
                let state = if record.failed { "fail" } else { "success" };
                // Streaming write: partial progress survives a crash
                // mid-scene.
                self.record_store.append(&record)?;
                info!(
                    "Processed {}/{} benchmarks for {} ({} {})",
                    variant_idx + 1,
                    self.config.compressions.len(),
                    scene.name,
                    state,
                    spec
                );
            }

            // Only now is the scene complete; the row below is the resume
            // marker.
            self.scene_store.append(&scene)?;
            drop(canonical);
            info!("Processed {}/{} files (success)", idx + 1, total);
        }

        info!("Finished processing (runId: {})", self.run_id);
        Ok(())
    }

    /// Benchmark one (scene, compression variant) pair.
    ///
    /// Engine failures at any step become a failed record carrying the
    /// engine's message; this function never propagates an error.
    pub fn benchmark(&self, scene: &Scene, canonical_path: &Path, spec: &str) -> Record {
        info!("start {} {}", scene.name, spec);

        let mut options = vec![
            TranslateOption::OutputFormat("COG".to_string()),
            TranslateOption::creation("BIGTIFF", "YES"),
        ];
        options.extend(parse_spec(spec));

        let stem = canonical_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| scene.name.clone());
        let compress_path = self.test_dir.join(format!("{stem}_{spec}.tiff"));
        let decompress_path = self.test_dir.join(format!("{stem}_{spec}_decompress.tiff"));
        let _compress_scratch = Scratch(compress_path.clone());
        let _decompress_scratch = Scratch(decompress_path.clone());

        let ((encode_status, encoding_time), encode_cpu) =
            self.measure_translate(canonical_path, &compress_path, &options);
        if let Err(e) = encode_status {
            warn!("failed {} {}", scene.name, spec);
            return Record::failure(&scene.name, spec, &self.run_id, e.to_string());
        }

        let compressed_file_size = match fs::metadata(&compress_path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                warn!("failed {} {}", scene.name, spec);
                return Record::failure(
                    &scene.name,
                    spec,
                    &self.run_id,
                    format!("compressed output unreadable: {e}"),
                );
            }
        };

        // Round-trip decode proxy: translate back to an uncompressed
        // scratch file with default options.
        let ((decode_status, decoding_time), decode_cpu) =
            self.measure_translate(&compress_path, &decompress_path, &[TranslateOption::Quiet]);
        if let Err(e) = decode_status {
            warn!("failed {} {}", scene.name, spec);
            return Record::failure(&scene.name, spec, &self.run_id, e.to_string());
        }

        info!("finished {} {}", scene.name, spec);
        Record::success(
            &scene.name,
            spec,
            &self.run_id,
            compressed_file_size,
            encoding_time.as_millis() as u64,
            decoding_time.as_millis() as u64,
            encode_cpu,
            decode_cpu,
        )
    }

    fn measure_translate(
        &self,
        src: &Path,
        dest: &Path,
        options: &[TranslateOption],
    ) -> ((Result<(), EngineError>, Duration), Option<CpuSummary>) {
        self.sampler.measure(ProcStatTicks, || {
            let start = Instant::now();
            let status = self.engine.translate(src, dest, options);
            (status, start.elapsed())
        })
    }

    /// Enumerate input files: recursive walk of the configured roots,
    /// optional extension filter, then an engine-open probe. Files the
    /// engine cannot open are excluded silently. The result is sorted for
    /// a deterministic processing order.
    fn discover(&self) -> BenchResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for root in &self.config.files {
            if !root.exists() {
                warn!(root = %root.display(), "input root does not exist, skipping");
                continue;
            }
            collect_files(root, &mut files);
        }
        files.sort();
        files.retain(|path| self.config.extension_allowed(path));
        files.retain(|path| self.engine.open(path).is_some());
        Ok(files)
    }

    /// Write `system.csv` once per result directory. An existing file is
    /// never overwritten, whatever its content.
    fn write_system_snapshot(&self) -> BenchResult<()> {
        if self.system_store.exists() {
            return Ok(());
        }
        self.system_store.initialize()?;
        self.system_store
            .append(&self.snapshot.with_run_id(&self.run_id))
    }
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot read directory, skipping");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out);
        } else if path.is_file() {
            out.push(path);
        }
    }
}
