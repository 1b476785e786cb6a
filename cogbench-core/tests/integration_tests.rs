// SPDX-License-Identifier: Apache-2.0

//! End-to-end tests for the benchmark orchestrator.
//!
//! These drive the full discover/normalize/benchmark/persist loop against a
//! mock raster engine and verify the resume and recovery behavior of the
//! CSV result logs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;

use cogbench_core::config::Config;
use cogbench_core::engine::{RasterDataType, RasterEngine, RasterInfo, TranslateOption};
use cogbench_core::error::EngineError;
use cogbench_core::orchestrator::BenchmarkOrchestrator;
use cogbench_core::records::{Record, Scene};
use cogbench_core::store::ResultStore;
use cogbench_core::types::RunId;

/// Mock engine recognizing `.tif` files, with per-(scene, method) failure
/// injection and a translate call counter.
#[derive(Default)]
struct MockEngine {
    translate_calls: AtomicUsize,
    /// Fail translates whose source name contains this fragment...
    fail_scene: Option<&'static str>,
    /// ...when combined with this COMPRESS method.
    fail_method: Option<&'static str>,
}

impl MockEngine {
    fn translate_count(&self) -> usize {
        self.translate_calls.load(Ordering::SeqCst)
    }

    fn should_fail(&self, src: &Path, options: &[TranslateOption]) -> bool {
        let scene_matches = self.fail_scene.is_some_and(|fragment| {
            src.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.contains(fragment))
        });
        let method_matches = self.fail_method.is_some_and(|method| {
            options.iter().any(|option| {
                matches!(
                    option,
                    TranslateOption::CreationOption(key, value)
                        if key == "COMPRESS" && value == method
                )
            })
        });
        scene_matches && method_matches
    }
}

impl RasterEngine for MockEngine {
    fn open(&self, path: &Path) -> Option<RasterInfo> {
        if path.extension()?.to_str()? != "tif" {
            return None;
        }
        Some(RasterInfo {
            width: 64,
            height: 32,
            band_count: 3,
            data_type: RasterDataType::Byte,
            bits_per_sample: None,
            driver: "GTiff".to_string(),
            // Already canonical: normalization reuses the source directly.
            compression: Some("NONE".to_string()),
        })
    }

    fn translate(
        &self,
        src: &Path,
        dest: &Path,
        options: &[TranslateOption],
    ) -> Result<(), EngineError> {
        self.translate_calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail(src, options) {
            return Err(EngineError::TranslateFailed {
                message: "JXL driver unavailable".to_string(),
            });
        }
        fs::write(dest, vec![0u8; 128]).unwrap();
        Ok(())
    }

    fn version(&self) -> String {
        "mock-1.0".to_string()
    }
}

struct Fixture {
    _dir: TempDir,
    input: PathBuf,
    results: PathBuf,
    tmp: PathBuf,
}

impl Fixture {
    fn new(file_names: &[&str]) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let input = dir.path().join("input");
        fs::create_dir_all(&input).unwrap();
        for name in file_names {
            fs::write(input.join(name), b"raster bytes").unwrap();
        }
        Self {
            input,
            results: dir.path().join("results"),
            tmp: dir.path().join("tmp"),
            _dir: dir,
        }
    }

    fn config(&self, compressions: &[&str], run_id: &str) -> Config {
        Config {
            files: vec![self.input.clone()],
            extensions: Vec::new(),
            compressions: compressions.iter().map(|s| s.to_string()).collect(),
            result_path: self.results.clone(),
            tmp_file_path: self.tmp.clone(),
            run_id: Some(RunId::new(run_id).unwrap()),
        }
    }

    fn result_dir(&self, run_id: &str) -> PathBuf {
        self.results.join(run_id)
    }

    fn read_records(&self, run_id: &str) -> Vec<Record> {
        let store: ResultStore<Record> =
            ResultStore::new(self.result_dir(run_id).join("records.csv"), "records");
        store.initialize().unwrap()
    }

    fn read_scenes(&self, run_id: &str) -> Vec<Scene> {
        let store: ResultStore<Scene> =
            ResultStore::new(self.result_dir(run_id).join("scenes.csv"), "scenes");
        store.initialize().unwrap()
    }
}

#[test]
fn test_end_to_end_with_one_synthetic_failure() {
    let fixture = Fixture::new(&["a.tif", "b.tif", "c.tif", "ignored.txt"]);
    let engine = MockEngine {
        fail_scene: Some("b"),
        fail_method: Some("JXL"),
        ..MockEngine::default()
    };

    let orchestrator =
        BenchmarkOrchestrator::new(fixture.config(&["LZW", "JXL"], "e2e"), &engine).unwrap();
    orchestrator.run().unwrap();

    let records = fixture.read_records("e2e");
    assert_eq!(records.len(), 6);

    let failed: Vec<&Record> = records.iter().filter(|r| r.failed).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].scene_name, "b");
    assert_eq!(failed[0].compression_method, "JXL");
    assert_eq!(failed[0].fail_message.as_deref(), Some("translate failed: JXL driver unavailable"));

    let scenes = fixture.read_scenes("e2e");
    assert_eq!(scenes.len(), 3);
    let names: Vec<&str> = scenes.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(scenes[0].width_pixels, 64);
    assert_eq!(scenes[0].data_type, "Byte");
}

#[test]
fn test_every_record_satisfies_the_field_invariant() {
    let fixture = Fixture::new(&["a.tif", "b.tif"]);
    let engine = MockEngine {
        fail_scene: Some("a"),
        fail_method: Some("ZSTD"),
        ..MockEngine::default()
    };

    BenchmarkOrchestrator::new(fixture.config(&["ZSTD-L19", "LZW"], "invariant"), &engine)
        .unwrap()
        .run()
        .unwrap();

    for record in fixture.read_records("invariant") {
        let success_group = record.compressed_file_size.is_some()
            && record.decoding_time_ms.is_some()
            && record.encoding_time_ms.is_some();
        let failure_group = record.fail_message.is_some();
        assert!(
            success_group != failure_group,
            "record {} violates the invariant: {record:?}",
            record.id
        );
        assert_eq!(record.failed, failure_group);
    }
}

#[test]
fn test_second_run_is_idempotent() {
    let fixture = Fixture::new(&["a.tif", "b.tif"]);
    let engine = MockEngine::default();
    let config = fixture.config(&["LZW", "DEFLATE"], "resume");

    BenchmarkOrchestrator::new(config.clone(), &engine)
        .unwrap()
        .run()
        .unwrap();
    // 2 scenes x 2 variants x (encode + decode)
    assert_eq!(engine.translate_count(), 8);
    assert_eq!(fixture.read_records("resume").len(), 4);

    BenchmarkOrchestrator::new(config, &engine)
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(engine.translate_count(), 8, "no translate calls on resume");
    assert_eq!(fixture.read_records("resume").len(), 4);
    assert_eq!(fixture.read_scenes("resume").len(), 2);
}

#[test]
fn test_interrupted_scene_is_reprocessed_from_scratch() {
    let fixture = Fixture::new(&["a.tif"]);
    let engine = MockEngine::default();
    let config = fixture.config(&["LZW", "DEFLATE"], "crash");

    // Simulate a crash after one of two records was appended but before
    // the scene row: the scene row is the sole completion marker.
    let record_store: ResultStore<Record> =
        ResultStore::new(fixture.result_dir("crash").join("records.csv"), "records");
    record_store.initialize().unwrap();
    record_store
        .append(&Record::failure(
            "a",
            "LZW",
            &RunId::new("crash").unwrap(),
            "interrupted",
        ))
        .unwrap();

    BenchmarkOrchestrator::new(config, &engine)
        .unwrap()
        .run()
        .unwrap();

    // Both variants were re-run; the partial record from the aborted pass
    // is still in the log.
    assert_eq!(engine.translate_count(), 4);
    let records = fixture.read_records("crash");
    assert_eq!(records.len(), 3);
    assert_eq!(fixture.read_scenes("crash").len(), 1);
}

#[test]
fn test_corrupt_record_log_is_recovered() {
    let fixture = Fixture::new(&["a.tif"]);
    let engine = MockEngine::default();
    let config = fixture.config(&["LZW"], "corrupt");

    let records_path = fixture.result_dir("corrupt").join("records.csv");
    fs::create_dir_all(records_path.parent().unwrap()).unwrap();
    fs::write(&records_path, "this is not a csv result log\n").unwrap();

    BenchmarkOrchestrator::new(config, &engine)
        .unwrap()
        .run()
        .unwrap();

    let records = fixture.read_records("corrupt");
    assert_eq!(records.len(), 1);
    assert!(!records[0].failed);
}

#[test]
fn test_corrupt_scene_log_forces_full_reprocess() {
    let fixture = Fixture::new(&["a.tif", "b.tif"]);
    let engine = MockEngine::default();
    let config = fixture.config(&["LZW"], "scene-corrupt");

    BenchmarkOrchestrator::new(config.clone(), &engine)
        .unwrap()
        .run()
        .unwrap();
    let first_pass = engine.translate_count();

    // A corrupt scenes.csv means "no work done": everything is re-run.
    let scenes_path = fixture.result_dir("scene-corrupt").join("scenes.csv");
    fs::write(&scenes_path, "garbage,header\nbroken row\n").unwrap();

    BenchmarkOrchestrator::new(config, &engine)
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(engine.translate_count(), first_pass * 2);
    assert_eq!(fixture.read_scenes("scene-corrupt").len(), 2);
}

#[test]
fn test_system_snapshot_written_once() {
    let fixture = Fixture::new(&["a.tif"]);
    let engine = MockEngine::default();
    let config = fixture.config(&["LZW"], "sys");

    BenchmarkOrchestrator::new(config.clone(), &engine)
        .unwrap()
        .run()
        .unwrap();

    let system_path = fixture.result_dir("sys").join("system.csv");
    let first = fs::read_to_string(&system_path).unwrap();
    assert_eq!(first.lines().count(), 2, "header plus exactly one row");
    assert!(first.contains("mock-1.0"));
    assert!(first.contains("sys"));

    // A second run must not rewrite the snapshot.
    BenchmarkOrchestrator::new(config, &engine)
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(fs::read_to_string(&system_path).unwrap(), first);
}

#[test]
fn test_extension_allow_list_filters_discovery() {
    let fixture = Fixture::new(&["a.tif", "b.tif"]);
    let engine = MockEngine::default();
    let mut config = fixture.config(&["LZW"], "ext");
    config.extensions = vec!["jp2".to_string()];

    BenchmarkOrchestrator::new(config, &engine)
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(engine.translate_count(), 0);
    assert!(fixture.read_scenes("ext").is_empty());
}
