// SPDX-License-Identifier: Apache-2.0

//! Append-only CSV result stores.
//!
//! A [`ResultStore`] owns one backing CSV file whose first line is always a
//! valid header for the row type. `initialize` reads and validates the file;
//! anything unreadable or malformed is discarded and recreated header-only -
//! the result file is the single source of truth for "work done", so a
//! corrupt file means "no work done". `append` writes exactly one row with
//! no header in a single write call, which keeps partially-written runs
//! parseable up to the last complete line.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{BenchError, BenchResult};

pub struct ResultStore<R> {
    path: PathBuf,
    /// Short name used in log lines, e.g. `scenes`.
    label: &'static str,
    _row: PhantomData<R>,
}

impl<R> ResultStore<R>
where
    R: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: PathBuf, label: &'static str) -> Self {
        Self {
            path,
            label,
            _row: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read and validate the backing file, returning all previously
    /// recorded rows.
    ///
    /// Missing file: created with a header only. Unreadable or malformed
    /// file: discarded and recreated, returning no rows.
    pub fn initialize(&self) -> BenchResult<Vec<R>> {
        if !self.path.exists() {
            self.create_empty()?;
            return Ok(Vec::new());
        }

        match self.read_all() {
            Ok(rows) => Ok(rows),
            Err(reason) => {
                warn!(
                    store = self.label,
                    path = %self.path.display(),
                    %reason,
                    "result file is corrupt, discarding and recreating"
                );
                fs::remove_file(&self.path).map_err(|source| BenchError::Io {
                    context: "removing corrupt result file",
                    source,
                })?;
                self.create_empty()?;
                Ok(Vec::new())
            }
        }
    }

    /// Serialize one row without a header and append it atomically.
    pub fn append(&self, row: &R) -> BenchResult<()> {
        let mut line = Vec::new();
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut line);
            writer.serialize(row).map_err(|source| BenchError::Csv {
                path: self.path.clone(),
                source,
            })?;
            writer.flush().map_err(|source| BenchError::Io {
                context: "flushing csv row",
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|source| BenchError::Io {
                context: "opening result file for append",
                source,
            })?;
        file.write_all(&line).map_err(|source| BenchError::Io {
            context: "appending result row",
            source,
        })
    }

    fn read_all(&self) -> Result<Vec<R>, String> {
        let text = fs::read_to_string(&self.path).map_err(|e| e.to_string())?;

        let expected = self.header_line().map_err(|e| e.to_string())?;
        if text.lines().next() != Some(expected.as_str()) {
            return Err(format!("header does not match the {} schema", self.label));
        }

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        reader
            .deserialize()
            .collect::<Result<Vec<R>, csv::Error>>()
            .map_err(|e| e.to_string())
    }

    fn create_empty(&self) -> BenchResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| BenchError::Io {
                context: "creating result directory",
                source,
            })?;
        }
        let header = self.header_line()?;
        fs::write(&self.path, format!("{header}\n")).map_err(|source| BenchError::Io {
            context: "writing result file header",
            source,
        })
    }

    // The csv writer only emits a header alongside a row, so serialize a
    // placeholder row in memory and keep the first line.
    fn header_line(&self) -> BenchResult<String> {
        let mut bytes = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut bytes);
            writer
                .serialize(R::default())
                .map_err(|source| BenchError::Csv {
                    path: self.path.clone(),
                    source,
                })?;
            writer.flush().map_err(|source| BenchError::Io {
                context: "flushing csv header",
                source,
            })?;
        }
        let text = String::from_utf8_lossy(&bytes);
        Ok(text.lines().next().unwrap_or_default().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Scene;
    use tempfile::TempDir;

    fn scene(name: &str) -> Scene {
        Scene {
            name: name.to_string(),
            width_pixels: 64,
            height_pixels: 32,
            file_size: 4096,
            data_type: "Byte".to_string(),
            band_count: 3,
        }
    }

    fn store_in(dir: &TempDir) -> ResultStore<Scene> {
        ResultStore::new(dir.path().join("scenes.csv"), "scenes")
    }

    #[test]
    fn test_initialize_creates_header_only_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let rows = store.initialize().unwrap();
        assert!(rows.is_empty());

        let text = fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            text,
            "Name,width (pixels),height (pixels),GTIFF file size (bytes),dataType,bandCount\n"
        );
    }

    #[test]
    fn test_append_then_initialize_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.initialize().unwrap();
        store.append(&scene("alpha")).unwrap();
        store.append(&scene("beta")).unwrap();

        let rows = store.initialize().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "alpha");
        assert_eq!(rows[1].name, "beta");
    }

    #[test]
    fn test_malformed_file_is_discarded() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.initialize().unwrap();
        store.append(&scene("alpha")).unwrap();
        // Clobber a row with a line that cannot deserialize.
        let mut text = fs::read_to_string(store.path()).unwrap();
        text.push_str("not,a,valid,row\n");
        fs::write(store.path(), text).unwrap();

        let rows = store.initialize().unwrap();
        assert!(rows.is_empty());

        // The recreated file is header-only and writable again.
        store.append(&scene("gamma")).unwrap();
        let rows = store.initialize().unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_wrong_header_is_discarded() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "completely,different,header\n").unwrap();

        let rows = store.initialize().unwrap();
        assert!(rows.is_empty());
        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("Name,"));
    }

    #[test]
    fn test_empty_file_is_discarded() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "").unwrap();

        assert!(store.initialize().unwrap().is_empty());
        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("Name,"));
    }

    #[test]
    fn test_append_preserves_single_header() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.initialize().unwrap();
        store.append(&scene("alpha")).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        let headers = text.lines().filter(|line| line.starts_with("Name,")).count();
        assert_eq!(headers, 1);
        assert_eq!(text.lines().count(), 2);
    }
}
