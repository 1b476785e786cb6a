// SPDX-License-Identifier: Apache-2.0

//! Host inventory collection.
//!
//! Hardware facts are process-invariant, so the orchestrator collects one
//! [`SystemSnapshot`] during its Init phase and re-stamps it with the run
//! id; nothing here is cached globally.

use std::path::{Path, PathBuf};

use sysinfo::{Disks, System};

use crate::records::SystemSnapshot;

impl SystemSnapshot {
    /// Collect the host description. `probe_path` decides which disk is
    /// reported: the one whose mount point contains it (longest match),
    /// or `"unknown"` when none does.
    pub fn collect(engine_version: impl Into<String>, probe_path: &Path) -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();

        let processor_name = sys
            .cpus()
            .first()
            .map(|cpu| format!("{} by {}", cpu.brand().trim(), cpu.vendor_id()))
            .unwrap_or_else(|| "unknown".to_string());

        let disks = Disks::new_with_refreshed_list();
        let mounts: Vec<(PathBuf, String)> = disks
            .iter()
            .map(|disk| {
                (
                    disk.mount_point().to_path_buf(),
                    disk.name().to_string_lossy().to_string(),
                )
            })
            .collect();
        let probe = probe_path
            .canonicalize()
            .unwrap_or_else(|_| probe_path.to_path_buf());

        Self {
            run_id: String::new(),
            platform: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            arch: normalize_arch(std::env::consts::ARCH),
            max_memory: sys.total_memory(),
            processor_name,
            core: sys.physical_core_count().unwrap_or_else(|| sys.cpus().len()) as u32,
            // sysinfo does not expose efficiency-core topology.
            efficiency_core: 0,
            disk_model: best_mount_match(&mounts, &probe)
                .unwrap_or_else(|| "unknown".to_string()),
            engine_version: engine_version.into(),
        }
    }
}

/// Normalize architecture names to the amd64/arm64 convention.
fn normalize_arch(arch: &str) -> String {
    match arch {
        "x86_64" => "amd64".to_string(),
        "aarch64" => "arm64".to_string(),
        other => other.to_ascii_lowercase(),
    }
}

/// The disk whose mount point contains `probe`, preferring the most
/// specific (longest) mount point.
fn best_mount_match(mounts: &[(PathBuf, String)], probe: &Path) -> Option<String> {
    mounts
        .iter()
        .filter(|(mount, _)| probe.starts_with(mount))
        .max_by_key(|(mount, _)| mount.as_os_str().len())
        .map(|(_, name)| name.clone())
}
