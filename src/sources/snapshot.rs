use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{JobLensError, Result};
use crate::model::{PlatformWindow, TelemetryRecord};

/// A persisted telemetry fetch, so `analyze` can run offline.
///
/// Snapshots live in the platform cache directory:
/// - Linux: `~/.cache/joblens/telemetry.json`
/// - macOS: `~/Library/Caches/joblens/telemetry.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub fetched_at: DateTime<Utc>,
    pub records_by_release: IndexMap<String, Vec<TelemetryRecord>>,
    /// Per-platform run counters over the whole feed, for the cross-platform
    /// comparison. Absent in snapshots written before the comparison existed.
    #[serde(default)]
    pub platform_totals_by_release: IndexMap<String, IndexMap<String, PlatformWindow>>,
}

impl TelemetrySnapshot {
    pub fn new(
        records_by_release: IndexMap<String, Vec<TelemetryRecord>>,
        platform_totals_by_release: IndexMap<String, IndexMap<String, PlatformWindow>>,
    ) -> Self {
        Self {
            fetched_at: Utc::now(),
            records_by_release,
            platform_totals_by_release,
        }
    }

    /// Flattens the snapshot into one record list, release by release in
    /// stored order.
    pub fn flattened(&self) -> Vec<TelemetryRecord> {
        self.records_by_release
            .values()
            .flat_map(|records| records.iter().cloned())
            .collect()
    }

    /// Default snapshot location in the platform cache directory.
    pub fn default_path() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| JobLensError::Snapshot("No cache directory found".into()))?
            .join("joblens");
        Ok(cache_dir.join("telemetry.json"))
    }

    /// Loads a snapshot from disk.
    ///
    /// A corrupt or unreadable file degrades to an empty snapshot with a
    /// warning; a missing file is an error so callers can tell the two apart.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(JobLensError::Input(format!(
                "telemetry snapshot not found: {}",
                path.display()
            )));
        }

        match fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
        {
            Some(snapshot) => {
                debug!("Loaded telemetry snapshot from {}", path.display());
                Ok(snapshot)
            }
            None => {
                warn!(
                    "Corrupt telemetry snapshot at {}, continuing with empty data",
                    path.display()
                );
                Ok(Self::new(IndexMap::new(), IndexMap::new()))
            }
        }
    }

    /// Persists the snapshot, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;

        info!(
            "Saved telemetry snapshot ({} releases) to {}",
            self.records_by_release.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(name: &str, release: &str) -> TelemetryRecord {
        TelemetryRecord {
            name: name.to_string(),
            brief_name: name.to_string(),
            release: release.to_string(),
            current_runs: 5,
            current_passes: 4,
            previous_runs: 6,
            previous_passes: 5,
            open_bug_count: 0,
            last_pass_timestamp: None,
        }
    }

    #[test]
    fn save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("telemetry.json");

        let mut by_release = IndexMap::new();
        by_release.insert("4.21".to_string(), vec![record("e2e-openstack", "4.21")]);
        by_release.insert("4.20".to_string(), Vec::new());

        let mut platform_totals = IndexMap::new();
        let mut per_platform = IndexMap::new();
        per_platform.insert(
            "OpenStack".to_string(),
            PlatformWindow {
                job_count: 1,
                total_runs: 11,
                total_passes: 9,
            },
        );
        platform_totals.insert("4.21".to_string(), per_platform);

        let snapshot = TelemetrySnapshot::new(by_release, platform_totals);
        snapshot.save(&path).unwrap();

        let reloaded = TelemetrySnapshot::load(&path).unwrap();
        assert_eq!(reloaded.records_by_release.len(), 2);
        assert_eq!(reloaded.records_by_release["4.21"].len(), 1);
        assert_eq!(
            reloaded.platform_totals_by_release["4.21"]["OpenStack"].total_runs,
            11
        );
        assert_eq!(reloaded.fetched_at, snapshot.fetched_at);
    }

    #[test]
    fn snapshot_without_platform_totals_still_loads() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("telemetry.json");
        fs::write(
            &path,
            r#"{"fetched_at": "2026-08-01T00:00:00Z", "records_by_release": {"4.21": []}}"#,
        )
        .unwrap();

        let snapshot = TelemetrySnapshot::load(&path).unwrap();
        assert_eq!(snapshot.records_by_release.len(), 1);
        assert!(snapshot.platform_totals_by_release.is_empty());
    }

    #[test]
    fn flattened_preserves_release_order() {
        let mut by_release = IndexMap::new();
        by_release.insert("4.22".to_string(), vec![record("job-a", "4.22")]);
        by_release.insert("4.21".to_string(), vec![record("job-b", "4.21")]);

        let snapshot = TelemetrySnapshot::new(by_release, IndexMap::new());
        let flat = snapshot.flattened();
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].release, "4.22");
        assert_eq!(flat[1].release, "4.21");
    }

    #[test]
    fn missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = TelemetrySnapshot::load(&temp_dir.path().join("absent.json"));
        assert!(matches!(result, Err(JobLensError::Input(_))));
    }

    #[test]
    fn corrupt_file_degrades_to_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("telemetry.json");
        fs::write(&path, "{ not json").unwrap();

        let snapshot = TelemetrySnapshot::load(&path).unwrap();
        assert!(snapshot.records_by_release.is_empty());
    }
}
