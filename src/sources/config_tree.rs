use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Deserialize;

use crate::error::{JobLensError, Result};

/// The `steps` block of a raw test definition. Only the fields the
/// normalizer cares about are decoded; everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestSteps {
    #[serde(default)]
    pub cluster_profile: Option<String>,
    #[serde(default)]
    pub workflow: Option<String>,
}

/// One raw test definition as it appears in a config document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTestDef {
    #[serde(default, rename = "as")]
    pub name: String,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub cron: Option<String>,
    #[serde(default)]
    pub postsubmit: bool,
    #[serde(default)]
    pub minimum_interval: Option<String>,
    #[serde(default)]
    pub always_run: bool,
    #[serde(default)]
    pub run_if_changed: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub skip_if_only_changed: Option<String>,
    #[serde(default)]
    pub steps: Option<TestSteps>,
}

impl RawTestDef {
    pub fn cluster_profile(&self) -> Option<&str> {
        self.steps.as_ref()?.cluster_profile.as_deref()
    }

    pub fn workflow(&self) -> Option<&str> {
        self.steps.as_ref()?.workflow.as_deref()
    }
}

/// Generated metadata identifying the org/repo/branch/variant a config
/// document belongs to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentContext {
    #[serde(default)]
    pub org: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub variant: String,
    #[serde(skip)]
    pub source_file: String,
}

/// A raw test definition paired with its enclosing document metadata.
#[derive(Debug, Clone)]
pub struct RawJobRecord {
    pub test: RawTestDef,
    pub context: DocumentContext,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    // Decoded loosely so one malformed entry skips, not the whole file.
    #[serde(default)]
    tests: Vec<serde_yaml::Value>,
    #[serde(default, rename = "zz_generated_metadata")]
    metadata: DocumentContext,
}

/// Walks a config directory and flattens every test definition it contains.
///
/// Unparseable files and malformed individual entries are skipped with a
/// warning; a missing directory is the only fatal condition.
pub fn scan(config_dir: &Path) -> Result<Vec<RawJobRecord>> {
    if !config_dir.is_dir() {
        return Err(JobLensError::Input(format!(
            "config directory not found: {}",
            config_dir.display()
        )));
    }

    let files = find_config_files(config_dir)?;
    info!("Found {} config files to scan", files.len());

    let mut records = Vec::new();
    for file in &files {
        records.extend(parse_config_file(file));
    }

    info!("Flattened {} raw test definitions", records.len());
    Ok(records)
}

/// Recursively collects `*.yaml` / `*.yml` files, sorted for deterministic
/// iteration order.
fn find_config_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_yaml_files(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_yaml_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_yaml_files(&path, files)?;
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        ) {
            files.push(path);
        }
    }
    Ok(())
}

/// Parses one config document into raw job records.
///
/// Returns an empty list on parse failure so one bad file never aborts the
/// batch.
fn parse_config_file(path: &Path) -> Vec<RawJobRecord> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!("Failed to read {}: {e}", path.display());
            return Vec::new();
        }
    };

    let document: ConfigDocument = match serde_yaml::from_str(&contents) {
        Ok(document) => document,
        Err(e) => {
            warn!("Failed to parse {}: {e}", path.display());
            return Vec::new();
        }
    };

    let mut context = document.metadata;
    context.source_file = path.display().to_string();

    document
        .tests
        .into_iter()
        .filter_map(|value| match serde_yaml::from_value::<RawTestDef>(value) {
            Ok(test) => Some(RawJobRecord {
                test,
                context: context.clone(),
            }),
            Err(e) => {
                warn!("Skipping malformed test entry in {}: {e}", path.display());
                None
            }
        })
        .inspect(|record| debug!("Parsed test '{}' from {}", record.test.name, path.display()))
        .collect()
}
