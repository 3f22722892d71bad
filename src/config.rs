use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Analysis settings for JobLens.
///
/// Lets users pin the cluster-profile allow-list, the tracked release set,
/// and the telemetry feed without repeating flags on every run. Settings
/// files are loaded from the current directory or a specified path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Job inventory extraction parameters
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// Release tracking parameters
    #[serde(default)]
    pub releases: ReleaseConfig,

    /// Telemetry feed parameters
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InventoryConfig {
    /// Cluster-profile families a test must target to be inventoried.
    /// Matched as substrings, since profile names carry suffixes/variants.
    #[serde(default = "default_cluster_profiles")]
    pub cluster_profiles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReleaseConfig {
    /// Release branches considered active for coverage-gap detection.
    #[serde(default = "default_active_branches")]
    pub active_branches: Vec<String>,

    /// Release versions queried from the telemetry feed.
    #[serde(default = "default_telemetry_releases")]
    pub telemetry_releases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TelemetryConfig {
    /// Telemetry feed base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Substring a telemetry record's name must contain to be kept; the feed
    /// covers every platform, the inventory only one family.
    #[serde(default = "default_name_filter")]
    pub name_filter: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            cluster_profiles: default_cluster_profiles(),
        }
    }
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            active_branches: default_active_branches(),
            telemetry_releases: default_telemetry_releases(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            name_filter: default_name_filter(),
        }
    }
}

fn default_cluster_profiles() -> Vec<String> {
    [
        "openstack-vexxhost",
        "openstack-vh-mecha-central",
        "openstack-vh-mecha-az0",
        "openstack-vh-bm-rhos",
        "openstack-hwoffload",
        "openstack-nfv",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_active_branches() -> Vec<String> {
    [
        "release-4.17",
        "release-4.18",
        "release-4.19",
        "release-4.20",
        "release-4.21",
        "release-4.22",
        "release-4.23",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_telemetry_releases() -> Vec<String> {
    ["4.17", "4.18", "4.19", "4.20", "4.21", "4.22"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_base_url() -> String {
    "https://sippy.dptools.openshift.org".to_string()
}

fn default_name_filter() -> String {
    "openstack".to_string()
}

impl Settings {
    /// Load settings from a file.
    ///
    /// Searches for settings files in this order:
    /// 1. Specified path
    /// 2. ./joblens.toml
    /// 3. ./joblens.json
    /// 4. ./joblens.yaml
    /// 5. ./joblens.yml
    ///
    /// Returns default settings if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load_from_dir(Path::new(".")),
        }
    }

    /// Load settings from the first candidate file present in `dir`.
    fn load_from_dir(dir: &Path) -> Result<Self> {
        let candidates = ["joblens.toml", "joblens.json", "joblens.yaml", "joblens.yml"];

        for candidate in &candidates {
            let path = dir.join(candidate);
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load settings from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML settings: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON settings: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML settings: {}", path.display())),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .with_context(|| format!("Failed to parse settings file: {}", path.display()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.inventory.cluster_profiles.len(), 6);
        assert!(settings
            .inventory
            .cluster_profiles
            .contains(&"openstack-nfv".to_string()));
        assert_eq!(settings.releases.active_branches.len(), 7);
        assert_eq!(settings.releases.telemetry_releases.len(), 6);
        assert_eq!(
            settings.telemetry.base_url,
            "https://sippy.dptools.openshift.org"
        );
        assert_eq!(settings.telemetry.name_filter, "openstack");
    }

    #[test]
    fn test_load_toml_settings() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[inventory]
cluster-profiles = ["metal-ipi"]

[releases]
active-branches = ["release-5.0", "release-5.1"]
telemetry-releases = ["5.0"]

[telemetry]
base-url = "https://telemetry.example.com"
name-filter = "metal"
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let settings = Settings::load_from_path(temp_file.path()).unwrap();
        assert_eq!(settings.inventory.cluster_profiles, vec!["metal-ipi"]);
        assert_eq!(
            settings.releases.active_branches,
            vec!["release-5.0", "release-5.1"]
        );
        assert_eq!(settings.releases.telemetry_releases, vec!["5.0"]);
        assert_eq!(settings.telemetry.base_url, "https://telemetry.example.com");
        assert_eq!(settings.telemetry.name_filter, "metal");
    }

    #[test]
    fn test_load_json_settings() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "telemetry": {
    "base-url": "https://telemetry.json.example.com"
  }
}"#;
        write!(temp_file, "{}", json_content).unwrap();

        let settings = Settings::load_from_path(temp_file.path()).unwrap();
        assert_eq!(
            settings.telemetry.base_url,
            "https://telemetry.json.example.com"
        );
        // Unspecified sections keep their defaults
        assert_eq!(settings.inventory.cluster_profiles.len(), 6);
    }

    #[test]
    fn test_load_yaml_settings() {
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        let yaml_content = r#"
releases:
  active-branches:
    - release-9.9
"#;
        write!(temp_file, "{}", yaml_content).unwrap();

        let settings = Settings::load_from_path(temp_file.path()).unwrap();
        assert_eq!(settings.releases.active_branches, vec!["release-9.9"]);
    }

    #[test]
    fn test_load_nonexistent_settings_errors() {
        let result = Settings::load(Some(Path::new("nonexistent.toml")));
        assert!(result.is_err(), "Explicit missing path should error");
    }

    #[test]
    fn test_load_from_empty_dir_returns_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();

        let settings = Settings::load_from_dir(temp_dir.path()).unwrap();
        assert_eq!(settings.telemetry.name_filter, "openstack");
        assert_eq!(settings.inventory.cluster_profiles.len(), 6);
    }

    #[test]
    fn test_load_from_dir_picks_up_candidate_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join("joblens.yaml"),
            "telemetry:\n  name-filter: vsphere\n",
        )
        .unwrap();

        let settings = Settings::load_from_dir(temp_dir.path()).unwrap();
        assert_eq!(settings.telemetry.name_filter, "vsphere");
    }

    #[test]
    fn test_load_from_dir_prefers_toml_over_yaml() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join("joblens.toml"),
            "[telemetry]\nname-filter = \"metal\"\n",
        )
        .unwrap();
        std::fs::write(
            temp_dir.path().join("joblens.yaml"),
            "telemetry:\n  name-filter: vsphere\n",
        )
        .unwrap();

        let settings = Settings::load_from_dir(temp_dir.path()).unwrap();
        assert_eq!(
            settings.telemetry.name_filter, "metal",
            "Candidates are searched in declaration order"
        );
    }
}
