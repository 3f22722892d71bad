use serde::{Deserialize, Serialize};
use std::fmt;

/// When and why a job runs, derived from its trigger configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulingClass {
    /// Runs against pull requests before merge.
    Presubmit,
    /// Runs after merge, explicitly flagged as postsubmit.
    Postsubmit,
    /// Runs on an explicit or implicit schedule, not gated on PRs.
    Periodic,
}

impl SchedulingClass {
    pub const ALL: [Self; 3] = [Self::Presubmit, Self::Postsubmit, Self::Periodic];
}

impl fmt::Display for SchedulingClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Presubmit => write!(f, "presubmit"),
            Self::Postsubmit => write!(f, "postsubmit"),
            Self::Periodic => write!(f, "periodic"),
        }
    }
}

/// A canonical test-job definition flattened from one raw config entry.
///
/// Immutable within a pipeline run; recomputed from scratch on every
/// normalization pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_name: String,
    pub org: String,
    pub repo: String,
    pub branch: String,
    pub variant: String,
    pub cluster_profile: String,
    pub workflow: Option<String>,
    pub optional: bool,
    pub always_run: bool,
    pub minimum_interval: Option<String>,
    pub skip_if_only_changed: Option<String>,
    pub run_if_changed: Option<String>,
    /// Derived deterministically from the trigger fields above.
    pub scheduling_class: SchedulingClass,
    /// Human-readable schedule ("interval: 24h", "cron: ...", "").
    pub schedule: String,
    /// Config document the job came from, for reporting.
    pub source_file: String,
}

/// A measured reliability sample for one job name, scoped to a release.
///
/// Run/pass counters cover two trailing windows ("current" and "previous");
/// the combined window smooths short-term noise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub name: String,
    #[serde(default)]
    pub brief_name: String,
    /// Stamped by the fetch layer; the feed itself is queried per release.
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub current_runs: u64,
    #[serde(default)]
    pub current_passes: u64,
    #[serde(default)]
    pub previous_runs: u64,
    #[serde(default)]
    pub previous_passes: u64,
    #[serde(default, alias = "open_bugs")]
    pub open_bug_count: u64,
    #[serde(default, alias = "last_pass")]
    pub last_pass_timestamp: Option<String>,
}

/// Combined-window run counters for one platform's share of a release feed.
///
/// Reduced from the full (unfiltered) feed at fetch time, so the
/// cross-platform comparison never needs the raw records on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformWindow {
    pub job_count: u64,
    pub total_runs: u64,
    pub total_passes: u64,
}

/// Direction of a pass rate between the previous and current windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Degrading,
    #[default]
    Stable,
}

impl Trend {
    /// Arrow glyph used in terminal tables.
    pub fn arrow(self) -> &'static str {
        match self {
            Self::Improving => "↑",
            Self::Degrading => "↓",
            Self::Stable => "→",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Improving => write!(f, "improving"),
            Self::Degrading => write!(f, "degrading"),
            Self::Stable => write!(f, "stable"),
        }
    }
}

/// The join of a [`Job`] with zero-or-one matched [`TelemetryRecord`].
///
/// When `has_telemetry` is false every telemetry-derived field is `None`,
/// never zero-as-placeholder, so downstream averages stay unbiased.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedJob {
    #[serde(flatten)]
    pub job: Job,
    /// Derived label summarizing which named test characteristics the job
    /// exercises (e.g. "serial-upgrade").
    pub scenario: String,
    pub has_telemetry: bool,
    pub release: Option<String>,
    pub brief_name: Option<String>,
    pub current_runs: Option<u64>,
    pub current_passes: Option<u64>,
    pub previous_runs: Option<u64>,
    pub previous_passes: Option<u64>,
    pub combined_runs: Option<u64>,
    pub combined_passes: Option<u64>,
    pub current_pass_rate: Option<f64>,
    pub previous_pass_rate: Option<f64>,
    pub combined_pass_rate: Option<f64>,
    /// Always defined; `Stable` when either window has no data.
    pub trend: Trend,
    pub open_bug_count: Option<u64>,
}

impl EnrichedJob {
    /// An enriched job carrying no telemetry at all.
    pub fn unmatched(job: Job, scenario: String) -> Self {
        Self {
            job,
            scenario,
            has_telemetry: false,
            release: None,
            brief_name: None,
            current_runs: None,
            current_passes: None,
            previous_runs: None,
            previous_passes: None,
            combined_runs: None,
            combined_passes: None,
            current_pass_rate: None,
            previous_pass_rate: None,
            combined_pass_rate: None,
            trend: Trend::Stable,
            open_bug_count: None,
        }
    }
}

/// Per-release aggregation over all matched jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseSummary {
    pub release: String,
    pub job_count: usize,
    pub current_runs: u64,
    pub current_passes: u64,
    pub previous_runs: u64,
    pub previous_passes: u64,
    pub combined_runs: u64,
    pub combined_passes: u64,
    pub combined_pass_rate: Option<f64>,
    pub trend: Trend,
}

/// Severity band for an aggregated scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    NeedsAttention,
    Ok,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Warning => write!(f, "warning"),
            Self::NeedsAttention => write!(f, "needs attention"),
            Self::Ok => write!(f, "ok"),
        }
    }
}

/// Per-scenario-tag aggregation over all matched jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub scenario: String,
    pub job_count: usize,
    pub combined_runs: u64,
    pub combined_passes: u64,
    pub pass_rate: Option<f64>,
    /// Jobs in this scenario with a combined pass rate below 80%.
    pub problem_jobs: usize,
    pub trend: Trend,
    pub severity: Severity,
}
