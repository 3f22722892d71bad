use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{ReleaseSummary, ScenarioSummary, SchedulingClass};

/// A job present on some of its repository's active releases but not all.
///
/// `present` and `missing` partition the repo's active-release set; both are
/// non-empty by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageGap {
    pub org: String,
    pub repo: String,
    pub job_name: String,
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

/// Multiple distinct job names sharing one (org, repo, branch, workflow,
/// cluster profile) tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedundancyGroup {
    pub org: String,
    pub repo: String,
    pub branch: String,
    pub workflow: String,
    pub cluster_profile: String,
    pub job_names: Vec<String>,
}

/// Root-cause bucket assigned to a job by the failure classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Infrastructure,
    Flaky,
    ProductBug,
    NeedsTriage,
    Passing,
    InsufficientData,
}

impl FailureCategory {
    /// Presentation and bucketing order; also the order buckets appear in
    /// exported reports.
    pub const ALL: [Self; 6] = [
        Self::Infrastructure,
        Self::Flaky,
        Self::ProductBug,
        Self::NeedsTriage,
        Self::Passing,
        Self::InsufficientData,
    ];

    /// Whether the category marks a job that needs attention.
    pub fn is_problem(self) -> bool {
        !matches!(self, Self::Passing | Self::InsufficientData)
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Flaky => write!(f, "flaky"),
            Self::ProductBug => write!(f, "product bug"),
            Self::NeedsTriage => write!(f, "needs triage"),
            Self::Passing => write!(f, "passing"),
            Self::InsufficientData => write!(f, "insufficient data"),
        }
    }
}

/// One classified job together with the signals the decision was based on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizedJob {
    pub job_name: String,
    pub brief_name: String,
    pub release: String,
    pub combined_runs: u64,
    pub combined_pass_rate: Option<f64>,
    pub current_pass_rate: Option<f64>,
    pub open_bug_count: u64,
    pub trend: crate::model::Trend,
    pub category: FailureCategory,
    pub reason: String,
}

/// Classification roll-up across all categorized jobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategorySummary {
    pub total_problem_jobs: usize,
    pub by_category: IndexMap<FailureCategory, usize>,
    /// Share of the problem-job total, per problem category.
    pub percentages: IndexMap<FailureCategory, f64>,
}

/// One platform's aggregate standing in the cross-platform comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformStanding {
    pub platform: String,
    pub job_count: u64,
    pub total_runs: u64,
    pub total_passes: u64,
    pub pass_rate: Option<f64>,
    /// Pass-rate delta against the baseline platform. `None` on the baseline
    /// row itself and whenever either rate is undefined.
    pub vs_baseline: Option<f64>,
}

/// Cross-platform pass-rate comparison anchored on the inventoried platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformComparison {
    pub baseline: String,
    /// 1-based position of the baseline in `standings`, best rate first.
    pub baseline_rank: Option<usize>,
    pub standings: Vec<PlatformStanding>,
    pub by_release: IndexMap<String, Vec<PlatformStanding>>,
}

/// Presubmit trigger-pattern usage counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerUsage {
    pub presubmit_total: usize,
    pub with_skip_filter: usize,
    pub with_run_if_changed: usize,
    pub with_minimum_interval: usize,
    pub always_run: usize,
    pub optional: usize,
    /// Presubmits with no change filter and no optional flag; they run on
    /// every pull request regardless of which files changed.
    pub unfiltered: usize,
}

/// A repository whose presubmits carry no change filters at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfilteredRepo {
    pub org: String,
    pub repo: String,
    pub presubmit_total: usize,
    pub unfiltered: usize,
    pub job_names: Vec<String>,
}

/// An always-run presubmit with no minimum-interval throttle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnthrottledJob {
    pub org: String,
    pub repo: String,
    pub job_name: String,
}

/// Trigger-hygiene findings over the job inventory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerFindings {
    pub usage: TriggerUsage,
    /// Repos that would benefit most from a skip filter, worst first.
    pub unfiltered_repos: Vec<UnfilteredRepo>,
    pub unthrottled_always_run: Vec<UnthrottledJob>,
    pub suggested_skip_pattern: String,
}

/// Identity-resolution diagnostics over telemetry-eligible (periodic) jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStats {
    pub matched: usize,
    pub unmatched: usize,
    /// Jobs for which more than one telemetry record matched. The first
    /// candidate is still selected; this is visibility only.
    pub multi_candidate: usize,
}

/// Full output of one analysis run, consumed by the terminal summary and the
/// JSON export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub total_jobs: usize,
    pub jobs_by_class: IndexMap<SchedulingClass, usize>,
    pub match_stats: MatchStats,
    pub release_summaries: Vec<ReleaseSummary>,
    pub scenario_summaries: Vec<ScenarioSummary>,
    pub coverage_gaps: Vec<CoverageGap>,
    pub redundancy_groups: Vec<RedundancyGroup>,
    /// `None` when the snapshot carries no platform totals (pre-comparison
    /// snapshots, or analysis without telemetry).
    pub platform_comparison: Option<PlatformComparison>,
    pub trigger_findings: TriggerFindings,
    pub categories: IndexMap<FailureCategory, Vec<CategorizedJob>>,
    pub category_summary: CategorySummary,
}
