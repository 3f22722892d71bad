pub mod classifier;
pub mod coverage;
pub mod normalizer;
pub mod platforms;
pub mod resolver;
pub mod triggers;

use chrono::Utc;
use indexmap::IndexMap;
use log::info;

use crate::model::{
    EnrichedJob, Job, PlatformWindow, ReleaseSummary, ScenarioSummary, SchedulingClass, Severity,
    TelemetryRecord,
};
use crate::report::AnalysisReport;

/// Pass-rate movement a release or scenario aggregate must show between
/// windows before its trend leaves `Stable`. Aggregates are noisier than
/// single jobs, so the bar is lower.
pub const AGGREGATE_TREND_THRESHOLD: f64 = 5.0;

/// Runs the full correlation and classification pipeline over a canonical
/// job set and a flattened telemetry record list.
///
/// Every stage consumes a fully-materialized collection; empty inputs
/// produce an empty, well-formed report.
pub fn run(
    jobs: &[Job],
    telemetry: &[TelemetryRecord],
    active_branches: &[String],
    platform_totals: &IndexMap<String, IndexMap<String, PlatformWindow>>,
    baseline_platform: &str,
) -> AnalysisReport {
    let (enriched, match_stats) = resolver::resolve(jobs, telemetry);
    info!(
        "Resolved identities: {} matched, {} unmatched, {} multi-candidate",
        match_stats.matched, match_stats.unmatched, match_stats.multi_candidate
    );

    let coverage_gaps = coverage::find_coverage_gaps(jobs, active_branches);
    let redundancy_groups = coverage::find_redundancies(jobs);
    let platform_comparison = platforms::compare(platform_totals, baseline_platform);
    let trigger_findings = triggers::analyze(jobs);
    let (categories, category_summary) = classifier::categorize(&enriched);

    AnalysisReport {
        generated_at: Utc::now(),
        total_jobs: jobs.len(),
        jobs_by_class: count_by_class(jobs),
        match_stats,
        release_summaries: release_summaries(&enriched),
        scenario_summaries: scenario_summaries(&enriched),
        coverage_gaps,
        redundancy_groups,
        platform_comparison,
        trigger_findings,
        categories,
        category_summary,
    }
}

pub fn count_by_class(jobs: &[Job]) -> IndexMap<SchedulingClass, usize> {
    let mut counts: IndexMap<SchedulingClass, usize> = SchedulingClass::ALL
        .into_iter()
        .map(|class| (class, 0))
        .collect();
    for job in jobs {
        *counts.entry(job.scheduling_class).or_default() += 1;
    }
    counts
}

struct WindowTotals {
    job_count: usize,
    current_runs: u64,
    current_passes: u64,
    previous_runs: u64,
    previous_passes: u64,
}

impl WindowTotals {
    fn new() -> Self {
        Self {
            job_count: 0,
            current_runs: 0,
            current_passes: 0,
            previous_runs: 0,
            previous_passes: 0,
        }
    }

    fn add(&mut self, job: &EnrichedJob) {
        self.job_count += 1;
        self.current_runs += job.current_runs.unwrap_or(0);
        self.current_passes += job.current_passes.unwrap_or(0);
        self.previous_runs += job.previous_runs.unwrap_or(0);
        self.previous_passes += job.previous_passes.unwrap_or(0);
    }

    fn combined_runs(&self) -> u64 {
        self.current_runs + self.previous_runs
    }

    fn combined_passes(&self) -> u64 {
        self.current_passes + self.previous_passes
    }

    fn trend(&self) -> crate::model::Trend {
        resolver::trend_between(
            resolver::pass_rate(self.current_passes, self.current_runs),
            resolver::pass_rate(self.previous_passes, self.previous_runs),
            AGGREGATE_TREND_THRESHOLD,
        )
    }
}

/// Aggregates matched jobs per release, in order of first appearance.
pub fn release_summaries(enriched: &[EnrichedJob]) -> Vec<ReleaseSummary> {
    let mut totals: IndexMap<String, WindowTotals> = IndexMap::new();

    for job in enriched.iter().filter(|job| job.has_telemetry) {
        let Some(release) = &job.release else {
            continue;
        };
        totals
            .entry(release.clone())
            .or_insert_with(WindowTotals::new)
            .add(job);
    }

    totals
        .into_iter()
        .map(|(release, totals)| ReleaseSummary {
            release,
            job_count: totals.job_count,
            current_runs: totals.current_runs,
            current_passes: totals.current_passes,
            previous_runs: totals.previous_runs,
            previous_passes: totals.previous_passes,
            combined_runs: totals.combined_runs(),
            combined_passes: totals.combined_passes(),
            combined_pass_rate: resolver::pass_rate(
                totals.combined_passes(),
                totals.combined_runs(),
            ),
            trend: totals.trend(),
        })
        .collect()
}

/// Aggregates matched jobs per scenario tag, worst pass rate first.
pub fn scenario_summaries(enriched: &[EnrichedJob]) -> Vec<ScenarioSummary> {
    let mut totals: IndexMap<String, (WindowTotals, usize)> = IndexMap::new();

    for job in enriched.iter().filter(|job| job.has_telemetry) {
        let entry = totals
            .entry(job.scenario.clone())
            .or_insert_with(|| (WindowTotals::new(), 0));
        entry.0.add(job);
        if matches!(job.combined_pass_rate, Some(rate) if rate < 80.0) {
            entry.1 += 1;
        }
    }

    let mut summaries: Vec<ScenarioSummary> = totals
        .into_iter()
        .map(|(scenario, (totals, problem_jobs))| {
            let pass_rate =
                resolver::pass_rate(totals.combined_passes(), totals.combined_runs());
            ScenarioSummary {
                scenario,
                job_count: totals.job_count,
                combined_runs: totals.combined_runs(),
                combined_passes: totals.combined_passes(),
                pass_rate,
                problem_jobs,
                trend: totals.trend(),
                severity: severity_of(pass_rate),
            }
        })
        .collect();

    summaries.sort_by(|a, b| match (a.pass_rate, b.pass_rate) {
        (Some(ra), Some(rb)) => ra.partial_cmp(&rb).unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.scenario.cmp(&b.scenario),
    });
    summaries
}

/// Severity band for an aggregate pass rate. Groups with no runs at all are
/// not flagged; they show up as coverage issues elsewhere.
fn severity_of(pass_rate: Option<f64>) -> Severity {
    match pass_rate {
        Some(rate) if rate < 50.0 => Severity::Critical,
        Some(rate) if rate < 70.0 => Severity::Warning,
        Some(rate) if rate < 80.0 => Severity::NeedsAttention,
        _ => Severity::Ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Trend;

    fn job(name: &str, class: SchedulingClass) -> Job {
        Job {
            job_name: name.to_string(),
            org: "openshift".to_string(),
            repo: "installer".to_string(),
            branch: "release-4.21".to_string(),
            variant: String::new(),
            cluster_profile: "openstack-vexxhost".to_string(),
            workflow: None,
            optional: false,
            always_run: false,
            minimum_interval: None,
            skip_if_only_changed: None,
            run_if_changed: None,
            scheduling_class: class,
            schedule: String::new(),
            source_file: String::new(),
        }
    }

    fn record(name: &str, release: &str, current: (u64, u64), previous: (u64, u64)) -> TelemetryRecord {
        TelemetryRecord {
            name: name.to_string(),
            brief_name: name.to_string(),
            release: release.to_string(),
            current_runs: current.0,
            current_passes: current.1,
            previous_runs: previous.0,
            previous_passes: previous.1,
            open_bug_count: 0,
            last_pass_timestamp: None,
        }
    }

    #[test]
    fn empty_inputs_produce_empty_well_formed_report() {
        let report = run(&[], &[], &[], &IndexMap::new(), "OpenStack");
        assert_eq!(report.total_jobs, 0);
        assert!(report.release_summaries.is_empty());
        assert!(report.coverage_gaps.is_empty());
        assert!(report.redundancy_groups.is_empty());
        assert!(report.platform_comparison.is_none());
        assert_eq!(report.trigger_findings.usage.presubmit_total, 0);
        assert!(report.categories.values().all(Vec::is_empty));
    }

    #[test]
    fn run_carries_platform_and_trigger_findings() {
        let jobs = vec![job("e2e-openstack-plain", SchedulingClass::Presubmit)];
        let mut per_platform = IndexMap::new();
        per_platform.insert(
            "OpenStack".to_string(),
            PlatformWindow {
                job_count: 1,
                total_runs: 10,
                total_passes: 8,
            },
        );
        per_platform.insert(
            "AWS".to_string(),
            PlatformWindow {
                job_count: 1,
                total_runs: 10,
                total_passes: 9,
            },
        );
        let mut totals = IndexMap::new();
        totals.insert("4.21".to_string(), per_platform);

        let report = run(&jobs, &[], &[], &totals, "OpenStack");

        let comparison = report.platform_comparison.expect("totals were supplied");
        assert_eq!(comparison.baseline, "OpenStack");
        assert_eq!(comparison.baseline_rank, Some(2));
        assert_eq!(
            report.trigger_findings.usage.unfiltered, 1,
            "The presubmit carries no change filter"
        );
    }

    #[test]
    fn counts_jobs_by_class() {
        let jobs = vec![
            job("a", SchedulingClass::Presubmit),
            job("b", SchedulingClass::Presubmit),
            job("c", SchedulingClass::Periodic),
        ];
        let counts = count_by_class(&jobs);
        assert_eq!(counts[&SchedulingClass::Presubmit], 2);
        assert_eq!(counts[&SchedulingClass::Periodic], 1);
        assert_eq!(counts[&SchedulingClass::Postsubmit], 0);
    }

    #[test]
    fn release_summaries_aggregate_counters() {
        let jobs = vec![
            job("e2e-openstack-ovn", SchedulingClass::Periodic),
            job("e2e-openstack-nfv", SchedulingClass::Periodic),
        ];
        let telemetry = vec![
            record("x-e2e-openstack-ovn", "4.21", (10, 9), (10, 8)),
            record("x-e2e-openstack-nfv", "4.21", (10, 5), (10, 6)),
        ];
        let (enriched, _) = resolver::resolve(&jobs, &telemetry);

        let summaries = release_summaries(&enriched);
        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.release, "4.21");
        assert_eq!(summary.job_count, 2);
        assert_eq!(summary.combined_runs, 40);
        assert_eq!(summary.combined_passes, 28);
        assert_eq!(summary.combined_pass_rate, Some(70.0));
    }

    #[test]
    fn release_trend_uses_aggregate_threshold() {
        let jobs = vec![job("e2e-openstack-ovn", SchedulingClass::Periodic)];
        // Current 90%, previous 83%: over the 5-point aggregate bar but
        // under the 10-point job bar.
        let telemetry = vec![record("x-e2e-openstack-ovn", "4.21", (100, 90), (100, 83))];
        let (enriched, _) = resolver::resolve(&jobs, &telemetry);

        assert_eq!(enriched[0].trend, Trend::Stable);
        let summaries = release_summaries(&enriched);
        assert_eq!(summaries[0].trend, Trend::Improving);
    }

    #[test]
    fn scenario_summaries_sort_worst_first_and_band_severity() {
        let jobs = vec![
            job("e2e-openstack-serial", SchedulingClass::Periodic),
            job("e2e-openstack-upgrade", SchedulingClass::Periodic),
        ];
        let telemetry = vec![
            record("x-e2e-openstack-serial", "4.21", (10, 4), (10, 4)),
            record("x-e2e-openstack-upgrade", "4.21", (10, 9), (10, 9)),
        ];
        let (enriched, _) = resolver::resolve(&jobs, &telemetry);

        let summaries = scenario_summaries(&enriched);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].scenario, "serial");
        assert_eq!(summaries[0].severity, Severity::Critical);
        assert_eq!(summaries[0].problem_jobs, 1);
        assert_eq!(summaries[1].scenario, "upgrade");
        assert_eq!(summaries[1].severity, Severity::Ok);
        assert_eq!(summaries[1].problem_jobs, 0);
    }

    #[test]
    fn zero_run_scenario_is_not_flagged() {
        let jobs = vec![job("e2e-openstack-fips", SchedulingClass::Periodic)];
        let telemetry = vec![record("x-e2e-openstack-fips", "4.21", (0, 0), (0, 0))];
        let (enriched, _) = resolver::resolve(&jobs, &telemetry);

        let summaries = scenario_summaries(&enriched);
        assert_eq!(summaries[0].pass_rate, None);
        assert_eq!(summaries[0].severity, Severity::Ok);
    }
}
