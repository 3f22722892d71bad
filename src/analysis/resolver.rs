use log::debug;

use crate::model::{EnrichedJob, Job, SchedulingClass, TelemetryRecord, Trend};
use crate::report::MatchStats;

/// Pass-rate movement a single job must show between windows before its
/// trend leaves `Stable`.
pub const JOB_TREND_THRESHOLD: f64 = 10.0;

/// Characteristic substrings tested against job names, kept sorted so the
/// joined tag reads alphabetically.
const SCENARIO_VOCABULARY: &[&str] = &[
    "ccpmso",
    "cinder",
    "csi",
    "dualstack",
    "etcd",
    "externallb",
    "fips",
    "hwoffload",
    "hypershift",
    "kuryr",
    "manila",
    "nfv",
    "parallel",
    "proxy",
    "serial",
    "singlestackv6",
    "techpreview",
    "upgrade",
];

const DEFAULT_SCENARIO: &str = "e2e-default";

/// Derives a scenario tag from a job name by collecting every vocabulary
/// substring it contains, joined with "-".
pub fn scenario_tag(job_name: &str) -> String {
    let tags: Vec<&str> = SCENARIO_VOCABULARY
        .iter()
        .copied()
        .filter(|tag| match *tag {
            // Both spellings occur in the wild.
            "singlestackv6" => {
                job_name.contains("singlestackv6") || job_name.contains("single-stack-v6")
            }
            tag => job_name.contains(tag),
        })
        .collect();

    if tags.is_empty() {
        DEFAULT_SCENARIO.to_string()
    } else {
        tags.join("-")
    }
}

/// Percentage pass rate, or `None` when there were no runs. Never coerced
/// to 0 or 100 so downstream averages stay unbiased.
pub fn pass_rate(passes: u64, runs: u64) -> Option<f64> {
    if runs > 0 {
        Some(passes as f64 / runs as f64 * 100.0)
    } else {
        None
    }
}

/// Trend between two possibly-undefined window rates. Stable unless both
/// windows are defined and the movement exceeds `threshold` points.
pub fn trend_between(current: Option<f64>, previous: Option<f64>, threshold: f64) -> Trend {
    match (current, previous) {
        (Some(current), Some(previous)) if current > previous + threshold => Trend::Improving,
        (Some(current), Some(previous)) if current < previous - threshold => Trend::Degrading,
        _ => Trend::Stable,
    }
}

/// Joins canonical jobs with telemetry records.
///
/// Only periodic jobs are eligible for matching; the feed samples scheduled
/// runs, not pull-request gates. Selection is first match in telemetry
/// order, with no scoring among candidates; `MatchStats.multi_candidate`
/// counts jobs where more than one record matched, without changing which
/// one is picked.
pub fn resolve(jobs: &[Job], telemetry: &[TelemetryRecord]) -> (Vec<EnrichedJob>, MatchStats) {
    let mut stats = MatchStats::default();

    let enriched = jobs
        .iter()
        .map(|job| {
            let scenario = scenario_tag(&job.job_name);

            if job.scheduling_class != SchedulingClass::Periodic {
                return EnrichedJob::unmatched(job.clone(), scenario);
            }

            let mut candidates = telemetry.iter().filter(|record| {
                record.name.contains(&job.job_name) || record.name.ends_with(&job.job_name)
            });

            match candidates.next() {
                Some(record) => {
                    if candidates.next().is_some() {
                        stats.multi_candidate += 1;
                        debug!("Multiple telemetry candidates for job {}", job.job_name);
                    }
                    stats.matched += 1;
                    enrich(job.clone(), scenario, record)
                }
                None => {
                    stats.unmatched += 1;
                    EnrichedJob::unmatched(job.clone(), scenario)
                }
            }
        })
        .collect();

    (enriched, stats)
}

fn enrich(job: Job, scenario: String, record: &TelemetryRecord) -> EnrichedJob {
    let combined_runs = record.current_runs + record.previous_runs;
    let combined_passes = record.current_passes + record.previous_passes;
    let current_pass_rate = pass_rate(record.current_passes, record.current_runs);
    let previous_pass_rate = pass_rate(record.previous_passes, record.previous_runs);

    EnrichedJob {
        job,
        scenario,
        has_telemetry: true,
        release: Some(record.release.clone()),
        brief_name: Some(record.brief_name.clone()),
        current_runs: Some(record.current_runs),
        current_passes: Some(record.current_passes),
        previous_runs: Some(record.previous_runs),
        previous_passes: Some(record.previous_passes),
        combined_runs: Some(combined_runs),
        combined_passes: Some(combined_passes),
        current_pass_rate,
        previous_pass_rate,
        combined_pass_rate: pass_rate(combined_passes, combined_runs),
        trend: trend_between(current_pass_rate, previous_pass_rate, JOB_TREND_THRESHOLD),
        open_bug_count: Some(record.open_bug_count),
    }
}
