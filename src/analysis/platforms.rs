use indexmap::IndexMap;

use super::resolver;
use crate::model::{PlatformWindow, TelemetryRecord};
use crate::report::{PlatformComparison, PlatformStanding};

/// Platforms tracked by the comparison, with the name fragments that assign
/// a telemetry job to each. First match wins.
const PLATFORM_KEYWORDS: &[(&str, &[&str])] = &[
    ("OpenStack", &["openstack"]),
    ("AWS", &["aws"]),
    ("GCP", &["gcp"]),
    ("Azure", &["azure"]),
    ("vSphere", &["vsphere"]),
    ("Metal", &["metal", "baremetal"]),
];

/// The platform a telemetry job name belongs to, if any.
pub fn platform_of(job_name: &str) -> Option<&'static str> {
    let name = job_name.to_lowercase();
    PLATFORM_KEYWORDS.iter().find_map(|(platform, keywords)| {
        keywords
            .iter()
            .any(|keyword| name.contains(keyword))
            .then_some(*platform)
    })
}

/// Reduces one release's full (unfiltered) telemetry feed to per-platform
/// run counters. Jobs matching no platform contribute nothing.
pub fn platform_totals(records: &[TelemetryRecord]) -> IndexMap<String, PlatformWindow> {
    let mut totals: IndexMap<String, PlatformWindow> = IndexMap::new();

    for record in records {
        let Some(platform) = platform_of(&record.name) else {
            continue;
        };
        let window = totals.entry(platform.to_string()).or_default();
        window.job_count += 1;
        window.total_runs += record.current_runs + record.previous_runs;
        window.total_passes += record.current_passes + record.previous_passes;
    }

    totals
}

/// Ranks platforms by combined pass rate across all releases and positions
/// the baseline platform among them.
///
/// Returns `None` when no release carries platform totals, so reports built
/// from old or empty snapshots simply omit the comparison.
pub fn compare(
    totals_by_release: &IndexMap<String, IndexMap<String, PlatformWindow>>,
    baseline: &str,
) -> Option<PlatformComparison> {
    if totals_by_release.values().all(IndexMap::is_empty) {
        return None;
    }

    let mut overall: IndexMap<String, PlatformWindow> = IndexMap::new();
    for totals in totals_by_release.values() {
        for (platform, window) in totals {
            let entry = overall.entry(platform.clone()).or_default();
            entry.job_count += window.job_count;
            entry.total_runs += window.total_runs;
            entry.total_passes += window.total_passes;
        }
    }

    let baseline_rate = overall
        .get(baseline)
        .and_then(|window| resolver::pass_rate(window.total_passes, window.total_runs));

    let mut standings: Vec<PlatformStanding> = overall
        .iter()
        .map(|(platform, window)| {
            let rate = resolver::pass_rate(window.total_passes, window.total_runs);
            let vs_baseline = match (rate, baseline_rate) {
                (Some(rate), Some(base)) if platform != baseline => Some(rate - base),
                _ => None,
            };
            standing(platform, window, rate, vs_baseline)
        })
        .collect();
    sort_by_rate(&mut standings);

    let baseline_rank = standings
        .iter()
        .position(|s| s.platform == baseline)
        .map(|index| index + 1);

    let by_release: IndexMap<String, Vec<PlatformStanding>> = totals_by_release
        .iter()
        .filter(|(_, totals)| !totals.is_empty())
        .map(|(release, totals)| {
            let mut rows: Vec<PlatformStanding> = totals
                .iter()
                .map(|(platform, window)| {
                    let rate = resolver::pass_rate(window.total_passes, window.total_runs);
                    standing(platform, window, rate, None)
                })
                .collect();
            sort_by_rate(&mut rows);
            (release.clone(), rows)
        })
        .collect();

    Some(PlatformComparison {
        baseline: baseline.to_string(),
        baseline_rank,
        standings,
        by_release,
    })
}

fn standing(
    platform: &str,
    window: &PlatformWindow,
    pass_rate: Option<f64>,
    vs_baseline: Option<f64>,
) -> PlatformStanding {
    PlatformStanding {
        platform: platform.to_string(),
        job_count: window.job_count,
        total_runs: window.total_runs,
        total_passes: window.total_passes,
        pass_rate,
        vs_baseline,
    }
}

/// Best pass rate first; platforms with no runs sort last, by name.
fn sort_by_rate(standings: &mut [PlatformStanding]) {
    standings.sort_by(|a, b| match (a.pass_rate, b.pass_rate) {
        (Some(ra), Some(rb)) => rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.platform.cmp(&b.platform),
    });
}
