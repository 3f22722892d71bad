use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Job, SchedulingClass};
use crate::report::{TriggerFindings, TriggerUsage, UnfilteredRepo, UnthrottledJob};

/// Change filter worth suggesting for end-to-end presubmits: skips runs for
/// docs-only and ownership-only pull requests.
pub const SUGGESTED_SKIP_PATTERN: &str = r"(^docs/)|(\.md$)|((^|/)OWNERS(_ALIASES)?$)";

/// Scans the inventory for trigger-hygiene problems: presubmits with no
/// change filter, repos that could adopt a skip filter, and always-run jobs
/// with no interval throttle.
pub fn analyze(jobs: &[Job]) -> TriggerFindings {
    let presubmits: Vec<&Job> = jobs
        .iter()
        .filter(|job| job.scheduling_class == SchedulingClass::Presubmit)
        .collect();

    let mut usage = TriggerUsage {
        presubmit_total: presubmits.len(),
        ..TriggerUsage::default()
    };
    for job in &presubmits {
        if has_pattern(&job.skip_if_only_changed) {
            usage.with_skip_filter += 1;
        }
        if has_pattern(&job.run_if_changed) {
            usage.with_run_if_changed += 1;
        }
        if has_pattern(&job.minimum_interval) {
            usage.with_minimum_interval += 1;
        }
        if job.always_run {
            usage.always_run += 1;
        }
        if job.optional {
            usage.optional += 1;
        }
        if is_unfiltered(job) {
            usage.unfiltered += 1;
        }
    }

    TriggerFindings {
        usage,
        unfiltered_repos: unfiltered_repos(&presubmits),
        unthrottled_always_run: unthrottled_always_run(&presubmits),
        suggested_skip_pattern: SUGGESTED_SKIP_PATTERN.to_string(),
    }
}

/// A presubmit with no change filter and no optional flag runs on every
/// pull request regardless of which files changed.
fn is_unfiltered(job: &Job) -> bool {
    !has_pattern(&job.skip_if_only_changed) && !has_pattern(&job.run_if_changed) && !job.optional
}

fn has_pattern(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

struct RepoTally {
    presubmit_total: usize,
    with_skip: usize,
    unfiltered: usize,
    unfiltered_names: BTreeSet<String>,
}

/// Repos where every presubmit lacks a skip filter and at least one runs
/// completely unfiltered. Sorted worst first.
fn unfiltered_repos(presubmits: &[&Job]) -> Vec<UnfilteredRepo> {
    let mut tallies: BTreeMap<(String, String), RepoTally> = BTreeMap::new();

    for job in presubmits {
        let tally = tallies
            .entry((job.org.clone(), job.repo.clone()))
            .or_insert_with(|| RepoTally {
                presubmit_total: 0,
                with_skip: 0,
                unfiltered: 0,
                unfiltered_names: BTreeSet::new(),
            });
        tally.presubmit_total += 1;
        if has_pattern(&job.skip_if_only_changed) {
            tally.with_skip += 1;
        }
        if is_unfiltered(job) {
            tally.unfiltered += 1;
            tally.unfiltered_names.insert(job.job_name.clone());
        }
    }

    let mut repos: Vec<UnfilteredRepo> = tallies
        .into_iter()
        .filter(|(_, tally)| tally.unfiltered > 0 && tally.with_skip == 0)
        .map(|((org, repo), tally)| UnfilteredRepo {
            org,
            repo,
            presubmit_total: tally.presubmit_total,
            unfiltered: tally.unfiltered,
            job_names: tally.unfiltered_names.into_iter().collect(),
        })
        .collect();

    repos.sort_by(|a, b| {
        b.unfiltered
            .cmp(&a.unfiltered)
            .then_with(|| a.org.cmp(&b.org))
            .then_with(|| a.repo.cmp(&b.repo))
    });
    repos
}

/// Always-run presubmits with no minimum-interval throttle, deduplicated
/// across branches.
fn unthrottled_always_run(presubmits: &[&Job]) -> Vec<UnthrottledJob> {
    let identities: BTreeSet<(String, String, String)> = presubmits
        .iter()
        .filter(|job| job.always_run && !has_pattern(&job.minimum_interval))
        .map(|job| (job.org.clone(), job.repo.clone(), job.job_name.clone()))
        .collect();

    identities
        .into_iter()
        .map(|(org, repo, job_name)| UnthrottledJob {
            org,
            repo,
            job_name,
        })
        .collect()
}
