use std::collections::{BTreeMap, BTreeSet};

use crate::model::Job;
use crate::report::{CoverageGap, RedundancyGroup};

/// Trunk branches denote one line of development whatever they are called.
pub fn normalize_branch(branch: &str) -> String {
    match branch {
        "main" | "master" => "main/master".to_string(),
        other => other.to_string(),
    }
}

/// Finds jobs present on some but not all of their repository's active
/// release branches.
///
/// The reference set for each job is the union of active branches used by
/// any job in the same (org, repo); a job missing from part of that union
/// is a gap. Jobs present on zero active branches, or on all of them, are
/// not gaps.
pub fn find_coverage_gaps(jobs: &[Job], active_branches: &[String]) -> Vec<CoverageGap> {
    let active: BTreeSet<String> = active_branches
        .iter()
        .map(|branch| normalize_branch(branch))
        .collect();

    let mut repo_branches: BTreeMap<(String, String), BTreeSet<String>> = BTreeMap::new();
    let mut job_branches: BTreeMap<(String, String, String), BTreeSet<String>> = BTreeMap::new();

    for job in jobs {
        let branch = normalize_branch(&job.branch);
        repo_branches
            .entry((job.org.clone(), job.repo.clone()))
            .or_default()
            .insert(branch.clone());
        job_branches
            .entry((job.org.clone(), job.repo.clone(), job.job_name.clone()))
            .or_default()
            .insert(branch);
    }

    let mut gaps = Vec::new();
    for ((org, repo, job_name), branches) in job_branches {
        let repo_active: BTreeSet<String> = repo_branches[&(org.clone(), repo.clone())]
            .intersection(&active)
            .cloned()
            .collect();

        let present: Vec<String> = branches.intersection(&repo_active).cloned().collect();
        let missing: Vec<String> = repo_active.difference(&branches).cloned().collect();

        if !present.is_empty() && !missing.is_empty() {
            gaps.push(CoverageGap {
                org,
                repo,
                job_name,
                present,
                missing,
            });
        }
    }

    gaps
}

/// Finds distinct job names sharing one (org, repo, branch, workflow,
/// cluster profile) tuple.
///
/// Jobs without a workflow are skipped; duplication across branches or
/// organizations is intentional per-release fan-out, not redundancy.
pub fn find_redundancies(jobs: &[Job]) -> Vec<RedundancyGroup> {
    let mut groups: BTreeMap<(String, String, String, String, String), BTreeSet<String>> =
        BTreeMap::new();

    for job in jobs {
        let Some(workflow) = &job.workflow else {
            continue;
        };
        groups
            .entry((
                job.org.clone(),
                job.repo.clone(),
                normalize_branch(&job.branch),
                workflow.clone(),
                job.cluster_profile.clone(),
            ))
            .or_default()
            .insert(job.job_name.clone());
    }

    groups
        .into_iter()
        .filter(|(_, names)| names.len() > 1)
        .map(
            |((org, repo, branch, workflow, cluster_profile), names)| RedundancyGroup {
                org,
                repo,
                branch,
                workflow,
                cluster_profile,
                job_names: names.into_iter().collect(),
            },
        )
        .collect()
}
