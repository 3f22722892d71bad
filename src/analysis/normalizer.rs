use log::warn;

use crate::model::{Job, SchedulingClass};
use crate::sources::config_tree::{RawJobRecord, RawTestDef};

/// Flattens raw test definitions into canonical [`Job`] records.
///
/// Records that do not target an allow-listed cluster-profile family are
/// dropped silently; records with no usable name are skipped with a warning.
pub fn normalize(records: &[RawJobRecord], cluster_profiles: &[String]) -> Vec<Job> {
    records
        .iter()
        .filter_map(|record| normalize_record(record, cluster_profiles))
        .collect()
}

/// Produces a canonical Job from one raw record, or `None` if the record is
/// out of scope. Pure and idempotent.
pub fn normalize_record(record: &RawJobRecord, cluster_profiles: &[String]) -> Option<Job> {
    let profile = record.test.cluster_profile()?;

    // Substring match: profile names carry suffixes and variants.
    if !cluster_profiles
        .iter()
        .any(|allowed| profile.contains(allowed.as_str()))
    {
        return None;
    }

    if record.test.name.is_empty() {
        warn!(
            "Skipping unnamed test entry in {}",
            record.context.source_file
        );
        return None;
    }

    let test = &record.test;
    Some(Job {
        job_name: test.name.clone(),
        org: record.context.org.clone(),
        repo: record.context.repo.clone(),
        branch: record.context.branch.clone(),
        variant: record.context.variant.clone(),
        cluster_profile: profile.to_string(),
        workflow: test.workflow().map(String::from),
        optional: test.optional,
        always_run: test.always_run,
        minimum_interval: test.minimum_interval.clone(),
        skip_if_only_changed: test.skip_if_only_changed.clone(),
        run_if_changed: test.run_if_changed.clone(),
        scheduling_class: derive_scheduling_class(test),
        schedule: schedule_string(test),
        source_file: record.context.source_file.clone(),
    })
}

/// True when any pull-request trigger flag is set. Shared by the class
/// derivation and the schedule string so the two cannot drift.
fn has_presubmit_trigger(test: &RawTestDef) -> bool {
    test.always_run
        || test.optional
        || test.run_if_changed.is_some()
        || test.skip_if_only_changed.is_some()
}

/// Derives the scheduling class, first match wins:
///
/// 1. explicit interval or cron wins over everything
/// 2. explicit postsubmit flag
/// 3. minimum-interval throttle with no pull-request trigger is an implicit
///    background schedule
/// 4. everything else gates pull requests
pub fn derive_scheduling_class(test: &RawTestDef) -> SchedulingClass {
    if test.interval.is_some() || test.cron.is_some() {
        SchedulingClass::Periodic
    } else if test.postsubmit {
        SchedulingClass::Postsubmit
    } else if test.minimum_interval.is_some() && !has_presubmit_trigger(test) {
        SchedulingClass::Periodic
    } else {
        SchedulingClass::Presubmit
    }
}

fn schedule_string(test: &RawTestDef) -> String {
    if let Some(interval) = &test.interval {
        format!("interval: {interval}")
    } else if let Some(cron) = &test.cron {
        format!("cron: {cron}")
    } else if let (Some(minimum_interval), false) =
        (&test.minimum_interval, has_presubmit_trigger(test))
    {
        format!("minimum_interval: {minimum_interval}")
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::config_tree::{DocumentContext, TestSteps};

    fn profiles() -> Vec<String> {
        vec!["openstack-vexxhost".to_string(), "openstack-nfv".to_string()]
    }

    fn test_def(name: &str) -> RawTestDef {
        RawTestDef {
            name: name.to_string(),
            steps: Some(TestSteps {
                cluster_profile: Some("openstack-vexxhost".to_string()),
                workflow: Some("openshift-e2e-openstack-ipi".to_string()),
            }),
            ..Default::default()
        }
    }

    fn record(test: RawTestDef) -> RawJobRecord {
        RawJobRecord {
            test,
            context: DocumentContext {
                org: "openshift".to_string(),
                repo: "installer".to_string(),
                branch: "release-4.21".to_string(),
                variant: String::new(),
                source_file: "installer.yaml".to_string(),
            },
        }
    }

    mod scheduling_class {
        use super::*;

        #[test]
        fn cron_wins_over_always_run() {
            let mut test = test_def("e2e-periodic");
            test.cron = Some("0 6 * * 1".to_string());
            test.always_run = true;
            assert_eq!(
                derive_scheduling_class(&test),
                SchedulingClass::Periodic,
                "Explicit scheduling must dominate trigger flags"
            );
        }

        #[test]
        fn interval_classifies_as_periodic() {
            let mut test = test_def("e2e-interval");
            test.interval = Some("168h".to_string());
            assert_eq!(derive_scheduling_class(&test), SchedulingClass::Periodic);
        }

        #[test]
        fn postsubmit_flag() {
            let mut test = test_def("e2e-post");
            test.postsubmit = true;
            assert_eq!(derive_scheduling_class(&test), SchedulingClass::Postsubmit);
        }

        #[test]
        fn bare_minimum_interval_is_periodic() {
            let mut test = test_def("e2e-throttled");
            test.minimum_interval = Some("24h".to_string());
            assert_eq!(derive_scheduling_class(&test), SchedulingClass::Periodic);
        }

        #[test]
        fn minimum_interval_with_always_run_reclassifies_as_presubmit() {
            let mut test = test_def("e2e-throttled");
            test.minimum_interval = Some("24h".to_string());
            test.always_run = true;
            assert_eq!(derive_scheduling_class(&test), SchedulingClass::Presubmit);
        }

        #[test]
        fn minimum_interval_with_optional_reclassifies_as_presubmit() {
            let mut test = test_def("e2e-throttled");
            test.minimum_interval = Some("24h".to_string());
            test.optional = true;
            assert_eq!(derive_scheduling_class(&test), SchedulingClass::Presubmit);
        }

        #[test]
        fn no_triggers_at_all_is_presubmit() {
            let test = test_def("e2e-plain");
            assert_eq!(derive_scheduling_class(&test), SchedulingClass::Presubmit);
        }

        #[test]
        fn derivation_is_idempotent() {
            let mut test = test_def("e2e-throttled");
            test.minimum_interval = Some("24h".to_string());
            let first = derive_scheduling_class(&test);
            let second = derive_scheduling_class(&test);
            assert_eq!(first, second);
        }
    }

    mod schedule_string {
        use super::*;

        #[test]
        fn explicit_schedules() {
            let mut test = test_def("a");
            test.interval = Some("168h".to_string());
            assert_eq!(schedule_string(&test), "interval: 168h");

            let mut test = test_def("b");
            test.cron = Some("@weekly".to_string());
            assert_eq!(schedule_string(&test), "cron: @weekly");
        }

        #[test]
        fn minimum_interval_only_when_implicit_periodic() {
            let mut test = test_def("c");
            test.minimum_interval = Some("24h".to_string());
            assert_eq!(schedule_string(&test), "minimum_interval: 24h");

            test.always_run = true;
            assert_eq!(
                schedule_string(&test),
                "",
                "Presubmit-triggered jobs carry no schedule"
            );
        }
    }

    mod normalize {
        use super::*;

        #[test]
        fn keeps_allow_listed_profiles_by_substring() {
            let mut test = test_def("e2e-nfv");
            test.steps = Some(TestSteps {
                cluster_profile: Some("openstack-nfv-mecha".to_string()),
                workflow: None,
            });
            let jobs = normalize(&[record(test)], &profiles());
            assert_eq!(jobs.len(), 1, "Suffixed profile names must still match");
        }

        #[test]
        fn drops_other_profiles() {
            let mut test = test_def("e2e-aws");
            test.steps = Some(TestSteps {
                cluster_profile: Some("aws".to_string()),
                workflow: None,
            });
            let jobs = normalize(&[record(test)], &profiles());
            assert!(jobs.is_empty());
        }

        #[test]
        fn drops_records_without_steps() {
            let mut test = test_def("no-steps");
            test.steps = None;
            let jobs = normalize(&[record(test)], &profiles());
            assert!(jobs.is_empty());
        }

        #[test]
        fn skips_unnamed_records_without_aborting() {
            let named = test_def("e2e-ok");
            let unnamed = test_def("");
            let jobs = normalize(&[record(unnamed), record(named)], &profiles());
            assert_eq!(jobs.len(), 1);
            assert_eq!(jobs[0].job_name, "e2e-ok");
        }

        #[test]
        fn empty_input_yields_empty_output() {
            let jobs = normalize(&[], &profiles());
            assert!(jobs.is_empty());
        }

        #[test]
        fn carries_context_and_workflow() {
            let jobs = normalize(&[record(test_def("e2e-ovn"))], &profiles());
            assert_eq!(jobs[0].org, "openshift");
            assert_eq!(jobs[0].branch, "release-4.21");
            assert_eq!(
                jobs[0].workflow.as_deref(),
                Some("openshift-e2e-openstack-ipi")
            );
            assert_eq!(jobs[0].source_file, "installer.yaml");
        }
    }
}
