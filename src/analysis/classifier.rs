use indexmap::IndexMap;

use crate::model::{EnrichedJob, Trend};
use crate::report::{CategorizedJob, CategorySummary, FailureCategory};

/// Name fragments indicating the failure happens before the product is even
/// exercised.
const INFRA_KEYWORDS: &[&str] = &[
    "install",
    "provision",
    "bootstrap",
    "create",
    "vpc",
    "network",
    "dns",
    "loadbalancer",
    "lb",
];

/// Components with a known history of product-side failures.
const COMPONENT_KEYWORDS: &[&str] = &["etcd", "scaling"];

/// Signals the decision table evaluates, extracted once per job.
struct Signals {
    runs: u64,
    rate: Option<f64>,
    bugs: u64,
    trend: Trend,
    name: String,
    brief_name: String,
}

impl Signals {
    fn from_job(job: &EnrichedJob) -> Self {
        Self {
            runs: job.combined_runs.unwrap_or(0),
            rate: job.combined_pass_rate,
            bugs: job.open_bug_count.unwrap_or(0),
            trend: job.trend,
            name: job.job.job_name.to_lowercase(),
            brief_name: job
                .brief_name
                .as_deref()
                .unwrap_or_default()
                .to_lowercase(),
        }
    }

    /// Keyword scan over both the full and the brief name.
    fn keyword_in_either(&self, keywords: &[&'static str]) -> Option<&'static str> {
        keywords
            .iter()
            .copied()
            .find(|keyword| self.name.contains(keyword) || self.brief_name.contains(keyword))
    }

    /// Keyword scan over the full job name only.
    fn keyword_in_name(&self, keywords: &[&'static str]) -> Option<&'static str> {
        keywords
            .iter()
            .copied()
            .find(|keyword| self.name.contains(keyword))
    }
}

type Outcome = (FailureCategory, String);
type Rule = fn(&Signals) -> Option<Outcome>;

/// The classification decision table. Order is load-bearing: ranges overlap
/// across rules and the first match wins.
const RULES: &[Rule] = &[
    insufficient_data,
    passing,
    zero_pass_rate,
    infrastructure_failure,
    flaky_band,
    low_rate_with_bugs,
    problem_component,
    tech_preview,
    low_rate_unexplained,
    upper_band,
    fallback,
];

fn insufficient_data(s: &Signals) -> Option<Outcome> {
    if s.runs < 2 || s.rate.is_none() {
        Some((
            FailureCategory::InsufficientData,
            format!("only {} run(s) in the combined window", s.runs),
        ))
    } else {
        None
    }
}

fn passing(s: &Signals) -> Option<Outcome> {
    let rate = s.rate?;
    if rate >= 80.0 {
        Some((
            FailureCategory::Passing,
            format!("{rate:.1}% combined pass rate"),
        ))
    } else {
        None
    }
}

fn zero_pass_rate(s: &Signals) -> Option<Outcome> {
    let rate = s.rate?;
    if rate != 0.0 {
        return None;
    }
    if s.bugs > 0 {
        Some((
            FailureCategory::ProductBug,
            format!("0% pass rate with {} open bug(s)", s.bugs),
        ))
    } else {
        Some((
            FailureCategory::NeedsTriage,
            "0% pass rate with no bugs filed".to_string(),
        ))
    }
}

fn infrastructure_failure(s: &Signals) -> Option<Outcome> {
    let rate = s.rate?;
    if rate < 30.0 {
        let keyword = s.keyword_in_either(INFRA_KEYWORDS)?;
        Some((
            FailureCategory::Infrastructure,
            format!("{rate:.1}% pass rate, name indicates {keyword} failures"),
        ))
    } else {
        None
    }
}

fn flaky_band(s: &Signals) -> Option<Outcome> {
    let rate = s.rate?;
    if !(30.0..70.0).contains(&rate) {
        return None;
    }
    let reason = match s.trend {
        Trend::Degrading => format!("{rate:.1}% pass rate and degrading"),
        Trend::Improving => format!("{rate:.1}% pass rate but improving"),
        Trend::Stable => format!("intermittent failures at {rate:.1}% pass rate"),
    };
    Some((FailureCategory::Flaky, reason))
}

fn low_rate_with_bugs(s: &Signals) -> Option<Outcome> {
    let rate = s.rate?;
    if rate < 50.0 && s.bugs > 0 {
        Some((
            FailureCategory::ProductBug,
            format!("low pass rate with {} open bug(s)", s.bugs),
        ))
    } else {
        None
    }
}

fn problem_component(s: &Signals) -> Option<Outcome> {
    let keyword = s.keyword_in_name(COMPONENT_KEYWORDS)?;
    Some((
        FailureCategory::ProductBug,
        format!("exercises known problem component: {keyword}"),
    ))
}

fn tech_preview(s: &Signals) -> Option<Outcome> {
    if s.name.contains("techpreview") {
        Some((
            FailureCategory::NeedsTriage,
            "tech-preview feature, expected instability".to_string(),
        ))
    } else {
        None
    }
}

fn low_rate_unexplained(s: &Signals) -> Option<Outcome> {
    let rate = s.rate?;
    if rate < 30.0 {
        Some((
            FailureCategory::NeedsTriage,
            format!("{rate:.1}% pass rate with no clear signal"),
        ))
    } else {
        None
    }
}

fn upper_band(s: &Signals) -> Option<Outcome> {
    let rate = s.rate?;
    if !(70.0..80.0).contains(&rate) {
        return None;
    }
    if s.trend == Trend::Degrading {
        Some((
            FailureCategory::NeedsTriage,
            format!("{rate:.1}% pass rate and degrading"),
        ))
    } else {
        Some((
            FailureCategory::Flaky,
            format!("{rate:.1}% pass rate, borderline"),
        ))
    }
}

fn fallback(s: &Signals) -> Option<Outcome> {
    Some((
        FailureCategory::NeedsTriage,
        format!(
            "{} pass rate matched no classification rule",
            s.rate.map_or_else(|| "undefined".to_string(), |r| format!("{r:.1}%"))
        ),
    ))
}

/// Classifies one telemetry-backed job. Jobs without telemetry are not
/// classifiable and yield `None`.
pub fn classify(job: &EnrichedJob) -> Option<CategorizedJob> {
    if !job.has_telemetry {
        return None;
    }

    let signals = Signals::from_job(job);
    let (category, reason) = evaluate(&signals);

    Some(CategorizedJob {
        job_name: job.job.job_name.clone(),
        brief_name: job.brief_name.clone().unwrap_or_default(),
        release: job.release.clone().unwrap_or_default(),
        combined_runs: signals.runs,
        combined_pass_rate: job.combined_pass_rate,
        current_pass_rate: job.current_pass_rate,
        open_bug_count: signals.bugs,
        trend: job.trend,
        category,
        reason,
    })
}

fn evaluate(signals: &Signals) -> Outcome {
    for rule in RULES {
        if let Some(outcome) = rule(signals) {
            return outcome;
        }
    }
    // The fallback rule is total, so this is unreachable.
    (
        FailureCategory::NeedsTriage,
        "no classification rule matched".to_string(),
    )
}

/// Classifies every telemetry-backed job and buckets the results.
///
/// Buckets follow [`FailureCategory::ALL`] order; within each bucket jobs
/// sort by combined pass rate ascending so the worst offenders lead.
pub fn categorize(
    enriched: &[EnrichedJob],
) -> (IndexMap<FailureCategory, Vec<CategorizedJob>>, CategorySummary) {
    let mut categories: IndexMap<FailureCategory, Vec<CategorizedJob>> = FailureCategory::ALL
        .into_iter()
        .map(|category| (category, Vec::new()))
        .collect();

    for job in enriched {
        if let Some(categorized) = classify(job) {
            categories
                .entry(categorized.category)
                .or_default()
                .push(categorized);
        }
    }

    for bucket in categories.values_mut() {
        bucket.sort_by(|a, b| {
            match (a.combined_pass_rate, b.combined_pass_rate) {
                (Some(ra), Some(rb)) => ra.partial_cmp(&rb).unwrap_or(std::cmp::Ordering::Equal),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
    }

    let summary = summarize(&categories);
    (categories, summary)
}

fn summarize(categories: &IndexMap<FailureCategory, Vec<CategorizedJob>>) -> CategorySummary {
    let by_category: IndexMap<FailureCategory, usize> = categories
        .iter()
        .map(|(category, jobs)| (*category, jobs.len()))
        .collect();

    let total_problem_jobs: usize = by_category
        .iter()
        .filter(|(category, _)| category.is_problem())
        .map(|(_, count)| count)
        .sum();

    let percentages = if total_problem_jobs > 0 {
        by_category
            .iter()
            .filter(|(category, _)| category.is_problem())
            .map(|(category, count)| {
                (*category, *count as f64 / total_problem_jobs as f64 * 100.0)
            })
            .collect()
    } else {
        IndexMap::new()
    };

    CategorySummary {
        total_problem_jobs,
        by_category,
        percentages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Job, SchedulingClass};

    fn base_job(name: &str) -> Job {
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
            scheduling_class: SchedulingClass::Periodic,
            schedule: String::new(),
            source_file: String::new(),
        }
    }

    fn enriched(name: &str, runs: u64, passes: u64, bugs: u64, trend: Trend) -> EnrichedJob {
        let rate = if runs > 0 {
            Some(passes as f64 / runs as f64 * 100.0)
        } else {
            None
        };
        EnrichedJob {
            job: base_job(name),
            scenario: "e2e-default".to_string(),
            has_telemetry: true,
            release: Some("4.21".to_string()),
            brief_name: Some(name.to_string()),
            current_runs: Some(runs),
            current_passes: Some(passes),
            previous_runs: Some(0),
            previous_passes: Some(0),
            combined_runs: Some(runs),
            combined_passes: Some(passes),
            current_pass_rate: rate,
            previous_pass_rate: None,
            combined_pass_rate: rate,
            trend,
            open_bug_count: Some(bugs),
        }
    }

    fn category_of(job: &EnrichedJob) -> FailureCategory {
        classify(job).unwrap().category
    }

    #[test]
    fn fewer_than_two_runs_is_insufficient_data() {
        let job = enriched("e2e-rare", 1, 1, 0, Trend::Stable);
        assert_eq!(category_of(&job), FailureCategory::InsufficientData);
    }

    #[test]
    fn undefined_rate_is_insufficient_data() {
        let job = enriched("e2e-silent", 0, 0, 0, Trend::Stable);
        assert_eq!(category_of(&job), FailureCategory::InsufficientData);
    }

    #[test]
    fn eighty_percent_exactly_is_passing() {
        let job = enriched("e2e-good", 10, 8, 0, Trend::Stable);
        assert_eq!(category_of(&job), FailureCategory::Passing);
    }

    #[test]
    fn zero_rate_with_bugs_beats_infrastructure_keyword() {
        let job = enriched("install-e2e-openstack", 10, 0, 2, Trend::Stable);
        assert_eq!(
            category_of(&job),
            FailureCategory::ProductBug,
            "Rule order must dominate keyword tests"
        );
    }

    #[test]
    fn zero_rate_without_bugs_needs_triage() {
        let job = enriched("e2e-dead", 10, 0, 0, Trend::Stable);
        assert_eq!(category_of(&job), FailureCategory::NeedsTriage);
    }

    #[test]
    fn low_rate_with_infra_keyword_is_infrastructure() {
        let job = enriched("e2e-provision-openstack", 10, 2, 0, Trend::Stable);
        assert_eq!(category_of(&job), FailureCategory::Infrastructure);
    }

    #[test]
    fn midband_is_flaky_regardless_of_trend() {
        for trend in [Trend::Improving, Trend::Degrading, Trend::Stable] {
            let job = enriched("e2e-mid", 10, 5, 0, trend);
            assert_eq!(category_of(&job), FailureCategory::Flaky);
        }
    }

    #[test]
    fn low_rate_with_bugs_but_no_keyword_is_product_bug() {
        let job = enriched("e2e-quiet", 10, 2, 1, Trend::Stable);
        assert_eq!(category_of(&job), FailureCategory::ProductBug);
    }

    #[test]
    fn problem_component_keyword_is_product_bug() {
        let job = enriched("e2e-etcd-recovery", 10, 7, 0, Trend::Stable);
        assert_eq!(category_of(&job), FailureCategory::ProductBug);
    }

    #[test]
    fn techpreview_needs_triage() {
        let job = enriched("e2e-techpreview-features", 10, 7, 0, Trend::Improving);
        assert_eq!(category_of(&job), FailureCategory::NeedsTriage);
    }

    #[test]
    fn component_keyword_in_brief_name_only_does_not_match() {
        let mut job = enriched("e2e-quiet", 1000, 750, 0, Trend::Stable);
        job.brief_name = Some("e2e-etcd-recovery".to_string());
        assert_eq!(
            category_of(&job),
            FailureCategory::Flaky,
            "Component keywords key on the full job name, not the brief name"
        );
    }

    #[test]
    fn techpreview_in_brief_name_only_does_not_match() {
        let mut job = enriched("e2e-quiet", 1000, 750, 0, Trend::Stable);
        job.brief_name = Some("e2e-techpreview".to_string());
        assert_eq!(
            category_of(&job),
            FailureCategory::Flaky,
            "The tech-preview marker keys on the full job name, not the brief name"
        );
    }

    #[test]
    fn infra_keyword_in_brief_name_still_matches() {
        let mut job = enriched("e2e-quiet", 10, 2, 0, Trend::Stable);
        job.brief_name = Some("e2e-provision".to_string());
        assert_eq!(category_of(&job), FailureCategory::Infrastructure);
    }

    #[test]
    fn low_rate_without_signals_needs_triage() {
        let job = enriched("e2e-quiet", 10, 2, 0, Trend::Stable);
        assert_eq!(category_of(&job), FailureCategory::NeedsTriage);
    }

    #[test]
    fn upper_band_depends_on_trend() {
        let degrading = enriched("e2e-border", 1000, 799, 0, Trend::Degrading);
        assert_eq!(category_of(&degrading), FailureCategory::NeedsTriage);

        let stable = enriched("e2e-border", 1000, 799, 0, Trend::Stable);
        assert_eq!(
            category_of(&stable),
            FailureCategory::Flaky,
            "79.9% belongs to the 70-80 band, not the 30-70 band"
        );
    }

    #[test]
    fn jobs_without_telemetry_are_not_classified() {
        let job = EnrichedJob::unmatched(base_job("e2e-unknown"), "e2e-default".to_string());
        assert!(classify(&job).is_none());
    }

    mod categorize {
        use super::*;

        #[test]
        fn buckets_sort_worst_first() {
            let jobs = vec![
                enriched("e2e-a", 10, 6, 0, Trend::Stable),
                enriched("e2e-b", 10, 4, 0, Trend::Stable),
            ];
            let (categories, _) = categorize(&jobs);
            let flaky = &categories[&FailureCategory::Flaky];
            assert_eq!(flaky.len(), 2);
            assert_eq!(flaky[0].job_name, "e2e-b");
            assert_eq!(flaky[1].job_name, "e2e-a");
        }

        #[test]
        fn summary_counts_problems_only() {
            let jobs = vec![
                enriched("e2e-pass", 10, 9, 0, Trend::Stable),
                enriched("e2e-flaky", 10, 5, 0, Trend::Stable),
                enriched("e2e-rare", 1, 1, 0, Trend::Stable),
            ];
            let (_, summary) = categorize(&jobs);
            assert_eq!(summary.total_problem_jobs, 1);
            assert_eq!(summary.by_category[&FailureCategory::Passing], 1);
            assert_eq!(summary.by_category[&FailureCategory::InsufficientData], 1);
            assert_eq!(summary.percentages[&FailureCategory::Flaky], 100.0);
        }

        #[test]
        fn empty_input_yields_empty_buckets() {
            let (categories, summary) = categorize(&[]);
            assert!(categories.values().all(Vec::is_empty));
            assert_eq!(summary.total_problem_jobs, 0);
            assert!(summary.percentages.is_empty());
        }
    }
}
