use std::fmt::Write;

use crate::analysis::count_by_class;
use crate::model::Job;
use crate::report::{AnalysisReport, FailureCategory};

use super::styling::{accent, attention, bad, good, heading, muted};
use super::tables::{
    baseline_delta_cell, create_cyan_header, create_table, pass_rate_cell, severity_cell,
    trend_cell,
};

/// Prints a human-readable summary of an analysis run to stdout.
///
/// Displays color-coded tables showing:
/// - Overview: inventory size, scheduling classes, identity-match stats
/// - Release Health: aggregate pass rates per release
/// - Platform Standing: cross-platform pass-rate ranking (when available)
/// - Scenario Health: aggregate pass rates per scenario tag
/// - Coverage Gaps: jobs missing from part of their repo's active releases
/// - Redundant Triggers: distinct jobs sharing one trigger tuple
/// - Trigger Hygiene: presubmits without change filters or throttling
/// - Problem Jobs: worst offenders per failure category
pub fn print_report(report: &AnalysisReport) {
    println!("{}", render_report(report));
}

/// Prints the scheduling-class breakdown of an extracted inventory.
pub fn print_inventory_summary(jobs: &[Job]) {
    println!("{}", render_inventory_summary(jobs));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", heading(emoji), heading(title).underlined());
}

#[allow(clippy::too_many_lines, clippy::format_push_string)]
fn render_report(report: &AnalysisReport) -> String {
    let mut output = String::new();

    // Overview section
    add_section_header(&mut output, "📊", "Overview");

    let class_line = report
        .jobs_by_class
        .iter()
        .map(|(class, count)| format!("{count} {class}"))
        .collect::<Vec<_>>()
        .join(", ");

    output.push_str(&format!(
        "  {} {}\n  {} {}\n  {} {} matched, {} unmatched, {} ambiguous\n  {} {}\n\n",
        muted("Jobs in inventory:"),
        attention(report.total_jobs),
        muted("Scheduling classes:"),
        accent(class_line),
        muted("Telemetry identities:"),
        good(report.match_stats.matched),
        bad(report.match_stats.unmatched),
        attention(report.match_stats.multi_candidate),
        muted("Analysis date:"),
        muted(report.generated_at.format("%Y-%m-%d %H:%M UTC"))
    ));

    if report.total_jobs == 0 {
        output.push_str(&format!("{}\n", attention("No jobs found.")));
        return output;
    }

    // Release Health
    if !report.release_summaries.is_empty() {
        add_section_header(&mut output, "🚦", "Release Health");

        let mut table = create_table();
        table.set_header(create_cyan_header(&[
            "Release", "Jobs", "Runs", "Passes", "Pass Rate", "Trend",
        ]));
        for summary in &report.release_summaries {
            table.add_row(vec![
                comfy_table::Cell::new(&summary.release),
                comfy_table::Cell::new(summary.job_count),
                comfy_table::Cell::new(summary.combined_runs),
                comfy_table::Cell::new(summary.combined_passes),
                pass_rate_cell(summary.combined_pass_rate),
                trend_cell(summary.trend),
            ]);
        }
        output.push_str(&format!("{table}\n\n"));
    }

    // Platform Standing
    if let Some(comparison) = &report.platform_comparison {
        add_section_header(&mut output, "🌐", "Platform Standing");

        if let Some(rank) = comparison.baseline_rank {
            output.push_str(&format!(
                "  {} {} ranks #{rank} of {} platforms by pass rate\n",
                muted("Baseline:"),
                attention(&comparison.baseline),
                comparison.standings.len()
            ));
        }

        let mut table = create_table();
        table.set_header(create_cyan_header(&[
            "Rank", "Platform", "Jobs", "Runs", "Pass Rate", "vs Baseline",
        ]));
        for (idx, standing) in comparison.standings.iter().enumerate() {
            table.add_row(vec![
                comfy_table::Cell::new(idx + 1),
                comfy_table::Cell::new(&standing.platform),
                comfy_table::Cell::new(standing.job_count),
                comfy_table::Cell::new(standing.total_runs),
                pass_rate_cell(standing.pass_rate),
                baseline_delta_cell(
                    standing.vs_baseline,
                    standing.platform == comparison.baseline,
                ),
            ]);
        }
        output.push_str(&format!("{table}\n"));

        if !comparison.by_release.is_empty() {
            let mut headers = vec!["Release".to_string()];
            headers.extend(comparison.standings.iter().map(|s| s.platform.clone()));

            let mut table = create_table();
            table.set_header(create_cyan_header(
                &headers.iter().map(String::as_str).collect::<Vec<_>>(),
            ));
            for (release, rows) in &comparison.by_release {
                let mut cells = vec![comfy_table::Cell::new(release)];
                for standing in &comparison.standings {
                    let rate = rows
                        .iter()
                        .find(|row| row.platform == standing.platform)
                        .and_then(|row| row.pass_rate);
                    cells.push(pass_rate_cell(rate));
                }
                table.add_row(cells);
            }
            output.push_str(&format!("{table}\n"));
        }
        output.push('\n');
    }

    // Scenario Health
    if !report.scenario_summaries.is_empty() {
        add_section_header(&mut output, "🧪", "Scenario Health");

        let mut table = create_table();
        table.set_header(create_cyan_header(&[
            "Scenario", "Jobs", "Runs", "Pass Rate", "Problems", "Trend", "Severity",
        ]));
        for summary in &report.scenario_summaries {
            table.add_row(vec![
                comfy_table::Cell::new(&summary.scenario),
                comfy_table::Cell::new(summary.job_count),
                comfy_table::Cell::new(summary.combined_runs),
                pass_rate_cell(summary.pass_rate),
                comfy_table::Cell::new(summary.problem_jobs),
                trend_cell(summary.trend),
                severity_cell(summary.severity),
            ]);
        }
        output.push_str(&format!("{table}\n\n"));
    }

    // Coverage Gaps
    add_section_header(&mut output, "🕳️", "Coverage Gaps");
    if report.coverage_gaps.is_empty() {
        output.push_str(&format!(
            "  {}\n\n",
            good("Every job covers all of its repo's active releases.")
        ));
    } else {
        let mut table = create_table();
        table.set_header(create_cyan_header(&["Repo", "Job", "Present", "Missing"]));
        for gap in report.coverage_gaps.iter().take(15) {
            table.add_row(vec![
                comfy_table::Cell::new(format!("{}/{}", gap.org, gap.repo)),
                comfy_table::Cell::new(&gap.job_name),
                comfy_table::Cell::new(gap.present.join("\n")),
                comfy_table::Cell::new(gap.missing.join("\n"))
                    .fg(comfy_table::Color::Red),
            ]);
        }
        if report.coverage_gaps.len() > 15 {
            table.add_row(vec![comfy_table::Cell::new(format!(
                "... and {} more",
                report.coverage_gaps.len() - 15
            ))
            .fg(comfy_table::Color::DarkGrey)]);
        }
        output.push_str(&format!("{table}\n\n"));
    }

    // Redundant Triggers
    add_section_header(&mut output, "♻️", "Redundant Triggers");
    if report.redundancy_groups.is_empty() {
        output.push_str(&format!(
            "  {}\n\n",
            good("No overlapping triggers on a single branch.")
        ));
    } else {
        let mut table = create_table();
        table.set_header(create_cyan_header(&[
            "Repo", "Branch", "Workflow", "Profile", "Jobs",
        ]));
        for group in &report.redundancy_groups {
            table.add_row(vec![
                comfy_table::Cell::new(format!("{}/{}", group.org, group.repo)),
                comfy_table::Cell::new(&group.branch),
                comfy_table::Cell::new(&group.workflow),
                comfy_table::Cell::new(&group.cluster_profile),
                comfy_table::Cell::new(group.job_names.join("\n")),
            ]);
        }
        output.push_str(&format!("{table}\n\n"));
    }

    // Trigger Hygiene
    add_section_header(&mut output, "🎛️", "Trigger Hygiene");
    let findings = &report.trigger_findings;
    if findings.usage.presubmit_total == 0 {
        output.push_str(&format!(
            "  {}\n\n",
            muted("No presubmit jobs in the inventory.")
        ));
    } else {
        let usage = &findings.usage;
        let total = usage.presubmit_total;
        let pct = |count: usize| count as f64 / total as f64 * 100.0;

        let mut table = create_table();
        table.set_header(create_cyan_header(&["Pattern", "Jobs", "% of Presubmits"]));
        let rows: [(&str, usize); 5] = [
            ("skip_if_only_changed", usage.with_skip_filter),
            ("run_if_changed", usage.with_run_if_changed),
            ("minimum_interval", usage.with_minimum_interval),
            ("always_run", usage.always_run),
            ("optional", usage.optional),
        ];
        for (pattern, count) in rows {
            table.add_row(vec![
                comfy_table::Cell::new(pattern),
                comfy_table::Cell::new(count),
                comfy_table::Cell::new(format!("{:.1}%", pct(count))),
            ]);
        }
        let unfiltered_cell = if usage.unfiltered > 0 {
            comfy_table::Cell::new(usage.unfiltered).fg(comfy_table::Color::Red)
        } else {
            comfy_table::Cell::new(usage.unfiltered).fg(comfy_table::Color::Green)
        };
        table.add_row(vec![
            comfy_table::Cell::new("no filter at all"),
            unfiltered_cell,
            comfy_table::Cell::new(format!("{:.1}%", pct(usage.unfiltered))),
        ]);
        output.push_str(&format!("{table}\n"));

        if !findings.unfiltered_repos.is_empty() {
            output.push_str(&format!(
                "  {} repo(s) could adopt a skip filter:\n",
                attention(findings.unfiltered_repos.len())
            ));
            let mut table = create_table();
            table.set_header(create_cyan_header(&["Repo", "Presubmits", "Unfiltered", "Jobs"]));
            for repo in findings.unfiltered_repos.iter().take(10) {
                table.add_row(vec![
                    comfy_table::Cell::new(format!("{}/{}", repo.org, repo.repo)),
                    comfy_table::Cell::new(repo.presubmit_total),
                    comfy_table::Cell::new(repo.unfiltered).fg(comfy_table::Color::Red),
                    comfy_table::Cell::new(repo.job_names.join("\n")),
                ]);
            }
            if findings.unfiltered_repos.len() > 10 {
                table.add_row(vec![comfy_table::Cell::new(format!(
                    "... and {} more",
                    findings.unfiltered_repos.len() - 10
                ))
                .fg(comfy_table::Color::DarkGrey)]);
            }
            output.push_str(&format!("{table}\n"));
        }

        if !findings.unthrottled_always_run.is_empty() {
            output.push_str(&format!(
                "  {} always-run presubmit(s) have no minimum-interval throttle\n",
                attention(findings.unthrottled_always_run.len())
            ));
        }
        output.push_str(&format!(
            "  {} {}\n\n",
            muted("Suggested skip filter:"),
            accent(&findings.suggested_skip_pattern)
        ));
    }

    // Problem jobs, worst category first
    for category in FailureCategory::ALL {
        if !category.is_problem() {
            continue;
        }
        let Some(jobs) = report.categories.get(&category) else {
            continue;
        };
        if jobs.is_empty() {
            continue;
        }

        add_section_header(&mut output, "🔧", &format!("Problem Jobs: {category}"));

        let mut table = create_table();
        table.set_header(create_cyan_header(&[
            "#", "Job", "Release", "Runs", "Pass Rate", "Trend", "Reason",
        ]));
        for (idx, job) in jobs.iter().take(10).enumerate() {
            table.add_row(vec![
                comfy_table::Cell::new(idx + 1),
                comfy_table::Cell::new(&job.brief_name),
                comfy_table::Cell::new(&job.release),
                comfy_table::Cell::new(job.combined_runs),
                pass_rate_cell(job.combined_pass_rate),
                trend_cell(job.trend),
                comfy_table::Cell::new(&job.reason),
            ]);
        }
        if jobs.len() > 10 {
            table.add_row(vec![comfy_table::Cell::new(format!(
                "... and {} more",
                jobs.len() - 10
            ))
            .fg(comfy_table::Color::DarkGrey)]);
        }
        output.push_str(&format!("{table}\n\n"));
    }

    // Category roll-up
    add_section_header(&mut output, "💡", "Next Steps");
    let summary = &report.category_summary;
    if summary.total_problem_jobs == 0 {
        output.push_str(&format!(
            "  {}\n",
            good("No problem jobs. Nothing to triage.")
        ));
    } else {
        output.push_str(&format!(
            "  {} problem job(s) across categories:\n",
            bad(summary.total_problem_jobs)
        ));
        for (category, percentage) in &summary.percentages {
            let count = summary.by_category.get(category).copied().unwrap_or(0);
            if count == 0 {
                continue;
            }
            output.push_str(&format!(
                "  {} {}: {} ({percentage:.0}%)\n",
                accent("•"),
                category,
                attention(count)
            ));
        }
        output.push_str(&format!(
            "  {} Start with {} jobs - they block signal for everything else\n",
            accent("•"),
            attention("infrastructure")
        ));
    }

    output
}

fn render_inventory_summary(jobs: &[Job]) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📋", "Job Inventory");
    output.push_str(&format!(
        "  {} {}\n\n",
        muted("Jobs extracted:"),
        attention(jobs.len())
    ));

    if jobs.is_empty() {
        output.push_str(&format!("{}\n", attention("No jobs found.")));
        return output;
    }

    let mut table = create_table();
    table.set_header(create_cyan_header(&["Scheduling Class", "Jobs"]));
    for (class, count) in count_by_class(jobs) {
        table.add_row(vec![
            comfy_table::Cell::new(class.to_string()),
            comfy_table::Cell::new(count),
        ]);
    }
    output.push_str(&format!("{table}\n"));

    output
}
