use anyhow::Result;
use std::io::Write;

use crate::model::Job;
use crate::report::AnalysisReport;

/// Exports the analysis report as JSON for programmatic consumers.
pub fn export_report_json(
    report: &AnalysisReport,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    writeln!(output, "{}", json)?;
    Ok(())
}

/// Exports an extracted job inventory as JSON.
pub fn export_inventory_json(jobs: &[Job], pretty: bool, output: &mut dyn Write) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(jobs)?
    } else {
        serde_json::to_string(jobs)?
    };
    writeln!(output, "{}", json)?;
    Ok(())
}

/// Exports an extracted job inventory as CSV for spreadsheet analysis.
pub fn export_inventory_csv(jobs: &[Job], output: &mut dyn Write) -> Result<()> {
    writeln!(
        output,
        "Job Name,Org,Repo,Branch,Variant,Cluster Profile,Workflow,Scheduling Class,Schedule,Optional,Always Run,Source File"
    )?;

    for job in jobs {
        writeln!(
            output,
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            csv_field(&job.job_name),
            csv_field(&job.org),
            csv_field(&job.repo),
            csv_field(&job.branch),
            csv_field(&job.variant),
            csv_field(&job.cluster_profile),
            csv_field(job.workflow.as_deref().unwrap_or("")),
            job.scheduling_class,
            csv_field(&job.schedule),
            job.optional,
            job.always_run,
            csv_field(&job.source_file)
        )?;
    }

    Ok(())
}

/// Quotes a field when it contains a delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
