use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis;
use crate::config::Settings;
use crate::model::Job;
use crate::output::{self, exports, PhaseProgress};
use crate::sources::config_tree;
use crate::sources::snapshot::TelemetrySnapshot;
use crate::sources::telemetry::TelemetryClient;

#[derive(Parser)]
#[command(name = "joblens")]
#[command(author, version, about = "CI Job Correlation Tool", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (joblens.{toml,json,yaml,yml} in cwd by default)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a canonical job inventory from a CI config tree
    Extract {
        /// Root of the config tree to scan
        #[arg(short, long)]
        config_dir: PathBuf,

        /// Write the inventory as JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the inventory as CSV to this file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Print a scheduling-class breakdown
        #[arg(long, default_value_t = false)]
        summary: bool,
    },
    /// Fetch telemetry for the configured releases into a snapshot
    Fetch {
        /// Telemetry feed base URL (overrides settings)
        #[arg(short, long, env = "JOBLENS_BASE_URL")]
        base_url: Option<String>,

        /// Snapshot file (defaults to the platform cache directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Refetch even when a snapshot already exists
        #[arg(short, long, default_value_t = false)]
        force: bool,

        /// Print the snapshot to stdout instead of writing it
        #[arg(long, default_value_t = false)]
        no_cache: bool,
    },
    /// Correlate an inventory with telemetry and classify failures
    Analyze {
        /// Job inventory JSON produced by `extract`
        #[arg(short, long)]
        inventory: PathBuf,

        /// Telemetry snapshot (defaults to the platform cache directory)
        #[arg(short, long)]
        telemetry: Option<PathBuf>,

        /// Write the full report as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let settings = Settings::load(self.settings.as_deref())?;

        match &self.command {
            Commands::Extract {
                config_dir,
                output,
                csv,
                summary,
            } => self.execute_extract(&settings, config_dir, output.as_deref(), csv.as_deref(), *summary),
            Commands::Fetch {
                base_url,
                output,
                force,
                no_cache,
            } => {
                self.execute_fetch(&settings, base_url.as_deref(), output.as_deref(), *force, *no_cache)
                    .await
            }
            Commands::Analyze {
                inventory,
                telemetry,
                output,
            } => self.execute_analyze(&settings, inventory, telemetry.as_deref(), output.as_deref()),
        }
    }

    fn execute_extract(
        &self,
        settings: &Settings,
        config_dir: &Path,
        output: Option<&Path>,
        csv: Option<&Path>,
        summary: bool,
    ) -> Result<()> {
        info!("Extracting job inventory from {}", config_dir.display());

        let records = config_tree::scan(config_dir)?;
        let jobs = analysis::normalizer::normalize(&records, &settings.inventory.cluster_profiles);
        info!("Normalized {} jobs from {} raw records", jobs.len(), records.len());

        if let Some(csv_path) = csv {
            let mut file = fs::File::create(csv_path)
                .with_context(|| format!("Failed to create {}", csv_path.display()))?;
            exports::export_inventory_csv(&jobs, &mut file)?;
            info!("Inventory CSV written to: {}", csv_path.display());
        }

        if let Some(output_path) = output {
            let mut file = fs::File::create(output_path)
                .with_context(|| format!("Failed to create {}", output_path.display()))?;
            exports::export_inventory_json(&jobs, self.pretty, &mut file)?;
            info!("Inventory written to: {}", output_path.display());
        } else if !summary {
            exports::export_inventory_json(&jobs, self.pretty, &mut std::io::stdout())?;
        }

        if summary {
            output::print_inventory_summary(&jobs);
        }

        Ok(())
    }

    async fn execute_fetch(
        &self,
        settings: &Settings,
        base_url: Option<&str>,
        output: Option<&Path>,
        force: bool,
        no_cache: bool,
    ) -> Result<()> {
        let snapshot_path = match output {
            Some(path) => path.to_path_buf(),
            None => TelemetrySnapshot::default_path()?,
        };

        if !force && !no_cache && snapshot_path.exists() {
            info!(
                "Snapshot already exists at {}, use --force to refetch",
                snapshot_path.display()
            );
            return Ok(());
        }

        let base_url = base_url.unwrap_or(&settings.telemetry.base_url);
        let releases = &settings.releases.telemetry_releases;
        info!("Fetching telemetry for {} releases from {base_url}", releases.len());

        let client = TelemetryClient::new(base_url, &settings.telemetry.name_filter)?;
        let fetched = client.fetch_all(releases).await;
        let snapshot = TelemetrySnapshot::new(
            fetched.records_by_release,
            fetched.platform_totals_by_release,
        );

        if no_cache {
            let json = if self.pretty {
                serde_json::to_string_pretty(&snapshot)?
            } else {
                serde_json::to_string(&snapshot)?
            };
            println!("{json}");
        } else {
            snapshot.save(&snapshot_path)?;
        }

        Ok(())
    }

    fn execute_analyze(
        &self,
        settings: &Settings,
        inventory: &Path,
        telemetry: Option<&Path>,
        output: Option<&Path>,
    ) -> Result<()> {
        let progress = PhaseProgress::start_phase_1();

        if !inventory.exists() {
            bail!("job inventory not found: {}", inventory.display());
        }
        let contents = fs::read_to_string(inventory)
            .with_context(|| format!("Failed to read {}", inventory.display()))?;
        let jobs: Vec<Job> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse job inventory {}", inventory.display()))?;

        let snapshot_path = match telemetry {
            Some(path) => path.to_path_buf(),
            None => TelemetrySnapshot::default_path()?,
        };
        // Absent telemetry degrades every job to has_telemetry = false.
        let snapshot = match TelemetrySnapshot::load(&snapshot_path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("No usable telemetry snapshot ({e}), analyzing without telemetry");
                TelemetrySnapshot::new(Default::default(), Default::default())
            }
        };
        let records = snapshot.flattened();

        let progress = progress.finish_phase_1_start_phase_2();
        info!(
            "Analyzing {} jobs against {} telemetry records",
            jobs.len(),
            records.len()
        );

        let baseline = analysis::platforms::platform_of(&settings.telemetry.name_filter)
            .unwrap_or("OpenStack");
        let report = analysis::run(
            &jobs,
            &records,
            &settings.releases.active_branches,
            &snapshot.platform_totals_by_release,
            baseline,
        );

        let progress = progress.finish_phase_2_start_phase_3();
        progress.finish_phase_3();

        output::print_report(&report);

        if let Some(output_path) = output {
            let mut file = fs::File::create(output_path)
                .with_context(|| format!("Failed to create {}", output_path.display()))?;
            exports::export_report_json(&report, self.pretty, &mut file)?;
            info!("Report written to: {}", output_path.display());
        }

        Ok(())
    }
}
