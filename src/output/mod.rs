mod progress;
mod styling;
mod summary;
mod tables;

pub mod exports;

pub use progress::PhaseProgress;
pub use summary::{print_inventory_summary, print_report};

use styling::{banner_text, muted};

/// Prints the `JobLens` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        banner_text("🔭 JobLens"),
        muted(env!("CARGO_PKG_VERSION")),
        muted("CI Job Correlation Tool")
    );
}
