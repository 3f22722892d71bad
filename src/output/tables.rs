use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::model::{Severity, Trend};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn pass_rate_cell(rate: Option<f64>) -> Cell {
    match rate {
        None => Cell::new("n/a").fg(TableColor::DarkGrey),
        Some(rate) => {
            let text = format!("{rate:.1}%");
            if rate >= 80.0 {
                Cell::new(text).fg(TableColor::Green)
            } else if rate >= 50.0 {
                Cell::new(text).fg(TableColor::Yellow)
            } else {
                Cell::new(text).fg(TableColor::Red)
            }
        }
    }
}

pub fn trend_cell(trend: Trend) -> Cell {
    let text = format!("{} {}", trend.arrow(), trend);
    match trend {
        Trend::Improving => Cell::new(text).fg(TableColor::Green),
        Trend::Degrading => Cell::new(text).fg(TableColor::Red),
        Trend::Stable => Cell::new(text).fg(TableColor::DarkGrey),
    }
}

/// Signed pass-rate delta against the comparison baseline.
pub fn baseline_delta_cell(delta: Option<f64>, is_baseline: bool) -> Cell {
    if is_baseline {
        return Cell::new("baseline").fg(TableColor::DarkGrey);
    }
    match delta {
        None => Cell::new("n/a").fg(TableColor::DarkGrey),
        Some(delta) => {
            let text = format!("{delta:+.1}%");
            if delta > 0.0 {
                Cell::new(text).fg(TableColor::Green)
            } else if delta < 0.0 {
                Cell::new(text).fg(TableColor::Red)
            } else {
                Cell::new(text).fg(TableColor::DarkGrey)
            }
        }
    }
}

pub fn severity_cell(severity: Severity) -> Cell {
    let text = severity.to_string();
    match severity {
        Severity::Critical => Cell::new(text).fg(TableColor::Red),
        Severity::Warning | Severity::NeedsAttention => Cell::new(text).fg(TableColor::Yellow),
        Severity::Ok => Cell::new(text).fg(TableColor::Green),
    }
}
