use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{attention, good, heading};

/// Progress tracking for the multi-phase analysis run
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_phase_1() -> Self {
        eprintln!("{}  {}", heading("⚙️"), heading("Phases").underlined());
        let pb = create_spinner(attention("Phase 1/3: Loading job inventory").to_string());
        Self { pb }
    }

    pub fn finish_phase_1_start_phase_2(self) -> Self {
        self.pb
            .finish_with_message(good("Phase 1/3: Loaded job inventory ✓").to_string());
        let pb = create_spinner(attention("Phase 2/3: Correlating jobs with telemetry").to_string());
        Self { pb }
    }

    pub fn finish_phase_2_start_phase_3(self) -> Self {
        self.pb
            .finish_with_message(good("Phase 2/3: Correlated jobs with telemetry ✓").to_string());
        let pb = create_spinner(attention("Phase 3/3: Classifying failures").to_string());
        Self { pb }
    }

    pub fn finish_phase_3(self) {
        self.pb
            .finish_with_message(good("Phase 3/3: Classification complete ✓").to_string());
        eprintln!("\n");
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap(),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
