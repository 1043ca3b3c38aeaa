use crate::stage::Stage;
use crate::ui::icons::{CHECK, CROSS, FILE_NEW, SKIP, SPARKLE};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::{Duration, Instant};

/// Terminal UI for a handout run, rendered via `indicatif` progress bars.
///
/// Two bars are stacked vertically:
/// - Stage bar: how many of the six stages are complete
/// - Agent bar: spinner shown while an agent is working on a stage
pub struct PipelineUI {
    multi: MultiProgress,
    stage_bar: ProgressBar,
    agent_bar: ProgressBar,
    verbose: bool,
}

impl PipelineUI {
    /// Create the UI with the stage bar sized to the full catalog.
    pub fn new(verbose: bool) -> Self {
        let multi = MultiProgress::new();

        let stage_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let stage_bar = multi.add(ProgressBar::new(Stage::ALL.len() as u64));
        stage_bar.set_style(stage_style);
        stage_bar.set_prefix("Stages");

        let agent_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {msg}")
            .expect("progress bar template is a valid static string");

        let agent_bar = multi.add(ProgressBar::new_spinner());
        agent_bar.set_style(agent_style);
        agent_bar.set_prefix(" Agent");

        Self {
            multi,
            stage_bar,
            agent_bar,
            verbose,
        }
    }

    /// Print a line via `MultiProgress`, falling back to `eprintln!` if the rich UI fails.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    pub fn print_header(&self, module: u32, lesson: u32, subject: &str) {
        self.print_line("");
        self.print_line(format!("{}", style("═".repeat(70)).cyan()));
        self.print_line(format!(
            "{} {} module {} lesson {}",
            style("▶").green().bold(),
            style(subject).bold(),
            style(module).yellow().bold(),
            style(lesson).yellow().bold()
        ));
        self.print_line(format!("{}", style("═".repeat(70)).cyan()));
        self.print_line("");
    }

    /// Count stages that were complete before the run started.
    pub fn set_completed(&self, count: u64) {
        self.stage_bar.set_position(count);
    }

    /// Show that `stage` is running and start the spinner.
    pub fn start_stage(&self, stage: Stage, agent: &str) {
        self.stage_bar
            .set_message(format!("{}: {}", style(stage).yellow(), stage.description()));
        self.agent_bar.reset();
        self.agent_bar.set_message(format!(
            "{} is working on {}",
            style(agent).cyan(),
            style(stage).yellow()
        ));
        self.agent_bar.enable_steady_tick(Duration::from_millis(100));
    }

    /// Print a line for a stage that was already complete (verbose only).
    pub fn stage_skipped(&self, stage: Stage) {
        if self.verbose {
            self.print_line(format!(
                "  {} {} {}",
                SKIP,
                style(stage).dim(),
                style("(already complete)").dim()
            ));
        }
    }

    pub fn stage_complete(&self, stage: Stage, artifact: &Path, started: Instant) {
        self.stage_bar.inc(1);
        self.agent_bar.finish_and_clear();
        self.print_line(format!(
            "  {} {} {}",
            CHECK,
            style(stage).green().bold(),
            style(format_elapsed(started.elapsed())).dim()
        ));
        if self.verbose {
            self.print_line(format!("    {} {}", FILE_NEW, style(artifact.display()).dim()));
        }
    }

    pub fn stage_failed(&self, stage: Stage, reason: &str) {
        self.agent_bar.finish_and_clear();
        self.print_line(format!(
            "  {} {} failed: {}",
            CROSS,
            style(stage).red().bold(),
            reason
        ));
    }

    /// Finish the stage bar, pointing at the handout when one was produced.
    pub fn finish(&self, handout: Option<&Path>) {
        self.stage_bar.finish_with_message("done");
        match handout {
            Some(path) => self.print_line(format!(
                "\n{} Handout ready: {}\n",
                SPARKLE,
                style(path.display()).green().bold()
            )),
            None => self.print_line(format!(
                "\n{} Stopped before the final handout\n",
                style("■").yellow()
            )),
        }
    }
}

/// `Xs` under a minute, `Xm Ys` above.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}
