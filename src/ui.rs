//! Startup progress on stderr.
//!
//! Opening the camera and loading the model can take seconds, so each step is
//! reported as a stage: a spinner on an interactive terminal, plain
//! `==> name` lines otherwise.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const SPINNER_TICK: Duration = Duration::from_millis(120);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
}

impl Ui {
    pub fn new(mode: UiMode) -> Self {
        Self { mode }
    }

    /// Spinners only when stderr is a terminal.
    pub fn detect() -> Self {
        Self::new(if std::io::stderr().is_terminal() {
            UiMode::Pretty
        } else {
            UiMode::Plain
        })
    }

    pub fn mode(&self) -> UiMode {
        self.mode
    }

    /// Start a stage; it is reported finished when the guard drops.
    pub fn stage(&self, name: &str) -> StageGuard {
        let spinner = match self.mode {
            UiMode::Pretty => Some(stage_spinner(name)),
            UiMode::Plain => {
                eprintln!("==> {name}");
                None
            }
        };
        StageGuard {
            name: name.to_owned(),
            started: Instant::now(),
            spinner,
            failed: false,
        }
    }
}

fn stage_spinner(name: &str) -> ProgressBar {
    let spinner = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("{name}…"));
    spinner.enable_steady_tick(SPINNER_TICK);
    spinner
}

pub struct StageGuard {
    name: String,
    started: Instant,
    spinner: Option<ProgressBar>,
    failed: bool,
}

impl StageGuard {
    /// Mark the stage as failed; the closing line says so.
    pub fn fail(mut self) {
        self.failed = true;
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let mark = if self.failed { '✘' } else { '✔' };
        let line = format!("{mark} {} ({})", self.name, elapsed_label(self.started.elapsed()));
        match self.spinner.take() {
            Some(spinner) => spinner.finish_with_message(line),
            None => eprintln!("{line}"),
        }
    }
}

fn elapsed_label(elapsed: Duration) -> String {
    match elapsed.as_millis() {
        ms @ 0..=999 => format!("{ms}ms"),
        _ => format!("{:.2}s", elapsed.as_secs_f64()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_switches_units_at_one_second() {
        assert_eq!(elapsed_label(Duration::from_millis(250)), "250ms");
        assert_eq!(elapsed_label(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn plain_stage_finishes_on_drop() {
        let ui = Ui::new(UiMode::Plain);
        assert_eq!(ui.mode(), UiMode::Plain);
        ui.stage("load feature extractor").fail();
    }
}
