//! Operator console: leveled messages, streamed remote output and the
//! progress spinner.
//!
//! The spinner ticks on its own thread while the main thread blocks inside a
//! remote command. It is always stopped before a leveled message is printed,
//! and streamed lines are written through `ProgressBar::suspend` so the two
//! never interleave.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::tools::macros::{print_msg, OutputLevel};

const SPINNER_TICK: Duration = Duration::from_millis(100);

pub trait Console {
    /// Print a leveled message; stops the progress indicator first
    fn print(&mut self, level: OutputLevel, message: &str);

    /// Echo one line of remote stdout
    fn remote_line(&mut self, line: &str);

    /// Print a section headline such as "Rebooting device, please wait"
    fn headline(&mut self, message: &str);

    /// Start (or restart) the progress indicator
    fn start_progress(&mut self, message: &str);

    /// Stop the progress indicator if it is running
    fn stop_progress(&mut self);

    fn error(&mut self, message: &str) {
        self.print(OutputLevel::Error, message);
    }

    fn success(&mut self, message: &str) {
        self.print(OutputLevel::Success, message);
    }

    fn info(&mut self, message: &str) {
        self.print(OutputLevel::Info, message);
    }

    fn warning(&mut self, message: &str) {
        self.print(OutputLevel::Warning, message);
    }
}

/// Console writing to the real terminal
#[derive(Default)]
pub struct Terminal {
    spinner: Option<ProgressBar>,
}

impl Terminal {
    pub fn new() -> Self {
        Self::default()
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.yellow} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("|/-\\ ")
    }
}

impl Console for Terminal {
    fn print(&mut self, level: OutputLevel, message: &str) {
        self.stop_progress();
        print_msg(level, message);
    }

    fn remote_line(&mut self, line: &str) {
        let text = line.cyan().italic();
        match &self.spinner {
            Some(spinner) => spinner.suspend(|| println!("{}", text)),
            None => println!("{}", text),
        }
    }

    fn headline(&mut self, message: &str) {
        self.stop_progress();
        println!("{}", message.yellow());
    }

    fn start_progress(&mut self, message: &str) {
        self.stop_progress();
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(Self::spinner_style());
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(SPINNER_TICK);
        self.spinner = Some(spinner);
    }

    fn stop_progress(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        self.stop_progress();
    }
}
