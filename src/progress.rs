//! Console progress reporting: stage tracking, leveled log lines, spinners,
//! progress bars and boxed status summaries.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::{const_mutex, Mutex};
use prettytable::{row, Table};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    Startup,
    SchemaResolution,
    SourceLoading,
    Merging,
    Truncation,
    CacheIo,
    Aggregation,
    Reporting,
    Done,
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ProcessingStage::Startup => "startup",
            ProcessingStage::SchemaResolution => "schema",
            ProcessingStage::SourceLoading => "load",
            ProcessingStage::Merging => "merge",
            ProcessingStage::Truncation => "truncate",
            ProcessingStage::CacheIo => "cache",
            ProcessingStage::Aggregation => "aggregate",
            ProcessingStage::Reporting => "report",
            ProcessingStage::Done => "done",
        };
        write!(f, "{}", name)
    }
}

static CURRENT_STAGE: Mutex<ProcessingStage> = const_mutex(ProcessingStage::Startup);

pub fn set_stage(stage: ProcessingStage) {
    *CURRENT_STAGE.lock() = stage;
    log::debug!("Entering stage: {}", stage);
}

pub fn current_stage() -> ProcessingStage {
    *CURRENT_STAGE.lock()
}

/// Logs `message` through the `log` facade, prefixed with the current stage.
pub fn log(level: LogLevel, message: &str) {
    let stage = current_stage();
    match level {
        LogLevel::Debug => log::debug!("[{}] {}", stage, message),
        LogLevel::Info => log::info!("[{}] {}", stage, message),
        LogLevel::Warning => log::warn!("[{}] {}", stage, message),
        LogLevel::Error => log::error!("[{}] {}", stage, message),
    }
}

pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.bold.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

pub fn create_progress_bar(len: u64, message: &str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    bar.set_message(message.to_string());
    bar
}

/// A titled list of (label, value) pairs rendered as a table.
pub struct StatusBox {
    pub title: String,
    pub stats: Vec<(String, String)>,
}

pub fn render_status_box(status: &StatusBox) -> String {
    let mut table = Table::new();
    for (label, value) in &status.stats {
        table.add_row(row![label, value]);
    }
    format!("{}\n{}", status.title.green().bold(), table)
}

pub fn display_status_box(status: StatusBox) {
    eprintln!("\n{}", render_status_box(&status));
}

/// Formats a duration as `H:MM:SS.ffffff`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!(
        "{}:{:02}:{:02}.{:06}",
        hours,
        minutes,
        seconds,
        elapsed.subsec_micros()
    )
}
