//! CSV reports for derived tables.
//!
//! Every locus combination produces `<combination>.csv` holding the table and
//! `<combination>-summary.csv` holding its descriptive statistics. A
//! `manifest.csv` lists what was written.

use colored::*;
use csv::WriterBuilder;
use prettytable::{row, Table};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::aggregate::DerivedTable;
use crate::error::Result;
use crate::progress::{log, LogLevel};
use crate::summary::{summarize_table, TableSummary};
use crate::table::{FrequencyTable, HAPLOTYPE_COLUMN, TOTAL_COLUMN};

/// Longest label a report consumer accepts.
pub const MAX_LABEL_LEN: usize = 31;

const ELLIPSIS: &str = "...";

/// Rows shown in the console preview of each report.
pub const PREVIEW_ROWS: usize = 5;

pub const MANIFEST_FILE: &str = "manifest.csv";

/// Shortens a combination name to at most [`MAX_LABEL_LEN`] characters.
///
/// Names that fit pass through unchanged; longer names keep their first 28
/// characters and end in `...`.
pub fn report_label(name: &str) -> String {
    if name.chars().count() > MAX_LABEL_LEN {
        let kept: String = name.chars().take(MAX_LABEL_LEN - ELLIPSIS.len()).collect();
        format!("{}{}", kept, ELLIPSIS)
    } else {
        name.to_string()
    }
}

/// File names of the table and summary reports for `name`.
pub fn report_file_names(name: &str) -> (String, String) {
    (format!("{}.csv", name), format!("{}-summary.csv", name))
}

/// What was written for one combination.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub combination: String,
    pub label: String,
    pub rows: usize,
    pub file: PathBuf,
    pub summary_file: PathBuf,
}

pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn create_csv_writer(path: &Path) -> Result<csv::Writer<BufWriter<File>>> {
    let file = File::create(path)?;
    Ok(WriterBuilder::new().from_writer(BufWriter::new(file)))
}

/// Formats an Option<f64>, representing None or NaN as "NA".
fn format_optional_float(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => v.to_string(),
        _ => "NA".to_string(),
    }
}

/// Writes `Haplotype,<populations...>,TotalFreq` and one line per row.
pub fn write_table_csv(table: &FrequencyTable, path: &Path) -> Result<()> {
    let mut writer = create_csv_writer(path)?;

    let mut header = Vec::with_capacity(table.populations().len() + 2);
    header.push(HAPLOTYPE_COLUMN);
    header.extend(table.populations().iter().map(|p| p.as_str()));
    header.push(TOTAL_COLUMN);
    writer.write_record(&header)?;

    let mut record: Vec<String> = Vec::with_capacity(header.len());
    for row in table.rows() {
        record.clear();
        record.push(row.key.clone());
        record.extend(row.freqs.iter().map(|f| f.to_string()));
        record.push(row.total.to_string());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes one line per statistic: `statistic,<populations...>,TotalFreq`.
pub fn write_summary_csv(summary: &TableSummary, path: &Path) -> Result<()> {
    let mut writer = create_csv_writer(path)?;

    let mut header = vec!["statistic".to_string()];
    header.extend(summary.columns.iter().map(|c| c.name.clone()));
    writer.write_record(&header)?;

    for (statistic, values) in summary.rows() {
        let mut record = vec![statistic.to_string()];
        record.extend(values.into_iter().map(format_optional_float));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Renders the first `limit` rows of `table` under `label`.
pub fn render_table_preview(table: &FrequencyTable, label: &str, limit: usize) -> String {
    let mut preview = Table::new();
    preview.add_row(row!["Rank", HAPLOTYPE_COLUMN, TOTAL_COLUMN, "Populations observed"]);
    for (i, row) in table.rows().iter().take(limit).enumerate() {
        let observed = row.freqs.iter().filter(|f| **f > 0.0).count();
        preview.add_row(row![
            i + 1,
            row.key,
            row.total,
            format!("{}/{}", observed, table.populations().len())
        ]);
    }

    let mut rendered = format!("{}\n{}", label.green().bold(), preview);
    if table.len() > limit {
        rendered.push_str(&format!("... and {} more rows.\n", table.len() - limit));
    }
    rendered
}

/// Writes the table and summary reports of one derived table into `output_dir`.
pub fn write_report(derived: &DerivedTable, output_dir: &Path) -> Result<ReportEntry> {
    let name = derived.combination.name();
    let label = report_label(&name);
    let (table_name, summary_name) = report_file_names(&name);
    let file = output_dir.join(table_name);
    let summary_file = output_dir.join(summary_name);

    eprintln!("\n{}", render_table_preview(&derived.table, &label, PREVIEW_ROWS));

    log(
        LogLevel::Info,
        &format!("Frequencies: Saving to file: {}", file.display()),
    );
    write_table_csv(&derived.table, &file)?;

    let summary = summarize_table(&derived.table);
    log(
        LogLevel::Info,
        &format!("Summary: Saving to file: {}", summary_file.display()),
    );
    write_summary_csv(&summary, &summary_file)?;

    Ok(ReportEntry {
        combination: name,
        label,
        rows: derived.table.len(),
        file,
        summary_file,
    })
}

/// Writes `manifest.csv` listing every report, and returns its path.
pub fn write_manifest(entries: &[ReportEntry], output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(MANIFEST_FILE);
    let mut writer = create_csv_writer(&path)?;
    writer.write_record(["combination", "label", "rows", "file", "summary_file"])?;
    for entry in entries {
        writer.write_record([
            entry.combination.clone(),
            entry.label.clone(),
            entry.rows.to_string(),
            file_name_of(&entry.file),
            file_name_of(&entry.summary_file),
        ])?;
    }
    writer.flush()?;
    Ok(path)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
