use crate::error::{FreqError, Result};
use crate::merge::PopulationSource;
use crate::progress::{create_progress_bar, log, LogLevel};
use crate::table::is_valid_frequency;

use flate2::read::MultiGzDecoder;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// File name suffix of a population frequency file.
pub const FREQS_SUFFIX: &str = ".freqs.gz";

/// Column holding the full haplotype key.
pub const HAPLO_COLUMN: &str = "Haplo";

/// Column holding the haplotype frequency.
pub const FREQ_COLUMN: &str = "Freq";

/// A discovered `<POP>.freqs.gz` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyFile {
    pub path: PathBuf,
    pub population: String,
}

/// Lists every `*.freqs.gz` file in `dir`, sorted by path. The population
/// code is the file name without the suffix.
pub fn discover_frequency_files(dir: &Path) -> Result<Vec<FrequencyFile>> {
    if !dir.is_dir() {
        return Err(FreqError::NoFrequencyFiles(format!(
            "{} (not a directory)",
            dir.display()
        )));
    }

    let pattern = dir.join(format!("*{}", FREQS_SUFFIX));
    let pattern = pattern.to_string_lossy();
    let paths = glob::glob(&pattern)
        .map_err(|e| FreqError::Config(format!("invalid glob pattern {}: {}", pattern, e)))?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| FreqError::Io(e.into_error()))?;
        if !path.is_file() {
            continue;
        }
        let population = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(FREQS_SUFFIX))
            .filter(|p| !p.is_empty())
            .map(String::from);
        match population {
            Some(population) => files.push(FrequencyFile { path, population }),
            None => log(
                LogLevel::Warning,
                &format!("Skipping file without a population code: {}", path.display()),
            ),
        }
    }

    if files.is_empty() {
        return Err(FreqError::NoFrequencyFiles(dir.display().to_string()));
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));

    log(LogLevel::Info, &format!("Total files: {}", files.len()));
    Ok(files)
}

/// Keeps the files of configured populations, in configuration order.
///
/// Files of unconfigured populations are skipped with a warning; a configured
/// population without a file is a configuration error.
pub fn select_sources(files: &[FrequencyFile], populations: &[String]) -> Result<Vec<FrequencyFile>> {
    let configured: HashSet<&str> = populations.iter().map(|p| p.as_str()).collect();
    for file in files {
        if !configured.contains(file.population.as_str()) {
            log(
                LogLevel::Warning,
                &format!(
                    "Population {} is not configured; skipping {}",
                    file.population,
                    file.path.display()
                ),
            );
        }
    }

    populations
        .iter()
        .map(|population| {
            files
                .iter()
                .find(|f| &f.population == population)
                .cloned()
                .ok_or_else(|| {
                    FreqError::Config(format!(
                        "no frequency file found for population {}",
                        population
                    ))
                })
        })
        .collect()
}

/// Opens a frequency file, decompressing it when it ends in `.gz`.
pub fn open_frequency_reader(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;

    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        let decoder = MultiGzDecoder::new(file);
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Reads the `Haplo` and `Freq` columns of one population file.
pub fn read_frequency_file(path: &Path, population: &str) -> Result<PopulationSource> {
    let reader = open_frequency_reader(path)?;
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let column_index = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            FreqError::MalformedInput(format!(
                "{} has no '{}' column (found: {})",
                path.display(),
                name,
                headers.iter().collect::<Vec<_>>().join(",")
            ))
        })
    };
    let haplo_idx = column_index(HAPLO_COLUMN)?;
    let freq_idx = column_index(FREQ_COLUMN)?;

    let mut entries = Vec::new();
    for (record_num, result) in csv_reader.records().enumerate() {
        let record = result?;
        // Line 1 is the header.
        let line_num = record_num + 2;

        let key = record.get(haplo_idx).unwrap_or("");
        if key.is_empty() {
            return Err(FreqError::MalformedInput(format!(
                "{} line {}: empty haplotype",
                path.display(),
                line_num
            )));
        }

        let raw_freq = record.get(freq_idx).unwrap_or("");
        let freq: f64 = raw_freq.parse().map_err(|_| {
            FreqError::MalformedInput(format!(
                "{} line {}: frequency '{}' is not numeric",
                path.display(),
                line_num,
                raw_freq
            ))
        })?;
        if !is_valid_frequency(freq) {
            return Err(FreqError::MalformedInput(format!(
                "{} line {}: frequency {} is negative or not finite",
                path.display(),
                line_num,
                raw_freq
            )));
        }

        entries.push((key.to_string(), freq));
    }

    log(
        LogLevel::Debug,
        &format!("{} {}: {} haplotypes", population, path.display(), entries.len()),
    );
    Ok(PopulationSource::new(population, entries))
}

/// Reads every file in parallel; results keep the order of `files`.
pub fn load_population_sources(files: &[FrequencyFile]) -> Result<Vec<PopulationSource>> {
    let progress_bar = create_progress_bar(files.len() as u64, "Reading frequency files");

    let sources = files
        .par_iter()
        .map(|file| {
            let source = read_frequency_file(&file.path, &file.population);
            progress_bar.inc(1);
            source
        })
        .collect::<Result<Vec<_>>>();

    match &sources {
        Ok(_) => progress_bar.finish_with_message("Frequency files loaded"),
        Err(_) => progress_bar.abandon_with_message("Failed to load frequency files"),
    }
    sources
}
