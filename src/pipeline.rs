//! End-to-end run: schema, master table, per-combination reports.

use std::time::{Duration, Instant};

use crate::aggregate::aggregate_all;
use crate::cache::{
    cache_path, read_cache_metadata, read_master_cache, write_master_cache, CacheMetadata,
};
use crate::config::{CachePolicy, FreqConfig};
use crate::error::Result;
use crate::locus::LociSchema;
use crate::merge::merge_population_sources;
use crate::parse::{discover_frequency_files, load_population_sources, select_sources};
use crate::progress::{
    create_spinner, display_status_box, format_elapsed, log, set_stage, LogLevel,
    ProcessingStage, StatusBox,
};
use crate::report::{ensure_output_dir, write_manifest, write_report, ReportEntry};
use crate::table::FrequencyTable;
use crate::truncate::truncate_top_n;

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub schema: LociSchema,
    pub master_rows: usize,
    pub loaded_from_cache: bool,
    pub reports: Vec<ReportEntry>,
    /// Aggregation plus report writing time per combination, in run order.
    pub timings: Vec<(String, Duration)>,
}

/// Loads every configured population file, merges them and keeps the top
/// `config.top_n` haplotypes. Also returns the merged row count before
/// truncation.
pub fn build_master_table(
    config: &FreqConfig,
    schema: &LociSchema,
) -> Result<(FrequencyTable, usize)> {
    set_stage(ProcessingStage::SourceLoading);
    let discovered = discover_frequency_files(&config.freqs_dir)?;
    let files = select_sources(&discovered, &config.populations)?;
    for file in &files {
        log(
            LogLevel::Info,
            &format!("{} {}", file.population, file.path.display()),
        );
    }
    let sources = load_population_sources(&files)?;

    set_stage(ProcessingStage::Merging);
    let spinner = create_spinner("Merging...");
    let merged = merge_population_sources(&config.populations, schema, &sources);
    spinner.finish_and_clear();
    let merged = merged?;
    drop(sources);

    set_stage(ProcessingStage::Truncation);
    let merged_rows = merged.len();
    let master = truncate_top_n(merged, config.top_n);
    log(
        LogLevel::Info,
        &format!(
            "Kept the top {} of {} merged haplotypes",
            master.len(),
            merged_rows
        ),
    );
    Ok((master, merged_rows))
}

/// Returns the master table and whether it came from the cache.
fn obtain_master_table(config: &FreqConfig, schema: &LociSchema) -> Result<(FrequencyTable, bool)> {
    let dir = match &config.cache {
        CachePolicy::Disabled => {
            let (master, _) = build_master_table(config, schema)?;
            return Ok((master, false));
        }
        CachePolicy::ReadWrite { dir } => {
            let path = cache_path(dir, schema);
            if path.is_file() {
                set_stage(ProcessingStage::CacheIo);
                match read_cache_metadata(&path)? {
                    Some(built) if built.covers(config.top_n, &config.populations) => {
                        log(
                            LogLevel::Info,
                            &format!("Reading cached master table {}", path.display()),
                        );
                        let cached = read_master_cache(&path, schema, &config.populations)?;
                        // A cache written with a larger bound is cut down to this run's bound.
                        return Ok((truncate_top_n(cached, config.top_n), true));
                    }
                    Some(built) => log(
                        LogLevel::Warning,
                        &format!(
                            "Cache {} was built from {} populations with a bound of {}; rebuilding for {} populations with a bound of {}",
                            path.display(),
                            built.populations.len(),
                            built.top_n,
                            config.populations.len(),
                            config.top_n
                        ),
                    ),
                    None => log(
                        LogLevel::Warning,
                        &format!("Cache {} has no build record; rebuilding", path.display()),
                    ),
                }
            }
            dir
        }
        CachePolicy::Rebuild { dir } => dir,
    };

    let (master, merged_rows) = build_master_table(config, schema)?;
    set_stage(ProcessingStage::CacheIo);
    let built = CacheMetadata {
        top_n: config.top_n,
        merged_rows,
        populations: master.populations().to_vec(),
    };
    write_master_cache(&master, schema, &built, &cache_path(dir, schema))?;
    Ok((master, false))
}

/// Runs the whole pipeline described by `config`.
///
/// The schema and every locus combination are validated before any file is
/// read. Any failure aborts the run; no partial report set is produced
/// beyond the files already written.
pub fn make_freqs(config: &FreqConfig) -> Result<RunSummary> {
    set_stage(ProcessingStage::SchemaResolution);
    let schema = config.schema()?;
    let combinations = config.resolve_combinations(&schema)?;
    log(LogLevel::Info, &format!("Loci order: {}", schema));

    let (master, loaded_from_cache) = obtain_master_table(config, &schema)?;

    display_status_box(StatusBox {
        title: "Master haplotype table".to_string(),
        stats: vec![
            ("Loci".to_string(), schema.joined()),
            ("Populations".to_string(), config.populations.len().to_string()),
            ("Haplotypes".to_string(), master.len().to_string()),
            ("Row bound".to_string(), config.top_n.to_string()),
            ("From cache".to_string(), loaded_from_cache.to_string()),
            ("Locus combinations".to_string(), combinations.len().to_string()),
        ],
    });

    set_stage(ProcessingStage::Aggregation);
    let spinner = create_spinner(&format!(
        "Aggregating {} locus combinations",
        combinations.len()
    ));
    let derived = aggregate_all(&master, &combinations, config.top_n);
    spinner.finish_and_clear();
    let derived = derived?;

    set_stage(ProcessingStage::Reporting);
    ensure_output_dir(&config.output_dir)?;
    let total = derived.len();
    let mut reports = Vec::with_capacity(total);
    let mut timings = Vec::with_capacity(total);
    for (i, table) in derived.iter().enumerate() {
        let name = table.combination.name();
        log(
            LogLevel::Info,
            &format!(
                "{}/{}: {} => {:?}",
                i + 1,
                total,
                name,
                table.combination.loci()
            ),
        );

        let write_start = Instant::now();
        reports.push(write_report(table, &config.output_dir)?);
        let elapsed = table.elapsed + write_start.elapsed();

        log(
            LogLevel::Info,
            &format!("Time to process {}: {}", name, format_elapsed(elapsed)),
        );
        timings.push((name, elapsed));
    }
    let manifest = write_manifest(&reports, &config.output_dir)?;
    log(
        LogLevel::Info,
        &format!("Wrote {} reports, manifest {}", reports.len(), manifest.display()),
    );

    set_stage(ProcessingStage::Done);
    Ok(RunSummary {
        schema,
        master_rows: master.len(),
        loaded_from_cache,
        reports,
        timings,
    })
}
