//! Run configuration: the reference deployment's populations and locus
//! combinations, and the command-line arguments that override them.

use clap::Parser;
use std::path::PathBuf;

use crate::error::{FreqError, Result};
use crate::locus::{LociSchema, LocusCombination, ResolvedCombination};
use crate::schema::{resolve_loci_order, AliasRule, REFERENCE_SCHEMA_SAMPLE};
use crate::truncate::DEFAULT_TOP_N;

/// Population codes of the reference deployment, in column order.
pub const REFERENCE_POPULATIONS: [&str; 26] = [
    "AAFA", "AFA", "AFB", "AINDI", "AISC", "ALANAM", "AMIND", "API", "CARB", "CARHIS", "CARIBI",
    "CAU", "EURCAU", "FILII", "HAWI", "HIS", "JAPI", "KORI", "MENAFC", "MSWHIS", "NAM", "NCHI",
    "SCAHIS", "SCAMB", "SCSEAI", "VIET",
];

/// Locus combinations reported by the reference deployment.
pub const REFERENCE_COMBINATIONS: [&str; 25] = [
    "A",
    "C",
    "B",
    "DRB1",
    "DRBX",
    "DQA1",
    "DQB1",
    "DPA1",
    "DPB1",
    "A~C~B",
    "A~B~DRB1",
    "A~C~B~DRB1",
    "A~B~DRB1~DQB1",
    "C~B~DRB1~DQB1",
    "A~C~B~DRB1~DQB1",
    "A~C~B~DRBX~DRB1~DQB1",
    "DPB1~DPA1",
    "DQA1~DQB1",
    "DRB1~DQB1",
    "DRBX~DRB1",
    "DRBX~DQB1",
    "DRBX~DRB1~DQA1~DQB1",
    "A~C~B~DRBX~DRB1~DQB1~DPB1",
    "DRBX~DRB1~DQA1~DQB1~DPB1~DPA1",
    "A~C~B~DRBX~DRB1~DQA1~DQB1~DPB1~DPA1",
];

/// How the truncated master table is cached between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachePolicy {
    /// Neither read nor write a cache.
    Disabled,
    /// Read the cache in `dir` if present, otherwise build and write it.
    ReadWrite { dir: PathBuf },
    /// Always rebuild, then overwrite the cache in `dir`.
    Rebuild { dir: PathBuf },
}

/// Everything a run needs, fixed before the pipeline starts.
#[derive(Debug, Clone)]
pub struct FreqConfig {
    pub populations: Vec<String>,
    pub combinations: Vec<LocusCombination>,
    pub schema_sample: String,
    pub alias_rule: AliasRule,
    pub top_n: usize,
    pub freqs_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cache: CachePolicy,
}

impl FreqConfig {
    /// The reference deployment: 26 populations, 25 combinations, top one million.
    pub fn reference() -> Result<Self> {
        let combinations = REFERENCE_COMBINATIONS
            .iter()
            .map(|c| LocusCombination::parse(c))
            .collect::<Result<Vec<_>>>()?;
        Ok(FreqConfig {
            populations: REFERENCE_POPULATIONS.iter().map(|p| p.to_string()).collect(),
            combinations,
            schema_sample: REFERENCE_SCHEMA_SAMPLE.to_string(),
            alias_rule: AliasRule::reference(),
            top_n: DEFAULT_TOP_N,
            freqs_dir: PathBuf::from("./freqs"),
            output_dir: PathBuf::from("./reports"),
            cache: CachePolicy::ReadWrite {
                dir: PathBuf::from("."),
            },
        })
    }

    /// Resolves the locus schema from the schema sample.
    pub fn schema(&self) -> Result<LociSchema> {
        resolve_loci_order(&self.schema_sample, &self.alias_rule)
    }

    /// Checks the population list and binds every combination to `schema`.
    pub fn resolve_combinations(&self, schema: &LociSchema) -> Result<Vec<ResolvedCombination>> {
        if self.populations.is_empty() {
            return Err(FreqError::Config("no populations configured".to_string()));
        }
        let mut seen = std::collections::HashSet::new();
        for population in &self.populations {
            if population.trim().is_empty() || !seen.insert(population.as_str()) {
                return Err(FreqError::Config(format!(
                    "population list is invalid near '{}'",
                    population
                )));
            }
        }
        if self.combinations.is_empty() {
            return Err(FreqError::Config("no locus combinations configured".to_string()));
        }
        self.combinations
            .iter()
            .map(|combination| combination.resolve(schema))
            .collect()
    }
}

// Define command-line arguments using clap
#[derive(Parser, Debug)]
#[command(
    name = "haplofreq",
    author,
    version,
    about = "Merge population haplotype frequencies and report them per locus combination",
    long_about = None
)]
pub struct Args {
    /// Folder containing <POP>.freqs.gz files
    #[arg(short = 'd', long = "freqs-dir", default_value = "./freqs")]
    pub freqs_dir: PathBuf,

    /// Folder the reports are written to
    #[arg(short = 'o', long = "output-dir", default_value = "./reports")]
    pub output_dir: PathBuf,

    /// Comma-separated population codes (default: the 26 reference populations)
    #[arg(long = "populations", value_delimiter = ',')]
    pub populations: Option<Vec<String>>,

    /// Comma-separated locus combinations such as A~C~B (default: the 25 reference combinations)
    #[arg(long = "combinations", value_delimiter = ',')]
    pub combinations: Option<Vec<String>>,

    /// Number of rows kept at every stage
    #[arg(long = "top-n", default_value_t = DEFAULT_TOP_N)]
    pub top_n: usize,

    /// Folder holding the cached master table
    #[arg(long = "cache-dir", default_value = ".")]
    pub cache_dir: PathBuf,

    /// Do not read or write the master table cache
    #[arg(long = "no-cache", conflicts_with = "rebuild_cache")]
    pub no_cache: bool,

    /// Rebuild the master table even if a cache exists
    #[arg(long = "rebuild-cache")]
    pub rebuild_cache: bool,

    /// Number of worker threads
    #[arg(short, long, default_value_t = num_cpus::get())]
    pub threads: usize,

    /// Log debug output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Starts from the reference deployment and applies the overrides.
    pub fn to_config(&self) -> Result<FreqConfig> {
        let mut config = FreqConfig::reference()?;
        if let Some(populations) = &self.populations {
            config.populations = populations.iter().map(|p| p.trim().to_string()).collect();
        }
        if let Some(combinations) = &self.combinations {
            config.combinations = combinations
                .iter()
                .map(|c| LocusCombination::parse(c))
                .collect::<Result<Vec<_>>>()?;
        }
        config.top_n = self.top_n;
        config.freqs_dir = self.freqs_dir.clone();
        config.output_dir = self.output_dir.clone();
        config.cache = if self.no_cache {
            CachePolicy::Disabled
        } else if self.rebuild_cache {
            CachePolicy::Rebuild {
                dir: self.cache_dir.clone(),
            }
        } else {
            CachePolicy::ReadWrite {
                dir: self.cache_dir.clone(),
            }
        };
        Ok(config)
    }
}
