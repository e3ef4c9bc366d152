//! Merging per-population frequency columns into one master table.
//!
//! The merge is a single pass over all input pairs into an arena of rows
//! indexed by key, with one frequency slot per configured population. Cells
//! that no source fills stay at 0.0.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::error::{FreqError, Result};
use crate::locus::LociSchema;
use crate::table::{is_valid_frequency, FrequencyRow, FrequencyTable};

/// One population's (haplotype key, frequency) column as produced by a loader.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationSource {
    pub population: String,
    pub entries: Vec<(String, f64)>,
}

impl PopulationSource {
    pub fn new(population: impl Into<String>, entries: Vec<(String, f64)>) -> Self {
        PopulationSource {
            population: population.into(),
            entries,
        }
    }
}

fn validate_frequency(population: &str, key: &str, freq: f64) -> Result<()> {
    if !is_valid_frequency(freq) {
        return Err(FreqError::MalformedInput(format!(
            "population {} has invalid frequency {} for haplotype '{}'",
            population, freq, key
        )));
    }
    Ok(())
}

/// Merges `sources` into a table with one column per entry of `populations`.
///
/// The column of each source is fixed by the position of its population code
/// in `populations`, so the result does not depend on the order of `sources`.
/// Every key is checked against `schema`; every frequency must be finite and
/// non-negative. A key listed twice by the same population has its
/// frequencies summed.
pub fn merge_population_sources(
    populations: &[String],
    schema: &LociSchema,
    sources: &[PopulationSource],
) -> Result<FrequencyTable> {
    let population_index: HashMap<&str, usize> = populations
        .iter()
        .enumerate()
        .map(|(i, p)| (p.as_str(), i))
        .collect();
    if population_index.len() != populations.len() {
        return Err(FreqError::Config(format!(
            "population list contains duplicates: {}",
            populations.join(",")
        )));
    }

    let expected_rows = sources.iter().map(|s| s.entries.len()).max().unwrap_or(0);
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(expected_rows);
    let mut keys: Vec<&str> = Vec::with_capacity(expected_rows);
    let mut freqs: Vec<Vec<f64>> = Vec::with_capacity(expected_rows);
    // Ordinal (1-based) of the last source that wrote each row.
    let mut last_writer: Vec<usize> = Vec::with_capacity(expected_rows);
    let mut seen_sources: HashSet<&str> = HashSet::with_capacity(sources.len());

    info!(
        "Merging {} population sources into {} population columns",
        sources.len(),
        populations.len()
    );

    for (ordinal, source) in sources.iter().enumerate() {
        let ordinal = ordinal + 1;
        let column = *population_index
            .get(source.population.as_str())
            .ok_or_else(|| {
                FreqError::Config(format!(
                    "population {} is not in the configured population list",
                    source.population
                ))
            })?;
        if !seen_sources.insert(source.population.as_str()) {
            return Err(FreqError::Config(format!(
                "population {} was supplied more than once",
                source.population
            )));
        }

        let mut repeated_keys = 0usize;
        for (key, freq) in &source.entries {
            validate_frequency(&source.population, key, *freq)?;
            schema.validate_key(key)?;

            let row = match index.get(key.as_str()) {
                Some(&row) => row,
                None => {
                    let row = keys.len();
                    index.insert(key.as_str(), row);
                    keys.push(key.as_str());
                    freqs.push(vec![0.0; populations.len()]);
                    last_writer.push(0);
                    row
                }
            };

            if last_writer[row] == ordinal {
                repeated_keys += 1;
                freqs[row][column] += *freq;
            } else {
                freqs[row][column] = *freq;
                last_writer[row] = ordinal;
            }
        }

        if repeated_keys > 0 {
            warn!(
                "Population {} lists {} haplotypes more than once; their frequencies were summed",
                source.population, repeated_keys
            );
        }
        debug!(
            "Merged {} entries from {} ({} distinct haplotypes so far)",
            source.entries.len(),
            source.population,
            keys.len()
        );
    }

    let rows: Vec<FrequencyRow> = keys
        .into_iter()
        .zip(freqs)
        .map(|(key, row_freqs)| FrequencyRow::with_computed_total(key.to_string(), row_freqs))
        .collect();

    info!("Merged table holds {} distinct haplotypes", rows.len());

    let populations: Arc<[String]> = populations.iter().cloned().collect();
    Ok(FrequencyTable::from_rows(
        populations,
        schema.loci().to_vec(),
        rows,
    ))
}
