//! Re-aggregating the master table onto locus combinations.
//!
//! Each row's key is projected onto the combination, rows sharing a projected
//! key are summed column by column, and the grouped table is truncated again.
//! The master table is only read, so every combination can be processed
//! independently.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;
use rayon::prelude::*;

use crate::error::Result;
use crate::locus::{LocusCombination, ResolvedCombination};
use crate::table::{FrequencyRow, FrequencyTable};
use crate::truncate::truncate_top_n;

/// A derived table together with the combination that produced it.
#[derive(Debug, Clone)]
pub struct DerivedTable {
    pub combination: LocusCombination,
    pub table: FrequencyTable,
    /// Wall time spent projecting, grouping and truncating.
    pub elapsed: Duration,
}

/// Projects and groups `table` onto `combination` without truncating.
///
/// Population frequencies and totals are summed independently, so each
/// population column keeps the same sum it had in `table`.
pub fn group_by_combination(
    table: &FrequencyTable,
    combination: &ResolvedCombination,
) -> Result<FrequencyTable> {
    let width = table.populations().len();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut grouped: Vec<FrequencyRow> = Vec::new();

    for row in table.rows() {
        let projected = combination.project(&row.key)?;
        match index.get(&projected) {
            Some(&slot) => {
                let target = &mut grouped[slot];
                for (acc, value) in target.freqs.iter_mut().zip(&row.freqs) {
                    *acc += *value;
                }
                target.total += row.total;
            }
            None => {
                index.insert(projected.clone(), grouped.len());
                let mut freqs = Vec::with_capacity(width);
                freqs.extend_from_slice(&row.freqs);
                grouped.push(FrequencyRow {
                    key: projected,
                    freqs,
                    total: row.total,
                });
            }
        }
    }

    debug!(
        "Grouped {} rows into {} {} haplotypes",
        table.len(),
        grouped.len(),
        combination.combination()
    );

    Ok(FrequencyTable::from_rows(
        table.shared_populations(),
        combination.combination().loci().to_vec(),
        grouped,
    ))
}

/// Groups `table` onto `combination` and keeps the `top_n` most frequent
/// projected haplotypes.
pub fn aggregate_by_combination(
    table: &FrequencyTable,
    combination: &ResolvedCombination,
    top_n: usize,
) -> Result<FrequencyTable> {
    let grouped = group_by_combination(table, combination)?;
    Ok(truncate_top_n(grouped, top_n))
}

/// Runs [`aggregate_by_combination`] for every combination on the rayon pool.
///
/// Results come back in the order of `combinations`. The first failing
/// combination fails the whole batch.
pub fn aggregate_all(
    table: &FrequencyTable,
    combinations: &[ResolvedCombination],
    top_n: usize,
) -> Result<Vec<DerivedTable>> {
    combinations
        .par_iter()
        .map(|combination| {
            let start = Instant::now();
            let derived = aggregate_by_combination(table, combination, top_n)?;
            Ok(DerivedTable {
                combination: combination.combination().clone(),
                table: derived,
                elapsed: start.elapsed(),
            })
        })
        .collect()
}
