use crate::locus::LociSchema;
use crate::merge::PopulationSource;
use crate::table::{FrequencyRow, FrequencyTable};
use std::sync::Arc;

mod merge_tests;
mod pipeline_tests;
mod report_tests;

pub(crate) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-12,
        "expected {}, got {}",
        expected,
        actual
    );
}

pub(crate) fn populations(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| c.to_string()).collect()
}

pub(crate) fn schema_of(loci: &[&str]) -> LociSchema {
    LociSchema::new(loci.iter().map(|l| l.to_string()).collect()).unwrap()
}

pub(crate) fn source(population: &str, entries: &[(&str, f64)]) -> PopulationSource {
    PopulationSource::new(
        population,
        entries.iter().map(|(k, f)| (k.to_string(), *f)).collect(),
    )
}

/// Builds a table directly from (key, freqs) pairs; totals are row sums.
pub(crate) fn table_of(pops: &[&str], loci: &[&str], rows: &[(&str, &[f64])]) -> FrequencyTable {
    let populations: Arc<[String]> = pops.iter().map(|p| p.to_string()).collect();
    let rows = rows
        .iter()
        .map(|(key, freqs)| FrequencyRow::with_computed_total(key.to_string(), freqs.to_vec()))
        .collect();
    FrequencyTable::from_rows(
        populations,
        loci.iter().map(|l| l.to_string()).collect(),
        rows,
    )
}
