use std::sync::Arc;

/// Column label of the key column in reports and in the cache.
pub const HAPLOTYPE_COLUMN: &str = "Haplotype";

/// Column label of the per-row total frequency.
pub const TOTAL_COLUMN: &str = "TotalFreq";

/// Sums frequencies starting from `+0.0`, so an empty input yields `0` and
/// not the `-0` that `Iterator::sum` produces for floats.
pub(crate) fn sum_frequencies<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    values.into_iter().fold(0.0, |acc, v| acc + v)
}

/// A frequency must be finite and non-negative.
pub(crate) fn is_valid_frequency(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// One haplotype (full or projected) with a frequency per population.
///
/// `freqs[i]` belongs to the i-th population of the owning table; `total` is
/// the sum of `freqs`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyRow {
    pub key: String,
    pub freqs: Vec<f64>,
    pub total: f64,
}

impl FrequencyRow {
    /// Builds a row whose total is the sum of `freqs`.
    pub fn with_computed_total(key: String, freqs: Vec<f64>) -> Self {
        let total = sum_frequencies(freqs.iter().copied());
        FrequencyRow { key, freqs, total }
    }

    pub fn row_sum(&self) -> f64 {
        sum_frequencies(self.freqs.iter().copied())
    }
}

/// A set of rows unique by key, sharing one ordered population list.
///
/// Tables are never edited in place: merging, truncation and aggregation each
/// consume or borrow a table and produce a new one.
#[derive(Debug, Clone)]
pub struct FrequencyTable {
    populations: Arc<[String]>,
    // Loci encoded by the keys, in key field order.
    loci: Vec<String>,
    rows: Vec<FrequencyRow>,
}

impl FrequencyTable {
    pub(crate) fn from_rows(
        populations: Arc<[String]>,
        loci: Vec<String>,
        rows: Vec<FrequencyRow>,
    ) -> Self {
        debug_assert!(rows.iter().all(|r| r.freqs.len() == populations.len()));
        FrequencyTable {
            populations,
            loci,
            rows,
        }
    }

    pub(crate) fn into_parts(self) -> (Arc<[String]>, Vec<String>, Vec<FrequencyRow>) {
        (self.populations, self.loci, self.rows)
    }

    pub fn populations(&self) -> &[String] {
        &self.populations
    }

    pub(crate) fn shared_populations(&self) -> Arc<[String]> {
        Arc::clone(&self.populations)
    }

    pub fn loci(&self) -> &[String] {
        &self.loci
    }

    pub fn rows(&self) -> &[FrequencyRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn population_index(&self, population: &str) -> Option<usize> {
        self.populations.iter().position(|p| p == population)
    }

    /// Looks a row up by key. Linear; meant for inspection, not hot paths.
    pub fn get(&self, key: &str) -> Option<&FrequencyRow> {
        self.rows.iter().find(|r| r.key == key)
    }

    /// Values of the population column at `index`, in row order.
    pub fn column(&self, index: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(move |r| r.freqs[index])
    }

    pub fn totals(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|r| r.total)
    }

    pub fn column_sum(&self, index: usize) -> f64 {
        sum_frequencies(self.column(index))
    }
}
