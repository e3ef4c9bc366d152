use rayon::prelude::*;

use crate::table::{sum_frequencies, FrequencyTable, TOTAL_COLUMN};

/// Row labels of a summary, in output order.
pub const STATISTIC_NAMES: [&str; 9] = [
    "count", "mean", "std", "min", "25%", "50%", "75%", "max", "sum",
];

/// Descriptive statistics for one numeric column.
/// Statistics that are undefined for the column (e.g. the mean of no values)
/// are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
    pub sum: f64,
}

/// Quantile `q` of ascending `sorted`, interpolating linearly between the two
/// closest ranks.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let fraction = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

impl ColumnSummary {
    pub fn from_values(name: &str, values: &[f64]) -> Self {
        let count = values.len();
        let sum = sum_frequencies(values.iter().copied());
        let mean = if count > 0 { Some(sum / count as f64) } else { None };

        // Sample standard deviation (n - 1)
        let std = match mean {
            Some(m) if count > 1 => {
                let ss = sum_frequencies(values.iter().map(|v| (v - m) * (v - m)));
                Some((ss / (count - 1) as f64).sqrt())
            }
            _ => None,
        };

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        ColumnSummary {
            name: name.to_string(),
            count,
            mean,
            std,
            min: sorted.first().copied(),
            q25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q75: quantile(&sorted, 0.75),
            max: sorted.last().copied(),
            sum,
        }
    }

    /// Values in [`STATISTIC_NAMES`] order.
    pub fn values(&self) -> [Option<f64>; 9] {
        [
            Some(self.count as f64),
            self.mean,
            self.std,
            self.min,
            self.q25,
            self.median,
            self.q75,
            self.max,
            Some(self.sum),
        ]
    }
}

/// Per-column statistics of a table: every population, then the total.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSummary {
    pub columns: Vec<ColumnSummary>,
}

impl TableSummary {
    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// One `(statistic, values per column)` pair per entry of [`STATISTIC_NAMES`].
    pub fn rows(&self) -> Vec<(&'static str, Vec<Option<f64>>)> {
        let per_column: Vec<[Option<f64>; 9]> = self.columns.iter().map(|c| c.values()).collect();
        STATISTIC_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| (*name, per_column.iter().map(|v| v[i]).collect()))
            .collect()
    }
}

pub fn summarize_table(table: &FrequencyTable) -> TableSummary {
    let population_count = table.populations().len();
    let columns = (0..=population_count)
        .into_par_iter()
        .map(|idx| {
            if idx < population_count {
                let values: Vec<f64> = table.column(idx).collect();
                ColumnSummary::from_values(&table.populations()[idx], &values)
            } else {
                let values: Vec<f64> = table.totals().collect();
                ColumnSummary::from_values(TOTAL_COLUMN, &values)
            }
        })
        .collect();
    TableSummary { columns }
}
