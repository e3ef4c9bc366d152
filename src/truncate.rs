//! Bounding a table to its N most frequent rows.

use std::cmp::Ordering;

use log::debug;
use rayon::prelude::*;

use crate::table::{FrequencyRow, FrequencyTable};

/// Number of rows the reference deployment keeps at every stage.
pub const DEFAULT_TOP_N: usize = 1_000_000;

/// Ranking used for truncation: `total` descending, then key ascending.
///
/// Keys are unique within a table, so this is a total order and the retained
/// set does not depend on the order rows arrived in.
pub fn rank_rows(a: &FrequencyRow, b: &FrequencyRow) -> Ordering {
    b.total
        .total_cmp(&a.total)
        .then_with(|| a.key.cmp(&b.key))
}

/// Keeps the `n` highest-ranked rows of `table`, in rank order.
pub fn truncate_top_n(table: FrequencyTable, n: usize) -> FrequencyTable {
    let (populations, loci, mut rows) = table.into_parts();
    let input_len = rows.len();

    if n == 0 {
        rows.clear();
    } else if rows.len() > n {
        // Partition so that the first n rows are the retained set, then only
        // those need a full sort.
        rows.select_nth_unstable_by(n - 1, rank_rows);
        rows.truncate(n);
    }
    rows.par_sort_unstable_by(rank_rows);

    debug!("Truncated {} rows to {}", input_len, rows.len());
    FrequencyTable::from_rows(populations, loci, rows)
}
