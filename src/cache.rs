//! Parquet cache of the truncated master table.
//!
//! Merging every population file is the slowest stage of a run, so the
//! truncated master table is stored as Parquet and reused by later runs. The
//! layout is columnar: the full `Haplotype` key, one Utf8 column per schema
//! locus holding that locus' `LOCUS*allele` field, one Float64 column per
//! population, and `TotalFreq`. The schema metadata records the row bound,
//! the merged row count and the population list the table was built with, so
//! a run can tell whether the cache still answers its configuration.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::{FreqError, Result};
use crate::locus::LociSchema;
use crate::progress::{log, LogLevel};
use crate::table::{
    is_valid_frequency, sum_frequencies, FrequencyRow, FrequencyTable, HAPLOTYPE_COLUMN,
    TOTAL_COLUMN,
};

/// Rows per record batch when writing and reading the cache.
pub const CACHE_BATCH_ROWS: usize = 65_536;

/// Largest accepted relative gap between a cached total and its row sum.
const TOTAL_TOLERANCE: f64 = 1e-9;

const META_TOP_N: &str = "haplofreq:top_n";
const META_MERGED_ROWS: &str = "haplofreq:merged_rows";
const META_POPULATIONS: &str = "haplofreq:populations";

/// How a cached master table was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheMetadata {
    /// Row bound the merged table was truncated to.
    pub top_n: usize,
    /// Rows in the merged table before truncation.
    pub merged_rows: usize,
    /// Population columns, in table order.
    pub populations: Vec<String>,
}

impl CacheMetadata {
    /// True when truncation dropped nothing.
    pub fn is_complete(&self) -> bool {
        self.merged_rows <= self.top_n
    }

    /// Whether the cached table holds the top `top_n` rows of a merge over
    /// exactly `populations`. Population order does not matter.
    pub fn covers(&self, top_n: usize, populations: &[String]) -> bool {
        let cached: HashSet<&str> = self.populations.iter().map(|p| p.as_str()).collect();
        let wanted: HashSet<&str> = populations.iter().map(|p| p.as_str()).collect();
        cached == wanted && (self.top_n >= top_n || self.is_complete())
    }

    fn to_map(&self) -> Result<HashMap<String, String>> {
        if let Some(bad) = self.populations.iter().find(|p| p.contains(',')) {
            return Err(FreqError::Cache(format!(
                "population code '{}' cannot be recorded in the cache",
                bad
            )));
        }
        let mut map = HashMap::new();
        map.insert(META_TOP_N.to_string(), self.top_n.to_string());
        map.insert(META_MERGED_ROWS.to_string(), self.merged_rows.to_string());
        map.insert(META_POPULATIONS.to_string(), self.populations.join(","));
        Ok(map)
    }

    /// `None` when the map carries no build record at all.
    fn from_map(map: &HashMap<String, String>) -> Result<Option<Self>> {
        let (top_n, merged_rows, populations) = match (
            map.get(META_TOP_N),
            map.get(META_MERGED_ROWS),
            map.get(META_POPULATIONS),
        ) {
            (Some(t), Some(m), Some(p)) => (t, m, p),
            _ => return Ok(None),
        };
        let parse_count = |name: &str, value: &str| {
            value.parse::<usize>().map_err(|_| {
                FreqError::Cache(format!("cache metadata {} is not a count: '{}'", name, value))
            })
        };
        let populations = if populations.is_empty() {
            Vec::new()
        } else {
            populations.split(',').map(String::from).collect()
        };
        Ok(Some(CacheMetadata {
            top_n: parse_count(META_TOP_N, top_n)?,
            merged_rows: parse_count(META_MERGED_ROWS, merged_rows)?,
            populations,
        }))
    }
}

/// `<schema>-haplotype.parquet`, e.g. `A~C~B~DRBX~DRB1~DQB1~DQA1~DPA1~DPB1-haplotype.parquet`.
pub fn cache_file_name(schema: &LociSchema) -> String {
    format!("{}-haplotype.parquet", schema.joined())
}

pub fn cache_path(dir: &Path, schema: &LociSchema) -> PathBuf {
    dir.join(cache_file_name(schema))
}

fn cache_arrow_schema(
    schema: &LociSchema,
    populations: &[String],
    metadata: &CacheMetadata,
) -> Result<Arc<Schema>> {
    let mut names: HashSet<&str> = HashSet::new();
    let column_names = std::iter::once(HAPLOTYPE_COLUMN)
        .chain(schema.loci().iter().map(|l| l.as_str()))
        .chain(populations.iter().map(|p| p.as_str()))
        .chain(std::iter::once(TOTAL_COLUMN));
    for name in column_names {
        if !names.insert(name) {
            return Err(FreqError::Cache(format!(
                "column name {} would appear twice in the cache",
                name
            )));
        }
    }

    let mut fields = Vec::with_capacity(2 + schema.len() + populations.len());
    fields.push(Field::new(HAPLOTYPE_COLUMN, DataType::Utf8, false));
    for locus in schema.loci() {
        fields.push(Field::new(locus.as_str(), DataType::Utf8, false));
    }
    for population in populations {
        fields.push(Field::new(population.as_str(), DataType::Float64, false));
    }
    fields.push(Field::new(TOTAL_COLUMN, DataType::Float64, false));
    Ok(Arc::new(Schema::new_with_metadata(fields, metadata.to_map()?)))
}

fn build_batch(
    arrow_schema: &Arc<Schema>,
    schema: &LociSchema,
    rows: &[FrequencyRow],
    population_count: usize,
) -> Result<RecordBatch> {
    let mut locus_fields: Vec<Vec<&str>> = vec![Vec::with_capacity(rows.len()); schema.len()];
    for row in rows {
        for (column, field) in locus_fields.iter_mut().zip(schema.split_key(&row.key)?) {
            column.push(field);
        }
    }

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(arrow_schema.fields().len());
    columns.push(Arc::new(StringArray::from(
        rows.iter().map(|r| r.key.as_str()).collect::<Vec<_>>(),
    )));
    for values in locus_fields {
        columns.push(Arc::new(StringArray::from(values)));
    }
    for pop_idx in 0..population_count {
        columns.push(Arc::new(Float64Array::from(
            rows.iter().map(|r| r.freqs[pop_idx]).collect::<Vec<_>>(),
        )));
    }
    columns.push(Arc::new(Float64Array::from(
        rows.iter().map(|r| r.total).collect::<Vec<_>>(),
    )));

    Ok(RecordBatch::try_new(Arc::clone(arrow_schema), columns)?)
}

/// Writes `table` and its build record to `path`. The file is written next to
/// `path` first and renamed into place, so an interrupted write never leaves a
/// truncated cache.
pub fn write_master_cache(
    table: &FrequencyTable,
    schema: &LociSchema,
    metadata: &CacheMetadata,
    path: &Path,
) -> Result<()> {
    if table.loci() != schema.loci() {
        return Err(FreqError::Cache(format!(
            "table keyed by {} cannot be cached under schema {}",
            table.loci().join("~"),
            schema
        )));
    }

    if metadata.populations != table.populations() {
        return Err(FreqError::Cache(format!(
            "cache metadata lists populations {} but the table has {}",
            metadata.populations.join(","),
            table.populations().join(",")
        )));
    }

    let arrow_schema = cache_arrow_schema(schema, table.populations(), metadata)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    let file = File::create(&partial)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, Arc::clone(&arrow_schema), Some(props))?;
    for chunk in table.rows().chunks(CACHE_BATCH_ROWS) {
        let batch = build_batch(&arrow_schema, schema, chunk, table.populations().len())?;
        writer.write(&batch)?;
    }
    writer.close()?;
    fs::rename(&partial, path)?;

    log(
        LogLevel::Info,
        &format!("Cached {} haplotypes to {}", table.len(), path.display()),
    );
    Ok(())
}

fn check_column(file_schema: &Schema, name: &str, expected: &DataType) -> Result<()> {
    let field = file_schema.field_with_name(name).map_err(|_| {
        FreqError::Cache(format!("cache has no column {}", name))
    })?;
    if field.data_type() != expected {
        return Err(FreqError::Cache(format!(
            "cache column {} has type {}, expected {}",
            name,
            field.data_type(),
            expected
        )));
    }
    Ok(())
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| FreqError::Cache(format!("cache column {} is missing or not Utf8", name)))
}

fn float_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
        .ok_or_else(|| {
            FreqError::Cache(format!("cache column {} is missing or not Float64", name))
        })
}

/// Reads the build record of the cache at `path` without reading its rows.
/// Returns `None` for a cache written without one.
pub fn read_cache_metadata(path: &Path) -> Result<Option<CacheMetadata>> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    CacheMetadata::from_map(builder.schema().metadata())
}

/// Reads a cache written by [`write_master_cache`].
///
/// The cache must carry every schema locus and every configured population;
/// each key must fit `schema`, keys must be unique, and `TotalFreq` must agree
/// with the row sum. Every frequency and total must be finite and
/// non-negative.
pub fn read_master_cache(
    path: &Path,
    schema: &LociSchema,
    populations: &[String],
) -> Result<FrequencyTable> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let file_schema = Arc::clone(builder.schema());
    check_column(&file_schema, HAPLOTYPE_COLUMN, &DataType::Utf8)?;
    for locus in schema.loci() {
        check_column(&file_schema, locus, &DataType::Utf8)?;
    }
    for population in populations {
        check_column(&file_schema, population, &DataType::Float64)?;
    }
    check_column(&file_schema, TOTAL_COLUMN, &DataType::Float64)?;

    let reader = builder.with_batch_size(CACHE_BATCH_ROWS).build()?;

    let mut rows: Vec<FrequencyRow> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for batch in reader {
        let batch = batch?;
        let keys = string_column(&batch, HAPLOTYPE_COLUMN)?;
        let pop_columns = populations
            .iter()
            .map(|p| float_column(&batch, p))
            .collect::<Result<Vec<_>>>()?;
        let totals = float_column(&batch, TOTAL_COLUMN)?;

        for i in 0..batch.num_rows() {
            if keys.is_null(i) || totals.is_null(i) || pop_columns.iter().any(|c| c.is_null(i)) {
                return Err(FreqError::Cache(format!(
                    "cache row {} contains a null value",
                    rows.len()
                )));
            }
            let key = keys.value(i);
            schema.validate_key(key)?;
            if !seen.insert(key.to_string()) {
                return Err(FreqError::Cache(format!(
                    "haplotype '{}' appears more than once in the cache",
                    key
                )));
            }

            let freqs: Vec<f64> = pop_columns.iter().map(|c| c.value(i)).collect();
            let total = totals.value(i);
            let invalid = freqs
                .iter()
                .zip(populations)
                .map(|(value, population)| (*value, population.as_str()))
                .chain(std::iter::once((total, TOTAL_COLUMN)))
                .find(|(value, _)| !is_valid_frequency(*value));
            if let Some((value, column)) = invalid {
                return Err(FreqError::Cache(format!(
                    "haplotype '{}' has invalid frequency {} in column {}",
                    key, value, column
                )));
            }

            let row_sum = sum_frequencies(freqs.iter().copied());
            if (total - row_sum).abs() > TOTAL_TOLERANCE * total.abs().max(row_sum.abs()) {
                return Err(FreqError::Cache(format!(
                    "haplotype '{}' has {} {} but its frequencies sum to {}",
                    key, TOTAL_COLUMN, total, row_sum
                )));
            }

            rows.push(FrequencyRow {
                key: key.to_string(),
                freqs,
                total,
            });
        }
    }

    log(
        LogLevel::Info,
        &format!("Loaded {} haplotypes from cache {}", rows.len(), path.display()),
    );
    let populations: Arc<[String]> = populations.iter().cloned().collect();
    Ok(FrequencyTable::from_rows(populations, schema.loci().to_vec(), rows))
}
