//! Population-stratified haplotype frequency tables.
//!
//! Per-population frequency files are merged into one master table keyed by
//! full multi-locus haplotype, bounded to its most frequent rows, and then
//! re-aggregated onto every configured locus combination.

// Module declarations
pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod locus;
pub mod merge;
pub mod parse;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod schema;
pub mod summary;
pub mod table;
pub mod truncate;

pub use error::{FreqError, Result};

#[cfg(test)]
mod tests;
