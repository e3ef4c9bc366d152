//! Canonical locus order discovery.
//!
//! The locus order is read off a representative full-length haplotype. One
//! locus has no independent typing across sources (the DRB3/4/5 family is
//! reported under whichever gene was typed), so its slot is renamed to an
//! alias token before the order is used as a schema.

use log::debug;

use crate::error::{FreqError, Result};
use crate::locus::{locus_name, LociSchema, KEY_DELIMITER};

/// The full-length haplotype the reference deployment reads its locus order from.
pub const REFERENCE_SCHEMA_SAMPLE: &str =
    "A*03:01~C*07:02~B*07:02~DRB5*01:01~DRB1*15:01~DQB1*06:02~DQA1*01:02~DPA1*01:03~DPB1*04:01";

/// Which locus of the schema sample is replaced, and by what token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRule {
    pub locus: String,
    pub alias: String,
}

impl AliasRule {
    pub fn new(locus: impl Into<String>, alias: impl Into<String>) -> Self {
        AliasRule {
            locus: locus.into(),
            alias: alias.into(),
        }
    }

    /// `DRB5` is reported as `DRBX`.
    pub fn reference() -> Self {
        AliasRule::new("DRB5", "DRBX")
    }
}

/// Derives the canonical locus schema from `sample`, applying `rule`.
///
/// Fails when the sample has an empty field or when the rule's locus does not
/// occur in it; either way the schema cannot be determined.
pub fn resolve_loci_order(sample: &str, rule: &AliasRule) -> Result<LociSchema> {
    let mut loci: Vec<String> = Vec::new();
    for field in sample.split(KEY_DELIMITER) {
        let locus = locus_name(field);
        if locus.is_empty() {
            return Err(FreqError::Config(format!(
                "schema sample '{}' contains a field without a locus identifier",
                sample
            )));
        }
        loci.push(locus.to_string());
    }

    let alias_index = loci.iter().position(|l| *l == rule.locus).ok_or_else(|| {
        FreqError::Config(format!(
            "schema sample '{}' does not contain locus {} (to be aliased as {})",
            sample, rule.locus, rule.alias
        ))
    })?;
    loci[alias_index] = rule.alias.clone();

    let schema = LociSchema::new(loci)?;
    debug!("Resolved locus order {} from schema sample", schema);
    Ok(schema)
}
