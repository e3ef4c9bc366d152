//! Haplotype keys, the canonical locus schema, and locus combinations.
//!
//! A full haplotype key is a `~`-joined list of `LOCUS*allele` fields in
//! canonical schema order, e.g. `A*01:01~B*08:01~C*07:01`. Projecting a key
//! onto a [`LocusCombination`] keeps only the allele values of the requested
//! loci, in the combination's own order.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use crate::error::{FreqError, Result};

/// Separates the fields of a haplotype key and the loci of a combination name.
pub const KEY_DELIMITER: char = '~';

/// Separates the locus identifier from the allele inside one key field.
pub const LOCUS_SEPARATOR: char = '*';

/// Returns the locus identifier of a key field (`"DRB1*15:01"` -> `"DRB1"`).
pub fn locus_name(field: &str) -> &str {
    match field.split_once(LOCUS_SEPARATOR) {
        Some((locus, _)) => locus,
        None => field,
    }
}

/// Returns the allele value of a key field (`"DRB1*15:01"` -> `"15:01"`).
/// A field without a locus tag is its own allele value.
pub fn allele_value(field: &str) -> &str {
    match field.split_once(LOCUS_SEPARATOR) {
        Some((_, allele)) => allele,
        None => field,
    }
}

/// Checks that a list of locus identifiers is non-empty, has no blank entries
/// and no repeats. `what` names the list in the error message.
fn validate_locus_list(loci: &[String], what: &str) -> Result<()> {
    if loci.is_empty() {
        return Err(FreqError::Config(format!("{} has no loci", what)));
    }
    if loci.iter().any(|l| l.trim().is_empty()) {
        return Err(FreqError::Config(format!(
            "{} '{}' contains an empty locus",
            what,
            loci.join("~")
        )));
    }
    let mut seen = HashSet::with_capacity(loci.len());
    for locus in loci {
        if !seen.insert(locus.as_str()) {
            return Err(FreqError::Config(format!(
                "{} '{}' lists locus {} more than once",
                what,
                loci.join("~"),
                locus
            )));
        }
    }
    Ok(())
}

/// The canonical ordered list of locus identifiers every full key follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LociSchema {
    loci: Vec<String>,
}

impl LociSchema {
    pub fn new(loci: Vec<String>) -> Result<Self> {
        validate_locus_list(&loci, "Locus schema")?;
        Ok(LociSchema { loci })
    }

    pub fn loci(&self) -> &[String] {
        &self.loci
    }

    pub fn len(&self) -> usize {
        self.loci.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loci.is_empty()
    }

    pub fn position(&self, locus: &str) -> Option<usize> {
        self.loci.iter().position(|l| l == locus)
    }

    /// The `~`-joined schema, e.g. `A~C~B~DRBX~DRB1~DQB1~DQA1~DPA1~DPB1`.
    pub fn joined(&self) -> String {
        self.loci.join("~")
    }

    /// Splits a full key into its fields, rejecting keys whose field count
    /// differs from the schema or that contain an empty field.
    pub fn split_key<'a>(&self, key: &'a str) -> Result<Vec<&'a str>> {
        let fields: Vec<&'a str> = key.split(KEY_DELIMITER).collect();
        if fields.len() != self.loci.len() {
            return Err(FreqError::MalformedInput(format!(
                "haplotype '{}' has {} fields, schema {} expects {}",
                key,
                fields.len(),
                self.joined(),
                self.loci.len()
            )));
        }
        if fields.iter().any(|f| f.is_empty()) {
            return Err(FreqError::MalformedInput(format!(
                "haplotype '{}' contains an empty field",
                key
            )));
        }
        Ok(fields)
    }

    pub fn validate_key(&self, key: &str) -> Result<()> {
        self.split_key(key).map(|_| ())
    }
}

impl fmt::Display for LociSchema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.joined())
    }
}

/// An ordered subset of the schema's loci, named by its `~`-joined form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocusCombination {
    loci: Vec<String>,
}

impl LocusCombination {
    pub fn new(loci: Vec<String>) -> Result<Self> {
        validate_locus_list(&loci, "Locus combination")?;
        Ok(LocusCombination { loci })
    }

    /// Parses a combination name such as `A~C~B`.
    pub fn parse(name: &str) -> Result<Self> {
        let loci = name
            .split(KEY_DELIMITER)
            .map(|l| l.trim().to_string())
            .collect();
        Self::new(loci)
    }

    pub fn loci(&self) -> &[String] {
        &self.loci
    }

    pub fn name(&self) -> String {
        self.loci.join("~")
    }

    pub fn is_single_locus(&self) -> bool {
        self.loci.len() == 1
    }

    /// Maps every locus to its field position in `schema`.
    pub fn resolve(&self, schema: &LociSchema) -> Result<ResolvedCombination> {
        let positions = self
            .loci
            .iter()
            .map(|locus| {
                schema.position(locus).ok_or_else(|| {
                    FreqError::Config(format!(
                        "locus combination {} references locus {} which is not in schema {}",
                        self.name(),
                        locus,
                        schema
                    ))
                })
            })
            .collect::<Result<Vec<usize>>>()?;

        Ok(ResolvedCombination {
            combination: self.clone(),
            positions,
            schema_len: schema.len(),
        })
    }
}

impl fmt::Display for LocusCombination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for LocusCombination {
    type Err = FreqError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A combination bound to field positions of a particular schema.
#[derive(Debug, Clone)]
pub struct ResolvedCombination {
    combination: LocusCombination,
    positions: Vec<usize>,
    schema_len: usize,
}

impl ResolvedCombination {
    pub fn combination(&self) -> &LocusCombination {
        &self.combination
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Projects a full key onto this combination: the allele values of the
    /// requested loci, in combination order, joined with `~`.
    pub fn project(&self, key: &str) -> Result<String> {
        let fields: Vec<&str> = key.split(KEY_DELIMITER).collect();
        if fields.len() != self.schema_len || fields.iter().any(|f| f.is_empty()) {
            return Err(FreqError::MalformedInput(format!(
                "cannot project haplotype '{}' onto {}: expected {} non-empty fields",
                key, self.combination, self.schema_len
            )));
        }
        Ok(self
            .positions
            .iter()
            .map(|&pos| allele_value(fields[pos]))
            .join("~"))
    }
}
