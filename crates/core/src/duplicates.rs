//! Pre-insertion duplicate detection on the natural key.
//!
//! Matching is exact: no case folding, no whitespace trimming. The birth date
//! is compared in its stored `YYYY-MM-DD` form.

use crate::catalog::Catalog;
use crate::domain::RecordFields;
use crate::error::Result;

/// Id of an existing record with the same natural key as `candidate`.
pub fn find_duplicate(catalog: &Catalog, candidate: &RecordFields) -> Result<Option<i64>> {
    catalog.find(&candidate.natural_key())
}

pub fn is_duplicate(catalog: &Catalog, candidate: &RecordFields) -> Result<bool> {
    Ok(find_duplicate(catalog, candidate)?.is_some())
}
