//! Catalog normalization.
//!
//! Turns the hierarchical media catalog (categories holding entries) into a
//! flat, ordered list of [`Record`]s ready to be written to a snapshot.
//!
//! # Pipeline
//! 1. [`Catalog::from_slice`] parses the document. Malformed categories or
//!    entries are skipped and recorded, never fatal.
//! 2. [`flatten`] produces one [`Record`] per entry, tagged with its owning
//!    category, coercing loosely-typed fields to text and encoding nested
//!    lists as JSON blobs.
//! 3. [`regroup`] folds entries that are really individual episodes of a
//!    series back into one record per series.
//!
//! [`normalize`] runs steps 2 and 3 and returns everything the snapshot
//! builder needs.

pub mod diagnostics;
pub mod error;
mod flatten;
pub mod models;
mod regroup;

pub use crate::diagnostics::{Diagnostic, Diagnostics, Stage};
pub use crate::flatten::{flatten, flatten_categories, flatten_entry};
pub use crate::models::{
    Catalog, CatalogEntry, Category, CategoryRecord, EMPTY_LIST, EpisodeRecord, Record, Scalar, SeasonGroup,
};
pub use crate::regroup::{RegroupOptions, regroup, series_title};
use crate::error::Result;
use tracing::instrument;

/// Output of [`normalize`]: the records to persist, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub records: Vec<Record>,
    pub categories: Vec<CategoryRecord>,
    /// Everything skipped along the way, parse stage first.
    pub diagnostics: Diagnostics,
}
impl RecordSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Flatten and regroup a parsed catalog.
#[instrument(skip_all, fields(categories = catalog.categories.len(), entries = catalog.entry_count()))]
pub fn normalize(catalog: &Catalog, options: &RegroupOptions) -> Result<RecordSet> {
    let mut diagnostics = catalog.diagnostics().clone();
    let flat = flatten(catalog)?;
    let categories = flatten_categories(catalog)?;
    let records = regroup(flat, options, &mut diagnostics)?;
    tracing::info!(records = records.len(), skipped = diagnostics.skipped(), "Normalized catalog");
    Ok(RecordSet { records, categories, diagnostics })
}
