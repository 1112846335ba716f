//! Category tree → flat [`Record`] list.
//!
//! One record per entry, in source order, tagged with its owning category.
//! No grouping or filtering happens here.

use crate::error::Result;
use crate::models::{Catalog, CatalogEntry, CategoryRecord, Coercion, Record};
use tracing::instrument;

/// Flatten a single entry.
pub fn flatten_entry(entry: &CatalogEntry, main_category: &str) -> Result<Record> {
    Ok(Record {
        title: entry.title.to_text(),
        sub_category: entry.sub_category.to_text(),
        country: entry.country.to_text(),
        description: entry.description.to_text(),
        poster: entry.poster.to_text(),
        thumbnail: entry.thumbnail.to_text(),
        rating: entry.rating.coerce(Coercion::Rating),
        duration: entry.duration.to_text(),
        year: entry.year.coerce(Coercion::Year),
        main_category: main_category.to_string(),
        servers: entry.servers.encode("servers")?,
        seasons: entry.seasons.encode("seasons")?,
        related: entry.related.encode("related")?,
    })
}

/// Flatten every entry of every category.
#[instrument(skip_all, fields(categories = catalog.categories.len()))]
pub fn flatten(catalog: &Catalog) -> Result<Vec<Record>> {
    let mut records = Vec::with_capacity(catalog.entry_count());
    for category in &catalog.categories {
        tracing::debug!(category = %category.main_category, entries = category.entries.len(), "Flattening category");
        for entry in &category.entries {
            records.push(flatten_entry(entry, &category.main_category)?);
        }
    }
    Ok(records)
}

/// One row per category, in source order.
pub fn flatten_categories(catalog: &Catalog) -> Result<Vec<CategoryRecord>> {
    catalog
        .categories
        .iter()
        .map(|category| {
            Ok(CategoryRecord {
                main_category: category.main_category.clone(),
                sub_categories: category.sub_categories.encode("sub_categories")?,
            })
        })
        .collect()
}
