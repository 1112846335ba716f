use super::{CatalogEntry, Nested, Scalar};
use crate::diagnostics::{Diagnostic, Diagnostics, Stage};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

/// A named category and the entries filed under it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Category {
    pub main_category: String,
    pub sub_categories: Nested,
    pub entries: Vec<CatalogEntry>,
}
impl Category {
    pub fn new(main_category: impl Into<String>, entries: Vec<CatalogEntry>) -> Self {
        Self {
            main_category: main_category.into(),
            sub_categories: Nested::default(),
            entries,
        }
    }
}

/// The full source document, materialized in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub categories: Vec<Category>,
    /// Units dropped while parsing the document.
    skipped: Diagnostics,
}

#[derive(Deserialize)]
struct RawCatalog {
    #[serde(rename = "Categories", default)]
    categories: Option<Vec<Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawCategory {
    #[serde(default)]
    main_category: Scalar,
    #[serde(default)]
    sub_categories: Nested,
    #[serde(default)]
    entries: Option<Vec<Value>>,
}

impl Catalog {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories, skipped: Diagnostics::default() }
    }

    /// Parse the catalog document.
    ///
    /// Only a document that isn't JSON, or whose category list isn't a list,
    /// is an error. A category or entry that isn't an object is skipped and
    /// recorded in [`diagnostics()`](Self::diagnostics).
    #[instrument(skip(bytes), fields(size = bytes.as_ref().len()))]
    pub fn from_slice(bytes: impl AsRef<[u8]>) -> Result<Self> {
        let raw: RawCatalog = serde_json::from_slice(bytes.as_ref()).or_raise(|| ErrorKind::InvalidDocument)?;
        let mut skipped = Diagnostics::default();
        let mut categories = Vec::new();
        for (position, value) in raw.categories.unwrap_or_default().into_iter().enumerate() {
            // Serde happily builds structs out of JSON arrays; only objects count.
            if !value.is_object() {
                skipped.push(Diagnostic::new(Stage::Parse, "", position, "category is not an object"));
                continue;
            }
            let raw = match serde_json::from_value::<RawCategory>(value) {
                Ok(raw) => raw,
                Err(e) => {
                    skipped.push(Diagnostic::new(Stage::Parse, "", position, format!("category: {e}")));
                    continue;
                },
            };
            let main_category = raw.main_category.to_text();
            let mut entries = Vec::new();
            for (position, value) in raw.entries.unwrap_or_default().into_iter().enumerate() {
                if !value.is_object() {
                    skipped.push(Diagnostic::new(Stage::Parse, &main_category, position, "entry is not an object"));
                    continue;
                }
                let title = value.get("Title").cloned().map(Scalar::from).map(|t| t.to_text());
                match serde_json::from_value::<CatalogEntry>(value) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => skipped.push(
                        Diagnostic::new(Stage::Parse, &main_category, position, format!("entry: {e}"))
                            .with_title(title),
                    ),
                }
            }
            categories.push(Category {
                main_category,
                sub_categories: raw.sub_categories,
                entries,
            });
        }
        Ok(Self { categories, skipped })
    }

    /// Units that were skipped while parsing.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.skipped
    }

    /// Total number of entries across all categories.
    pub fn entry_count(&self) -> usize {
        self.categories.iter().map(|c| c.entries.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let json = r#"{
            "Categories": [
                {"MainCategory": "Movies", "SubCategories": ["Action"], "Entries": [
                    {"Title": "Inception", "Year": 2010, "Rating": 8.8},
                    {"Title": "Heat"}
                ]},
                {"MainCategory": "TV Series", "Entries": null}
            ]
        }"#;
        let catalog = Catalog::from_slice(json).unwrap();
        assert_eq!(catalog.categories.len(), 2);
        assert_eq!(catalog.entry_count(), 2);
        assert_eq!(catalog.categories[0].main_category, "Movies");
        assert_eq!(catalog.categories[0].sub_categories.encode("sub").unwrap(), r#"["Action"]"#);
        assert!(catalog.categories[1].entries.is_empty());
        assert!(catalog.diagnostics().is_empty());
    }

    #[test]
    fn test_missing_categories_is_empty() {
        let catalog = Catalog::from_slice("{}").unwrap();
        assert!(catalog.categories.is_empty());
    }

    #[test]
    fn test_invalid_document() {
        let err = Catalog::from_slice("not json").unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidDocument);
        let err = Catalog::from_slice(r#"{"Categories": 5}"#).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidDocument);
    }

    #[test]
    fn test_malformed_units_are_skipped() {
        let json = r#"{"Categories": [
            "not a category",
            {"MainCategory": "Movies", "Entries": [42, {"Title": "Heat"}, ["nope"]]}
        ]}"#;
        let catalog = Catalog::from_slice(json).unwrap();
        assert_eq!(catalog.categories.len(), 1);
        assert_eq!(catalog.entry_count(), 1);
        assert_eq!(catalog.diagnostics().skipped(), 3);
        assert!(catalog.diagnostics().iter().all(|d| d.stage == Stage::Parse));
    }
}
