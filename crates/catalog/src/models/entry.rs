use super::Scalar;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A nested list (servers, seasons, related items) carried through verbatim.
///
/// Missing and `null` both collapse to an empty list, so the encoded form is
/// always a JSON value and never an empty string.
#[derive(Debug, Clone, PartialEq)]
pub struct Nested(Value);
impl Nested {
    pub fn new(value: Value) -> Self {
        match value {
            Value::Null => Self::default(),
            value => Self(value),
        }
    }

    pub fn is_empty_list(&self) -> bool {
        matches!(&self.0, Value::Array(items) if items.is_empty())
    }

    /// Encode into the self-contained blob stored in the snapshot.
    pub fn encode(&self, field: &'static str) -> Result<String> {
        serde_json::to_string(&self.0).or_raise(|| ErrorKind::Encode(field))
    }
}
impl Default for Nested {
    fn default() -> Self {
        Self(Value::Array(Vec::new()))
    }
}
impl From<Value> for Nested {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
impl<'de> Deserialize<'de> for Nested {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::new)
    }
}

/// One media item as described by the catalog, before normalization.
///
/// Every field is optional in the source and defaults to an empty value here,
/// never to "missing".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CatalogEntry {
    pub title: Scalar,
    pub sub_category: Scalar,
    pub country: Scalar,
    pub description: Scalar,
    pub poster: Scalar,
    pub thumbnail: Scalar,
    pub rating: Scalar,
    pub duration: Scalar,
    pub year: Scalar,
    pub servers: Nested,
    pub seasons: Nested,
    pub related: Nested,
}
impl CatalogEntry {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Scalar::Text(title.into()),
            ..Self::default()
        }
    }
}
