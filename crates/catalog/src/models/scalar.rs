use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

/// A loosely-typed value from the source document.
///
/// The catalog is hand-maintained and the same field can turn up as a number
/// in one entry, a string in the next and `null` in a third. Every text column
/// goes through this one adapter instead of inspecting JSON types at each call
/// site.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Scalar {
    /// Missing or `null`.
    #[default]
    Absent,
    Number(Number),
    Text(String),
    /// Booleans, arrays and objects: nothing sensible to store as text.
    Other,
}

/// How a [`Scalar`] is turned into its stored text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Free text; absent becomes an empty string.
    Text,
    /// Ratings; absent becomes `"0"`.
    Rating,
    /// Years; absent becomes `"0"` and fractional numbers are truncated.
    Year,
}
impl Coercion {
    /// Value stored when the input is absent or of an unsupported type.
    pub fn default_value(&self) -> &'static str {
        match self {
            Self::Text => "",
            Self::Rating | Self::Year => "0",
        }
    }
}

impl Scalar {
    /// Coerce into the stored text form. Total: never fails, never panics.
    pub fn coerce(&self, coercion: Coercion) -> String {
        match (self, coercion) {
            (Self::Text(text), _) => text.clone(),
            (Self::Number(number), Coercion::Year) => truncate(number),
            (Self::Number(number), _) => number.to_string(),
            (Self::Absent | Self::Other, coercion) => coercion.default_value().to_string(),
        }
    }

    /// Shorthand for [`Coercion::Text`].
    pub fn to_text(&self) -> String {
        self.coerce(Coercion::Text)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

fn truncate(number: &Number) -> String {
    if let Some(i) = number.as_i64() {
        return i.to_string();
    }
    if let Some(u) = number.as_u64() {
        return u.to_string();
    }
    // serde_json never produces non-finite floats; `as` saturates anyway.
    number.as_f64().map(|f| (f.trunc() as i64).to_string()).unwrap_or_else(|| number.to_string())
}

impl From<Value> for Scalar {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            Value::Number(number) => Self::Number(number),
            Value::String(text) => Self::Text(text),
            Value::Bool(_) | Value::Array(_) | Value::Object(_) => Self::Other,
        }
    }
}
impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}
