//! Helpers for composing the query strings and fragments of embed URLs.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::RuntimeFilter;

/// An ordered set of query parameters. Keys keep their insertion order so
/// the emitted query string is stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(IndexMap<String, Value>);

impl QueryParams {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous value but keeping its position
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Look up a parameter
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether a parameter is present
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no parameter is set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Join the parameters as `key=value` pairs separated by `&`.
    ///
    /// Strings, numbers and booleans are written as-is; arrays and objects
    /// are written as JSON. Returns `None` when no parameter is set.
    pub fn to_query_string(&self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }

        let pairs: Vec<String> = self
            .0
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| format!("{key}={}", serialize_param(value)))
            .collect();

        (!pairs.is_empty()).then(|| pairs.join("&"))
    }
}

fn serialize_param(value: &Value) -> String {
    match value {
        Value::String(value) => value.clone(),
        Value::Number(value) => value.to_string(),
        Value::Bool(value) => value.to_string(),
        other => other.to_string(),
    }
}

/// Serialize runtime filters as indexed `col{n}`, `op{n}` and `val{n}`
/// parameters, numbering from 1. Every operand gets its own `val{n}`.
pub fn filter_query(filters: &[RuntimeFilter]) -> Option<String> {
    if filters.is_empty() {
        return None;
    }

    let expressions: Vec<String> = filters
        .iter()
        .enumerate()
        .map(|(position, filter)| {
            let index = position + 1;
            let mut parts = vec![
                format!("col{index}={}", filter.column_name),
                format!("op{index}={}", filter.operator.as_str()),
            ];
            parts.extend(
                filter
                    .values
                    .iter()
                    .map(|value| format!("val{index}={value}")),
            );
            parts.join("&")
        })
        .collect();

    Some(expressions.join("&"))
}

/// A CSS dimension: bare numbers are pixels, strings pass through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    /// A size in pixels
    Pixels(u32),
    /// Any CSS length, e.g. `"100%"`
    Css(String),
}

impl Dimension {
    /// The CSS text for this dimension
    pub fn to_css(&self) -> String {
        match self {
            Dimension::Pixels(pixels) => format!("{pixels}px"),
            Dimension::Css(css) => css.clone(),
        }
    }
}

impl From<u32> for Dimension {
    fn from(pixels: u32) -> Self {
        Dimension::Pixels(pixels)
    }
}

impl From<&str> for Dimension {
    fn from(css: &str) -> Self {
        Dimension::Css(css.to_string())
    }
}

/// Append `suffix` (URI-component encoded) to the hash fragment of `url`,
/// creating the fragment if there is none.
pub fn append_to_url_hash(url: &str, suffix: &str) -> String {
    let encoded = urlencoding::encode(suffix);
    if url.contains('#') {
        format!("{url}{encoded}")
    } else {
        format!("{url}#{encoded}")
    }
}

/// Encode a query string as unpadded URL-safe base64.
pub fn encode_query_flags(query: &str) -> String {
    URL_SAFE_NO_PAD.encode(query.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FilterValue, RuntimeFilterOp};
    use serde_json::json;

    #[test]
    fn it_serializes_a_single_filter() {
        let filters = vec![RuntimeFilter::new(
            "sales",
            RuntimeFilterOp::Eq,
            [FilterValue::from(1000i64)],
        )];

        assert_eq!(
            filter_query(&filters).as_deref(),
            Some("col1=sales&op1=EQ&val1=1000")
        );
    }

    #[test]
    fn it_numbers_filters_and_repeats_values() {
        let filters = vec![
            RuntimeFilter::new(
                "region",
                RuntimeFilterOp::In,
                [FilterValue::from("east"), FilterValue::from("west")],
            ),
            RuntimeFilter::new("active", RuntimeFilterOp::Eq, [FilterValue::from(true)]),
        ];

        assert_eq!(
            filter_query(&filters).as_deref(),
            Some("col1=region&op1=IN&val1=east&val1=west&col2=active&op2=EQ&val2=true")
        );
        assert_eq!(filter_query(&[]), None);
    }

    #[test]
    fn it_writes_collections_as_json() {
        let mut params = QueryParams::new();
        params
            .insert("flag", true)
            .insert("count", 3)
            .insert("name", "x")
            .insert("list", json!(["a", "b"]));

        assert_eq!(
            params.to_query_string().as_deref(),
            Some(r#"flag=true&count=3&name=x&list=["a","b"]"#)
        );
        assert_eq!(QueryParams::new().to_query_string(), None);
    }

    #[test]
    fn it_formats_css_dimensions() {
        assert_eq!(Dimension::from(720).to_css(), "720px");
        assert_eq!(Dimension::from("50%").to_css(), "50%");
    }

    #[test]
    fn it_appends_to_the_url_hash() {
        assert_eq!(append_to_url_hash("http://a/b", "x y"), "http://a/b#x%20y");
        assert_eq!(append_to_url_hash("http://a/#/b", "m"), "http://a/#/bm");
    }

    #[test]
    fn it_encodes_flags_as_url_safe_base64() {
        assert_eq!(encode_query_flags("embedApp=true"), "ZW1iZWRBcHA9dHJ1ZQ");
        assert_eq!(encode_query_flags("??>"), "Pz8-");
    }
}
