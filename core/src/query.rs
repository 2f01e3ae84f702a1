//! Query string encoding.
//!
//! Parameters are collected in insertion order with optional values. Absent
//! values are dropped at encoding time, while falsy-but-present values (`0`,
//! `""`, `false`) are kept.

use std::fmt;

use crate::types::{Pagination, SpectralClass, StarSystemFilters};

/// A scalar query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Int(v) => write!(f, "{v}"),
            QueryValue::Float(v) => write!(f, "{v}"),
            QueryValue::Bool(v) => write!(f, "{v}"),
            QueryValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<i64> for QueryValue {
    fn from(v: i64) -> Self {
        QueryValue::Int(v)
    }
}

impl From<u32> for QueryValue {
    fn from(v: u32) -> Self {
        QueryValue::Int(i64::from(v))
    }
}

impl From<i32> for QueryValue {
    fn from(v: i32) -> Self {
        QueryValue::Int(i64::from(v))
    }
}

impl From<f64> for QueryValue {
    fn from(v: f64) -> Self {
        QueryValue::Float(v)
    }
}

impl From<bool> for QueryValue {
    fn from(v: bool) -> Self {
        QueryValue::Bool(v)
    }
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        QueryValue::Str(v.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        QueryValue::Str(v)
    }
}

impl From<SpectralClass> for QueryValue {
    fn from(v: SpectralClass) -> Self {
        QueryValue::Str(v.as_str().to_string())
    }
}

/// Named query parameters, each possibly absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, Option<QueryValue>)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a present value. A later call with the same key replaces it.
    pub fn with(self, key: &str, value: impl Into<QueryValue>) -> Self {
        self.with_opt(key, Some(value))
    }

    /// Set a value that may be absent; `None` is recorded and later omitted.
    pub fn with_opt<V: Into<QueryValue>>(mut self, key: &str, value: Option<V>) -> Self {
        let value = value.map(Into::into);
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key.to_string(), value)),
        }
        self
    }

    pub fn filters(self, filters: &StarSystemFilters) -> Self {
        self.with_opt("spectral_class", filters.spectral_class)
            .with_opt("min_stars", filters.min_stars)
            .with_opt("max_stars", filters.max_stars)
    }

    pub fn pagination(self, pagination: Pagination) -> Self {
        self.with_opt("page", pagination.page)
            .with_opt("page_size", pagination.page_size)
    }

    /// Present pairs in insertion order.
    pub fn present(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.pairs
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.as_str(), v)))
    }

    /// Encode as `?k=v&...`, or an empty string when nothing is present.
    pub fn encode(&self) -> String {
        encode_pairs(self.present())
    }

    /// Encode with pairs sorted by key, so that two parameter sets with the
    /// same contents yield the same string regardless of insertion order.
    pub fn canonical(&self) -> String {
        let mut pairs: Vec<_> = self.present().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        encode_pairs(pairs)
    }
}

fn encode_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a QueryValue)>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, &value.to_string());
    }
    let query = serializer.finish();
    if query.is_empty() {
        query
    } else {
        format!("?{query}")
    }
}

/// Encode an ad-hoc mapping of optional values.
pub fn encode<'a, I, V>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, Option<V>)>,
    V: Into<QueryValue>,
{
    params
        .into_iter()
        .fold(QueryParams::new(), |acc, (k, v)| acc.with_opt(k, v))
        .encode()
}
