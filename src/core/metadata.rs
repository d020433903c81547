//! Node attributes.
//!
//! Every archive node (group or dataset) carries a small string-keyed
//! attribute map. Keys are unique, order is irrelevant.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single attribute value: scalar or 1-D array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
}

impl AttrValue {
    /// Read the value as an integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Read the value as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(v: Vec<f64>) -> Self {
        AttrValue::FloatArray(v)
    }
}

impl From<Vec<i64>> for AttrValue {
    fn from(v: Vec<i64>) -> Self {
        AttrValue::IntArray(v)
    }
}

/// Attribute map attached to a node.
pub type Attrs = BTreeMap<String, AttrValue>;

/// Build an [`Attrs`] map from `(name, value)` pairs.
pub fn attrs<I, K, V>(pairs: I) -> Attrs
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<AttrValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_conversions() {
        let a = attrs([("id", 3i64)]);
        assert_eq!(a["id"].as_int(), Some(3));
        assert_eq!(a["id"].as_text(), None);

        let a = attrs([("name", "ball")]);
        assert_eq!(a["name"].as_text(), Some("ball"));
    }

    #[test]
    fn test_attrs_keys_unique() {
        let a = attrs([("k", 1i64), ("k", 2i64)]);
        assert_eq!(a.len(), 1);
        assert_eq!(a["k"].as_int(), Some(2));
    }
}
