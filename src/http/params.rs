//! Ordered parameter mappings for query strings and form bodies.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use url::form_urlencoded;

/// An ordered, possibly multi-valued, string → string mapping.
///
/// Pairs are kept in insertion order, and a key listed with several values
/// appears once per value. Encoding follows the
/// `application/x-www-form-urlencoded` rules used for both query strings and
/// POST bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Appends a value under `key`, keeping any earlier values for the same key.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Builder-style variant of [`Params::push`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// All values recorded under `key`, in insertion order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Percent-encodes every pair and joins them with `&`.
    ///
    /// Returns an empty string for an empty mapping.
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ParamValue {
    One(Scalar),
    Many(Vec<Scalar>),
}

struct ParamsVisitor;

impl<'de> Visitor<'de> for ParamsVisitor {
    type Value = Params;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a mapping of parameter names to a value or a list of values")
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Params, E> {
        Ok(Params::new())
    }

    fn visit_map<A>(self, mut map: A) -> Result<Params, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut params = Params::new();

        while let Some((key, value)) = map.next_entry::<String, Option<ParamValue>>()? {
            match value {
                Some(ParamValue::One(v)) => params.push(key, v.into_string()),
                Some(ParamValue::Many(values)) => {
                    for v in values {
                        params.push(key.clone(), v.into_string());
                    }
                }
                None => params.push(key, ""),
            }
        }

        Ok(params)
    }
}

impl<'de> Deserialize<'de> for Params {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ParamsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_keeps_insertion_order() {
        let params = Params::new().with("b", "2").with("a", "1");
        assert_eq!(params.encode(), "b=2&a=1");
    }

    #[test]
    fn encode_escapes_reserved_characters() {
        let params = Params::new().with("q", "a b&c=d").with("ü", "/");
        assert_eq!(params.encode(), "q=a+b%26c%3Dd&%C3%BC=%2F");
    }

    #[test]
    fn deserialize_scalars_and_lists() {
        let params: Params = serde_yaml::from_str("a: 1\nb: [x, y]\nc: true\nd: text\n").unwrap();
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(
            pairs,
            vec![("a", "1"), ("b", "x"), ("b", "y"), ("c", "true"), ("d", "text")]
        );
    }

    #[test]
    fn deserialize_null_is_empty() {
        let params: Params = serde_yaml::from_str("~").unwrap();
        assert!(params.is_empty());
    }
}
