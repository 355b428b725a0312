//! Ordered, string-keyed container of typed configuration and result values
//!
//! A [`PropertyBag`] describes a copy job's configuration on the way in and
//! records its outcome on the way out. Keys are plain strings; values are a
//! tagged union rather than pre-serialized strings, so lookups are type-safe
//! while the scalar variants still expose the string representation used by
//! callers that treat everything as text.

use crate::status::Status;
use std::fmt;

/// A typed value held by a [`PropertyBag`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// A string
    Str(String),
    /// A signed integer
    Int(i64),
    /// A boolean
    Bool(bool),
    /// A job outcome status
    Status(Status),
    /// An ordered list of strings
    StrList(Vec<String>),
}

impl Value {
    /// The string representation of a scalar value
    ///
    /// Status and list values have no single-string form and return `None`.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s.clone()),
            Self::Int(i) => Some(i.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Status(_) | Self::StrList(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Status(s) => write!(f, "{s}"),
            Self::StrList(list) => write!(f, "{}", list.join(",")),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Status> for Value {
    fn from(value: Status) -> Self {
        Self::Status(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Self::StrList(value)
    }
}

/// Ordered mapping from string keys to typed values
///
/// Insertion order is irrelevant for lookup but preserved for iteration, so
/// serialized result bags come out deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyBag {
    entries: Vec<(String, Value)>,
}

impl PropertyBag {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key, overwriting any previous value
    pub fn set<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Look up a key
    ///
    /// Returns `None` for absent keys; lookup never fails.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Get a key as a string, coercing scalar values through their string
    /// representation
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(Value::as_string)
    }

    /// Get a key as an integer
    ///
    /// Accepts `Int` directly and `Str` values that parse as an integer.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Int(i) => Some(*i),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Get a key as a boolean
    ///
    /// Accepts `Bool` directly and the string forms `true`/`false`/`1`/`0`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Str(s) => match s.trim() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Get a key as a status value
    pub fn get_status(&self, key: &str) -> Option<&Status> {
        match self.get(key)? {
            Value::Status(s) => Some(s),
            _ => None,
        }
    }

    /// Get a key as a string list
    pub fn get_list(&self, key: &str) -> Option<&[String]> {
        match self.get(key)? {
            Value::StrList(list) => Some(list),
            _ => None,
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for PropertyBag {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut bag = Self::new();
        for (key, value) in iter {
            bag.set(key, value);
        }
        bag
    }
}
