//! Per-render variables.

use std::collections::BTreeMap;

use minijinja::Value;
use serde::Serialize;

/// Variables passed to one render call.
///
/// Owned by the caller; the registry never holds on to it.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct RenderContext {
    values: BTreeMap<String, Value>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert any serializable value under `key`, replacing an existing one.
    pub fn insert<V: Serialize>(&mut self, key: impl Into<String>, value: V) {
        self.values.insert(key.into(), Value::from_serialize(&value));
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with<V: Serialize>(mut self, key: impl Into<String>, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for RenderContext {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
