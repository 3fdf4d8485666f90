//! Priority-layered variable environment.
//!
//! Layers are applied lowest first; a later layer overwrites earlier
//! values for the same name. The origin layer of every entry is kept so
//! callers can report where a value came from.

use std::collections::BTreeMap;
use std::fmt;

/// Synthetic entry holding the stack name.
pub const STACK_NAME_VAR: &str = "STACK_NAME";
/// Synthetic entry holding the deployment version.
pub const DEPLOYMENT_VERSION_VAR: &str = "DEPLOYMENT_VERSION";

/// Where a value entered the environment, lowest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Process,
    Variables,
    Secrets,
    Synthetic,
    Extra,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::Variables => "variables",
            Self::Secrets => "secrets",
            Self::Synthetic => "synthetic",
            Self::Extra => "extra",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    value: String,
    layer: Layer,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableEnvironment {
    entries: BTreeMap<String, Entry>,
}

impl VariableEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment made of a single `variables` layer.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut env = Self::new();
        env.layer(Layer::Variables, pairs);
        env
    }

    /// Apply a layer on top of the current entries.
    pub fn layer<I, K, V>(&mut self, layer: Layer, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in pairs {
            self.entries.insert(
                name.into(),
                Entry {
                    value: value.into(),
                    layer,
                },
            );
        }
    }

    /// Remove the named entries. Returns how many were present.
    pub fn exclude<S: AsRef<str>>(&mut self, names: &[S]) -> usize {
        names
            .iter()
            .filter(|name| self.entries.remove(name.as_ref()).is_some())
            .count()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|e| e.value.as_str())
    }

    pub fn origin(&self, name: &str) -> Option<Layer> {
        self.entries.get(name).map(|e| e.layer)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterate `(name, value, layer)` in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, Layer)> {
        self.entries
            .iter()
            .map(|(k, e)| (k.as_str(), e.value.as_str(), e.layer))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
