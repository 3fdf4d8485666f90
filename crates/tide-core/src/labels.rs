//! Reserved label keys.
//!
//! Identity labels are written onto every secret and config Tideway
//! creates; the garbage collector reads them back to decide which live
//! objects are still referenced. Directive labels are only ever read from
//! declarations and are stripped before anything is written to the cluster.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use crate::types::Labels;

/// Label carrying the stack namespace on services, as set by the
/// cluster's stack deployer.
pub const STACK_NAMESPACE: &str = "com.docker.stack.namespace";

/// Identity labels attached to materialized variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedLabel {
    /// Logical name (stack file key) of the variable.
    Name,
    /// Full sha256 of the trimmed content.
    Hash,
    /// Stack the variable belongs to.
    Stack,
    /// Deployment version that created it.
    Version,
}

impl ReservedLabel {
    pub const ALL: [ReservedLabel; 4] = [Self::Name, Self::Hash, Self::Stack, Self::Version];

    pub const fn key(&self) -> &'static str {
        match self {
            Self::Name => "io.tideway.variable.name",
            Self::Hash => "io.tideway.variable.hash",
            Self::Stack => "io.tideway.stack",
            Self::Version => "io.tideway.version",
        }
    }
}

/// Input-only labels that steer resolution of a single declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// Leave the declaration untouched.
    Ignore,
    /// Encode the resolved content before materializing it.
    Encode,
    /// Decode the resolved content before materializing it.
    Decode,
}

impl Directive {
    pub const ALL: [Directive; 3] = [Self::Ignore, Self::Encode, Self::Decode];

    pub const fn key(&self) -> &'static str {
        match self {
            Self::Ignore => "io.tideway.ignore",
            Self::Encode => "io.tideway.encode",
            Self::Decode => "io.tideway.decode",
        }
    }
}

/// Returns true if every identity label is present.
pub fn has_identity(labels: &Labels) -> bool {
    ReservedLabel::ALL
        .iter()
        .all(|label| labels.contains_key(label.key()))
}

/// Copy of `labels` with all directive labels removed.
pub fn without_directives(labels: &Labels) -> Labels {
    labels
        .iter()
        .filter(|(key, _)| !Directive::ALL.iter().any(|d| d.key() == key.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Accepts labels either as a map or as a list of `key=value` strings.
pub fn deserialize_labels<'de, D>(deserializer: D) -> Result<Labels, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawLabels {
        Map(BTreeMap<String, LabelValue>),
        List(Vec<String>),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LabelValue {
        Text(String),
        Bool(bool),
        Number(serde_json::Number),
    }

    let raw = Option::<RawLabels>::deserialize(deserializer)?;
    Ok(match raw {
        None => Labels::new(),
        Some(RawLabels::Map(map)) => map
            .into_iter()
            .map(|(k, v)| {
                let value = match v {
                    LabelValue::Text(s) => s,
                    LabelValue::Bool(b) => b.to_string(),
                    LabelValue::Number(n) => n.to_string(),
                };
                (k, value)
            })
            .collect(),
        Some(RawLabels::List(items)) => items
            .into_iter()
            .map(|item| match item.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (item, String::new()),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "deserialize_labels")]
        labels: Labels,
    }

    #[test]
    fn labels_from_map_and_list() {
        let map: Holder =
            serde_json::from_str(r#"{"labels": {"team": "core", "tier": 2, "public": false}}"#)
                .unwrap();
        assert_eq!(map.labels["team"], "core");
        assert_eq!(map.labels["tier"], "2");
        assert_eq!(map.labels["public"], "false");

        let list: Holder =
            serde_json::from_str(r#"{"labels": ["team=core", "flag"]}"#).unwrap();
        assert_eq!(list.labels["team"], "core");
        assert_eq!(list.labels["flag"], "");

        let missing: Holder = serde_json::from_str("{}").unwrap();
        assert!(missing.labels.is_empty());
    }

    #[test]
    fn directives_are_stripped() {
        let mut labels = Labels::new();
        labels.insert("team".into(), "core".into());
        labels.insert(Directive::Encode.key().into(), "base64".into());
        labels.insert(Directive::Ignore.key().into(), "true".into());

        let stripped = without_directives(&labels);
        assert_eq!(stripped.len(), 1);
        assert!(stripped.contains_key("team"));
    }

    #[test]
    fn identity_requires_all_four_labels() {
        let mut labels = Labels::new();
        for label in &ReservedLabel::ALL[..3] {
            labels.insert(label.key().into(), "x".into());
        }
        assert!(!has_identity(&labels));
        labels.insert(ReservedLabel::Version.key().into(), "v1".into());
        assert!(has_identity(&labels));
    }
}
