//! Raw shape of a flow definition document as written in YAML.
//!
//! These types only mirror the file. Nothing here is trusted until the
//! loader has turned it into a [`FlowDefinition`](super::FlowDefinition).

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::settings::{FlowSettings, LifecycleSettings};

pub(crate) fn default_terminal_state() -> String {
    "conversation_closed".to_string()
}

/// Top-level document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowDocument {
    pub initial_state: String,

    #[serde(default = "default_terminal_state")]
    pub terminal_state: String,

    #[serde(default)]
    pub settings: FlowSettings,

    /// Defaults seeded into every new conversation's context.
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,

    #[serde(default)]
    pub lifecycle: LifecycleSettings,

    pub states: BTreeMap<String, NodeSpec>,
}

/// One state as written. Which edge fields are present decides the node kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub true_next: Option<String>,
    #[serde(default)]
    pub false_next: Option<String>,
    #[serde(default)]
    pub options: Option<OptionList>,
    #[serde(default)]
    pub on_unmatched: Option<String>,
    #[serde(default, alias = "timeout_seconds")]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub on_timeout: Option<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
}

/// A menu entry as written.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionSpec {
    /// Label shown to the client; defaults to the key.
    #[serde(default)]
    pub message: Option<String>,
    pub next: String,
    #[serde(default)]
    pub intents: Vec<String>,
}

/// Menu options in document order.
///
/// Deserialized by hand so that order is kept, numeric keys (`1:`) are
/// accepted, and duplicates survive to be reported by the loader instead
/// of silently overwriting each other.
#[derive(Debug, Clone, Default)]
pub struct OptionList(pub Vec<(String, OptionSpec)>);

impl<'de> Deserialize<'de> for OptionList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OptionListVisitor;

        impl<'de> Visitor<'de> for OptionListVisitor {
            type Value = OptionList;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of option keys to options")
            }

            fn visit_map<A>(self, mut map: A) -> Result<OptionList, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some(key) = map.next_key::<ScalarKey>()? {
                    let spec = map.next_value::<OptionSpec>()?;
                    entries.push((key.0, spec));
                }
                Ok(OptionList(entries))
            }
        }

        deserializer.deserialize_map(OptionListVisitor)
    }
}

/// A mapping key that may be written as a string or a number.
struct ScalarKey(String);

impl<'de> Deserialize<'de> for ScalarKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ScalarKeyVisitor;

        impl<'de> Visitor<'de> for ScalarKeyVisitor {
            type Value = ScalarKey;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string or integer option key")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ScalarKey, E> {
                Ok(ScalarKey(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<ScalarKey, E> {
                Ok(ScalarKey(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<ScalarKey, E> {
                Ok(ScalarKey(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<ScalarKey, E> {
                Ok(ScalarKey(v.to_string()))
            }
        }

        deserializer.deserialize_any(ScalarKeyVisitor)
    }
}
