//! Linked-data reserved keys and the expanded/flat document shapes.
//!
//! Three metadata keys carry linked-data meaning: `$id`, `$type` and
//! `$context`. In [`Mode::Expanded`] they are lifted out of the metadata bag
//! onto the [`Document`]; in [`Mode::Flat`] they stay where they were written.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;
use crate::Metadata;

/// Source key for [`Document::identifier`].
pub const ID_KEY: &str = "$id";
/// Source key for [`Document::doc_type`].
pub const TYPE_KEY: &str = "$type";
/// Source key for [`Document::context`].
pub const CONTEXT_KEY: &str = "$context";

/// How reserved keys are represented in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Reserved keys become top-level document fields
    #[default]
    Expanded,
    /// Reserved keys stay in the metadata bag
    Flat,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expanded => f.write_str("expanded"),
            Self::Flat => f.write_str("flat"),
        }
    }
}

/// Error returned when parsing an unknown mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown mode '{0}' (expected 'expanded' or 'flat')")]
pub struct ModeParseError(String);

impl FromStr for Mode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "expanded" => Ok(Self::Expanded),
            "flat" => Ok(Self::Flat),
            other => Err(ModeParseError(other.to_string())),
        }
    }
}

/// One or more semantic type tags (`$type`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LdType {
    One(String),
    Many(Vec<String>),
}

impl LdType {
    /// Interpret a metadata value; anything but a string or a list of strings is rejected.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::One(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Self::Many),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::One(s) => Value::String(s.clone()),
            Self::Many(types) => Value::Array(types.iter().cloned().map(Value::String).collect()),
        }
    }

    /// Whether `name` is one of the tags.
    pub fn contains(&self, name: &str) -> bool {
        match self {
            Self::One(s) => s == name,
            Self::Many(types) => types.iter().any(|t| t == name),
        }
    }
}

impl From<&str> for LdType {
    fn from(s: &str) -> Self {
        Self::One(s.to_string())
    }
}

/// Linked-data vocabulary declaration (`$context`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LdContext {
    /// Vocabulary IRI, e.g. `https://schema.org`
    Iri(String),
    /// Inline context object
    Inline(Metadata),
}

impl LdContext {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Iri(s.clone())),
            Value::Object(map) => Some(Self::Inline(map.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Iri(s) => Value::String(s.clone()),
            Self::Inline(map) => Value::Object(map.clone()),
        }
    }
}

impl From<&str> for LdContext {
    fn from(s: &str) -> Self {
        Self::Iri(s.to_string())
    }
}

/// Build a [`Document`] from decoded metadata and body.
///
/// In expanded mode a reserved key is lifted only when its value has the
/// expected shape; otherwise it stays in `metadata` untouched.
pub fn normalize(mut metadata: Metadata, body: String, mode: Mode) -> Document {
    if mode == Mode::Flat {
        return Document::from_parts(None, None, None, metadata, body);
    }

    let identifier = take_if(&mut metadata, ID_KEY, |v| v.as_str().map(str::to_string));
    let doc_type = take_if(&mut metadata, TYPE_KEY, LdType::from_value);
    let context = take_if(&mut metadata, CONTEXT_KEY, LdContext::from_value);

    Document::from_parts(identifier, doc_type, context, metadata, body)
}

/// Remove `key` from `metadata` when `convert` accepts its value.
fn take_if<T>(
    metadata: &mut Metadata,
    key: &str,
    convert: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    let converted = metadata.get(key).and_then(&convert)?;
    metadata.remove(key);
    Some(converted)
}

/// Rebuild the metadata bag for a [`Document`].
///
/// Top-level fields are always folded back in, whichever mode is requested:
/// a flat request on an expanded document must not drop its identifier, type
/// or context. Reserved keys come first; a top-level field overrides a
/// same-named key left in `metadata`.
pub fn denormalize(doc: &Document, mode: Mode) -> Metadata {
    let mut out = Metadata::new();

    let lifted = [
        (ID_KEY, doc.identifier().map(|id| Value::String(id.to_string()))),
        (TYPE_KEY, doc.doc_type().map(LdType::to_value)),
        (CONTEXT_KEY, doc.context().map(LdContext::to_value)),
    ];

    for (key, value) in lifted {
        match value {
            Some(value) => {
                if mode == Mode::Flat {
                    tracing::debug!("Folding top-level {} into flat metadata", key);
                }
                out.insert(key.to_string(), value);
            }
            None => {
                if let Some(value) = doc.metadata().get(key) {
                    out.insert(key.to_string(), value.clone());
                }
            }
        }
    }

    for (key, value) in doc.metadata() {
        if !out.contains_key(key) {
            out.insert(key.clone(), value.clone());
        }
    }

    out
}
