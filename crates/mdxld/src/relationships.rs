//! Relationship extraction.
//!
//! Walks a document's syntax tree and turns every outbound reference into a
//! typed edge `from -> to`. Extraction is a pure projection: nothing is
//! stored, and running it twice over the same content yields the same ids.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;
use xxhash_rust::xxh3::xxh3_64;

use crate::document::Document;
use crate::jsx::{self, AttributeValue};
use crate::tree::{LinkStyle, Node, NodeKind, Position};
use crate::Metadata;

/// Component attributes that may carry an embed target, in priority order.
const EMBED_ATTRIBUTES: &[&str] = &["src", "href", "url", "source"];

static SPECIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    // import x from './a' | import './a' | export * from './a'
    Regex::new(r#"\b(?:from|import)\s*["']([^"'\n]+)["']"#).expect("Invalid specifier regex")
});

/// Kind of reference that produced a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipType {
    Link,
    Image,
    Embed,
    Import,
    Mention,
    Reference,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Image => "image",
            Self::Embed => "embed",
            Self::Import => "import",
            Self::Mention => "mention",
            Self::Reference => "reference",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed, typed edge from a document to a target URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    /// Stable id derived from `(from, type, to)`
    pub id: String,

    #[serde(rename = "type")]
    pub kind: RelationshipType,

    /// Source document id
    pub from: String,

    /// Resolved target URL
    pub to: String,

    /// Extraction time
    pub created_at: DateTime<Utc>,

    /// Link text, source position, component attributes
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub data: Metadata,
}

/// Options for [`extract_relationships`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractOptions {
    /// Id of the document being extracted, used as every edge's `from`
    pub source_id: String,

    /// Base for resolving relative targets
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_true")]
    pub include_images: bool,

    #[serde(default = "default_true")]
    pub include_imports: bool,

    #[serde(default = "default_true")]
    pub include_embeds: bool,

    /// Keep only targets on the base URL's host
    #[serde(default)]
    pub internal_only: bool,

    /// Fixed timestamp for `created_at` (defaults to now)
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl ExtractOptions {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            base_url: None,
            include_images: true,
            include_imports: true,
            include_embeds: true,
            internal_only: false,
            created_at: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Deterministic id for an edge: XXH3-64 of `from:type:to` as 16 hex digits.
pub fn relationship_id(from: &str, kind: RelationshipType, to: &str) -> String {
    format!("{:016x}", xxh3_64(format!("{from}:{kind}:{to}").as_bytes()))
}

/// A reference found in the tree, before resolution.
struct Candidate {
    kind: RelationshipType,
    target: String,
    data: Metadata,
}

/// Extract relationships from a document's body, in document order.
///
/// Duplicates are kept: the same target linked twice yields two edges with
/// the same id and different positions.
pub fn extract_relationships(doc: &Document, options: &ExtractOptions) -> Vec<Relationship> {
    extract_from_tree(doc.tree(), options)
}

/// Extract relationships from an already built tree.
pub fn extract_from_tree(root: &Node, options: &ExtractOptions) -> Vec<Relationship> {
    let base = options.base_url.as_deref().and_then(|base| match Url::parse(base) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::debug!("Ignoring unparseable base URL {}: {}", base, e);
            None
        }
    });
    let base_host = base.as_ref().and_then(|b| b.host_str().map(str::to_string));
    let created_at = options.created_at.unwrap_or_else(Utc::now);

    let mut candidates = Vec::new();
    root.walk(&mut |node| collect(node, options, &mut candidates));

    candidates
        .into_iter()
        .filter_map(|candidate| {
            let to = resolve(&candidate.target, base.as_ref());
            if options.internal_only && !is_internal(&to, base_host.as_deref()) {
                return None;
            }
            Some(Relationship {
                id: relationship_id(&options.source_id, candidate.kind, &to),
                kind: candidate.kind,
                from: options.source_id.clone(),
                to,
                created_at,
                data: candidate.data,
            })
        })
        .collect()
}

fn collect(node: &Node, options: &ExtractOptions, out: &mut Vec<Candidate>) {
    match &node.kind {
        NodeKind::Link { url, title, style } => {
            let text = node.text_content();
            let mut data = located(node.position);
            data.insert("text".to_string(), json!(text));
            if let Some(title) = title {
                data.insert("title".to_string(), json!(title));
            }
            let kind = match style {
                LinkStyle::Reference { label } => {
                    data.insert("label".to_string(), json!(label));
                    RelationshipType::Reference
                }
                LinkStyle::Inline if text.starts_with('@') => RelationshipType::Mention,
                _ => RelationshipType::Link,
            };
            push(out, kind, url, data);
        }
        NodeKind::Image { url, title, alt, .. } if options.include_images => {
            let mut data = located(node.position);
            data.insert("alt".to_string(), json!(alt));
            if let Some(title) = title {
                data.insert("title".to_string(), json!(title));
            }
            push(out, RelationshipType::Image, url, data);
        }
        NodeKind::MdxComponent {
            name, attributes, ..
        } if options.include_embeds => {
            let target = EMBED_ATTRIBUTES
                .iter()
                .find_map(|key| jsx::attribute(attributes, key).and_then(AttributeValue::as_str))
                .filter(|target| !target.trim().is_empty());
            if let Some(target) = target {
                let mut data = located(node.position);
                data.insert("component".to_string(), json!(name));
                let strings: Metadata = attributes
                    .iter()
                    .filter_map(|a| a.value.as_str().map(|v| (a.name.clone(), json!(v))))
                    .collect();
                data.insert("attributes".to_string(), Value::Object(strings));
                push(out, RelationshipType::Embed, target, data);
            }
        }
        NodeKind::MdxImportExport { value } if options.include_imports => {
            for specifier in import_specifiers(value) {
                let mut data = located(node.position);
                data.insert("specifier".to_string(), json!(specifier));
                push(out, RelationshipType::Import, specifier, data);
            }
        }
        _ => {}
    }
}

fn push(out: &mut Vec<Candidate>, kind: RelationshipType, target: &str, data: Metadata) {
    out.push(Candidate {
        kind,
        target: target.to_string(),
        data,
    });
}

fn located(position: Position) -> Metadata {
    let mut data = Metadata::new();
    data.insert("line".to_string(), json!(position.line));
    data.insert("column".to_string(), json!(position.column));
    data
}

/// Module specifiers in an ESM block that point at content.
///
/// Bare package names (`react`, `@scope/pkg`, `node:fs`) are dependencies,
/// not content references, and are skipped.
pub fn import_specifiers(esm: &str) -> Vec<&str> {
    SPECIFIER_RE
        .captures_iter(esm)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|s| is_content_specifier(s))
        .collect()
}

fn is_content_specifier(specifier: &str) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || Url::parse(specifier).is_ok_and(|url| url.has_host())
}

/// Resolve `target` against `base`; on failure the original string is kept.
fn resolve(target: &str, base: Option<&Url>) -> String {
    let Some(base) = base else {
        return target.to_string();
    };
    match base.join(target) {
        Ok(url) => url.to_string(),
        Err(e) => {
            tracing::debug!("Could not resolve {} against {}: {}", target, base, e);
            target.to_string()
        }
    }
}

/// Whether a resolved target stays on the base host.
///
/// Relative targets count as internal; absolute targets without a host
/// (`mailto:`, `data:`) do not.
fn is_internal(target: &str, base_host: Option<&str>) -> bool {
    match Url::parse(target) {
        Ok(url) => match (url.host_str(), base_host) {
            (Some(host), Some(base)) => host.eq_ignore_ascii_case(base),
            _ => false,
        },
        Err(_) => true,
    }
}
