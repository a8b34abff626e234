//! The in-memory document model.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ld::{LdContext, LdType, Mode};
use crate::render::render_html;
use crate::stringify::{stringify, StringifyError, StringifyOptions};
use crate::tree::{build_tree, Node};
use crate::Metadata;

/// A parsed MDXLD document.
///
/// Documents are values: the `with_*` methods return a modified copy and never
/// touch `self`. The syntax tree and HTML are derived lazily and cached per
/// value; they take no part in equality or serialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identifier: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    doc_type: Option<LdType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<LdContext>,

    #[serde(default)]
    metadata: Metadata,

    #[serde(default)]
    body: String,

    #[serde(skip)]
    tree: OnceLock<Node>,

    #[serde(skip)]
    compiled: OnceLock<String>,
}

impl Document {
    /// Create a document with a body and no metadata.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    pub(crate) fn from_parts(
        identifier: Option<String>,
        doc_type: Option<LdType>,
        context: Option<LdContext>,
        metadata: Metadata,
        body: String,
    ) -> Self {
        Self {
            identifier,
            doc_type,
            context,
            metadata,
            body,
            tree: OnceLock::new(),
            compiled: OnceLock::new(),
        }
    }

    /// Parse document text. See [`crate::parse`].
    pub fn parse(source: &str, mode: Mode) -> Self {
        crate::parse(source, mode)
    }

    /// Serialize back to document text. See [`crate::stringify()`].
    pub fn stringify(&self, mode: Mode) -> Result<String, StringifyError> {
        stringify(self, &StringifyOptions { mode })
    }

    /// Globally unique reference (`$id`)
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Semantic type tags (`$type`)
    pub fn doc_type(&self) -> Option<&LdType> {
        self.doc_type.as_ref()
    }

    /// Linked-data context (`$context`)
    pub fn context(&self) -> Option<&LdContext> {
        self.context.as_ref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Look up a single metadata value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Return a copy with `patch` shallow-merged into the metadata.
    pub fn with_data(&self, patch: Metadata) -> Self {
        let mut metadata = self.metadata.clone();
        metadata.extend(patch);
        Self::from_parts(
            self.identifier.clone(),
            self.doc_type.clone(),
            self.context.clone(),
            metadata,
            self.body.clone(),
        )
    }

    /// Return a copy with a different body.
    pub fn with_body(&self, body: impl Into<String>) -> Self {
        Self::from_parts(
            self.identifier.clone(),
            self.doc_type.clone(),
            self.context.clone(),
            self.metadata.clone(),
            body.into(),
        )
    }

    pub fn with_identifier(&self, identifier: Option<String>) -> Self {
        Self::from_parts(
            identifier,
            self.doc_type.clone(),
            self.context.clone(),
            self.metadata.clone(),
            self.body.clone(),
        )
    }

    pub fn with_type(&self, doc_type: Option<LdType>) -> Self {
        Self::from_parts(
            self.identifier.clone(),
            doc_type,
            self.context.clone(),
            self.metadata.clone(),
            self.body.clone(),
        )
    }

    pub fn with_context(&self, context: Option<LdContext>) -> Self {
        Self::from_parts(
            self.identifier.clone(),
            self.doc_type.clone(),
            context,
            self.metadata.clone(),
            self.body.clone(),
        )
    }

    /// Syntax tree of the body, built on first access.
    pub fn tree(&self) -> &Node {
        self.tree.get_or_init(|| build_tree(&self.body))
    }

    /// Body rendered to HTML, built on first access.
    pub fn html(&self) -> &str {
        self.compiled.get_or_init(|| render_html(&self.body))
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
            && self.doc_type == other.doc_type
            && self.context == other.context
            && self.metadata == other.metadata
            && self.body == other.body
    }
}
