//! MDX documents with YAML-LD frontmatter.
//!
//! A document is a `---` delimited YAML block followed by an MDX body. The
//! reserved keys `$id`, `$type` and `$context` carry linked-data identity and
//! are lifted out of the metadata in [`Mode::Expanded`]. Parsing never fails
//! on bad frontmatter: the whole input becomes the body and a warning is
//! logged. Use [`try_parse`] to surface the error instead.
//!
//! ```
//! use mdxld::{parse, stringify, Mode, StringifyOptions};
//!
//! let doc = parse("---\n$type: Article\ntitle: Hello\n---\n# Hello\n", Mode::Expanded);
//! assert_eq!(doc.get("title").and_then(|v| v.as_str()), Some("Hello"));
//!
//! let text = stringify(&doc, &StringifyOptions::default()).unwrap();
//! assert!(text.starts_with("---\n$type: Article\n"));
//! ```

pub mod codeblock;
pub mod document;
pub mod frontmatter;
pub mod jsx;
pub mod ld;
pub mod relationships;
pub mod render;
pub mod stringify;
pub mod tree;

pub use document::Document;
pub use frontmatter::{decode, try_decode, Decoded, FrontmatterError};
pub use ld::{denormalize, normalize, LdContext, LdType, Mode, ModeParseError};
pub use relationships::{
    extract_relationships, relationship_id, ExtractOptions, Relationship, RelationshipType,
};
pub use render::render_html;
pub use stringify::{stringify, StringifyError, StringifyOptions};
pub use tree::{build_tree, outline, LinkStyle, Node, NodeKind, Position, TocEntry};

/// Frontmatter fields, in source order.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Errors from [`try_parse`].
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Frontmatter error: {0}")]
    Frontmatter(#[from] FrontmatterError),
}

/// Parse document text, degrading to a body-only document when the
/// frontmatter is malformed.
pub fn parse(source: &str, mode: Mode) -> Document {
    let Decoded { metadata, body } = decode(source);
    normalize(metadata, body, mode)
}

/// Parse document text, failing on malformed frontmatter.
pub fn try_parse(source: &str, mode: Mode) -> Result<Document, ParseError> {
    let Decoded { metadata, body } = try_decode(source)?;
    Ok(normalize(metadata, body, mode))
}

/// Syntax tree of a document's body.
pub fn to_tree(doc: &Document) -> &Node {
    doc.tree()
}
