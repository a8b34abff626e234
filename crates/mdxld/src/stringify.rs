//! Document serialization back to frontmatter + body text.

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::frontmatter::{starts_with_delimiter, DELIMITER};
use crate::ld::{denormalize, Mode};

/// Options for [`stringify`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringifyOptions {
    /// Mode the document was parsed with
    pub mode: Mode,
}

/// Errors that can occur when stringifying a document.
#[derive(Debug, thiserror::Error)]
pub enum StringifyError {
    #[error("Failed to encode frontmatter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Serialize a document as a `---` delimited YAML block followed by its body.
///
/// The body is appended verbatim. When there is no metadata the block is
/// omitted, unless the body itself opens with a delimiter line and would
/// otherwise be mistaken for frontmatter.
pub fn stringify(doc: &Document, options: &StringifyOptions) -> Result<String, StringifyError> {
    let metadata = denormalize(doc, options.mode);
    let body = doc.body();

    if metadata.is_empty() {
        if starts_with_delimiter(body) {
            return Ok(format!("{DELIMITER}\n{DELIMITER}\n{body}"));
        }
        return Ok(body.to_string());
    }

    let yaml = serde_yaml::to_string(&metadata)?;
    let mut out = String::with_capacity(yaml.len() + body.len() + 8);
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&yaml);
    if !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(body);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ld::{LdContext, LdType};
    use crate::{parse, Metadata};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn expanded() -> StringifyOptions {
        StringifyOptions {
            mode: Mode::Expanded,
        }
    }

    #[test]
    fn round_trips_linked_data_document() {
        let source = "---\n$type: Article\n$id: https://x/doc\ntitle: T\n---\nBody";
        let doc = parse(source, Mode::Expanded);

        let text = stringify(&doc, &expanded()).unwrap();
        let again = parse(&text, Mode::Expanded);

        assert_eq!(again, doc);
        assert_eq!(again.identifier(), Some("https://x/doc"));
        assert!(text.starts_with("---\n$id: https://x/doc\n$type: Article\ntitle: T\n---\n"));
        assert!(text.ends_with("---\nBody"));
    }

    #[test]
    fn emits_collections_as_blocks() {
        let doc = parse("---\ntags: [a, b]\nauthor:\n  name: Ada\n---\n", Mode::Expanded);

        let text = stringify(&doc, &expanded()).unwrap();

        assert!(text.contains("tags:\n- a\n- b\n"));
        assert!(text.contains("author:\n  name: Ada\n"));
    }

    #[test]
    fn quotes_ambiguous_scalars() {
        let doc = Document::new("").with_data(
            json!({"a": "true", "b": "1.5", "c": "x: y", "d": "null", "e": "---"})
                .as_object()
                .cloned()
                .unwrap(),
        );

        let text = stringify(&doc, &expanded()).unwrap();
        let again = parse(&text, Mode::Expanded);

        assert_eq!(again, doc);
    }

    #[test]
    fn omits_empty_block() {
        let doc = Document::new("# Plain\n");

        assert_eq!(stringify(&doc, &expanded()).unwrap(), "# Plain\n");
    }

    #[test]
    fn guards_bodies_that_look_like_frontmatter() {
        let doc = Document::new("---\ntitle: not metadata\n---\n");

        let text = stringify(&doc, &expanded()).unwrap();

        assert_eq!(text, "---\n---\n---\ntitle: not metadata\n---\n");
        assert_eq!(parse(&text, Mode::Expanded), doc);
    }

    #[test]
    fn flat_mode_round_trip_keeps_keys_in_metadata() {
        let source = "---\n$id: x\n$type: [A, B]\ntitle: T\n---\nBody";
        let doc = parse(source, Mode::Flat);

        let text = stringify(&doc, &StringifyOptions { mode: Mode::Flat }).unwrap();
        let again = parse(&text, Mode::Flat);

        assert_eq!(again, doc);
        assert_eq!(again.get("$type"), Some(&json!(["A", "B"])));
    }

    #[test]
    fn flat_stringify_of_expanded_document_loses_nothing() {
        let doc = parse(
            "---\n$id: x\n$type: A\n$context: https://schema.org\ntitle: T\n---\nBody",
            Mode::Expanded,
        );

        let text = stringify(&doc, &StringifyOptions { mode: Mode::Flat }).unwrap();

        assert_eq!(parse(&text, Mode::Expanded), doc);
        let flat = parse(&text, Mode::Flat);
        assert_eq!(flat.get("$id"), Some(&json!("x")));
        assert_eq!(flat.get("$context"), Some(&json!("https://schema.org")));
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            "[A-Za-z][A-Za-z0-9 ]{0,16}[A-Za-z0-9]".prop_map(Value::String),
            prop::sample::select(vec!["a: b", "# hash", "true", "null", "42", "---", "~", "- x"])
                .prop_map(|s| Value::String(s.to_string())),
            any::<i64>().prop_map(Value::from),
            (-4000i32..4000).prop_map(|n| Value::from(f64::from(n) / 8.0)),
            any::<bool>().prop_map(Value::Bool),
            Just(Value::Null),
        ]
    }

    fn value() -> impl Strategy<Value = Value> {
        scalar().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("k_[a-z0-9]{0,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn metadata() -> impl Strategy<Value = Metadata> {
        prop::collection::btree_map("k_[a-z0-9]{0,6}", value(), 0..6)
            .prop_map(|m| m.into_iter().collect())
    }

    fn ld_type() -> impl Strategy<Value = Option<LdType>> {
        prop_oneof![
            Just(None),
            "[A-Z][a-z]{1,8}".prop_map(|s| Some(LdType::One(s))),
            prop::collection::vec("[A-Z][a-z]{1,8}", 0..3).prop_map(|v| Some(LdType::Many(v))),
        ]
    }

    fn document() -> impl Strategy<Value = Document> {
        (
            proptest::option::of("https://example\\.com/[a-z]{1,8}"),
            ld_type(),
            proptest::option::of("https://schema\\.org/?"),
            metadata(),
            "\\PC{0,40}(\n\\PC{0,40}){0,3}",
        )
            .prop_map(|(id, ty, ctx, metadata, body)| {
                Document::new(body)
                    .with_data(metadata)
                    .with_identifier(id)
                    .with_type(ty)
                    .with_context(ctx.map(LdContext::Iri))
            })
    }

    proptest! {
        #[test]
        fn expanded_round_trip(doc in document()) {
            let text = stringify(&doc, &expanded()).unwrap();
            prop_assert_eq!(parse(&text, Mode::Expanded), doc);
        }

        #[test]
        fn flat_round_trip(metadata in metadata(), body in "\\PC{0,40}") {
            let doc = Document::new(body).with_data(metadata);
            let text = stringify(&doc, &StringifyOptions { mode: Mode::Flat }).unwrap();
            prop_assert_eq!(parse(&text, Mode::Flat), doc);
        }

        #[test]
        fn flat_stringify_never_drops_linked_data(doc in document()) {
            let text = stringify(&doc, &StringifyOptions { mode: Mode::Flat }).unwrap();
            prop_assert_eq!(parse(&text, Mode::Expanded), doc);
        }

        #[test]
        fn modes_differ_only_by_reserved_keys(doc in document()) {
            let text = stringify(&doc, &expanded()).unwrap();
            let flat = parse(&text, Mode::Flat);
            let expanded = parse(&text, Mode::Expanded);

            let mut stripped = flat.metadata().clone();
            for key in [crate::ld::ID_KEY, crate::ld::TYPE_KEY, crate::ld::CONTEXT_KEY] {
                let lifted = match key {
                    crate::ld::ID_KEY => expanded.identifier().is_some(),
                    crate::ld::TYPE_KEY => expanded.doc_type().is_some(),
                    _ => expanded.context().is_some(),
                };
                prop_assert_eq!(flat.metadata().contains_key(key), lifted);
                stripped.remove(key);
            }
            prop_assert_eq!(&stripped, expanded.metadata());
        }
    }
}
