//! Frontmatter extraction and parsing.
//!
//! A metadata block is a YAML mapping between two `---` delimiter lines at the
//! very start of a document:
//!
//! ```text
//! ---
//! $type: Article
//! title: Hello
//! ---
//! # Body
//! ```

use serde_json::Value;

use crate::Metadata;

/// The delimiter line that opens and closes a metadata block.
pub const DELIMITER: &str = "---";

/// A document split into its decoded metadata and remaining body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    /// Key-value pairs from the metadata block (empty when there is none)
    pub metadata: Metadata,

    /// Everything after the closing delimiter line
    pub body: String,
}

/// Errors that can occur when decoding frontmatter.
///
/// Line and column numbers are 1-based and refer to the whole document.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrontmatterError {
    #[error("Unclosed frontmatter block opened at line {line} - missing closing ---")]
    Unclosed { line: usize },

    #[error("Invalid YAML in frontmatter at line {line}, column {column}: {message}")]
    InvalidYaml {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Frontmatter at line {line} is not a key-value mapping")]
    NotAMapping { line: usize },
}

impl FrontmatterError {
    /// The document line the error points at.
    pub fn line(&self) -> usize {
        match self {
            Self::Unclosed { line } | Self::NotAMapping { line } => *line,
            Self::InvalidYaml { line, .. } => *line,
        }
    }
}

/// Whether a single line (with or without its line terminator) is a delimiter.
pub(crate) fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

/// Whether `text` begins with a delimiter line.
pub(crate) fn starts_with_delimiter(text: &str) -> bool {
    text.lines().next().is_some_and(is_delimiter)
}

/// Locate the metadata block. Returns the raw YAML and the body.
///
/// `Ok(None)` means the text has no metadata block at all.
fn split(source: &str) -> Result<Option<(&str, &str)>, FrontmatterError> {
    let Some(first_end) = source.find('\n') else {
        return Ok(None);
    };
    if !is_delimiter(&source[..first_end]) {
        return Ok(None);
    }

    let rest = &source[first_end + 1..];
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if is_delimiter(line) {
            return Ok(Some((&rest[..offset], &rest[offset + line.len()..])));
        }
        offset += line.len();
    }

    Err(FrontmatterError::Unclosed { line: 1 })
}

/// Whether a YAML block carries no data (blank lines and comments only).
fn is_blank_yaml(yaml: &str) -> bool {
    yaml.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

/// Decode frontmatter, reporting malformed blocks as errors.
pub fn try_decode(source: &str) -> Result<Decoded, FrontmatterError> {
    let Some((yaml, body)) = split(source)? else {
        return Ok(Decoded {
            metadata: Metadata::new(),
            body: source.to_string(),
        });
    };

    if is_blank_yaml(yaml) {
        return Ok(Decoded {
            metadata: Metadata::new(),
            body: body.to_string(),
        });
    }

    // The YAML starts on the line after the opening delimiter.
    let value: Value = serde_yaml::from_str(yaml).map_err(|e| {
        let (line, column) = e
            .location()
            .map(|loc| (loc.line() + 1, loc.column()))
            .unwrap_or((2, 1));
        FrontmatterError::InvalidYaml {
            message: e.to_string(),
            line,
            column,
        }
    })?;

    match value {
        Value::Object(metadata) => Ok(Decoded {
            metadata,
            body: body.to_string(),
        }),
        Value::Null => Ok(Decoded {
            metadata: Metadata::new(),
            body: body.to_string(),
        }),
        _ => Err(FrontmatterError::NotAMapping { line: 2 }),
    }
}

/// Decode frontmatter, degrading gracefully.
///
/// A malformed block is treated as body text: the result has empty metadata
/// and the entire input as its body.
pub fn decode(source: &str) -> Decoded {
    match try_decode(source) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::warn!("Ignoring malformed frontmatter: {}", e);
            Decoded {
                metadata: Metadata::new(),
                body: source.to_string(),
            }
        }
    }
}
