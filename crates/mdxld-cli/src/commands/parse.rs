//! Single-document commands: parse, stringify and tree.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use mdxld::{outline, try_parse, Document, Mode};
use mdxld_index::{FsLoader, Loader};

use super::print_json;

/// Load and parse one document.
pub(crate) fn load(path: &Path, mode: Mode, strict: bool) -> Result<Document> {
    let source = FsLoader.load(path)?;
    if strict {
        return try_parse(&source, mode)
            .with_context(|| format!("Failed to parse {}", path.display()));
    }
    Ok(mdxld::parse(&source, mode))
}

/// Run the parse command.
pub fn run(path: &Path, mode: Mode, strict: bool) -> Result<()> {
    let doc = load(path, mode, strict)?;
    print_json(&doc)
}

/// Run the stringify command.
pub fn stringify(path: &Path, mode: Mode) -> Result<()> {
    let json = FsLoader.load(path)?;
    let doc: Document = serde_json::from_str(&json)
        .with_context(|| format!("{} is not a document JSON", path.display()))?;

    let text = doc.stringify(mode)?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Run the tree command.
pub fn tree(path: &Path, mode: Mode, toc: bool) -> Result<()> {
    let doc = load(path, mode, false)?;
    if toc {
        return print_json(&outline(doc.tree()));
    }
    print_json(doc.tree())
}
