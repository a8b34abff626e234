//! Initialize an mdxld project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::DEFAULT_CONFIG;

/// Run the init command.
pub fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing mdxld...");

    write_if_allowed(config_path, DEFAULT_CONFIG, yes)?;

    let docs_dir = Path::new("docs");
    if !docs_dir.exists() {
        fs::create_dir_all(docs_dir).context("Failed to create docs directory")?;
    }
    write_if_allowed(&docs_dir.join("index.mdx"), DEFAULT_INDEX, yes)?;
    write_if_allowed(&docs_dir.join("getting-started.mdx"), DEFAULT_GETTING_STARTED, yes)?;

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'mdxld index' to build the document graph.");

    Ok(())
}

fn write_if_allowed(path: &Path, content: &str, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        tracing::warn!("{} already exists. Use --yes to overwrite.", path.display());
        return Ok(());
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Created {}", path.display());
    Ok(())
}

const DEFAULT_INDEX: &str = r#"---
$type: WebPage
title: Welcome
---

import { Callout } from './components/callout'

# Welcome

Each document starts with YAML frontmatter. Keys starting with `$` carry
linked data: `$id`, `$type` and `$context`.

Read [Getting Started](./getting-started) next.

<Callout type="info">

Run `mdxld links docs/index.mdx --source-id home` to see this page's relationships.

</Callout>
"#;

const DEFAULT_GETTING_STARTED: &str = r#"---
$type: HowTo
title: Getting Started
---

# Getting Started

## Inspect a document

```bash
mdxld parse docs/getting-started.mdx
mdxld tree docs/getting-started.mdx --outline
```

## Build the graph

```bash
mdxld index
```

This writes `graph/documents.json` and `graph/relationships.json`.

## Keep it fresh

```bash
mdxld watch
```

Back to the [home page](./).
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_documents_parse_with_linked_data() {
        for text in [DEFAULT_INDEX, DEFAULT_GETTING_STARTED] {
            let doc = mdxld::try_parse(text, mdxld::Mode::Expanded).unwrap();
            assert!(doc.doc_type().is_some());
            assert!(doc.get("title").is_some());
        }
    }

    #[test]
    fn sample_index_has_relationships() {
        let doc = mdxld::parse(DEFAULT_INDEX, mdxld::Mode::Expanded);

        let rels = mdxld::extract_relationships(&doc, &mdxld::ExtractOptions::new("home"));

        let kinds: Vec<_> = rels.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![mdxld::RelationshipType::Import, mdxld::RelationshipType::Link]
        );
    }
}
