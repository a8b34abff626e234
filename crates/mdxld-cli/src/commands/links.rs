//! Relationship extraction for a single document.

use anyhow::Result;
use mdxld::{extract_relationships, ExtractOptions};

use super::parse::load;
use super::print_json;
use crate::config::ConfigFile;
use crate::LinksArgs;

/// Run the links command.
pub fn run(args: LinksArgs, config: &ConfigFile) -> Result<()> {
    let doc = load(&args.file, config.parse.mode, config.parse.strict)?;
    let options = extract_options(&args, config, doc.identifier());

    let relationships = extract_relationships(&doc, &options);
    tracing::debug!(
        "Found {} relationships in {}",
        relationships.len(),
        args.file.display()
    );
    print_json(&relationships)
}

/// Flags override config; the source id falls back to `$id`, then the path.
fn extract_options(
    args: &LinksArgs,
    config: &ConfigFile,
    identifier: Option<&str>,
) -> ExtractOptions {
    let rel = &config.relationships;
    let source_id = args
        .source_id
        .clone()
        .or_else(|| identifier.map(str::to_string))
        .unwrap_or_else(|| args.file.display().to_string());

    ExtractOptions {
        source_id,
        base_url: args.base_url.clone().or_else(|| rel.base_url.clone()),
        include_images: rel.include_images && !args.no_images,
        include_imports: rel.include_imports && !args.no_imports,
        include_embeds: rel.include_embeds && !args.no_embeds,
        internal_only: rel.internal_only || args.internal_only,
        created_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn links_args(argv: &[&str]) -> LinksArgs {
        let mut full = vec!["mdxld", "links"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            crate::Commands::Links(args) => args,
            _ => panic!("expected links command"),
        }
    }

    #[test]
    fn flags_override_config() {
        let mut config = ConfigFile::default();
        config.relationships.base_url = Some("https://config.example".to_string());

        let args = links_args(&[
            "a.mdx",
            "--source-id",
            "doc1",
            "--base-url",
            "https://flag.example",
            "--internal-only",
            "--no-images",
        ]);
        let options = extract_options(&args, &config, Some("urn:ignored"));

        assert_eq!(options.source_id, "doc1");
        assert_eq!(options.base_url.as_deref(), Some("https://flag.example"));
        assert!(options.internal_only);
        assert!(!options.include_images);
        assert!(options.include_imports);
    }

    #[test]
    fn source_id_falls_back_to_identifier_then_path() {
        let config = ConfigFile::default();
        let args = links_args(&["docs/a.mdx"]);

        assert_eq!(
            extract_options(&args, &config, Some("urn:a")).source_id,
            "urn:a"
        );
        assert_eq!(extract_options(&args, &config, None).source_id, "docs/a.mdx");
        assert_eq!(extract_options(&args, &config, None).base_url, None);
    }
}
