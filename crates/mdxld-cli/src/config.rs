//! Configuration file (mdxld.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mdxld::Mode;
use mdxld_index::IndexConfig;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub docs: DocsConfig,
    pub parse: ParseConfig,
    pub relationships: RelationshipsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    pub dir: PathBuf,
    pub output: PathBuf,
    pub extensions: Vec<String>,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("docs"),
            output: PathBuf::from("graph"),
            extensions: vec!["md".to_string(), "mdx".to_string()],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    pub mode: Mode,
    /// Fail on malformed frontmatter
    pub strict: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RelationshipsConfig {
    pub base_url: Option<String>,
    pub include_images: bool,
    pub include_imports: bool,
    pub include_embeds: bool,
    pub internal_only: bool,
}

impl Default for RelationshipsConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            include_images: true,
            include_imports: true,
            include_embeds: true,
            internal_only: false,
        }
    }
}

impl ConfigFile {
    /// Load configuration from `path` if it exists.
    /// Returns an error if the config file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            docs_dir: self.docs.dir.clone(),
            extensions: self.docs.extensions.clone(),
            mode: self.parse.mode,
            strict: self.parse.strict,
            base_url: self.relationships.base_url.clone(),
            include_images: self.relationships.include_images,
            include_imports: self.relationships.include_imports,
            include_embeds: self.relationships.include_embeds,
            internal_only: self.relationships.internal_only,
        }
    }
}

pub const DEFAULT_CONFIG: &str = r#"# MDXLD configuration

[docs]
# Directory of .md/.mdx documents to index
dir = "docs"

# Where `mdxld index` writes documents.json and relationships.json
output = "graph"

extensions = ["md", "mdx"]

[parse]
# "expanded" lifts $id, $type and $context out of the metadata; "flat" keeps them in place
mode = "expanded"

# Fail on malformed frontmatter instead of treating the file as plain body text
strict = false

[relationships]
# Base URL documents are published under, used to resolve relative links
# base_url = "https://example.com"

include_images = true
include_imports = true
include_embeds = true

# Keep only links that stay on the base URL's host
internal_only = false
"#;
