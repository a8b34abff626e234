//! mdxld CLI - parse, inspect and index MDX documents with linked-data frontmatter.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use mdxld::Mode;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

use config::ConfigFile;

#[derive(Parser)]
#[command(name = "mdxld")]
#[command(about = "Parse, inspect and index MDX documents with YAML-LD frontmatter")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to mdxld.toml config file
    #[arg(short, long, default_value = "mdxld.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and a sample document
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Print a document as JSON
    Parse {
        file: PathBuf,

        /// expanded or flat (defaults to config)
        #[arg(short, long)]
        mode: Option<Mode>,

        /// Fail on malformed frontmatter
        #[arg(long)]
        strict: bool,
    },

    /// Turn a document JSON back into document text
    Stringify {
        file: PathBuf,

        #[arg(short, long)]
        mode: Option<Mode>,
    },

    /// Print the syntax tree of a document's body as JSON
    Tree {
        file: PathBuf,

        /// Print the table of contents instead of the full tree
        #[arg(long)]
        outline: bool,
    },

    /// Print the relationships of a document as JSON
    Links(LinksArgs),

    /// Index the docs directory and write the graph as JSON
    Index {
        /// Output directory (defaults to config or "graph")
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Index, then re-index documents as they change
    Watch {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct LinksArgs {
    file: PathBuf,

    /// Id of the document (defaults to its $id, then the file path)
    #[arg(long)]
    source_id: Option<String>,

    /// Base URL for resolving relative links
    #[arg(long)]
    base_url: Option<String>,

    /// Keep only links on the base URL's host
    #[arg(long)]
    internal_only: bool,

    #[arg(long)]
    no_images: bool,

    #[arg(long)]
    no_imports: bool,

    #[arg(long)]
    no_embeds: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config;
    let load_config = || ConfigFile::load(&config_path);

    // Execute command
    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(&config_path, yes)?;
        }
        Commands::Parse { file, mode, strict } => {
            let config = load_config()?;
            let mode = mode.unwrap_or(config.parse.mode);
            commands::parse::run(&file, mode, strict || config.parse.strict)?;
        }
        Commands::Stringify { file, mode } => {
            let config = load_config()?;
            commands::parse::stringify(&file, mode.unwrap_or(config.parse.mode))?;
        }
        Commands::Tree { file, outline } => {
            commands::parse::tree(&file, load_config()?.parse.mode, outline)?;
        }
        Commands::Links(args) => {
            commands::links::run(args, &load_config()?)?;
        }
        Commands::Index { output } => {
            commands::index::run(&load_config()?, output)?;
        }
        Commands::Watch { output } => {
            commands::watch::run(&load_config()?, output).await?;
        }
    }

    Ok(())
}
