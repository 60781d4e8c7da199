//! medialib - local music library scanner
//!
//! Entry point for the `medialib` command line tool.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use medialib::observability::init_tracing;
use medialib::storage::{BrowseArgs, BrowseOrder, SearchOptions, SortDirection};
use medialib::{Config, LocalLibrary};

/// medialib - local music library scanner
#[derive(Parser, Debug)]
#[command(name = "medialib")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, env = "MEDIALIB_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the `SQLite` catalog
    #[arg(short, long, env = "MEDIALIB_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Library root directories
    #[arg(short, long, env = "MEDIALIB_LIBRARIES", value_delimiter = ',')]
    library: Vec<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "MEDIALIB_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging output
    #[arg(long, env = "MEDIALIB_LOG_JSON")]
    log_json: bool,

    /// Skip every throttling pause
    #[arg(long, env = "MEDIALIB_FAST_SCAN")]
    fast: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan every library root once and print the report
    Scan,

    /// Scan, then apply file changes until interrupted
    Watch,

    /// Search tracks by title, album or artist (JSON lines)
    Search {
        query: String,

        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List albums or artists (JSON lines)
    Browse {
        #[arg(value_enum)]
        kind: BrowseKind,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 10)]
        per_page: u32,

        /// Order by id instead of name
        #[arg(long)]
        by_id: bool,

        /// Sort descending
        #[arg(long)]
        desc: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BrowseKind {
    Albums,
    Artists,
}

impl Cli {
    /// File values first, then CLI and environment overrides.
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(dir) = &self.data_dir {
            config.data_dir.clone_from(dir);
        }
        if !self.library.is_empty() {
            config.roots.clone_from(&self.library);
        }
        if let Some(level) = &self.log_level {
            config.log_level.clone_from(level);
        }
        config.fast_scan |= self.fast;

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    init_tracing(&config.log_level, cli.log_json);

    tracing::info!("medialib v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!(?config, "Configuration loaded");

    config.validate()?;

    let watch = matches!(cli.command, Command::Watch);
    let library = LocalLibrary::open(&config)
        .with_context(|| format!("failed to open catalog in {}", config.data_dir.display()))?
        .watching(watch);

    match cli.command {
        Command::Scan => {
            let report = library.scan().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Watch => {
            let report = library.scan().await;
            tracing::info!(
                media_files = report.totals().media_files,
                watched = library.watched_dirs().len(),
                "Watching for changes, press Ctrl-C to stop"
            );
            tokio::signal::ctrl_c().await?;

            let stats = library.watcher_stats();
            tracing::info!(
                indexed = stats.files_indexed,
                removed = stats.files_removed,
                errors = stats.errors,
                "Shutting down"
            );
        }
        Command::Search { query, limit } => {
            let options = SearchOptions {
                limit,
                ..SearchOptions::default()
            };
            for hit in library.search_with(&query, &options)? {
                println!("{}", serde_json::to_string(&hit)?);
            }
        }
        Command::Browse {
            kind,
            page,
            per_page,
            by_id,
            desc,
        } => {
            let args = BrowseArgs {
                page,
                per_page,
                order: if by_id { BrowseOrder::Id } else { BrowseOrder::Name },
                direction: if desc {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                },
            };
            match kind {
                BrowseKind::Albums => {
                    let page = library.browse_albums(&args)?;
                    for album in &page.items {
                        println!("{}", serde_json::to_string(album)?);
                    }
                    tracing::info!(total = page.total, "Albums listed");
                }
                BrowseKind::Artists => {
                    let page = library.browse_artists(&args)?;
                    for artist in &page.items {
                        println!("{}", serde_json::to_string(artist)?);
                    }
                    tracing::info!(total = page.total, "Artists listed");
                }
            }
        }
    }

    Ok(())
}
