//! # Spindle CLI (`spindle`)
//!
//! ## Usage
//!
//! ```bash
//! spindle --config ./config/spindle.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `spindle init` | Create the SQLite database and run schema migrations |
//! | `spindle add` | Insert or refresh a release by external id |
//! | `spindle list` | List releases, optionally filtered by tag, year, artist, or status |
//! | `spindle search <query>` | Find releases by title, artist, or year |
//! | `spindle stats` | Collection totals and breakdowns |
//! | `spindle wanted list\|mark\|unmark` | Manage the wish list |
//! | `spindle enrich` | Crawl and enrich every incomplete release |
//! | `spindle edit <id>` | Change year, artist, or title |
//! | `spindle tag add\|remove <id> <tag>` | Edit a single tag |
//! | `spindle url <artist> <title>` | Print the page URL the crawler would visit |
//!
//! Logs go to stderr; command output (including the enrichment run log)
//! goes to stdout.

use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use spindle::catalog::EditRequest;
use spindle::{catalog, config, enrich, migrate};
use spindle_core::filter::ReleaseFilter;
use spindle_core::models::{ListOrder, NewRelease};
use spindle_core::url::release_url;

/// Spindle: a music collection catalog with crawl-based enrichment.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/spindle.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "spindle",
    about = "Music collection catalog with crawl-based metadata enrichment",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/spindle.toml")]
    config: PathBuf,

    /// Enable debug logging on stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Insert a release, or refresh the one with the same external id.
    Add {
        #[arg(long)]
        external_id: i64,
        #[arg(long)]
        artist: String,
        #[arg(long)]
        title: String,
        /// Release year; omit or pass 0 when unknown.
        #[arg(long, default_value_t = 0)]
        year: i32,
        /// Seed tag. Repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Add to the wish list instead of the owned collection.
        #[arg(long)]
        wanted: bool,
    },

    /// List releases.
    #[command(group(ArgGroup::new("filter").multiple(false)))]
    List {
        /// Only releases missing a year, tags, or a cover image.
        #[arg(long, group = "filter")]
        needs_enrichment: bool,
        /// Only releases on the wish list.
        #[arg(long, group = "filter")]
        wanted: bool,
        /// Only releases from this year.
        #[arg(long, group = "filter")]
        year: Option<i32>,
        /// Only releases carrying this exact tag.
        #[arg(long, group = "filter")]
        tag: Option<String>,
        /// Only releases by this artist. `A/B` matches either.
        #[arg(long, group = "filter")]
        artist: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Search titles, artists, and years (case- and accent-insensitive).
    Search {
        query: String,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show collection statistics.
    Stats {
        /// Print JSON instead of a report.
        #[arg(long)]
        json: bool,
    },

    /// Manage the wish list.
    Wanted {
        #[command(subcommand)]
        action: WantedAction,
    },

    /// Crawl the external site and enrich incomplete releases.
    ///
    /// Prints the run log on stdout. Failures for individual releases are
    /// reported in the log and do not stop the run.
    Enrich {
        /// Maximum number of releases to crawl in this run.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Change a release's year, artist, or title.
    ///
    /// A new year renormalizes the decade tag.
    Edit {
        /// Internal release id.
        id: i64,
        /// New year. Anything that is not a number stores 0.
        #[arg(long, allow_hyphen_values = true)]
        year: Option<String>,
        #[arg(long)]
        artist: Option<String>,
        #[arg(long)]
        title: Option<String>,
        /// Rename the artist on every release carrying the old name.
        #[arg(long, requires = "artist")]
        all_occurrences: bool,
    },

    /// Add or remove a single tag.
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },

    /// Print the release page URL the crawler would visit.
    Url { artist: String, title: String },
}

/// Ordering and format shared by listing commands.
#[derive(Args)]
struct OutputArgs {
    /// Sort column: `title`, `artist`, or `year`.
    #[arg(long, default_value = "title")]
    order_by: String,
    /// Sort descending.
    #[arg(long)]
    desc: bool,
    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

impl OutputArgs {
    fn order(&self) -> ListOrder {
        ListOrder::parse(&self.order_by, if self.desc { "desc" } else { "asc" })
    }
}

#[derive(Subcommand)]
enum WantedAction {
    /// List releases on the wish list.
    List {
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Put a release on the wish list.
    Mark { id: i64 },
    /// Move a release from the wish list to the owned collection.
    Unmark { id: i64 },
}

#[derive(Subcommand)]
enum TagAction {
    /// Append a tag unless already present.
    Add { id: i64, tag: String },
    /// Remove every occurrence of a tag.
    Remove { id: i64, tag: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Needs no config
    if let Commands::Url { artist, title } = &cli.command {
        let base = config::load_config(&cli.config)
            .map(|c| c.crawler.base_url)
            .unwrap_or_else(|_| spindle_core::url::DEFAULT_BASE_URL.to_string());
        println!("{}", release_url(&base, artist, title));
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized at {}", cfg.db.path.display());
        }
        Commands::Add {
            external_id,
            artist,
            title,
            year,
            tags,
            wanted,
        } => {
            catalog::run_add(
                &cfg,
                NewRelease {
                    external_id,
                    artist,
                    title,
                    year,
                    tags,
                    wanted,
                },
            )
            .await?;
        }
        Commands::List {
            needs_enrichment,
            wanted,
            year,
            tag,
            artist,
            output,
        } => {
            let filter = if needs_enrichment {
                ReleaseFilter::NeedsEnrichment
            } else if wanted {
                ReleaseFilter::Wanted
            } else if let Some(year) = year {
                ReleaseFilter::Year(year)
            } else if let Some(tag) = tag {
                ReleaseFilter::Tag(tag)
            } else if let Some(artist) = artist {
                ReleaseFilter::Artist(artist)
            } else {
                ReleaseFilter::All
            };
            catalog::run_list(&cfg, filter, output.order(), output.json).await?;
        }
        Commands::Search { query, output } => {
            catalog::run_list(&cfg, ReleaseFilter::Search(query), output.order(), output.json)
                .await?;
        }
        Commands::Stats { json } => {
            catalog::run_stats(&cfg, json).await?;
        }
        Commands::Wanted { action } => match action {
            WantedAction::List { output } => {
                catalog::run_list(&cfg, ReleaseFilter::Wanted, output.order(), output.json)
                    .await?
            }
            WantedAction::Mark { id } => catalog::run_wanted(&cfg, id, true).await?,
            WantedAction::Unmark { id } => catalog::run_wanted(&cfg, id, false).await?,
        },
        Commands::Enrich { limit } => {
            enrich::run_enrich(&cfg, limit).await?;
        }
        Commands::Edit {
            id,
            year,
            artist,
            title,
            all_occurrences,
        } => {
            catalog::run_edit(
                &cfg,
                id,
                EditRequest {
                    year,
                    artist,
                    title,
                    all_occurrences,
                },
            )
            .await?;
        }
        Commands::Tag { action } => match action {
            TagAction::Add { id, tag } => catalog::run_tag(&cfg, id, &tag, false).await?,
            TagAction::Remove { id, tag } => catalog::run_tag(&cfg, id, &tag, true).await?,
        },
        Commands::Url { .. } => unreachable!("handled before config load"),
    }

    Ok(())
}
