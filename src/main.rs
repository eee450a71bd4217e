//! # reg-census CLI (`regc`)
//!
//! The `regc` binary is the primary interface for reg-census. It provides
//! commands for database initialization, corpus synchronization, the full
//! ingestion run, metrics queries, and starting the JSON API server.
//!
//! ## Usage
//!
//! ```bash
//! regc --config ./config/regc.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `regc init` | Create the SQLite database and run schema migrations |
//! | `regc sync` | Download or refresh the title corpus on disk |
//! | `regc ingest` | Run the full pipeline and upsert per-agency metrics |
//! | `regc agencies` | List all persisted agency metrics |
//! | `regc top` | Largest agencies by word count |
//! | `regc show <name>` | One agency's metrics and scope |
//! | `regc serve` | Start the JSON HTTP API |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reg_census::{config, corpus, db, fetch, ingest, migrate, server, store};

/// reg-census CLI — a regulatory corpus ingestion and per-agency metrics
/// pipeline.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/regc.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "regc",
    about = "reg-census — regulatory corpus ingestion and per-agency metrics",
    version,
    long_about = "reg-census syncs the eCFR title corpus, resolves each agency's regulatory \
    scope, counts words and sections over every referenced subtree, and persists one metrics \
    row per agency, served over a CLI and a JSON HTTP API."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/regc.toml`. All corpus, database, fetch, and
    /// server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/regc.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the agency_metrics table.
    /// This command is idempotent — running it multiple times is safe.
    Init,

    /// Synchronize the title corpus.
    ///
    /// Ensures every non-reserved title has a local XML artifact no older
    /// than the freshness threshold, downloading at each title's latest
    /// version marker where needed. Failures on individual titles are
    /// logged and do not abort the sync.
    Sync,

    /// Run the full ingestion pipeline.
    ///
    /// Syncs the corpus, resolves agency scopes, counts words and sections
    /// for every reference (consulting the on-disk result cache), and
    /// upserts one metrics row per agency. One agency's failure does not
    /// abort the batch.
    Ingest,

    /// List all persisted agency metrics.
    Agencies,

    /// Largest agencies by word count.
    Top {
        /// Maximum number of agencies to list.
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },

    /// Show one agency's metrics and scope.
    Show {
        /// Agency name, exactly as persisted.
        name: String,
    },

    /// Start the JSON HTTP API server.
    ///
    /// Exposes the persisted metrics plus a refresh trigger. Binds to the
    /// address configured in `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reg_census=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sync => {
            let client = fetch::build_client(&cfg.fetch)?;
            let policy = fetch::RetryPolicy::from_config(&cfg.fetch);
            let report = corpus::sync_titles(&cfg, &client, &policy).await?;
            println!("sync titles");
            println!("  downloaded: {}", report.downloaded);
            println!("  fresh: {}", report.fresh);
            println!("  reserved: {}", report.reserved_titles.len());
            println!("  failed: {}", report.failed);
            println!("ok");
        }
        Commands::Ingest => {
            let report = ingest::run_ingest(&cfg).await?;
            println!("ingest");
            println!("  titles downloaded: {}", report.titles_downloaded);
            println!("  titles fresh: {}", report.titles_fresh);
            println!("  titles failed: {}", report.titles_failed);
            println!("  agencies upserted: {}", report.agencies_upserted);
            println!("  agencies failed: {}", report.agencies_failed);
            println!("  references counted: {}", report.refs_counted);
            println!("  cache hits: {}", report.cache_hits);
            println!("  references skipped (missing): {}", report.refs_skipped_missing);
            println!("  parse failures: {}", report.parse_failures);
            println!("  total sections: {}", report.total_sections);
            println!("  total words: {}", report.total_words);
            println!("ok");
        }
        Commands::Agencies => {
            let pool = db::connect(&cfg).await?;
            let agencies = store::list_agencies(&pool).await?;
            println!("{:>10}  {:>12}  name", "sections", "words");
            for a in &agencies {
                println!("{:>10}  {:>12}  {}", a.section_count, a.word_count, a.name);
            }
            println!("{} agencies", agencies.len());
            pool.close().await;
        }
        Commands::Top { limit } => {
            let pool = db::connect(&cfg).await?;
            let top = store::top_agencies_by_word_count(&pool, limit.max(1)).await?;
            for (rank, a) in top.iter().enumerate() {
                println!("{:>3}. {:>12} words  {}", rank + 1, a.word_count, a.name);
            }
            pool.close().await;
        }
        Commands::Show { name } => {
            let pool = db::connect(&cfg).await?;
            match store::get_agency(&pool, &name).await? {
                Some(a) => {
                    println!("name: {}", a.name);
                    println!("sections: {}", a.section_count);
                    println!("words: {}", a.word_count);
                    let updated = chrono::DateTime::from_timestamp(a.updated_at, 0)
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| a.updated_at.to_string());
                    println!("updated_at: {}", updated);
                    println!("scope: {}", serde_json::to_string_pretty(&a.scope)?);
                }
                None => {
                    anyhow::bail!("no agency named: {}", name);
                }
            }
            pool.close().await;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
