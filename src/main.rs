//! placesmerge CLI - merge one browser history database into another

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "placesmerge")]
#[command(version)]
#[command(about = "Merge browser history databases without duplicating places, visits or origins")]
#[command(long_about = r#"
placesmerge copies the history of one browser profile into a Firefox
places.sqlite database:
  • Places are matched by URL, never by row id
  • Visit navigation chains (from_visit) are preserved
  • Firefox and Chromium-family sources are supported
  • Running the same merge twice changes nothing

The destination keeps three unique indexes after a merge:
placesmerge_origins_key, placesmerge_places_url_hash and
placesmerge_visits_place_date. The browser never creates them. If it later
writes a URL whose hash matches a stored one, that write fails. Close the
browser before merging, and drop them once merging is done:
  sqlite3 places.sqlite "DROP INDEX placesmerge_origins_key;
    DROP INDEX placesmerge_places_url_hash; DROP INDEX placesmerge_visits_place_date;"

Example usage:
  placesmerge merge --from old/places.sqlite --to places.sqlite
  placesmerge merge --from ~/.config/chromium/Default/History --to places.sqlite
  placesmerge verify --database places.sqlite
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a source history database into a destination
    Merge {
        /// Source history database (Firefox places.sqlite or Chromium History)
        #[arg(short, long)]
        from: PathBuf,

        /// Destination places.sqlite
        #[arg(short, long)]
        to: PathBuf,

        /// Source format (firefox, chromium); detected when omitted
        #[arg(long)]
        format: Option<String>,

        /// Config file (defaults to ./placesmerge.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Create the destination if it does not exist
        #[arg(long)]
        create: bool,

        /// Print the merge report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show row counts of a history database
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Check a history database for duplicate rows and dangling from_visit links
    Verify {
        /// Path to the database file
        #[arg(short, long)]
        database: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Print the content hash of a URL
    Hash {
        url: String,

        #[arg(long)]
        json: bool,
    },

    /// Write a placesmerge.toml with default settings
    InitConfig {
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json { OutputMode::Json } else { OutputMode::Human }
    }

    pub fn is_human(&self) -> bool {
        *self == OutputMode::Human
    }
}

/// Print a machine-readable success envelope
pub fn emit_success(mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if mode.is_human() {
        return Ok(());
    }
    let envelope = serde_json::json!({
        "status": "ok",
        "command": command,
        "data": data,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for reports
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Merge { from, to, format, config, create, json } => {
            let args = commands::MergeArgs {
                from,
                to,
                format,
                config,
                create,
            };
            commands::run_merge(&args, OutputMode::from_json_flag(json))?;
        }

        Commands::Stats { database, json } => {
            commands::run_stats(&database, OutputMode::from_json_flag(json))?;
        }

        Commands::Verify { database, json } => {
            let clean = commands::run_verify(&database, OutputMode::from_json_flag(json))?;
            if !clean {
                std::process::exit(1);
            }
        }

        Commands::Hash { url, json } => {
            commands::run_hash(&url, OutputMode::from_json_flag(json))?;
        }

        Commands::InitConfig { path, force } => {
            commands::run_init_config(path, force)?;
        }
    }

    Ok(())
}
