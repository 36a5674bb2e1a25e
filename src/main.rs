//! # Social Pulse CLI (`pulse`)
//!
//! Searches configured social-media corpora by year range, platform and
//! keywords, annotating each match with sentiment and emotion.
//!
//! ## Usage
//!
//! ```bash
//! pulse --config ./config/pulse.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pulse serve` | Start the HTTP API server |
//! | `pulse search "<query>"` | Run one search and print the JSON response |
//! | `pulse sources` | List corpus sources and their health |
//! | `pulse menu` | Print the filter menu JSON |
//!
//! ## Examples
//!
//! ```bash
//! pulse search "ansiedad depresión" --platform facebook,twitter --time 2015_2019
//! pulse search "" --source openData --time 2010-2014
//! RUST_LOG=social_pulse=debug pulse serve
//! ```
//!
//! Logs go to stderr so command output on stdout stays machine-readable.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use social_pulse::{config, menu, search, server, sources};

/// Social Pulse: keyword, platform and year-range search over social-media
/// text with sentiment and emotion annotation.
#[derive(Parser)]
#[command(
    name = "pulse",
    about = "Search social-media corpora and annotate matches with sentiment and emotion",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pulse.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server on `[server].bind`.
    Serve,

    /// Run a single search and print the response as JSON.
    Search {
        /// Free-text query. Stopwords and punctuation are removed.
        query: String,

        /// Comma-separated source ids (default: all sources).
        #[arg(long)]
        source: Option<String>,

        /// Comma-separated platform names, e.g. `facebook,twitter`.
        #[arg(long)]
        platform: Option<String>,

        /// Comma-separated year ranges, e.g. `2010_2014,2015-2019`.
        #[arg(long)]
        time: Option<String>,
    },

    /// List configured corpus sources with directory health and file counts.
    Sources,

    /// Print the filter menu as JSON.
    Menu,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "social_pulse=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Search {
            query,
            source,
            platform,
            time,
        } => {
            let service = search::SearchService::from_config(Arc::new(cfg))?;
            service.start().await?;

            let request = search::SearchRequest::from_params(
                Some(query.as_str()),
                source.as_deref(),
                platform.as_deref(),
                time.as_deref(),
            );
            let result = service.search(&request).await;
            service.stop().await;

            println!("{}", serde_json::to_string_pretty(&result?)?);
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Menu => {
            let menu = menu::build_menu(&cfg);
            println!("{}", serde_json::to_string_pretty(&menu)?);
        }
    }

    Ok(())
}
