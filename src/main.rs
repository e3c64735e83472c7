//! CLI entry point for json-pages

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "json-pages")]
#[command(version)]
#[command(about = "Serve a directory of JSON files as pages", long_about = None)]
struct Cli {
    /// Set the site directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve pages over HTTP
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Drop cached pages as soon as their files change
        #[arg(short, long)]
        watch: bool,
    },

    /// Print a page as JSON
    Show {
        /// Logical page path, e.g. `docs/setup`
        path: String,

        /// Print only this key
        #[arg(short, long)]
        key: Option<String>,
    },

    /// List all pages
    List {
        /// Show this field next to each page
        #[arg(short, long)]
        field: Option<String>,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "json_pages=debug,info"
    } else {
        "json_pages=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Cannot determine current directory")?,
    };

    match cli.command {
        Commands::Serve { port, ip, watch } => {
            let app = json_pages::JsonPages::new(&base_dir)?;
            tracing::info!("Starting server at http://{}:{}", ip, port);
            json_pages::server::start(&app, &ip, port, watch).await?;
        }

        Commands::Show { path, key } => {
            let app = json_pages::JsonPages::new(&base_dir)?;
            json_pages::commands::show::run(&app, &path, key.as_deref())?;
        }

        Commands::List { field } => {
            let app = json_pages::JsonPages::new(&base_dir)?;
            json_pages::commands::list::run(&app, field.as_deref())?;
        }

        Commands::Version => {
            println!("json-pages version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
