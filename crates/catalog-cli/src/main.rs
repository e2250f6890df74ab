//! Catalog CLI - Command-line interface for product catalog search.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use catalog_core::{CatalogConfig, SettingsFile};
use catalog_ingest::{write_sample, SAMPLE_DATASETS};
use catalog_server::{CatalogServer, ImportParams, IngestParams, SearchParams, ToolResult};

/// Catalog - Product search by name, description, tag and similarity
#[derive(Parser)]
#[command(name = "catalog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/catalog/config.toml, then ./catalog.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database path, overriding the config file
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Client settings file (default: <config dir>/catalog/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalog
    Search {
        /// Search query
        query: String,

        /// Only direct matches, for this search
        #[arg(short, long, conflicts_with = "recommended")]
        exact_only: bool,

        /// Include recommendations, for this search
        #[arg(short, long)]
        recommended: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add products from a JSON file; fails if a sku is already stored
    Add {
        /// JSON array of products
        file: PathBuf,
    },

    /// Add products from a JSON file, replacing those with the same sku
    Upsert {
        /// JSON array of products
        file: PathBuf,
    },

    /// Extract products from a Markdown document
    ImportMarkdown {
        /// Markdown file
        file: PathBuf,

        /// Replace products with the same sku
        #[arg(long)]
        upsert: bool,
    },

    /// Write a built-in sample dataset to a JSON file
    Sample {
        /// Dataset number (0: cafe menu, 1: phones and tablets)
        dataset: usize,

        /// Output file
        out: PathBuf,
    },

    /// Remove every product
    Clear,

    /// Show the first stored products
    Peek {
        /// Number of products to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show statistics
    Stats,

    /// Show or change client settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings
    Show,

    /// Set whether searches return direct matches only
    ExactOnly {
        /// true or false
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
}

fn load_config(
    config: Option<PathBuf>,
    database: Option<PathBuf>,
) -> Result<CatalogConfig, Box<dyn std::error::Error>> {
    let mut config = match config {
        Some(path) => CatalogConfig::load(&path)?,
        None => CatalogConfig::load_default()?,
    };

    if let Some(path) = database {
        config.database.path = path;
    }

    Ok(config)
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let mut settings =
        SettingsFile::load(cli.settings.unwrap_or_else(SettingsFile::default_path))?;

    let outcome = match cli.command {
        Commands::Sample { dataset, out } => {
            let count = write_sample(&out, dataset)?;
            println!(
                "Wrote {} products ({}) to {}",
                count,
                SAMPLE_DATASETS[dataset],
                out.display()
            );
            Ok(())
        }
        Commands::Settings { action } => match action {
            SettingsAction::Show => {
                println!("{}", serde_json::to_string_pretty(settings.settings())?);
                println!("(from {})", settings.path().display());
                Ok(())
            }
            SettingsAction::ExactOnly { value } => {
                settings.set_exact_only(value);
                println!("exactOnly = {}", value);
                Ok(())
            }
        },
        command => {
            let config = load_config(cli.config, cli.database)?;
            let server = CatalogServer::new(&config)?;
            run(&server, command, settings.settings().exact_only).await
        }
    };

    // Settings are written even when the command failed.
    settings.save_if_dirty()?;
    outcome
}

async fn run(
    server: &CatalogServer,
    command: Commands,
    default_exact_only: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Search {
            query,
            exact_only,
            recommended,
            json,
        } => {
            let exact_only = if exact_only {
                true
            } else if recommended {
                false
            } else {
                default_exact_only
            };

            if json {
                let results = server.search_products(&query, exact_only).await?;
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                report(server.search(SearchParams { query, exact_only }).await)?;
            }
        }
        Commands::Add { file } => {
            report(server.add(ingest_file(file)).await)?;
        }
        Commands::Upsert { file } => {
            report(server.upsert(ingest_file(file)).await)?;
        }
        Commands::ImportMarkdown { file, upsert } => {
            report(
                server
                    .import_markdown(ImportParams { path: file, upsert })
                    .await,
            )?;
        }
        Commands::Clear => {
            report(server.clear().await)?;
        }
        Commands::Peek { limit } => {
            report(server.peek(limit).await)?;
        }
        Commands::Stats => {
            report(server.stats().await)?;
        }
        Commands::Sample { .. } | Commands::Settings { .. } => {}
    }

    Ok(())
}

fn ingest_file(file: PathBuf) -> IngestParams {
    IngestParams {
        path: Some(file),
        products: Vec::new(),
    }
}

fn report(result: ToolResult) -> Result<(), Box<dyn std::error::Error>> {
    if result.success {
        println!("{}", result.message);
        Ok(())
    } else {
        Err(result.message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_failure_is_an_error() {
        let err = report(ToolResult::error("Catalog is stale")).unwrap_err();
        assert_eq!(err.to_string(), "Catalog is stale");
        assert!(report(ToolResult::success("ok")).is_ok());
    }
}
