use clap::{Parser, Subcommand};
use colored::Colorize;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use schemaprobe_core::{Config, LogicalConnection};
use schemaprobe_extract::{DuckDbEngine, LakehouseSource};

const DEFAULT_CONFIG: &str = "schemaprobe.toml";

/// SchemaProbe - Schema extraction for DuckLake lakehouses
#[derive(Parser)]
#[command(name = "schemaprobe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: schemaprobe.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Give up after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract tables, views and columns as JSON
    Extract {
        /// Connection name from the config file
        connection: String,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Attach the catalog and report whether it is reachable
    Validate {
        /// Connection name from the config file
        connection: String,
    },

    /// Attach the catalog, then run a SQL statement and print its rows
    Sql {
        /// Connection name from the config file
        connection: String,

        /// Statement to run
        sql: String,
    },

    /// List configured connections
    Connections,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.verbose)?;
    tracing::debug!("Loaded {} connections", config.connections.len());

    match cli.command {
        Commands::Extract { connection, output } => {
            extract_command(&config, &connection, output.as_deref(), cli.timeout, cli.verbose).await
        }
        Commands::Validate { connection } => {
            validate_command(&config, &connection, cli.timeout).await
        }
        Commands::Sql { connection, sql } => {
            sql_command(&config, &connection, &sql, cli.timeout).await
        }
        Commands::Connections => {
            connections_command(&config);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    if let Some(config_path) = path {
        return Ok(Config::from_file(config_path)?);
    }

    let default_path = Path::new(DEFAULT_CONFIG);
    if default_path.exists() {
        Ok(Config::from_file(default_path)?)
    } else {
        if verbose {
            eprintln!("{}", "No config file found, no connections configured".yellow());
        }
        Ok(Config::default())
    }
}

fn lakehouse_source(timeout: Option<u64>) -> LakehouseSource {
    let source = LakehouseSource::new(Arc::new(DuckDbEngine::new()));
    match timeout {
        Some(seconds) => source.with_timeout(Duration::from_secs(seconds)),
        None => source,
    }
}

fn connection<'a>(config: &'a Config, name: &str) -> Result<&'a LogicalConnection> {
    Ok(config.connection(name)?)
}

/// Extract command - dump the catalog's schema as JSON
async fn extract_command(
    config: &Config,
    name: &str,
    output: Option<&Path>,
    timeout: Option<u64>,
    verbose: bool,
) -> Result<()> {
    let logical = connection(config, name)?;
    let source = lakehouse_source(timeout);

    if verbose {
        eprintln!("{} {} ({})...", "Extracting".cyan(), logical.name, logical.dialect);
    }

    let database = source
        .extract(logical)
        .await
        .map_err(|e| anyhow::anyhow!("Extraction failed for '{}': {}", name, e))?;

    let json = serde_json::to_string_pretty(&database)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!(
                "{} {} tables, {} views written to {}",
                "✓".green(),
                database.tables.len(),
                database.views.len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }

    if database.tables.is_empty() {
        eprintln!("{}", "Warning: no tables found".yellow());
    }

    Ok(())
}

/// Validate command - run catalog setup only
async fn validate_command(config: &Config, name: &str, timeout: Option<u64>) -> Result<()> {
    let logical = connection(config, name)?;
    let source = lakehouse_source(timeout);

    match source.validate(logical).await {
        Ok(database) => {
            eprintln!("{} {} is reachable", "✓".green(), database.name);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            Err(anyhow::anyhow!("Validation failed for '{}'", name))
        }
    }
}

/// SQL command - run one statement against the attached catalog
async fn sql_command(config: &Config, name: &str, sql: &str, timeout: Option<u64>) -> Result<()> {
    let logical = connection(config, name)?;
    let source = lakehouse_source(timeout);

    let rows = source
        .execute_sql(logical, sql)
        .await
        .map_err(|e| anyhow::anyhow!("SQL failed for '{}': {}", name, e))?;

    println!("{}", serde_json::to_string_pretty(&rows)?);
    eprintln!("{} {} rows", "✓".green(), rows.len());
    Ok(())
}

/// Connections command - list what the config file defines
fn connections_command(config: &Config) {
    if config.connections.is_empty() {
        eprintln!("{}", "No connections configured".yellow());
        return;
    }

    for conn in &config.connections {
        let catalog = conn.database_name.as_deref().unwrap_or("-");
        println!("{}  {}  {}", conn.name.bold(), conn.dialect.cyan(), catalog);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_global_timeout_after_subcommand() {
        let cli = Cli::try_parse_from(["schemaprobe", "extract", "lake", "--output", "lake.json", "--timeout", "30"])
            .unwrap();

        assert_eq!(cli.timeout, Some(30));
        match cli.command {
            Commands::Extract { connection, output } => {
                assert_eq!(connection, "lake");
                assert_eq!(output, Some(PathBuf::from("lake.json")));
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn parse_sql_command() {
        let cli = Cli::try_parse_from(["schemaprobe", "-v", "sql", "lake", "SELECT count(*) FROM orders"]).unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Sql { connection, sql } => {
                assert_eq!(connection, "lake");
                assert_eq!(sql, "SELECT count(*) FROM orders");
            }
            _ => panic!("expected sql"),
        }
    }
}
