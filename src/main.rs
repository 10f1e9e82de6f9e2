use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};

use dimensional_etl::config::{Config, ConfigOverrides};
use dimensional_etl::logging;
use dimensional_etl::pipeline::processing::JoinPolicy;
use dimensional_etl::pipeline::{run_with_config, RunSummary};

#[derive(Parser)]
#[command(name = "dimensional-etl")]
#[command(about = "Loads commercial and musical source files into a dimensional SQLite model")]
#[command(version = "0.1.0")]
struct Cli {
    /// TOML configuration file (defaults to ./etl.toml when present)
    #[arg(long, global = true, env = "ETL_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the Comercial and Musical folders
    #[arg(long, global = true)]
    source_root: Option<PathBuf>,

    /// Where curated copies of each table are written
    #[arg(long, global = true)]
    curated_dir: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// What to do with fact rows whose natural key has no dimension match
    #[arg(long, global = true, value_enum)]
    join_policy: Option<JoinPolicy>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full ETL (default)
    Run {
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML
    ShowConfig,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            source_root: self.source_root.clone(),
            curated_dir: self.curated_dir.clone(),
            database: self.database.clone(),
            join_policy: self.join_policy,
        }
    }

    fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref()).context("Failed to load configuration")?;
        config.apply_overrides(&self.overrides());
        Ok(config)
    }
}

fn print_summary(summary: &RunSummary) {
    println!("\n📊 ETL Results:");
    println!("   Run id: {}", summary.run_id);
    println!("   Elapsed: {:.2}s", summary.elapsed_secs);
    println!("   Database: {}", summary.database_path.display());
    println!("   Curated data: {}", summary.curated_dir.display());
    for receipt in &summary.tables {
        println!("   - {} ({} rows)", receipt.table, receipt.rows);
    }
    if !summary.dropped_rows.is_empty() {
        warn!("{} join(s) dropped unmatched rows", summary.dropped_rows.len());
        println!("\n⚠️  Unmatched rows dropped:");
        for dropped in &summary.dropped_rows {
            println!("   - {} via {}: {}", dropped.fact, dropped.dimension, dropped.count);
        }
    }
}

fn run(cli: &Cli, json: bool) -> Result<()> {
    let config = cli.resolve_config()?;
    let _guard = logging::init_logging(&config.paths.log_dir, "dimensional_etl.log");

    println!("🚀 Starting ETL...");
    info!(
        source_root = %config.paths.source_root.display(),
        database = %config.paths.database.display(),
        "Configuration resolved"
    );

    let summary = run_with_config(&config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
        println!("\n✅ ETL completed successfully in {:.2} seconds", summary.elapsed_secs);
    }
    Ok(())
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let outcome = match &cli.command {
        Some(Commands::ShowConfig) => cli
            .resolve_config()
            .and_then(|config| Ok(config.to_toml_string()?))
            .map(|toml| print!("{toml}")),
        Some(Commands::Run { json }) => run(&cli, *json),
        None => run(&cli, false),
    };

    if let Err(e) = outcome {
        error!("ETL failed: {:#}", e);
        println!("❌ ETL failed: {:#}", e);
        std::process::exit(1);
    }
}
