use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::error;

use dimensional_etl::config::{Config, ConfigOverrides};
use dimensional_etl::logging;
use dimensional_etl::verify::{Verifier, QUERIES};

#[derive(Parser)]
#[command(name = "verify-sql")]
#[command(about = "Runs the analytical checks against the ETL database")]
struct Cli {
    /// SQLite database file (overrides the configuration)
    #[arg(long)]
    database: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, env = "ETL_CONFIG")]
    config: Option<PathBuf>,

    /// Run only the n-th query (1-based)
    #[arg(long)]
    query: Option<usize>,
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_overrides(&ConfigOverrides {
        database: cli.database.clone(),
        ..Default::default()
    });
    let _guard = logging::init_logging(&config.paths.log_dir, "verify_sql.log");

    let verifier = Verifier::open(&config.paths.database)?;
    let reports = match cli.query {
        Some(n) if (1..=QUERIES.len()).contains(&n) => vec![verifier.run(&QUERIES[n - 1])],
        Some(n) => bail!("query {} does not exist (1-{})", n, QUERIES.len()),
        None => verifier.run_all(),
    };

    for report in reports {
        println!("\n{}", report.title);
        match report.outcome {
            Ok(result) => print!("{result}"),
            Err(e) => println!("❌ Query failed: {e}"),
        }
        println!("{}", "-".repeat(50));
    }
    Ok(())
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        error!("Verification failed: {:#}", e);
        println!("❌ {:#}", e);
        std::process::exit(1);
    }
}
