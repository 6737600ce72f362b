use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use movie_etl::config::{Config, DEFAULT_CONFIG_PATH};
use movie_etl::logging;
use movie_etl::pipeline::EtlPipeline;
use movie_etl::sources::RawInputs;
use movie_etl::storage::SqliteSink;
use movie_etl::RunReport;

#[derive(Parser)]
#[command(name = "movie_etl")]
#[command(about = "Reconciles encyclopedia and catalog movie data and loads rating histograms")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, transform and load into the database
    Run(RunArgs),
    /// Extract and transform only, then print the run summary
    Transform(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Path to the TOML config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Encyclopedia extract (JSON array)
    #[arg(long)]
    wiki: Option<PathBuf>,
    /// Catalog metadata export (CSV)
    #[arg(long)]
    metadata: Option<PathBuf>,
    /// Ratings event log (CSV)
    #[arg(long)]
    ratings: Option<PathBuf>,
    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,
    /// Rows per ratings append
    #[arg(long)]
    chunk_size: Option<usize>,
}

impl RunArgs {
    /// Config file, then environment, then command-line flags.
    fn resolve(self) -> anyhow::Result<Config> {
        let mut config = Config::load(&self.config)
            .with_context(|| format!("loading config from {}", self.config.display()))?;
        config.apply_env_overrides();
        if let Some(path) = self.wiki {
            config.inputs.wiki_movies = path;
        }
        if let Some(path) = self.metadata {
            config.inputs.movies_metadata = path;
        }
        if let Some(path) = self.ratings {
            config.inputs.ratings = path;
        }
        if let Some(path) = self.database {
            config.output.database = path;
        }
        if let Some(n) = self.chunk_size {
            config.output.ratings_chunk_size = n;
        }
        config.validate()?;
        Ok(config)
    }
}

fn print_report(report: &RunReport) {
    println!("\n📊 Run summary:");
    if let Some(run_id) = report.run_id {
        println!("   Run id: {}", run_id);
    }
    println!(
        "   Encyclopedia: {} records -> {} movies",
        report.wiki_records, report.wiki_movies
    );
    println!(
        "   Catalog: {} rows -> {} movies",
        report.catalog_rows, report.catalog_movies
    );
    println!(
        "   Reconciled: {} ({} unmatched, {} era mismatches)",
        report.reconciled_movies, report.unmatched_wiki_movies, report.era_mismatches
    );
    println!(
        "   Ratings: {} events over {} movies, {} histogram columns",
        report.rating_events,
        report.rated_movies,
        report.rating_columns.len()
    );
    if report.ratings_loaded > 0 {
        println!("   Ratings loaded: {}", report.ratings_loaded);
    }
    println!("   Movies digest: {}", report.movies_digest);
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let config = args.resolve()?;
            println!("🚀 Running full ETL into {}...", config.output.database.display());
            let sink = SqliteSink::open(&config.output.database).with_context(|| {
                format!("opening database {}", config.output.database.display())
            })?;
            match EtlPipeline::run(&sink, &config) {
                Ok(report) => {
                    info!("ETL run completed");
                    print_report(&report);
                    println!("✅ Loaded '{}' and '{}'", config.output.movies_table, config.output.ratings_table);
                }
                Err(e) => {
                    error!("ETL run failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        Commands::Transform(args) => {
            let config = args.resolve()?;
            println!("🔧 Transforming without loading...");
            let inputs = RawInputs::read(&config.inputs).context("reading inputs")?;
            let transformed = EtlPipeline::transform(&inputs.wiki, &inputs.catalog, &inputs.ratings)?;
            print_report(&transformed.report);
        }
    }
    Ok(())
}
