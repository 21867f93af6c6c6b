use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::TextGenerator;
use painpoint_common::{Config, InsightResponse};
use painpoint_pipeline::{InsightPipeline, RunArtifacts, SentimentFilter};

#[derive(Parser)]
#[command(name = "painpoint")]
#[command(about = "Mine app-store reviews for product pain points")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for apps and save their reviews as CSV
    Fetch {
        keyword: String,

        /// Directory to write `<keyword>_reviews.csv` into
        #[arg(long, default_value = "data")]
        out_dir: PathBuf,
    },

    /// Keep only strongly negative reviews from a CSV
    Filter {
        input: PathBuf,
        output: PathBuf,

        /// Compound score at or below which a review is kept
        #[arg(long, allow_hyphen_values = true)]
        threshold: Option<f64>,
    },

    /// Generate an insight report from a negative-review CSV
    Analyze { input: PathBuf },

    /// Fetch, filter and analyze in one go
    Run { keyword: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_tracing() {
        eprintln!("Error: {e:#}");
        return ExitCode::from(1);
    }

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("painpoint=info".parse()?))
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::from_env()?;
    config.log_redacted();

    match cli.command {
        Commands::Fetch { keyword, out_dir } => {
            let (pipeline, _) = InsightPipeline::from_config(&config)?;
            std::fs::create_dir_all(&out_dir)?;
            let run = RunArtifacts::in_dir(&out_dir, &keyword);

            let acquired = pipeline
                .acquirer()
                .acquire_and_persist(&keyword, Some(&run))
                .await?;
            info!(reviews = acquired.batch.len(), sources = acquired.sources_fetched, "Fetch complete");
            if let Some(path) = acquired.path {
                println!("{}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Filter {
            input,
            output,
            threshold,
        } => {
            let filter = SentimentFilter::new(threshold.unwrap_or(config.negativity_threshold));
            let outcome = filter.filter_file(&input, &output);
            println!("{}", outcome.count());
            Ok(ExitCode::SUCCESS)
        }

        Commands::Analyze { input } => {
            let (pipeline, generator) = InsightPipeline::from_config(&config)?;
            warm_up(generator).await;

            let response: InsightResponse = pipeline.synthesizer().synthesize_file(&input).await.into();
            print_response(&response)
        }

        Commands::Run { keyword } => {
            let (pipeline, generator) = InsightPipeline::from_config(&config)?;
            warm_up(generator).await;

            let run = pipeline.run(&keyword).await;
            eprintln!("{}", run.stats);
            print_response(&run.response)
        }
    }
}

/// Check the model once. Unavailability is reported, never fatal.
async fn warm_up(generator: Arc<dyn TextGenerator>) {
    match generator.warm_up().await {
        Ok(()) => info!(model = generator.model_name(), "Model ready"),
        Err(e) => warn!(model = generator.model_name(), error = %e, "Model warm-up failed"),
    }
}

fn print_response(response: &InsightResponse) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(if response.is_error() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}
