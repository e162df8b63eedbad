use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use solar_telemetry::app::clean_use_case::{CleanUseCase, FileStatus};
use solar_telemetry::app::store_use_case::StoreUseCase;
use solar_telemetry::app::transform_use_case::{
    load_canonical_schema, TransformUseCase, UploadedFile,
};
use solar_telemetry::config::Config;
use solar_telemetry::infra::anomaly_log_adapter::FileAnomalyLog;
use solar_telemetry::infra::ollama_transformer::{OllamaTransformer, PromptTemplate};
use solar_telemetry::infra::sqlite_store::SqliteReadingStore;
use solar_telemetry::pipeline::orchestrator::TelemetryPipeline;
use solar_telemetry::pipeline::processing::quality_gate::RangeValidator;
use solar_telemetry::{logging, metrics, server};

#[derive(Parser)]
#[command(name = "solar_telemetry")]
#[command(about = "Solar inverter telemetry transform, cleaning and storage")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the upload API
    Serve {
        /// Listen address, overrides SERVER_ADDR
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
    /// Clean a folder of canonical JSON files
    Clean {
        /// Folder of canonical files (defaults to the configured output dir)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Folder for cleaned files (defaults to the configured cleaned dir)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Transform vendor JSON files into canonical files
    Transform {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Insert a folder of cleaned JSON files into the reading store
    Store {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Transform, clean and store vendor files in one go
    Run {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn read_uploads(paths: &[PathBuf]) -> Result<Vec<UploadedFile>> {
    paths
        .iter()
        .map(|path| UploadedFile::read(path).with_context(|| format!("reading {}", path.display())))
        .collect()
}

fn clean_use_case(config: &Config) -> Result<CleanUseCase> {
    let anomalies = FileAnomalyLog::open(&config.anomaly_log_path)?;
    Ok(CleanUseCase::new(
        RangeValidator::new(config.range_table()?),
        Arc::new(anomalies),
    ))
}

fn transform_use_case(config: &Config) -> Result<TransformUseCase> {
    let prompt = PromptTemplate::load(&config.prompt_path)?;
    let transformer = OllamaTransformer::new(&config.ollama_url, &config.model_name, prompt)?;
    let schema = load_canonical_schema(&config.canonical_path)?;
    Ok(TransformUseCase::new(Box::new(transformer), schema, &config.output_dir)?)
}

fn store_use_case(config: &Config) -> Result<StoreUseCase> {
    let store = SqliteReadingStore::open(&config.store_path, &config.collection_name)?;
    Ok(StoreUseCase::new(Arc::new(store)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    // Keep the guard alive so file logs are flushed on exit
    let _log_guard = logging::init_logging(&config.log_dir);
    metrics::init_metrics();

    match cli.command {
        Commands::Serve { addr } => {
            let addr = match addr {
                Some(addr) => addr,
                None => config
                    .server_addr
                    .parse()
                    .with_context(|| format!("invalid server address '{}'", config.server_addr))?,
            };
            let pipeline = Arc::new(TelemetryPipeline::from_config(&config)?);
            server::serve(addr, server::create_server(pipeline)).await?;
        }
        Commands::Clean { input, output } => {
            let input = input.unwrap_or_else(|| config.output_dir.clone());
            let output = output.unwrap_or_else(|| config.cleaned_dir.clone());
            let report = clean_use_case(&config)?.clean_folder(&input, &output)?;

            println!("\n📊 Cleaning results:");
            println!("   Files cleaned: {}", report.succeeded());
            println!("   Files failed: {}", report.failed());
            println!("   Records processed: {}", report.records_processed);
            println!("   Duplicates: {}", report.duplicates);
            println!("   Invalid: {}", report.invalid);
            println!("   Anomalies: {}", report.anomalies);
            println!("   Fields corrected: {}", report.corrected_fields);
            for file in report.files.iter().filter(|f| f.status == FileStatus::Failed) {
                println!("   ⚠️  {}: {}", file.file, file.error.as_deref().unwrap_or("unknown error"));
            }
        }
        Commands::Transform { files } => {
            let uploads = read_uploads(&files)?;
            let transform = transform_use_case(&config)?;
            for result in transform.transform_files(&uploads).await {
                match result.status {
                    FileStatus::Success => println!("✅ {}", result.file),
                    FileStatus::Failed => println!(
                        "❌ {}: {}",
                        result.file,
                        result.error.as_deref().unwrap_or("unknown error")
                    ),
                }
            }
        }
        Commands::Store { input } => {
            let input = input.unwrap_or_else(|| config.cleaned_dir.clone());
            let report = store_use_case(&config)?.insert_folder(&input)?;
            println!("\n📦 Inserted: {}", report.total.inserted);
            println!("   Duplicates skipped: {}", report.total.duplicates);
            println!("   Missing identity: {}", report.total.missing_identity);
            println!("   Errors: {}", report.total.errors);
        }
        Commands::Run { files } => {
            let uploads = read_uploads(&files)?;
            let pipeline = TelemetryPipeline::from_config(&config)?;
            match pipeline.run(&uploads).await {
                Ok(report) => {
                    info!(run_id = %report.run_id, "Pipeline run complete");
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                Err(e) => {
                    error!("Pipeline run failed: {:#}", e);
                    return Err(e);
                }
            }
        }
    }
    Ok(())
}
