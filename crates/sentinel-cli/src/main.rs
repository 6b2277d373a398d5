//! sentinel - Transaction fraud scoring from the command line
//!
//! Usage:
//!   sentinel health                          # Service status
//!   sentinel info                            # Model descriptor
//!   sentinel predict --input txn.json        # Score one transaction
//!   sentinel batch --input txns.jsonl -w 4   # Score a batch
//!   sentinel bootstrap --output train.jsonl  # Dump the synthetic training set
//!
//! Responses are JSON on stdout; logs go to stderr (`RUST_LOG` controls them).

use clap::{Parser, Subcommand};
use sentinel_cli::{CliError, ScoringService, input, metrics};
use sentinel_core::{
    FraudModel, JsonLinesSource, SentinelConfig, SyntheticBootstrap, TrainingSource,
};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(about = "Isolation forest fraud scoring for payment transactions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file (model, bootstrap and rules sections)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Train on JSON-lines feature rows instead of the synthetic bootstrap
    #[arg(short, long, global = true)]
    training_data: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print Prometheus metrics to stderr when done
    #[arg(long, global = true)]
    metrics: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Report service status
    Health,

    /// Describe the loaded model
    Info,

    /// Score a single transaction
    Predict {
        /// Request file; stdin when omitted or "-"
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Correlation id; generated from the clock when omitted
        #[arg(short, long)]
        request_id: Option<String>,
    },

    /// Score a batch of transactions (JSON array or JSON lines)
    Batch {
        /// Request file; stdin when omitted or "-"
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Worker threads for large batches
        #[arg(short, long, default_value = "1")]
        workers: usize,
    },

    /// Write the synthetic training set as JSON lines
    Bootstrap {
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    metrics::init();

    let outcome = run(&cli);

    if cli.metrics {
        match metrics::render() {
            Ok(text) => eprint!("{}", text),
            Err(e) => error!(error = %e, "Metrics export failed"),
        }
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_directives = if verbose {
        "debug"
    } else {
        "warn,sentinel=info,sentinel_core=info,sentinel_cli=info,audit=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => SentinelConfig::from_json_file(path)?,
        None => SentinelConfig::default(),
    };

    match &cli.command {
        Commands::Health => {
            let service = load_service(cli, &config);
            print_json(&service.health())
        }
        Commands::Info => {
            let service = load_service(cli, &config);
            print_json(&service.model_info())
        }
        Commands::Predict {
            input: path,
            request_id,
        } => {
            let service = load_service(cli, &config);
            let record = input::parse_single(&input::read_body(path.as_deref())?)?;
            let result = service.predict(&record, request_id.as_deref())?;
            print_json(&result)
        }
        Commands::Batch {
            input: path,
            workers,
        } => {
            let service = load_service(cli, &config).with_workers(*workers);
            let records = input::parse_batch(&input::read_body(path.as_deref())?)?;
            let response = service.predict_batch(&records)?;
            print_json(&response)
        }
        Commands::Bootstrap { output } => write_bootstrap(&config, output.as_deref()),
    }
}

/// Train once at startup; a failed training run still yields a service
fn load_service(cli: &Cli, config: &SentinelConfig) -> ScoringService {
    let source: Box<dyn TrainingSource> = match &cli.training_data {
        Some(path) => Box::new(JsonLinesSource::new(path)),
        None => Box::new(SyntheticBootstrap::new(config.bootstrap.clone())),
    };
    let model = FraudModel::train(&*source, config);
    ScoringService::new(model)
}

fn write_bootstrap(config: &SentinelConfig, output: Option<&Path>) -> Result<(), CliError> {
    let rows = SyntheticBootstrap::new(config.bootstrap.clone()).produce()?;

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(std::io::BufWriter::new(std::fs::File::create(path)?)),
        None => Box::new(std::io::BufWriter::new(std::io::stdout().lock())),
    };
    for row in &rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    info!(rows = rows.len(), "Bootstrap rows written");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
