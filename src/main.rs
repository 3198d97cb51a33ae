// src/main.rs
use bigdecimal::BigDecimal;
use clap::{Args, Parser, Subcommand};
use promob_extractor::extractors::SectionName;
use promob_extractor::storage::{SaveOutcome, StorageManager};
use promob_extractor::utils::{self, AppError};
use promob_extractor::{source, ExtractionConfig, ExtractionOrchestrator};
use std::path::PathBuf;
use std::sync::Arc;

/// Command Line Interface for the Promob export extractor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level for this tool when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract material sections and print the result as JSON
    Extract {
        /// Path or http(s) URL of the XML export
        #[arg(short, long)]
        input: String,

        /// Sections to extract, e.g. "caixa,portas" or '["caixa"]' (default: all)
        #[arg(short, long)]
        sections: Option<String>,

        /// Store the result for this environment (skipped when unchanged)
        #[arg(short, long)]
        environment_id: Option<String>,

        /// Output directory for stored results
        #[arg(short, long, default_value = "./output")]
        output_dir: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Report which sections an export contains without extracting them
    Validate {
        /// Path or http(s) URL of the XML export
        #[arg(short, long)]
        input: String,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

/// Overrides for PROMOB_* environment settings
#[derive(Args, Debug)]
struct ConfigArgs {
    /// JSON product-line table replacing the built-in one
    #[arg(long)]
    product_lines: Option<PathBuf>,

    /// Amounts above this are treated as corrupted and zeroed
    #[arg(long)]
    monetary_ceiling: Option<u64>,

    /// Documents larger than this are rejected before parsing
    #[arg(long)]
    max_document_bytes: Option<usize>,
}

impl ConfigArgs {
    fn resolve(self) -> Result<ExtractionConfig, AppError> {
        let mut config = ExtractionConfig::from_env()?;
        if let Some(path) = self.product_lines {
            config = config.with_product_lines_file(path)?;
        }
        if let Some(ceiling) = self.monetary_ceiling {
            config = config.with_monetary_ceiling(BigDecimal::from(ceiling));
        }
        if let Some(limit) = self.max_document_bytes {
            config = config.with_max_document_bytes(limit);
        }
        tracing::debug!(
            "Config: ceiling {}, max {} bytes, product lines v{}",
            config.monetary_ceiling,
            config.max_document_bytes,
            config.product_lines.version()
        );
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments
    let cli = Cli::parse();

    // 2. Setup Logging (RUST_LOG overrides --log-level)
    utils::logging::setup_logging(&cli.log_level);
    tracing::debug!("Starting with args: {:?}", cli);

    match cli.command {
        Command::Extract { input, sections, environment_id, output_dir, config } => {
            extract(input, sections, environment_id, output_dir, config.resolve()?).await
        }
        Command::Validate { input, config } => validate(input, config.resolve()?).await,
    }
}

async fn extract(
    input: String,
    sections: Option<String>,
    environment_id: Option<String>,
    output_dir: PathBuf,
    config: ExtractionConfig,
) -> Result<(), AppError> {
    let filter = sections.as_deref().map(SectionName::parse_filter).transpose()?;
    let document = source::load_document(&input).await?;
    tracing::info!("Loaded {} ({} bytes)", input, document.len());

    // Parsing is CPU-bound; the whole run goes to the blocking pool.
    let orchestrator = ExtractionOrchestrator::new(Arc::new(config));
    let outcome = tokio::task::spawn_blocking(move || orchestrator.run(&document, filter.as_ref())).await?;

    let result = match outcome {
        Ok(result) => result,
        Err(failure) => {
            tracing::error!("Extraction rejected: {}", failure);
            println!("{}", serde_json::to_string_pretty(&failure)?);
            return Err(AppError::Rejected);
        }
    };

    for warning in &result.warnings {
        tracing::warn!("{}", warning);
    }
    if result.low_confidence {
        tracing::warn!("Low-confidence result, review before persisting");
    }

    if let Some(environment_id) = environment_id {
        let storage = StorageManager::new(&output_dir)?;
        match storage.save_result(&environment_id, &result)? {
            SaveOutcome::Stored(path) => tracing::info!("Stored result at {}", path.display()),
            SaveOutcome::Unchanged(path) => tracing::info!("Unchanged, kept {}", path.display()),
        }
    }

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn validate(input: String, config: ExtractionConfig) -> Result<(), AppError> {
    let document = source::load_document(&input).await?;
    let orchestrator = ExtractionOrchestrator::new(Arc::new(config));
    let report = tokio::task::spawn_blocking(move || orchestrator.validate(&document)).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.valid {
        Ok(())
    } else {
        Err(AppError::Rejected)
    }
}
