use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cvfit::analysis::pipeline::run_pipeline;
use cvfit::analysis::provider::{AnalysisProvider, MistralProvider};
use cvfit::config::{AppConfig, ProviderConfig};
use cvfit::extraction::{read_document, DocumentExtractor, ExtractionBackend};
use cvfit::models::report::save_json;

#[derive(Parser)]
#[command(
    name = "analyze-candidate",
    version,
    about = "Score a candidate CV against a job description"
)]
struct Cli {
    /// Text file holding the job description
    job_description_file: PathBuf,

    /// CV document (PDF)
    cv_document: PathBuf,

    /// Metric to score; repeat for several (default: skills_match,
    /// relevant_experience, education, soft_skills)
    #[arg(short, long = "metric", value_name = "NAME")]
    metric: Vec<String>,

    /// Extraction backend (default: CVFIT_EXTRACTION_BACKEND or local)
    #[arg(short, long, value_enum)]
    extraction: Option<ExtractionBackend>,

    /// Also write the result as pretty JSON to this file
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// Write the last raw model reply to this file, even when parsing fails
    #[arg(long, value_name = "FILE")]
    raw_out: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let app_config = AppConfig::from_env()?;

    // stdout carries only the JSON result
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &app_config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let provider_config = ProviderConfig::from_env()?;

    let job_description = tokio::fs::read_to_string(&cli.job_description_file)
        .await
        .with_context(|| {
            format!(
                "Could not read job description file {}",
                cli.job_description_file.display()
            )
        })?;
    let document = read_document(&cli.cv_document).await?;

    let backend = cli.extraction.unwrap_or(app_config.extraction_backend);
    let extractor =
        DocumentExtractor::for_backend(backend, &app_config.ocr_language, &provider_config)?;
    let provider = MistralProvider::new();

    let outcome = run_pipeline(
        &job_description,
        document,
        cli.metric,
        &extractor,
        &provider,
        &provider_config,
    )
    .await;

    if let Some(path) = &cli.raw_out {
        if let Err(e) = write_raw(path, provider.last_raw_response().as_deref()) {
            warn!("{e:#}");
        }
    }

    let output = outcome?;
    debug!(
        analysis_id = %output.analysis_id,
        extraction_method = output.extraction_method,
        structured_cv = %output.structured_cv,
        "Structured CV sent for analysis"
    );

    if let Some(path) = &cli.save {
        save_json(&output.result, path)
            .with_context(|| format!("Could not save result to {}", path.display()))?;
    }

    println!("{}", serde_json::to_string(&output.result)?);
    Ok(())
}

fn write_raw(path: &Path, raw: Option<&str>) -> Result<()> {
    match raw {
        Some(raw) => std::fs::write(path, raw)
            .with_context(|| format!("Could not write raw reply to {}", path.display())),
        None => Ok(()),
    }
}
