//! Pipeline driver: job text + CV document → validated fit report.
//!
//! Strictly sequential: extract, structure, analyze. Front ends (CLI and HTTP)
//! build the config, extractor and provider for each invocation and hand
//! them in; nothing here reads the environment.

use thiserror::Error;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::analysis::provider::{AnalysisError, AnalysisProvider};
use crate::config::{ConfigError, ProviderConfig};
use crate::cv::structurer::{structure, StructuredCv};
use crate::extraction::{DocumentExtractor, ExtractionError, StageFailure};
use crate::models::report::{is_valid_metric_name, AnalysisRequest, AnalysisResult};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Please enter a job description.")]
    EmptyJobDescription,

    #[error("Please upload a CV file.")]
    MissingDocument,

    #[error("Invalid metric name '{0}': use lowercase letters, digits and underscores.")]
    InvalidMetric(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Everything a front end may want to show about one run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub analysis_id: Uuid,
    pub result: AnalysisResult,
    pub structured_cv: StructuredCv,
    /// Metrics the model was asked to score, in request order.
    pub selected_metrics: Vec<String>,
    pub extraction_method: &'static str,
    pub extraction_failures: Vec<StageFailure>,
}

pub async fn run_pipeline(
    job_description: &str,
    document: Vec<u8>,
    selected_metrics: Vec<String>,
    extractor: &DocumentExtractor,
    provider: &dyn AnalysisProvider,
    config: &ProviderConfig,
) -> Result<PipelineOutput, PipelineError> {
    if job_description.trim().is_empty() {
        return Err(PipelineError::EmptyJobDescription);
    }
    if document.is_empty() {
        return Err(PipelineError::MissingDocument);
    }
    if let Some(bad) = selected_metrics
        .iter()
        .map(|m| m.trim())
        .find(|m| !m.is_empty() && !is_valid_metric_name(m))
    {
        return Err(PipelineError::InvalidMetric(bad.to_string()));
    }

    let analysis_id = Uuid::new_v4();
    let span = info_span!("analysis", %analysis_id, provider = provider.name());

    async move {
        info!(document_bytes = document.len(), "Extracting CV text");
        let extracted = extractor.extract(document).await?;

        let structured_cv = structure(&extracted.text);
        if structured_cv.is_empty() {
            return Err(ExtractionError::NoUsableText {
                failures: extracted.failures,
            }
            .into());
        }

        let request = AnalysisRequest::new(
            job_description.to_string(),
            structured_cv.to_string(),
            selected_metrics,
        );
        let result = provider.analyze(&request, config).await?;

        info!(
            overall_score = result.overall_score,
            method = extracted.method,
            "Analysis complete"
        );

        Ok(PipelineOutput {
            analysis_id,
            result,
            structured_cv,
            selected_metrics: request.selected_metrics().to_vec(),
            extraction_method: extracted.method,
            extraction_failures: extracted.failures,
        })
    }
    .instrument(span)
    .await
}
