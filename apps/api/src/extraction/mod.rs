//! Document text extraction.
//!
//! Two interchangeable backends:
//! - `Local`: an ordered fallback chain of in-process / local-tool stages
//!   (`pdf-extract` → `lopdf` → `pdftoppm` + `tesseract`), stopping at the
//!   first stage that yields non-blank text.
//! - `Remote`: a single call to the remote OCR endpoint. No fallback; any
//!   transport or auth failure propagates as-is.

pub mod lopdf_text;
pub mod ocr;
pub mod pdf_text;
pub mod remote_ocr;

#[cfg(test)]
pub(crate) mod fixtures;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ProviderConfig;
use crate::llm_client::LlmError;

use self::lopdf_text::LopdfTextStage;
use self::ocr::RasterOcrStage;
use self::pdf_text::PdfTextStage;
use self::remote_ocr::RemoteOcr;

/// Failure of a single extraction stage. Never fatal on its own.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("{0}")]
    Engine(String),

    #[error("stage panicked: {0}")]
    Panicked(String),

    #[error("{0} not found on PATH")]
    ToolMissing(&'static str),

    #[error("{tool} failed with exit code {code}: {stderr}")]
    ToolFailed {
        tool: &'static str,
        code: i32,
        stderr: String,
    },

    #[error("no text found")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One failed stage, kept for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct StageFailure {
    pub stage: &'static str,
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Could not read document: {0}")]
    DocumentUnreadable(#[source] std::io::Error),

    #[error("Could not extract text from the CV document ({})", summarize(.failures))]
    NoUsableText { failures: Vec<StageFailure> },

    #[error("Remote OCR failed: {0}")]
    Remote(#[from] LlmError),
}

fn summarize(failures: &[StageFailure]) -> String {
    if failures.is_empty() {
        return "no stages attempted".to_string();
    }
    failures
        .iter()
        .map(|f| format!("{}: {}", f.stage, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Text produced by exactly one extraction method.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub method: &'static str,
    /// Stages tried (and failed) before `method` succeeded.
    pub failures: Vec<StageFailure>,
}

/// A single synchronous extraction strategy over raw document bytes.
pub trait ExtractionStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, document: &[u8]) -> Result<String, StageError>;
}

/// Which extraction backend is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionBackend {
    #[default]
    Local,
    Remote,
}

impl FromStr for ExtractionBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(ExtractionBackend::Local),
            "remote" => Ok(ExtractionBackend::Remote),
            other => Err(format!("unknown extraction backend '{other}'")),
        }
    }
}

/// Ordered list of stages, tried until one succeeds.
pub struct FallbackChain {
    stages: Vec<Box<dyn ExtractionStage>>,
}

impl FallbackChain {
    pub fn new(stages: Vec<Box<dyn ExtractionStage>>) -> Self {
        Self { stages }
    }

    /// pdf-extract, then lopdf, then rasterize + OCR in `ocr_language`.
    pub fn standard(ocr_language: &str) -> Self {
        Self::new(vec![
            Box::new(PdfTextStage),
            Box::new(LopdfTextStage),
            Box::new(RasterOcrStage::default().with_language(ocr_language)),
        ])
    }

    pub fn run(&self, document: &[u8]) -> Result<ExtractedText, ExtractionError> {
        let mut failures = Vec::new();

        for stage in &self.stages {
            let outcome = catch_unwind(AssertUnwindSafe(|| stage.extract(document)))
                .unwrap_or_else(|payload| Err(StageError::Panicked(panic_message(&*payload))));

            match outcome {
                Ok(text) if !text.trim().is_empty() => {
                    info!(
                        stage = stage.name(),
                        chars = text.len(),
                        failed_before = failures.len(),
                        "Text extracted"
                    );
                    return Ok(ExtractedText {
                        text,
                        method: stage.name(),
                        failures,
                    });
                }
                Ok(_) => {
                    warn!(stage = stage.name(), "Stage produced no text, trying next stage");
                    failures.push(StageFailure {
                        stage: stage.name(),
                        error: StageError::Empty.to_string(),
                    });
                }
                Err(e) => {
                    warn!(stage = stage.name(), error = %e, "Stage failed, trying next stage");
                    failures.push(StageFailure {
                        stage: stage.name(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Err(ExtractionError::NoUsableText { failures })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// The extractor used by one pipeline invocation.
pub enum DocumentExtractor {
    Local(Arc<FallbackChain>),
    Remote(RemoteOcr),
}

impl DocumentExtractor {
    pub fn for_backend(
        backend: ExtractionBackend,
        ocr_language: &str,
        config: &ProviderConfig,
    ) -> Result<Self, LlmError> {
        Ok(match backend {
            ExtractionBackend::Local => {
                DocumentExtractor::Local(Arc::new(FallbackChain::standard(ocr_language)))
            }
            ExtractionBackend::Remote => DocumentExtractor::Remote(RemoteOcr::new(config)?),
        })
    }

    pub async fn extract(&self, document: Vec<u8>) -> Result<ExtractedText, ExtractionError> {
        match self {
            DocumentExtractor::Local(chain) => {
                let chain = Arc::clone(chain);
                tokio::task::spawn_blocking(move || chain.run(&document))
                    .await
                    .unwrap_or_else(|e| {
                        Err(ExtractionError::NoUsableText {
                            failures: vec![StageFailure {
                                stage: "local-chain",
                                error: e.to_string(),
                            }],
                        })
                    })
            }
            DocumentExtractor::Remote(ocr) => ocr.extract(&document).await,
        }
    }
}

/// Reads the document bytes. Failure here never enters the fallback chain.
pub async fn read_document(path: &Path) -> Result<Vec<u8>, ExtractionError> {
    tokio::fs::read(path)
        .await
        .map_err(ExtractionError::DocumentUnreadable)
}
