use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ExtractedText, ExtractionError, StageFailure};
use crate::config::ProviderConfig;
use crate::llm_client::{LlmError, MistralClient};

#[derive(Debug, Serialize)]
struct OcrRequest<'a> {
    model: &'a str,
    document: OcrDocument,
    include_image_base64: bool,
}

#[derive(Debug, Serialize)]
struct OcrDocument {
    #[serde(rename = "type")]
    kind: &'static str,
    document_url: String,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    pages: Vec<OcrPage>,
}

#[derive(Debug, Deserialize)]
struct OcrPage {
    markdown: String,
}

/// Remote OCR backend: the whole document goes to the provider's OCR endpoint
/// as a base64 data URL. Errors are not caught here; there is no local path
/// to fall back to.
pub struct RemoteOcr {
    client: MistralClient,
    model: String,
}

impl RemoteOcr {
    pub fn new(config: &ProviderConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: MistralClient::new(config)?,
            model: config.ocr_model.clone(),
        })
    }

    pub async fn extract(&self, document: &[u8]) -> Result<ExtractedText, ExtractionError> {
        let request = OcrRequest {
            model: &self.model,
            document: OcrDocument {
                kind: "document_url",
                document_url: pdf_data_url(document),
            },
            include_image_base64: false,
        };

        let body = self.client.post_json("ocr", &request).await?;
        let text = join_pages(&body)?;

        if text.trim().is_empty() {
            return Err(ExtractionError::NoUsableText {
                failures: vec![StageFailure {
                    stage: "remote-ocr",
                    error: "no text found".to_string(),
                }],
            });
        }

        info!(model = %self.model, chars = text.len(), "Text extracted by remote OCR");
        Ok(ExtractedText {
            text,
            method: "remote-ocr",
            failures: Vec::new(),
        })
    }
}

fn pdf_data_url(document: &[u8]) -> String {
    format!("data:application/pdf;base64,{}", STANDARD.encode(document))
}

/// Concatenates every page's markdown, separated by a blank line.
fn join_pages(body: &str) -> Result<String, LlmError> {
    let response: OcrResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::UnexpectedResponseShape(format!("invalid OCR envelope: {e}")))?;

    Ok(response
        .pages
        .into_iter()
        .map(|p| p.markdown)
        .collect::<Vec<_>>()
        .join("\n\n"))
}
