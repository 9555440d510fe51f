use super::{ExtractionStage, StageError};

/// Text-layer extraction via the `pdf-extract` crate. Fast path for
/// text-native PDFs.
pub struct PdfTextStage;

impl ExtractionStage for PdfTextStage {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract(&self, document: &[u8]) -> Result<String, StageError> {
        pdf_extract::extract_text_from_mem(document).map_err(|e| StageError::Engine(e.to_string()))
    }
}
