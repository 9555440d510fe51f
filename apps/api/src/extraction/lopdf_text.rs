use lopdf::Document;

use super::{ExtractionStage, StageError};

/// Alternate text-layer extraction: parse the document with `lopdf` and
/// pull text page by page. Catches PDFs whose structure trips `pdf-extract`.
pub struct LopdfTextStage;

impl ExtractionStage for LopdfTextStage {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn extract(&self, document: &[u8]) -> Result<String, StageError> {
        let doc = Document::load_mem(document).map_err(|e| StageError::Engine(e.to_string()))?;

        let mut text = String::new();
        for page_number in doc.get_pages().keys() {
            match doc.extract_text(&[*page_number]) {
                Ok(page_text) => {
                    text.push_str(&page_text);
                    text.push('\n');
                }
                Err(e) => {
                    // One unreadable page should not discard the others.
                    tracing::debug!(page = page_number, error = %e, "lopdf could not read page");
                }
            }
        }
        Ok(text)
    }
}
