use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{ExtractionStage, StageError};

const PDFTOPPM: &str = "pdftoppm";
const TESSERACT: &str = "tesseract";

/// Last-resort stage for scanned documents: render every page to PNG with
/// `pdftoppm` (poppler-utils), then run `tesseract` on each image.
///
/// All intermediate files live in a `TempDir` removed when the stage returns.
pub struct RasterOcrStage {
    dpi: u32,
    language: String,
}

impl Default for RasterOcrStage {
    fn default() -> Self {
        Self {
            dpi: 300,
            language: "eng".to_string(),
        }
    }
}

impl RasterOcrStage {
    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    /// Check if both external tools are available on the system.
    pub fn is_available() -> bool {
        [PDFTOPPM, TESSERACT].iter().all(|tool| {
            Command::new(tool)
                .arg("-v")
                .output()
                .map(|o| o.status.success() || !o.stderr.is_empty())
                .unwrap_or(false)
        })
    }

    fn rasterize(&self, pdf_path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, StageError> {
        let prefix = out_dir.join("page");
        let output = Command::new(PDFTOPPM)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(pdf_path)
            .arg(&prefix)
            .output()
            .map_err(|e| tool_error(PDFTOPPM, e))?;

        if !output.status.success() {
            return Err(StageError::ToolFailed {
                tool: PDFTOPPM,
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let mut images: Vec<PathBuf> = std::fs::read_dir(out_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
            .collect();
        // pdftoppm zero-pads page numbers to a common width, so a lexical sort is page order.
        images.sort();
        Ok(images)
    }

    fn recognize(&self, image: &Path) -> Result<String, StageError> {
        let output = Command::new(TESSERACT)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| tool_error(TESSERACT, e))?;

        if !output.status.success() {
            return Err(StageError::ToolFailed {
                tool: TESSERACT,
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ExtractionStage for RasterOcrStage {
    fn name(&self) -> &'static str {
        "ocr"
    }

    fn extract(&self, document: &[u8]) -> Result<String, StageError> {
        let workdir = tempfile::tempdir()?;
        let pdf_path = workdir.path().join("document.pdf");
        std::fs::write(&pdf_path, document)?;

        let images_dir = workdir.path().join("pages");
        std::fs::create_dir(&images_dir)?;

        let images = self.rasterize(&pdf_path, &images_dir)?;
        if images.is_empty() {
            return Err(StageError::Engine("pdftoppm rendered no pages".into()));
        }

        let mut text = String::new();
        for image in &images {
            text.push_str(&self.recognize(image)?);
        }

        if !text.trim().is_empty() {
            tracing::warn!(
                pages = images.len(),
                "Text extracted using OCR. Results may be less accurate for low-quality scans."
            );
        }
        Ok(text)
    }
}

fn tool_error(tool: &'static str, e: std::io::Error) -> StageError {
    if e.kind() == ErrorKind::NotFound {
        StageError::ToolMissing(tool)
    } else {
        StageError::Io(e)
    }
}
