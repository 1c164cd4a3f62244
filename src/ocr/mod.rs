//! OCR collaborators that turn an image into positioned text fragments.

mod baidu;
mod tesseract;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::layout::{self, Fragment};

pub use baidu::BaiduCredentials;
pub use tesseract::list_tesseract_languages;

#[derive(Debug, Clone)]
pub enum OcrSource {
    /// Baidu high-accuracy OCR, line granularity.
    Baidu(BaiduCredentials),
    /// Local `tesseract` binary.
    Tesseract { languages: String },
    /// Fragments captured earlier and stored as JSON.
    Json(PathBuf),
}

impl OcrSource {
    pub fn name(&self) -> &'static str {
        match self {
            OcrSource::Baidu(_) => "baidu",
            OcrSource::Tesseract { .. } => "tesseract",
            OcrSource::Json(_) => "json",
        }
    }
}

pub async fn extract_fragments(source: &OcrSource, image_path: &Path) -> Result<Vec<Fragment>> {
    let fragments = match source {
        OcrSource::Baidu(credentials) => {
            let bytes = std::fs::read(image_path)
                .with_context(|| format!("image file not found: {}", image_path.display()))?;
            baidu::recognize(credentials, &bytes)
                .await
                .with_context(|| "OCR processing error")?
        }
        OcrSource::Tesseract { languages } => {
            let languages = tesseract::normalize_ocr_languages(languages)?;
            let tsv = tesseract::run_tesseract_tsv(image_path, &languages)?;
            tesseract::parse_tsv_lines(&tsv)
        }
        OcrSource::Json(path) => load_fragments_file(path)?,
    };
    info!(source = source.name(), count = fragments.len(), "recognized text regions");
    Ok(fragments)
}

pub fn load_fragments_file(path: &Path) -> Result<Vec<Fragment>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read fragments: {}", path.display()))?;
    layout::parse_fragments(&content)
        .with_context(|| format!("failed to parse fragments: {}", path.display()))
}
