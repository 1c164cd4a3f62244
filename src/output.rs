use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Where one run writes its artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub image: PathBuf,
    pub report: PathBuf,
}

impl OutputPaths {
    /// `<dir>/<stem>_translated.<ext>` and `<dir>/<stem>_translation.txt`.
    pub fn for_input(input: &Path, dir: &Path) -> Self {
        let stem = input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let ext = input
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_else(|| "png".to_string());
        Self {
            image: dir.join(format!("{}_translated.{}", stem, ext)),
            report: dir.join(format!("{}_translation.txt", stem)),
        }
    }
}

pub fn format_report(originals: &[String], translations: &[String]) -> String {
    format!(
        "Original text:\n{}\n\nTranslation:\n{}",
        originals.join("\n"),
        translations.join("\n")
    )
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory: {}", dir.display()))
}

pub fn write_report(path: &Path, originals: &[String], translations: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, format_report(originals, translations))
        .with_context(|| format!("failed to write translation text: {}", path.display()))
}

pub fn write_image(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, bytes)
        .with_context(|| format!("failed to write translated image: {}", path.display()))
}
