use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

const PREVIEW_PAIRS: usize = 3;

#[derive(Parser, Debug)]
#[command(
    name = "image-translator-rust",
    version,
    about = "Translate the text in an image and paint the translation back in place"
)]
struct Cli {
    /// Image to translate
    image: PathBuf,

    /// Target language (default from settings: zh)
    #[arg(short = 'l', long = "lang")]
    lang: Option<String>,

    /// Model name or provider:model (e.g. deepseek:deepseek-chat)
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// API key for the translation provider (overrides environment variables)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// OCR engine (baidu, tesseract, json)
    #[arg(long = "ocr", value_parser = ["baidu", "tesseract", "json"])]
    ocr: Option<String>,

    /// Previously captured fragments as JSON (implies --ocr json)
    #[arg(long = "fragments")]
    fragments: Option<PathBuf>,

    /// Tesseract languages joined with '+'
    #[arg(long = "ocr-languages", default_value = "eng")]
    ocr_languages: String,

    /// Output directory (default from settings: result)
    #[arg(short = 'o', long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// Concurrent translation requests
    #[arg(short = 'w', long = "workers")]
    workers: Option<usize>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    image_translator_rust::logging::init(cli.verbose)?;

    let output = image_translator_rust::run(image_translator_rust::Config {
        image: cli.image,
        lang: cli.lang,
        model: cli.model,
        key: cli.key,
        ocr: cli.ocr,
        fragments: cli.fragments,
        ocr_languages: cli.ocr_languages,
        output_dir: cli.output_dir,
        workers: cli.workers,
        settings_path: cli.read_settings,
    })
    .await?;

    println!("{}", format_preview(&output));
    Ok(())
}

fn format_preview(output: &image_translator_rust::RunOutput) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Translated {} paragraph(s)", output.originals.len()));
    for (original, translation) in output
        .originals
        .iter()
        .zip(&output.translations)
        .take(PREVIEW_PAIRS)
    {
        lines.push(format!("  {} → {}", first_line(original), first_line(translation)));
    }
    if output.originals.len() > PREVIEW_PAIRS {
        lines.push(format!("  ... {} more", output.originals.len() - PREVIEW_PAIRS));
    }
    match &output.image_path {
        Some(path) => lines.push(format!("Image: {}", path.display())),
        None => lines.push("Image: not rendered (see warnings)".to_string()),
    }
    lines.push(format!("Text: {}", output.report_path.display()));
    lines.join("\n")
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
