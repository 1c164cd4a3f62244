use anyhow::{anyhow, Context, Result};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub mod color;
pub mod layout;
pub mod logging;
pub mod ocr;
pub mod output;
mod providers;
pub mod render;
pub mod settings;
mod translator;

pub use color::{background_color, foreground_color, Color};
pub use layout::{merge_fragments, Fragment, LayoutError, Location, MergeOptions, Paragraph};
pub use providers::{OpenAI, Provider, ProviderKind, ProviderResponse, ProviderUsage};
pub use translator::{Translator, TRANSLATION_FAILED_PREFIX};

use ocr::{BaiduCredentials, OcrSource};
use output::OutputPaths;
use render::TextStyle;
use settings::Settings;

#[derive(Debug, Clone)]
pub struct Config {
    pub image: PathBuf,
    pub lang: Option<String>,
    pub model: Option<String>,
    pub key: Option<String>,
    pub ocr: Option<String>,
    pub fragments: Option<PathBuf>,
    pub ocr_languages: String,
    pub output_dir: Option<PathBuf>,
    pub workers: Option<usize>,
    pub settings_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub originals: Vec<String>,
    pub translations: Vec<String>,
    /// `None` when compositing failed; the text report is still written.
    pub image_path: Option<PathBuf>,
    pub report_path: PathBuf,
}

pub async fn run(config: Config) -> Result<RunOutput> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    if !config.image.exists() {
        return Err(anyhow!("image file not found: {}", config.image.display()));
    }

    let source = resolve_ocr_source(&config)?;
    let fragments = ocr::extract_fragments(&source, &config.image).await?;
    if fragments.is_empty() {
        return Err(anyhow!("no text recognized in {}", config.image.display()));
    }

    let paragraphs = layout::merge_fragments(fragments, &settings.merge)?;
    info!(count = paragraphs.len(), "merged text regions into paragraphs");
    let originals = paragraphs
        .iter()
        .map(|paragraph| paragraph.text().to_string())
        .collect::<Vec<_>>();

    let translator = build_translator(&config, &settings)?;
    let workers = config.workers.unwrap_or(settings.workers);
    let translations = translator.translate_all(&originals, workers).await;

    let output_dir = config
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.output_dir));
    output::ensure_dir(&output_dir)?;
    let paths = OutputPaths::for_input(&config.image, &output_dir);

    let image_path = match composite(&config.image, &paragraphs, &translations, &settings) {
        Ok(bytes) => {
            output::write_image(&paths.image, &bytes)?;
            info!(path = %paths.image.display(), "saved translated image");
            Some(paths.image.clone())
        }
        Err(err) => {
            warn!("failed to render translated image: {:#}", err);
            None
        }
    };

    output::write_report(&paths.report, &originals, &translations)?;
    info!(path = %paths.report.display(), "saved translation text");

    Ok(RunOutput {
        originals,
        translations,
        image_path,
        report_path: paths.report,
    })
}

fn resolve_ocr_source(config: &Config) -> Result<OcrSource> {
    let requested = config
        .ocr
        .as_deref()
        .map(|value| value.trim().to_lowercase());
    match (requested.as_deref(), &config.fragments) {
        (None | Some("json"), Some(path)) => Ok(OcrSource::Json(path.clone())),
        (Some("json"), None) => Err(anyhow!("--ocr json requires --fragments <file>")),
        (Some("tesseract"), _) => Ok(OcrSource::Tesseract {
            languages: config.ocr_languages.clone(),
        }),
        (None | Some("baidu"), _) => {
            let api_key = providers::get_env("BAIDU_API_KEY");
            let secret_key = providers::get_env("BAIDU_SECRET_KEY");
            match (api_key, secret_key) {
                (Some(api_key), Some(secret_key)) => Ok(OcrSource::Baidu(BaiduCredentials {
                    api_key,
                    secret_key,
                })),
                _ => Err(anyhow!(
                    "Baidu OCR credentials not found (set BAIDU_API_KEY and BAIDU_SECRET_KEY)"
                )),
            }
        }
        (Some(other), _) => Err(anyhow!(
            "unknown OCR engine '{}' (expected baidu, tesseract or json)",
            other
        )),
    }
}

fn build_translator(config: &Config, settings: &Settings) -> Result<Translator<OpenAI>> {
    let model = config.model.as_deref().or(settings.model.as_deref());
    let selection = providers::resolve_provider_selection(model, config.key.as_deref())?;
    let key = providers::resolve_key(selection.provider, config.key.as_deref())
        .with_context(|| "no API key found for selected provider")?;
    let provider = providers::build_provider(selection.provider, key, selection.requested_model);
    let lang = config.lang.clone().unwrap_or_else(|| settings.lang.clone());
    info!(provider = selection.provider.as_str(), model = provider.model(), "translator ready");
    Ok(Translator::new(provider, lang))
}

/// Paints every translation over its paragraph and re-encodes the image in
/// its original format.
fn composite(
    image_path: &Path,
    paragraphs: &[Paragraph],
    translations: &[String],
    settings: &Settings,
) -> Result<Vec<u8>> {
    let bytes = std::fs::read(image_path)
        .with_context(|| format!("failed to read image: {}", image_path.display()))?;
    let format = image::guess_format(&bytes)
        .or_else(|_| ImageFormat::from_path(image_path))
        .with_context(|| format!("unsupported image format: {}", image_path.display()))?;
    let decoded = image::load_from_memory_with_format(&bytes, format)
        .with_context(|| format!("failed to decode image: {}", image_path.display()))?;
    let rgb = decoded.to_rgb8();

    let style = TextStyle {
        font_scale: settings.font_scale,
        min_font_size: settings.min_font_size,
        color_threshold: settings.color_threshold,
    };
    let blocks = render::paragraph_blocks(&rgb, paragraphs, translations, &style);

    let (fallback_paths, fallback_families) = render::overlay_fallback_fonts();
    let font = match render::resolve_overlay_font(
        settings.font_path.as_deref().map(Path::new),
        settings.font_family.as_deref(),
        fallback_paths,
        fallback_families,
    ) {
        Ok(font) => Some(font),
        Err(err) => {
            warn!("no overlay font resolved, using the renderer default: {:#}", err);
            None
        }
    };

    let svg = render::render_svg(&rgb, &blocks, font.as_ref().map(|font| font.family.as_str()))?;
    render::render_svg_bytes(&svg, format, font.as_ref())
}
