//! Compositing translated paragraphs back onto the source image.

mod font;

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{ImageFormat, RgbImage};
use resvg::render;
use std::io::Cursor;
use std::sync::Arc;
use tiny_skia::Pixmap;
use tracing::debug;
use usvg::{fontdb, Options, Tree};

use crate::color::{self, Color};
use crate::layout::{BBox, Paragraph};

pub use font::{overlay_fallback_fonts, resolve_overlay_font, ResolvedOverlayFont};

const LINE_HEIGHT: f32 = 1.2;

#[derive(Debug, Clone)]
pub struct OverlayBlock {
    pub bbox: BBox,
    pub background: Color,
    pub foreground: Color,
    pub text: String,
    pub font_size: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub font_scale: f32,
    pub min_font_size: f32,
    pub color_threshold: f64,
}

pub fn font_size_for(paragraph: &Paragraph, style: &TextStyle) -> f32 {
    let height = paragraph.first().location.height as f32;
    (height * style.font_scale).max(style.min_font_size)
}

pub fn paragraph_blocks(
    image: &RgbImage,
    paragraphs: &[Paragraph],
    translations: &[String],
    style: &TextStyle,
) -> Vec<OverlayBlock> {
    paragraphs
        .iter()
        .zip(translations)
        .map(|(paragraph, translation)| {
            let bbox = paragraph.bbox();
            let background = color::background_color(image, &bbox.to_location());
            let foreground = color::foreground_color(
                image,
                &paragraph.first().location,
                Some(background),
                style.color_threshold,
            );
            debug!(
                left = bbox.left,
                top = bbox.top,
                background = %background.to_css(),
                foreground = %foreground.to_css(),
                "paragraph colors"
            );
            OverlayBlock {
                bbox,
                background,
                foreground,
                text: translation.clone(),
                font_size: font_size_for(paragraph, style),
            }
        })
        .collect()
}

// The source is always embedded as PNG; usvg only decodes a few raster
// formats and drops the rest silently.
pub fn render_svg(
    image: &RgbImage,
    blocks: &[OverlayBlock],
    font_family: Option<&str>,
) -> Result<String> {
    let (width, height) = image.dimensions();
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .with_context(|| "failed to encode source image as PNG")?;
    let data_uri = format!("data:image/png;base64,{}", BASE64.encode(&png));

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));
    svg.push_str(&format!(
        r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
        uri = data_uri,
        w = width,
        h = height
    ));

    let family_attr = font_family
        .map(|family| format!(r#" font-family="{}""#, escape_xml(family)))
        .unwrap_or_default();

    for block in blocks {
        let BBox { left, top, .. } = block.bbox;
        svg.push_str(&format!(
            r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="{fill}"/>"#,
            x = left,
            y = top,
            w = block.bbox.width(),
            h = block.bbox.height(),
            fill = block.background.to_css()
        ));

        let lines = block
            .text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>();
        if lines.is_empty() {
            continue;
        }
        svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" font-size="{size}" fill="{color}"{family} xml:space="preserve">"#,
            x = left,
            y = top as f32 + block.font_size,
            size = block.font_size,
            color = block.foreground.to_css(),
            family = family_attr
        ));
        for (idx, line) in lines.iter().enumerate() {
            let escaped = escape_xml(line);
            if idx == 0 {
                svg.push_str(&format!(r#"<tspan x="{x}">{text}</tspan>"#, x = left, text = escaped));
            } else {
                svg.push_str(&format!(
                    r#"<tspan x="{x}" dy="{dy}">{text}</tspan>"#,
                    x = left,
                    dy = block.font_size * LINE_HEIGHT,
                    text = escaped
                ));
            }
        }
        svg.push_str("</text>");
    }

    svg.push_str("</svg>");
    Ok(svg)
}

pub fn render_svg_bytes(
    svg: &str,
    format: ImageFormat,
    font: Option<&ResolvedOverlayFont>,
) -> Result<Vec<u8>> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    let mut options = Options::default();
    if let Some(font) = font {
        db.load_font_data(font.data().to_vec());
        options.font_family = font.family.clone();
    }
    options.fontdb = Arc::new(db);

    let tree = Tree::from_str(svg, &options).with_context(|| "failed to parse SVG")?;
    let size = tree.size().to_int_size();
    let mut pixmap =
        Pixmap::new(size.width(), size.height()).ok_or_else(|| anyhow!("empty SVG size"))?;
    let mut pixmap_mut = pixmap.as_mut();
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap_mut);
    let image = image::RgbaImage::from_raw(size.width(), size.height(), pixmap.data().to_vec())
        .ok_or_else(|| anyhow!("failed to build image buffer from SVG"))?;

    let image = image::DynamicImage::ImageRgba8(image);
    let image = match format {
        ImageFormat::Jpeg => image::DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => image,
    };
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .with_context(|| "failed to encode image from SVG")?;
    Ok(bytes)
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
