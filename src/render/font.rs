use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use ttf_parser::name_id;
use ttf_parser::Face;
use usvg::fontdb;

/// Font bytes plus the family name the SVG should reference.
#[derive(Clone)]
pub struct ResolvedOverlayFont {
    data: Arc<Vec<u8>>,
    pub family: String,
}

impl ResolvedOverlayFont {
    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }
}

impl std::fmt::Debug for ResolvedOverlayFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedOverlayFont")
            .field("family", &self.family)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(target_os = "macos")]
pub fn overlay_fallback_fonts() -> (&'static [&'static str], &'static [&'static str]) {
    (
        &["/System/Library/Fonts/PingFang.ttc"],
        &["PingFang SC", "Hiragino Sans", "sans-serif"],
    )
}

#[cfg(target_os = "windows")]
pub fn overlay_fallback_fonts() -> (&'static [&'static str], &'static [&'static str]) {
    (
        &["C:/Windows/Fonts/simhei.ttf"],
        &["SimHei", "Microsoft YaHei", "sans-serif"],
    )
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub fn overlay_fallback_fonts() -> (&'static [&'static str], &'static [&'static str]) {
    (
        &["/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf"],
        &["Noto Sans CJK SC", "Droid Sans Fallback", "sans-serif"],
    )
}

/// Picks the overlay font: explicit path, then explicit family, then the
/// platform fallback paths and families in order.
pub fn resolve_overlay_font(
    font_path: Option<&Path>,
    font_family: Option<&str>,
    fallback_paths: &[&str],
    fallback_families: &[&str],
) -> Result<ResolvedOverlayFont> {
    if let Some(path) = font_path {
        return load_font_file(path, font_family);
    }

    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    if let Some(family) = font_family {
        return load_font_from_family(&db, family);
    }

    for candidate in fallback_paths {
        let path = Path::new(candidate);
        if path.exists() {
            match load_font_file(path, None) {
                Ok(resolved) => return Ok(resolved),
                Err(err) => debug!("skipping fallback font {}: {:#}", path.display(), err),
            }
        }
    }

    for candidate in fallback_families {
        if let Ok(resolved) = load_font_from_family(&db, candidate) {
            return Ok(resolved);
        }
    }

    Err(anyhow!("no fallback fonts found"))
}

fn load_font_file(path: &Path, font_family: Option<&str>) -> Result<ResolvedOverlayFont> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    let family = first_family_name(&data)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))?
        .or_else(|| font_family.map(|name| name.to_string()))
        .unwrap_or_else(|| "sans-serif".to_string());
    Ok(ResolvedOverlayFont {
        data: Arc::new(data),
        family,
    })
}

fn load_font_from_family(db: &fontdb::Database, family: &str) -> Result<ResolvedOverlayFont> {
    let families = if family.eq_ignore_ascii_case("sans-serif") {
        vec![fontdb::Family::SansSerif]
    } else {
        vec![fontdb::Family::Name(family)]
    };
    let query = fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    let data = db
        .with_face_data(id, |data, _index| data.to_vec())
        .ok_or_else(|| anyhow!("failed to load font data: {}", family))?;
    let resolved_family = first_family_name(&data)
        .ok()
        .flatten()
        .unwrap_or_else(|| family.to_string());
    Ok(ResolvedOverlayFont {
        data: Arc::new(data),
        family: resolved_family,
    })
}

fn first_family_name(data: &[u8]) -> Result<Option<String>> {
    let count = ttf_parser::fonts_in_collection(data).unwrap_or(1);
    for index in 0..count {
        if let Ok(face) = Face::parse(data, index) {
            return Ok(extract_family_name(&face));
        }
    }
    Err(anyhow!("failed to parse font data"))
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}
