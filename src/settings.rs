use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::color::DEFAULT_FOREGROUND_THRESHOLD;
use crate::layout::MergeOptions;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub merge: MergeOptions,
    pub color_threshold: f64,
    pub lang: String,
    pub workers: usize,
    pub model: Option<String>,
    pub font_family: Option<String>,
    pub font_path: Option<String>,
    pub font_scale: f32,
    pub min_font_size: f32,
    pub output_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            merge: MergeOptions::default(),
            color_threshold: DEFAULT_FOREGROUND_THRESHOLD,
            lang: "zh".to_string(),
            workers: 5,
            model: None,
            font_family: None,
            font_path: None,
            font_scale: 0.8,
            min_font_size: 10.0,
            output_dir: "result".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    merge: Option<MergeSettings>,
    color: Option<ColorSettings>,
    translate: Option<TranslateSettings>,
    render: Option<RenderSettings>,
    output: Option<OutputSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct MergeSettings {
    max_line_gap: Option<f64>,
    max_x_diff: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ColorSettings {
    threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslateSettings {
    lang: Option<String>,
    workers: Option<usize>,
    model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RenderSettings {
    font_family: Option<String>,
    font_path: Option<String>,
    font_scale: Option<f32>,
    min_font_size: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputSettings {
    dir: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    load_settings_from(&ordered_paths)
}

/// Merges every existing file in `paths` over the defaults, later files
/// winning.
pub fn load_settings_from(paths: &[PathBuf]) -> Result<Settings> {
    let mut settings = Settings::default();
    for path in paths {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }
    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(merge) = incoming.merge {
            if let Some(gap) = merge.max_line_gap {
                if gap >= 0.0 {
                    self.merge.max_line_gap = gap;
                }
            }
            if let Some(diff) = merge.max_x_diff {
                if diff >= 0.0 {
                    self.merge.max_x_diff = diff;
                }
            }
        }
        if let Some(color) = incoming.color {
            if let Some(threshold) = color.threshold {
                if threshold >= 0.0 {
                    self.color_threshold = threshold;
                }
            }
        }
        if let Some(translate) = incoming.translate {
            if let Some(lang) = translate.lang {
                if !lang.trim().is_empty() {
                    self.lang = lang;
                }
            }
            if let Some(workers) = translate.workers {
                if workers > 0 {
                    self.workers = workers;
                }
            }
            if let Some(model) = translate.model {
                if !model.trim().is_empty() {
                    self.model = Some(model);
                }
            }
        }
        if let Some(render) = incoming.render {
            if let Some(family) = render.font_family {
                if !family.trim().is_empty() {
                    self.font_family = Some(family);
                }
            }
            if let Some(path) = render.font_path {
                if !path.trim().is_empty() {
                    self.font_path = Some(path);
                }
            }
            if let Some(scale) = render.font_scale {
                if scale > 0.0 {
                    self.font_scale = scale;
                }
            }
            if let Some(size) = render.min_font_size {
                if size > 0.0 {
                    self.min_font_size = size;
                }
            }
        }
        if let Some(output) = incoming.output {
            if let Some(dir) = output.dir {
                if !dir.trim().is_empty() {
                    self.output_dir = dir;
                }
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".image-translator-rust"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn embedded_defaults_match_built_in_defaults() {
        let parsed: SettingsFile = toml::from_str(DEFAULT_SETTINGS_TOML).expect("parse defaults");
        let mut settings = Settings::default();
        settings.merge(parsed);
        assert_eq!(settings.merge, MergeOptions::default());
        assert_eq!(settings.color_threshold, 30.0);
        assert_eq!(settings.lang, "zh");
        assert_eq!(settings.workers, 5);
        assert_eq!(settings.output_dir, "result");
        assert!(settings.model.is_none());
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let dir = tempdir().expect("tempdir");
        let base = dir.path().join("settings.toml");
        let local = dir.path().join("settings.local.toml");
        fs::write(
            &base,
            "[merge]\nmax_line_gap = 1.5\n[translate]\nlang = \"ja\"\nworkers = 2\n",
        )
        .expect("write base");
        fs::write(&local, "[translate]\nworkers = 8\n[output]\ndir = \"out\"\n")
            .expect("write local");

        let missing = dir.path().join("missing.toml");
        let settings = load_settings_from(&[base, missing, local]).expect("load");
        assert_eq!(settings.merge.max_line_gap, 1.5);
        assert_eq!(settings.merge.max_x_diff, 1.0);
        assert_eq!(settings.lang, "ja");
        assert_eq!(settings.workers, 8);
        assert_eq!(settings.output_dir, "out");
    }

    #[test]
    fn invalid_values_are_ignored() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            "[translate]\nworkers = 0\nlang = \"  \"\n[render]\nfont_scale = -1.0\n",
        )
        .expect("write");
        let settings = load_settings_from(&[path]).expect("load");
        assert_eq!(settings.workers, 5);
        assert_eq!(settings.lang, "zh");
        assert_eq!(settings.font_scale, 0.8);
    }

    #[test]
    fn malformed_toml_names_the_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[merge\n").expect("write");
        let err = load_settings_from(&[path]).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }
}
