use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;
use tracing::warn;

use crate::layout::{BBox, Fragment, Location};

pub fn list_tesseract_languages() -> Result<Vec<String>> {
    let output = Command::new("tesseract")
        .arg("--list-langs")
        .output()
        .with_context(|| "failed to run tesseract --list-langs")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract --list-langs failed: {}", stderr.trim()));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect())
}

/// Keeps the requested languages tesseract actually has installed.
pub(super) fn normalize_ocr_languages(requested: &str) -> Result<String> {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("ocr languages is empty"));
    }

    let available = match list_tesseract_languages() {
        Ok(list) => list,
        Err(_) => return Ok(trimmed.to_string()),
    };

    let (chosen, missing): (Vec<&str>, Vec<&str>) = trimmed
        .split(['+', ',', ' '])
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .partition(|lang| available.iter().any(|value| value == lang));

    if chosen.is_empty() {
        return Err(anyhow!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        ));
    }
    if !missing.is_empty() {
        warn!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        );
    }
    Ok(chosen.join("+"))
}

pub(super) fn run_tesseract_tsv(path: &Path, languages: &str) -> Result<String> {
    let output = Command::new("tesseract")
        .arg(path)
        .arg("stdout")
        .arg("-l")
        .arg(languages)
        .arg("--psm")
        .arg("4")
        .arg("tsv")
        .output()
        .with_context(|| "failed to run tesseract (is it installed?)")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract failed: {}", stderr.trim()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Folds word rows (level 5) into one fragment per recognized line.
pub(super) fn parse_tsv_lines(tsv: &str) -> Vec<Fragment> {
    let mut lines: BTreeMap<(u32, u32, u32, u32), (Vec<String>, BBox)> = BTreeMap::new();

    for row in tsv.lines().skip(1) {
        let cols = row.split('\t').collect::<Vec<_>>();
        if cols.len() < 12 {
            continue;
        }
        if cols[0].parse::<u32>().unwrap_or(0) != 5 {
            continue;
        }
        let conf: f32 = cols[10].trim().parse().unwrap_or(-1.0);
        let text = cols[11].trim();
        if text.is_empty() || conf < 0.0 {
            continue;
        }
        let number = |idx: usize| cols[idx].trim().parse::<u32>().unwrap_or(0);
        let key = (number(1), number(2), number(3), number(4));
        let word_box = BBox::from(&Location::new(
            number(6) as i64,
            number(7) as i64,
            number(8) as i64,
            number(9) as i64,
        ));
        lines
            .entry(key)
            .and_modify(|(words, bbox)| {
                words.push(text.to_string());
                *bbox = bbox.union(&word_box);
            })
            .or_insert_with(|| (vec![text.to_string()], word_box));
    }

    lines
        .into_values()
        .map(|(words, bbox)| Fragment::new(words.join(" "), bbox.to_location()))
        .collect()
}
