use tracing::debug;

use super::{Fragment, LayoutError, Location, Paragraph};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeOptions {
    pub max_line_gap: f64,
    pub max_x_diff: f64,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            max_line_gap: 2.0,
            max_x_diff: 1.0,
        }
    }
}

/// First-fit grouping in `(top, left)` order against each paragraph's last line.
pub fn merge_fragments(
    fragments: Vec<Fragment>,
    options: &MergeOptions,
) -> Result<Vec<Paragraph>, LayoutError> {
    for (index, fragment) in fragments.iter().enumerate() {
        fragment
            .location
            .validate()
            .map_err(|reason| LayoutError::InvalidInput {
                index,
                reason: reason.to_string(),
            })?;
    }

    let mut sorted = fragments;
    sorted.sort_by_key(|fragment| (fragment.location.top, fragment.location.left));

    let mut paragraphs: Vec<Paragraph> = Vec::new();
    for fragment in sorted {
        let target = paragraphs.iter().position(|paragraph| {
            continues(&paragraph.last().location, &fragment.location, options)
        });
        match target {
            Some(idx) => {
                debug!(paragraph = idx, words = %fragment.words, "fragment joins paragraph");
                paragraphs[idx].push(fragment);
            }
            None => paragraphs.push(Paragraph::start(fragment)),
        }
    }

    for paragraph in &mut paragraphs {
        paragraph.finish();
    }
    Ok(paragraphs)
}

fn continues(last: &Location, next: &Location, options: &MergeOptions) -> bool {
    let gap = (next.top - last.bottom()) as f64;
    if gap > last.height as f64 * options.max_line_gap {
        return false;
    }
    let left_aligned = ((next.left - last.left) as f64).abs() <= options.max_x_diff;
    let center_aligned =
        (next.mid_x() - last.mid_x()).abs() <= options.max_x_diff * next.width as f64;
    left_aligned || center_aligned
}
