mod geom;
mod merge;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use geom::BBox;
pub use merge::{merge_fragments, MergeOptions};

// signed so malformed input is rejected instead of wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl Location {
    pub fn new(left: i64, top: i64, width: i64, height: i64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> i64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i64 {
        self.top + self.height
    }

    pub fn mid_x(&self) -> f64 {
        (self.left * 2 + self.width) as f64 / 2.0
    }

    fn validate(&self) -> Result<(), &'static str> {
        if self.width < 0 || self.height < 0 {
            return Err("negative width or height");
        }
        if self.left < 0 || self.top < 0 {
            return Err("negative left or top");
        }
        let doubled_mid = self
            .left
            .checked_mul(2)
            .and_then(|left| left.checked_add(self.width));
        if self.left.checked_add(self.width).is_none()
            || self.top.checked_add(self.height).is_none()
            || doubled_mid.is_none()
        {
            return Err("coordinates overflow");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub words: String,
    pub location: Location,
}

impl Fragment {
    pub fn new(words: impl Into<String>, location: Location) -> Self {
        Self {
            words: words.into(),
            location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paragraph {
    fragments: Vec<Fragment>,
    text: String,
}

impl Paragraph {
    fn start(fragment: Fragment) -> Self {
        Self {
            fragments: vec![fragment],
            text: String::new(),
        }
    }

    fn push(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }

    fn last(&self) -> &Fragment {
        // a paragraph is never constructed empty
        &self.fragments[self.fragments.len() - 1]
    }

    fn finish(&mut self) {
        let mut text = String::new();
        for fragment in &self.fragments {
            text.push_str(&fragment.words);
            text.push('\n');
        }
        self.text = text;
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn first(&self) -> &Fragment {
        &self.fragments[0]
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bbox(&self) -> BBox {
        BBox::envelope(self.fragments.iter().map(|fragment| &fragment.location))
            .unwrap_or_else(|| BBox::from(&self.first().location))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("invalid fragment at index {index}: {reason}")]
    InvalidInput { index: usize, reason: String },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FragmentPayload {
    Wrapped { words_result: Vec<serde_json::Value> },
    List(Vec<serde_json::Value>),
}

/// Accepts a bare list or a `words_result` envelope.
pub fn parse_fragments(json: &str) -> Result<Vec<Fragment>, LayoutError> {
    let payload: FragmentPayload =
        serde_json::from_str(json).map_err(|err| LayoutError::InvalidInput {
            index: 0,
            reason: format!("malformed fragment list: {}", err),
        })?;
    let records = match payload {
        FragmentPayload::Wrapped { words_result } => words_result,
        FragmentPayload::List(list) => list,
    };
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let fragment: Fragment =
                serde_json::from_value(record).map_err(|err| LayoutError::InvalidInput {
                    index,
                    reason: err.to_string(),
                })?;
            fragment
                .location
                .validate()
                .map_err(|reason| LayoutError::InvalidInput {
                    index,
                    reason: reason.to_string(),
                })?;
            Ok(fragment)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_bare_list() {
        let json = r#"[{"words": "Hello", "location": {"left": 1, "top": 2, "width": 30, "height": 12}}]"#;
        let fragments = parse_fragments(json).unwrap();
        assert_eq!(
            fragments,
            vec![Fragment::new("Hello", Location::new(1, 2, 30, 12))]
        );
    }

    #[test]
    fn parse_accepts_words_result_envelope() {
        let json = r#"{"log_id": 7, "words_result_num": 2, "words_result": [
            {"words": "a", "location": {"top": 0, "left": 0, "width": 5, "height": 5}},
            {"words": "b", "location": {"top": 9, "left": 0, "width": 5, "height": 5}}
        ]}"#;
        let fragments = parse_fragments(json).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[1].words, "b");
    }

    #[test]
    fn parse_rejects_missing_field() {
        let json = r#"[
            {"words": "ok", "location": {"left": 0, "top": 0, "width": 5, "height": 5}},
            {"words": "bad", "location": {"left": 0, "top": 0, "width": 5}}
        ]"#;
        let err = parse_fragments(json).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidInput { index: 1, .. }));
    }

    #[test]
    fn parse_rejects_negative_height() {
        let json = r#"[{"words": "x", "location": {"left": 0, "top": 0, "width": 5, "height": -1}}]"#;
        let err = parse_fragments(json).unwrap_err();
        assert_eq!(
            err,
            LayoutError::InvalidInput {
                index: 0,
                reason: "negative width or height".to_string()
            }
        );
    }

    #[test]
    fn parse_rejects_extents_past_i64() {
        let json = format!(
            r#"[{{"words": "x", "location": {{"left": 1, "top": 0, "width": {}, "height": 5}}}}]"#,
            i64::MAX
        );
        let err = parse_fragments(&json).unwrap_err();
        assert_eq!(
            err,
            LayoutError::InvalidInput {
                index: 0,
                reason: "coordinates overflow".to_string()
            }
        );
    }

    #[test]
    fn mid_x_keeps_half_pixels() {
        assert_eq!(Location::new(3, 0, 5, 1).mid_x(), 5.5);
    }
}
