//! Background and foreground color estimation for text regions.

mod background;
mod foreground;
mod region;
mod stats;

use serde::Serialize;
use thiserror::Error;

pub use background::background_color;
pub use foreground::{foreground_color, DEFAULT_FOREGROUND_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn channels(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn distance(&self, other: &Color) -> f64 {
        self.channels()
            .iter()
            .zip(other.channels().iter())
            .map(|(a, b)| {
                let diff = *a as f64 - *b as f64;
                diff * diff
            })
            .sum::<f64>()
            .sqrt()
    }

    // BT.601 weights in integer thousandths
    pub fn luminance(&self) -> f64 {
        let weighted = 299 * self.r as u32 + 587 * self.g as u32 + 114 * self.b as u32;
        weighted as f64 / 1000.0
    }

    pub fn contrasting(&self) -> Color {
        if self.luminance() > 128.0 {
            Color::BLACK
        } else {
            Color::WHITE
        }
    }

    pub fn to_css(&self) -> String {
        format!("rgb({},{},{})", self.r, self.g, self.b)
    }
}

impl From<image::Rgb<u8>> for Color {
    fn from(pixel: image::Rgb<u8>) -> Self {
        let [r, g, b] = pixel.0;
        Color::new(r, g, b)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ColorError {
    #[error("region clips to an empty extent")]
    DegenerateRegion,
    #[error("no usable samples in region")]
    SamplingExhausted,
}
