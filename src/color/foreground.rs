use image::RgbImage;
use tracing::debug;

use super::background::estimate_background;
use super::region::Region;
use super::stats::median_color;
use super::{Color, ColorError};
use crate::layout::Location;

pub const DEFAULT_FOREGROUND_THRESHOLD: f64 = 30.0;

const MIN_CONTRAST: f64 = 10.0;

const FALLBACK_CONTRAST: f64 = 20.0;

pub fn foreground_color(
    image: &RgbImage,
    rect: &Location,
    background: Option<Color>,
    threshold: f64,
) -> Color {
    match estimate_foreground(image, rect, background, threshold) {
        Ok(color) => color,
        Err(err) => {
            debug!(?rect, %err, "foreground estimation fell back to black");
            Color::BLACK
        }
    }
}

fn estimate_foreground(
    image: &RgbImage,
    rect: &Location,
    background: Option<Color>,
    threshold: f64,
) -> Result<Color, ColorError> {
    let region = Region::clip(image, rect)?;
    let background = match background {
        Some(color) => color,
        None => estimate_background(image, rect).unwrap_or(Color::WHITE),
    };

    let glyph_pixels = region
        .pixels(image)
        .filter(|pixel| pixel.distance(&background) > threshold)
        .collect::<Vec<_>>();

    let candidate = if glyph_pixels.is_empty() {
        debug!(?rect, "no pixel stands out from the background");
        fallback_foreground(image, &region, &background)?
    } else {
        median_color(&glyph_pixels)?
    };

    if candidate.distance(&background) < MIN_CONTRAST {
        return Ok(background.contrasting());
    }
    Ok(candidate)
}

fn fallback_foreground(
    image: &RgbImage,
    region: &Region,
    background: &Color,
) -> Result<Color, ColorError> {
    let pixels = region.pixels(image).collect::<Vec<_>>();
    let median = median_color(&pixels)?;
    if median.distance(background) > FALLBACK_CONTRAST {
        return Ok(median);
    }
    Ok(background.contrasting())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::background_color;
    use image::Rgb;

    fn filled(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(color))
    }

    fn paint(
        image: &mut RgbImage,
        xs: std::ops::Range<u32>,
        ys: std::ops::Range<u32>,
        color: [u8; 3],
    ) {
        for y in ys {
            for x in xs.clone() {
                image.put_pixel(x, y, Rgb(color));
            }
        }
    }

    #[test]
    fn finds_dark_text_on_light_paper() {
        let mut image = filled(60, 30, [245, 245, 240]);
        paint(&mut image, 10..50, 10..14, [20, 30, 120]);
        paint(&mut image, 10..14, 14..22, [22, 28, 118]);
        let rect = Location::new(0, 0, 60, 30);
        let background = background_color(&image, &rect);
        assert_eq!(background, Color::new(245, 245, 240));
        let color = foreground_color(
            &image,
            &rect,
            Some(background),
            DEFAULT_FOREGROUND_THRESHOLD,
        );
        assert_eq!(color, Color::new(20, 30, 120));
    }

    #[test]
    fn computes_background_when_missing() {
        let mut image = filled(60, 30, [0, 0, 0]);
        paint(&mut image, 20..40, 10..20, [255, 200, 0]);
        let color = foreground_color(
            &image,
            &Location::new(0, 0, 60, 30),
            None,
            DEFAULT_FOREGROUND_THRESHOLD,
        );
        assert_eq!(color, Color::new(255, 200, 0));
    }

    #[test]
    fn blank_region_returns_contrasting_color() {
        let image = filled(30, 30, [250, 250, 250]);
        let rect = Location::new(0, 0, 30, 30);
        let color = foreground_color(&image, &rect, None, DEFAULT_FOREGROUND_THRESHOLD);
        assert_eq!(color, Color::BLACK);

        let dark = filled(30, 30, [15, 10, 40]);
        let color = foreground_color(&dark, &rect, None, DEFAULT_FOREGROUND_THRESHOLD);
        assert_eq!(color, Color::WHITE);
    }

    #[test]
    fn fallback_uses_region_median_when_distinct() {
        // nothing exceeds the threshold, but the region median is 25 away
        let image = filled(10, 10, [100, 100, 125]);
        let color = foreground_color(
            &image,
            &Location::new(0, 0, 10, 10),
            Some(Color::new(100, 100, 100)),
            DEFAULT_FOREGROUND_THRESHOLD,
        );
        assert_eq!(color, Color::new(100, 100, 125));
    }

    #[test]
    fn candidate_too_close_to_background_is_replaced() {
        // half the pixels are far above, half far below the background;
        // their per-channel median lands right on it
        let background = Color::new(100, 100, 100);
        let mut image = filled(10, 2, [160, 160, 160]);
        paint(&mut image, 0..10, 1..2, [40, 40, 40]);
        let color = foreground_color(
            &image,
            &Location::new(0, 0, 10, 2),
            Some(background),
            DEFAULT_FOREGROUND_THRESHOLD,
        );
        assert_eq!(color, background.contrasting());
    }

    #[test]
    fn never_returns_a_color_near_the_background() {
        let mut image = filled(40, 40, [128, 128, 128]);
        paint(&mut image, 0..40, 0..20, [131, 126, 129]);
        paint(&mut image, 5..9, 5..35, [200, 10, 10]);
        for background in [
            Color::new(128, 128, 128),
            Color::new(131, 126, 129),
            Color::WHITE,
            Color::BLACK,
            Color::new(200, 10, 10),
        ] {
            for rect in [
                Location::new(0, 0, 40, 40),
                Location::new(0, 0, 40, 10),
                Location::new(20, 20, 20, 20),
                Location::new(4, 4, 6, 32),
            ] {
                let color = foreground_color(
                    &image,
                    &rect,
                    Some(background),
                    DEFAULT_FOREGROUND_THRESHOLD,
                );
                assert!(
                    color.distance(&background) >= 10.0,
                    "{:?} too close to {:?}",
                    color,
                    background
                );
            }
        }
    }

    #[test]
    fn zero_area_is_black() {
        let image = filled(16, 16, [0, 0, 0]);
        for rect in [
            Location::new(3, 3, 0, 5),
            Location::new(3, 3, 5, 0),
            Location::new(50, 50, 5, 5),
        ] {
            let with_background = foreground_color(
                &image,
                &rect,
                Some(Color::BLACK),
                DEFAULT_FOREGROUND_THRESHOLD,
            );
            assert_eq!(with_background, Color::BLACK);
            assert_eq!(
                foreground_color(&image, &rect, None, DEFAULT_FOREGROUND_THRESHOLD),
                Color::BLACK
            );
        }
    }
}
