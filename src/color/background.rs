use image::RgbImage;
use tracing::debug;

use super::region::{pixel_at, Region};
use super::stats::{mean_color, median_color};
use super::{Color, ColorError};
use crate::layout::Location;

const SAMPLE_MARGIN: i64 = 2;

/// Median of eight points just inside the border; white on an empty clip.
pub fn background_color(image: &RgbImage, rect: &Location) -> Color {
    match estimate_background(image, rect) {
        Ok(color) => color,
        Err(err) => {
            debug!(?rect, %err, "background estimation fell back to white");
            Color::WHITE
        }
    }
}

pub(super) fn estimate_background(image: &RgbImage, rect: &Location) -> Result<Color, ColorError> {
    let region = Region::clip(image, rect)?;
    let samples = sample_points(rect)
        .into_iter()
        .filter_map(|(x, y)| pixel_at(image, x, y))
        .collect::<Vec<_>>();
    if samples.is_empty() {
        debug!(?rect, "no perimeter samples inside image; using region mean");
        return mean_color(region.pixels(image));
    }
    median_color(&samples)
}

fn sample_points(rect: &Location) -> [(i64, i64); 8] {
    let Location {
        left,
        top,
        width,
        height,
    } = *rect;
    let near_x = left.saturating_add(SAMPLE_MARGIN);
    let mid_x = left.saturating_add(width / 2);
    let far_x = left.saturating_add(width).saturating_sub(SAMPLE_MARGIN);
    let near_y = top.saturating_add(SAMPLE_MARGIN);
    let mid_y = top.saturating_add(height / 2);
    let far_y = top.saturating_add(height).saturating_sub(SAMPLE_MARGIN);
    [
        (near_x, near_y),
        (mid_x, near_y),
        (far_x, near_y),
        (near_x, far_y),
        (mid_x, far_y),
        (far_x, far_y),
        (near_x, mid_y),
        (far_x, mid_y),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn filled(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(color))
    }

    #[test]
    fn uniform_image_returns_its_color() {
        let image = filled(64, 48, [10, 20, 30]);
        for rect in [
            Location::new(0, 0, 64, 48),
            Location::new(5, 7, 20, 11),
            Location::new(60, 40, 4, 8),
            Location::new(-3, -3, 10, 10),
        ] {
            assert_eq!(background_color(&image, &rect), Color::new(10, 20, 30));
        }
    }

    #[test]
    fn region_outside_image_is_white() {
        let image = filled(16, 16, [0, 0, 0]);
        assert_eq!(
            background_color(&image, &Location::new(100, 100, 10, 10)),
            Color::WHITE
        );
    }

    #[test]
    fn zero_area_is_white() {
        let image = filled(16, 16, [40, 50, 60]);
        assert_eq!(
            background_color(&image, &Location::new(4, 4, 0, 6)),
            Color::WHITE
        );
        assert_eq!(
            background_color(&image, &Location::new(4, 4, 6, 0)),
            Color::WHITE
        );
    }

    #[test]
    fn glyphs_in_the_middle_are_ignored() {
        let mut image = filled(40, 20, [250, 240, 230]);
        for y in 5..15 {
            for x in 8..32 {
                image.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        assert_eq!(
            background_color(&image, &Location::new(0, 0, 40, 20)),
            Color::new(250, 240, 230)
        );
    }

    #[test]
    fn a_stray_sample_does_not_skew_the_median() {
        let mut image = filled(40, 20, [100, 100, 100]);
        // lands on the top-left sample point
        image.put_pixel(2, 2, Rgb([255, 0, 0]));
        assert_eq!(
            background_color(&image, &Location::new(0, 0, 40, 20)),
            Color::new(100, 100, 100)
        );
    }

    #[test]
    fn falls_back_to_region_mean_without_samples() {
        let mut image = filled(5, 5, [0, 0, 0]);
        image.put_pixel(0, 4, Rgb([100, 50, 5]));
        // clips to column 0; every sample x is negative
        let rect = Location::new(-10, 0, 11, 5);
        assert_eq!(background_color(&image, &rect), Color::new(20, 10, 1));
    }

    #[test]
    fn extreme_extents_saturate_instead_of_overflowing() {
        let image = filled(10, 10, [40, 80, 120]);
        let wide = Location::new(1, 1, i64::MAX, 5);
        assert_eq!(background_color(&image, &wide), Color::new(40, 80, 120));
        assert_eq!(
            crate::color::foreground_color(&image, &wide, None, 30.0),
            Color::WHITE
        );

        let far = Location::new(i64::MAX, i64::MAX, i64::MAX, i64::MAX);
        assert_eq!(background_color(&image, &far), Color::WHITE);
    }
}
