use image::RgbImage;

use super::{Color, ColorError};
use crate::layout::Location;

// [x0, x1) x [y0, y1), never empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Region {
    pub(super) x0: u32,
    pub(super) y0: u32,
    pub(super) x1: u32,
    pub(super) y1: u32,
}

impl Region {
    pub(super) fn clip(image: &RgbImage, rect: &Location) -> Result<Region, ColorError> {
        let (width, height) = image.dimensions();
        let x0 = rect.left.max(0);
        let y0 = rect.top.max(0);
        let x1 = rect.left.saturating_add(rect.width).min(width as i64);
        let y1 = rect.top.saturating_add(rect.height).min(height as i64);
        if x1 <= x0 || y1 <= y0 {
            return Err(ColorError::DegenerateRegion);
        }
        Ok(Region {
            x0: x0 as u32,
            y0: y0 as u32,
            x1: x1 as u32,
            y1: y1 as u32,
        })
    }

    pub(super) fn pixels<'a>(&self, image: &'a RgbImage) -> impl Iterator<Item = Color> + 'a {
        let Region { x0, y0, x1, y1 } = *self;
        (y0..y1).flat_map(move |y| (x0..x1).map(move |x| Color::from(*image.get_pixel(x, y))))
    }
}

pub(super) fn pixel_at(image: &RgbImage, x: i64, y: i64) -> Option<Color> {
    let (width, height) = image.dimensions();
    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
        return None;
    }
    Some(Color::from(*image.get_pixel(x as u32, y as u32)))
}
