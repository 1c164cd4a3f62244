use serde::Serialize;

use super::Location;

/// Inclusive-exclusive pixel envelope: `[left, right) x [top, bottom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BBox {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl BBox {
    pub fn envelope<'a, I>(locations: I) -> Option<BBox>
    where
        I: IntoIterator<Item = &'a Location>,
    {
        locations
            .into_iter()
            .map(BBox::from)
            .reduce(|acc, next| acc.union(&next))
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    pub fn width(&self) -> i64 {
        self.right - self.left
    }

    pub fn height(&self) -> i64 {
        self.bottom - self.top
    }

    pub fn to_location(&self) -> Location {
        Location::new(self.left, self.top, self.width(), self.height())
    }
}

impl From<&Location> for BBox {
    fn from(location: &Location) -> Self {
        BBox {
            left: location.left,
            top: location.top,
            right: location.right(),
            bottom: location.bottom(),
        }
    }
}
