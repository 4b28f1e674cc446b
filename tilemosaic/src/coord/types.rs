//! Coordinate type definitions

use std::fmt;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Default zoom range for slippy-map tile servers
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 18;

/// Default tile edge length in pixels
pub const TILE_SIZE: u32 = 256;

/// Tile coordinates in the Web Mercator / slippy-map pyramid.
///
/// Field declaration order matters: the derived `Ord` is lexicographic by
/// `(z, y, x)`, with the zoom level as the primary sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tile {
    /// Zoom level (0 at the single world tile)
    pub z: u8,
    /// Y coordinate (north-south), 0 at north
    pub y: u32,
    /// X coordinate (east-west), 0 at west
    pub x: u32,
}

impl Tile {
    /// Create a tile at column `x`, row `y`, zoom `z`.
    #[inline]
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { z, y, x }
    }

    /// Largest valid tile index along either axis at zoom `z`.
    #[inline]
    pub fn max_index(z: u8) -> u32 {
        if z >= 32 {
            u32::MAX
        } else {
            (1u32 << z) - 1
        }
    }

    /// The tile one zoom level up that contains this tile.
    ///
    /// At zoom 0 a tile is its own parent.
    pub fn parent(self) -> Tile {
        if self.z == 0 {
            self
        } else {
            Tile {
                z: self.z - 1,
                y: self.y / 2,
                x: self.x / 2,
            }
        }
    }

    /// One of the four tiles covering this tile at the next zoom level.
    pub fn child(self, left: bool, top: bool) -> Tile {
        Tile {
            z: self.z + 1,
            y: self.y * 2 + if top { 0 } else { 1 },
            x: self.x * 2 + if left { 0 } else { 1 },
        }
    }

    /// Whether this tile lies within the closed rectangle spanned by `a`
    /// (top-left) and `b` (bottom-right).
    ///
    /// All three tiles must share a zoom level; callers should have
    /// normalized the corners via [`Tile::swap_if_needed`] first.
    pub fn is_inside(self, a: Tile, b: Tile) -> bool {
        if self.z != a.z || self.z != b.z {
            return false;
        }
        self.x >= a.x && self.x <= b.x && self.y >= a.y && self.y <= b.y
    }

    /// Normalize an arbitrary pair of range corners into
    /// (top-left, bottom-right) order.
    ///
    /// Swaps along Y first, then X, so downstream range arithmetic never
    /// sees an inverted rectangle.
    pub fn swap_if_needed(mut a: Tile, mut b: Tile) -> (Tile, Tile) {
        if b.y < a.y {
            std::mem::swap(&mut a, &mut b);
        }
        if b.x < a.x {
            std::mem::swap(&mut a.x, &mut b.x);
        }
        (a, b)
    }

    /// Nudge this tile one step toward larger X and Y, clamped at the
    /// maximum index for its zoom level.
    ///
    /// A geographic bounding box's bottom-right corner generally falls
    /// inside, rather than on the edge of, its containing tile; shifting the
    /// bottom-right range corner by one guarantees the tile rectangle fully
    /// covers the requested geography.
    pub fn shift_to_bottom_right(mut self) -> Tile {
        let max = Tile::max_index(self.z);
        if self.x < max {
            self.x += 1;
        }
        if self.y < max {
            self.y += 1;
        }
        self
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.y, self.x)
    }
}

/// A geographic point in degrees.
///
/// Not range-validated by the core; callers must supply valid values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}
