//! Projection-aware mapping between geographic coordinates and tiles.
//!
//! [`TileMapper`] is the pure-function capability the cache and render
//! layers use to move between [`LatLon`] space and [`Tile`] space.
//! [`WebMercatorMapper`] implements the standard spherical-Mercator
//! slippy-map scheme; other projections can plug in by implementing the
//! trait and reusing [`generic_tiles_from_bounds`] /
//! [`generic_bounds_from_tiles`] for the range arithmetic.

use std::f64::consts::PI;

use super::types::{LatLon, Tile, MAX_ZOOM, MIN_LAT, TILE_SIZE};

/// Conversion between geographic coordinates and tiles for one projection.
///
/// Implementations must be pure: no I/O, no interior mutability observable
/// through these methods. They are shared across worker tasks.
pub trait TileMapper: Send + Sync {
    /// The tile containing `point` at the given zoom level.
    fn tile(&self, point: LatLon, zoom: u8) -> Tile;

    /// The geographic coordinates of the tile's northwest corner.
    fn lat_lon(&self, tile: Tile) -> LatLon;

    /// The minimal tile range whose rendered composite, clipped to the
    /// requested bounds, does not exceed `max_width` × `max_height` pixels.
    ///
    /// Returns (top-left tile, bottom-right tile), both at the same zoom.
    fn tiles_from_bounds(&self, a: LatLon, b: LatLon, max_width: u32, max_height: u32)
        -> (Tile, Tile);

    /// The geographic bounds enclosing the tile rectangle `[a, b]`.
    fn bounds_from_tiles(&self, a: Tile, b: Tile) -> (LatLon, LatLon);

    /// Edge length of this projection's tiles in pixels.
    fn tile_size(&self) -> u32;
}

/// Standard Web-Mercator slippy-map tiling scheme.
#[derive(Debug, Clone, Copy)]
pub struct WebMercatorMapper {
    /// Tile edge length in pixels.
    pub tile_size: u32,
    /// Deepest zoom level `tiles_from_bounds` will consider.
    pub max_zoom: u8,
}

impl Default for WebMercatorMapper {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            max_zoom: MAX_ZOOM,
        }
    }
}

impl WebMercatorMapper {
    pub fn new(tile_size: u32, max_zoom: u8) -> Self {
        Self {
            tile_size,
            max_zoom,
        }
    }
}

impl TileMapper for WebMercatorMapper {
    fn tile(&self, point: LatLon, zoom: u8) -> Tile {
        let shift = (zoom as f64).exp2();
        let lat_rad = point.lat * PI / 180.0;

        let fx = (point.lon + 180.0) / 360.0 * shift;
        let fy = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * shift;

        let max = Tile::max_index(zoom);
        // NaN or infinite results from out-of-range input clamp to the last
        // valid index rather than erroring; callers own input validation.
        let x = if fx.is_finite() && fx >= 0.0 && fx <= max as f64 {
            fx.floor() as u32
        } else {
            max
        };
        let y = if fy.is_finite() && fy >= 0.0 && fy <= max as f64 {
            fy.floor() as u32
        } else {
            max
        };
        Tile::new(x, y, zoom)
    }

    fn lat_lon(&self, tile: Tile) -> LatLon {
        let shift = (tile.z as f64).exp2();
        let n = PI - 2.0 * PI * tile.y as f64 / shift;
        let lat = 180.0 / PI * (0.5 * (n.exp() - (-n).exp())).atan();
        let lon = tile.x as f64 / shift * 360.0 - 180.0;
        LatLon::new(lat, lon)
    }

    fn tiles_from_bounds(
        &self,
        a: LatLon,
        b: LatLon,
        max_width: u32,
        max_height: u32,
    ) -> (Tile, Tile) {
        generic_tiles_from_bounds(self, a, b, max_width, max_height, self.tile_size, self.max_zoom)
    }

    fn bounds_from_tiles(&self, a: Tile, b: Tile) -> (LatLon, LatLon) {
        generic_bounds_from_tiles(self, a, b, LatLon::new(MIN_LAT, 180.0))
    }

    fn tile_size(&self) -> u32 {
        self.tile_size
    }
}

/// Mechanically determine a zoom level and tile range for a bounding box
/// and pixel budget, by iterating down from `max_zoom_level`.
///
/// At each candidate zoom the requested corners are snapped to tiles, the
/// snapped rectangle's pixel size is scaled by the ratio of requested to
/// actual geographic span, and if either estimated dimension still exceeds
/// the budget the zoom is decremented. A result that exactly meets the
/// budget stops the iteration, preferring the higher zoom.
///
/// The returned bottom-right tile has been pushed one step outward via
/// [`Tile::shift_to_bottom_right`] so the range fully covers the geography.
pub fn generic_tiles_from_bounds<M: TileMapper + ?Sized>(
    mapper: &M,
    a: LatLon,
    b: LatLon,
    max_width: u32,
    max_height: u32,
    tile_size: u32,
    max_zoom_level: u8,
) -> (Tile, Tile) {
    let req_w = (b.lon - a.lon).abs();
    let req_h = (b.lat - a.lat).abs();

    let mut zoom = max_zoom_level;
    loop {
        let c = mapper.tile(a, zoom);
        let d = mapper.tile(b, zoom);
        let (e, f) = mapper.bounds_from_tiles(c, d);
        let snapped_w = (f.lon - e.lon).abs();
        let snapped_h = (f.lat - e.lat).abs();
        // Pixel size of the snapped rectangle, then scaled down by how much
        // of it the requested bounds actually occupy.
        let px_w = (d.x as i64 - c.x as i64).abs() as f64 * tile_size as f64;
        let px_h = (d.y as i64 - c.y as i64).abs() as f64 * tile_size as f64;
        let clipped_w = (px_w * req_w / snapped_w).ceil() as u64;
        let clipped_h = (px_h * req_h / snapped_h).ceil() as u64;

        if zoom > 0 && (clipped_w > max_width as u64 || clipped_h > max_height as u64) {
            zoom -= 1;
        } else {
            return (c, d.shift_to_bottom_right());
        }
    }
}

/// The geographic bounds enclosing the tile rectangle `[a, b]`.
///
/// The top-left bound is tile `a`'s northwest corner. The bottom-right
/// bound is the northwest corner of the tile diagonally past `b`, except at
/// the pyramid edge where no such tile exists and the projection-specific
/// `right_bottom` extreme substitutes per axis.
pub fn generic_bounds_from_tiles<M: TileMapper + ?Sized>(
    mapper: &M,
    a: Tile,
    b: Tile,
    right_bottom: LatLon,
) -> (LatLon, LatLon) {
    let top_left = mapper.lat_lon(a);
    let max = Tile::max_index(b.z);
    let bottom_right = match (b.x == max, b.y == max) {
        (true, true) => right_bottom,
        (true, false) => {
            let mut p = mapper.lat_lon(Tile::new(b.x, b.y + 1, b.z));
            p.lon = right_bottom.lon;
            p
        }
        (false, true) => {
            let mut p = mapper.lat_lon(Tile::new(b.x + 1, b.y, b.z));
            p.lat = right_bottom.lat;
            p
        }
        (false, false) => mapper.lat_lon(Tile::new(b.x + 1, b.y + 1, b.z)),
    };
    (top_left, bottom_right)
}
