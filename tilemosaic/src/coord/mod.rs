//! Tile coordinate model
//!
//! Identifies slippy-map tiles by an integer (x, y) pair at a zoom level,
//! and converts between geographic coordinates and tiles for a given
//! projection. The default projection is the standard Web-Mercator tiling
//! scheme used by slippy-map tile servers.

mod mapper;
mod types;

pub use mapper::{
    generic_bounds_from_tiles, generic_tiles_from_bounds, TileMapper, WebMercatorMapper,
};
pub use types::{
    LatLon, Tile, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM, TILE_SIZE,
};
