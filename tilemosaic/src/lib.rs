//! Tilemosaic - slippy-map tile caching and compositing engine
//!
//! This library fetches map tiles from pluggable providers, caches them
//! under an LRU bound, and composites them into viewport-sized rasters:
//!
//! - [`coord`]: tile coordinates and the Web-Mercator [`coord::TileMapper`]
//! - [`provider`]: tile sources (synthetic, HTTP, compositing)
//! - [`cache`]: bounded LRU caches (batch, streaming, fallback)
//! - [`render`]: the tile-backed [`render::TileRenderModel`]

pub mod cache;
pub mod config;
pub mod coord;
pub mod logging;
pub mod provider;
pub mod render;

pub use cache::{FallbackTileCache, StreamingTileCache, TileCache};
pub use config::EngineConfig;
pub use coord::{LatLon, Tile, TileMapper, WebMercatorMapper};
pub use provider::{
    CompositingTileProvider, PatternTileProvider, RemoteTileProvider, TileImage, TileProvider,
};
pub use render::{PaintSink, RenderOptions, TileRenderModel, TileSource, Viewport};
