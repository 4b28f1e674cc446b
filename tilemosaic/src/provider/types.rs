//! Provider types and traits

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use image::RgbaImage;
use thiserror::Error;

use crate::coord::Tile;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors that can occur while fetching a tile from a remote source.
///
/// These never cross the [`TileProvider`] boundary: providers recover them
/// into a placeholder image so compositing code never handles fetch errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),
    /// Non-2xx response status
    #[error("HTTP status {code} from {url}")]
    Status { code: u16, url: String },
    /// Response body was not a decodable image
    #[error("image decode failed: {0}")]
    Decode(String),
}

/// A rendered tile paired with its coordinate.
///
/// Batch operations return these in an order that is not otherwise
/// meaningful; use the tile coordinate to determine placement. Images are
/// shared via `Arc` so cache entries and returned results alias cheaply.
#[derive(Debug, Clone)]
pub struct TileImage {
    pub tile: Tile,
    pub image: Arc<RgbaImage>,
}

impl TileImage {
    pub fn new(tile: Tile, image: Arc<RgbaImage>) -> Self {
        Self { tile, image }
    }
}

/// Polymorphic source of tile images.
///
/// Rendering is infallible by contract: a provider that cannot produce a
/// real tile returns [`placeholder_image`] instead of an error, so the
/// worst downstream outcome is a degenerate 1×1 tile.
pub trait TileProvider: Send + Sync {
    fn render_tile(&self, tile: Tile) -> BoxFuture<'_, Arc<RgbaImage>>;
}

/// Batch-capable tile provider.
///
/// Sources that can produce a whole rectangle of tiles more efficiently
/// than one call per tile implement this in addition to [`TileProvider`].
/// `a` and `b` are opposite corners of the rectangle at the same zoom
/// level; results cover the full rectangle, one entry per tile.
pub trait BatchTileProvider: TileProvider {
    fn render_tile_range(&self, a: Tile, b: Tile) -> BoxFuture<'_, Vec<TileImage>>;
}

/// The degenerate 1×1 image substituted for failed fetches.
pub fn placeholder_image() -> Arc<RgbaImage> {
    Arc::new(RgbaImage::new(1, 1))
}
