//! Bounded LRU tile cache with fetch-or-render semantics.

use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, warn};

use super::state::CacheState;
use crate::coord::Tile;
use crate::provider::{TileImage, TileProvider};

/// Default cache capacity in tiles.
///
/// A 1600×1200 viewport in 256×256 tiles is roughly 30 tiles; holding less
/// than one viewport's worth makes the cache pointless because a single
/// pass flushes it. Four viewports of headroom absorbs small pans.
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// Bounded, order-preserving cache of rendered tiles keyed by coordinate.
///
/// Entries are kept in least-recently-used order and evicted from the LRU
/// head when the configured capacity would be exceeded.
///
/// The methods take `&mut self`: this cache assumes a single writer (the
/// owning render task), and the borrow checker enforces what the original
/// design only documented. Wrap it in the concurrency-safe
/// [`super::FallbackTileCache`] when multiple tasks need shared access.
pub struct TileCache {
    state: CacheState,
    provider: Arc<dyn TileProvider>,
}

impl TileCache {
    pub fn new(provider: Arc<dyn TileProvider>, max_items: usize) -> Self {
        Self {
            state: CacheState::new(max_items),
            provider,
        }
    }

    /// Number of cached tiles.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.len() == 0
    }

    /// Configured capacity bound.
    pub fn max_items(&self) -> usize {
        self.state.max_items()
    }

    /// Snapshot of the cached tile keys in LRU-to-MRU order.
    pub fn cached_tiles(&self) -> Vec<Tile> {
        self.state.tiles()
    }

    /// Return the tile's image from cache, rendering and caching it on a
    /// miss. A hit becomes the most-recently-used entry.
    pub async fn render_tile(&mut self, tile: Tile) -> Arc<RgbaImage> {
        if let Some(image) = self.state.touch(tile) {
            debug!(%tile, "cache hit");
            return image;
        }
        debug!(%tile, "cache miss, rendering");
        let image = self.provider.render_tile(tile).await;
        self.state
            .insert(TileImage::new(tile, Arc::clone(&image)));
        image
    }

    /// Render every tile in the rectangle spanned by `a` and `b`.
    ///
    /// Returns exactly `(|b.x-a.x|+1) * (|b.y-a.y|+1)` entries in row-major
    /// order; use each entry's tile coordinate for placement. Cached tiles
    /// are reused, missing ones are rendered, and afterwards the whole
    /// range sits at the most-recently-used end of the cache.
    ///
    /// `a` and `b` must share a zoom level; a cross-zoom request is a
    /// caller bug and yields an empty result.
    pub async fn render_tile_range(&mut self, a: Tile, b: Tile) -> Vec<TileImage> {
        if a.z != b.z {
            warn!(%a, %b, "cross-zoom tile range rejected");
            return Vec::new();
        }
        let (a, b) = Tile::swap_if_needed(a, b);
        let mut part = self.state.take_range(a, b);

        for index in 0..part.slots.len() {
            if part.slots[index].is_none() {
                let tile = part.tile_at(index);
                let image = self.provider.render_tile(tile).await;
                let entry = TileImage::new(tile, image);
                part.slots[index] = Some(entry.clone());
                part.touched.push(entry);
            }
        }

        self.state.rebuild(part.kept, part.touched);
        part.slots
            .into_iter()
            .map(|slot| slot.expect("range slot left unpopulated after fill"))
            .collect()
    }
}
