//! Streaming tile cache: incremental range results.
//!
//! Runs the same partition-then-fill algorithm as
//! [`super::TileCache::render_tile_range`], but yields each tile through a
//! bounded channel as soon as it is available — cache hits first, in cache
//! traversal order, then misses in row-major scan order — so a consumer
//! can begin compositing before the full range is ready.
//!
//! One call produces one single-consumption [`TileStream`]. Abandoning the
//! stream does not stall the producer: dropping the receiver cancels it,
//! and [`TileStream::cancel`] stops it explicitly. Either way the cache is
//! rebuilt with whatever was filled before the stop, so recency stays
//! consistent.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::state::CacheState;
use crate::coord::Tile;
use crate::provider::{TileImage, TileProvider};

/// Buffered tiles between producer and consumer.
pub const STREAM_BUFFER: usize = 20;

/// Tile cache whose range queries yield results incrementally.
pub struct StreamingTileCache {
    state: Arc<Mutex<CacheState>>,
    provider: Arc<dyn TileProvider>,
}

/// Single-consumption sequence of tiles from one range query.
///
/// Dropping the stream cancels the producer task.
pub struct TileStream {
    rx: mpsc::Receiver<TileImage>,
    cancel: CancellationToken,
}

impl TileStream {
    /// Next tile, or `None` once the range is exhausted or cancelled.
    pub async fn recv(&mut self) -> Option<TileImage> {
        self.rx.recv().await
    }

    /// Stop the producer; buffered tiles may still be received.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    fn closed() -> Self {
        let (_, rx) = mpsc::channel(1);
        Self {
            rx,
            cancel: CancellationToken::new(),
        }
    }
}

impl Drop for TileStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl StreamingTileCache {
    /// Must be called from within a tokio runtime: each range query spawns
    /// a producer task.
    pub fn new(provider: Arc<dyn TileProvider>, max_items: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::new(max_items))),
            provider,
        }
    }

    /// Snapshot of the cached tile keys in LRU-to-MRU order.
    pub async fn cached_tiles(&self) -> Vec<Tile> {
        self.state.lock().await.tiles()
    }

    /// Stream every tile in the rectangle spanned by `a` and `b`.
    ///
    /// Cache hits are emitted first (cache traversal order), then misses
    /// as they render (row-major order). `a` and `b` must share a zoom
    /// level; a cross-zoom request yields an immediately-closed stream.
    ///
    /// `&mut self` serializes query initiation; the producer task holds the
    /// cache lock for the duration of its run.
    pub fn stream_tile_range(&mut self, a: Tile, b: Tile) -> TileStream {
        if a.z != b.z {
            warn!(%a, %b, "cross-zoom tile range rejected");
            return TileStream::closed();
        }
        let (a, b) = Tile::swap_if_needed(a, b);
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let cancel = CancellationToken::new();

        let state = Arc::clone(&self.state);
        let provider = Arc::clone(&self.provider);
        let token = cancel.clone();
        tokio::spawn(async move {
            let mut state = state.lock().await;
            let mut part = state.take_range(a, b);

            // Hits first, in cache traversal order.
            let mut open = true;
            for hit in part.touched.clone() {
                if token.is_cancelled() || tx.send(hit).await.is_err() {
                    open = false;
                    break;
                }
            }

            // Then fill misses in row-major order, emitting each as it
            // lands. On cancellation the loop stops early; the rebuild
            // below still records everything filled so far.
            if open {
                for index in 0..part.slots.len() {
                    if part.slots[index].is_some() {
                        continue;
                    }
                    if token.is_cancelled() {
                        debug!("tile stream cancelled mid-fill");
                        break;
                    }
                    let tile = part.tile_at(index);
                    let image = provider.render_tile(tile).await;
                    let entry = TileImage::new(tile, image);
                    part.slots[index] = Some(entry.clone());
                    part.touched.push(entry.clone());
                    if tx.send(entry).await.is_err() {
                        break;
                    }
                }
            }

            state.rebuild(part.kept, part.touched);
        });

        TileStream { rx, cancel }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::PatternTileProvider;
    use std::time::Duration;

    fn cache(max_items: usize) -> StreamingTileCache {
        StreamingTileCache::new(Arc::new(PatternTileProvider::new(8, 8)), max_items)
    }

    async fn drain(stream: &mut TileStream) -> Vec<Tile> {
        let mut tiles = Vec::new();
        while let Some(entry) = stream.recv().await {
            tiles.push(entry.tile);
        }
        tiles
    }

    #[tokio::test]
    async fn test_streams_full_range_row_major_when_cold() {
        let mut cache = cache(10);
        let mut stream = cache.stream_tile_range(Tile::new(0, 0, 5), Tile::new(1, 1, 5));
        let tiles = drain(&mut stream).await;
        assert_eq!(
            tiles,
            vec![
                Tile::new(0, 0, 5),
                Tile::new(1, 0, 5),
                Tile::new(0, 1, 5),
                Tile::new(1, 1, 5)
            ]
        );
    }

    #[tokio::test]
    async fn test_hits_emitted_before_misses() {
        let mut cache = cache(10);
        // Warm one tile in the middle of the range.
        let mut warm = cache.stream_tile_range(Tile::new(1, 1, 5), Tile::new(1, 1, 5));
        drain(&mut warm).await;

        let mut stream = cache.stream_tile_range(Tile::new(0, 0, 5), Tile::new(1, 1, 5));
        let tiles = drain(&mut stream).await;
        assert_eq!(tiles.len(), 4);
        assert_eq!(tiles[0], Tile::new(1, 1, 5), "cached tile arrives first");
        assert_eq!(
            &tiles[1..],
            &[Tile::new(0, 0, 5), Tile::new(1, 0, 5), Tile::new(0, 1, 5)],
            "misses follow in row-major order"
        );
    }

    #[tokio::test]
    async fn test_range_larger_than_buffer_completes() {
        let mut cache = cache(100);
        // 5x5 = 25 tiles, exceeding the 20-slot buffer; a draining
        // consumer must still receive every tile.
        let mut stream = cache.stream_tile_range(Tile::new(0, 0, 6), Tile::new(4, 4, 6));
        let tiles = drain(&mut stream).await;
        assert_eq!(tiles.len(), 25);
    }

    #[tokio::test]
    async fn test_cache_populated_after_stream() {
        let mut cache = cache(10);
        let mut stream = cache.stream_tile_range(Tile::new(0, 0, 5), Tile::new(1, 0, 5));
        drain(&mut stream).await;
        let cached = cache.cached_tiles().await;
        assert_eq!(cached, vec![Tile::new(0, 0, 5), Tile::new(1, 0, 5)]);
    }

    #[tokio::test]
    async fn test_abandoned_stream_does_not_wedge_cache() {
        let mut cache = cache(100);
        {
            let _stream = cache.stream_tile_range(Tile::new(0, 0, 7), Tile::new(9, 9, 7));
            // Dropped undrained: producer is cancelled via the token and
            // the closed channel.
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        // The cache lock is free and consistent for the next query.
        let mut stream = cache.stream_tile_range(Tile::new(0, 0, 5), Tile::new(0, 0, 5));
        let tiles = drain(&mut stream).await;
        assert_eq!(tiles, vec![Tile::new(0, 0, 5)]);
        assert!(cache.cached_tiles().await.len() <= 100);
    }

    #[tokio::test]
    async fn test_explicit_cancel_closes_stream() {
        let mut cache = cache(100);
        let mut stream = cache.stream_tile_range(Tile::new(0, 0, 8), Tile::new(9, 9, 8));
        stream.cancel();
        let tiles = drain(&mut stream).await;
        assert!(tiles.len() < 100, "cancelled before the full range");
    }

    #[tokio::test]
    async fn test_cross_zoom_range_rejected() {
        let mut cache = cache(10);
        let mut stream = cache.stream_tile_range(Tile::new(0, 0, 5), Tile::new(1, 1, 6));
        assert!(stream.recv().await.is_none());
    }
}
