//! Fallback tile cache: instant degraded tiles, background refinement.
//!
//! Wraps a high-quality (possibly slow) primary provider and a fast
//! approximate fallback provider. Range queries never block on the
//! primary: slots the primary-populated cache cannot fill are rendered
//! immediately by the fallback provider (never cached) and their
//! coordinates are enqueued for a background worker to fill from the
//! primary. Callers observe degradation via [`FallbackTileCache::used_fallback`]
//! and can await [`FallbackTileCache::refined`] to schedule a follow-up
//! pass once the worker has made progress.
//!
//! This is the only cache variant safe for concurrent access: the cache
//! sequence is guarded by a mutex on the primary path, while the fallback
//! rendering path touches no shared state and never contends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::CacheState;
use crate::coord::Tile;
use crate::provider::{BatchTileProvider, BoxFuture, TileImage, TileProvider};

/// Bound on queued background fill requests. A miss storm beyond this
/// suspends the enqueueing caller until the worker catches up.
pub const FALLBACK_QUEUE_CAPACITY: usize = 1000;

struct FallbackShared {
    /// Primary-populated entries only; fallback results are never stored.
    /// Lock is never held across an await.
    state: Mutex<CacheState>,
    primary: Arc<dyn TileProvider>,
    used_fallback: AtomicBool,
    /// One permit per queued tile the fill worker has processed. Permits
    /// accumulate, so fills that complete between waits are all
    /// observable, not collapsed into a single wake.
    refined: Semaphore,
}

impl FallbackShared {
    /// Fetch-or-render against the primary provider, re-checking the cache
    /// after the render so a tile filled concurrently (or enqueued twice)
    /// hits the primary at most once per absence.
    async fn render_primary(&self, tile: Tile) -> Arc<RgbaImage> {
        if let Some(image) = self.state.lock().touch(tile) {
            return image;
        }
        let image = self.primary.render_tile(tile).await;
        let mut state = self.state.lock();
        if let Some(existing) = state.touch(tile) {
            return existing;
        }
        state.insert(TileImage::new(tile, Arc::clone(&image)));
        image
    }
}

/// Concurrency-safe tile cache that degrades to a fast fallback provider
/// instead of blocking on the primary.
pub struct FallbackTileCache {
    shared: Arc<FallbackShared>,
    fallback: Arc<dyn TileProvider>,
    queue: mpsc::Sender<Tile>,
    cancel: CancellationToken,
}

impl FallbackTileCache {
    /// Spawns the background fill worker; must be called from within a
    /// tokio runtime. The worker runs until [`FallbackTileCache::shutdown`]
    /// or drop.
    pub fn new(
        primary: Arc<dyn TileProvider>,
        fallback: Arc<dyn TileProvider>,
        max_items: usize,
    ) -> Self {
        Self::with_queue_capacity(primary, fallback, max_items, FALLBACK_QUEUE_CAPACITY)
    }

    pub fn with_queue_capacity(
        primary: Arc<dyn TileProvider>,
        fallback: Arc<dyn TileProvider>,
        max_items: usize,
        queue_capacity: usize,
    ) -> Self {
        let shared = Arc::new(FallbackShared {
            state: Mutex::new(CacheState::new(max_items)),
            primary,
            used_fallback: AtomicBool::new(false),
            refined: Semaphore::new(0),
        });
        let (queue, rx) = mpsc::channel(queue_capacity);
        let cancel = CancellationToken::new();
        tokio::spawn(fill_worker(Arc::clone(&shared), rx, cancel.clone()));
        Self {
            shared,
            fallback,
            queue,
            cancel,
        }
    }

    /// Whether the most recent [`FallbackTileCache::render_tile_range`]
    /// call degraded any tile to the fallback provider.
    pub fn used_fallback(&self) -> bool {
        self.shared.used_fallback.load(Ordering::Acquire)
    }

    /// Wait until the background worker processes the next queued tile.
    ///
    /// Counted, not edge-triggered: each processed tile is consumable by
    /// exactly one wait, and tiles processed before the wait began are
    /// not lost. Used to schedule a follow-up render pass after a
    /// degraded one.
    pub async fn refined(&self) {
        // The semaphore is never closed, so acquisition only fails if the
        // shared state is torn down mid-wait; treat that as a wake.
        if let Ok(permit) = self.shared.refined.acquire().await {
            permit.forget();
        }
    }

    /// Snapshot of the cached (primary-rendered) tile keys.
    pub fn cached_tiles(&self) -> Vec<Tile> {
        self.shared.state.lock().tiles()
    }

    /// Stop the background fill worker. Queued requests are discarded.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Fetch-or-render a single tile from the primary provider, caching
    /// the result. This is the path the background worker takes, so it
    /// blocks on the primary; interactive range queries should use
    /// [`FallbackTileCache::render_tile_range`] instead.
    pub async fn render_tile(&self, tile: Tile) -> Arc<RgbaImage> {
        self.shared.render_primary(tile).await
    }

    /// Render every tile in the rectangle spanned by `a` and `b`, without
    /// ever blocking on the primary provider.
    ///
    /// Cached primary tiles are returned as-is; every other slot is
    /// rendered by the fallback provider (never cached) and enqueued for
    /// background refinement. Results are row-major, exactly
    /// `(|b.x-a.x|+1) * (|b.y-a.y|+1)` entries.
    pub async fn render_tile_range(&self, a: Tile, b: Tile) -> Vec<TileImage> {
        self.shared.used_fallback.store(false, Ordering::Release);
        if a.z != b.z {
            warn!(%a, %b, "cross-zoom tile range rejected");
            return Vec::new();
        }
        let (a, b) = Tile::swap_if_needed(a, b);

        // Partition and immediately rebuild under the lock: hits move to
        // the MRU end now, and the lock is not held while rendering.
        let mut part = {
            let mut state = self.shared.state.lock();
            let mut part = state.take_range(a, b);
            let kept = std::mem::take(&mut part.kept);
            state.rebuild(kept, part.touched.clone());
            part
        };

        let mut degraded = false;
        for index in 0..part.slots.len() {
            if part.slots[index].is_some() {
                continue;
            }
            let tile = part.tile_at(index);
            // Lock-free degraded path: fallback render plus an enqueue for
            // the worker to fill the real tile later.
            let image = self.fallback.render_tile(tile).await;
            part.slots[index] = Some(TileImage::new(tile, image));
            degraded = true;
            if self.queue.send(tile).await.is_err() {
                warn!(%tile, "fill worker gone; degraded tile will not be refined");
            }
        }

        if degraded {
            debug!(%a, %b, "range degraded to fallback tiles");
            self.shared.used_fallback.store(true, Ordering::Release);
        }
        part.slots
            .into_iter()
            .map(|slot| slot.expect("range slot left unpopulated after fill"))
            .collect()
    }
}

impl Drop for FallbackTileCache {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl TileProvider for FallbackTileCache {
    fn render_tile(&self, tile: Tile) -> BoxFuture<'_, Arc<RgbaImage>> {
        Box::pin(FallbackTileCache::render_tile(self, tile))
    }
}

impl BatchTileProvider for FallbackTileCache {
    fn render_tile_range(&self, a: Tile, b: Tile) -> BoxFuture<'_, Vec<TileImage>> {
        Box::pin(FallbackTileCache::render_tile_range(self, a, b))
    }
}

/// Background worker draining the refinement queue.
///
/// Each dequeued coordinate goes through the single-tile primary path,
/// which re-checks the cache first, so duplicate enqueues cost one lookup.
async fn fill_worker(
    shared: Arc<FallbackShared>,
    mut rx: mpsc::Receiver<Tile>,
    cancel: CancellationToken,
) {
    info!("fallback fill worker started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = rx.recv() => {
                match next {
                    Some(tile) => {
                        shared.render_primary(tile).await;
                        shared.refined.add_permits(1);
                    }
                    None => break,
                }
            }
        }
    }
    info!("fallback fill worker stopped");
}
