//! Tile-backed render model.
//!
//! Translates a geographic [`Viewport`] into a composited raster by
//! querying a tile source for the covering tile range and blitting each
//! tile at the correct sub-pixel offset. Rendering runs on a dedicated
//! worker task fed by a bounded request channel; requests that arrive
//! while a pass is in flight coalesce into at most one extra pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::{imageops, RgbaImage};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{RenderOptions, Viewport};
use crate::cache::{FallbackTileCache, StreamingTileCache, TileCache};
use crate::coord::{Tile, TileMapper};
use crate::provider::{TileImage, TileProvider};

/// Bound on queued render requests.
pub const RENDER_REQUEST_CAPACITY: usize = 10;

/// Repaint callback into the presentation layer.
///
/// Invoked from the render worker after each published composite; must be
/// cheap and non-blocking. Closures implement it directly.
pub trait PaintSink: Send + Sync {
    fn request_paint(&self);
}

impl<F> PaintSink for F
where
    F: Fn() + Send + Sync,
{
    fn request_paint(&self) {
        self()
    }
}

/// Tile source capability, chosen once at construction.
///
/// Pick the most capable variant the application has: `Fallback` never
/// blocks a pass on a slow provider, `Batch` and `Streaming` cache,
/// `Basic` renders tile by tile with no cache at all.
pub enum TileSource {
    Fallback(Arc<FallbackTileCache>),
    Streaming(StreamingTileCache),
    Batch(TileCache),
    Basic(Arc<dyn TileProvider>),
}

struct ModelShared {
    viewport: Mutex<Viewport>,
    /// Most recently completed composite. Starts as a 0x0 raster.
    image: Mutex<Arc<RgbaImage>>,
    rendering: AtomicBool,
    needs_render: AtomicBool,
    paint: Arc<dyn PaintSink>,
}

/// Render adapter turning viewport changes into composited tile rasters.
///
/// `render` and `request_render` are always one frame behind: they return
/// or schedule against the previously completed composite while the worker
/// produces the next one.
pub struct TileRenderModel {
    shared: Arc<ModelShared>,
    tx: mpsc::Sender<()>,
    cancel: CancellationToken,
    worker: Option<RenderWorker>,
}

impl TileRenderModel {
    pub fn new(
        mapper: Arc<dyn TileMapper>,
        source: TileSource,
        viewport: Viewport,
        options: RenderOptions,
        paint: Arc<dyn PaintSink>,
    ) -> Self {
        let shared = Arc::new(ModelShared {
            viewport: Mutex::new(viewport),
            image: Mutex::new(Arc::new(RgbaImage::new(0, 0))),
            rendering: AtomicBool::new(false),
            needs_render: AtomicBool::new(false),
            paint,
        });
        let (tx, rx) = mpsc::channel(RENDER_REQUEST_CAPACITY);
        let cancel = CancellationToken::new();
        let worker = RenderWorker {
            shared: Arc::clone(&shared),
            source,
            mapper,
            options,
            rx,
            cancel: cancel.clone(),
        };
        Self {
            shared,
            tx,
            cancel,
            worker: Some(worker),
        }
    }

    /// Spawn the render worker. Idempotent; must be called from within a
    /// tokio runtime.
    pub fn start(&mut self) {
        if let Some(worker) = self.worker.take() {
            tokio::spawn(worker.run());
        }
    }

    /// Pull accessor for the presentation layer: returns the previous
    /// composite immediately and requests a new pass as a side effect.
    /// While a pass is in flight (or the request queue is full) the
    /// request is coalesced into one follow-up pass instead of queued.
    pub fn render(&self) -> Arc<RgbaImage> {
        if self.shared.rendering.load(Ordering::Acquire) || self.tx.try_send(()).is_err() {
            self.shared.needs_render.store(true, Ordering::Release);
        } else {
            self.shared.needs_render.store(false, Ordering::Release);
        }
        self.shared.image.lock().clone()
    }

    /// Request a render pass, awaiting queue space when the bounded
    /// request channel is full.
    pub async fn request_render(&self) {
        if self.tx.send(()).await.is_err() {
            warn!("render worker gone; render request dropped");
        }
    }

    /// Most recently completed composite, without requesting a new pass.
    pub fn image(&self) -> Arc<RgbaImage> {
        self.shared.image.lock().clone()
    }

    pub fn viewport(&self) -> Viewport {
        *self.shared.viewport.lock()
    }

    /// Update the viewport for subsequent passes. Does not itself request
    /// a render.
    pub fn set_viewport(&self, viewport: Viewport) {
        *self.shared.viewport.lock() = viewport;
    }

    pub fn is_rendering(&self) -> bool {
        self.shared.rendering.load(Ordering::Acquire)
    }

    /// Stop the render worker. Queued requests are discarded.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for TileRenderModel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct RenderWorker {
    shared: Arc<ModelShared>,
    source: TileSource,
    mapper: Arc<dyn TileMapper>,
    options: RenderOptions,
    rx: mpsc::Receiver<()>,
    cancel: CancellationToken,
}

impl RenderWorker {
    async fn run(mut self) {
        info!("render worker started");
        loop {
            let request = tokio::select! {
                _ = self.cancel.cancelled() => None,
                request = self.rx.recv() => request,
            };
            if request.is_none() {
                break;
            }

            // Idle -> Rendering -> (NeedsRender? Rendering : Idle), plus
            // at most one follow-up pass after a degraded fallback pass.
            let mut followed_up = false;
            loop {
                self.shared.rendering.store(true, Ordering::Release);
                let degraded = self.render_pass().await;
                self.shared.rendering.store(false, Ordering::Release);

                if self.shared.needs_render.swap(false, Ordering::AcqRel) {
                    continue;
                }
                if degraded && !followed_up {
                    if let TileSource::Fallback(cache) = &self.source {
                        let refined = tokio::select! {
                            _ = self.cancel.cancelled() => false,
                            _ = cache.refined() => true,
                        };
                        if refined {
                            debug!("degraded pass; running one follow-up");
                            followed_up = true;
                            continue;
                        }
                    }
                }
                break;
            }
        }
        info!("render worker stopped");
    }

    /// One full render pass. Returns whether the tile source degraded any
    /// tile to its fallback provider.
    async fn render_pass(&mut self) -> bool {
        let view = *self.shared.viewport.lock();
        if view.width == 0 || view.height == 0 {
            return false;
        }
        let mut raster = self.fresh_raster(&view);

        let a = view.top_left();
        let b = view.bottom_right();
        let (c, d) = self.mapper.tiles_from_bounds(a, b, view.width, view.height);
        let (snapped_origin, _) = self.mapper.bounds_from_tiles(c, d);
        let (corner_nw, corner_se) = self.mapper.bounds_from_tiles(c, c);
        let mut grid = BlitGrid::new(
            c,
            a,
            snapped_origin,
            corner_nw,
            corner_se,
            self.mapper.tile_size(),
        );
        debug!(%c, %d, width = view.width, height = view.height, "render pass");

        let shared = Arc::clone(&self.shared);
        let cancel = self.cancel.clone();
        let options = self.options;
        let mut degraded = false;
        match &mut self.source {
            TileSource::Fallback(cache) => {
                let tiles = cache.render_tile_range(c, d).await;
                for entry in &tiles {
                    grid.blit(&mut raster, entry);
                }
                degraded = cache.used_fallback();
            }
            TileSource::Batch(cache) => {
                let tiles = cache.render_tile_range(c, d).await;
                for entry in &tiles {
                    grid.blit(&mut raster, entry);
                }
            }
            TileSource::Streaming(cache) => {
                let progressive = options.contains(RenderOptions::PROGRESSIVE_PAINT);
                let mut stream = cache.stream_tile_range(c, d);
                loop {
                    let entry = tokio::select! {
                        _ = cancel.cancelled() => None,
                        entry = stream.recv() => entry,
                    };
                    let Some(entry) = entry else { break };
                    grid.blit(&mut raster, &entry);
                    if progressive {
                        publish(&shared, raster.clone());
                    }
                }
            }
            TileSource::Basic(provider) => {
                'rows: for y in c.y..=d.y {
                    for x in c.x..=d.x {
                        if cancel.is_cancelled() {
                            break 'rows;
                        }
                        let tile = Tile::new(x, y, c.z);
                        let image = provider.render_tile(tile).await;
                        grid.blit(&mut raster, &TileImage::new(tile, image));
                    }
                }
            }
        }

        publish(&shared, raster);
        degraded
    }

    /// Output raster for one pass. An unchanged size starts from the
    /// previous composite so late tiles overwrite stale pixels rather
    /// than black, unless `CLEAR_BEFORE_PASS` is set.
    fn fresh_raster(&self, view: &Viewport) -> RgbaImage {
        if !self.options.contains(RenderOptions::CLEAR_BEFORE_PASS) {
            let previous = self.shared.image.lock().clone();
            if previous.dimensions() == (view.width, view.height) {
                return (*previous).clone();
            }
        }
        RgbaImage::new(view.width, view.height)
    }
}

fn publish(shared: &ModelShared, raster: RgbaImage) {
    *shared.image.lock() = Arc::new(raster);
    shared.paint.request_paint();
}

/// Placement of the snapped tile grid within the output raster.
///
/// The requested viewport origin generally falls inside the corner tile,
/// not on its edge, so the grid is shifted by a negative pixel offset:
/// `offset = floor((snapped_origin - requested_origin) * tile_px / tile_span)`.
struct BlitGrid {
    origin: Tile,
    /// Snapped minus requested origin, in degrees.
    delta_lon: f64,
    delta_lat: f64,
    /// Corner tile geographic span: longitude positive, latitude negative
    /// (latitude decreases southward across a tile).
    span_lon: f64,
    span_lat: f64,
    tile_w: u32,
    tile_h: u32,
    adopted: bool,
}

impl BlitGrid {
    fn new(
        origin: Tile,
        requested: crate::coord::LatLon,
        snapped: crate::coord::LatLon,
        corner_nw: crate::coord::LatLon,
        corner_se: crate::coord::LatLon,
        default_tile_size: u32,
    ) -> Self {
        Self {
            origin,
            delta_lon: snapped.lon - requested.lon,
            delta_lat: snapped.lat - requested.lat,
            span_lon: corner_se.lon - corner_nw.lon,
            span_lat: corner_se.lat - corner_nw.lat,
            tile_w: default_tile_size,
            tile_h: default_tile_size,
            adopted: false,
        }
    }

    fn offsets(&self) -> (i64, i64) {
        let ox = if self.span_lon != 0.0 {
            (self.delta_lon * self.tile_w as f64 / self.span_lon).floor() as i64
        } else {
            0
        };
        let oy = if self.span_lat != 0.0 {
            (self.delta_lat * self.tile_h as f64 / self.span_lat).floor() as i64
        } else {
            0
        };
        (ox, oy)
    }

    /// Blit one tile into the raster at its grid position. The first
    /// non-placeholder tile fixes the grid's pixel pitch; until then the
    /// mapper's nominal tile size is used. `imageops::replace` clips at
    /// the raster edges.
    fn blit(&mut self, raster: &mut RgbaImage, entry: &TileImage) {
        let (w, h) = entry.image.dimensions();
        if !self.adopted && w > 1 && h > 1 {
            self.tile_w = w;
            self.tile_h = h;
            self.adopted = true;
        }
        let (ox, oy) = self.offsets();
        let col = (entry.tile.x - self.origin.x) as i64;
        let row = (entry.tile.y - self.origin.y) as i64;
        imageops::replace(
            raster,
            entry.image.as_ref(),
            ox + col * self.tile_w as i64,
            oy + row * self.tile_h as i64,
        );
    }
}
