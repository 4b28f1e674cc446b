//! Tile-backed render adapter
//!
//! Turns a geographic viewport plus target pixel size into a composited
//! raster, pulling tiles through whichever [`TileSource`] capability the
//! application configured and signaling repaints through a [`PaintSink`].

mod model;
mod options;
mod viewport;

pub use model::{PaintSink, TileRenderModel, TileSource, RENDER_REQUEST_CAPACITY};
pub use options::RenderOptions;
pub use viewport::Viewport;
