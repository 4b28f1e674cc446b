//! Synthetic test-pattern tile provider.
//!
//! Produces deterministic, coordinate-keyed tiles without any network
//! dependency, for verifying coordinate arithmetic and compositing
//! placement. Each tile gets a one-pixel black border and a fill color
//! derived from its (x, y, z), so misplaced or duplicated tiles are
//! visible at a glance and distinguishable in pixel assertions.

use std::sync::Arc;

use image::{Rgba, RgbaImage};

use super::types::{BoxFuture, TileProvider};
use crate::coord::Tile;

/// Tile provider that synthesizes labeled rectangles of fixed dimensions.
#[derive(Debug, Clone, Copy)]
pub struct PatternTileProvider {
    pub width: u32,
    pub height: u32,
}

impl PatternTileProvider {
    /// Zero dimensions are clamped to 1 so the border drawing always has
    /// pixels to write.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// The fill color a given tile renders with.
    ///
    /// Exposed so tests can assert which tile a composited pixel came from.
    pub fn fill_color(tile: Tile) -> Rgba<u8> {
        Rgba([
            (tile.x.wrapping_mul(73) % 200) as u8 + 28,
            (tile.y.wrapping_mul(151) % 200) as u8 + 28,
            (tile.z as u32 * 13 % 200) as u8 + 28,
            255,
        ])
    }

    fn draw(&self, tile: Tile) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(self.width, self.height, Self::fill_color(tile));
        let border = Rgba([0, 0, 0, 255]);
        for x in 0..self.width {
            img.put_pixel(x, 0, border);
            img.put_pixel(x, self.height - 1, border);
        }
        for y in 0..self.height {
            img.put_pixel(0, y, border);
            img.put_pixel(self.width - 1, y, border);
        }
        img
    }
}

impl TileProvider for PatternTileProvider {
    fn render_tile(&self, tile: Tile) -> BoxFuture<'_, Arc<RgbaImage>> {
        let img = Arc::new(self.draw(tile));
        Box::pin(async move { img })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_dimensions() {
        let provider = PatternTileProvider::new(64, 48);
        let img = provider.render_tile(Tile::new(1, 2, 3)).await;
        assert_eq!(img.dimensions(), (64, 48));
    }

    #[tokio::test]
    async fn test_zero_dimensions_clamped() {
        let provider = PatternTileProvider::new(0, 0);
        let img = provider.render_tile(Tile::new(0, 0, 1)).await;
        assert_eq!(img.dimensions(), (1, 1));
    }

    #[tokio::test]
    async fn test_deterministic_per_tile() {
        let provider = PatternTileProvider::new(32, 32);
        let t = Tile::new(4, 9, 7);
        let a = provider.render_tile(t).await;
        let b = provider.render_tile(t).await;
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[tokio::test]
    async fn test_distinct_tiles_distinct_fill() {
        let provider = PatternTileProvider::new(32, 32);
        let a = provider.render_tile(Tile::new(0, 0, 5)).await;
        let b = provider.render_tile(Tile::new(1, 0, 5)).await;
        assert_ne!(a.get_pixel(16, 16), b.get_pixel(16, 16));
    }

    #[tokio::test]
    async fn test_border_and_fill() {
        let provider = PatternTileProvider::new(16, 16);
        let t = Tile::new(3, 5, 8);
        let img = provider.render_tile(t).await;
        assert_eq!(*img.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(*img.get_pixel(15, 15), Rgba([0, 0, 0, 255]));
        assert_eq!(*img.get_pixel(8, 8), PatternTileProvider::fill_color(t));
    }
}
