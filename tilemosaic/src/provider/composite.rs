//! Compositing tile provider.
//!
//! Overlays multiple providers' output for one tile coordinate into a
//! single image: provider 0 is the base layer, and each subsequent
//! provider's pixels are alpha-blended "over" the accumulated result.
//! Providers already deliver RGBA (the `TileProvider` contract), so no
//! per-layer pixel-format conversion is needed before blending.

use std::sync::Arc;

use image::imageops;
use image::RgbaImage;

use super::types::{placeholder_image, BoxFuture, TileProvider};
use crate::coord::Tile;

/// Tile provider that alpha-composites an ordered list of sub-providers.
pub struct CompositingTileProvider {
    providers: Vec<Arc<dyn TileProvider>>,
}

impl CompositingTileProvider {
    /// Layers are drawn in order: `providers[0]` is the base.
    pub fn new(providers: Vec<Arc<dyn TileProvider>>) -> Self {
        Self { providers }
    }
}

impl TileProvider for CompositingTileProvider {
    fn render_tile(&self, tile: Tile) -> BoxFuture<'_, Arc<RgbaImage>> {
        Box::pin(async move {
            let mut composite: Option<RgbaImage> = None;
            for provider in &self.providers {
                let layer = provider.render_tile(tile).await;
                match composite.as_mut() {
                    None => composite = Some((*layer).clone()),
                    Some(base) => imageops::overlay(base, &*layer, 0, 0),
                }
            }
            composite.map(Arc::new).unwrap_or_else(placeholder_image)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Provider producing a uniform color, optionally translucent.
    struct FlatColorProvider {
        width: u32,
        height: u32,
        color: Rgba<u8>,
    }

    impl TileProvider for FlatColorProvider {
        fn render_tile(&self, _tile: Tile) -> BoxFuture<'_, Arc<RgbaImage>> {
            let img = Arc::new(RgbaImage::from_pixel(self.width, self.height, self.color));
            Box::pin(async move { img })
        }
    }

    #[tokio::test]
    async fn test_empty_provider_list_yields_placeholder() {
        let provider = CompositingTileProvider::new(Vec::new());
        let img = provider.render_tile(Tile::new(0, 0, 0)).await;
        assert_eq!(img.dimensions(), (1, 1));
    }

    #[tokio::test]
    async fn test_single_layer_passes_through() {
        let provider = CompositingTileProvider::new(vec![Arc::new(FlatColorProvider {
            width: 8,
            height: 8,
            color: Rgba([200, 0, 0, 255]),
        })]);
        let img = provider.render_tile(Tile::new(0, 0, 0)).await;
        assert_eq!(*img.get_pixel(4, 4), Rgba([200, 0, 0, 255]));
    }

    #[tokio::test]
    async fn test_opaque_layer_replaces_base() {
        let provider = CompositingTileProvider::new(vec![
            Arc::new(FlatColorProvider {
                width: 8,
                height: 8,
                color: Rgba([200, 0, 0, 255]),
            }),
            Arc::new(FlatColorProvider {
                width: 8,
                height: 8,
                color: Rgba([0, 200, 0, 255]),
            }),
        ]);
        let img = provider.render_tile(Tile::new(0, 0, 0)).await;
        assert_eq!(*img.get_pixel(4, 4), Rgba([0, 200, 0, 255]));
    }

    #[tokio::test]
    async fn test_transparent_layer_keeps_base() {
        let provider = CompositingTileProvider::new(vec![
            Arc::new(FlatColorProvider {
                width: 8,
                height: 8,
                color: Rgba([200, 0, 0, 255]),
            }),
            Arc::new(FlatColorProvider {
                width: 8,
                height: 8,
                color: Rgba([0, 200, 0, 0]),
            }),
        ]);
        let img = provider.render_tile(Tile::new(0, 0, 0)).await;
        assert_eq!(*img.get_pixel(4, 4), Rgba([200, 0, 0, 255]));
    }

    #[tokio::test]
    async fn test_translucent_layer_blends_over_base() {
        let provider = CompositingTileProvider::new(vec![
            Arc::new(FlatColorProvider {
                width: 8,
                height: 8,
                color: Rgba([200, 0, 0, 255]),
            }),
            Arc::new(FlatColorProvider {
                width: 8,
                height: 8,
                color: Rgba([0, 200, 0, 128]),
            }),
        ]);
        let img = provider.render_tile(Tile::new(0, 0, 0)).await;
        let px = img.get_pixel(4, 4);
        // "Over" blending: both layers contribute. Integer alpha
        // arithmetic can land one below full opacity.
        assert!(px.0[0] > 0 && px.0[0] < 200, "red partially covered: {:?}", px);
        assert!(px.0[1] > 0 && px.0[1] < 200, "green partially applied: {:?}", px);
        assert!(px.0[3] >= 254, "result effectively opaque: {:?}", px);
    }
}
