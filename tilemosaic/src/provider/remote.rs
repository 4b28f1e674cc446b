//! Remote slippy-map tile server provider.
//!
//! Fetches tiles over HTTP from a caller-supplied URL template with the
//! literal substrings `$Z`, `$Y` and `$X` replaced by decimal zoom, row
//! and column. Any transport, status or decode failure is recovered into
//! a 1×1 placeholder image: the caller never sees a fetch failure, only a
//! degenerate tile that the next successful pass replaces.

use std::sync::Arc;

use image::RgbaImage;
use tracing::warn;

use super::http::HttpClient;
use super::types::{placeholder_image, BoxFuture, ProviderError, TileProvider};
use crate::coord::Tile;

/// Tile provider backed by a remote HTTP tile server.
///
/// # Example
///
/// ```no_run
/// use tilemosaic::provider::{RemoteTileProvider, ReqwestClient};
///
/// let client = ReqwestClient::new().unwrap();
/// let provider = RemoteTileProvider::new(
///     client,
///     "https://tile.example.org/$Z/$X/$Y.png".to_string(),
/// );
/// ```
pub struct RemoteTileProvider<C: HttpClient> {
    http_client: C,
    url_template: String,
}

impl<C: HttpClient> RemoteTileProvider<C> {
    pub fn new(http_client: C, url_template: String) -> Self {
        Self {
            http_client,
            url_template,
        }
    }

    /// Substitute `$Z`/`$Y`/`$X` in the template for the given tile.
    fn build_url(&self, tile: Tile) -> String {
        self.url_template
            .replace("$Z", &tile.z.to_string())
            .replace("$Y", &tile.y.to_string())
            .replace("$X", &tile.x.to_string())
    }

    async fn fetch(&self, url: &str) -> Result<RgbaImage, ProviderError> {
        let body = self.http_client.get(url).await?;
        let decoded = image::load_from_memory(&body)
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(decoded.to_rgba8())
    }
}

impl<C: HttpClient> TileProvider for RemoteTileProvider<C> {
    fn render_tile(&self, tile: Tile) -> BoxFuture<'_, Arc<RgbaImage>> {
        Box::pin(async move {
            let url = self.build_url(tile);
            match self.fetch(&url).await {
                Ok(img) => Arc::new(img),
                Err(err) => {
                    warn!(%tile, %err, "tile fetch failed, substituting placeholder");
                    placeholder_image()
                }
            }
        })
    }
}
