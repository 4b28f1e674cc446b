//! Tile provider abstraction
//!
//! Providers are polymorphic sources of tile images. The crate ships a
//! synthetic test provider, an HTTP tile-server provider, and a
//! compositing provider that overlays several providers' output for one
//! coordinate. Caches in [`crate::cache`] wrap any of them.

mod composite;
mod http;
mod pattern;
mod remote;
mod types;

pub use composite::CompositingTileProvider;
pub use http::{HttpClient, ReqwestClient};
pub use pattern::PatternTileProvider;
pub use remote::RemoteTileProvider;
pub use types::{
    placeholder_image, BatchTileProvider, BoxFuture, ProviderError, TileImage, TileProvider,
};

#[cfg(test)]
pub use http::tests::MockHttpClient;
