//! Engine configuration.

use std::sync::Arc;

use crate::cache::{
    FallbackTileCache, StreamingTileCache, TileCache, DEFAULT_CACHE_CAPACITY,
    FALLBACK_QUEUE_CAPACITY,
};
use crate::coord::{WebMercatorMapper, MAX_ZOOM, TILE_SIZE};
use crate::provider::TileProvider;

/// Tunables for the tile engine, with sensible defaults.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Tile edge length in pixels.
    pub tile_size: u32,
    /// Deepest zoom level the mapper will select.
    pub max_zoom: u8,
    /// Cache capacity in tiles.
    pub cache_capacity: usize,
    /// Bound on the fallback cache's background fill queue.
    pub fallback_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            max_zoom: MAX_ZOOM,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            fallback_queue_capacity: FALLBACK_QUEUE_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn mapper(&self) -> WebMercatorMapper {
        WebMercatorMapper::new(self.tile_size, self.max_zoom)
    }

    pub fn tile_cache(&self, provider: Arc<dyn TileProvider>) -> TileCache {
        TileCache::new(provider, self.cache_capacity)
    }

    pub fn streaming_cache(&self, provider: Arc<dyn TileProvider>) -> StreamingTileCache {
        StreamingTileCache::new(provider, self.cache_capacity)
    }

    /// Spawns the fallback cache's fill worker; must be called from within
    /// a tokio runtime.
    pub fn fallback_cache(
        &self,
        primary: Arc<dyn TileProvider>,
        fallback: Arc<dyn TileProvider>,
    ) -> FallbackTileCache {
        FallbackTileCache::with_queue_capacity(
            primary,
            fallback,
            self.cache_capacity,
            self.fallback_queue_capacity,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::PatternTileProvider;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.tile_size, 256);
        assert_eq!(config.max_zoom, 18);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.fallback_queue_capacity, FALLBACK_QUEUE_CAPACITY);
    }

    #[test]
    fn test_mapper_from_config() {
        let config = EngineConfig {
            tile_size: 512,
            max_zoom: 14,
            ..EngineConfig::default()
        };
        let mapper = config.mapper();
        assert_eq!(mapper.tile_size, 512);
        assert_eq!(mapper.max_zoom, 14);
    }

    #[tokio::test]
    async fn test_cache_factories_apply_capacity() {
        let config = EngineConfig {
            cache_capacity: 7,
            ..EngineConfig::default()
        };
        let provider = Arc::new(PatternTileProvider::new(8, 8));
        let cache = config.tile_cache(provider);
        assert_eq!(cache.max_items(), 7);
    }
}
