//! Shared LRU bookkeeping for the cache variants.
//!
//! The cache is an ordered sequence of [`TileImage`] entries, head =
//! least-recently-used, tail = most-recently-used, bounded at `max_items`.
//! Range queries are the dominant access pattern (a viewport pan or zoom
//! touches dozens of tiles at once), so instead of a list+map LRU this
//! pays O(cache size) per range call to partition the whole sequence and
//! rebuild it with the range's tiles at the MRU end.

use std::sync::Arc;

use image::RgbaImage;

use crate::coord::Tile;
use crate::provider::TileImage;

/// Ordered, bounded LRU sequence of rendered tiles.
///
/// Invariants after every public operation:
/// - `entries.len() <= max_items`
/// - no two entries share a tile key
pub(crate) struct CacheState {
    entries: Vec<TileImage>,
    max_items: usize,
}

/// Result of draining a cache against a tile rectangle.
///
/// `slots` is the row-major result grid: `None` marks a slot the cache
/// could not fill (the original implementation used an unpopulated
/// `TileImage` zero value for this). `touched` accumulates every entry
/// that belongs at the MRU end of the rebuilt cache: the hits, in cache
/// traversal order, plus whatever the caller renders for the misses.
pub(crate) struct RangePartition {
    pub origin: Tile,
    pub width: usize,
    pub height: usize,
    pub slots: Vec<Option<TileImage>>,
    pub kept: Vec<TileImage>,
    pub touched: Vec<TileImage>,
}

impl RangePartition {
    /// Tile coordinate for a row-major slot index.
    pub fn tile_at(&self, index: usize) -> Tile {
        Tile::new(
            self.origin.x + (index % self.width) as u32,
            self.origin.y + (index / self.width) as u32,
            self.origin.z,
        )
    }
}

impl CacheState {
    pub fn new(max_items: usize) -> Self {
        Self {
            entries: Vec::with_capacity(max_items.min(128)),
            max_items,
        }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Snapshot of the cached tile keys in LRU-to-MRU order.
    pub fn tiles(&self) -> Vec<Tile> {
        self.entries.iter().map(|e| e.tile).collect()
    }

    /// Look up a tile and mark it most-recently-used.
    pub fn touch(&mut self, tile: Tile) -> Option<Arc<RgbaImage>> {
        let pos = self.entries.iter().position(|e| e.tile == tile)?;
        let entry = self.entries.remove(pos);
        let image = Arc::clone(&entry.image);
        self.entries.push(entry);
        Some(image)
    }

    /// Insert a tile known to be absent, evicting from the LRU head so the
    /// bound holds after the insert.
    pub fn insert(&mut self, entry: TileImage) {
        debug_assert!(
            !self.entries.iter().any(|e| e.tile == entry.tile),
            "insert called for a tile already cached: {}",
            entry.tile
        );
        if self.max_items == 0 {
            return;
        }
        while self.entries.len() >= self.max_items {
            self.entries.remove(0);
        }
        self.entries.push(entry);
    }

    /// Drain the cache, partitioning it against the rectangle `[a, b]`.
    ///
    /// `a` and `b` must be normalized (see [`Tile::swap_if_needed`]) and on
    /// the same zoom level. The cache is left empty; callers must follow up
    /// with [`CacheState::rebuild`] once the misses are rendered.
    pub fn take_range(&mut self, a: Tile, b: Tile) -> RangePartition {
        debug_assert_eq!(a.z, b.z);
        debug_assert!(a.x <= b.x && a.y <= b.y);
        let width = (b.x - a.x + 1) as usize;
        let height = (b.y - a.y + 1) as usize;

        let mut slots = vec![None; width * height];
        let mut kept = Vec::with_capacity(self.entries.len());
        let mut touched = Vec::new();
        for entry in self.entries.drain(..) {
            if entry.tile.is_inside(a, b) {
                let index = (entry.tile.y - a.y) as usize * width + (entry.tile.x - a.x) as usize;
                slots[index] = Some(entry.clone());
                touched.push(entry);
            } else {
                kept.push(entry);
            }
        }
        RangePartition {
            origin: a,
            width,
            height,
            slots,
            kept,
            touched,
        }
    }

    /// Rebuild the cache as the most-recent `max_items` entries of
    /// `kept ++ touched`, preferring to keep all of `touched` (a range's
    /// tiles are by definition the most recently used) and filling any
    /// remaining capacity from the MRU tail of `kept`.
    pub fn rebuild(&mut self, kept: Vec<TileImage>, touched: Vec<TileImage>) {
        let keep_touched = touched.len().min(self.max_items);
        let keep_old = (self.max_items - keep_touched).min(kept.len());

        self.entries.clear();
        let old_start = kept.len() - keep_old;
        self.entries.extend(kept.into_iter().skip(old_start));
        let touched_start = touched.len() - keep_touched;
        self.entries.extend(touched.into_iter().skip(touched_start));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::placeholder_image;

    fn entry(x: u32, y: u32, z: u8) -> TileImage {
        TileImage::new(Tile::new(x, y, z), placeholder_image())
    }

    fn state_with(max_items: usize, tiles: &[(u32, u32, u8)]) -> CacheState {
        let mut state = CacheState::new(max_items);
        for &(x, y, z) in tiles {
            state.insert(entry(x, y, z));
        }
        state
    }

    #[test]
    fn test_insert_evicts_from_head() {
        let state = state_with(3, &[(0, 0, 5), (1, 0, 5), (0, 1, 5), (1, 1, 5)]);
        assert_eq!(
            state.tiles(),
            vec![Tile::new(1, 0, 5), Tile::new(0, 1, 5), Tile::new(1, 1, 5)]
        );
    }

    #[test]
    fn test_touch_moves_to_tail() {
        let mut state = state_with(3, &[(0, 0, 5), (1, 0, 5), (0, 1, 5)]);
        assert!(state.touch(Tile::new(0, 0, 5)).is_some());
        assert_eq!(
            state.tiles(),
            vec![Tile::new(1, 0, 5), Tile::new(0, 1, 5), Tile::new(0, 0, 5)]
        );
    }

    #[test]
    fn test_touch_miss_returns_none() {
        let mut state = state_with(3, &[(0, 0, 5)]);
        assert!(state.touch(Tile::new(9, 9, 5)).is_none());
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_take_range_partitions_and_places_row_major() {
        let mut state = state_with(10, &[(2, 2, 5), (0, 0, 5), (3, 2, 5)]);
        let part = state.take_range(Tile::new(2, 2, 5), Tile::new(3, 3, 5));
        assert_eq!(state.len(), 0, "take_range drains the cache");
        assert_eq!((part.width, part.height), (2, 2));
        assert!(part.slots[0].is_some(), "(2,2) at index 0");
        assert!(part.slots[1].is_some(), "(3,2) at index 1");
        assert!(part.slots[2].is_none());
        assert!(part.slots[3].is_none());
        assert_eq!(part.kept.len(), 1);
        assert_eq!(part.kept[0].tile, Tile::new(0, 0, 5));
        assert_eq!(part.touched.len(), 2);
    }

    #[test]
    fn test_tile_at_row_major() {
        let mut state = state_with(10, &[]);
        let part = state.take_range(Tile::new(4, 7, 6), Tile::new(6, 8, 6));
        assert_eq!(part.tile_at(0), Tile::new(4, 7, 6));
        assert_eq!(part.tile_at(2), Tile::new(6, 7, 6));
        assert_eq!(part.tile_at(3), Tile::new(4, 8, 6));
        assert_eq!(part.tile_at(5), Tile::new(6, 8, 6));
    }

    #[test]
    fn test_rebuild_prefers_touched_over_kept() {
        let mut state = CacheState::new(3);
        let kept = vec![entry(0, 0, 1), entry(1, 0, 1), entry(0, 1, 1)];
        let touched = vec![entry(5, 5, 2), entry(6, 5, 2)];
        state.rebuild(kept, touched);
        assert_eq!(
            state.tiles(),
            vec![Tile::new(0, 1, 1), Tile::new(5, 5, 2), Tile::new(6, 5, 2)],
            "one MRU kept entry survives, all touched entries survive"
        );
    }

    #[test]
    fn test_rebuild_trims_oversized_touched() {
        let mut state = CacheState::new(2);
        let touched = vec![entry(0, 0, 3), entry(1, 0, 3), entry(2, 0, 3)];
        state.rebuild(Vec::new(), touched);
        assert_eq!(state.tiles(), vec![Tile::new(1, 0, 3), Tile::new(2, 0, 3)]);
    }

    #[test]
    fn test_bound_invariant_after_mixed_operations() {
        let mut state = CacheState::new(4);
        for i in 0..20u32 {
            state.insert(entry(i, 0, 9));
            assert!(state.len() <= 4);
        }
        let part = state.take_range(Tile::new(18, 0, 9), Tile::new(19, 0, 9));
        let mut touched = part.touched;
        touched.push(entry(30, 0, 9));
        state.rebuild(part.kept, touched);
        assert!(state.len() <= 4);

        // No duplicate keys at any point.
        let tiles = state.tiles();
        let mut dedup = tiles.clone();
        dedup.sort_unstable();
        dedup.dedup();
        assert_eq!(tiles.len(), dedup.len());
    }

    #[test]
    fn test_zero_capacity_caches_nothing() {
        let mut state = CacheState::new(0);
        state.insert(entry(0, 0, 1));
        assert_eq!(state.len(), 0);
    }
}
