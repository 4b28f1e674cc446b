//! Behavior flags for the render model.

use std::ops::{BitOr, BitOrAssign};

/// OR-combinable render behavior flags.
///
/// ```
/// use tilemosaic::render::RenderOptions;
///
/// let opts = RenderOptions::PROGRESSIVE_PAINT | RenderOptions::CLEAR_BEFORE_PASS;
/// assert!(opts.contains(RenderOptions::PROGRESSIVE_PAINT));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions(u32);

impl RenderOptions {
    pub const NONE: Self = Self(0);

    /// With a streaming tile source, publish the composite and request a
    /// repaint after every received tile instead of once per pass.
    pub const PROGRESSIVE_PAINT: Self = Self(1);

    /// Start every pass from a blank raster. By default a pass whose
    /// output size is unchanged starts from the previous composite, so
    /// tiles that blit late overwrite stale pixels instead of black.
    pub const CLEAR_BEFORE_PASS: Self = Self(1 << 1);

    pub fn contains(self, flags: Self) -> bool {
        self.0 & flags.0 == flags.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for RenderOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RenderOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
