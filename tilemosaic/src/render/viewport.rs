//! Geographic viewport requested for rendering.

use crate::coord::LatLon;

/// The geographic bounding box and output pixel size of one render target.
///
/// `left`/`top`/`right`/`bottom` are degrees; `top` is the northern edge,
/// so `top > bottom` for any non-degenerate viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(top_left: LatLon, bottom_right: LatLon, width: u32, height: u32) -> Self {
        Self {
            left: top_left.lon,
            top: top_left.lat,
            right: bottom_right.lon,
            bottom: bottom_right.lat,
            width,
            height,
        }
    }

    /// Northwest corner.
    pub fn top_left(&self) -> LatLon {
        LatLon::new(self.top, self.left)
    }

    /// Southeast corner.
    pub fn bottom_right(&self) -> LatLon {
        LatLon::new(self.bottom, self.right)
    }

    /// Same geographic box at a new output size.
    pub fn resized(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}
