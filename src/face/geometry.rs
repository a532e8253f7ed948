//! Pixel-space bounding boxes.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Axis-aligned box given by its top-left and bottom-right corners.
///
/// Serialized as `[x1, y1, x2, y2]`, the layout the analysis clients expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
#[ts(export, as = "[i32; 4]")]
pub struct BBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BBox {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2.saturating_sub(self.x1).max(0)
    }

    pub fn height(&self) -> i32 {
        self.y2.saturating_sub(self.y1).max(0)
    }

    pub fn area(&self) -> f32 {
        self.width() as f32 * self.height() as f32
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Clip the box to a `width` x `height` frame.
    pub fn clamp(self, width: i32, height: i32) -> Self {
        Self {
            x1: self.x1.max(0),
            y1: self.y1.max(0),
            x2: self.x2.min(width),
            y2: self.y2.min(height),
        }
    }

    /// Intersection-over-union. Disjoint boxes give 0.
    pub fn iou(&self, other: &BBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let inter = (ix2.saturating_sub(ix1).max(0) as f32) * (iy2.saturating_sub(iy1).max(0) as f32);
        let union = self.area() + other.area() - inter;
        inter / (union + 1e-9)
    }
}

impl From<[i32; 4]> for BBox {
    fn from([x1, y1, x2, y2]: [i32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BBox> for [i32; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}
