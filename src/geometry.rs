//! Points and rectangles shared by the model, layout and viewport

use serde::{Deserialize, Serialize};

/// A 2D point, in model or screen space depending on context
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared distance to another point
    pub fn distance_sq(&self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }
}

/// Axis-aligned model-space rectangle nodes are confined to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundaries {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Boundaries {
    pub fn new(left: f64, right: f64, top: f64, bottom: f64) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    /// Shrink every side by `amount`. Sides never cross: a rectangle
    /// narrower than `2 * amount` collapses onto its centre line.
    pub fn deflate(&self, amount: f64) -> Self {
        let center = self.center();
        let half_w = (self.width() / 2.0 - amount).max(0.0);
        let half_h = (self.height() / 2.0 - amount).max(0.0);
        Self {
            left: center.x - half_w,
            right: center.x + half_w,
            top: center.y - half_h,
            bottom: center.y + half_h,
        }
    }

    /// Clamp a circle's centre so the circle stays inside.
    ///
    /// If the rectangle is narrower than the circle, the left/top edge wins.
    pub fn clamp_circle(&self, x: f64, y: f64, radius: f64) -> (f64, f64) {
        let x = (self.left + radius).max((self.right - radius).min(x));
        let y = (self.top + radius).max((self.bottom - radius).min(y));
        (x, y)
    }

    /// Whether a circle lies fully inside (inclusive)
    pub fn contains_circle(&self, x: f64, y: f64, radius: f64) -> bool {
        x >= self.left + radius
            && x <= self.right - radius
            && y >= self.top + radius
            && y <= self.bottom - radius
    }
}
