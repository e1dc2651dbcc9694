//! Viewport: scale/translate and the model↔screen transform
//!
//! `screen = scale * model + translate`. This module contains pure
//! calculation logic with no rendering dependencies.

use serde::Serialize;

use crate::geometry::{Boundaries, Point};

/// Scale multiplier for one zoom-in step
pub const ZOOM_IN_FACTOR: f64 = 1.1;
/// Scale multiplier for one zoom-out step
pub const ZOOM_OUT_FACTOR: f64 = 0.9;

/// The affine view transform handed to renderers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewTransform {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

/// Camera state for 2D view transformations
#[derive(Debug, Clone)]
pub struct Viewport {
    /// Canvas width in pixels
    width: f64,
    /// Canvas height in pixels
    height: f64,
    scale: f64,
    /// Screen-space offset
    translate_x: f64,
    translate_y: f64,
    min_scale: f64,
    max_scale: f64,
    /// Derived from canvas size and transform, see [`Viewport::recompute_boundaries`]
    boundaries: Boundaries,
}

impl Viewport {
    /// Create a viewport for a canvas of the given pixel size
    pub fn new(width: f64, height: f64, min_scale: f64, max_scale: f64) -> Self {
        let mut viewport = Self {
            width,
            height,
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
            min_scale,
            max_scale,
            boundaries: Boundaries::new(0.0, width, 0.0, height),
        };
        viewport.scale = viewport.clamp_scale(1.0);
        viewport.recompute_boundaries();
        viewport
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn translate(&self) -> (f64, f64) {
        (self.translate_x, self.translate_y)
    }

    pub fn boundaries(&self) -> &Boundaries {
        &self.boundaries
    }

    pub fn transform(&self) -> ViewTransform {
        ViewTransform {
            scale: self.scale,
            translate_x: self.translate_x,
            translate_y: self.translate_y,
        }
    }

    /// Convert model coordinates to screen coordinates
    pub fn model_to_screen(&self, p: Point) -> Point {
        Point::new(
            p.x * self.scale + self.translate_x,
            p.y * self.scale + self.translate_y,
        )
    }

    /// Convert screen coordinates to model coordinates
    pub fn screen_to_model(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.translate_x) / self.scale,
            (p.y - self.translate_y) / self.scale,
        )
    }

    /// Zoom one step about `pivot` (screen space).
    ///
    /// Negative `delta` zooms in, positive zooms out, zero does nothing. The
    /// model point under `pivot` stays under `pivot`. Returns whether the
    /// scale changed.
    pub fn zoom(&mut self, delta: f64, pivot: Point) -> bool {
        let factor = if delta < 0.0 {
            ZOOM_IN_FACTOR
        } else if delta > 0.0 {
            ZOOM_OUT_FACTOR
        } else {
            return false;
        };

        let old_scale = self.scale;
        let new_scale = self.clamp_scale(old_scale * factor);
        if new_scale == old_scale {
            return false;
        }

        let anchor = self.screen_to_model(pivot);
        self.scale = new_scale;
        self.translate_x = pivot.x - anchor.x * new_scale;
        self.translate_y = pivot.y - anchor.y * new_scale;
        self.recompute_boundaries();
        true
    }

    /// Pan the view by delta pixels. The translate itself is unconstrained;
    /// boundaries move with the visible area.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.translate_x += dx;
        self.translate_y += dy;
        self.recompute_boundaries();
    }

    /// Recompute boundaries as the model-space rectangle visible on the canvas
    pub fn recompute_boundaries(&mut self) {
        let top_left = self.screen_to_model(Point::new(0.0, 0.0));
        let bottom_right = self.screen_to_model(Point::new(self.width, self.height));
        self.boundaries = Boundaries::new(top_left.x, bottom_right.x, top_left.y, bottom_right.y);
    }

    /// Resize the canvas dimensions
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.recompute_boundaries();
    }

    /// Replace the scale limits, clamping the current scale into them
    pub fn set_scale_limits(&mut self, min_scale: f64, max_scale: f64) {
        self.min_scale = min_scale;
        self.max_scale = max_scale;
        self.scale = self.clamp_scale(self.scale);
        self.recompute_boundaries();
    }

    /// Reset view to default
    pub fn reset_view(&mut self) {
        self.scale = self.clamp_scale(1.0);
        self.translate_x = 0.0;
        self.translate_y = 0.0;
        self.recompute_boundaries();
    }

    fn clamp_scale(&self, scale: f64) -> f64 {
        scale.max(self.min_scale).min(self.max_scale)
    }
}
