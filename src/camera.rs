//! Camera: pan/zoom state and the image <-> canvas transform.
//!
//! The transform is `canvas = image * scale - offset`. Zoom operations keep
//! the image point under the given canvas anchor fixed, so zooming at the
//! cursor never makes the content slide away from it.

use crate::geometry::{CanvasPoint, CanvasRect, ImagePoint, ImageRect};

/// Minimum allowed zoom scale.
pub const MIN_SCALE: f32 = 0.05;
/// Maximum allowed zoom scale.
pub const MAX_SCALE: f32 = 64.0;
/// Default magnification factor for a single zoom step.
pub const ZOOM_STEP: f32 = 1.25;

/// Pan/zoom camera for one view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Current zoom scale (canvas pixels per image pixel).
    scale: f32,
    /// Canvas-space offset of the image origin (see module docs).
    offset: CanvasPoint,
    /// Size of the annotated image, in image pixels.
    image_size: (u32, u32),
    /// Size of the canvas viewport, in canvas pixels.
    viewport: (u32, u32),
}

impl Camera {
    pub fn new(image_size: (u32, u32), viewport: (u32, u32)) -> Self {
        let mut camera = Self {
            scale: 1.0,
            offset: CanvasPoint::new(0.0, 0.0),
            image_size,
            viewport,
        };
        camera.scale_to_fit();
        camera
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn offset(&self) -> CanvasPoint {
        self.offset
    }

    pub fn image_size(&self) -> (u32, u32) {
        self.image_size
    }

    /// Update the viewport size (e.g. on window resize), preserving scale.
    pub fn set_viewport(&mut self, viewport: (u32, u32)) {
        self.viewport = viewport;
        self.set_offset(self.offset);
    }

    /// The scale at which the whole image fits the viewport.
    pub fn scale_to_fit_value(&self) -> f32 {
        let (iw, ih) = self.image_size;
        let (vw, vh) = self.viewport;
        if iw == 0 || ih == 0 {
            return 1.0;
        }
        (vw as f32 / iw as f32).min(vh as f32 / ih as f32)
    }

    /// Reset the camera so the whole image is visible and centered.
    pub fn scale_to_fit(&mut self) {
        self.scale = self.scale_to_fit_value().clamp(MIN_SCALE, MAX_SCALE);

        let (iw, ih) = self.image_size;
        let (vw, vh) = self.viewport;
        let content_w = iw as f32 * self.scale;
        let content_h = ih as f32 * self.scale;
        self.offset = CanvasPoint::new(
            -((vw as f32 - content_w) / 2.0),
            -((vh as f32 - content_h) / 2.0),
        );
    }

    /// Set the canvas offset, clamped so the image cannot be panned
    /// arbitrarily far out of the viewport.
    pub fn set_offset(&mut self, offset: CanvasPoint) {
        let (iw, ih) = self.image_size;
        let (vw, vh) = self.viewport;
        let content_w = iw as f32 * self.scale;
        let content_h = ih as f32 * self.scale;

        // Allow panning until the image edge reaches the opposite viewport edge.
        let min_x = -(vw as f32);
        let max_x = content_w;
        let min_y = -(vh as f32);
        let max_y = content_h;

        self.offset = CanvasPoint::new(offset.x.clamp(min_x, max_x), offset.y.clamp(min_y, max_y));
    }

    /// Pan by a canvas-space delta.
    pub fn pan_by(&mut self, delta: CanvasPoint) {
        self.set_offset(self.offset + delta);
    }

    /// Convert a canvas-space point to image space.
    pub fn canvas_to_image(&self, point: CanvasPoint) -> ImagePoint {
        ((point + self.offset) * (1.0 / self.scale)).cast()
    }

    /// Convert an image-space point to canvas space.
    pub fn image_to_canvas(&self, point: ImagePoint) -> CanvasPoint {
        (point * self.scale).cast::<crate::geometry::CanvasSpace>() - self.offset
    }

    /// Convert an image-space rectangle to canvas space.
    pub fn image_rect_to_canvas(&self, rect: &ImageRect) -> CanvasRect {
        CanvasRect::from_corners(
            self.image_to_canvas(rect.top_left()),
            self.image_to_canvas(rect.bottom_right()),
        )
    }

    /// Zoom by a magnification factor around a canvas anchor point.
    /// Factors above 1 zoom in, below 1 zoom out.
    pub fn zoom(&mut self, factor: f32, anchor: CanvasPoint) {
        if factor >= 1.0 {
            self.zoom_in(anchor, factor);
        } else {
            self.zoom_out(anchor, 1.0 / factor);
        }
    }

    /// Zoom in by `factor`, keeping the image point under `anchor` fixed.
    pub fn zoom_in(&mut self, anchor: CanvasPoint, factor: f32) {
        self.zoom_to(self.scale * factor, anchor);
    }

    /// Zoom out by `factor`, keeping the image point under `anchor` fixed.
    pub fn zoom_out(&mut self, anchor: CanvasPoint, factor: f32) {
        self.zoom_to(self.scale / factor, anchor);
    }

    fn zoom_to(&mut self, new_scale: f32, anchor: CanvasPoint) {
        let new_scale = new_scale.clamp(MIN_SCALE, MAX_SCALE);

        // Image point currently under the anchor; after changing scale the
        // offset is re-derived so that point maps back to the same anchor.
        let fixed = self.canvas_to_image(anchor);
        self.scale = new_scale;
        self.set_offset((fixed * self.scale).cast::<crate::geometry::CanvasSpace>() - anchor);
    }

    /// Zoom so the given canvas-space box fills the viewport.
    pub fn zoom_to_box(&mut self, p1: CanvasPoint, p2: CanvasPoint) {
        let rect = CanvasRect::from_corners(p1, p2);
        if rect.width < 1.0 || rect.height < 1.0 {
            return;
        }

        let image_top_left = self.canvas_to_image(rect.top_left());
        let image_bottom_right = self.canvas_to_image(rect.bottom_right());

        let (vw, vh) = self.viewport;
        let box_w = image_bottom_right.x - image_top_left.x;
        let box_h = image_bottom_right.y - image_top_left.y;
        if box_w <= 0.0 || box_h <= 0.0 {
            return;
        }

        self.scale = (vw as f32 / box_w).min(vh as f32 / box_h).clamp(MIN_SCALE, MAX_SCALE);

        // Center the box in the viewport.
        let content_x = image_top_left.x * self.scale;
        let content_y = image_top_left.y * self.scale;
        let margin_x = (vw as f32 - box_w * self.scale) / 2.0;
        let margin_y = (vh as f32 - box_h * self.scale) / 2.0;
        self.set_offset(CanvasPoint::new(content_x - margin_x, content_y - margin_y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_scale_to_fit_centers_image() {
        let camera = Camera::new((100, 100), (200, 100));
        assert!(approx_eq(camera.scale(), 1.0));
        // Image is centered horizontally: 50px margin either side.
        assert!(approx_eq(camera.offset().x, -50.0));
        assert!(approx_eq(camera.offset().y, 0.0));
    }

    #[test]
    fn test_round_trip_transform() {
        let mut camera = Camera::new((640, 480), (800, 600));
        camera.zoom_in(CanvasPoint::new(120.0, 80.0), 2.0);

        let image = ImagePoint::new(123.0, 45.0);
        let canvas = camera.image_to_canvas(image);
        let back = camera.canvas_to_image(canvas);
        assert!(approx_eq(back.x, image.x));
        assert!(approx_eq(back.y, image.y));
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut camera = Camera::new((640, 480), (640, 480));
        let anchor = CanvasPoint::new(100.0, 200.0);
        let before = camera.canvas_to_image(anchor);

        camera.zoom_in(anchor, 1.5);
        let after = camera.canvas_to_image(anchor);

        assert!(approx_eq(before.x, after.x));
        assert!(approx_eq(before.y, after.y));
    }

    #[test]
    fn test_zoom_scale_clamped() {
        let mut camera = Camera::new((100, 100), (100, 100));
        for _ in 0..100 {
            camera.zoom_in(CanvasPoint::new(50.0, 50.0), 2.0);
        }
        assert!(approx_eq(camera.scale(), MAX_SCALE));

        for _ in 0..100 {
            camera.zoom_out(CanvasPoint::new(50.0, 50.0), 2.0);
        }
        assert!(approx_eq(camera.scale(), MIN_SCALE));
    }

    #[test]
    fn test_pan_is_clamped() {
        let mut camera = Camera::new((100, 100), (100, 100));
        camera.pan_by(CanvasPoint::new(-1e6, -1e6));
        assert!(camera.offset().x >= -100.0);
        assert!(camera.offset().y >= -100.0);
    }

    #[test]
    fn test_zoom_to_box() {
        let mut camera = Camera::new((1000, 1000), (100, 100));
        // Select the canvas box covering image pixels 0..500 on both axes.
        let p1 = camera.image_to_canvas(ImagePoint::new(0.0, 0.0));
        let p2 = camera.image_to_canvas(ImagePoint::new(500.0, 500.0));
        camera.zoom_to_box(p1, p2);
        assert!(approx_eq(camera.scale(), 0.2));
    }
}
