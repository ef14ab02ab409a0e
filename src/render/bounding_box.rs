//! Axis-aligned bounding box renderer.

use crate::error::EngineError;
use crate::geometry::{ImagePoint, ImageRect, Point};
use crate::interpolate::{InterpolationParams, lerp_rect};
use crate::layer::{DrawCommand, Layer};
use crate::model::{AnnotationData, AnnotationId, AnnotationKind};
use crate::render::{AnnotationRenderer, RenderContext, VERTEX_RADIUS, kind_mismatch};

pub struct BoundingBoxRenderer;

fn rect_of(data: &AnnotationData) -> Option<&ImageRect> {
    match data {
        AnnotationData::BoundingBox(rect) => Some(rect),
        _ => None,
    }
}

/// Corner order: top-left, top-right, bottom-right, bottom-left.
fn corners(rect: &ImageRect) -> [ImagePoint; 4] {
    [
        Point::new(rect.x, rect.y),
        Point::new(rect.x + rect.width, rect.y),
        Point::new(rect.x + rect.width, rect.y + rect.height),
        Point::new(rect.x, rect.y + rect.height),
    ]
}

impl AnnotationRenderer for BoundingBoxRenderer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::BoundingBox
    }

    fn render(
        &self,
        layer: &mut Layer,
        id: AnnotationId,
        data: &AnnotationData,
        ctx: &RenderContext,
    ) -> Result<(), EngineError> {
        let rect = rect_of(data).ok_or_else(|| kind_mismatch(self.kind(), data))?;
        layer.push(
            id,
            DrawCommand::Rect {
                rect: ctx.camera.image_rect_to_canvas(rect),
                stroke: ctx.color,
                fill: ctx.fill(),
                line_width: ctx.line_width(),
            },
        );
        if ctx.is_selected {
            for corner in corners(rect) {
                layer.push(
                    id,
                    DrawCommand::Circle {
                        center: ctx.camera.image_to_canvas(corner),
                        radius: VERTEX_RADIUS,
                        fill: ctx.color,
                    },
                );
            }
        }
        Ok(())
    }

    fn path(&self, data: &AnnotationData) -> Vec<ImagePoint> {
        rect_of(data).map(|r| corners(r).to_vec()).unwrap_or_default()
    }

    fn translate(&self, data: &mut AnnotationData, delta: ImagePoint) {
        if let AnnotationData::BoundingBox(rect) = data {
            rect.x += delta.x;
            rect.y += delta.y;
        }
    }

    /// Moving a corner drags that corner while pinning the opposite one.
    fn move_vertex(&self, data: &mut AnnotationData, vertex_index: usize, to: ImagePoint) {
        let AnnotationData::BoundingBox(rect) = data else {
            return;
        };
        let opposite = match vertex_index {
            0 => Point::new(rect.x + rect.width, rect.y + rect.height),
            1 => Point::new(rect.x, rect.y + rect.height),
            2 => Point::new(rect.x, rect.y),
            3 => Point::new(rect.x + rect.width, rect.y),
            _ => return,
        };
        *rect = ImageRect::from_corners(opposite, to);
    }

    fn supports_interpolate(&self) -> bool {
        true
    }

    fn interpolate(
        &self,
        start: &AnnotationData,
        end: &AnnotationData,
        params: &InterpolationParams,
    ) -> Result<AnnotationData, EngineError> {
        params.require_linear()?;
        let start = rect_of(start).ok_or_else(|| kind_mismatch(self.kind(), start))?;
        let end = rect_of(end).ok_or_else(|| kind_mismatch(self.kind(), end))?;
        Ok(AnnotationData::BoundingBox(lerp_rect(
            start,
            end,
            params.factor,
        )))
    }

    fn bounding_rect(&self, data: &AnnotationData) -> Option<ImageRect> {
        rect_of(data).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(x: f32, y: f32, w: f32, h: f32) -> AnnotationData {
        AnnotationData::BoundingBox(ImageRect::new(x, y, w, h))
    }

    #[test]
    fn test_move_corner_pins_opposite_corner() {
        let mut data = boxed(10.0, 10.0, 20.0, 20.0);
        BoundingBoxRenderer.move_vertex(&mut data, 0, Point::new(0.0, 0.0));
        assert_eq!(data, boxed(0.0, 0.0, 30.0, 30.0));
    }

    #[test]
    fn test_move_corner_past_opposite_flips_rect() {
        let mut data = boxed(0.0, 0.0, 10.0, 10.0);
        // Drag bottom-right corner past the top-left one.
        BoundingBoxRenderer.move_vertex(&mut data, 2, Point::new(-5.0, -5.0));
        assert_eq!(data, boxed(-5.0, -5.0, 5.0, 5.0));
    }

    #[test]
    fn test_interpolate_halfway() {
        let out = BoundingBoxRenderer
            .interpolate(
                &boxed(0.0, 0.0, 10.0, 10.0),
                &boxed(10.0, 10.0, 30.0, 30.0),
                &InterpolationParams::linear(0.5),
            )
            .unwrap();
        assert_eq!(out, boxed(5.0, 5.0, 20.0, 20.0));
    }

    #[test]
    fn test_translate_moves_origin_only() {
        let mut data = boxed(1.0, 2.0, 3.0, 4.0);
        BoundingBoxRenderer.translate(&mut data, Point::new(10.0, 20.0));
        assert_eq!(data, boxed(11.0, 22.0, 3.0, 4.0));
    }
}
