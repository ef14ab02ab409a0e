//! Single-point keypoint renderer.

use crate::error::EngineError;
use crate::geometry::ImagePoint;
use crate::interpolate::{InterpolationParams, lerp_point};
use crate::layer::{DrawCommand, Layer};
use crate::model::{AnnotationData, AnnotationId, AnnotationKind};
use crate::render::{AnnotationRenderer, RenderContext, VERTEX_RADIUS, kind_mismatch};

pub struct KeypointRenderer;

fn point_of(data: &AnnotationData) -> Option<ImagePoint> {
    match data {
        AnnotationData::Keypoint(point) => Some(*point),
        _ => None,
    }
}

impl AnnotationRenderer for KeypointRenderer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Keypoint
    }

    fn render(
        &self,
        layer: &mut Layer,
        id: AnnotationId,
        data: &AnnotationData,
        ctx: &RenderContext,
    ) -> Result<(), EngineError> {
        let point = point_of(data).ok_or_else(|| kind_mismatch(self.kind(), data))?;
        let radius = if ctx.is_selected {
            VERTEX_RADIUS * 1.5
        } else {
            VERTEX_RADIUS
        };
        layer.push(
            id,
            DrawCommand::Circle {
                center: ctx.camera.image_to_canvas(point),
                radius,
                fill: ctx.color,
            },
        );
        Ok(())
    }

    fn path(&self, data: &AnnotationData) -> Vec<ImagePoint> {
        point_of(data).into_iter().collect()
    }

    fn translate(&self, data: &mut AnnotationData, delta: ImagePoint) {
        if let AnnotationData::Keypoint(point) = data {
            *point = *point + delta;
        }
    }

    fn move_vertex(&self, data: &mut AnnotationData, vertex_index: usize, to: ImagePoint) {
        if vertex_index == 0
            && let AnnotationData::Keypoint(point) = data
        {
            *point = to;
        }
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
        let start = point_of(start).ok_or_else(|| kind_mismatch(self.kind(), start))?;
        let end = point_of(end).ok_or_else(|| kind_mismatch(self.kind(), end))?;
        Ok(AnnotationData::Keypoint(lerp_point(
            start,
            end,
            params.factor,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn test_interpolate_moves_along_segment() {
        let out = KeypointRenderer
            .interpolate(
                &AnnotationData::Keypoint(Point::new(0.0, 0.0)),
                &AnnotationData::Keypoint(Point::new(10.0, 20.0)),
                &InterpolationParams::linear(0.25),
            )
            .unwrap();
        assert_eq!(out, AnnotationData::Keypoint(Point::new(2.5, 5.0)));
    }

    #[test]
    fn test_move_vertex_ignores_out_of_range_index() {
        let mut data = AnnotationData::Keypoint(Point::new(1.0, 1.0));
        KeypointRenderer.move_vertex(&mut data, 1, Point::new(9.0, 9.0));
        assert_eq!(data, AnnotationData::Keypoint(Point::new(1.0, 1.0)));
    }
}
