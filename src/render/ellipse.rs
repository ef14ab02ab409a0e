//! Ellipse renderer. The payload stores three control points: center plus
//! the endpoints of the horizontal and vertical radii.

use crate::error::EngineError;
use crate::geometry::{ImagePoint, ImageRect, Point};
use crate::interpolate::{InterpolationParams, lerp_point};
use crate::layer::{DrawCommand, Layer};
use crate::model::{AnnotationData, AnnotationId, AnnotationKind, EllipseData};
use crate::render::{AnnotationRenderer, RenderContext, VERTEX_RADIUS, kind_mismatch};

pub struct EllipseRenderer;

fn ellipse_of(data: &AnnotationData) -> Option<&EllipseData> {
    match data {
        AnnotationData::Ellipse(ellipse) => Some(ellipse),
        _ => None,
    }
}

fn radii(ellipse: &EllipseData) -> (f32, f32) {
    let rx = (ellipse.right - ellipse.center).length();
    let ry = (ellipse.top - ellipse.center).length();
    (rx, ry)
}

impl AnnotationRenderer for EllipseRenderer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Ellipse
    }

    fn render(
        &self,
        layer: &mut Layer,
        id: AnnotationId,
        data: &AnnotationData,
        ctx: &RenderContext,
    ) -> Result<(), EngineError> {
        let ellipse = ellipse_of(data).ok_or_else(|| kind_mismatch(self.kind(), data))?;
        let (rx, ry) = radii(ellipse);
        layer.push(
            id,
            DrawCommand::Ellipse {
                center: ctx.camera.image_to_canvas(ellipse.center),
                radius_x: rx * ctx.camera.scale(),
                radius_y: ry * ctx.camera.scale(),
                stroke: ctx.color,
                fill: ctx.fill(),
            },
        );
        if ctx.is_selected {
            for vertex in self.all_vertices(data) {
                layer.push(
                    id,
                    DrawCommand::Circle {
                        center: ctx.camera.image_to_canvas(vertex),
                        radius: VERTEX_RADIUS,
                        fill: ctx.color,
                    },
                );
            }
        }
        Ok(())
    }

    /// A coarse polygonal outline, good enough for hit testing.
    fn path(&self, data: &AnnotationData) -> Vec<ImagePoint> {
        let Some(ellipse) = ellipse_of(data) else {
            return Vec::new();
        };
        let (rx, ry) = radii(ellipse);
        const SEGMENTS: usize = 24;
        (0..SEGMENTS)
            .map(|i| {
                let theta = i as f32 / SEGMENTS as f32 * std::f32::consts::TAU;
                Point::new(
                    ellipse.center.x + rx * theta.cos(),
                    ellipse.center.y + ry * theta.sin(),
                )
            })
            .collect()
    }

    /// Vertex order: center, right radius endpoint, top radius endpoint.
    fn all_vertices(&self, data: &AnnotationData) -> Vec<ImagePoint> {
        ellipse_of(data)
            .map(|e| vec![e.center, e.right, e.top])
            .unwrap_or_default()
    }

    fn translate(&self, data: &mut AnnotationData, delta: ImagePoint) {
        if let AnnotationData::Ellipse(ellipse) = data {
            ellipse.center = ellipse.center + delta;
            ellipse.right = ellipse.right + delta;
            ellipse.top = ellipse.top + delta;
        }
    }

    fn move_vertex(&self, data: &mut AnnotationData, vertex_index: usize, to: ImagePoint) {
        let AnnotationData::Ellipse(ellipse) = data else {
            return;
        };
        match vertex_index {
            0 => {
                // Moving the center carries the radius endpoints along.
                let delta = to - ellipse.center;
                ellipse.center = to;
                ellipse.right = ellipse.right + delta;
                ellipse.top = ellipse.top + delta;
            }
            1 => ellipse.right = to,
            2 => ellipse.top = to,
            _ => {}
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
        let start = ellipse_of(start).ok_or_else(|| kind_mismatch(self.kind(), start))?;
        let end = ellipse_of(end).ok_or_else(|| kind_mismatch(self.kind(), end))?;
        Ok(AnnotationData::Ellipse(EllipseData {
            center: lerp_point(start.center, end.center, params.factor),
            right: lerp_point(start.right, end.right, params.factor),
            top: lerp_point(start.top, end.top, params.factor),
        }))
    }

    fn bounding_rect(&self, data: &AnnotationData) -> Option<ImageRect> {
        let ellipse = ellipse_of(data)?;
        let (rx, ry) = radii(ellipse);
        Some(ImageRect::new(
            ellipse.center.x - rx,
            ellipse.center.y - ry,
            rx * 2.0,
            ry * 2.0,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ellipse() -> AnnotationData {
        AnnotationData::Ellipse(EllipseData {
            center: Point::new(10.0, 10.0),
            right: Point::new(15.0, 10.0),
            top: Point::new(10.0, 7.0),
        })
    }

    #[test]
    fn test_moving_center_carries_radius_endpoints() {
        let mut data = ellipse();
        EllipseRenderer.move_vertex(&mut data, 0, Point::new(20.0, 20.0));
        let AnnotationData::Ellipse(e) = &data else {
            unreachable!();
        };
        assert_eq!(e.right, Point::new(25.0, 20.0));
        assert_eq!(e.top, Point::new(20.0, 17.0));
    }

    #[test]
    fn test_bounding_rect_spans_both_radii() {
        assert_eq!(
            EllipseRenderer.bounding_rect(&ellipse()),
            Some(ImageRect::new(5.0, 7.0, 10.0, 6.0))
        );
    }

    #[test]
    fn test_interpolate_pointwise() {
        let end = AnnotationData::Ellipse(EllipseData {
            center: Point::new(20.0, 10.0),
            right: Point::new(25.0, 10.0),
            top: Point::new(20.0, 7.0),
        });
        let out = EllipseRenderer
            .interpolate(&ellipse(), &end, &InterpolationParams::linear(0.5))
            .unwrap();
        let AnnotationData::Ellipse(e) = out else {
            unreachable!();
        };
        assert_eq!(e.center, Point::new(15.0, 10.0));
    }
}
