//! Renderers for kinds with little or no canvas geometry.
//!
//! Tags, texts, instance ids, links and directional vectors are presented
//! by the surrounding UI (side panels, overlays attached to a parent
//! annotation), so their renderers emit no draw commands of their own but
//! still satisfy the registry so hit testing and tooling treat every kind
//! uniformly. The cuboid renderer lives here too since it is built from
//! two plain rectangles.

use crate::error::EngineError;
use crate::geometry::{ImagePoint, ImageRect, Point};
use crate::interpolate::{InterpolationParams, lerp_rect};
use crate::layer::{DrawCommand, Layer};
use crate::model::{AnnotationData, AnnotationId, AnnotationKind, CuboidData};
use crate::render::{AnnotationRenderer, RenderContext, VERTEX_RADIUS, kind_mismatch};

/// Implements a geometry-less renderer for one payload kind.
macro_rules! chrome_renderer {
    ($name:ident, $kind:expr) => {
        pub struct $name;

        impl AnnotationRenderer for $name {
            fn kind(&self) -> AnnotationKind {
                $kind
            }

            fn render(
                &self,
                _layer: &mut Layer,
                _id: AnnotationId,
                data: &AnnotationData,
                _ctx: &RenderContext,
            ) -> Result<(), EngineError> {
                if data.kind() != self.kind() {
                    return Err(kind_mismatch(self.kind(), data));
                }
                Ok(())
            }

            fn path(&self, _data: &AnnotationData) -> Vec<ImagePoint> {
                Vec::new()
            }

            fn translate(&self, _data: &mut AnnotationData, _delta: ImagePoint) {}

            fn move_vertex(
                &self,
                _data: &mut AnnotationData,
                _vertex_index: usize,
                _to: ImagePoint,
            ) {
            }

            fn bounding_rect(&self, _data: &AnnotationData) -> Option<ImageRect> {
                None
            }
        }
    };
}

chrome_renderer!(TagRenderer, AnnotationKind::Tag);
chrome_renderer!(TextRenderer, AnnotationKind::Text);
chrome_renderer!(InstanceIdRenderer, AnnotationKind::InstanceId);
chrome_renderer!(LinkRenderer, AnnotationKind::Link);
chrome_renderer!(DirectionalVectorRenderer, AnnotationKind::DirectionalVector);
// The raster layer's pixels are absorbed into the view's raster buffer on
// load; the annotation itself draws nothing.
chrome_renderer!(RasterLayerRenderer, AnnotationKind::RasterLayer);

// ============================================================================
// Cuboid
// ============================================================================

pub struct CuboidRenderer;

fn cuboid_of(data: &AnnotationData) -> Option<&CuboidData> {
    match data {
        AnnotationData::Cuboid(cuboid) => Some(cuboid),
        _ => None,
    }
}

fn rect_corners(rect: &ImageRect) -> [ImagePoint; 4] {
    [
        Point::new(rect.x, rect.y),
        Point::new(rect.x + rect.width, rect.y),
        Point::new(rect.x + rect.width, rect.y + rect.height),
        Point::new(rect.x, rect.y + rect.height),
    ]
}

impl AnnotationRenderer for CuboidRenderer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Cuboid
    }

    fn render(
        &self,
        layer: &mut Layer,
        id: AnnotationId,
        data: &AnnotationData,
        ctx: &RenderContext,
    ) -> Result<(), EngineError> {
        let cuboid = cuboid_of(data).ok_or_else(|| kind_mismatch(self.kind(), data))?;
        for (rect, fill) in [(&cuboid.front, ctx.fill()), (&cuboid.back, None)] {
            layer.push(
                id,
                DrawCommand::Rect {
                    rect: ctx.camera.image_rect_to_canvas(rect),
                    stroke: ctx.color,
                    fill,
                    line_width: ctx.line_width(),
                },
            );
        }
        // Edges connecting corresponding corners of the two faces.
        for (front, back) in rect_corners(&cuboid.front)
            .into_iter()
            .zip(rect_corners(&cuboid.back))
        {
            layer.push(
                id,
                DrawCommand::Path {
                    points: vec![
                        ctx.camera.image_to_canvas(front),
                        ctx.camera.image_to_canvas(back),
                    ],
                    closed: false,
                    stroke: ctx.color,
                    fill: None,
                    line_width: ctx.line_width(),
                },
            );
        }
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

    /// Hit-test outline: the front face.
    fn path(&self, data: &AnnotationData) -> Vec<ImagePoint> {
        cuboid_of(data)
            .map(|c| rect_corners(&c.front).to_vec())
            .unwrap_or_default()
    }

    /// Front face corners 0..4, then back face corners 4..8.
    fn all_vertices(&self, data: &AnnotationData) -> Vec<ImagePoint> {
        cuboid_of(data)
            .map(|c| {
                rect_corners(&c.front)
                    .into_iter()
                    .chain(rect_corners(&c.back))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn translate(&self, data: &mut AnnotationData, delta: ImagePoint) {
        if let AnnotationData::Cuboid(cuboid) = data {
            cuboid.front = cuboid.front.translated(delta);
            cuboid.back = cuboid.back.translated(delta);
        }
    }

    fn move_vertex(&self, data: &mut AnnotationData, vertex_index: usize, to: ImagePoint) {
        let AnnotationData::Cuboid(cuboid) = data else {
            return;
        };
        let (rect, corner) = if vertex_index < 4 {
            (&mut cuboid.front, vertex_index)
        } else if vertex_index < 8 {
            (&mut cuboid.back, vertex_index - 4)
        } else {
            return;
        };
        let opposite = match corner {
            0 => Point::new(rect.x + rect.width, rect.y + rect.height),
            1 => Point::new(rect.x, rect.y + rect.height),
            2 => Point::new(rect.x, rect.y),
            _ => Point::new(rect.x + rect.width, rect.y),
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
        let start = cuboid_of(start).ok_or_else(|| kind_mismatch(self.kind(), start))?;
        let end = cuboid_of(end).ok_or_else(|| kind_mismatch(self.kind(), end))?;
        Ok(AnnotationData::Cuboid(CuboidData {
            front: lerp_rect(&start.front, &end.front, params.factor),
            back: lerp_rect(&start.back, &end.back, params.factor),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cuboid() -> AnnotationData {
        AnnotationData::Cuboid(CuboidData {
            front: ImageRect::new(0.0, 0.0, 10.0, 10.0),
            back: ImageRect::new(5.0, 5.0, 10.0, 10.0),
        })
    }

    #[test]
    fn test_cuboid_vertices_front_then_back() {
        let vertices = CuboidRenderer.all_vertices(&cuboid());
        assert_eq!(vertices.len(), 8);
        assert_eq!(vertices[0], Point::new(0.0, 0.0));
        assert_eq!(vertices[4], Point::new(5.0, 5.0));
    }

    #[test]
    fn test_cuboid_move_back_corner_leaves_front_face() {
        let mut data = cuboid();
        CuboidRenderer.move_vertex(&mut data, 6, Point::new(20.0, 20.0));
        let AnnotationData::Cuboid(c) = &data else {
            unreachable!();
        };
        assert_eq!(c.front, ImageRect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(c.back, ImageRect::new(5.0, 5.0, 15.0, 15.0));
    }

    #[test]
    fn test_chrome_renderers_expose_no_geometry() {
        let tag = AnnotationData::Tag;
        assert!(TagRenderer.path(&tag).is_empty());
        assert_eq!(TagRenderer.bounding_rect(&tag), None);
        assert!(!TagRenderer.supports_interpolate());
    }
}
