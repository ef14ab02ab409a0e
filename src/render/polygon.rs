//! Polygon renderer, including polygons with holes or disjoint regions.

use crate::error::EngineError;
use crate::geometry::ImagePoint;
use crate::interpolate::{InterpolationParams, interpolate_path};
use crate::layer::{DrawCommand, Layer};
use crate::model::{AnnotationData, AnnotationId, AnnotationKind, PolygonData};
use crate::render::{AnnotationRenderer, RenderContext, VERTEX_RADIUS, kind_mismatch};

pub struct PolygonRenderer;

fn polygon_of(data: &AnnotationData) -> Option<&PolygonData> {
    match data {
        AnnotationData::Polygon(polygon) => Some(polygon),
        _ => None,
    }
}

impl AnnotationRenderer for PolygonRenderer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Polygon
    }

    fn render(
        &self,
        layer: &mut Layer,
        id: AnnotationId,
        data: &AnnotationData,
        ctx: &RenderContext,
    ) -> Result<(), EngineError> {
        let polygon = polygon_of(data).ok_or_else(|| kind_mismatch(self.kind(), data))?;
        for path in std::iter::once(&polygon.path).chain(polygon.additional_paths.iter()) {
            layer.push(
                id,
                DrawCommand::Path {
                    points: path.iter().map(|p| ctx.camera.image_to_canvas(*p)).collect(),
                    closed: true,
                    stroke: ctx.color,
                    fill: ctx.fill(),
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

    fn path(&self, data: &AnnotationData) -> Vec<ImagePoint> {
        polygon_of(data).map(|p| p.path.clone()).unwrap_or_default()
    }

    /// Main path vertices first, then each additional path in order. This is
    /// the index space `move_vertex` operates in.
    fn all_vertices(&self, data: &AnnotationData) -> Vec<ImagePoint> {
        polygon_of(data)
            .map(|polygon| {
                polygon
                    .path
                    .iter()
                    .chain(polygon.additional_paths.iter().flatten())
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn translate(&self, data: &mut AnnotationData, delta: ImagePoint) {
        if let AnnotationData::Polygon(polygon) = data {
            for point in polygon
                .path
                .iter_mut()
                .chain(polygon.additional_paths.iter_mut().flatten())
            {
                *point = *point + delta;
            }
        }
    }

    fn move_vertex(&self, data: &mut AnnotationData, vertex_index: usize, to: ImagePoint) {
        if let AnnotationData::Polygon(polygon) = data
            && let Some(point) = polygon
                .path
                .iter_mut()
                .chain(polygon.additional_paths.iter_mut().flatten())
                .nth(vertex_index)
        {
            *point = to;
        }
    }

    fn supports_interpolate(&self) -> bool {
        true
    }

    /// Interpolates the main path; additional paths are carried over from
    /// whichever keyframe is closer.
    fn interpolate(
        &self,
        start: &AnnotationData,
        end: &AnnotationData,
        params: &InterpolationParams,
    ) -> Result<AnnotationData, EngineError> {
        let start = polygon_of(start).ok_or_else(|| kind_mismatch(self.kind(), start))?;
        let end = polygon_of(end).ok_or_else(|| kind_mismatch(self.kind(), end))?;
        let path = interpolate_path(&start.path, &end.path, params)?;
        let additional_paths = if params.factor < 0.5 {
            start.additional_paths.clone()
        } else {
            end.additional_paths.clone()
        };
        Ok(AnnotationData::Polygon(PolygonData {
            path,
            additional_paths,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn triangle() -> AnnotationData {
        AnnotationData::Polygon(PolygonData {
            path: vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(0.0, 10.0),
            ],
            additional_paths: vec![vec![
                Point::new(2.0, 2.0),
                Point::new(4.0, 2.0),
                Point::new(2.0, 4.0),
            ]],
        })
    }

    #[test]
    fn test_all_vertices_spans_additional_paths() {
        assert_eq!(PolygonRenderer.all_vertices(&triangle()).len(), 6);
    }

    #[test]
    fn test_move_vertex_reaches_into_additional_path() {
        let mut data = triangle();
        PolygonRenderer.move_vertex(&mut data, 4, Point::new(9.0, 9.0));
        let AnnotationData::Polygon(polygon) = &data else {
            unreachable!();
        };
        assert_eq!(polygon.additional_paths[0][1], Point::new(9.0, 9.0));
        assert_eq!(polygon.path[0], Point::new(0.0, 0.0));
    }

    #[test]
    fn test_translate_moves_every_path() {
        let mut data = triangle();
        PolygonRenderer.translate(&mut data, Point::new(1.0, 1.0));
        let AnnotationData::Polygon(polygon) = &data else {
            unreachable!();
        };
        assert_eq!(polygon.path[0], Point::new(1.0, 1.0));
        assert_eq!(polygon.additional_paths[0][0], Point::new(3.0, 3.0));
    }

    #[test]
    fn test_interpolate_matching_paths_is_pointwise() {
        let start = AnnotationData::Polygon(PolygonData {
            path: vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(0.0, 10.0),
            ],
            additional_paths: Vec::new(),
        });
        let end = AnnotationData::Polygon(PolygonData {
            path: vec![
                Point::new(10.0, 10.0),
                Point::new(20.0, 10.0),
                Point::new(10.0, 20.0),
            ],
            additional_paths: Vec::new(),
        });
        let out = PolygonRenderer
            .interpolate(&start, &end, &InterpolationParams::linear(0.5))
            .unwrap();
        let AnnotationData::Polygon(polygon) = out else {
            unreachable!();
        };
        assert_eq!(polygon.path[0], Point::new(5.0, 5.0));
    }
}
