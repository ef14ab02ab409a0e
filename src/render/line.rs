//! Polyline renderer.

use crate::error::EngineError;
use crate::geometry::ImagePoint;
use crate::interpolate::{InterpolationParams, lerp_point};
use crate::layer::{DrawCommand, Layer};
use crate::model::{AnnotationData, AnnotationId, AnnotationKind, LineData};
use crate::render::{AnnotationRenderer, RenderContext, VERTEX_RADIUS, kind_mismatch};

pub struct LineRenderer;

fn line_of(data: &AnnotationData) -> Option<&LineData> {
    match data {
        AnnotationData::Line(line) => Some(line),
        _ => None,
    }
}

impl AnnotationRenderer for LineRenderer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Line
    }

    fn render(
        &self,
        layer: &mut Layer,
        id: AnnotationId,
        data: &AnnotationData,
        ctx: &RenderContext,
    ) -> Result<(), EngineError> {
        let line = line_of(data).ok_or_else(|| kind_mismatch(self.kind(), data))?;
        layer.push(
            id,
            DrawCommand::Path {
                points: line
                    .path
                    .iter()
                    .map(|p| ctx.camera.image_to_canvas(*p))
                    .collect(),
                closed: false,
                stroke: ctx.color,
                fill: None,
                line_width: ctx.line_width(),
            },
        );
        if ctx.is_selected {
            for vertex in &line.path {
                layer.push(
                    id,
                    DrawCommand::Circle {
                        center: ctx.camera.image_to_canvas(*vertex),
                        radius: VERTEX_RADIUS,
                        fill: ctx.color,
                    },
                );
            }
        }
        Ok(())
    }

    fn path(&self, data: &AnnotationData) -> Vec<ImagePoint> {
        line_of(data).map(|l| l.path.clone()).unwrap_or_default()
    }

    fn translate(&self, data: &mut AnnotationData, delta: ImagePoint) {
        if let AnnotationData::Line(line) = data {
            for point in &mut line.path {
                *point = *point + delta;
            }
        }
    }

    fn move_vertex(&self, data: &mut AnnotationData, vertex_index: usize, to: ImagePoint) {
        if let AnnotationData::Line(line) = data
            && let Some(point) = line.path.get_mut(vertex_index)
        {
            *point = to;
        }
    }

    fn supports_interpolate(&self) -> bool {
        true
    }

    /// Pointwise interpolation when vertex counts match; otherwise the
    /// nearer keyframe wins. Lines are open, so the closed-path resampling
    /// polygons use does not apply.
    fn interpolate(
        &self,
        start: &AnnotationData,
        end: &AnnotationData,
        params: &InterpolationParams,
    ) -> Result<AnnotationData, EngineError> {
        params.require_linear()?;
        let start = line_of(start).ok_or_else(|| kind_mismatch(self.kind(), start))?;
        let end = line_of(end).ok_or_else(|| kind_mismatch(self.kind(), end))?;
        if start.path.len() != end.path.len() {
            let path = if params.factor < 0.5 {
                start.path.clone()
            } else {
                end.path.clone()
            };
            return Ok(AnnotationData::Line(LineData { path }));
        }
        let path = start
            .path
            .iter()
            .zip(end.path.iter())
            .map(|(s, e)| lerp_point(*s, *e, params.factor))
            .collect();
        Ok(AnnotationData::Line(LineData { path }))
    }
}
