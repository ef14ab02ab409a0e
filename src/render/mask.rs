//! Mask renderer.
//!
//! Mask pixels live in the view's raster buffer and are composited by the
//! UI, so rendering a mask amounts to reporting the raster region to
//! refresh plus, for a selected mask, its bounding box outline.

use crate::error::EngineError;
use crate::geometry::{ImagePoint, ImageRect, Point};
use crate::layer::{DrawCommand, Layer};
use crate::model::{AnnotationData, AnnotationId, AnnotationKind, MaskData};
use crate::render::{AnnotationRenderer, RenderContext, kind_mismatch};

pub struct MaskRenderer;

fn mask_of(data: &AnnotationData) -> Option<&MaskData> {
    match data {
        AnnotationData::Mask(mask) => Some(mask),
        _ => None,
    }
}

impl AnnotationRenderer for MaskRenderer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Mask
    }

    fn render(
        &self,
        layer: &mut Layer,
        id: AnnotationId,
        data: &AnnotationData,
        ctx: &RenderContext,
    ) -> Result<(), EngineError> {
        let mask = mask_of(data).ok_or_else(|| kind_mismatch(self.kind(), data))?;
        let Some(region) = mask.bounding_box else {
            // Empty mask, nothing on the raster yet.
            return Ok(());
        };
        if ctx.config.raster_masks {
            layer.push(id, DrawCommand::RasterRegion { region });
        }
        if ctx.is_selected || ctx.is_highlighted {
            layer.push(
                id,
                DrawCommand::Rect {
                    rect: ctx.camera.image_rect_to_canvas(&region),
                    stroke: ctx.color,
                    fill: None,
                    line_width: ctx.line_width(),
                },
            );
        }
        Ok(())
    }

    fn path(&self, data: &AnnotationData) -> Vec<ImagePoint> {
        mask_of(data)
            .and_then(|m| m.bounding_box)
            .map(|r| {
                vec![
                    Point::new(r.x, r.y),
                    Point::new(r.x + r.width, r.y),
                    Point::new(r.x + r.width, r.y + r.height),
                    Point::new(r.x, r.y + r.height),
                ]
            })
            .unwrap_or_default()
    }

    /// Masks have no draggable vertices.
    fn all_vertices(&self, _data: &AnnotationData) -> Vec<ImagePoint> {
        Vec::new()
    }

    /// Masks are edited through the raster buffer, not by translation.
    fn translate(&self, _data: &mut AnnotationData, _delta: ImagePoint) {}

    fn move_vertex(&self, _data: &mut AnnotationData, _vertex_index: usize, _to: ImagePoint) {}

    fn bounding_rect(&self, data: &AnnotationData) -> Option<ImageRect> {
        mask_of(data).and_then(|m| m.bounding_box)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::config::RenderConfig;
    use crate::render::RenderContext;

    fn context<'a>(camera: &'a Camera, config: &'a RenderConfig) -> RenderContext<'a> {
        RenderContext {
            camera,
            config,
            color: [1.0, 0.0, 0.0, 1.0],
            is_selected: false,
            is_highlighted: false,
        }
    }

    #[test]
    fn test_render_reports_raster_region() {
        let camera = Camera::new((100, 100), (100, 100));
        let config = RenderConfig::default();
        let mut layer = Layer::new();
        layer.begin_render();
        layer.begin_batch(1);

        let data = AnnotationData::Mask(MaskData {
            bounding_box: Some(ImageRect::new(5.0, 5.0, 10.0, 10.0)),
        });
        MaskRenderer
            .render(&mut layer, 1, &data, &context(&camera, &config))
            .unwrap();
        assert_eq!(
            layer.flush(),
            vec![DrawCommand::RasterRegion {
                region: ImageRect::new(5.0, 5.0, 10.0, 10.0)
            }]
        );
    }

    #[test]
    fn test_render_empty_mask_emits_nothing() {
        let camera = Camera::new((100, 100), (100, 100));
        let config = RenderConfig::default();
        let mut layer = Layer::new();
        layer.begin_render();
        layer.begin_batch(1);

        let data = AnnotationData::Mask(MaskData::default());
        MaskRenderer
            .render(&mut layer, 1, &data, &context(&camera, &config))
            .unwrap();
        assert!(layer.flush().is_empty());
    }
}
