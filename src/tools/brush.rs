//! Mask painting tool.
//!
//! Paints circular stamps of the target mask's label into the view's
//! raster buffer; with erase enabled it paints background instead. One
//! stroke (press, drag, release) becomes one history entry holding the
//! raster state before the stroke.

use std::collections::HashMap;

use ndarray::Array2;

use crate::action::{Action, EditContext};
use crate::error::EngineError;
use crate::geometry::{ImagePoint, ImageRect};
use crate::model::{AnnotationData, AnnotationId, AnnotationKind};
use crate::raster::{BACKGROUND, Raster};
use crate::tools::{MouseButton, MouseEvent, Tool, ToolContext, ToolIntent};

/// Default stamp radius in image pixels.
pub const DEFAULT_RADIUS: f32 = 8.0;

struct Stroke {
    label: u8,
    last: ImagePoint,
    /// Raster state captured at stroke start, swapped in by undo.
    buffer: Array2<u8>,
    bounds: HashMap<u8, ImageRect>,
}

pub struct BrushTool {
    /// The mask annotation strokes paint into.
    target: Option<AnnotationId>,
    radius: f32,
    erase: bool,
    stroke: Option<Stroke>,
}

impl Default for BrushTool {
    fn default() -> Self {
        Self {
            target: None,
            radius: DEFAULT_RADIUS,
            erase: false,
            stroke: None,
        }
    }
}

impl BrushTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the brush at a mask annotation.
    pub fn set_target(&mut self, id: AnnotationId) {
        self.target = Some(id);
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius.max(0.5);
    }

    pub fn set_erase(&mut self, erase: bool) {
        self.erase = erase;
    }

    /// Write the raster-derived bounding box back onto the mask payload.
    fn sync_mask_bounds(ctx: &mut ToolContext, id: AnnotationId) -> Result<(), EngineError> {
        let bounds = ctx.view.raster.as_ref().and_then(|r| r.bounds_of(id));
        ctx.view.annotations.update(id, |annotation| {
            if let Some(AnnotationData::Mask(mask)) = annotation.image_data_mut() {
                mask.bounding_box = bounds;
            }
        })
    }

    fn stamp(&self, raster: &mut Raster, at: ImagePoint, label: u8) {
        let paint = if self.erase { BACKGROUND } else { label };
        raster.paint_circle(at, self.radius, paint);
    }
}

impl Tool for BrushTool {
    fn name(&self) -> &'static str {
        "brush"
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn deactivate(&mut self, _ctx: &mut ToolContext) {
        self.stroke = None;
        self.target = None;
        self.erase = false;
    }

    fn on_mouse_down(
        &mut self,
        event: &MouseEvent,
        ctx: &mut ToolContext,
    ) -> Result<(), EngineError> {
        if event.button != MouseButton::Left || !ctx.config.raster_masks {
            return Ok(());
        }
        let Some(id) = self.target else {
            return Ok(());
        };
        let kind = ctx.view.annotations.require(id)?.kind();
        if kind != Some(AnnotationKind::Mask) {
            return Err(EngineError::KindMismatch {
                expected: AnnotationKind::Mask,
                actual: kind.unwrap_or(AnnotationKind::Mask),
            });
        }

        let point = ctx.view.camera.canvas_to_image(event.position);
        let (width, height) = ctx.view.image_size;
        let raster = ctx
            .view
            .raster
            .get_or_insert_with(|| Raster::new(width, height));
        let label = raster.register(id)?;
        self.stroke = Some(Stroke {
            label,
            last: point,
            buffer: raster.buffer().clone(),
            bounds: raster.snapshot_bounds(),
        });
        self.stamp(raster, point, label);
        Self::sync_mask_bounds(ctx, id)?;
        ctx.view.layer.mark_batch_changed(id);
        Ok(())
    }

    fn on_mouse_move(
        &mut self,
        event: &MouseEvent,
        ctx: &mut ToolContext,
    ) -> Result<(), EngineError> {
        let Some(target) = self.target else {
            return Ok(());
        };
        let point = ctx.view.camera.canvas_to_image(event.position);
        let Some((label, last)) = self.stroke.as_ref().map(|s| (s.label, s.last)) else {
            return Ok(());
        };
        let Some(raster) = ctx.view.raster.as_mut() else {
            return Ok(());
        };

        // Stamp along the segment so fast drags leave no gaps.
        let distance = last.distance_to(&point);
        let step = (self.radius * 0.5).max(0.5);
        let steps = (distance / step).ceil().max(1.0) as u32;
        for i in 1..=steps {
            let t = i as f32 / steps as f32;
            let at = last + (point - last) * t;
            self.stamp(raster, at, label);
        }
        if let Some(stroke) = self.stroke.as_mut() {
            stroke.last = point;
        }
        Self::sync_mask_bounds(ctx, target)?;
        ctx.view.layer.mark_batch_changed(target);
        Ok(())
    }

    fn on_mouse_up(&mut self, _event: &MouseEvent, ctx: &mut ToolContext) -> Result<(), EngineError> {
        let (Some(stroke), Some(id)) = (self.stroke.take(), self.target) else {
            return Ok(());
        };
        // The stroke already happened; record it with the pre-stroke state.
        ctx.intents.push(ToolIntent::Record {
            action: Box::new(BrushStrokeAction {
                view_index: ctx.view_index,
                id,
                buffer: stroke.buffer,
                bounds: stroke.bounds,
            }),
            group: None,
        });
        Ok(())
    }
}

/// Swaps the raster state before and after one brush stroke.
struct BrushStrokeAction {
    view_index: usize,
    id: AnnotationId,
    buffer: Array2<u8>,
    bounds: HashMap<u8, ImageRect>,
}

impl BrushStrokeAction {
    /// Symmetric swap between the stored and live raster state.
    fn swap(&mut self, ctx: &mut EditContext) -> Result<bool, EngineError> {
        let id = self.id;
        let view = ctx.view(self.view_index)?;
        let raster = view
            .raster
            .as_mut()
            .ok_or(EngineError::MissingRasterLayer { id })?;

        let (live_buffer, live_bounds) = raster.swap_state(
            std::mem::take(&mut self.buffer),
            std::mem::take(&mut self.bounds),
        );
        self.buffer = live_buffer;
        self.bounds = live_bounds;

        // The payload's bounding box always mirrors the live raster; a
        // restored state without pixels for the label means no box.
        let restored = raster.bounds_of(id);
        view.annotations.update(id, |annotation| {
            if let Some(AnnotationData::Mask(mask)) = annotation.image_data_mut() {
                mask.bounding_box = restored;
            }
        })?;
        view.layer.mark_batch_changed(id);
        Ok(true)
    }
}

impl Action for BrushStrokeAction {
    fn apply(&mut self, ctx: &mut EditContext) -> Result<bool, EngineError> {
        self.swap(ctx)
    }

    fn revert(&mut self, ctx: &mut EditContext) -> Result<bool, EngineError> {
        self.swap(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionManager;
    use crate::config::RenderConfig;
    use crate::geometry::Point;
    use crate::model::{Annotation, MaskData};
    use crate::render::RendererRegistry;
    use crate::view::View;

    struct Fixture {
        views: Vec<View>,
        actions: ActionManager,
        registry: RendererRegistry,
        config: RenderConfig,
        intents: Vec<ToolIntent>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut view = View::new(1, (64, 64), (64, 64));
            view.annotations
                .add(Annotation::image(1, 1, AnnotationData::Mask(MaskData::default())));
            Self {
                views: vec![view],
                actions: ActionManager::new(),
                registry: RendererRegistry::with_defaults(),
                config: RenderConfig::default(),
                intents: Vec::new(),
            }
        }

        fn ctx(&mut self) -> ToolContext<'_> {
            ToolContext {
                view_index: 0,
                view: &mut self.views[0],
                actions: &mut self.actions,
                registry: &self.registry,
                config: &self.config,
                intents: &mut self.intents,
            }
        }

        fn drain(&mut self) {
            let intents = std::mem::take(&mut self.intents);
            let mut ctx = EditContext {
                views: &mut self.views,
                active_view: 0,
            };
            for intent in intents {
                match intent {
                    ToolIntent::Perform { action, group } => {
                        self.actions
                            .perform_in_group(action, &mut ctx, group)
                            .unwrap();
                    }
                    ToolIntent::Record { action, group } => {
                        self.actions.record(action, group);
                    }
                }
            }
        }
    }

    fn stroke(tool: &mut BrushTool, fx: &mut Fixture, from: (f32, f32), to: (f32, f32)) {
        tool.on_mouse_down(&MouseEvent::left(Point::new(from.0, from.1)), &mut fx.ctx())
            .unwrap();
        tool.on_mouse_move(&MouseEvent::left(Point::new(to.0, to.1)), &mut fx.ctx())
            .unwrap();
        tool.on_mouse_up(&MouseEvent::left(Point::new(to.0, to.1)), &mut fx.ctx())
            .unwrap();
        fx.drain();
    }

    #[test]
    fn test_stroke_paints_label_and_updates_mask_bounds() {
        let mut fx = Fixture::new();
        let mut tool = BrushTool::new();
        tool.set_target(1);
        tool.set_radius(3.0);

        stroke(&mut tool, &mut fx, (10.0, 10.0), (20.0, 10.0));

        let raster = fx.views[0].raster.as_ref().unwrap();
        assert_eq!(raster.get(10, 10), Some(1));
        assert_eq!(raster.get(20, 10), Some(1));
        let data = fx.views[0].annotations.get(1).unwrap().image_data().unwrap();
        let AnnotationData::Mask(mask) = data else {
            panic!("expected mask payload");
        };
        assert!(mask.bounding_box.is_some());
    }

    #[test]
    fn test_undo_restores_pre_stroke_raster() {
        let mut fx = Fixture::new();
        let mut tool = BrushTool::new();
        tool.set_target(1);
        tool.set_radius(3.0);

        stroke(&mut tool, &mut fx, (10.0, 10.0), (10.0, 10.0));
        assert_eq!(fx.views[0].raster.as_ref().unwrap().get(10, 10), Some(1));

        let mut ctx = EditContext {
            views: &mut fx.views,
            active_view: 0,
        };
        assert!(fx.actions.undo(&mut ctx).unwrap());
        assert_eq!(fx.views[0].raster.as_ref().unwrap().get(10, 10), Some(0));

        let mut ctx = EditContext {
            views: &mut fx.views,
            active_view: 0,
        };
        assert!(fx.actions.redo(&mut ctx).unwrap());
        assert_eq!(fx.views[0].raster.as_ref().unwrap().get(10, 10), Some(1));
    }

    #[test]
    fn test_undo_clears_mask_bounds_when_label_was_empty() {
        let mut fx = Fixture::new();
        let mut tool = BrushTool::new();
        tool.set_target(1);
        tool.set_radius(3.0);

        stroke(&mut tool, &mut fx, (10.0, 10.0), (10.0, 10.0));

        let mut ctx = EditContext {
            views: &mut fx.views,
            active_view: 0,
        };
        assert!(fx.actions.undo(&mut ctx).unwrap());

        // Before the stroke the mask had no pixels, so undo must not leave
        // the post-stroke box on the payload.
        let data = fx.views[0].annotations.get(1).unwrap().image_data().unwrap();
        let AnnotationData::Mask(mask) = data else {
            panic!("expected mask payload");
        };
        assert!(mask.bounding_box.is_none());
    }

    #[test]
    fn test_erase_removes_paint() {
        let mut fx = Fixture::new();
        let mut tool = BrushTool::new();
        tool.set_target(1);
        tool.set_radius(4.0);

        stroke(&mut tool, &mut fx, (10.0, 10.0), (10.0, 10.0));
        tool.set_erase(true);
        stroke(&mut tool, &mut fx, (10.0, 10.0), (10.0, 10.0));

        assert_eq!(fx.views[0].raster.as_ref().unwrap().get(10, 10), Some(0));
    }

    #[test]
    fn test_brush_disabled_without_raster_masks() {
        let mut fx = Fixture::new();
        fx.config = RenderConfig::legacy();
        let mut tool = BrushTool::new();
        tool.set_target(1);

        tool.on_mouse_down(&MouseEvent::left(Point::new(10.0, 10.0)), &mut fx.ctx())
            .unwrap();
        assert!(fx.views[0].raster.is_none());
    }
}
