//! Canvas layers and draw batching.
//!
//! Renderers do not paint pixels; they append [`DrawCommand`]s to a
//! [`Layer`]. The embedding UI flushes each layer's command list onto its
//! real canvas. In batched mode a layer keeps one command batch per
//! annotation and only re-renders batches that were marked changed; in
//! legacy mode every flush rebuilds everything.

use crate::geometry::{CanvasPoint, CanvasRect, ImageRect};
use crate::model::AnnotationId;

/// RGBA color, 0-1 components.
pub type Color = [f32; 4];

/// A single primitive recorded by a renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// A stroked (and optionally filled) path in canvas space.
    Path {
        points: Vec<CanvasPoint>,
        closed: bool,
        stroke: Color,
        fill: Option<Color>,
        line_width: f32,
    },
    /// An axis-aligned rectangle outline.
    Rect {
        rect: CanvasRect,
        stroke: Color,
        fill: Option<Color>,
        line_width: f32,
    },
    /// A filled circle (vertex markers, clicks).
    Circle {
        center: CanvasPoint,
        radius: f32,
        fill: Color,
    },
    /// An ellipse described by center and radii.
    Ellipse {
        center: CanvasPoint,
        radius_x: f32,
        radius_y: f32,
        stroke: Color,
        fill: Option<Color>,
    },
    /// A text label anchored at a canvas point.
    Text {
        anchor: CanvasPoint,
        text: String,
        color: Color,
    },
    /// The region of the view's raster buffer to composite, in image space.
    /// The UI owns the pixel upload; the engine only reports the region.
    RasterRegion { region: ImageRect },
}

/// One annotation's batch of draw commands.
#[derive(Debug, Clone, Default)]
struct Batch {
    commands: Vec<DrawCommand>,
    changed: bool,
}

/// A single canvas layer with per-annotation draw batching.
#[derive(Debug, Default)]
pub struct Layer {
    /// Batches in render order. Rebuilt on every full render pass.
    order: Vec<AnnotationId>,
    batches: std::collections::HashMap<AnnotationId, Batch>,
    /// Commands not tied to an annotation (tool overlays, previews).
    overlay: Vec<DrawCommand>,
    /// Set when anything changed since the last flush.
    changed: bool,
    /// Image-space region invalidated since the last flush, if any.
    dirty_region: Option<ImageRect>,
}

impl Layer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the layer needs re-flushing.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Mark the whole layer changed.
    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// Accumulate an invalidated image-space region for partial repaint.
    pub fn invalidate_region(&mut self, region: ImageRect) {
        self.dirty_region = Some(match self.dirty_region {
            Some(existing) => existing.union(&region),
            None => region,
        });
        self.changed = true;
    }

    /// The accumulated dirty region, if any.
    pub fn dirty_region(&self) -> Option<ImageRect> {
        self.dirty_region
    }

    /// Begin a full render pass: resets render order and overlay commands.
    pub fn begin_render(&mut self) {
        self.order.clear();
        self.overlay.clear();
    }

    /// Start (or restart) the command batch for one annotation. Subsequent
    /// `push` calls append to it until another batch is started.
    pub fn begin_batch(&mut self, id: AnnotationId) {
        self.order.push(id);
        let batch = self.batches.entry(id).or_default();
        batch.commands.clear();
        batch.changed = false;
    }

    /// Append a command to the current annotation batch.
    pub fn push(&mut self, id: AnnotationId, command: DrawCommand) {
        if let Some(batch) = self.batches.get_mut(&id) {
            batch.commands.push(command);
        }
    }

    /// Append an overlay command not tied to any annotation.
    pub fn push_overlay(&mut self, command: DrawCommand) {
        self.overlay.push(command);
    }

    /// Mark one annotation's batch as needing a re-render.
    pub fn mark_batch_changed(&mut self, id: AnnotationId) {
        if let Some(batch) = self.batches.get_mut(&id) {
            batch.changed = true;
        }
        self.changed = true;
    }

    /// Whether one annotation's batch needs re-rendering.
    pub fn is_batch_changed(&self, id: AnnotationId) -> bool {
        self.batches.get(&id).is_none_or(|b| b.changed)
    }

    /// Drop the batch of a removed annotation.
    pub fn remove_batch(&mut self, id: AnnotationId) {
        self.batches.remove(&id);
        self.order.retain(|existing| *existing != id);
        self.changed = true;
    }

    /// Flush: the full command list in render order, clearing change state.
    pub fn flush(&mut self) -> Vec<DrawCommand> {
        let mut commands = Vec::new();
        for id in &self.order {
            if let Some(batch) = self.batches.get(id) {
                commands.extend(batch.commands.iter().cloned());
            }
        }
        commands.extend(self.overlay.iter().cloned());
        self.changed = false;
        self.dirty_region = None;
        commands
    }

    /// Drop everything (item/view switch).
    pub fn clear(&mut self) {
        self.order.clear();
        self.batches.clear();
        self.overlay.clear();
        self.dirty_region = None;
        self.changed = true;
    }
}
