//! The default selection and editing tool.
//!
//! Click selects (shift-click adds to the selection), dragging an
//! annotation translates it, dragging a vertex moves it, and Delete
//! removes the selected vertex or, with none selected, the selected
//! annotations. Drags mutate the live payload for immediate feedback and
//! are recorded as one history entry on release.

use crate::error::EngineError;
use crate::geometry::ImagePoint;
use crate::model::{
    AnnotationData, AnnotationId, AnnotationPayload, CompoundPath, DeletableVertexContext,
    EditablePoint, PolygonData, resolve_deletable_vertex_context,
};
use crate::action::{DeleteAnnotationAction, UpdateAnnotationDataAction};
use crate::tools::{KeyEvent, MouseButton, MouseEvent, Tool, ToolContext, VERTEX_GRAB_RANGE};

enum Drag {
    /// Translating a whole annotation; `last` tracks the previous pointer
    /// position so each move applies a delta.
    Translate {
        id: AnnotationId,
        original: AnnotationData,
        last: ImagePoint,
        moved: bool,
    },
    /// Dragging a single vertex.
    Vertex {
        id: AnnotationId,
        original: AnnotationData,
        vertex_index: usize,
        moved: bool,
    },
}

#[derive(Default)]
pub struct EditTool {
    drag: Option<Drag>,
    /// Vertex picked by the last click, target of vertex deletion.
    selected_vertex: Option<(AnnotationId, usize)>,
}

impl EditTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a mutated payload onto the annotation: in place for image
    /// annotations, onto the current keyframe for video ones.
    fn write_live(
        ctx: &mut ToolContext,
        id: AnnotationId,
        data: AnnotationData,
    ) -> Result<(), EngineError> {
        let frame_index = ctx.view.current_frame_index;
        ctx.view.annotations.update(id, |annotation| {
            match &mut annotation.payload {
                AnnotationPayload::Image(live) => *live = data,
                AnnotationPayload::Video(video) => video.set_keyframe(frame_index, data),
            }
        })?;
        ctx.view.layer.mark_batch_changed(id);
        Ok(())
    }

    fn finish_drag(&mut self, ctx: &mut ToolContext) -> Result<(), EngineError> {
        let Some(drag) = self.drag.take() else {
            return Ok(());
        };
        let (id, original, moved) = match drag {
            Drag::Translate {
                id,
                original,
                moved,
                ..
            } => (id, original, moved),
            Drag::Vertex {
                id,
                original,
                moved,
                ..
            } => (id, original, moved),
        };
        if !moved {
            return Ok(());
        }
        // The live payload already holds the new geometry; the recorded
        // action stores the original so undo swaps it back in.
        let mut action = UpdateAnnotationDataAction::new(ctx.view_index, id, original);
        if ctx.view.annotations.require(id)?.is_video() {
            action = action.at_keyframe(ctx.view.current_frame_index);
        }
        ctx.record(action);
        Ok(())
    }

    fn delete_selected_vertex(
        &mut self,
        ctx: &mut ToolContext,
    ) -> Result<bool, EngineError> {
        let Some((id, vertex_index)) = self.selected_vertex else {
            return Ok(false);
        };
        let annotation = ctx.view.annotations.require(id)?;
        let Some(data) = ctx.view.infer_current_data(annotation, ctx.registry)? else {
            return Ok(false);
        };
        // Only compound-path payloads support vertex deletion.
        let AnnotationData::Polygon(polygon) = &data else {
            return Ok(false);
        };

        let mut compound = CompoundPath {
            path: polygon.path.iter().copied().map(EditablePoint::new).collect(),
            additional_paths: polygon
                .additional_paths
                .iter()
                .map(|path| path.iter().copied().map(EditablePoint::new).collect())
                .collect(),
        };
        let mut remaining = vertex_index;
        'outer: for path in std::iter::once(&mut compound.path)
            .chain(compound.additional_paths.iter_mut())
        {
            for vertex in path.iter_mut() {
                if remaining == 0 {
                    vertex.is_selected = true;
                    break 'outer;
                }
                remaining -= 1;
            }
        }

        let new_data = match resolve_deletable_vertex_context(&compound) {
            None => return Ok(false),
            Some(DeletableVertexContext::Update { paths, .. }) => {
                let mut paths = paths.into_iter();
                let Some(path) = paths.next() else {
                    // Last sub-path gone: the whole annotation goes.
                    ctx.perform(DeleteAnnotationAction::new(ctx.view_index, id));
                    self.selected_vertex = None;
                    return Ok(true);
                };
                AnnotationData::Polygon(PolygonData {
                    path,
                    additional_paths: paths.collect(),
                })
            }
            Some(DeletableVertexContext::DeleteVertex {
                sub_path_index,
                vertex_index,
            }) => {
                let mut polygon = polygon.clone();
                if sub_path_index == 0 {
                    polygon.path.remove(vertex_index);
                } else {
                    polygon.additional_paths[sub_path_index - 1].remove(vertex_index);
                }
                AnnotationData::Polygon(polygon)
            }
        };

        let mut action = UpdateAnnotationDataAction::new(ctx.view_index, id, new_data);
        if ctx.view.annotations.require(id)?.is_video() {
            action = action.at_keyframe(ctx.view.current_frame_index);
        }
        ctx.perform(action);
        self.selected_vertex = None;
        Ok(true)
    }
}

impl Tool for EditTool {
    fn name(&self) -> &'static str {
        "edit"
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn deactivate(&mut self, _ctx: &mut ToolContext) {
        self.drag = None;
        self.selected_vertex = None;
    }

    fn on_mouse_down(
        &mut self,
        event: &MouseEvent,
        ctx: &mut ToolContext,
    ) -> Result<(), EngineError> {
        if event.button != MouseButton::Left {
            return Ok(());
        }
        let point = ctx.view.camera.canvas_to_image(event.position);

        // A vertex of an already-selected annotation wins over body hits.
        for id in ctx.view.annotations.selected_ids().to_vec() {
            if let Some(vertex_index) =
                ctx.view
                    .find_vertex(id, point, VERTEX_GRAB_RANGE, ctx.registry)?
            {
                let annotation = ctx.view.annotations.require(id)?;
                let Some(original) = ctx.view.infer_current_data(annotation, ctx.registry)?
                else {
                    continue;
                };
                self.selected_vertex = Some((id, vertex_index));
                self.drag = Some(Drag::Vertex {
                    id,
                    original,
                    vertex_index,
                    moved: false,
                });
                return Ok(());
            }
        }

        match ctx.view.hit_test(point, ctx.registry)? {
            Some(id) => {
                ctx.view.annotations.select(id, event.shift)?;
                ctx.view.layer.mark_changed();
                let annotation = ctx.view.annotations.require(id)?;
                if let Some(original) = ctx.view.infer_current_data(annotation, ctx.registry)? {
                    self.drag = Some(Drag::Translate {
                        id,
                        original,
                        last: point,
                        moved: false,
                    });
                }
                self.selected_vertex = None;
            }
            None => {
                ctx.view.annotations.deselect_all();
                ctx.view.layer.mark_changed();
                self.selected_vertex = None;
            }
        }
        Ok(())
    }

    fn on_mouse_move(
        &mut self,
        event: &MouseEvent,
        ctx: &mut ToolContext,
    ) -> Result<(), EngineError> {
        let point = ctx.view.camera.canvas_to_image(event.position);
        match &mut self.drag {
            Some(Drag::Translate {
                id, last, moved, ..
            }) => {
                let id = *id;
                let delta = point - *last;
                *last = point;
                *moved = true;
                let annotation = ctx.view.annotations.require(id)?;
                let Some(mut data) = ctx.view.infer_current_data(annotation, ctx.registry)?
                else {
                    return Ok(());
                };
                ctx.registry.get(data.kind())?.translate(&mut data, delta);
                Self::write_live(ctx, id, data)?;
            }
            Some(Drag::Vertex {
                id,
                vertex_index,
                moved,
                ..
            }) => {
                let (id, vertex_index) = (*id, *vertex_index);
                *moved = true;
                let annotation = ctx.view.annotations.require(id)?;
                let Some(mut data) = ctx.view.infer_current_data(annotation, ctx.registry)?
                else {
                    return Ok(());
                };
                ctx.registry
                    .get(data.kind())?
                    .move_vertex(&mut data, vertex_index, point);
                Self::write_live(ctx, id, data)?;
            }
            None => {
                // Hover highlight.
                let hit = ctx.view.hit_test(point, ctx.registry)?;
                if ctx.view.annotations.highlighted() != hit {
                    ctx.view.annotations.highlight(hit);
                    ctx.view.layer.mark_changed();
                }
            }
        }
        Ok(())
    }

    fn on_mouse_up(
        &mut self,
        _event: &MouseEvent,
        ctx: &mut ToolContext,
    ) -> Result<(), EngineError> {
        self.finish_drag(ctx)
    }

    fn on_key_down(&mut self, event: &KeyEvent, ctx: &mut ToolContext) -> Result<(), EngineError> {
        match event.key.as_str() {
            "Delete" | "Backspace" => {
                if self.delete_selected_vertex(ctx)? {
                    return Ok(());
                }
                for id in ctx.view.annotations.selected_ids().to_vec() {
                    ctx.perform(DeleteAnnotationAction::new(ctx.view_index, id));
                }
            }
            "Escape" => {
                self.drag = None;
                self.selected_vertex = None;
                ctx.view.annotations.deselect_all();
                ctx.view.layer.mark_changed();
            }
            _ => {}
        }
        Ok(())
    }
}
