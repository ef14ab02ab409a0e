//! Top-level editor: views, history, tools and registries in one place.
//!
//! The editor is the seam the embedding UI talks to. It routes pointer and
//! keyboard events to the active tool, drains the tool's queued history
//! operations, and runs actions with a split borrow so they can reach any
//! view through [`EditContext`].

use log::{debug, warn};

use crate::action::{Action, ActionManager, EditContext};
use crate::config::RenderConfig;
use crate::error::EngineError;
use crate::layer::Layer;
use crate::render::RendererRegistry;
use crate::serializer::SerializerRegistry;
use crate::tools::{KeyEvent, MouseEvent, Tool, ToolContext, ToolIntent, ToolManager};
use crate::view::View;

pub struct Editor {
    views: Vec<View>,
    active_view: usize,
    actions: ActionManager,
    tools: ToolManager,
    renderers: RendererRegistry,
    serializers: SerializerRegistry,
    config: RenderConfig,
    intents: Vec<ToolIntent>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl Editor {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            views: Vec::new(),
            active_view: 0,
            actions: ActionManager::new(),
            tools: ToolManager::with_defaults(),
            renderers: RendererRegistry::with_defaults(),
            serializers: SerializerRegistry::with_defaults(),
            config,
            intents: Vec::new(),
        }
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn add_view(&mut self, view: View) -> usize {
        self.views.push(view);
        self.views.len() - 1
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn view(&self, index: usize) -> Result<&View, EngineError> {
        self.views
            .get(index)
            .ok_or(EngineError::ViewNotFound { index })
    }

    pub fn view_mut(&mut self, index: usize) -> Result<&mut View, EngineError> {
        self.views
            .get_mut(index)
            .ok_or(EngineError::ViewNotFound { index })
    }

    pub fn active_view_index(&self) -> usize {
        self.active_view
    }

    pub fn active_view(&self) -> Result<&View, EngineError> {
        self.view(self.active_view)
    }

    pub fn active_view_mut(&mut self) -> Result<&mut View, EngineError> {
        self.view_mut(self.active_view)
    }

    /// Switch the active view. The undo history is tied to the view it was
    /// authored on, so switching clears it.
    pub fn set_active_view(&mut self, index: usize) -> Result<(), EngineError> {
        if index >= self.views.len() {
            return Err(EngineError::ViewNotFound { index });
        }
        if index != self.active_view {
            self.active_view = index;
            self.actions.clear();
            debug!("active view set to {index}");
        }
        Ok(())
    }

    // ========================================================================
    // History
    // ========================================================================

    pub fn actions(&self) -> &ActionManager {
        &self.actions
    }

    pub fn can_undo(&self) -> bool {
        self.actions.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.actions.can_redo()
    }

    pub fn perform(&mut self, action: Box<dyn Action>) -> Result<bool, EngineError> {
        let mut ctx = EditContext {
            views: &mut self.views,
            active_view: self.active_view,
        };
        self.actions.perform(action, &mut ctx)
    }

    pub fn undo(&mut self) -> Result<bool, EngineError> {
        let mut ctx = EditContext {
            views: &mut self.views,
            active_view: self.active_view,
        };
        self.actions.undo(&mut ctx)
    }

    pub fn redo(&mut self) -> Result<bool, EngineError> {
        let mut ctx = EditContext {
            views: &mut self.views,
            active_view: self.active_view,
        };
        self.actions.redo(&mut ctx)
    }

    // ========================================================================
    // Tools
    // ========================================================================

    pub fn active_tool(&self) -> Option<&'static str> {
        self.tools.active_tool()
    }

    /// A registered tool by name, for tool-specific configuration such as
    /// the brush target or a clicker session.
    pub fn tool_mut(&mut self, name: &str) -> Option<&mut (dyn Tool + 'static)> {
        self.tools.get_mut(name)
    }

    /// Switch tools. Deactivation may queue history operations (the clicker
    /// folds its session), so the intent queue is drained afterwards.
    pub fn activate_tool(&mut self, name: &str) -> Result<bool, EngineError> {
        let active_view = self.active_view;
        let Some(view) = self.views.get_mut(active_view) else {
            return Err(EngineError::ViewNotFound { index: active_view });
        };
        let mut ctx = ToolContext {
            view_index: active_view,
            view,
            actions: &mut self.actions,
            registry: &self.renderers,
            config: &self.config,
            intents: &mut self.intents,
        };
        let switched = self.tools.activate(name, &mut ctx);
        self.drain_intents()?;
        Ok(switched)
    }

    pub fn mouse_down(&mut self, event: &MouseEvent) -> Result<(), EngineError> {
        self.route(|tools, event, ctx| tools.mouse_down(event, ctx), event)
    }

    pub fn mouse_move(&mut self, event: &MouseEvent) -> Result<(), EngineError> {
        self.route(|tools, event, ctx| tools.mouse_move(event, ctx), event)
    }

    pub fn mouse_up(&mut self, event: &MouseEvent) -> Result<(), EngineError> {
        self.route(|tools, event, ctx| tools.mouse_up(event, ctx), event)
    }

    pub fn key_down(&mut self, event: &KeyEvent) -> Result<(), EngineError> {
        let active_view = self.active_view;
        let Some(view) = self.views.get_mut(active_view) else {
            return Err(EngineError::ViewNotFound { index: active_view });
        };
        let mut ctx = ToolContext {
            view_index: active_view,
            view,
            actions: &mut self.actions,
            registry: &self.renderers,
            config: &self.config,
            intents: &mut self.intents,
        };
        self.tools.key_down(event, &mut ctx)?;
        self.drain_intents()
    }

    fn route<F>(&mut self, dispatch: F, event: &MouseEvent) -> Result<(), EngineError>
    where
        F: FnOnce(&mut ToolManager, &MouseEvent, &mut ToolContext) -> Result<(), EngineError>,
    {
        let active_view = self.active_view;
        let Some(view) = self.views.get_mut(active_view) else {
            return Err(EngineError::ViewNotFound { index: active_view });
        };
        let mut ctx = ToolContext {
            view_index: active_view,
            view,
            actions: &mut self.actions,
            registry: &self.renderers,
            config: &self.config,
            intents: &mut self.intents,
        };
        dispatch(&mut self.tools, event, &mut ctx)?;
        self.drain_intents()
    }

    /// Run the history operations queued by the last tool event.
    fn drain_intents(&mut self) -> Result<(), EngineError> {
        let intents = std::mem::take(&mut self.intents);
        let mut ctx = EditContext {
            views: &mut self.views,
            active_view: self.active_view,
        };
        for intent in intents {
            match intent {
                ToolIntent::Perform { action, group } => {
                    if let Err(err) = self.actions.perform_in_group(action, &mut ctx, group) {
                        warn!("queued action failed: {err}");
                    }
                }
                ToolIntent::Record { action, group } => {
                    self.actions.record(action, group);
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Rendering and registries
    // ========================================================================

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn renderers(&self) -> &RendererRegistry {
        &self.renderers
    }

    pub fn serializers(&self) -> &SerializerRegistry {
        &self.serializers
    }

    /// Render the active view and hand back its filled layer, ready for
    /// the UI to flush.
    pub fn render(&mut self) -> Result<&mut Layer, EngineError> {
        let Some(view) = self.views.get_mut(self.active_view) else {
            return Err(EngineError::ViewNotFound {
                index: self.active_view,
            });
        };
        view.render(&self.renderers, &self.config)?;
        Ok(&mut view.layer)
    }

    /// Move the active view's playhead.
    pub fn set_current_frame(&mut self, frame_index: u32) -> Result<(), EngineError> {
        self.active_view_mut()?.set_current_frame(frame_index);
        Ok(())
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("views", &self.views.len())
            .field("active_view", &self.active_view)
            .field("tools", &self.tools)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::CreateAnnotationAction;
    use crate::geometry::{Point, Rectangle};
    use crate::model::{Annotation, AnnotationData};
    use crate::tools::BrushTool;

    fn box_annotation(id: u64) -> Annotation {
        Annotation::image(
            id,
            1,
            AnnotationData::BoundingBox(Rectangle::new(10.0, 10.0, 20.0, 20.0)),
        )
    }

    fn editor_with_view() -> Editor {
        let mut editor = Editor::default();
        editor.add_view(View::new(1, (100, 100), (100, 100)));
        editor
    }

    #[test]
    fn test_perform_undo_redo_through_editor() {
        let mut editor = editor_with_view();
        editor
            .perform(Box::new(CreateAnnotationAction::new(0, box_annotation(1))))
            .unwrap();
        assert!(editor.active_view().unwrap().annotations.get(1).is_some());

        assert!(editor.undo().unwrap());
        assert!(editor.active_view().unwrap().annotations.get(1).is_none());
        assert!(editor.redo().unwrap());
        assert!(editor.active_view().unwrap().annotations.get(1).is_some());
    }

    #[test]
    fn test_switching_views_clears_history() {
        let mut editor = editor_with_view();
        editor.add_view(View::new(2, (50, 50), (50, 50)));
        editor
            .perform(Box::new(CreateAnnotationAction::new(0, box_annotation(1))))
            .unwrap();
        assert!(editor.can_undo());

        editor.set_active_view(1).unwrap();
        assert!(!editor.can_undo());
        // The annotation itself stays; only the history is dropped.
        assert!(editor.view(0).unwrap().annotations.get(1).is_some());
    }

    #[test]
    fn test_event_routing_selects_and_drags() {
        let mut editor = editor_with_view();
        editor
            .perform(Box::new(CreateAnnotationAction::new(0, box_annotation(1))))
            .unwrap();

        // Click inside the box selects it, drag moves it, release records
        // one undoable entry.
        editor
            .mouse_down(&MouseEvent::left(Point::new(20.0, 20.0)))
            .unwrap();
        assert_eq!(editor.active_view().unwrap().annotations.selected_ids(), &[1]);
        editor
            .mouse_move(&MouseEvent::left(Point::new(30.0, 25.0)))
            .unwrap();
        editor
            .mouse_up(&MouseEvent::left(Point::new(30.0, 25.0)))
            .unwrap();

        let data = editor
            .active_view()
            .unwrap()
            .annotations
            .get(1)
            .unwrap()
            .image_data()
            .unwrap()
            .clone();
        let AnnotationData::BoundingBox(rect) = data else {
            panic!("expected bounding box");
        };
        assert_eq!((rect.x, rect.y), (20.0, 15.0));

        assert!(editor.undo().unwrap());
        let data = editor
            .active_view()
            .unwrap()
            .annotations
            .get(1)
            .unwrap()
            .image_data()
            .unwrap()
            .clone();
        let AnnotationData::BoundingBox(rect) = data else {
            panic!("expected bounding box");
        };
        assert_eq!((rect.x, rect.y), (10.0, 10.0));
    }

    #[test]
    fn test_brush_stroke_through_editor() {
        let mut editor = editor_with_view();
        editor
            .perform(Box::new(CreateAnnotationAction::new(
                0,
                Annotation::image(
                    7,
                    1,
                    AnnotationData::Mask(crate::model::MaskData::default()),
                ),
            )))
            .unwrap();

        assert!(editor.activate_tool("brush").unwrap());
        let brush = editor
            .tool_mut("brush")
            .and_then(|tool| tool.as_any_mut().downcast_mut::<BrushTool>())
            .unwrap();
        brush.set_target(7);
        brush.set_radius(3.0);

        editor
            .mouse_down(&MouseEvent::left(Point::new(40.0, 40.0)))
            .unwrap();
        editor
            .mouse_up(&MouseEvent::left(Point::new(40.0, 40.0)))
            .unwrap();

        let raster = editor.active_view().unwrap().raster.as_ref().unwrap();
        assert_eq!(raster.get(40, 40), Some(1));
        assert!(editor.undo().unwrap());
        let raster = editor.active_view().unwrap().raster.as_ref().unwrap();
        assert_eq!(raster.get(40, 40), Some(0));
    }

    #[test]
    fn test_render_fills_layer() {
        let mut editor = editor_with_view();
        editor
            .perform(Box::new(CreateAnnotationAction::new(0, box_annotation(1))))
            .unwrap();
        let layer = editor.render().unwrap();
        assert!(!layer.flush().is_empty());
    }

    #[test]
    fn test_events_without_views_error() {
        let mut editor = Editor::default();
        assert!(matches!(
            editor.mouse_down(&MouseEvent::left(Point::new(0.0, 0.0))),
            Err(EngineError::ViewNotFound { index: 0 })
        ));
    }
}
