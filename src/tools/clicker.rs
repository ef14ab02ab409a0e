//! Click-to-segment tool.
//!
//! The user places positive and negative clicks; an external segmentation
//! model turns them into polygon geometry fed back through
//! [`ClickerTool::apply_inference`]. Every intermediate refinement is an
//! action tagged with one group, so single steps stay undoable while the
//! tool is open. Closing the tool folds the whole session into one history
//! entry: the group is stripped from the stacks and replaced by a single
//! create or update action recording the net effect.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::action::{Action, CreateAnnotationAction, EditContext, UpdateAnnotationDataAction};
use crate::error::EngineError;
use crate::geometry::ImagePoint;
use crate::model::{Annotation, AnnotationData, AnnotationId};
use crate::tools::{MouseButton, MouseEvent, Tool, ToolContext, ToolIntent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    /// The clicked point belongs to the object.
    Positive,
    /// The clicked point is background.
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Click {
    pub position: ImagePoint,
    pub kind: ClickKind,
}

/// Tool state shared with the transitioned action, so undoing the
/// committed session from outside the tool also resets a reopened tool.
#[derive(Debug, Default)]
struct ClickerState {
    current_annotation: Option<AnnotationId>,
}

struct Session {
    annotation_id: AnnotationId,
    class_id: u32,
    group: u64,
    /// Payload the session started from; `None` when the tool spawned the
    /// annotation itself.
    initial_data: Option<AnnotationData>,
    clicks: Vec<Click>,
    /// Whether the annotation has been created in the view yet.
    spawned: bool,
}

#[derive(Default)]
pub struct ClickerTool {
    session: Option<Session>,
    state: Rc<RefCell<ClickerState>>,
}

impl ClickerTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a session refining an existing annotation.
    pub fn start_edit(&mut self, ctx: &mut ToolContext, id: AnnotationId) -> Result<(), EngineError> {
        let annotation = ctx.view.annotations.require(id)?;
        let initial = ctx.view.infer_current_data(annotation, ctx.registry)?;
        let class_id = annotation.class_id;
        self.session = Some(Session {
            annotation_id: id,
            class_id,
            group: ctx.actions.create_group(),
            initial_data: initial,
            clicks: Vec::new(),
            spawned: true,
        });
        self.state.borrow_mut().current_annotation = Some(id);
        Ok(())
    }

    /// Begin a session that will spawn a new annotation with the given id
    /// once the first inference arrives.
    pub fn start_new(&mut self, ctx: &mut ToolContext, id: AnnotationId, class_id: u32) {
        self.session = Some(Session {
            annotation_id: id,
            class_id,
            group: ctx.actions.create_group(),
            initial_data: None,
            clicks: Vec::new(),
            spawned: false,
        });
        self.state.borrow_mut().current_annotation = Some(id);
    }

    /// The clicks of the running session, for the inference backend.
    pub fn clicks(&self) -> &[Click] {
        self.session.as_ref().map(|s| s.clicks.as_slice()).unwrap_or(&[])
    }

    pub fn current_annotation(&self) -> Option<AnnotationId> {
        self.state.borrow().current_annotation
    }

    /// Feed the model's geometry for the current click set back in. Each
    /// call is one grouped, individually undoable refinement step.
    pub fn apply_inference(
        &mut self,
        ctx: &mut ToolContext,
        data: AnnotationData,
    ) -> Result<(), EngineError> {
        let Some(session) = &mut self.session else {
            return Ok(());
        };
        if !session.spawned {
            session.spawned = true;
            let annotation = Annotation::image(session.annotation_id, session.class_id, data);
            ctx.perform_in_group(
                CreateAnnotationAction::new(ctx.view_index, annotation),
                session.group,
            );
        } else {
            ctx.perform_in_group(
                UpdateAnnotationDataAction::new(ctx.view_index, session.annotation_id, data),
                session.group,
            );
        }
        Ok(())
    }

    /// Fold the finished session into a single history entry.
    ///
    /// Returns whether an action was transitioned. Intermediate steps leave
    /// the history either way; only the geometry of the main annotation is
    /// captured, sub-annotation edits made during the session keep their
    /// own history entries.
    pub fn transition_to_action(&mut self, ctx: &mut ToolContext) -> Result<bool, EngineError> {
        let Some(session) = self.session.take() else {
            return Ok(false);
        };
        self.state.borrow_mut().current_annotation = None;

        // canUndo must be read before removal invalidates it.
        let had_steps = ctx.actions.group_can_undo(session.group);
        ctx.actions.remove_group(session.group);
        if !had_steps {
            return Ok(false);
        }
        let Some(annotation) = ctx.view.annotations.get(session.annotation_id) else {
            return Ok(false);
        };

        let transition = match session.initial_data {
            Some(initial) => TransitionAction::update(
                ctx.view_index,
                session.annotation_id,
                initial,
                Rc::clone(&self.state),
            ),
            None => TransitionAction::create(
                ctx.view_index,
                annotation.clone(),
                Rc::clone(&self.state),
            ),
        };
        // The session's effect already happened step by step, so the
        // folded action is recorded, not performed.
        ctx.intents.push(ToolIntent::Record {
            action: Box::new(transition),
            group: None,
        });
        debug!(
            "clicker session folded into one action for annotation {}",
            session.annotation_id
        );
        Ok(true)
    }
}

impl Tool for ClickerTool {
    fn name(&self) -> &'static str {
        "clicker"
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn deactivate(&mut self, ctx: &mut ToolContext) {
        if let Err(err) = self.transition_to_action(ctx) {
            log::warn!("clicker transition failed on deactivate: {err}");
        }
    }

    fn on_mouse_down(
        &mut self,
        event: &MouseEvent,
        ctx: &mut ToolContext,
    ) -> Result<(), EngineError> {
        let Some(session) = &mut self.session else {
            return Ok(());
        };
        let kind = match event.button {
            MouseButton::Left if !event.alt => ClickKind::Positive,
            MouseButton::Left | MouseButton::Right => ClickKind::Negative,
            MouseButton::Middle => return Ok(()),
        };
        session.clicks.push(Click {
            position: ctx.view.camera.canvas_to_image(event.position),
            kind,
        });
        Ok(())
    }
}

/// The single action a committed clicker session leaves in the history.
///
/// Undo additionally resets the tool's shared state when it still points
/// at the same annotation, so a reopened tool does not keep refining
/// geometry that was just undone.
struct TransitionAction {
    view_index: usize,
    id: AnnotationId,
    state: Rc<RefCell<ClickerState>>,
    kind: TransitionKind,
}

enum TransitionKind {
    /// The session spawned the annotation; undo removes it.
    Create { annotation: Option<Annotation> },
    /// The session refined existing geometry; undo restores the initial
    /// payload (held here between revert and re-apply).
    Update { data: AnnotationData },
}

impl TransitionAction {
    fn create(view_index: usize, annotation: Annotation, state: Rc<RefCell<ClickerState>>) -> Self {
        Self {
            view_index,
            id: annotation.id,
            state,
            kind: TransitionKind::Create {
                annotation: Some(annotation),
            },
        }
    }

    fn update(
        view_index: usize,
        id: AnnotationId,
        initial: AnnotationData,
        state: Rc<RefCell<ClickerState>>,
    ) -> Self {
        Self {
            view_index,
            id,
            state,
            kind: TransitionKind::Update { data: initial },
        }
    }

    fn reset_tool_state(&self) {
        let mut state = self.state.borrow_mut();
        if state.current_annotation == Some(self.id) {
            state.current_annotation = None;
        }
    }
}

impl Action for TransitionAction {
    fn apply(&mut self, ctx: &mut EditContext) -> Result<bool, EngineError> {
        let view = ctx.view(self.view_index)?;
        match &mut self.kind {
            TransitionKind::Create { annotation } => {
                let Some(annotation) = annotation.take() else {
                    return Ok(false);
                };
                view.annotations.add(annotation);
                Ok(true)
            }
            TransitionKind::Update { data } => {
                let id = self.id;
                let annotation = view.annotations.require_mut(id)?;
                let Some(live) = annotation.image_data_mut() else {
                    return Ok(false);
                };
                std::mem::swap(live, data);
                view.annotations.update(id, |_| {})?;
                Ok(true)
            }
        }
    }

    fn revert(&mut self, ctx: &mut EditContext) -> Result<bool, EngineError> {
        let view = ctx.view(self.view_index)?;
        let reverted = match &mut self.kind {
            TransitionKind::Create { annotation } => match view.annotations.remove(self.id) {
                Some(removed) => {
                    *annotation = Some(removed);
                    true
                }
                None => false,
            },
            TransitionKind::Update { data } => {
                let id = self.id;
                let annotation = view.annotations.require_mut(id)?;
                match annotation.image_data_mut() {
                    Some(live) => {
                        std::mem::swap(live, data);
                        view.annotations.update(id, |_| {})?;
                        true
                    }
                    None => false,
                }
            }
        };
        if reverted {
            self.reset_tool_state();
        }
        Ok(reverted)
    }
}
