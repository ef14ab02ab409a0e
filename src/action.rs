//! Undoable actions and the do/undo/redo history.
//!
//! Every mutation of annotation state goes through an [`Action`] performed
//! by the [`ActionManager`]. Actions receive an [`EditContext`] giving them
//! mutable access to all views, so an action recorded against one view can
//! still be undone after the user switched to another.

use log::{debug, warn};

use crate::callback::{CallbackHandle, CallbackHandleCollection, CallbackStatus};
use crate::error::EngineError;
use crate::model::{Annotation, AnnotationData, AnnotationId, AnnotationPayload};
use crate::view::View;

/// Identifier for a group of related actions (e.g. all steps of one
/// clicker session) that can be bulk-removed from the history.
pub type GroupId = u64;

/// Mutable state an action operates on.
pub struct EditContext<'a> {
    pub views: &'a mut [View],
    pub active_view: usize,
}

impl EditContext<'_> {
    pub fn view(&mut self, index: usize) -> Result<&mut View, EngineError> {
        self.views
            .get_mut(index)
            .ok_or(EngineError::ViewNotFound { index })
    }

    pub fn active_view(&mut self) -> Result<&mut View, EngineError> {
        self.view(self.active_view)
    }
}

/// A reversible edit.
///
/// `apply` and `revert` return `Ok(false)` when the edit turned out to be
/// a no-op; the manager then leaves the history stacks untouched.
pub trait Action {
    fn apply(&mut self, ctx: &mut EditContext) -> Result<bool, EngineError>;
    fn revert(&mut self, ctx: &mut EditContext) -> Result<bool, EngineError>;
}

/// History change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionEvent {
    Performed,
    Recorded,
    Undone,
    Redone,
    Cleared,
}

struct HistoryEntry {
    group: Option<GroupId>,
    action: Box<dyn Action>,
}

/// The do/undo/redo history of one editor.
#[derive(Default)]
pub struct ActionManager {
    done: Vec<HistoryEntry>,
    undone: Vec<HistoryEntry>,
    next_group_id: GroupId,
    observers: CallbackHandleCollection<ActionEvent>,
}

impl ActionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to history changes.
    pub fn on_action(
        &self,
        callback: impl FnMut(&ActionEvent) -> CallbackStatus + 'static,
    ) -> CallbackHandle {
        self.observers.add(callback)
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    /// Apply an action and push it onto the done stack. An action that
    /// reports `Ok(false)` changed nothing and is not recorded. Performing
    /// always empties the redo stack.
    pub fn perform(
        &mut self,
        action: Box<dyn Action>,
        ctx: &mut EditContext,
    ) -> Result<bool, EngineError> {
        self.perform_in_group(action, ctx, None)
    }

    /// `perform`, tagging the history entry with a group id.
    pub fn perform_in_group(
        &mut self,
        mut action: Box<dyn Action>,
        ctx: &mut EditContext,
        group: Option<GroupId>,
    ) -> Result<bool, EngineError> {
        if !action.apply(ctx)? {
            return Ok(false);
        }
        self.done.push(HistoryEntry { group, action });
        self.undone.clear();
        self.observers.call(&ActionEvent::Performed);
        Ok(true)
    }

    /// Push an already-applied action onto the done stack without running
    /// it (e.g. a drag recorded once the pointer is released).
    pub fn record(&mut self, action: Box<dyn Action>, group: Option<GroupId>) {
        self.done.push(HistoryEntry { group, action });
        self.undone.clear();
        self.observers.call(&ActionEvent::Recorded);
    }

    /// Revert the most recent done action. Returns `false` when there was
    /// nothing to undo or the action reported itself a no-op.
    pub fn undo(&mut self, ctx: &mut EditContext) -> Result<bool, EngineError> {
        let Some(mut entry) = self.done.pop() else {
            return Ok(false);
        };
        let reverted = entry.action.revert(ctx)?;
        if reverted {
            self.undone.push(entry);
        } else {
            // The action claims nothing changed; put it back so the
            // history still matches the document state.
            warn!("undo reported no-op, keeping the entry on the done stack");
            self.done.push(entry);
        }
        self.observers.call(&ActionEvent::Undone);
        Ok(reverted)
    }

    /// Re-apply the most recently undone action.
    pub fn redo(&mut self, ctx: &mut EditContext) -> Result<bool, EngineError> {
        let Some(mut entry) = self.undone.pop() else {
            return Ok(false);
        };
        let applied = entry.action.apply(ctx)?;
        if applied {
            self.done.push(entry);
        } else {
            warn!("redo reported no-op, keeping the entry on the redo stack");
            self.undone.push(entry);
        }
        self.observers.call(&ActionEvent::Redone);
        Ok(applied)
    }

    /// Drop the whole history (item or view switch).
    pub fn clear(&mut self) {
        if self.done.is_empty() && self.undone.is_empty() {
            return;
        }
        debug!(
            "clearing action history ({} done, {} undone)",
            self.done.len(),
            self.undone.len()
        );
        self.done.clear();
        self.undone.clear();
        self.observers.call(&ActionEvent::Cleared);
    }

    // ========================================================================
    // Groups
    // ========================================================================

    /// A fresh group id for tagging related actions.
    pub fn create_group(&mut self) -> GroupId {
        let id = self.next_group_id;
        self.next_group_id += 1;
        id
    }

    /// Whether any action of the group is still on the done stack.
    pub fn group_can_undo(&self, group: GroupId) -> bool {
        self.done.iter().any(|entry| entry.group == Some(group))
    }

    /// Strip every action of the group from both stacks without running
    /// anything. Used when a grouped interaction is committed and must no
    /// longer be individually undoable.
    pub fn remove_group(&mut self, group: GroupId) {
        self.done.retain(|entry| entry.group != Some(group));
        self.undone.retain(|entry| entry.group != Some(group));
    }
}

impl std::fmt::Debug for ActionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionManager")
            .field("done", &self.done.len())
            .field("undone", &self.undone.len())
            .finish()
    }
}

// ============================================================================
// Built-in actions
// ============================================================================

/// Adds an annotation to a view; undo removes it again.
pub struct CreateAnnotationAction {
    view_index: usize,
    annotation: Option<Annotation>,
    id: AnnotationId,
}

impl CreateAnnotationAction {
    pub fn new(view_index: usize, annotation: Annotation) -> Self {
        let id = annotation.id;
        Self {
            view_index,
            annotation: Some(annotation),
            id,
        }
    }
}

impl Action for CreateAnnotationAction {
    fn apply(&mut self, ctx: &mut EditContext) -> Result<bool, EngineError> {
        let view = ctx.view(self.view_index)?;
        let Some(annotation) = self.annotation.take() else {
            return Ok(false);
        };
        view.annotations.add(annotation);
        Ok(true)
    }

    fn revert(&mut self, ctx: &mut EditContext) -> Result<bool, EngineError> {
        let view = ctx.view(self.view_index)?;
        match view.annotations.remove(self.id) {
            Some(annotation) => {
                self.annotation = Some(annotation);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Removes an annotation; undo restores it.
pub struct DeleteAnnotationAction {
    view_index: usize,
    id: AnnotationId,
    removed: Option<Annotation>,
}

impl DeleteAnnotationAction {
    pub fn new(view_index: usize, id: AnnotationId) -> Self {
        Self {
            view_index,
            id,
            removed: None,
        }
    }
}

impl Action for DeleteAnnotationAction {
    fn apply(&mut self, ctx: &mut EditContext) -> Result<bool, EngineError> {
        let view = ctx.view(self.view_index)?;
        match view.annotations.remove(self.id) {
            Some(annotation) => {
                self.removed = Some(annotation);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn revert(&mut self, ctx: &mut EditContext) -> Result<bool, EngineError> {
        let view = ctx.view(self.view_index)?;
        let Some(annotation) = self.removed.take() else {
            return Ok(false);
        };
        view.annotations.add(annotation);
        Ok(true)
    }
}

/// Swaps an annotation's payload for a new one; undo swaps back. On video
/// annotations the swap targets one keyframe.
pub struct UpdateAnnotationDataAction {
    view_index: usize,
    id: AnnotationId,
    /// Keyframe index for video annotations, `None` for image payloads.
    frame_index: Option<u32>,
    data: AnnotationData,
    /// Set when `apply` authored a fresh keyframe instead of replacing one,
    /// so `revert` removes it again.
    created_keyframe: bool,
}

impl UpdateAnnotationDataAction {
    pub fn new(view_index: usize, id: AnnotationId, data: AnnotationData) -> Self {
        Self {
            view_index,
            id,
            frame_index: None,
            data,
            created_keyframe: false,
        }
    }

    pub fn at_keyframe(mut self, frame_index: u32) -> Self {
        self.frame_index = Some(frame_index);
        self
    }

    /// Swap stored and live payloads. Symmetric, so it serves both apply
    /// and revert when a payload already exists.
    fn swap(&mut self, ctx: &mut EditContext, authoring: bool) -> Result<bool, EngineError> {
        let view = ctx.view(self.view_index)?;
        let id = self.id;
        let annotation = view.annotations.require_mut(id)?;
        match (&mut annotation.payload, self.frame_index) {
            (AnnotationPayload::Image(live), None) => {
                if *live == self.data {
                    return Ok(false);
                }
                std::mem::swap(live, &mut self.data);
            }
            (AnnotationPayload::Video(video), Some(frame_index)) => {
                match video.frames.get_mut(&frame_index) {
                    Some(live) => {
                        if *live == self.data {
                            return Ok(false);
                        }
                        std::mem::swap(live, &mut self.data);
                    }
                    None if authoring => {
                        // Not yet a keyframe: the update authors one.
                        let data = self.data.clone();
                        video.set_keyframe(frame_index, data);
                        self.created_keyframe = true;
                    }
                    None => return Ok(false),
                }
            }
            _ => {
                return Err(EngineError::InvalidPayload {
                    message: "annotation payload shape does not match the update".to_string(),
                });
            }
        }
        view.annotations.update(id, |_| {})?;
        Ok(true)
    }
}

impl Action for UpdateAnnotationDataAction {
    fn apply(&mut self, ctx: &mut EditContext) -> Result<bool, EngineError> {
        self.swap(ctx, true)
    }

    fn revert(&mut self, ctx: &mut EditContext) -> Result<bool, EngineError> {
        if self.created_keyframe {
            let frame_index = self.frame_index.unwrap_or_default();
            let view = ctx.view(self.view_index)?;
            let id = self.id;
            let annotation = view.annotations.require_mut(id)?;
            if let AnnotationPayload::Video(video) = &mut annotation.payload {
                video.remove_keyframe(frame_index);
            }
            self.created_keyframe = false;
            view.annotations.update(id, |_| {})?;
            return Ok(true);
        }
        self.swap(ctx, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ImageRect;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn views() -> Vec<View> {
        vec![View::new(1, (100, 100), (100, 100))]
    }

    fn boxed(id: AnnotationId, x: f32) -> Annotation {
        Annotation::image(
            id,
            1,
            AnnotationData::BoundingBox(ImageRect::new(x, 0.0, 10.0, 10.0)),
        )
    }

    fn ctx(views: &mut Vec<View>) -> EditContext<'_> {
        EditContext {
            views,
            active_view: 0,
        }
    }

    #[test]
    fn test_perform_undo_redo_round_trip() {
        let mut views = views();
        let mut manager = ActionManager::new();

        manager
            .perform(
                Box::new(CreateAnnotationAction::new(0, boxed(1, 0.0))),
                &mut ctx(&mut views),
            )
            .unwrap();
        assert!(views[0].annotations.contains(1));
        assert!(manager.can_undo());

        assert!(manager.undo(&mut ctx(&mut views)).unwrap());
        assert!(!views[0].annotations.contains(1));
        assert!(manager.can_redo());

        assert!(manager.redo(&mut ctx(&mut views)).unwrap());
        assert!(views[0].annotations.contains(1));
    }

    #[test]
    fn test_noop_apply_leaves_history_untouched() {
        let mut views = views();
        let mut manager = ActionManager::new();

        // Deleting a missing annotation changes nothing.
        let performed = manager
            .perform(
                Box::new(DeleteAnnotationAction::new(0, 99)),
                &mut ctx(&mut views),
            )
            .unwrap();
        assert!(!performed);
        assert!(!manager.can_undo());
    }

    #[test]
    fn test_perform_clears_redo_stack() {
        let mut views = views();
        let mut manager = ActionManager::new();
        manager
            .perform(
                Box::new(CreateAnnotationAction::new(0, boxed(1, 0.0))),
                &mut ctx(&mut views),
            )
            .unwrap();
        manager.undo(&mut ctx(&mut views)).unwrap();
        assert!(manager.can_redo());

        manager
            .perform(
                Box::new(CreateAnnotationAction::new(0, boxed(2, 20.0))),
                &mut ctx(&mut views),
            )
            .unwrap();
        assert!(!manager.can_redo());
    }

    #[test]
    fn test_update_action_swaps_and_swaps_back() {
        let mut views = views();
        views[0].annotations.add(boxed(1, 0.0));
        let mut manager = ActionManager::new();

        let update = UpdateAnnotationDataAction::new(
            0,
            1,
            AnnotationData::BoundingBox(ImageRect::new(50.0, 0.0, 10.0, 10.0)),
        );
        manager
            .perform(Box::new(update), &mut ctx(&mut views))
            .unwrap();
        assert_eq!(
            views[0].annotations.get(1).unwrap().image_data(),
            Some(&AnnotationData::BoundingBox(ImageRect::new(
                50.0, 0.0, 10.0, 10.0
            )))
        );

        manager.undo(&mut ctx(&mut views)).unwrap();
        assert_eq!(
            views[0].annotations.get(1).unwrap().image_data(),
            Some(&AnnotationData::BoundingBox(ImageRect::new(
                0.0, 0.0, 10.0, 10.0
            )))
        );
    }

    #[test]
    fn test_group_removal_spares_unrelated_entries() {
        let mut views = views();
        let mut manager = ActionManager::new();
        let group = manager.create_group();

        manager
            .perform(
                Box::new(CreateAnnotationAction::new(0, boxed(1, 0.0))),
                &mut ctx(&mut views),
            )
            .unwrap();
        manager
            .perform_in_group(
                Box::new(CreateAnnotationAction::new(0, boxed(2, 20.0))),
                &mut ctx(&mut views),
                Some(group),
            )
            .unwrap();
        assert!(manager.group_can_undo(group));

        manager.remove_group(group);
        assert!(!manager.group_can_undo(group));
        // The ungrouped action remains undoable.
        assert!(manager.undo(&mut ctx(&mut views)).unwrap());
        assert!(!views[0].annotations.contains(1));
        // The grouped annotation stays; its action left the history.
        assert!(views[0].annotations.contains(2));
    }

    #[test]
    fn test_events_fire_per_operation() {
        let mut views = views();
        let mut manager = ActionManager::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_cb = Rc::clone(&seen);
        let _handle = manager.on_action(move |event| {
            seen_cb.borrow_mut().push(*event);
            CallbackStatus::Continue
        });

        manager
            .perform(
                Box::new(CreateAnnotationAction::new(0, boxed(1, 0.0))),
                &mut ctx(&mut views),
            )
            .unwrap();
        manager.undo(&mut ctx(&mut views)).unwrap();
        manager.redo(&mut ctx(&mut views)).unwrap();
        manager.clear();

        assert_eq!(
            *seen.borrow(),
            vec![
                ActionEvent::Performed,
                ActionEvent::Undone,
                ActionEvent::Redone,
                ActionEvent::Cleared,
            ]
        );
    }
}
