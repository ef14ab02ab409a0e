//! Per-view annotation store with selection, highlight and change events.

use std::collections::HashMap;

use log::debug;

use crate::callback::{CallbackHandle, CallbackHandleCollection, CallbackStatus};
use crate::error::EngineError;
use crate::model::{Annotation, AnnotationId};

/// What happened to an annotation in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationChange {
    Added(AnnotationId),
    Updated(AnnotationId),
    Removed(AnnotationId),
    SelectionChanged,
    Cleared,
}

/// Owns the annotations of one view.
///
/// `ids` keeps the render order: annotations without a z-index first (they
/// render below everything), then by z-index descending. Iteration for hit
/// testing walks the same order backwards so the topmost annotation wins.
#[derive(Default)]
pub struct AnnotationManager {
    annotations: HashMap<AnnotationId, Annotation>,
    ids: Vec<AnnotationId>,
    selected: Vec<AnnotationId>,
    highlighted: Option<AnnotationId>,
    on_change: CallbackHandleCollection<AnnotationChange>,
}

impl AnnotationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to store changes.
    pub fn on_change(
        &self,
        callback: impl FnMut(&AnnotationChange) -> CallbackStatus + 'static,
    ) -> CallbackHandle {
        self.on_change.add(callback)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.get(&id)
    }

    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.annotations.get_mut(&id)
    }

    pub fn require(&self, id: AnnotationId) -> Result<&Annotation, EngineError> {
        self.annotations
            .get(&id)
            .ok_or(EngineError::AnnotationNotFound { id })
    }

    pub fn require_mut(&mut self, id: AnnotationId) -> Result<&mut Annotation, EngineError> {
        self.annotations
            .get_mut(&id)
            .ok_or(EngineError::AnnotationNotFound { id })
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.annotations.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Ids in render order (bottom to top).
    pub fn ids(&self) -> &[AnnotationId] {
        &self.ids
    }

    /// Annotations in render order.
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.ids.iter().filter_map(|id| self.annotations.get(id))
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Insert or replace an annotation and re-sort the render order.
    pub fn add(&mut self, annotation: Annotation) {
        let id = annotation.id;
        let replaced = self.annotations.insert(id, annotation).is_some();
        if !replaced {
            self.ids.push(id);
        }
        self.sort_ids();
        debug!("annotation {id} {}", if replaced { "replaced" } else { "added" });
        self.on_change.call(&if replaced {
            AnnotationChange::Updated(id)
        } else {
            AnnotationChange::Added(id)
        });
    }

    /// Remove an annotation, dropping any selection or highlight on it.
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let removed = self.annotations.remove(&id);
        if removed.is_some() {
            self.ids.retain(|existing| *existing != id);
            self.selected.retain(|existing| *existing != id);
            if self.highlighted == Some(id) {
                self.highlighted = None;
            }
            debug!("annotation {id} removed");
            self.on_change.call(&AnnotationChange::Removed(id));
        }
        removed
    }

    /// Apply an in-place edit and notify subscribers.
    pub fn update(
        &mut self,
        id: AnnotationId,
        edit: impl FnOnce(&mut Annotation),
    ) -> Result<(), EngineError> {
        let annotation = self.require_mut(id)?;
        edit(annotation);
        self.sort_ids();
        self.on_change.call(&AnnotationChange::Updated(id));
        Ok(())
    }

    /// Drop everything (item switch).
    pub fn clear(&mut self) {
        self.annotations.clear();
        self.ids.clear();
        self.selected.clear();
        self.highlighted = None;
        self.on_change.call(&AnnotationChange::Cleared);
    }

    fn sort_ids(&mut self) {
        let annotations = &self.annotations;
        // None z-index sorts before any Some; Some values sort descending.
        self.ids.sort_by(|a, b| {
            let za = annotations.get(a).and_then(|ann| ann.z_index);
            let zb = annotations.get(b).and_then(|ann| ann.z_index);
            match (za, zb) {
                (None, None) => std::cmp::Ordering::Equal,
                (None, Some(_)) => std::cmp::Ordering::Less,
                (Some(_), None) => std::cmp::Ordering::Greater,
                (Some(za), Some(zb)) => zb.cmp(&za),
            }
        });
    }

    // ========================================================================
    // Selection and highlight
    // ========================================================================

    pub fn selected_ids(&self) -> &[AnnotationId] {
        &self.selected
    }

    pub fn is_selected(&self, id: AnnotationId) -> bool {
        self.selected.contains(&id)
    }

    /// Select one annotation, optionally keeping the previous selection.
    pub fn select(&mut self, id: AnnotationId, additive: bool) -> Result<(), EngineError> {
        self.require(id)?;
        if !additive {
            self.selected.clear();
        }
        if !self.selected.contains(&id) {
            self.selected.push(id);
        }
        self.on_change.call(&AnnotationChange::SelectionChanged);
        Ok(())
    }

    pub fn deselect(&mut self, id: AnnotationId) {
        let before = self.selected.len();
        self.selected.retain(|existing| *existing != id);
        if self.selected.len() != before {
            self.on_change.call(&AnnotationChange::SelectionChanged);
        }
    }

    pub fn deselect_all(&mut self) {
        if !self.selected.is_empty() {
            self.selected.clear();
            self.on_change.call(&AnnotationChange::SelectionChanged);
        }
    }

    pub fn highlighted(&self) -> Option<AnnotationId> {
        self.highlighted
    }

    /// Highlight the hovered annotation. Pass `None` to clear.
    pub fn highlight(&mut self, id: Option<AnnotationId>) {
        if self.highlighted != id {
            self.highlighted = id;
            self.on_change.call(&AnnotationChange::SelectionChanged);
        }
    }
}

impl std::fmt::Debug for AnnotationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationManager")
            .field("len", &self.annotations.len())
            .field("selected", &self.selected)
            .field("highlighted", &self.highlighted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ImageRect, Point};
    use crate::model::AnnotationData;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn keypoint(id: AnnotationId, z_index: Option<i32>) -> Annotation {
        let mut annotation =
            Annotation::image(id, 1, AnnotationData::Keypoint(Point::new(0.0, 0.0)));
        annotation.z_index = z_index;
        annotation
    }

    #[test]
    fn test_render_order_none_first_then_descending() {
        let mut manager = AnnotationManager::new();
        manager.add(keypoint(1, Some(3)));
        manager.add(keypoint(2, None));
        manager.add(keypoint(3, Some(7)));
        manager.add(keypoint(4, None));
        assert_eq!(manager.ids(), &[2, 4, 3, 1]);
    }

    #[test]
    fn test_update_resorts_order() {
        let mut manager = AnnotationManager::new();
        manager.add(keypoint(1, Some(1)));
        manager.add(keypoint(2, Some(2)));
        assert_eq!(manager.ids(), &[2, 1]);

        manager.update(1, |ann| ann.z_index = Some(9)).unwrap();
        assert_eq!(manager.ids(), &[1, 2]);
    }

    #[test]
    fn test_remove_clears_selection_and_highlight() {
        let mut manager = AnnotationManager::new();
        manager.add(keypoint(1, None));
        manager.select(1, false).unwrap();
        manager.highlight(Some(1));

        manager.remove(1);
        assert!(manager.selected_ids().is_empty());
        assert_eq!(manager.highlighted(), None);
    }

    #[test]
    fn test_additive_select_keeps_existing() {
        let mut manager = AnnotationManager::new();
        manager.add(keypoint(1, None));
        manager.add(keypoint(2, None));
        manager.select(1, false).unwrap();
        manager.select(2, true).unwrap();
        assert_eq!(manager.selected_ids(), &[1, 2]);

        manager.select(1, false).unwrap();
        assert_eq!(manager.selected_ids(), &[1]);
    }

    #[test]
    fn test_change_events_fire_in_order() {
        let mut manager = AnnotationManager::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_cb = Rc::clone(&seen);
        let _handle = manager.on_change(move |change| {
            seen_cb.borrow_mut().push(*change);
            CallbackStatus::Continue
        });

        manager.add(keypoint(1, None));
        manager
            .update(1, |ann| {
                ann.payload = crate::model::AnnotationPayload::Image(AnnotationData::BoundingBox(
                    ImageRect::new(0.0, 0.0, 1.0, 1.0),
                ));
            })
            .unwrap();
        manager.remove(1);

        assert_eq!(
            *seen.borrow(),
            vec![
                AnnotationChange::Added(1),
                AnnotationChange::Updated(1),
                AnnotationChange::Removed(1),
            ]
        );
    }
}
