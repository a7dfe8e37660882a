//! Pointer-drag state machine.
//!
//! A two-state machine (idle / dragging) crossed with a tagged drag target:
//! movement routes either to the pending draft or to an existing field
//! addressed by store index. Pointer-up and pointer-leave both end the drag
//! unconditionally, so a pointer that exits the page container can never
//! leave a stuck drag behind.

use serde::{Deserialize, Serialize};

/// What a drag is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DragTarget {
    /// The free-floating pending draft.
    Pending,
    /// A placed field, addressed by its store index.
    Existing(usize),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionController {
    drag: Option<DragTarget>,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer-down on the page background: the drag targets the pending
    /// draft.
    pub fn begin_pending_drag(&mut self) {
        self.drag = Some(DragTarget::Pending);
    }

    /// Pointer-down on a placed field's handle: the drag targets that field.
    /// The host must route the event here exclusively, never also to
    /// [`begin_pending_drag`](Self::begin_pending_drag).
    pub fn begin_field_drag(&mut self, index: usize) {
        self.drag = Some(DragTarget::Existing(index));
    }

    /// Pointer-up or pointer-leave: ends any drag.
    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn drag(&self) -> Option<DragTarget> {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_drag_targets_pending() {
        let mut controller = InteractionController::new();

        controller.begin_pending_drag();

        assert!(controller.is_dragging());
        assert_eq!(controller.drag(), Some(DragTarget::Pending));
    }

    #[test]
    fn test_field_drag_targets_index() {
        let mut controller = InteractionController::new();

        controller.begin_field_drag(3);

        assert_eq!(controller.drag(), Some(DragTarget::Existing(3)));
    }

    #[test]
    fn test_pointer_up_ends_drag() {
        let mut controller = InteractionController::new();
        controller.begin_field_drag(0);

        controller.end_drag();

        assert!(!controller.is_dragging());
        assert_eq!(controller.drag(), None);
    }

    #[test]
    fn test_end_drag_is_unconditional() {
        let mut controller = InteractionController::new();

        controller.end_drag();
        assert!(!controller.is_dragging());

        controller.begin_pending_drag();
        controller.end_drag();
        controller.end_drag();
        assert_eq!(controller.drag(), None);
    }

    #[test]
    fn test_new_drag_replaces_target() {
        let mut controller = InteractionController::new();

        controller.begin_pending_drag();
        controller.begin_field_drag(1);

        assert_eq!(controller.drag(), Some(DragTarget::Existing(1)));
    }
}
