//! Drag-reorder translation.
//!
//! A drag surface reports the full visual order after every hover event.
//! [`DragTracker`] turns that stream into at most one index move per actual
//! position change, so a repeated event for the same order is a no-op.

use crate::error::CoreError;

/// A single index move: the item at `from` ends up at `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: usize,
    pub to: usize,
}

/// Remove the item at `from` and reinsert it at `to`.
///
/// Both indices must be in range; `from == to` is a no-op.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<(), CoreError> {
    let len = items.len();
    if from >= len || to >= len {
        return Err(CoreError::invalid(
            "",
            format!("Cannot move item {from} to {to} in a list of {len}"),
        ));
    }
    if from != to {
        let item = items.remove(from);
        items.insert(to, item);
    }
    Ok(())
}

/// Tracks the item being dragged and where it currently sits.
#[derive(Debug, Clone)]
pub struct DragTracker<Id> {
    active: Option<(Id, usize)>,
}

impl<Id> Default for DragTracker<Id> {
    fn default() -> Self {
        Self { active: None }
    }
}

impl<Id: PartialEq + Copy> DragTracker<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, id: Id, index: usize) {
        self.active = Some((id, index));
    }

    pub fn end(&mut self) {
        self.active = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    pub fn dragging_id(&self) -> Option<Id> {
        self.active.map(|(id, _)| id)
    }

    pub fn dragging_index(&self) -> Option<usize> {
        self.active.map(|(_, index)| index)
    }

    /// Record where the dragged item sits now, after the list changed
    /// underneath the drag.
    pub fn rebase(&mut self, index: usize) {
        if let Some((_, recorded)) = self.active.as_mut() {
            *recorded = index;
        }
    }

    /// Handle a reorder event carrying the new visual order.
    ///
    /// If the dragged item's position in `new_order` differs from the last
    /// recorded one, `apply` receives the move; the recorded index is
    /// updated only when `apply` succeeds. Returns the applied move, or
    /// `None` when there was nothing to do.
    pub fn on_reorder<E>(
        &mut self,
        new_order: &[Id],
        apply: impl FnOnce(Move) -> Result<(), E>,
    ) -> Result<Option<Move>, E> {
        let Some((id, from)) = self.active else {
            return Ok(None);
        };
        let Some(to) = new_order.iter().position(|candidate| *candidate == id) else {
            return Ok(None);
        };
        if to == from {
            return Ok(None);
        }

        let mv = Move { from, to };
        apply(mv)?;
        self.active = Some((id, to));
        Ok(Some(mv))
    }
}
