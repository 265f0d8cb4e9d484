use crate::geometry::{Rect, Vec2, Viewport};

use super::ItemKey;

/// Something with a running reposition animation whose end the engine waits for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnimationTarget {
    Decoy,
    /// A list item displaced by the decoy.
    Sibling(ItemKey),
    /// The dragged item settling back into the list after release.
    Dragged(ItemKey),
}

/// The UI tree a [`ReorderableList`](super::ReorderableList) drives.
///
/// The engine owns the logical order and decides every mutation; the host only measures
/// and carries out commands. Host children must stay in the engine's order, with the decoy
/// standing in for the dragged item while a drag is in flight.
pub trait ReorderHost {
    /// Bounding rect of the item's own element. Only asked for before the item is detached.
    fn item_rect(&self, key: ItemKey) -> Rect;

    /// Bounding rect of the list child at `index`.
    fn slot_rect(&self, index: usize) -> Rect;

    /// Bounding rect of the floating layer, transform included.
    fn layer_rect(&self) -> Rect;

    fn viewport(&self) -> Viewport;

    /// Start listening for document mouse move, scroll, down, context menu and up.
    fn acquire_document_events(&mut self);

    fn release_document_events(&mut self);

    /// Swap the item's element for a decoy of the same size and move the element into the
    /// floating layer, marked as being dragged.
    fn detach_into_layer(&mut self, key: ItemKey);

    fn play_decoy_entrance(&mut self, duration_ms: u32);

    fn size_layer(&mut self, width: f64);

    /// `None` clears the transform.
    fn translate_layer(&mut self, offset: Option<Vec2>);

    /// Move the decoy from slot `from` to slot `to`, shifting the children between.
    fn move_decoy(&mut self, from: usize, to: usize);

    /// Animate `target` from `from` to where it is laid out now. The host must call
    /// [`ReorderableList::animation_finished`](super::ReorderableList::animation_finished)
    /// once the animation ends.
    fn animate_reposition(&mut self, target: AnimationTarget, from: Rect, duration_ms: u32);

    /// Put the dragged element back where the decoy is, drop the decoy, and reset the
    /// floating layer's transform and size.
    fn restore_from_layer(&mut self, key: ItemKey);

    /// Remove the "being dragged" marker once the settle animation is over.
    fn finish_drag(&mut self, key: ItemKey);

    /// Drop the element of an item that was removed while it was being dragged. Called
    /// after [`finish_drag`](Self::finish_drag).
    fn discard_item(&mut self, key: ItemKey);
}
