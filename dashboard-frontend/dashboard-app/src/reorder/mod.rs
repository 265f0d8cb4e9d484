//! Vertical drag-and-drop reordering.
//!
//! While an item is dragged it lives in a floating layer that follows the pointer, and a
//! decoy of the same size holds its slot in the list. Each pointer move moves the decoy at
//! most one slot, and the displaced sibling slides into place with a FLIP animation. When
//! the mouse button is released the item settles onto the decoy and takes its slot back.

mod host;
mod list;
mod swap;

pub use host::{AnimationTarget, ReorderHost};
pub use list::{Disposition, DragSession, DragState, Release, ReorderableList};
pub use swap::{find_swap_target, DraggedSpan};

use std::fmt::Display;

/// Opaque stable handle for one list item. Its index is its position in the engine's order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey(pub u64);

impl Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
