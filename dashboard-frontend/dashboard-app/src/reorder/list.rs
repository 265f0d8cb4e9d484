use crate::config::ReorderConfig;
use crate::error::AppResult;
use crate::events::DocumentEvent;
use crate::geometry::{clamp, PointerSample, Rect, Vec2};

use super::host::{AnimationTarget, ReorderHost};
use super::swap::{find_swap_target, DraggedSpan};
use super::ItemKey;

/// Everything one in-flight drag needs. Dropped when the drag settles.
#[derive(Clone, Debug, PartialEq)]
pub struct DragSession {
    pub key: ItemKey,
    pub initial_index: usize,
    /// Slot the decoy occupies right now, which is where the item lands on release.
    pub decoy_index: usize,
    /// Pointer offset from the item's top left corner at grab time.
    pub client_offset: Vec2,
    pub initial_layer_rect: Rect,
    pub initial_scroll_y: f64,
    pub last_pointer: Vec2,
    /// Siblings still sliding from an earlier swap. They can't be swapped again until done.
    pub animating: Vec<ItemKey>,
    /// Set when a swap happened or was held back, so the next settled sibling animation
    /// re-runs swap detection with `last_pointer`.
    pub pending_reevaluation: bool,
    /// The item was removed from the list mid-drag and is discarded once it settles.
    pub discard_on_settle: bool,
}

/// The item is settling back into the list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Release {
    pub key: ItemKey,
    pub initial_index: usize,
    pub final_index: usize,
    pub discard_on_settle: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
    Releasing(Release),
}

/// Whether the host should cancel the browser's default action for a routed event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    PreventDefault,
    Default,
}

type RepositionedCallback = Box<dyn FnMut(ItemKey, usize, usize)>;
type DragEndCallback = Box<dyn FnMut(ItemKey)>;

pub struct ReorderableList<H: ReorderHost> {
    host: H,
    items: Vec<ItemKey>,
    state: DragState,
    config: ReorderConfig,
    on_item_repositioned: RepositionedCallback,
    on_drag_end: DragEndCallback,
}

impl<H: ReorderHost> ReorderableList<H> {
    /// `on_drag_end` fires for every finished drag, then `on_item_repositioned` fires with
    /// `(key, from, to)` if the item ended up somewhere else.
    pub fn setup(
        host: H,
        items: Vec<ItemKey>,
        config: ReorderConfig,
        on_item_repositioned: impl FnMut(ItemKey, usize, usize) + 'static,
        on_drag_end: impl FnMut(ItemKey) + 'static,
    ) -> AppResult<Self> {
        config.validate()?;
        Ok(Self {
            host,
            items,
            state: DragState::Idle,
            config,
            on_item_repositioned: Box::new(on_item_repositioned),
            on_drag_end: Box::new(on_drag_end),
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, DragState::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Current order, with the dragged item at its decoy's slot.
    pub fn order(&self) -> &[ItemKey] {
        &self.items
    }

    pub fn index_of(&self, key: ItemKey) -> Option<usize> {
        self.items.iter().position(|k| *k == key)
    }

    /// Grab `key` under the pointer. Ignored unless the list is idle and owns `key`; returns
    /// whether the drag started.
    pub fn start_drag(&mut self, pointer: &PointerSample, key: ItemKey) -> bool {
        if !self.is_idle() {
            log::warn!("grab of {key} ignored, a drag is already in progress");
            return false;
        }
        let Some(index) = self.index_of(key) else {
            log::warn!("grab of {key} ignored, it is not in this list");
            return false;
        };

        self.host.acquire_document_events();
        let initial_scroll_y = self.host.viewport().scroll_y;
        let element_rect = self.host.item_rect(key);
        let client_offset = pointer.client - element_rect.origin();

        self.host.detach_into_layer(key);
        self.host.play_decoy_entrance(self.config.decoy_entrance_ms);

        self.host.size_layer(element_rect.width);
        self.host.translate_layer(None);
        let initial_layer_rect = self.host.layer_rect();
        self.host
            .translate_layer(Some(element_rect.origin() - initial_layer_rect.origin()));

        log::debug!("drag of {key} started at slot {index}");
        self.state = DragState::Dragging(DragSession {
            key,
            initial_index: index,
            decoy_index: index,
            client_offset,
            initial_layer_rect,
            initial_scroll_y,
            last_pointer: pointer.client,
            animating: Vec::new(),
            pending_reevaluation: false,
            discard_on_settle: false,
        });
        true
    }

    pub fn pointer_moved(&mut self, pointer: &PointerSample) {
        if let DragState::Dragging(session) = &mut self.state {
            session.last_pointer.set_from(pointer);
            self.reposition();
        }
    }

    /// Scroll events carry no pointer position; the last one is reused.
    pub fn scrolled(&mut self) {
        self.reposition();
    }

    /// Mouse down and context menu are swallowed while a drag is in flight.
    pub fn pointer_pressed(&mut self) -> Disposition {
        if self.is_dragging() {
            Disposition::PreventDefault
        } else {
            Disposition::Default
        }
    }

    /// Ends the drag once no button is held any more.
    pub fn pointer_released(&mut self, pointer: &PointerSample) {
        if pointer.buttons != 0 {
            return;
        }
        let session = match std::mem::take(&mut self.state) {
            DragState::Dragging(session) => session,
            other => {
                self.state = other;
                return;
            }
        };

        self.host.release_document_events();
        let from = self.host.layer_rect();
        self.host.restore_from_layer(session.key);
        self.host.animate_reposition(
            AnimationTarget::Dragged(session.key),
            from,
            self.config.reposition_ms,
        );

        log::debug!(
            "drag of {} released at slot {} (from {})",
            session.key,
            session.decoy_index,
            session.initial_index
        );
        self.state = DragState::Releasing(Release {
            key: session.key,
            initial_index: session.initial_index,
            final_index: session.decoy_index,
            discard_on_settle: session.discard_on_settle,
        });
    }

    /// Routes one of the acquired document events. `pointer` is `None` for scroll.
    pub fn handle(&mut self, event: DocumentEvent, pointer: Option<&PointerSample>) -> Disposition {
        match (event, pointer) {
            (DocumentEvent::MouseMove, Some(pointer)) => self.pointer_moved(pointer),
            (DocumentEvent::MouseMove, None) | (DocumentEvent::Scroll, _) => self.scrolled(),
            (DocumentEvent::MouseDown, _) | (DocumentEvent::ContextMenu, _) => {
                return self.pointer_pressed()
            }
            (DocumentEvent::MouseUp, Some(pointer)) => self.pointer_released(pointer),
            (DocumentEvent::MouseUp, None) => {
                self.pointer_released(&PointerSample::default())
            }
        }
        Disposition::Default
    }

    /// Called by the host when an animation it started for the engine has ended.
    pub fn animation_finished(&mut self, target: AnimationTarget) {
        match target {
            AnimationTarget::Decoy => {}
            AnimationTarget::Sibling(key) => {
                let DragState::Dragging(session) = &mut self.state else {
                    return;
                };
                session.animating.retain(|k| *k != key);
                if !session.pending_reevaluation {
                    return;
                }
                session.pending_reevaluation = false;
                self.reposition();
            }
            AnimationTarget::Dragged(key) => {
                let release = match &self.state {
                    DragState::Releasing(release) if release.key == key => release.clone(),
                    _ => return,
                };
                self.state = DragState::Idle;
                self.host.finish_drag(key);
                if release.discard_on_settle {
                    self.items.retain(|k| *k != key);
                    self.host.discard_item(key);
                    log::debug!("{key} settled and was discarded");
                    (self.on_drag_end)(key);
                    return;
                }
                (self.on_drag_end)(key);
                if release.initial_index != release.final_index {
                    (self.on_item_repositioned)(key, release.initial_index, release.final_index);
                }
            }
        }
    }

    /// Registers an item the host just inserted at `index`. Indices of an in-flight drag are
    /// shifted to keep pointing at the same items.
    pub fn insert_item(&mut self, index: usize, key: ItemKey) -> bool {
        if self.items.contains(&key) {
            log::warn!("{key} is already in the list");
            return false;
        }
        let index = index.min(self.items.len());
        self.items.insert(index, key);
        self.shift_indices(index, |i| i + 1);
        true
    }

    /// Forgets an item the host removed. Returns `false` if the item is unknown or is the
    /// one being dragged; the dragged item stays until it settles and is then handed to
    /// [`ReorderHost::discard_item`].
    pub fn remove_item(&mut self, key: ItemKey) -> bool {
        let discard = match &mut self.state {
            DragState::Idle => None,
            DragState::Dragging(session) if session.key == key => {
                Some(&mut session.discard_on_settle)
            }
            DragState::Releasing(release) if release.key == key => {
                Some(&mut release.discard_on_settle)
            }
            DragState::Dragging(_) | DragState::Releasing(_) => None,
        };
        if let Some(discard) = discard {
            log::debug!("{key} is being dragged, it is removed once it settles");
            *discard = true;
            return false;
        }
        let Some(index) = self.index_of(key) else {
            return false;
        };
        self.items.remove(index);
        self.shift_indices(index + 1, |i| i - 1);
        if let DragState::Dragging(session) = &mut self.state {
            session.animating.retain(|k| *k != key);
        }
        true
    }

    /// Applies `shift` to every drag index at or after `from`.
    fn shift_indices(&mut self, from: usize, shift: impl Fn(usize) -> usize) {
        let indices = match &mut self.state {
            DragState::Idle => return,
            DragState::Dragging(session) => [&mut session.initial_index, &mut session.decoy_index],
            DragState::Releasing(release) => [&mut release.initial_index, &mut release.final_index],
        };
        for index in indices {
            if *index >= from {
                *index = shift(*index);
            }
        }
    }

    /// Moves the floating layer under the pointer and moves the decoy if a threshold was
    /// crossed.
    fn reposition(&mut self) {
        let Self {
            host,
            items,
            state,
            config,
            ..
        } = self;
        let DragState::Dragging(session) = state else {
            return;
        };

        let viewport = host.viewport();
        let layer = session.initial_layer_rect;
        let client = session.last_pointer;

        let scroll_offset = viewport.scroll_y - session.initial_scroll_y;
        let offset_y = client.y - layer.y - session.client_offset.y + scroll_offset;
        let offset_x = client.x - layer.x - session.client_offset.x;
        let confined_x = clamp(
            offset_x,
            -layer.x,
            viewport.usable_width() - layer.x - layer.width,
        );
        host.translate_layer(Some(Vec2::new(confined_x, offset_y)));

        let dragged = DraggedSpan::new(client.y, session.client_offset.y, layer.height);
        let slots = (0..items.len()).map(|i| host.slot_rect(i));
        let Some(target) = find_swap_target(slots, dragged, session.decoy_index, config) else {
            return;
        };

        let from = session.decoy_index;
        let displaced: Vec<(usize, ItemKey)> = if target > from {
            (from + 1..=target).map(|i| (i, items[i])).collect()
        } else {
            (target..from).map(|i| (i, items[i])).collect()
        };
        if displaced.iter().any(|(_, key)| session.animating.contains(key)) {
            session.pending_reevaluation = true;
            return;
        }

        let decoy_from = host.slot_rect(from);
        let sibling_from: Vec<(ItemKey, Rect)> = displaced
            .iter()
            .map(|(i, key)| (*key, host.slot_rect(*i)))
            .collect();

        host.move_decoy(from, target);
        let dragged_key = items.remove(from);
        items.insert(target, dragged_key);
        session.decoy_index = target;
        session.pending_reevaluation = true;
        log::debug!("decoy for {dragged_key} moved from slot {from} to {target}");

        host.animate_reposition(AnimationTarget::Decoy, decoy_from, config.reposition_ms);
        for (key, rect) in sibling_from {
            session.animating.push(key);
            host.animate_reposition(AnimationTarget::Sibling(key), rect, config.reposition_ms);
        }
    }
}
