//! [`ReorderHost`] over the real DOM.
//!
//! The managed items container and the floating layer sit side by side in a
//! `drag-and-drop-container`. The dragged item is moved into the layer and a
//! `drag-and-drop-decoy` takes its place in the list until release.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use gloo::events::{EventListener, EventListenerOptions};
use js_sys::{Array, Object, Reflect};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement, KeyframeAnimationOptions, MouseEvent, Node};

use crate::config::ReorderConfig;
use crate::error::{AppError, AppResult, SystemError};
use crate::events::{DocumentEvent, EventSource, Handler, ToggleableEvents};
use crate::geometry::{PointerSample, Rect, Vec2, Viewport};
use crate::reorder::{AnimationTarget, Disposition, ItemKey, ReorderHost, ReorderableList};

pub const DECOY_CLASS: &str = "drag-and-drop-decoy";
pub const LAYER_CLASS: &str = "drag-and-drop-draggable";
pub const DRAGGED_CLASS: &str = "is-being-dragged";

pub type SharedList = Rc<RefCell<ReorderableList<DomReorderHost>>>;

/// The page's document as an [`EventSource`]. Mouse down and context menu listeners are
/// registered non passive so a drag can cancel them.
#[derive(Clone)]
pub struct DocumentSource(Document);

impl EventSource for DocumentSource {
    type Event = web_sys::Event;
    type Guard = EventListener;

    fn listen(&self, name: &'static str, handler: Handler<web_sys::Event>) -> EventListener {
        let options = match DocumentEvent::from_name(name) {
            Some(DocumentEvent::MouseDown | DocumentEvent::ContextMenu) => {
                EventListenerOptions::enable_prevent_default()
            }
            _ => EventListenerOptions::default(),
        };
        EventListener::new_with_options(&self.0, name, options, move |event| handler(event))
    }
}

pub fn pointer_sample(event: &MouseEvent) -> PointerSample {
    PointerSample::new(
        event.client_x() as f64,
        event.client_y() as f64,
        event.buttons(),
    )
}

fn rect_of(element: &Element) -> Rect {
    let rect = element.get_bounding_client_rect();
    Rect::new(rect.x(), rect.y(), rect.width(), rect.height())
}

fn set_style(element: &HtmlElement, property: &str, value: &str) {
    if let Err(e) = element.style().set_property(property, value) {
        log::warn!("could not set {property}: {e:?}");
    }
}

fn clear_style(element: &HtmlElement, property: &str) {
    let _ = element.style().remove_property(property);
}

pub(crate) fn keyframe(properties: &[(&str, &str)]) -> Object {
    let frame = Object::new();
    for (property, value) in properties {
        let _ = Reflect::set(&frame, &JsValue::from_str(property), &JsValue::from_str(value));
    }
    frame
}

pub(crate) fn animation_options(duration_ms: u32) -> KeyframeAnimationOptions {
    let options = KeyframeAnimationOptions::new();
    options.set_duration(f64::from(duration_ms));
    options.set_easing("ease");
    options
}

pub struct DomReorderHost {
    document: Document,
    container: HtmlElement,
    layer: HtmlElement,
    elements: HashMap<ItemKey, HtmlElement>,
    decoy: Option<HtmlElement>,
    events: Option<ToggleableEvents<DocumentSource>>,
    list: Weak<RefCell<ReorderableList<DomReorderHost>>>,
}

impl DomReorderHost {
    fn new(container: HtmlElement, layer: HtmlElement) -> AppResult<Self> {
        let document = gloo::utils::document();
        layer.class_list().add_1(LAYER_CLASS).map_err(js_error)?;
        Ok(Self {
            document,
            container,
            layer,
            elements: HashMap::new(),
            decoy: None,
            events: None,
            list: Weak::new(),
        })
    }

    fn bind(&mut self, list: Weak<RefCell<ReorderableList<DomReorderHost>>>) {
        let handlers = DocumentEvent::ALL.map(|event| (event.name(), route(list.clone(), event)));
        self.events = Some(ToggleableEvents::new(
            DocumentSource(self.document.clone()),
            handlers,
        ));
        self.list = list;
    }

    /// Puts `element` into the list at `index`. The engine must be told with
    /// [`ReorderableList::insert_item`] right after.
    pub fn insert_element(&mut self, index: usize, key: ItemKey, element: HtmlElement) {
        let before: Option<Node> = self.container.children().item(index as u32).map(Into::into);
        if let Err(e) = self.container.insert_before(&element, before.as_ref()) {
            log::error!("could not insert {key}: {e:?}");
        }
        self.elements.insert(key, element);
    }

    /// Takes `element` out of the list. The engine must be told with
    /// [`ReorderableList::remove_item`].
    pub fn remove_element(&mut self, key: ItemKey) {
        if let Some(element) = self.elements.remove(&key) {
            element.remove();
        }
    }

    pub fn element(&self, key: ItemKey) -> Option<&HtmlElement> {
        self.elements.get(&key)
    }

    fn target_element(&self, target: AnimationTarget) -> Option<&HtmlElement> {
        match target {
            AnimationTarget::Decoy => self.decoy.as_ref(),
            AnimationTarget::Sibling(key) | AnimationTarget::Dragged(key) => self.elements.get(&key),
        }
    }
}

pub(crate) fn js_error(value: JsValue) -> AppError {
    SystemError::Message(format!("{value:?}")).into()
}

/// Forwards one document event into the engine and cancels it if the engine asks to.
fn route(
    list: Weak<RefCell<ReorderableList<DomReorderHost>>>,
    event: DocumentEvent,
) -> Handler<web_sys::Event> {
    Rc::new(move |e: &web_sys::Event| {
        let Some(list) = list.upgrade() else {
            return;
        };
        let Ok(mut list) = list.try_borrow_mut() else {
            log::warn!("{} arrived while the list was busy", event.name());
            return;
        };
        let pointer = e.dyn_ref::<MouseEvent>().map(pointer_sample);
        if list.handle(event, pointer.as_ref()) == Disposition::PreventDefault {
            e.prevent_default();
        }
    })
}

impl ReorderHost for DomReorderHost {
    fn item_rect(&self, key: ItemKey) -> Rect {
        self.elements
            .get(&key)
            .map(|element| rect_of(element))
            .unwrap_or_default()
    }

    fn slot_rect(&self, index: usize) -> Rect {
        self.container
            .children()
            .item(index as u32)
            .map(|e| rect_of(&e))
            .unwrap_or_default()
    }

    fn layer_rect(&self) -> Rect {
        rect_of(&self.layer)
    }

    fn viewport(&self) -> Viewport {
        let window = gloo::utils::window();
        Viewport {
            scroll_y: window.scroll_y().unwrap_or_default(),
            inner_width: window
                .inner_width()
                .ok()
                .and_then(|w| w.as_f64())
                .unwrap_or_default(),
            client_width: self
                .document
                .document_element()
                .map(|e| e.client_width() as f64)
                .unwrap_or_default(),
        }
    }

    fn acquire_document_events(&mut self) {
        if let Some(events) = &mut self.events {
            events.attach();
        }
    }

    fn release_document_events(&mut self) {
        if let Some(events) = &mut self.events {
            events.detach();
        }
    }

    fn detach_into_layer(&mut self, key: ItemKey) {
        let Some(element) = self.elements.get(&key) else {
            return;
        };
        let Ok(decoy) = self.document.create_element("div") else {
            return;
        };
        let Ok(decoy) = decoy.dyn_into::<HtmlElement>() else {
            return;
        };
        let _ = decoy.class_list().add_1(DECOY_CLASS);
        // computed sizes keep sub pixel precision, client sizes would round
        if let Ok(Some(style)) = gloo::utils::window().get_computed_style(element) {
            for property in ["height", "width"] {
                if let Ok(value) = style.get_property_value(property) {
                    set_style(&decoy, property, &value);
                }
            }
        }

        if let Err(e) = element.replace_with_with_node_1(&decoy) {
            log::error!("could not swap {key} for its decoy: {e:?}");
        }
        let _ = self.layer.append_child(element);
        let _ = element.class_list().add_1(DRAGGED_CLASS);
        self.decoy = Some(decoy);
    }

    fn play_decoy_entrance(&mut self, duration_ms: u32) {
        let Some(decoy) = &self.decoy else {
            return;
        };
        let frames = Array::of1(&keyframe(&[
            ("transform", "scale(.9)"),
            ("opacity", "0"),
            ("offset", "0"),
        ]));
        decoy.animate_with_keyframe_animation_options(Some(&*frames), &animation_options(duration_ms));
    }

    fn size_layer(&mut self, width: f64) {
        set_style(&self.layer, "width", &format!("{width}px"));
    }

    fn translate_layer(&mut self, offset: Option<Vec2>) {
        let transform = match offset {
            Some(offset) => format!("translate({}px, {}px)", offset.x, offset.y),
            None => "none".to_string(),
        };
        set_style(&self.layer, "transform", &transform);
    }

    fn move_decoy(&mut self, from: usize, to: usize) {
        let (Some(decoy), Some(sibling)) = (
            self.decoy.as_ref(),
            self.container.children().item(to as u32),
        ) else {
            return;
        };
        let moved = if to > from {
            sibling.after_with_node_1(decoy)
        } else {
            sibling.before_with_node_1(decoy)
        };
        if let Err(e) = moved {
            log::error!("could not move decoy from {from} to {to}: {e:?}");
        }
    }

    fn animate_reposition(&mut self, target: AnimationTarget, from: Rect, duration_ms: u32) {
        let Some(element) = self.target_element(target) else {
            return;
        };
        let to = rect_of(element);
        let start = format!("translate({}px, {}px)", from.x - to.x, from.y - to.y);
        let frames = Array::of2(
            &keyframe(&[("transform", &start)]),
            &keyframe(&[("transform", "none")]),
        );
        let animation = element
            .animate_with_keyframe_animation_options(Some(&*frames), &animation_options(duration_ms));

        let list = self.list.clone();
        let finished = Closure::once_into_js(move || {
            let Some(list) = list.upgrade() else {
                return;
            };
            match list.try_borrow_mut() {
                Ok(mut list) => list.animation_finished(target),
                Err(_) => log::warn!("animation of {target:?} finished while the list was busy"),
            };
        });
        animation.set_onfinish(Some(finished.unchecked_ref()));
    }

    fn restore_from_layer(&mut self, key: ItemKey) {
        if let (Some(element), Some(decoy)) = (self.elements.get(&key), self.decoy.take()) {
            set_style(element, "pointer-events", "none");
            if let Err(e) = decoy.replace_with_with_node_1(element) {
                log::error!("could not put {key} back: {e:?}");
            }
        }
        clear_style(&self.layer, "transform");
        clear_style(&self.layer, "width");
    }

    fn finish_drag(&mut self, key: ItemKey) {
        if let Some(element) = self.elements.get(&key) {
            let _ = element.class_list().remove_1(DRAGGED_CLASS);
            clear_style(element, "pointer-events");
        }
    }

    fn discard_item(&mut self, key: ItemKey) {
        self.remove_element(key);
    }
}

/// Wires `container` and `layer` to a new engine. Items are added afterwards with
/// [`DomReorderHost::insert_element`] and [`ReorderableList::insert_item`].
pub fn mount_reorderable(
    container: HtmlElement,
    layer: HtmlElement,
    config: ReorderConfig,
    on_item_repositioned: impl FnMut(ItemKey, usize, usize) + 'static,
    on_drag_end: impl FnMut(ItemKey) + 'static,
) -> AppResult<SharedList> {
    let host = DomReorderHost::new(container, layer)?;
    let list = ReorderableList::setup(
        host,
        Vec::new(),
        config,
        on_item_repositioned,
        on_drag_end,
    )?;
    let list = Rc::new(RefCell::new(list));
    list.borrow_mut().host_mut().bind(Rc::downgrade(&list));
    Ok(list)
}
