use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use dashboard_api_types::WidgetId;
use gloo_timers::callback::Timeout;
use leptos::{
    html::{Div, Textarea},
    mount::mount_to,
    prelude::*,
    task::spawn_local,
};
use js_sys::Array;
use send_wrapper::SendWrapper;
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{Animation, FillMode, HtmlElement, KeyboardEvent, MouseEvent};

use super::reorderable_list::{
    animation_options, js_error, keyframe, mount_reorderable, pointer_sample, SharedList,
};
use crate::api::HttpTodoStore;
use crate::config::WidgetConfig;
use crate::debounce::{DebounceAction, ThrottledDebounce};
use crate::error::{AppError, AppResult};
use crate::reorder::ItemKey;
use crate::todo::{ItemEdit, Placement, TodoEntry, TodoList};

const ROW_ANIMATION_MS: u32 = 200;

const TRASH_ICON: &str = r#"<svg fill="currentColor" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 16 16"><path fill-rule="evenodd" d="M5 3.25V4H2.75a.75.75 0 0 0 0 1.5h.3l.815 8.15A1.5 1.5 0 0 0 5.357 15h5.285a1.5 1.5 0 0 0 1.493-1.35l.815-8.15h.3a.75.75 0 0 0 0-1.5H11v-.75A2.25 2.25 0 0 0 8.75 1h-1.5A2.25 2.25 0 0 0 5 3.25Zm2.25-.75a.75.75 0 0 0-.75.75V4h3v-.75a.75.75 0 0 0-.75-.75h-1.5ZM6.05 6a.75.75 0 0 1 .787.713l.275 5.5a.75.75 0 0 1-1.498.075l-.275-5.5A.75.75 0 0 1 6.05 6Zm3.9 0a.75.75 0 0 1 .712.787l-.275 5.5a.75.75 0 0 1-1.498-.075l.275-5.5a.75.75 0 0 1 .786-.711Z" clip-rule="evenodd"/></svg>"#;

/// A mounted item row. Dropping it unmounts the row's view.
struct Row {
    text: RwSignal<String>,
    checked: RwSignal<bool>,
    debounce: ThrottledDebounce,
    timer: Option<Timeout>,
    _view: Box<dyn Any>,
}

struct WidgetState {
    todo: TodoList<HttpTodoStore>,
    config: WidgetConfig,
    reorder: RefCell<Option<SharedList>>,
    rows: RefCell<HashMap<ItemKey, Row>>,
    /// Deleted rows playing their exit animation.
    leaving: RefCell<HashSet<ItemKey>>,
    last_added: Cell<Option<ItemKey>>,
    /// Move reported by the engine for the drag that is being finished.
    moved: Cell<Option<(ItemKey, usize, usize)>>,
    input: NodeRef<Textarea>,
    input_container: NodeRef<Div>,
    has_items: RwSignal<bool>,
}

type WeakState = SendWrapper<Weak<WidgetState>>;

fn list_of(state: &WidgetState) -> Option<SharedList> {
    state.reorder.borrow().clone()
}

/// Puts the items container under the control of a reorder engine and loads the items.
fn attach(state: &Rc<WidgetState>, container: HtmlElement, layer: HtmlElement) {
    let repositioned = Rc::downgrade(state);
    let ended = Rc::downgrade(state);
    let list = mount_reorderable(
        container,
        layer,
        state.config.reorder.clone(),
        move |key, from, to| {
            if let Some(state) = repositioned.upgrade() {
                state.moved.set(Some((key, from, to)));
            }
        },
        move |key| {
            let Some(state) = ended.upgrade() else {
                return;
            };
            // the engine reports the move right after this callback returns, before the
            // task first runs
            spawn_local(async move {
                let moved = state.moved.take();
                state.todo.drag_finished(moved).await;
                if state.todo.entry(key).is_none() {
                    // deleted mid-drag, the engine has dropped its element by now
                    state.rows.borrow_mut().remove(&key);
                }
            });
        },
    );
    match list {
        Ok(list) => *state.reorder.borrow_mut() = Some(list),
        Err(e) => {
            log::error!("to-do list can't be reordered: {e}");
            return;
        }
    }

    let state = state.clone();
    spawn_local(async move {
        for (index, entry) in state.todo.load().await.into_iter().enumerate() {
            add_row(&state, index, entry);
        }
        state.has_items.set(!state.todo.is_empty());
    });
}

fn add_row(state: &Rc<WidgetState>, index: usize, entry: TodoEntry) {
    let Some(list) = list_of(state) else {
        return;
    };
    let element = gloo::utils::document()
        .create_element("div")
        .map_err(js_error)
        .and_then(|e| e.dyn_into::<HtmlElement>().map_err(|e| js_error(e.into())));
    let element = match element {
        Ok(element) => element,
        Err(e) => {
            log::error!("could not create a row: {e}");
            return;
        }
    };
    element.set_class_name("todo-item flex gap-10 items-center");

    let key = entry.key;
    let text = RwSignal::new(entry.item.text);
    let checked = RwSignal::new(entry.item.checked);
    let weak = SendWrapper::new(Rc::downgrade(state));
    let view = mount_to(element.clone(), move || item_row(key, text, checked, weak));

    state.rows.borrow_mut().insert(
        key,
        Row {
            text,
            checked,
            debounce: ThrottledDebounce::new(
                state.config.debounce_max_times,
                state.config.debounce_delay_ms,
            ),
            timer: None,
            _view: Box::new(view),
        },
    );
    let mut list = list.borrow_mut();
    list.host_mut().insert_element(index, key, element);
    list.insert_item(index, key);
}

/// Grows a row in from nothing, or collapses it.
fn animate_row(element: &HtmlElement, entrance: bool) -> Animation {
    let height = format!("{}px", element.client_height());
    let visible = keyframe(&[("height", &height), ("opacity", "1")]);
    let hidden = keyframe(&[("height", "0"), ("opacity", "0"), ("padding", "0")]);
    let frames = if entrance {
        Array::of2(&hidden, &visible)
    } else {
        Array::of2(&visible, &hidden)
    };
    element.animate_with_keyframe_animation_options(
        Some(&*frames),
        &animation_options(ROW_ANIMATION_MS),
    )
}

/// Opens or closes the gap between the input and the first row.
fn animate_input_margin(state: &WidgetState, entrance: bool) {
    let Some(container) = state.input_container.get_untracked() else {
        return;
    };
    let (from, to) = if entrance {
        ("0px", "1.5rem")
    } else {
        ("1.5rem", "0")
    };
    let frames = Array::of2(
        &keyframe(&[("marginBottom", from)]),
        &keyframe(&[("marginBottom", to)]),
    );
    let options = animation_options(ROW_ANIMATION_MS);
    options.set_fill(FillMode::Forwards);
    container.animate_with_keyframe_animation_options(Some(&*frames), &options);
}

/// Collapses a deleted row, then drops it. Rows of a running drag are dropped right away.
fn remove_row(state: &Rc<WidgetState>, key: ItemKey) {
    let element = list_of(state).and_then(|list| {
        let list = list.borrow();
        if list.is_idle() {
            list.host().element(key).cloned()
        } else {
            None
        }
    });
    match element {
        Some(element) => {
            state.leaving.borrow_mut().insert(key);
            let weak = Rc::downgrade(state);
            let finished = Closure::once_into_js(move || {
                if let Some(state) = weak.upgrade() {
                    drop_row(&state, key);
                }
            });
            animate_row(&element, false).set_onfinish(Some(finished.unchecked_ref()));
        }
        None => drop_row(state, key),
    }

    if state.last_added.get() == Some(key) {
        state.last_added.set(None);
    }
    if state.todo.is_empty() {
        animate_input_margin(state, false);
    }
    state.has_items.set(!state.todo.is_empty());
}

fn drop_row(state: &WidgetState, key: ItemKey) {
    state.leaving.borrow_mut().remove(&key);
    let mut dragged = false;
    if let Some(list) = list_of(state) {
        let mut list = list.borrow_mut();
        if list.remove_item(key) {
            list.host_mut().remove_element(key);
        } else {
            // the engine drops it once the drag settles
            dragged = list.index_of(key).is_some();
        }
    }
    if !dragged {
        state.rows.borrow_mut().remove(&key);
    }
}

/// Puts the field a failed update touched back in line with the list. Text typed since
/// the update was sent is left alone, the pending save will send it.
fn sync_row(state: &WidgetState, key: ItemKey, failed: &ItemEdit) {
    let Some((text, checked)) = state.rows.borrow().get(&key).map(|r| (r.text, r.checked)) else {
        return;
    };
    match (state.todo.current_field(key, failed), failed) {
        (Some(ItemEdit::Text(restored)), ItemEdit::Text(sent)) => {
            if text.get_untracked() == *sent {
                text.set(restored);
            }
        }
        (Some(ItemEdit::Checked(restored)), _) => checked.set(restored),
        _ => {}
    }
}

fn save(state: Rc<WidgetState>, key: ItemKey, edit: ItemEdit) {
    spawn_local(async move {
        if state.todo.edit_item(key, edit.clone()).await.is_err() {
            sync_row(&state, key, &edit);
        }
    });
}

fn text_edited(state: &Rc<WidgetState>, key: ItemKey) {
    let mut rows = state.rows.borrow_mut();
    let Some(row) = rows.get_mut(&key) else {
        return;
    };
    match row.debounce.trigger() {
        DebounceAction::FireNow => {
            if let Some(timer) = row.timer.take() {
                timer.cancel();
            }
            let text = row.text.get_untracked();
            drop(rows);
            save(state.clone(), key, ItemEdit::Text(text));
        }
        DebounceAction::Schedule(delay_ms) => {
            let weak = Rc::downgrade(state);
            row.timer = Some(Timeout::new(delay_ms, move || {
                let Some(state) = weak.upgrade() else {
                    return;
                };
                let text = {
                    let mut rows = state.rows.borrow_mut();
                    let Some(row) = rows.get_mut(&key) else {
                        return;
                    };
                    row.debounce.timer_elapsed();
                    row.text.get_untracked()
                };
                save(state, key, ItemEdit::Text(text));
            }));
        }
    }
}

fn start_drag(state: &WidgetState, key: ItemKey, ev: &MouseEvent) {
    ev.prevent_default();
    if state.leaving.borrow().contains(&key) {
        return;
    }
    let Some(list) = list_of(state) else {
        return;
    };
    let Ok(mut list) = list.try_borrow_mut() else {
        return;
    };
    if list.start_drag(&pointer_sample(ev), key) {
        state.todo.drag_started();
    }
}

fn delete(state: Rc<WidgetState>, key: ItemKey) {
    spawn_local(async move {
        if state.todo.delete_item(key).await.is_ok() {
            remove_row(&state, key);
        }
    });
}

fn add(state: Rc<WidgetState>, text: String, placement: Placement) {
    spawn_local(async move {
        // empty text is ignored, anything else was logged by the list
        if let Ok((index, entry)) = state.todo.add_item(&text, placement).await {
            let key = entry.key;
            state.last_added.set(Some(key));
            add_row(&state, index, entry);
            if let Some(list) = list_of(&state) {
                if let Some(element) = list.borrow().host().element(key) {
                    animate_row(element, true);
                }
            }
            if state.todo.len() == 1 {
                animate_input_margin(&state, true);
            }
            state.has_items.set(true);
        }
    });
}

fn focus_input(state: &WidgetState) {
    if let Some(input) = state.input.get_untracked() {
        let _ = input.focus();
    }
}

fn focus_last_added(state: &WidgetState) -> bool {
    let (Some(key), Some(list)) = (state.last_added.get(), list_of(state)) else {
        return false;
    };
    let list = list.borrow();
    let textarea = list
        .host()
        .element(key)
        .and_then(|row| row.query_selector("textarea").ok().flatten())
        .and_then(|e| e.dyn_into::<HtmlElement>().ok());
    match textarea {
        Some(textarea) => textarea.focus().is_ok(),
        None => false,
    }
}

fn item_row(
    key: ItemKey,
    text: RwSignal<String>,
    checked: RwSignal<bool>,
    state: WeakState,
) -> impl IntoView {
    let on_check = state.clone();
    let on_input = state.clone();
    let on_keydown = state.clone();
    let on_grab = state.clone();
    let on_delete = state;

    view! {
        <input
            type="checkbox"
            class="todo-item-checkbox shrink-0"
            prop:checked=checked
            on:change=move |ev| {
                let value = event_target_checked(&ev);
                checked.set(value);
                if let Some(state) = on_check.upgrade() {
                    save(state, key, ItemEdit::Checked(value));
                }
            }
        />
        <div class="auto-scaling-textarea-container min-width-0 grow">
            <textarea
                class="auto-scaling-textarea todo-item-text"
                placeholder="empty task"
                spellcheck="false"
                prop:value=text
                on:input=move |ev| {
                    text.set(event_target_value(&ev));
                    if let Some(state) = on_input.upgrade() {
                        text_edited(&state, key);
                    }
                }
                on:keydown=move |ev: KeyboardEvent| match ev.key().as_str() {
                    "Enter" => ev.prevent_default(),
                    "Escape" => {
                        ev.prevent_default();
                        if let Some(state) = on_keydown.upgrade() {
                            focus_input(&state);
                        }
                    }
                    _ => {}
                }
            ></textarea>
            <div class="auto-scaling-textarea-mimic">{move || format!("{} ", text.get())}</div>
            <div
                class="todo-item-drag-handle"
                on:mousedown=move |ev: MouseEvent| {
                    if let Some(state) = on_grab.upgrade() {
                        start_drag(&state, key, &ev);
                    }
                }
            ></div>
        </div>
        <button
            class="todo-item-delete shrink-0"
            inner_html=TRASH_ICON
            on:click=move |_| {
                if let Some(state) = on_delete.upgrade() {
                    delete(state, key);
                }
            }
        ></button>
    }
}

/// One to-do list backed by `/api/widgets/{widget_id}`.
#[component]
pub fn TodoWidget(widget_id: WidgetId, #[prop(optional)] config: WidgetConfig) -> impl IntoView {
    let items_ref = NodeRef::<Div>::new();
    let layer_ref = NodeRef::<Div>::new();
    let input_ref = NodeRef::<Textarea>::new();
    let input_container_ref = NodeRef::<Div>::new();
    let has_items = RwSignal::new(false);
    let (draft, set_draft) = signal(String::new());

    let store = HttpTodoStore::new(config.api_base.clone(), widget_id);
    let state = SendWrapper::new(Rc::new(WidgetState {
        todo: TodoList::new(store),
        config,
        reorder: RefCell::new(None),
        rows: RefCell::new(HashMap::new()),
        leaving: RefCell::new(HashSet::new()),
        last_added: Cell::new(None),
        moved: Cell::new(None),
        input: input_ref,
        input_container: input_container_ref,
        has_items,
    }));

    let mounted = state.clone();
    Effect::new(move |_| {
        let (Some(container), Some(layer)) = (items_ref.get(), layer_ref.get()) else {
            return;
        };
        if mounted.reorder.borrow().is_some() {
            return;
        }
        attach(&mounted, container.into(), layer.into());
    });

    let on_keydown = move |ev: KeyboardEvent| match ev.key().as_str() {
        "Enter" => {
            ev.prevent_default();
            let value = draft.get_untracked();
            let value = value.trim();
            if value.is_empty() {
                return;
            }
            let placement = if ev.ctrl_key() {
                Placement::Prepend
            } else {
                Placement::Append
            };
            add((*state).clone(), value.to_string(), placement);
            set_draft.set(String::new());
        }
        "Escape" => {
            if let Some(input) = input_ref.get_untracked() {
                let _ = input.blur();
            }
        }
        "ArrowDown" => {
            if focus_last_added(&state) {
                ev.prevent_default();
            }
        }
        _ => {}
    };

    view! {
        <div
            node_ref=input_container_ref
            class="todo-input flex gap-10 items-center"
            class:margin-bottom-15=move || has_items.get()
            style="padding-right: 2.5rem"
        >
            <div class="todo-plus-icon shrink-0"></div>
            <div class="auto-scaling-textarea-container grow min-width-0">
                <textarea
                    node_ref=input_ref
                    class="auto-scaling-textarea"
                    placeholder="Add a task"
                    spellcheck="false"
                    prop:value=draft
                    on:input=move |ev| set_draft.set(event_target_value(&ev))
                    on:keydown=on_keydown
                ></textarea>
                <div class="auto-scaling-textarea-mimic">{move || format!("{} ", draft.get())}</div>
            </div>
        </div>
        <div class="drag-and-drop-container">
            <div class="todo-items" node_ref=items_ref></div>
            <div node_ref=layer_ref></div>
        </div>
    }
}

/// Mounts a [`TodoWidget`] into every `.todo[data-widget-id]` placeholder on the page.
/// Placeholders with a bad configuration are logged and skipped.
pub fn mount_todo_widgets() -> AppResult<usize> {
    let placeholders = gloo::utils::document()
        .query_selector_all(".todo[data-widget-id]")
        .map_err(js_error)?;

    let mut mounted = 0;
    for index in 0..placeholders.length() {
        let Some(element) = placeholders
            .item(index)
            .and_then(|node| node.dyn_into::<HtmlElement>().ok())
        else {
            continue;
        };
        let widget_id = match element
            .get_attribute("data-widget-id")
            .filter(|id| !id.is_empty())
        {
            Some(id) => WidgetId(id),
            None => {
                log::error!("{}", AppError::MissingWidgetId);
                continue;
            }
        };
        let raw_config = element.get_attribute("data-config");
        let config = match WidgetConfig::from_attribute(raw_config.as_deref()) {
            Ok(config) => config,
            Err(e) => {
                log::error!("widget {widget_id}: {e}");
                continue;
            }
        };

        log::debug!("mounting to-do widget {widget_id}");
        mount_to(element, move || view! { <TodoWidget widget_id config /> }).forget();
        mounted += 1;
    }
    Ok(mounted)
}
