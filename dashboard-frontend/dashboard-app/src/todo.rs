use std::cell::RefCell;
use std::collections::HashMap;

use dashboard_api_types::todo::{ItemId, NewTodoItem, TodoItem};

use crate::api::TodoStore;
use crate::error::{AppError, AppResult};
use crate::reorder::ItemKey;

/// A to-do item together with the handle the reorder engine knows it by.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TodoEntry {
    pub key: ItemKey,
    pub item: TodoItem,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    Append,
    Prepend,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemEdit {
    Text(String),
    Checked(bool),
}

#[derive(Default)]
struct ListState {
    entries: Vec<TodoEntry>,
    next_key: u64,
    is_dragging: bool,
    /// Keys edited while a drag was in flight, in the order they were first edited.
    deferred: Vec<ItemKey>,
    order_out_of_sync: bool,
    /// What the server last accepted for each item, used to roll back failed updates.
    persisted: HashMap<ItemKey, TodoItem>,
}

impl ListState {
    fn allocate_key(&mut self) -> ItemKey {
        self.next_key += 1;
        ItemKey(self.next_key)
    }

    fn position(&self, key: ItemKey) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }

    fn entry_mut(&mut self, key: ItemKey) -> Option<&mut TodoEntry> {
        self.entries.iter_mut().find(|e| e.key == key)
    }

    fn order_ids(&self) -> Vec<ItemId> {
        self.entries
            .iter()
            .filter_map(|e| e.item.id.clone())
            .collect()
    }

    /// Moves `key` to `to`, looked up by key so a stale `from` is tolerated.
    fn apply_move(&mut self, key: ItemKey, from: usize, to: usize) -> AppResult<()> {
        let current = self.position(key).ok_or(AppError::UnknownItem)?;
        if current != from {
            log::debug!("{key} moved from {current}, expected {from}");
        }
        let entry = self.entries.remove(current);
        let to = to.min(self.entries.len());
        self.entries.insert(to, entry);
        Ok(())
    }
}

/// Local state of one to-do widget, kept in step with a [`TodoStore`].
///
/// Every method takes `&self` so the list can be shared with the event handlers of the
/// widget. The state is never borrowed across an await.
pub struct TodoList<S> {
    store: S,
    state: RefCell<ListState>,
}

impl<S: TodoStore> TodoList<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            state: RefCell::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn entries(&self) -> Vec<TodoEntry> {
        self.state.borrow().entries.clone()
    }

    pub fn entry(&self, key: ItemKey) -> Option<TodoEntry> {
        let state = self.state.borrow();
        state.entries.iter().find(|e| e.key == key).cloned()
    }

    pub fn keys(&self) -> Vec<ItemKey> {
        self.state.borrow().entries.iter().map(|e| e.key).collect()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Server ids in list order. Items the server hasn't assigned an id to are skipped.
    pub fn order_ids(&self) -> Vec<ItemId> {
        self.state.borrow().order_ids()
    }

    pub fn is_dragging(&self) -> bool {
        self.state.borrow().is_dragging
    }

    /// The last reorder request failed and will be sent again when the next drag ends.
    pub fn order_out_of_sync(&self) -> bool {
        self.state.borrow().order_out_of_sync
    }

    /// Replaces the local items with the server's. A failed fetch leaves the list empty.
    pub async fn load(&self) -> Vec<TodoEntry> {
        let items = match self.store.list_items().await {
            Ok(items) => items,
            Err(e) => {
                log::error!("Failed to load items: {e}");
                Vec::new()
            }
        };

        let mut state = self.state.borrow_mut();
        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            let key = state.allocate_key();
            entries.push(TodoEntry { key, item });
        }
        state.persisted = entries.iter().map(|e| (e.key, e.item.clone())).collect();
        state.deferred.clear();
        state.entries = entries.clone();
        log::debug!("loaded {} items", entries.len());
        entries
    }

    /// Creates the item on the server and only then adds it locally. Returns the index it
    /// was inserted at.
    pub async fn add_item(
        &self,
        text: &str,
        placement: Placement,
    ) -> AppResult<(usize, TodoEntry)> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::EmptyText);
        }
        let new_item = NewTodoItem {
            text: text.to_string(),
            checked: false,
        };
        let item = self.store.add_item(&new_item).await.map_err(|e| {
            log::error!("Failed to add item: {e}");
            e
        })?;

        let (index, entry, sync_order) = {
            let mut state = self.state.borrow_mut();
            let entry = TodoEntry {
                key: state.allocate_key(),
                item,
            };
            let index = match placement {
                Placement::Append => state.entries.len(),
                Placement::Prepend => 0,
            };
            state.entries.insert(index, entry.clone());
            state.persisted.insert(entry.key, entry.item.clone());

            // the server always appends, so a prepended item needs its order pushed
            let sync_order = index == 0 && state.entries.len() > 1;
            if sync_order && state.is_dragging {
                state.order_out_of_sync = true;
            }
            (index, entry, sync_order && !state.is_dragging)
        };

        if sync_order {
            // failure is recorded in order_out_of_sync
            let _ = self.send_order().await;
        }
        Ok((index, entry))
    }

    /// Applies `edit` locally and persists it, unless a drag is in flight, in which case
    /// the update waits for [`drag_ended`](Self::drag_ended).
    pub async fn edit_item(&self, key: ItemKey, edit: ItemEdit) -> AppResult<()> {
        {
            let mut state = self.state.borrow_mut();
            let is_dragging = state.is_dragging;
            let entry = state.entry_mut(key).ok_or(AppError::UnknownItem)?;
            match edit {
                ItemEdit::Text(text) => entry.item.text = text,
                ItemEdit::Checked(checked) => entry.item.checked = checked,
            }
            if entry.item.id.is_none() {
                return Ok(());
            }
            if is_dragging {
                if !state.deferred.contains(&key) {
                    state.deferred.push(key);
                }
                return Ok(());
            }
        }
        self.persist(key).await
    }

    /// Deletes on the server first. The entry stays if the server refused, and its
    /// former index is returned otherwise.
    pub async fn delete_item(&self, key: ItemKey) -> AppResult<usize> {
        let id = {
            let state = self.state.borrow();
            let index = state.position(key).ok_or(AppError::UnknownItem)?;
            state.entries[index].item.id.clone()
        };
        if let Some(id) = id {
            self.store.delete_item(&id).await.map_err(|e| {
                log::error!("Failed to delete item {id}: {e}");
                e
            })?;
        }

        let mut state = self.state.borrow_mut();
        // the list may have changed while the request was in flight
        let index = state.position(key).ok_or(AppError::UnknownItem)?;
        state.entries.remove(index);
        state.persisted.remove(&key);
        state.deferred.retain(|k| *k != key);
        Ok(index)
    }

    pub fn drag_started(&self) {
        self.state.borrow_mut().is_dragging = true;
    }

    /// Sends the updates held back during the drag, then the order if an earlier attempt
    /// failed.
    pub async fn drag_ended(&self) {
        self.drag_finished(None).await
    }

    /// Ends a drag in one step: applies the `(key, from, to)` move it produced, if any,
    /// sends the updates held back during the drag, then sends the order at most once.
    pub async fn drag_finished(&self, moved: Option<(ItemKey, usize, usize)>) {
        let (deferred, send_order) = {
            let mut state = self.state.borrow_mut();
            state.is_dragging = false;
            let moved = match moved {
                Some((key, from, to)) => match state.apply_move(key, from, to) {
                    Ok(()) => true,
                    Err(_) => {
                        log::debug!("{key} was removed during the drag");
                        false
                    }
                },
                None => false,
            };
            (
                std::mem::take(&mut state.deferred),
                moved || state.order_out_of_sync,
            )
        };

        for key in deferred {
            // errors are logged by persist and the item is rolled back
            let _ = self.persist(key).await;
        }
        if send_order {
            // failure is recorded in order_out_of_sync
            let _ = self.send_order().await;
        }
    }

    /// Mirrors a finished drag onto the local order and persists it.
    pub async fn item_repositioned(
        &self,
        key: ItemKey,
        from: usize,
        to: usize,
    ) -> AppResult<()> {
        self.state.borrow_mut().apply_move(key, from, to)?;
        self.send_order().await
    }

    /// The list's value for the field `edit` touches. Used to put a single field back in
    /// line after a failed update without touching the others.
    pub fn current_field(&self, key: ItemKey, edit: &ItemEdit) -> Option<ItemEdit> {
        let item = self.entry(key)?.item;
        Some(match edit {
            ItemEdit::Text(_) => ItemEdit::Text(item.text),
            ItemEdit::Checked(_) => ItemEdit::Checked(item.checked),
        })
    }

    async fn send_order(&self) -> AppResult<()> {
        let ids = self.order_ids();
        if ids.is_empty() {
            return Ok(());
        }
        match self.store.reorder_items(&ids).await {
            Ok(ack) => {
                let mut state = self.state.borrow_mut();
                state.order_out_of_sync = false;
                let ListState {
                    entries, persisted, ..
                } = &mut *state;
                let with_id = entries.iter_mut().filter(|e| e.item.id.is_some());
                for (order, entry) in with_id.enumerate() {
                    entry.item.order = order as i32;
                    if let Some(persisted) = persisted.get_mut(&entry.key) {
                        persisted.order = order as i32;
                    }
                }
                log::debug!("order of {} items saved ({})", ids.len(), ack.status);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to reorder items: {e}");
                self.state.borrow_mut().order_out_of_sync = true;
                Err(e)
            }
        }
    }

    /// PUTs the current state of `key`. On failure the local fields go back to what the
    /// server last accepted, unless they were edited again in the meantime.
    async fn persist(&self, key: ItemKey) -> AppResult<()> {
        let Some(sent) = self.entry(key).map(|e| e.item) else {
            return Ok(());
        };
        let Some(id) = sent.id.clone() else {
            return Ok(());
        };

        match self.store.update_item(&id, &sent).await {
            Ok(_) => {
                self.state.borrow_mut().persisted.insert(key, sent);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to update item {id}: {e}");
                let mut state = self.state.borrow_mut();
                let Some(previous) = state.persisted.get(&key).cloned() else {
                    return Err(e);
                };
                if let Some(entry) = state.entry_mut(key) {
                    if entry.item == sent {
                        entry.item.text = previous.text;
                        entry.item.checked = previous.checked;
                    }
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use async_trait::async_trait;
    use dashboard_api_types::todo::ReorderAck;

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    enum Request {
        List,
        Add(String),
        Update(ItemId, String, bool),
        Delete(ItemId),
        Reorder(Vec<ItemId>),
    }

    #[derive(Default)]
    struct MockStore {
        items: Vec<TodoItem>,
        requests: RefCell<Vec<Request>>,
        fail: Cell<bool>,
        next_id: Cell<u32>,
    }

    impl MockStore {
        fn with_items(ids: &[&str]) -> Self {
            let items = ids
                .iter()
                .enumerate()
                .map(|(order, id)| TodoItem {
                    id: (!id.is_empty()).then(|| ItemId::from(*id)),
                    text: format!("task {id}"),
                    checked: false,
                    order: order as i32,
                })
                .collect();
            Self {
                items,
                next_id: Cell::new(100),
                ..Default::default()
            }
        }

        fn record(&self, request: Request) -> AppResult<()> {
            self.requests.borrow_mut().push(request);
            if self.fail.get() {
                return Err(AppError::Status(500));
            }
            Ok(())
        }

        fn take_requests(&self) -> Vec<Request> {
            std::mem::take(&mut *self.requests.borrow_mut())
        }
    }

    #[async_trait(?Send)]
    impl TodoStore for MockStore {
        async fn list_items(&self) -> AppResult<Vec<TodoItem>> {
            self.record(Request::List)?;
            Ok(self.items.clone())
        }

        async fn add_item(&self, item: &NewTodoItem) -> AppResult<TodoItem> {
            self.record(Request::Add(item.text.clone()))?;
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            Ok(TodoItem {
                id: Some(ItemId(id.to_string())),
                text: item.text.clone(),
                checked: item.checked,
                order: 0,
            })
        }

        async fn update_item(&self, id: &ItemId, item: &TodoItem) -> AppResult<TodoItem> {
            self.record(Request::Update(id.clone(), item.text.clone(), item.checked))?;
            Ok(item.clone())
        }

        async fn delete_item(&self, id: &ItemId) -> AppResult<()> {
            self.record(Request::Delete(id.clone()))
        }

        async fn reorder_items(&self, ids: &[ItemId]) -> AppResult<ReorderAck> {
            self.record(Request::Reorder(ids.to_vec()))?;
            Ok(ReorderAck::success())
        }
    }

    async fn loaded(ids: &[&str]) -> TodoList<MockStore> {
        let list = TodoList::new(MockStore::with_items(ids));
        list.load().await;
        list.store().take_requests();
        list
    }

    fn ids(ids: &[&str]) -> Vec<ItemId> {
        ids.iter().map(|id| ItemId::from(*id)).collect()
    }

    #[tokio::test]
    async fn load_keeps_server_order() {
        let list = TodoList::new(MockStore::with_items(&["a", "b", "c"]));
        let entries = list.load().await;
        assert_eq!(entries.len(), 3);
        assert_eq!(list.order_ids(), ids(&["a", "b", "c"]));
        let mut keys = list.keys();
        keys.dedup();
        assert_eq!(keys.len(), 3);
    }

    #[tokio::test]
    async fn failed_load_is_an_empty_list() {
        let store = MockStore::with_items(&["a"]);
        store.fail.set(true);
        let list = TodoList::new(store);
        assert!(list.load().await.is_empty());
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn reorder_sends_ids_in_new_order() {
        let list = loaded(&["a", "b", "c"]).await;
        let c = list.keys()[2];

        // [a, b, c] -> [c, a, b]
        list.item_repositioned(c, 2, 0).await.unwrap();
        assert_eq!(
            list.store().take_requests(),
            vec![Request::Reorder(ids(&["c", "a", "b"]))]
        );
        assert_eq!(list.entry(c).unwrap().item.order, 0);
    }

    #[tokio::test]
    async fn reorder_skips_items_without_id() {
        let list = loaded(&["a", "", "b"]).await;
        let a = list.keys()[0];
        list.item_repositioned(a, 0, 2).await.unwrap();
        assert_eq!(
            list.store().take_requests(),
            vec![Request::Reorder(ids(&["b", "a"]))]
        );
    }

    #[tokio::test]
    async fn reorder_of_id_less_list_sends_nothing() {
        let list = loaded(&["", ""]).await;
        let first = list.keys()[0];
        list.item_repositioned(first, 0, 1).await.unwrap();
        assert!(list.store().take_requests().is_empty());
    }

    #[tokio::test]
    async fn edits_during_drag_wait_for_drag_end() {
        let list = loaded(&["a", "b"]).await;
        let [a, b] = [list.keys()[0], list.keys()[1]];

        list.drag_started();
        list.edit_item(a, ItemEdit::Text("first".to_string()))
            .await
            .unwrap();
        list.edit_item(b, ItemEdit::Checked(true)).await.unwrap();
        list.edit_item(a, ItemEdit::Text("second".to_string()))
            .await
            .unwrap();
        assert!(list.store().take_requests().is_empty());
        assert_eq!(list.entry(a).unwrap().item.text, "second");

        list.drag_ended().await;
        assert_eq!(
            list.store().take_requests(),
            vec![
                Request::Update(ItemId::from("a"), "second".to_string(), false),
                Request::Update(ItemId::from("b"), "task b".to_string(), true),
            ]
        );
        assert!(!list.is_dragging());
    }

    #[tokio::test]
    async fn edits_outside_a_drag_are_sent_immediately() {
        let list = loaded(&["a", ""]).await;
        let [a, local] = [list.keys()[0], list.keys()[1]];

        list.edit_item(a, ItemEdit::Checked(true)).await.unwrap();
        list.edit_item(local, ItemEdit::Text("offline".to_string()))
            .await
            .unwrap();
        assert_eq!(
            list.store().take_requests(),
            vec![Request::Update(ItemId::from("a"), "task a".to_string(), true)]
        );
        assert_eq!(list.entry(local).unwrap().item.text, "offline");

        let err = list
            .edit_item(ItemKey(999), ItemEdit::Checked(true))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownItem));
    }

    #[tokio::test]
    async fn failed_update_rolls_back() {
        let list = loaded(&["a"]).await;
        let a = list.keys()[0];
        list.store().fail.set(true);

        let err = list
            .edit_item(a, ItemEdit::Text("lost".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Status(500)));
        assert_eq!(list.entry(a).unwrap().item.text, "task a");

        list.store().fail.set(false);
        list.edit_item(a, ItemEdit::Text("kept".to_string()))
            .await
            .unwrap();
        list.store().fail.set(true);
        let _ = list.edit_item(a, ItemEdit::Checked(true)).await;
        let item = list.entry(a).unwrap().item;
        assert_eq!(item.text, "kept");
        assert!(!item.checked);
    }

    #[tokio::test]
    async fn failed_reorder_is_retried_after_next_drag() {
        let list = loaded(&["a", "b"]).await;
        let b = list.keys()[1];

        list.store().fail.set(true);
        assert!(list.item_repositioned(b, 1, 0).await.is_err());
        assert!(list.order_out_of_sync());
        // the optimistic order stays
        assert_eq!(list.order_ids(), ids(&["b", "a"]));

        list.store().fail.set(false);
        list.store().take_requests();
        list.drag_started();
        list.drag_ended().await;
        assert_eq!(
            list.store().take_requests(),
            vec![Request::Reorder(ids(&["b", "a"]))]
        );
        assert!(!list.order_out_of_sync());
    }

    #[tokio::test]
    async fn finished_drag_sends_the_final_order_once() {
        let list = loaded(&["a", "b", "c"]).await;
        let [b, c] = [list.keys()[1], list.keys()[2]];

        list.store().fail.set(true);
        assert!(list.item_repositioned(b, 1, 0).await.is_err());
        assert!(list.order_out_of_sync());
        list.store().fail.set(false);
        list.store().take_requests();

        // [b, a, c] -> [c, b, a]
        list.drag_started();
        list.drag_finished(Some((c, 2, 0))).await;
        assert_eq!(
            list.store().take_requests(),
            vec![Request::Reorder(ids(&["c", "b", "a"]))]
        );
        assert!(!list.order_out_of_sync());
        assert!(!list.is_dragging());
    }

    #[tokio::test]
    async fn finished_drag_flushes_edits_before_the_order() {
        let list = loaded(&["a", "b"]).await;
        let [a, b] = [list.keys()[0], list.keys()[1]];

        list.drag_started();
        list.edit_item(a, ItemEdit::Checked(true)).await.unwrap();
        list.drag_finished(Some((b, 1, 0))).await;
        assert_eq!(
            list.store().take_requests(),
            vec![
                Request::Update(ItemId::from("a"), "task a".to_string(), true),
                Request::Reorder(ids(&["b", "a"])),
            ]
        );
    }

    #[tokio::test]
    async fn finished_drag_of_a_deleted_item_sends_no_order() {
        let list = loaded(&["a", "b"]).await;
        let a = list.keys()[0];

        list.drag_started();
        list.delete_item(a).await.unwrap();
        list.drag_finished(Some((a, 0, 1))).await;
        assert_eq!(
            list.store().take_requests(),
            vec![Request::Delete(ItemId::from("a"))]
        );
        assert_eq!(list.order_ids(), ids(&["b"]));
    }

    #[tokio::test]
    async fn failed_toggle_only_restores_the_checkbox() {
        let list = loaded(&["a"]).await;
        let a = list.keys()[0];
        // text typed in the row but not yet handed to the list
        let typed = ItemEdit::Text("task a, edited".to_string());

        list.store().fail.set(true);
        let toggle = ItemEdit::Checked(true);
        assert!(list.edit_item(a, toggle.clone()).await.is_err());
        assert_eq!(
            list.current_field(a, &toggle),
            Some(ItemEdit::Checked(false))
        );

        // the pending text save still goes out with the new text
        list.store().fail.set(false);
        list.store().take_requests();
        list.edit_item(a, typed).await.unwrap();
        assert_eq!(
            list.store().take_requests(),
            vec![Request::Update(
                ItemId::from("a"),
                "task a, edited".to_string(),
                false
            )]
        );
        assert_eq!(list.current_field(ItemKey(999), &toggle), None);
    }

    #[tokio::test]
    async fn add_rejects_empty_text() {
        let list = loaded(&[]).await;
        let err = list.add_item("   ", Placement::Append).await.unwrap_err();
        assert!(matches!(err, AppError::EmptyText));
        assert!(list.store().take_requests().is_empty());
    }

    #[tokio::test]
    async fn add_waits_for_server_id() {
        let list = loaded(&["a"]).await;
        let (index, entry) = list.add_item(" milk ", Placement::Append).await.unwrap();
        assert_eq!(index, 1);
        assert_eq!(entry.item.text, "milk");
        assert_eq!(entry.item.id, Some(ItemId::from("100")));
        assert_eq!(
            list.store().take_requests(),
            vec![Request::Add("milk".to_string())]
        );

        list.store().fail.set(true);
        assert!(list.add_item("eggs", Placement::Append).await.is_err());
        assert_eq!(list.len(), 2);
    }

    #[tokio::test]
    async fn prepend_pushes_order() {
        let list = loaded(&["a"]).await;
        let (index, _) = list.add_item("first", Placement::Prepend).await.unwrap();
        assert_eq!(index, 0);
        assert_eq!(
            list.store().take_requests(),
            vec![
                Request::Add("first".to_string()),
                Request::Reorder(ids(&["100", "a"])),
            ]
        );
    }

    #[tokio::test]
    async fn prepend_during_drag_waits_for_drag_end() {
        let list = loaded(&["a"]).await;
        list.drag_started();
        list.add_item("first", Placement::Prepend).await.unwrap();
        assert_eq!(
            list.store().take_requests(),
            vec![Request::Add("first".to_string())]
        );
        list.drag_ended().await;
        assert_eq!(
            list.store().take_requests(),
            vec![Request::Reorder(ids(&["100", "a"]))]
        );
    }

    #[tokio::test]
    async fn delete_keeps_entry_when_server_refuses() {
        let list = loaded(&["a", "b"]).await;
        let [a, b] = [list.keys()[0], list.keys()[1]];

        list.store().fail.set(true);
        assert!(list.delete_item(a).await.is_err());
        assert_eq!(list.len(), 2);

        list.store().fail.set(false);
        assert_eq!(list.delete_item(b).await.unwrap(), 1);
        assert_eq!(list.order_ids(), ids(&["a"]));
        assert_eq!(
            list.store().take_requests(),
            vec![Request::Delete(ItemId::from("a")), Request::Delete(ItemId::from("b"))]
        );
    }

    #[tokio::test]
    async fn deleted_item_is_not_flushed_after_drag() {
        let list = loaded(&["a", "b"]).await;
        let a = list.keys()[0];
        list.drag_started();
        list.edit_item(a, ItemEdit::Checked(true)).await.unwrap();
        list.delete_item(a).await.unwrap();
        list.drag_ended().await;
        assert_eq!(
            list.store().take_requests(),
            vec![Request::Delete(ItemId::from("a"))]
        );
    }
}
