//! Batches of document level listeners that are added and removed as one unit.
//!
//! A drag owns the document's pointer listeners only while it is in flight. Grouping them in
//! a [`ToggleableEvents`] makes leaking a listener between drags impossible: the batch is either
//! fully attached or fully detached.

use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DocumentEvent {
    MouseMove,
    Scroll,
    MouseDown,
    ContextMenu,
    MouseUp,
}

impl DocumentEvent {
    pub const ALL: [DocumentEvent; 5] = [
        DocumentEvent::MouseMove,
        DocumentEvent::Scroll,
        DocumentEvent::MouseDown,
        DocumentEvent::ContextMenu,
        DocumentEvent::MouseUp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DocumentEvent::MouseMove => "mousemove",
            DocumentEvent::Scroll => "scroll",
            DocumentEvent::MouseDown => "mousedown",
            DocumentEvent::ContextMenu => "contextmenu",
            DocumentEvent::MouseUp => "mouseup",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.name() == name)
    }
}

pub type Handler<E> = Rc<dyn Fn(&E)>;

/// Something listeners can be registered on. Dropping the returned guard must remove the
/// listener again, the way `gloo::events::EventListener` does.
pub trait EventSource {
    type Event;
    type Guard;

    fn listen(&self, name: &'static str, handler: Handler<Self::Event>) -> Self::Guard;
}

pub struct ToggleableEvents<S: EventSource> {
    source: S,
    handlers: Vec<(&'static str, Handler<S::Event>)>,
    guards: Vec<S::Guard>,
}

impl<S: EventSource> ToggleableEvents<S> {
    pub fn new(
        source: S,
        handlers: impl IntoIterator<Item = (&'static str, Handler<S::Event>)>,
    ) -> Self {
        Self {
            source,
            handlers: handlers.into_iter().collect(),
            guards: Vec::new(),
        }
    }

    /// Adds every handler. Returns false if the batch was already attached.
    pub fn attach(&mut self) -> bool {
        if self.is_attached() {
            return false;
        }
        self.guards = self
            .handlers
            .iter()
            .map(|(name, handler)| self.source.listen(*name, handler.clone()))
            .collect();
        true
    }

    /// Removes every handler. Returns false if nothing was attached.
    pub fn detach(&mut self) -> bool {
        if !self.is_attached() {
            return false;
        }
        self.guards.clear();
        true
    }

    pub fn is_attached(&self) -> bool {
        !self.guards.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Keeps the live listener set so tests can fire events at it and check nothing leaks.
    #[derive(Clone, Default)]
    struct CountingSource {
        live: Rc<RefCell<Vec<(&'static str, Handler<u32>)>>>,
        added: Rc<RefCell<usize>>,
        removed: Rc<RefCell<usize>>,
    }

    struct CountingGuard {
        name: &'static str,
        source: CountingSource,
    }

    impl Drop for CountingGuard {
        fn drop(&mut self) {
            let mut live = self.source.live.borrow_mut();
            if let Some(index) = live.iter().position(|(name, _)| *name == self.name) {
                live.remove(index);
            }
            *self.source.removed.borrow_mut() += 1;
        }
    }

    impl EventSource for CountingSource {
        type Event = u32;
        type Guard = CountingGuard;

        fn listen(&self, name: &'static str, handler: Handler<u32>) -> CountingGuard {
            self.live.borrow_mut().push((name, handler));
            *self.added.borrow_mut() += 1;
            CountingGuard {
                name,
                source: self.clone(),
            }
        }
    }

    impl CountingSource {
        fn fire(&self, name: &str, event: u32) {
            let handlers: Vec<_> = self
                .live
                .borrow()
                .iter()
                .filter(|(n, _)| *n == name)
                .map(|(_, h)| h.clone())
                .collect();
            for handler in handlers {
                handler(&event);
            }
        }
    }

    fn batch(
        source: CountingSource,
        seen: Rc<RefCell<Vec<String>>>,
    ) -> ToggleableEvents<CountingSource> {
        let handlers = DocumentEvent::ALL.into_iter().map(|event| {
            let seen = seen.clone();
            let handler: Handler<u32> = Rc::new(move |value: &u32| {
                seen.borrow_mut().push(format!("{}:{value}", event.name()))
            });
            (event.name(), handler)
        });
        ToggleableEvents::new(source, handlers)
    }

    #[test]
    fn attach_and_detach_move_every_handler_together() {
        let source = CountingSource::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut events = batch(source.clone(), seen.clone());
        assert_eq!(events.len(), 5);

        source.fire("mousemove", 1);
        assert!(seen.borrow().is_empty());

        assert!(events.attach());
        assert_eq!(source.live.borrow().len(), 5);
        source.fire("mousemove", 2);
        source.fire("mouseup", 3);
        assert_eq!(*seen.borrow(), vec!["mousemove:2", "mouseup:3"]);

        assert!(events.detach());
        assert!(source.live.borrow().is_empty());
        source.fire("mousemove", 4);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn attaching_twice_does_not_double_register() {
        let source = CountingSource::default();
        let mut events = batch(source.clone(), Rc::default());
        assert!(events.attach());
        assert!(!events.attach());
        assert_eq!(*source.added.borrow(), 5);
        assert!(events.detach());
        assert!(!events.detach());
        assert_eq!(*source.removed.borrow(), 5);
    }

    #[test]
    fn dropping_the_batch_detaches() {
        let source = CountingSource::default();
        let mut events = batch(source.clone(), Rc::default());
        events.attach();
        drop(events);
        assert!(source.live.borrow().is_empty());
        assert_eq!(*source.added.borrow(), *source.removed.borrow());
    }

    #[test]
    fn event_names_round_trip() {
        for event in DocumentEvent::ALL {
            assert_eq!(DocumentEvent::from_name(event.name()), Some(event));
        }
        assert_eq!(DocumentEvent::from_name("keydown"), None);
    }
}
