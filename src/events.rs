//! Change notification.
//!
//! Each store and coordinator instance carries its own [`Listeners`] channel;
//! there is no global event bus. Subscribing hands back a [`ListenerHandle`]
//! that unregisters the callback when passed to `unsubscribe`. Events are
//! delivered synchronously at the point of mutation, once the operation's
//! persistence write has been accepted.

use crate::config::ListDescriptor;
use crate::model::ItemRecord;

/// Emitted by a `RecordStore`. Item payloads are independent copies.
#[derive(Debug, Clone, PartialEq)]
pub enum InventoryEvent {
    DataLoaded,
    ItemAdded(ItemRecord),
    ItemUpdated(ItemRecord),
    ItemDeleted(ItemRecord),
}

/// Emitted by a `ListCoordinator`.
#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent {
    Created(ListDescriptor),
    Deleted(String),
    Switched(String),
    Updated(ListDescriptor),
}

/// Opaque subscription handle returned by `subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

/// Per-instance callback registry.
pub struct Listeners<E> {
    next_id: u64,
    entries: Vec<(u64, Box<dyn Fn(&E) + Send + Sync>)>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> ListenerHandle
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, Box::new(callback)));
        ListenerHandle(id)
    }

    /// Returns true if the handle was registered.
    pub fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(id, _)| *id != handle.0);
        self.entries.len() != before
    }

    pub fn emit(&self, event: &E) {
        for (_, callback) in &self.entries {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_subscribe_and_emit() {
        let mut listeners: Listeners<InventoryEvent> = Listeners::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        listeners.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        listeners.emit(&InventoryEvent::DataLoaded);
        listeners.emit(&InventoryEvent::DataLoaded);

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut listeners: Listeners<InventoryEvent> = Listeners::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        let handle = listeners.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(listeners.unsubscribe(handle));
        listeners.emit(&InventoryEvent::DataLoaded);

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        // A stale handle unsubscribes nothing.
        assert!(!listeners.unsubscribe(handle));
    }

    #[test]
    fn test_handles_are_not_reused() {
        let mut listeners: Listeners<InventoryEvent> = Listeners::new();
        let first = listeners.subscribe(|_| {});
        listeners.unsubscribe(first);
        let second = listeners.subscribe(|_| {});
        assert_ne!(first, second);
    }
}
