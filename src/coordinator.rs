//! # List Coordinator
//!
//! Owns the collection of known lists, a cache of [`RecordStore`] instances
//! (lazily populated on first access), and the active-list pointer. The
//! backing documents are user territory: they can be created, edited,
//! renamed, or deleted without going through us, so `initialize` reconciles
//! the configured lists against a discovery scan in both directions, and a
//! watch subscription keeps the set current afterwards.
//!
//! The coordinator never mutates a store's items; it only creates, loads,
//! repoints, and drops stores as whole units. Configuration changes go out
//! through the injected [`ConfigSink`] the moment they happen.
//!
//! Descriptor lifecycle: absent → (discovered | explicitly created) →
//! inactive ⇄ active → removed (explicit delete, or backing document
//! vanished). Removal is terminal; the cache entry is dropped and the id is
//! never reused.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::codec;
use crate::config::{ConfigSink, ListConfig, ListDescriptor};
use crate::discovery::{DiscoveryService, WatchEvent};
use crate::error::{Result, StokerError};
use crate::events::{ListEvent, ListenerHandle, Listeners};
use crate::store::{DocumentStore, RecordStore};

pub struct ListCoordinator<S: DocumentStore, D: DiscoveryService> {
    docs: Arc<S>,
    discovery: Arc<D>,
    config: ListConfig,
    persist: ConfigSink,
    stores: HashMap<String, RecordStore<S>>,
    watch_rx: Option<mpsc::UnboundedReceiver<WatchEvent>>,
    listeners: Listeners<ListEvent>,
}

impl<S: DocumentStore, D: DiscoveryService> ListCoordinator<S, D> {
    pub fn new(docs: Arc<S>, discovery: Arc<D>, config: ListConfig, persist: ConfigSink) -> Self {
        Self {
            docs,
            discovery,
            config,
            persist,
            stores: HashMap::new(),
            watch_rx: None,
            listeners: Listeners::new(),
        }
    }

    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    pub fn lists(&self) -> &[ListDescriptor] {
        &self.config.lists
    }

    pub fn active_list_id(&self) -> Option<&str> {
        self.config.active_list_id.as_deref()
    }

    /// Reconcile configuration against discovery, activate a list if none
    /// is active, load the active store, and start the watch subscription.
    ///
    /// Running this twice with no external document changes persists nothing
    /// and duplicates nothing.
    pub async fn initialize(&mut self) -> Result<()> {
        let mut changed = false;

        // Register discovered documents we don't know about yet.
        for doc in self.discovery.scan().await? {
            if doc.marker_value != codec::MARKER_VALUE {
                continue;
            }
            if self.config.descriptor_for_path(&doc.path).is_none() {
                debug!(path = %doc.path, "registering discovered list");
                self.config.lists.push(ListDescriptor::for_path(&doc.path));
                changed = true;
            }
        }

        // Drop descriptors whose backing document vanished.
        let known: Vec<(String, String)> = self
            .config
            .lists
            .iter()
            .map(|d| (d.id.clone(), d.file_path.clone()))
            .collect();
        for (id, path) in known {
            if !self.docs.exists(&path).await {
                warn!(%path, "backing document vanished, removing list");
                self.config.lists.retain(|d| d.id != id);
                self.stores.remove(&id);
                if self.config.active_list_id.as_deref() == Some(id.as_str()) {
                    self.config.active_list_id = None;
                }
                changed = true;
            }
        }

        if self.config.active_list_id.is_none() {
            if let Some(first) = self.config.lists.first() {
                self.config.active_list_id = Some(first.id.clone());
                changed = true;
            }
        }

        if changed {
            self.persist_config()?;
        }

        if let Some(active) = self.config.active_list_id.clone() {
            self.load_list(&active).await?;
        }

        self.watch_rx = Some(self.discovery.watch());
        Ok(())
    }

    /// Fetch the store for a list, instantiating and loading it on first
    /// access. Unknown ids are `Ok(None)`.
    pub async fn open_store(&mut self, id: &str) -> Result<Option<&mut RecordStore<S>>> {
        let Some(descriptor) = self.config.descriptor(id) else {
            return Ok(None);
        };
        if !self.stores.contains_key(id) {
            let mut store = RecordStore::new(self.docs.clone(), descriptor.file_path.clone());
            store.load().await?;
            self.stores.insert(id.to_string(), store);
        }
        Ok(self.stores.get_mut(id))
    }

    /// Store of the active list, if any.
    pub async fn active_store(&mut self) -> Result<Option<&mut RecordStore<S>>> {
        let Some(id) = self.config.active_list_id.clone() else {
            return Ok(None);
        };
        self.open_store(&id).await
    }

    /// Create a new list backed by `path`. The target is validated by a
    /// load-then-save round trip before the descriptor is committed, so an
    /// unwritable path never lands in the configuration.
    pub async fn create_list(
        &mut self,
        name: impl Into<String>,
        path: impl Into<String>,
    ) -> Result<ListDescriptor> {
        let path = path.into();
        let mut store = RecordStore::new(self.docs.clone(), path.clone());
        store.load().await?;
        store.save().await?;

        let descriptor = ListDescriptor::new(name, path);
        let first = self.config.lists.is_empty();
        self.config.lists.push(descriptor.clone());
        self.stores.insert(descriptor.id.clone(), store);
        if first {
            self.config.active_list_id = Some(descriptor.id.clone());
        }

        self.persist_config()?;
        self.listeners.emit(&ListEvent::Created(descriptor.clone()));
        Ok(descriptor)
    }

    /// Remove a list from the configuration. The backing document is left
    /// untouched. When the active list is removed, the next remaining
    /// descriptor (or none) takes over and its store is loaded.
    pub async fn delete_list(&mut self, id: &str) -> Result<bool> {
        if self.config.descriptor(id).is_none() {
            return Ok(false);
        }
        self.config.lists.retain(|d| d.id != id);
        self.stores.remove(id);

        if self.config.active_list_id.as_deref() == Some(id) {
            self.config.active_list_id = self.config.lists.first().map(|d| d.id.clone());
            if let Some(next) = self.config.active_list_id.clone() {
                self.load_list(&next).await?;
            }
        }

        self.persist_config()?;
        self.listeners.emit(&ListEvent::Deleted(id.to_string()));
        Ok(true)
    }

    /// Make a list active and load its store. Switching to the already
    /// active list is a no-op; unknown ids are `Ok(false)`.
    pub async fn switch_list(&mut self, id: &str) -> Result<bool> {
        if self.config.active_list_id.as_deref() == Some(id) {
            return Ok(true);
        }
        if self.config.descriptor(id).is_none() {
            return Ok(false);
        }

        self.config.active_list_id = Some(id.to_string());
        self.persist_config()?;
        self.load_list(id).await?;
        self.listeners.emit(&ListEvent::Switched(id.to_string()));
        Ok(true)
    }

    /// Rename a list and/or move it to a new backing path. A path change
    /// repoints the cached store and reloads it.
    pub async fn update_list(
        &mut self,
        id: &str,
        name: Option<String>,
        file_path: Option<String>,
    ) -> Result<Option<ListDescriptor>> {
        let Some(descriptor) = self.config.descriptor_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            descriptor.name = name;
        }

        let mut repoint = None;
        if let Some(path) = file_path {
            if descriptor.file_path != path {
                descriptor.file_path = path.clone();
                repoint = Some(path);
            }
        }
        let updated = descriptor.clone();

        if let Some(path) = repoint {
            if let Some(store) = self.stores.get_mut(id) {
                store.repoint(path);
                store.load().await?;
            }
        }

        self.persist_config()?;
        self.listeners.emit(&ListEvent::Updated(updated.clone()));
        Ok(Some(updated))
    }

    /// External delete notification: the document backing one of our lists
    /// is gone. Mirrors `delete_list`, including active-pointer handover.
    pub async fn handle_file_deleted(&mut self, path: &str) -> Result<bool> {
        let Some(id) = self.config.descriptor_for_path(path).map(|d| d.id.clone()) else {
            return Ok(false);
        };
        self.delete_list(&id).await
    }

    /// External rename notification: rewrite the descriptor's path and
    /// repoint the cached store. The content moved with the file, so no
    /// reload is needed.
    pub async fn handle_file_renamed(&mut self, old_path: &str, new_path: &str) -> Result<bool> {
        let Some(id) = self
            .config
            .descriptor_for_path(old_path)
            .map(|d| d.id.clone())
        else {
            return Ok(false);
        };

        if let Some(descriptor) = self.config.descriptor_mut(&id) {
            descriptor.file_path = new_path.to_string();
        }
        if let Some(store) = self.stores.get_mut(&id) {
            store.repoint(new_path);
        }

        self.persist_config()?;
        let updated = self.config.descriptor(&id).cloned();
        if let Some(updated) = updated {
            self.listeners.emit(&ListEvent::Updated(updated));
        }
        Ok(true)
    }

    /// Drain pending watch notifications. Newly marked documents are
    /// auto-registered; a disappeared marker is logged but the list is kept
    /// until the user removes it. Returns the number of events processed.
    pub fn poll_watch_events(&mut self) -> Result<usize> {
        let mut pending = Vec::new();
        if let Some(rx) = self.watch_rx.as_mut() {
            while let Ok(event) = rx.try_recv() {
                pending.push(event);
            }
        }

        let processed = pending.len();
        let mut changed = false;
        for event in pending {
            match event {
                WatchEvent::MarkerAdded { path } => {
                    if self.config.descriptor_for_path(&path).is_none() {
                        let descriptor = ListDescriptor::for_path(&path);
                        self.config.lists.push(descriptor.clone());
                        self.listeners.emit(&ListEvent::Created(descriptor));
                        changed = true;
                    }
                }
                WatchEvent::MarkerRemoved { path } => {
                    if self.config.descriptor_for_path(&path).is_some() {
                        warn!(%path, "list document lost its marker; keeping the list");
                    }
                }
            }
        }

        if changed {
            self.persist_config()?;
        }
        Ok(processed)
    }

    // --- Query helpers for input validation ---

    pub fn is_file_path_used(&self, path: &str, exclude_id: Option<&str>) -> bool {
        self.config
            .lists
            .iter()
            .any(|d| d.file_path == path && Some(d.id.as_str()) != exclude_id)
    }

    pub async fn file_exists(&self, path: &str) -> bool {
        self.docs.exists(path).await
    }

    pub fn all_file_paths(&self) -> Vec<String> {
        self.config.lists.iter().map(|d| d.file_path.clone()).collect()
    }

    // --- Change subscription ---

    pub fn on_list_change<F>(&mut self, callback: F) -> ListenerHandle
    where
        F: Fn(&ListEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    pub fn off_list_change(&mut self, handle: ListenerHandle) -> bool {
        self.listeners.unsubscribe(handle)
    }

    /// Push the current configuration through the injected sink. Sink
    /// failures surface as configuration errors, distinct from document
    /// store failures.
    fn persist_config(&self) -> Result<()> {
        (self.persist)(&self.config)
            .map_err(|e| StokerError::Config(format!("persisting list configuration: {e}")))
    }

    /// Load a list's store, reusing the cache entry when present so
    /// external edits are picked up.
    async fn load_list(&mut self, id: &str) -> Result<()> {
        if let Some(store) = self.stores.get_mut(id) {
            store.load().await?;
            return Ok(());
        }
        self.open_store(id).await?;
        Ok(())
    }
}
