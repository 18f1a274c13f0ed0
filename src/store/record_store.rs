//! # Per-List Record Store
//!
//! One [`RecordStore`] owns the in-memory item list for one document. Typed
//! CRUD goes through it exclusively; callers receive independent copies, so
//! nothing can mutate items behind persistence's back.
//!
//! ## Persistence Discipline
//!
//! Every mutator updates the in-memory list first, then awaits one
//! whole-document write, then emits its change event. A rejected write
//! propagates to the caller; the in-memory mutation is not rolled back, so
//! memory can run ahead of disk until the next successful save. Overlapping
//! saves are not sequenced: each one serializes the snapshot taken at the
//! moment it was invoked, and completion order is up to the document store.
//!
//! ## Events
//!
//! `DataLoaded`, `ItemAdded`, `ItemUpdated`, `ItemDeleted` — delivered
//! synchronously once the operation's write has been accepted. Batch updates
//! issue exactly one write and one `ItemUpdated` per affected item.

use std::sync::Arc;
use uuid::Uuid;

use super::DocumentStore;
use crate::codec;
use crate::error::Result;
use crate::events::{InventoryEvent, ListenerHandle, Listeners};
use crate::model::{ItemPatch, ItemRecord, Quantity};
use crate::status::{stock_status, StockStatus};

/// One entry in a batch update.
#[derive(Debug, Clone)]
pub struct ItemUpdate {
    pub id: Uuid,
    pub patch: ItemPatch,
}

pub struct RecordStore<S: DocumentStore> {
    docs: Arc<S>,
    path: String,
    version: u32,
    items: Vec<ItemRecord>,
    listeners: Listeners<InventoryEvent>,
}

impl<S: DocumentStore> RecordStore<S> {
    pub fn new(docs: Arc<S>, path: impl Into<String>) -> Self {
        Self {
            docs,
            path: path.into(),
            version: 1,
            items: Vec::new(),
            listeners: Listeners::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Point the store at a new backing document. Callers reload afterwards
    /// when the content may differ (rename keeps content, so it may skip).
    pub fn repoint(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// Read the backing document. A missing document is an empty inventory,
    /// not an error. Always ends by announcing `DataLoaded`.
    pub async fn load(&mut self) -> Result<()> {
        if self.docs.exists(&self.path).await {
            let text = self.docs.read(&self.path).await?;
            let doc = codec::parse(&text);
            self.version = doc.version;
            self.items = doc.items;
        } else {
            self.version = 1;
            self.items = Vec::new();
        }
        self.listeners.emit(&InventoryEvent::DataLoaded);
        Ok(())
    }

    /// Serialize the current in-memory items and rewrite the document,
    /// creating it (parent containment included) on first write.
    pub async fn save(&self) -> Result<()> {
        let text = codec::serialize(self.version, &self.items);
        if !self.docs.exists(&self.path).await {
            self.docs.create_containing(&self.path).await?;
        }
        self.docs.write(&self.path, &text).await
    }

    // --- Read-only projections (independent copies) ---

    pub fn items(&self) -> Vec<ItemRecord> {
        self.items.clone()
    }

    pub fn item(&self, id: &Uuid) -> Option<ItemRecord> {
        self.items.iter().find(|i| i.id == *id).cloned()
    }

    pub fn items_by_category(&self, category: &str) -> Vec<ItemRecord> {
        self.items
            .iter()
            .filter(|i| i.category == category)
            .cloned()
            .collect()
    }

    /// Distinct categories, sorted, with the empty (uncategorized) one last.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self.items.iter().map(|i| i.category.clone()).collect();
        categories.sort();
        categories.dedup();
        if let Some(pos) = categories.iter().position(String::is_empty) {
            let empty = categories.remove(pos);
            categories.push(empty);
        }
        categories
    }

    pub fn low_stock_items(&self) -> Vec<ItemRecord> {
        self.items
            .iter()
            .filter(|i| matches!(stock_status(i), StockStatus::Warning | StockStatus::Out))
            .cloned()
            .collect()
    }

    pub fn planned_restock_items(&self) -> Vec<ItemRecord> {
        self.items
            .iter()
            .filter(|i| i.planned_restock)
            .cloned()
            .collect()
    }

    // --- Mutators ---

    /// Append a new item under a fresh id, persist, announce `ItemAdded`.
    /// The incoming id is discarded so re-adding a copy of an existing
    /// record cannot duplicate ids.
    pub async fn add_item(&mut self, mut item: ItemRecord) -> Result<ItemRecord> {
        item.id = Uuid::new_v4();
        self.items.push(item.clone());
        self.save().await?;
        self.listeners.emit(&InventoryEvent::ItemAdded(item.clone()));
        Ok(item)
    }

    /// Merge a partial update onto the item. Unknown ids are `Ok(None)`.
    pub async fn update_item(&mut self, id: &Uuid, patch: ItemPatch) -> Result<Option<ItemRecord>> {
        let Some(item) = self.items.iter_mut().find(|i| i.id == *id) else {
            return Ok(None);
        };
        item.apply(&patch);
        let updated = item.clone();

        self.save().await?;
        self.listeners
            .emit(&InventoryEvent::ItemUpdated(updated.clone()));
        Ok(Some(updated))
    }

    /// Apply every merge in memory, then persist once. Used by category
    /// rename/delete to avoid one write per item.
    pub async fn update_items_batch(&mut self, updates: Vec<ItemUpdate>) -> Result<Vec<ItemRecord>> {
        let mut affected = Vec::new();
        for update in &updates {
            if let Some(item) = self.items.iter_mut().find(|i| i.id == update.id) {
                item.apply(&update.patch);
                affected.push(item.clone());
            }
        }

        self.save().await?;
        for item in &affected {
            self.listeners
                .emit(&InventoryEvent::ItemUpdated(item.clone()));
        }
        Ok(affected)
    }

    /// Move every item in `from` to the `to` category with a single write.
    pub async fn rename_category(&mut self, from: &str, to: &str) -> Result<Vec<ItemRecord>> {
        let updates: Vec<ItemUpdate> = self
            .items
            .iter()
            .filter(|i| i.category == from)
            .map(|i| ItemUpdate {
                id: i.id,
                patch: ItemPatch::recategorize(to),
            })
            .collect();
        self.update_items_batch(updates).await
    }

    /// Remove the item, persist, announce `ItemDeleted`. Unknown ids are
    /// `Ok(false)`.
    pub async fn delete_item(&mut self, id: &Uuid) -> Result<bool> {
        let Some(pos) = self.items.iter().position(|i| i.id == *id) else {
            return Ok(false);
        };
        let removed = self.items.remove(pos);

        self.save().await?;
        self.listeners.emit(&InventoryEvent::ItemDeleted(removed));
        Ok(true)
    }

    /// Add to a measured amount. Flags and unknown ids are `Ok(None)`.
    pub async fn increase_amount(&mut self, id: &Uuid, by: f64) -> Result<Option<ItemRecord>> {
        self.adjust_amount(id, by).await
    }

    /// Subtract from a measured amount, clamping the floor at 0.
    pub async fn decrease_amount(&mut self, id: &Uuid, by: f64) -> Result<Option<ItemRecord>> {
        self.adjust_amount(id, -by).await
    }

    async fn adjust_amount(&mut self, id: &Uuid, delta: f64) -> Result<Option<ItemRecord>> {
        let Some(item) = self.items.iter_mut().find(|i| i.id == *id) else {
            return Ok(None);
        };
        let Quantity::Measured { amount, .. } = &mut item.quantity else {
            return Ok(None);
        };
        *amount = (*amount + delta).max(0.0);
        let updated = item.clone();

        self.save().await?;
        self.listeners
            .emit(&InventoryEvent::ItemUpdated(updated.clone()));
        Ok(Some(updated))
    }

    /// Flip an in-stock flag. Measured items and unknown ids are `Ok(None)`.
    pub async fn toggle_stock(&mut self, id: &Uuid) -> Result<Option<ItemRecord>> {
        let Some(item) = self.items.iter_mut().find(|i| i.id == *id) else {
            return Ok(None);
        };
        let Quantity::Flag { in_stock } = &mut item.quantity else {
            return Ok(None);
        };
        *in_stock = !*in_stock;
        let updated = item.clone();

        self.save().await?;
        self.listeners
            .emit(&InventoryEvent::ItemUpdated(updated.clone()));
        Ok(Some(updated))
    }

    /// Flip the planned-restock flag on any item.
    pub async fn toggle_planned_restock(&mut self, id: &Uuid) -> Result<Option<ItemRecord>> {
        let Some(item) = self.items.iter_mut().find(|i| i.id == *id) else {
            return Ok(None);
        };
        item.planned_restock = !item.planned_restock;
        let updated = item.clone();

        self.save().await?;
        self.listeners
            .emit(&InventoryEvent::ItemUpdated(updated.clone()));
        Ok(Some(updated))
    }

    // --- Change subscription ---

    pub fn subscribe<F>(&mut self, callback: F) -> ListenerHandle
    where
        F: Fn(&InventoryEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        self.listeners.unsubscribe(handle)
    }
}
