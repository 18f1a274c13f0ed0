use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::DocumentStore;
use crate::error::{Result, StokerError};

/// In-memory document store for testing.
///
/// Counts writes (the batch-update property asserts exactly one write per
/// batch) and can simulate write rejections.
#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: Mutex<HashMap<String, String>>,
    write_count: Mutex<usize>,
    simulate_write_error: Mutex<bool>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document directly, bypassing the write counter.
    pub fn insert(&self, path: &str, text: &str) {
        self.docs
            .lock()
            .unwrap()
            .insert(path.to_string(), text.to_string());
    }

    pub fn remove(&self, path: &str) {
        self.docs.lock().unwrap().remove(path);
    }

    pub fn contents(&self, path: &str) -> Option<String> {
        self.docs.lock().unwrap().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.docs.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn write_count(&self) -> usize {
        *self.write_count.lock().unwrap()
    }

    pub fn reset_write_count(&self) {
        *self.write_count.lock().unwrap() = 0;
    }

    pub fn set_simulate_write_error(&self, simulate: bool) {
        *self.simulate_write_error.lock().unwrap() = simulate;
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn exists(&self, path: &str) -> bool {
        self.docs.lock().unwrap().contains_key(path)
    }

    async fn read(&self, path: &str) -> Result<String> {
        self.docs
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| StokerError::Store(format!("Document not found: {}", path)))
    }

    async fn write(&self, path: &str, text: &str) -> Result<()> {
        if *self.simulate_write_error.lock().unwrap() {
            return Err(StokerError::Store("Simulated write error".to_string()));
        }
        *self.write_count.lock().unwrap() += 1;
        self.docs
            .lock()
            .unwrap()
            .insert(path.to_string(), text.to_string());
        Ok(())
    }

    async fn create_containing(&self, _path: &str) -> Result<()> {
        // Virtual paths have no folders to create.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_counting() {
        let store = MemoryDocumentStore::new();
        store.write("a.md", "1").await.unwrap();
        store.write("a.md", "2").await.unwrap();
        assert_eq!(store.write_count(), 2);

        store.insert("b.md", "seeded");
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_simulated_write_error() {
        let store = MemoryDocumentStore::new();
        store.set_simulate_write_error(true);
        assert!(store.write("a.md", "1").await.is_err());
        assert!(!store.exists("a.md").await);
    }
}
