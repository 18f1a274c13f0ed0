//! # Document Discovery
//!
//! Lists are discovered, not only configured: any document in the store
//! whose metadata block carries the discovery marker belongs to us, whether
//! we created it or the user pasted it in from elsewhere.
//!
//! [`DiscoveryService`] has two halves:
//!
//! - `scan` enumerates marker-bearing documents for startup reconciliation.
//!   A document that cannot be read is downgraded to "no marker" with a
//!   warning; one bad file never aborts a scan.
//! - `watch` hands back an async channel of [`WatchEvent`]s. Unsubscribing
//!   is dropping the receiver. The concrete platform file-watcher lives
//!   outside the core; implementations here expose `notify` so the host can
//!   forward its notifications into the channel.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::fs;
use tokio::sync::mpsc;
use tracing::warn;

use crate::codec;
use crate::error::Result;
use crate::store::memory::MemoryDocumentStore;

/// One scan hit: a document carrying the discovery marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDocument {
    pub path: String,
    pub marker_value: String,
}

/// External change to the set of marker-bearing documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A document gained the marker (created or edited to include it).
    MarkerAdded { path: String },
    /// A document lost the marker or was deleted.
    MarkerRemoved { path: String },
}

#[async_trait]
pub trait DiscoveryService: Send + Sync {
    /// Enumerate documents carrying the discovery marker.
    async fn scan(&self) -> Result<Vec<DiscoveredDocument>>;

    /// Subscribe to marker changes. Dropping the receiver unsubscribes.
    fn watch(&self) -> mpsc::UnboundedReceiver<WatchEvent>;
}

/// Fan-out channel shared by the discovery implementations. Closed
/// receivers are pruned on the next notify.
#[derive(Default)]
struct WatchChannel {
    senders: Mutex<Vec<mpsc::UnboundedSender<WatchEvent>>>,
}

impl WatchChannel {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<WatchEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().push(tx);
        rx
    }

    fn notify(&self, event: WatchEvent) {
        self.senders
            .lock()
            .unwrap()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Filesystem discovery rooted at a directory. `scan` walks the tree and
/// reads each file's metadata block; `notify` is the hook for the host's
/// platform file-watcher.
pub struct FsDiscovery {
    root: PathBuf,
    marker_key: String,
    channel: WatchChannel,
}

impl FsDiscovery {
    pub fn new(root: impl Into<PathBuf>, marker_key: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            marker_key: marker_key.into(),
            channel: WatchChannel::default(),
        }
    }

    /// Forward a platform file-watch notification to all subscribers.
    pub fn notify(&self, event: WatchEvent) {
        self.channel.notify(event);
    }
}

#[async_trait]
impl DiscoveryService for FsDiscovery {
    async fn scan(&self) -> Result<Vec<DiscoveredDocument>> {
        let mut found = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(dir = %dir.display(), %err, "skipping unreadable directory");
                    continue;
                }
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }

                // One unreadable document must not abort the whole scan.
                let text = match fs::read_to_string(&path).await {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(path = %path.display(), %err, "skipping unreadable document");
                        continue;
                    }
                };

                if let Some(marker_value) = codec::marker_value(&text, &self.marker_key) {
                    let rel = path.strip_prefix(&self.root).unwrap_or(&path);
                    found.push(DiscoveredDocument {
                        path: rel.to_string_lossy().replace('\\', "/"),
                        marker_value,
                    });
                }
            }
        }

        found.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(found)
    }

    fn watch(&self) -> mpsc::UnboundedReceiver<WatchEvent> {
        self.channel.subscribe()
    }
}

/// Discovery over a [`MemoryDocumentStore`] for testing. `notify` plays the
/// role of the platform file-watcher.
pub struct MemoryDiscovery {
    docs: Arc<MemoryDocumentStore>,
    marker_key: String,
    channel: WatchChannel,
}

impl MemoryDiscovery {
    pub fn new(docs: Arc<MemoryDocumentStore>, marker_key: impl Into<String>) -> Self {
        Self {
            docs,
            marker_key: marker_key.into(),
            channel: WatchChannel::default(),
        }
    }

    pub fn notify(&self, event: WatchEvent) {
        self.channel.notify(event);
    }
}

#[async_trait]
impl DiscoveryService for MemoryDiscovery {
    async fn scan(&self) -> Result<Vec<DiscoveredDocument>> {
        let mut found = Vec::new();
        for path in self.docs.paths() {
            let Some(text) = self.docs.contents(&path) else {
                continue;
            };
            if let Some(marker_value) = codec::marker_value(&text, &self.marker_key) {
                found.push(DiscoveredDocument { path, marker_value });
            }
        }
        Ok(found)
    }

    fn watch(&self) -> mpsc::UnboundedReceiver<WatchEvent> {
        self.channel.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MARKED: &str = "---\nstoker-plugin: inventory\n---\n";

    #[tokio::test]
    async fn test_fs_scan_finds_marked_documents() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("kitchen")).unwrap();
        std::fs::write(dir.path().join("kitchen/pantry.md"), MARKED).unwrap();
        std::fs::write(dir.path().join("notes.md"), "just notes").unwrap();

        let discovery = FsDiscovery::new(dir.path(), codec::MARKER_KEY);
        let found = discovery.scan().await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "kitchen/pantry.md");
        assert_eq!(found[0].marker_value, "inventory");
    }

    #[tokio::test]
    async fn test_fs_scan_survives_unreadable_documents() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pantry.md"), MARKED).unwrap();
        // Invalid UTF-8 fails read_to_string but must not abort the scan.
        std::fs::write(dir.path().join("binary.bin"), [0xff, 0xfe, 0x00]).unwrap();

        let discovery = FsDiscovery::new(dir.path(), codec::MARKER_KEY);
        let found = discovery.scan().await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_scan_and_watch() {
        let docs = Arc::new(MemoryDocumentStore::new());
        docs.insert("pantry.md", MARKED);
        docs.insert("notes.md", "plain");

        let discovery = MemoryDiscovery::new(docs, codec::MARKER_KEY);
        let found = discovery.scan().await.unwrap();
        assert_eq!(found.len(), 1);

        let mut rx = discovery.watch();
        discovery.notify(WatchEvent::MarkerAdded {
            path: "fridge.md".to_string(),
        });
        assert_eq!(
            rx.try_recv().unwrap(),
            WatchEvent::MarkerAdded {
                path: "fridge.md".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_dropped_receiver_unsubscribes() {
        let docs = Arc::new(MemoryDocumentStore::new());
        let discovery = MemoryDiscovery::new(docs, codec::MARKER_KEY);

        let rx = discovery.watch();
        drop(rx);
        // Must not panic; the closed sender is pruned.
        discovery.notify(WatchEvent::MarkerRemoved {
            path: "pantry.md".to_string(),
        });
    }
}
