//! # Storage Layer
//!
//! The document store is an external collaborator: some medium that holds
//! text documents by path and may be edited behind our back (manual edits,
//! background sync). [`DocumentStore`] is the seam; the core never touches
//! the medium directly.
//!
//! ## Contract
//!
//! - Reads and writes address whole documents. There is no partial update;
//!   persistence is always an atomic whole-document rewrite.
//! - A missing document is not an error state. `RecordStore::load` treats it
//!   as an empty inventory, and `save` creates it (parent containment
//!   included) on first write.
//! - All I/O is asynchronous. In-memory mutation always completes before the
//!   first await point, so readers immediately after a mutating call observe
//!   the post-mutation state.
//!
//! ## Implementations
//!
//! - [`fs::FsDocumentStore`]: production store rooted at a directory, with
//!   atomic tmp-then-rename writes.
//! - [`memory::MemoryDocumentStore`]: test double with failure injection and
//!   a write counter.

use async_trait::async_trait;

use crate::error::Result;

pub mod fs;
pub mod memory;
pub mod record_store;

pub use record_store::{ItemUpdate, RecordStore};

/// Abstract interface to the external document medium.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn exists(&self, path: &str) -> bool;

    /// Read a document's full text. Missing documents are an error here;
    /// callers that tolerate absence check `exists` first.
    async fn read(&self, path: &str) -> Result<String>;

    /// Replace a document's full text, creating it if absent.
    async fn write(&self, path: &str, text: &str) -> Result<()>;

    /// Ensure the containment (parent folders) for a path exists.
    async fn create_containing(&self, path: &str) -> Result<()>;
}
