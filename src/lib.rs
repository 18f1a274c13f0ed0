//! # Stoker Architecture
//!
//! Stoker persists named inventory lists as structured records inside plain
//! markdown-ish documents that the user is free to edit by hand or sync from
//! elsewhere. The library owns the data; the documents stay human territory.
//!
//! ## The Three Core Pieces
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ListCoordinator (coordinator.rs)                           │
//! │  - Knows every list: id, name, backing document path        │
//! │  - Discovers marker-bearing documents, reacts to external   │
//! │    rename/delete, keeps the active-list pointer             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │  one store per list
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  RecordStore (store/record_store.rs)                        │
//! │  - Owns the in-memory items for one document                │
//! │  - Typed CRUD, derived stock status, change events          │
//! │  - Persists by whole-document rewrite                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │  text in, text out
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Codec (codec.rs)                                           │
//! │  - Pure text ⇄ records conversion, tolerant of hand edits   │
//! │  - Never loses information the grammar can express          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: Collaborators Are Seams
//!
//! The document medium ([`store::DocumentStore`]) and the discovery/watch
//! source ([`discovery::DiscoveryService`]) are traits. Production uses the
//! filesystem implementations; tests use the in-memory ones. The core never
//! renders UI, registers commands, or watches files itself.
//!
//! ## Module Overview
//!
//! - [`codec`]: document text ⇄ item records
//! - [`model`]: `ItemRecord`, the tagged `Quantity`, partial updates
//! - [`status`]: derived stock status, the single source of truth
//! - [`store`]: `DocumentStore` trait, `RecordStore`, fs/memory backends
//! - [`coordinator`]: multi-list coordination and discovery reconciliation
//! - [`config`]: persisted list configuration and its legacy reshape
//! - [`discovery`]: marker scanning and the watch channel
//! - [`events`]: per-instance change subscription
//! - [`error`]: error types

pub mod codec;
pub mod config;
pub mod coordinator;
pub mod discovery;
pub mod error;
pub mod events;
pub mod model;
pub mod status;
pub mod store;

pub use config::{ConfigSink, ListConfig, ListDescriptor};
pub use coordinator::ListCoordinator;
pub use error::{Result, StokerError};
pub use events::{InventoryEvent, ListEvent, ListenerHandle};
pub use model::{ItemPatch, ItemRecord, MeasureKind, Quantity};
pub use status::{stock_status, StockStatus};
pub use store::{DocumentStore, ItemUpdate, RecordStore};
