//! # List Configuration
//!
//! The set of known lists and the active pointer live in an externally
//! persisted settings object with this schema:
//!
//! ```json
//! { "lists": [{"id": "...", "name": "Pantry", "filePath": "pantry.md"}],
//!   "activeListId": "..." }
//! ```
//!
//! The coordinator never touches the settings medium itself; the host hands
//! it a [`ListConfig`] at startup and an injected [`ConfigSink`] callback
//! that persists the struct whenever it changes.
//!
//! ## Legacy Reshape
//!
//! Before lists were plural the settings held a single `inventoryFilePath`.
//! Deserialization still accepts that shape and reshapes it into a one-entry
//! list with a fresh id, performed once when the host loads its settings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Callback invoked whenever the configuration changes and must be written
/// back to the host's settings medium.
pub type ConfigSink = Box<dyn Fn(&ListConfig) -> Result<()> + Send + Sync>;

/// One known list: identity, display name, and backing document path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDescriptor {
    pub id: String,
    pub name: String,
    pub file_path: String,
}

impl ListDescriptor {
    pub fn new(name: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            file_path: file_path.into(),
        }
    }

    /// Descriptor for a discovered document, named after the file stem.
    pub fn for_path(file_path: &str) -> Self {
        Self::new(display_name_for_path(file_path), file_path)
    }
}

/// Display name derived from a document path: the final component without
/// its extension.
pub fn display_name_for_path(file_path: &str) -> String {
    let base = file_path.rsplit(['/', '\\']).next().unwrap_or(file_path);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => base.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListConfig {
    pub lists: Vec<ListDescriptor>,
    pub active_list_id: Option<String>,
}

// Accepts both the current shape and the legacy single-path shape.
impl<'de> Deserialize<'de> for ListConfig {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let helper = ListConfigHelper::deserialize(deserializer)?;

        if helper.lists.is_empty() {
            if let Some(path) = helper.inventory_file_path {
                let descriptor = ListDescriptor::for_path(&path);
                let id = descriptor.id.clone();
                return Ok(ListConfig {
                    lists: vec![descriptor],
                    active_list_id: Some(id),
                });
            }
        }

        Ok(ListConfig {
            lists: helper.lists,
            active_list_id: helper.active_list_id,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListConfigHelper {
    #[serde(default)]
    lists: Vec<ListDescriptor>,
    #[serde(default)]
    active_list_id: Option<String>,
    // Pre-multi-list settings carried a single path.
    #[serde(default)]
    inventory_file_path: Option<String>,
}

impl ListConfig {
    pub fn descriptor(&self, id: &str) -> Option<&ListDescriptor> {
        self.lists.iter().find(|d| d.id == id)
    }

    pub fn descriptor_mut(&mut self, id: &str) -> Option<&mut ListDescriptor> {
        self.lists.iter_mut().find(|d| d.id == id)
    }

    pub fn descriptor_for_path(&self, file_path: &str) -> Option<&ListDescriptor> {
        self.lists.iter().find(|d| d.file_path == file_path)
    }
}
