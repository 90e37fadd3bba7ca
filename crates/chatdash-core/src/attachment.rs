//! Live attachment handles.
//!
//! An [`AttachmentHandle`] is a process-local reference to attachment content,
//! comparable to a browser object URL. Handles are registered in an
//! [`AttachmentStore`] under the attachment name and become useless once
//! revoked; they are never persisted.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{ChatError, Result};

const HANDLE_SCHEME: &str = "blob:";

/// Opaque, revocable reference to attachment content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttachmentHandle {
    id: String,
    mime_type: String,
}

impl AttachmentHandle {
    /// Creates an unregistered handle for an attachment called `name`.
    ///
    /// Handles only resolve once they have been minted by an [`AttachmentStore`].
    pub fn new(name: &str) -> Self {
        let mime_type = mime_guess::from_path(name)
            .first_raw()
            .unwrap_or("text/plain")
            .to_string();
        Self {
            id: format!("{}{}", HANDLE_SCHEME, uuid::Uuid::new_v4()),
            mime_type,
        }
    }

    /// The `blob:<uuid>` identifier.
    pub fn as_str(&self) -> &str {
        &self.id
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

impl fmt::Display for AttachmentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Content read back through a live handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub content: String,
}

struct Entry {
    handle: AttachmentHandle,
    content: String,
}

#[derive(Default)]
struct Registry {
    by_name: HashMap<String, Entry>,
    names_by_handle: HashMap<String, String>,
}

impl Registry {
    fn remove(&mut self, name: &str) -> Option<AttachmentHandle> {
        let entry = self.by_name.remove(name)?;
        self.names_by_handle.remove(entry.handle.as_str());
        Some(entry.handle)
    }
}

/// Registry of live attachment handles, keyed by attachment name.
///
/// At most one handle is registered per name: minting under an existing name
/// revokes the previous handle first. Everything still registered is revoked
/// when the store is dropped.
#[derive(Default)]
pub struct AttachmentStore {
    registry: Mutex<Registry>,
}

impl AttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a new live handle for `content` and registers it under `name`.
    pub fn mint(&self, name: &str, content: &str) -> AttachmentHandle {
        let handle = AttachmentHandle::new(name);
        let mut registry = self.registry();

        if let Some(previous) = registry.remove(name) {
            tracing::debug!(name, handle = %previous, "Revoked superseded attachment handle");
        }

        registry
            .names_by_handle
            .insert(handle.as_str().to_string(), name.to_string());
        registry.by_name.insert(
            name.to_string(),
            Entry {
                handle: handle.clone(),
                content: content.to_string(),
            },
        );

        tracing::debug!(name, handle = %handle, "Minted attachment handle");
        handle
    }

    /// Revokes the handle registered under `name`. No-op if there is none.
    pub fn revoke(&self, name: &str) -> bool {
        let revoked = self.registry().remove(name);
        if let Some(handle) = &revoked {
            tracing::debug!(name, handle = %handle, "Revoked attachment handle");
        }
        revoked.is_some()
    }

    /// Revokes every registered handle and empties the registry.
    ///
    /// Returns the number of handles released.
    pub fn revoke_all(&self) -> usize {
        let mut registry = self.registry();
        let count = registry.by_name.len();
        registry.by_name.clear();
        registry.names_by_handle.clear();
        if count > 0 {
            tracing::debug!(count, "Revoked all attachment handles");
        }
        count
    }

    /// Reads the attachment behind a live handle.
    pub fn resolve(&self, handle: &AttachmentHandle) -> Result<Attachment> {
        let registry = self.registry();
        let entry = registry
            .names_by_handle
            .get(handle.as_str())
            .and_then(|name| registry.by_name.get(name).map(|entry| (name, entry)));

        match entry {
            Some((name, entry)) => Ok(Attachment {
                name: name.clone(),
                mime_type: entry.handle.mime_type().to_string(),
                content: entry.content.clone(),
            }),
            None => Err(ChatError::HandleRevoked {
                handle: handle.to_string(),
            }),
        }
    }

    /// Returns the handle currently registered under `name`.
    pub fn handle_for(&self, name: &str) -> Option<AttachmentHandle> {
        self.registry()
            .by_name
            .get(name)
            .map(|entry| entry.handle.clone())
    }

    pub fn is_live(&self, handle: &AttachmentHandle) -> bool {
        self.registry()
            .names_by_handle
            .contains_key(handle.as_str())
    }

    pub fn len(&self) -> usize {
        self.registry().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for AttachmentStore {
    fn drop(&mut self) {
        self.revoke_all();
    }
}
