//! The host vault, as seen by data entry
//!
//! The vault (file lookup, reads, writes, the frontmatter metadata cache and the
//! change-event bus) belongs to the host application. Data entry only consumes
//! it through the [`Vault`] trait, so any host, or the in-memory
//! [`MemoryVault`](crate::memory::MemoryVault), can be plugged in.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map as JsonMap, Value};

use crate::error::VaultError;

/// Parsed frontmatter of a note: top-level YAML keys mapped to JSON values.
pub type Frontmatter = JsonMap<String, Value>;

/// Mutation applied to a file's frontmatter in place.
pub type FrontmatterTransform = Box<dyn FnOnce(&mut Frontmatter) + Send>;

/// Callback invoked for every vault event of the kind it was registered for.
pub type Handler = Arc<dyn Fn(&VaultEvent) + Send + Sync>;

/// A file that was found in the vault.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileHandle {
    path: String,
}

impl FileHandle {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Extension of the file name, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        name.rsplit_once('.')
            .map(|(_, extension)| extension)
            .filter(|extension| !extension.is_empty())
    }
}

/// Anything that lives at a vault path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    File(FileHandle),
    Folder(String),
}

impl Entry {
    pub fn path(&self) -> &str {
        match self {
            Entry::File(file) => file.path(),
            Entry::Folder(path) => path,
        }
    }

    pub fn as_file(&self) -> Option<&FileHandle> {
        match self {
            Entry::File(file) => Some(file),
            Entry::Folder(_) => None,
        }
    }
}

/// The kinds of change the vault reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Create,
    Delete,
    Modify,
    Rename,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Create,
        EventKind::Delete,
        EventKind::Modify,
        EventKind::Rename,
    ];
}

/// A change reported by the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
    Create(Entry),
    Delete(Entry),
    Modify(Entry),
    /// `entry` is at its new path already
    Rename { entry: Entry, old_path: String },
}

impl VaultEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            VaultEvent::Create(_) => EventKind::Create,
            VaultEvent::Delete(_) => EventKind::Delete,
            VaultEvent::Modify(_) => EventKind::Modify,
            VaultEvent::Rename { .. } => EventKind::Rename,
        }
    }

    pub fn entry(&self) -> &Entry {
        match self {
            VaultEvent::Create(entry)
            | VaultEvent::Delete(entry)
            | VaultEvent::Modify(entry)
            | VaultEvent::Rename { entry, .. } => entry,
        }
    }
}

/// Handle for a registered event handler.
///
/// The handler is deregistered exactly once, by [`Subscription::dispose`] or
/// when the subscription is dropped.
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(dispose: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    /// Deregister the handler now.
    pub fn dispose(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.dispose.is_some())
            .finish()
    }
}

/// Capability interface onto the host vault.
///
/// `lookup` and `frontmatter` are served from the host's in-memory indexes and
/// never block. Reads and writes are asynchronous; there is no cancellation and
/// no ordering between overlapping writes beyond what the host provides.
#[async_trait]
pub trait Vault: Send + Sync {
    /// Find whatever lives at `path`.
    fn lookup(&self, path: &str) -> Option<Entry>;

    /// The cached frontmatter of `file`, if it has any.
    fn frontmatter(&self, file: &FileHandle) -> Option<Frontmatter>;

    /// Read the full text of `file`.
    async fn read(&self, file: &FileHandle) -> Result<String, VaultError>;

    /// Replace the full text of `file`.
    async fn write(&self, file: &FileHandle, contents: &str) -> Result<(), VaultError>;

    /// Read-modify-write the frontmatter of `file` atomically.
    async fn process_frontmatter(
        &self,
        file: &FileHandle,
        transform: FrontmatterTransform,
    ) -> Result<(), VaultError>;

    /// Register `handler` for every event of `kind`.
    fn subscribe(&self, kind: EventKind, handler: Handler) -> Subscription;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_extension() {
        assert_eq!(FileHandle::new("data/people.json").extension(), Some("json"));
        assert_eq!(FileHandle::new("note.md").extension(), Some("md"));
        assert_eq!(FileHandle::new("a.b/README").extension(), None);
        assert_eq!(FileHandle::new("trailing.").extension(), None);
    }

    #[test]
    fn test_event_accessors() {
        let event = VaultEvent::Rename {
            entry: Entry::File(FileHandle::new("b.md")),
            old_path: "a.md".into(),
        };
        assert_eq!(event.kind(), EventKind::Rename);
        assert_eq!(event.entry().path(), "b.md");
        assert!(event.entry().as_file().is_some());
        assert!(Entry::Folder("dir".into()).as_file().is_none());
    }

    #[test]
    fn test_subscription_disposes_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        subscription.dispose();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_disposes_on_drop() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        {
            let _subscription = Subscription::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
