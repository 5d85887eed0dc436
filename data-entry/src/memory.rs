//! In-memory host implementations
//!
//! [`MemoryVault`] behaves like a host vault: notes live at paths, frontmatter is
//! parsed into a metadata cache on every write, and every change is broadcast
//! synchronously to the handlers registered for its kind. [`MemoryDataStore`]
//! and [`MemoryNotifier`] stand in for plugin data persistence and transient
//! notices.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{SettingsError, VaultError};
use crate::frontmatter::{parse_frontmatter, render_frontmatter};
use crate::plugin::Notifier;
use crate::settings::PluginDataStore;
use crate::vault::{
    Entry, EventKind, FileHandle, Frontmatter, FrontmatterTransform, Handler, Subscription, Vault,
    VaultEvent,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct StoredFile {
    contents: String,
    frontmatter: Option<Frontmatter>,
}

impl StoredFile {
    fn new(path: &str, contents: String) -> Self {
        let frontmatter = match parse_frontmatter(&contents) {
            Ok(document) => document.frontmatter,
            Err(e) => {
                warn!(path, error = %e, "frontmatter did not parse, metadata cache left empty");
                None
            }
        };
        Self {
            contents,
            frontmatter,
        }
    }
}

#[derive(Default)]
struct Tree {
    files: BTreeMap<String, StoredFile>,
    folders: BTreeSet<String>,
    fail_writes: bool,
}

#[derive(Default)]
struct EventBus {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(u64, EventKind, Handler)>>,
}

impl EventBus {
    fn register(self: &Arc<Self>, kind: EventKind, handler: Handler) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.handlers).push((id, kind, handler));
        trace!(id, ?kind, "handler registered");

        let bus: Weak<EventBus> = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(bus) = bus.upgrade() {
                lock(&bus.handlers).retain(|(registered, _, _)| *registered != id);
                trace!(id, "handler deregistered");
            }
        })
    }

    /// Deliver `event` outside the handler lock so handlers may touch the bus.
    fn emit(&self, event: VaultEvent) {
        let kind = event.kind();
        let handlers: Vec<Handler> = lock(&self.handlers)
            .iter()
            .filter(|(_, registered, _)| *registered == kind)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();

        debug!(?kind, path = event.entry().path(), handlers = handlers.len(), "vault event");
        for handler in handlers {
            handler(&event);
        }
    }

    fn len(&self) -> usize {
        lock(&self.handlers).len()
    }
}

/// An in-memory vault.
#[derive(Default)]
pub struct MemoryVault {
    tree: Mutex<Tree>,
    bus: Arc<EventBus>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without emitting events.
    pub fn with_file(self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        let path = path.into();
        let file = StoredFile::new(&path, contents.into());
        lock(&self.tree).files.insert(path, file);
        self
    }

    /// Seed a folder without emitting events.
    pub fn with_folder(self, path: impl Into<String>) -> Self {
        lock(&self.tree).folders.insert(path.into());
        self
    }

    /// Create or overwrite a file, emitting `create` or `modify`.
    pub fn insert(&self, path: impl Into<String>, contents: impl Into<String>) {
        let path = path.into();
        let existed = {
            let mut tree = lock(&self.tree);
            let file = StoredFile::new(&path, contents.into());
            tree.files.insert(path.clone(), file).is_some()
        };

        let entry = Entry::File(FileHandle::new(path));
        self.bus.emit(if existed {
            VaultEvent::Modify(entry)
        } else {
            VaultEvent::Create(entry)
        });
    }

    /// Create a folder, emitting `create`.
    pub fn create_folder(&self, path: impl Into<String>) {
        let path = path.into();
        lock(&self.tree).folders.insert(path.clone());
        self.bus.emit(VaultEvent::Create(Entry::Folder(path)));
    }

    /// Remove a file or folder, emitting `delete`. Returns false if nothing was there.
    pub fn delete(&self, path: &str) -> bool {
        let entry = {
            let mut tree = lock(&self.tree);
            if tree.files.remove(path).is_some() {
                Entry::File(FileHandle::new(path))
            } else if tree.folders.remove(path) {
                Entry::Folder(path.to_string())
            } else {
                return false;
            }
        };

        self.bus.emit(VaultEvent::Delete(entry));
        true
    }

    /// Move a file, emitting `rename`. Returns false if there was no file at `from`.
    pub fn rename(&self, from: &str, to: impl Into<String>) -> bool {
        let to = to.into();
        {
            let mut tree = lock(&self.tree);
            let Some(file) = tree.files.remove(from) else {
                return false;
            };
            tree.files.insert(to.clone(), file);
        }

        self.bus.emit(VaultEvent::Rename {
            entry: Entry::File(FileHandle::new(to)),
            old_path: from.to_string(),
        });
        true
    }

    /// The current text of a file.
    pub fn contents(&self, path: &str) -> Option<String> {
        lock(&self.tree)
            .files
            .get(path)
            .map(|file| file.contents.clone())
    }

    /// Make every subsequent write fail until switched off again.
    pub fn set_fail_writes(&self, fail: bool) {
        lock(&self.tree).fail_writes = fail;
    }

    /// Number of registered event handlers.
    pub fn listener_count(&self) -> usize {
        self.bus.len()
    }

    fn writable(tree: &Tree, file: &FileHandle) -> Result<(), VaultError> {
        if tree.fail_writes {
            return Err(VaultError::Rejected {
                path: file.path().to_string(),
                reason: "writes are disabled".to_string(),
            });
        }
        if !tree.files.contains_key(file.path()) {
            return Err(VaultError::Missing {
                path: file.path().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Vault for MemoryVault {
    fn lookup(&self, path: &str) -> Option<Entry> {
        let tree = lock(&self.tree);
        if tree.files.contains_key(path) {
            Some(Entry::File(FileHandle::new(path)))
        } else if tree.folders.contains(path) {
            Some(Entry::Folder(path.to_string()))
        } else {
            None
        }
    }

    fn frontmatter(&self, file: &FileHandle) -> Option<Frontmatter> {
        lock(&self.tree)
            .files
            .get(file.path())
            .and_then(|stored| stored.frontmatter.clone())
    }

    async fn read(&self, file: &FileHandle) -> Result<String, VaultError> {
        let tree = lock(&self.tree);
        match tree.files.get(file.path()) {
            Some(stored) => Ok(stored.contents.clone()),
            None if tree.folders.contains(file.path()) => Err(VaultError::NotAFile {
                path: file.path().to_string(),
            }),
            None => Err(VaultError::Missing {
                path: file.path().to_string(),
            }),
        }
    }

    async fn write(&self, file: &FileHandle, contents: &str) -> Result<(), VaultError> {
        {
            let mut tree = lock(&self.tree);
            Self::writable(&tree, file)?;
            let stored = StoredFile::new(file.path(), contents.to_string());
            tree.files.insert(file.path().to_string(), stored);
        }

        self.bus.emit(VaultEvent::Modify(Entry::File(file.clone())));
        Ok(())
    }

    async fn process_frontmatter(
        &self,
        file: &FileHandle,
        transform: FrontmatterTransform,
    ) -> Result<(), VaultError> {
        {
            let mut tree = lock(&self.tree);
            Self::writable(&tree, file)?;

            let invalid = |e: serde_yaml_ng::Error| VaultError::Frontmatter {
                path: file.path().to_string(),
                reason: e.to_string(),
            };

            let current = tree
                .files
                .get(file.path())
                .map(|stored| stored.contents.clone())
                .unwrap_or_default();
            let document = parse_frontmatter(&current).map_err(invalid)?;

            let mut frontmatter = document.frontmatter.unwrap_or_default();
            transform(&mut frontmatter);

            let contents = render_frontmatter(&frontmatter, &document.body).map_err(invalid)?;
            tree.files.insert(
                file.path().to_string(),
                StoredFile {
                    contents,
                    frontmatter: Some(frontmatter),
                },
            );
        }

        self.bus.emit(VaultEvent::Modify(Entry::File(file.clone())));
        Ok(())
    }

    fn subscribe(&self, kind: EventKind, handler: Handler) -> Subscription {
        self.bus.register(kind, handler)
    }
}

/// In-memory plugin data blob.
#[derive(Default)]
pub struct MemoryDataStore {
    data: Mutex<Option<Value>>,
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: Value) -> Self {
        Self {
            data: Mutex::new(Some(data)),
        }
    }

    /// The blob as last saved.
    pub fn data(&self) -> Option<Value> {
        lock(&self.data).clone()
    }
}

#[async_trait]
impl PluginDataStore for MemoryDataStore {
    async fn load(&self) -> Result<Option<Value>, SettingsError> {
        Ok(self.data())
    }

    async fn save(&self, data: Value) -> Result<(), SettingsError> {
        *lock(&self.data) = Some(data);
        Ok(())
    }
}

/// Collects notices instead of showing them.
#[derive(Default)]
pub struct MemoryNotifier {
    notices: Mutex<Vec<String>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<String> {
        lock(&self.notices).clone()
    }
}

impl Notifier for MemoryNotifier {
    fn notice(&self, message: &str) {
        lock(&self.notices).push(message.to_string());
    }
}
