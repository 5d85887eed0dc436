//! Live views of a single vault file
//!
//! An [`Observer`] tracks one path. It resolves the path once when opened,
//! loads the file eagerly, then keeps its cached value current by listening to
//! the vault's `create`, `delete`, `modify` and `rename` events for that path.
//! Writes go straight to the vault. Frontmatter writes reach the cache when the
//! vault reports the change back; contents writes update it as they complete.
//!
//! Two flavours share the machinery:
//!
//! - [`FrontmatterObserver`] caches the parsed frontmatter of a note. Refreshes
//!   read the host's metadata cache and happen inline with the event.
//! - [`ContentsObserver`] caches the raw text of a file. Refreshes read the
//!   file asynchronously on a spawned task. A read that a delete, a rename or
//!   a write overtook is dropped when it completes.
//!
//! State is published through a [`tokio::sync::watch`] channel so views can
//! await changes. A rename of the tracked file moves the observer to
//! [`FileState::Renamed`]; it does not follow the file. Consumers open a new
//! observer on the new path.
//!
//! Overlapping writes are not sequenced against each other. The last one the
//! host applies wins.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::error::FileError;
use crate::vault::{
    Entry, EventKind, FileHandle, Frontmatter, Handler, Subscription, Vault, VaultEvent,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Where an observer stands with its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileState {
    /// The path has not been looked up yet.
    Unresolved,
    /// A file exists at the path.
    Resolved,
    /// Nothing exists at the path.
    NotFound,
    /// The path is a folder.
    NotAFile,
    /// The tracked file moved. The observer keeps its last value but refuses writes.
    Renamed { from: String, to: String },
    /// The most recent write to the path failed.
    Error(String),
}

impl FileState {
    fn error(&self, path: &str) -> Option<FileError> {
        match self {
            FileState::Unresolved | FileState::Resolved => None,
            FileState::NotFound => Some(FileError::NotFound {
                path: path.to_string(),
            }),
            FileState::NotAFile => Some(FileError::NotTFile {
                path: path.to_string(),
            }),
            FileState::Renamed { from, to } => Some(FileError::Renamed {
                from: from.clone(),
                to: to.clone(),
            }),
            FileState::Error(path) => Some(FileError::Modified { path: path.clone() }),
        }
    }
}

/// What an observer currently knows about its file.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub path: String,
    pub state: FileState,
    /// `None` until loaded, and again after the file is deleted.
    pub data: Option<T>,
    /// Incremented every time `data` is replaced.
    pub revision: u64,
}

impl<T> Snapshot<T> {
    pub fn error(&self) -> Option<FileError> {
        self.state.error(&self.path)
    }
}

type Refresh<T> = fn(&Arc<Core<T>>);

struct Core<T> {
    path: String,
    vault: Arc<dyn Vault>,
    snapshot: watch::Sender<Snapshot<T>>,
    subscriptions: Mutex<Vec<Subscription>>,
    refresh: Refresh<T>,
    /// Bumped whenever a pending read must not land: deletes, renames away and
    /// inline writes.
    epoch: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> Core<T> {
    fn new(vault: Arc<dyn Vault>, path: String, refresh: Refresh<T>) -> Arc<Self> {
        let (snapshot, _) = watch::channel(Snapshot {
            path: path.clone(),
            state: FileState::Unresolved,
            data: None,
            revision: 0,
        });
        Arc::new(Self {
            path,
            vault,
            snapshot,
            subscriptions: Mutex::new(Vec::new()),
            refresh,
            epoch: AtomicU64::new(0),
        })
    }

    fn state(&self) -> FileState {
        self.snapshot.borrow().state.clone()
    }

    fn set_state(&self, state: FileState) {
        self.snapshot.send_if_modified(|snapshot| {
            if snapshot.state == state {
                return false;
            }
            debug!(path = %self.path, from = ?snapshot.state, to = ?state, "file state changed");
            snapshot.state = state;
            true
        });
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn invalidate_reads(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    fn set_data(&self, data: Option<T>) {
        self.snapshot.send_modify(|snapshot| {
            snapshot.data = data;
            snapshot.revision += 1;
            trace!(path = %self.path, revision = snapshot.revision, "data replaced");
        });
    }

    /// Look the path up and record what is there.
    fn resolve(&self) {
        let state = match self.vault.lookup(&self.path) {
            Some(Entry::File(_)) => FileState::Resolved,
            Some(Entry::Folder(_)) => FileState::NotAFile,
            None => FileState::NotFound,
        };
        self.set_state(state);
    }

    /// The file to read from or write to, if the state allows it.
    fn file(&self) -> Result<FileHandle, FileError> {
        match self.state() {
            FileState::Resolved | FileState::Error(_) => Ok(FileHandle::new(&self.path)),
            FileState::Unresolved => Err(FileError::NotFound {
                path: self.path.clone(),
            }),
            other => Err(other
                .error(&self.path)
                .unwrap_or_else(|| FileError::NotFound {
                    path: self.path.clone(),
                })),
        }
    }

    fn write_succeeded(&self) {
        if matches!(self.state(), FileState::Error(_)) {
            self.set_state(FileState::Resolved);
        }
    }

    fn write_failed(&self, error: impl fmt::Display) -> FileError {
        warn!(path = %self.path, %error, "write failed");
        self.set_state(FileState::Error(self.path.clone()));
        FileError::Modified {
            path: self.path.clone(),
        }
    }

    fn listen(self: &Arc<Self>) {
        let mut subscriptions = lock(&self.subscriptions);
        if !subscriptions.is_empty() {
            return;
        }
        for kind in EventKind::ALL {
            let core: Weak<Core<T>> = Arc::downgrade(self);
            let handler: Handler = Arc::new(move |event: &VaultEvent| {
                if let Some(core) = core.upgrade() {
                    core.on_event(event);
                }
            });
            subscriptions.push(self.vault.subscribe(kind, handler));
        }
        trace!(path = %self.path, "listening for vault events");
    }

    fn unlisten(&self) {
        let subscriptions = std::mem::take(&mut *lock(&self.subscriptions));
        if !subscriptions.is_empty() {
            trace!(path = %self.path, "stopped listening for vault events");
        }
        drop(subscriptions);
    }

    fn on_event(self: &Arc<Self>, event: &VaultEvent) {
        match event {
            VaultEvent::Create(entry) if entry.path() == self.path => {
                debug!(path = %self.path, "tracked path created");
                self.resolve();
                (self.refresh)(self);
            }
            VaultEvent::Modify(entry) if entry.path() == self.path => {
                trace!(path = %self.path, "tracked file modified");
                (self.refresh)(self);
            }
            VaultEvent::Delete(entry) if entry.path() == self.path => {
                debug!(path = %self.path, "tracked file deleted");
                self.invalidate_reads();
                self.set_state(FileState::Resolved);
                self.set_data(None);
            }
            VaultEvent::Rename { entry, old_path } if *old_path == self.path => {
                debug!(from = %self.path, to = %entry.path(), "tracked file renamed");
                self.invalidate_reads();
                self.set_state(FileState::Renamed {
                    from: old_path.clone(),
                    to: entry.path().to_string(),
                });
            }
            VaultEvent::Rename { entry, .. } if entry.path() == self.path => {
                debug!(path = %self.path, "file renamed onto tracked path");
                self.resolve();
                (self.refresh)(self);
            }
            _ => {}
        }
    }
}

/// A live view of one vault file. See the [module docs](self).
pub struct Observer<T> {
    core: Arc<Core<T>>,
}

/// Tracks the frontmatter of a note.
pub type FrontmatterObserver = Observer<Frontmatter>;

/// Tracks the raw text of a file.
pub type ContentsObserver = Observer<String>;

impl<T> Clone for Observer<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("path", &self.core.path)
            .finish_non_exhaustive()
    }
}

impl<T: Clone + Send + Sync + 'static> Observer<T> {
    pub fn path(&self) -> &str {
        &self.core.path
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.core.snapshot.borrow().clone()
    }

    pub fn state(&self) -> FileState {
        self.core.state()
    }

    pub fn data(&self) -> Option<T> {
        self.core.snapshot.borrow().data.clone()
    }

    pub fn error(&self) -> Option<FileError> {
        self.core.snapshot.borrow().error()
    }

    pub fn revision(&self) -> u64 {
        self.core.snapshot.borrow().revision
    }

    /// A receiver that is notified whenever the snapshot changes.
    pub fn watch(&self) -> watch::Receiver<Snapshot<T>> {
        self.core.snapshot.subscribe()
    }

    /// Start listening for vault events again after [`Observer::unsubscribe`].
    pub fn subscribe(&self) {
        self.core.listen();
    }

    /// Stop listening for vault events. The cached value stays as it is.
    pub fn unsubscribe(&self) {
        self.core.unlisten();
    }

    pub fn is_subscribed(&self) -> bool {
        !lock(&self.core.subscriptions).is_empty()
    }
}

impl Observer<Frontmatter> {
    /// Resolve `path`, load its frontmatter and start listening.
    pub fn open(vault: Arc<dyn Vault>, path: impl Into<String>) -> Self {
        let core = Core::new(vault, path.into(), refresh_frontmatter);
        debug!(path = %core.path, "opening frontmatter observer");
        core.resolve();
        refresh_frontmatter(&core);
        core.listen();
        Self { core }
    }

    /// Re-read the frontmatter from the metadata cache.
    pub fn refresh(&self) {
        refresh_frontmatter(&self.core);
    }

    /// Replace the frontmatter with `transform(current)` in one host
    /// read-modify-write. The cached value updates once the host reports the
    /// modification.
    pub async fn modify<F>(&self, transform: F) -> Result<(), FileError>
    where
        F: FnOnce(Frontmatter) -> Frontmatter + Send + 'static,
    {
        let file = self.core.file()?;
        debug!(path = %file.path(), "modifying frontmatter");

        let result = self
            .core
            .vault
            .process_frontmatter(
                &file,
                Box::new(move |frontmatter: &mut Frontmatter| {
                    let current = std::mem::take(frontmatter);
                    *frontmatter = transform(current);
                }),
            )
            .await;

        match result {
            Ok(()) => {
                self.core.write_succeeded();
                Ok(())
            }
            Err(e) => Err(self.core.write_failed(e)),
        }
    }
}

fn refresh_frontmatter(core: &Arc<Core<Frontmatter>>) {
    if !matches!(core.state(), FileState::Resolved | FileState::Error(_)) {
        return;
    }
    let frontmatter = core.vault.frontmatter(&FileHandle::new(&core.path));
    core.set_data(frontmatter);
}

impl Observer<String> {
    /// Resolve `path`, read its contents and start listening.
    pub async fn open(vault: Arc<dyn Vault>, path: impl Into<String>) -> Self {
        let core = Core::new(vault, path.into(), spawn_read);
        debug!(path = %core.path, "opening contents observer");
        core.resolve();
        read_contents(&core, core.epoch()).await;
        core.listen();
        Self { core }
    }

    /// Re-read the file now.
    pub async fn refresh(&self) {
        read_contents(&self.core, self.core.epoch()).await;
    }

    /// Replace the whole text of the file. The cached text is updated before
    /// this returns, so the next read sees the write.
    pub async fn write(&self, contents: &str) -> Result<(), FileError> {
        let file = self.core.file()?;
        debug!(path = %file.path(), bytes = contents.len(), "writing contents");

        match self.core.vault.write(&file, contents).await {
            Ok(()) => {
                self.core.invalidate_reads();
                self.core.set_data(Some(contents.to_string()));
                self.core.write_succeeded();
                Ok(())
            }
            Err(e) => Err(self.core.write_failed(e)),
        }
    }
}

/// Read the file into the cache unless the read went stale, i.e. the epoch
/// moved on since `epoch` was taken.
async fn read_contents(core: &Arc<Core<String>>, epoch: u64) {
    let Ok(file) = core.file() else {
        return;
    };
    let result = core.vault.read(&file).await;
    if core.epoch() != epoch {
        trace!(path = %core.path, "dropping stale read");
        return;
    }
    match result {
        Ok(contents) => core.set_data(Some(contents)),
        Err(e) => {
            warn!(path = %core.path, error = %e, "could not read file");
            match e.as_file_error() {
                Some(FileError::NotTFile { .. }) => core.set_state(FileState::NotAFile),
                Some(_) => core.set_state(FileState::NotFound),
                None => {}
            }
        }
    }
}

fn spawn_read(core: &Arc<Core<String>>) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!(path = %core.path, "no async runtime, skipping re-read");
        return;
    };
    let epoch = core.epoch();
    let core = Arc::downgrade(core);
    runtime.spawn(async move {
        if let Some(core) = core.upgrade() {
            read_contents(&core, epoch).await;
        }
    });
}

/// One observer per path, shared by every block that reads it.
///
/// The registry only holds weak references: an observer stops listening once
/// the last block using it drops its handle, and the next request for the
/// path opens a fresh one.
pub struct ObserverRegistry {
    vault: Arc<dyn Vault>,
    frontmatter: Mutex<HashMap<String, Weak<Core<Frontmatter>>>>,
    contents: Mutex<HashMap<String, Weak<Core<String>>>>,
}

impl ObserverRegistry {
    pub fn new(vault: Arc<dyn Vault>) -> Self {
        Self {
            vault,
            frontmatter: Mutex::new(HashMap::new()),
            contents: Mutex::new(HashMap::new()),
        }
    }

    pub fn vault(&self) -> &Arc<dyn Vault> {
        &self.vault
    }

    /// The frontmatter observer for `path`, opening it if no one holds one.
    pub fn frontmatter(&self, path: &str) -> FrontmatterObserver {
        let mut observers = lock(&self.frontmatter);
        if let Some(core) = observers.get(path).and_then(Weak::upgrade) {
            return Observer { core };
        }
        let observer = FrontmatterObserver::open(Arc::clone(&self.vault), path);
        observers.insert(path.to_string(), Arc::downgrade(&observer.core));
        observer
    }

    /// The contents observer for `path`, opening it if no one holds one.
    pub async fn contents(&self, path: &str) -> ContentsObserver {
        let existing = lock(&self.contents).get(path).and_then(Weak::upgrade);
        if let Some(core) = existing {
            return Observer { core };
        }
        let opened = ContentsObserver::open(Arc::clone(&self.vault), path).await;

        let mut observers = lock(&self.contents);
        if let Some(core) = observers.get(path).and_then(Weak::upgrade) {
            return Observer { core };
        }
        observers.insert(path.to_string(), Arc::downgrade(&opened.core));
        opened
    }

    /// Stop every observer of `path` from listening, even if blocks still
    /// hold it. Returns false if nothing observed it.
    pub fn release(&self, path: &str) -> bool {
        let frontmatter = lock(&self.frontmatter).remove(path).and_then(|w| w.upgrade());
        let contents = lock(&self.contents).remove(path).and_then(|w| w.upgrade());

        let released = frontmatter.is_some() || contents.is_some();
        if let Some(core) = frontmatter {
            core.unlisten();
        }
        if let Some(core) = contents {
            core.unlisten();
        }
        if released {
            debug!(path, "released observers");
        }
        released
    }

    pub fn release_all(&self) {
        for path in self.paths() {
            self.release(&path);
        }
    }

    /// Paths with a live observer of either kind.
    pub fn paths(&self) -> Vec<String> {
        let mut frontmatter = lock(&self.frontmatter);
        let mut contents = lock(&self.contents);
        frontmatter.retain(|_, core| core.strong_count() > 0);
        contents.retain(|_, core| core.strong_count() > 0);

        let mut paths: Vec<String> = frontmatter.keys().chain(contents.keys()).cloned().collect();
        paths.sort();
        paths.dedup();
        paths
    }
}
