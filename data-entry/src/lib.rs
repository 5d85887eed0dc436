//! Schema-driven data entry forms backed by note frontmatter
//!
//! A note contains a fenced code block such as
//!
//! ````markdown
//! ```yaml-data-entry
//! datasource:
//!   file:
//!     path: people.md
//! schema:
//!   file: {}
//! ```
//! ````
//!
//! The block is decoded into a [`Configuration`], its records and schemas are
//! followed live through the host [`Vault`], and the form on screen is tracked
//! by a [`Session`]. Submitting writes the whole record array back.
//!
//! # Layout
//!
//! - [`config`] - code block parsing and the configuration decoder
//! - [`settings`] - per-field frontmatter key defaults and their persistence
//! - [`vault`] - the host capability the plugin runs against
//! - [`memory`] - an in-memory vault, data store and notifier
//! - [`frontmatter`] - YAML frontmatter parsing and rendering
//! - [`observer`] - live views of a single file
//! - [`datasource`] - records, schemas and UI schemas resolved from a configuration
//! - [`cursor`], [`forms`], [`session`] - which record is on screen and its unsaved edits
//! - [`application`] - one mounted block and its view model
//! - [`plugin`] - the entry point the host loads

pub mod application;
pub mod config;
pub mod cursor;
pub mod datasource;
pub mod error;
pub mod forms;
pub mod frontmatter;
pub mod logging;
pub mod memory;
pub mod observer;
pub mod plugin;
pub mod session;
pub mod settings;
pub mod vault;

pub use application::{render_boundary, Application, Banner, Fallback, FormView, Rendered};
pub use config::{
    configuration, Configuration, ConfigurationDefaults, Datasource, FileRef, SchemaDocument,
    Source,
};
pub use cursor::Cursor;
pub use datasource::{LiveDatasource, LiveDocument, Record};
pub use error::{
    ConfigError, DataEntryError, DatasourceError, ErrorSeverity, FileError, Result,
    SettingsError, Severity, VaultError,
};
pub use forms::FormsCache;
pub use logging::Pretty;
pub use memory::{MemoryDataStore, MemoryNotifier, MemoryVault};
pub use observer::{
    ContentsObserver, FileState, FrontmatterObserver, Observer, ObserverRegistry, Snapshot,
};
pub use plugin::{Block, DataEntryPlugin, Notifier};
pub use session::Session;
pub use settings::{PluginDataStore, Settings};
pub use vault::{Entry, EventKind, FileHandle, Frontmatter, Subscription, Vault, VaultEvent};
