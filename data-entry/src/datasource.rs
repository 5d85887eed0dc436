//! Resolving configuration sources to live values
//!
//! [`LiveDocument`] follows a schema or UI schema, [`LiveDatasource`] follows
//! the records a form edits. Both sit on top of the observers handed out by an
//! [`ObserverRegistry`], so they always reflect the vault as it is now.

use data_entry_decoder::{array, unknown_record, Decoder};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{Datasource, FileRef, SchemaDocument, Source};
use crate::error::{DatasourceError, FileError};
use crate::observer::{ContentsObserver, FrontmatterObserver, ObserverRegistry};

/// One record of a datasource.
pub type Record = serde_json::Map<String, Value>;

fn location(file: &FileRef) -> String {
    if file.is_json_file() {
        format!("\"{}\"", file.path)
    } else {
        format!("\"{}\" frontmatter key \"{}\"", file.path, file.frontmatter)
    }
}

fn shape_error(file: &FileRef, error: data_entry_decoder::DecodeError) -> DatasourceError {
    DatasourceError::Shape {
        location: location(file),
        error,
    }
}

/// A schema document that is either written inline or read from frontmatter.
#[derive(Debug, Clone)]
pub enum LiveDocument {
    Inline(SchemaDocument),
    File {
        file: FileRef,
        observer: FrontmatterObserver,
    },
}

impl LiveDocument {
    pub fn open(source: &Source<SchemaDocument>, registry: &ObserverRegistry) -> Self {
        match source {
            Source::Inline(document) => LiveDocument::Inline(document.clone()),
            Source::File(file) => LiveDocument::File {
                file: file.clone(),
                observer: registry.frontmatter(&file.path),
            },
        }
    }

    /// The current document, `None` while its key is absent.
    pub fn value(&self) -> Result<Option<SchemaDocument>, DatasourceError> {
        match self {
            LiveDocument::Inline(document) => Ok(Some(document.clone())),
            LiveDocument::File { file, observer } => {
                let Some(frontmatter) = observer.data() else {
                    return Ok(None);
                };
                match frontmatter.get(&file.frontmatter) {
                    None | Some(Value::Null) => Ok(None),
                    Some(value) => unknown_record()
                        .decode(value)
                        .map(Some)
                        .map_err(|e| shape_error(file, e)),
                }
            }
        }
    }

    pub fn error(&self) -> Option<FileError> {
        match self {
            LiveDocument::Inline(_) => None,
            LiveDocument::File { observer, .. } => observer.error(),
        }
    }

    pub fn revision(&self) -> u64 {
        match self {
            LiveDocument::Inline(_) => 0,
            LiveDocument::File { observer, .. } => observer.revision(),
        }
    }
}

#[derive(Debug, Clone)]
enum Backing {
    Frontmatter(FrontmatterObserver),
    Contents(ContentsObserver),
}

/// The records behind a form.
///
/// A `.json` file holds the records as its whole body. Any other file holds
/// them under a frontmatter key. Either way a missing value reads as no
/// records, and writes always replace the whole array.
#[derive(Debug, Clone)]
pub struct LiveDatasource {
    file: FileRef,
    backing: Backing,
}

impl LiveDatasource {
    pub async fn open(datasource: &Datasource, registry: &ObserverRegistry) -> Self {
        let file = datasource.file().clone();
        let backing = if file.is_json_file() {
            Backing::Contents(registry.contents(&file.path).await)
        } else {
            Backing::Frontmatter(registry.frontmatter(&file.path))
        };
        debug!(location = %location(&file), "opened datasource");
        Self { file, backing }
    }

    pub fn file(&self) -> &FileRef {
        &self.file
    }

    /// Human readable description of where the records live.
    pub fn location(&self) -> String {
        location(&self.file)
    }

    /// The records as currently stored.
    pub fn items(&self) -> Result<Vec<Record>, DatasourceError> {
        let records = array(unknown_record());
        match &self.backing {
            Backing::Frontmatter(observer) => {
                let value = observer
                    .data()
                    .and_then(|mut frontmatter| frontmatter.remove(&self.file.frontmatter));
                match value {
                    None | Some(Value::Null) => Ok(Vec::new()),
                    Some(value) => records.decode(&value).map_err(|e| shape_error(&self.file, e)),
                }
            }
            Backing::Contents(observer) => {
                let text = observer.data().unwrap_or_default();
                if text.trim().is_empty() {
                    return Ok(Vec::new());
                }
                let value: Value =
                    serde_json::from_str(&text).map_err(|source| DatasourceError::Json {
                        path: self.file.path.clone(),
                        source,
                    })?;
                records.decode(&value).map_err(|e| shape_error(&self.file, e))
            }
        }
    }

    /// What is wrong with the underlying file, if anything.
    pub fn error(&self) -> Option<FileError> {
        match &self.backing {
            Backing::Frontmatter(observer) => observer.error(),
            Backing::Contents(observer) => observer.error(),
        }
    }

    /// Changes every time the stored records are re-read.
    pub fn revision(&self) -> u64 {
        match &self.backing {
            Backing::Frontmatter(observer) => observer.revision(),
            Backing::Contents(observer) => observer.revision(),
        }
    }

    /// Wait for the next change to the underlying file. Returns false if the
    /// observer is gone.
    pub async fn changed(&self) -> bool {
        match &self.backing {
            Backing::Frontmatter(observer) => observer.watch().changed().await.is_ok(),
            Backing::Contents(observer) => observer.watch().changed().await.is_ok(),
        }
    }

    /// Replace the stored records with `items`.
    pub async fn persist(&self, items: Vec<Record>) -> Result<(), DatasourceError> {
        let count = items.len();
        let value = Value::Array(items.into_iter().map(Value::Object).collect());

        match &self.backing {
            Backing::Frontmatter(observer) => {
                let key = self.file.frontmatter.clone();
                observer
                    .modify(move |mut frontmatter| {
                        frontmatter.insert(key, value);
                        frontmatter
                    })
                    .await?;
            }
            Backing::Contents(observer) => {
                let text =
                    serde_json::to_string_pretty(&value).map_err(DatasourceError::Serialize)?;
                observer.write(&text).await?;
            }
        }

        info!(location = %self.location(), count, "persisted records");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryVault;
    use serde_json::json;
    use std::sync::Arc;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn registry(vault: MemoryVault) -> (Arc<MemoryVault>, ObserverRegistry) {
        let vault = Arc::new(vault);
        let registry = ObserverRegistry::new(vault.clone());
        (vault, registry)
    }

    #[tokio::test]
    async fn test_frontmatter_items() {
        let (_, registry) =
            registry(MemoryVault::new().with_file("people.md", "---\ndata:\n  - name: Ada\n---\n"));
        let datasource =
            LiveDatasource::open(&Datasource::File(FileRef::new("people.md", "data")), &registry)
                .await;

        assert_eq!(datasource.items().unwrap(), vec![record(json!({ "name": "Ada" }))]);
        assert_eq!(datasource.error(), None);
    }

    #[tokio::test]
    async fn test_missing_key_is_empty() {
        let (_, registry) =
            registry(MemoryVault::new().with_file("people.md", "# no frontmatter\n"));
        let datasource =
            LiveDatasource::open(&Datasource::File(FileRef::new("people.md", "data")), &registry)
                .await;
        assert!(datasource.items().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_shape_names_location() {
        let (_, registry) =
            registry(MemoryVault::new().with_file("people.md", "---\ndata:\n  - 1\n---\n"));
        let datasource =
            LiveDatasource::open(&Datasource::File(FileRef::new("people.md", "data")), &registry)
                .await;

        let err = datasource.items().unwrap_err();
        assert!(matches!(err, DatasourceError::Shape { .. }));
        let message = err.to_string();
        assert!(message.contains("\"people.md\" frontmatter key \"data\""), "{message}");
        assert!(message.contains("[0]: expected object"), "{message}");
    }

    #[tokio::test]
    async fn test_persist_to_frontmatter() {
        let (vault, registry) =
            registry(MemoryVault::new().with_file("people.md", "---\ntitle: People\n---\nBody\n"));
        let datasource =
            LiveDatasource::open(&Datasource::File(FileRef::new("people.md", "rows")), &registry)
                .await;

        datasource.persist(vec![record(json!({ "x": 1 }))]).await.unwrap();

        assert_eq!(datasource.items().unwrap(), vec![record(json!({ "x": 1 }))]);
        let contents = vault.contents("people.md").unwrap();
        assert!(contents.contains("title: People"));
        assert!(contents.ends_with("Body\n"));
    }

    #[tokio::test]
    async fn test_json_file_body() {
        let (vault, registry) = registry(MemoryVault::new().with_file("people.json", ""));
        let datasource =
            LiveDatasource::open(&Datasource::File(FileRef::new("people.json", "data")), &registry)
                .await;
        assert!(datasource.items().unwrap().is_empty());

        datasource.persist(vec![record(json!({ "x": 1 }))]).await.unwrap();
        assert_eq!(
            vault.contents("people.json").as_deref(),
            Some("[\n  {\n    \"x\": 1\n  }\n]")
        );
    }

    #[tokio::test]
    async fn test_json_file_parse_error() {
        let (_, registry) = registry(MemoryVault::new().with_file("people.json", "[{"));
        let datasource =
            LiveDatasource::open(&Datasource::File(FileRef::new("people.json", "data")), &registry)
                .await;
        assert!(matches!(
            datasource.items(),
            Err(DatasourceError::Json { .. })
        ));
    }

    #[tokio::test]
    async fn test_persist_to_missing_file_is_refused() {
        let (_, registry) = registry(MemoryVault::new());
        let datasource =
            LiveDatasource::open(&Datasource::File(FileRef::new("gone.md", "data")), &registry)
                .await;
        assert!(matches!(
            datasource.persist(Vec::new()).await,
            Err(DatasourceError::File(FileError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_live_document_sources() {
        let vault = Arc::new(MemoryVault::new().with_file(
            "schema.md",
            "---\nschema:\n  type: object\nlayout: 3\n---\n",
        ));
        let registry = ObserverRegistry::new(vault);

        let inline = LiveDocument::open(
            &Source::Inline(record(json!({ "type": "string" }))),
            &registry,
        );
        assert_eq!(inline.value().unwrap(), Some(record(json!({ "type": "string" }))));
        assert_eq!(inline.revision(), 0);

        let file =
            LiveDocument::open(&Source::File(FileRef::new("schema.md", "schema")), &registry);
        assert_eq!(file.value().unwrap(), Some(record(json!({ "type": "object" }))));

        let absent = LiveDocument::open(&Source::File(FileRef::new("schema.md", "ui")), &registry);
        assert_eq!(absent.value().unwrap(), None);

        let scalar =
            LiveDocument::open(&Source::File(FileRef::new("schema.md", "layout")), &registry);
        assert!(scalar.value().is_err());
    }
}
