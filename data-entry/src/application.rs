//! One mounted data entry block
//!
//! An [`Application`] wires a decoded [`Configuration`] to live vault data:
//! it opens the datasource, schema and UI schema, keeps a [`Session`] in step
//! with the stored records, and turns all of it into a [`FormView`] for the
//! presentation layer to draw. Rendering never fails outward; see
//! [`render_boundary`].

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::{Configuration, SchemaDocument};
use crate::datasource::{LiveDatasource, LiveDocument, Record};
use crate::error::{DataEntryError, ErrorSeverity, Result, Severity};
use crate::logging::Pretty;
use crate::observer::ObserverRegistry;
use crate::session::{default_form, Session};

pub const FALLBACK_TITLE: &str = "Something went wrong.";
pub const NO_ITEMS: &str = "There are no items to display.";

/// A message shown above the form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Banner {
    pub severity: ErrorSeverity,
    pub message: String,
}

impl Banner {
    fn new(field: &str, error: &(impl Severity + std::fmt::Display)) -> Self {
        Self {
            severity: error.severity(),
            message: format!("{field}: {error}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlPanel {
    pub new_mode: bool,
    pub toggle_label: &'static str,
    pub count: usize,
    pub page: usize,
    pub pagination_disabled: bool,
}

/// Everything needed to draw one block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormView {
    pub banners: Vec<Banner>,
    pub schema: Option<SchemaDocument>,
    pub uischema: Option<SchemaDocument>,
    /// `None` renders [`NO_ITEMS`] instead of a form.
    pub form: Option<Record>,
    pub control_panel: ControlPanel,
    pub submit_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fallback {
    pub title: String,
    pub detail: String,
}

impl Fallback {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            title: FALLBACK_TITLE.to_string(),
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rendered {
    Form(FormView),
    Fallback(Fallback),
}

/// Build a view, turning an error or a panic into a [`Fallback`].
pub fn render_boundary<F>(render: F) -> Rendered
where
    F: FnOnce() -> Result<FormView>,
{
    match catch_unwind(AssertUnwindSafe(render)) {
        Ok(Ok(view)) => Rendered::Form(view),
        Ok(Err(e)) => {
            error!(error = %e, "block failed to render");
            Rendered::Fallback(Fallback::new(e.to_string()))
        }
        Err(panic) => {
            let detail = panic_message(panic.as_ref());
            error!(detail = %detail, "block panicked while rendering");
            Rendered::Fallback(Fallback::new(detail))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub struct Application {
    configuration: Configuration,
    datasource: LiveDatasource,
    schema: LiveDocument,
    uischema: Option<LiveDocument>,
    session: Session,
    schema_revision: u64,
}

impl Application {
    /// Open everything `configuration` refers to and start a session.
    pub async fn mount(configuration: Configuration, registry: &ObserverRegistry) -> Self {
        debug!("mounting block: {}", Pretty(&configuration));

        let datasource = LiveDatasource::open(&configuration.datasource, registry).await;
        let schema = LiveDocument::open(&configuration.schema, registry);
        let uischema = configuration
            .uischema
            .as_ref()
            .map(|source| LiveDocument::open(source, registry));

        let default = default_form(schema.value().ok().flatten().as_ref());
        let items = datasource.items().unwrap_or_default();
        let session = Session::new(default, datasource.revision(), &items);
        let schema_revision = schema.revision();

        Self {
            configuration,
            datasource,
            schema,
            uischema,
            session,
            schema_revision,
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn datasource(&self) -> &LiveDatasource {
        &self.datasource
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        self.sync();
        &mut self.session
    }

    /// Bring the session up to date with the schema and the stored records.
    /// Returns true if the records changed.
    pub fn sync(&mut self) -> bool {
        let schema_revision = self.schema.revision();
        if schema_revision != self.schema_revision {
            self.schema_revision = schema_revision;
            let default = default_form(self.schema.value().ok().flatten().as_ref());
            self.session.set_default_form(default);
        }

        let items = self.datasource.items().unwrap_or_default();
        self.session.sync(self.datasource.revision(), &items)
    }

    /// Wait until the stored records change.
    pub async fn changed(&self) -> bool {
        self.datasource.changed().await
    }

    pub fn view(&mut self) -> Result<FormView> {
        self.sync();

        let mut banners = Vec::new();
        for (field, error) in [
            ("datasource", self.datasource.error()),
            ("schema", self.schema.error()),
            (
                "uischema",
                self.uischema.as_ref().and_then(LiveDocument::error),
            ),
        ] {
            if let Some(error) = error {
                banners.push(Banner::new(field, &error));
            }
        }

        if let Err(e) = self.datasource.items() {
            banners.push(Banner::new("datasource", &e));
        }

        let schema = self.schema.value().unwrap_or_else(|e| {
            banners.push(Banner::new("schema", &e));
            None
        });
        let uischema = match &self.uischema {
            Some(document) => document.value().unwrap_or_else(|e| {
                banners.push(Banner::new("uischema", &e));
                None
            }),
            None => None,
        };

        let new_mode = self.session.new_mode();
        Ok(FormView {
            banners,
            schema,
            uischema,
            form: self.session.form().cloned(),
            control_panel: ControlPanel {
                new_mode,
                toggle_label: if new_mode { "<- Back to item" } else { "Create ->" },
                count: self.session.count(),
                page: self.session.page(),
                pagination_disabled: new_mode,
            },
            submit_label: if new_mode { "Create" } else { "Update" },
        })
    }

    /// The current view, or a fallback if building it failed.
    pub fn render(&mut self) -> Rendered {
        render_boundary(|| self.view())
    }

    /// Store the form on screen.
    pub async fn submit(&mut self) -> Result<()> {
        self.sync();
        let items = self.datasource.items()?;
        let records = self.session.submission(&items)?;
        let count = records.len();

        self.datasource.persist(records).await.map_err(|e| {
            error!(location = %self.datasource.location(), error = %e, "submit failed");
            DataEntryError::from(e)
        })?;

        info!(
            location = %self.datasource.location(),
            new_mode = self.session.new_mode(),
            count,
            "submitted form"
        );
        self.sync();
        Ok(())
    }

    /// Drop every observer handle this block holds.
    pub fn unmount(self) {
        debug!(location = %self.datasource.location(), "unmounting block");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigurationDefaults, FileRef};
    use crate::error::{DatasourceError, FileError};
    use crate::memory::MemoryVault;
    use crate::settings::Settings;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    async fn mount(vault: &Arc<MemoryVault>, block: &str) -> Application {
        let registry = ObserverRegistry::new(vault.clone());
        let defaults = ConfigurationDefaults::from_settings(&Settings::default(), "people.md");
        let configuration =
            Configuration::from_code_block("yaml-data-entry", block, defaults).unwrap();
        Application::mount(configuration, &registry).await
    }

    const BLOCK: &str = "datasource:\n  file: {}\nschema:\n  file: {}\n";

    fn people() -> Arc<MemoryVault> {
        Arc::new(MemoryVault::new().with_file(
            "people.md",
            "---\nschema:\n  type: object\n  properties:\n    x: { type: number, default: 0 }\n\
             data:\n  - x: 0\n---\n",
        ))
    }

    #[test_log::test(tokio::test)]
    async fn test_view_of_existing_records() {
        let vault = people();
        let mut application = mount(&vault, BLOCK).await;
        let view = application.view().unwrap();

        assert!(view.banners.is_empty());
        assert_eq!(view.form, Some(record(json!({ "x": 0 }))));
        assert_eq!(view.control_panel.count, 1);
        assert_eq!(view.control_panel.page, 1);
        assert_eq!(view.submit_label, "Update");
        assert_eq!(view.schema.unwrap()["type"], json!("object"));
    }

    #[test_log::test(tokio::test)]
    async fn test_submit_in_new_mode_appends() {
        let vault = people();
        let mut application = mount(&vault, BLOCK).await;
        application.session_mut().set_new_mode(true);
        application.session_mut().set_form(record(json!({ "x": 1 })));
        application.submit().await.unwrap();

        assert_eq!(
            application.datasource().items().unwrap(),
            vec![record(json!({ "x": 0 })), record(json!({ "x": 1 }))]
        );
        assert_eq!(application.session().count(), 2);
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_file_shows_banner() {
        let vault = Arc::new(MemoryVault::new());
        let mut application = mount(
            &vault,
            "datasource:\n  file: { path: gone.md }\nschema:\n  inline: { type: object }\n",
        )
        .await;

        let view = application.view().unwrap();
        assert_eq!(view.banners.len(), 1);
        assert_eq!(
            view.banners[0].message,
            "datasource: Unable to find file at path \"gone.md\"."
        );
        assert_eq!(view.banners[0].severity, ErrorSeverity::Error);
        assert!(view.control_panel.new_mode);

        let err = application.submit().await.unwrap_err();
        assert!(matches!(
            err,
            DataEntryError::Datasource(DatasourceError::File(FileError::NotFound { .. }))
        ));
    }

    #[test_log::test(tokio::test)]
    async fn test_external_change_resets_session() {
        let vault = people();
        let mut application = mount(&vault, BLOCK).await;
        application.session_mut().set_form(record(json!({ "x": 7 })));

        vault.insert("people.md", "---\ndata:\n  - x: 3\n  - x: 4\n---\n");
        let view = application.view().unwrap();
        assert_eq!(view.control_panel.count, 2);
        assert_eq!(view.form, Some(record(json!({ "x": 3 }))));
    }

    #[test_log::test(tokio::test)]
    async fn test_rename_warns() {
        let vault = people();
        let mut application = mount(&vault, BLOCK).await;
        vault.rename("people.md", "folks.md");

        let view = application.view().unwrap();
        assert!(view.banners.iter().any(|banner| {
            banner.severity == ErrorSeverity::Warning
                && banner.message == "datasource: \"people.md\" has been renamed to \"folks.md\""
        }));
        assert!(application.submit().await.is_err());
        assert_eq!(
            application.configuration().datasource.file(),
            &FileRef::new("people.md", "data")
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_schema_arriving_later_sets_created_default() {
        let vault = Arc::new(MemoryVault::new().with_file("people.md", "---\ndata: []\n---\n"));
        let mut application = mount(&vault, BLOCK).await;
        assert_eq!(application.view().unwrap().form, Some(Record::new()));

        vault.insert(
            "people.md",
            "---\nschema:\n  properties:\n    x: { default: 4 }\ndata: []\n---\n",
        );
        let view = application.view().unwrap();
        assert!(view.control_panel.new_mode);
        assert_eq!(view.form, Some(record(json!({ "x": 4 }))));
    }

    #[test]
    fn test_render_boundary_catches_errors_and_panics() {
        let failed = render_boundary(|| Err(FileError::NotFound { path: "a.md".into() }.into()));
        assert_eq!(
            failed,
            Rendered::Fallback(Fallback::new("Unable to find file at path \"a.md\"."))
        );

        let panicked = render_boundary(|| panic!("boom"));
        match panicked {
            Rendered::Fallback(fallback) => {
                assert_eq!(fallback.title, FALLBACK_TITLE);
                assert_eq!(fallback.detail, "boom");
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }
}
