//! The plugin entry point
//!
//! [`DataEntryPlugin`] is what the host loads. It owns the settings and the
//! observer registry, and turns each data entry code block into either a
//! mounted [`Application`] or an error block.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::application::{Application, Fallback};
use crate::config::{self, Configuration, ConfigurationDefaults};
use crate::error::{ConfigError, SettingsError};
use crate::observer::ObserverRegistry;
use crate::settings::{PluginDataStore, Settings};
use crate::vault::Vault;

/// The host's transient notice popup.
pub trait Notifier: Send + Sync {
    fn notice(&self, message: &str);
}

/// The result of processing one code block.
pub enum Block {
    Application(Box<Application>),
    Failed(Fallback),
}

impl Block {
    pub fn application(&mut self) -> Option<&mut Application> {
        match self {
            Block::Application(application) => Some(&mut **application),
            Block::Failed(_) => None,
        }
    }

    pub fn fallback(&self) -> Option<&Fallback> {
        match self {
            Block::Application(_) => None,
            Block::Failed(fallback) => Some(fallback),
        }
    }
}

pub struct DataEntryPlugin {
    registry: ObserverRegistry,
    store: Arc<dyn PluginDataStore>,
    notifier: Arc<dyn Notifier>,
    settings: RwLock<Settings>,
}

impl DataEntryPlugin {
    /// Load settings and get ready to process code blocks.
    pub async fn load(
        vault: Arc<dyn Vault>,
        store: Arc<dyn PluginDataStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, SettingsError> {
        let settings = Settings::load(store.as_ref()).await?;
        info!(languages = ?config::languages(), "data entry plugin loaded");
        Ok(Self {
            registry: ObserverRegistry::new(vault),
            store,
            notifier,
            settings: RwLock::new(settings),
        })
    }

    /// The code block languages to register with the host.
    pub fn languages(&self) -> Vec<String> {
        config::languages()
    }

    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the settings and persist them. Blocks processed afterwards use
    /// the new defaults.
    pub async fn update_settings(&self, settings: Settings) -> Result<(), SettingsError> {
        settings.save(self.store.as_ref()).await?;
        *self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = settings;
        Ok(())
    }

    pub fn registry(&self) -> &ObserverRegistry {
        &self.registry
    }

    /// Turn the body of a code block in the note at `source_path` into a block.
    pub async fn process(&self, language: &str, source: &str, source_path: &str) -> Block {
        let defaults = ConfigurationDefaults::from_settings(&self.settings(), source_path);

        match Configuration::from_code_block(language, source, defaults) {
            Ok(configuration) => {
                let application = Application::mount(configuration, &self.registry).await;
                Block::Application(Box::new(application))
            }
            Err(e) => {
                warn!(language, source_path, error = %e, "code block rejected");
                if matches!(e, ConfigError::Parse { .. }) {
                    self.notifier.notice(&e.to_string());
                }
                debug!(language, "rendering error block");
                Block::Failed(Fallback::new(e.to_string()))
            }
        }
    }
}
