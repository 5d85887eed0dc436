//! Plugin settings
//!
//! Settings choose the frontmatter key each configuration field falls back to
//! when a code block names a file but no key. They live in the plugin's data
//! blob under [`SETTINGS_KEY`], next to whatever else the host keeps there.
//!
//! Loading layers the stored settings over [`Settings::default`] with figment,
//! so a blob that only sets `datasource.frontmatter` keeps the other defaults.

use async_trait::async_trait;
use figment::{providers::Serialized, Figment};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};
use tracing::{debug, trace};

use crate::error::SettingsError;
use crate::logging::Pretty;

/// Key of the settings object inside the plugin data blob.
pub const SETTINGS_KEY: &str = "settings";

/// Defaults for one configuration field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSettings {
    pub frontmatter: String,
}

impl FieldSettings {
    pub fn new(frontmatter: impl Into<String>) -> Self {
        Self {
            frontmatter: frontmatter.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub datasource: FieldSettings,
    pub schema: FieldSettings,
    pub uischema: FieldSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            datasource: FieldSettings::new("data"),
            schema: FieldSettings::new("schema"),
            uischema: FieldSettings::new("uischema"),
        }
    }
}

/// Where the host keeps the plugin's data blob.
#[async_trait]
pub trait PluginDataStore: Send + Sync {
    async fn load(&self) -> Result<Option<Value>, SettingsError>;

    async fn save(&self, data: Value) -> Result<(), SettingsError>;
}

impl Settings {
    /// Merge `stored` over the defaults. Missing or `null` fields keep their defaults.
    pub fn merged(stored: Option<&Value>) -> Result<Self, SettingsError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));

        if let Some(Value::Object(stored)) = stored {
            figment = figment.merge(Serialized::defaults(without_nulls(stored)));
        }

        Ok(figment.extract()?)
    }

    /// Read the settings out of the plugin data blob.
    pub async fn load(store: &dyn PluginDataStore) -> Result<Self, SettingsError> {
        let data = store.load().await?;
        let stored = data.as_ref().and_then(|data| data.get(SETTINGS_KEY));
        trace!(present = stored.is_some(), "loading settings");

        let settings = Self::merged(stored)?;
        debug!("settings: {}", Pretty(&settings));
        Ok(settings)
    }

    /// Write the settings back, keeping every other key of the blob.
    pub async fn save(&self, store: &dyn PluginDataStore) -> Result<(), SettingsError> {
        let mut data = match store.load().await? {
            Some(Value::Object(data)) => data,
            _ => JsonMap::new(),
        };

        let settings = serde_json::to_value(self).map_err(|e| SettingsError::Store {
            message: e.to_string(),
        })?;
        data.insert(SETTINGS_KEY.to_string(), settings);

        store.save(Value::Object(data)).await?;
        debug!("saved settings");
        Ok(())
    }
}

fn without_nulls(object: &JsonMap<String, Value>) -> JsonMap<String, Value> {
    object
        .iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::Object(inner) => Some((key.clone(), Value::Object(without_nulls(inner)))),
            other => Some((key.clone(), other.clone())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDataStore;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let settings = Settings::merged(None).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.datasource.frontmatter, "data");
        assert_eq!(settings.uischema.frontmatter, "uischema");
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let stored = json!({ "datasource": { "frontmatter": "rows" } });
        let settings = Settings::merged(Some(&stored)).unwrap();
        assert_eq!(settings.datasource.frontmatter, "rows");
        assert_eq!(settings.schema.frontmatter, "schema");
    }

    #[test]
    fn test_null_and_unknown_fields_are_ignored() {
        let stored = json!({
            "schema": { "frontmatter": null },
            "theme": "dark"
        });
        assert_eq!(Settings::merged(Some(&stored)).unwrap(), Settings::default());
    }

    #[test]
    fn test_wrong_type_is_an_error() {
        let stored = json!({ "schema": { "frontmatter": ["a", "b"] } });
        assert!(matches!(
            Settings::merged(Some(&stored)),
            Err(SettingsError::Merge(_))
        ));
    }

    #[tokio::test]
    async fn test_save_keeps_other_keys() {
        let store = MemoryDataStore::with_data(json!({ "version": 2 }));
        let mut settings = Settings::load(&store).await.unwrap();
        settings.uischema.frontmatter = "layout".into();
        settings.save(&store).await.unwrap();

        let data = store.data().unwrap();
        assert_eq!(data["version"], json!(2));
        assert_eq!(data[SETTINGS_KEY]["uischema"]["frontmatter"], json!("layout"));
        assert_eq!(Settings::load(&store).await.unwrap(), settings);
    }
}
