//! Code block configuration
//!
//! A data entry code block names where its records live, where its JSON schema
//! comes from and, optionally, where its UI schema comes from:
//!
//! ```yaml
//! datasource:
//!   file:
//!     path: people.md
//! schema:
//!   inline:
//!     type: object
//!     properties:
//!       name: { type: string }
//! uischema:
//!   file: {}
//! ```
//!
//! Every `file` reference may leave out `path` (the note containing the block)
//! and `frontmatter` (the key from [`Settings`]). The block body is YAML or JSON
//! depending on its language tag.

use data_entry_decoder::{
    configurable, string, structure, sum, unknown_record, Configurable, DecodeError, Decoder,
    Sum,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::logging::Pretty;
use crate::settings::Settings;

/// A JSON schema or UI schema document.
pub type SchemaDocument = JsonMap<String, Value>;

/// Suffix shared by every code block language this plugin handles.
pub const LANGUAGE_SUFFIX: &str = "data-entry";

const YAML_EXTENSIONS: [&str; 2] = ["yaml", "yml"];
const JSON_EXTENSIONS: [&str; 3] = ["json", "jsn", "jsonc"];

/// A vault file and a top-level frontmatter key inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub path: String,
    pub frontmatter: String,
}

impl FileRef {
    pub fn new(path: impl Into<String>, frontmatter: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            frontmatter: frontmatter.into(),
        }
    }

    /// Whether the file body itself holds the value, rather than a frontmatter key.
    pub fn is_json_file(&self) -> bool {
        self.path.ends_with(".json")
    }
}

/// Either a literal value or a reference to one stored in a file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source<T> {
    Inline(T),
    File(FileRef),
}

impl<T> Source<T> {
    pub fn file(&self) -> Option<&FileRef> {
        match self {
            Source::Inline(_) => None,
            Source::File(file) => Some(file),
        }
    }
}

/// Where a form's records are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Datasource {
    File(FileRef),
}

impl Datasource {
    pub fn file(&self) -> &FileRef {
        match self {
            Datasource::File(file) => file,
        }
    }
}

/// A decoded code block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Configuration {
    pub datasource: Datasource,
    pub schema: Source<SchemaDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uischema: Option<Source<SchemaDocument>>,
}

/// What each `file` reference falls back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationDefaults {
    pub datasource: FileRef,
    pub schema: FileRef,
    pub uischema: FileRef,
}

impl ConfigurationDefaults {
    /// Defaults for a block inside the note at `source_path`.
    pub fn from_settings(settings: &Settings, source_path: &str) -> Self {
        let path = normalize_path(source_path);
        Self {
            datasource: FileRef::new(&path, &settings.datasource.frontmatter),
            schema: FileRef::new(&path, &settings.schema.frontmatter),
            uischema: FileRef::new(&path, &settings.uischema.frontmatter),
        }
    }
}

/// Strip one leading `.` from a vault path, so `./a/b` and `.a` both become
/// vault-root relative. Nothing else is resolved.
pub fn normalize_path(path: &str) -> String {
    path.strip_prefix("./")
        .or_else(|| path.strip_prefix('.'))
        .unwrap_or(path)
        .to_string()
}

/// Decoder for a partially written [`FileRef`].
pub fn file_ref(defaults: FileRef) -> Configurable<FileRef> {
    configurable(defaults)
        .field("path", string().map(|path| normalize_path(&path)), |file, path| {
            file.path = path
        })
        .field("frontmatter", string(), |file, key| file.frontmatter = key)
}

fn source(defaults: FileRef) -> Sum<Source<SchemaDocument>> {
    sum("inline", unknown_record().map(Source::Inline))
        .or("file", file_ref(defaults).map(Source::File))
}

/// Decoder for a whole code block.
pub struct ConfigurationDecoder {
    datasource: Sum<Datasource>,
    schema: Sum<Source<SchemaDocument>>,
    uischema: Sum<Source<SchemaDocument>>,
}

/// Build the configuration decoder for the given defaults.
pub fn configuration(defaults: ConfigurationDefaults) -> ConfigurationDecoder {
    ConfigurationDecoder {
        datasource: sum("file", file_ref(defaults.datasource).map(Datasource::File)),
        schema: source(defaults.schema),
        uischema: source(defaults.uischema),
    }
}

impl Decoder for ConfigurationDecoder {
    type Output = Configuration;

    fn decode(&self, input: &Value) -> data_entry_decoder::Result<Configuration> {
        let object = structure::object(input)?;

        let datasource = structure::required(object, "datasource", &self.datasource);
        let schema = structure::required(object, "schema", &self.schema);
        let uischema = structure::optional(object, "uischema", &self.uischema);

        match (datasource, schema, uischema) {
            (Ok(datasource), Ok(schema), Ok(uischema)) => Ok(Configuration {
                datasource,
                schema,
                uischema,
            }),
            (datasource, schema, uischema) => Err(DecodeError::concat(
                [datasource.err(), schema.err(), uischema.err()]
                    .into_iter()
                    .flatten(),
            )),
        }
    }
}

/// How a code block body is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Yaml,
    Json,
}

impl SourceFormat {
    /// The format for a code block language such as `yml-data-entry`.
    pub fn from_language(language: &str) -> Option<Self> {
        let extension = language
            .strip_suffix(LANGUAGE_SUFFIX)?
            .strip_suffix('-')?;
        if YAML_EXTENSIONS.contains(&extension) {
            Some(SourceFormat::Yaml)
        } else if JSON_EXTENSIONS.contains(&extension) {
            Some(SourceFormat::Json)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SourceFormat::Yaml => "YAML",
            SourceFormat::Json => "JSON",
        }
    }
}

/// Every code block language this plugin registers.
pub fn languages() -> Vec<String> {
    YAML_EXTENSIONS
        .iter()
        .chain(JSON_EXTENSIONS.iter())
        .map(|extension| format!("{extension}-{LANGUAGE_SUFFIX}"))
        .collect()
}

/// Parse a code block body into a JSON value.
pub fn parse_source(format: SourceFormat, source: &str) -> Result<Value, ConfigError> {
    let parse_error = |message: String| ConfigError::Parse {
        format: format.name(),
        message,
    };

    match format {
        SourceFormat::Yaml => {
            serde_yaml_ng::from_str(source).map_err(|e| parse_error(e.to_string()))
        }
        SourceFormat::Json => serde_json::from_str(source).map_err(|e| parse_error(e.to_string())),
    }
}

impl Configuration {
    /// Parse and decode the body of a code block tagged `language`.
    pub fn from_code_block(
        language: &str,
        source: &str,
        defaults: ConfigurationDefaults,
    ) -> Result<Self, ConfigError> {
        let format =
            SourceFormat::from_language(language).ok_or_else(|| ConfigError::UnsupportedLanguage {
                language: language.to_string(),
            })?;
        trace!(language, ?format, "parsing code block");

        let value = parse_source(format, source)?;
        let configuration = configuration(defaults).decode(&value)?;
        debug!("configuration: {}", Pretty(&configuration));
        Ok(configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> ConfigurationDefaults {
        ConfigurationDefaults::from_settings(&Settings::default(), "notes/people.md")
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./a/b"), "a/b");
        assert_eq!(normalize_path(".a/b"), "a/b");
        assert_eq!(normalize_path("a/b"), "a/b");
        assert_eq!(normalize_path("../a"), "./a");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn test_file_ref_defaults_and_overrides() {
        let decoder = file_ref(FileRef::new("index.md", "data"));
        assert_eq!(
            decoder.decode(&json!({})).unwrap(),
            FileRef::new("index.md", "data")
        );
        assert_eq!(
            decoder.decode(&json!({ "path": "x" })).unwrap(),
            FileRef::new("x", "data")
        );
        assert_eq!(
            decoder.decode(&json!({ "path": "./a/b" })).unwrap().path,
            "a/b"
        );
    }

    #[test]
    fn test_minimal_configuration() {
        let decoded = configuration(defaults())
            .decode(&json!({
                "datasource": { "file": {} },
                "schema": { "inline": { "type": "object" } }
            }))
            .unwrap();

        assert_eq!(
            decoded.datasource,
            Datasource::File(FileRef::new("notes/people.md", "data"))
        );
        assert_eq!(
            decoded.schema,
            Source::Inline(json!({ "type": "object" }).as_object().cloned().unwrap())
        );
        assert_eq!(decoded.uischema, None);
    }

    #[test]
    fn test_each_field_gets_its_own_key_default() {
        let decoded = configuration(defaults())
            .decode(&json!({
                "datasource": { "file": { "path": "data.md" } },
                "schema": { "file": null },
                "uischema": { "file": {} }
            }))
            .unwrap();

        assert_eq!(decoded.datasource.file(), &FileRef::new("data.md", "data"));
        assert_eq!(
            decoded.schema.file(),
            Some(&FileRef::new("notes/people.md", "schema"))
        );
        assert_eq!(
            decoded.uischema.as_ref().and_then(Source::file),
            Some(&FileRef::new("notes/people.md", "uischema"))
        );
    }

    #[test]
    fn test_errors_are_path_qualified_and_accumulated() {
        let err = configuration(defaults())
            .decode(&json!({
                "datasource": { "folder": "people" },
                "schema": { "file": { "path": 3 } },
                "uischema": { "inline": {}, "file": {} }
            }))
            .unwrap_err();

        let lines = err.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("datasource:"), "{lines:?}");
        assert!(lines[1].starts_with("schema.file.path:"), "{lines:?}");
        assert!(lines[2].starts_with("uischema:"), "{lines:?}");
    }

    #[test]
    fn test_missing_required_fields() {
        let err = configuration(defaults()).decode(&json!({})).unwrap_err();
        assert_eq!(err.failures().len(), 2);
    }

    #[test]
    fn test_serializes_externally_tagged() {
        let decoded = configuration(defaults())
            .decode(&json!({
                "datasource": { "file": {} },
                "schema": { "inline": {} }
            }))
            .unwrap();

        assert_eq!(
            serde_json::to_value(&decoded).unwrap(),
            json!({
                "datasource": { "file": { "path": "notes/people.md", "frontmatter": "data" } },
                "schema": { "inline": {} }
            })
        );
    }

    #[test]
    fn test_languages() {
        assert_eq!(
            languages(),
            vec![
                "yaml-data-entry",
                "yml-data-entry",
                "json-data-entry",
                "jsn-data-entry",
                "jsonc-data-entry"
            ]
        );
        assert_eq!(SourceFormat::from_language("yml-data-entry"), Some(SourceFormat::Yaml));
        assert_eq!(SourceFormat::from_language("jsonc-data-entry"), Some(SourceFormat::Json));
        assert_eq!(SourceFormat::from_language("toml-data-entry"), None);
        assert_eq!(SourceFormat::from_language("yaml"), None);
    }

    #[test]
    fn test_from_code_block_yaml() {
        let source = "datasource:\n  file:\n    path: ./people.md\nschema:\n  file: {}\n";
        let configuration =
            Configuration::from_code_block("yaml-data-entry", source, defaults()).unwrap();
        assert_eq!(configuration.datasource.file().path, "people.md");
    }

    #[test]
    fn test_from_code_block_errors() {
        assert!(matches!(
            Configuration::from_code_block("json-data-entry", "{", defaults()),
            Err(ConfigError::Parse { format: "JSON", .. })
        ));
        assert!(matches!(
            Configuration::from_code_block("json-data-entry", "{}", defaults()),
            Err(ConfigError::Decode(_))
        ));
        assert!(matches!(
            Configuration::from_code_block("md-data-entry", "", defaults()),
            Err(ConfigError::UnsupportedLanguage { .. })
        ));
    }
}
