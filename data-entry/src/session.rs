//! Editing session for one form
//!
//! A [`Session`] combines the [`Cursor`], the [`FormsCache`] and the new-record
//! toggle into the form the user is looking at. In new mode that is the created
//! slot; otherwise it is the working copy at the cursor, or nothing when the
//! cursor points at no record.

use serde::Serialize;
use serde_json::{Map as JsonMap, Value};
use tracing::{debug, trace};

use crate::config::SchemaDocument;
use crate::cursor::Cursor;
use crate::datasource::Record;
use crate::error::DatasourceError;
use crate::forms::FormsCache;

/// The value a fresh form starts from.
///
/// Uses the schema's `default` when present, otherwise an empty value of the
/// schema's type. Object schemas also pick up the defaults of their properties.
pub fn default_value(schema: &Value) -> Value {
    if let Some(default) = schema.get("default") {
        return default.clone();
    }

    let kind = match schema.get("type") {
        Some(Value::String(kind)) => Some(kind.as_str()),
        Some(Value::Array(kinds)) => kinds.first().and_then(Value::as_str),
        _ => None,
    };

    match kind {
        Some("string") => Value::String(String::new()),
        Some("number") | Some("integer") => Value::from(0),
        Some("boolean") => Value::Bool(false),
        Some("array") => Value::Array(Vec::new()),
        Some("null") => Value::Null,
        Some("object") | None => {
            let defaults: JsonMap<String, Value> = schema
                .get("properties")
                .and_then(Value::as_object)
                .into_iter()
                .flatten()
                .filter_map(|(name, property)| {
                    property
                        .get("default")
                        .map(|default| (name.clone(), default.clone()))
                })
                .collect();
            Value::Object(defaults)
        }
        Some(_) => Value::Null,
    }
}

/// The record a new form starts from. Non-object defaults start empty.
pub fn default_form(schema: Option<&SchemaDocument>) -> Record {
    let schema = schema.cloned().map(Value::Object).unwrap_or(Value::Null);
    match default_value(&schema) {
        Value::Object(form) => form,
        _ => Record::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    #[serde(skip)]
    cursor: Cursor,
    forms: FormsCache,
    new_mode: bool,
    default_form: Record,
    count: usize,
}

impl Session {
    /// Start a session over `items`. New mode starts on when there is nothing to edit.
    pub fn new(default_form: Record, revision: u64, items: &[Record]) -> Self {
        let mut session = Self {
            cursor: Cursor::new(0, None),
            forms: FormsCache::new(default_form.clone()),
            new_mode: items.is_empty(),
            default_form,
            count: 0,
        };
        session.sync(revision, items);
        session
    }

    /// Catch up with the stored records. Returns true if they changed.
    pub fn sync(&mut self, revision: u64, items: &[Record]) -> bool {
        if !self.forms.sync(revision, items) {
            return false;
        }
        self.count = items.len();
        self.cursor.set_max(items.len().checked_sub(1));
        trace!(revision, count = self.count, cursor = ?self.cursor.value(), "session synced");
        true
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn forms(&self) -> &FormsCache {
        &self.forms
    }

    pub fn new_mode(&self) -> bool {
        self.new_mode
    }

    pub fn set_new_mode(&mut self, new_mode: bool) {
        if self.new_mode != new_mode {
            debug!(new_mode, "switched mode");
            self.new_mode = new_mode;
        }
    }

    pub fn toggle_new_mode(&mut self) {
        self.set_new_mode(!self.new_mode);
    }

    /// Number of stored records.
    pub fn count(&self) -> usize {
        self.count
    }

    /// The 1-based page of the selected record, 0 when nothing is selected.
    pub fn page(&self) -> usize {
        self.cursor.value().map_or(0, |index| index + 1)
    }

    /// Select the record on 1-based `page`. Page 0 is ignored.
    pub fn go_to_page(&mut self, page: usize) {
        if let Some(index) = page.checked_sub(1) {
            self.cursor.set(Some(index));
        }
    }

    pub fn increment_by(&mut self, count: i64) {
        self.cursor.increment_by(count);
    }

    /// The form on screen, if any.
    pub fn form(&self) -> Option<&Record> {
        if self.new_mode {
            Some(self.forms.created())
        } else {
            self.cursor.value().and_then(|index| self.forms.get(index))
        }
    }

    /// Replace the form on screen. Returns false when there is no form to edit.
    pub fn set_form(&mut self, form: Record) -> bool {
        if self.new_mode {
            self.forms.set_created(form);
            return true;
        }
        match self.cursor.value() {
            Some(index) => {
                self.forms.set(index, form);
                true
            }
            None => false,
        }
    }

    /// Replace the schema default. An untouched created slot follows it.
    pub fn set_default_form(&mut self, form: Record) {
        if self.default_form == form {
            return;
        }
        if self.forms.created() == &self.default_form {
            self.forms.set_created(form.clone());
        }
        trace!("default form replaced");
        self.default_form = form;
    }

    /// Put the form on screen back to the schema default.
    pub fn clear(&mut self) -> bool {
        self.set_form(self.default_form.clone())
    }

    /// The full record list to store when the form on screen is submitted.
    pub fn submission(&self, items: &[Record]) -> Result<Vec<Record>, DatasourceError> {
        let mut records = items.to_vec();
        if self.new_mode {
            records.push(self.forms.created().clone());
            return Ok(records);
        }

        let index = self.cursor.value().ok_or(DatasourceError::NothingSelected)?;
        let form = self.forms.get(index).ok_or(DatasourceError::NothingSelected)?;
        let slot = records
            .get_mut(index)
            .ok_or(DatasourceError::NothingSelected)?;
        *slot = form.clone();
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn items() -> Vec<Record> {
        vec![record(json!({ "x": 0 })), record(json!({ "x": 1 }))]
    }

    #[test]
    fn test_default_value() {
        assert_eq!(default_value(&json!({ "type": "string" })), json!(""));
        assert_eq!(default_value(&json!({ "type": "integer" })), json!(0));
        assert_eq!(default_value(&json!({ "type": "boolean" })), json!(false));
        assert_eq!(default_value(&json!({ "type": "array" })), json!([]));
        assert_eq!(default_value(&json!({ "type": ["null", "string"] })), json!(null));
        assert_eq!(default_value(&json!({ "default": 7, "type": "number" })), json!(7));
        assert_eq!(
            default_value(&json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "active": { "type": "boolean", "default": true }
                }
            })),
            json!({ "active": true })
        );
    }

    #[test]
    fn test_default_form_for_non_object_schema() {
        let schema = record(json!({ "type": "string" }));
        assert!(default_form(Some(&schema)).is_empty());
        assert!(default_form(None).is_empty());
    }

    #[test]
    fn test_starts_in_new_mode_only_when_empty() {
        assert!(Session::new(Record::new(), 1, &[]).new_mode());

        let session = Session::new(Record::new(), 1, &items());
        assert!(!session.new_mode());
        assert_eq!(session.cursor().value(), Some(1));
        assert_eq!(session.page(), 2);
        assert_eq!(session.form(), Some(&record(json!({ "x": 1 }))));
    }

    #[test]
    fn test_edit_then_submit_overwrites_selected() {
        let mut session = Session::new(Record::new(), 1, &items());
        session.go_to_page(1);
        assert!(session.set_form(record(json!({ "x": 9 }))));

        assert_eq!(
            session.submission(&items()).unwrap(),
            vec![record(json!({ "x": 9 })), record(json!({ "x": 1 }))]
        );
    }

    #[test]
    fn test_new_mode_appends_created() {
        let mut session = Session::new(record(json!({ "x": 0 })), 1, &items()[..1]);
        session.set_new_mode(true);
        session.set_form(record(json!({ "x": 1 })));

        assert_eq!(
            session.submission(&items()[..1]).unwrap(),
            vec![record(json!({ "x": 0 })), record(json!({ "x": 1 }))]
        );
    }

    #[test]
    fn test_clear_restores_default() {
        let mut session = Session::new(record(json!({ "x": 0 })), 1, &[]);
        session.set_form(record(json!({ "x": 5 })));
        session.clear();
        assert_eq!(session.form(), Some(&record(json!({ "x": 0 }))));
    }

    #[test]
    fn test_sync_discards_edits_on_new_revision() {
        let mut session = Session::new(Record::new(), 1, &items());
        session.set_form(record(json!({ "x": 42 })));
        assert!(!session.sync(1, &items()));
        assert_eq!(session.form(), Some(&record(json!({ "x": 42 }))));

        assert!(session.sync(2, &items()[..1]));
        assert_eq!(session.count(), 1);
        assert_eq!(session.cursor().value(), Some(0));
        assert_eq!(session.form(), Some(&record(json!({ "x": 0 }))));
    }

    #[test]
    fn test_new_default_replaces_untouched_created_slot() {
        let mut session = Session::new(Record::new(), 1, &[]);
        session.set_default_form(record(json!({ "x": 0 })));
        assert_eq!(session.form(), Some(&record(json!({ "x": 0 }))));

        session.set_form(record(json!({ "x": 5 })));
        session.set_default_form(record(json!({ "x": 1 })));
        assert_eq!(session.form(), Some(&record(json!({ "x": 5 }))));

        session.clear();
        assert_eq!(session.form(), Some(&record(json!({ "x": 1 }))));
    }

    #[test]
    fn test_nothing_selected() {
        let mut session = Session::new(Record::new(), 1, &[]);
        session.toggle_new_mode();
        assert_eq!(session.form(), None);
        assert!(!session.set_form(Record::new()));
        assert!(matches!(
            session.submission(&[]),
            Err(DatasourceError::NothingSelected)
        ));
    }
}
