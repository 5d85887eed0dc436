//! Unsaved form edits
//!
//! The cache holds one working copy per stored record plus a separate slot for
//! the record being created. Any change to the stored records throws the
//! working copies away and starts again from the new records; the created slot
//! survives.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::datasource::Record;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormsCache {
    forms: BTreeMap<usize, Record>,
    created: Record,
    #[serde(skip)]
    revision: Option<u64>,
}

impl FormsCache {
    pub fn new(created: Record) -> Self {
        Self {
            forms: BTreeMap::new(),
            created,
            revision: None,
        }
    }

    /// Discard every edit and start over from `contents`.
    pub fn reset(&mut self, contents: &[Record]) {
        self.forms = contents.iter().cloned().enumerate().collect();
        debug!(count = self.forms.len(), "forms cache rebuilt");
    }

    /// Reset from `contents` if they are newer than what the cache was built from.
    pub fn sync(&mut self, revision: u64, contents: &[Record]) -> bool {
        if self.revision == Some(revision) {
            return false;
        }
        self.revision = Some(revision);
        self.reset(contents);
        true
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.forms.get(&index)
    }

    pub fn set(&mut self, index: usize, form: Record) {
        self.forms.insert(index, form);
    }

    pub fn created(&self) -> &Record {
        &self.created
    }

    pub fn set_created(&mut self, form: Record) {
        self.created = form;
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Record)> {
        self.forms.iter().map(|(index, form)| (*index, form))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_reset_keys_by_index() {
        let mut cache = FormsCache::new(Record::new());
        cache.reset(&[record(json!({ "a": 1 })), record(json!({ "b": 2 }))]);

        assert_eq!(
            serde_json::to_value(&cache).unwrap()["forms"],
            json!({ "0": { "a": 1 }, "1": { "b": 2 } })
        );
    }

    #[test]
    fn test_new_contents_discard_edits() {
        let mut cache = FormsCache::new(Record::new());
        assert!(cache.sync(1, &[record(json!({ "a": 1 })), record(json!({ "b": 2 }))]));
        cache.set(0, record(json!({ "a": 99 })));

        assert!(!cache.sync(1, &[]));
        assert_eq!(cache.get(0), Some(&record(json!({ "a": 99 }))));

        assert!(cache.sync(2, &[record(json!({ "c": 3 }))]));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(0), Some(&record(json!({ "c": 3 }))));
        assert_eq!(cache.get(1), None);
    }

    #[test]
    fn test_created_slot_survives_reset() {
        let mut cache = FormsCache::new(record(json!({ "x": 0 })));
        cache.set_created(record(json!({ "x": 1 })));
        cache.reset(&[]);
        assert!(cache.is_empty());
        assert_eq!(cache.created(), &record(json!({ "x": 1 })));
    }
}
