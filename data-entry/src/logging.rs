//! Log formatting helpers

use serde::Serialize;
use std::fmt::{self, Debug};

/// Renders a value as YAML inside a log line.
///
/// ```
/// use data_entry::Pretty;
/// use serde_json::json;
///
/// let rendered = Pretty(&json!({ "path": "people.md" })).to_string();
/// assert_eq!(rendered, "\npath: people.md\n");
/// ```
///
/// Falls back to the `Debug` form if the value cannot be serialized.
pub struct Pretty<T>(pub T);

impl<T: Serialize + Debug> fmt::Display for Pretty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_yaml_ng::to_string(&self.0) {
            Ok(yaml) => write!(f, "\n{yaml}"),
            Err(_) => write!(f, "\n{:#?}", self.0),
        }
    }
}

impl<T: Serialize + Debug> Debug for Pretty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
