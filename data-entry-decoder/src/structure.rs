//! Helpers for decoding objects field by field
//!
//! Record decoders pull each property out with [`required`] or [`optional`] and
//! combine the per-field results, so every violated field is reported at once:
//!
//! ```
//! use data_entry_decoder::{structure, string, DecodeError};
//! use serde_json::json;
//!
//! let input = json!({ "name": 1 });
//! let object = structure::object(&input).unwrap();
//! let name = structure::required(object, "name", &string());
//! let tag = structure::optional(object, "tag", &string());
//! let err = match (name, tag) {
//!     (Ok(_), Ok(_)) => unreachable!(),
//!     (name, tag) => DecodeError::concat(name.err().into_iter().chain(tag.err())),
//! };
//! assert_eq!(err.to_string(), "name: expected string, found 1");
//! ```

use serde_json::{Map as JsonMap, Value};

use crate::decoder::Decoder;
use crate::error::{DecodeError, Result};

/// Borrow `input` as an object.
pub fn object(input: &Value) -> Result<&JsonMap<String, Value>> {
    input
        .as_object()
        .ok_or_else(|| DecodeError::leaf("object", input))
}

/// Decode a property that must be present and non-null.
pub fn required<D>(object: &JsonMap<String, Value>, key: &str, decoder: &D) -> Result<D::Output>
where
    D: Decoder + ?Sized,
{
    match object.get(key) {
        None | Some(Value::Null) => Err(DecodeError::missing().at_key(key)),
        Some(value) => decoder.decode(value).map_err(|e| e.at_key(key)),
    }
}

/// Decode a property that may be absent; `null` counts as absent.
pub fn optional<D>(
    object: &JsonMap<String, Value>,
    key: &str,
    decoder: &D,
) -> Result<Option<D::Output>>
where
    D: Decoder + ?Sized,
{
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => decoder.decode(value).map(Some).map_err(|e| e.at_key(key)),
    }
}
