//! Decoder for tagged unions written as single-key objects
//!
//! A sum value names its variant with the only key of an object and carries the
//! variant's payload as that key's value:
//!
//! ```yaml
//! schema:
//!   file:
//!     path: schemas/person.md
//! ```
//!
//! Build the decoder from a first variant, add the rest with [`Sum::or`], and map
//! every payload into one closed enum so callers get an exhaustive `match`:
//!
//! ```
//! use data_entry_decoder::{sum, string, unknown_record, Decoder};
//! use serde_json::json;
//!
//! #[derive(Debug, PartialEq)]
//! enum Schema {
//!     Inline(serde_json::Map<String, serde_json::Value>),
//!     File(String),
//! }
//!
//! let schema = sum("inline", unknown_record().map(Schema::Inline))
//!     .or("file", string().map(Schema::File));
//!
//! assert_eq!(
//!     schema.decode(&json!({ "file": "a.md" })).unwrap(),
//!     Schema::File("a.md".into())
//! );
//! assert!(schema.decode(&json!({})).is_err());
//! ```
//!
//! Only declared tags are considered. An object carrying none of them, or more
//! than one, is rejected instead of guessed at; undeclared keys are ignored. Among
//! the declared variants, declaration order decides which payload decoder runs
//! first, which only matters when a custom variant decoder is duck-typed over
//! overlapping shapes.

use serde_json::Value;
use tracing::trace;

use crate::decoder::{BoxDecoder, Decoder};
use crate::error::{DecodeError, Result};
use crate::structure;

struct Variant<T> {
    tag: String,
    decoder: BoxDecoder<T>,
}

/// Decoder for a closed set of single-key variants, all producing `T`.
///
/// A `Sum` always holds at least one variant: the only constructor is [`sum`],
/// which takes the first.
pub struct Sum<T> {
    variants: Vec<Variant<T>>,
}

/// Start a sum decoder with its first variant.
pub fn sum<D>(tag: impl Into<String>, decoder: D) -> Sum<D::Output>
where
    D: Decoder + 'static,
{
    Sum {
        variants: vec![Variant {
            tag: tag.into(),
            decoder: decoder.boxed(),
        }],
    }
}

impl<T> Sum<T> {
    /// Add another variant. Variants are tried in the order they are added.
    pub fn or<D>(mut self, tag: impl Into<String>, decoder: D) -> Self
    where
        D: Decoder<Output = T> + 'static,
    {
        self.variants.push(Variant {
            tag: tag.into(),
            decoder: decoder.boxed(),
        });
        self
    }

    /// The declared variant tags, in declaration order.
    pub fn tags(&self) -> Vec<String> {
        self.variants.iter().map(|v| v.tag.clone()).collect()
    }
}

impl<T> Decoder for Sum<T> {
    type Output = T;

    fn decode(&self, input: &Value) -> Result<T> {
        let object = structure::object(input)?;

        let present: Vec<&Variant<T>> = self
            .variants
            .iter()
            .filter(|variant| object.contains_key(&variant.tag))
            .collect();

        match present.as_slice() {
            [] => Err(DecodeError::no_variant(self.tags())),
            [variant] => {
                trace!(tag = %variant.tag, "decoding sum variant");
                let payload = &object[&variant.tag];
                variant
                    .decoder
                    .decode(payload)
                    .map_err(|e| e.at_variant(&variant.tag))
            }
            several => Err(DecodeError::ambiguous(
                several.iter().map(|v| v.tag.clone()).collect(),
            )),
        }
    }
}
