//! Decoding combinators over JSON values
//!
//! `data-entry-decoder` turns untyped [`serde_json::Value`]s (usually parsed
//! from YAML or JSON text written by a person) into typed values, reporting
//! every violation with the path that led to it.
//!
//! # Building blocks
//!
//! - [`Decoder`] - the core trait, with [`Decoder::map`] and [`Decoder::boxed`]
//! - [`primitives`] - strings, booleans, numbers, untyped records and arrays,
//!   [`nullable`] and [`array`]
//! - [`structure`] - per-field helpers for hand-written record decoders
//! - [`sum`] - tagged unions written as single-key objects
//! - [`configurable`] - partial records merged over defaults
//!
//! Encoding is left to serde: an externally tagged enum serializes to exactly
//! the single-key object shape that [`Sum`] decodes.

pub mod configurable;
pub mod decoder;
pub mod error;
pub mod primitives;
pub mod structure;
pub mod sum;

pub use configurable::{configurable, Configurable};
pub use decoder::{from_fn, BoxDecoder, Decoder, FromFn, Map};
pub use error::{DecodeError, Failure, Reason, Result, Segment};
pub use primitives::{
    array, boolean, nullable, number, string, unknown, unknown_array, unknown_record,
};
pub use sum::{sum, Sum};
