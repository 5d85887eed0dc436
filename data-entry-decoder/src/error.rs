//! Error types for decoding
//!
//! A [`DecodeError`] is a flat list of [`Failure`]s. Every failure carries the
//! path from the decoded root to the offending value, so a nested failure such
//! as a wrong type deep inside a sum variant renders as a single actionable line:
//!
//! ```text
//! schema.file.frontmatter: expected string, found 42
//! ```
//!
//! Combinators never stop at the first failure when sibling values can still be
//! checked; they concatenate failures instead.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Result type for decoding operations
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Longest rendering of an offending value before it is truncated
const MAX_FOUND_LEN: usize = 48;

/// One step on the path from the decoded root to a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A property of an object
    Key(String),
    /// The tag of a sum variant
    Variant(String),
    /// An element of an array
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) | Segment::Variant(key) => write!(f, "{key}"),
            Segment::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Why a value failed to decode.
#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    /// The value has the wrong shape
    Type { expected: String, found: String },
    /// A required property is absent
    Missing,
    /// A sum value carries none of the declared variant tags
    NoVariant { expected: Vec<String> },
    /// A sum value carries more than one declared variant tag
    Ambiguous { found: Vec<String> },
    /// Free-form failure raised by a custom decoder
    Message(String),
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Type { expected, found } => write!(f, "expected {expected}, found {found}"),
            Reason::Missing => write!(f, "required property is missing"),
            Reason::NoVariant { expected } => {
                write!(f, "expected exactly one of {}, found none", quoted(expected))
            }
            Reason::Ambiguous { found } => {
                write!(f, "expected exactly one variant, found {}", quoted(found))
            }
            Reason::Message(message) => write!(f, "{message}"),
        }
    }
}

/// A single decoding failure and where it happened.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub path: Vec<Segment>,
    pub reason: Reason,
}

impl Failure {
    /// Dotted rendering of the path, `<root>` for the top-level value.
    pub fn path_string(&self) -> String {
        if self.path.is_empty() {
            return "<root>".to_string();
        }

        let mut rendered = String::new();
        for segment in &self.path {
            if !rendered.is_empty() && !matches!(segment, Segment::Index(_)) {
                rendered.push('.');
            }
            rendered.push_str(&segment.to_string());
        }
        rendered
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path_string(), self.reason)
    }
}

/// Errors produced by decoders
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", render(.failures))]
pub struct DecodeError {
    failures: Vec<Failure>,
}

impl DecodeError {
    fn root(reason: Reason) -> Self {
        Self {
            failures: vec![Failure {
                path: Vec::new(),
                reason,
            }],
        }
    }

    /// The value does not have the `expected` shape.
    pub fn leaf(expected: impl Into<String>, found: &Value) -> Self {
        Self::root(Reason::Type {
            expected: expected.into(),
            found: describe(found),
        })
    }

    /// A required value is absent.
    pub fn missing() -> Self {
        Self::root(Reason::Missing)
    }

    /// None of the `expected` variant tags were present.
    pub fn no_variant(expected: Vec<String>) -> Self {
        Self::root(Reason::NoVariant { expected })
    }

    /// More than one variant tag was present.
    pub fn ambiguous(found: Vec<String>) -> Self {
        Self::root(Reason::Ambiguous { found })
    }

    /// A custom failure.
    pub fn message(message: impl Into<String>) -> Self {
        Self::root(Reason::Message(message.into()))
    }

    /// Merge several errors into one, keeping every failure.
    ///
    /// Returns an error with no failures when the iterator is empty; callers only
    /// concatenate after at least one sibling failed.
    pub fn concat(errors: impl IntoIterator<Item = DecodeError>) -> Self {
        Self {
            failures: errors.into_iter().flat_map(|e| e.failures).collect(),
        }
    }

    /// Qualify every failure with an object key.
    pub fn at_key(self, key: impl Into<String>) -> Self {
        self.prefixed(Segment::Key(key.into()))
    }

    /// Qualify every failure with a sum variant tag.
    pub fn at_variant(self, tag: impl Into<String>) -> Self {
        self.prefixed(Segment::Variant(tag.into()))
    }

    /// Qualify every failure with an array index.
    pub fn at_index(self, index: usize) -> Self {
        self.prefixed(Segment::Index(index))
    }

    fn prefixed(mut self, segment: Segment) -> Self {
        for failure in &mut self.failures {
            failure.path.insert(0, segment.clone());
        }
        self
    }

    /// All recorded failures, in the order they were found.
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// One human-readable line per violated path.
    pub fn lines(&self) -> Vec<String> {
        self.failures.iter().map(ToString::to_string).collect()
    }
}

fn render(failures: &[Failure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn quoted(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!("\"{tag}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Short rendering of an offending value.
fn describe(value: &Value) -> String {
    let rendered = match value {
        Value::Null => return "null".to_string(),
        Value::Object(map) if map.is_empty() => return "{}".to_string(),
        other => other.to_string(),
    };

    if rendered.chars().count() > MAX_FOUND_LEN {
        let truncated: String = rendered.chars().take(MAX_FOUND_LEN).collect();
        format!("{truncated}...")
    } else {
        rendered
    }
}
