//! Decoder for partially supplied records merged over defaults
//!
//! Every field is optional in the input. Present fields are decoded with their
//! own decoder and written over a copy of the defaults; absent or `null` fields
//! keep the default. Defaults apply per field, so `{ path: "x" }` only overrides
//! `path`.

use serde_json::Value;

use crate::decoder::Decoder;
use crate::error::{DecodeError, Result};
use crate::structure;

type Apply<T> = Box<dyn Fn(&mut T, &Value) -> Result<()> + Send + Sync>;

struct Field<T> {
    key: String,
    apply: Apply<T>,
}

/// A record decoder that fills missing fields from `defaults`.
pub struct Configurable<T> {
    defaults: T,
    fields: Vec<Field<T>>,
}

/// Start a configurable decoder with its defaults.
pub fn configurable<T>(defaults: T) -> Configurable<T> {
    Configurable {
        defaults,
        fields: Vec::new(),
    }
}

impl<T> Configurable<T> {
    /// Declare a field: when `key` is present its value is decoded with `decoder`
    /// and stored with `set`.
    pub fn field<D, S>(mut self, key: impl Into<String>, decoder: D, set: S) -> Self
    where
        D: Decoder + 'static,
        S: Fn(&mut T, D::Output) + Send + Sync + 'static,
    {
        self.fields.push(Field {
            key: key.into(),
            apply: Box::new(move |target, value| {
                let decoded = decoder.decode(value)?;
                set(target, decoded);
                Ok(())
            }),
        });
        self
    }

    /// The defaults every decode starts from.
    pub fn defaults(&self) -> &T {
        &self.defaults
    }
}

impl<T> Decoder for Configurable<T>
where
    T: Clone + Send + Sync,
{
    type Output = T;

    /// `null` input counts as an empty object and yields the defaults.
    fn decode(&self, input: &Value) -> Result<T> {
        let mut output = self.defaults.clone();
        if input.is_null() {
            return Ok(output);
        }

        let object = structure::object(input)?;
        let mut errors = Vec::new();

        for field in &self.fields {
            match object.get(&field.key) {
                None | Some(Value::Null) => {}
                Some(value) => {
                    if let Err(e) = (field.apply)(&mut output, value) {
                        errors.push(e.at_key(&field.key));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(output)
        } else {
            Err(DecodeError::concat(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{boolean, string};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Target {
        path: String,
        frontmatter: String,
        strict: bool,
    }

    fn target() -> Configurable<Target> {
        configurable(Target {
            path: "notes/index.md".into(),
            frontmatter: "data".into(),
            strict: false,
        })
        .field("path", string(), |t, v| t.path = v)
        .field("frontmatter", string(), |t, v| t.frontmatter = v)
        .field("strict", boolean(), |t, v| t.strict = v)
    }

    #[test]
    fn test_empty_object_yields_defaults() {
        let decoder = target();
        assert_eq!(&decoder.decode(&json!({})).unwrap(), decoder.defaults());
    }

    #[test]
    fn test_null_yields_defaults() {
        let decoder = target();
        assert_eq!(&decoder.decode(&json!(null)).unwrap(), decoder.defaults());
    }

    #[test]
    fn test_partial_override() {
        let decoded = target().decode(&json!({ "path": "x" })).unwrap();
        assert_eq!(
            decoded,
            Target {
                path: "x".into(),
                frontmatter: "data".into(),
                strict: false,
            }
        );
    }

    #[test]
    fn test_null_field_keeps_default() {
        let decoded = target()
            .decode(&json!({ "path": null, "strict": true }))
            .unwrap();
        assert_eq!(decoded.path, "notes/index.md");
        assert!(decoded.strict);
    }

    #[test]
    fn test_bad_fields_are_all_reported() {
        let err = target()
            .decode(&json!({ "path": 1, "frontmatter": "ok", "strict": "yes" }))
            .unwrap_err();
        assert_eq!(
            err.lines(),
            vec![
                "path: expected string, found 1".to_string(),
                "strict: expected boolean, found \"yes\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(target().decode(&json!("notes/index.md")).is_err());
    }
}
