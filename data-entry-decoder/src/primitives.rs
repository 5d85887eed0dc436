//! Decoders for JSON primitives and containers

use serde_json::{Map as JsonMap, Value};

use crate::decoder::Decoder;
use crate::error::{DecodeError, Result};

/// Decodes a JSON string.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringDecoder;

pub fn string() -> StringDecoder {
    StringDecoder
}

impl Decoder for StringDecoder {
    type Output = String;

    fn decode(&self, input: &Value) -> Result<String> {
        input
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| DecodeError::leaf("string", input))
    }
}

/// Decodes a JSON boolean.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanDecoder;

pub fn boolean() -> BooleanDecoder {
    BooleanDecoder
}

impl Decoder for BooleanDecoder {
    type Output = bool;

    fn decode(&self, input: &Value) -> Result<bool> {
        input
            .as_bool()
            .ok_or_else(|| DecodeError::leaf("boolean", input))
    }
}

/// Decodes any JSON number as `f64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberDecoder;

pub fn number() -> NumberDecoder {
    NumberDecoder
}

impl Decoder for NumberDecoder {
    type Output = f64;

    fn decode(&self, input: &Value) -> Result<f64> {
        input
            .as_f64()
            .ok_or_else(|| DecodeError::leaf("number", input))
    }
}

/// Accepts any value unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownDecoder;

pub fn unknown() -> UnknownDecoder {
    UnknownDecoder
}

impl Decoder for UnknownDecoder {
    type Output = Value;

    fn decode(&self, input: &Value) -> Result<Value> {
        Ok(input.clone())
    }
}

/// Accepts any JSON object, keeping its entries untyped.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownRecordDecoder;

pub fn unknown_record() -> UnknownRecordDecoder {
    UnknownRecordDecoder
}

impl Decoder for UnknownRecordDecoder {
    type Output = JsonMap<String, Value>;

    fn decode(&self, input: &Value) -> Result<Self::Output> {
        input
            .as_object()
            .cloned()
            .ok_or_else(|| DecodeError::leaf("object", input))
    }
}

/// Accepts any JSON array, keeping its elements untyped.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownArrayDecoder;

pub fn unknown_array() -> UnknownArrayDecoder {
    UnknownArrayDecoder
}

impl Decoder for UnknownArrayDecoder {
    type Output = Vec<Value>;

    fn decode(&self, input: &Value) -> Result<Vec<Value>> {
        input
            .as_array()
            .cloned()
            .ok_or_else(|| DecodeError::leaf("array", input))
    }
}

/// Decodes `null` as `None`, anything else with the inner decoder.
pub struct Nullable<D>(D);

pub fn nullable<D: Decoder>(decoder: D) -> Nullable<D> {
    Nullable(decoder)
}

impl<D: Decoder> Decoder for Nullable<D> {
    type Output = Option<D::Output>;

    fn decode(&self, input: &Value) -> Result<Self::Output> {
        match input {
            Value::Null => Ok(None),
            other => self.0.decode(other).map(Some),
        }
    }
}

/// Decodes every element of an array, reporting all failing indexes.
pub struct Array<D>(D);

pub fn array<D: Decoder>(decoder: D) -> Array<D> {
    Array(decoder)
}

impl<D: Decoder> Decoder for Array<D> {
    type Output = Vec<D::Output>;

    fn decode(&self, input: &Value) -> Result<Self::Output> {
        let elements = input
            .as_array()
            .ok_or_else(|| DecodeError::leaf("array", input))?;

        let mut decoded = Vec::with_capacity(elements.len());
        let mut errors = Vec::new();
        for (index, element) in elements.iter().enumerate() {
            match self.0.decode(element) {
                Ok(value) => decoded.push(value),
                Err(e) => errors.push(e.at_index(index)),
            }
        }

        if errors.is_empty() {
            Ok(decoded)
        } else {
            Err(DecodeError::concat(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string() {
        assert_eq!(string().decode(&json!("a")).unwrap(), "a");
        assert!(string().decode(&json!(null)).is_err());
    }

    #[test]
    fn test_boolean_and_number() {
        assert!(boolean().decode(&json!(true)).unwrap());
        assert!(boolean().decode(&json!("true")).is_err());
        assert_eq!(number().decode(&json!(1.5)).unwrap(), 1.5);
        assert!(number().decode(&json!("1")).is_err());
    }

    #[test]
    fn test_unknown_record_rejects_arrays() {
        assert!(unknown_record().decode(&json!({"a": 1})).is_ok());
        let err = unknown_record().decode(&json!([1])).unwrap_err();
        assert_eq!(err.to_string(), "<root>: expected object, found [1]");
    }

    #[test]
    fn test_nullable() {
        assert_eq!(nullable(string()).decode(&json!(null)).unwrap(), None);
        assert_eq!(
            nullable(string()).decode(&json!("x")).unwrap(),
            Some("x".to_string())
        );
        assert!(nullable(string()).decode(&json!(1)).is_err());
    }

    #[test]
    fn test_array_reports_every_bad_index() {
        let err = array(unknown_record())
            .decode(&json!([{"a": 1}, 2, {"b": 2}, "x"]))
            .unwrap_err();
        assert_eq!(
            err.lines(),
            vec![
                "[1]: expected object, found 2".to_string(),
                "[3]: expected object, found \"x\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_array_of_unknown() {
        assert_eq!(
            unknown_array().decode(&json!([1, "a"])).unwrap(),
            vec![json!(1), json!("a")]
        );
    }
}
