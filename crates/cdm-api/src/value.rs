// Safe accessors over dynamic JSON.
//
// Responses are only partially typed: most operations read a handful of
// fields out of a larger document. These helpers turn a missing field or a
// wrong JSON type into `Error::MissingField` instead of a panic.

use serde_json::{Map, Value};

use crate::error::Error;

/// Checked field access on JSON objects.
pub trait ValueExt {
    /// The raw field, if this is an object that has it.
    fn field(&self, key: &str) -> Option<&Value>;

    fn require(&self, key: &str, expected: &'static str) -> Result<&Value, Error> {
        self.field(key).ok_or_else(|| missing(key, expected))
    }

    fn str_field(&self, key: &str) -> Result<&str, Error> {
        self.field(key)
            .and_then(Value::as_str)
            .ok_or_else(|| missing(key, "a string"))
    }

    fn bool_field(&self, key: &str) -> Result<bool, Error> {
        self.field(key)
            .and_then(Value::as_bool)
            .ok_or_else(|| missing(key, "a boolean"))
    }

    fn f64_field(&self, key: &str) -> Result<f64, Error> {
        self.field(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| missing(key, "a number"))
    }

    fn array_field(&self, key: &str) -> Result<&Vec<Value>, Error> {
        self.field(key)
            .and_then(Value::as_array)
            .ok_or_else(|| missing(key, "an array"))
    }

    fn object_field(&self, key: &str) -> Result<&Map<String, Value>, Error> {
        self.field(key)
            .and_then(Value::as_object)
            .ok_or_else(|| missing(key, "an object"))
    }

    /// The `data` array of a paged listing (`{data: [...], total, hasMore}`).
    fn data(&self) -> Result<&Vec<Value>, Error> {
        self.array_field("data")
    }
}

impl ValueExt for Value {
    fn field(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|m| m.get(key))
    }
}

impl ValueExt for Map<String, Value> {
    fn field(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

fn missing(key: &str, expected: &'static str) -> Error {
    Error::MissingField {
        field: key.to_owned(),
        expected,
    }
}

/// Strings of a JSON array; non-string entries are rendered as JSON text.
pub fn string_list(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}
