//! Extension traits for serde_json::Value used when reshaping RPC results.

use serde_json::Value;

/// Extension trait for convenient JSON value extraction.
pub trait ValueExt {
    /// Get a string field or return default.
    fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str;

    /// Get a u64 field or return default.
    fn u64_or(&self, key: &str, default: u64) -> u64;

    /// Take the named field out of an object, or hand back the whole value
    /// when the field is missing.
    fn field_or_self(self, key: &str) -> Value;

    /// True for `{}`.
    fn is_empty_object(&self) -> bool;

    /// True when the key is absent or explicitly `null`.
    fn is_null_or_missing(&self, key: &str) -> bool;
}

impl ValueExt for Value {
    fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).and_then(|v| v.as_str()).unwrap_or(default)
    }

    fn u64_or(&self, key: &str, default: u64) -> u64 {
        self.get(key).and_then(|v| v.as_u64()).unwrap_or(default)
    }

    fn field_or_self(self, key: &str) -> Value {
        match self {
            Value::Object(mut map) => match map.remove(key) {
                Some(field) => field,
                None => Value::Object(map),
            },
            other => other,
        }
    }

    fn is_empty_object(&self) -> bool {
        self.as_object().is_some_and(|map| map.is_empty())
    }

    fn is_null_or_missing(&self, key: &str) -> bool {
        self.get(key).is_none_or(Value::is_null)
    }
}
