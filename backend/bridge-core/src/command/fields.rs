//! Lenient field accessors.
//!
//! A field of the wrong JSON type reads as absent, so a sloppy sender
//! degrades to sentinel defaults instead of failing the whole command.

use serde_json::{Map, Value};

pub(crate) type Object = Map<String, Value>;

/// Strings only; anything else is `None`.
pub(crate) fn string(object: &Object, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Booleans only; anything else is `false`.
pub(crate) fn boolean(object: &Object, key: &str) -> bool {
    object.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Whole numbers that fit an `i32`, whether written as `3` or `3.0`.
pub(crate) fn integer(object: &Object, key: &str, default: i32) -> i32 {
    let Some(number) = object.get(key).and_then(Value::as_f64) else {
        return default;
    };
    if number.fract() != 0.0 || number < i32::MIN as f64 || number > i32::MAX as f64 {
        return default;
    }
    number as i32
}

/// Any JSON number.
pub(crate) fn double(object: &Object, key: &str, default: f64) -> f64 {
    object.get(key).and_then(Value::as_f64).unwrap_or(default)
}

/// Nested object; a missing or non-object value reads as empty.
pub(crate) fn object<'a>(object: &'a Object, key: &str) -> Option<&'a Object> {
    object.get(key).and_then(Value::as_object)
}
