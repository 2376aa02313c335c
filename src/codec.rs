//! Payload encoding.
//!
//! Everything that enters a queue goes through [`encode`] and comes back out
//! through [`decode`], the same JSON round trip a real broker transport
//! applies. Enum variants and map keys come back as strings, structs come
//! back as plain objects.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

/// Serialize a value to its canonical string form.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Parse an encoded string back into a value.
///
/// Missing, empty, `null` and malformed input all decode to `None`.
pub fn decode(input: Option<&str>) -> Option<Value> {
    let input = input?;
    if input.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(input) {
        Ok(Value::Null) | Err(_) => None,
        Ok(value) => Some(value),
    }
}

/// Parse an encoded string into a typed value, `None` if it doesn't fit.
pub fn decode_as<T: DeserializeOwned>(input: &str) -> Option<T> {
    serde_json::from_str(input).ok()
}

/// `decode(encode(value))`: the form a value has after crossing the queue.
pub fn normalize<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    let encoded = encode(value)?;
    Ok(decode(Some(&encoded)).unwrap_or(Value::Null))
}

/// Normalize a job argument list.
///
/// An array-shaped value is the list itself, unit/`null` is the empty list,
/// anything else is a single argument. Serde gives `()` and `None` the same
/// `null` form, so a single null argument has to be wrapped as `(None,)`.
pub fn normalize_args<T: Serialize + ?Sized>(args: &T) -> Result<Vec<Value>> {
    Ok(match normalize(args)? {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    })
}
