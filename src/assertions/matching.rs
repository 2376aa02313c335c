//! Payload matching used by the assertions.
//!
//! Expected arguments are normalized by the caller before they get here, so
//! every comparison is between values that have both crossed the codec.

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

use crate::model::Payload;

/// Payloads of `class`, and with exactly `args` when given.
pub fn matching_jobs<'a>(
    payloads: &'a [Payload],
    class: &str,
    args: Option<&[Value]>,
) -> Vec<&'a Payload> {
    payloads
        .iter()
        .filter(|p| p.class == class && args.is_none_or(|args| p.args == args))
        .collect()
}

/// Payloads of `class` whose arguments contain `partial`.
pub fn partial_matching_jobs<'a>(
    payloads: &'a [Payload],
    class: &str,
    partial: &Value,
) -> Vec<&'a Payload> {
    payloads
        .iter()
        .filter(|p| p.class == class && args_contain(&p.args, partial))
        .collect()
}

/// Payloads of `class` whose second argument is `options`, the shape
/// status-tracking jobs enqueue as `[id, options]`.
pub fn created_jobs<'a>(payloads: &'a [Payload], class: &str, options: &Value) -> Vec<&'a Payload> {
    payloads
        .iter()
        .filter(|p| p.class == class && p.args.get(1) == Some(options))
        .collect()
}

/// Matching payloads that carry a timestamp no later than `at`.
pub fn scheduled_before<'a>(
    payloads: &'a [Payload],
    class: &str,
    args: Option<&[Value]>,
    at: &DateTime<FixedOffset>,
) -> Vec<&'a Payload> {
    matching_jobs(payloads, class, args)
        .into_iter()
        .filter(|p| p.timestamp.is_some_and(|t| t <= *at))
        .collect()
}

/// Whether `partial` is a subset of a payload's arguments.
///
/// A map is matched pair by pair against one map-valued argument. A
/// sequence is matched element by element against the top-level arguments
/// or one array-valued argument. A scalar must be one of the top-level
/// arguments or an element of one array-valued argument. Only one level of
/// nesting is searched.
pub fn args_contain(args: &[Value], partial: &Value) -> bool {
    match partial {
        Value::Object(expected) => args
            .iter()
            .any(|arg| matches!(arg, Value::Object(actual) if map_contains(actual, expected))),
        Value::Array(expected) => {
            seq_contains(args, expected)
                || args
                    .iter()
                    .any(|arg| matches!(arg, Value::Array(actual) if seq_contains(actual, expected)))
        }
        scalar => {
            args.contains(scalar)
                || args
                    .iter()
                    .any(|arg| matches!(arg, Value::Array(actual) if actual.contains(scalar)))
        }
    }
}

fn map_contains(actual: &Map<String, Value>, expected: &Map<String, Value>) -> bool {
    expected.iter().all(|(k, v)| actual.get(k) == Some(v))
}

fn seq_contains(actual: &[Value], expected: &[Value]) -> bool {
    expected.iter().all(|v| actual.contains(v))
}
