//! Core data model.
//!
//! A payload is the record of one enqueue: which job class, with which
//! (normalized) arguments, and for scheduled jobs, when.

use std::borrow::Borrow;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Queue Name
// ---------------------------------------------------------------------------

/// Name of a queue.
///
/// Symbol-like identifiers from callers all collapse to their string form,
/// so `QueueName::from("low")` and a job declaring `"low"` are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueName(String);

impl QueueName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QueueName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for QueueName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&QueueName> for QueueName {
    fn from(name: &QueueName) -> Self {
        name.clone()
    }
}

impl Borrow<str> for QueueName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for QueueName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// One enqueue event, as read back out of a queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Canonical name of the job class.
    pub class: String,

    /// Arguments after the encode/decode round trip.
    #[serde(default)]
    pub args: Vec<Value>,

    /// Only present on scheduled payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<FixedOffset>>,
}

impl Payload {
    pub fn new(class: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            class: class.into(),
            args,
            timestamp: None,
        }
    }

    pub fn scheduled(class: impl Into<String>, args: Vec<Value>, at: DateTime<FixedOffset>) -> Self {
        Self {
            class: class.into(),
            args,
            timestamp: Some(at),
        }
    }
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let args = Value::Array(self.args.clone());
        match self.timestamp {
            Some(at) => write!(
                f,
                "{{\"class\"=>{:?}, \"args\"=>{args}, \"timestamp\"=>{:?}}}",
                self.class,
                at.to_rfc3339()
            ),
            None => write!(f, "{{\"class\"=>{:?}, \"args\"=>{args}}}", self.class),
        }
    }
}

/// Render a list of payloads for failure messages.
pub(crate) fn inspect(payloads: &[Payload]) -> String {
    let items: Vec<String> = payloads.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}

// ---------------------------------------------------------------------------
// Run results
// ---------------------------------------------------------------------------

/// What happened to one executed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// `perform` ran to completion.
    Performed,
    /// A hook declined to perform the job, or no around hook reached it.
    NotPerformed,
}

/// Tally of a `run`, `run_for` or `full_run` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub performed: usize,
    pub not_performed: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: RunOutcome) {
        match outcome {
            RunOutcome::Performed => self.performed += 1,
            RunOutcome::NotPerformed => self.not_performed += 1,
        }
    }

    pub fn absorb(&mut self, other: RunSummary) {
        self.performed += other.performed;
        self.not_performed += other.not_performed;
    }

    /// Number of payloads executed, performed or not.
    pub fn total(&self) -> usize {
        self.performed + self.not_performed
    }
}
