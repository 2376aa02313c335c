//! # queue-double
//!
//! In-memory stand-in for a background job broker, for tests.
//!
//! Production code enqueues through an [`Engine`] exactly as it would through
//! a real broker. Tests then inspect what was queued, run the jobs
//! synchronously, and assert on the result. Jobs can be scheduled for later,
//! and lifecycle hooks can be switched on to exercise before/around/after
//! and failure callbacks.

pub mod assertions;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod job;
pub mod model;
pub mod storage;
pub mod telemetry;

pub use config::Config;
pub use engine::Engine;
pub use error::{Error, Result};
pub use hooks::{Flow, HookStage, Next, PerformOutcome};
pub use job::{Job, queue_for};
pub use model::{Payload, QueueName, RunOutcome, RunSummary};
