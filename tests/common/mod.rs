//! Sample jobs shared by the integration tests.
//!
//! Each job counts its own performs, so a test that builds fresh handles
//! never sees another test's runs.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use queue_double::{Engine, Job, QueueName};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
#[error("job exploded: {0}")]
pub struct Explosion(pub String);

// ---------------------------------------------------------------------------
// Routed jobs
// ---------------------------------------------------------------------------

/// Declares its queue as an attribute.
#[derive(Default)]
pub struct LowPriorityJob {
    runs: AtomicUsize,
}

impl LowPriorityJob {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl Job for LowPriorityJob {
    fn name(&self) -> &str {
        "LowPriorityJob"
    }

    fn queue_name(&self) -> Option<QueueName> {
        Some("low".into())
    }

    fn perform(&self, _: &Engine, _: &[Value]) -> anyhow::Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Declares its queue through the accessor.
#[derive(Default)]
pub struct MediumPriorityJob {
    runs: AtomicUsize,
}

impl MediumPriorityJob {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl Job for MediumPriorityJob {
    fn name(&self) -> &str {
        "MediumPriorityJob"
    }

    fn queue(&self) -> Option<QueueName> {
        Some("medium".into())
    }

    fn perform(&self, _: &Engine, _: &[Value]) -> anyhow::Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Records the arguments of every perform.
#[derive(Default)]
pub struct JobWithArguments {
    seen: Mutex<Vec<Vec<Value>>>,
}

impl JobWithArguments {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<Vec<Value>> {
        self.seen.lock().unwrap().clone()
    }
}

impl Job for JobWithArguments {
    fn name(&self) -> &str {
        "JobWithArguments"
    }

    fn queue_name(&self) -> Option<QueueName> {
        Some("medium".into())
    }

    fn perform(&self, _: &Engine, args: &[Value]) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(args.to_vec());
        Ok(())
    }
}

pub struct NoQueueJob;

impl Job for NoQueueJob {
    fn name(&self) -> &str {
        "NoQueueJob"
    }

    fn perform(&self, _: &Engine, _: &[Value]) -> anyhow::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Jobs with side effects
// ---------------------------------------------------------------------------

/// Enqueues one `LowPriorityJob` each time it runs.
pub struct FanOutJob {
    pub child: Arc<LowPriorityJob>,
}

impl FanOutJob {
    pub fn new(child: &Arc<LowPriorityJob>) -> Arc<Self> {
        Arc::new(Self {
            child: Arc::clone(child),
        })
    }
}

impl Job for FanOutJob {
    fn name(&self) -> &str {
        "FanOutJob"
    }

    fn queue_name(&self) -> Option<QueueName> {
        Some("high".into())
    }

    fn perform(&self, engine: &Engine, _: &[Value]) -> anyhow::Result<()> {
        engine.enqueue(&self.child, &())?;
        Ok(())
    }
}

/// Always fails with an [`Explosion`].
#[derive(Default)]
pub struct FailingJob {
    attempts: AtomicUsize,
}

impl FailingJob {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Job for FailingJob {
    fn name(&self) -> &str {
        "FailingJob"
    }

    fn queue_name(&self) -> Option<QueueName> {
        Some("failing".into())
    }

    fn perform(&self, _: &Engine, _: &[Value]) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(Explosion("kaboom".to_string()).into())
    }
}

/// Enqueued as `[id, options]` like a status-tracking job.
pub struct StatusJob;

impl Job for StatusJob {
    fn name(&self) -> &str {
        "StatusJob"
    }

    fn queue_name(&self) -> Option<QueueName> {
        Some("status".into())
    }

    fn perform(&self, _: &Engine, _: &[Value]) -> anyhow::Result<()> {
        Ok(())
    }
}
