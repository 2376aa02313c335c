//! Job descriptors, queue routing and the class registry.
//!
//! A job is identified in payloads by its canonical name. The engine keeps a
//! registry of every job handle it has seen so that a payload read back out
//! of a queue can be resolved to the code that performs it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::engine::Engine;
use crate::model::QueueName;

/// A unit of work that can be enqueued and performed.
///
/// Implementors declare their queue either as a stored attribute
/// ([`Job::queue_name`]) or through an accessor ([`Job::queue`]). The
/// attribute wins when both are present.
pub trait Job: Send + Sync + 'static {
    /// Canonical class name written into payloads.
    fn name(&self) -> &str;

    /// Stored queue attribute.
    fn queue_name(&self) -> Option<QueueName> {
        None
    }

    /// Queue accessor, consulted when there is no stored attribute.
    fn queue(&self) -> Option<QueueName> {
        None
    }

    /// Run the job with its decoded arguments.
    ///
    /// The engine is passed in so a job can enqueue follow-up work.
    fn perform(&self, engine: &Engine, args: &[Value]) -> anyhow::Result<()>;
}

impl<J: Job + ?Sized> Job for Arc<J> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn queue_name(&self) -> Option<QueueName> {
        (**self).queue_name()
    }

    fn queue(&self) -> Option<QueueName> {
        (**self).queue()
    }

    fn perform(&self, engine: &Engine, args: &[Value]) -> anyhow::Result<()> {
        (**self).perform(engine, args)
    }
}

/// Resolve the queue a job belongs to.
pub fn queue_for<J: Job + ?Sized>(job: &J) -> Option<QueueName> {
    job.queue_name().or_else(|| job.queue())
}

/// Registry of job handles, indexed by canonical name.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Arc<dyn Job>>>,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job handle. A later handle with the same name replaces
    /// the earlier one.
    pub fn register(&self, job: Arc<dyn Job>) {
        let name = job.name().to_string();
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name, job);
    }

    /// Look up a job by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Job>> {
        self.jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    /// Check if a job name is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }

    /// Get all registered job names.
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}
