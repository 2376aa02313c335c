//! The engine. The public API production code enqueues through and tests
//! read, run and reset through.
//!
//! Enqueue flows one way: job → queue name → encoded payload → storage.
//! `run`, `run_for` and `full_run` flow back: storage → decode → job.
//! A job performing under `run` holds the same `&Engine` and may enqueue
//! more work; that work lands in fresh queue state and waits for the next
//! run.

pub mod perform;
pub mod scheduler;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codec;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::hooks::{HookRegistry, HookStage};
use crate::job::{Job, JobRegistry, queue_for};
use crate::model::{Payload, QueueName, RunSummary};
use crate::storage::Storage;

/// In-memory stand-in for a job broker. Owns all queues, the job registry
/// and the hook registry.
pub struct Engine {
    storage: Storage,
    jobs: JobRegistry,
    hooks: HookRegistry,
    hooks_enabled: AtomicBool,
    enqueue_front: AtomicBool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with empty queues, hooks off and FIFO enqueue.
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        Self {
            storage: Storage::new(),
            jobs: JobRegistry::new(),
            hooks: HookRegistry::new(),
            hooks_enabled: AtomicBool::new(config.hooks_enabled),
            enqueue_front: AtomicBool::new(config.enqueue_front),
        }
    }

    /// Process-wide default engine.
    ///
    /// Never reset implicitly; tests sharing it must call [`Engine::reset`]
    /// in their own setup.
    pub fn global() -> &'static Engine {
        static GLOBAL: OnceLock<Engine> = OnceLock::new();
        GLOBAL.get_or_init(Engine::new)
    }

    // -----------------------------------------------------------------------
    // Flags and registries
    // -----------------------------------------------------------------------

    pub fn enable_hooks(&self) {
        self.hooks_enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable_hooks(&self) {
        self.hooks_enabled.store(false, Ordering::SeqCst);
    }

    pub fn hooks_enabled(&self) -> bool {
        self.hooks_enabled.load(Ordering::SeqCst)
    }

    /// When set, new payloads go to the front of their queue.
    pub fn set_enqueue_front(&self, front: bool) {
        self.enqueue_front.store(front, Ordering::SeqCst);
    }

    pub fn enqueue_front(&self) -> bool {
        self.enqueue_front.load(Ordering::SeqCst)
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    /// Make a job resolvable by name without enqueueing it.
    pub fn register<J: Job>(&self, job: &Arc<J>) {
        self.jobs.register(Arc::clone(job) as Arc<dyn Job>);
    }

    // -----------------------------------------------------------------------
    // Reset and size
    // -----------------------------------------------------------------------

    /// Empty every queue.
    pub fn reset(&self) {
        self.storage.reset();
        debug!("all queues reset");
    }

    /// Empty one queue.
    pub fn reset_queue(&self, queue: impl AsRef<str>) {
        self.storage.reset_queue(queue.as_ref());
        debug!(queue = queue.as_ref(), "queue reset");
    }

    pub fn size(&self, queue: impl AsRef<str>) -> usize {
        self.storage.size(queue.as_ref())
    }

    /// Number of payloads across all queues.
    pub fn total_size(&self) -> usize {
        self.storage.total_size()
    }

    pub fn is_empty(&self) -> bool {
        self.total_size() == 0
    }

    pub fn queues(&self) -> Vec<QueueName> {
        self.storage.queue_names()
    }

    /// Snapshot of a queue's encoded payloads.
    pub fn queue(&self, queue: impl Into<QueueName>) -> Vec<String> {
        let queue = queue.into();
        self.storage.with_queue(&queue, |items| items.iter().cloned().collect())
    }

    /// Mutate a queue's encoded payloads in place.
    ///
    /// Anything pushed here bypasses routing, normalization and hooks.
    pub fn with_queue<T>(
        &self,
        queue: impl Into<QueueName>,
        f: impl FnOnce(&mut VecDeque<String>) -> T,
    ) -> T {
        self.storage.with_queue(&queue.into(), f)
    }

    // -----------------------------------------------------------------------
    // Enqueue
    // -----------------------------------------------------------------------

    /// Enqueue a job on the queue its descriptor declares.
    ///
    /// `args` is the argument list: an array-shaped value is the list, `()`
    /// is no arguments, anything else is a single argument. A lone value that
    /// serializes to `null` (such as `None`) also reads as no arguments; pass
    /// `&(None::<T>,)` to enqueue a single null argument.
    ///
    /// Returns the queue's new length, or `None` if a before-enqueue hook
    /// vetoed the job.
    ///
    /// # Errors
    ///
    /// [`Error::NoQueue`] if the job declares no queue. Nothing is stored.
    pub fn enqueue<J, A>(&self, job: &Arc<J>, args: &A) -> Result<Option<usize>>
    where
        J: Job,
        A: Serialize + ?Sized,
    {
        let queue = self.require_queue(&**job)?;
        self.enqueue_to(queue, job, args)
    }

    /// Enqueue a job on an explicit queue, bypassing routing.
    pub fn enqueue_to<J, A>(
        &self,
        queue: impl Into<QueueName>,
        job: &Arc<J>,
        args: &A,
    ) -> Result<Option<usize>>
    where
        J: Job,
        A: Serialize + ?Sized,
    {
        let payload = Payload::new(job.name(), codec::normalize_args(args)?);
        self.enqueue_payload(&queue.into(), job, payload)
    }

    pub(crate) fn enqueue_payload<J: Job>(
        &self,
        queue: &QueueName,
        job: &Arc<J>,
        payload: Payload,
    ) -> Result<Option<usize>> {
        self.register(job);

        let hooks = self
            .hooks_enabled()
            .then(|| self.hooks.for_class(&payload.class));

        if let Some(hooks) = &hooks {
            let mut vetoed_by = None;
            for named in &hooks.before_enqueue {
                let allowed = (named.hook)(&payload.args).map_err(|source| Error::Hook {
                    class: payload.class.clone(),
                    stage: HookStage::BeforeEnqueue,
                    source,
                })?;
                if !allowed && vetoed_by.is_none() {
                    vetoed_by = Some(named.name.clone());
                }
            }
            if let Some(hook) = vetoed_by {
                info!(class = %payload.class, %queue, %hook, "enqueue vetoed");
                return Ok(None);
            }
        }

        let encoded = codec::encode(&payload)?;
        let len = self.storage.push(queue, encoded, self.enqueue_front());
        debug!(class = %payload.class, %queue, len, "job enqueued");

        if let Some(hooks) = &hooks {
            for named in &hooks.after_enqueue {
                (named.hook)(&payload.args).map_err(|source| Error::Hook {
                    class: payload.class.clone(),
                    stage: HookStage::AfterEnqueue,
                    source,
                })?;
            }
        }

        Ok(Some(len))
    }

    /// Remove every payload of this job's class from its queue.
    pub fn dequeue<J: Job + ?Sized>(&self, job: &J) -> Result<usize> {
        let queue = self.require_queue(job)?;
        let class = job.name();
        Ok(self.remove_matching(&queue, |p| p.class == class))
    }

    /// Remove every payload of this job's class with exactly these arguments.
    pub fn dequeue_with<J, A>(&self, job: &J, args: &A) -> Result<usize>
    where
        J: Job + ?Sized,
        A: Serialize + ?Sized,
    {
        let queue = self.require_queue(job)?;
        let class = job.name();
        let args = codec::normalize_args(args)?;
        Ok(self.remove_matching(&queue, |p| p.class == class && p.args == args))
    }

    pub(crate) fn require_queue<J: Job + ?Sized>(&self, job: &J) -> Result<QueueName> {
        queue_for(job).ok_or_else(|| Error::NoQueue {
            class: job.name().to_string(),
        })
    }

    pub(crate) fn remove_matching(&self, queue: &QueueName, matches: impl Fn(&Payload) -> bool) -> usize {
        let removed = self.storage.remove_where(queue.as_str(), |encoded| {
            codec::decode_as::<Payload>(encoded).is_some_and(|p| matches(&p))
        });
        debug!(%queue, removed, "payloads removed");
        removed
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The payload at `start`, or `None` past the end.
    pub fn peek(&self, queue: impl AsRef<str>, start: usize) -> Option<Payload> {
        self.storage
            .range(queue.as_ref(), start, 1)
            .first()
            .and_then(|encoded| codec::decode_as(encoded))
    }

    /// Payloads in `[start, start + count)`, clipped to the queue.
    pub fn peek_range(&self, queue: impl AsRef<str>, start: usize, count: usize) -> Vec<Payload> {
        let queue = queue.as_ref();
        decode_all(queue, self.storage.range(queue, start, count))
    }

    /// Every payload in a queue, in insertion order.
    pub fn all(&self, queue: impl AsRef<str>) -> Vec<Payload> {
        let queue = queue.as_ref();
        decode_all(queue, self.storage.all(queue))
    }

    // -----------------------------------------------------------------------
    // Running
    // -----------------------------------------------------------------------

    /// Detach every payload from every queue and perform them in random
    /// order. Jobs enqueued while this runs are left queued.
    ///
    /// # Errors
    ///
    /// The first job failure stops the run; payloads not yet performed are
    /// dropped with the rest of the batch.
    pub fn run(&self) -> Result<RunSummary> {
        let mut batch = self.storage.drain_all();
        batch.shuffle(&mut rand::rng());
        debug!(jobs = batch.len(), "running all queues");
        self.perform_batch(batch)
    }

    /// Perform up to `limit` payloads from the front of one queue, in order.
    /// The rest stay queued.
    pub fn run_for(&self, queue: impl AsRef<str>, limit: Option<usize>) -> Result<RunSummary> {
        let queue = QueueName::from(queue.as_ref());
        let batch: Vec<(QueueName, String)> = self
            .storage
            .drain_front(queue.as_str(), limit)
            .into_iter()
            .map(|encoded| (queue.clone(), encoded))
            .collect();
        debug!(%queue, jobs = batch.len(), "running queue");
        self.perform_batch(batch)
    }

    /// Keep running until every queue is empty, so jobs that enqueue more
    /// jobs are drained too. Never returns if jobs keep enqueueing forever.
    pub fn full_run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        while !self.is_empty() {
            summary.absorb(self.run()?);
        }
        Ok(summary)
    }

    fn perform_batch(&self, batch: Vec<(QueueName, String)>) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for (queue, encoded) in batch {
            summary.record(self.perform_encoded(&queue, &encoded)?);
        }
        Ok(summary)
    }
}

fn decode_all(queue: &str, encoded: Vec<String>) -> Vec<Payload> {
    encoded
        .iter()
        .filter_map(|e| {
            let payload = codec::decode_as::<Payload>(e);
            if payload.is_none() {
                warn!(queue, payload = %e, "skipping undecodable payload");
            }
            payload
        })
        .collect()
}
