//! Test assertions over queued jobs.
//!
//! Assertions panic with a message naming the job, the arguments, the queue
//! and (for positive assertions) what the queue actually holds. The block
//! forms only look at payloads appended while the block ran.

pub mod matching;
pub mod scheduler;

use serde::Serialize;
use serde_json::Value;

use crate::codec;
use crate::engine::Engine;
use crate::job::{Job, queue_for};
use crate::model::{Payload, QueueName, inspect};

fn with_args(args: Option<&[Value]>) -> String {
    match args {
        Some(args) => format!(" with {}", Value::Array(args.to_vec())),
        None => String::new(),
    }
}

#[track_caller]
fn expected_args<A: Serialize + ?Sized>(args: &A) -> Vec<Value> {
    codec::normalize_args(args)
        .unwrap_or_else(|e| panic!("expected arguments could not be encoded: {e}"))
}

#[track_caller]
fn expected_value<A: Serialize + ?Sized>(value: &A) -> Value {
    codec::normalize(value).unwrap_or_else(|e| panic!("expected value could not be encoded: {e}"))
}

#[track_caller]
fn check_queued(queue: &QueueName, space: &[Payload], class: &str, args: Option<&[Value]>) {
    assert!(
        !matching::matching_jobs(space, class, args).is_empty(),
        "{class}{} should have been queued in {queue}: {}.",
        with_args(args),
        inspect(space)
    );
}

#[track_caller]
fn check_not_queued(queue: &QueueName, space: &[Payload], class: &str, args: Option<&[Value]>) {
    assert!(
        matching::matching_jobs(space, class, args).is_empty(),
        "{class}{} should not have been queued in {queue}.",
        with_args(args)
    );
}

impl Engine {
    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Payloads in the job's queue of its class, and with exactly `args`
    /// (already normalized) when given. Empty if the job has no queue.
    pub fn matching_jobs<J: Job + ?Sized>(&self, job: &J, args: Option<&[Value]>) -> Vec<Payload> {
        let Some(queue) = queue_for(job) else {
            return Vec::new();
        };
        let all = self.all(&queue);
        matching::matching_jobs(&all, job.name(), args)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Payloads in the job's queue whose arguments contain `partial`.
    pub fn partial_matching_jobs<J, A>(&self, job: &J, partial: &A) -> crate::Result<Vec<Payload>>
    where
        J: Job + ?Sized,
        A: Serialize + ?Sized,
    {
        let Some(queue) = queue_for(job) else {
            return Ok(Vec::new());
        };
        let partial = codec::normalize(partial)?;
        let all = self.all(&queue);
        Ok(matching::partial_matching_jobs(&all, job.name(), &partial)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn is_queued<J: Job + ?Sized>(&self, job: &J) -> bool {
        !self.matching_jobs(job, None).is_empty()
    }

    pub fn is_queued_with<J, A>(&self, job: &J, args: &A) -> crate::Result<bool>
    where
        J: Job + ?Sized,
        A: Serialize + ?Sized,
    {
        let args = codec::normalize_args(args)?;
        Ok(!self.matching_jobs(job, Some(&args)).is_empty())
    }

    // -----------------------------------------------------------------------
    // Search spaces
    // -----------------------------------------------------------------------

    #[track_caller]
    pub(crate) fn queue_or_fail<J: Job + ?Sized>(&self, job: &J) -> QueueName {
        queue_for(job).unwrap_or_else(|| panic!("{} does not declare a queue.", job.name()))
    }

    /// Payloads appended to `queue` while `block` ran.
    pub(crate) fn appended_during<F: FnOnce()>(&self, queue: &QueueName, block: F) -> Vec<Payload> {
        let snapshot = self.size(queue);
        block();
        self.all(queue).into_iter().skip(snapshot).collect()
    }

    // -----------------------------------------------------------------------
    // Positive
    // -----------------------------------------------------------------------

    /// Assert the job's class has been queued at least once, with any
    /// arguments.
    #[track_caller]
    pub fn assert_queued<J: Job + ?Sized>(&self, job: &J) {
        let queue = self.queue_or_fail(job);
        check_queued(&queue, &self.all(&queue), job.name(), None);
    }

    /// Assert the job's class has been queued with exactly `args`. Pass `&()`
    /// to require no arguments.
    #[track_caller]
    pub fn assert_queued_with<J, A>(&self, job: &J, args: &A)
    where
        J: Job + ?Sized,
        A: Serialize + ?Sized,
    {
        let queue = self.queue_or_fail(job);
        let args = expected_args(args);
        check_queued(&queue, &self.all(&queue), job.name(), Some(&args));
    }

    /// Assert `block` queues the job. Anything queued before the block
    /// doesn't count.
    #[track_caller]
    pub fn assert_queues<J: Job + ?Sized, F: FnOnce()>(&self, job: &J, block: F) {
        let queue = self.queue_or_fail(job);
        let space = self.appended_during(&queue, block);
        check_queued(&queue, &space, job.name(), None);
    }

    #[track_caller]
    pub fn assert_queues_with<J, A, F>(&self, job: &J, args: &A, block: F)
    where
        J: Job + ?Sized,
        A: Serialize + ?Sized,
        F: FnOnce(),
    {
        let queue = self.queue_or_fail(job);
        let args = expected_args(args);
        let space = self.appended_during(&queue, block);
        check_queued(&queue, &space, job.name(), Some(&args));
    }

    // -----------------------------------------------------------------------
    // Negative
    // -----------------------------------------------------------------------

    #[track_caller]
    pub fn assert_not_queued<J: Job + ?Sized>(&self, job: &J) {
        let queue = self.queue_or_fail(job);
        check_not_queued(&queue, &self.all(&queue), job.name(), None);
    }

    #[track_caller]
    pub fn assert_not_queued_with<J, A>(&self, job: &J, args: &A)
    where
        J: Job + ?Sized,
        A: Serialize + ?Sized,
    {
        let queue = self.queue_or_fail(job);
        let args = expected_args(args);
        check_not_queued(&queue, &self.all(&queue), job.name(), Some(&args));
    }

    /// Assert `block` does not queue the job.
    #[track_caller]
    pub fn assert_not_queues<J: Job + ?Sized, F: FnOnce()>(&self, job: &J, block: F) {
        let queue = self.queue_or_fail(job);
        let space = self.appended_during(&queue, block);
        check_not_queued(&queue, &space, job.name(), None);
    }

    #[track_caller]
    pub fn assert_not_queues_with<J, A, F>(&self, job: &J, args: &A, block: F)
    where
        J: Job + ?Sized,
        A: Serialize + ?Sized,
        F: FnOnce(),
    {
        let queue = self.queue_or_fail(job);
        let args = expected_args(args);
        let space = self.appended_during(&queue, block);
        check_not_queued(&queue, &space, job.name(), Some(&args));
    }

    /// Assert `block` adds no jobs to any queue.
    #[track_caller]
    pub fn assert_nothing_queued<F: FnOnce()>(&self, block: F) {
        let before = self.total_size();
        block();
        let after = self.total_size();
        assert!(
            after <= before,
            "No jobs should have been queued, but {} were.",
            after - before
        );
    }

    // -----------------------------------------------------------------------
    // Partial and created
    // -----------------------------------------------------------------------

    /// Assert the job's class has been queued with arguments containing
    /// `partial`.
    #[track_caller]
    pub fn assert_queued_partial<J, A>(&self, job: &J, partial: &A)
    where
        J: Job + ?Sized,
        A: Serialize + ?Sized,
    {
        let queue = self.queue_or_fail(job);
        let partial = expected_value(partial);
        let all = self.all(&queue);
        assert!(
            !matching::partial_matching_jobs(&all, job.name(), &partial).is_empty(),
            "{} with partial arguments {partial} should have been queued in {queue}: {}.",
            job.name(),
            inspect(&all)
        );
    }

    #[track_caller]
    pub fn assert_not_queued_partial<J, A>(&self, job: &J, partial: &A)
    where
        J: Job + ?Sized,
        A: Serialize + ?Sized,
    {
        let queue = self.queue_or_fail(job);
        let partial = expected_value(partial);
        let all = self.all(&queue);
        assert!(
            matching::partial_matching_jobs(&all, job.name(), &partial).is_empty(),
            "{} with partial arguments {partial} should not have been queued in {queue}.",
            job.name()
        );
    }

    /// Assert a status-tracking job was created with `options`, i.e. queued
    /// with `options` as its second argument.
    #[track_caller]
    pub fn assert_job_created<J, A>(&self, job: &J, options: &A)
    where
        J: Job + ?Sized,
        A: Serialize + ?Sized,
    {
        let queue = self.queue_or_fail(job);
        let options = expected_value(options);
        let all = self.all(&queue);
        assert!(
            !matching::created_jobs(&all, job.name(), &options).is_empty(),
            "{} with options {options} should have been created in {queue}: {}.",
            job.name(),
            inspect(&all)
        );
    }
}
