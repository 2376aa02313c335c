//! Delayed jobs.
//!
//! A scheduled job is an ordinary payload with a `timestamp` field, stored
//! in its job's queue like any other. Nothing here watches the clock; the
//! timestamp only matters to removal and to the scheduler assertions.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde::Serialize;

use super::Engine;
use crate::codec;
use crate::error::{Error, Result};
use crate::job::Job;
use crate::model::{Payload, QueueName};

impl Engine {
    /// Schedule a job for `at` on the job's own queue.
    pub fn enqueue_at<Tz, J, A>(&self, at: DateTime<Tz>, job: &Arc<J>, args: &A) -> Result<Option<usize>>
    where
        Tz: TimeZone,
        J: Job,
        A: Serialize + ?Sized,
    {
        let queue = self.require_queue(&**job)?;
        self.enqueue_at_with_queue(queue, at, job, args)
    }

    /// Schedule a job for `at` on an explicit queue.
    pub fn enqueue_at_with_queue<Tz, J, A>(
        &self,
        queue: impl Into<QueueName>,
        at: DateTime<Tz>,
        job: &Arc<J>,
        args: &A,
    ) -> Result<Option<usize>>
    where
        Tz: TimeZone,
        J: Job,
        A: Serialize + ?Sized,
    {
        let payload = Payload::scheduled(job.name(), codec::normalize_args(args)?, at.fixed_offset());
        self.enqueue_payload(&queue.into(), job, payload)
    }

    /// Schedule a job `seconds` from now on the job's own queue.
    pub fn enqueue_in<J, A>(&self, seconds: i64, job: &Arc<J>, args: &A) -> Result<Option<usize>>
    where
        J: Job,
        A: Serialize + ?Sized,
    {
        self.enqueue_at(from_now(seconds)?, job, args)
    }

    /// Schedule a job `seconds` from now on an explicit queue.
    pub fn enqueue_in_with_queue<J, A>(
        &self,
        queue: impl Into<QueueName>,
        seconds: i64,
        job: &Arc<J>,
        args: &A,
    ) -> Result<Option<usize>>
    where
        J: Job,
        A: Serialize + ?Sized,
    {
        self.enqueue_at_with_queue(queue, from_now(seconds)?, job, args)
    }

    /// True if the job's queue holds a payload of this class with exactly
    /// these arguments.
    pub fn is_delayed<J, A>(&self, job: &J, args: &A) -> Result<bool>
    where
        J: Job + ?Sized,
        A: Serialize + ?Sized,
    {
        let queue = self.require_queue(job)?;
        let args = codec::normalize_args(args)?;
        Ok(self
            .all(&queue)
            .iter()
            .any(|p| p.class == job.name() && p.args == args))
    }

    /// Remove every payload of this class with exactly these arguments from
    /// the job's queue, scheduled or not. Returns the number removed.
    pub fn remove_delayed<J, A>(&self, job: &J, args: &A) -> Result<usize>
    where
        J: Job + ?Sized,
        A: Serialize + ?Sized,
    {
        self.dequeue_with(job, args)
    }

    /// Like [`Engine::remove_delayed`], but only payloads scheduled for the
    /// same second as `at`. Instants are compared, so the same moment in a
    /// different zone matches.
    pub fn remove_delayed_job_from_timestamp<Tz, J, A>(
        &self,
        at: DateTime<Tz>,
        job: &J,
        args: &A,
    ) -> Result<usize>
    where
        Tz: TimeZone,
        J: Job + ?Sized,
        A: Serialize + ?Sized,
    {
        let queue = self.require_queue(job)?;
        let class = job.name();
        let args = codec::normalize_args(args)?;
        let second = at.timestamp();
        Ok(self.remove_matching(&queue, |p| {
            p.class == class
                && p.args == args
                && p.timestamp.is_some_and(|t| t.timestamp() == second)
        }))
    }
}

/// `now + seconds`, or [`Error::TimestampOutOfRange`] if that instant can't
/// be represented.
pub(crate) fn from_now(seconds: i64) -> Result<DateTime<Utc>> {
    TimeDelta::try_seconds(seconds)
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .ok_or(Error::TimestampOutOfRange { seconds })
}
