//! Assertions over scheduled jobs.
//!
//! A job scheduled for `t` satisfies "queued at `at`" when `t <= at`, so
//! `assert_queued_in(600, ..)` passes for a job scheduled 600 seconds out
//! and fails at 300.

use chrono::{DateTime, FixedOffset, TimeZone};
use serde::Serialize;
use serde_json::Value;

use super::{expected_args, matching, with_args};
use crate::engine::Engine;
use crate::engine::scheduler::from_now;
use crate::job::Job;
use crate::model::inspect;

#[track_caller]
fn deadline_in(seconds: i64) -> DateTime<FixedOffset> {
    from_now(seconds)
        .unwrap_or_else(|e| panic!("cannot compute deadline: {e}"))
        .fixed_offset()
}

impl Engine {
    #[track_caller]
    fn check_scheduled<J: Job + ?Sized>(
        &self,
        job: &J,
        args: Option<&[Value]>,
        at: DateTime<FixedOffset>,
        expected: bool,
    ) {
        let queue = self.queue_or_fail(job);
        let all = self.all(&queue);
        let found = !matching::scheduled_before(&all, job.name(), args, &at).is_empty();
        if expected {
            assert!(
                found,
                "{}{} should have been queued in {queue} before {at}: {}.",
                job.name(),
                with_args(args),
                inspect(&all)
            );
        } else {
            assert!(
                !found,
                "{}{} should not have been queued in {queue} before {at}.",
                job.name(),
                with_args(args)
            );
        }
    }

    /// Assert the job is scheduled to run no later than `at`.
    #[track_caller]
    pub fn assert_queued_at<Tz: TimeZone, J: Job + ?Sized>(&self, at: DateTime<Tz>, job: &J) {
        self.check_scheduled(job, None, at.fixed_offset(), true);
    }

    #[track_caller]
    pub fn assert_queued_at_with<Tz, J, A>(&self, at: DateTime<Tz>, job: &J, args: &A)
    where
        Tz: TimeZone,
        J: Job + ?Sized,
        A: Serialize + ?Sized,
    {
        let args = expected_args(args);
        self.check_scheduled(job, Some(&args), at.fixed_offset(), true);
    }

    /// Assert the job is scheduled to run within `seconds` from now.
    #[track_caller]
    pub fn assert_queued_in<J: Job + ?Sized>(&self, seconds: i64, job: &J) {
        self.check_scheduled(job, None, deadline_in(seconds), true);
    }

    #[track_caller]
    pub fn assert_queued_in_with<J, A>(&self, seconds: i64, job: &J, args: &A)
    where
        J: Job + ?Sized,
        A: Serialize + ?Sized,
    {
        let args = expected_args(args);
        self.check_scheduled(job, Some(&args), deadline_in(seconds), true);
    }

    #[track_caller]
    pub fn assert_not_queued_at<Tz: TimeZone, J: Job + ?Sized>(&self, at: DateTime<Tz>, job: &J) {
        self.check_scheduled(job, None, at.fixed_offset(), false);
    }

    #[track_caller]
    pub fn assert_not_queued_at_with<Tz, J, A>(&self, at: DateTime<Tz>, job: &J, args: &A)
    where
        Tz: TimeZone,
        J: Job + ?Sized,
        A: Serialize + ?Sized,
    {
        let args = expected_args(args);
        self.check_scheduled(job, Some(&args), at.fixed_offset(), false);
    }

    #[track_caller]
    pub fn assert_not_queued_in<J: Job + ?Sized>(&self, seconds: i64, job: &J) {
        self.check_scheduled(job, None, deadline_in(seconds), false);
    }

    #[track_caller]
    pub fn assert_not_queued_in_with<J, A>(&self, seconds: i64, job: &J, args: &A)
    where
        J: Job + ?Sized,
        A: Serialize + ?Sized,
    {
        let args = expected_args(args);
        self.check_scheduled(job, Some(&args), deadline_in(seconds), false);
    }
}
