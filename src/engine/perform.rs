//! Job execution: decode a payload, resolve its class, perform it, with or
//! without the lifecycle hook pipeline.
//!
//! With hooks on, one payload goes through
//! before → around(perform) → after, and any failure along the way is shown
//! to every failure hook before it propagates unchanged.

use std::cell::Cell;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::Engine;
use crate::codec;
use crate::error::{Error, Result};
use crate::hooks::{ClassHooks, Flow, Next, PerformOutcome};
use crate::job::Job;
use crate::model::{Payload, QueueName, RunOutcome};
use crate::telemetry::job::{record_outcome, start_perform_span};

impl Engine {
    /// Execute one encoded payload taken from `queue`.
    pub(crate) fn perform_encoded(&self, queue: &QueueName, encoded: &str) -> Result<RunOutcome> {
        let payload: Payload = codec::decode_as(encoded).ok_or_else(|| Error::MalformedPayload {
            queue: queue.to_string(),
        })?;
        self.perform_payload(queue, &payload)
    }

    /// Execute one decoded payload.
    pub fn perform_payload(&self, queue: &QueueName, payload: &Payload) -> Result<RunOutcome> {
        let job = self
            .jobs()
            .get(&payload.class)
            .ok_or_else(|| Error::UnknownJobClass(payload.class.clone()))?;

        let span = start_perform_span(&payload.class, queue.as_str());
        let _entered = span.enter();
        debug!("performing job");

        let result = if self.hooks_enabled() {
            self.perform_with_hooks(job.as_ref(), &payload.args)
        } else {
            job.perform(self, &payload.args)
                .map(|()| RunOutcome::Performed)
                .map_err(|source| Error::Job {
                    class: payload.class.clone(),
                    source,
                })
        };

        match &result {
            Ok(outcome) => {
                record_outcome(&span, Some(*outcome));
                debug!(?outcome, "job finished");
            }
            Err(e) => {
                record_outcome(&span, None);
                warn!(error = %e, "job failed");
            }
        }
        result
    }

    fn perform_with_hooks(&self, job: &dyn Job, args: &[Value]) -> Result<RunOutcome> {
        let hooks = self.hooks().for_class(job.name());
        let performed = Cell::new(false);

        match self.hook_pipeline(job, &hooks, args, &performed) {
            PerformOutcome::Performed if performed.get() => Ok(RunOutcome::Performed),
            PerformOutcome::Performed => {
                info!("around hook did not continue, job not performed");
                Ok(RunOutcome::NotPerformed)
            }
            PerformOutcome::DontPerform => {
                info!("job declined by hook");
                Ok(RunOutcome::NotPerformed)
            }
            PerformOutcome::Failed(source) => {
                for named in &hooks.on_failure {
                    if let Err(e) = (named.hook)(&source, args) {
                        warn!(hook = %named.name, error = %e, "failure hook errored");
                    }
                }
                Err(Error::Job {
                    class: job.name().to_string(),
                    source,
                })
            }
        }
    }

    fn hook_pipeline(
        &self,
        job: &dyn Job,
        hooks: &ClassHooks,
        args: &[Value],
        performed: &Cell<bool>,
    ) -> PerformOutcome {
        for named in &hooks.before_perform {
            match (named.hook)(args) {
                Ok(Flow::Continue) => {}
                Ok(Flow::DontPerform) => {
                    debug!(hook = %named.name, "before hook declined");
                    return PerformOutcome::DontPerform;
                }
                Err(e) => return PerformOutcome::Failed(e),
            }
        }

        let perform = || job.perform(self, args);
        match Next::new(&hooks.around_perform, args, &perform, performed).run() {
            PerformOutcome::Performed => {}
            other => return other,
        }

        for named in &hooks.after_perform {
            if let Err(e) = (named.hook)(args) {
                return PerformOutcome::Failed(e);
            }
        }

        PerformOutcome::Performed
    }
}
