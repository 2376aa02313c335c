//! Lifecycle hook registry.
//!
//! Hooks are registered per job class and stage, each under a name, and are
//! invoked in registration order. A hook decides whether the job goes ahead
//! by what it returns, not by unwinding:
//!
//! - before-perform hooks return [`Flow`]
//! - around-perform hooks return [`PerformOutcome`] and get a [`Next`]
//!   continuation for the rest of the chain
//! - before-enqueue hooks return `false` to veto the enqueue

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::job::Job;

/// Lifecycle stage a hook is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookStage {
    BeforePerform,
    AroundPerform,
    AfterPerform,
    OnFailure,
    BeforeEnqueue,
    AfterEnqueue,
}

impl std::fmt::Display for HookStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HookStage::BeforePerform => "before_perform",
            HookStage::AroundPerform => "around_perform",
            HookStage::AfterPerform => "after_perform",
            HookStage::OnFailure => "on_failure",
            HookStage::BeforeEnqueue => "before_enqueue",
            HookStage::AfterEnqueue => "after_enqueue",
        };
        write!(f, "{s}")
    }
}

/// Returned by before-perform hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Skip the job quietly: no perform, no after hooks, no failure hooks.
    DontPerform,
}

/// Result of an around-perform chain.
#[derive(Debug)]
pub enum PerformOutcome {
    Performed,
    DontPerform,
    Failed(anyhow::Error),
}

impl From<anyhow::Result<()>> for PerformOutcome {
    fn from(result: anyhow::Result<()>) -> Self {
        match result {
            Ok(()) => PerformOutcome::Performed,
            Err(e) => PerformOutcome::Failed(e),
        }
    }
}

pub type BeforePerformHook = Arc<dyn Fn(&[Value]) -> anyhow::Result<Flow> + Send + Sync>;
pub type AroundPerformHook = Arc<dyn Fn(&[Value], Next<'_>) -> PerformOutcome + Send + Sync>;
pub type AfterPerformHook = Arc<dyn Fn(&[Value]) -> anyhow::Result<()> + Send + Sync>;
pub type FailureHook = Arc<dyn Fn(&anyhow::Error, &[Value]) -> anyhow::Result<()> + Send + Sync>;
pub type BeforeEnqueueHook = Arc<dyn Fn(&[Value]) -> anyhow::Result<bool> + Send + Sync>;
pub type AfterEnqueueHook = Arc<dyn Fn(&[Value]) -> anyhow::Result<()> + Send + Sync>;

/// A hook together with the name it was registered under.
#[derive(Clone)]
pub struct Named<H> {
    pub name: String,
    pub hook: H,
}

/// Every hook registered for one job class.
#[derive(Clone, Default)]
pub struct ClassHooks {
    pub before_perform: Vec<Named<BeforePerformHook>>,
    pub around_perform: Vec<Named<AroundPerformHook>>,
    pub after_perform: Vec<Named<AfterPerformHook>>,
    pub on_failure: Vec<Named<FailureHook>>,
    pub before_enqueue: Vec<Named<BeforeEnqueueHook>>,
    pub after_enqueue: Vec<Named<AfterEnqueueHook>>,
}

impl ClassHooks {
    fn names(&self, stage: HookStage) -> Vec<String> {
        fn collect<H>(hooks: &[Named<H>]) -> Vec<String> {
            hooks.iter().map(|h| h.name.clone()).collect()
        }
        match stage {
            HookStage::BeforePerform => collect(&self.before_perform),
            HookStage::AroundPerform => collect(&self.around_perform),
            HookStage::AfterPerform => collect(&self.after_perform),
            HookStage::OnFailure => collect(&self.on_failure),
            HookStage::BeforeEnqueue => collect(&self.before_enqueue),
            HookStage::AfterEnqueue => collect(&self.after_enqueue),
        }
    }
}

/// Continuation handed to an around-perform hook.
///
/// [`Next::run`] calls the next around hook, or `perform` once the chain is
/// exhausted. A hook that never calls it skips `perform`.
pub struct Next<'a> {
    rest: &'a [Named<AroundPerformHook>],
    args: &'a [Value],
    perform: &'a dyn Fn() -> anyhow::Result<()>,
    performed: &'a Cell<bool>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        chain: &'a [Named<AroundPerformHook>],
        args: &'a [Value],
        perform: &'a dyn Fn() -> anyhow::Result<()>,
        performed: &'a Cell<bool>,
    ) -> Self {
        Self {
            rest: chain,
            args,
            perform,
            performed,
        }
    }

    pub fn run(self) -> PerformOutcome {
        match self.rest.split_first() {
            Some((outer, rest)) => (outer.hook)(self.args, Next { rest, ..self }),
            None => {
                let outcome = PerformOutcome::from((self.perform)());
                self.performed.set(true);
                outcome
            }
        }
    }
}

/// Registry mapping (job class, stage) to an ordered list of hooks.
#[derive(Default)]
pub struct HookRegistry {
    classes: RwLock<HashMap<String, ClassHooks>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn edit(&self, job: &str, f: impl FnOnce(&mut ClassHooks)) {
        let mut classes = self.classes.write().unwrap_or_else(|e| e.into_inner());
        f(classes.entry(job.to_string()).or_default());
    }

    pub fn before_perform<J, F>(&self, job: &J, name: &str, hook: F)
    where
        J: Job + ?Sized,
        F: Fn(&[Value]) -> anyhow::Result<Flow> + Send + Sync + 'static,
    {
        let hook = Named {
            name: name.to_string(),
            hook: Arc::new(hook) as BeforePerformHook,
        };
        self.edit(job.name(), |c| c.before_perform.push(hook));
    }

    pub fn around_perform<J, F>(&self, job: &J, name: &str, hook: F)
    where
        J: Job + ?Sized,
        F: Fn(&[Value], Next<'_>) -> PerformOutcome + Send + Sync + 'static,
    {
        let hook = Named {
            name: name.to_string(),
            hook: Arc::new(hook) as AroundPerformHook,
        };
        self.edit(job.name(), |c| c.around_perform.push(hook));
    }

    pub fn after_perform<J, F>(&self, job: &J, name: &str, hook: F)
    where
        J: Job + ?Sized,
        F: Fn(&[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let hook = Named {
            name: name.to_string(),
            hook: Arc::new(hook) as AfterPerformHook,
        };
        self.edit(job.name(), |c| c.after_perform.push(hook));
    }

    /// Failure hooks see the error and the job's arguments. They cannot
    /// suppress the failure.
    pub fn on_failure<J, F>(&self, job: &J, name: &str, hook: F)
    where
        J: Job + ?Sized,
        F: Fn(&anyhow::Error, &[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let hook = Named {
            name: name.to_string(),
            hook: Arc::new(hook) as FailureHook,
        };
        self.edit(job.name(), |c| c.on_failure.push(hook));
    }

    pub fn before_enqueue<J, F>(&self, job: &J, name: &str, hook: F)
    where
        J: Job + ?Sized,
        F: Fn(&[Value]) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        let hook = Named {
            name: name.to_string(),
            hook: Arc::new(hook) as BeforeEnqueueHook,
        };
        self.edit(job.name(), |c| c.before_enqueue.push(hook));
    }

    pub fn after_enqueue<J, F>(&self, job: &J, name: &str, hook: F)
    where
        J: Job + ?Sized,
        F: Fn(&[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let hook = Named {
            name: name.to_string(),
            hook: Arc::new(hook) as AfterEnqueueHook,
        };
        self.edit(job.name(), |c| c.after_enqueue.push(hook));
    }

    /// Snapshot of a class's hooks. Empty if none were registered.
    ///
    /// Returned by value so hooks can run without holding the registry lock.
    pub fn for_class(&self, class: &str) -> ClassHooks {
        self.classes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(class)
            .cloned()
            .unwrap_or_default()
    }

    /// Names of the hooks registered for a class and stage, in call order.
    pub fn hook_names(&self, class: &str, stage: HookStage) -> Vec<String> {
        self.for_class(class).names(stage)
    }

    /// Drop every hook registered for a class.
    pub fn clear_class(&self, class: &str) {
        self.classes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(class);
    }

    /// Drop every hook.
    pub fn clear(&self) {
        self.classes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
