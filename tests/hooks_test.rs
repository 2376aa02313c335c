//! Integration tests for lifecycle hooks around enqueue and perform.

mod common;

use std::sync::{Arc, Mutex};

use common::*;
use queue_double::{Engine, Error, Flow, HookStage, PerformOutcome, RunSummary};
use serde_json::{Value, json};

fn hooked_engine() -> Engine {
    let engine = Engine::new();
    engine.enable_hooks();
    engine
}

type Log = Arc<Mutex<Vec<String>>>;

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

// ---------------------------------------------------------------------------
// Perform hooks
// ---------------------------------------------------------------------------

#[test]
fn hooks_run_in_lifecycle_order() {
    let engine = hooked_engine();
    let job = JobWithArguments::new();
    let calls = log();

    let l = Arc::clone(&calls);
    engine.hooks().before_perform(&*job, "before", move |_| {
        l.lock().unwrap().push("before".into());
        Ok(Flow::Continue)
    });
    let l = Arc::clone(&calls);
    engine.hooks().around_perform(&*job, "outer", move |_, next| {
        l.lock().unwrap().push("outer:in".into());
        let outcome = next.run();
        l.lock().unwrap().push("outer:out".into());
        outcome
    });
    let l = Arc::clone(&calls);
    engine.hooks().around_perform(&*job, "inner", move |_, next| {
        l.lock().unwrap().push("inner".into());
        next.run()
    });
    let l = Arc::clone(&calls);
    engine.hooks().after_perform(&*job, "after", move |args| {
        l.lock().unwrap().push(format!("after:{}", Value::Array(args.to_vec())));
        Ok(())
    });

    engine.enqueue(&job, &[5]).unwrap();
    let summary = engine.run().unwrap();

    assert_eq!(summary.performed, 1);
    assert_eq!(job.seen(), vec![vec![json!(5)]]);
    assert_eq!(
        entries(&calls),
        vec!["before", "outer:in", "inner", "outer:out", "after:[5]"]
    );
}

#[test]
fn before_hook_can_decline_quietly() {
    let engine = hooked_engine();
    let job = LowPriorityJob::new();
    let calls = log();

    engine
        .hooks()
        .before_perform(&*job, "skip", |_| Ok(Flow::DontPerform));
    let l = Arc::clone(&calls);
    engine.hooks().after_perform(&*job, "after", move |_| {
        l.lock().unwrap().push("after".into());
        Ok(())
    });
    let l = Arc::clone(&calls);
    engine.hooks().on_failure(&*job, "failure", move |_, _| {
        l.lock().unwrap().push("failure".into());
        Ok(())
    });

    engine.enqueue(&job, &()).unwrap();
    let summary = engine.run().unwrap();

    assert_eq!(summary, RunSummary { performed: 0, not_performed: 1 });
    assert_eq!(job.runs(), 0);
    assert!(entries(&calls).is_empty());
}

#[test]
fn around_hook_that_does_not_continue_skips_perform() {
    let engine = hooked_engine();
    let job = LowPriorityJob::new();
    let calls = log();

    engine
        .hooks()
        .around_perform(&*job, "swallow", |_, _| PerformOutcome::Performed);
    let l = Arc::clone(&calls);
    engine.hooks().after_perform(&*job, "after", move |_| {
        l.lock().unwrap().push("after".into());
        Ok(())
    });

    engine.enqueue(&job, &()).unwrap();
    let summary = engine.run().unwrap();

    assert_eq!(summary.not_performed, 1);
    assert_eq!(job.runs(), 0);
    assert_eq!(entries(&calls), vec!["after"]);
}

#[test]
fn around_hook_can_decline_before_perform() {
    let engine = hooked_engine();
    let job = LowPriorityJob::new();
    let calls = log();

    engine
        .hooks()
        .around_perform(&*job, "decline", |_, _| PerformOutcome::DontPerform);
    let l = Arc::clone(&calls);
    engine.hooks().after_perform(&*job, "after", move |_| {
        l.lock().unwrap().push("after".into());
        Ok(())
    });

    engine.enqueue(&job, &()).unwrap();
    assert_eq!(engine.run().unwrap().not_performed, 1);
    assert_eq!(job.runs(), 0);
    assert!(entries(&calls).is_empty());
}

#[test]
fn failure_hooks_see_the_error_and_it_still_propagates() {
    let engine = hooked_engine();
    let job = FailingJob::new();
    let calls = log();

    let l = Arc::clone(&calls);
    engine.hooks().on_failure(&*job, "first", move |e, args| {
        let explosion = e.downcast_ref::<Explosion>().map(|x| x.0.clone());
        l.lock().unwrap().push(format!(
            "first:{}:{}",
            explosion.unwrap_or_default(),
            Value::Array(args.to_vec())
        ));
        Ok(())
    });
    engine
        .hooks()
        .on_failure(&*job, "broken", |_, _| Err(anyhow::anyhow!("hook broke too")));
    let l = Arc::clone(&calls);
    engine.hooks().on_failure(&*job, "last", move |_, _| {
        l.lock().unwrap().push("last".into());
        Ok(())
    });

    engine.enqueue(&job, &(1, "x")).unwrap();
    let err = engine.run().unwrap_err();

    assert!(matches!(err, Error::Job { .. }));
    assert!(err.job_failure().unwrap().is::<Explosion>());
    assert_eq!(entries(&calls), vec![r#"first:kaboom:[1,"x"]"#, "last"]);
}

#[test]
fn failing_before_hook_counts_as_job_failure() {
    let engine = hooked_engine();
    let job = LowPriorityJob::new();
    let failures = log();

    engine
        .hooks()
        .before_perform(&*job, "explode", |_| Err(Explosion("early".into()).into()));
    let l = Arc::clone(&failures);
    engine.hooks().on_failure(&*job, "record", move |e, _| {
        l.lock().unwrap().push(e.to_string());
        Ok(())
    });

    engine.enqueue(&job, &()).unwrap();
    assert!(engine.run().is_err());
    assert_eq!(job.runs(), 0);
    assert_eq!(entries(&failures), vec!["job exploded: early"]);
}

#[test]
fn hooks_are_ignored_while_disabled() {
    let engine = Engine::new();
    let job = LowPriorityJob::new();

    engine
        .hooks()
        .before_perform(&*job, "skip", |_| Ok(Flow::DontPerform));
    engine.hooks().before_enqueue(&*job, "veto", |_| Ok(false));

    assert!(!engine.hooks_enabled());
    assert_eq!(engine.enqueue(&job, &()).unwrap(), Some(1));
    engine.run().unwrap();
    assert_eq!(job.runs(), 1);
}

#[test]
fn hooks_can_be_toggled() {
    let engine = Engine::new();
    let job = LowPriorityJob::new();
    engine.hooks().before_enqueue(&*job, "veto", |_| Ok(false));

    engine.enable_hooks();
    assert_eq!(engine.enqueue(&job, &()).unwrap(), None);
    engine.disable_hooks();
    assert_eq!(engine.enqueue(&job, &()).unwrap(), Some(1));
}

// ---------------------------------------------------------------------------
// Enqueue hooks
// ---------------------------------------------------------------------------

#[test]
fn any_before_enqueue_false_vetoes_but_all_run() {
    let engine = hooked_engine();
    let job = JobWithArguments::new();
    let calls = log();

    let l = Arc::clone(&calls);
    engine.hooks().before_enqueue(&*job, "no", move |_| {
        l.lock().unwrap().push("no".into());
        Ok(false)
    });
    let l = Arc::clone(&calls);
    engine.hooks().before_enqueue(&*job, "yes", move |_| {
        l.lock().unwrap().push("yes".into());
        Ok(true)
    });
    let l = Arc::clone(&calls);
    engine.hooks().after_enqueue(&*job, "after", move |_| {
        l.lock().unwrap().push("after".into());
        Ok(())
    });

    assert_eq!(engine.enqueue(&job, &[1]).unwrap(), None);
    assert_eq!(engine.size("medium"), 0);
    assert_eq!(entries(&calls), vec!["no", "yes"]);
}

#[test]
fn after_enqueue_sees_stored_arguments() {
    let engine = hooked_engine();
    let job = JobWithArguments::new();
    let calls = log();

    let l = Arc::clone(&calls);
    engine.hooks().after_enqueue(&*job, "after", move |args| {
        l.lock().unwrap().push(Value::Array(args.to_vec()).to_string());
        Ok(())
    });

    assert_eq!(engine.enqueue(&job, &(1, "a")).unwrap(), Some(1));
    assert_eq!(entries(&calls), vec![r#"[1,"a"]"#]);
}

#[test]
fn before_enqueue_error_is_reported_with_stage() {
    let engine = hooked_engine();
    let job = LowPriorityJob::new();
    engine
        .hooks()
        .before_enqueue(&*job, "broken", |_| Err(anyhow::anyhow!("nope")));

    let err = engine.enqueue(&job, &()).unwrap_err();
    assert!(matches!(
        err,
        Error::Hook {
            stage: HookStage::BeforeEnqueue,
            ..
        }
    ));
    assert_eq!(engine.size("low"), 0);
}

#[test]
fn hook_names_are_listed_in_call_order() {
    let engine = Engine::new();
    let job = LowPriorityJob::new();
    engine.hooks().after_perform(&*job, "b", |_| Ok(()));
    engine.hooks().after_perform(&*job, "a", |_| Ok(()));

    assert_eq!(
        engine.hooks().hook_names("LowPriorityJob", HookStage::AfterPerform),
        vec!["b", "a"]
    );
    assert!(
        engine
            .hooks()
            .hook_names("LowPriorityJob", HookStage::OnFailure)
            .is_empty()
    );

    engine.hooks().clear_class("LowPriorityJob");
    assert!(
        engine
            .hooks()
            .hook_names("LowPriorityJob", HookStage::AfterPerform)
            .is_empty()
    );
}
