//! Job execution span helpers.

use tracing::Span;

use crate::model::RunOutcome;

/// Start a span for one executed payload.
///
/// The `job.outcome` field is declared empty and filled in by
/// [`record_outcome`].
pub fn start_perform_span(class: &str, queue: &str) -> Span {
    tracing::debug_span!(
        "job.perform",
        "job.class" = class,
        "job.queue" = queue,
        "job.outcome" = tracing::field::Empty,
    )
}

/// Record how execution ended on the span.
pub fn record_outcome(span: &Span, outcome: Option<RunOutcome>) {
    let label = match outcome {
        Some(RunOutcome::Performed) => "performed",
        Some(RunOutcome::NotPerformed) => "not_performed",
        None => "failed",
    };
    span.record("job.outcome", label);
}
