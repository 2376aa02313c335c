//! Error types for queue-double.

use thiserror::Error;

use crate::hooks::HookStage;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no queue found for job class {class}")]
    NoQueue { class: String },

    #[error("job class {0} is not registered with this engine")]
    UnknownJobClass(String),

    #[error("payload in queue {queue} could not be decoded")]
    MalformedPayload { queue: String },

    #[error("{seconds} seconds from now is outside the representable time range")]
    TimestampOutOfRange { seconds: i64 },

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("job {class} failed: {source}")]
    Job {
        class: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{stage} hook for {class} failed: {source}")]
    Hook {
        class: String,
        stage: HookStage,
        #[source]
        source: anyhow::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The failure raised by a job body or hook, as it was raised.
    pub fn job_failure(&self) -> Option<&anyhow::Error> {
        match self {
            Error::Job { source, .. } | Error::Hook { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
