use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;
use watch_notify_config::ConfigError;
use watch_notify_sources::{DispatchError, SourceError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file I/O failed at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document exists but does not parse. Never reset automatically:
    /// an empty record set would announce the whole feed again.
    #[error("state file {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode state: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Upstream(#[from] SourceError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("another run holds {path:?} (pid {pid:?}, since {since})")]
    RunInProgress {
        path: PathBuf,
        pid: Option<u32>,
        since: DateTime<Utc>,
    },
}
