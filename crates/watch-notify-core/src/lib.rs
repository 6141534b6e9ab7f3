pub mod dedup;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod lock;
pub mod pipeline;
pub mod store;

pub use dedup::DedupStore;
pub use dispatch::Dispatcher;
pub use error::{PipelineError, StoreError};
pub use format::{first_message, format_runtime, format_watched_at, second_message, DisplayZone};
pub use lock::{LockInfo, RunLock};
pub use pipeline::{ItemFailure, MessagePreview, Orchestrator, RunReport};
pub use store::{JsonFileStore, MemoryStore, StateKey, StateStore};
