pub mod config;
pub mod error;
pub mod paths;

pub use config::{Config, OmdbConfig, PipelineConfig, SchedulerConfig, TelegramConfig, TmdbConfig, TraktConfig, default_scheduler_config};
pub use error::ConfigError;
pub use paths::{PathManager, container_base_path};
