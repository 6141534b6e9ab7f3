use super::AppContext;
use crate::output::Output;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use serde_json::json;
use std::path::PathBuf;
use watch_notify_core::RunLock;

pub fn run_status(config_path: Option<PathBuf>, output: &Output) -> Result<()> {
    let context = AppContext::paths_only(config_path)?;
    let state_file = context.state_file();
    let dedup = context.dedup();

    let cursor = dedup.get_cursor().wrap_err("Failed to read the state file")?;
    let records = dedup.records().wrap_err("Failed to read the state file")?;
    let newest = records.iter().map(|(_, at)| *at).max();
    let lock = RunLock::inspect(&context.lock_file()).wrap_err("Failed to read the run lock")?;

    if !output.is_human() {
        output.json(&json!({
            "state_file": state_file,
            "last_check": cursor,
            "recorded_items": records.len(),
            "newest_watched_at": newest,
            "lock": lock,
        }));
        return Ok(());
    }

    output.info(format!("State file: {}", state_file.display()));
    match cursor {
        Some(at) => output.field("Last check", at.to_rfc3339()),
        None => output.field("Last check", "never"),
    }
    output.field("Recorded items", records.len());
    if let Some(at) = newest {
        output.field("Newest watched", at.to_rfc3339());
    }
    if let Some(lock) = lock {
        output.warn(format!(
            "Run lock held since {} (pid {})",
            lock.acquired_at.to_rfc3339(),
            lock.pid.map(|p| p.to_string()).unwrap_or_else(|| "unknown".to_string())
        ));
    }
    Ok(())
}
