use super::AppContext;
use crate::output::Output;
use chrono::{Duration, Utc};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use serde_json::json;
use std::path::PathBuf;
use watch_notify_core::RunLock;

pub fn run_prune(config_path: Option<PathBuf>, days: u32, output: &Output) -> Result<()> {
    let context = AppContext::paths_only(config_path)?;

    // Hold the run lock so a concurrent check does not race the rewrite
    let _lock = RunLock::acquire(&context.lock_file(), context.lock_stale_after())
        .wrap_err("Cannot prune while a check is running")?;

    let cutoff = Utc::now() - Duration::days(i64::from(days));
    let removed = context
        .dedup()
        .prune_older_than(cutoff)
        .wrap_err("Failed to prune the state file")?;

    if output.is_human() {
        output.success(format!(
            "Removed {} record(s) watched before {}",
            removed,
            cutoff.format("%Y-%m-%d")
        ));
    } else {
        output.json(&json!({ "removed": removed, "cutoff": cutoff }));
    }
    Ok(())
}
