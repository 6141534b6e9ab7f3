use super::AppContext;
use crate::output::Output;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use watch_notify_core::{MemoryStore, RunReport, StateStore};

pub async fn run_check(config_path: Option<PathBuf>, dry_run: bool, output: &Output) -> Result<()> {
    tracing::debug!(dry_run, "Check command started");
    let context = AppContext::load(config_path)?;

    let file_store = context.file_store();
    let orchestrator = if dry_run {
        // Work on a copy so nothing is recorded
        let snapshot = MemoryStore::snapshot_of(file_store.as_ref())
            .wrap_err("Failed to read the state file")?;
        context.orchestrator(Arc::new(snapshot)).with_dry_run(true)
    } else {
        let store: Arc<dyn StateStore> = file_store;
        context
            .orchestrator(store)
            .with_run_lock(context.lock_file(), context.lock_stale_after())
    };

    let report = orchestrator.run().await.wrap_err("Check failed")?;
    print_report(&report, dry_run, output);
    Ok(())
}

pub fn print_report(report: &RunReport, dry_run: bool, output: &Output) {
    if !output.is_human() {
        output.json(&serde_json::to_value(report).unwrap_or_default());
        return;
    }

    if dry_run {
        for preview in &report.previews {
            output.block(&format!("Item {} - message 1", preview.item_id), &preview.first);
            let label = match &preview.artwork_url {
                Some(url) => format!("Item {} - message 2 (photo {})", preview.item_id, url),
                None => format!("Item {} - message 2", preview.item_id),
            };
            output.block(&label, &preview.second);
        }
        output.info(format!(
            "Dry run: {} item(s) would be announced, nothing was sent or recorded",
            report.previews.len()
        ));
        return;
    }

    if report.notified > 0 {
        output.success(format!("Announced {} new item(s)", report.notified));
    } else {
        output.info("Nothing new to announce");
    }
    output.field("Fetched", report.fetched);
    output.field("Already announced", report.skipped_known);
    if report.skipped_unsupported > 0 {
        output.field("Unsupported", report.skipped_unsupported);
    }
    if report.pruned > 0 {
        output.field("Pruned", report.pruned);
    }
    output.field("Duration", format!("{:?}", report.duration));

    for failure in &report.failures {
        output.warn(format!(
            "Failed to announce {} ({}): {}",
            failure.title, failure.item_id, failure.error
        ));
    }
}
