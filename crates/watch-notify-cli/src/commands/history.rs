use super::AppContext;
use crate::output::Output;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use std::path::PathBuf;
use watch_notify_sources::SourceSet;

/// Raw feed dump for debugging what Trakt returns
pub async fn run_history(config_path: Option<PathBuf>, limit: Option<u32>, output: &Output) -> Result<()> {
    let context = AppContext::load(config_path)?;
    let limit = limit.unwrap_or(context.config.trakt.history_limit).max(1);

    let sources = SourceSet::from_config(&context.config);
    let history = sources
        .trakt
        .fetch_raw(limit)
        .await
        .wrap_err_with(|| format!("Failed to fetch history for '{}'", sources.trakt.username()))?;

    if output.is_human() {
        println!("{}", serde_json::to_string_pretty(&history)?);
    } else {
        output.json(&history);
    }
    Ok(())
}
