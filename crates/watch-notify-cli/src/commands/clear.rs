use super::AppContext;
use crate::output::Output;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use std::fs;
use std::path::{Path, PathBuf};
use watch_notify_core::RunLock;

pub fn run_clear(config_path: Option<PathBuf>, state: bool, lock: bool, output: &Output) -> Result<()> {
    let context = AppContext::paths_only(config_path)?;

    if !state && !lock {
        output.warn("No clear option specified. Use --state, --lock, or both");
        output.info("\nExample: watchnotify clear --lock");
        return Ok(());
    }

    // A leftover lock goes first so clearing state can take a fresh one
    if lock {
        let lock_file = context.lock_file();
        if RunLock::clear(&lock_file).wrap_err("Failed to remove the run lock")? {
            output.success(format!("Removed run lock: {}", lock_file.display()));
        } else {
            output.info("No run lock found to clear");
        }
    }

    if state {
        let _lock = RunLock::acquire(&context.lock_file(), context.lock_stale_after())
            .wrap_err("Cannot clear state while a check is running")?;
        clear_state(&context.state_file(), output)?;
    }

    Ok(())
}

fn clear_state(state_file: &Path, output: &Output) -> Result<()> {
    if !state_file.exists() {
        output.info("No state file found to clear");
        return Ok(());
    }

    fs::remove_file(state_file)
        .wrap_err_with(|| format!("Failed to remove state file at {}", state_file.display()))?;
    output.success(format!("Cleared state: {}", state_file.display()));
    output.warn("Every item still in the feed window will be announced again on the next check");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use tempfile::TempDir;

    fn context_in(dir: &TempDir) -> (PathBuf, AppContext) {
        let config_file = dir.path().join("config.toml");
        let mut context = AppContext::paths_only(Some(config_file.clone())).unwrap();
        context.config.pipeline.state_file = Some(dir.path().join("watched.json"));
        context.config.save_to_file(&config_file).unwrap();
        (config_file, context)
    }

    #[test]
    fn test_clear_state_waits_for_running_check() {
        let dir = TempDir::new().unwrap();
        let (config_file, context) = context_in(&dir);
        std::fs::write(context.state_file(), r#"{"items":{},"lastCheck":null}"#).unwrap();
        let output = Output::new(OutputFormat::Json, true);

        let held = RunLock::acquire(&context.lock_file(), context.lock_stale_after()).unwrap();
        assert!(run_clear(Some(config_file.clone()), true, false, &output).is_err());
        assert!(context.state_file().exists());

        drop(held);
        run_clear(Some(config_file), true, false, &output).unwrap();
        assert!(!context.state_file().exists());
        assert!(!context.lock_file().exists());
    }
}
