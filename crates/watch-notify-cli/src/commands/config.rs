use super::AppContext;
use crate::output::Output;
use crate::ConfigCommands;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::PathBuf;
use watch_notify_config::Config;

pub fn run_config(config_path: Option<PathBuf>, cmd: ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show { full } => show_config(config_path, full, output),
        ConfigCommands::Path => show_path(config_path, output),
        ConfigCommands::Init { force } => init_config(config_path, force, output),
    }
}

fn show_config(config_path: Option<PathBuf>, full: bool, output: &Output) -> Result<()> {
    let context = AppContext::paths_only(config_path)?;
    let mut config = context.config.clone();
    config.apply_env(|key| std::env::var(key).ok());
    let shown = if full { config.clone() } else { config.masked() };

    if !output.is_human() {
        output.json(&json!({
            "config_file": context.config_file,
            "exists": context.config_file.exists(),
            "valid": config.validate().is_ok(),
            "config": serde_json::to_value(&shown)?,
        }));
        return Ok(());
    }

    if !context.config_file.exists() {
        output.warn(format!(
            "Configuration file not found at: {} (showing defaults and environment)",
            context.config_file.display()
        ));
        output.info("Run 'watchnotify config init' to create one.");
    }

    println!("{}", "Configuration".bright_cyan().bold());
    output.field("Config file", context.config_file.display());
    output.field("State file", context.state_file().display());
    println!();
    println!("{}", toml::to_string_pretty(&shown)?);

    match config.validate() {
        Ok(()) => output.success("Configuration is valid"),
        Err(e) => output.warn(format!("Configuration is incomplete: {}", e)),
    }
    Ok(())
}

fn show_path(config_path: Option<PathBuf>, output: &Output) -> Result<()> {
    let context = AppContext::paths_only(config_path)?;
    if output.is_human() {
        println!("{}", context.config_file.display());
    } else {
        output.json(&json!({ "config_file": context.config_file }));
    }
    Ok(())
}

fn init_config(config_path: Option<PathBuf>, force: bool, output: &Output) -> Result<()> {
    let context = AppContext::paths_only(config_path)?;
    let path = &context.config_file;

    if path.exists() && !force {
        return Err(eyre!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        ));
    }

    Config::template()
        .save_to_file(path)
        .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;

    output.success(format!("Wrote template configuration to {}", path.display()));
    output.info("Replace the YOUR_* placeholders, or set the matching environment variables.");
    Ok(())
}
