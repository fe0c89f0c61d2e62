use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Centralized path management for postinst

/// The user's home directory
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("Unable to determine home directory")
}

/// Get the postinst config directory
pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("postinst"))
}

/// Default location of the configuration file
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Get the postinst data directory
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| {
            let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
            home.join(".local/share")
        })
        .join("postinst")
}

/// Log file for the run started at `stamp`
pub fn run_log_file(stamp: &str) -> PathBuf {
    data_dir().join("logs").join(format!("run-{}.log", stamp))
}

/// Expand `~` and environment variables in a configured path
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| shellexpand::tilde(path).into_owned());
    PathBuf::from(expanded)
}

/// `<path>.<suffix>-<stamp>`, keeping the file in its original directory
pub fn stamped_sibling(path: &Path, suffix: &str, stamp: &str) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.{}-{}", file_name, suffix, stamp))
}
