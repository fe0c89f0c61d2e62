use anyhow::Result;
use std::fs;
use std::path::Path;
use std::process::Command;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

pub fn run_postinst(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    let output = Command::new(env!("CARGO_BIN_EXE_postinst"))
        .args(args)
        .env("HOME", env.home())
        .env("XDG_CONFIG_HOME", env.config_home())
        .env("XDG_DATA_HOME", env.data_home())
        .env("NO_COLOR", "1")
        .current_dir(env.path())
        .output()?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

pub fn file_exists(path: &Path) -> bool {
    path.exists()
}

pub fn read_file(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}
