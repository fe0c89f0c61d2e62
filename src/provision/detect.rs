use colored::Colorize;
use serde::Serialize;
use std::path::Path;

use crate::common::distro::{OperatingSystem, OsRelease};
use crate::common::exec::{CommandRunner, CommandSpec};
use crate::error::ProvisionError;
use crate::ui::prelude::*;

/// What the rest of the run knows about the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemProfile {
    pub distro_name: String,
    #[serde(serialize_with = "serialize_distro")]
    pub distro: OperatingSystem,
    pub is_privileged_user: bool,
    pub has_sudo: bool,
}

fn serialize_distro<S: serde::Serializer>(os: &OperatingSystem, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(os.id())
}

/// Read the OS identity without enforcing any precondition.
pub fn read_profile(os_release: &Path, running_as_root: bool) -> Result<SystemProfile, ProvisionError> {
    if !os_release.exists() {
        return Err(ProvisionError::MissingOsRelease(os_release.to_path_buf()));
    }
    let release = OsRelease::load(os_release)?;
    Ok(SystemProfile {
        distro_name: release.display_name(),
        distro: OperatingSystem::from_release(&release),
        is_privileged_user: running_as_root,
        has_sudo: false,
    })
}

/// Detect the system and make sure the rest of the run can use sudo.
pub fn detect(
    os_release: &Path,
    running_as_root: bool,
    runner: &dyn CommandRunner,
) -> Result<SystemProfile, ProvisionError> {
    let mut profile = read_profile(os_release, running_as_root)?;

    if profile.is_privileged_user {
        return Err(ProvisionError::RunningAsRoot);
    }

    ensure_sudo(runner)?;
    profile.has_sudo = true;

    Ok(profile)
}

/// Use cached sudo credentials if there are any, otherwise ask once now so
/// later stages do not stop for a password mid-way.
fn ensure_sudo(runner: &dyn CommandRunner) -> Result<(), ProvisionError> {
    if !runner.program_exists("sudo") {
        return Err(ProvisionError::SudoUnavailable(
            "sudo is not installed".to_string(),
        ));
    }

    let cached = runner.capture(&CommandSpec::sudo("-n").arg("true"));
    if matches!(cached, Ok(ref output) if output.success()) {
        emit(Level::Debug, "detect.sudo.cached", "sudo credentials are cached", None);
        return Ok(());
    }

    emit(
        Level::Info,
        "detect.sudo.prompt",
        "Administrator access is needed for package and boot configuration changes.",
        None,
    );
    runner
        .run(&CommandSpec::sudo("-v"))
        .map_err(|e| ProvisionError::SudoUnavailable(format!("{:#}", e)))
}

pub fn print_profile(profile: &SystemProfile) {
    let manager = profile
        .distro
        .package_manager()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "unsupported".to_string());
    emit(
        Level::Info,
        "detect.profile",
        &format!(
            "  {:<18} {}\n  {:<18} {}\n  {:<18} {}",
            "Distribution:",
            profile.distro_name.bright_cyan(),
            "Family:",
            profile.distro,
            "Package manager:",
            manager
        ),
        serde_json::to_value(profile).ok(),
    );
}
