//! Install the GRUB defaults file from the backup repository.
//!
//! An existing destination is always copied aside first. There is no
//! rollback: when regeneration fails the backup path, if one was taken, is
//! reported so the user can restore it by hand.

use std::path::PathBuf;

use super::{RunContext, StageOutcome};
use crate::common::exec::CommandSpec;
use crate::common::{files, paths};
use crate::error::ProvisionError;
use crate::ui::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootConfig {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub backup: PathBuf,
}

impl BootConfig {
    pub fn from_context(ctx: &RunContext) -> Self {
        let destination = ctx.config.boot_destination();
        Self {
            source: ctx.config.repository_path().join(&ctx.config.boot.source),
            backup: paths::stamped_sibling(&destination, "backup", &ctx.stamp),
            destination,
        }
    }
}

pub fn install(ctx: &RunContext) -> Result<StageOutcome, ProvisionError> {
    let boot = BootConfig::from_context(ctx);

    if !boot.source.exists() {
        emit(
            Level::Warn,
            "boot.source.missing",
            &format!("{} not found in the backup repository", boot.source.display()),
            None,
        );
        return Ok(StageOutcome::Skipped(format!(
            "{} not found",
            boot.source.display()
        )));
    }

    let mut backup = None;
    if boot.destination.exists() {
        if let Err(e) = files::copy_privileged(ctx.runner, &boot.destination, &boot.backup) {
            return Ok(StageOutcome::Failed(format!("backup failed: {:#}", e)));
        }
        backup = Some(&boot.backup);
        emit(
            Level::Info,
            "boot.backup",
            &format!(
                "Backed up {} to {}",
                boot.destination.display(),
                boot.backup.display()
            ),
            None,
        );
    }

    if let Err(e) = files::copy_privileged(ctx.runner, &boot.source, &boot.destination) {
        return Ok(StageOutcome::Failed(format!("{:#}", e)));
    }
    emit(
        Level::Info,
        "boot.installed",
        &format!("Installed {}", boot.destination.display()),
        None,
    );

    let regenerate = ctx
        .profile
        .distro
        .package_manager()
        .map(|m| m.grub_regenerate_command())
        .unwrap_or_else(|| CommandSpec::sudo("update-grub"));

    match ctx.runner.run(&regenerate) {
        Ok(()) => Ok(StageOutcome::Completed),
        Err(e) => {
            let previous = match backup {
                Some(path) => format!("previous file kept at {}", path.display()),
                None => format!("{} did not exist before", boot.destination.display()),
            };
            Ok(StageOutcome::Failed(format!(
                "regenerating GRUB failed ({:#}); {}",
                e, previous
            )))
        }
    }
}
