//! Generic installer consuming a [`PackagePlan`].

use anyhow::{Context, Result};

use super::plan::{AptSource, ExtraStep, PackagePlan};
use super::PackageManager;
use crate::common::exec::{CommandRunner, CommandSpec};
use crate::ui::prelude::*;

/// Install a single package, refreshing the index first where the manager
/// needs it.
pub fn install_single(
    manager: PackageManager,
    package: &str,
    runner: &dyn CommandRunner,
) -> Result<()> {
    if manager == PackageManager::Apt {
        runner
            .run(&manager.update_command())
            .context("Failed to update apt package index")?;
    }
    runner
        .run(&manager.install_command(&[package]))
        .with_context(|| format!("Failed to install {} with {}", package, manager))?;
    Ok(())
}

/// Run the whole plan: update index, install the list, extra steps in order.
pub fn install_plan(plan: &PackagePlan, runner: &dyn CommandRunner) -> Result<()> {
    emit(
        Level::Info,
        "packages.update",
        &format!("Updating {} package index...", plan.manager),
        None,
    );
    runner
        .run(&plan.manager.update_command())
        .with_context(|| format!("Failed to update {} package index", plan.manager))?;

    if !plan.packages.is_empty() {
        emit(
            Level::Info,
            "packages.install",
            &format!("Installing: {}", plan.packages.join(", ")),
            None,
        );
        runner
            .run(&plan.manager.install_command(&plan.packages))
            .with_context(|| format!("Failed to install packages with {}", plan.manager))?;
    }

    for step in &plan.extra_steps {
        run_extra_step(step, runner)?;
    }

    Ok(())
}

fn run_extra_step(step: &ExtraStep, runner: &dyn CommandRunner) -> Result<()> {
    match step {
        ExtraStep::AptThirdParty(source) => install_from_apt_source(source, runner),
    }
}

fn install_from_apt_source(source: &AptSource, runner: &dyn CommandRunner) -> Result<()> {
    if runner.program_exists(source.binary) {
        emit(
            Level::Info,
            "packages.extra.present",
            &format!("{} is already installed", source.name),
            None,
        );
        return Ok(());
    }

    emit(
        Level::Info,
        "packages.extra.install",
        &format!("Installing {}...", source.name),
        None,
    );

    runner
        .run(&PackageManager::Apt.install_command(&["wget", "gpg", "apt-transport-https"]))
        .context("Failed to install repository prerequisites")?;

    // gpg refuses to overwrite, so dearmor into a fresh path inside a temp dir
    let staging_dir = tempfile::tempdir().context("Failed to create staging directory")?;
    let staged_key = staging_dir.path().join("signing-key.gpg");
    let staged_key = staged_key.display().to_string();

    let fetch = format!(
        "wget -qO- {} | gpg --dearmor -o {}",
        source.key_url,
        crate::common::shell::shell_quote(&staged_key)
    );
    runner
        .run(&CommandSpec::new("sh").args(["-c", fetch.as_str()]))
        .with_context(|| format!("Failed to fetch signing key for {}", source.name))?;

    runner
        .run(&CommandSpec::sudo("install").args([
            "-D",
            "-o",
            "root",
            "-g",
            "root",
            "-m",
            "644",
            staged_key.as_str(),
            source.keyring,
        ]))
        .context("Failed to install signing key")?;

    runner
        .run(
            &CommandSpec::sudo("tee")
                .arg(source.list_file)
                .stdin(source.source_line()),
        )
        .with_context(|| format!("Failed to write {}", source.list_file))?;

    install_single(PackageManager::Apt, source.package, runner)
}
