//! The provisioning workflow.
//!
//! Detect → {credentials, repository, boot, packages} → completion report.
//! Detection is a hard precondition; every later stage is confirmed
//! individually and a skipped or failed stage does not block the next one.
//! A [`ProvisionError`] from any stage ends the run.

use std::path::PathBuf;

use serde::Serialize;

use crate::common::exec::CommandRunner;
use crate::config::Config;
use crate::error::ProvisionError;
use crate::prompt::Prompter;
use crate::ui::prelude::*;

pub mod boot;
pub mod credentials;
pub mod detect;
pub mod packages;
pub mod report;
pub mod repository;

pub use detect::SystemProfile;
pub use report::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Git client, SSH key pair, agent, remote verification, git identity
    Credentials,
    /// Clone or update the backup repository
    Repository,
    /// Install the GRUB configuration from the repository
    Boot,
    /// Install applications with the native package manager
    Packages,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Credentials,
        Stage::Repository,
        Stage::Boot,
        Stage::Packages,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Stage::Credentials => "SSH and Git credentials",
            Stage::Repository => "Backup repository",
            Stage::Boot => "GRUB configuration",
            Stage::Packages => "Applications",
        }
    }

    fn question(&self, ctx: &RunContext) -> String {
        match self {
            Stage::Credentials => "Set up SSH and Git credentials?".to_string(),
            Stage::Repository => format!(
                "Clone or update the backup repository ({})?",
                ctx.config.repository.url
            ),
            Stage::Boot => "Install the GRUB configuration from the backup repository?".to_string(),
            Stage::Packages => match ctx.profile.distro.package_manager() {
                Some(manager) => format!("Install applications with {}?", manager),
                None => "Install applications?".to_string(),
            },
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StageOutcome {
    Completed,
    Skipped(String),
    /// Reported failure; later stages still run
    Failed(String),
}

/// Everything a stage may read, built once after detection.
pub struct RunContext<'a> {
    pub profile: SystemProfile,
    pub config: &'a Config,
    pub runner: &'a dyn CommandRunner,
    pub prompter: &'a dyn Prompter,
    /// Date-time of this run, used in backup and log names
    pub stamp: String,
    pub home: PathBuf,
}

impl RunContext<'_> {
    pub fn dry_run(&self) -> bool {
        self.runner.dry_run()
    }
}

/// Inputs the workflow needs from the host.
pub struct Workflow<'a> {
    pub os_release: PathBuf,
    pub running_as_root: bool,
    /// Stages to offer; empty means all
    pub stages: Vec<Stage>,
    pub config: &'a Config,
    pub runner: &'a dyn CommandRunner,
    pub prompter: &'a dyn Prompter,
    pub stamp: String,
    pub home: PathBuf,
}

impl Workflow<'_> {
    fn selected(&self, stage: Stage) -> bool {
        self.stages.is_empty() || self.stages.contains(&stage)
    }

    /// Run the workflow to the completion report.
    pub fn run(self) -> Result<Report, ProvisionError> {
        heading("System detection");
        let profile = detect::detect(&self.os_release, self.running_as_root, self.runner)?;
        detect::print_profile(&profile);

        let ctx = RunContext {
            profile,
            config: self.config,
            runner: self.runner,
            prompter: self.prompter,
            stamp: self.stamp.clone(),
            home: self.home.clone(),
        };

        let mut report = Report::new(&ctx.profile);
        for stage in Stage::ALL {
            if !self.selected(stage) {
                continue;
            }
            let outcome = run_stage(stage, &ctx)?;
            report.record(stage, outcome);
        }

        Ok(report)
    }
}

fn run_stage(stage: Stage, ctx: &RunContext) -> Result<StageOutcome, ProvisionError> {
    heading(stage.title());

    if !ctx.prompter.confirm(&stage.question(ctx), true)? {
        emit(
            Level::Info,
            "stage.declined",
            &format!("Skipping {}", stage.title().to_lowercase()),
            None,
        );
        return Ok(StageOutcome::Skipped("declined".to_string()));
    }

    let outcome = match stage {
        Stage::Credentials => credentials::provision(ctx)?,
        Stage::Repository => repository::synchronize(ctx)?,
        Stage::Boot => boot::install(ctx)?,
        Stage::Packages => packages::install(ctx)?,
    };

    match &outcome {
        StageOutcome::Completed => emit(
            Level::Success,
            "stage.completed",
            &format!("{} done", stage.title()),
            None,
        ),
        StageOutcome::Skipped(reason) => emit(
            Level::Info,
            "stage.skipped",
            &format!("{} skipped: {}", stage.title(), reason),
            None,
        ),
        StageOutcome::Failed(reason) => emit(
            Level::Error,
            "stage.failed",
            &format!("{} failed: {}", stage.title(), reason),
            None,
        ),
    }

    Ok(outcome)
}
