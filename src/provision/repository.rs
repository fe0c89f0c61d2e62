use std::path::PathBuf;

use super::{RunContext, StageOutcome};
use crate::common::git;
use crate::common::paths;
use crate::config::SshConfig;
use crate::error::ProvisionError;
use crate::ui::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    pub remote_url: String,
    pub local_path: PathBuf,
}

impl RepositoryHandle {
    pub fn from_context(ctx: &RunContext) -> Self {
        Self {
            remote_url: ctx.config.repository.url.clone(),
            local_path: ctx.config.repository_path(),
        }
    }

    pub fn exists(&self) -> bool {
        self.local_path.exists()
    }
}

/// The key git should be pinned to, if it differs from what ssh picks up
/// on its own.
fn pinned_key(ctx: &RunContext) -> Option<PathBuf> {
    let configured = ctx.config.private_key_path();
    let default = paths::expand(&SshConfig::default().key_path);
    (configured != default).then_some(configured)
}

pub fn synchronize(ctx: &RunContext) -> Result<StageOutcome, ProvisionError> {
    let repo = RepositoryHandle::from_context(ctx);
    let key = pinned_key(ctx);

    if repo.exists() {
        return update(ctx, &repo, key.as_deref());
    }

    emit(
        Level::Info,
        "repository.clone",
        &format!(
            "Cloning {} into {}",
            repo.remote_url,
            repo.local_path.display()
        ),
        None,
    );
    git::clone_repo(ctx.runner, &repo.remote_url, &repo.local_path, key.as_deref()).map_err(
        |e| ProvisionError::CloneFailed {
            url: repo.remote_url.clone(),
            detail: format!("{:#}", e),
        },
    )?;

    Ok(StageOutcome::Completed)
}

fn update(
    ctx: &RunContext,
    repo: &RepositoryHandle,
    key: Option<&std::path::Path>,
) -> Result<StageOutcome, ProvisionError> {
    let question = format!(
        "{} already exists. Pull the latest changes?",
        repo.local_path.display()
    );
    if !ctx.prompter.confirm(&question, true)? {
        return Ok(StageOutcome::Skipped("existing checkout left as is".to_string()));
    }

    match git::pull_first_available(
        ctx.runner,
        &repo.local_path,
        &ctx.config.repository.branches,
        key,
    ) {
        Ok(branch) => {
            emit(
                Level::Success,
                "repository.pulled",
                &format!("Updated from origin/{}", branch),
                None,
            );
            Ok(StageOutcome::Completed)
        }
        Err(e) => Ok(StageOutcome::Failed(format!("{:#}", e))),
    }
}
