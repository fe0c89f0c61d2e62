use anyhow::{Context, Result, anyhow};
use std::path::Path;

use crate::common::exec::{CommandRunner, CommandSpec};
use crate::ui::prelude::*;

/// `git` invocation, optionally pinned to an SSH identity.
fn git(ssh_key: Option<&Path>) -> CommandSpec {
    let spec = CommandSpec::new("git");
    match ssh_key {
        Some(key) => spec.env(
            "GIT_SSH_COMMAND",
            format!("ssh -i {} -o IdentitiesOnly=yes", key.display()),
        ),
        None => spec,
    }
}

/// Clone `url` into `target`
pub fn clone_repo(
    runner: &dyn CommandRunner,
    url: &str,
    target: &Path,
    ssh_key: Option<&Path>,
) -> Result<()> {
    let target = target.display().to_string();
    runner
        .run(&git(ssh_key).args(["clone", url, target.as_str()]))
        .context("Failed to clone repository")
}

/// Pull `branch` from origin into the checkout at `repo`
pub fn pull_branch(
    runner: &dyn CommandRunner,
    repo: &Path,
    branch: &str,
    ssh_key: Option<&Path>,
) -> Result<()> {
    let repo = repo.display().to_string();
    runner
        .run(&git(ssh_key).args(["-C", repo.as_str(), "pull", "origin", branch]))
        .with_context(|| format!("Failed to pull {}", branch))
}

/// Try each branch in order and return the first one that pulls cleanly.
pub fn pull_first_available(
    runner: &dyn CommandRunner,
    repo: &Path,
    branches: &[String],
    ssh_key: Option<&Path>,
) -> Result<String> {
    for branch in branches {
        match pull_branch(runner, repo, branch, ssh_key) {
            Ok(()) => return Ok(branch.clone()),
            Err(e) => emit(
                Level::Debug,
                "git.pull.branch_failed",
                &format!("Pull of {} failed: {:#}", branch, e),
                None,
            ),
        }
    }
    Err(anyhow!("none of the branches {} could be pulled", branches.join(", ")))
}

/// Set a key in the global git config
pub fn set_global_config(runner: &dyn CommandRunner, key: &str, value: &str) -> Result<()> {
    runner
        .run(&CommandSpec::new("git").args(["config", "--global", key, value]))
        .with_context(|| format!("Failed to set git {}", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingRunner;
    use std::path::PathBuf;

    #[test]
    fn pull_accepts_first_working_branch() {
        let runner = RecordingRunner::new().failing("git -C /home/me/backup pull origin main");
        let branches = vec!["main".to_string(), "master".to_string()];
        let branch =
            pull_first_available(&runner, Path::new("/home/me/backup"), &branches, None).unwrap();
        assert_eq!(branch, "master");
        assert_eq!(runner.command_lines().len(), 2);
    }

    #[test]
    fn pull_stops_after_success() {
        let runner = RecordingRunner::new();
        let branches = vec!["main".to_string(), "master".to_string()];
        let branch =
            pull_first_available(&runner, Path::new("/srv/backup"), &branches, None).unwrap();
        assert_eq!(branch, "main");
        assert_eq!(
            runner.command_lines(),
            vec!["git -C /srv/backup pull origin main"]
        );
    }

    #[test]
    fn pull_fails_when_no_branch_works() {
        let runner = RecordingRunner::new().failing("git -C");
        let branches = vec!["main".to_string(), "master".to_string()];
        let err =
            pull_first_available(&runner, Path::new("/srv/backup"), &branches, None).unwrap_err();
        assert!(err.to_string().contains("main, master"));
    }

    #[test]
    fn custom_key_is_passed_through_git_ssh_command() {
        let runner = RecordingRunner::new();
        let key = PathBuf::from("/home/me/.ssh/work_ed25519");
        clone_repo(&runner, "git@github.com:me/backup.git", Path::new("/tmp/b"), Some(&key))
            .unwrap();
        let calls = runner.calls();
        let call = &calls[0];
        assert_eq!(
            call.env,
            vec![(
                "GIT_SSH_COMMAND".to_string(),
                "ssh -i /home/me/.ssh/work_ed25519 -o IdentitiesOnly=yes".to_string()
            )]
        );
        assert_eq!(
            call.command_line(),
            "git clone git@github.com:me/backup.git /tmp/b"
        );
    }
}
