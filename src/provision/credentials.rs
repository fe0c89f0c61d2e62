//! SSH key pair, agent registration, remote verification and git identity.

use anyhow::{Result, bail};
use colored::Colorize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::{RunContext, StageOutcome};
use crate::common::exec::{CommandRunner, CommandSpec};
use crate::common::package::install_single;
use crate::common::{files, git};
use crate::error::ProvisionError;
use crate::ui::prelude::*;

const AUTH_BANNER: &str = "successfully authenticated";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

impl KeyPair {
    pub fn at(private_key: PathBuf) -> Self {
        let mut public = private_key.clone().into_os_string();
        public.push(".pub");
        Self {
            public_key: PathBuf::from(public),
            private_key,
        }
    }

    pub fn exists(&self) -> bool {
        self.private_key.exists()
    }

    fn directory(&self) -> &Path {
        self.private_key.parent().unwrap_or_else(|| Path::new("."))
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

pub fn provision(ctx: &RunContext) -> Result<StageOutcome, ProvisionError> {
    ensure_git(ctx)?;

    let keys = KeyPair::at(ctx.config.private_key_path());
    let email = if keys.exists() {
        emit(
            Level::Info,
            "credentials.key.exists",
            &format!("Using existing SSH key {}", keys.private_key.display()),
            None,
        );
        None
    } else {
        Some(generate_key(ctx, &keys)?)
    };

    if let Err(e) = register_with_agent(
        ctx.runner,
        &keys.private_key,
        std::env::var_os("SSH_AUTH_SOCK"),
    ) {
        emit(
            Level::Debug,
            "credentials.agent.failed",
            &format!("Could not add key to ssh-agent: {:#}", e),
            None,
        );
    }

    show_public_key(ctx, &keys)?;
    verify_connection(ctx, &keys)?;

    if let Some(email) = &email {
        configure_git_identity(ctx, email)?;
    }

    Ok(archive_keys(ctx, &keys)?)
}

fn ensure_git(ctx: &RunContext) -> Result<(), ProvisionError> {
    if ctx.runner.program_exists("git") {
        return Ok(());
    }

    let Some(manager) = ctx.profile.distro.package_manager() else {
        return Err(ProvisionError::UnsupportedDistro(
            ctx.profile.distro.id().to_string(),
        ));
    };

    emit(
        Level::Info,
        "credentials.git.install",
        &format!("git not found, installing with {}", manager),
        None,
    );
    install_single(manager, "git", ctx.runner)?;
    Ok(())
}

fn generate_key(ctx: &RunContext, keys: &KeyPair) -> Result<String> {
    let email = ctx
        .prompter
        .input("Email for the SSH key", ctx.config.ssh.email.as_deref())?;
    let email = email.trim().to_string();
    if email.is_empty() {
        bail!("an email is required to label the SSH key");
    }

    let dir = keys.directory();
    if !ctx.dry_run() {
        fs::create_dir_all(dir)?;
    }

    emit(
        Level::Info,
        "credentials.key.generate",
        &format!("Generating ed25519 key at {}", keys.private_key.display()),
        None,
    );
    ctx.runner.run(&CommandSpec::new("ssh-keygen").args([
        "-t".to_string(),
        "ed25519".to_string(),
        "-C".to_string(),
        email.clone(),
        "-f".to_string(),
        keys.private_key.display().to_string(),
        "-N".to_string(),
        String::new(),
    ]))?;

    if !ctx.dry_run() {
        files::set_mode(dir, 0o700)?;
    }

    Ok(email)
}

/// Add `key` to an agent: the one in `auth_sock` when set, otherwise a
/// freshly started `ssh-agent`.
pub fn register_with_agent(
    runner: &dyn CommandRunner,
    key: &Path,
    auth_sock: Option<OsString>,
) -> Result<()> {
    let mut add = CommandSpec::new("ssh-add").arg(key.display().to_string());

    if auth_sock.is_none() {
        let output = runner.capture(&CommandSpec::new("ssh-agent").arg("-s"))?;
        if !output.success() {
            bail!("ssh-agent exited with status {}", output.exit_code);
        }
        for (name, value) in parse_agent_env(&output.stdout) {
            add = add.env(name, value);
        }
    }

    runner.run(&add)
}

/// Pull `NAME=value;` assignments out of `ssh-agent -s` output.
pub fn parse_agent_env(output: &str) -> Vec<(String, String)> {
    output
        .split(|c: char| c == ';' || c == '\n')
        .filter_map(|part| {
            let (name, value) = part.trim().split_once('=')?;
            matches!(name, "SSH_AUTH_SOCK" | "SSH_AGENT_PID")
                .then(|| (name.to_string(), value.to_string()))
        })
        .collect()
}

fn show_public_key(ctx: &RunContext, keys: &KeyPair) -> Result<()> {
    match fs::read_to_string(&keys.public_key) {
        Ok(key) => emit(
            Level::Info,
            "credentials.key.public",
            &format!("Your public key:\n\n{}\n", key.trim().bright_white()),
            Some(serde_json::json!({ "public_key": key.trim() })),
        ),
        Err(e) => emit(
            Level::Warn,
            "credentials.key.unreadable",
            &format!(
                "Could not read public key {}: {}",
                keys.public_key.display(),
                e
            ),
            None,
        ),
    }

    ctx.prompter.acknowledge(&format!(
        "Add the key at {} and press Enter to continue",
        ctx.config.ssh.registration_url
    ))
}

fn verify_connection(ctx: &RunContext, keys: &KeyPair) -> Result<(), ProvisionError> {
    let host = &ctx.config.ssh.host;
    if ctx.dry_run() {
        emit(
            Level::Info,
            "credentials.verify.dry_run",
            &format!("[DRY RUN] Would verify SSH access to {}", host),
            None,
        );
        return Ok(());
    }

    let probe = CommandSpec::new("ssh").args([
        "-T".to_string(),
        "-o".to_string(),
        "StrictHostKeyChecking=accept-new".to_string(),
        "-i".to_string(),
        keys.private_key.display().to_string(),
        host.clone(),
    ]);
    // GitHub exits 1 even on success, so only the banner counts
    let verified = match ctx.runner.capture(&probe) {
        Ok(output) => output.combined().contains(AUTH_BANNER),
        Err(e) => {
            emit(
                Level::Debug,
                "credentials.verify.error",
                &format!("{:#}", e),
                None,
            );
            false
        }
    };

    if verified {
        emit(
            Level::Success,
            "credentials.verify.ok",
            &format!("SSH authentication to {} works", host),
            None,
        );
        return Ok(());
    }

    emit(
        Level::Warn,
        "credentials.verify.failed",
        &format!("Could not verify SSH authentication to {}", host),
        None,
    );
    if ctx
        .prompter
        .confirm("Continue without a verified SSH connection?", false)?
    {
        Ok(())
    } else {
        Err(ProvisionError::AuthenticationAborted(host.clone()))
    }
}

fn configure_git_identity(ctx: &RunContext, email: &str) -> Result<()> {
    match ctx.config.git_user_name() {
        Some(name) => git::set_global_config(ctx.runner, "user.name", &name)?,
        None => emit(
            Level::Warn,
            "credentials.git.no_name",
            "No git user name configured and $USER is unset; leaving user.name alone",
            None,
        ),
    }
    git::set_global_config(ctx.runner, "user.email", email)?;
    emit(
        Level::Success,
        "credentials.git.identity",
        &format!("Git identity set to {}", email),
        None,
    );
    Ok(())
}

fn archive_keys(ctx: &RunContext, keys: &KeyPair) -> Result<StageOutcome> {
    let bundle = ctx
        .home
        .join(format!("ssh-keys-backup-{}.tar.gz", ctx.stamp));
    if !ctx.prompter.confirm(
        &format!("Archive the key pair to {}?", bundle.display()),
        false,
    )? {
        return Ok(StageOutcome::Completed);
    }

    let tar = CommandSpec::new("tar").args([
        "czf".to_string(),
        bundle.display().to_string(),
        "-C".to_string(),
        keys.directory().display().to_string(),
        KeyPair::file_name(&keys.private_key),
        KeyPair::file_name(&keys.public_key),
    ]);
    match ctx.runner.run(&tar) {
        Ok(()) => {
            emit(
                Level::Success,
                "credentials.archive.ok",
                &format!("Key pair archived to {}", bundle.display()),
                None,
            );
            Ok(StageOutcome::Completed)
        }
        Err(e) => Ok(StageOutcome::Failed(format!("key archive failed: {:#}", e))),
    }
}
