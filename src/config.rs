//! User configuration (`~/.config/postinst/config.toml`).
//!
//! Every section is `#[serde(default)]` so a partial file only overrides
//! what it names.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::paths;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub repository: RepositoryConfig,
    pub ssh: SshConfig,
    pub git: GitConfig,
    pub boot: BootConfig,
    pub packages: PackagesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Remote of the personal backup repository
    pub url: String,
    /// Local checkout
    pub path: String,
    /// Branches tried in order when updating an existing checkout
    pub branches: Vec<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        let user = std::env::var("USER").unwrap_or_else(|_| "user".to_string());
        Self {
            url: format!("git@github.com:{}/linux-backup.git", user),
            path: "~/linux-backup".to_string(),
            branches: vec!["main".to_string(), "master".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub key_path: String,
    /// Target of the authentication probe
    pub host: String,
    /// Where the public key has to be registered
    pub registration_url: String,
    /// Key comment and git email; asked for when unset
    pub email: Option<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            key_path: "~/.ssh/id_ed25519".to_string(),
            host: "git@github.com".to_string(),
            registration_url: "https://github.com/settings/keys".to_string(),
            email: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// `user.name`; falls back to $USER
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootConfig {
    /// Path of the GRUB defaults file inside the repository
    pub source: String,
    pub destination: String,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            source: "grub/grub".to_string(),
            destination: "/etc/default/grub".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagesConfig {
    /// Appended to the distro's package list
    pub extra: Vec<String>,
}

impl Config {
    /// Load `path`, or the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.repository.url.trim().is_empty() {
            bail!("repository.url must not be empty");
        }
        if self.repository.branches.is_empty() {
            bail!("repository.branches must name at least one branch");
        }
        if self.ssh.host.trim().is_empty() {
            bail!("ssh.host must not be empty");
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serializing config")
    }

    /// Write the configuration, refusing to replace an existing file.
    pub fn write_new(&self, path: &Path) -> Result<()> {
        if path.exists() {
            bail!("{} already exists", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }
        fs::write(path, self.to_toml()?)
            .with_context(|| format!("writing config to {}", path.display()))?;
        Ok(())
    }

    pub fn repository_path(&self) -> PathBuf {
        paths::expand(&self.repository.path)
    }

    pub fn private_key_path(&self) -> PathBuf {
        paths::expand(&self.ssh.key_path)
    }

    pub fn boot_destination(&self) -> PathBuf {
        paths::expand(&self.boot.destination)
    }

    pub fn git_user_name(&self) -> Option<String> {
        self.git
            .user_name
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .filter(|name| !name.trim().is_empty())
    }
}
