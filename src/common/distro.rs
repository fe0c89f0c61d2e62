use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::common::package::PackageManager;

pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Fields of an os-release file the workflow cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: String,
    pub id_like: Vec<String>,
    pub name: Option<String>,
    pub pretty_name: Option<String>,
}

impl OsRelease {
    /// Read and parse an os-release file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading OS identity from {}", path.display()))?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut release = Self::default();

        for line in content.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'');
            match key {
                "ID" => release.id = value.to_lowercase(),
                "ID_LIKE" => {
                    release.id_like = value.split_whitespace().map(str::to_lowercase).collect()
                }
                "NAME" => release.name = Some(value.to_string()),
                "PRETTY_NAME" => release.pretty_name = Some(value.to_string()),
                _ => {}
            }
        }

        release
    }

    /// Human readable name, preferring PRETTY_NAME.
    pub fn display_name(&self) -> String {
        self.pretty_name
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| self.id.clone())
    }
}

/// Represents a detected operating system with methods for family checks
/// and package manager detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatingSystem {
    /// Vanilla Arch Linux
    Arch,
    /// Manjaro Linux
    Manjaro,
    /// EndeavourOS
    EndeavourOS,
    /// Debian
    Debian,
    /// Ubuntu
    Ubuntu,
    /// Pop!_OS (Ubuntu-based)
    PopOS,
    /// Linux Mint (Ubuntu/Debian-based)
    LinuxMint,
    /// Fedora
    Fedora,
    /// CentOS
    CentOS,
    /// OpenSUSE (including Leap and Tumbleweed)
    OpenSUSE,
    /// Unknown distribution with ID
    Unknown(String),
}

impl OperatingSystem {
    pub fn from_release(release: &OsRelease) -> Self {
        match release.id.as_str() {
            "arch" => Self::Arch,
            "manjaro" => Self::Manjaro,
            "endeavouros" => Self::EndeavourOS,
            "debian" => Self::Debian,
            "ubuntu" => Self::Ubuntu,
            "pop" => Self::PopOS,
            "linuxmint" => Self::LinuxMint,
            "fedora" => Self::Fedora,
            "centos" => Self::CentOS,
            "opensuse" | "opensuse-leap" | "opensuse-tumbleweed" => Self::OpenSUSE,
            _ => {
                // For unknown IDs, check ID_LIKE for family detection
                let like = |family: &str| release.id_like.iter().any(|l| l == family);
                if like("arch") {
                    Self::Arch
                } else if like("ubuntu") {
                    Self::Ubuntu
                } else if like("debian") {
                    Self::Debian
                } else if like("fedora") || like("rhel") {
                    Self::Fedora
                } else {
                    Self::Unknown(release.id.clone())
                }
            }
        }
    }

    /// Returns the parent OS that this distribution is based on.
    /// Returns `None` for root distributions (Arch, Debian, Fedora, etc.)
    /// and for Unknown.
    pub fn based_on(&self) -> Option<Self> {
        match self {
            Self::Manjaro | Self::EndeavourOS => Some(Self::Arch),
            Self::PopOS | Self::LinuxMint => Some(Self::Ubuntu),
            Self::Ubuntu => Some(Self::Debian),
            Self::CentOS => Some(Self::Fedora),
            Self::Arch | Self::Debian | Self::Fedora | Self::OpenSUSE | Self::Unknown(_) => None,
        }
    }

    /// Check if this OS is Arch-based (uses pacman)
    pub fn is_arch_based(&self) -> bool {
        *self == Self::Arch || self.based_on().is_some_and(|p| p.is_arch_based())
    }

    /// Check if this OS is Debian-based (uses apt)
    pub fn is_debian_based(&self) -> bool {
        *self == Self::Debian || self.based_on().is_some_and(|p| p.is_debian_based())
    }

    /// Check if this OS is Fedora-based (uses dnf)
    pub fn is_fedora_based(&self) -> bool {
        *self == Self::Fedora || self.based_on().is_some_and(|p| p.is_fedora_based())
    }

    /// Native package manager, or `None` for distributions this tool
    /// cannot provision.
    pub fn package_manager(&self) -> Option<PackageManager> {
        if self.is_arch_based() {
            Some(PackageManager::Pacman)
        } else if self.is_debian_based() {
            Some(PackageManager::Apt)
        } else if self.is_fedora_based() {
            Some(PackageManager::Dnf)
        } else {
            None
        }
    }

    /// Short machine-readable identifier.
    pub fn id(&self) -> &str {
        match self {
            Self::Arch => "arch",
            Self::Manjaro => "manjaro",
            Self::EndeavourOS => "endeavouros",
            Self::Debian => "debian",
            Self::Ubuntu => "ubuntu",
            Self::PopOS => "pop",
            Self::LinuxMint => "linuxmint",
            Self::Fedora => "fedora",
            Self::CentOS => "centos",
            Self::OpenSUSE => "opensuse",
            Self::Unknown(id) => id,
        }
    }

    /// Get the display name of the operating system
    pub fn name(&self) -> &str {
        match self {
            Self::Arch => "Arch Linux",
            Self::Manjaro => "Manjaro",
            Self::EndeavourOS => "EndeavourOS",
            Self::Debian => "Debian",
            Self::Ubuntu => "Ubuntu",
            Self::PopOS => "Pop!_OS",
            Self::LinuxMint => "Linux Mint",
            Self::Fedora => "Fedora",
            Self::CentOS => "CentOS",
            Self::OpenSUSE => "openSUSE",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl std::fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(name) => write!(f, "Unknown ({})", name),
            _ => write!(f, "{}", self.name()),
        }
    }
}
