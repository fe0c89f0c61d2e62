//! Capability table: which packages each distro family gets and how.

use super::PackageManager;
use crate::common::distro::OperatingSystem;

/// A third-party apt repository providing a single application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AptSource {
    /// Display name
    pub name: &'static str,
    /// Binary whose presence on PATH means the application is installed
    pub binary: &'static str,
    pub package: &'static str,
    /// ASCII-armored signing key
    pub key_url: &'static str,
    /// Where the dearmored key is installed
    pub keyring: &'static str,
    pub list_file: &'static str,
    /// Repository URL and components, without the `deb [options]` prefix
    pub repository: &'static str,
    pub architectures: &'static str,
}

impl AptSource {
    /// The line written to `list_file`.
    pub fn source_line(&self) -> String {
        format!(
            "deb [arch={} signed-by={}] {}\n",
            self.architectures, self.keyring, self.repository
        )
    }
}

pub static VSCODE: AptSource = AptSource {
    name: "Visual Studio Code",
    binary: "code",
    package: "code",
    key_url: "https://packages.microsoft.com/keys/microsoft.asc",
    keyring: "/etc/apt/keyrings/packages.microsoft.gpg",
    list_file: "/etc/apt/sources.list.d/vscode.list",
    repository: "https://packages.microsoft.com/repos/code stable main",
    architectures: "amd64,arm64,armhf",
};

/// Optional action run after the main install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraStep {
    /// Install an application from a third-party apt repository unless it is
    /// already installed.
    AptThirdParty(&'static AptSource),
}

impl ExtraStep {
    pub fn describe(&self) -> String {
        match self {
            Self::AptThirdParty(source) => format!("{} from {}", source.name, source.repository),
        }
    }
}

const APT_PACKAGES: &[&str] = &[
    "git",
    "curl",
    "wget",
    "vim",
    "htop",
    "tree",
    "unzip",
    "build-essential",
    "python3-pip",
    "flatpak",
    "vlc",
    "gimp",
];

const PACMAN_PACKAGES: &[&str] = &[
    "git",
    "curl",
    "wget",
    "vim",
    "htop",
    "tree",
    "unzip",
    "base-devel",
    "python-pip",
    "flatpak",
    "vlc",
    "gimp",
    "code",
];

const DNF_PACKAGES: &[&str] = &[
    "git",
    "curl",
    "wget",
    "vim-enhanced",
    "htop",
    "tree",
    "unzip",
    "gcc",
    "make",
    "python3-pip",
    "flatpak",
    "gimp",
];

/// Everything the package stage does for one distro family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePlan {
    pub manager: PackageManager,
    pub packages: Vec<String>,
    pub extra_steps: Vec<ExtraStep>,
}

/// Look up the plan for `os`, appending `extra` packages.
///
/// Returns `None` when the distribution has no supported package manager.
pub fn plan_for(os: &OperatingSystem, extra: &[String]) -> Option<PackagePlan> {
    let manager = os.package_manager()?;
    let (base, extra_steps): (&[&str], Vec<ExtraStep>) = match manager {
        PackageManager::Apt => (APT_PACKAGES, vec![ExtraStep::AptThirdParty(&VSCODE)]),
        PackageManager::Pacman => (PACMAN_PACKAGES, Vec::new()),
        PackageManager::Dnf => (DNF_PACKAGES, Vec::new()),
    };

    let mut packages: Vec<String> = base.iter().map(|p| p.to_string()).collect();
    for package in extra {
        if !packages.contains(package) {
            packages.push(package.clone());
        }
    }

    Some(PackagePlan {
        manager,
        packages,
        extra_steps,
    })
}
