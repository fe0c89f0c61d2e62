//! Package manager enum and the command lines each one uses.

use crate::common::exec::CommandSpec;

/// The native package managers this tool can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageManager {
    /// Pacman - Arch Linux family
    Pacman,
    /// APT - Debian/Ubuntu family
    Apt,
    /// DNF - Fedora/RHEL family
    Dnf,
}

impl PackageManager {
    /// Refresh the package index.
    pub fn update_command(&self) -> CommandSpec {
        match self {
            Self::Pacman => CommandSpec::sudo("pacman").args(["-Syu", "--noconfirm"]),
            Self::Apt => CommandSpec::sudo("apt").arg("update"),
            // check-update exits 100 when updates exist, makecache does not
            Self::Dnf => CommandSpec::sudo("dnf").arg("makecache"),
        }
    }

    /// Get the install command prefix for this package manager.
    ///
    /// Returns the program and base arguments used to install packages.
    pub fn install_prefix(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::Pacman => ("pacman", &["-S", "--needed", "--noconfirm"]),
            Self::Apt => ("apt", &["install", "-y"]),
            Self::Dnf => ("dnf", &["install", "-y"]),
        }
    }

    /// Install `packages` in one invocation.
    pub fn install_command<S: AsRef<str>>(&self, packages: &[S]) -> CommandSpec {
        let (program, base_args) = self.install_prefix();
        CommandSpec::sudo(program)
            .args(base_args.iter().copied())
            .args(packages.iter().map(|p| p.as_ref().to_string()))
    }

    /// Regenerate the GRUB configuration after /etc/default/grub changed.
    pub fn grub_regenerate_command(&self) -> CommandSpec {
        match self {
            Self::Apt => CommandSpec::sudo("update-grub"),
            Self::Pacman => CommandSpec::sudo("grub-mkconfig").args(["-o", "/boot/grub/grub.cfg"]),
            Self::Dnf => {
                CommandSpec::sudo("grub2-mkconfig").args(["-o", "/boot/grub2/grub.cfg"])
            }
        }
    }

    /// Get a human-readable name for this package manager.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pacman => "Pacman",
            Self::Apt => "APT",
            Self::Dnf => "DNF",
        }
    }
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_command() {
        assert_eq!(
            PackageManager::Pacman
                .install_command(&["git", "code"])
                .command_line(),
            "sudo pacman -S --needed --noconfirm git code"
        );
        assert_eq!(
            PackageManager::Apt.install_command(&["git"]).command_line(),
            "sudo apt install -y git"
        );
        assert_eq!(
            PackageManager::Dnf.install_command(&["git"]).command_line(),
            "sudo dnf install -y git"
        );
    }

    #[test]
    fn test_update_command() {
        assert_eq!(
            PackageManager::Apt.update_command().command_line(),
            "sudo apt update"
        );
        assert_eq!(
            PackageManager::Pacman.update_command().command_line(),
            "sudo pacman -Syu --noconfirm"
        );
        assert_eq!(
            PackageManager::Dnf.update_command().command_line(),
            "sudo dnf makecache"
        );
    }

    #[test]
    fn test_grub_regenerate_command() {
        assert_eq!(
            PackageManager::Apt.grub_regenerate_command().command_line(),
            "sudo update-grub"
        );
        assert!(
            PackageManager::Dnf
                .grub_regenerate_command()
                .command_line()
                .contains("grub2-mkconfig")
        );
    }

    #[test]
    fn test_display_name() {
        assert_eq!(PackageManager::Pacman.display_name(), "Pacman");
        assert_eq!(PackageManager::Apt.display_name(), "APT");
        assert_eq!(PackageManager::Dnf.to_string(), "DNF");
    }
}
