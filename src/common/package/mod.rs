//! Native package management for the supported distro families.
//!
//! - [`PackageManager`]: apt, pacman or dnf, and the command lines each uses
//! - [`PackagePlan`]: capability table entry (package list + extra steps)
//! - [`install_plan`]: the one routine that executes any plan

mod install;
mod manager;
mod plan;

pub use install::{install_plan, install_single};
pub use manager::PackageManager;
pub use plan::plan_for;
