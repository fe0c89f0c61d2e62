pub mod distro;
pub mod exec;
pub mod files;
pub mod git;
pub mod package;
pub mod paths;
pub mod shell;
