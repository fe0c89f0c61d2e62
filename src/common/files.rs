use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::common::exec::{CommandRunner, CommandSpec};

/// Copy `from` to `to`, going through `sudo cp` when the direct copy is
/// not permitted.
pub fn copy_privileged(runner: &dyn CommandRunner, from: &Path, to: &Path) -> Result<()> {
    let sudo_cp = CommandSpec::sudo("cp").args([
        from.display().to_string(),
        to.display().to_string(),
    ]);

    if runner.dry_run() {
        return runner.run(&sudo_cp);
    }

    match fs::copy(from, to) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => runner
            .run(&sudo_cp)
            .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display())),
        Err(e) => Err(e)
            .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display())),
    }
}

pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}
