use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop the whole run.
///
/// Recoverable problems are not errors; stages report them through
/// [`crate::provision::StageOutcome::Failed`].
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("OS identity file not found at {}", .0.display())]
    MissingOsRelease(PathBuf),

    #[error("refusing to run as root; run as a regular user with sudo access")]
    RunningAsRoot,

    #[error("sudo is not usable: {0}")]
    SudoUnavailable(String),

    #[error("cannot install git: unsupported distribution '{0}'")]
    UnsupportedDistro(String),

    #[error(
        "failed to clone {url}: {detail}\n  \
         - check that the repository exists\n  \
         - check that your account has access to it\n  \
         - check that your SSH key is registered with the host"
    )]
    CloneFailed { url: String, detail: String },

    #[error("aborted: SSH authentication to {0} could not be verified")]
    AuthenticationAborted(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_failure_lists_hints() {
        let err = ProvisionError::CloneFailed {
            url: "git@github.com:me/backup.git".to_string(),
            detail: "exit status 128".to_string(),
        };
        let message = err.to_string();
        assert!(message.starts_with("failed to clone git@github.com:me/backup.git: exit status 128"));
        assert!(message.contains("repository exists"));
        assert!(message.contains("SSH key is registered"));
    }

    #[test]
    fn other_is_transparent() {
        let err: ProvisionError = anyhow::anyhow!("ssh-keygen exploded").into();
        assert_eq!(err.to_string(), "ssh-keygen exploded");
    }
}
