use super::{RunContext, StageOutcome};
use crate::common::package::{install_plan, plan_for};
use crate::error::ProvisionError;
use crate::ui::prelude::*;

pub fn install(ctx: &RunContext) -> Result<StageOutcome, ProvisionError> {
    let Some(plan) = plan_for(&ctx.profile.distro, &ctx.config.packages.extra) else {
        let id = ctx.profile.distro.id();
        emit(
            Level::Error,
            "packages.unsupported",
            &format!(
                "No package plan for '{}'; install your applications manually",
                id
            ),
            None,
        );
        return Ok(StageOutcome::Failed(format!(
            "unsupported distribution {}",
            id
        )));
    };

    emit(
        Level::Debug,
        "packages.plan",
        &format!(
            "{}: {} package(s), {} extra step(s)",
            plan.manager,
            plan.packages.len(),
            plan.extra_steps.len()
        ),
        None,
    );

    match install_plan(&plan, ctx.runner) {
        Ok(()) => Ok(StageOutcome::Completed),
        Err(e) => Ok(StageOutcome::Failed(format!("{:#}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::distro::OperatingSystem;
    use crate::testing::{RecordingRunner, ScriptedPrompter, TestHost};

    #[test]
    fn every_supported_family_gets_a_plan() {
        for os in [
            OperatingSystem::Arch,
            OperatingSystem::Ubuntu,
            OperatingSystem::LinuxMint,
            OperatingSystem::Fedora,
        ] {
            let host = TestHost::new();
            let runner = RecordingRunner::new().with_program("code");
            let prompter = ScriptedPrompter::accepting();
            let outcome = install(&host.context(os.clone(), &runner, &prompter)).unwrap();
            assert_eq!(outcome, StageOutcome::Completed, "{os}");
        }
    }

    #[test]
    fn unsupported_family_is_reported_without_commands() {
        let host = TestHost::new();
        let runner = RecordingRunner::new();
        let prompter = ScriptedPrompter::accepting();

        let outcome = install(&host.context(
            OperatingSystem::Unknown("void".to_string()),
            &runner,
            &prompter,
        ))
        .unwrap();

        assert_eq!(
            outcome,
            StageOutcome::Failed("unsupported distribution void".to_string())
        );
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn configured_extras_reach_the_install_command() {
        let mut host = TestHost::new();
        host.config.packages.extra = vec!["neovim".to_string()];
        let runner = RecordingRunner::new();
        let prompter = ScriptedPrompter::accepting();

        install(&host.context(OperatingSystem::Fedora, &runner, &prompter)).unwrap();

        let lines = runner.command_lines();
        assert!(lines[1].starts_with("sudo dnf install -y"));
        assert!(lines[1].ends_with(" neovim"));
    }

    #[test]
    fn install_failure_is_recoverable() {
        let host = TestHost::new();
        let runner = RecordingRunner::new().failing("sudo pacman -S ");
        let prompter = ScriptedPrompter::accepting();

        let outcome = install(&host.context(OperatingSystem::Arch, &runner, &prompter)).unwrap();

        assert!(matches!(outcome, StageOutcome::Failed(reason) if reason.contains("Pacman")));
    }
}
