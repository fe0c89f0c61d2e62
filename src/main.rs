mod common;
mod config;
mod error;
mod prompt;
mod provision;
mod ui;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::common::distro::OS_RELEASE_PATH;
use crate::common::exec::SystemRunner;
use crate::common::package::plan_for;
use crate::common::paths;
use crate::config::Config;
use crate::error::ProvisionError;
use crate::prompt::{AssumeYes, DialoguerPrompter, Prompter};
use crate::provision::{Stage, Workflow, detect};
use crate::ui::prelude::*;

/// Provision a freshly installed Linux system from a personal backup repository
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format for events
    #[arg(long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    /// Configuration file (defaults to ~/.config/postinst/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// OS identity file
    #[arg(long, global = true, value_name = "PATH", default_value = OS_RELEASE_PATH)]
    os_release: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the provisioning workflow (default)
    Run(RunArgs),

    /// Print the detected system and the package plan for it
    Detect,

    /// Configuration file commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Print commands instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Answer yes to every confirmation
    #[arg(short, long)]
    yes: bool,

    /// Only offer these stages (repeatable)
    #[arg(long = "stage", value_enum, value_name = "STAGE")]
    stages: Vec<Stage>,

    /// Override the backup repository URL
    #[arg(long, value_name = "URL")]
    repo_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Write the default configuration file
    Init,
    /// Print the configuration file path
    Path,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    ui::set_debug_mode(cli.debug);
    ui::init(cli.format, std::io::stdout().is_terminal());

    let result = match &cli.command {
        None => run_workflow(&cli, &RunArgs::default()),
        Some(Commands::Run(args)) => run_workflow(&cli, args),
        Some(Commands::Detect) => show_detection(&cli.os_release).map(|()| ExitCode::SUCCESS),
        Some(Commands::Config { command }) => {
            handle_config_command(&cli, command).map(|()| ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            emit(Level::Error, "error", &format!("Error: {:#}", e), None);
            ExitCode::FAILURE
        }
    }
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => paths::config_file(),
    }
}

fn run_workflow(cli: &Cli, args: &RunArgs) -> Result<ExitCode> {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
    let log_path = paths::run_log_file(&stamp);
    if let Err(e) = ui::open_run_log(&log_path) {
        emit(
            Level::Warn,
            "log.unavailable",
            &format!("Could not open log file {}: {}", log_path.display(), e),
            None,
        );
    }

    let mut config = Config::load(&config_path(cli)?)?;
    if let Some(url) = &args.repo_url {
        config.repository.url = url.clone();
    }

    let runner = SystemRunner::new(args.dry_run);
    let prompter: Box<dyn Prompter> = if args.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(DialoguerPrompter)
    };

    let workflow = Workflow {
        os_release: cli.os_release.clone(),
        running_as_root: matches!(sudo::check(), sudo::RunningAs::Root),
        stages: args.stages.clone(),
        config: &config,
        runner: &runner,
        prompter: prompter.as_ref(),
        stamp,
        home: paths::home_dir()?,
    };

    match workflow.run() {
        Ok(report) => {
            report.print();
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            emit(Level::Error, "provision.fatal", &fatal_message(&e), None);
            if let Some(log) = ui::run_log_path() {
                emit(
                    Level::Error,
                    "provision.log",
                    &format!("See log: {}", log.display()),
                    None,
                );
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Full cause chain, so the failing command line is not lost.
fn fatal_message(err: &ProvisionError) -> String {
    format!("Error: {:#}", err)
}

fn show_detection(os_release: &Path) -> Result<()> {
    let running_as_root = matches!(sudo::check(), sudo::RunningAs::Root);
    let profile = detect::read_profile(os_release, running_as_root)?;
    detect::print_profile(&profile);

    if which::which("sudo").is_err() {
        emit(Level::Warn, "detect.sudo.missing", "sudo is not installed", None);
    }
    if profile.is_privileged_user {
        emit(
            Level::Warn,
            "detect.root",
            "Running as root; the workflow must be started as a regular user",
            None,
        );
    }

    match plan_for(&profile.distro, &[]) {
        Some(plan) => {
            let steps: Vec<String> = plan.extra_steps.iter().map(|s| s.describe()).collect();
            let mut message = format!(
                "  {:<18} {}",
                "Packages:",
                plan.packages.join(" ")
            );
            for step in &steps {
                message.push_str(&format!("\n  {:<18} {}", "Extra step:", step));
            }
            emit(
                Level::Info,
                "detect.plan",
                &message,
                Some(serde_json::json!({
                    "manager": plan.manager.to_string(),
                    "packages": plan.packages,
                    "extra_steps": steps,
                })),
            );
        }
        None => emit(
            Level::Warn,
            "detect.plan.unsupported",
            &format!("No package plan for '{}'", profile.distro.id()),
            None,
        ),
    }
    Ok(())
}

fn handle_config_command(cli: &Cli, command: &ConfigCommands) -> Result<()> {
    let path = config_path(cli)?;
    match command {
        ConfigCommands::Show => {
            let config = Config::load(&path)?;
            match get_output_format() {
                OutputFormat::Json => emit(
                    Level::Info,
                    "config.show",
                    &path.display().to_string(),
                    Some(serde_json::to_value(&config).context("serializing config")?),
                ),
                OutputFormat::Text => print!("{}", config.to_toml()?),
            }
        }
        ConfigCommands::Init => {
            Config::default().write_new(&path)?;
            emit(
                Level::Success,
                "config.init",
                &format!("Wrote {}", path.display()),
                None,
            );
        }
        ConfigCommands::Path => println!("{}", path.display()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn stages_are_repeatable() {
        let cli = Cli::parse_from([
            "postinst",
            "run",
            "--stage",
            "boot",
            "--stage",
            "packages",
            "--dry-run",
        ]);
        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.stages, vec![Stage::Boot, Stage::Packages]);
                assert!(args.dry_run);
                assert!(!args.yes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::parse_from(["postinst", "detect", "--os-release", "/tmp/os-release", "-d"]);
        assert!(cli.debug);
        assert_eq!(cli.os_release, PathBuf::from("/tmp/os-release"));
    }

    #[test]
    fn fatal_message_keeps_the_failing_command() {
        let err: ProvisionError = anyhow::anyhow!("Command failed: sudo apt install -y git")
            .context("Failed to install git with APT")
            .into();
        let message = fatal_message(&err);
        assert!(message.starts_with("Error: Failed to install git with APT"));
        assert!(message.contains("Command failed: sudo apt install -y git"));
    }

    #[test]
    fn no_subcommand_defaults_to_run() {
        let cli = Cli::parse_from(["postinst"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.os_release, PathBuf::from(OS_RELEASE_PATH));
    }
}
