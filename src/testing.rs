//! Test doubles for the command runner and prompter.

use anyhow::{Result, bail};
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};

use crate::common::distro::OperatingSystem;
use crate::common::exec::{CommandOutput, CommandRunner, CommandSpec};
use crate::config::Config;
use crate::prompt::Prompter;
use crate::provision::{RunContext, SystemProfile};

pub const STAMP: &str = "20260101-120000";

/// A throwaway home directory with every configured path pointing into it.
pub struct TestHost {
    pub dir: tempfile::TempDir,
    pub config: Config,
}

impl TestHost {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.repository.url = "git@github.com:me/linux-backup.git".to_string();
        config.repository.path = dir.path().join("linux-backup").display().to_string();
        config.ssh.key_path = dir.path().join(".ssh/id_ed25519").display().to_string();
        config.boot.destination = dir.path().join("etc/default/grub").display().to_string();
        Self { dir, config }
    }

    pub fn context<'a>(
        &'a self,
        distro: OperatingSystem,
        runner: &'a RecordingRunner,
        prompter: &'a ScriptedPrompter,
    ) -> RunContext<'a> {
        RunContext {
            profile: SystemProfile {
                distro_name: distro.name().to_string(),
                distro,
                is_privileged_user: false,
                has_sudo: true,
            },
            config: &self.config,
            runner,
            prompter,
            stamp: STAMP.to_string(),
            home: self.dir.path().to_path_buf(),
        }
    }
}

/// Records every command instead of running it.
///
/// Commands whose rendered line starts with a `failing` prefix fail; captured
/// commands return the first matching canned output, or an empty success.
#[derive(Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<CommandSpec>>,
    failing: Vec<String>,
    outputs: Vec<(String, CommandOutput)>,
    programs: HashSet<String>,
    dry_run: bool,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: &str) -> Self {
        self.programs.insert(program.to_string());
        self
    }

    pub fn failing(mut self, prefix: &str) -> Self {
        self.failing.push(prefix.to_string());
        self
    }

    pub fn with_output(mut self, prefix: &str, stdout: &str, stderr: &str, exit_code: i32) -> Self {
        self.outputs.push((
            prefix.to_string(),
            CommandOutput {
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                exit_code,
            },
        ));
        self
    }

    pub fn dry(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(CommandSpec::command_line).collect()
    }

    pub fn ran(&self, prefix: &str) -> bool {
        self.command_lines().iter().any(|c| c.starts_with(prefix))
    }

    fn fails(&self, line: &str) -> bool {
        self.failing.iter().any(|prefix| line.starts_with(prefix))
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, spec: &CommandSpec) -> Result<()> {
        self.calls.borrow_mut().push(spec.clone());
        let line = spec.command_line();
        if self.fails(&line) {
            bail!("Command failed: {}", line);
        }
        Ok(())
    }

    fn capture(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(spec.clone());
        let line = spec.command_line();
        if let Some((_, output)) = self.outputs.iter().find(|(p, _)| line.starts_with(p)) {
            return Ok(output.clone());
        }
        if self.fails(&line) {
            return Ok(CommandOutput {
                exit_code: 1,
                ..CommandOutput::default()
            });
        }
        Ok(CommandOutput::default())
    }

    fn program_exists(&self, program: &str) -> bool {
        self.programs.contains(program)
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Replays scripted answers and records what was asked.
pub struct ScriptedPrompter {
    confirms: RefCell<VecDeque<bool>>,
    texts: RefCell<VecDeque<String>>,
    fallback: bool,
    pub questions: RefCell<Vec<String>>,
    pub acknowledged: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    /// Answers `answers` in order, then `fallback` for anything further.
    pub fn new(answers: &[bool], fallback: bool) -> Self {
        Self {
            confirms: RefCell::new(answers.iter().copied().collect()),
            texts: RefCell::new(VecDeque::new()),
            fallback,
            questions: RefCell::new(Vec::new()),
            acknowledged: RefCell::new(Vec::new()),
        }
    }

    pub fn declining() -> Self {
        Self::new(&[], false)
    }

    pub fn accepting() -> Self {
        Self::new(&[], true)
    }

    pub fn with_text(self, text: &str) -> Self {
        self.texts.borrow_mut().push_back(text.to_string());
        self
    }

    pub fn asked(&self, fragment: &str) -> bool {
        self.questions.borrow().iter().any(|q| q.contains(fragment))
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, question: &str, _default: bool) -> Result<bool> {
        self.questions.borrow_mut().push(question.to_string());
        Ok(self.confirms.borrow_mut().pop_front().unwrap_or(self.fallback))
    }

    fn input(&self, question: &str, default: Option<&str>) -> Result<String> {
        self.questions.borrow_mut().push(question.to_string());
        match self.texts.borrow_mut().pop_front() {
            Some(text) => Ok(text),
            None => match default {
                Some(d) => Ok(d.to_string()),
                None => bail!("no scripted answer for '{}'", question),
            },
        }
    }

    fn acknowledge(&self, message: &str) -> Result<()> {
        self.acknowledged.borrow_mut().push(message.to_string());
        Ok(())
    }
}
