//! External command execution.
//!
//! Every tool the workflow drives (git, ssh, package managers, grub) goes
//! through a [`CommandRunner`] so callers get an explicit result back and
//! decide themselves whether a failure is fatal, reported or ignored.

use anyhow::{Context, Result};
use duct::cmd;

use crate::common::shell::shell_quote;
use crate::ui::prelude::*;

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            stdin: None,
        }
    }

    /// Run `program` through sudo.
    pub fn sudo(program: impl Into<String>) -> Self {
        Self::new("sudo").arg(program)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Shell-style rendering used for logs, dry runs and error messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn to_expression(&self) -> duct::Expression {
        let mut expr = cmd(self.program.as_str(), &self.args);
        for (key, value) in &self.env {
            expr = expr.env(key, value);
        }
        if let Some(input) = &self.stdin {
            expr = expr.stdin_bytes(input.as_bytes().to_vec());
        }
        expr
    }
}

/// Captured result of a command that was allowed to fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr, for tools that report on either stream.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

pub trait CommandRunner {
    /// Run with inherited stdio; a non-zero exit status is an error.
    fn run(&self, spec: &CommandSpec) -> Result<()>;

    /// Run capturing stdout and stderr; a non-zero exit status is not an error.
    fn capture(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Whether `program` resolves on PATH.
    fn program_exists(&self, program: &str) -> bool;

    /// True when commands are only printed, never executed.
    fn dry_run(&self) -> bool {
        false
    }
}

/// Runs commands on the host via duct.
pub struct SystemRunner {
    pub dry_run: bool,
}

impl SystemRunner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    fn print_dry_run(&self, spec: &CommandSpec) {
        let line = match &spec.stdin {
            Some(input) if !input.contains('\n') => {
                format!("echo {} | {}", shell_quote(input), spec.command_line())
            }
            Some(input) => format!("{} <<'EOF'\n{}\nEOF", spec.command_line(), input.trim()),
            None => spec.command_line(),
        };
        emit(Level::Info, "exec.dry_run", &format!("[DRY RUN] {}", line), None);
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<()> {
        if self.dry_run {
            self.print_dry_run(spec);
            return Ok(());
        }
        emit(Level::Debug, "exec.run", &format!("$ {}", spec.command_line()), None);
        spec.to_expression()
            .run()
            .with_context(|| format!("Command failed: {}", spec.command_line()))?;
        Ok(())
    }

    fn capture(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        if self.dry_run {
            self.print_dry_run(spec);
            return Ok(CommandOutput::default());
        }
        emit(Level::Debug, "exec.capture", &format!("$ {}", spec.command_line()), None);
        let output = spec
            .to_expression()
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .with_context(|| format!("Failed to execute {}", spec.program))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    fn program_exists(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }
}
