//! User interaction behind a trait so the workflow can run unattended.

use anyhow::{Context, Result, bail};
use dialoguer::{Confirm, Input};

pub trait Prompter {
    /// Ask a yes/no question.
    fn confirm(&self, question: &str, default: bool) -> Result<bool>;

    /// Ask for a line of free text.
    fn input(&self, question: &str, default: Option<&str>) -> Result<String>;

    /// Show `message` and block until the user acknowledges it.
    fn acknowledge(&self, message: &str) -> Result<()>;
}

/// Interactive terminal prompts.
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn confirm(&self, question: &str, default: bool) -> Result<bool> {
        Confirm::new()
            .with_prompt(question)
            .default(default)
            .interact()
            .context("Failed to read confirmation")
    }

    fn input(&self, question: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::new().with_prompt(question);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input.interact_text().context("Failed to read input")
    }

    fn acknowledge(&self, message: &str) -> Result<()> {
        Input::<String>::new()
            .with_prompt(message)
            .allow_empty(true)
            .interact_text()
            .context("Failed to read acknowledgement")?;
        Ok(())
    }
}

/// Answers yes to everything (`--yes`).
///
/// Free-text questions fall back to their default; a question without one
/// cannot be answered unattended and fails.
pub struct AssumeYes;

impl Prompter for AssumeYes {
    fn confirm(&self, _question: &str, _default: bool) -> Result<bool> {
        Ok(true)
    }

    fn input(&self, question: &str, default: Option<&str>) -> Result<String> {
        match default {
            Some(value) => Ok(value.to_string()),
            None => bail!("'{}' needs an answer; set it in the configuration file", question),
        }
    }

    fn acknowledge(&self, _message: &str) -> Result<()> {
        Ok(())
    }
}
