use colored::*;
use dialoguer::{Confirm, Input, Password, Select};

use crate::Result;

/// Validation callback for free-text answers. `Err` carries the message shown
/// to the user before asking again.
pub type Validator<'a> = &'a dyn Fn(&str) -> std::result::Result<(), String>;

/// Asks the user questions.
///
/// Implementations re-prompt until an answer passes validation; they never
/// correct an answer on the user's behalf.
pub trait Prompter {
    /// Single choice among `items`; returns the chosen item.
    fn select(&self, prompt: &str, help: &str, items: &[String]) -> Result<String>;

    fn input(&self, prompt: &str, default: Option<&str>, validate: Validator<'_>) -> Result<String>;

    fn password(&self, prompt: &str) -> Result<String>;

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;
}

/// Validator accepting any non-empty answer.
pub fn required(answer: &str) -> std::result::Result<(), String> {
    if answer.trim().is_empty() {
        Err("a value is required".to_string())
    } else {
        Ok(())
    }
}

/// [`Prompter`] backed by the terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for TerminalPrompter {
    fn select(&self, prompt: &str, help: &str, items: &[String]) -> Result<String> {
        if !help.is_empty() {
            println!("{}", help.dimmed());
        }
        let selection = Select::new()
            .with_prompt(prompt)
            .default(0)
            .items(items)
            .interact()?;
        Ok(items[selection].clone())
    }

    fn input(&self, prompt: &str, default: Option<&str>, validate: Validator<'_>) -> Result<String> {
        let mut input = Input::<String>::new()
            .with_prompt(prompt)
            .validate_with(|answer: &String| validate(answer.as_str()));
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?.trim().to_string())
    }

    fn password(&self, prompt: &str) -> Result<String> {
        Ok(Password::new().with_prompt(prompt).interact()?)
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        Ok(Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }
}
