//! Interactive questions asked to the operator.
//!
//! Validation happens here, at the prompt: invalid answers are rejected and
//! the question is asked again, so empty or malformed input never reaches the
//! transport.

use dialoguer::{Confirm, Input, Password, Select};

use crate::tools::errors::PromptError;

/// Validator applied to free-text answers
pub type Validator<'a> = &'a dyn Fn(&str) -> Result<(), String>;

pub trait Prompter {
    /// Ask for a line of text, re-asking until `validate` accepts it
    fn text(
        &mut self,
        prompt: &str,
        default: Option<&str>,
        validate: Validator<'_>,
    ) -> Result<String, PromptError>;

    /// Ask for a secret; input is never echoed and empty answers are refused
    fn secret(&mut self, prompt: &str) -> Result<String, PromptError>;

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, PromptError>;

    /// Pick one item; `None` when the operator escapes out of the list
    fn select(&mut self, prompt: &str, items: &[String]) -> Result<Option<usize>, PromptError>;

    /// Wait for the operator to press enter
    fn pause(&mut self, message: &str) -> Result<(), PromptError>;
}

/// Prompter backed by dialoguer on the controlling terminal
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn text(
        &mut self,
        prompt: &str,
        default: Option<&str>,
        validate: Validator<'_>,
    ) -> Result<String, PromptError> {
        let mut input = Input::<String>::new().with_prompt(prompt);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        let answer = input
            .validate_with(|answer: &String| -> Result<(), String> { validate(answer.trim()) })
            .interact_text()?;
        Ok(answer.trim().to_string())
    }

    fn secret(&mut self, prompt: &str) -> Result<String, PromptError> {
        Ok(Password::new().with_prompt(prompt).interact()?)
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, PromptError> {
        Ok(Confirm::new().with_prompt(prompt).default(default).interact()?)
    }

    fn select(&mut self, prompt: &str, items: &[String]) -> Result<Option<usize>, PromptError> {
        Ok(Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact_opt()?)
    }

    fn pause(&mut self, message: &str) -> Result<(), PromptError> {
        Input::<String>::new()
            .with_prompt(message)
            .allow_empty(true)
            .interact_text()?;
        Ok(())
    }
}

/// Validator accepting any non-empty answer
pub fn non_empty(answer: &str) -> Result<(), String> {
    if answer.trim().is_empty() {
        Err("Cannot be empty".to_string())
    } else {
        Ok(())
    }
}
