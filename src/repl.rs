use anyhow::{anyhow, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::edgar::report::FormType;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidCount {
    #[error("Please enter a valid integer.")]
    NotAnInteger,
    #[error("Please enter a number between 1 and {total}.")]
    OutOfRange { value: i64, total: usize },
}

/// Checks one line of operator input against `[1, total]`.
pub fn validate_count(input: &str, total: usize) -> Result<usize, InvalidCount> {
    let value: i64 = input.trim().parse().map_err(|_| InvalidCount::NotAnInteger)?;
    match usize::try_from(value) {
        Ok(count) if (1..=total).contains(&count) => Ok(count),
        _ => Err(InvalidCount::OutOfRange { value, total }),
    }
}

/// Source of the operator's answer to "how many filings?".
pub trait CountPrompt {
    fn read_line(&mut self, message: &str) -> Result<String>;

    fn reject(&mut self, reason: &InvalidCount) {
        println!("{}", reason);
    }
}

/// Asks until a valid count arrives. There is no retry limit; only an error
/// from the prompt itself (end of input, interrupt) ends the loop early.
pub fn prompt_for_count<P: CountPrompt + ?Sized>(
    prompt: &mut P,
    form: &FormType,
    total: usize,
) -> Result<usize> {
    let message = format!(
        "Enter the number of {} filings to download (1 to {}): ",
        form, total
    );
    loop {
        let line = prompt.read_line(&message)?;
        match validate_count(&line, total) {
            Ok(count) => return Ok(count),
            Err(reason) => {
                log::debug!("Rejected count input {:?}: {}", line, reason);
                prompt.reject(&reason);
            }
        }
    }
}

/// Interactive prompt on the terminal.
pub struct RustylinePrompt {
    editor: DefaultEditor,
}

impl RustylinePrompt {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new()?;
        Ok(Self { editor })
    }
}

impl CountPrompt for RustylinePrompt {
    fn read_line(&mut self, message: &str) -> Result<String> {
        match self.editor.readline(message) {
            Ok(line) => Ok(line),
            Err(ReadlineError::Interrupted) => Err(anyhow!("Count prompt interrupted")),
            Err(ReadlineError::Eof) => Err(anyhow!("No count entered before end of input")),
            Err(e) => Err(e.into()),
        }
    }
}

/// A count given up front (`--count`). It is offered once; if it is out of
/// range there is nobody to ask again, so the second read fails.
pub struct PresetCount {
    value: Option<String>,
}

impl PresetCount {
    pub fn new(count: i64) -> Self {
        Self {
            value: Some(count.to_string()),
        }
    }
}

impl CountPrompt for PresetCount {
    fn read_line(&mut self, _message: &str) -> Result<String> {
        self.value
            .take()
            .ok_or_else(|| anyhow!("--count is outside the number of matching filings"))
    }

    fn reject(&mut self, reason: &InvalidCount) {
        log::error!("--count rejected: {}", reason);
    }
}
