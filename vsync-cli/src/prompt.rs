//! Interactive prompts
//!
//! Questions are asked on any `BufRead`/`Write` pair so the flows that need
//! them can be driven from tests. Invalid answers are reported and asked
//! again; only I/O failures and end of input escape the loop.

use anyhow::{bail, Result};
use std::fmt::Display;
use std::io::{self, BufRead, Write};

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    /// Prompter bound to the terminal
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask a question and return the trimmed answer
    pub fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            bail!("Input closed while waiting for an answer to {:?}", question.trim());
        }
        Ok(answer.trim().to_string())
    }

    /// Ask until `parse` accepts the answer
    pub fn ask_until<T, E, F>(&mut self, question: &str, parse: F) -> Result<T>
    where
        E: Display,
        F: Fn(&str) -> std::result::Result<T, E>,
    {
        loop {
            let answer = self.ask(question)?;
            match parse(&answer) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    log::debug!("Rejected answer {:?}: {}", answer, e);
                    writeln!(self.output, "Error: {}. Please try again.", e)?;
                }
            }
        }
    }

    /// Yes/no question where anything but "n"/"no" counts as yes
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.ask(question)?.to_lowercase();
        Ok(!matches!(answer.as_str(), "n" | "no"))
    }

    #[cfg(test)]
    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }
}
