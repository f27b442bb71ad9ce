use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Source of answers to interactive questions.
pub trait Prompter {
    /// Ask a question and return the trimmed answer. End of input yields an empty answer.
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

#[derive(Debug, Default)]
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        let mut out = io::stdout().lock();
        write!(out, "{question}")?;
        out.flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

/// Replays queued answers; runs dry as end of input.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { answers: answers.into_iter().map(Into::into).collect(), asked: Vec::new() }
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        self.asked.push(question.to_string());
        Ok(self.answers.pop_front().map(|a| a.trim().to_string()).unwrap_or_default())
    }
}

/// Always answers yes; for non-interactive overwrite.
#[derive(Debug, Default)]
pub struct AssumeYes;

impl Prompter for AssumeYes {
    fn ask(&mut self, _question: &str) -> io::Result<String> {
        Ok("y".to_string())
    }
}

/// Ask until the answer is yes or no. An empty answer (end of input) counts as no.
pub fn confirm(prompter: &mut dyn Prompter, question: &str) -> io::Result<bool> {
    let mut q = format!("{question} (y/n): ");
    loop {
        let answer = prompter.ask(&q)?;
        match answer.to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" | "" => return Ok(false),
            _ => q = "Please enter y or n: ".to_string(),
        }
    }
}
