#[cfg(test)]
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use crossterm::{cursor::MoveTo, execute, terminal::{Clear, ClearType}};

use crate::error::{CbzError, Result};

/// Everything the tools need from the person at the keyboard.
pub trait Prompt {
    fn say(&mut self, msg: &str);
    /// Shows `question` and returns the answer without its line ending.
    fn ask(&mut self, question: &str) -> Result<String>;
    fn clear(&mut self) {}
}

/// Interactive prompt on stdin/stdout.
pub struct Terminal {
    stdin: io::Stdin,
}

impl Terminal {
    pub fn new() -> Self {
        Self { stdin: io::stdin() }
    }
}

impl Prompt for Terminal {
    fn say(&mut self, msg: &str) {
        println!("{msg}");
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        let mut out = io::stdout();
        write!(out, "{question}")?;
        out.flush()?;
        let mut line = String::new();
        // closed stdin would otherwise spin the reprompt loops forever
        if self.stdin.lock().read_line(&mut line)? == 0 {
            return Err(CbzError::Cancelled);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn clear(&mut self) {
        let _ = execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0));
    }
}

/// Canned answers, for tests.
#[cfg(test)]
#[derive(Default)]
pub struct Scripted {
    answers: VecDeque<String>,
    pub transcript: Vec<String>,
}

#[cfg(test)]
impl Scripted {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { answers: answers.into_iter().map(Into::into).collect(), transcript: Vec::new() }
    }

    pub fn said(&self, needle: &str) -> bool {
        self.transcript.iter().any(|l| l.contains(needle))
    }
}

#[cfg(test)]
impl Prompt for Scripted {
    fn say(&mut self, msg: &str) {
        self.transcript.push(msg.to_string());
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        self.transcript.push(question.to_string());
        self.answers.pop_front().ok_or(CbzError::Cancelled)
    }
}

/// Input that leaves a menu without picking an entry.
#[derive(Debug, Clone, Copy)]
pub enum Escape {
    Key(char),
    Empty,
    None,
}

/// Asks for a 1-based entry of a `len`-long menu until the answer is valid.
/// Returns the 0-based index, or `None` if the user escaped.
pub fn pick(p: &mut dyn Prompt, question: &str, len: usize, escape: Escape) -> Result<Option<usize>> {
    loop {
        let answer = p.ask(question)?;
        let answer = answer.trim();
        match escape {
            Escape::Key(c) if answer.eq_ignore_ascii_case(&c.to_string()) => return Ok(None),
            Escape::Empty if answer.is_empty() => return Ok(None),
            _ => {}
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=len).contains(&n) => return Ok(Some(n - 1)),
            Ok(_) => p.say("Invalid choice. Please try again."),
            Err(_) => match escape {
                Escape::Key(c) => p.say(&format!("Please enter a valid number or '{c}'.")),
                Escape::Empty => p.say("Please enter a valid number or press Enter."),
                Escape::None => p.say("Please enter a valid number."),
            },
        }
    }
}

/// y/n question; an empty answer takes `default` when there is one.
pub fn yes_no(p: &mut dyn Prompt, question: &str, default: Option<bool>) -> Result<bool> {
    loop {
        let answer = p.ask(question)?.trim().to_lowercase();
        match (answer.as_str(), default) {
            ("", Some(d)) => return Ok(d),
            ("y", _) => return Ok(true),
            ("n", _) => return Ok(false),
            _ => p.say("Please enter 'y' or 'n'"),
        }
    }
}
