use std::io::{self, BufRead, Write};

/// Asks the user to approve a destructive or replacing action
pub trait Confirmer {
    fn confirm(&mut self, message: &str) -> bool;
}

/// Prompt on stderr, read a y/N answer from stdin
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&mut self, message: &str) -> bool {
        let mut err = io::stderr();
        let _ = write!(err, "{}\n[y/N] ", message);
        let _ = err.flush();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(e) => {
                tracing::debug!("failed to read confirmation: {}", e);
                false
            }
        }
    }
}

/// Approves everything, for `--yes`
pub struct AssumeYes;

impl Confirmer for AssumeYes {
    fn confirm(&mut self, _message: &str) -> bool {
        true
    }
}

/// Replays fixed answers in order, refusing once they run out
#[derive(Debug, Default)]
pub struct ScriptedConfirmer {
    answers: Vec<bool>,
    pub asked: Vec<String>,
}

impl ScriptedConfirmer {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().rev().copied().collect(),
            asked: Vec::new(),
        }
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&mut self, message: &str) -> bool {
        self.asked.push(message.to_string());
        self.answers.pop().unwrap_or(false)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
