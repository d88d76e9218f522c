pub mod akinator;
pub mod mock;

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What the engine is currently asking, and how sure it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub question: String,
    pub answers: Vec<String>,
    /// Confidence in [0, 100].
    pub progress: f64,
    /// Exchanges completed so far, counted by the engine.
    pub step: u32,
}

/// One candidate the engine settled on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guess {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

/// The five answers every question accepts. The discriminant is the wire index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes = 0,
    No = 1,
    DontKnow = 2,
    Probably = 3,
    ProbablyNot = 4,
}

impl Answer {
    pub const ALL: [Answer; 5] = [
        Answer::Yes,
        Answer::No,
        Answer::DontKnow,
        Answer::Probably,
        Answer::ProbablyNot,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }
}

impl FromStr for Answer {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['\'', '’'], "");
        let answer = match normalized.as_str() {
            "0" | "y" | "yes" => Answer::Yes,
            "1" | "n" | "no" => Answer::No,
            "2" | "?" | "idk" | "dont know" | "i dont know" => Answer::DontKnow,
            "3" | "p" | "probably" => Answer::Probably,
            "4" | "pn" | "probably not" => Answer::ProbablyNot,
            _ => bail!("invalid answer '{}' (expected 0-4 or a keyword)", s.trim()),
        };
        Ok(answer)
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Answer::Yes => "Yes",
            Answer::No => "No",
            Answer::DontKnow => "I don't know",
            Answer::Probably => "Probably",
            Answer::ProbablyNot => "Probably not",
        };
        f.write_str(label)
    }
}

/// The guessing game backend. Owns the session; the driver only reads
/// [`SessionState`] and requests transitions.
#[async_trait]
pub trait Engine: Send {
    /// Open a session and load the first question.
    async fn start(&mut self) -> Result<()>;

    /// Current question, answer options, progress and step.
    fn state(&self) -> &SessionState;

    /// Submit the user's answer, exactly as typed, and move to the next question.
    async fn advance(&mut self, answer: &str) -> Result<()>;

    /// Commit to a final answer. Best candidate first.
    async fn conclude(&mut self) -> Result<Vec<Guess>>;
}
