//! The stdout protocol: one JSON object per line.
//!
//! ```text
//! {"question":"Is your character real?","answers":["Yes","No",...],"progress":12.5}
//! {"guess":[{"id":"71","name":"Mario",...}]}
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::{Guess, SessionState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// Emitted once per loop iteration, before reading the answer.
    Question {
        question: String,
        answers: Vec<String>,
        progress: f64,
    },
    /// Emitted once, after the engine concludes.
    Guess { guess: Vec<Guess> },
}

impl Message {
    pub fn question(state: &SessionState) -> Self {
        Message::Question {
            question: state.question.clone(),
            answers: state.answers.clone(),
            progress: state.progress,
        }
    }

    pub fn guess(guess: Vec<Guess>) -> Self {
        Message::Guess { guess }
    }

    /// Serialize to a single line, without the trailing newline.
    pub fn to_line(&self) -> Result<String> {
        serde_json::to_string(self).context("failed to serialize message")
    }

    /// Decode one line written by [`Message::to_line`].
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line.trim())
            .with_context(|| format!("not a protocol message: {}", line.trim()))
    }
}
