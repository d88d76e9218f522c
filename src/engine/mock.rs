use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use async_trait::async_trait;

use super::{Answer, Engine, Guess, SessionState};

/// A scripted engine for tests. Progress follows a fixed sequence, one value
/// per step; every call is recorded.
pub struct ScriptedEngine {
    progress: Vec<f64>,
    guesses: Vec<Guess>,
    state: SessionState,
    received: Vec<String>,
    starts: usize,
    concludes: usize,
    fail_start: bool,
    fail_advance_at: Option<usize>,
    fail_conclude: bool,
    trace: Option<Arc<Mutex<Vec<String>>>>,
}

impl ScriptedEngine {
    /// `progress[i]` is reported after `i` advances. Once the sequence runs
    /// out, the last value repeats.
    pub fn new(progress: Vec<f64>) -> Self {
        Self {
            progress,
            guesses: vec![Guess {
                id: Some("1".to_string()),
                name: "Scripted Character".to_string(),
                description: None,
                photo: None,
            }],
            state: SessionState::default(),
            received: Vec::new(),
            starts: 0,
            concludes: 0,
            fail_start: false,
            fail_advance_at: None,
            fail_conclude: false,
            trace: None,
        }
    }

    /// Progress stays at `value` forever.
    pub fn flat(value: f64) -> Self {
        Self::new(vec![value])
    }

    pub fn with_guesses(mut self, guesses: Vec<Guess>) -> Self {
        self.guesses = guesses;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Fail the `n`-th advance call (1-based).
    pub fn failing_advance(mut self, n: usize) -> Self {
        self.fail_advance_at = Some(n);
        self
    }

    pub fn failing_conclude(mut self) -> Self {
        self.fail_conclude = true;
        self
    }

    /// Append "start", "advance:<line>" and "conclude" to a shared log.
    pub fn with_trace(mut self, trace: Arc<Mutex<Vec<String>>>) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Lines passed to [`Engine::advance`], in order.
    pub fn received(&self) -> &[String] {
        &self.received
    }

    pub fn starts(&self) -> usize {
        self.starts
    }

    pub fn concludes(&self) -> usize {
        self.concludes
    }

    fn progress_at(&self, step: u32) -> f64 {
        let i = step as usize;
        self.progress
            .get(i)
            .or_else(|| self.progress.last())
            .copied()
            .unwrap_or(0.0)
    }

    fn load_step(&mut self, step: u32) {
        self.state = SessionState {
            question: format!("Question {}", step + 1),
            answers: Answer::ALL.iter().map(|a| a.to_string()).collect(),
            progress: self.progress_at(step),
            step,
        };
    }

    fn record(&self, event: String) {
        if let Some(trace) = &self.trace {
            trace.lock().unwrap().push(event);
        }
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    async fn start(&mut self) -> Result<()> {
        self.starts += 1;
        self.record("start".to_string());
        if self.fail_start {
            bail!("ScriptedEngine: backend unreachable");
        }
        self.load_step(0);
        Ok(())
    }

    fn state(&self) -> &SessionState {
        &self.state
    }

    async fn advance(&mut self, answer: &str) -> Result<()> {
        self.received.push(answer.to_string());
        self.record(format!("advance:{}", answer));
        if self.fail_advance_at == Some(self.received.len()) {
            bail!("ScriptedEngine: answer '{}' rejected", answer);
        }
        let next = self.state.step + 1;
        self.load_step(next);
        Ok(())
    }

    async fn conclude(&mut self) -> Result<Vec<Guess>> {
        self.concludes += 1;
        self.record("conclude".to_string());
        if self.fail_conclude {
            bail!("ScriptedEngine: no guess available");
        }
        Ok(self.guesses.clone())
    }
}
