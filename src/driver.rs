use std::io::Write;

use anyhow::{Context, Result, bail};

use crate::config::DriverConfig;
use crate::engine::{Engine, Guess};
use crate::input::LineSource;
use crate::protocol::Message;

/// Where the driver is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    Running,
    Concluding,
    Done,
}

/// The session loop. Wires together an Engine, a LineSource and an output sink.
///
/// Strictly sequential: emit the question, read one line, advance the engine,
/// repeat. Every engine call is awaited once and any failure ends the run.
pub struct SessionDriver<E, L, W> {
    engine: E,
    input: L,
    output: W,
    config: DriverConfig,
    phase: Phase,
    iterations: usize,
}

impl<E, L, W> SessionDriver<E, L, W>
where
    E: Engine,
    L: LineSource,
    W: Write + Send,
{
    pub fn new(engine: E, input: L, output: W, config: DriverConfig) -> Self {
        Self {
            engine,
            input,
            output,
            config,
            phase: Phase::NotStarted,
            iterations: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Question/answer exchanges performed by this driver.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn input(&self) -> &L {
        &self.input
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Play one session to the end and return the engine's final guess.
    pub async fn run(&mut self) -> Result<Vec<Guess>> {
        if self.phase != Phase::NotStarted {
            bail!("session already started");
        }

        self.engine
            .start()
            .await
            .context("failed to start session")?;
        self.phase = Phase::Running;
        log::debug!("session running");

        while self.config.should_continue(self.engine.state()) {
            let question = Message::question(self.engine.state());
            self.emit(&question)?;

            let line = self
                .input
                .read_line()
                .await
                .context("failed to read answer")?;

            let step = self.engine.state().step;
            self.engine
                .advance(&line)
                .await
                .with_context(|| format!("failed to advance session at step {}", step))?;
            self.iterations += 1;
        }

        let state = self.engine.state();
        log::info!(
            "concluding after {} iterations (step {}, progress {:.2})",
            self.iterations,
            state.step,
            state.progress
        );
        self.phase = Phase::Concluding;

        let guess = self
            .engine
            .conclude()
            .await
            .context("failed to conclude session")?;

        self.emit(&Message::guess(guess.clone()))?;
        self.phase = Phase::Done;
        Ok(guess)
    }

    fn emit(&mut self, message: &Message) -> Result<()> {
        let line = message.to_line()?;
        writeln!(self.output, "{}", line).context("failed to write to output")?;
        self.output.flush().context("failed to flush output")?;
        Ok(())
    }
}
