use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use akicli::config::DriverConfig;
use akicli::driver::{Phase, SessionDriver};
use akicli::engine::{Engine, Guess};
use akicli::engine::mock::ScriptedEngine;
use akicli::input::{LineSource, ScriptedLines};
use akicli::protocol::Message;

type Driver = SessionDriver<ScriptedEngine, ScriptedLines, Vec<u8>>;

fn build(engine: ScriptedEngine, lines: Vec<&str>) -> Driver {
    SessionDriver::new(
        engine,
        ScriptedLines::new(lines),
        Vec::new(),
        DriverConfig::default(),
    )
}

/// Decode everything the driver wrote, one message per line.
fn messages(output: &[u8]) -> Vec<Message> {
    String::from_utf8(output.to_vec())
        .unwrap()
        .lines()
        .map(|line| Message::parse(line).unwrap())
        .collect()
}

fn question_count(msgs: &[Message]) -> usize {
    msgs.iter()
        .filter(|m| matches!(m, Message::Question { .. }))
        .count()
}

#[tokio::test]
async fn stops_at_the_step_where_progress_reaches_threshold() {
    // progress hits 80 after the 5th advance
    let engine = ScriptedEngine::new(vec![0.0, 15.0, 30.0, 45.0, 60.0, 80.0, 95.0]);
    let mut driver = build(engine, vec!["0"; 10]);

    driver.run().await.unwrap();

    assert_eq!(driver.iterations(), 5);
    assert_eq!(driver.engine().received().len(), 5);
    assert_eq!(driver.engine().concludes(), 1);

    let msgs = messages(driver.output());
    assert_eq!(msgs.len(), 6);
    assert_eq!(question_count(&msgs), 5);
    assert!(matches!(msgs.last(), Some(Message::Guess { .. })));
}

#[tokio::test]
async fn step_ceiling_ends_session_without_confidence() {
    let engine = ScriptedEngine::flat(10.0);
    let mut driver = build(engine, vec!["1"; 100]);

    let guess = driver.run().await.unwrap();

    assert_eq!(driver.iterations(), 78);
    assert_eq!(driver.engine().received().len(), 78);
    assert_eq!(driver.engine().state().step, 78);
    assert_eq!(driver.input().reads(), 78);
    assert_eq!(guess[0].name, "Scripted Character");
    assert_eq!(question_count(&messages(driver.output())), 78);
}

#[tokio::test]
async fn confident_engine_concludes_without_asking() {
    let engine = ScriptedEngine::flat(92.0);
    let mut driver = build(engine, vec!["0"]);

    driver.run().await.unwrap();

    assert_eq!(driver.iterations(), 0);
    assert_eq!(driver.input().reads(), 0);
    let msgs = messages(driver.output());
    assert_eq!(msgs.len(), 1);
    assert!(matches!(msgs[0], Message::Guess { .. }));
}

#[tokio::test]
async fn either_limit_stops_the_loop() {
    // Progress would keep the loop going; the ceiling alone must stop it.
    let config = DriverConfig {
        progress_threshold: 80.0,
        step_ceiling: 3,
    };
    let mut driver = SessionDriver::new(
        ScriptedEngine::flat(0.0),
        ScriptedLines::new(["0"; 10]),
        Vec::new(),
        config,
    );
    driver.run().await.unwrap();
    assert_eq!(driver.iterations(), 3);

    // The ceiling would allow more; progress alone must stop it.
    let config = DriverConfig {
        progress_threshold: 50.0,
        step_ceiling: 78,
    };
    let mut driver = SessionDriver::new(
        ScriptedEngine::new(vec![0.0, 49.9, 50.0]),
        ScriptedLines::new(["0"; 10]),
        Vec::new(),
        config,
    );
    driver.run().await.unwrap();
    assert_eq!(driver.iterations(), 2);
}

#[tokio::test]
async fn question_message_reflects_engine_state() {
    let engine = ScriptedEngine::new(vec![12.5, 90.0]);
    let mut driver = build(engine, vec!["yes"]);

    driver.run().await.unwrap();

    let msgs = messages(driver.output());
    match &msgs[0] {
        Message::Question {
            question,
            answers,
            progress,
        } => {
            assert_eq!(question, "Question 1");
            assert_eq!(
                answers,
                &["Yes", "No", "I don't know", "Probably", "Probably not"]
            );
            assert_eq!(*progress, 12.5);
        }
        other => panic!("expected Question, got {:?}", other),
    }
}

#[tokio::test]
async fn final_message_carries_the_engine_guess() {
    let guesses = vec![
        Guess {
            id: Some("71".to_string()),
            name: "Mario".to_string(),
            description: Some("Plumber".to_string()),
            photo: None,
        },
        Guess {
            id: Some("72".to_string()),
            name: "Luigi".to_string(),
            description: None,
            photo: None,
        },
    ];
    let engine = ScriptedEngine::new(vec![50.0, 85.0]).with_guesses(guesses.clone());
    let mut driver = build(engine, vec!["0"]);

    let returned = driver.run().await.unwrap();

    assert_eq!(returned, guesses);
    assert_eq!(driver.phase(), Phase::Done);
    let msgs = messages(driver.output());
    assert_eq!(msgs.last().unwrap(), &Message::Guess { guess: guesses });
}

#[tokio::test]
async fn lines_are_forwarded_untouched() {
    let engine = ScriptedEngine::new(vec![0.0, 0.0, 0.0, 99.0]);
    let mut driver = build(engine, vec!["  Probably not ", "3", "whatever"]);

    driver.run().await.unwrap();

    assert_eq!(
        driver.engine().received(),
        ["  Probably not ", "3", "whatever"]
    );
}

#[tokio::test]
async fn closed_input_keeps_resolving_with_empty_lines() {
    let config = DriverConfig {
        progress_threshold: 80.0,
        step_ceiling: 5,
    };
    let mut driver = SessionDriver::new(
        ScriptedEngine::flat(0.0),
        ScriptedLines::new(["yes", "no"]),
        Vec::new(),
        config,
    );

    driver.run().await.unwrap();

    assert_eq!(driver.input().reads(), 5);
    assert_eq!(driver.engine().received(), ["yes", "no", "", "", ""]);
    assert_eq!(driver.phase(), Phase::Done);
}

#[tokio::test]
async fn start_failure_is_fatal_and_emits_nothing() {
    let mut driver = build(ScriptedEngine::flat(0.0).failing_start(), vec!["0"]);

    let err = driver.run().await.unwrap_err();

    assert!(err.to_string().contains("failed to start session"));
    assert!(format!("{:#}", err).contains("backend unreachable"));
    assert_eq!(driver.phase(), Phase::NotStarted);
    assert!(driver.output().is_empty());
    assert_eq!(driver.input().reads(), 0);
    assert_eq!(driver.engine().concludes(), 0);
}

#[tokio::test]
async fn advance_failure_is_fatal_and_names_the_step() {
    let mut driver = build(ScriptedEngine::flat(0.0).failing_advance(3), vec!["0"; 10]);

    let err = driver.run().await.unwrap_err();

    assert!(err.to_string().contains("step 2"));
    assert!(format!("{:#}", err).contains("rejected"));
    assert_eq!(driver.phase(), Phase::Running);
    assert_eq!(driver.engine().received().len(), 3);
    assert_eq!(driver.engine().concludes(), 0);
    assert_eq!(question_count(&messages(driver.output())), 3);
}

#[tokio::test]
async fn conclude_failure_is_fatal_and_emits_no_guess() {
    let mut driver = build(ScriptedEngine::flat(85.0).failing_conclude(), vec![]);

    let err = driver.run().await.unwrap_err();

    assert!(err.to_string().contains("failed to conclude session"));
    assert_eq!(driver.phase(), Phase::Concluding);
    assert!(driver.output().is_empty());
}

#[tokio::test]
async fn driver_runs_only_once() {
    let mut driver = build(ScriptedEngine::flat(90.0), vec![]);
    driver.run().await.unwrap();

    let err = driver.run().await.unwrap_err();
    assert!(err.to_string().contains("already started"));
    assert_eq!(driver.engine().starts(), 1);
}

// --- ordering ---

/// Writer that logs "emit" each time a message is flushed.
struct TracedOutput {
    buf: Vec<u8>,
    trace: Arc<Mutex<Vec<String>>>,
}

impl Write for TracedOutput {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.trace.lock().unwrap().push("emit".to_string());
        Ok(())
    }
}

/// Line source that logs "read" on every call.
struct TracedLines {
    inner: ScriptedLines,
    trace: Arc<Mutex<Vec<String>>>,
}

#[async_trait::async_trait]
impl LineSource for TracedLines {
    async fn read_line(&mut self) -> anyhow::Result<String> {
        self.trace.lock().unwrap().push("read".to_string());
        self.inner.read_line().await
    }
}

#[tokio::test]
async fn emit_read_advance_strictly_alternate() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let engine =
        ScriptedEngine::new(vec![0.0, 20.0, 40.0, 81.0]).with_trace(Arc::clone(&trace));
    let input = TracedLines {
        inner: ScriptedLines::new(["a", "b", "c", "d"]),
        trace: Arc::clone(&trace),
    };
    let output = TracedOutput {
        buf: Vec::new(),
        trace: Arc::clone(&trace),
    };
    let mut driver = SessionDriver::new(engine, input, output, DriverConfig::default());

    driver.run().await.unwrap();

    let expected: Vec<&str> = vec![
        "start", "emit", "read", "advance:a", "emit", "read", "advance:b", "emit", "read",
        "advance:c", "conclude", "emit",
    ];
    assert_eq!(*trace.lock().unwrap(), expected);
    assert_eq!(messages(&driver.output().buf).len(), 4);
}
