//! Runs one question-answering job and reports it as a stream of events.
//!
//! A [`JobWorker`] redirects the engine's console into an
//! [`OutputCapture`] bound to the job's event channel, calls the engine,
//! then pushes exactly one terminal event (`answer` or `error`) followed by
//! exactly one `finished`. The completion signal is raised last.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use ragstream_capture::OutputCapture;
use ragstream_core::event::{Event, EventKind};
use ragstream_core::job::Job;
use ragstream_engine::QueryEngine;
use ragstream_events::{CompletionSignal, EventSender};
use tokio::task::JoinHandle;

/// Error payload when the engine exposes no console to redirect.
pub const CONSOLE_MISSING: &str = "Internal error: engine console not found.";

pub struct JobWorker {
    engine: Arc<dyn QueryEngine>,
    job: Job,
    events: EventSender,
    signal: CompletionSignal,
}

impl JobWorker {
    pub fn new(
        engine: Arc<dyn QueryEngine>,
        job: Job,
        events: EventSender,
        signal: CompletionSignal,
    ) -> Self {
        Self {
            engine,
            job,
            events,
            signal,
        }
    }

    /// Run on a dedicated task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        let job_id = self.job.id;
        let started = Instant::now();
        tracing::info!(
            job_id = %job_id,
            multi_hop = self.job.query.enable_multi_hop,
            search_budget = %self.job.query.search_budget,
            "Job started",
        );

        let outcome = self.execute().await;
        let failed = outcome.kind() == EventKind::Error;

        self.events.push(outcome);
        self.events.push(Event::finished());
        self.signal.set();

        tracing::info!(
            job_id = %job_id,
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Job finished",
        );
    }

    /// Call the engine with its console redirected; returns the terminal
    /// event.
    async fn execute(&self) -> Event {
        let Some(console) = self.engine.console() else {
            tracing::error!(job_id = %self.job.id, "Engine has no console to redirect");
            return Event::error(CONSOLE_MISSING);
        };

        let capture = Arc::new(OutputCapture::new(self.events.clone()));
        let guard = console.redirect(capture.clone()).await;

        let result = AssertUnwindSafe(self.engine.answer(&self.job.query))
            .catch_unwind()
            .await;

        capture.flush();
        drop(guard);

        match result {
            Ok(Ok(answer)) => Event::answer(answer),
            Ok(Err(e)) => {
                tracing::warn!(job_id = %self.job.id, error = %e, "Engine failed");
                Event::error(format!("An error occurred: {e}"))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(job_id = %self.job.id, panic = %message, "Engine panicked");
                Event::error(format!("An error occurred: {message}"))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "engine panicked".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use ragstream_core::job::{GraphCredentials, JobRequest, Query};
    use ragstream_core::progress::{Block, Progress};
    use ragstream_engine::{Console, EngineError};
    use ragstream_events::{channel, EventReceiver, Polled};

    use super::*;

    enum Ending {
        Answer(&'static str),
        Fail(&'static str),
        Panic,
    }

    /// Engine that prints a fixed script to its console, then ends.
    struct ScriptedEngine {
        console: Option<Arc<Console>>,
        script: Vec<Progress>,
        ending: Ending,
    }

    impl ScriptedEngine {
        fn new(script: Vec<Progress>, ending: Ending) -> Self {
            Self {
                console: Some(Arc::new(Console::new())),
                script,
                ending,
            }
        }
    }

    #[async_trait]
    impl QueryEngine for ScriptedEngine {
        fn console(&self) -> Option<Arc<Console>> {
            self.console.clone()
        }

        async fn answer(&self, _query: &Query) -> Result<String, EngineError> {
            if let Some(console) = &self.console {
                for progress in &self.script {
                    console.print(progress);
                }
            }
            match self.ending {
                Ending::Answer(text) => Ok(text.to_string()),
                Ending::Fail(message) => Err(EngineError::Failed(message.to_string())),
                Ending::Panic => panic!("index out of range"),
            }
        }
    }

    fn job() -> Job {
        JobRequest {
            question: Some("What is X?".into()),
            ..Default::default()
        }
        .into_job(GraphCredentials {
            uri: "bolt://localhost:7687".into(),
            user: "neo4j".into(),
            password: "pw".into(),
        })
        .unwrap()
    }

    fn text(s: &str) -> Progress {
        Progress::Text(s.to_string())
    }

    fn drain(rx: &mut EventReceiver) -> Vec<Event> {
        let mut events = Vec::new();
        while let Polled::Ready(event) = rx.try_pop() {
            events.push(event);
        }
        events
    }

    fn kinds(events: &[Event]) -> Vec<EventKind> {
        events.iter().map(Event::kind).collect()
    }

    async fn run(engine: Arc<dyn QueryEngine>) -> (Vec<Event>, CompletionSignal) {
        let (tx, mut rx) = channel();
        let signal = CompletionSignal::new();
        JobWorker::new(engine, job(), tx, signal.clone()).run().await;
        (drain(&mut rx), signal)
    }

    // -----------------------------------------------------------------------
    // Test: success ordering
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn success_emits_logs_then_answer_then_finished() {
        let engine = Arc::new(ScriptedEngine::new(
            vec![text("Searching graph...\n"), text("Found 3 paths\n")],
            Ending::Answer("X is a drug"),
        ));
        let (events, signal) = run(engine.clone()).await;

        assert_eq!(
            kinds(&events),
            vec![EventKind::Log, EventKind::Log, EventKind::Answer, EventKind::Finished]
        );
        assert_eq!(events[2].payload(), "X is a drug");
        assert!(signal.is_set());
        assert!(!engine.console.as_ref().unwrap().is_redirected());
    }

    #[tokio::test]
    async fn unterminated_output_is_flushed_before_the_answer() {
        let engine = Arc::new(ScriptedEngine::new(
            vec![
                text("hop 1 "),
                Progress::Block(Block::Markdown { text: "**plan**".into() }),
                text("done"),
            ],
            Ending::Answer("ok"),
        ));
        let (events, _) = run(engine).await;

        assert_eq!(
            kinds(&events),
            vec![EventKind::Log, EventKind::Log, EventKind::Answer, EventKind::Finished]
        );
        assert!(events[0].payload().contains("log-entry-rich"));
        assert_eq!(events[1].payload(), "<div class='log-item'>hop 1 done</div>");
    }

    // -----------------------------------------------------------------------
    // Test: failure paths
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn engine_failure_emits_one_error_then_finished() {
        let engine = Arc::new(ScriptedEngine::new(
            vec![text("Connecting...\n")],
            Ending::Fail("db unreachable"),
        ));
        let (events, signal) = run(engine.clone()).await;

        assert_eq!(
            kinds(&events),
            vec![EventKind::Log, EventKind::Error, EventKind::Finished]
        );
        assert_eq!(events[1].payload(), "An error occurred: db unreachable");
        assert!(signal.is_set());
        assert!(!engine.console.as_ref().unwrap().is_redirected());
    }

    #[tokio::test]
    async fn engine_panic_is_reported_as_error() {
        let engine = Arc::new(ScriptedEngine::new(vec![text("step\n")], Ending::Panic));
        let (events, signal) = run(engine.clone()).await;

        assert_eq!(
            kinds(&events),
            vec![EventKind::Log, EventKind::Error, EventKind::Finished]
        );
        assert_eq!(events[1].payload(), "An error occurred: index out of range");
        assert!(signal.is_set());
        assert!(!engine.console.as_ref().unwrap().is_redirected());
    }

    #[tokio::test]
    async fn missing_console_skips_the_engine() {
        let engine = Arc::new(ScriptedEngine {
            console: None,
            script: vec![],
            ending: Ending::Answer("never returned"),
        });
        let (events, signal) = run(engine).await;

        assert_eq!(kinds(&events), vec![EventKind::Error, EventKind::Finished]);
        assert_eq!(events[0].payload(), CONSOLE_MISSING);
        assert!(signal.is_set());
    }

    // -----------------------------------------------------------------------
    // Test: task lifecycle
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn spawned_worker_raises_signal_after_finished() {
        let (tx, mut rx) = channel();
        let signal = CompletionSignal::new();
        let engine = Arc::new(ScriptedEngine::new(vec![], Ending::Answer("42")));

        let handle = JobWorker::new(engine, job(), tx, signal.clone()).spawn();
        tokio::time::timeout(Duration::from_secs(5), signal.wait())
            .await
            .expect("worker should complete");
        handle.await.unwrap();

        let events = drain(&mut rx);
        assert_matches!(events.last(), Some(e) if e.is_finished());
        assert_eq!(events.iter().filter(|e| e.is_finished()).count(), 1);
    }

    #[tokio::test]
    async fn worker_completes_when_receiver_is_gone() {
        let (tx, rx) = channel();
        drop(rx);
        let signal = CompletionSignal::new();
        let engine = Arc::new(ScriptedEngine::new(vec![text("line\n")], Ending::Answer("a")));

        JobWorker::new(engine, job(), tx, signal.clone()).run().await;
        assert!(signal.is_set());
    }
}
