//! Session coordinator — the task that owns `SessionState`.
//!
//! At most one analysis is in flight. Analysis and delivery run on spawned
//! tasks and report back through the same command channel, so state is only
//! ever touched from this loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::delivery::ResultSink;
use crate::errors::AppError;
use crate::ranking::collection::FileCollection;
use crate::ranking::engine::{rank, RankedCandidate};
use crate::ranking::export::{to_notification_payload, PayloadMetadata};
use crate::ranking::keywords::extract_keywords;
use crate::session::{
    AnalysisStarted, AnalysisStatus, Command, DeliveryStatus, Scoring, SessionHandle,
    SessionSettings, SessionSnapshot, COMMAND_BUFFER,
};

struct InFlight {
    id: u64,
    /// Endpoint captured when the run started.
    webhook_url: Option<String>,
}

struct SessionState {
    files: FileCollection,
    job_description: String,
    webhook_url: Option<String>,
    results: Vec<RankedCandidate>,
    in_flight: Option<InFlight>,
    delivery: DeliveryStatus,
    next_analysis_id: u64,
    delivery_id: u64,
}

impl SessionState {
    fn status(&self) -> AnalysisStatus {
        if self.in_flight.is_some() {
            AnalysisStatus::Processing
        } else if self.results.is_empty() {
            AnalysisStatus::Ready
        } else {
            AnalysisStatus::Complete
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            files: self.files.state(),
            job_description: self.job_description.clone(),
            webhook_url: self.webhook_url.clone(),
            status: self.status(),
            results: self.results.clone(),
            delivery: self.delivery.clone(),
        }
    }
}

struct Coordinator {
    state: SessionState,
    scoring: Scoring,
    sink: Arc<dyn ResultSink>,
    analysis_delay: Duration,
    /// Weak so the loop ends once every `SessionHandle` is dropped.
    tx: mpsc::WeakSender<Command>,
}

/// Spawns the coordinator task and returns a handle to it.
pub fn spawn(settings: SessionSettings, scoring: Scoring, sink: Arc<dyn ResultSink>) -> SessionHandle {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);

    let coordinator = Coordinator {
        state: SessionState {
            files: FileCollection::new(settings.max_files),
            job_description: String::new(),
            webhook_url: settings.webhook_url,
            results: Vec::new(),
            in_flight: None,
            delivery: DeliveryStatus::Idle,
            next_analysis_id: 1,
            delivery_id: 0,
        },
        scoring,
        sink,
        analysis_delay: settings.analysis_delay,
        tx: tx.downgrade(),
    };

    tokio::spawn(coordinator.run(rx));

    SessionHandle { tx }
}

impl Coordinator {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        debug!("Session coordinator started");
        while let Some(command) = rx.recv().await {
            self.handle(command);
        }
        debug!("Session coordinator stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Snapshot(reply) => {
                let _ = reply.send(self.state.snapshot());
            }
            Command::AddFiles(files, reply) => {
                let _ = reply.send(self.state.files.add(files));
            }
            Command::RemoveFile(index, reply) => {
                let _ = reply.send(self.state.files.remove(index));
            }
            Command::ClearFiles(reply) => {
                let _ = reply.send(self.state.files.clear());
            }
            Command::SetJobDescription(text, reply) => {
                self.state.job_description = text;
                let _ = reply.send(());
            }
            Command::SetWebhook(url, reply) => {
                self.state.webhook_url = url;
                let _ = reply.send(());
            }
            Command::StartAnalysis(reply) => {
                let _ = reply.send(self.start_analysis());
            }
            Command::AnalysisFinished { id, results } => self.finish_analysis(id, results),
            Command::DeliveryFinished { id, outcome } => {
                if id == self.state.delivery_id {
                    self.state.delivery = outcome.into();
                } else {
                    debug!(id, "Ignoring outcome of superseded delivery");
                }
            }
        }
    }

    fn start_analysis(&mut self) -> Result<AnalysisStarted, AppError> {
        if self.state.in_flight.is_some() {
            return Err(AppError::AnalysisInProgress);
        }
        if self.state.files.is_empty() {
            return Err(AppError::MissingInput(
                "Please upload at least one resume".to_string(),
            ));
        }
        if self.state.job_description.trim().is_empty() {
            return Err(AppError::MissingInput(
                "Please enter a job description".to_string(),
            ));
        }

        let id = self.state.next_analysis_id;
        self.state.next_analysis_id += 1;

        let files = self.state.files.files().to_vec();
        let keywords = extract_keywords(&self.state.job_description);
        let started = AnalysisStarted {
            file_count: files.len(),
            keywords: keywords.clone(),
        };

        self.state.in_flight = Some(InFlight {
            id,
            webhook_url: self.state.webhook_url.clone(),
        });

        info!(
            id,
            files = files.len(),
            keywords = keywords.len(),
            "Analysis started"
        );

        let scoring = self.scoring.clone();
        let delay = self.analysis_delay;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let results = rank(
                &files,
                &keywords,
                scoring.scores.as_ref(),
                scoring.selector.as_ref(),
            );
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Command::AnalysisFinished { id, results }).await;
            }
        });

        Ok(started)
    }

    fn finish_analysis(&mut self, id: u64, results: Vec<RankedCandidate>) {
        let in_flight = match self.state.in_flight.take() {
            Some(run) if run.id == id => run,
            other => {
                warn!(id, "Received results for an unknown analysis run");
                self.state.in_flight = other;
                return;
            }
        };

        info!(id, candidates = results.len(), "Successfully ranked candidates");
        self.state.results = results;

        match in_flight.webhook_url {
            Some(endpoint) => self.spawn_delivery(endpoint),
            None => self.state.delivery = DeliveryStatus::Skipped,
        }
    }

    fn spawn_delivery(&mut self, endpoint: String) {
        self.state.delivery_id += 1;
        self.state.delivery = DeliveryStatus::Pending;

        let id = self.state.delivery_id;
        let payload = to_notification_payload(&self.state.results, &PayloadMetadata::now());
        let sink = Arc::clone(&self.sink);
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let outcome = sink.deliver(&endpoint, &payload).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Command::DeliveryFinished { id, outcome }).await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DeliveryOutcome;
    use crate::ranking::collection::UploadedFile;
    use crate::ranking::export::NotificationPayload;
    use crate::ranking::scoring::{KeywordSelector, RandomPrefixSelector, ScoreProvider};
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Counts invocations; scores descend with call order.
    #[derive(Default)]
    struct CountingScores {
        calls: AtomicUsize,
    }

    impl ScoreProvider for CountingScores {
        fn score(&self, _file: &UploadedFile, _keywords: &[String]) -> u8 {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            100u8.saturating_sub(n as u8)
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<(String, NotificationPayload)>>,
    }

    #[async_trait]
    impl ResultSink for RecordingSink {
        async fn deliver(&self, endpoint: &str, payload: &NotificationPayload) -> DeliveryOutcome {
            self.calls
                .lock()
                .unwrap()
                .push((endpoint.to_string(), payload.clone()));
            DeliveryOutcome::Sent { at: Utc::now() }
        }
    }

    struct FailingSink;

    #[async_trait]
    impl ResultSink for FailingSink {
        async fn deliver(&self, _endpoint: &str, _payload: &NotificationPayload) -> DeliveryOutcome {
            DeliveryOutcome::Failed {
                reason: "connection refused".to_string(),
                at: Utc::now(),
            }
        }
    }

    /// Never completes until released.
    #[derive(Default)]
    struct StalledSink {
        release: Notify,
    }

    #[async_trait]
    impl ResultSink for StalledSink {
        async fn deliver(&self, _endpoint: &str, _payload: &NotificationPayload) -> DeliveryOutcome {
            self.release.notified().await;
            DeliveryOutcome::Sent { at: Utc::now() }
        }
    }

    fn settings(delay_ms: u64, webhook: Option<&str>) -> SessionSettings {
        SessionSettings {
            max_files: 10,
            analysis_delay: Duration::from_millis(delay_ms),
            webhook_url: webhook.map(str::to_string),
        }
    }

    fn scoring(scores: Arc<CountingScores>) -> Scoring {
        let selector: Arc<dyn KeywordSelector> = Arc::new(RandomPrefixSelector::new(Some(1)));
        Scoring { scores, selector }
    }

    fn pdf(name: &str) -> UploadedFile {
        UploadedFile::new(name, Some("application/pdf".to_string()), Bytes::from_static(b"%PDF"))
    }

    async fn wait_until<F>(handle: &SessionHandle, mut done: F) -> SessionSnapshot
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        for _ in 0..1000 {
            let snapshot = handle.snapshot().await.unwrap();
            if done(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    async fn ready_session(
        handle: &SessionHandle,
        files: &[&str],
        job: &str,
    ) {
        handle
            .add_files(files.iter().map(|n| pdf(n)).collect())
            .await
            .unwrap();
        handle.set_job_description(job.to_string()).await.unwrap();
    }

    #[tokio::test]
    async fn test_analysis_ranks_all_files() {
        let scores = Arc::new(CountingScores::default());
        let sink = Arc::new(RecordingSink::default());
        let handle = spawn(settings(0, None), scoring(scores.clone()), sink.clone());

        ready_session(&handle, &["a.pdf", "b_c.pdf", "d.pdf"], "React and SQL").await;
        let started = handle.start_analysis().await.unwrap();
        assert_eq!(started.file_count, 3);
        assert_eq!(started.keywords, vec!["React", "SQL"]);

        let snapshot = wait_until(&handle, |s| s.status == AnalysisStatus::Complete).await;
        assert_eq!(snapshot.results.len(), 3);
        let ranks: Vec<u32> = snapshot.results.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(snapshot.results[1].name, "B c");
        assert_eq!(snapshot.delivery, DeliveryStatus::Skipped);
        assert!(sink.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_files_never_invokes_engine() {
        let scores = Arc::new(CountingScores::default());
        let handle = spawn(
            settings(0, None),
            scoring(scores.clone()),
            Arc::new(RecordingSink::default()),
        );
        handle.set_job_description("Python".to_string()).await.unwrap();

        let err = handle.start_analysis().await.unwrap_err();
        assert!(matches!(err, AppError::MissingInput(_)));
        assert_eq!(scores.calls.load(Ordering::SeqCst), 0);
        assert_eq!(handle.snapshot().await.unwrap().status, AnalysisStatus::Ready);
    }

    #[tokio::test]
    async fn test_blank_job_text_keeps_prior_results() {
        let scores = Arc::new(CountingScores::default());
        let handle = spawn(
            settings(0, None),
            scoring(scores.clone()),
            Arc::new(RecordingSink::default()),
        );
        ready_session(&handle, &["a.pdf", "b.pdf"], "Docker").await;
        handle.start_analysis().await.unwrap();
        let before = wait_until(&handle, |s| s.status == AnalysisStatus::Complete).await;
        let calls_before = scores.calls.load(Ordering::SeqCst);

        handle.set_job_description("   \n".to_string()).await.unwrap();
        let err = handle.start_analysis().await.unwrap_err();
        assert!(matches!(err, AppError::MissingInput(_)));

        let after = handle.snapshot().await.unwrap();
        assert_eq!(after.results, before.results);
        assert_eq!(scores.calls.load(Ordering::SeqCst), calls_before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_analysis_rejected_while_in_flight() {
        let scores = Arc::new(CountingScores::default());
        let handle = spawn(
            settings(2000, None),
            scoring(scores),
            Arc::new(RecordingSink::default()),
        );
        ready_session(&handle, &["a.pdf"], "Agile").await;

        handle.start_analysis().await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap().status, AnalysisStatus::Processing);
        let err = handle.start_analysis().await.unwrap_err();
        assert!(matches!(err, AppError::AnalysisInProgress));

        wait_until(&handle, |s| s.status == AnalysisStatus::Complete).await;
        handle.start_analysis().await.unwrap();
    }

    #[tokio::test]
    async fn test_delivery_sends_reduced_payload_to_captured_endpoint() {
        let sink = Arc::new(RecordingSink::default());
        let handle = spawn(
            settings(0, Some("http://hooks.local/rank")),
            scoring(Arc::new(CountingScores::default())),
            sink.clone(),
        );
        ready_session(&handle, &["jane_doe.pdf", "bob.pdf"], "SQL, AWS").await;

        handle.start_analysis().await.unwrap();
        handle
            .set_webhook(Some("http://hooks.local/other".to_string()))
            .await
            .unwrap();

        let snapshot = wait_until(&handle, |s| matches!(s.delivery, DeliveryStatus::Sent { .. })).await;
        let calls = sink.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "http://hooks.local/rank");
        assert_eq!(calls[0].1.rankings.len(), 2);
        assert_eq!(calls[0].1.rankings[0].name, snapshot.results[0].name);
        assert_eq!(calls[0].1.job_title, "Position Analysis");
    }

    #[tokio::test]
    async fn test_delivery_failure_keeps_results() {
        let handle = spawn(
            settings(0, Some("http://127.0.0.1:9/hook")),
            scoring(Arc::new(CountingScores::default())),
            Arc::new(FailingSink),
        );
        ready_session(&handle, &["a.pdf", "b.pdf"], "Git").await;
        handle.start_analysis().await.unwrap();

        let snapshot =
            wait_until(&handle, |s| matches!(s.delivery, DeliveryStatus::Failed { .. })).await;
        assert_eq!(snapshot.status, AnalysisStatus::Complete);
        assert_eq!(snapshot.results.len(), 2);
    }

    #[tokio::test]
    async fn test_pending_delivery_does_not_block_new_analysis() {
        let sink = Arc::new(StalledSink::default());
        let handle = spawn(
            settings(0, Some("http://hooks.local/rank")),
            scoring(Arc::new(CountingScores::default())),
            sink.clone(),
        );
        ready_session(&handle, &["a.pdf"], "Scrum").await;

        handle.start_analysis().await.unwrap();
        wait_until(&handle, |s| s.delivery == DeliveryStatus::Pending).await;

        handle.start_analysis().await.unwrap();
        wait_until(&handle, |s| s.status == AnalysisStatus::Complete).await;

        sink.release.notify_waiters();
    }

    #[tokio::test]
    async fn test_file_commands_go_through_coordinator() {
        let handle = spawn(
            SessionSettings {
                max_files: 2,
                ..settings(0, None)
            },
            scoring(Arc::new(CountingScores::default())),
            Arc::new(RecordingSink::default()),
        );

        let state = handle
            .add_files(vec![pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")])
            .await
            .unwrap();
        assert_eq!(state.count, 2);

        let state = handle.remove_file(7).await.unwrap();
        assert_eq!(state.count, 2);

        let state = handle.remove_file(0).await.unwrap();
        assert_eq!(state.files[0].name, "b.pdf");

        let state = handle.clear_files().await.unwrap();
        assert_eq!(state.count, 0);
    }
}
