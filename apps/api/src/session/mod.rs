// Session: the single owner of all mutable widget state.
// Handlers never touch state directly; they send commands to the coordinator
// task through a `SessionHandle` and await the reply.

pub mod coordinator;

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::delivery::DeliveryOutcome;
use crate::errors::AppError;
use crate::ranking::collection::{CollectionState, UploadedFile};
use crate::ranking::engine::RankedCandidate;
use crate::ranking::scoring::{KeywordSelector, ScoreProvider};

pub use coordinator::spawn;

const COMMAND_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Ready,
    Processing,
    Complete,
}

/// State of the most recent webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Idle,
    /// Ranking finished with no endpoint configured.
    Skipped,
    Pending,
    Sent { at: DateTime<Utc> },
    Failed { reason: String, at: DateTime<Utc> },
}

impl From<DeliveryOutcome> for DeliveryStatus {
    fn from(outcome: DeliveryOutcome) -> Self {
        match outcome {
            DeliveryOutcome::Sent { at } => DeliveryStatus::Sent { at },
            DeliveryOutcome::Failed { reason, at } => DeliveryStatus::Failed { reason, at },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub files: CollectionState,
    pub job_description: String,
    pub webhook_url: Option<String>,
    pub status: AnalysisStatus,
    pub results: Vec<RankedCandidate>,
    pub delivery: DeliveryStatus,
}

/// Returned when an analysis is accepted.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisStarted {
    pub file_count: usize,
    pub keywords: Vec<String>,
}

/// Pluggable scoring backends handed to every analysis.
#[derive(Clone)]
pub struct Scoring {
    pub scores: Arc<dyn ScoreProvider>,
    pub selector: Arc<dyn KeywordSelector>,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub max_files: usize,
    pub analysis_delay: Duration,
    pub webhook_url: Option<String>,
}

pub(crate) type Reply<T> = oneshot::Sender<T>;

pub(crate) enum Command {
    Snapshot(Reply<SessionSnapshot>),
    AddFiles(Vec<UploadedFile>, Reply<CollectionState>),
    RemoveFile(usize, Reply<CollectionState>),
    ClearFiles(Reply<CollectionState>),
    SetJobDescription(String, Reply<()>),
    SetWebhook(Option<String>, Reply<()>),
    StartAnalysis(Reply<Result<AnalysisStarted, AppError>>),
    AnalysisFinished {
        id: u64,
        results: Vec<RankedCandidate>,
    },
    DeliveryFinished {
        id: u64,
        outcome: DeliveryOutcome,
    },
}

/// Cloneable front door to the coordinator task.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, AppError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| anyhow!("session coordinator is not running"))?;
        rx.await
            .map_err(|_| AppError::Internal(anyhow!("session coordinator dropped the request")))
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, AppError> {
        self.request(Command::Snapshot).await
    }

    pub async fn add_files(&self, files: Vec<UploadedFile>) -> Result<CollectionState, AppError> {
        self.request(|reply| Command::AddFiles(files, reply)).await
    }

    pub async fn remove_file(&self, index: usize) -> Result<CollectionState, AppError> {
        self.request(|reply| Command::RemoveFile(index, reply)).await
    }

    pub async fn clear_files(&self) -> Result<CollectionState, AppError> {
        self.request(Command::ClearFiles).await
    }

    pub async fn set_job_description(&self, text: String) -> Result<(), AppError> {
        self.request(|reply| Command::SetJobDescription(text, reply))
            .await
    }

    pub async fn set_webhook(&self, url: Option<String>) -> Result<(), AppError> {
        self.request(|reply| Command::SetWebhook(url, reply)).await
    }

    /// Starts a ranking run. Returns as soon as the run is accepted.
    pub async fn start_analysis(&self) -> Result<AnalysisStarted, AppError> {
        self.request(Command::StartAnalysis).await?
    }
}
