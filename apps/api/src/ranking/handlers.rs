//! Axum route handlers for the Ranking API.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::normalize_webhook;
use crate::errors::AppError;
use crate::ranking::collection::{is_pdf, CollectionState, UploadedFile};
use crate::ranking::engine::{RankedCandidate, ScoreBand};
use crate::ranking::export::{to_csv, REPORT_CONTENT_TYPE, REPORT_FILE_NAME};
use crate::ranking::keywords::{extract_keywords, KEYWORD_VOCABULARY};
use crate::session::{AnalysisStarted, AnalysisStatus, DeliveryStatus, SessionSnapshot};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    pub collection: CollectionState,
    /// Names of uploads that failed the PDF filter.
    pub rejected: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct KeywordsResponse {
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CandidateView {
    #[serde(flatten)]
    pub candidate: RankedCandidate,
    pub band: ScoreBand,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub status: AnalysisStatus,
    pub file_count: usize,
    pub results: Vec<CandidateView>,
    pub delivery: DeliveryStatus,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/session
pub async fn handle_get_session(
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.session.snapshot().await?))
}

/// GET /api/v1/files
pub async fn handle_list_files(
    State(state): State<AppState>,
) -> Result<Json<CollectionState>, AppError> {
    Ok(Json(state.session.snapshot().await?.files))
}

/// POST /api/v1/files
///
/// Multipart upload. Every part carrying a file name is considered; parts
/// that are not PDFs are skipped, and anything past the file limit is dropped.
pub async fn handle_upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);

        if !is_pdf(&name, content_type.as_deref()) {
            debug!(name = %name, content_type = ?content_type, "Skipping non-PDF upload");
            rejected.push(name);
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read '{name}': {e}")))?;

        accepted.push(UploadedFile::new(name, content_type, bytes));
    }

    let collection = state.session.add_files(accepted).await?;
    Ok(Json(UploadResponse {
        collection,
        rejected,
    }))
}

/// DELETE /api/v1/files/:index
pub async fn handle_remove_file(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<CollectionState>, AppError> {
    Ok(Json(state.session.remove_file(index).await?))
}

/// DELETE /api/v1/files
pub async fn handle_clear_files(
    State(state): State<AppState>,
) -> Result<Json<CollectionState>, AppError> {
    Ok(Json(state.session.clear_files().await?))
}

/// PUT /api/v1/job-description
///
/// Stores the job text and echoes the keywords it currently matches.
pub async fn handle_set_job_description(
    State(state): State<AppState>,
    Json(request): Json<TextRequest>,
) -> Result<Json<KeywordsResponse>, AppError> {
    let keywords = extract_keywords(&request.text);
    state.session.set_job_description(request.text).await?;
    Ok(Json(KeywordsResponse { keywords }))
}

/// PUT /api/v1/webhook
///
/// A missing or blank URL disables delivery.
pub async fn handle_set_webhook(
    State(state): State<AppState>,
    Json(request): Json<WebhookRequest>,
) -> Result<StatusCode, AppError> {
    let url = request.url.as_deref().and_then(normalize_webhook);
    state.session.set_webhook(url).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/keywords
pub async fn handle_vocabulary() -> Json<&'static [&'static str]> {
    Json(KEYWORD_VOCABULARY)
}

/// POST /api/v1/keywords/extract
pub async fn handle_extract_keywords(Json(request): Json<TextRequest>) -> Json<KeywordsResponse> {
    Json(KeywordsResponse {
        keywords: extract_keywords(&request.text),
    })
}

/// POST /api/v1/analysis
///
/// Starts ranking and returns immediately; poll GET /api/v1/analysis.
pub async fn handle_start_analysis(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<AnalysisStarted>), AppError> {
    let started = state.session.start_analysis().await?;
    Ok((StatusCode::ACCEPTED, Json(started)))
}

/// GET /api/v1/analysis
pub async fn handle_get_analysis(
    State(state): State<AppState>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let snapshot = state.session.snapshot().await?;
    Ok(Json(AnalysisResponse {
        status: snapshot.status,
        file_count: snapshot.files.count,
        results: snapshot
            .results
            .into_iter()
            .map(|candidate| CandidateView {
                band: candidate.band(),
                candidate,
            })
            .collect(),
        delivery: snapshot.delivery,
    }))
}

/// GET /api/v1/report.csv
pub async fn handle_download_report(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state.session.snapshot().await?;
    if snapshot.results.is_empty() {
        return Err(AppError::NotFound(
            "No rankings available; run an analysis first".to_string(),
        ));
    }

    let headers = [
        (header::CONTENT_TYPE, REPORT_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{REPORT_FILE_NAME}\""),
        ),
    ];
    Ok((headers, to_csv(&snapshot.results)))
}
