//! Result Exporter — CSV report and webhook notification payload.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::ranking::engine::RankedCandidate;

pub const REPORT_FILE_NAME: &str = "resume-rankings.csv";
pub const REPORT_CONTENT_TYPE: &str = "text/csv";
pub const CSV_HEADER: &str = "Rank,Name,Score,Matched Keywords,File Name";
pub const DEFAULT_JOB_TITLE: &str = "Position Analysis";

/// Renders the HR report. Lines are `\n`-separated with no trailing newline;
/// only the keyword column is quoted.
pub fn to_csv(candidates: &[RankedCandidate]) -> String {
    let mut lines = Vec::with_capacity(candidates.len() + 1);
    lines.push(CSV_HEADER.to_string());
    lines.extend(candidates.iter().map(|c| {
        format!(
            "{},{},{},\"{}\",{}",
            c.rank,
            c.name,
            c.score,
            c.matched_keywords.join(", "),
            c.file_name
        )
    }));
    lines.join("\n")
}

/// Context attached to a notification.
#[derive(Debug, Clone)]
pub struct PayloadMetadata {
    pub job_title: String,
    pub generated_at: DateTime<Utc>,
}

impl PayloadMetadata {
    pub fn now() -> Self {
        Self {
            job_title: DEFAULT_JOB_TITLE.to_string(),
            generated_at: Utc::now(),
        }
    }
}

/// Per-candidate entry on the wire. Keywords and file name are not sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub name: String,
    pub score: u8,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub job_title: String,
    /// ISO-8601, UTC, millisecond precision.
    pub timestamp: String,
    pub rankings: Vec<RankingEntry>,
}

pub fn to_notification_payload(
    candidates: &[RankedCandidate],
    metadata: &PayloadMetadata,
) -> NotificationPayload {
    NotificationPayload {
        job_title: metadata.job_title.clone(),
        timestamp: metadata
            .generated_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        rankings: candidates
            .iter()
            .map(|c| RankingEntry {
                name: c.name.clone(),
                score: c.score,
                rank: c.rank,
            })
            .collect(),
    }
}
