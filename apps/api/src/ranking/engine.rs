//! Ranking Engine — turns uploaded files into an ordered candidate list.
//!
//! The engine itself is pure: all scoring and keyword selection is delegated
//! to the injected `ScoreProvider` / `KeywordSelector`.
//!
//! Algorithm:
//! 1. display name from the file name
//! 2. score from the provider (clamped to 100)
//! 3. matched keywords from the selector
//! 4. stable sort by descending score (ties keep upload order)
//! 5. rank = 1-based position

use serde::{Deserialize, Serialize};

use crate::ranking::collection::UploadedFile;
use crate::ranking::scoring::{KeywordSelector, ScoreProvider, MAX_SCORE};

/// One ranked result derived from one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    pub name: String,
    pub score: u8,
    pub rank: u32,
    pub matched_keywords: Vec<String>,
    pub file_name: String,
}

/// Coarse tier used when presenting a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Strong,
    Moderate,
    Low,
}

impl ScoreBand {
    pub fn from_score(score: u8) -> Self {
        if score >= 90 {
            ScoreBand::Strong
        } else if score >= 75 {
            ScoreBand::Moderate
        } else {
            ScoreBand::Low
        }
    }
}

impl RankedCandidate {
    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_score(self.score)
    }
}

/// Derives a human-readable name from an uploaded file name:
/// trailing `.pdf` removed, `-`/`_` become spaces, first letter uppercased.
pub fn display_name(file_name: &str) -> String {
    let stem = file_name.strip_suffix(".pdf").unwrap_or(file_name);
    let spaced: String = stem
        .chars()
        .map(|c| if c == '-' || c == '_' { ' ' } else { c })
        .collect();

    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Ranks `files` against the extracted `keywords`.
///
/// Returns an empty list for no files; callers reject that case earlier.
pub fn rank(
    files: &[UploadedFile],
    keywords: &[String],
    scores: &dyn ScoreProvider,
    selector: &dyn KeywordSelector,
) -> Vec<RankedCandidate> {
    let mut candidates: Vec<RankedCandidate> = files
        .iter()
        .map(|file| {
            let matched_keywords = if keywords.is_empty() {
                Vec::new()
            } else {
                selector.select(file, keywords)
            };

            RankedCandidate {
                name: display_name(&file.name),
                score: scores.score(file, keywords).min(MAX_SCORE),
                rank: 0,
                matched_keywords,
                file_name: file.name.clone(),
            }
        })
        .collect();

    // `sort_by` is stable.
    candidates.sort_by(|a, b| b.score.cmp(&a.score));

    for (i, candidate) in candidates.iter_mut().enumerate() {
        candidate.rank = i as u32 + 1;
    }

    tracing::debug!(
        candidates = candidates.len(),
        keywords = keywords.len(),
        scorer = scores.name(),
        "ranking computed"
    );

    candidates
}
