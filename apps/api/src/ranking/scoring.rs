//! Scoring policies — pluggable score and keyword-selection providers.
//!
//! Default: `RandomScoreProvider` + `RandomPrefixSelector`, which reproduce the
//! demo behaviour (uniform score in 60–100, a 2–4 keyword prefix).
//! A real text-similarity provider can replace either without touching the
//! ranking engine.
//!
//! `AppState` holds both as `Arc<dyn ...>`, chosen at startup.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ranking::collection::UploadedFile;

pub const MAX_SCORE: u8 = 100;

// ────────────────────────────────────────────────────────────────────────────
// Trait definitions
// ────────────────────────────────────────────────────────────────────────────

/// Assigns a 0–100 score to one file given the extracted job keywords.
pub trait ScoreProvider: Send + Sync {
    fn score(&self, file: &UploadedFile, keywords: &[String]) -> u8;

    /// Backend label, for logs.
    fn name(&self) -> &'static str;
}

/// Chooses which of the extracted keywords a file is reported as matching.
/// Implementations must return a sub-sequence of `keywords`.
pub trait KeywordSelector: Send + Sync {
    fn select(&self, file: &UploadedFile, keywords: &[String]) -> Vec<String>;
}

// ────────────────────────────────────────────────────────────────────────────
// Random demo providers
// ────────────────────────────────────────────────────────────────────────────

fn make_rng(seed: Option<u64>) -> Mutex<StdRng> {
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    Mutex::new(rng)
}

/// Uniform random score in [60, 100], rounded. Stands in for real scoring.
pub struct RandomScoreProvider {
    rng: Mutex<StdRng>,
}

impl RandomScoreProvider {
    pub const MIN: f64 = 60.0;
    pub const SPAN: f64 = 40.0;

    pub fn new(seed: Option<u64>) -> Self {
        Self { rng: make_rng(seed) }
    }
}

impl ScoreProvider for RandomScoreProvider {
    fn score(&self, _file: &UploadedFile, _keywords: &[String]) -> u8 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let raw: f64 = rng.random::<f64>() * Self::SPAN + Self::MIN;
        raw.round() as u8
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// Reports a random-length prefix (2 to 4 terms) of the extracted keywords.
pub struct RandomPrefixSelector {
    rng: Mutex<StdRng>,
}

impl RandomPrefixSelector {
    pub const MIN_LEN: usize = 2;
    pub const MAX_LEN: usize = 4;

    pub fn new(seed: Option<u64>) -> Self {
        // Distinct stream from RandomScoreProvider under the same seed.
        Self {
            rng: make_rng(seed.map(|s| s.wrapping_add(1))),
        }
    }
}

impl KeywordSelector for RandomPrefixSelector {
    fn select(&self, _file: &UploadedFile, keywords: &[String]) -> Vec<String> {
        if keywords.is_empty() {
            return Vec::new();
        }
        let len = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            rng.random_range(Self::MIN_LEN..=Self::MAX_LEN)
        };
        keywords.iter().take(len).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn file() -> UploadedFile {
        UploadedFile::new("jane.pdf", None, Bytes::new())
    }

    fn kws(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_random_score_in_demo_range() {
        let provider = RandomScoreProvider::new(None);
        for _ in 0..500 {
            let score = provider.score(&file(), &[]);
            assert!((60..=100).contains(&score), "score {score} out of range");
        }
    }

    #[test]
    fn test_seeded_scores_are_reproducible() {
        let a = RandomScoreProvider::new(Some(42));
        let b = RandomScoreProvider::new(Some(42));
        let sa: Vec<u8> = (0..20).map(|_| a.score(&file(), &[])).collect();
        let sb: Vec<u8> = (0..20).map(|_| b.score(&file(), &[])).collect();
        assert_eq!(sa, sb);
    }

    #[test]
    fn test_prefix_selector_returns_prefix_of_2_to_4() {
        let selector = RandomPrefixSelector::new(Some(7));
        let keywords = kws(&["React", "SQL", "AWS", "Docker", "Git", "Agile"]);
        for _ in 0..200 {
            let picked = selector.select(&file(), &keywords);
            assert!((2..=4).contains(&picked.len()));
            assert_eq!(picked[..], keywords[..picked.len()]);
        }
    }

    #[test]
    fn test_prefix_selector_truncates_to_available() {
        let selector = RandomPrefixSelector::new(None);
        let keywords = kws(&["SQL"]);
        for _ in 0..50 {
            assert_eq!(selector.select(&file(), &keywords), keywords);
        }
    }

    #[test]
    fn test_prefix_selector_empty_keywords() {
        let selector = RandomPrefixSelector::new(None);
        assert!(selector.select(&file(), &[]).is_empty());
    }

    #[test]
    fn test_provider_name() {
        assert_eq!(RandomScoreProvider::new(None).name(), "random");
    }
}
