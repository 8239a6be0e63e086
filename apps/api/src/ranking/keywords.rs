//! Keyword Extractor — matches job text against a fixed skill vocabulary.

/// Known skill and trait terms, in reporting order.
pub const KEYWORD_VOCABULARY: &[&str] = &[
    "JavaScript",
    "Python",
    "React",
    "Node.js",
    "SQL",
    "AWS",
    "Docker",
    "Git",
    "Agile",
    "Scrum",
    "TypeScript",
    "API",
    "Database",
    "Leadership",
    "Communication",
    "Problem Solving",
    "Team Work",
    "Project Management",
];

/// Returns every vocabulary term contained (case-insensitively) in `text`,
/// in vocabulary order. Plain substring containment: no word boundaries.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let text_lower = text.to_lowercase();
    KEYWORD_VOCABULARY
        .iter()
        .filter(|kw| text_lower.contains(&kw.to_lowercase()))
        .map(|kw| kw.to_string())
        .collect()
}
