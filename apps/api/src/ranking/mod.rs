// Resume ranking pipeline.
// Implements: file collection, keyword extraction, pluggable scoring, ranking, export.
// Everything here is synchronous and side-effect free except the handlers.

pub mod collection;
pub mod engine;
pub mod export;
pub mod handlers;
pub mod keywords;
pub mod scoring;
