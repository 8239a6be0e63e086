//! File Collection — the ordered set of resumes the user has uploaded.
//!
//! Adding past the maximum silently drops the overflow and removing an index
//! that does not exist is a no-op. Neither reports an error to the caller.

use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

pub const PDF_MIME: &str = "application/pdf";

/// A single uploaded file. The bytes are held but never parsed.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub id: Uuid,
    pub name: String,
    pub byte_size: u64,
    pub content_type: Option<String>,
    #[allow(dead_code)] // held for the session, never parsed
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content_type: Option<String>, bytes: Bytes) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            byte_size: bytes.len() as u64,
            content_type,
            bytes,
        }
    }
}

/// Whether an upload passes the PDF filter (MIME type or `.pdf` extension).
pub fn is_pdf(name: &str, content_type: Option<&str>) -> bool {
    let mime_ok = content_type
        .map(|ct| ct.eq_ignore_ascii_case(PDF_MIME))
        .unwrap_or(false);
    mime_ok || name.to_ascii_lowercase().ends_with(".pdf")
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub index: usize,
    pub id: Uuid,
    pub name: String,
    pub byte_size: u64,
    pub content_type: Option<String>,
    /// Size in megabytes, two decimals, as shown next to each file.
    pub size_mb: f64,
}

/// What callers see after every collection mutation.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionState {
    pub files: Vec<FileSummary>,
    pub count: usize,
    pub max_files: usize,
    pub is_full: bool,
}

#[derive(Debug, Clone)]
pub struct FileCollection {
    files: Vec<UploadedFile>,
    max_files: usize,
}

impl FileCollection {
    pub fn new(max_files: usize) -> Self {
        Self {
            files: Vec::new(),
            max_files,
        }
    }

    /// Appends files until the maximum is reached; the rest are dropped.
    pub fn add(&mut self, new_files: impl IntoIterator<Item = UploadedFile>) -> CollectionState {
        let remaining = self.remaining();
        let before = self.files.len();
        let mut offered = 0usize;

        for file in new_files {
            offered += 1;
            if self.files.len() - before < remaining {
                self.files.push(file);
            }
        }

        let dropped = offered - (self.files.len() - before);
        if dropped > 0 {
            tracing::debug!(
                dropped,
                max_files = self.max_files,
                "file collection full; overflow dropped"
            );
        }

        self.state()
    }

    /// Removes the file at `index`; out-of-range indices leave the collection unchanged.
    pub fn remove(&mut self, index: usize) -> CollectionState {
        if index < self.files.len() {
            let removed = self.files.remove(index);
            tracing::debug!(index, name = %removed.name, "file removed");
        }
        self.state()
    }

    pub fn clear(&mut self) -> CollectionState {
        self.files.clear();
        self.state()
    }

    pub fn remaining(&self) -> usize {
        self.max_files.saturating_sub(self.files.len())
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn state(&self) -> CollectionState {
        let files = self
            .files
            .iter()
            .enumerate()
            .map(|(index, f)| FileSummary {
                index,
                id: f.id,
                name: f.name.clone(),
                byte_size: f.byte_size,
                content_type: f.content_type.clone(),
                size_mb: size_in_mb(f.byte_size),
            })
            .collect();

        CollectionState {
            files,
            count: self.files.len(),
            max_files: self.max_files,
            is_full: self.files.len() >= self.max_files,
        }
    }
}

fn size_in_mb(bytes: u64) -> f64 {
    (bytes as f64 / 1024.0 / 1024.0 * 100.0).round() / 100.0
}
