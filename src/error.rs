//! User-facing lookup errors and non-fatal dataset build warnings.
//!
//! Both are plain data: the shell renders them, nothing here is raised as
//! control flow.

use thiserror::Error;

/// Why a reference could not be turned into pages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    /// No book alias matched the book token.
    #[error("Unknown book \"{token}\"{}", suggestion_suffix(.suggestion))]
    BookNotRecognized {
        token: String,
        suggestion: Option<String>,
    },

    /// No grammar rule matched the input.
    #[error("Unrecognized reference format: \"{input}\" (expected e.g. \"John 3:16\", \"Genesis 1-3\", \"Matthew 5:1-7:10\")")]
    FormatNotRecognized { input: String },

    #[error("{book} has {chapters} chapter(s); chapter {chapter} does not exist")]
    ChapterOutOfRange {
        book: String,
        chapter: u32,
        chapters: u32,
    },

    #[error("{book} {chapter} has {verses} verse(s); verse {verse} does not exist")]
    VerseOutOfRange {
        book: String,
        chapter: u32,
        verse: u32,
        verses: u32,
    },

    /// The range ends before it starts, e.g. "John 5-3".
    #[error("Range ends before it starts: \"{input}\"")]
    InvertedRange { input: String },

    /// Parsed fine, but the page map covers none of its verses.
    #[error("Reference not found in page map: all {missing} verse(s) of {reference} out of range")]
    RangeOutOfData { reference: String, missing: usize },
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean \"{}\"?)", name),
        None => String::new(),
    }
}

impl ReferenceError {
    /// Stable machine-readable code used in JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            ReferenceError::BookNotRecognized { .. } => "book_not_recognized",
            ReferenceError::FormatNotRecognized { .. } => "format_not_recognized",
            ReferenceError::ChapterOutOfRange { .. } => "chapter_out_of_range",
            ReferenceError::VerseOutOfRange { .. } => "verse_out_of_range",
            ReferenceError::InvertedRange { .. } => "inverted_range",
            ReferenceError::RangeOutOfData { .. } => "range_out_of_data",
        }
    }
}

/// Problems found while loading or building the page map. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildWarning {
    #[error("Skipping invalid ref {reference:?} (line {line}): {reason}")]
    RowInvalid {
        line: usize,
        reference: String,
        reason: String,
    },

    #[error("Overlap: verse {verse} on page {page} also appears on pages {existing:?} (line {line})")]
    Overlap {
        line: usize,
        verse: String,
        existing: Vec<u32>,
        page: u32,
    },
}

impl BuildWarning {
    pub fn kind(&self) -> &'static str {
        match self {
            BuildWarning::RowInvalid { .. } => "dataset_row_invalid",
            BuildWarning::Overlap { .. } => "overlap_detected",
        }
    }

    /// Structured context for the diagnostic log.
    pub fn context(&self) -> serde_json::Value {
        match self {
            BuildWarning::RowInvalid {
                line,
                reference,
                reason,
            } => serde_json::json!({
                "kind": self.kind(),
                "line": line,
                "reference": reference,
                "reason": reason,
            }),
            BuildWarning::Overlap {
                line,
                verse,
                existing,
                page,
            } => serde_json::json!({
                "kind": self.kind(),
                "line": line,
                "verse": verse,
                "pages": existing,
                "page": page,
            }),
        }
    }
}
