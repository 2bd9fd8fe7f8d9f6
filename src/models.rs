use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a book in the 66-book canon, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BookId(u8);

impl BookId {
    pub(crate) fn from_index(index: usize) -> Self {
        BookId((index + 1) as u8)
    }

    pub fn ordinal(self) -> u8 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize - 1
    }
}

/// Totally ordered verse key: book ordinal, then chapter, then verse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VerseId {
    pub book: BookId,
    pub chapter: u32,
    pub verse: u32,
}

impl VerseId {
    pub fn new(book: BookId, chapter: u32, verse: u32) -> Self {
        VerseId { book, chapter, verse }
    }
}

impl fmt::Display for VerseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.book.ordinal(), self.chapter, self.verse)
    }
}

/// Structured form of a reference such as "Matthew 5:1-7:10".
///
/// `end_chapter` is only set when it differs from `start_chapter` and
/// `end_verse` only when it differs from `start_verse` in the same chapter,
/// so two references denoting the same passage compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParsedReference {
    pub book: BookId,
    pub start_chapter: u32,
    pub start_verse: Option<u32>,
    pub end_chapter: Option<u32>,
    pub end_verse: Option<u32>,
}

impl ParsedReference {
    pub fn last_chapter(&self) -> u32 {
        self.end_chapter.unwrap_or(self.start_chapter)
    }

    /// True when no verse was given, i.e. the reference covers whole chapters.
    pub fn is_whole_chapters(&self) -> bool {
        self.start_verse.is_none()
    }

    pub fn spans_chapters(&self) -> bool {
        self.last_chapter() != self.start_chapter
    }

    /// Verse portion for display: `None` for whole chapters, "16" or
    /// "16-18" within one chapter, "5:1-7:10" across chapters.
    pub fn verses_display(&self) -> Option<String> {
        let start_verse = self.start_verse?;
        match (self.end_chapter, self.end_verse) {
            (Some(end_chapter), Some(end_verse)) => Some(format!(
                "{}:{}-{}:{}",
                self.start_chapter, start_verse, end_chapter, end_verse
            )),
            (None, Some(end_verse)) => Some(format!("{}-{}", start_verse, end_verse)),
            _ => Some(start_verse.to_string()),
        }
    }

    /// Everything after the book name, e.g. "3:16-18" or "1-3".
    pub fn locator(&self) -> String {
        match (self.start_verse, self.end_chapter, self.end_verse) {
            (None, None, _) => self.start_chapter.to_string(),
            (None, Some(end_chapter), _) => format!("{}-{}", self.start_chapter, end_chapter),
            (Some(verse), Some(end_chapter), Some(end_verse)) => format!(
                "{}:{}-{}:{}",
                self.start_chapter, verse, end_chapter, end_verse
            ),
            (Some(verse), _, Some(end_verse)) => {
                format!("{}:{}-{}", self.start_chapter, verse, end_verse)
            }
            (Some(verse), _, None) => format!("{}:{}", self.start_chapter, verse),
        }
    }
}

/// One row of the page dataset: `ref` starts (or lies wholly) on `page`;
/// `spill` marks that its last verse continues onto `page + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRow {
    #[serde(skip)]
    pub line: usize,
    pub page: u32,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default, deserialize_with = "crate::dataset::deserialize_spill")]
    pub spill: bool,
}

/// Pages found for a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSet {
    /// Distinct pages from a dataset lookup, ascending.
    Listed(Vec<u32>),
    /// Inclusive run of pages from an estimate; never materialized.
    Span { start: u32, end: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    pub pages: PageSet,
    pub missing: usize,
    pub approximate: bool,
}

impl PageResult {
    pub fn start(&self) -> u32 {
        match &self.pages {
            PageSet::Listed(pages) => pages.first().copied().unwrap_or(0),
            PageSet::Span { start, .. } => *start,
        }
    }

    pub fn end(&self) -> u32 {
        match &self.pages {
            PageSet::Listed(pages) => pages.last().copied().unwrap_or(0),
            PageSet::Span { end, .. } => *end,
        }
    }

    pub fn is_range(&self) -> bool {
        match &self.pages {
            PageSet::Listed(pages) => pages.len() > 1,
            PageSet::Span { start, end } => end > start,
        }
    }

    pub fn display(&self) -> String {
        match &self.pages {
            PageSet::Listed(pages) => format_pages(pages),
            PageSet::Span { start, end } if end > start => format!("{}-{}", start, end),
            PageSet::Span { start, .. } => start.to_string(),
        }
    }

    pub fn missing_warning(&self) -> Option<String> {
        if self.missing == 0 {
            None
        } else {
            Some(format!("{} verse(s) out of range.", self.missing))
        }
    }
}

/// "1287" for one page, "5-7" for a gapless run, "5,7" otherwise.
pub fn format_pages(pages: &[u32]) -> String {
    match pages {
        [] => String::new(),
        [single] => single.to_string(),
        [first, .., last]
            if last
                .checked_sub(*first)
                .map_or(false, |span| span as usize + 1 == pages.len()) =>
        {
            format!("{}-{}", first, last)
        }
        _ => pages
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// Result document handed to the presentation shell.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ConversionOutcome {
    Success(ConversionSuccess),
    Failure(ConversionFailure),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ConversionSuccess {
    pub reference: String,
    pub page: String,
    pub page_start: u32,
    pub page_end: u32,
    pub is_range: bool,
    pub book: String,
    pub chapter: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verses: Option<String>,
    pub approximate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ConversionFailure {
    pub kind: String,
    pub error: String,
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Success(_))
    }
}
