use crate::books::{Book, BookRegistry};
use crate::error::ReferenceError;
use crate::models::{ParsedReference, VerseId};
use anyhow::{Context, Result};
use regex::{Captures, Regex};
use std::fmt;
use std::sync::Arc;

/// Optional leading ordinal followed by one or more words, e.g.
/// "1 John", "1Cor", "Song of Solomon", "II Kings", "Gen.".
const BOOK: &str = r"(?P<book>[1-3]?\s*[a-z][a-z.\s]*?)";

/// Grammar rules in precedence order. The patterns overlap, so the first
/// rule that matches decides how the input is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarRule {
    /// `<book> <chapter>-<chapter>`
    ChapterRange,
    /// `<book> <chapter>:<verse>-<chapter>:<verse>`
    CrossChapterRange,
    /// `<book> <chapter>:<verse>` or `<book> <chapter>:<verse>-<verse>`
    VerseRange,
    /// `<book> <chapter>`
    WholeChapter,
}

impl GrammarRule {
    pub const PRECEDENCE: [GrammarRule; 4] = [
        GrammarRule::ChapterRange,
        GrammarRule::CrossChapterRange,
        GrammarRule::VerseRange,
        GrammarRule::WholeChapter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GrammarRule::ChapterRange => "chapter-range",
            GrammarRule::CrossChapterRange => "cross-chapter-range",
            GrammarRule::VerseRange => "verse-range",
            GrammarRule::WholeChapter => "whole-chapter",
        }
    }

    fn pattern(self) -> String {
        let body = match self {
            GrammarRule::ChapterRange => r"(?P<c1>\d+)\s*-\s*(?P<c2>\d+)",
            GrammarRule::CrossChapterRange => {
                r"(?P<c1>\d+)\s*:\s*(?P<v1>\d+)\s*-\s*(?P<c2>\d+)\s*:\s*(?P<v2>\d+)"
            }
            GrammarRule::VerseRange => r"(?P<c1>\d+)\s*:\s*(?P<v1>\d+)(?:\s*-\s*(?P<v2>\d+))?",
            GrammarRule::WholeChapter => r"(?P<c1>\d+)",
        };
        format!(r"(?i)^{}\s*{}$", BOOK, body)
    }
}

impl fmt::Display for GrammarRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct CompiledRule {
    rule: GrammarRule,
    pattern: Regex,
}

/// Raw numbers captured by a rule, before book resolution and bounds checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule: GrammarRule,
    pub book: String,
    pub start_chapter: u32,
    pub start_verse: Option<u32>,
    pub end_chapter: Option<u32>,
    pub end_verse: Option<u32>,
}

pub struct ReferenceParser {
    registry: Arc<BookRegistry>,
    rules: Vec<CompiledRule>,
    whitespace_pattern: Regex,
}

impl ReferenceParser {
    pub fn new(registry: Arc<BookRegistry>) -> Result<Self> {
        let rules = GrammarRule::PRECEDENCE
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern())
                    .with_context(|| format!("Failed to compile {} pattern", rule))
                    .map(|pattern| CompiledRule {
                        rule: *rule,
                        pattern,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ReferenceParser {
            registry,
            rules,
            whitespace_pattern: Regex::new(r"\s+")
                .context("Failed to compile whitespace pattern")?,
        })
    }

    pub fn registry(&self) -> &Arc<BookRegistry> {
        &self.registry
    }

    /// Parses a free-text reference into a validated structure.
    pub fn parse(&self, raw: &str) -> std::result::Result<ParsedReference, ReferenceError> {
        let input = self.normalize_input(raw);
        let matched = self
            .match_rule(&input)
            .ok_or_else(|| ReferenceError::FormatNotRecognized {
                input: raw.trim().to_string(),
            })?;

        let book_id = self.registry.resolve_book(&matched.book).ok_or_else(|| {
            ReferenceError::BookNotRecognized {
                token: matched.book.trim().to_string(),
                suggestion: self.registry.suggest(&matched.book).map(str::to_string),
            }
        })?;
        let book = self.registry.book(book_id);

        if [Some(matched.start_chapter), matched.start_verse, matched.end_chapter, matched.end_verse]
            .iter()
            .any(|n| *n == Some(0))
        {
            return Err(ReferenceError::FormatNotRecognized {
                input: raw.trim().to_string(),
            });
        }

        let end_chapter = matched.end_chapter.unwrap_or(matched.start_chapter);
        check_chapter(book, matched.start_chapter)?;
        check_chapter(book, end_chapter)?;
        if let Some(verse) = matched.start_verse {
            check_verse(book, matched.start_chapter, verse)?;
        }
        if let Some(verse) = matched.end_verse {
            check_verse(book, end_chapter, verse)?;
        }

        let start = VerseId::new(book_id, matched.start_chapter, matched.start_verse.unwrap_or(1));
        let end = VerseId::new(book_id, end_chapter, matched.end_verse.unwrap_or(start.verse));
        if end < start {
            return Err(ReferenceError::InvertedRange {
                input: raw.trim().to_string(),
            });
        }

        let same_chapter = end_chapter == matched.start_chapter;
        Ok(ParsedReference {
            book: book_id,
            start_chapter: matched.start_chapter,
            start_verse: matched.start_verse,
            end_chapter: if same_chapter { None } else { Some(end_chapter) },
            end_verse: matched.end_verse.filter(|v| !same_chapter || Some(*v) != matched.start_verse),
        })
    }

    /// First rule (in precedence order) whose pattern matches `input`.
    pub fn match_rule(&self, input: &str) -> Option<RuleMatch> {
        self.rules.iter().find_map(|compiled| {
            compiled
                .pattern
                .captures(input)
                .and_then(|caps| rule_match(compiled.rule, &caps))
        })
    }

    /// Tries a single rule in isolation, ignoring precedence.
    pub fn match_single_rule(&self, rule: GrammarRule, input: &str) -> Option<RuleMatch> {
        self.rules
            .iter()
            .find(|compiled| compiled.rule == rule)
            .and_then(|compiled| compiled.pattern.captures(input))
            .and_then(|caps| rule_match(rule, &caps))
    }

    /// Canonical display text, e.g. "Song of Solomon 2:1-4".
    pub fn format(&self, reference: &ParsedReference) -> String {
        format!(
            "{} {}",
            self.registry.book(reference.book).name(),
            reference.locator()
        )
    }

    /// Every verse id the reference covers, in order. Whole chapters expand
    /// to all of their verses.
    pub fn expand(&self, reference: &ParsedReference) -> Vec<VerseId> {
        self.registry.expand(reference)
    }

    fn normalize_input(&self, raw: &str) -> String {
        let dashed = raw.trim().replace(['\u{2013}', '\u{2014}'], "-");
        self.whitespace_pattern.replace_all(&dashed, " ").into_owned()
    }
}

fn rule_match(rule: GrammarRule, caps: &Captures) -> Option<RuleMatch> {
    let number = |name: &str| -> Option<Option<u32>> {
        match caps.name(name) {
            Some(m) => m.as_str().parse::<u32>().ok().map(Some),
            None => Some(None),
        }
    };

    Some(RuleMatch {
        rule,
        book: caps.name("book")?.as_str().trim().to_string(),
        start_chapter: number("c1")??,
        start_verse: number("v1")?,
        end_chapter: number("c2")?,
        end_verse: number("v2")?,
    })
}

fn check_chapter(book: &Book, chapter: u32) -> std::result::Result<(), ReferenceError> {
    if chapter > book.chapter_count() {
        return Err(ReferenceError::ChapterOutOfRange {
            book: book.name().to_string(),
            chapter,
            chapters: book.chapter_count(),
        });
    }
    Ok(())
}

fn check_verse(book: &Book, chapter: u32, verse: u32) -> std::result::Result<(), ReferenceError> {
    let verses = book.verse_count(chapter).unwrap_or(0);
    if verse > verses {
        return Err(ReferenceError::VerseOutOfRange {
            book: book.name().to_string(),
            chapter,
            verse,
            verses,
        });
    }
    Ok(())
}
