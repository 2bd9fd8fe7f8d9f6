use crate::canon::{BookRecord, CANON, HISTORICAL_NAMES};
use crate::models::{BookId, ParsedReference, VerseId};
use anyhow::Result;
use std::collections::HashMap;
use strsim::jaro_winkler;

const SUGGESTION_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone)]
pub struct Book {
    id: BookId,
    name: &'static str,
    abbreviations: &'static [&'static str],
    base_page: u32,
    verse_counts: &'static [u32],
}

impl Book {
    pub fn id(&self) -> BookId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn abbreviations(&self) -> &'static [&'static str] {
        self.abbreviations
    }

    /// First page of the book in the target edition, used for estimates.
    pub fn base_page(&self) -> u32 {
        self.base_page
    }

    pub fn chapter_count(&self) -> u32 {
        self.verse_counts.len() as u32
    }

    pub fn verse_count(&self, chapter: u32) -> Option<u32> {
        if chapter == 0 {
            return None;
        }
        self.verse_counts.get(chapter as usize - 1).copied()
    }

    pub fn verse_total(&self) -> u32 {
        self.verse_counts.iter().sum()
    }
}

/// Immutable book table plus the precomputed alias index.
///
/// Built once and shared; every `BookId` handed out by a registry indexes
/// into the same 66-entry canon.
#[derive(Debug, Clone)]
pub struct BookRegistry {
    books: Vec<Book>,
    aliases: HashMap<String, BookId>,
}

impl BookRegistry {
    pub fn standard() -> Result<Self> {
        Self::from_records(&CANON)
    }

    fn from_records(records: &'static [BookRecord]) -> Result<Self> {
        let mut books = Vec::with_capacity(records.len());
        let mut aliases: HashMap<String, BookId> = HashMap::new();

        for (index, record) in records.iter().enumerate() {
            let id = BookId::from_index(index);
            for alias in std::iter::once(&record.name).chain(record.abbreviations.iter()) {
                let key = alias_key(alias);
                if let Some(existing) = aliases.insert(key.clone(), id) {
                    if existing != id {
                        return Err(anyhow::anyhow!(
                            "Alias '{}' maps to both {} and {}",
                            key,
                            records[existing.index()].name,
                            record.name
                        ));
                    }
                }
            }
            books.push(Book {
                id,
                name: record.name,
                abbreviations: record.abbreviations,
                base_page: record.base_page,
                verse_counts: record.verse_counts,
            });
        }

        Ok(BookRegistry { books, aliases })
    }

    pub fn book(&self, id: BookId) -> &Book {
        &self.books[id.index()]
    }

    pub fn books(&self) -> impl Iterator<Item = &Book> {
        self.books.iter()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Case-insensitive, whitespace- and period-insensitive alias lookup.
    pub fn resolve_book(&self, token: &str) -> Option<BookId> {
        self.aliases.get(&alias_key(token)).copied()
    }

    /// Closest canonical book name for a token that failed to resolve.
    pub fn suggest(&self, token: &str) -> Option<&'static str> {
        let key = alias_key(token);
        if key.is_empty() {
            return None;
        }

        let mut best: Option<(f64, BookId)> = None;
        for (alias, id) in &self.aliases {
            let score = jaro_winkler(&key, alias);
            let better = match best {
                None => true,
                Some((best_score, best_id)) => {
                    score > best_score || (score == best_score && *id < best_id)
                }
            };
            if better {
                best = Some((score, *id));
            }
        }

        best.filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .map(|(_, id)| self.book(id).name)
    }

    /// Display form such as "John 3:16" for a single verse id.
    pub fn describe_verse(&self, verse: VerseId) -> String {
        format!("{} {}:{}", self.book(verse.book).name, verse.chapter, verse.verse)
    }

    /// The verse following `verse` in canonical order, crossing chapter and
    /// book boundaries. `None` after Revelation 22:21 or for ids outside the
    /// versification table.
    pub fn next_verse(&self, verse: VerseId) -> Option<VerseId> {
        let book = self.book(verse.book);
        let verses = book.verse_count(verse.chapter)?;
        if verse.verse < verses {
            return Some(VerseId::new(verse.book, verse.chapter, verse.verse + 1));
        }
        if verse.chapter < book.chapter_count() {
            return Some(VerseId::new(verse.book, verse.chapter + 1, 1));
        }
        let next_index = verse.book.index() + 1;
        if next_index < self.books.len() {
            return Some(VerseId::new(BookId::from_index(next_index), 1, 1));
        }
        None
    }

    /// First and last verse a reference covers. Whole chapters run from
    /// verse 1 of the first chapter to the last verse of the last chapter.
    pub fn bounds(&self, reference: &ParsedReference) -> (VerseId, VerseId) {
        let last_chapter = reference.last_chapter();
        let start = VerseId::new(
            reference.book,
            reference.start_chapter,
            reference.start_verse.unwrap_or(1),
        );
        let end_verse = match (reference.start_verse, reference.end_verse) {
            (_, Some(verse)) => verse,
            (Some(verse), None) if !reference.spans_chapters() => verse,
            _ => self
                .book(reference.book)
                .verse_count(last_chapter)
                .unwrap_or(0),
        };
        (start, VerseId::new(reference.book, last_chapter, end_verse))
    }

    /// Every verse id a reference covers, in canonical order.
    pub fn expand(&self, reference: &ParsedReference) -> Vec<VerseId> {
        let (start, end) = self.bounds(reference);
        self.verses_between(start, end)
    }

    /// Every verse id from `start` to `end`, both inclusive. Empty when
    /// `end` precedes `start`.
    pub fn verses_between(&self, start: VerseId, end: VerseId) -> Vec<VerseId> {
        let mut verses = Vec::new();
        let mut current = Some(start);
        while let Some(verse) = current {
            if verse > end {
                break;
            }
            verses.push(verse);
            current = self.next_verse(verse);
        }
        verses
    }
}

/// Normalized lookup key: lowercase, periods dropped, ordinal words and
/// roman numerals turned into digits, historical names mapped to their
/// canonical form, then all whitespace removed.
pub fn alias_key(token: &str) -> String {
    let lowered = token.to_lowercase().replace('.', " ");
    let mut words: Vec<&str> = lowered.split_whitespace().collect();

    if words.len() > 1 {
        let ordinal = match words[0] {
            "i" | "first" | "1st" => Some("1"),
            "ii" | "second" | "2nd" => Some("2"),
            "iii" | "third" | "3rd" => Some("3"),
            _ => None,
        };
        if let Some(digit) = ordinal {
            words[0] = digit;
        }
    }

    let compact: String = words.concat();
    HISTORICAL_NAMES
        .iter()
        .find(|(historical, _)| *historical == compact)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(compact)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> BookRegistry {
        BookRegistry::standard().unwrap()
    }

    #[test]
    fn test_standard_registry_shape() {
        let registry = registry();
        assert_eq!(registry.len(), 66);

        let chapters: u32 = registry.books().map(|b| b.chapter_count()).sum();
        let verses: u32 = registry.books().map(|b| b.verse_total()).sum();
        assert_eq!(chapters, 1189);
        assert_eq!(verses, 31102);
    }

    #[test]
    fn test_base_pages_increase_through_canon() {
        let registry = registry();
        let pages: Vec<u32> = registry.books().map(|b| b.base_page()).collect();
        assert_eq!(pages[0], 1);
        assert!(pages.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_resolve_book_aliases() {
        let registry = registry();
        let john = registry.resolve_book("John").unwrap();
        assert_eq!(registry.book(john).name(), "John");
        assert_eq!(john.ordinal(), 43);

        assert_eq!(registry.resolve_book("  jOhN "), Some(john));
        assert_eq!(registry.resolve_book("Jn"), Some(john));
        assert_eq!(registry.resolve_book("Gen."), registry.resolve_book("Genesis"));
        assert_eq!(registry.resolve_book("1Cor"), registry.resolve_book("1 Corinthians"));
        assert_eq!(registry.resolve_book("1   cor"), registry.resolve_book("1 Corinthians"));
        assert_eq!(registry.resolve_book("Psalm"), registry.resolve_book("Psalms"));
        assert_eq!(registry.resolve_book("Zzz"), None);
        assert_eq!(registry.resolve_book(""), None);
    }

    #[test]
    fn test_historical_song_names_normalize() {
        let registry = registry();
        let song = registry.resolve_book("Song of Solomon").unwrap();
        assert_eq!(registry.book(song).name(), "Song of Solomon");
        assert_eq!(registry.resolve_book("Song of Songs"), Some(song));
        assert_eq!(registry.resolve_book("song of   songs"), Some(song));
        assert_eq!(registry.resolve_book("Canticles"), Some(song));
    }

    #[test]
    fn test_ordinal_words_and_roman_numerals() {
        let registry = registry();
        let first_john = registry.resolve_book("1 John");
        assert!(first_john.is_some());
        assert_eq!(registry.resolve_book("I John"), first_john);
        assert_eq!(registry.resolve_book("First John"), first_john);
        assert_eq!(registry.resolve_book("1st John"), first_john);
        assert_eq!(registry.resolve_book("III John"), registry.resolve_book("3 John"));
        assert_eq!(registry.resolve_book("Is"), registry.resolve_book("Isaiah"));
    }

    #[test]
    fn test_aliases_are_injective() {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for record in CANON.iter() {
            for alias in std::iter::once(&record.name).chain(record.abbreviations.iter()) {
                if let Some(other) = seen.insert(alias_key(alias), record.name) {
                    assert_eq!(other, record.name, "alias {} is shared", alias);
                }
            }
        }
    }

    #[test]
    fn test_suggest() {
        let registry = registry();
        assert_eq!(registry.suggest("Jhon"), Some("John"));
        assert_eq!(registry.suggest("Genisis"), Some("Genesis"));
        assert_eq!(registry.suggest("Zzz"), None);
    }

    #[test]
    fn test_next_verse_crosses_boundaries() {
        let registry = registry();
        let john = registry.resolve_book("John").unwrap();
        let acts = registry.resolve_book("Acts").unwrap();

        assert_eq!(
            registry.next_verse(VerseId::new(john, 3, 16)),
            Some(VerseId::new(john, 3, 17))
        );
        assert_eq!(
            registry.next_verse(VerseId::new(john, 3, 36)),
            Some(VerseId::new(john, 4, 1))
        );
        assert_eq!(
            registry.next_verse(VerseId::new(john, 21, 25)),
            Some(VerseId::new(acts, 1, 1))
        );

        let revelation = registry.resolve_book("Revelation").unwrap();
        assert_eq!(registry.next_verse(VerseId::new(revelation, 22, 21)), None);
        assert_eq!(registry.next_verse(VerseId::new(john, 99, 1)), None);
    }

    #[test]
    fn test_verses_between() {
        let registry = registry();
        let john = registry.resolve_book("John").unwrap();

        let verses = registry.verses_between(VerseId::new(john, 3, 35), VerseId::new(john, 4, 2));
        assert_eq!(
            verses,
            vec![
                VerseId::new(john, 3, 35),
                VerseId::new(john, 3, 36),
                VerseId::new(john, 4, 1),
                VerseId::new(john, 4, 2),
            ]
        );

        let empty = registry.verses_between(VerseId::new(john, 4, 2), VerseId::new(john, 3, 35));
        assert!(empty.is_empty());
        assert_eq!(registry.describe_verse(VerseId::new(john, 3, 16)), "John 3:16");
    }
}
