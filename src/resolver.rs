//! Page resolution. Two interchangeable strategies sit behind
//! [`PageResolver`]: an exact lookup against a dataset-built [`PageMap`],
//! and a formula-based estimate used when no dataset is available. A
//! resolver is chosen once per session and the two are never mixed.

use crate::books::BookRegistry;
use crate::error::ReferenceError;
use crate::estimator_config::EstimatorConfig;
use crate::models::{PageResult, PageSet, ParsedReference, VerseId};
use crate::page_map::PageMap;
use std::collections::BTreeSet;
use std::sync::Arc;

pub trait PageResolver {
    fn resolve(&self, reference: &ParsedReference) -> Result<PageResult, ReferenceError>;

    /// Whether results are estimates rather than exact page numbers.
    fn is_approximate(&self) -> bool;
}

/// Outcome of an exact lookup: distinct pages in ascending order, plus how
/// many verses of the reference had no page data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLookup {
    pub pages: Vec<u32>,
    pub missing: usize,
}

/// Unions the page sets of every verse in `verses`.
pub fn lookup(map: &PageMap, verses: &[VerseId]) -> PageLookup {
    let mut pages = BTreeSet::new();
    let mut missing = 0;
    for verse in verses {
        match map.pages(verse) {
            Some(found) => pages.extend(found.iter().copied()),
            None => missing += 1,
        }
    }
    PageLookup {
        pages: pages.into_iter().collect(),
        missing,
    }
}

pub struct DatasetResolver {
    registry: Arc<BookRegistry>,
    map: PageMap,
}

impl DatasetResolver {
    pub fn new(registry: Arc<BookRegistry>, map: PageMap) -> Self {
        DatasetResolver { registry, map }
    }

    pub fn map(&self) -> &PageMap {
        &self.map
    }
}

impl PageResolver for DatasetResolver {
    fn resolve(&self, reference: &ParsedReference) -> Result<PageResult, ReferenceError> {
        let verses = self.registry.expand(reference);
        let found = lookup(&self.map, &verses);

        if found.pages.is_empty() {
            let book = self.registry.book(reference.book).name();
            return Err(ReferenceError::RangeOutOfData {
                reference: format!("{} {}", book, reference.locator()),
                missing: found.missing,
            });
        }

        Ok(PageResult {
            pages: PageSet::Listed(found.pages),
            missing: found.missing,
            approximate: false,
        })
    }

    fn is_approximate(&self) -> bool {
        false
    }
}

/// First and last estimated page of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEstimate {
    pub start_page: u32,
    pub end_page: u32,
    pub is_range: bool,
}

/// Formula-based page estimates for editions without a page dataset.
///
/// `page = base_page(book) + floor((chapter - 1) * pages_per_chapter + (verse - 1) / verses_per_page)`
///
/// The result is approximate and will not agree with [`DatasetResolver`]
/// for the same edition.
pub struct EstimatingResolver {
    registry: Arc<BookRegistry>,
    config: EstimatorConfig,
}

impl EstimatingResolver {
    pub fn new(registry: Arc<BookRegistry>, config: EstimatorConfig) -> Self {
        EstimatingResolver { registry, config }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    fn page_at(&self, verse: VerseId) -> u32 {
        let base_page = self.registry.book(verse.book).base_page();
        let chapter_offset =
            (verse.chapter.saturating_sub(1) as f64 * self.config.pages_per_chapter).max(0.0);
        let verse_offset = verse.verse.saturating_sub(1) / self.config.verses_per_page.max(1);
        // float to int casts saturate at u32::MAX
        base_page
            .saturating_add(chapter_offset.floor() as u32)
            .saturating_add(verse_offset)
    }

    pub fn estimate(&self, reference: &ParsedReference) -> PageEstimate {
        let (start, end) = self.registry.bounds(reference);
        let start_page = self.page_at(start);
        let end_page = self.page_at(end).max(start_page);

        PageEstimate {
            start_page,
            end_page,
            is_range: end_page != start_page,
        }
    }
}

impl PageResolver for EstimatingResolver {
    fn resolve(&self, reference: &ParsedReference) -> Result<PageResult, ReferenceError> {
        let estimate = self.estimate(reference);
        Ok(PageResult {
            pages: PageSet::Span {
                start: estimate.start_page,
                end: estimate.end_page,
            },
            missing: 0,
            approximate: true,
        })
    }

    fn is_approximate(&self) -> bool {
        true
    }
}

/// Dataset present selects the exact resolver, absent selects the estimator.
pub fn select_resolver(
    registry: Arc<BookRegistry>,
    map: Option<PageMap>,
    config: EstimatorConfig,
) -> Box<dyn PageResolver> {
    match map {
        Some(map) => Box::new(DatasetResolver::new(registry, map)),
        None => Box::new(EstimatingResolver::new(registry, config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DatasetRow;
    use crate::page_map::PageMapBuilder;
    use crate::parser::ReferenceParser;

    fn parser() -> ReferenceParser {
        ReferenceParser::new(Arc::new(BookRegistry::standard().unwrap())).unwrap()
    }

    fn dataset(parser: &ReferenceParser, rows: &[(u32, &str, bool)]) -> DatasetResolver {
        let rows = rows.iter().enumerate().map(|(i, (page, reference, spill))| DatasetRow {
            line: i + 2,
            page: *page,
            reference: reference.to_string(),
            spill: *spill,
        });
        let build = PageMapBuilder::build(parser, rows);
        DatasetResolver::new(parser.registry().clone(), build.map)
    }

    #[test]
    fn test_single_verse_resolves_to_one_page() {
        let parser = parser();
        let resolver = dataset(&parser, &[(1287, "John 3:16", false)]);

        let result = resolver.resolve(&parser.parse("John 3:16").unwrap()).unwrap();
        assert_eq!(result.pages, PageSet::Listed(vec![1287]));
        assert_eq!(result.missing, 0);
        assert!(!result.is_range());
        assert_eq!(result.display(), "1287");
    }

    #[test]
    fn test_missing_verses_are_counted() {
        let parser = parser();
        let resolver = dataset(&parser, &[(1287, "John 3:16", false)]);

        let result = resolver.resolve(&parser.parse("John 3:16-18").unwrap()).unwrap();
        assert_eq!(result.pages, PageSet::Listed(vec![1287]));
        assert_eq!(result.missing, 2);
        assert_eq!(result.missing_warning().as_deref(), Some("2 verse(s) out of range."));
    }

    #[test]
    fn test_no_data_is_range_out_of_data() {
        let parser = parser();
        let resolver = dataset(&parser, &[(1287, "John 3:16", false)]);

        let err = resolver.resolve(&parser.parse("Genesis 1:1-3").unwrap()).unwrap_err();
        assert_eq!(
            err,
            ReferenceError::RangeOutOfData {
                reference: "Genesis 1:1-3".to_string(),
                missing: 3,
            }
        );
    }

    #[test]
    fn test_scattered_pages_display_as_list() {
        let parser = parser();
        let resolver = dataset(
            &parser,
            &[(5, "Romans 1:1-10", false), (7, "Romans 1:20-32", false)],
        );

        let result = resolver.resolve(&parser.parse("Romans 1").unwrap()).unwrap();
        assert_eq!(result.pages, PageSet::Listed(vec![5, 7]));
        assert_eq!(result.display(), "5,7");
        assert_eq!(result.missing, 9);
    }

    #[test]
    fn test_spill_verse_returns_both_pages() {
        let parser = parser();
        let resolver = dataset(&parser, &[(100, "Psalms 23", true), (101, "Psalms 24", false)]);

        let result = resolver.resolve(&parser.parse("Psalms 23:6").unwrap()).unwrap();
        assert_eq!(result.pages, PageSet::Listed(vec![100, 101]));
        assert_eq!(result.display(), "100-101");
        assert!(result.is_range());
    }

    #[test]
    fn test_lookup_unions_pages() {
        let parser = parser();
        let resolver = dataset(&parser, &[(3, "Jude 1:1-10", true), (4, "Jude 1:11-25", false)]);
        let verses = parser.expand(&parser.parse("Jude 1").unwrap());

        let found = lookup(resolver.map(), &verses);
        assert_eq!(found.pages, vec![3, 4]);
        assert_eq!(found.missing, 0);
    }

    #[test]
    fn test_estimate_formula() {
        let parser = parser();
        let resolver = EstimatingResolver::new(parser.registry().clone(), EstimatorConfig::default());

        let genesis_1_1 = resolver.estimate(&parser.parse("Genesis 1:1").unwrap());
        assert_eq!(genesis_1_1, PageEstimate { start_page: 1, end_page: 1, is_range: false });

        // 25 verses per page
        assert_eq!(resolver.estimate(&parser.parse("Genesis 1:25").unwrap()).start_page, 1);
        assert_eq!(resolver.estimate(&parser.parse("Genesis 1:26").unwrap()).start_page, 2);

        // floor(1 * 1.5) and floor(2 * 1.5)
        assert_eq!(resolver.estimate(&parser.parse("Genesis 2:1").unwrap()).start_page, 2);
        assert_eq!(resolver.estimate(&parser.parse("Genesis 3:1").unwrap()).start_page, 4);

        let john = parser.registry().book(parser.parse("John 1").unwrap().book).base_page();
        let john_3_16 = resolver.estimate(&parser.parse("John 3:16").unwrap());
        assert_eq!(john_3_16.start_page, john + 3);
        assert!(!john_3_16.is_range);
    }

    #[test]
    fn test_estimate_ranges() {
        let parser = parser();
        let resolver = EstimatingResolver::new(parser.registry().clone(), EstimatorConfig::default());

        let chapters = resolver.estimate(&parser.parse("Genesis 1-3").unwrap());
        assert_eq!(chapters.start_page, 1);
        assert_eq!(chapters.end_page, 1 + 3);
        assert!(chapters.is_range);

        let cross = resolver.estimate(&parser.parse("Matthew 5:1-7:10").unwrap());
        assert!(cross.is_range);
        assert!(cross.end_page > cross.start_page);

        let psalm = resolver.estimate(&parser.parse("Psalms 119").unwrap());
        assert_eq!(psalm.end_page - psalm.start_page, 175 / 25);

        let result = resolver.resolve(&parser.parse("Genesis 1-3").unwrap()).unwrap();
        assert!(result.approximate);
        assert_eq!(result.display(), "1-4");
        assert!(resolver.is_approximate());
    }

    #[test]
    fn test_estimate_saturates_on_huge_pages_per_chapter() {
        let parser = parser();
        let config = EstimatorConfig {
            pages_per_chapter: 1e10,
            verses_per_page: 25,
        };
        let resolver = EstimatingResolver::new(parser.registry().clone(), config);

        let last = resolver.estimate(&parser.parse("Revelation 22:21").unwrap());
        assert_eq!(last.start_page, u32::MAX);
        assert!(!last.is_range);

        let first = resolver.estimate(&parser.parse("Revelation 1:1").unwrap());
        assert!(first.start_page < u32::MAX);
    }

    #[test]
    fn test_estimated_range_is_a_span() {
        let parser = parser();
        let config = EstimatorConfig {
            pages_per_chapter: 200_000.0,
            verses_per_page: 25,
        };
        let resolver = EstimatingResolver::new(parser.registry().clone(), config);

        let result = resolver.resolve(&parser.parse("Psalms 1-150").unwrap()).unwrap();
        match result.pages {
            PageSet::Span { start, end } => {
                assert_eq!(end - start, 149 * 200_000);
            }
            other => panic!("expected a span, got {:?}", other),
        }
        assert!(result.is_range());
    }

    #[test]
    fn test_select_resolver() {
        let parser = parser();
        let registry = parser.registry().clone();

        let exact = select_resolver(registry.clone(), Some(PageMap::default()), EstimatorConfig::default());
        assert!(!exact.is_approximate());

        let estimated = select_resolver(registry, None, EstimatorConfig::default());
        assert!(estimated.is_approximate());
    }
}
