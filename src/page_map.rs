use crate::error::BuildWarning;
use crate::models::{DatasetRow, VerseId};
use crate::parser::ReferenceParser;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Verse id to printed page(s). Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMap {
    entries: BTreeMap<VerseId, BTreeSet<u32>>,
}

impl PageMap {
    pub fn pages(&self, verse: &VerseId) -> Option<&BTreeSet<u32>> {
        self.entries.get(verse)
    }

    pub fn contains(&self, verse: &VerseId) -> bool {
        self.entries.contains_key(verse)
    }

    /// Number of distinct verses with at least one page.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VerseId, &BTreeSet<u32>)> {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    pub rows: usize,
    pub skipped_rows: usize,
    pub spills: usize,
    pub overlaps: usize,
    pub verses_mapped: usize,
}

#[derive(Debug, Clone)]
pub struct PageMapBuild {
    pub map: PageMap,
    pub warnings: Vec<BuildWarning>,
    pub stats: BuildStats,
}

pub struct PageMapBuilder<'a> {
    parser: &'a ReferenceParser,
    entries: BTreeMap<VerseId, BTreeSet<u32>>,
    warnings: Vec<BuildWarning>,
    stats: BuildStats,
}

impl<'a> PageMapBuilder<'a> {
    pub fn new(parser: &'a ReferenceParser) -> Self {
        PageMapBuilder {
            parser,
            entries: BTreeMap::new(),
            warnings: Vec::new(),
            stats: BuildStats::default(),
        }
    }

    /// Builds a page map from dataset rows in one pass. Bad rows and
    /// overlapping pages become warnings; the build itself never fails.
    pub fn build<I>(parser: &'a ReferenceParser, rows: I) -> PageMapBuild
    where
        I: IntoIterator<Item = DatasetRow>,
    {
        let mut builder = PageMapBuilder::new(parser);
        for row in rows {
            builder.add_row(&row);
        }
        builder.finish()
    }

    pub fn add_row(&mut self, row: &DatasetRow) {
        self.stats.rows += 1;

        let reference = match self.parser.parse(&row.reference) {
            Ok(reference) => reference,
            Err(err) => {
                self.stats.skipped_rows += 1;
                self.warnings.push(BuildWarning::RowInvalid {
                    line: row.line,
                    reference: row.reference.clone(),
                    reason: err.to_string(),
                });
                return;
            }
        };

        let verses = self.parser.expand(&reference);
        for verse in &verses {
            let pages = self.entries.entry(*verse).or_default();
            if !pages.is_empty() && !pages.contains(&row.page) {
                self.stats.overlaps += 1;
                self.warnings.push(BuildWarning::Overlap {
                    line: row.line,
                    verse: self.parser.registry().describe_verse(*verse),
                    existing: pages.iter().copied().collect(),
                    page: row.page,
                });
            }
            pages.insert(row.page);
        }

        if row.spill {
            if let Some(last) = verses.last() {
                match row.page.checked_add(1) {
                    Some(next_page) => {
                        self.stats.spills += 1;
                        self.entries.entry(*last).or_default().insert(next_page);
                    }
                    None => self.warnings.push(BuildWarning::RowInvalid {
                        line: row.line,
                        reference: row.reference.clone(),
                        reason: format!("no page follows {}; spill ignored", row.page),
                    }),
                }
            }
        }
    }

    pub fn finish(mut self) -> PageMapBuild {
        self.stats.verses_mapped = self.entries.len();
        PageMapBuild {
            map: PageMap {
                entries: self.entries,
            },
            warnings: self.warnings,
            stats: self.stats,
        }
    }
}
