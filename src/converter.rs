use crate::books::BookRegistry;
use crate::error::ReferenceError;
use crate::estimator_config::EstimatorConfig;
use crate::models::{ConversionFailure, ConversionOutcome, ConversionSuccess, ParsedReference};
use crate::page_map::PageMap;
use crate::parser::ReferenceParser;
use crate::resolver::{select_resolver, PageResolver};
use anyhow::Result;
use std::sync::Arc;

const EMPTY_INPUT_MESSAGE: &str = "Please enter a Bible reference.";

/// Parse-then-resolve pipeline used by the shell. Holds one resolver for
/// its whole lifetime.
pub struct PageConverter {
    parser: ReferenceParser,
    resolver: Box<dyn PageResolver>,
}

impl PageConverter {
    pub fn new(parser: ReferenceParser, resolver: Box<dyn PageResolver>) -> Self {
        PageConverter { parser, resolver }
    }

    /// Converter over the standard canon; `map` decides between exact
    /// lookup and estimation.
    pub fn standard(map: Option<PageMap>, config: EstimatorConfig) -> Result<Self> {
        let registry = Arc::new(BookRegistry::standard()?);
        let parser = ReferenceParser::new(registry.clone())?;
        Ok(PageConverter::new(parser, select_resolver(registry, map, config)))
    }

    pub fn parser(&self) -> &ReferenceParser {
        &self.parser
    }

    pub fn is_approximate(&self) -> bool {
        self.resolver.is_approximate()
    }

    pub fn parse_and_convert(&self, input: &str) -> ConversionOutcome {
        if input.trim().is_empty() {
            return ConversionOutcome::Failure(ConversionFailure {
                kind: "empty_input".to_string(),
                error: EMPTY_INPUT_MESSAGE.to_string(),
            });
        }

        match self.convert(input) {
            Ok(success) => ConversionOutcome::Success(success),
            Err(err) => ConversionOutcome::Failure(ConversionFailure {
                kind: err.kind().to_string(),
                error: err.to_string(),
            }),
        }
    }

    fn convert(&self, input: &str) -> Result<ConversionSuccess, ReferenceError> {
        let reference = self.parser.parse(input)?;
        let result = self.resolver.resolve(&reference)?;

        Ok(ConversionSuccess {
            reference: self.parser.format(&reference),
            page: result.display(),
            page_start: result.start(),
            page_end: result.end(),
            is_range: result.is_range(),
            book: self.book_name(&reference).to_string(),
            chapter: reference.start_chapter,
            verses: reference.verses_display(),
            approximate: result.approximate,
            warning: result.missing_warning(),
        })
    }

    fn book_name(&self, reference: &ParsedReference) -> &'static str {
        self.parser.registry().book(reference.book).name()
    }
}
