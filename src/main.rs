mod cli;

use crate::cli::Cli;
use anyhow::{Context, Result};
use scripture_pages::books::BookRegistry;
use scripture_pages::converter::PageConverter;
use scripture_pages::dataset::load_dataset;
use scripture_pages::estimator_config::EstimatorConfig;
use scripture_pages::logger::{DiagnosticLogger, LookupStats};
use scripture_pages::models::ConversionOutcome;
use scripture_pages::page_map::{PageMap, PageMapBuilder};
use scripture_pages::parser::ReferenceParser;
use scripture_pages::resolver::select_resolver;
use scripture_pages::schema;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

const MAX_SESSIONS: usize = 10;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    if cli.print_schema {
        println!("{}", schema::result_schema()?);
        return Ok(ExitCode::SUCCESS);
    }

    let registry = Arc::new(BookRegistry::standard().context("Failed to build book registry")?);

    if cli.list_books {
        print_books(&registry);
        return Ok(ExitCode::SUCCESS);
    }

    let logger = match &cli.log_dir {
        Some(dir) => DiagnosticLogger::new(dir, cli.verbose).context("Failed to create logger")?,
        None => DiagnosticLogger::console_only(cli.verbose),
    };

    let parser = ReferenceParser::new(registry.clone()).context("Failed to create ReferenceParser")?;
    let mut stats = LookupStats::default();

    let map = match &cli.map {
        Some(path) => Some(build_page_map(path, &parser, &logger, &mut stats)?),
        None => {
            logger.info("No page map given; estimating pages".to_string());
            None
        }
    };

    let config = EstimatorConfig::new(cli.pages_per_chapter, cli.verses_per_page);
    let converter = PageConverter::new(parser, select_resolver(registry, map, config));

    let input = cli.reference.as_deref().unwrap_or_default().trim();
    let outcome = converter.parse_and_convert(input);
    stats.queries += 1;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialize result")?
        );
    }

    let code = match &outcome {
        ConversionOutcome::Success(success) => {
            if !cli.json {
                let noun = if success.is_range { "pages" } else { "page" };
                println!("{} → {} {}", input, noun, success.page);
            }
            if let Some(warning) = &success.warning {
                logger.warning(
                    warning.clone(),
                    Some(serde_json::json!({ "reference": success.reference })),
                );
            }
            if success.approximate && !cli.json {
                eprintln!("Note: page numbers are estimated; pass --map for exact pages.");
            }
            logger.info(format!("{} resolved to {}", success.reference, success.page));
            ExitCode::SUCCESS
        }
        ConversionOutcome::Failure(failure) => {
            stats.failures += 1;
            logger.error(
                failure.error.clone(),
                Some(serde_json::json!({ "kind": failure.kind, "input": input })),
            );
            ExitCode::from(1)
        }
    };

    let report = logger.generate_report(stats)?;
    if let Some(path) = logger.write_report(&report)? {
        logger.rotate_logs(MAX_SESSIONS)?;
        if cli.verbose {
            eprintln!("Report written to {:?}", path);
        }
    }

    Ok(code)
}

fn build_page_map(
    path: &Path,
    parser: &ReferenceParser,
    logger: &DiagnosticLogger,
    stats: &mut LookupStats,
) -> Result<PageMap> {
    let source = load_dataset(path)?;
    logger.info(format!("Loaded {} row(s) from {:?}", source.rows.len(), path));
    logger.build_warnings(&source.rejected);

    let build = PageMapBuilder::build(parser, source.rows);
    logger.build_warnings(&build.warnings);
    logger.info(format!(
        "Mapped {} verse(s), {} spill(s), {} overlap(s)",
        build.stats.verses_mapped, build.stats.spills, build.stats.overlaps
    ));

    stats.dataset = Some(source.path.display().to_string());
    stats.dataset_sha256 = Some(source.sha256);
    stats.rows = build.stats.rows + source.rejected.len();
    stats.skipped_rows = build.stats.skipped_rows + source.rejected.len();
    stats.overlaps = build.stats.overlaps;
    stats.verses_mapped = build.stats.verses_mapped;

    Ok(build.map)
}

fn print_books(registry: &BookRegistry) {
    for book in registry.books() {
        println!(
            "{:>2}. {:<16} {:>3} chapter(s)  {}",
            book.id().ordinal(),
            book.name(),
            book.chapter_count(),
            book.abbreviations().join(", ")
        );
    }
}
