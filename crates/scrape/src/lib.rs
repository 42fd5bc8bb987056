// ABOUTME: Main library entry point for the vlr.gg match results scraper.
// ABOUTME: Re-exports the public API: registries, Extractor, records, WindowCrawler, DetailScraper, sinks, ScrapeError.

//! vlr-scrape - declarative extraction of esports match results.
//!
//! A JSON (or YAML) schema maps field names to document queries. The
//! extraction engine evaluates them against listing and match report pages,
//! the assembler zips the results into typed records, and the window crawler
//! walks the newest-first results listing until a one-day window is covered.
//!
//! # Example
//!
//! ```no_run
//! use chrono::{TimeZone, Utc};
//! use vlr_scrape::{load_results_registry, CrawlOptions, PageFetcher, WindowCrawler};
//!
//! fn crawl(fetcher: impl PageFetcher) -> Result<(), vlr_scrape::ScrapeError> {
//!     let registry = load_results_registry()?;
//!     let crawler = WindowCrawler::new(fetcher, &registry, CrawlOptions::default());
//!     let end = Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap();
//!     for summary in crawler.scrape_window(end)? {
//!         println!("{}", summary.link);
//!     }
//!     Ok(())
//! }
//! ```

pub mod assemble;
pub mod columns;
pub mod crawler;
pub mod error;
pub mod extractors;
pub mod options;
pub mod records;
pub mod sink;
pub mod time_parse;

pub use crate::assemble::{assemble_match, assemble_summaries, parse_listing_page, parse_match_page};
pub use crate::columns::{map_columns, ColumnMap};
pub use crate::crawler::{DetailScraper, PageFetcher, WindowCrawler};
pub use crate::error::{ErrorCode, FieldParseError, Result, ScrapeError};
pub use crate::extractors::loader::{
    load_match_registry, load_results_registry, registry_from_json, registry_from_path,
    registry_from_yaml,
};
pub use crate::extractors::registry::Registry;
pub use crate::extractors::select::{Extracted, Extractor, GroupValues, Slot};
pub use crate::extractors::spec::{FieldConfig, QueryLanguage, SelectorSpec, TextMode};
pub use crate::options::{CrawlOptions, CrawlOptionsBuilder};
pub use crate::records::{
    GameResult, MatchDetail, MatchSummary, Outcome, PlayerResult, Record, Side, TeamResult,
};
pub use crate::sink::{append_match_details, append_records, to_ndjson, EventSink, MemorySink};
