// ABOUTME: Time-windowed crawler over the newest-first results listing, plus the detail page scraper.
// ABOUTME: PageFetcher abstracts transport; the crawl stops once the window has been fully observed.

//! Window crawling.
//!
//! The results listing is ordered newest first. To collect every match that
//! started in `[end - 1 day, end)` the crawler walks pages from 1 and stops
//! once a page's oldest match predates the window. Empty pages neither start
//! nor finish a window, and a crawl that reaches the page ceiling fails
//! rather than returning a partial window.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::assemble::{parse_listing_page, parse_match_page};
use crate::error::{Result, ScrapeError};
use crate::extractors::registry::Registry;
use crate::extractors::select::Extractor;
use crate::options::CrawlOptions;
use crate::records::{MatchDetail, MatchSummary};

/// Source of raw page text.
pub trait PageFetcher {
    /// Raw HTML of results listing page `page` (1-based).
    fn fetch_listing_page(&self, page: u32) -> anyhow::Result<String>;

    /// Raw HTML of the report page for one match.
    fn fetch_detail_page(&self, match_id: u64, stub: &str) -> anyhow::Result<String>;
}

impl<F: PageFetcher + ?Sized> PageFetcher for &F {
    fn fetch_listing_page(&self, page: u32) -> anyhow::Result<String> {
        (**self).fetch_listing_page(page)
    }

    fn fetch_detail_page(&self, match_id: u64, stub: &str) -> anyhow::Result<String> {
        (**self).fetch_detail_page(match_id, stub)
    }
}

/// Length of one crawl window.
pub fn window_length() -> Duration {
    Duration::days(1)
}

/// Returns true when `t` falls in the half-open window `[start, end)`.
pub fn in_window(t: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    start <= t && t < end
}

/// Crawls the results listing for one window.
#[derive(Debug)]
pub struct WindowCrawler<'r, F> {
    fetcher: F,
    extractor: Extractor<'r>,
    options: CrawlOptions,
}

impl<'r, F: PageFetcher> WindowCrawler<'r, F> {
    pub fn new(fetcher: F, registry: &'r Registry, options: CrawlOptions) -> Self {
        Self {
            fetcher,
            extractor: Extractor::new(registry),
            options,
        }
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    /// Collects every listed match that started in `[end - 1 day, end)`, in
    /// listing order.
    pub fn scrape_window(&self, end: DateTime<Utc>) -> Result<Vec<MatchSummary>> {
        let start = end - window_length();
        let mut out: Vec<MatchSummary> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        info!(%start, %end, max_pages = self.options.max_pages, "crawling window");

        for page in 1..=self.options.max_pages {
            let html = self
                .fetcher
                .fetch_listing_page(page)
                .map_err(|e| ScrapeError::fetch(format!("listing page {}", page), e))?;
            let summaries = parse_listing_page(&self.extractor, &html, self.options.timezone)?;

            let last_timestamp = summaries.iter().rev().find_map(MatchSummary::start_timestamp);
            let listed = summaries.len();

            for summary in summaries {
                let Some(t) = summary.start_timestamp() else {
                    debug!(page, link = %summary.link, "no start time, skipped");
                    continue;
                };
                if !in_window(t, start, end) {
                    continue;
                }
                if !seen.insert(summary.link.trim().to_string()) {
                    debug!(page, link = %summary.link, "already collected");
                    continue;
                }
                out.push(summary);
            }

            // Once a page reaches past the window start, nothing older can belong
            // to it; with nothing collected the window is simply empty.
            let completed = last_timestamp.is_some_and(|t| t < start);
            debug!(page, listed, collected = out.len(), completed, "listing page processed");

            if completed {
                info!(pages = page, matches = out.len(), "window complete");
                return Ok(out);
            }
        }

        Err(ScrapeError::window_incomplete(
            format!("window ending {}", end),
            self.options.max_pages,
        ))
    }
}

/// Fetches and assembles match report pages.
#[derive(Debug)]
pub struct DetailScraper<'r, F> {
    fetcher: F,
    extractor: Extractor<'r>,
}

impl<'r, F: PageFetcher> DetailScraper<'r, F> {
    pub fn new(fetcher: F, registry: &'r Registry) -> Self {
        Self {
            fetcher,
            extractor: Extractor::new(registry),
        }
    }

    /// Fetches and assembles one match.
    pub fn scrape_match(&self, match_id: u64, stub: &str) -> Result<MatchDetail> {
        let html = self
            .fetcher
            .fetch_detail_page(match_id, stub)
            .map_err(|e| ScrapeError::fetch(format!("match {}", match_id), e))?;
        parse_match_page(&self.extractor, &html, match_id)
    }

    /// Scrapes every summary that advertises both map and player stats.
    ///
    /// Matches failing with a per-match error (layout drift, patch conflict)
    /// are logged and skipped; transport and configuration errors abort.
    pub fn scrape_matches(&self, summaries: &[MatchSummary]) -> Result<Vec<MatchDetail>> {
        let mut out = Vec::new();
        for summary in summaries {
            if !(summary.map_stats() && summary.player_stats()) {
                debug!(link = %summary.link, "no stats advertised, skipped");
                continue;
            }
            let Some((match_id, stub)) = summary.match_ref() else {
                warn!(link = %summary.link, "unreadable match link, skipped");
                continue;
            };
            match self.scrape_match(match_id, &stub) {
                Ok(detail) => out.push(detail),
                Err(err) if err.is_per_match() => {
                    warn!(match_id, error = %err, "match skipped");
                }
                Err(err) => return Err(err),
            }
        }
        info!(requested = summaries.len(), scraped = out.len(), "match details scraped");
        Ok(out)
    }
}
