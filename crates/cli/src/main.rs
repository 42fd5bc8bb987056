// ABOUTME: CLI for crawling vlr.gg match results with the vlr-scrape engine.
// ABOUTME: Crawls one day of listings, optionally scrapes match pages, and emits NDJSON to stdout, files, or an events API.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt as tfmt, EnvFilter};
use vlr_scrape::options::DEFAULT_MAX_PAGES;
use vlr_scrape::records::RESULTS_DATASOURCE;
use vlr_scrape::time_parse::parse_boundary;
use vlr_scrape::{
    append_match_details, append_records, load_match_registry, load_results_registry,
    registry_from_path, CrawlOptions, DetailScraper, EventSink, Registry, WindowCrawler,
};

mod fetch;
mod sink;

use crate::fetch::HttpFetcher;
use crate::sink::{DirSink, EventsApiSink, StdoutSink};

const DEFAULT_BASE_URL: &str = "https://www.vlr.gg";

/// Crawl vlr.gg match results and emit NDJSON records.
#[derive(Parser, Debug)]
#[command(name = "vlr-cli")]
#[command(about = "Scrape Valorant match results from vlr.gg", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Site root pages are fetched from.
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Listing schema (JSON or YAML) replacing the builtin one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Match page schema (JSON or YAML) replacing the builtin one.
    #[arg(long, global = true)]
    match_config: Option<PathBuf>,

    /// Offset the site renders times in, e.g. "+02:00". Defaults to local time.
    #[arg(long, global = true, value_parser = parse_offset, allow_hyphen_values = true)]
    utc_offset: Option<FixedOffset>,

    /// Listing pages to fetch before giving up on a window.
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: u32,

    /// Write `<datasource>.ndjson` files here instead of stdout.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Events endpoint to append records to.
    #[arg(long, global = true)]
    events_url: Option<String>,

    /// Bearer token for the events endpoint.
    #[arg(long, global = true, env = "TB_API_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the day before `--end` and emit match summaries.
    Results {
        /// Exclusive window end; defaults to the start of today.
        #[arg(long)]
        end: Option<String>,
    },
    /// Crawl the day before `--end` and emit team and player results for matches with stats.
    Matches {
        /// Exclusive window end; defaults to the start of today.
        #[arg(long)]
        end: Option<String>,
    },
    /// Scrape a single match page.
    Match {
        /// Numeric match id.
        match_id: u64,
        /// URL stub following the id.
        stub: String,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Args::parse();

    let mut options = CrawlOptions::builder().max_pages(args.max_pages);
    if let Some(offset) = args.utc_offset {
        options = options.timezone(offset);
    }
    let options = options.build();

    let fetcher = HttpFetcher::new(&args.base_url)?;
    let mut sink = open_sink(&args)?;

    match &args.command {
        Command::Results { end } => {
            let registry = results_registry(&args)?;
            let end = window_end(end.as_deref(), options.timezone)?;
            let summaries = WindowCrawler::new(&fetcher, &registry, options).scrape_window(end)?;
            let written = append_records(sink.as_mut(), &summaries)?;
            info!(datasource = RESULTS_DATASOURCE, records = written, "done");
        }
        Command::Matches { end } => {
            let registry = results_registry(&args)?;
            let end = window_end(end.as_deref(), options.timezone)?;
            let summaries = WindowCrawler::new(&fetcher, &registry, options).scrape_window(end)?;

            let match_registry = match_registry(&args)?;
            let details = DetailScraper::new(&fetcher, &match_registry).scrape_matches(&summaries)?;
            let (teams, players) = append_match_details(sink.as_mut(), &details)?;
            info!(matches = details.len(), teams, players, "done");
        }
        Command::Match { match_id, stub } => {
            let match_registry = match_registry(&args)?;
            let detail = DetailScraper::new(&fetcher, &match_registry).scrape_match(*match_id, stub)?;
            let (teams, players) = append_match_details(sink.as_mut(), &[detail])?;
            info!(match_id, teams, players, "done");
        }
    }

    Ok(())
}

fn results_registry(args: &Args) -> Result<Registry> {
    Ok(match &args.config {
        Some(path) => registry_from_path(path)?,
        None => load_results_registry()?,
    })
}

fn match_registry(args: &Args) -> Result<Registry> {
    Ok(match &args.match_config {
        Some(path) => registry_from_path(path)?,
        None => load_match_registry()?,
    })
}

fn open_sink(args: &Args) -> Result<Box<dyn EventSink>> {
    if let Some(url) = &args.events_url {
        let token = args
            .token
            .clone()
            .context("--events-url needs --token or TB_API_TOKEN")?;
        return Ok(Box::new(EventsApiSink::new(url, token)?));
    }
    if let Some(dir) = &args.output_dir {
        return Ok(Box::new(DirSink::new(dir)?));
    }
    Ok(Box::new(StdoutSink))
}

/// The given end, or midnight today in `timezone`.
fn window_end(end: Option<&str>, timezone: FixedOffset) -> Result<DateTime<Utc>> {
    if let Some(end) = end {
        return parse_boundary(end, timezone)
            .with_context(|| format!("unrecognised --end {:?}", end));
    }
    let midnight = Utc::now()
        .with_timezone(&timezone)
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .context("computing midnight")?;
    timezone
        .from_local_datetime(&midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .context("computing midnight")
}

/// Parses "+HH:MM", "-HH:MM" or "Z".
fn parse_offset(s: &str) -> Result<FixedOffset, String> {
    let probe = format!("2000-01-01T00:00:00{}", s.trim());
    DateTime::parse_from_rfc3339(&probe)
        .map(|dt| *dt.offset())
        .map_err(|_| format!("invalid UTC offset {:?}, expected +HH:MM", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("+02:00"), Ok(FixedOffset::east_opt(7200).unwrap()));
        assert_eq!(parse_offset("-07:00"), Ok(FixedOffset::west_opt(25200).unwrap()));
        assert_eq!(parse_offset("Z"), Ok(FixedOffset::east_opt(0).unwrap()));
        assert!(parse_offset("two hours").is_err());
    }

    #[test]
    fn test_window_end_explicit() {
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(
            window_end(Some("2026-10-18"), utc).unwrap().to_rfc3339(),
            "2026-10-18T00:00:00+00:00"
        );
        assert!(window_end(Some("soon"), utc).is_err());
    }

    #[test]
    fn test_window_end_defaults_to_midnight() {
        let cest = FixedOffset::east_opt(7200).unwrap();
        let end = window_end(None, cest).unwrap().with_timezone(&cest);
        assert_eq!(end.format("%H:%M:%S").to_string(), "00:00:00");
        assert!(end <= Utc::now());
    }
}
