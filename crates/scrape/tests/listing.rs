// ABOUTME: Integration tests for extracting match summaries from a results listing page.
// ABOUTME: Uses the builtin schema against an HTML snapshot under tests/fixtures/html.

use std::fs;

use chrono::FixedOffset;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use vlr_scrape::{load_results_registry, parse_listing_page, to_ndjson, Extractor, Record};

fn load_html_fixture(name: &str) -> String {
    let path = format!(
        "{}/tests/fixtures/html/{}.html",
        env!("CARGO_MANIFEST_DIR"),
        name
    );
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {}: {}", path, e))
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

#[test]
fn test_listing_summaries_in_page_order() {
    let registry = load_results_registry().unwrap();
    let extractor = Extractor::new(&registry);
    let html = load_html_fixture("results_page");

    let summaries = parse_listing_page(&extractor, &html, utc()).unwrap();
    let links: Vec<&str> = summaries.iter().map(|s| s.link.as_str()).collect();
    assert_eq!(
        links,
        vec![
            "/4021/sentinels-vs-fnatic-champions-tour-2026-upper-final",
            "/4020/loud-vs-drx-champions-tour-2026-lower-round-2",
            "/4019/paper-rex-vs-edg-champions-tour-2026-upper-semifinal",
        ]
    );
}

#[test]
fn test_listing_dates_come_from_nearest_header() {
    let registry = load_results_registry().unwrap();
    let extractor = Extractor::new(&registry);
    let html = load_html_fixture("results_page");

    let summaries = parse_listing_page(&extractor, &html, utc()).unwrap();
    let stamps: Vec<String> = summaries
        .iter()
        .map(|s| s.start_timestamp().unwrap().to_rfc3339())
        .collect();
    assert_eq!(
        stamps,
        vec![
            "2026-10-17T10:00:00+00:00",
            "2026-10-17T07:30:00+00:00",
            "2026-10-16T23:15:00+00:00",
        ]
    );
}

#[test]
fn test_listing_offset_shifts_timestamps() {
    let registry = load_results_registry().unwrap();
    let extractor = Extractor::new(&registry);
    let html = load_html_fixture("results_page");
    let cest = FixedOffset::east_opt(2 * 3600).unwrap();

    let summaries = parse_listing_page(&extractor, &html, cest).unwrap();
    assert_eq!(
        summaries[0].start_timestamp().unwrap().to_rfc3339(),
        "2026-10-17T08:00:00+00:00"
    );
}

#[test]
fn test_listing_stats_flags() {
    let registry = load_results_registry().unwrap();
    let extractor = Extractor::new(&registry);
    let html = load_html_fixture("results_page");

    let summaries = parse_listing_page(&extractor, &html, utc()).unwrap();
    let flags: Vec<(bool, bool)> = summaries
        .iter()
        .map(|s| (s.map_stats(), s.player_stats()))
        .collect();
    assert_eq!(flags, vec![(true, true), (true, false), (true, true)]);
    assert_eq!(
        summaries[0].match_ref(),
        Some((
            4021,
            "sentinels-vs-fnatic-champions-tour-2026-upper-final".to_string()
        ))
    );
}

#[test]
fn test_listing_export() {
    let registry = load_results_registry().unwrap();
    let extractor = Extractor::new(&registry);
    let html = load_html_fixture("results_page");

    let summaries = parse_listing_page(&extractor, &html, utc()).unwrap();
    assert_eq!(
        Value::Object(summaries[0].export()),
        json!({
            "link": "/4021/sentinels-vs-fnatic-champions-tour-2026-upper-final",
            "stakes": "Playoffs–Upper Final",
            "status": "Completed",
            "event": "Champions Tour 2026",
            "start_timestamp": "2026-10-17T10:00:00+00:00",
            "player_stats": true,
            "map_stats": true,
        })
    );

    let ndjson = to_ndjson(&summaries).unwrap();
    assert_eq!(ndjson.lines().count(), 3);
}

#[test]
fn test_page_without_cards_is_empty() {
    let registry = load_results_registry().unwrap();
    let extractor = Extractor::new(&registry);
    let summaries =
        parse_listing_page(&extractor, "<html><body><p>nothing</p></body></html>", utc()).unwrap();
    assert!(summaries.is_empty());
}

#[test]
fn test_item_without_time_or_tags_keeps_its_neighbours() {
    let registry = load_results_registry().unwrap();
    let extractor = Extractor::new(&registry);
    // second item has no time cell, third has an empty vod block
    let html = r#"
        <div class="wf-label mod-large">Sat, October 17, 2026</div>
        <div class="wf-card">
            <a class="match-item" href="/1/a-vs-b">
                <div class="match-item-time">1:00 PM</div>
                <div class="match-item-vod"><div class="wf-tag mod-big">Map</div><div class="wf-tag mod-big">Player</div></div>
            </a>
            <a class="match-item" href="/2/c-vs-d">
                <div class="match-item-vod"><div class="wf-tag mod-big">Map</div><div class="wf-tag mod-big">Player</div></div>
            </a>
            <a class="match-item" href="/3/e-vs-f">
                <div class="match-item-time">11:00 AM</div>
                <div class="match-item-vod"></div>
            </a>
        </div>
    "#;
    let summaries = parse_listing_page(&extractor, html, utc()).unwrap();
    let links: Vec<&str> = summaries.iter().map(|s| s.link.as_str()).collect();
    assert_eq!(links, vec!["/1/a-vs-b", "/2/c-vs-d", "/3/e-vs-f"]);

    assert_eq!(
        summaries[0].start_timestamp().unwrap().to_rfc3339(),
        "2026-10-17T13:00:00+00:00"
    );
    assert_eq!(summaries[1].start_timestamp(), None);
    assert!(summaries[1].player_stats());
    assert_eq!(
        summaries[2].start_timestamp().unwrap().to_rfc3339(),
        "2026-10-17T11:00:00+00:00"
    );
    assert!(!summaries[2].map_stats());
    assert!(!summaries[2].player_stats());
    assert_eq!(summaries[1].export()["start_timestamp"], Value::Null);
}

#[test]
fn test_item_with_duplicate_time_is_skipped() {
    let registry = load_results_registry().unwrap();
    let extractor = Extractor::new(&registry);
    let html = r#"
        <div class="wf-label mod-large">Sat, October 17, 2026</div>
        <div class="wf-card">
            <a class="match-item" href="/1/a-vs-b"><div class="match-item-time">1:00 PM</div></a>
            <a class="match-item" href="/2/c-vs-d">
                <div class="match-item-time">2:00 PM</div><div class="match-item-time">3:00 PM</div>
            </a>
            <a class="match-item" href="/3/e-vs-f"><div class="match-item-time">4:00 PM</div></a>
        </div>
    "#;
    let summaries = parse_listing_page(&extractor, html, utc()).unwrap();
    let links: Vec<&str> = summaries.iter().map(|s| s.link.as_str()).collect();
    assert_eq!(links, vec!["/1/a-vs-b", "/3/e-vs-f"]);
}
