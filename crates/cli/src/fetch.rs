// ABOUTME: Blocking HTTP PageFetcher for the results listing and match report pages.
// ABOUTME: Resolves page paths against a configurable base URL.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use url::Url;
use vlr_scrape::PageFetcher;

const USER_AGENT: &str = concat!("vlr-cli/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches pages over HTTP, one request at a time.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: Url,
}

impl HttpFetcher {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("invalid base URL {}", base_url))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .build()
            .context("building HTTP client")?;
        Ok(Self { client, base_url })
    }

    pub fn listing_url(&self, page: u32) -> Result<Url> {
        let mut url = self.base_url.join("matches/results/")?;
        url.query_pairs_mut().append_pair("page", &page.to_string());
        Ok(url)
    }

    pub fn detail_url(&self, match_id: u64, stub: &str) -> Result<Url> {
        Ok(self.base_url.join(&format!("{}/{}", match_id, stub))?)
    }

    fn get(&self, url: Url) -> Result<String> {
        tracing::debug!(%url, "GET");
        let resp = self
            .client
            .get(url.clone())
            .send()
            .with_context(|| format!("request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("bad status from {}", url))?;
        resp.text()
            .with_context(|| format!("reading body from {}", url))
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch_listing_page(&self, page: u32) -> Result<String> {
        self.get(self.listing_url(page)?)
    }

    fn fetch_detail_page(&self, match_id: u64, stub: &str) -> Result<String> {
        self.get(self.detail_url(match_id, stub)?)
    }
}
