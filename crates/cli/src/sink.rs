// ABOUTME: EventSink implementations for the CLI: stdout, per-datasource NDJSON files, and an events HTTP API.
// ABOUTME: The events sink appends with a bearer token, one POST per datasource batch.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use url::Url;
use vlr_scrape::EventSink;

/// Writes every datasource to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn append(&mut self, _datasource: &str, ndjson: &str) -> Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(ndjson.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

/// Appends each datasource to `<dir>/<datasource>.ndjson`.
#[derive(Debug, Clone)]
pub struct DirSink {
    dir: PathBuf,
}

impl DirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, datasource: &str) -> PathBuf {
        self.dir.join(format!("{}.ndjson", datasource))
    }
}

impl EventSink for DirSink {
    fn append(&mut self, datasource: &str, ndjson: &str) -> Result<()> {
        let path = self.path_for(datasource);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        file.write_all(ndjson.as_bytes())
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

/// Posts NDJSON batches to an events endpoint (`?name=<datasource>&wait=true`).
#[derive(Debug, Clone)]
pub struct EventsApiSink {
    client: Client,
    endpoint: Url,
    token: String,
}

impl EventsApiSink {
    pub fn new(endpoint: &str, token: impl Into<String>) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).with_context(|| format!("invalid events URL {}", endpoint))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            endpoint,
            token: token.into(),
        })
    }

    pub fn url_for(&self, datasource: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("name", datasource)
            .append_pair("wait", "true");
        url
    }
}

impl EventSink for EventsApiSink {
    fn append(&mut self, datasource: &str, ndjson: &str) -> Result<()> {
        let url = self.url_for(datasource);
        tracing::debug!(%url, bytes = ndjson.len(), "POST events");
        self.client
            .post(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(ndjson.to_string())
            .send()
            .with_context(|| format!("sending {} events", datasource))?
            .error_for_status()
            .with_context(|| format!("events API rejected {}", datasource))?;
        Ok(())
    }
}
