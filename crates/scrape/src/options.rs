// ABOUTME: Crawl configuration: page ceiling and the offset listing times are rendered in.
// ABOUTME: CrawlOptionsBuilder provides a fluent API for constructing CrawlOptions.

use chrono::{FixedOffset, Local, Offset};

/// Default ceiling on listing pages fetched for one window.
pub const DEFAULT_MAX_PAGES: u32 = 50;

/// Configuration for a window crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Listing pages fetched before giving up with WindowIncomplete.
    pub max_pages: u32,
    /// Offset the site renders listing times in.
    pub timezone: FixedOffset,
}

impl CrawlOptions {
    /// Create a CrawlOptionsBuilder.
    pub fn builder() -> CrawlOptionsBuilder {
        CrawlOptionsBuilder::new()
    }
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            timezone: local_offset(),
        }
    }
}

fn local_offset() -> FixedOffset {
    Local::now().offset().fix()
}

/// Builder for [`CrawlOptions`].
#[derive(Debug, Clone, Default)]
pub struct CrawlOptionsBuilder {
    opts: CrawlOptions,
}

impl CrawlOptionsBuilder {
    /// Create a builder with default options (50 pages, local offset).
    pub fn new() -> Self {
        Self {
            opts: CrawlOptions::default(),
        }
    }

    /// Set the page ceiling. Zero is raised to one.
    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.opts.max_pages = max_pages.max(1);
        self
    }

    /// Set the offset listing times are read in.
    pub fn timezone(mut self, timezone: FixedOffset) -> Self {
        self.opts.timezone = timezone;
        self
    }

    /// Build the options.
    pub fn build(self) -> CrawlOptions {
        self.opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = CrawlOptions::default();
        assert_eq!(opts.max_pages, DEFAULT_MAX_PAGES);
    }

    #[test]
    fn test_builder_overrides() {
        let cest = FixedOffset::east_opt(2 * 3600).unwrap();
        let opts = CrawlOptions::builder().max_pages(3).timezone(cest).build();
        assert_eq!(opts.max_pages, 3);
        assert_eq!(opts.timezone, cest);
    }

    #[test]
    fn test_zero_pages_is_raised() {
        assert_eq!(CrawlOptions::builder().max_pages(0).build().max_pages, 1);
    }
}
