// ABOUTME: Error types for the scraper including the ErrorCode enum and ScrapeError struct.
// ABOUTME: Provides categorized errors with convenience constructors, boolean helpers, and FieldParseError.

use std::fmt;

/// Error codes representing the categories of scrape failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The selector registry is malformed or internally inconsistent.
    Config,
    /// Parallel field sequences for one match did not line up.
    ShapeMismatch,
    /// A single typed field failed coercion.
    FieldParse,
    /// `patch` and `patch_old` both carried different values.
    PatchConflict,
    /// The page fetcher failed.
    Fetch,
    /// The crawl hit its page ceiling before the window completed.
    WindowIncomplete,
    /// The event sink rejected records.
    Sink,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::Config => "config error",
            ErrorCode::ShapeMismatch => "shape mismatch",
            ErrorCode::FieldParse => "field parse error",
            ErrorCode::PatchConflict => "patch conflict",
            ErrorCode::Fetch => "fetch error",
            ErrorCode::WindowIncomplete => "window incomplete",
            ErrorCode::Sink => "sink error",
        };
        write!(f, "{}", s)
    }
}

/// The main error type for scrape operations.
///
/// `target` names what failed (a field, a match, a page), `op` the operation
/// that was running.
#[derive(Debug, thiserror::Error)]
pub struct ScrapeError {
    pub code: ErrorCode,
    pub target: String,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vlr-scrape: {} {}: {}", self.op, self.target, self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl ScrapeError {
    fn new(
        code: ErrorCode,
        target: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            target: target.into(),
            op: op.into(),
            source,
        }
    }

    /// Create a Config error.
    pub fn config(target: impl Into<String>, msg: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::Config,
            target,
            "load",
            Some(anyhow::anyhow!("{}", msg)),
        )
    }

    /// Create a ShapeMismatch error for the given match or record.
    pub fn shape_mismatch(target: impl Into<String>, msg: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ShapeMismatch,
            target,
            "assemble",
            Some(anyhow::anyhow!("{}", msg)),
        )
    }

    /// Create a FieldParse error from a typed accessor failure.
    pub fn field_parse(target: impl Into<String>, err: FieldParseError) -> Self {
        Self::new(ErrorCode::FieldParse, target, "coerce", Some(err.into()))
    }

    /// Create a PatchConflict error.
    pub fn patch_conflict(target: impl Into<String>, patch: &str, patch_old: &str) -> Self {
        Self::new(
            ErrorCode::PatchConflict,
            target,
            "assemble",
            Some(anyhow::anyhow!(
                "patch {:?} disagrees with patch_old {:?}",
                patch,
                patch_old
            )),
        )
    }

    /// Create a Fetch error wrapping the fetcher's failure.
    pub fn fetch(target: impl Into<String>, source: anyhow::Error) -> Self {
        Self::new(ErrorCode::Fetch, target, "fetch", Some(source))
    }

    /// Create a WindowIncomplete error.
    pub fn window_incomplete(target: impl Into<String>, pages: u32) -> Self {
        Self::new(
            ErrorCode::WindowIncomplete,
            target,
            "crawl",
            Some(anyhow::anyhow!(
                "window not completed after {} pages",
                pages
            )),
        )
    }

    /// Create a Sink error.
    pub fn sink(target: impl Into<String>, source: anyhow::Error) -> Self {
        Self::new(ErrorCode::Sink, target, "append", Some(source))
    }

    /// Returns true if this is a Config error.
    pub fn is_config(&self) -> bool {
        self.code == ErrorCode::Config
    }

    /// Returns true if this is a ShapeMismatch error.
    pub fn is_shape_mismatch(&self) -> bool {
        self.code == ErrorCode::ShapeMismatch
    }

    /// Returns true if this is a PatchConflict error.
    pub fn is_patch_conflict(&self) -> bool {
        self.code == ErrorCode::PatchConflict
    }

    /// Returns true if this is a Fetch error.
    pub fn is_fetch(&self) -> bool {
        self.code == ErrorCode::Fetch
    }

    /// Returns true if this is a WindowIncomplete error.
    pub fn is_window_incomplete(&self) -> bool {
        self.code == ErrorCode::WindowIncomplete
    }

    /// Returns true when the error only invalidates one match, so a batch
    /// can skip it and continue.
    pub fn is_per_match(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ShapeMismatch | ErrorCode::PatchConflict | ErrorCode::FieldParse
        )
    }
}

/// Failure to coerce one raw field value into its typed form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldParseError {
    /// The field had no value at all.
    #[error("field {field} is missing")]
    Missing { field: &'static str },

    /// The raw text could not be parsed as the expected type.
    #[error("field {field} has invalid value {value:?}")]
    Invalid { field: &'static str, value: String },
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, ScrapeError>;
