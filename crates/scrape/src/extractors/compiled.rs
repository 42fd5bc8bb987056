// ABOUTME: Compiled query form of a SelectorSpec: parsed selector, attribute suffix, and position template.
// ABOUTME: Selectors are compiled once at registry load so invalid queries fail early.

//! Query compilation.
//!
//! Selector parsing is done once when the registry loads, so every query in
//! the registry is known to be valid before any document is seen. Positional
//! queries carry a `{position}` placeholder; they are checked at load time
//! with a probe position and compiled for real when the column mapper has
//! produced a position.

use scraper::{ElementRef, Selector};

use crate::error::{Result, ScrapeError};
use crate::extractors::spec::QueryLanguage;

/// Placeholder replaced by a 1-based column position.
pub const POSITION_PLACEHOLDER: &str = "{position}";

/// What a query selects relative to its context node.
#[derive(Debug, Clone)]
enum Target {
    /// The context node itself (`.` or a bare `@attr`).
    Context,
    /// A selector compiled at load time.
    Fixed(Selector),
    /// A selector template that needs a column position.
    Positional(String),
}

/// A query split into its selector and optional attribute parts.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    language: QueryLanguage,
    target: Target,
    attribute: Option<String>,
}

impl CompiledQuery {
    /// Compiles a raw query string.
    ///
    /// `field` is only used to label errors.
    pub fn compile(field: &str, query: &str, language: QueryLanguage) -> Result<Self> {
        let (selector, attribute) = split_attribute(query.trim());

        let target = if selector.is_empty() || selector == "." {
            if language == QueryLanguage::Preceding {
                return Err(ScrapeError::config(
                    field,
                    "preceding queries need a selector",
                ));
            }
            Target::Context
        } else if selector.contains(POSITION_PLACEHOLDER) {
            if language != QueryLanguage::Css {
                return Err(ScrapeError::config(
                    field,
                    "position placeholders are only supported in css queries",
                ));
            }
            // Probe with a valid position so syntax errors surface at load.
            parse_selector(field, &selector.replace(POSITION_PLACEHOLDER, "1"))?;
            Target::Positional(selector.to_string())
        } else {
            Target::Fixed(parse_selector(field, selector)?)
        };

        Ok(Self {
            language,
            target,
            attribute: attribute.map(str::to_string),
        })
    }

    /// True when the query carries a position placeholder.
    pub fn is_positional(&self) -> bool {
        matches!(self.target, Target::Positional(_))
    }

    /// The attribute the query reads, if any.
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Runs the query against `ctx` and returns matched elements in document order.
    ///
    /// `position` is required for positional queries and ignored otherwise.
    pub fn select<'a>(
        &self,
        field: &str,
        ctx: ElementRef<'a>,
        position: Option<usize>,
    ) -> Result<Vec<ElementRef<'a>>> {
        match &self.target {
            Target::Context => Ok(vec![ctx]),
            Target::Fixed(selector) => Ok(self.run(selector, ctx)),
            Target::Positional(template) => {
                let position = position.ok_or_else(|| {
                    ScrapeError::config(field, "positional query evaluated without a position")
                })?;
                let css = template.replace(POSITION_PLACEHOLDER, &position.to_string());
                let selector = parse_selector(field, &css)?;
                Ok(self.run(&selector, ctx))
            }
        }
    }

    fn run<'a>(&self, selector: &Selector, ctx: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        match self.language {
            QueryLanguage::Css => ctx.select(selector).collect(),
            QueryLanguage::Preceding => nearest_preceding(selector, ctx).into_iter().collect(),
        }
    }
}

/// Finds the nearest preceding sibling of `ctx` or of any of its ancestors
/// that matches `selector`.
fn nearest_preceding<'a>(selector: &Selector, ctx: ElementRef<'a>) -> Option<ElementRef<'a>> {
    let mut current = Some(*ctx);
    while let Some(node) = current {
        for sibling in node.prev_siblings() {
            if let Some(el) = ElementRef::wrap(sibling) {
                if selector.matches(&el) {
                    return Some(el);
                }
            }
        }
        current = node.parent();
    }
    None
}

fn parse_selector(field: &str, css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| ScrapeError::config(field, format!("invalid selector {:?}: {:?}", css, e)))
}

/// Splits `"a.link @href"` into `("a.link", Some("href"))`.
///
/// The attribute suffix must be the last whitespace-separated token and
/// start with `@`; CSS itself never uses `@` in selectors.
fn split_attribute(query: &str) -> (&str, Option<&str>) {
    let (head, last) = match query.rsplit_once(char::is_whitespace) {
        Some((head, last)) => (head.trim_end(), last),
        None => ("", query),
    };
    match last.strip_prefix('@') {
        Some(attr) if !attr.is_empty() => (head, Some(attr)),
        _ => (query, None),
    }
}
