// ABOUTME: SelectorSpec data model: query language, text mode, and the on-disk field entry shape.
// ABOUTME: Converts raw configuration entries into validated specs with compiled queries.

//! Declarative field definitions.
//!
//! A [`SelectorSpec`] describes how one field is pulled out of a document:
//! which query to run, in which query language, and how the matched nodes
//! become strings. Specs with children are *composite*: their query only
//! scopes the context for the child fields.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrapeError};
use crate::extractors::compiled::CompiledQuery;

/// The query language a spec's query is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryLanguage {
    /// CSS selector matched against descendants of the context node.
    Css,
    /// CSS selector matched against the nearest preceding sibling of the
    /// context node or of one of its ancestors.
    Preceding,
}

impl QueryLanguage {
    fn parse(field: &str, tag: &str) -> Result<Self> {
        match tag.trim().to_lowercase().as_str() {
            "css" => Ok(QueryLanguage::Css),
            "preceding" => Ok(QueryLanguage::Preceding),
            other => Err(ScrapeError::config(
                field,
                format!("unsupported query language {:?}", other),
            )),
        }
    }
}

/// How matched nodes are turned into values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMode {
    /// Immediate text of the node, verbatim.
    Raw,
    /// Full text of the node with whitespace collapsed and trimmed.
    Normalized,
    /// Attribute value (or serialized HTML) without text extraction.
    Direct,
    /// The node handles themselves.
    None,
}

impl TextMode {
    fn parse(field: &str, tag: &str) -> Result<Self> {
        match tag.trim().to_lowercase().as_str() {
            "raw" => Ok(TextMode::Raw),
            "normalized" | "normalize" => Ok(TextMode::Normalized),
            "direct" => Ok(TextMode::Direct),
            "none" => Ok(TextMode::None),
            other => Err(ScrapeError::config(
                field,
                format!("unknown text processing mode {:?}", other),
            )),
        }
    }
}

/// One field entry as it appears in a schema file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldConfig {
    /// Field name the entry defines.
    pub attribute: String,
    pub query: String,
    pub query_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_processing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
}

/// A validated, compiled field definition.
#[derive(Debug, Clone)]
pub struct SelectorSpec {
    pub field_name: String,
    pub query: String,
    pub query_language: QueryLanguage,
    pub text_mode: TextMode,
    pub expected_count: Option<usize>,
    pub parent_group: Option<String>,
    /// Resolved children. Filled in by the registry, which also adds every
    /// field whose `parent_group` names this spec.
    pub child_fields: Vec<String>,
    pub(crate) compiled: CompiledQuery,
}

impl SelectorSpec {
    /// Builds a spec from a schema entry, compiling its query.
    ///
    /// Children listed in the entry are kept as declared; cross-field
    /// checks happen in the registry.
    pub fn from_config(entry: &FieldConfig) -> Result<Self> {
        let field = entry.attribute.trim();
        if field.is_empty() {
            return Err(ScrapeError::config("<unnamed>", "field name is empty"));
        }

        let query_language = QueryLanguage::parse(field, &entry.query_type)?;
        let declared_children = entry.children.clone().unwrap_or_default();
        let text_mode = match entry.text_processing.as_deref() {
            Some(tag) => TextMode::parse(field, tag)?,
            None if !declared_children.is_empty() => TextMode::None,
            None => TextMode::Normalized,
        };
        if !declared_children.is_empty() && text_mode != TextMode::None {
            return Err(ScrapeError::config(
                field,
                "composite specs must use text processing \"none\"",
            ));
        }
        if entry.count == Some(0) {
            return Err(ScrapeError::config(field, "count must be at least 1"));
        }

        let compiled = CompiledQuery::compile(field, &entry.query, query_language)?;

        Ok(Self {
            field_name: field.to_string(),
            query: entry.query.clone(),
            query_language,
            text_mode,
            expected_count: entry.count,
            parent_group: entry.parent.clone(),
            child_fields: declared_children,
            compiled,
        })
    }

    /// True when the spec scopes child fields instead of yielding values.
    pub fn is_composite(&self) -> bool {
        !self.child_fields.is_empty()
    }

    /// True when the query needs a column position before it can run.
    pub fn is_positional(&self) -> bool {
        self.compiled.is_positional()
    }

    /// Checks a value count against `expected_count`.
    ///
    /// Returns true when no count is declared.
    pub fn count_matches(&self, found: usize) -> bool {
        match self.expected_count {
            Some(n) => found % n == 0,
            None => true,
        }
    }
}
