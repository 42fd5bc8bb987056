// ABOUTME: Extraction engine evaluating SelectorSpecs against parsed documents or fragments.
// ABOUTME: Handles raw/normalized/direct/none text modes, composite scoping, and positional queries.

//! Spec evaluation.
//!
//! Key behaviors:
//! - Zero matches is an empty sequence, never an error.
//! - `raw` keeps each node's immediate text verbatim.
//! - `normalized` collapses whitespace over the node's full text.
//! - `direct` returns the attribute value (or serialized HTML) untouched; a
//!   missing attribute yields an empty string so positions stay aligned.
//! - `none` returns node handles for composite traversal.
//! - Composite evaluation scopes every leaf child to each matched node and
//!   keeps one [`Slot`] per scope node, in document order, so a scope that
//!   lacks a child leaves a gap instead of shifting later values.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Node};

use crate::error::{Result, ScrapeError};
use crate::extractors::registry::Registry;
use crate::extractors::spec::{SelectorSpec, TextMode};

/// The result of evaluating one spec.
#[derive(Debug, Clone)]
pub enum Extracted<'a> {
    /// Matched node handles (`TextMode::None`).
    Nodes(Vec<ElementRef<'a>>),
    /// Extracted string values.
    Values(Vec<String>),
}

impl<'a> Extracted<'a> {
    /// Number of matches.
    pub fn len(&self) -> usize {
        match self {
            Extracted::Nodes(nodes) => nodes.len(),
            Extracted::Values(values) => values.len(),
        }
    }

    /// Returns true when nothing matched.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What one leaf child produced inside one scope node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// The child matched nothing in this scope.
    Empty,
    /// The first value the child produced in this scope.
    Value(String),
    /// The child matched more nodes than its expected count allows.
    Overflow(usize),
}

impl Slot {
    /// Reduces the values one scope produced for `spec`.
    fn from_values(spec: &SelectorSpec, values: Vec<String>) -> Self {
        let found = values.len();
        match spec.expected_count {
            Some(max) if found > max => Slot::Overflow(found),
            _ => values.into_iter().next().map_or(Slot::Empty, Slot::Value),
        }
    }

    /// The value, when there is exactly one usable value.
    pub fn value(&self) -> Option<&str> {
        match self {
            Slot::Value(v) => Some(v),
            Slot::Empty | Slot::Overflow(_) => None,
        }
    }
}

/// Values collected for the leaf children of one composite.
#[derive(Debug, Clone, Default)]
pub struct GroupValues<'a> {
    /// Nodes matched by the composite's own query.
    pub scopes: Vec<ElementRef<'a>>,
    /// One slot per scope node for every leaf child.
    pub fields: BTreeMap<String, Vec<Slot>>,
}

impl<'a> GroupValues<'a> {
    /// Slots for one child field, one per scope; empty for unknown fields.
    pub fn slots(&self, field: &str) -> &[Slot] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The child's value inside the scope at `index`.
    pub fn value(&self, field: &str, index: usize) -> Option<&str> {
        self.slots(field).get(index).and_then(Slot::value)
    }
}

/// Evaluates specs from a [`Registry`].
#[derive(Debug, Clone, Copy)]
pub struct Extractor<'r> {
    registry: &'r Registry,
}

impl<'r> Extractor<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Evaluates a field by name against a context node.
    pub fn extract<'a>(&self, field: &str, ctx: ElementRef<'a>) -> Result<Extracted<'a>> {
        extract(self.registry.spec(field)?, ctx)
    }

    /// Evaluates a field against the whole document.
    pub fn extract_document<'a>(&self, field: &str, doc: &'a Html) -> Result<Extracted<'a>> {
        self.extract(field, doc.root_element())
    }

    /// String values of a field. Node-mode fields yield their normalized text.
    pub fn values(&self, field: &str, ctx: ElementRef<'_>) -> Result<Vec<String>> {
        let spec = self.registry.spec(field)?;
        values_of(spec, ctx, None)
    }

    /// String values of a positional field at the given 1-based column.
    pub fn values_at(
        &self,
        field: &str,
        ctx: ElementRef<'_>,
        position: usize,
    ) -> Result<Vec<String>> {
        let spec = self.registry.spec(field)?;
        values_of(spec, ctx, Some(position))
    }

    /// Positional values of a field, one slot per scope node.
    pub fn values_at_each(
        &self,
        field: &str,
        scopes: &[ElementRef<'_>],
        position: usize,
    ) -> Result<Vec<Slot>> {
        let spec = self.registry.spec(field)?;
        scopes
            .iter()
            .map(|scope| -> Result<Slot> {
                Ok(Slot::from_values(spec, values_of(spec, *scope, Some(position))?))
            })
            .collect()
    }

    /// Nodes matched by a field, regardless of its text mode.
    pub fn nodes<'a>(&self, field: &str, ctx: ElementRef<'a>) -> Result<Vec<ElementRef<'a>>> {
        let spec = self.registry.spec(field)?;
        spec.compiled.select(&spec.field_name, ctx, None)
    }

    /// Evaluates a composite: resolves its scope nodes, then every leaf child
    /// relative to each scope.
    ///
    /// Positional children and nested composites are skipped here; callers
    /// evaluate them per scope with [`Extractor::values_at_each`] and
    /// [`Extractor::group`].
    pub fn group<'a>(&self, group: &str, ctx: ElementRef<'a>) -> Result<GroupValues<'a>> {
        let spec = self.registry.spec(group)?;
        if !spec.is_composite() {
            return Err(ScrapeError::config(group, "field is not a composite"));
        }
        let scopes = spec.compiled.select(&spec.field_name, ctx, None)?;
        check_count(spec, scopes.len());

        let mut fields: BTreeMap<String, Vec<Slot>> = BTreeMap::new();
        for child in self.registry.children(group)? {
            if child.is_composite() || child.is_positional() {
                continue;
            }
            let slots = scopes
                .iter()
                .map(|scope| -> Result<Slot> {
                    Ok(Slot::from_values(child, values_of(child, *scope, None)?))
                })
                .collect::<Result<Vec<_>>>()?;
            fields.insert(child.field_name.clone(), slots);
        }

        Ok(GroupValues { scopes, fields })
    }
}

/// Evaluates a spec against a context node.
pub fn extract<'a>(spec: &SelectorSpec, ctx: ElementRef<'a>) -> Result<Extracted<'a>> {
    if spec.is_positional() {
        return Err(ScrapeError::config(
            &spec.field_name,
            "positional field needs a column position",
        ));
    }
    let nodes = spec.compiled.select(&spec.field_name, ctx, None)?;
    if spec.text_mode == TextMode::None {
        return Ok(Extracted::Nodes(nodes));
    }
    let values = render(spec, &nodes);
    check_count(spec, values.len());
    Ok(Extracted::Values(values))
}

fn values_of(
    spec: &SelectorSpec,
    ctx: ElementRef<'_>,
    position: Option<usize>,
) -> Result<Vec<String>> {
    let nodes = spec.compiled.select(&spec.field_name, ctx, position)?;
    let values = render(spec, &nodes);
    check_count(spec, values.len());
    Ok(values)
}

fn render(spec: &SelectorSpec, nodes: &[ElementRef<'_>]) -> Vec<String> {
    let attribute = spec.compiled.attribute();
    nodes
        .iter()
        .map(|node| match attribute {
            Some(attr) => {
                let value = node.value().attr(attr).unwrap_or_default();
                match spec.text_mode {
                    TextMode::Normalized => normalize_whitespace(value),
                    TextMode::Raw | TextMode::Direct | TextMode::None => value.to_string(),
                }
            }
            None => match spec.text_mode {
                TextMode::Raw => immediate_text(*node),
                TextMode::Normalized | TextMode::None => normalized_text(*node),
                TextMode::Direct => node.html(),
            },
        })
        .collect()
}

fn check_count(spec: &SelectorSpec, found: usize) {
    if !spec.count_matches(found) {
        tracing::warn!(
            field = %spec.field_name,
            found,
            expected = spec.expected_count.unwrap_or_default(),
            "value count is not a multiple of the expected count"
        );
    }
}

/// Concatenates the text nodes that are direct children of `node`.
fn immediate_text(node: ElementRef<'_>) -> String {
    node.children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => Some(&**text),
            _ => None,
        })
        .collect()
}

fn normalized_text(node: ElementRef<'_>) -> String {
    normalize_whitespace(&node.text().collect::<String>())
}

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
