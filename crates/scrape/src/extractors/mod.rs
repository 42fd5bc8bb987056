// ABOUTME: Declarative extraction: selector specs, their registry, and the evaluation engine.
// ABOUTME: Specs are loaded from schema files and evaluated against scraper documents.

//! Declarative field extraction.
//!
//! Submodules:
//! - `spec`: the SelectorSpec model and schema entry shape.
//! - `compiled`: query compilation (selectors, attribute suffixes, positions).
//! - `registry`: validated field-name lookup.
//! - `loader`: builtin and on-disk schemas.
//! - `select`: the evaluation engine.

pub mod compiled;
pub mod loader;
pub mod registry;
pub mod select;
pub mod spec;
