// ABOUTME: Loader for selector registries from embedded JSON schemas or schema files on disk.
// ABOUTME: Provides the builtin listing/match registries and JSON/YAML file loading.

//! Selector registry loader.
//!
//! Two schemas ship with the crate: one for the results listing and one for
//! match report pages. Callers may replace either with a JSON or YAML file of
//! the same shape.

use std::fs;
use std::path::Path;

use crate::error::{Result, ScrapeError};
use crate::extractors::registry::Registry;
use crate::extractors::spec::FieldConfig;

/// Embedded schema for the results listing.
const RESULTS_SCHEMA_JSON: &str = include_str!("../../data/vlr_results.json");

/// Embedded schema for match report pages.
const MATCH_SCHEMA_JSON: &str = include_str!("../../data/vlr_match.json");

/// Loads the builtin results-listing registry.
pub fn load_results_registry() -> Result<Registry> {
    registry_from_json("builtin:vlr_results", RESULTS_SCHEMA_JSON)
}

/// Loads the builtin match-page registry.
pub fn load_match_registry() -> Result<Registry> {
    registry_from_json("builtin:vlr_match", MATCH_SCHEMA_JSON)
}

/// Parses a JSON schema (an array of field entries) into a registry.
pub fn registry_from_json(source: &str, json: &str) -> Result<Registry> {
    let entries: Vec<FieldConfig> = serde_json::from_str(json)
        .map_err(|e| ScrapeError::config(source, format!("invalid JSON schema: {}", e)))?;
    Registry::load(&entries)
}

/// Parses a YAML schema (a sequence of field entries) into a registry.
pub fn registry_from_yaml(source: &str, yaml: &str) -> Result<Registry> {
    let entries: Vec<FieldConfig> = serde_yaml::from_str(yaml)
        .map_err(|e| ScrapeError::config(source, format!("invalid YAML schema: {}", e)))?;
    Registry::load(&entries)
}

/// Loads a schema file, choosing YAML for `.yml`/`.yaml` and JSON otherwise.
pub fn registry_from_path(path: impl AsRef<Path>) -> Result<Registry> {
    let path = path.as_ref();
    let source = path.display().to_string();
    let text = fs::read_to_string(path)
        .map_err(|e| ScrapeError::config(&source, format!("cannot read schema: {}", e)))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    );
    if is_yaml {
        registry_from_yaml(&source, &text)
    } else {
        registry_from_json(&source, &text)
    }
}
