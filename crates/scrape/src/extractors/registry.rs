// ABOUTME: Registry of SelectorSpecs keyed by field name, validated once at load.
// ABOUTME: Resolves composite children and rejects duplicate, dangling, or cyclic definitions.

use std::collections::{HashMap, HashSet};

use crate::error::{Result, ScrapeError};
use crate::extractors::spec::{FieldConfig, SelectorSpec, TextMode};

/// Read-only mapping from field name to its [`SelectorSpec`].
#[derive(Debug, Default, Clone)]
pub struct Registry {
    map: HashMap<String, SelectorSpec>,
    /// Field names in schema order.
    order: Vec<String>,
}

impl Registry {
    /// Builds a registry from schema entries.
    ///
    /// Fails with a Config error when a field is defined twice, a parent or
    /// child reference is dangling or contradictory, the parent chain loops,
    /// or any query fails to compile.
    pub fn load(entries: &[FieldConfig]) -> Result<Self> {
        let mut map: HashMap<String, SelectorSpec> = HashMap::with_capacity(entries.len());
        let mut order = Vec::with_capacity(entries.len());

        for entry in entries {
            let spec = SelectorSpec::from_config(entry)?;
            if map.contains_key(&spec.field_name) {
                return Err(ScrapeError::config(
                    &spec.field_name,
                    "field is defined more than once",
                ));
            }
            order.push(spec.field_name.clone());
            map.insert(spec.field_name.clone(), spec);
        }

        // Declared children must exist and agree with their own parent.
        for name in &order {
            let spec = &map[name];
            for child in &spec.child_fields {
                let child_spec = map.get(child).ok_or_else(|| {
                    ScrapeError::config(name, format!("child {:?} is not defined", child))
                })?;
                if let Some(parent) = &child_spec.parent_group {
                    if parent != name {
                        return Err(ScrapeError::config(
                            child,
                            format!("listed under {:?} but its parent is {:?}", name, parent),
                        ));
                    }
                }
            }
        }

        let explicit_mode: HashSet<&str> = entries
            .iter()
            .filter(|e| e.text_processing.is_some())
            .map(|e| e.attribute.trim())
            .collect();

        // Every field naming a parent becomes one of that parent's children.
        for name in &order {
            let Some(parent) = map[name].parent_group.clone() else {
                continue;
            };
            let group = map.get_mut(&parent).ok_or_else(|| {
                ScrapeError::config(name, format!("parent {:?} is not defined", parent))
            })?;
            if !group.child_fields.contains(name) {
                group.child_fields.push(name.clone());
            }
            if group.text_mode != TextMode::None {
                if explicit_mode.contains(parent.as_str()) {
                    return Err(ScrapeError::config(
                        &parent,
                        "composite specs must use text processing \"none\"",
                    ));
                }
                group.text_mode = TextMode::None;
            }
        }

        for name in &order {
            let mut seen = HashSet::new();
            let mut current = Some(name.as_str());
            while let Some(field) = current {
                if !seen.insert(field) {
                    return Err(ScrapeError::config(name, "parent chain is cyclic"));
                }
                current = map[field].parent_group.as_deref();
            }
        }

        tracing::debug!(fields = order.len(), "selector registry loaded");
        Ok(Self { map, order })
    }

    /// Looks up a spec by field name.
    pub fn get(&self, field: &str) -> Option<&SelectorSpec> {
        self.map.get(field)
    }

    /// Looks up a spec, failing with a Config error when it is missing.
    pub fn spec(&self, field: &str) -> Result<&SelectorSpec> {
        self.get(field)
            .ok_or_else(|| ScrapeError::config(field, "field is not defined in the registry"))
    }

    /// Child specs of a composite, in resolution order.
    pub fn children(&self, group: &str) -> Result<Vec<&SelectorSpec>> {
        let spec = self.spec(group)?;
        spec.child_fields.iter().map(|c| self.spec(c)).collect()
    }

    /// Field names in schema order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if no fields are registered.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
