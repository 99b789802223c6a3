/// Structural validation for loaded definitions
///
/// Validation is a pure function over an already-deserialized [`Definition`]:
/// no I/O, no short-circuiting. Every violation is collected so a single call
/// surfaces every problem, and the same path serves both the bulk discovery
/// pass and the single-file hot-reload path.

use crate::definition::types::{Definition, Settings};
use serde::Serialize;
use std::collections::HashSet;

/// Outcome of validating one definition. Never partial: a definition is
/// accepted only when `errors` is empty.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Structural validator for definition documents
#[derive(Debug, Default)]
pub struct DefinitionValidator;

impl DefinitionValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a definition's identity, nodes, connection graph and
    /// settings, collecting all violations in order.
    pub fn validate(&self, definition: &Definition) -> ValidationResult {
        let mut errors = Vec::new();

        // Required top-level fields
        if definition.id.is_empty() {
            errors.push("Definition id is required".to_string());
        }
        if definition.name.is_empty() {
            errors.push("Definition name is required".to_string());
        }
        if definition.nodes.is_empty() {
            errors.push("Definition must have at least one node".to_string());
        }

        self.validate_nodes(definition, &mut errors);
        self.validate_connections(definition, &mut errors);

        if let Some(settings) = &definition.settings {
            self.validate_settings(settings, &mut errors);
        }

        ValidationResult::from_errors(errors)
    }

    fn validate_nodes(&self, definition: &Definition, errors: &mut Vec<String>) {
        let mut seen_ids = HashSet::new();
        let mut seen_names = HashSet::new();

        for node in &definition.nodes {
            if node.id.is_empty() {
                errors.push("Node id is required".to_string());
            }
            if node.name.is_empty() {
                errors.push("Node name is required".to_string());
            }
            if node.node_type.is_empty() {
                errors.push(format!("Node type is required for '{}'", node.name));
            }

            // One error per extra occurrence, reported by value
            if !node.id.is_empty() && !seen_ids.insert(node.id.clone()) {
                errors.push(format!("Duplicate node id: {}", node.id));
            }
            if !node.name.is_empty() && !seen_names.insert(node.name.clone()) {
                errors.push(format!("Duplicate node name: {}", node.name));
            }

            if node.position.len() != 2 {
                errors.push(format!(
                    "Invalid position for node '{}': must be [x, y]",
                    node.name
                ));
            }

            if !node.parameters.is_object() {
                errors.push(format!(
                    "Invalid parameters for node '{}': must be a key-value mapping",
                    node.name
                ));
            }
        }
    }

    /// Every source key and every branch target of every declared channel
    /// must resolve to an existing node name. The primary channel gets no
    /// special treatment; "main" is a naming convention, not a shape.
    fn validate_connections(&self, definition: &Definition, errors: &mut Vec<String>) {
        let node_names: HashSet<&str> = definition
            .nodes
            .iter()
            .map(|node| node.name.as_str())
            .collect();

        for (source, channels) in &definition.connections {
            if !node_names.contains(source.as_str()) {
                errors.push(format!("Connection source node not found: {source}"));
                continue;
            }

            for (channel, branches) in channels {
                for branch in branches {
                    for target in branch {
                        if !node_names.contains(target.node.as_str()) {
                            errors.push(format!(
                                "Connection target node not found: {} (from {}, channel: {})",
                                target.node, source, channel
                            ));
                        }
                    }
                }
            }
        }
    }

    fn validate_settings(&self, settings: &Settings, errors: &mut Vec<String>) {
        if let Some(order) = &settings.execution_order {
            if !Settings::EXECUTION_ORDERS.contains(&order.as_str()) {
                errors.push(format!(
                    "Invalid executionOrder '{order}': must be one of v0, v1"
                ));
            }
        }
        // Timezone string-ness is enforced by the type at deserialization.
    }
}
