//! Shared fixture builders for flowdeck integration tests.
#![allow(dead_code)]

use flowdeck::definition::{ConnectionTarget, Definition, Node};
use serde_json::json;

/// A minimal well-formed node with a non-empty parameter mapping.
pub fn node(id: &str, name: &str) -> Node {
    Node {
        id: id.to_string(),
        name: name.to_string(),
        node_type: "flowdeck.shell".to_string(),
        type_version: 1,
        position: vec![100.0, 200.0],
        parameters: json!({ "command": "true" }),
        disabled: false,
    }
}

/// A definition with the given nodes and no connections yet.
pub fn definition(id: &str, name: &str, nodes: Vec<Node>) -> Definition {
    Definition {
        id: id.to_string(),
        name: name.to_string(),
        version: "1.0.0".to_string(),
        active: true,
        nodes,
        ..Default::default()
    }
}

/// Append one branch on `channel` from `source` to the given target names.
pub fn connect(definition: &mut Definition, source: &str, channel: &str, targets: &[&str]) {
    let branch: Vec<ConnectionTarget> = targets
        .iter()
        .map(|target| ConnectionTarget {
            node: target.to_string(),
            channel_type: "main".to_string(),
            index: 0,
        })
        .collect();

    definition
        .connections
        .entry(source.to_string())
        .or_default()
        .entry(channel.to_string())
        .or_default()
        .push(branch);
}

/// A two-node definition wired Fetch → Store on the primary channel.
pub fn linked_definition(id: &str, name: &str) -> Definition {
    let mut def = definition(id, name, vec![node("n1", "Fetch"), node("n2", "Store")]);
    connect(&mut def, "Fetch", "main", &["Store"]);
    def
}

/// JSON document body for a valid two-node definition.
pub fn json_document(id: &str, name: &str) -> String {
    serde_json::to_string_pretty(&linked_definition(id, name)).unwrap()
}

/// JSON document whose connection graph points at a node that does not
/// exist.
pub fn json_document_with_dangling_target(id: &str, name: &str) -> String {
    let mut def = definition(id, name, vec![node("n1", "Fetch"), node("n2", "Store")]);
    connect(&mut def, "Fetch", "main", &["Ghost"]);
    serde_json::to_string_pretty(&def).unwrap()
}

/// YAML document body for a valid two-node definition.
pub fn yaml_document(id: &str, name: &str) -> String {
    serde_yaml::to_string(&linked_definition(id, name)).unwrap()
}

/// Lua document body defining the given export as a valid definition.
pub fn lua_document(export: &str, id: &str, name: &str) -> String {
    format!(
        r#"
{export} = {{
    id = "{id}",
    name = "{name}",
    version = "1.0.0",
    active = true,
    nodes = {{
        {{
            id = "n1",
            name = "Fetch",
            type = "flowdeck.http",
            typeVersion = 1,
            position = {{ 100, 200 }},
            parameters = {{ url = "https://example.com/data" }},
        }},
        {{
            id = "n2",
            name = "Store",
            type = "flowdeck.table",
            typeVersion = 1,
            position = {{ 300, 200 }},
            parameters = {{ table = "records" }},
        }},
    }},
    connections = {{
        Fetch = {{
            main = {{ {{ {{ node = "Store", type = "main", index = 0 }} }} }},
        }},
    }},
}}
"#
    )
}
